//! `get` subcommand: read the lamp's current color once.

use std::path::Path;
use std::time::Duration;

use super::{Channel, Result, WsTransport};

pub(super) async fn cmd_get(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = super::load_valid_config(config_path)?;
    let channel = Channel::new(Duration::from_millis(config.reply_timeout));

    let mut conn = WsTransport::connect(&config.url).await?;
    let color = channel.get_color(&mut conn).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&color).unwrap());
    } else {
        println!("{color}");
    }
    Ok(())
}
