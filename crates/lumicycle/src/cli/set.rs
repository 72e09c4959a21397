//! `set` subcommand: apply one color to the lamp and exit.

use std::path::Path;
use std::time::Duration;

use lumicycle_lib::color;

use super::{Channel, Result, WsTransport};

pub(super) async fn cmd_set(
    config_path: Option<&Path>,
    color_arg: &str,
    fade: Option<u64>,
) -> Result<()> {
    let config = super::load_valid_config(config_path)?;
    let target = color::parse_color(color_arg)?;
    let fade = fade.unwrap_or(config.state_transition_fade_time);
    let channel = Channel::new(Duration::from_millis(config.reply_timeout));

    let mut conn = WsTransport::connect(&config.url).await?;
    channel.set_color(&mut conn, target, fade).await?;

    println!("Color set: {target} (fade {fade} ms)");
    Ok(())
}
