//! `check` subcommand: validate the configuration file and exit.

use std::path::Path;

use lumicycle_lib::LumicycleError;

use super::{Config, Result};

pub(super) fn cmd_check(config_path: Option<&Path>) -> Result<()> {
    let path = super::resolve_config_path(config_path)?;
    println!("Checking {}", path.display());

    let config = Config::load_from(&path)?;
    match config.validate() {
        Ok(()) => {
            println!(
                "Configuration OK: {} state(s), check every {} ms, reconnect after {} ms",
                config.states.len(),
                config.check_interval,
                config.reconnect_interval
            );
            Ok(())
        }
        Err(problems) => {
            for problem in &problems {
                println!("  problem: {problem}");
            }
            Err(LumicycleError::Config(format!(
                "{} validation problem(s) found",
                problems.len()
            )))
        }
    }
}
