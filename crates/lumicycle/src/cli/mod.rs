//! CLI subcommands: the daemon, one-shot lamp control, and config handling.

mod check;
mod config_cmd;
mod get;
mod run_cmd;
mod set;

use std::fmt;
use std::path::{Path, PathBuf};

use clap::Subcommand;

use lumicycle_lib::LumicycleError;
use lumicycle_lib::channel::Channel;
use lumicycle_lib::config::Config;
use lumicycle_lib::error::Result;
use lumicycle_lib::transport::WsTransport;

#[derive(Subcommand)]
pub enum Command {
    /// Run the schedule daemon: connect, keep the lamp on schedule, reconnect forever
    Run,
    /// Validate the configuration file and exit
    Check,
    /// Read the lamp's current color
    Get,
    /// Set the lamp's color once
    Set {
        /// Target color as decimal channels "R,G,B", each 0-4095
        color: String,
        /// Fade time in milliseconds (default: the configured state_transition_fade_time)
        #[arg(long, value_name = "MS")]
        fade: Option<u64>,
    },
    /// Show the configuration file, its settings and schedule
    Config {
        /// Write a starter configuration file instead of showing the current one
        #[arg(long)]
        init: bool,
    },
}

pub async fn run(command: Command, config_path: Option<&Path>, json: bool) -> Result<()> {
    match command {
        Command::Run => {
            warn_json_unsupported(json, "run");
            run_cmd::cmd_run(config_path).await
        }
        Command::Check => {
            warn_json_unsupported(json, "check");
            check::cmd_check(config_path)
        }
        Command::Get => get::cmd_get(config_path, json).await,
        Command::Set { color, fade } => {
            warn_json_unsupported(json, "set");
            set::cmd_set(config_path, &color, fade).await
        }
        Command::Config { init } => config_cmd::cmd_config(config_path, init, json),
    }
}

fn warn_json_unsupported(json: bool, command: &str) {
    if json {
        log::warn!("--json is not supported by `{command}`, ignoring");
    }
}

/// Resolve the configuration file path: explicit flag, else platform default.
fn resolve_config_path(custom: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = custom {
        return Ok(path.to_path_buf());
    }
    Config::path()
        .ok_or_else(|| LumicycleError::Config("no config directory on this platform".into()))
}

/// Load the configuration and insist it passes validation, logging every
/// violation before failing.
fn load_valid_config(custom: Option<&Path>) -> Result<Config> {
    let path = resolve_config_path(custom)?;
    let config = Config::load_from(&path)?;
    if let Err(problems) = config.validate() {
        for problem in &problems {
            log::error!("{problem}");
        }
        return Err(LumicycleError::Config(format!(
            "{} validation problem(s) in {}",
            problems.len(),
            path.display()
        )));
    }
    Ok(config)
}

// ── Output helpers ──

const PADDING: usize = 2;

/// Column width for a block of labels: longest label plus padding.
fn kv_width(labels: &[&str]) -> usize {
    labels.iter().map(|label| label.len()).max().unwrap_or(0) + PADDING
}

fn format_kv(label: &str, value: impl fmt::Display, width: usize) -> String {
    let gap = width.saturating_sub(label.len());
    format!("{label}:{:gap$}{value}", "")
}

/// Print one aligned `label: value` line.
fn kv(label: &str, value: impl fmt::Display, width: usize) {
    println!("{}", format_kv(label, value, width));
}

/// Same, indented one level.
fn kv_indent(label: &str, value: impl fmt::Display, width: usize) {
    println!("  {}", format_kv(label, value, width));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_width_fits_longest_label() {
        assert_eq!(kv_width(&["url", "check_interval"]), "check_interval".len() + PADDING);
    }

    #[test]
    fn kv_width_of_empty_block() {
        assert_eq!(kv_width(&[]), PADDING);
    }

    #[test]
    fn format_kv_aligns_values() {
        let width = kv_width(&["a", "long_label"]);
        let short = format_kv("a", 1, width);
        let long = format_kv("long_label", 2, width);
        assert_eq!(short.find('1'), long.find('2'), "values start in the same column");
        assert!(short.starts_with("a:"));
    }

    #[test]
    fn format_kv_never_panics_on_narrow_width() {
        assert_eq!(format_kv("label", "v", 0), "label:v");
    }
}
