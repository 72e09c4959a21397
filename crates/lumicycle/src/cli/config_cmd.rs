//! `config` subcommand: show settings and schedule, or write a starter file.

use std::path::Path;

use serde::Serialize;

use lumicycle_lib::LumicycleError;

use super::{Config, Result, kv, kv_indent, kv_width};

#[derive(Serialize)]
struct ConfigOutput {
    config_file: String,
    config_file_exists: bool,
    valid: bool,
    problems: Vec<String>,
    settings: Option<Config>,
}

pub(super) fn cmd_config(config_path: Option<&Path>, init: bool, json: bool) -> Result<()> {
    let path = super::resolve_config_path(config_path)?;

    if init {
        super::warn_json_unsupported(json, "config --init");
        if path.exists() {
            return Err(LumicycleError::Config(format!(
                "refusing to overwrite existing {}",
                path.display()
            )));
        }
        Config::example().save_to(&path)?;
        println!("Wrote starter configuration to {}", path.display());
        println!("Edit the url and states, then run `lumicycle check`.");
        return Ok(());
    }

    let exists = path.exists();
    let settings = if exists { Some(Config::load_from(&path)?) } else { None };
    let problems: Vec<String> = settings
        .as_ref()
        .map(|config| {
            config
                .validate()
                .err()
                .unwrap_or_default()
                .iter()
                .map(|problem| problem.to_string())
                .collect()
        })
        .unwrap_or_default();

    if json {
        let output = ConfigOutput {
            config_file: path.display().to_string(),
            config_file_exists: exists,
            valid: exists && problems.is_empty(),
            problems,
            settings,
        };
        println!("{}", serde_json::to_string_pretty(&output).unwrap());
        return Ok(());
    }

    let width = kv_width(&["Config file", "Valid"]);
    let annotation = if exists { "(loaded)" } else { "(not found)" };
    kv("Config file", format!("{} {annotation}", path.display()), width);

    let Some(config) = settings else {
        println!("Run `lumicycle config --init` to create a starter file.");
        return Ok(());
    };
    kv("Valid", if problems.is_empty() { "yes" } else { "no" }, width);

    let labels = [
        "url",
        "check_interval",
        "reconnect_interval",
        "reply_timeout",
        "state_transition_fade_time",
    ];
    let setting_width = kv_width(&labels);
    println!();
    println!("Settings:");
    kv_indent("url", &config.url, setting_width);
    kv_indent("check_interval", format!("{} ms", config.check_interval), setting_width);
    kv_indent("reconnect_interval", format!("{} ms", config.reconnect_interval), setting_width);
    kv_indent("reply_timeout", format!("{} ms", config.reply_timeout), setting_width);
    kv_indent(
        "state_transition_fade_time",
        format!("{} ms", config.state_transition_fade_time),
        setting_width,
    );

    println!();
    println!("Schedule ({} states):", config.states.len());
    for (index, state) in config.states.iter().enumerate() {
        println!("  {}. {} for {}", index + 1, state.color, state.duration);
    }

    if !problems.is_empty() {
        println!();
        println!("Problems:");
        for problem in &problems {
            println!("  - {problem}");
        }
    }
    Ok(())
}
