//! Daemon configuration: TOML file, strict schema, startup validation.
//!
//! Every field is required. A file that fails to parse or validate is fatal
//! at startup, before any connection attempt; there are no defaults to fall
//! back on, because a half-configured daemon would quietly drive the lamp
//! wrong for hours before anyone noticed.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color::CHANNEL_LIMIT;
use crate::error::{LumicycleError, Result};
use crate::schedule::{self, ScheduleEntry};

const CONFIG_HEADER: &str = "\
# lumicycle configuration
#
# Nothing is reloaded at runtime; restart the daemon after editing this file.
";

/// Complete daemon configuration. All fields required, all times in
/// milliseconds except the schedule durations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// WebSocket endpoint of the lamp, e.g. `ws://lamp.local:8765`.
    pub url: String,
    /// Time between reconciliation passes while connected.
    pub check_interval: u64,
    /// Time to wait after a connection ends before reconnecting.
    pub reconnect_interval: u64,
    /// Time to wait for a command reply before retrying.
    pub reply_timeout: u64,
    /// Fade time sent with every color write.
    pub state_transition_fade_time: u64,
    /// Ordered cyclic schedule. Must not be empty.
    pub states: Vec<ScheduleEntry>,
}

/// One reason a configuration is unusable.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// `url` is not a WebSocket endpoint.
    InvalidUrl { reason: String },
    /// A field that drives a timer is zero.
    ZeroInterval { field: &'static str },
    /// `states` is empty.
    NoStates,
    /// `states[index].duration` is not a usable `"H:MM:SS"` string.
    InvalidDuration { index: usize, reason: String },
    /// A color channel in `states[index]` is outside `0..4096`.
    ChannelOutOfRange { index: usize, channel: &'static str, value: u16 },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidUrl { reason } => write!(f, "url: {reason}"),
            ValidationError::ZeroInterval { field } => {
                write!(f, "{field}: must be greater than zero")
            }
            ValidationError::NoStates => write!(f, "states: must contain at least one entry"),
            ValidationError::InvalidDuration { index, reason } => {
                write!(f, "states[{index}].duration: {reason}")
            }
            ValidationError::ChannelOutOfRange { index, channel, value } => {
                write!(f, "states[{index}].color.{channel}: {value} is out of range (0-4095)")
            }
        }
    }
}

impl Config {
    /// Directory holding the configuration file, if the platform has one.
    pub fn dir() -> Option<PathBuf> {
        dirs::config_dir().map(|base| base.join("lumicycle"))
    }

    /// Default configuration file path.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|dir| dir.join("config.toml"))
    }

    /// Read and parse a configuration file. Parse failures name the file
    /// and, through the TOML error, the offending field.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LumicycleError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&contents).map_err(|e| {
            LumicycleError::Config(format!("cannot parse {}: {e}", path.display()))
        })
    }

    /// Write this configuration to `path`, creating parent directories.
    /// Uses a temp file and rename where the filesystem allows it.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let body = toml::to_string_pretty(self)
            .map_err(|e| LumicycleError::Config(format!("cannot serialize config: {e}")))?;
        let contents = format!("{CONFIG_HEADER}\n{body}");
        let tmp = path.with_extension("toml.tmp");
        match std::fs::write(&tmp, &contents) {
            Ok(()) => {
                std::fs::rename(&tmp, path)?;
                Ok(())
            }
            Err(_) => {
                std::fs::write(path, &contents)?;
                Ok(())
            }
        }
    }

    /// Check every constraint, collecting all violations in field order
    /// rather than stopping at the first.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            errors.push(ValidationError::InvalidUrl {
                reason: format!("expected a ws:// or wss:// endpoint, got \"{}\"", self.url),
            });
        }
        for (field, value) in [
            ("check_interval", self.check_interval),
            ("reconnect_interval", self.reconnect_interval),
            ("reply_timeout", self.reply_timeout),
        ] {
            if value == 0 {
                errors.push(ValidationError::ZeroInterval { field });
            }
        }
        if self.states.is_empty() {
            errors.push(ValidationError::NoStates);
        }
        for (index, state) in self.states.iter().enumerate() {
            if let Err(reason) = schedule::parse_duration(&state.duration) {
                errors.push(ValidationError::InvalidDuration { index, reason });
            }
            for (channel, value) in [
                ("red", state.color.red),
                ("green", state.color.green),
                ("blue", state.color.blue),
            ] {
                if value >= CHANNEL_LIMIT {
                    errors.push(ValidationError::ChannelOutOfRange { index, channel, value });
                }
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Starter configuration written by `lumicycle config --init`.
    /// The schedule sums to a full day.
    pub fn example() -> Self {
        use crate::color::Color;
        Config {
            url: "ws://lamp.local:8765".into(),
            check_interval: 60_000,
            reconnect_interval: 10_000,
            reply_timeout: 2_000,
            state_transition_fade_time: 3_000,
            states: vec![
                ScheduleEntry {
                    duration: "12:00:00".into(),
                    color: Color::new(3200, 2400, 1600),
                },
                ScheduleEntry {
                    duration: "8:00:00".into(),
                    color: Color::new(2000, 1200, 600),
                },
                ScheduleEntry {
                    duration: "4:00:00".into(),
                    color: Color::new(800, 200, 100),
                },
            ],
        }
    }
}
