//! Unified error type for the lumicycle-lib crate.

use std::fmt;

use crate::channel::ChannelError;
use crate::transport::TransportError;

/// Errors that can occur across the crate.
#[derive(Debug)]
pub enum LumicycleError {
    /// Connection-level failure (connect, send, receive, close).
    Transport(TransportError),
    /// Command exchange failure (timeout, unusable reply).
    Channel(ChannelError),
    /// Standard I/O error.
    Io(std::io::Error),
    /// Configuration load or validation failure.
    Config(String),
    /// Color parsing failure.
    Color(String),
    /// Schedule construction failure.
    Schedule(String),
}

impl fmt::Display for LumicycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LumicycleError::Transport(e) => write!(f, "Transport error: {e}"),
            LumicycleError::Channel(e) => write!(f, "Channel error: {e}"),
            LumicycleError::Io(e) => write!(f, "I/O error: {e}"),
            LumicycleError::Config(e) => write!(f, "Config error: {e}"),
            LumicycleError::Color(e) => write!(f, "Color error: {e}"),
            LumicycleError::Schedule(e) => write!(f, "Schedule error: {e}"),
        }
    }
}

impl std::error::Error for LumicycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LumicycleError::Transport(e) => Some(e),
            LumicycleError::Channel(e) => Some(e),
            LumicycleError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for LumicycleError {
    fn from(e: TransportError) -> Self {
        LumicycleError::Transport(e)
    }
}

impl From<ChannelError> for LumicycleError {
    fn from(e: ChannelError) -> Self {
        LumicycleError::Channel(e)
    }
}

impl From<std::io::Error> for LumicycleError {
    fn from(e: std::io::Error) -> Self {
        LumicycleError::Io(e)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LumicycleError>;
