//! lumicycle-lib: keeps a WebSocket-connected lamp on a cyclic color schedule.

pub mod channel;
pub mod color;
pub mod config;
pub mod error;
pub mod protocol;
pub mod schedule;
pub mod supervisor;
pub mod transport;

pub use error::LumicycleError;
