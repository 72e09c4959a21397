//! RGB color values with the lamp's 12-bit channel range.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LumicycleError, Result};

/// Exclusive upper bound for a single color channel.
pub const CHANNEL_LIMIT: u16 = 4096;

/// One lamp color. Channels are independent and valid in `0..CHANNEL_LIMIT`.
///
/// Equality is exact per channel; the lamp reports colors in the same
/// resolution it accepts, so no tolerance is applied anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

impl Color {
    pub const fn new(red: u16, green: u16, blue: u16) -> Self {
        Color { red, green, blue }
    }

    /// Whether every channel is below [`CHANNEL_LIMIT`].
    pub fn in_range(&self) -> bool {
        self.red < CHANNEL_LIMIT && self.green < CHANNEL_LIMIT && self.blue < CHANNEL_LIMIT
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.red, self.green, self.blue)
    }
}

/// Parse a color given as decimal channels, e.g. `"2048,1024,96"`.
///
/// Whitespace around each channel is tolerated. Channels outside
/// `0..CHANNEL_LIMIT` are rejected.
pub fn parse_color(s: &str) -> Result<Color> {
    let bad = |detail: &str| {
        LumicycleError::Color(format!("invalid color \"{s}\": {detail} (use \"R,G,B\", each 0-4095)"))
    };

    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        return Err(bad("expected three comma-separated channels"));
    }
    let mut channels = [0u16; 3];
    for (slot, part) in channels.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse()
            .map_err(|_| bad(&format!("\"{}\" is not a channel value", part.trim())))?;
    }
    let color = Color::new(channels[0], channels[1], channels[2]);
    if !color.in_range() {
        return Err(bad("channels must be below 4096"));
    }
    Ok(color)
}
