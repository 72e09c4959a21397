//! JSON command frames exchanged with the lamp.
//!
//! Exactly two outbound commands exist: a color read and a color write.
//! Replies carry no correlation id; pairing a reply with its request is the
//! channel layer's job. Reply payloads are opaque JSON except for the get
//! reply, whose `data.color` object is the only consumed part.

use serde::Deserialize;
use serde_json::json;

use crate::color::Color;

/// `type` field of every outbound frame.
pub const FRAME_TYPE_COMMAND: &str = "command";
/// `msg` value of a color read.
pub const MSG_GET: &str = "get";
/// `msg` value of a color write.
pub const MSG_SET: &str = "set";

/// Build the color read command: `{"type":"command","msg":"get"}`.
pub fn get_request() -> String {
    json!({ "type": FRAME_TYPE_COMMAND, "msg": MSG_GET }).to_string()
}

/// Build a color write command carrying the target color and a fade time
/// in milliseconds.
pub fn set_request(color: Color, fade_time_ms: u64) -> String {
    json!({
        "type": FRAME_TYPE_COMMAND,
        "msg": MSG_SET,
        "data": { "color": color, "fade_time": fade_time_ms },
    })
    .to_string()
}

#[derive(Debug, Deserialize)]
struct GetReply {
    data: ReplyData,
}

#[derive(Debug, Deserialize)]
struct ReplyData {
    color: Color,
}

/// Extract `data.color` from a get reply. Unknown sibling fields are
/// ignored; a missing or malformed color object is an error.
pub fn parse_color_reply(raw: &str) -> std::result::Result<Color, String> {
    let reply: GetReply =
        serde_json::from_str(raw).map_err(|e| format!("unexpected reply shape: {e}"))?;
    Ok(reply.data.color)
}
