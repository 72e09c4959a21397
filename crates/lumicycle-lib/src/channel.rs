//! Request/reply channel over a transport that has no correlation ids.
//!
//! A command is one send followed by the next inbound message, whatever it
//! is, bounded by a deadline. That only works while exchanges never overlap;
//! every helper here takes the connection by `&mut`, so overlap on a single
//! connection is unrepresentable. Late replies from a timed-out exchange are
//! drained away before the next send instead of being mistaken for answers.

use std::fmt;
use std::time::Duration;

use tokio::time;

use crate::color::Color;
use crate::protocol;
use crate::transport::{Transport, TransportError};

// ── Error type ──

/// Errors from a single command exchange.
#[derive(Debug)]
pub enum ChannelError {
    /// No reply arrived within the deadline.
    TimedOut,
    /// A reply arrived but could not be interpreted.
    BadReply(String),
    /// The underlying connection failed.
    Transport(TransportError),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::TimedOut => write!(f, "timed out waiting for message reply"),
            ChannelError::BadReply(e) => write!(f, "unusable reply: {e}"),
            ChannelError::Transport(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ChannelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChannelError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for ChannelError {
    fn from(e: TransportError) -> Self {
        ChannelError::Transport(e)
    }
}

/// Convenience alias for channel results.
pub type Result<T> = std::result::Result<T, ChannelError>;

// ── Commands ──

/// Command helpers bound to a reply deadline.
///
/// The get and set helpers retry exactly once after a timeout; a second
/// timeout, and every other failure, propagates to the caller.
#[derive(Debug, Clone, Copy)]
pub struct Channel {
    reply_timeout: Duration,
}

impl Channel {
    pub fn new(reply_timeout: Duration) -> Self {
        Channel { reply_timeout }
    }

    pub fn reply_timeout(&self) -> Duration {
        self.reply_timeout
    }

    /// Send one payload and wait for the next inbound message.
    ///
    /// Whatever arrives first within the deadline is the reply. On timeout
    /// nothing keeps listening; an answer that shows up later sits in the
    /// socket buffer until the next exchange drains it.
    pub async fn exchange<T: Transport>(&self, conn: &mut T, payload: &str) -> Result<String> {
        let stale = conn.drain();
        if stale > 0 {
            log::debug!("discarded {stale} stale message(s) before send");
        }
        conn.send(payload).await?;
        match time::timeout(self.reply_timeout, conn.recv()).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => Err(ChannelError::Transport(e)),
            Err(_) => Err(ChannelError::TimedOut),
        }
    }

    /// Read the lamp's current color.
    pub async fn get_color<T: Transport>(&self, conn: &mut T) -> Result<Color> {
        let reply = self.exchange_with_retry(conn, &protocol::get_request()).await?;
        protocol::parse_color_reply(&reply).map_err(ChannelError::BadReply)
    }

    /// Set the lamp's color with the given fade time.
    pub async fn set_color<T: Transport>(
        &self,
        conn: &mut T,
        color: Color,
        fade_time_ms: u64,
    ) -> Result<()> {
        self.exchange_with_retry(conn, &protocol::set_request(color, fade_time_ms))
            .await?;
        Ok(())
    }

    async fn exchange_with_retry<T: Transport>(&self, conn: &mut T, payload: &str) -> Result<String> {
        match self.exchange(conn, payload).await {
            Err(ChannelError::TimedOut) => {
                log::warn!("timed out waiting for message reply, retrying...");
                self.exchange(conn, payload).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use tokio::time::Instant;

    const TIMEOUT: Duration = Duration::from_millis(2_000);

    fn channel() -> Channel {
        Channel::new(TIMEOUT)
    }

    fn get_reply(r: u16, g: u16, b: u16) -> String {
        format!(r#"{{"data":{{"color":{{"red":{r},"green":{g},"blue":{b}}}}}}}"#)
    }

    // ── exchange ──

    #[tokio::test(start_paused = true)]
    async fn exchange_returns_first_reply() {
        let mut conn = MockTransport::new();
        conn.add_reply("pong");
        let reply = channel().exchange(&mut conn, "ping").await.unwrap();
        assert_eq!(reply, "pong");
        assert_eq!(conn.sent, vec!["ping"]);
    }

    #[tokio::test(start_paused = true)]
    async fn exchange_times_out_after_deadline() {
        let mut conn = MockTransport::new();
        conn.add_silence();
        let start = Instant::now();
        let err = channel().exchange(&mut conn, "ping").await.unwrap_err();
        assert!(matches!(err, ChannelError::TimedOut));
        assert_eq!(start.elapsed(), TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn exchange_drains_stale_messages_before_sending() {
        let mut conn = MockTransport::new();
        conn.add_stale("late answer from before");
        conn.add_reply("fresh");
        let reply = channel().exchange(&mut conn, "ping").await.unwrap();
        assert_eq!(reply, "fresh");
    }

    #[tokio::test(start_paused = true)]
    async fn exchange_usable_again_after_timeout() {
        let mut conn = MockTransport::new();
        conn.add_silence();
        conn.add_reply("second time lucky");
        let ch = channel();
        assert!(matches!(ch.exchange(&mut conn, "a").await, Err(ChannelError::TimedOut)));
        assert_eq!(ch.exchange(&mut conn, "b").await.unwrap(), "second time lucky");
        assert_eq!(conn.sent, vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn exchange_surfaces_send_failure() {
        let mut conn = MockTransport::new();
        conn.fail_next_send("broken pipe");
        let err = channel().exchange(&mut conn, "ping").await.unwrap_err();
        assert!(matches!(err, ChannelError::Transport(TransportError::SendFailed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn exchange_surfaces_close_during_wait() {
        let mut conn = MockTransport::new();
        conn.add_close(1006, "");
        let err = channel().exchange(&mut conn, "ping").await.unwrap_err();
        assert!(matches!(
            err,
            ChannelError::Transport(TransportError::Closed { code: Some(1006), .. })
        ));
    }

    // ── get_color ──

    #[tokio::test(start_paused = true)]
    async fn get_color_parses_reply() {
        let mut conn = MockTransport::new();
        conn.add_reply(get_reply(10, 20, 30));
        let color = channel().get_color(&mut conn).await.unwrap();
        assert_eq!(color, Color::new(10, 20, 30));
        let frames = conn.sent_json();
        assert_eq!(frames[0]["msg"], "get");
    }

    #[tokio::test(start_paused = true)]
    async fn get_color_rejects_malformed_reply() {
        let mut conn = MockTransport::new();
        conn.add_reply("not json");
        let err = channel().get_color(&mut conn).await.unwrap_err();
        assert!(matches!(err, ChannelError::BadReply(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn get_color_retries_once_after_timeout() {
        let mut conn = MockTransport::new();
        conn.add_silence();
        conn.add_reply(get_reply(1, 2, 3));
        let color = channel().get_color(&mut conn).await.unwrap();
        assert_eq!(color, Color::new(1, 2, 3));
        assert_eq!(conn.sent.len(), 2, "timeout then retry is exactly two sends");
    }

    #[tokio::test(start_paused = true)]
    async fn get_color_gives_up_after_second_timeout() {
        let mut conn = MockTransport::new();
        conn.add_silence();
        conn.add_silence();
        let start = Instant::now();
        let err = channel().get_color(&mut conn).await.unwrap_err();
        assert!(matches!(err, ChannelError::TimedOut));
        assert_eq!(conn.sent.len(), 2);
        assert_eq!(start.elapsed(), TIMEOUT * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn get_color_does_not_retry_transport_errors() {
        let mut conn = MockTransport::new();
        conn.add_reply_error("reset by peer");
        let err = channel().get_color(&mut conn).await.unwrap_err();
        assert!(matches!(err, ChannelError::Transport(_)));
        assert_eq!(conn.sent.len(), 1, "only timeouts are retried");
    }

    // ── set_color ──

    #[tokio::test(start_paused = true)]
    async fn set_color_sends_color_and_fade() {
        let mut conn = MockTransport::new();
        conn.add_reply("{}");
        channel().set_color(&mut conn, Color::new(7, 8, 9), 1500).await.unwrap();
        let frames = conn.sent_json();
        assert_eq!(frames[0]["msg"], "set");
        assert_eq!(frames[0]["data"]["color"]["red"], 7);
        assert_eq!(frames[0]["data"]["fade_time"], 1500);
    }

    #[tokio::test(start_paused = true)]
    async fn set_color_retry_repeats_identical_payload() {
        let mut conn = MockTransport::new();
        conn.add_silence();
        conn.add_reply("{}");
        channel().set_color(&mut conn, Color::new(7, 8, 9), 1500).await.unwrap();
        assert_eq!(conn.sent.len(), 2);
        assert_eq!(conn.sent[0], conn.sent[1]);
    }

    // ── Error display ──

    #[test]
    fn timeout_display_matches_log_vocabulary() {
        assert_eq!(ChannelError::TimedOut.to_string(), "timed out waiting for message reply");
    }
}
