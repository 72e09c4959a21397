//! Lamp connection: the transport trait, its WebSocket backend, and a
//! scripted mock.
//!
//! The trait surface is deliberately narrow. Everything above it works in
//! text messages; framing, TLS and close handshakes stay in here.

use std::fmt;

use futures_util::{FutureExt, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

// ── Error type ──

/// Connection-level errors. String payloads follow "context: details".
#[derive(Debug)]
pub enum TransportError {
    /// The connection attempt failed before the socket opened.
    ConnectFailed(String),
    /// A send failed on an established connection.
    SendFailed(String),
    /// A receive failed on an established connection.
    RecvFailed(String),
    /// The peer closed the connection. Code and reason come from the close
    /// frame when one was received.
    Closed { code: Option<u16>, reason: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::ConnectFailed(e) => write!(f, "connect failed: {e}"),
            TransportError::SendFailed(e) => write!(f, "send failed: {e}"),
            TransportError::RecvFailed(e) => write!(f, "receive failed: {e}"),
            TransportError::Closed { code: Some(code), reason } => {
                write!(f, "connection closed, code: {code}, reason: \"{reason}\"")
            }
            TransportError::Closed { code: None, .. } => {
                write!(f, "connection closed")
            }
        }
    }
}

impl std::error::Error for TransportError {}

/// Convenience alias for transport results.
pub type Result<T> = std::result::Result<T, TransportError>;

// ── Trait ──

/// A duplex text-message connection to the lamp.
///
/// All methods take `&mut self`, so one connection supports at most one
/// in-flight operation at a time. The reply protocol has no correlation
/// ids and depends on exactly that.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Send one text message.
    async fn send(&mut self, text: &str) -> Result<()>;

    /// Receive the next text message. A close frame or end of stream
    /// surfaces as [`TransportError::Closed`].
    async fn recv(&mut self) -> Result<String>;

    /// Discard inbound text messages that are already buffered, without
    /// waiting for new ones. Returns how many were dropped.
    fn drain(&mut self) -> usize;
}

// ── WebSocket backend ──

/// [`Transport`] over a WebSocket connection.
pub struct WsTransport {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsTransport {
    /// Open a connection to a `ws://` or `wss://` endpoint.
    pub async fn connect(url: &str) -> Result<Self> {
        let (ws, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectFailed(format!("{url}: {e}")))?;
        Ok(WsTransport { ws })
    }
}

impl Transport for WsTransport {
    async fn send(&mut self, text: &str) -> Result<()> {
        self.ws
            .send(Message::Text(text.to_owned()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn recv(&mut self) -> Result<String> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Close(frame))) => return Err(close_error(frame)),
                // Ping, pong and binary frames are not part of the protocol.
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(TransportError::RecvFailed(e.to_string())),
                None => return Err(TransportError::Closed { code: None, reason: String::new() }),
            }
        }
    }

    fn drain(&mut self) -> usize {
        let mut dropped = 0;
        loop {
            match self.ws.next().now_or_never() {
                Some(Some(Ok(Message::Text(_)))) => dropped += 1,
                Some(Some(Ok(_))) => {}
                // Errors and end-of-stream are left for the next recv.
                Some(Some(Err(_))) | Some(None) | None => return dropped,
            }
        }
    }
}

fn close_error(frame: Option<CloseFrame<'static>>) -> TransportError {
    match frame {
        Some(frame) => TransportError::Closed {
            code: Some(u16::from(frame.code)),
            reason: frame.reason.into_owned(),
        },
        None => TransportError::Closed { code: None, reason: String::new() },
    }
}

// ── Mock transport for testing ──

/// Scripted in-memory transport for unit and integration tests.
///
/// Always compiled (zero runtime cost), hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use std::collections::VecDeque;

    use super::{Result, Transport, TransportError};

    #[derive(Debug, Clone)]
    enum Event {
        Text(String),
        Silence,
        Close { code: Option<u16>, reason: String },
        Error(String),
    }

    /// Records every send and replays scripted inbound traffic.
    ///
    /// Replies are consumed one per unanswered send, which mirrors a device
    /// that only speaks when spoken to. Idle events are delivered when no
    /// send is awaiting an answer; with nothing scripted, `recv` never
    /// resolves, like a quiet but healthy connection.
    #[derive(Debug, Default)]
    pub struct MockTransport {
        /// Every payload passed to `send`, in order.
        pub sent: Vec<String>,
        replies: VecDeque<Event>,
        idle: VecDeque<Event>,
        buffered: VecDeque<String>,
        fail_next_send: Option<String>,
        awaiting: usize,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script a reply to the next unanswered send.
        pub fn add_reply(&mut self, text: impl Into<String>) {
            self.replies.push_back(Event::Text(text.into()));
        }

        /// Script one unanswered send: the device stays silent for it.
        pub fn add_silence(&mut self) {
            self.replies.push_back(Event::Silence);
        }

        /// Script a receive failure in place of a reply.
        pub fn add_reply_error(&mut self, detail: impl Into<String>) {
            self.replies.push_back(Event::Error(detail.into()));
        }

        /// Script an unsolicited message, delivered while nothing awaits a
        /// reply.
        pub fn add_idle_message(&mut self, text: impl Into<String>) {
            self.idle.push_back(Event::Text(text.into()));
        }

        /// Script a close frame, delivered once scripted replies are used up.
        pub fn add_close(&mut self, code: u16, reason: impl Into<String>) {
            self.idle.push_back(Event::Close { code: Some(code), reason: reason.into() });
        }

        /// Script a receive failure, delivered once scripted replies are
        /// used up.
        pub fn add_idle_error(&mut self, detail: impl Into<String>) {
            self.idle.push_back(Event::Error(detail.into()));
        }

        /// Pretend `text` is already sitting in the socket buffer.
        pub fn add_stale(&mut self, text: impl Into<String>) {
            self.buffered.push_back(text.into());
        }

        /// Make the next send fail with `detail`.
        pub fn fail_next_send(&mut self, detail: impl Into<String>) {
            self.fail_next_send = Some(detail.into());
        }

        /// Parsed copies of every sent payload, for assertions.
        pub fn sent_json(&self) -> Vec<serde_json::Value> {
            self.sent
                .iter()
                .map(|raw| serde_json::from_str(raw).unwrap())
                .collect()
        }

        /// Synchronous part of a send; the trait method wraps this. Exposed
        /// so tests can put the mock behind shared ownership.
        pub fn record_send(&mut self, text: &str) -> Result<()> {
            if let Some(detail) = self.fail_next_send.take() {
                return Err(TransportError::SendFailed(detail));
            }
            self.sent.push(text.to_owned());
            self.awaiting += 1;
            Ok(())
        }

        /// Synchronous part of a receive: the next scripted outcome, or
        /// `None` when the script says to wait forever.
        pub fn try_recv_scripted(&mut self) -> Option<Result<String>> {
            if let Some(stale) = self.buffered.pop_front() {
                return Some(Ok(stale));
            }
            let event = if self.awaiting > 0 && !self.replies.is_empty() {
                self.awaiting -= 1;
                self.replies.pop_front()
            } else {
                self.idle.pop_front()
            };
            match event {
                Some(Event::Text(text)) => Some(Ok(text)),
                Some(Event::Close { code, reason }) => {
                    Some(Err(TransportError::Closed { code, reason }))
                }
                Some(Event::Error(detail)) => Some(Err(TransportError::RecvFailed(detail))),
                Some(Event::Silence) | None => None,
            }
        }
    }

    impl Transport for MockTransport {
        async fn send(&mut self, text: &str) -> Result<()> {
            self.record_send(text)
        }

        async fn recv(&mut self) -> Result<String> {
            match self.try_recv_scripted() {
                Some(outcome) => outcome,
                None => std::future::pending().await,
            }
        }

        fn drain(&mut self) -> usize {
            let dropped = self.buffered.len();
            self.buffered.clear();
            dropped
        }
    }
}
