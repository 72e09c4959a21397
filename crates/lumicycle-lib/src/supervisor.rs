//! Connection supervisor: the connect, session, reconnect cycle.
//!
//! One session per connection. While a session runs, two triggers share the
//! connection: the periodic reconciliation check and the schedule advancement
//! deadline. Both run through the same `&mut` borrow, so their exchanges can
//! never interleave. A close or transport failure ends the session; after a
//! fixed delay a new connection is attempted, forever. The schedule cursor
//! lives outside the session and survives reconnects.

use std::future::Future;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::channel::{Channel, ChannelError};
use crate::config::Config;
use crate::error::Result;
use crate::schedule::{ReconcileAction, Schedule};
use crate::transport::{self, Transport, TransportError, WsTransport};

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The peer closed the connection.
    Closed { code: Option<u16>, reason: String },
    /// The connection failed mid-session.
    Failed(String),
    /// Shutdown was requested.
    Cancelled,
}

/// Keeps one lamp on its schedule for as long as the process runs.
pub struct Supervisor {
    config: Config,
    channel: Channel,
    schedule: Schedule,
}

impl Supervisor {
    pub fn new(config: Config) -> Result<Self> {
        let schedule = Schedule::from_entries(&config.states)?;
        let channel = Channel::new(Duration::from_millis(config.reply_timeout));
        Ok(Supervisor { config, channel, schedule })
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Connect over WebSocket and run until `shutdown` fires.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        let url = self.config.url.clone();
        self.run_with(
            move || {
                let url = url.clone();
                async move { WsTransport::connect(&url).await }
            },
            shutdown,
        )
        .await;
    }

    /// [`run`] with a pluggable connector.
    ///
    /// Every connection attempt calls `connect` again. Failed attempts and
    /// ended sessions both wait out the configured reconnect interval before
    /// the next attempt; there is no backoff and no attempt limit.
    ///
    /// [`run`]: Supervisor::run
    pub async fn run_with<T, C, Fut>(&mut self, mut connect: C, shutdown: CancellationToken)
    where
        T: Transport,
        C: FnMut() -> Fut,
        Fut: Future<Output = transport::Result<T>>,
    {
        let reconnect_delay = Duration::from_millis(self.config.reconnect_interval);
        let mut failures: u32 = 0;
        loop {
            if shutdown.is_cancelled() {
                return;
            }
            let attempt = tokio::select! {
                result = connect() => result,
                _ = shutdown.cancelled() => return,
            };
            match attempt {
                Ok(mut conn) => {
                    failures = 0;
                    log::info!("connected to {}", self.config.url);
                    match self.run_session(&mut conn, &shutdown).await {
                        SessionEnd::Cancelled => return,
                        SessionEnd::Closed { code, reason } => {
                            let code = code.map_or_else(|| "none".to_owned(), |c| c.to_string());
                            log::error!("connection closed, code: {code}, reason: \"{reason}\"");
                        }
                        SessionEnd::Failed(detail) => log::error!("connection lost: {detail}"),
                    }
                }
                Err(e) => {
                    failures += 1;
                    log::error!("connect failed: {e} (attempt {failures})");
                }
            }
            tokio::select! {
                _ = time::sleep(reconnect_delay) => {}
                _ = shutdown.cancelled() => return,
            }
            log::info!("reconnecting...");
        }
    }

    /// Drive one connection until it closes, fails, or shutdown is requested.
    ///
    /// A fresh session starts with an advancement and applies the new entry
    /// immediately, then runs a first reconciliation pass. After that the
    /// check interval and the advancement deadline interleave. The deadline
    /// restarts from "now" each time an advancement finishes, so slow
    /// exchanges stretch individual steps but never stack up.
    pub async fn run_session<T: Transport>(
        &mut self,
        conn: &mut T,
        shutdown: &CancellationToken,
    ) -> SessionEnd {
        let check_interval = Duration::from_millis(self.config.check_interval);

        if let Some(end) = self.advance_state(conn).await {
            return end;
        }
        let mut next_advance = Instant::now() + self.schedule.current_hold();
        if let Some(end) = self.reconcile(conn).await {
            return end;
        }

        let mut check = time::interval_at(Instant::now() + check_interval, check_interval);
        check.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return SessionEnd::Cancelled,
                _ = time::sleep_until(next_advance) => {
                    if let Some(end) = self.advance_state(conn).await {
                        return end;
                    }
                    next_advance = Instant::now() + self.schedule.current_hold();
                }
                _ = check.tick() => {
                    if let Some(end) = self.reconcile(conn).await {
                        return end;
                    }
                }
                end = wait_for_close(conn) => return end,
            }
        }
    }

    /// One advancement: move the cursor and apply the new entry's color.
    ///
    /// The set is unconditional. If it fails the cursor stays moved and the
    /// next deadline is still scheduled; the periodic check will correct the
    /// lamp once it answers again.
    async fn advance_state<T: Transport>(&mut self, conn: &mut T) -> Option<SessionEnd> {
        let state = self.schedule.advance();
        let (target, label) = (state.color, state.label.clone());
        log::info!("state change: {target} for {label}");
        let fade = self.config.state_transition_fade_time;
        match self.channel.set_color(conn, target, fade).await {
            Ok(()) => None,
            Err(e) => self.command_failure("state change failed", e),
        }
    }

    /// One reconciliation pass: read the lamp, compare, correct if needed.
    async fn reconcile<T: Transport>(&mut self, conn: &mut T) -> Option<SessionEnd> {
        log::debug!("requesting color...");
        let observed = match self.channel.get_color(conn).await {
            Ok(color) => color,
            Err(e) => return self.command_failure("color check failed", e),
        };
        match self.schedule.reconcile(observed) {
            // No target before the opening advancement; nothing to compare.
            None => None,
            Some(ReconcileAction::InSync) => {
                log::info!("correct color is already active");
                None
            }
            Some(ReconcileAction::Apply(target)) => {
                log::info!("setting color to {target}...");
                let fade = self.config.state_transition_fade_time;
                match self.channel.set_color(conn, target, fade).await {
                    Ok(()) => {
                        log::info!("color set");
                        None
                    }
                    Err(e) => self.command_failure("color correction failed", e),
                }
            }
        }
    }

    /// Log a failed command. Transport-level failures end the session; a
    /// timeout or an unusable reply leaves it running for the next trigger.
    fn command_failure(&self, what: &str, err: ChannelError) -> Option<SessionEnd> {
        match err {
            ChannelError::Transport(TransportError::Closed { code, reason }) => {
                Some(SessionEnd::Closed { code, reason })
            }
            ChannelError::Transport(e) => Some(SessionEnd::Failed(e.to_string())),
            e => {
                log::error!("{what}: {e}");
                None
            }
        }
    }
}

/// Listen for inbound traffic while no exchange is pending.
///
/// The lamp only speaks when spoken to, so anything that arrives here is
/// either a stale reply or noise; it is dropped. Resolves only when the
/// connection closes or fails.
async fn wait_for_close<T: Transport>(conn: &mut T) -> SessionEnd {
    loop {
        match conn.recv().await {
            Ok(unsolicited) => log::debug!("ignoring unsolicited message: {unsolicited}"),
            Err(TransportError::Closed { code, reason }) => {
                return SessionEnd::Closed { code, reason };
            }
            Err(e) => return SessionEnd::Failed(e.to_string()),
        }
    }
}
