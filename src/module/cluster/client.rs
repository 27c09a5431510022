///! DX cluster client: the connection state machine.
///!
///! Owns a ranked endpoint ring and a transport, and drives the
///! Disconnected → Connecting → LoggingIn → Active cycle with reconnect
///! backoff and failover. Nothing here is fatal: the client retries until
///! the stop signal flips or the resource budget is exhausted.

use anyhow::Result;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use super::endpoints::{Endpoint, EndpointRing};
use super::failover::{FailoverPolicy, ReconnectPlan};
use super::login;
use super::transport::{ClusterTransport, ReadOutcome, TcpTransport, TransportError};
use crate::module::pipeline::{ResourceBudget, SpotPipeline, SpotSink};
use crate::module::spot::SpotLineParser;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const LOGIN_WINDOW: Duration = Duration::from_secs(30);
const READ_POLL: Duration = Duration::from_secs(1);
const IDLE_THRESHOLD: Duration = Duration::from_secs(120);

/// Sent once after login, best-effort: enable skimmer spots and ask for
/// recent history so a fresh connection starts with data.
const POST_LOGIN_COMMANDS: [&str; 2] = ["SET/SKIMMER", "sh/dx 100"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    LoggingIn,
    Active,
    Reconnecting,
    Failover,
}

pub struct ClusterClient<T: ClusterTransport> {
    transport: T,
    endpoints: EndpointRing,
    callsign: String,
    policy: FailoverPolicy,
    parser: SpotLineParser,
    state: ConnectionState,
    /// Partial line carried over between read chunks.
    pending: String,
}

impl ClusterClient<TcpTransport> {
    pub fn new(endpoints: EndpointRing, callsign: String) -> Self {
        Self::with_transport(TcpTransport::new(), endpoints, callsign)
    }
}

impl<T: ClusterTransport> ClusterClient<T> {
    pub fn with_transport(transport: T, endpoints: EndpointRing, callsign: String) -> Self {
        Self {
            transport,
            endpoints,
            callsign,
            policy: FailoverPolicy::new(),
            parser: SpotLineParser::new(),
            state: ConnectionState::Disconnected,
            pending: String::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn current_endpoint(&self) -> &Endpoint {
        self.endpoints.current()
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            tracing::debug!("Connection state: {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Collect spots until stopped or out of budget. Never returns an
    /// error for feed trouble; only sink failures bubble up through the
    /// pipeline's logging.
    pub async fn run<S: SpotSink>(
        &mut self,
        pipeline: &mut SpotPipeline<S>,
        budget: &ResourceBudget,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let mut last_data = Instant::now();
        self.set_state(ConnectionState::Connecting);

        loop {
            if *shutdown.borrow() {
                tracing::info!("Stop requested, shutting down cluster client");
                break;
            }
            if let Some(reason) = budget.exceeded() {
                tracing::info!("{}, shutting down cluster client", reason);
                break;
            }

            match self.state {
                ConnectionState::Active => {
                    self.poll_active(pipeline, &mut last_data, &mut shutdown)
                        .await;
                }
                _ => {
                    if self.establish().await {
                        last_data = Instant::now();
                    } else {
                        let delay = self.policy.next_backoff();
                        tracing::warn!("All clusters failed, retrying in {:?}", delay);
                        self.set_state(ConnectionState::Reconnecting);
                        if interruptible_sleep(delay, &mut shutdown).await {
                            break;
                        }
                        self.set_state(ConnectionState::Connecting);
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk the endpoint ring once, starting at the current position.
    /// Returns true once connected and logged in (confirmed or implicit);
    /// the endpoint that worked is promoted to primary.
    async fn establish(&mut self) -> bool {
        for _ in 0..self.endpoints.len() {
            let endpoint = self.endpoints.current().clone();
            self.set_state(ConnectionState::Connecting);
            tracing::info!("Connecting to cluster {}", endpoint);

            match self.transport.connect(&endpoint, CONNECT_TIMEOUT).await {
                Ok(()) => match self.login().await {
                    Ok(confirmed) => {
                        self.endpoints.promote_current();
                        self.policy.reset_backoff();
                        if confirmed {
                            self.policy.record_login_success();
                        }
                        self.pending.clear();
                        return true;
                    }
                    Err(e) => {
                        tracing::warn!("Login to {} failed: {}", endpoint, e);
                        self.transport.disconnect();
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to connect to {}: {}", endpoint, e);
                }
            }
            self.endpoints.advance();
        }

        tracing::error!("All clusters failed to connect");
        false
    }

    /// Login handshake: answer prompts with the configured callsign inside
    /// a bounded window. Returns whether the login was explicitly
    /// confirmed; a silent window is treated as implicit success (a
    /// heuristic - a mute server is indistinguishable from an agreeable
    /// one).
    async fn login(&mut self) -> Result<bool, TransportError> {
        self.set_state(ConnectionState::LoggingIn);
        let deadline = Instant::now() + LOGIN_WINDOW;
        let mut confirmed = false;
        let mut sent_unprompted = false;

        'window: while Instant::now() < deadline {
            match self.transport.read_chunk(READ_POLL).await? {
                ReadOutcome::Data(chunk) => {
                    for line in chunk.lines() {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        tracing::info!("Cluster: {}", line);
                        if login::is_login_prompt(line) {
                            tracing::info!(
                                "Detected login prompt, sending callsign {}",
                                self.callsign
                            );
                            self.transport.send_line(&self.callsign).await?;
                        }
                        if login::is_login_success(line) {
                            confirmed = true;
                            break 'window;
                        }
                    }
                }
                ReadOutcome::Idle => {
                    // Some clusters never prompt; offer the callsign once.
                    if !sent_unprompted {
                        tracing::info!("No prompt received, sending callsign {}", self.callsign);
                        self.transport.send_line(&self.callsign).await?;
                        sent_unprompted = true;
                    }
                }
                ReadOutcome::Closed => return Err(TransportError::NotConnected),
            }
        }

        if confirmed {
            tracing::info!("Logged in to {}", self.endpoints.current());
        } else {
            tracing::warn!(
                "No login confirmation within {:?}, continuing anyway",
                LOGIN_WINDOW
            );
        }
        self.set_state(ConnectionState::Active);

        for command in POST_LOGIN_COMMANDS {
            if let Err(e) = self.transport.send_line(command).await {
                tracing::warn!("Failed to send {} command: {}", command, e);
            }
        }

        Ok(confirmed)
    }

    /// One Active-state poll: hand received lines to the parser, keep the
    /// connection alive when idle, and decide reconnect vs failover on
    /// drops.
    async fn poll_active<S: SpotSink>(
        &mut self,
        pipeline: &mut SpotPipeline<S>,
        last_data: &mut Instant,
        shutdown: &mut watch::Receiver<bool>,
    ) {
        match self.transport.read_chunk(READ_POLL).await {
            Ok(ReadOutcome::Data(chunk)) => {
                *last_data = Instant::now();
                self.pending.push_str(&chunk);
                while let Some(pos) = self.pending.find('\n') {
                    let line: String = self.pending.drain(..=pos).collect();
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    tracing::debug!("Received line: {}", line);
                    if let Some(spot) = self.parser.parse(line) {
                        if let Err(e) = pipeline.ingest(spot) {
                            tracing::error!("Failed to record spot: {e:#}");
                        }
                    }
                }
            }
            Ok(ReadOutcome::Idle) => {
                if last_data.elapsed() >= IDLE_THRESHOLD {
                    tracing::warn!(
                        "No data received for {:?}, sending keepalive",
                        IDLE_THRESHOLD
                    );
                    if let Err(e) = self.send_keepalive().await {
                        tracing::warn!("Keepalive failed ({}), reconnecting", e);
                        self.backoff_then_reconnect(shutdown).await;
                    }
                    *last_data = Instant::now();
                }
            }
            Ok(ReadOutcome::Closed) => {
                self.transport.disconnect();
                self.set_state(ConnectionState::Reconnecting);
                match self.policy.record_disconnect() {
                    ReconnectPlan::RetrySame(delay) => {
                        tracing::warn!(
                            "Connection closed by cluster, reconnecting in {:?} (attempt {})",
                            delay,
                            self.policy.consecutive_disconnects()
                        );
                        if !interruptible_sleep(delay, shutdown).await {
                            self.set_state(ConnectionState::Connecting);
                        }
                    }
                    ReconnectPlan::Failover => {
                        self.set_state(ConnectionState::Failover);
                        let next = self.endpoints.advance().clone();
                        tracing::warn!(
                            "Too many consecutive disconnections, switching to backup cluster {}",
                            next
                        );
                        self.set_state(ConnectionState::Connecting);
                    }
                }
            }
            Err(e) => {
                tracing::error!("Socket error: {}", e);
                self.transport.disconnect();
                self.backoff_then_reconnect(shutdown).await;
            }
        }
    }

    async fn backoff_then_reconnect(&mut self, shutdown: &mut watch::Receiver<bool>) {
        self.set_state(ConnectionState::Reconnecting);
        let delay = self.policy.next_backoff();
        if !interruptible_sleep(delay, shutdown).await {
            self.set_state(ConnectionState::Connecting);
        }
    }

    async fn send_keepalive(&mut self) -> Result<(), TransportError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let command = login::keepalive_command(now);
        if command.is_empty() {
            return Ok(());
        }
        tracing::debug!("Sending keepalive: {:?}", command);
        self.transport.send_line(command).await
    }
}

/// Sleep that yields early when the stop signal flips. Returns true when
/// interrupted.
async fn interruptible_sleep(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = shutdown.changed() => true,
    }
}
