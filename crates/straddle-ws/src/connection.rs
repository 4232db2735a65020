//! WebSocket connection manager.
//!
//! Dials the upstream data service, forwards decoded events in arrival
//! order, and reconnects with exponential backoff. Transport lifecycle is
//! reported on the same channel as data, so the consumer sees one ordered
//! stream.

use crate::error::{WsError, WsResult};
use crate::heartbeat::HeartbeatMonitor;
use crate::message::parse_frame;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use straddle_core::InboundEvent;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async_tls_with_config, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket URL of the data service.
    pub url: String,
    /// Maximum consecutive reconnection attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    pub reconnect_base_delay_ms: u64,
    /// Maximum delay for exponential backoff.
    pub reconnect_max_delay_ms: u64,
    /// Upper bound of the random jitter added to each backoff delay.
    pub reconnect_jitter_ms: u64,
    /// Dial timeout (TCP + websocket handshake).
    pub connect_timeout_ms: u64,
    /// Silence after which a ping is sent.
    pub heartbeat_interval_ms: u64,
    /// Heartbeat timeout (pong must arrive within this).
    pub heartbeat_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:5001/ws".to_string(),
            max_reconnect_attempts: 0, // Infinite
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 30000,
            reconnect_jitter_ms: 1000,
            connect_timeout_ms: 10000,
            heartbeat_interval_ms: 15000,
            heartbeat_timeout_ms: 10000,
        }
    }
}

/// WebSocket connection manager.
pub struct ConnectionManager {
    config: ConnectionConfig,
    heartbeat: Arc<HeartbeatMonitor>,
    event_tx: mpsc::Sender<InboundEvent>,
    reconnect_count: Arc<RwLock<u32>>,
    /// Cancellation token for graceful shutdown.
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    pub fn new(config: ConnectionConfig, event_tx: mpsc::Sender<InboundEvent>) -> Self {
        Self::with_shutdown_token(config, event_tx, CancellationToken::new())
    }

    /// Create a manager that stops when `shutdown_token` is cancelled.
    pub fn with_shutdown_token(
        config: ConnectionConfig,
        event_tx: mpsc::Sender<InboundEvent>,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            heartbeat: Arc::new(HeartbeatMonitor::new(
                config.heartbeat_interval_ms,
                config.heartbeat_timeout_ms,
            )),
            config,
            event_tx,
            reconnect_count: Arc::new(RwLock::new(0)),
            shutdown_token,
        }
    }

    /// Consecutive failed sessions since the last successful connect.
    pub fn reconnect_count(&self) -> u32 {
        *self.reconnect_count.read()
    }

    /// Signal graceful shutdown.
    ///
    /// Cancels the shutdown token, which makes the session loop send a Close
    /// frame and the reconnect loop exit promptly.
    pub fn shutdown(&self) {
        info!("ConnectionManager shutdown requested");
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Connect and keep reconnecting until shutdown or the attempt limit.
    pub async fn connect(&self) -> WsResult<()> {
        let mut attempt = 0u32;

        loop {
            if self.is_shutdown() {
                info!("Shutdown requested, exiting connect loop");
                return Ok(());
            }

            if !self.emit(InboundEvent::ConnectAttempt).await {
                return Ok(());
            }

            match self.dial().await {
                Ok(Some(stream)) => {
                    attempt = 0;
                    *self.reconnect_count.write() = 0;
                    if !self.emit(InboundEvent::Connected).await {
                        return Ok(());
                    }

                    match self.run_session(stream).await {
                        Ok(()) => info!("WebSocket session ended"),
                        Err(e) => warn!(error = %e, "WebSocket session failed"),
                    }
                    if !self.emit(InboundEvent::Disconnected).await {
                        return Ok(());
                    }
                }
                Ok(None) => {
                    info!("Shutdown requested while dialing");
                    return Ok(());
                }
                Err(e) => {
                    error!(url = %self.config.url, error = %e, "WebSocket connect failed");
                    let failed = InboundEvent::ConnectFailed {
                        message: e.to_string(),
                    };
                    if !self.emit(failed).await {
                        return Ok(());
                    }
                }
            }

            if self.is_shutdown() {
                info!("Shutdown requested after disconnect, not reconnecting");
                return Ok(());
            }

            attempt += 1;
            *self.reconnect_count.write() = attempt;

            if self.config.max_reconnect_attempts > 0
                && attempt >= self.config.max_reconnect_attempts
            {
                error!(attempt, "Max reconnection attempts reached");
                return Err(WsError::MaxReconnectAttempts(attempt));
            }

            let delay = self.calculate_backoff_delay(attempt);
            warn!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during backoff, exiting");
                    return Ok(());
                }
            }
        }
    }

    /// Dial with timeout. `Ok(None)` means shutdown interrupted the dial.
    async fn dial(&self) -> WsResult<Option<WsStream>> {
        info!(url = %self.config.url, "Connecting to data service");

        let timeout = Duration::from_millis(self.config.connect_timeout_ms);
        let handshake = connect_async_tls_with_config(self.config.url.as_str(), None, true, None);

        tokio::select! {
            () = self.shutdown_token.cancelled() => Ok(None),
            result = tokio::time::timeout(timeout, handshake) => match result {
                Ok(Ok((stream, _response))) => {
                    info!("WebSocket connected");
                    Ok(Some(stream))
                }
                Ok(Err(e)) => Err(e.into()),
                Err(_) => Err(WsError::ConnectTimeout(self.config.connect_timeout_ms)),
            },
        }
    }

    async fn run_session(&self, stream: WsStream) -> WsResult<()> {
        let (mut write, mut read) = stream.split();
        self.heartbeat.reset();

        loop {
            tokio::select! {
                biased;

                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received in message loop");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(?e, "Failed to send Close frame during shutdown");
                    }
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.heartbeat.record_message();
                            if !self.handle_text_message(&text).await {
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            self.heartbeat.record_message();
                            debug!("Received ping, sending pong");
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            self.heartbeat.record_pong();
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "WebSocket closed by server");
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => {
                            error!(?e, "WebSocket read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!("WebSocket stream ended");
                            return Ok(());
                        }
                        Some(Ok(_)) => {
                            self.heartbeat.record_message();
                        }
                    }
                }

                _ = self.heartbeat.wait_for_check() => {
                    if self.heartbeat.is_timed_out() {
                        error!("Heartbeat timeout");
                        return Err(WsError::HeartbeatTimeout);
                    }

                    if self.heartbeat.should_send_heartbeat() {
                        write.send(Message::Ping(Vec::new())).await?;
                        self.heartbeat.record_ping();
                        debug!("Sent heartbeat ping");
                    }
                }
            }
        }
    }

    /// Decode and forward one text frame. Returns false once the consumer is gone.
    async fn handle_text_message(&self, text: &str) -> bool {
        match parse_frame(text) {
            Ok(Some(event)) => self.emit(event).await,
            Ok(None) => true,
            Err(e) => {
                warn!(error = %e, len = text.len(), "Dropping undecodable frame");
                true
            }
        }
    }

    /// Forward an event. A dropped receiver is treated as shutdown.
    async fn emit(&self, event: InboundEvent) -> bool {
        if self.event_tx.send(event).await.is_err() {
            warn!("Event receiver dropped, stopping connection manager");
            self.shutdown_token.cancel();
            return false;
        }
        true
    }

    fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.reconnect_base_delay_ms;
        let max = self.config.reconnect_max_delay_ms;

        // base * 2^(attempt-1), capped
        let exponent = attempt.saturating_sub(1).min(10);
        let delay = base.saturating_mul(1u64 << exponent).min(max);

        Duration::from_millis(delay + rand_jitter(self.config.reconnect_jitter_ms))
    }
}

/// Random jitter in `0..bound_ms`.
fn rand_jitter(bound_ms: u64) -> u64 {
    if bound_ms == 0 {
        return 0;
    }
    rand::thread_rng().gen_range(0..bound_ms)
}
