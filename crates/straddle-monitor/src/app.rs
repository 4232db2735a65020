//! Main application orchestration.
//!
//! Coordinates all components:
//! - WebSocket connection to the upstream data service
//! - Reconciliation coordinator driven on a single task
//! - Dashboard server
//! - Metrics from every processed event

use crate::config::AppConfig;
use crate::error::AppResult;
use std::sync::Arc;
use straddle_dashboard::{Broadcaster, DashboardState};
use straddle_engine::{run_coordinator, Coordinator, DisplayState, Report, HIGHLIGHT_TIMER};
use straddle_telemetry::Metrics;
use straddle_ws::{ConnectionConfig, ConnectionManager};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Main application.
pub struct Application {
    config: AppConfig,
    coordinator: Coordinator,
    broadcaster: Option<Broadcaster>,
    shutdown: CancellationToken,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        let mut coordinator = Coordinator::new(&config.highlight);

        let broadcaster = config.dashboard.enabled.then(|| {
            let broadcaster = Broadcaster::new(config.dashboard.client_buffer);
            coordinator.register(Box::new(broadcaster.clone()));
            broadcaster
        });

        info!(
            window_ms = config.highlight.window_ms,
            timer_mode = ?config.highlight.timer_mode,
            dashboard = config.dashboard.enabled,
            "Application configured"
        );

        Self {
            config,
            coordinator,
            broadcaster,
            shutdown: CancellationToken::new(),
        }
    }

    /// Subscribe to published display states.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DisplayState>> {
        self.coordinator.subscribe()
    }

    /// Token that stops the application when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run until Ctrl-C, the shutdown token, a dashboard failure, or the
    /// upstream client giving up.
    pub async fn run(self) -> AppResult<()> {
        let Self {
            config,
            coordinator,
            broadcaster,
            shutdown,
        } = self;

        let (event_tx, event_rx) = mpsc::channel(config.upstream.event_buffer);

        let dashboard_handle = broadcaster.map(|broadcaster| {
            let state = DashboardState::new(coordinator.subscribe());
            let server = straddle_dashboard::run_server(
                state,
                broadcaster.sender(),
                config.dashboard.clone(),
                shutdown.child_token(),
            );
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                let result = server.await;
                if let Err(e) = &result {
                    error!(error = %e, "Dashboard server failed, shutting down");
                    shutdown.cancel();
                }
                result
            })
        });

        // The engine keeps running until the client has emitted its final
        // events, so it gets its own token.
        let engine_handle = tokio::spawn(run_coordinator(
            coordinator,
            event_rx,
            CancellationToken::new(),
            record_metrics,
        ));

        let ws_config: ConnectionConfig = config.upstream.clone().into();
        info!(url = %ws_config.url, "Starting upstream client");
        let manager = ConnectionManager::with_shutdown_token(
            ws_config,
            event_tx,
            shutdown.child_token(),
        );
        let mut ws_handle = tokio::spawn(async move { manager.connect().await });

        let ws_result = tokio::select! {
            result = &mut ws_handle => {
                shutdown.cancel();
                Some(result)
            }
            _ = shutdown.cancelled() => None,
            signal = tokio::signal::ctrl_c() => {
                match signal {
                    Ok(()) => info!("Ctrl-C received, shutting down"),
                    Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
                }
                shutdown.cancel();
                None
            }
        };

        // The manager drops its sender when it returns, which closes the
        // event channel and lets the coordinator drain and stop.
        let ws_result = match ws_result {
            Some(result) => result,
            None => ws_handle.await,
        };

        let coordinator = engine_handle.await?;
        info!(
            state = %coordinator.connection_state(),
            "Coordinator drained"
        );

        if let Some(handle) = dashboard_handle {
            handle.await??;
        }

        match ws_result? {
            Ok(()) => {
                info!("Application stopped");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Upstream client stopped");
                Err(e.into())
            }
        }
    }
}

/// Record metrics for one processed event or fired countdown.
fn record_metrics(report: &Report) {
    if report.kind != HIGHLIGHT_TIMER {
        Metrics::event(report.kind);
    }

    if let Some(transition) = &report.transition {
        Metrics::connection_state_set(transition.to);
    }

    match report.kind {
        "data_update" => Metrics::snapshot_reconciled(report.changed_fields, report.repaired_fields),
        "connect_failed" | "disconnect" => Metrics::reconnect(report.kind),
        _ => {}
    }

    if report.highlights_cleared {
        Metrics::highlights_cleared();
    }
}
