//! End-to-end lifecycle tests.
//!
//! Runs the full application against a mock upstream:
//! - Connection establishment and state reporting
//! - Snapshot reconciliation with highlight expiry
//! - Upstream status overrides
//! - Server-side close and reconnection
//! - Shutdown

mod integration;
use integration::common::mock_upstream::MockUpstream;
use integration::common::snapshot_payload;

use std::sync::Arc;
use std::time::Duration;
use straddle_core::{ConnectionState, FieldKey, RowField};
use straddle_engine::{DisplayState, HighlightConfig, TimerMode};
use straddle_monitor::{AppConfig, Application, UpstreamConfig};
use straddle_ws::Envelope;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

fn test_config(url: String) -> AppConfig {
    let mut config = AppConfig {
        upstream: UpstreamConfig {
            url,
            reconnect_base_delay_ms: 50,
            reconnect_max_delay_ms: 100,
            reconnect_jitter_ms: 0,
            connect_timeout_ms: 1000,
            ..Default::default()
        },
        highlight: HighlightConfig {
            window_ms: 400,
            timer_mode: TimerMode::Restart,
        },
        ..Default::default()
    };
    config.dashboard.enabled = false;
    config
}

struct Running {
    display: watch::Receiver<Arc<DisplayState>>,
    shutdown: CancellationToken,
    handle: JoinHandle<straddle_monitor::AppResult<()>>,
}

fn start(config: AppConfig) -> Running {
    let app = Application::new(config);
    let display = app.subscribe();
    let shutdown = app.shutdown_token();
    let handle = tokio::spawn(app.run());
    Running {
        display,
        shutdown,
        handle,
    }
}

async fn wait_until(
    display: &mut watch::Receiver<Arc<DisplayState>>,
    what: &str,
    predicate: impl FnMut(&Arc<DisplayState>) -> bool,
) -> Arc<DisplayState> {
    let state = timeout(WAIT, display.wait_for(predicate))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
        .expect("coordinator stopped");
    Arc::clone(&state)
}

async fn stop(running: Running) {
    running.shutdown.cancel();
    let result = timeout(WAIT, running.handle)
        .await
        .expect("application should stop")
        .unwrap();
    tokio_test::assert_ok!(result);
}

#[tokio::test]
async fn test_connects_and_reports_connected() {
    let server = MockUpstream::start().await;
    let mut running = start(test_config(server.url()));

    let state = wait_until(&mut running.display, "connected", |s| {
        s.connection_state == ConnectionState::Connected
    })
    .await;
    assert!(state.snapshot.is_none());
    assert!(state.status_message.is_none());
    assert_eq!(server.connection_count().await, 1);

    stop(running).await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_changed_fields_flash_then_clear() {
    let server = MockUpstream::start().await;
    let mut running = start(test_config(server.url()));
    wait_until(&mut running.display, "connected", |s| {
        s.connection_state == ConnectionState::Connected
    })
    .await;

    server.send(Envelope::data_update(snapshot_payload(5000.0, 4.1)));
    let first = wait_until(&mut running.display, "first snapshot", |s| s.has_data()).await;
    assert!(first.active_highlights.is_empty(), "first snapshot never flashes");

    server.send(Envelope::data_update(snapshot_payload(5000.5, 4.2)));
    let flashed = wait_until(&mut running.display, "highlights", |s| {
        !s.active_highlights.is_empty()
    })
    .await;
    assert!(flashed.active_highlights.contains(&FieldKey::SPOT_PRICE));
    assert!(flashed
        .active_highlights
        .contains(&FieldKey::row(0, RowField::CallBid)));
    assert!(!flashed
        .active_highlights
        .contains(&FieldKey::row(0, RowField::PutBid)));
    assert_eq!(flashed.snapshot.as_ref().unwrap().spot_price, Some(5000.5));

    let cleared = wait_until(&mut running.display, "highlights to clear", |s| {
        s.active_highlights.is_empty()
    })
    .await;
    assert!(cleared.sequence > flashed.sequence);
    assert_eq!(cleared.snapshot.as_ref().unwrap().spot_price, Some(5000.5));

    stop(running).await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_status_update_reports_error_message() {
    let server = MockUpstream::start().await;
    let mut running = start(test_config(server.url()));
    wait_until(&mut running.display, "connected", |s| {
        s.connection_state == ConnectionState::Connected
    })
    .await;

    server.send(Envelope::status_update(
        "error",
        Some("IBKR gateway unreachable".to_string()),
    ));
    let state = wait_until(&mut running.display, "error status", |s| {
        s.connection_state == ConnectionState::Error
    })
    .await;
    assert_eq!(
        state.status_message.as_deref(),
        Some("IBKR gateway unreachable")
    );

    stop(running).await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_garbage_frames_are_skipped() {
    let server = MockUpstream::start().await;
    let mut running = start(test_config(server.url()));
    wait_until(&mut running.display, "connected", |s| {
        s.connection_state == ConnectionState::Connected
    })
    .await;

    server.send_raw("not json");
    server.send_raw(r#"{"event":"heartbeat","data":{}}"#);
    server.send(Envelope::data_update(snapshot_payload(5000.0, 4.1)));

    let state = wait_until(&mut running.display, "snapshot", |s| s.has_data()).await;
    assert_eq!(state.connection_state, ConnectionState::Connected);
    assert_eq!(server.connection_count().await, 1);

    stop(running).await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_server_close_disconnects_then_reconnects() {
    let server = MockUpstream::start().await;
    let mut running = start(test_config(server.url()));
    wait_until(&mut running.display, "connected", |s| {
        s.connection_state == ConnectionState::Connected
    })
    .await;
    server.send(Envelope::data_update(snapshot_payload(5000.0, 4.1)));
    let before = wait_until(&mut running.display, "snapshot", |s| s.has_data()).await;

    server.close_all();

    // disconnect, connect_attempt and connect each publish once.
    let state = wait_until(&mut running.display, "reconnected", |s| {
        s.connection_state == ConnectionState::Connected && s.sequence >= before.sequence + 3
    })
    .await;
    assert_eq!(server.connection_count().await, 2);
    // The last snapshot survives the reconnect.
    assert_eq!(state.snapshot.as_ref().unwrap().spot_price, Some(5000.0));

    stop(running).await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_upstream_reports_error_until_limit() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());
    drop(listener);

    let mut config = test_config(url);
    config.upstream.max_reconnect_attempts = 2;
    let mut running = start(config);

    let state = wait_until(&mut running.display, "connect failure", |s| {
        s.connection_state == ConnectionState::Error
    })
    .await;
    assert!(state.status_message.is_some());

    let result = timeout(WAIT, running.handle)
        .await
        .expect("application should give up")
        .unwrap();
    assert!(matches!(
        result,
        Err(straddle_monitor::AppError::WebSocket(
            straddle_ws::WsError::MaxReconnectAttempts(2)
        ))
    ));
}

#[tokio::test]
async fn test_dashboard_bind_failure_stops_application() {
    let server = MockUpstream::start().await;
    let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = occupied.local_addr().unwrap().port();

    let mut config = test_config(server.url());
    config.dashboard.enabled = true;
    config.dashboard.bind_address = "127.0.0.1".to_string();
    config.dashboard.port = port;
    let running = start(config);

    let result = timeout(WAIT, running.handle)
        .await
        .expect("application should stop when the dashboard cannot bind")
        .unwrap();
    assert!(matches!(
        result,
        Err(straddle_monitor::AppError::Dashboard(
            straddle_dashboard::DashboardError::Bind { .. }
        ))
    ));

    drop(occupied);
    server.shutdown().await;
}
