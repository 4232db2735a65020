//! Router integration tests.
//!
//! Exercises the HTTP surface with `tower::ServiceExt::oneshot` and the
//! WebSocket push path against a real listener.

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use futures_util::StreamExt;
use serde_json::{json, Value};
use straddle_core::InboundEvent;
use straddle_dashboard::{create_router, serve, AppState, Broadcaster, DashboardConfig, DashboardState};
use straddle_engine::{Coordinator, HighlightConfig};
use tokio::net::TcpListener;
use tokio::time::{timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

fn snapshot_payload(spot: f64) -> Value {
    json!({
        "spot_price": spot,
        "active_strike": 5000,
        "straddles": [
            {"dte": "0DTE", "expiry": "20240119", "call_bid": 4.1, "call_ask": 4.3,
             "put_bid": 2.0, "put_ask": 2.2, "straddle_cost": 6.3,
             "iv": 0.15, "gamma": 0.02, "theta": -3.0}
        ],
        "last_update": "2024-01-19T14:30:05.123456"
    })
}

fn setup(config: DashboardConfig) -> (Coordinator, Broadcaster, AppState) {
    let mut coordinator = Coordinator::new(&HighlightConfig::default());
    let broadcaster = Broadcaster::new(config.client_buffer);
    coordinator.register(Box::new(broadcaster.clone()));
    let state = AppState::new(
        DashboardState::new(coordinator.subscribe()),
        broadcaster.sender(),
        config,
    );
    (coordinator, broadcaster, state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_snapshot_endpoint_reflects_latest_state() {
    let (mut coordinator, _broadcaster, state) = setup(DashboardConfig::default());
    let app = create_router(state);

    let response = app
        .clone()
        .oneshot(Request::get("/api/snapshot").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["snapshot"].is_null());
    assert_eq!(json["connection_state"], "disconnected");

    let now = Instant::now();
    coordinator.handle(InboundEvent::Connected, now);
    coordinator.handle(InboundEvent::DataUpdate(snapshot_payload(5000.0)), now);
    coordinator.handle(InboundEvent::DataUpdate(snapshot_payload(5000.5)), now);

    let response = app
        .oneshot(Request::get("/api/snapshot").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["connection_state"], "connected");
    assert_eq!(json["snapshot"]["spot_price"], json!(5000.5));
    assert_eq!(json["active_highlights"], json!(["spot_price"]));
    assert_eq!(json["sequence"], json!(3));
}

#[tokio::test]
async fn test_index_is_served() {
    let (_coordinator, _broadcaster, state) = setup(DashboardConfig::default());
    let response = create_router(state)
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("active_highlights"));
}

#[tokio::test]
async fn test_basic_auth_is_enforced() {
    let config = DashboardConfig {
        username: "ops".to_string(),
        password: "secret".to_string(),
        ..Default::default()
    };
    let (_coordinator, _broadcaster, state) = setup(config);
    let app = create_router(state);

    let response = app
        .clone()
        .oneshot(Request::get("/api/snapshot").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));

    let response = app
        .oneshot(
            Request::get("/api/snapshot")
                .header(header::AUTHORIZATION, "Basic b3BzOnNlY3JldA==")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let (_coordinator, _broadcaster, state) = setup(DashboardConfig::default());
    let response = create_router(state)
        .oneshot(
            Request::get("/api/snapshot")
                .header(header::ORIGIN, "http://example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (_coordinator, _broadcaster, state) = setup(DashboardConfig::default());
    straddle_telemetry::Metrics::event("connect");

    let response = create_router(state)
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("straddle_events_total"));
}

#[tokio::test]
async fn test_ws_sends_current_state_then_updates() {
    let config = DashboardConfig::default();
    let mut coordinator = Coordinator::new(&HighlightConfig::default());
    let broadcaster = Broadcaster::new(config.client_buffer);
    coordinator.register(Box::new(broadcaster.clone()));

    let now = Instant::now();
    coordinator.handle(InboundEvent::Connected, now);
    coordinator.handle(InboundEvent::DataUpdate(snapshot_payload(5000.0)), now);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let server = tokio::spawn(serve(
        listener,
        DashboardState::new(coordinator.subscribe()),
        broadcaster.sender(),
        config,
        shutdown.clone(),
    ));

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();

    let next_json = |msg: Option<Result<Message, _>>| -> Value {
        match msg {
            Some(Ok(Message::Text(text))) => serde_json::from_str(&text).unwrap(),
            other => panic!("unexpected frame: {other:?}"),
        }
    };

    // A new client receives the current state immediately.
    let first = next_json(timeout(Duration::from_secs(2), ws.next()).await.unwrap());
    assert_eq!(first["type"], "snapshot");
    assert_eq!(first["connection_state"], "connected");
    assert_eq!(first["snapshot"]["spot_price"], json!(5000.0));

    coordinator.handle(InboundEvent::DataUpdate(snapshot_payload(5001.0)), now);
    let second = next_json(timeout(Duration::from_secs(2), ws.next()).await.unwrap());
    assert_eq!(second["type"], "update");
    assert_eq!(second["active_highlights"], json!(["spot_price"]));
    assert!(second["sequence"].as_u64() > first["sequence"].as_u64());

    shutdown.cancel();
    drop(ws);
    let result = timeout(Duration::from_secs(2), server).await.unwrap().unwrap();
    tokio_test::assert_ok!(result);
}
