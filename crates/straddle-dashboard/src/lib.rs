//! straddle-dashboard - live straddle table for the straddle monitor.
//!
//! Renders published display states in the browser:
//!
//! - REST endpoint for the current state
//! - WebSocket pushing every published state
//! - Static HTML table applying the highlight classes
//! - Prometheus metrics
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    straddle-monitor process                   │
//! │                                                              │
//! │  Coordinator ──publish──► Broadcaster (DisplayObserver)      │
//! │       │                        │                             │
//! │       ▼                        ▼                             │
//! │  watch::Receiver         broadcast::Sender<String>           │
//! │       │                        │                             │
//! │       └──────────┬─────────────┘                             │
//! │                  ▼                                           │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │       axum HTTP Server (port 5000)                     │  │
//! │  │  GET /             → Static HTML/JS                    │  │
//! │  │  GET /api/snapshot → current DisplayState              │  │
//! │  │  GET /ws           → current state, then every update  │  │
//! │  │  GET /metrics      → Prometheus text                   │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use straddle_dashboard::{run_server, Broadcaster, DashboardConfig, DashboardState};
//!
//! let broadcaster = Broadcaster::new(config.client_buffer);
//! coordinator.register(Box::new(broadcaster.clone()));
//! let state = DashboardState::new(coordinator.subscribe());
//!
//! tokio::spawn(run_server(state, broadcaster.sender(), config, shutdown.clone()));
//! ```

mod broadcast;
mod config;
mod error;
mod server;
mod state;
mod types;

pub use broadcast::Broadcaster;
pub use config::DashboardConfig;
pub use error::{DashboardError, DashboardResult};
pub use server::{create_router, run_server, serve, AppState, ConnectionLimiter};
pub use state::DashboardState;
pub use types::DashboardMessage;
