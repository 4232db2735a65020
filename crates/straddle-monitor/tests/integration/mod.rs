//! Integration tests for straddle-monitor.
//!
//! These tests drive the whole pipeline against a mock upstream:
//! - WebSocket connection lifecycle
//! - Snapshot reconciliation and highlight expiry
//! - Upstream status overrides

pub mod common;
