//! Core domain types for the straddle monitor.
//!
//! This crate provides the data model shared by the reconciliation engine,
//! the transport client and the dashboard:
//! - `Snapshot` / `StraddleRow`: one complete state pushed by the upstream service
//! - `FieldKey` / `ChangeSet`: identifiers of displayable values and sets of them
//! - `ConnectionState`: transport lifecycle as shown to the user
//! - `InboundEvent`: what the transport delivers to the reconciliation engine
//! - Lenient decoding of upstream JSON into a `Snapshot` (see [`decode`])

pub mod decode;
pub mod error;
pub mod event;
pub mod field;
pub mod types;

pub use decode::{Decoded, FieldIssue, IssueReason};
pub use error::{CoreError, Result};
pub use event::InboundEvent;
pub use field::{ChangeSet, FieldKey, RowField, ScalarField, Tolerance};
pub use types::{ConnectionState, Snapshot, StraddleRow, Strike};
