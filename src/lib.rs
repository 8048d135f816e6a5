//! Quorum-Ledger: a threshold-authorization ledger in Rust
//!
//! This crate implements a quorum authorization ledger: a fixed set of
//! owners collectively approves and executes outgoing operations against a
//! shared asset pool. Features:
//! - Immutable owner registry and approval threshold, fixed at construction
//! - Append-only operation log with stable indices
//! - Explicit submit / confirm / execute steps with at-most-once execution
//! - Atomic rollback when an external delivery fails
//! - Durable notification log (deposits, submissions, confirmations,
//!   executions) streamed over WebSocket
//! - JSON persistence with rotating backups
//! - REST API and CLI front ends
//!
//! # Example
//!
//! ```rust
//! use quorum_ledger::ledger::{Ledger, LedgerConfig};
//! use quorum_ledger::dispatch::LogDispatcher;
//!
//! // Create a 2-of-3 ledger
//! let owners = vec!["alice".to_string(), "bob".to_string(), "carol".to_string()];
//! let config = LedgerConfig::new(owners, 2, None).unwrap();
//! let mut ledger = Ledger::new(config);
//!
//! // Fund the pool and propose an outgoing transfer
//! ledger.deposit("faucet", 1_000);
//! let index = ledger.submit("alice", "dave", 400, vec![]).unwrap();
//!
//! // Two distinct confirmations reach quorum; any owner may execute
//! ledger.confirm("alice", index).unwrap();
//! ledger.confirm("bob", index).unwrap();
//! ledger.execute("carol", index, &LogDispatcher::new()).unwrap();
//!
//! assert_eq!(ledger.balance(), 600);
//! ```

pub mod api;
pub mod cli;
pub mod dispatch;
pub mod ledger;
pub mod storage;

// Re-export commonly used types
pub use api::{create_router, ApiState};
pub use dispatch::{CallError, Dispatcher, LogDispatcher, RecordingDispatcher};
pub use ledger::{
    Confirmation, Event, EventKind, EventLog, Ledger, LedgerConfig, LedgerError, LedgerManager,
    Operation, OperationStatus,
};
pub use storage::{Storage, StorageConfig, StorageError};
