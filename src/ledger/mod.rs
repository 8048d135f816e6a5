//! Quorum authorization ledger
//!
//! A fixed set of owners collectively approves outgoing operations against a
//! shared asset pool; an operation executes only after a threshold of
//! distinct confirmations, and executes at most once.
//!
//! # Example
//!
//! ```ignore
//! use quorum_ledger::ledger::{Ledger, LedgerConfig};
//! use quorum_ledger::dispatch::LogDispatcher;
//!
//! // Create a 3-of-5 ledger
//! let config = LedgerConfig::new(owners, 3, None)?;
//! let mut ledger = Ledger::new(config);
//!
//! // Fund the pool, then propose and approve an outgoing transfer
//! ledger.deposit("faucet", 1_000);
//! let index = ledger.submit("owner-0", "recipient", 400, vec![])?;
//! ledger.confirm("owner-0", index)?;
//! ledger.confirm("owner-1", index)?;
//! ledger.confirm("owner-2", index)?;
//!
//! // Quorum reached; any owner may execute, exactly once
//! ledger.execute("owner-0", index, &LogDispatcher::new())?;
//! ```

pub mod config;
pub mod events;
pub mod ledger;
pub mod manager;
pub mod operation;

pub use config::LedgerConfig;
pub use events::{Event, EventKind, EventLog};
pub use ledger::{Ledger, LedgerError};
pub use manager::LedgerManager;
pub use operation::{Confirmation, Operation, OperationStatus};
