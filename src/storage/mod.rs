//! Persistence for ledger state
//!
//! JSON files with atomic writes and rotating backups.

pub mod persistence;

pub use persistence::{Storage, StorageConfig, StorageError};
