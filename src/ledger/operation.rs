//! Proposed operations and their confirmation records
//!
//! Operations live in an append-only log and are addressed by position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single owner's recorded approval of an operation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Confirmation {
    /// Owner who confirmed
    pub owner: String,
    /// When the confirmation was recorded
    pub confirmed_at: DateTime<Utc>,
}

impl Confirmation {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            confirmed_at: Utc::now(),
        }
    }
}

/// Lifecycle state of an operation, derived from its confirmation count and
/// executed flag
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum OperationStatus {
    /// Below threshold, waiting for confirmations
    Pending,
    /// At or above threshold, not yet executed
    Approved,
    /// Executed; terminal
    Executed,
}

/// One proposed outgoing action: a transfer, a call, or both.
///
/// Confirmation records are append-only; the confirmation count is always
/// the length of `confirmations`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Operation {
    /// Position in the ledger's operation log
    pub index: u64,
    /// Owner who submitted the operation
    pub proposer: String,
    /// Recipient of the transfer and/or call
    pub target: String,
    /// Asset amount in the smallest unit (0 for a pure call)
    pub amount: u128,
    /// Opaque call payload; empty means a plain transfer
    #[serde(with = "hex::serde")]
    pub payload: Vec<u8>,
    /// Set once, immediately before the external effect is delivered
    pub executed: bool,
    /// Collected confirmations, one per owner
    pub confirmations: Vec<Confirmation>,
    /// When the operation was submitted
    pub submitted_at: DateTime<Utc>,
    /// When execution completed, if it has
    pub executed_at: Option<DateTime<Utc>>,
}

impl Operation {
    pub fn new(
        index: u64,
        proposer: impl Into<String>,
        target: impl Into<String>,
        amount: u128,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            index,
            proposer: proposer.into(),
            target: target.into(),
            amount,
            payload,
            executed: false,
            confirmations: Vec::new(),
            submitted_at: Utc::now(),
            executed_at: None,
        }
    }

    /// Number of distinct owners who have confirmed
    pub fn confirmation_count(&self) -> usize {
        self.confirmations.len()
    }

    /// Whether the given owner has a confirmation on record
    pub fn is_confirmed_by(&self, owner: &str) -> bool {
        self.confirmations.iter().any(|c| c.owner == owner)
    }

    /// Owners who have confirmed, in confirmation order
    pub fn confirmed_by(&self) -> Vec<&str> {
        self.confirmations.iter().map(|c| c.owner.as_str()).collect()
    }

    /// Derived lifecycle state for the given threshold
    pub fn status(&self, threshold: u32) -> OperationStatus {
        if self.executed {
            OperationStatus::Executed
        } else if self.confirmation_count() >= threshold as usize {
            OperationStatus::Approved
        } else {
            OperationStatus::Pending
        }
    }

    /// True when there is nothing to deliver: no value and no payload
    pub fn is_no_effect(&self) -> bool {
        self.amount == 0 && self.payload.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_operation_is_pending() {
        let op = Operation::new(0, "alice", "carol", 500, vec![]);

        assert_eq!(op.index, 0);
        assert_eq!(op.confirmation_count(), 0);
        assert!(!op.executed);
        assert_eq!(op.status(2), OperationStatus::Pending);
    }

    #[test]
    fn test_status_transitions() {
        let mut op = Operation::new(0, "alice", "carol", 500, vec![]);

        op.confirmations.push(Confirmation::new("alice"));
        assert_eq!(op.status(2), OperationStatus::Pending);

        op.confirmations.push(Confirmation::new("bob"));
        assert_eq!(op.status(2), OperationStatus::Approved);

        op.executed = true;
        assert_eq!(op.status(2), OperationStatus::Executed);
    }

    #[test]
    fn test_is_confirmed_by() {
        let mut op = Operation::new(0, "alice", "carol", 0, vec![]);
        op.confirmations.push(Confirmation::new("alice"));

        assert!(op.is_confirmed_by("alice"));
        assert!(!op.is_confirmed_by("bob"));
        assert_eq!(op.confirmed_by(), vec!["alice"]);
    }

    #[test]
    fn test_no_effect_detection() {
        assert!(Operation::new(0, "a", "b", 0, vec![]).is_no_effect());
        assert!(!Operation::new(0, "a", "b", 1, vec![]).is_no_effect());
        assert!(!Operation::new(0, "a", "b", 0, vec![0x01]).is_no_effect());
    }

    #[test]
    fn test_payload_serializes_as_hex() {
        let op = Operation::new(0, "alice", "carol", 0, vec![0xde, 0xad, 0xbe, 0xef]);
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["payload"], "deadbeef");

        let back: Operation = serde_json::from_value(json).unwrap();
        assert_eq!(back.payload, vec![0xde, 0xad, 0xbe, 0xef]);
    }
}
