//! The quorum authorization ledger
//!
//! A fixed owner set collectively approves and executes outgoing operations
//! against a shared asset pool. Every public call is one atomic transition:
//! it either completes or fails with no partial state change.

use crate::dispatch::Dispatcher;
use crate::ledger::config::LedgerConfig;
use crate::ledger::events::{EventKind, EventLog};
use crate::ledger::operation::{Confirmation, Operation, OperationStatus};
use chrono::{DateTime, Utc};
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;

/// Errors surfaced by ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid owner set: {0}")]
    InvalidOwnerSet(String),
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
    #[error("Not an owner: {0}")]
    Unauthorized(String),
    #[error("Operation not found: {0}")]
    NotFound(u64),
    #[error("Operation {0} already executed")]
    AlreadyExecuted(u64),
    #[error("Operation {index} already confirmed by {owner}")]
    AlreadyConfirmed { index: u64, owner: String },
    #[error("Insufficient confirmations: have {have}, need {need}")]
    InsufficientConfirmations { have: usize, need: u32 },
    #[error("Transfer to {target} failed: {reason}")]
    TransferFailed { target: String, reason: String },
    #[error("Call to {target} failed: {reason}")]
    CallFailed { target: String, reason: String },
    #[error("Ledger not found: {0}")]
    LedgerNotFound(String),
}

/// A threshold-authorization ledger over a shared asset pool.
///
/// Owners and threshold are immutable for the ledger's lifetime. Operations
/// form an append-only log addressed by position.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ledger {
    /// Deterministic address derived from the configuration
    address: String,
    config: LedgerConfig,
    /// Membership set for O(1) authorization; rebuilt after deserialization
    #[serde(skip)]
    owner_index: HashSet<String>,
    operations: Vec<Operation>,
    balance: u128,
    events: EventLog,
    created_at: DateTime<Utc>,
}

impl Ledger {
    /// Create a ledger from a validated configuration.
    pub fn new(config: LedgerConfig) -> Self {
        let address = Self::derive_address(&config);
        let owner_index = config.owners.iter().cloned().collect();

        Self {
            address,
            config,
            owner_index,
            operations: Vec::new(),
            balance: 0,
            events: EventLog::new(),
            created_at: Utc::now(),
        }
    }

    /// Derive the ledger address from its configuration
    ///
    /// Address = Base58Check(version || RIPEMD160(SHA256(threshold || sorted_owners)))
    fn derive_address(config: &LedgerConfig) -> String {
        // Sort owners so the same set yields the same address
        let mut sorted = config.owners.clone();
        sorted.sort();

        let mut preimage = config.threshold.to_be_bytes().to_vec();
        for owner in &sorted {
            preimage.extend_from_slice(owner.as_bytes());
        }

        let sha = Sha256::digest(&preimage);
        let mut ripemd = Ripemd160::new();
        ripemd.update(sha);
        let hash = ripemd.finalize();

        let mut bytes = vec![0x05];
        bytes.extend_from_slice(&hash);

        let checksum = {
            let first = Sha256::digest(&bytes);
            let second = Sha256::digest(first);
            second[..4].to_vec()
        };
        bytes.extend_from_slice(&checksum);

        bs58::encode(bytes).into_string()
    }

    /// Rebuild the owner membership set after deserialization
    pub fn rebuild_index(&mut self) {
        self.owner_index = self.config.owners.iter().cloned().collect();
    }

    fn authorize(&self, caller: &str) -> Result<(), LedgerError> {
        if self.owner_index.contains(caller) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized(caller.to_string()))
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Receive assets into the pool. Open to any sender, never fails; a
    /// zero amount is accepted and still notifies. Returns the new balance.
    pub fn deposit(&mut self, sender: &str, amount: u128) -> u128 {
        self.balance += amount;
        self.events.record(EventKind::Deposit {
            sender: sender.to_string(),
            amount,
        });
        log::info!(
            "ledger {}: deposit {} from {} (balance {})",
            self.address,
            amount,
            sender,
            self.balance
        );
        self.balance
    }

    /// Append a new operation and return its index.
    ///
    /// The proposer is not auto-confirmed; confirmation is a separate step.
    pub fn submit(
        &mut self,
        proposer: &str,
        target: &str,
        amount: u128,
        payload: Vec<u8>,
    ) -> Result<u64, LedgerError> {
        self.authorize(proposer)?;

        let index = self.operations.len() as u64;
        self.events.record(EventKind::Submitted {
            proposer: proposer.to_string(),
            index,
            target: target.to_string(),
            amount,
            payload: payload.clone(),
        });
        self.operations
            .push(Operation::new(index, proposer, target, amount, payload));

        log::info!(
            "ledger {}: operation {} submitted by {} (target {}, amount {})",
            self.address,
            index,
            proposer,
            target,
            amount
        );
        Ok(index)
    }

    /// Record the caller's confirmation on an operation.
    pub fn confirm(&mut self, owner: &str, index: u64) -> Result<(), LedgerError> {
        self.authorize(owner)?;

        let threshold = self.config.threshold;
        let op = self
            .operations
            .get_mut(index as usize)
            .ok_or(LedgerError::NotFound(index))?;

        if op.executed {
            return Err(LedgerError::AlreadyExecuted(index));
        }
        if op.is_confirmed_by(owner) {
            return Err(LedgerError::AlreadyConfirmed {
                index,
                owner: owner.to_string(),
            });
        }

        op.confirmations.push(Confirmation::new(owner));
        let count = op.confirmation_count();

        self.events.record(EventKind::Confirmed {
            confirmer: owner.to_string(),
            index,
        });
        log::info!(
            "ledger {}: operation {} confirmed by {} ({}/{})",
            self.address,
            index,
            owner,
            count,
            threshold
        );
        Ok(())
    }

    /// Execute an approved operation exactly once.
    ///
    /// The executed flag is raised before the external effect is delivered,
    /// so a re-entrant call on the same index lands on the AlreadyExecuted
    /// guard. A failed delivery rolls flag and balance back as a unit.
    pub fn execute(
        &mut self,
        executor: &str,
        index: u64,
        dispatcher: &dyn Dispatcher,
    ) -> Result<(), LedgerError> {
        self.authorize(executor)?;

        let threshold = self.config.threshold;
        let op = self
            .operations
            .get_mut(index as usize)
            .ok_or(LedgerError::NotFound(index))?;

        if op.executed {
            return Err(LedgerError::AlreadyExecuted(index));
        }

        let have = op.confirmation_count();
        if have < threshold as usize {
            return Err(LedgerError::InsufficientConfirmations {
                have,
                need: threshold,
            });
        }

        // Flag first, effect second.
        op.executed = true;
        let target = op.target.clone();
        let amount = op.amount;
        let payload = op.payload.clone();
        let no_effect = op.is_no_effect();

        if amount > self.balance {
            self.operations[index as usize].executed = false;
            return Err(LedgerError::TransferFailed {
                target,
                reason: format!("pool balance {} below amount {}", self.balance, amount),
            });
        }
        self.balance -= amount;

        if !no_effect {
            if let Err(err) = dispatcher.invoke(&target, amount, &payload) {
                // Restore flag and balance exactly as before the call
                self.balance += amount;
                self.operations[index as usize].executed = false;
                log::warn!(
                    "ledger {}: execution of operation {} rolled back: {}",
                    self.address,
                    index,
                    err
                );
                return Err(if payload.is_empty() {
                    LedgerError::TransferFailed {
                        target,
                        reason: err.reason,
                    }
                } else {
                    LedgerError::CallFailed {
                        target,
                        reason: err.reason,
                    }
                });
            }
        }

        self.operations[index as usize].executed_at = Some(Utc::now());
        self.events.record(EventKind::Executed {
            executor: executor.to_string(),
            index,
        });
        log::info!(
            "ledger {}: operation {} executed by {}",
            self.address,
            index,
            executor
        );
        Ok(())
    }

    // =========================================================================
    // Read projections
    // =========================================================================

    /// The ledger's derived address
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Registered owners, in construction order
    pub fn owners(&self) -> &[String] {
        self.config.owners()
    }

    pub fn threshold(&self) -> u32 {
        self.config.threshold()
    }

    pub fn is_owner(&self, id: &str) -> bool {
        self.owner_index.contains(id)
    }

    pub fn balance(&self) -> u128 {
        self.balance
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    pub fn operation(&self, index: u64) -> Option<&Operation> {
        self.operations.get(index as usize)
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn confirmation_count(&self, index: u64) -> Option<usize> {
        self.operation(index).map(|op| op.confirmation_count())
    }

    pub fn is_confirmed(&self, index: u64, owner: &str) -> Option<bool> {
        self.operation(index).map(|op| op.is_confirmed_by(owner))
    }

    pub fn status(&self, index: u64) -> Option<OperationStatus> {
        self.operation(index)
            .map(|op| op.status(self.config.threshold))
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Description like "3-of-5"
    pub fn description(&self) -> String {
        self.config.description()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::RecordingDispatcher;

    fn five_owners() -> Vec<String> {
        (0..5).map(|i| format!("owner-{}", i)).collect()
    }

    fn three_of_five() -> Ledger {
        let config = LedgerConfig::new(five_owners(), 3, None).unwrap();
        Ledger::new(config)
    }

    #[test]
    fn test_quorum_flow() {
        let mut ledger = three_of_five();
        let dispatcher = RecordingDispatcher::new();

        let index = ledger.submit("owner-0", "recipient", 0, vec![]).unwrap();
        assert_eq!(index, 0);

        ledger.confirm("owner-0", index).unwrap();
        ledger.confirm("owner-1", index).unwrap();
        ledger.confirm("owner-2", index).unwrap();
        assert_eq!(ledger.confirmation_count(index), Some(3));
        assert_eq!(ledger.status(index), Some(OperationStatus::Approved));

        ledger.execute("owner-0", index, &dispatcher).unwrap();
        assert_eq!(ledger.status(index), Some(OperationStatus::Executed));

        let last = ledger.events().all().last().unwrap();
        assert_eq!(
            last.kind,
            EventKind::Executed {
                executor: "owner-0".to_string(),
                index: 0
            }
        );

        // At-most-once
        let again = ledger.execute("owner-1", index, &dispatcher);
        assert!(matches!(again, Err(LedgerError::AlreadyExecuted(0))));
    }

    #[test]
    fn test_submit_requires_owner() {
        let mut ledger = three_of_five();

        let result = ledger.submit("stranger", "recipient", 10, vec![]);
        assert!(matches!(result, Err(LedgerError::Unauthorized(_))));
        assert_eq!(ledger.operation_count(), 0);
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn test_submit_does_not_confirm_proposer() {
        let mut ledger = three_of_five();

        let index = ledger.submit("owner-0", "recipient", 10, vec![]).unwrap();
        assert_eq!(ledger.confirmation_count(index), Some(0));
        assert_eq!(ledger.is_confirmed(index, "owner-0"), Some(false));
    }

    #[test]
    fn test_confirm_guards() {
        let mut ledger = three_of_five();
        let index = ledger.submit("owner-0", "recipient", 0, vec![]).unwrap();

        assert!(matches!(
            ledger.confirm("stranger", index),
            Err(LedgerError::Unauthorized(_))
        ));
        assert!(matches!(
            ledger.confirm("owner-0", 7),
            Err(LedgerError::NotFound(7))
        ));

        ledger.confirm("owner-0", index).unwrap();
        let repeat = ledger.confirm("owner-0", index);
        assert!(matches!(repeat, Err(LedgerError::AlreadyConfirmed { .. })));
        // Rejected attempt leaves the count untouched
        assert_eq!(ledger.confirmation_count(index), Some(1));
    }

    #[test]
    fn test_confirm_after_execute_rejected() {
        let mut ledger = three_of_five();
        let dispatcher = RecordingDispatcher::new();
        let index = ledger.submit("owner-0", "recipient", 0, vec![]).unwrap();

        for owner in ["owner-0", "owner-1", "owner-2"] {
            ledger.confirm(owner, index).unwrap();
        }
        ledger.execute("owner-0", index, &dispatcher).unwrap();

        let late = ledger.confirm("owner-3", index);
        assert!(matches!(late, Err(LedgerError::AlreadyExecuted(0))));
    }

    #[test]
    fn test_over_confirmation_is_permitted() {
        let mut ledger = three_of_five();
        let index = ledger.submit("owner-0", "recipient", 0, vec![]).unwrap();

        for owner in five_owners() {
            ledger.confirm(&owner, index).unwrap();
        }
        assert_eq!(ledger.confirmation_count(index), Some(5));
        assert_eq!(ledger.status(index), Some(OperationStatus::Approved));
    }

    #[test]
    fn test_execute_guards() {
        let mut ledger = three_of_five();
        let dispatcher = RecordingDispatcher::new();
        let index = ledger.submit("owner-0", "recipient", 0, vec![]).unwrap();

        assert!(matches!(
            ledger.execute("stranger", index, &dispatcher),
            Err(LedgerError::Unauthorized(_))
        ));
        assert!(matches!(
            ledger.execute("owner-0", 9, &dispatcher),
            Err(LedgerError::NotFound(9))
        ));

        ledger.confirm("owner-0", index).unwrap();
        ledger.confirm("owner-1", index).unwrap();
        let early = ledger.execute("owner-0", index, &dispatcher);
        assert!(matches!(
            early,
            Err(LedgerError::InsufficientConfirmations { have: 2, need: 3 })
        ));
        assert_eq!(ledger.status(index), Some(OperationStatus::Pending));
    }

    #[test]
    fn test_transfer_moves_balance() {
        let mut ledger = three_of_five();
        let dispatcher = RecordingDispatcher::new();

        ledger.deposit("faucet", 1_000);
        let index = ledger.submit("owner-0", "recipient", 400, vec![]).unwrap();
        for owner in ["owner-0", "owner-1", "owner-2"] {
            ledger.confirm(owner, index).unwrap();
        }
        ledger.execute("owner-3", index, &dispatcher).unwrap();

        assert_eq!(ledger.balance(), 600);
        let deliveries = dispatcher.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].target, "recipient");
        assert_eq!(deliveries[0].amount, 400);
    }

    #[test]
    fn test_insufficient_balance_rolls_back() {
        let mut ledger = three_of_five();
        let dispatcher = RecordingDispatcher::new();

        ledger.deposit("faucet", 100);
        let index = ledger.submit("owner-0", "recipient", 500, vec![]).unwrap();
        for owner in ["owner-0", "owner-1", "owner-2"] {
            ledger.confirm(owner, index).unwrap();
        }

        let result = ledger.execute("owner-0", index, &dispatcher);
        assert!(matches!(result, Err(LedgerError::TransferFailed { .. })));

        // No partial effect
        assert_eq!(ledger.balance(), 100);
        assert!(!ledger.operation(index).unwrap().executed);
        assert_eq!(ledger.confirmation_count(index), Some(3));
        assert_eq!(dispatcher.delivery_count(), 0);

        // Funding the pool makes the same operation executable
        ledger.deposit("faucet", 400);
        ledger.execute("owner-0", index, &dispatcher).unwrap();
        assert_eq!(ledger.balance(), 0);
    }

    #[test]
    fn test_failed_call_rolls_back() {
        let mut ledger = three_of_five();
        let dispatcher = RecordingDispatcher::new();
        dispatcher.fail_target("token");

        ledger.deposit("faucet", 50);
        let index = ledger
            .submit("owner-0", "token", 50, vec![0xa9, 0x05, 0x9c, 0xbb])
            .unwrap();
        for owner in ["owner-0", "owner-1", "owner-2"] {
            ledger.confirm(owner, index).unwrap();
        }

        let result = ledger.execute("owner-0", index, &dispatcher);
        assert!(matches!(result, Err(LedgerError::CallFailed { .. })));
        assert_eq!(ledger.balance(), 50);
        assert!(!ledger.operation(index).unwrap().executed);

        // Retry once the target recovers
        dispatcher.clear_failure("token");
        ledger.execute("owner-0", index, &dispatcher).unwrap();
        assert_eq!(ledger.balance(), 0);
        assert_eq!(dispatcher.delivery_count(), 1);
    }

    #[test]
    fn test_failed_plain_transfer_reports_transfer_failed() {
        let mut ledger = three_of_five();
        let dispatcher = RecordingDispatcher::new();
        dispatcher.fail_target("recipient");

        ledger.deposit("faucet", 10);
        let index = ledger.submit("owner-0", "recipient", 10, vec![]).unwrap();
        for owner in ["owner-0", "owner-1", "owner-2"] {
            ledger.confirm(owner, index).unwrap();
        }

        let result = ledger.execute("owner-0", index, &dispatcher);
        assert!(matches!(result, Err(LedgerError::TransferFailed { .. })));
    }

    #[test]
    fn test_zero_effect_execute_skips_dispatcher() {
        let mut ledger = three_of_five();
        let dispatcher = RecordingDispatcher::new();

        let index = ledger.submit("owner-0", "recipient", 0, vec![]).unwrap();
        for owner in ["owner-0", "owner-1", "owner-2"] {
            ledger.confirm(owner, index).unwrap();
        }
        ledger.execute("owner-0", index, &dispatcher).unwrap();

        assert_eq!(dispatcher.delivery_count(), 0);
        assert!(ledger.operation(index).unwrap().executed);
    }

    #[test]
    fn test_deposit_accepts_anyone_including_zero() {
        let mut ledger = three_of_five();

        assert_eq!(ledger.deposit("stranger", 1_000_000_000_000_000_000), 1_000_000_000_000_000_000);
        assert_eq!(ledger.deposit("stranger", 0), 1_000_000_000_000_000_000);

        let events = ledger.events().all();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].kind,
            EventKind::Deposit {
                sender: "stranger".to_string(),
                amount: 1_000_000_000_000_000_000
            }
        );
        assert_eq!(
            events[1].kind,
            EventKind::Deposit {
                sender: "stranger".to_string(),
                amount: 0
            }
        );
    }

    #[test]
    fn test_balance_accounting_over_sequence() {
        let mut ledger = three_of_five();
        let dispatcher = RecordingDispatcher::new();

        ledger.deposit("a", 300);
        ledger.deposit("b", 200);

        let first = ledger.submit("owner-0", "x", 150, vec![]).unwrap();
        let second = ledger.submit("owner-1", "y", 250, vec![]).unwrap();
        for owner in ["owner-0", "owner-1", "owner-2"] {
            ledger.confirm(owner, first).unwrap();
            ledger.confirm(owner, second).unwrap();
        }

        ledger.execute("owner-0", first, &dispatcher).unwrap();
        ledger.execute("owner-0", second, &dispatcher).unwrap();

        // total deposited minus total transferred
        assert_eq!(ledger.balance(), 300 + 200 - 150 - 250);
    }

    #[test]
    fn test_event_order_for_full_lifecycle() {
        let mut ledger = three_of_five();
        let dispatcher = RecordingDispatcher::new();

        ledger.deposit("faucet", 10);
        let index = ledger.submit("owner-0", "recipient", 10, vec![]).unwrap();
        ledger.confirm("owner-0", index).unwrap();
        ledger.confirm("owner-1", index).unwrap();
        ledger.confirm("owner-2", index).unwrap();
        ledger.execute("owner-0", index, &dispatcher).unwrap();

        let kinds: Vec<&str> = ledger
            .events()
            .all()
            .iter()
            .map(|e| match e.kind {
                EventKind::Deposit { .. } => "deposit",
                EventKind::Submitted { .. } => "submitted",
                EventKind::Confirmed { .. } => "confirmed",
                EventKind::Executed { .. } => "executed",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "deposit",
                "submitted",
                "confirmed",
                "confirmed",
                "confirmed",
                "executed"
            ]
        );
    }

    #[test]
    fn test_address_is_deterministic() {
        let config1 = LedgerConfig::new(five_owners(), 3, None).unwrap();
        let config2 = LedgerConfig::new(five_owners(), 3, None).unwrap();

        let ledger1 = Ledger::new(config1);
        let ledger2 = Ledger::new(config2);

        assert_eq!(ledger1.address(), ledger2.address());
        assert!(ledger1.address().starts_with('3'));

        // A different threshold is a different ledger
        let config3 = LedgerConfig::new(five_owners(), 2, None).unwrap();
        assert_ne!(Ledger::new(config3).address(), ledger1.address());
    }

    #[test]
    fn test_rebuild_index_restores_authorization() {
        let ledger = three_of_five();
        let json = serde_json::to_string(&ledger).unwrap();

        let mut restored: Ledger = serde_json::from_str(&json).unwrap();
        assert!(!restored.is_owner("owner-0"));

        restored.rebuild_index();
        assert!(restored.is_owner("owner-0"));
        assert!(!restored.is_owner("stranger"));
    }
}
