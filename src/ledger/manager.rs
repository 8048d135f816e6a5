//! Ledger instance manager
//!
//! Holds every ledger in the system, keyed by derived address, and routes
//! calls to the right instance.

use crate::dispatch::Dispatcher;
use crate::ledger::config::LedgerConfig;
use crate::ledger::ledger::{Ledger, LedgerError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Manager for ledger instances
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LedgerManager {
    /// Ledgers by address
    ledgers: HashMap<String, Ledger>,
}

impl LedgerManager {
    /// Create a new empty manager
    pub fn new() -> Self {
        Self {
            ledgers: HashMap::new(),
        }
    }

    /// Create a ledger from a validated configuration.
    ///
    /// The same configuration derives the same address, so repeating a
    /// creation returns the existing instance instead of resetting it.
    pub fn create_ledger(&mut self, config: LedgerConfig) -> &Ledger {
        let ledger = Ledger::new(config);
        let address = ledger.address().to_string();

        if !self.ledgers.contains_key(&address) {
            log::info!(
                "ledger created: {} ({})",
                address,
                ledger.description()
            );
            self.ledgers.insert(address.clone(), ledger);
        }
        self.ledgers.get(&address).expect("just inserted")
    }

    /// Get a ledger by address
    pub fn get(&self, address: &str) -> Option<&Ledger> {
        self.ledgers.get(address)
    }

    fn get_mut(&mut self, address: &str) -> Result<&mut Ledger, LedgerError> {
        self.ledgers
            .get_mut(address)
            .ok_or_else(|| LedgerError::LedgerNotFound(address.to_string()))
    }

    /// List all ledgers
    pub fn list(&self) -> Vec<&Ledger> {
        self.ledgers.values().collect()
    }

    pub fn count(&self) -> usize {
        self.ledgers.len()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.ledgers.contains_key(address)
    }

    /// Rebuild every ledger's owner membership set after deserialization
    pub fn rebuild_indexes(&mut self) {
        for ledger in self.ledgers.values_mut() {
            ledger.rebuild_index();
        }
    }

    // =========================================================================
    // Routed operations
    // =========================================================================

    /// Deposit into a ledger's pool; returns the new balance.
    pub fn deposit(
        &mut self,
        address: &str,
        sender: &str,
        amount: u128,
    ) -> Result<u128, LedgerError> {
        Ok(self.get_mut(address)?.deposit(sender, amount))
    }

    /// Submit a new operation; returns its index.
    pub fn submit(
        &mut self,
        address: &str,
        proposer: &str,
        target: &str,
        amount: u128,
        payload: Vec<u8>,
    ) -> Result<u64, LedgerError> {
        self.get_mut(address)?.submit(proposer, target, amount, payload)
    }

    /// Confirm an operation.
    pub fn confirm(&mut self, address: &str, owner: &str, index: u64) -> Result<(), LedgerError> {
        self.get_mut(address)?.confirm(owner, index)
    }

    /// Execute an approved operation through the given dispatcher.
    pub fn execute(
        &mut self,
        address: &str,
        executor: &str,
        index: u64,
        dispatcher: &dyn Dispatcher,
    ) -> Result<(), LedgerError> {
        self.get_mut(address)?.execute(executor, index, dispatcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::RecordingDispatcher;

    fn sample_config() -> LedgerConfig {
        LedgerConfig::new(
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            2,
            Some("Treasury".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn test_manager_creation() {
        let manager = LedgerManager::new();
        assert_eq!(manager.count(), 0);
    }

    #[test]
    fn test_create_is_idempotent_for_same_config() {
        let mut manager = LedgerManager::new();

        let address = manager.create_ledger(sample_config()).address().to_string();
        assert!(address.starts_with('3'));
        assert_eq!(manager.count(), 1);

        // Second creation with the same config keeps the existing instance
        manager.deposit(&address, "faucet", 10).unwrap();
        let again = manager.create_ledger(sample_config());
        assert_eq!(again.address(), address);
        assert_eq!(again.balance(), 10);
        assert_eq!(manager.count(), 1);
    }

    #[test]
    fn test_unknown_address_is_rejected() {
        let mut manager = LedgerManager::new();

        let result = manager.deposit("nowhere", "faucet", 1);
        assert!(matches!(result, Err(LedgerError::LedgerNotFound(_))));

        let result = manager.confirm("nowhere", "a", 0);
        assert!(matches!(result, Err(LedgerError::LedgerNotFound(_))));
    }

    #[test]
    fn test_routed_lifecycle() {
        let mut manager = LedgerManager::new();
        let dispatcher = RecordingDispatcher::new();
        let address = manager.create_ledger(sample_config()).address().to_string();

        manager.deposit(&address, "faucet", 100).unwrap();
        let index = manager
            .submit(&address, "a", "recipient", 40, vec![])
            .unwrap();
        manager.confirm(&address, "a", index).unwrap();
        manager.confirm(&address, "b", index).unwrap();
        manager.execute(&address, "c", index, &dispatcher).unwrap();

        let ledger = manager.get(&address).unwrap();
        assert_eq!(ledger.balance(), 60);
        assert!(ledger.operation(index).unwrap().executed);
    }

    #[test]
    fn test_rebuild_indexes_after_roundtrip() {
        let mut manager = LedgerManager::new();
        let address = manager.create_ledger(sample_config()).address().to_string();

        let json = serde_json::to_string(&manager).unwrap();
        let mut restored: LedgerManager = serde_json::from_str(&json).unwrap();
        restored.rebuild_indexes();

        // Authorization works again after the rebuild
        let index = restored.submit(&address, "a", "recipient", 0, vec![]).unwrap();
        assert_eq!(index, 0);
    }
}
