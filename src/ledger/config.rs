//! Ledger configuration
//!
//! The owner registry and approval threshold, fixed at construction.

use crate::ledger::ledger::LedgerError;
use serde::{Deserialize, Serialize};

/// Configuration for a quorum ledger: who may act, and how many distinct
/// confirmations an operation needs before it can execute.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LedgerConfig {
    /// Ordered list of owner identifiers (distinct, non-empty)
    pub owners: Vec<String>,
    /// Confirmations required before execution (1..=owners.len())
    pub threshold: u32,
    /// Optional human-readable label
    pub label: Option<String>,
}

impl LedgerConfig {
    /// Create a validated configuration.
    ///
    /// # Errors
    /// Returns `InvalidOwnerSet` if the owner list is empty or contains a
    /// duplicate, `InvalidThreshold` if the threshold is zero or exceeds the
    /// owner count.
    pub fn new(
        owners: Vec<String>,
        threshold: u32,
        label: Option<String>,
    ) -> Result<Self, LedgerError> {
        if owners.is_empty() {
            return Err(LedgerError::InvalidOwnerSet(
                "owner list is empty".to_string(),
            ));
        }

        // Duplicate check via sorted scan
        let mut sorted = owners.clone();
        sorted.sort();
        for i in 1..sorted.len() {
            if sorted[i] == sorted[i - 1] {
                return Err(LedgerError::InvalidOwnerSet(format!(
                    "duplicate owner {}",
                    sorted[i]
                )));
            }
        }

        if threshold == 0 {
            return Err(LedgerError::InvalidThreshold(
                "threshold must be at least 1".to_string(),
            ));
        }

        if threshold as usize > owners.len() {
            return Err(LedgerError::InvalidThreshold(format!(
                "threshold {} exceeds owner count {}",
                threshold,
                owners.len()
            )));
        }

        Ok(Self {
            owners,
            threshold,
            label,
        })
    }

    /// Required confirmation count
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Number of registered owners
    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    /// Registered owners, in construction order
    pub fn owners(&self) -> &[String] {
        &self.owners
    }

    /// Linear membership check; the ledger keeps a hash set for hot paths
    pub fn is_owner(&self, id: &str) -> bool {
        self.owners.iter().any(|o| o == id)
    }

    /// Description like "3-of-5"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.threshold, self.owners.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_owners() -> Vec<String> {
        vec![
            "owner-a".to_string(),
            "owner-b".to_string(),
            "owner-c".to_string(),
        ]
    }

    #[test]
    fn test_config_creation() {
        let config = LedgerConfig::new(sample_owners(), 2, Some("Ops".to_string())).unwrap();

        assert_eq!(config.threshold(), 2);
        assert_eq!(config.owner_count(), 3);
        assert_eq!(config.description(), "2-of-3");
        assert!(config.label.is_some());
    }

    #[test]
    fn test_empty_owner_list_rejected() {
        let result = LedgerConfig::new(vec![], 1, None);
        assert!(matches!(result, Err(LedgerError::InvalidOwnerSet(_))));
    }

    #[test]
    fn test_duplicate_owner_rejected() {
        let result = LedgerConfig::new(
            vec!["same".to_string(), "other".to_string(), "same".to_string()],
            2,
            None,
        );
        assert!(matches!(result, Err(LedgerError::InvalidOwnerSet(_))));
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let result = LedgerConfig::new(sample_owners(), 0, None);
        assert!(matches!(result, Err(LedgerError::InvalidThreshold(_))));
    }

    #[test]
    fn test_threshold_exceeding_owner_count_rejected() {
        let result = LedgerConfig::new(sample_owners(), 7, None);
        assert!(matches!(result, Err(LedgerError::InvalidThreshold(_))));
    }

    #[test]
    fn test_empty_list_reported_before_threshold() {
        // An empty list with a bad threshold is an owner-set error
        let result = LedgerConfig::new(vec![], 0, None);
        assert!(matches!(result, Err(LedgerError::InvalidOwnerSet(_))));
    }

    #[test]
    fn test_is_owner() {
        let config = LedgerConfig::new(sample_owners(), 2, None).unwrap();
        assert!(config.is_owner("owner-a"));
        assert!(!config.is_owner("stranger"));
    }

    #[test]
    fn test_threshold_equal_to_owner_count_allowed() {
        let config = LedgerConfig::new(sample_owners(), 3, None).unwrap();
        assert_eq!(config.description(), "3-of-3");
    }
}
