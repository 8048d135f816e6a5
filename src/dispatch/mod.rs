//! External-call dispatch
//!
//! The ledger never performs outgoing transfers or calls itself; it hands
//! them to a [`Dispatcher`]. The dispatcher sees the target, the amount and
//! the opaque payload and either delivers the effect or reports failure.

use std::sync::Mutex;
use thiserror::Error;

/// Failure reported by a dispatcher when a delivery cannot be completed.
#[derive(Error, Debug, Clone)]
#[error("delivery to {target} rejected: {reason}")]
pub struct CallError {
    /// Target that rejected or could not receive the effect
    pub target: String,
    /// Human-readable failure reason
    pub reason: String,
}

impl CallError {
    pub fn new(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// Delivers the external effect of an executed operation.
///
/// Implementations must be all-or-nothing: on `Err` the effect must not have
/// been applied, since the ledger rolls the execution back.
pub trait Dispatcher {
    /// Deliver `amount` units to `target`, invoking it with `payload` if the
    /// payload is non-empty. An empty payload is a plain transfer.
    fn invoke(&self, target: &str, amount: u128, payload: &[u8]) -> Result<(), CallError>;
}

/// Default dispatcher: journals the outbound effect and reports success.
///
/// Actual settlement happens outside this system; the journal line is the
/// hand-off point for whatever rail is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDispatcher;

impl LogDispatcher {
    pub fn new() -> Self {
        Self
    }
}

impl Dispatcher for LogDispatcher {
    fn invoke(&self, target: &str, amount: u128, payload: &[u8]) -> Result<(), CallError> {
        if payload.is_empty() {
            log::info!("dispatch: transfer {} -> {}", amount, target);
        } else {
            log::info!(
                "dispatch: call {} with {} bytes, value {}",
                target,
                payload.len(),
                amount
            );
        }
        Ok(())
    }
}

/// A single delivery captured by [`RecordingDispatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub target: String,
    pub amount: u128,
    pub payload: Vec<u8>,
}

/// Test dispatcher: records every delivery and fails for scripted targets.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    deliveries: Mutex<Vec<Delivery>>,
    failing_targets: Mutex<Vec<String>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery to `target` fail.
    pub fn fail_target(&self, target: impl Into<String>) {
        self.failing_targets.lock().unwrap().push(target.into());
    }

    /// Stop failing deliveries to `target`.
    pub fn clear_failure(&self, target: &str) {
        self.failing_targets.lock().unwrap().retain(|t| t != target);
    }

    /// Deliveries captured so far.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn delivery_count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }
}

impl Dispatcher for RecordingDispatcher {
    fn invoke(&self, target: &str, amount: u128, payload: &[u8]) -> Result<(), CallError> {
        if self
            .failing_targets
            .lock()
            .unwrap()
            .iter()
            .any(|t| t == target)
        {
            return Err(CallError::new(target, "scripted failure"));
        }

        self.deliveries.lock().unwrap().push(Delivery {
            target: target.to_string(),
            amount,
            payload: payload.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_dispatcher_captures_deliveries() {
        let dispatcher = RecordingDispatcher::new();

        dispatcher.invoke("alice", 100, &[]).unwrap();
        dispatcher.invoke("bob", 0, &[0xde, 0xad]).unwrap();

        let deliveries = dispatcher.deliveries();
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].target, "alice");
        assert_eq!(deliveries[0].amount, 100);
        assert_eq!(deliveries[1].payload, vec![0xde, 0xad]);
    }

    #[test]
    fn test_scripted_failure() {
        let dispatcher = RecordingDispatcher::new();
        dispatcher.fail_target("broken");

        let err = dispatcher.invoke("broken", 10, &[]).unwrap_err();
        assert_eq!(err.target, "broken");
        assert_eq!(dispatcher.delivery_count(), 0);

        dispatcher.clear_failure("broken");
        assert!(dispatcher.invoke("broken", 10, &[]).is_ok());
        assert_eq!(dispatcher.delivery_count(), 1);
    }

    #[test]
    fn test_log_dispatcher_always_succeeds() {
        let dispatcher = LogDispatcher::new();
        assert!(dispatcher.invoke("anyone", 42, &[]).is_ok());
        assert!(dispatcher.invoke("anyone", 0, &[1, 2, 3]).is_ok());
    }
}
