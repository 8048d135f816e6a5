//! Ledger event log
//!
//! Every state transition appends one event. The log is append-only and is
//! persisted with the ledger, so observers can replay or tail it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened, with the identities involved
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum EventKind {
    /// Assets received into the pool
    Deposit { sender: String, amount: u128 },
    /// A new operation was appended to the log
    Submitted {
        proposer: String,
        index: u64,
        target: String,
        amount: u128,
        #[serde(with = "hex::serde")]
        payload: Vec<u8>,
    },
    /// An owner confirmed an operation
    Confirmed { confirmer: String, index: u64 },
    /// An operation's external effect completed
    Executed { executor: String, index: u64 },
}

/// One entry in the event log
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Append-order sequence number, never reused
    pub seq: u64,
    /// When the event was recorded
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Append-only event log
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, assigning the next sequence number, and return it.
    pub fn record(&mut self, kind: EventKind) -> &Event {
        let event = Event {
            seq: self.events.len() as u64,
            at: Utc::now(),
            kind,
        };
        self.events.push(event);
        self.events.last().expect("just pushed")
    }

    /// All events in append order
    pub fn all(&self) -> &[Event] {
        &self.events
    }

    /// Events with `seq >= from`
    pub fn since(&self, from: u64) -> &[Event] {
        let start = (from as usize).min(self.events.len());
        &self.events[start..]
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_numbers_are_append_order() {
        let mut log = EventLog::new();

        log.record(EventKind::Deposit {
            sender: "anyone".to_string(),
            amount: 100,
        });
        log.record(EventKind::Confirmed {
            confirmer: "alice".to_string(),
            index: 0,
        });

        let events = log.all();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].seq, 0);
        assert_eq!(events[1].seq, 1);
    }

    #[test]
    fn test_since_returns_suffix() {
        let mut log = EventLog::new();
        for i in 0..5 {
            log.record(EventKind::Confirmed {
                confirmer: "alice".to_string(),
                index: i,
            });
        }

        assert_eq!(log.since(0).len(), 5);
        assert_eq!(log.since(3).len(), 2);
        assert_eq!(log.since(3)[0].seq, 3);
        assert!(log.since(99).is_empty());
    }

    #[test]
    fn test_event_json_shape() {
        let mut log = EventLog::new();
        log.record(EventKind::Submitted {
            proposer: "alice".to_string(),
            index: 0,
            target: "carol".to_string(),
            amount: 7,
            payload: vec![0xab],
        });

        let json = serde_json::to_value(log.all()[0].clone()).unwrap();
        assert_eq!(json["type"], "Submitted");
        assert_eq!(json["data"]["payload"], "ab");
        assert_eq!(json["seq"], 0);
    }
}
