//! Lifecycle notifications for external fan-out.

use std::sync::Mutex;

use serde::Serialize;

use crate::types::{AccountId, BookingId, EntryId};

/// Emitted after a state change commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum LifecycleEvent {
    BookingCreated {
        booking_id: BookingId,
        owner_id: AccountId,
    },
    BookingCancelled {
        booking_id: BookingId,
        cancelled_by: AccountId,
        refunded: i64,
    },
    GrantApproved {
        entry_id: EntryId,
        account_id: AccountId,
        amount: i64,
    },
}

/// Receives lifecycle events. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &LifecycleEvent);
}

/// Logs each event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: &LifecycleEvent) {
        tracing::info!(?event, "lifecycle event");
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: &LifecycleEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingSink::default();
        sink.publish(&LifecycleEvent::BookingCreated {
            booking_id: BookingId::new(1),
            owner_id: AccountId::new(2),
        });
        sink.publish(&LifecycleEvent::BookingCancelled {
            booking_id: BookingId::new(1),
            cancelled_by: AccountId::new(2),
            refunded: 20,
        });
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], LifecycleEvent::BookingCancelled { refunded: 20, .. }));
    }

    #[test]
    fn test_events_serialize_with_tag() {
        let json = serde_json::to_value(LifecycleEvent::GrantApproved {
            entry_id: EntryId::new(4),
            account_id: AccountId::new(2),
            amount: 30,
        })
        .unwrap();
        assert_eq!(json["event"], "grantApproved");
        assert_eq!(json["amount"], 30);
    }
}
