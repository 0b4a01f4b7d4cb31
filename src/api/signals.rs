use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Notify;

use crate::logic::notifier::{ChangeNotifier, Signal};

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalEvent {
    pub seq: u64,
    #[serde(flatten)]
    pub signal: Signal,
}

struct HubState {
    next_seq: u64,
    events: VecDeque<SignalEvent>,
}

/// Sequence-numbered ring buffer of UI signals. Clients long-poll with the
/// last sequence they saw; the oldest events fall off once full.
pub struct SignalHub {
    state: Mutex<HubState>,
    notify: Notify,
    capacity: usize,
}

impl Default for SignalHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(HubState {
                next_seq: 1,
                events: VecDeque::with_capacity(capacity),
            }),
            notify: Notify::new(),
            capacity: capacity.max(1),
        }
    }

    /// Sequence number of the newest event, 0 when nothing was published
    pub fn latest_seq(&self) -> u64 {
        self.state.lock().next_seq - 1
    }

    pub fn since(&self, after: u64) -> Vec<SignalEvent> {
        self.state
            .lock()
            .events
            .iter()
            .filter(|event| event.seq > after)
            .cloned()
            .collect()
    }

    /// Events after `after`, waiting up to `wait` for the first one
    pub async fn wait_since(&self, after: u64, wait: Duration) -> Vec<SignalEvent> {
        let notified = self.notify.notified();
        let events = self.since(after);
        if !events.is_empty() {
            return events;
        }
        let _ = tokio::time::timeout(wait, notified).await;
        self.since(after)
    }
}

impl ChangeNotifier for SignalHub {
    fn publish(&self, signal: Signal) {
        {
            let mut state = self.state.lock();
            let seq = state.next_seq;
            state.next_seq += 1;
            if state.events.len() == self.capacity {
                state.events.pop_front();
            }
            state.events.push_back(SignalEvent { seq, signal });
        }
        self.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityKind, Severity};
    use std::sync::Arc;

    #[test]
    fn test_events_are_sequenced_and_bounded() {
        let hub = SignalHub::with_capacity(2);
        hub.kind_changed(EntityKind::Glass);
        hub.notify("Saved", Severity::Success);
        hub.modal_closed();

        assert_eq!(hub.latest_seq(), 3);
        let events = hub.since(0);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].seq, 2);
        assert_eq!(events[1].signal, Signal::ModalClosed);
        assert!(hub.since(3).is_empty());
    }

    #[test]
    fn test_event_serializes_flat() {
        let event = SignalEvent {
            seq: 4,
            signal: Signal::KindChanged {
                kind: EntityKind::Rail,
            },
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({"seq": 4, "type": "kind_changed", "kind": "rail"})
        );
    }

    #[tokio::test]
    async fn test_long_poll_wakes_on_publish() {
        let hub = Arc::new(SignalHub::new());
        let waiter = {
            let hub = hub.clone();
            tokio::spawn(async move { hub.wait_since(0, Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        hub.modal_closed();

        let events = waiter.await.unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_long_poll_times_out_empty() {
        let hub = SignalHub::new();
        let events = hub.wait_since(0, Duration::from_millis(10)).await;
        assert!(events.is_empty());
    }
}
