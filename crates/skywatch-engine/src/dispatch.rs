//! Event fan-out to subscribed observers.
//!
//! Publishing is fire-and-forget relative to the tick loop: events go into
//! a bounded broadcast ring and each observer consumes at its own pace. An
//! observer that falls off the ring loses its oldest pending events and is
//! handed a [`EngineEvent::Resync`] marker so it knows to refetch a full
//! snapshot instead of trusting its incremental view.

use serde::Serialize;
use tokio::sync::broadcast;

use skywatch_core::{AircraftState, Notification};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    AircraftUpdated { state: AircraftState },
    AircraftRemoved { id: String },
    NotificationCreated { notification: Notification },
    NotificationResolved { notification: Notification },
    /// The observer lagged and `missed` events were dropped; resynchronize
    /// from a fresh snapshot.
    Resync { missed: u64 },
}

pub struct Dispatcher {
    tx: broadcast::Sender<EngineEvent>,
}

impl Dispatcher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Register a new observer. Dropping the returned stream unsubscribes;
    /// both are safe at any time, including mid-broadcast.
    pub fn subscribe(&self) -> EventStream {
        EventStream {
            rx: self.tx.subscribe(),
        }
    }

    /// Send one event to every current observer. Never blocks; an event
    /// published with no observers is discarded.
    pub fn publish(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }

    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// One observer's view of the event feed.
pub struct EventStream {
    rx: broadcast::Receiver<EngineEvent>,
}

impl EventStream {
    /// Next event, or `None` once the engine is gone. A lagging observer
    /// gets a single `Resync` in place of its dropped events.
    pub async fn next(&mut self) -> Option<EngineEvent> {
        match self.rx.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                Some(EngineEvent::Resync { missed })
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Non-blocking variant used by tests and polling consumers.
    pub fn try_next(&mut self) -> Option<EngineEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                Some(EngineEvent::Resync { missed })
            }
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn removed(id: &str) -> EngineEvent {
        EngineEvent::AircraftRemoved { id: id.into() }
    }

    #[tokio::test]
    async fn observers_receive_published_events() {
        let dispatcher = Dispatcher::new(8);
        let mut stream = dispatcher.subscribe();

        dispatcher.publish(removed("N100"));
        match stream.next().await {
            Some(EngineEvent::AircraftRemoved { id }) => assert_eq!(id, "N100"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn lagging_observer_gets_resync_marker_not_silent_loss() {
        let dispatcher = Dispatcher::new(4);
        let mut slow = dispatcher.subscribe();

        for i in 0..10 {
            dispatcher.publish(removed(&format!("N{i}")));
        }

        match slow.next().await {
            Some(EngineEvent::Resync { missed }) => assert!(missed > 0),
            other => panic!("expected resync, got {other:?}"),
        }
        // After the marker the stream continues with the retained tail.
        assert!(slow.next().await.is_some());
    }

    #[tokio::test]
    async fn slow_observer_does_not_block_others() {
        let dispatcher = Dispatcher::new(4);
        let mut _slow = dispatcher.subscribe();
        let mut fast = dispatcher.subscribe();

        for i in 0..3 {
            dispatcher.publish(removed(&format!("N{i}")));
            // Fast observer keeps up while the slow one never reads.
            assert!(matches!(
                fast.next().await,
                Some(EngineEvent::AircraftRemoved { .. })
            ));
        }
    }

    #[tokio::test]
    async fn unsubscribe_mid_broadcast_is_safe() {
        let dispatcher = Dispatcher::new(4);
        let stream = dispatcher.subscribe();
        let mut other = dispatcher.subscribe();

        dispatcher.publish(removed("N1"));
        drop(stream);
        dispatcher.publish(removed("N2"));

        assert!(other.next().await.is_some());
        assert!(other.next().await.is_some());
        assert_eq!(dispatcher.observer_count(), 1);
    }

    #[tokio::test]
    async fn publishing_without_observers_is_a_no_op() {
        let dispatcher = Dispatcher::new(4);
        dispatcher.publish(removed("N1"));
        assert_eq!(dispatcher.observer_count(), 0);
    }
}
