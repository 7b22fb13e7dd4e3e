//! Pipeline event bus for the replay uploader.
//!
//! Every stage of the detection and upload pipeline reports its transitions
//! here as typed events with sequential identifiers. Internally it uses
//! `tokio::broadcast` with a bounded buffer plus a small ring of recent events;
//! when either overflows the oldest events are dropped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::sync::broadcast::{Receiver, Sender};

/// Identifier assigned to each event emitted by the pipeline.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
const DEFAULT_REPLAY_CAPACITY: usize = 256;

/// Typed pipeline events.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    WatchStarted {
        paths: Vec<String>,
    },
    WatchError {
        message: String,
    },
    ReplayDetected {
        path: String,
    },
    ReplayStable {
        path: String,
        size_bytes: u64,
    },
    UploadAccepted {
        rqid: String,
        map: String,
    },
    UploadFailed {
        map: String,
        message: String,
    },
    StatusPending {
        rqid: String,
        attempt: u32,
    },
    ReplayProcessed {
        rqid: String,
        map: String,
        replay_id: String,
    },
    StatusFailed {
        rqid: String,
        map: String,
        message: String,
    },
}

impl Event {
    /// Machine-friendly discriminator.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Event::WatchStarted { .. } => "watch_started",
            Event::WatchError { .. } => "watch_error",
            Event::ReplayDetected { .. } => "replay_detected",
            Event::ReplayStable { .. } => "replay_stable",
            Event::UploadAccepted { .. } => "upload_accepted",
            Event::UploadFailed { .. } => "upload_failed",
            Event::StatusPending { .. } => "status_pending",
            Event::ReplayProcessed { .. } => "replay_processed",
            Event::StatusFailed { .. } => "status_failed",
        }
    }

    /// Whether the event ends the lifecycle of a replay.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Event::UploadFailed { .. } | Event::ReplayProcessed { .. } | Event::StatusFailed { .. }
        )
    }
}

/// Metadata wrapper around events.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    pub event: Event,
}

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    buffer: Arc<Mutex<VecDeque<EventEnvelope>>>,
    next_id: Arc<AtomicU64>,
    replay_capacity: usize,
}

impl EventBus {
    /// Construct a new bus with the provided broadcast capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "event bus capacity must be positive");
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            next_id: Arc::new(AtomicU64::new(1)),
            replay_capacity: capacity,
        }
    }

    /// Construct a bus with the default in-memory buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish a new event to the bus, assigning it a sequential identifier.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    pub fn publish(&self, event: Event) -> EventId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };

        {
            let mut buffer = self.buffer.lock().expect("event buffer mutex poisoned");
            if buffer.len() == self.replay_capacity {
                buffer.pop_front();
            }
            buffer.push_back(envelope.clone());
        }

        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
        }
    }

    /// Snapshot of the buffered events, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    #[must_use]
    pub fn recent(&self) -> Vec<EventEnvelope> {
        let buffer = self.buffer.lock().expect("event buffer mutex poisoned");
        buffer.iter().cloned().collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Live view of the broadcast channel; events missed while lagging are skipped.
pub struct EventStream {
    receiver: Receiver<EventEnvelope>,
}

impl EventStream {
    /// Receive the next event, or `None` once every bus handle is gone.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn detected(index: usize) -> Event {
        Event::ReplayDetected {
            path: format!("/replays/game-{index}.SC2Replay"),
        }
    }

    #[tokio::test]
    async fn ids_are_sequential_and_subscribers_only_see_later_events() {
        let bus = EventBus::with_capacity(16);

        let mut last_id = 0;
        for i in 0..2 {
            last_id = bus.publish(detected(i));
        }
        assert_eq!(last_id, 2);

        let mut stream = bus.subscribe();
        for i in 2..5 {
            bus.publish(detected(i));
        }
        let mut received = Vec::new();
        for _ in 0..3 {
            if let Some(event) = stream.next().await {
                received.push(event.id);
            }
        }

        assert_eq!(received, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn replay_ring_drops_oldest_entries() {
        let bus = EventBus::with_capacity(2);
        for i in 0..4 {
            bus.publish(detected(i));
        }

        let ids: Vec<_> = bus.recent().iter().map(|envelope| envelope.id).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[tokio::test]
    async fn live_subscribers_receive_new_events() {
        let bus = EventBus::new();
        let mut stream = bus.subscribe();

        bus.publish(Event::UploadAccepted {
            rqid: "R1".to_string(),
            map: "Equilibrium LE".to_string(),
        });

        let envelope = timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("event not delivered")
            .expect("bus closed");
        assert_eq!(envelope.event.kind(), "upload_accepted");
        assert!(!envelope.event.is_terminal());
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::StatusFailed {
            rqid: "R9".to_string(),
            map: "Goldenaura LE".to_string(),
            message: "status 500".to_string(),
        };
        let value = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(value["type"], "status_failed");
        assert!(event.is_terminal());
    }
}
