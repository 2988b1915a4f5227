//! Event types for the song registry event system
//!
//! Provides the SongEvent enum and the EventBus used to fan events out to
//! SSE clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::models::SongStatus;

/// Song registry event types
///
/// Serialized with a `type` tag for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SongEvent {
    /// A song was accepted by the BaaS and added as pending
    SongRegistered {
        /// Tracking ID of the new record
        data_id: String,
        /// Song title
        title: String,
        /// BaaS task ID, if the acknowledgement carried one
        baas_task_id: Option<String>,
        /// When the record was created
        timestamp: DateTime<Utc>,
    },

    /// A webhook settled a pending song
    SongSettled {
        /// Tracking ID of the settled record
        data_id: String,
        /// Confirmed or failed
        status: SongStatus,
        /// On-chain transaction ID reported by the webhook
        transaction_id: Option<String>,
        /// When the webhook was applied
        timestamp: DateTime<Utc>,
    },
}

impl SongEvent {
    /// Event name used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            SongEvent::SongRegistered { .. } => "SongRegistered",
            SongEvent::SongSettled { .. } => "SongSettled",
        }
    }
}

/// Central event distribution bus
///
/// Wraps `tokio::sync::broadcast`: publishing never blocks, slow
/// subscribers observe `Lagged` instead of stalling producers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SongEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SongEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SongEvent) {
        let event_type = event.event_type();
        if self.tx.send(event).is_err() {
            debug!("No subscribers for {} event", event_type);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settled(data_id: &str) -> SongEvent {
        SongEvent::SongSettled {
            data_id: data_id.to_string(),
            status: SongStatus::Confirmed,
            transaction_id: Some("TX".to_string()),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_emitted_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit_lossy(settled("song_1"));

        match rx.recv().await.unwrap() {
            SongEvent::SongSettled { data_id, status, .. } => {
                assert_eq!(data_id, "song_1");
                assert_eq!(status, SongStatus::Confirmed);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(10);
        // Nobody listening: dropped without panicking
        bus.emit_lossy(settled("song_1"));

        // Later subscribers only see later events
        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
        bus.emit_lossy(settled("song_2"));
        match rx.try_recv().unwrap() {
            SongEvent::SongSettled { data_id, .. } => assert_eq!(data_id, "song_2"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(settled("song_9")).unwrap();
        assert_eq!(json["type"], "SongSettled");
        assert_eq!(json["status"], "confirmed");
        assert_eq!(json["data_id"], "song_9");
    }
}
