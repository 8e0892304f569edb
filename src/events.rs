//! State-change broadcast to observers.
//!
//! Every stage publishes notifications here; the control surface and any
//! `follow` clients subscribe. Delivery is best effort in emission order,
//! and publishing never blocks a pipeline worker.

use crate::cue::Cue;
use crate::defaults;
use crate::state::TranscriptEntry;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Broadcast notification kinds, mirrored one-for-one on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    CuesUpdated {
        cues: Vec<Cue>,
    },
    SystemStatus {
        status: String,
        message: String,
    },
    SystemError {
        error: String,
    },
    TranscriptionDetected {
        entry: TranscriptEntry,
    },
    CueMatched {
        cue: Cue,
        transcript: String,
        timestamp_ms: u64,
    },
    AudioPlaying {
        file: String,
        timestamp_ms: u64,
    },
    AudioFinished {
        file: String,
        timestamp_ms: u64,
    },
}

/// Milliseconds since the Unix epoch, for wire timestamps.
pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Fan-out bus over a tokio broadcast channel.
///
/// Cloning is cheap; pipeline workers publish from plain threads and the
/// IPC server consumes from async tasks.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes an event. Dropped silently when nobody is subscribed.
    pub fn publish(&self, event: Event) {
        self.tx.send(event).ok();
    }

    /// Subscribes a new observer. Slow observers may miss events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(defaults::EVENT_BUS_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cue() -> Cue {
        Cue {
            id: 1,
            source_text: "hello".to_string(),
            first_tokens: vec!["hello".to_string()],
            audio_reference: "hello.wav".to_string(),
        }
    }

    #[test]
    fn events_serialize_with_snake_case_tags() {
        let event = Event::SystemStatus {
            status: "started".to_string(),
            message: "System started successfully".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"system_status\""));
        assert!(json.contains("\"status\":\"started\""));

        let event = Event::AudioPlaying {
            file: "line_01.wav".to_string(),
            timestamp_ms: 42,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"audio_playing\""));
    }

    #[test]
    fn events_roundtrip_through_json() {
        let events = vec![
            Event::CuesUpdated {
                cues: vec![sample_cue()],
            },
            Event::SystemError {
                error: "boom".to_string(),
            },
            Event::CueMatched {
                cue: sample_cue(),
                transcript: "hello there".to_string(),
                timestamp_ms: 7,
            },
            Event::AudioFinished {
                file: "line_01.wav".to_string(),
                timestamp_ms: 8,
            },
        ];
        for event in events {
            let json = serde_json::to_string(&event).unwrap();
            let parsed: Event = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, event);
        }
    }

    #[test]
    fn publish_without_subscribers_does_not_fail() {
        let bus = EventBus::default();
        bus.publish(Event::SystemError {
            error: "nobody listening".to_string(),
        });
    }

    #[tokio::test]
    async fn subscribers_receive_published_events_in_order() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(Event::SystemStatus {
            status: "started".to_string(),
            message: "one".to_string(),
        });
        bus.publish(Event::SystemStatus {
            status: "stopped".to_string(),
            message: "two".to_string(),
        });

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(matches!(first, Event::SystemStatus { ref status, .. } if status == "started"));
        assert!(matches!(second, Event::SystemStatus { ref status, .. } if status == "stopped"));
    }

    #[tokio::test]
    async fn each_subscriber_gets_every_event() {
        let bus = EventBus::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(Event::SystemError {
            error: "shared".to_string(),
        });

        assert!(matches!(a.recv().await.unwrap(), Event::SystemError { .. }));
        assert!(matches!(b.recv().await.unwrap(), Event::SystemError { .. }));
    }

    #[test]
    fn epoch_ms_is_monotonic_enough() {
        let a = epoch_ms();
        let b = epoch_ms();
        assert!(b >= a);
        assert!(a > 1_500_000_000_000, "expected a post-2017 timestamp");
    }
}
