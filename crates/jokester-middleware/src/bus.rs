//! Typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels so every subscriber receives every
//! event without any single subscriber blocking the others.
//!
//! # Topics
//!
//! | Topic | Traffic |
//! |---|---|
//! | [`Topic::AudioPlayback`] | "clip finished playing" notifications |
//! | [`Topic::FaceRecognition`] | detected / recognized faces |
//! | [`Topic::KeyPhrase`] | wake-up key phrase detections |
//!
//! A subscriber only sees events published after it subscribed.  Dropping a
//! [`TopicReceiver`] discards anything still buffered for it, which is how
//! single-shot subscriptions avoid queuing events.

use jokester_types::{Event, EventKind};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 64;

/// Routing lanes on the bus, one per [`EventKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    AudioPlayback,
    FaceRecognition,
    KeyPhrase,
}

impl From<EventKind> for Topic {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::AudioPlayComplete => Topic::AudioPlayback,
            EventKind::FaceRecognition => Topic::FaceRecognition,
            EventKind::KeyPhraseRecognized => Topic::KeyPhrase,
        }
    }
}

/// Shared event bus.  Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    audio_playback: broadcast::Sender<Event>,
    face_recognition: broadcast::Sender<Event>,
    key_phrase: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus with the given per-topic channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (audio_playback, _) = broadcast::channel(capacity);
        let (face_recognition, _) = broadcast::channel(capacity);
        let (key_phrase, _) = broadcast::channel(capacity);
        Self {
            audio_playback,
            face_recognition,
            key_phrase,
        }
    }

    /// Publish `event` on the topic matching its payload.
    ///
    /// Returns the number of receivers that were handed the event.  Nobody
    /// listening is normal (the skill has not registered for that kind yet),
    /// so it yields `0` rather than an error.
    pub fn publish(&self, event: Event) -> usize {
        let topic = Topic::from(event.payload.kind());
        match self.topic_sender(topic).send(event) {
            Ok(n) => n,
            Err(broadcast::error::SendError(dropped)) => {
                debug!(?topic, source = %dropped.source, "no subscribers; event dropped");
                0
            }
        }
    }

    /// Subscribe to a specific [`Topic`].
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    /// Number of live receivers on `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topic_sender(topic).receiver_count()
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::AudioPlayback => &self.audio_playback,
            Topic::FaceRecognition => &self.face_recognition,
            Topic::KeyPhrase => &self.key_phrase,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An async receiver bound to a single [`Topic`].
///
/// Obtained via [`EventBus::subscribe_to`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Lagging is logged and skipped.  Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "TopicReceiver lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jokester_types::EventPayload;
    use std::time::Duration;

    fn face(label: &str) -> Event {
        Event::new(
            "robot::face",
            EventPayload::FaceRecognition {
                label: label.to_string(),
            },
        )
    }

    fn audio(name: &str) -> Event {
        Event::new(
            "robot::audio",
            EventPayload::AudioPlayComplete {
                name: name.to_string(),
            },
        )
    }

    #[tokio::test]
    async fn publish_routes_by_payload_kind() {
        let bus = EventBus::default();
        let mut faces = bus.subscribe_to(Topic::FaceRecognition);
        let mut clips = bus.subscribe_to(Topic::AudioPlayback);

        assert_eq!(bus.publish(audio("joke1.wav")), 1);

        let got = clips.recv().await.expect("audio event");
        assert_eq!(
            got.payload,
            EventPayload::AudioPlayComplete {
                name: "joke1.wav".to_string()
            }
        );

        let nothing = tokio::time::timeout(Duration::from_millis(50), faces.recv()).await;
        assert!(nothing.is_err(), "face subscriber must not see audio events");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut a = bus.subscribe_to(Topic::FaceRecognition);
        let mut b = bus.subscribe_to(Topic::FaceRecognition);

        let event = face("Daddy");
        assert_eq!(bus.publish(event.clone()), 2);
        assert_eq!(a.recv().await.unwrap().id, event.id);
        assert_eq!(b.recv().await.unwrap().id, event.id);
    }

    #[test]
    fn publish_without_subscribers_is_not_an_error() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(face("unknown person")), 0);
    }

    #[tokio::test]
    async fn late_subscriber_misses_earlier_events() {
        let bus = EventBus::default();
        let _keep = bus.subscribe_to(Topic::FaceRecognition);
        bus.publish(face("early"));

        let mut late = bus.subscribe_to(Topic::FaceRecognition);
        let later = face("late");
        bus.publish(later.clone());
        assert_eq!(late.recv().await.unwrap().id, later.id);
    }

    #[tokio::test]
    async fn lagged_receiver_skips_to_newer_events() {
        let bus = EventBus::new(4);
        let mut slow = bus.subscribe_to(Topic::AudioPlayback);
        for i in 0..20 {
            bus.publish(audio(&format!("clip{i}.wav")));
        }
        let first = slow.recv().await.expect("event after lag");
        assert!(matches!(
            first.payload,
            EventPayload::AudioPlayComplete { ref name } if name != "clip0.wav"
        ));
    }

    #[test]
    fn subscriber_count_tracks_receivers() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(Topic::KeyPhrase), 0);
        let rx = bus.subscribe_to(Topic::KeyPhrase);
        assert_eq!(rx.topic(), Topic::KeyPhrase);
        assert_eq!(bus.subscriber_count(Topic::KeyPhrase), 1);
        drop(rx);
        assert_eq!(bus.subscriber_count(Topic::KeyPhrase), 0);
    }
}
