//! `jokester-middleware` – robot event delivery.
//!
//! # Modules
//!
//! - [`bus`] – topic-partitioned publish/subscribe event bus built on Tokio
//!   broadcast channels.  The host (or the simulator) publishes robot events
//!   onto it; the skill subscribes to the topics it has registered for.

pub mod bus;

pub use bus::{EventBus, Topic, TopicReceiver};
