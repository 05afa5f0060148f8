//! `jokester-skill` – the joke-telling behavior coordinator.
//!
//! A skill hosted by the robot runtime: on start it introduces itself, then
//! tells a fixed run of jokes on a heartbeat while fidgeting with head, arms
//! and LED, and greets faces between jokes.
//!
//! # Modules
//!
//! - [`coordinator`] – [`BehaviorCoordinator`]: owns run state, timers and
//!   event listeners; implements [`RobotSkill`].
//! - [`session`] – [`SessionState`] and the lock-protected session record
//!   with its transition rules.
//! - [`config`] – [`SkillConfig`]: volumes, timer schedules, pacing and the
//!   joke script.  Deserialises from TOML with every field optional.
//! - [`catalog`] – [`AssetCatalog`]: the robot's clip and image names, and
//!   the fallback-clip rule.
//! - [`playback`] – [`PlaybackTracker`]: last completed clip, with wake-ups
//!   for sequences waiting on a clip.
//! - [`timers`] – [`TimerSet`]: the four periodic timers.
//! - [`ambient`] – random head, arm and LED commands.
//! - [`lifecycle`] – [`RobotSkill`] and [`SkillManifest`].
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing].

pub mod ambient;
pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod lifecycle;
pub mod playback;
pub mod session;
pub mod telemetry;
pub mod timers;

pub use catalog::AssetCatalog;
pub use config::{IdentityGreeting, IntroLine, JokeScript, Pacing, SkillConfig, TimerSchedule};
pub use coordinator::{BehaviorCoordinator, FaceReaction, HeartbeatOutcome};
pub use lifecycle::{RobotSkill, SkillManifest, SkillParameters};
pub use playback::PlaybackTracker;
pub use session::SessionState;
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use timers::{TimerKind, TimerSet};
