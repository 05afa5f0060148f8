//! In-process simulated robot for testing without physical hardware.
//!
//! [`SimRobot`] accepts every [`RobotCommand`], records it, and tracks the
//! bits of robot state a skill can change (LED, displayed image, recognition
//! subsystems, event subscriptions).  Catalog contents and failures are set up
//! through [`SimRobotBuilder`].
//!
//! # Example
//!
//! ```rust
//! use jokester_hal::{RobotCommandSink, SimRobot};
//! use jokester_types::RobotCommand;
//!
//! # tokio_test_block(async {
//! let robot = SimRobot::builder().with_audio(["joke1.wav"]).build();
//! robot.execute(RobotCommand::Stop).await.unwrap();
//! assert_eq!(robot.commands(), vec![RobotCommand::Stop]);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
//! # }
//! ```

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use jokester_types::{AssetDetails, EventSubscription, RobotCommand, Rgb, SkillError};
use tracing::{debug, instrument};

use crate::sink::RobotCommandSink;

/// Hook invoked for every command the simulator accepts.
pub type CommandObserver = Box<dyn Fn(&RobotCommand) + Send + Sync>;

// ────────────────────────────────────────────────────────────────────────────
// Observable robot state
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct SimState {
    log: Vec<RobotCommand>,
    subscriptions: Vec<EventSubscription>,
    face_recognition: bool,
    key_phrase: bool,
    led: Option<Rgb>,
    image: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// SimRobot
// ────────────────────────────────────────────────────────────────────────────

/// A simulated robot that records commands.  Succeeds unless a failure was
/// configured on the builder.
pub struct SimRobot {
    audio: Vec<AssetDetails>,
    images: Vec<AssetDetails>,
    failing_commands: HashSet<&'static str>,
    catalogs_fail: bool,
    observer: Option<CommandObserver>,
    state: Mutex<SimState>,
}

impl SimRobot {
    /// Start building a simulated robot.
    pub fn builder() -> SimRobotBuilder {
        SimRobotBuilder::default()
    }

    /// Every command accepted so far, oldest first.
    pub fn commands(&self) -> Vec<RobotCommand> {
        self.state().log.clone()
    }

    /// Names of every audio clip played so far, oldest first.
    pub fn played_audio(&self) -> Vec<String> {
        self.state()
            .log
            .iter()
            .filter_map(|c| match c {
                RobotCommand::PlayAudio { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Names of every image displayed so far, oldest first.
    pub fn displayed_images(&self) -> Vec<String> {
        self.state()
            .log
            .iter()
            .filter_map(|c| match c {
                RobotCommand::DisplayImage { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forget recorded commands.  Robot state (LED, subscriptions, …) is kept.
    pub fn clear_log(&self) {
        self.state().log.clear();
    }

    /// Subscriptions registered since the last `UnregisterAllEvents`.
    pub fn subscriptions(&self) -> Vec<EventSubscription> {
        self.state().subscriptions.clone()
    }

    pub fn face_recognition_active(&self) -> bool {
        self.state().face_recognition
    }

    pub fn key_phrase_active(&self) -> bool {
        self.state().key_phrase
    }

    /// The most recent LED color, if any was set.
    pub fn led(&self) -> Option<Rgb> {
        self.state().led
    }

    /// The image currently on screen, if any was displayed.
    pub fn current_image(&self) -> Option<String> {
        self.state().image.clone()
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        // A panic while holding the lock only happens inside a failing test;
        // keep serving the recorded data.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RobotCommandSink for SimRobot {
    #[instrument(level = "debug", skip(self), fields(command = command.label()))]
    async fn execute(&self, command: RobotCommand) -> Result<(), SkillError> {
        let label = command.label();
        if self.failing_commands.contains(label) {
            return Err(SkillError::CommandFailed {
                command: label,
                details: "simulated failure".to_string(),
            });
        }

        {
            let mut state = self.state();
            match &command {
                RobotCommand::ChangeLed(rgb) => state.led = Some(*rgb),
                RobotCommand::DisplayImage { name, .. } => state.image = Some(name.clone()),
                RobotCommand::StartFaceRecognition => state.face_recognition = true,
                RobotCommand::StopFaceRecognition => state.face_recognition = false,
                RobotCommand::StartKeyPhraseRecognition => state.key_phrase = true,
                RobotCommand::StopKeyPhraseRecognition => state.key_phrase = false,
                RobotCommand::RegisterEvent(sub) => state.subscriptions.push(sub.clone()),
                RobotCommand::UnregisterAllEvents => state.subscriptions.clear(),
                _ => {}
            }
            state.log.push(command.clone());
        }

        if let Some(observer) = &self.observer {
            observer(&command);
        }
        debug!("sim robot accepted command");
        Ok(())
    }

    async fn audio_list(&self) -> Result<Vec<AssetDetails>, SkillError> {
        if self.catalogs_fail {
            return Err(SkillError::CatalogUnavailable(
                "simulated audio list failure".to_string(),
            ));
        }
        Ok(self.audio.clone())
    }

    async fn image_list(&self) -> Result<Vec<AssetDetails>, SkillError> {
        if self.catalogs_fail {
            return Err(SkillError::CatalogUnavailable(
                "simulated image list failure".to_string(),
            ));
        }
        Ok(self.images.clone())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Builder
// ────────────────────────────────────────────────────────────────────────────

/// Builder for a [`SimRobot`].
#[derive(Default)]
pub struct SimRobotBuilder {
    audio: Vec<AssetDetails>,
    images: Vec<AssetDetails>,
    failing_commands: HashSet<&'static str>,
    catalogs_fail: bool,
    observer: Option<CommandObserver>,
}

impl SimRobotBuilder {
    /// Add audio clips to the robot's catalog.
    pub fn with_audio<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audio.extend(names.into_iter().map(AssetDetails::user));
        self
    }

    /// Add images to the robot's catalog.
    pub fn with_images<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.images.extend(names.into_iter().map(AssetDetails::user));
        self
    }

    /// Make every command with the given [`RobotCommand::label`] fail.
    pub fn fail_command(mut self, label: &'static str) -> Self {
        self.failing_commands.insert(label);
        self
    }

    /// Make both catalog queries fail.
    pub fn fail_catalogs(mut self) -> Self {
        self.catalogs_fail = true;
        self
    }

    /// Call `observer` after every accepted command.
    pub fn observe(mut self, observer: impl Fn(&RobotCommand) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn build(self) -> SimRobot {
        SimRobot {
            audio: self.audio,
            images: self.images,
            failing_commands: self.failing_commands,
            catalogs_fail: self.catalogs_fail,
            observer: self.observer,
            state: Mutex::new(SimState::default()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use jokester_types::EventKind;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn records_commands_in_order() {
        let robot = SimRobot::builder().build();
        robot
            .execute(RobotCommand::PlayAudio {
                name: "joke1.wav".to_string(),
                volume: 60,
            })
            .await
            .unwrap();
        robot
            .execute(RobotCommand::DisplayImage {
                name: "e_Joy.jpg".to_string(),
                layer: 1,
            })
            .await
            .unwrap();

        assert_eq!(robot.played_audio(), vec!["joke1.wav"]);
        assert_eq!(robot.displayed_images(), vec!["e_Joy.jpg"]);
        assert_eq!(robot.current_image().as_deref(), Some("e_Joy.jpg"));
        assert_eq!(robot.commands().len(), 2);
    }

    #[tokio::test]
    async fn tracks_recognition_and_subscriptions() {
        let robot = SimRobot::builder().build();
        robot.execute(RobotCommand::StartFaceRecognition).await.unwrap();
        robot
            .execute(RobotCommand::RegisterEvent(EventSubscription::single_shot(
                EventKind::FaceRecognition,
            )))
            .await
            .unwrap();
        assert!(robot.face_recognition_active());
        assert_eq!(robot.subscriptions().len(), 1);

        robot.execute(RobotCommand::StopFaceRecognition).await.unwrap();
        robot.execute(RobotCommand::UnregisterAllEvents).await.unwrap();
        assert!(!robot.face_recognition_active());
        assert!(robot.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn configured_failures_surface_as_errors() {
        let robot = SimRobot::builder()
            .fail_command("change_led")
            .fail_catalogs()
            .build();
        assert!(matches!(
            robot.execute(RobotCommand::ChangeLed(Rgb::WHITE)).await,
            Err(SkillError::CommandFailed { command: "change_led", .. })
        ));
        assert!(robot.led().is_none());
        assert!(robot.audio_list().await.is_err());
        assert!(robot.image_list().await.is_err());
    }

    #[tokio::test]
    async fn catalogs_return_configured_assets() {
        let robot = SimRobot::builder()
            .with_audio(["joke1.wav", "joke2.wav"])
            .with_images(["e_Joy.jpg"])
            .build();
        let audio = robot.audio_list().await.unwrap();
        assert_eq!(audio.len(), 2);
        assert_eq!(robot.image_list().await.unwrap()[0].name, "e_Joy.jpg");
    }

    #[tokio::test]
    async fn observer_sees_every_accepted_command() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let robot = SimRobot::builder()
            .fail_command("stop")
            .observe(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build();
        robot.execute(RobotCommand::ChangeLed(Rgb::RED)).await.unwrap();
        let _ = robot.execute(RobotCommand::Stop).await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(robot.led(), Some(Rgb::RED));
    }

    #[tokio::test]
    async fn clear_log_keeps_robot_state() {
        let robot = SimRobot::builder().build();
        robot.execute(RobotCommand::ChangeLed(Rgb::BLUE)).await.unwrap();
        robot.clear_log();
        assert!(robot.commands().is_empty());
        assert_eq!(robot.led(), Some(Rgb::BLUE));
    }
}
