use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unit attached to head and arm motion commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngularUnit {
    Degrees,
    Radians,
}

/// 24-bit LED color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    /// Indicator shown when the host cancels (or pauses) the skill.
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    /// Indicator shown when the host times the skill out.
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

/// Kinds of robot events a skill can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// An audio clip finished playing.
    AudioPlayComplete,
    /// A face was detected and (possibly) recognized.
    FaceRecognition,
    /// The wake-up key phrase was heard.
    KeyPhraseRecognized,
}

/// A request for the robot to start emitting events of one kind.
///
/// A subscription with `keep_alive == false` delivers a single event and must
/// be registered again to receive the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSubscription {
    pub kind: EventKind,
    pub keep_alive: bool,
}

impl EventSubscription {
    pub fn single_shot(kind: EventKind) -> Self {
        Self {
            kind,
            keep_alive: false,
        }
    }

    pub fn keep_alive(kind: EventKind) -> Self {
        Self {
            kind,
            keep_alive: true,
        }
    }
}

/// Every outbound command a skill may send to the robot.
///
/// Commands are issue-and-forget: a successful `execute` only means the robot
/// accepted the command, not that playback or motion has finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload")]
pub enum RobotCommand {
    PlayAudio {
        name: String,
        volume: u8,
    },
    DisplayImage {
        name: String,
        layer: u8,
    },
    MoveHead {
        pitch: i16,
        roll: i16,
        yaw: i16,
        velocity: u8,
        unit: AngularUnit,
    },
    MoveArms {
        left_position: i16,
        right_position: i16,
        left_velocity: u8,
        right_velocity: u8,
        unit: AngularUnit,
    },
    ChangeLed(Rgb),
    /// Halt all motion and audio.
    Stop,
    StartFaceRecognition,
    StopFaceRecognition,
    StartKeyPhraseRecognition,
    StopKeyPhraseRecognition,
    RegisterEvent(EventSubscription),
    UnregisterAllEvents,
}

impl RobotCommand {
    /// Short, stable label used in logs and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            RobotCommand::PlayAudio { .. } => "play_audio",
            RobotCommand::DisplayImage { .. } => "display_image",
            RobotCommand::MoveHead { .. } => "move_head",
            RobotCommand::MoveArms { .. } => "move_arms",
            RobotCommand::ChangeLed(_) => "change_led",
            RobotCommand::Stop => "stop",
            RobotCommand::StartFaceRecognition => "start_face_recognition",
            RobotCommand::StopFaceRecognition => "stop_face_recognition",
            RobotCommand::StartKeyPhraseRecognition => "start_key_phrase_recognition",
            RobotCommand::StopKeyPhraseRecognition => "stop_key_phrase_recognition",
            RobotCommand::RegisterEvent(_) => "register_event",
            RobotCommand::UnregisterAllEvents => "unregister_all_events",
        }
    }
}

/// A named asset stored on the robot (audio clip or image).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDetails {
    pub name: String,
    /// `true` for assets that ship with the robot firmware.
    #[serde(default)]
    pub system_asset: bool,
}

impl AssetDetails {
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_asset: false,
        }
    }
}

/// Unified wrapper for events delivered by the robot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "robot::audio"
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Wrap `payload` with a fresh id and the current timestamp.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data the robot reports back to subscribed skills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    AudioPlayComplete { name: String },
    /// `label` is the recognized identity, or `"unknown person"` for a face
    /// that was detected but not recognized.
    FaceRecognition { label: String },
    KeyPhraseRecognized { confidence: u8 },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::AudioPlayComplete { .. } => EventKind::AudioPlayComplete,
            EventPayload::FaceRecognition { .. } => EventKind::FaceRecognition,
            EventPayload::KeyPhraseRecognized { .. } => EventKind::KeyPhraseRecognized,
        }
    }
}

/// Stage of the skill start sequence, used to classify startup failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartupStage {
    AssetLoad,
    InitialPlayback,
    EventRegistration,
    TimerSetup,
}

impl fmt::Display for StartupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StartupStage::AssetLoad => "load audio and image lists",
            StartupStage::InitialPlayback => "play audio and display image files",
            StartupStage::EventRegistration => "register events",
            StartupStage::TimerSetup => "set up timers",
        };
        f.write_str(text)
    }
}

/// Errors raised by the skill and its robot collaborators.
#[derive(Error, Debug)]
pub enum SkillError {
    #[error("Robot rejected {command}: {details}")]
    CommandFailed {
        command: &'static str,
        details: String,
    },

    #[error("Asset catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Failed to {stage}: {source}")]
    Startup {
        stage: StartupStage,
        #[source]
        source: Box<SkillError>,
    },

    #[error("Session cancelled")]
    Cancelled,

    #[error("Illegal session transition {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("Invalid skill configuration: {0}")]
    InvalidConfig(String),
}

impl SkillError {
    /// Attach `stage` to an error raised while starting the skill.
    pub fn at_stage(self, stage: StartupStage) -> Self {
        SkillError::Startup {
            stage,
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_audio_serializes_with_command_tag() {
        let cmd = RobotCommand::PlayAudio {
            name: "joke1.wav".to_string(),
            volume: 60,
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["command"], "PlayAudio");
        assert_eq!(json["payload"]["name"], "joke1.wav");
        let back: RobotCommand = serde_json::from_value(json).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn command_labels_are_distinct() {
        let cmds = [
            RobotCommand::Stop,
            RobotCommand::ChangeLed(Rgb::RED),
            RobotCommand::UnregisterAllEvents,
            RobotCommand::RegisterEvent(EventSubscription::single_shot(
                EventKind::FaceRecognition,
            )),
        ];
        let labels: std::collections::HashSet<_> = cmds.iter().map(|c| c.label()).collect();
        assert_eq!(labels.len(), cmds.len());
    }

    #[test]
    fn payload_kind_matches_variant() {
        let face = EventPayload::FaceRecognition {
            label: "Daddy".to_string(),
        };
        assert_eq!(face.kind(), EventKind::FaceRecognition);
        let audio = EventPayload::AudioPlayComplete {
            name: "joke1.wav".to_string(),
        };
        assert_eq!(audio.kind(), EventKind::AudioPlayComplete);
    }

    #[test]
    fn event_roundtrip_keeps_id_and_source() {
        let event = Event::new(
            "robot::face",
            EventPayload::FaceRecognition {
                label: "unknown person".to_string(),
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, event.id);
        assert_eq!(back.source, "robot::face");
        assert_eq!(back.payload, event.payload);
    }

    #[test]
    fn subscription_constructors() {
        assert!(!EventSubscription::single_shot(EventKind::FaceRecognition).keep_alive);
        assert!(EventSubscription::keep_alive(EventKind::AudioPlayComplete).keep_alive);
    }

    #[test]
    fn startup_error_names_stage() {
        let err = SkillError::CatalogUnavailable("timeout".to_string())
            .at_stage(StartupStage::AssetLoad);
        let text = err.to_string();
        assert!(text.contains("load audio and image lists"));
        assert!(text.contains("timeout"));
    }
}
