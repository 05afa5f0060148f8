//! [`SkillConfig`] – tunables for the joke-telling skill.
//!
//! Every field has a default matching the stock behavior, so an empty TOML
//! table (or `SkillConfig::default()`) yields the standard routine.  Durations
//! are stored as milliseconds to keep the serialized form flat.

use std::time::Duration;

use jokester_types::SkillError;
use serde::{Deserialize, Deserializer, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Timer schedules
// ─────────────────────────────────────────────────────────────────────────────

const HEARTBEAT: TimerSchedule = TimerSchedule::new(5_000, 3_000);
const HEAD_MOTION: TimerSchedule = TimerSchedule::new(5_000, 7_000);
const ARM_MOTION: TimerSchedule = TimerSchedule::new(5_000, 4_000);
const LED: TimerSchedule = TimerSchedule::new(1_000, 1_000);

/// First-fire delay and period of one periodic timer.
///
/// Inside [`SkillConfig`] a table may give only one of the two fields; the
/// other keeps that timer's stock value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSchedule {
    pub initial_delay_ms: u64,
    pub period_ms: u64,
}

/// A timer table as written, before the missing fields are filled in.
#[derive(Deserialize)]
struct PartialSchedule {
    initial_delay_ms: Option<u64>,
    period_ms: Option<u64>,
}

impl PartialSchedule {
    fn or(self, stock: TimerSchedule) -> TimerSchedule {
        TimerSchedule {
            initial_delay_ms: self.initial_delay_ms.unwrap_or(stock.initial_delay_ms),
            period_ms: self.period_ms.unwrap_or(stock.period_ms),
        }
    }
}

fn heartbeat_schedule<'de, D: Deserializer<'de>>(d: D) -> Result<TimerSchedule, D::Error> {
    Ok(PartialSchedule::deserialize(d)?.or(HEARTBEAT))
}

fn head_motion_schedule<'de, D: Deserializer<'de>>(d: D) -> Result<TimerSchedule, D::Error> {
    Ok(PartialSchedule::deserialize(d)?.or(HEAD_MOTION))
}

fn arm_motion_schedule<'de, D: Deserializer<'de>>(d: D) -> Result<TimerSchedule, D::Error> {
    Ok(PartialSchedule::deserialize(d)?.or(ARM_MOTION))
}

fn led_schedule<'de, D: Deserializer<'de>>(d: D) -> Result<TimerSchedule, D::Error> {
    Ok(PartialSchedule::deserialize(d)?.or(LED))
}

impl TimerSchedule {
    pub const fn new(initial_delay_ms: u64, period_ms: u64) -> Self {
        Self {
            initial_delay_ms,
            period_ms,
        }
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pacing
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed waits used by the scripted sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// Pause after the catalogs are loaded, before the introduction.
    pub catalog_settle_ms: u64,
    /// Pause after the mood clip, before the joke.
    pub mood_ms: u64,
    /// How long to wait for a "clip finished" event.
    pub completion_timeout_ms: u64,
    /// Unconditional wait after a clip finished (or the timeout elapsed).
    pub completion_settle_ms: u64,
    /// How long the laugh and the "hilarious" face stay up.
    pub laugh_ms: u64,
    /// How long a face greeting stays on screen.
    pub greeting_hold_ms: u64,
    /// Pause between restoring the default face and re-arming face events.
    pub greeting_rearm_ms: u64,
    /// Pause after acknowledging the key phrase.
    pub key_phrase_hold_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            catalog_settle_ms: 2_000,
            mood_ms: 3_000,
            completion_timeout_ms: 3_000,
            completion_settle_ms: 9_000,
            laugh_ms: 4_000,
            greeting_hold_ms: 5_000,
            greeting_rearm_ms: 5_000,
            key_phrase_hold_ms: 3_000,
        }
    }
}

pub(crate) fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

// ─────────────────────────────────────────────────────────────────────────────
// Script
// ─────────────────────────────────────────────────────────────────────────────

/// One clip of the introduction and how long to hold after it starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntroLine {
    pub clip: String,
    pub hold_ms: u64,
}

/// A dedicated greeting for one recognized identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityGreeting {
    pub label: String,
    pub image: String,
    pub clip: String,
}

/// Asset names and identity labels the routine refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JokeScript {
    /// Played whenever a requested clip is missing from the robot.
    pub fallback_clip: String,
    pub default_image: String,
    pub intro: Vec<IntroLine>,
    pub mood_clips: Vec<String>,
    /// Told in order; the run ends after the last one.
    pub joke_clips: Vec<String>,
    pub laugh_clips: Vec<String>,
    pub hilarious_image: String,
    pub end_clip: String,
    pub greeting_clip: String,
    pub known_face_image: String,
    /// Label the robot reports for a face it could not recognize.
    pub unknown_label: String,
    /// Shown for an unknown face; every entry, the last one included, can be picked.
    pub unknown_face_images: Vec<String>,
    pub identity_greetings: Vec<IdentityGreeting>,
    pub key_phrase_image: String,
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for JokeScript {
    fn default() -> Self {
        Self {
            fallback_clip: "s_Awe.wav".to_string(),
            default_image: "e_DefaultContent.jpg".to_string(),
            intro: vec![
                IntroLine {
                    clip: "Misty_Hi.wav".to_string(),
                    hold_ms: 2_000,
                },
                IntroLine {
                    clip: "Misty_I_am_Annie.wav".to_string(),
                    hold_ms: 4_000,
                },
            ],
            mood_clips: names(&["ok.wav", "yeah.wav", "alright.wav"]),
            joke_clips: names(&[
                "joke1.wav",
                "joke2.wav",
                "joke3.wav",
                "joke4.wav",
                "joke5.wav",
            ]),
            laugh_clips: names(&["laught1.wav", "laught2.wav", "laught3.wav"]),
            hilarious_image: "e_EcstacyHilarious.jpg".to_string(),
            end_clip: "endjokes.wav".to_string(),
            greeting_clip: "Misty_Hi.wav".to_string(),
            known_face_image: "e_Joy.jpg".to_string(),
            unknown_label: "unknown person".to_string(),
            unknown_face_images: names(&[
                "e_DefaultContent.jpg",
                "e_ContentLeft.jpg",
                "e_ContentRight.jpg",
                "e_Joy.jpg",
                "e_Joy2.jpg",
                "e_Love.jpg",
            ]),
            identity_greetings: vec![IdentityGreeting {
                label: "Daddy".to_string(),
                image: "e_EcstacyStarryEyed.jpg".to_string(),
                clip: "Misty_Hi_Daddy.wav".to_string(),
            }],
            key_phrase_image: "e_Love.jpg".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SkillConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration bundle for [`BehaviorCoordinator`][crate::BehaviorCoordinator].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillConfig {
    /// Volume for the introduction and face greetings.
    pub greeting_volume: u8,
    /// Volume for moods, jokes, laughs and the key-phrase acknowledgement.
    pub joke_volume: u8,
    /// Display layer for every image.
    pub image_layer: u8,
    #[serde(deserialize_with = "heartbeat_schedule")]
    pub heartbeat: TimerSchedule,
    #[serde(deserialize_with = "head_motion_schedule")]
    pub head_motion: TimerSchedule,
    #[serde(deserialize_with = "arm_motion_schedule")]
    pub arm_motion: TimerSchedule,
    #[serde(deserialize_with = "led_schedule")]
    pub led: TimerSchedule,
    pub pacing: Pacing,
    pub script: JokeScript,
    /// Listen for the wake-up key phrase and re-arm joke telling on it.
    pub key_phrase_enabled: bool,
}

impl Default for SkillConfig {
    fn default() -> Self {
        Self {
            greeting_volume: 80,
            joke_volume: 60,
            image_layer: 1,
            heartbeat: HEARTBEAT,
            head_motion: HEAD_MOTION,
            arm_motion: ARM_MOTION,
            led: LED,
            pacing: Pacing::default(),
            script: JokeScript::default(),
            key_phrase_enabled: false,
        }
    }
}

impl SkillConfig {
    /// Reject configurations the coordinator cannot run.
    ///
    /// # Errors
    ///
    /// Returns [`SkillError::InvalidConfig`] when a clip or image pool is
    /// empty or a timer period is zero.
    pub fn validate(&self) -> Result<(), SkillError> {
        let script = &self.script;
        let pools = [
            ("script.mood_clips", script.mood_clips.len()),
            ("script.joke_clips", script.joke_clips.len()),
            ("script.laugh_clips", script.laugh_clips.len()),
            ("script.unknown_face_images", script.unknown_face_images.len()),
        ];
        if let Some((field, _)) = pools.iter().find(|(_, len)| *len == 0) {
            return Err(SkillError::InvalidConfig(format!("{field} must not be empty")));
        }

        let timers = [
            ("heartbeat", self.heartbeat),
            ("head_motion", self.head_motion),
            ("arm_motion", self.arm_motion),
            ("led", self.led),
        ];
        if let Some((name, _)) = timers.iter().find(|(_, t)| t.period_ms == 0) {
            return Err(SkillError::InvalidConfig(format!(
                "{name}.period_ms must be greater than zero"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        SkillConfig::default().validate().expect("defaults must validate");
    }

    #[test]
    fn default_schedules_match_stock_routine() {
        let cfg = SkillConfig::default();
        assert_eq!(cfg.heartbeat.initial_delay(), Duration::from_secs(5));
        assert_eq!(cfg.heartbeat.period(), Duration::from_secs(3));
        assert_eq!(cfg.head_motion.period(), Duration::from_secs(7));
        assert_eq!(cfg.arm_motion.period(), Duration::from_secs(4));
        assert_eq!(cfg.led.initial_delay(), Duration::from_secs(1));
        assert_eq!(cfg.script.joke_clips.len(), 5);
    }

    #[test]
    fn empty_joke_list_is_rejected() {
        let mut cfg = SkillConfig::default();
        cfg.script.joke_clips.clear();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("joke_clips"));
    }

    #[test]
    fn zero_period_is_rejected() {
        let mut cfg = SkillConfig::default();
        cfg.led.period_ms = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("led.period_ms"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: SkillConfig = toml::from_str(
            r#"
            joke_volume = 40

            [pacing]
            mood_ms = 10

            [script]
            joke_clips = ["a.wav", "b.wav"]
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.joke_volume, 40);
        assert_eq!(cfg.greeting_volume, 80);
        assert_eq!(cfg.pacing.mood_ms, 10);
        assert_eq!(cfg.pacing.laugh_ms, 4_000);
        assert_eq!(cfg.script.joke_clips, vec!["a.wav", "b.wav"]);
        assert_eq!(cfg.script.fallback_clip, "s_Awe.wav");
    }

    #[test]
    fn partial_timer_table_keeps_that_timers_defaults() {
        let cfg: SkillConfig = toml::from_str(
            r#"
            [heartbeat]
            period_ms = 1000

            [led]
            initial_delay_ms = 250
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.heartbeat, TimerSchedule::new(5_000, 1_000));
        assert_eq!(cfg.led, TimerSchedule::new(250, 1_000));
        assert_eq!(cfg.head_motion, TimerSchedule::new(5_000, 7_000));
        cfg.validate().expect("partial timers validate");
    }

    #[test]
    fn empty_timer_table_is_the_stock_schedule() {
        let cfg: SkillConfig = toml::from_str("[arm_motion]\n").expect("parse");
        assert_eq!(cfg.arm_motion, TimerSchedule::new(5_000, 4_000));
    }
}
