//! Host lifecycle contract.
//!
//! The robot runtime loads a skill, then calls these entry points at
//! arbitrary times, at most one lifecycle call at a time.  Pause and resume
//! default to cancel and start: no state is preserved across a pause.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

/// Free-form parameters the host passes with every lifecycle call.
pub type SkillParameters = HashMap<String, serde_json::Value>;

/// Identity and hosting limits of a skill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillManifest {
    pub name: String,
    /// Distinguishes this skill from every other skill on the robot.
    pub id: Uuid,
    pub description: String,
    /// The host times the skill out after this long.
    pub timeout: Duration,
}

impl SkillManifest {
    /// Manifest of the joke-telling skill: runs for five minutes or until
    /// cancelled.
    pub fn telling_jokes() -> Self {
        Self {
            name: "TellingJokeSkill".to_string(),
            id: Uuid::from_u128(0xa365d72a_b9f1_4417_9315_ca0ce157df51),
            description: "Tells a run of jokes, fidgets, and greets familiar faces".to_string(),
            timeout: Duration::from_secs(5 * 60),
        }
    }
}

/// Entry points a hosted skill must implement.
#[async_trait]
pub trait RobotSkill: Send + Sync {
    fn manifest(&self) -> &SkillManifest;

    /// Start (or restart) the skill.  Failures are handled internally.
    async fn on_start(&self, parameters: &SkillParameters);

    /// The host or user cancelled the skill.
    async fn on_cancel(&self, parameters: &SkillParameters);

    /// The skill ran past [`SkillManifest::timeout`].
    async fn on_timeout(&self, parameters: &SkillParameters);

    async fn on_pause(&self, parameters: &SkillParameters) {
        self.on_cancel(parameters).await;
    }

    async fn on_resume(&self, parameters: &SkillParameters) {
        self.on_start(parameters).await;
    }

    /// Release timer resources.  Idempotent; returns `true` only for the call
    /// that released them.
    fn dispose(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        manifest: Option<SkillManifest>,
        calls: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl RobotSkill for Recorder {
        fn manifest(&self) -> &SkillManifest {
            self.manifest.as_ref().expect("manifest set in test")
        }
        async fn on_start(&self, _: &SkillParameters) {
            self.calls.lock().unwrap().push("start");
        }
        async fn on_cancel(&self, _: &SkillParameters) {
            self.calls.lock().unwrap().push("cancel");
        }
        async fn on_timeout(&self, _: &SkillParameters) {
            self.calls.lock().unwrap().push("timeout");
        }
        fn dispose(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn pause_and_resume_default_to_cancel_and_start() {
        let skill = Recorder::default();
        let params = SkillParameters::new();
        skill.on_pause(&params).await;
        skill.on_resume(&params).await;
        assert_eq!(*skill.calls.lock().unwrap(), vec!["cancel", "start"]);
    }

    #[test]
    fn joke_manifest_times_out_after_five_minutes() {
        let m = SkillManifest::telling_jokes();
        assert_eq!(m.name, "TellingJokeSkill");
        assert_eq!(m.timeout, Duration::from_secs(300));
        assert_eq!(m.id.to_string(), "a365d72a-b9f1-4417-9315-ca0ce157df51");
    }
}
