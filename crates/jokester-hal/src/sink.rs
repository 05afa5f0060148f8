//! Generic `RobotCommandSink` trait for anything that can drive the robot.
//!
//! Implementations forward [`RobotCommand`] values to the robot and answer
//! asset catalog queries.  The skill runtime holds the sink as
//! `Arc<dyn RobotCommandSink>` and shares it between timer tasks and event
//! handlers.

use async_trait::async_trait;
use jokester_types::{AssetDetails, RobotCommand, SkillError};

/// Outbound command interface to the robot.
#[async_trait]
pub trait RobotCommandSink: Send + Sync {
    /// Issue `command` to the robot.
    ///
    /// # Errors
    ///
    /// Returns [`SkillError::CommandFailed`] when the robot rejects the
    /// command or the connection is unavailable.
    async fn execute(&self, command: RobotCommand) -> Result<(), SkillError>;

    /// Fetch the list of audio clips stored on the robot.
    ///
    /// # Errors
    ///
    /// Returns [`SkillError::CatalogUnavailable`] if the list cannot be read.
    async fn audio_list(&self) -> Result<Vec<AssetDetails>, SkillError>;

    /// Fetch the list of images stored on the robot.
    ///
    /// # Errors
    ///
    /// Returns [`SkillError::CatalogUnavailable`] if the list cannot be read.
    async fn image_list(&self) -> Result<Vec<AssetDetails>, SkillError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Minimal in-process sink used only for tests.
    #[derive(Default)]
    struct MockSink {
        issued: Mutex<Vec<RobotCommand>>,
    }

    #[async_trait]
    impl RobotCommandSink for MockSink {
        async fn execute(&self, command: RobotCommand) -> Result<(), SkillError> {
            if matches!(command, RobotCommand::StartKeyPhraseRecognition) {
                return Err(SkillError::CommandFailed {
                    command: command.label(),
                    details: "not supported".to_string(),
                });
            }
            self.issued.lock().unwrap().push(command);
            Ok(())
        }

        async fn audio_list(&self) -> Result<Vec<AssetDetails>, SkillError> {
            Ok(vec![AssetDetails::user("joke1.wav")])
        }

        async fn image_list(&self) -> Result<Vec<AssetDetails>, SkillError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn mock_sink_records_accepted_commands() {
        let sink = MockSink::default();
        sink.execute(RobotCommand::Stop).await.unwrap();
        let err = sink
            .execute(RobotCommand::StartKeyPhraseRecognition)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("start_key_phrase_recognition"));
        assert_eq!(sink.issued.lock().unwrap().as_slice(), &[RobotCommand::Stop]);
    }

    #[tokio::test]
    async fn sink_usable_as_trait_object() {
        let sink: std::sync::Arc<dyn RobotCommandSink> = std::sync::Arc::new(MockSink::default());
        let audio = sink.audio_list().await.unwrap();
        assert_eq!(audio[0].name, "joke1.wav");
        assert!(sink.image_list().await.unwrap().is_empty());
    }
}
