//! [`PlaybackTracker`] – "which clip finished last", with wake-ups.
//!
//! The audio-completion handler records clip names; sequences that need to
//! know when their clip is done take a [`PlaybackWatch`] *before* issuing the
//! play command and wait on it with a timeout.

use std::time::Duration;

use tokio::sync::watch;

/// Last-completed-audio marker backed by a [`watch`] channel.
#[derive(Debug)]
pub struct PlaybackTracker {
    tx: watch::Sender<Option<String>>,
}

impl Default for PlaybackTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Record that `name` finished playing and wake every watcher.
    pub fn record(&self, name: &str) {
        self.tx.send_replace(Some(name.to_string()));
    }

    pub fn last_completed(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    /// Start watching for completions recorded from now on.
    pub fn watch(&self) -> PlaybackWatch {
        PlaybackWatch {
            rx: self.tx.subscribe(),
        }
    }
}

/// A pending wait for one clip, created by [`PlaybackTracker::watch`].
#[derive(Debug)]
pub struct PlaybackWatch {
    rx: watch::Receiver<Option<String>>,
}

impl PlaybackWatch {
    /// Wait until `clip` is recorded as completed, for at most `timeout`.
    ///
    /// Completions recorded before the watch was taken do not count, so a
    /// clip played twice in a row is waited for twice.  Returns `false` on
    /// timeout.
    pub async fn wait_for(mut self, clip: &str, timeout: Duration) -> bool {
        let wait = async {
            loop {
                if self.rx.changed().await.is_err() {
                    return false;
                }
                if self.rx.borrow_and_update().as_deref() == Some(clip) {
                    return true;
                }
            }
        };
        tokio::time::timeout(timeout, wait).await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn record_updates_marker() {
        let tracker = PlaybackTracker::new();
        assert!(tracker.last_completed().is_none());
        tracker.record("joke1.wav");
        assert_eq!(tracker.last_completed().as_deref(), Some("joke1.wav"));
    }

    #[tokio::test(start_paused = true)]
    async fn watch_wakes_on_matching_clip() {
        let tracker = Arc::new(PlaybackTracker::new());
        let watch = tracker.watch();
        let recorder = Arc::clone(&tracker);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            recorder.record("ok.wav");
            tokio::time::sleep(Duration::from_millis(500)).await;
            recorder.record("joke1.wav");
        });
        let started = tokio::time::Instant::now();
        assert!(watch.wait_for("joke1.wav", Duration::from_secs(3)).await);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn watch_times_out_without_completion() {
        let tracker = PlaybackTracker::new();
        let started = tokio::time::Instant::now();
        assert!(!tracker.watch().wait_for("joke1.wav", Duration::from_secs(3)).await);
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn earlier_completion_does_not_satisfy_new_watch() {
        let tracker = PlaybackTracker::new();
        tracker.record("joke1.wav");
        let watch = tracker.watch();
        assert!(!watch.wait_for("joke1.wav", Duration::from_secs(1)).await);
    }
}
