//! [`TimerSet`] – the skill's four periodic timers.
//!
//! Each timer is a Tokio task driving [`tokio::time::interval_at`].  The tick
//! body is awaited before the next tick is taken, so a timer never overlaps
//! itself; ticks missed while a long body runs are delayed, not bunched up.
//! Every timer stops when the run's [`CancellationToken`] fires.
//!
//! [`TimerSet::dispose`] aborts the tasks.  It is idempotent and also runs on
//! drop, so a set that goes out of scope never leaks a running timer.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::TimerSchedule;

/// Which periodic behavior a timer drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Heartbeat,
    HeadMotion,
    ArmMotion,
    Led,
}

/// Owns the join handles of a run's periodic timers.
#[derive(Debug, Default)]
pub struct TimerSet {
    handles: Vec<(TimerKind, JoinHandle<()>)>,
    disposed: bool,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a timer that calls `tick` after `schedule.initial_delay()` and
    /// then every `schedule.period()` until `token` is cancelled.
    ///
    /// Must be called from within a Tokio runtime.  Ignored once the set has
    /// been disposed.
    pub fn spawn<F, Fut>(
        &mut self,
        kind: TimerKind,
        schedule: TimerSchedule,
        token: CancellationToken,
        mut tick: F,
    ) where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.disposed {
            return;
        }
        let handle = tokio::spawn(async move {
            let start = Instant::now() + schedule.initial_delay();
            let mut interval = tokio::time::interval_at(start, schedule.period());
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => tick().await,
                }
            }
            debug!(?kind, "timer stopped");
        });
        self.handles.push((kind, handle));
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Abort every timer.  Returns `true` only for the call that actually
    /// released them.
    pub fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        for (kind, handle) in self.handles.drain(..) {
            handle.abort();
            debug!(?kind, "timer released");
        }
        self.disposed = true;
        true
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_tick(counter: &Arc<AtomicUsize>) -> impl FnMut() -> std::future::Ready<()> + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_initial_delay_then_periodically() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut timers = TimerSet::new();
        timers.spawn(
            TimerKind::Led,
            TimerSchedule::new(1_000, 1_000),
            CancellationToken::new(),
            counting_tick(&count),
        );

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(3_200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn long_tick_body_never_overlaps_itself() {
        let running = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let (r, m) = (Arc::clone(&running), Arc::clone(&max_seen));

        let mut timers = TimerSet::new();
        timers.spawn(
            TimerKind::Heartbeat,
            TimerSchedule::new(0, 1_000),
            CancellationToken::new(),
            move || {
                let (r, m) = (Arc::clone(&r), Arc::clone(&m));
                async move {
                    let now = r.fetch_add(1, Ordering::SeqCst) + 1;
                    m.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(3_500)).await;
                    r.fetch_sub(1, Ordering::SeqCst);
                }
            },
        );

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_timer() {
        let count = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        let mut timers = TimerSet::new();
        timers.spawn(
            TimerKind::HeadMotion,
            TimerSchedule::new(0, 1_000),
            token.clone(),
            counting_tick(&count),
        );

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        token.cancel();
        let after_cancel = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_cancel);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_releases_exactly_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut timers = TimerSet::new();
        for kind in [TimerKind::Heartbeat, TimerKind::ArmMotion] {
            timers.spawn(
                kind,
                TimerSchedule::new(0, 1_000),
                CancellationToken::new(),
                counting_tick(&count),
            );
        }
        assert_eq!(timers.len(), 2);

        assert!(timers.dispose());
        assert!(!timers.dispose());
        assert!(timers.is_empty());
        assert!(timers.is_disposed());

        let frozen = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_after_dispose_is_ignored() {
        let mut timers = TimerSet::new();
        timers.dispose();
        timers.spawn(
            TimerKind::Led,
            TimerSchedule::new(0, 1_000),
            CancellationToken::new(),
            || std::future::ready(()),
        );
        assert!(timers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_aborts_timers() {
        let count = Arc::new(AtomicUsize::new(0));
        {
            let mut timers = TimerSet::new();
            timers.spawn(
                TimerKind::Led,
                TimerSchedule::new(0, 1_000),
                CancellationToken::new(),
                counting_tick(&count),
            );
            tokio::time::sleep(Duration::from_millis(1_500)).await;
        }
        let frozen = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), frozen);
    }
}
