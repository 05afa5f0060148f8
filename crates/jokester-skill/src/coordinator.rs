//! [`BehaviorCoordinator`] – the joke-telling skill.
//!
//! The coordinator owns every piece of run state and reacts to three kinds of
//! stimulus:
//!
//! 1. **Timer ticks** – the heartbeat (tell the next joke) and the ambient
//!    head / arm / LED fidgets, driven by a [`TimerSet`].
//! 2. **Robot events** – audio playback finished, face recognized and, when
//!    enabled, key phrase heard.  Listener tasks subscribe to the
//!    [`EventBus`] and dispatch to the `handle_*` methods.
//! 3. **Host lifecycle calls** – see [`RobotSkill`].
//!
//! # Synchronisation
//!
//! Shared state lives in one [`SessionInner`] behind one mutex; the lock is
//! never held across an `.await`.  Every wait inside a sequence is a
//! cancellation checkpoint on the run's [`CancellationToken`], and the token
//! is checked again after any command that precedes a state change or another
//! command.  Cancel, timeout and pause therefore stop in-flight sequences
//! without preempting a command that is already on its way to the robot.
//!
//! # Face subscriptions
//!
//! Face events are single-shot: after one event is taken the coordinator
//! ignores further face events until it registers again.  A greeting
//! re-registers when it finishes; an event dropped because a joke was in
//! flight is re-registered when that joke ends.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use jokester_hal::SimRobot;
//! use jokester_middleware::EventBus;
//! use jokester_skill::{BehaviorCoordinator, RobotSkill, SkillConfig, SkillParameters};
//!
//! # async fn run() -> Result<(), jokester_types::SkillError> {
//! let robot = Arc::new(SimRobot::builder().with_audio(["joke1.wav"]).build());
//! let skill = BehaviorCoordinator::new(robot, EventBus::default(), SkillConfig::default())?;
//! skill.on_start(&SkillParameters::new()).await;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use jokester_hal::RobotCommandSink;
use jokester_middleware::{EventBus, Topic};
use jokester_types::{
    AngularUnit, EventKind, EventPayload, EventSubscription, RobotCommand, Rgb, SkillError,
    StartupStage,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::ambient;
use crate::catalog::AssetCatalog;
use crate::config::{SkillConfig, ms};
use crate::lifecycle::{RobotSkill, SkillManifest, SkillParameters};
use crate::playback::PlaybackTracker;
use crate::session::{Admission, JokeOutcome, JokeTicket, SessionInner, SessionState};
use crate::timers::{TimerKind, TimerSet};

// ─────────────────────────────────────────────────────────────────────────────
// Outcomes
// ─────────────────────────────────────────────────────────────────────────────

/// What one heartbeat tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// Not `ReadyToJoke` (or a greeting was in flight); nothing happened.
    Skipped,
    /// A joke was told; `next_cursor` is the joke the next tick will tell.
    Told { next_cursor: usize },
    /// The last joke and the closing clip were played; the run is `Idle`.
    SequenceComplete,
    /// The run was cancelled before or during the sequence.
    Cancelled,
    /// The run was restarted underneath the sequence.
    Abandoned,
}

/// What a face-recognition event led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceReaction {
    /// Dropped: a joke (or another greeting) was in flight.
    Ignored,
    /// Greeted, and one more face event was registered for.
    Greeted,
    /// The run was cancelled mid-greeting.
    Interrupted,
}

// ─────────────────────────────────────────────────────────────────────────────
// Run handles
// ─────────────────────────────────────────────────────────────────────────────

/// Resources owned by one run (one `start` until the next `start` or
/// `dispose`).
#[derive(Debug, Default)]
struct RunHandles {
    token: CancellationToken,
    timers: TimerSet,
    listeners: Vec<JoinHandle<()>>,
}

impl RunHandles {
    fn new(token: CancellationToken) -> Self {
        Self {
            token,
            timers: TimerSet::new(),
            listeners: Vec::new(),
        }
    }

    fn release(&mut self) -> bool {
        self.token.cancel();
        for listener in self.listeners.drain(..) {
            listener.abort();
        }
        self.timers.dispose()
    }
}

impl Drop for RunHandles {
    fn drop(&mut self) {
        self.release();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BehaviorCoordinator
// ─────────────────────────────────────────────────────────────────────────────

struct Inner {
    sink: Arc<dyn RobotCommandSink>,
    bus: EventBus,
    config: SkillConfig,
    manifest: SkillManifest,
    session: Mutex<SessionInner>,
    playback: PlaybackTracker,
    rng: Mutex<StdRng>,
    run: Mutex<RunHandles>,
    /// Set while a single-shot face subscription is live.
    face_armed: AtomicBool,
    disposed: AtomicBool,
}

/// The joke-telling skill.
///
/// Cheap to clone; clones share the same state.  Timer and listener tasks
/// only hold weak references, so dropping the last clone releases the run.
#[derive(Clone)]
pub struct BehaviorCoordinator {
    inner: Arc<Inner>,
}

#[derive(Clone)]
struct WeakCoordinator(Weak<Inner>);

impl WeakCoordinator {
    fn upgrade(&self) -> Option<BehaviorCoordinator> {
        self.0.upgrade().map(|inner| BehaviorCoordinator { inner })
    }
}

type TickFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sleep for `duration` unless the run is cancelled first.
async fn checkpoint(token: &CancellationToken, duration: Duration) -> Result<(), SkillError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(SkillError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Zero-length checkpoint, taken after a command that may have raced a cancel.
fn still_live(token: &CancellationToken) -> Result<(), SkillError> {
    if token.is_cancelled() {
        Err(SkillError::Cancelled)
    } else {
        Ok(())
    }
}

impl BehaviorCoordinator {
    /// Build a coordinator that drives `sink` and listens on `bus`.
    ///
    /// # Errors
    ///
    /// Returns [`SkillError::InvalidConfig`] if `config` fails
    /// [`SkillConfig::validate`].
    pub fn new(
        sink: Arc<dyn RobotCommandSink>,
        bus: EventBus,
        config: SkillConfig,
    ) -> Result<Self, SkillError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                sink,
                bus,
                config,
                manifest: SkillManifest::telling_jokes(),
                session: Mutex::new(SessionInner::new()),
                playback: PlaybackTracker::new(),
                rng: Mutex::new(StdRng::from_entropy()),
                run: Mutex::new(RunHandles::default()),
                face_armed: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
            }),
        })
    }

    /// Replace the random source with a seeded one (reproducible choices).
    pub fn seeded(self, seed: u64) -> Self {
        *lock(&self.inner.rng) = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &SkillConfig {
        &self.inner.config
    }

    pub fn state(&self) -> SessionState {
        lock(&self.inner.session).state()
    }

    pub fn joke_cursor(&self) -> usize {
        lock(&self.inner.session).joke_cursor()
    }

    pub fn last_completed_audio(&self) -> Option<String> {
        self.inner.playback.last_completed()
    }

    /// Number of timers owned by the current run.
    pub fn active_timers(&self) -> usize {
        lock(&self.inner.run).timers.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    fn downgrade(&self) -> WeakCoordinator {
        WeakCoordinator(Arc::downgrade(&self.inner))
    }

    fn token(&self) -> CancellationToken {
        lock(&self.inner.run).token.clone()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Start a fresh run: load catalogs, introduce the robot, register for
    /// events and start the timers.
    ///
    /// Never fails: a failing step aborts the rest of startup and is logged
    /// with the stage it happened in.  The host's cancel / timeout path
    /// cleans up a partially started run.
    pub async fn start(&self, parameters: &SkillParameters) {
        if self.is_disposed() {
            warn!("start requested after dispose; ignoring");
            return;
        }
        if !parameters.is_empty() {
            debug!(keys = ?parameters.keys().collect::<Vec<_>>(), "start parameters");
        }

        let token = self.begin_run();
        match self.run_startup(&token).await {
            Ok(()) => info!(skill = %self.inner.manifest.name, "skill started"),
            Err(SkillError::Startup { stage, source }) if matches!(*source, SkillError::Cancelled) => {
                info!(%stage, "startup interrupted by cancellation");
            }
            Err(SkillError::Startup { stage, source }) => {
                error!(%stage, error = %source, "failed to {stage}; startup aborted");
            }
            Err(err) => error!(error = %err, "startup aborted"),
        }
    }

    /// Host cancel: red LED, then teardown.
    pub async fn cancel(&self) {
        self.shut_down(Rgb::RED, "cancel").await;
    }

    /// Host timeout: blue LED, then teardown.
    pub async fn timeout(&self) {
        self.shut_down(Rgb::BLUE, "timeout").await;
    }

    /// Release the run's timers and listeners.  Idempotent; returns `true`
    /// only for the call that released them.
    pub fn dispose(&self) -> bool {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return false;
        }
        lock(&self.inner.run).release();
        info!("skill resources released");
        true
    }

    fn begin_run(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let previous = std::mem::replace(&mut *lock(&self.inner.run), RunHandles::new(token.clone()));
        drop(previous);
        self.inner.face_armed.store(false, Ordering::SeqCst);
        token
    }

    async fn run_startup(&self, token: &CancellationToken) -> Result<(), SkillError> {
        let catalog = self
            .load_catalog()
            .await
            .map_err(|e| e.at_stage(StartupStage::AssetLoad))?;
        info!(
            audio = catalog.audio_count(),
            images = catalog.image_count(),
            "asset catalogs loaded"
        );
        lock(&self.inner.session).reset(catalog);

        self.introduce(token)
            .await
            .map_err(|e| e.at_stage(StartupStage::InitialPlayback))?;
        lock(&self.inner.session)
            .transition(SessionState::ReadyToJoke)
            .map_err(|e| e.at_stage(StartupStage::InitialPlayback))?;

        self.register_events(token)
            .await
            .map_err(|e| e.at_stage(StartupStage::EventRegistration))?;

        self.start_timers(token)
            .map_err(|e| e.at_stage(StartupStage::TimerSetup))
    }

    async fn load_catalog(&self) -> Result<AssetCatalog, SkillError> {
        let audio = self.inner.sink.audio_list().await?;
        let images = self.inner.sink.image_list().await?;
        Ok(AssetCatalog::new(audio, images))
    }

    async fn introduce(&self, token: &CancellationToken) -> Result<(), SkillError> {
        let config = &self.inner.config;
        checkpoint(token, ms(config.pacing.catalog_settle_ms)).await?;
        for line in &config.script.intro {
            let name = self.resolve_clip(&line.clip);
            self.issue(RobotCommand::PlayAudio {
                name,
                volume: config.greeting_volume,
            })
            .await?;
            checkpoint(token, ms(line.hold_ms)).await?;
        }
        self.issue(RobotCommand::ChangeLed(Rgb::WHITE)).await?;
        self.issue(RobotCommand::DisplayImage {
            name: config.script.default_image.clone(),
            layer: config.image_layer,
        })
        .await?;
        self.issue(RobotCommand::MoveHead {
            pitch: 10,
            roll: 0,
            yaw: 0,
            velocity: 60,
            unit: AngularUnit::Degrees,
        })
        .await
    }

    async fn register_events(&self, token: &CancellationToken) -> Result<(), SkillError> {
        let key_phrase = self.inner.config.key_phrase_enabled;

        // Subscribe before registering so no event slips past.
        let mut listeners = vec![
            self.spawn_listener(Topic::AudioPlayback, token.clone(), |c, payload| {
                if let EventPayload::AudioPlayComplete { name } = payload {
                    c.handle_audio_complete(&name);
                }
            }),
            self.spawn_listener(Topic::FaceRecognition, token.clone(), |c, payload| {
                let EventPayload::FaceRecognition { label } = payload else {
                    return;
                };
                if !c.inner.face_armed.swap(false, Ordering::SeqCst) {
                    debug!(%label, "face event without a live subscription; dropped");
                    return;
                }
                tokio::spawn(async move {
                    c.handle_face_recognition(&label).await;
                });
            }),
        ];
        if key_phrase {
            listeners.push(self.spawn_listener(Topic::KeyPhrase, token.clone(), |c, payload| {
                if matches!(payload, EventPayload::KeyPhraseRecognized { .. }) {
                    tokio::spawn(async move {
                        c.handle_key_phrase().await;
                    });
                }
            }));
        }
        lock(&self.inner.run).listeners.extend(listeners);

        self.issue(RobotCommand::RegisterEvent(EventSubscription::keep_alive(
            EventKind::AudioPlayComplete,
        )))
        .await?;
        self.issue(RobotCommand::StartFaceRecognition).await?;
        self.arm_face_subscription().await?;

        if key_phrase {
            self.issue(RobotCommand::StartKeyPhraseRecognition).await?;
            self.issue(RobotCommand::RegisterEvent(EventSubscription::keep_alive(
                EventKind::KeyPhraseRecognized,
            )))
            .await?;
        }
        Ok(())
    }

    fn spawn_listener<F>(&self, topic: Topic, token: CancellationToken, on_event: F) -> JoinHandle<()>
    where
        F: Fn(BehaviorCoordinator, EventPayload) + Send + 'static,
    {
        let mut rx = self.inner.bus.subscribe_to(topic);
        let weak = self.downgrade();
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    event = rx.recv() => event,
                };
                let Some(event) = event else { break };
                let Some(coordinator) = weak.upgrade() else { break };
                on_event(coordinator, event.payload);
            }
            debug!(?topic, "event listener stopped");
        })
    }

    fn start_timers(&self, token: &CancellationToken) -> Result<(), SkillError> {
        fn on_tick<F, Fut>(weak: &WeakCoordinator, action: F) -> impl FnMut() -> TickFuture + Send + 'static
        where
            F: Fn(BehaviorCoordinator) -> Fut + Clone + Send + 'static,
            Fut: Future<Output = ()> + Send + 'static,
        {
            let weak = weak.clone();
            move || {
                let weak = weak.clone();
                let action = action.clone();
                Box::pin(async move {
                    if let Some(coordinator) = weak.upgrade() {
                        action(coordinator).await;
                    }
                })
            }
        }

        let config = &self.inner.config;
        let weak = self.downgrade();
        let mut run = lock(&self.inner.run);
        if run.timers.is_disposed() || token.is_cancelled() {
            return Err(SkillError::Cancelled);
        }
        run.timers.spawn(
            TimerKind::Heartbeat,
            config.heartbeat,
            token.clone(),
            on_tick(&weak, |c| async move {
                c.heartbeat_tick().await;
            }),
        );
        run.timers.spawn(
            TimerKind::HeadMotion,
            config.head_motion,
            token.clone(),
            on_tick(&weak, |c| async move { c.head_motion_tick().await }),
        );
        run.timers.spawn(
            TimerKind::ArmMotion,
            config.arm_motion,
            token.clone(),
            on_tick(&weak, |c| async move { c.arm_motion_tick().await }),
        );
        run.timers.spawn(
            TimerKind::Led,
            config.led,
            token.clone(),
            on_tick(&weak, |c| async move { c.led_tick().await }),
        );
        Ok(())
    }

    async fn shut_down(&self, indicator: Rgb, reason: &'static str) {
        info!(reason, "skill stopping");
        self.token().cancel();
        self.inner.face_armed.store(false, Ordering::SeqCst);
        lock(&self.inner.session).stop();

        let default_image = self.inner.config.script.default_image.clone();
        for command in [
            RobotCommand::ChangeLed(indicator),
            RobotCommand::Stop,
            RobotCommand::StopKeyPhraseRecognition,
            RobotCommand::StopFaceRecognition,
            RobotCommand::UnregisterAllEvents,
            RobotCommand::DisplayImage {
                name: default_image,
                layer: self.inner.config.image_layer,
            },
        ] {
            self.send(command).await;
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Heartbeat
    // ─────────────────────────────────────────────────────────────────────

    /// Tell the next joke if the run is `ReadyToJoke`.
    pub async fn heartbeat_tick(&self) -> HeartbeatOutcome {
        let token = self.token();
        if token.is_cancelled() {
            return HeartbeatOutcome::Cancelled;
        }
        let ticket = lock(&self.inner.session).begin_joke();
        let Some(ticket) = ticket else {
            return HeartbeatOutcome::Skipped;
        };
        info!(joke = ticket.cursor, "telling joke");

        let (next_state, outcome) = match self.tell_joke(&ticket, &token).await {
            Ok(JokeOutcome::NextJoke { cursor }) => (
                SessionState::ReadyToJoke,
                HeartbeatOutcome::Told { next_cursor: cursor },
            ),
            Ok(JokeOutcome::SequenceComplete) => {
                info!("joke run finished");
                (SessionState::Idle, HeartbeatOutcome::SequenceComplete)
            }
            Err(SkillError::Cancelled) => (SessionState::Idle, HeartbeatOutcome::Cancelled),
            Err(err) => {
                warn!(error = %err, "joke sequence abandoned");
                (SessionState::ReadyToJoke, HeartbeatOutcome::Abandoned)
            }
        };

        let rearm = {
            let mut session = lock(&self.inner.session);
            session.leave_talking(&ticket, next_state);
            session.take_face_rearm()
        };
        if rearm && !token.is_cancelled() {
            if let Err(err) = self.arm_face_subscription().await {
                warn!(error = %err, "failed to renew face subscription");
            }
        }
        outcome
    }

    async fn tell_joke(
        &self,
        ticket: &JokeTicket,
        token: &CancellationToken,
    ) -> Result<JokeOutcome, SkillError> {
        let config = &self.inner.config;
        let script = &config.script;
        let volume = config.joke_volume;

        let mood = self.pick(&script.mood_clips);
        self.play(&mood, volume).await;
        checkpoint(token, ms(config.pacing.mood_ms)).await?;

        let joke = script
            .joke_clips
            .get(ticket.cursor)
            .unwrap_or(&script.fallback_clip);
        self.play_to_completion(joke, volume, token).await?;

        self.display(&script.hilarious_image).await;
        still_live(token)?;
        let laugh = self.pick(&script.laugh_clips);
        self.play(&laugh, volume).await;
        checkpoint(token, ms(config.pacing.laugh_ms)).await?;
        self.display(&script.default_image).await;

        // No cursor move once the run is torn down.
        still_live(token)?;
        let outcome = lock(&self.inner.session).advance_cursor(ticket, script.joke_clips.len())?;
        if outcome == JokeOutcome::SequenceComplete {
            self.play_to_completion(&script.end_clip, volume, token).await?;
        }
        Ok(outcome)
    }

    /// Play `wanted` (or the fallback), wait for its completion event with a
    /// timeout, then hold for the settle time.
    async fn play_to_completion(
        &self,
        wanted: &str,
        volume: u8,
        token: &CancellationToken,
    ) -> Result<(), SkillError> {
        still_live(token)?;
        let pacing = &self.inner.config.pacing;
        let watch = self.inner.playback.watch();
        let clip = self.play(wanted, volume).await;
        let completed = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(SkillError::Cancelled),
            done = watch.wait_for(&clip, ms(pacing.completion_timeout_ms)) => done,
        };
        if !completed {
            debug!(%clip, "no completion event before timeout");
        }
        checkpoint(token, ms(pacing.completion_settle_ms)).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Ambient ticks
    // ─────────────────────────────────────────────────────────────────────

    pub async fn head_motion_tick(&self) {
        let command = ambient::random_head_motion(&mut *lock(&self.inner.rng));
        self.send(command).await;
    }

    pub async fn arm_motion_tick(&self) {
        let command = ambient::random_arm_motion(&mut *lock(&self.inner.rng));
        self.send(command).await;
    }

    pub async fn led_tick(&self) {
        let command = ambient::random_led(&mut *lock(&self.inner.rng));
        self.send(command).await;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Event handlers
    // ─────────────────────────────────────────────────────────────────────

    /// Record that `name` finished playing.
    pub fn handle_audio_complete(&self, name: &str) {
        info!(clip = name, "audio playback complete");
        self.inner.playback.record(name);
    }

    /// React to a face: greet it unless a joke is in flight.
    pub async fn handle_face_recognition(&self, label: &str) -> FaceReaction {
        let token = self.token();
        if token.is_cancelled() {
            return FaceReaction::Interrupted;
        }
        let admission = lock(&self.inner.session).admit_greeting();
        let ticket = match admission {
            Admission::Admitted(ticket) => ticket,
            Admission::Talking => {
                debug!(label, "busy talking; face event dropped");
                return FaceReaction::Ignored;
            }
            Admission::Busy => {
                debug!(label, "greeting in progress; face event dropped");
                return FaceReaction::Ignored;
            }
        };
        info!(label, "greeting face");

        let config = &self.inner.config;
        let (image, clip) = self.greeting_for(label);
        self.display(&image).await;
        if still_live(&token).is_err() {
            lock(&self.inner.session).end_greeting(&ticket);
            return FaceReaction::Interrupted;
        }
        self.play(&clip, config.greeting_volume).await;

        let held = async {
            checkpoint(&token, ms(config.pacing.greeting_hold_ms)).await?;
            self.display(&config.script.default_image).await;
            checkpoint(&token, ms(config.pacing.greeting_rearm_ms)).await
        }
        .await;
        lock(&self.inner.session).end_greeting(&ticket);

        match held.and_then(|()| still_live(&token)) {
            Ok(()) => {
                if let Err(err) = self.arm_face_subscription().await {
                    warn!(error = %err, "failed to renew face subscription");
                }
                FaceReaction::Greeted
            }
            Err(_) => FaceReaction::Interrupted,
        }
    }

    /// React to the wake-up key phrase: acknowledge it and re-arm joke
    /// telling.  Returns `true` if the next heartbeat will tell a joke.
    pub async fn handle_key_phrase(&self) -> bool {
        let token = self.token();
        if token.is_cancelled() {
            return false;
        }
        let config = &self.inner.config;
        self.display(&config.script.key_phrase_image).await;
        if still_live(&token).is_err() {
            return false;
        }
        self.play(&config.script.greeting_clip, config.joke_volume).await;
        if checkpoint(&token, ms(config.pacing.key_phrase_hold_ms)).await.is_err() {
            return false;
        }
        self.send(RobotCommand::StartKeyPhraseRecognition).await;
        if token.is_cancelled() {
            return false;
        }

        let rearmed = lock(&self.inner.session).rearm_jokes();
        if rearmed {
            info!("key phrase heard; jokes re-armed");
        }
        rearmed
    }

    fn greeting_for(&self, label: &str) -> (String, String) {
        let script = &self.inner.config.script;
        if let Some(greeting) = script.identity_greetings.iter().find(|g| g.label == label) {
            return (greeting.image.clone(), greeting.clip.clone());
        }
        let image = if label == script.unknown_label {
            self.pick(&script.unknown_face_images)
        } else {
            script.known_face_image.clone()
        };
        (image, script.greeting_clip.clone())
    }

    async fn arm_face_subscription(&self) -> Result<(), SkillError> {
        self.inner.face_armed.store(true, Ordering::SeqCst);
        self.issue(RobotCommand::RegisterEvent(EventSubscription::single_shot(
            EventKind::FaceRecognition,
        )))
        .await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Command helpers
    // ─────────────────────────────────────────────────────────────────────

    async fn issue(&self, command: RobotCommand) -> Result<(), SkillError> {
        self.inner.sink.execute(command).await
    }

    /// Best-effort variant of [`issue`][Self::issue]: failures are logged.
    async fn send(&self, command: RobotCommand) {
        let label = command.label();
        if let Err(err) = self.issue(command).await {
            warn!(command = label, error = %err, "robot command failed");
        }
    }

    fn resolve_clip(&self, wanted: &str) -> String {
        let fallback = &self.inner.config.script.fallback_clip;
        let session = lock(&self.inner.session);
        let clip = session.catalog().resolve_clip(wanted, fallback);
        if clip != wanted {
            debug!(wanted, fallback = clip, "clip missing on robot; using fallback");
        }
        clip.to_string()
    }

    /// Play `wanted`, or the fallback clip if the robot does not have it.
    /// Returns the name actually played.
    async fn play(&self, wanted: &str, volume: u8) -> String {
        let name = self.resolve_clip(wanted);
        self.send(RobotCommand::PlayAudio {
            name: name.clone(),
            volume,
        })
        .await;
        name
    }

    async fn display(&self, image: &str) {
        let known = lock(&self.inner.session).catalog().has_image(image);
        if !known {
            warn!(image, "image not in robot catalog; displaying anyway");
        }
        self.send(RobotCommand::DisplayImage {
            name: image.to_string(),
            layer: self.inner.config.image_layer,
        })
        .await;
    }

    fn pick(&self, pool: &[String]) -> String {
        let mut rng = lock(&self.inner.rng);
        pool.choose(&mut *rng)
            .cloned()
            .unwrap_or_else(|| self.inner.config.script.fallback_clip.clone())
    }
}

#[async_trait]
impl RobotSkill for BehaviorCoordinator {
    fn manifest(&self) -> &SkillManifest {
        &self.inner.manifest
    }

    async fn on_start(&self, parameters: &SkillParameters) {
        self.start(parameters).await;
    }

    async fn on_cancel(&self, _parameters: &SkillParameters) {
        self.cancel().await;
    }

    async fn on_timeout(&self, _parameters: &SkillParameters) {
        self.timeout().await;
    }

    fn dispose(&self) -> bool {
        BehaviorCoordinator::dispose(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
