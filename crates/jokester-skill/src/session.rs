//! Session state machine.
//!
//! All mutable state shared between timer ticks and event handlers lives in
//! one [`SessionInner`] record, guarded by a single mutex in the coordinator.
//! Check-then-set decisions (may a joke start? may a greeting start?) are made
//! here, under that lock, so they are atomic with respect to each other.
//!
//! ```text
//! Idle        -> ReadyToJoke   start, key phrase
//! ReadyToJoke -> Talking       heartbeat begins a joke
//! Talking     -> ReadyToJoke   joke told, more remain
//! Talking     -> Idle          last joke told, or run cancelled
//! ReadyToJoke -> Idle          teardown
//! ```
//!
//! Every run is stamped with an epoch.  Tickets handed out by
//! [`SessionInner::begin_joke`] and [`SessionInner::admit_greeting`] carry it,
//! so a sequence left over from a cancelled run cannot touch the next one.

use std::fmt;

use jokester_types::SkillError;

use crate::catalog::AssetCatalog;

// ─────────────────────────────────────────────────────────────────────────────
// SessionState
// ─────────────────────────────────────────────────────────────────────────────

/// What the skill is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// Not telling jokes: before start, after teardown, or after the last joke.
    #[default]
    Idle,
    /// The next heartbeat will start a joke.
    ReadyToJoke,
    /// A joke sequence is in flight; face events are dropped.
    Talking,
}

impl SessionState {
    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Idle, Idle) => true,
            (Idle, ReadyToJoke) => true,
            (Idle, Talking) => false,
            (ReadyToJoke, Idle) => true,
            (ReadyToJoke, ReadyToJoke) => true,
            (ReadyToJoke, Talking) => true,
            (Talking, Idle) => true,
            (Talking, ReadyToJoke) => true,
            (Talking, Talking) => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SessionState::Idle => "idle",
            SessionState::ReadyToJoke => "ready-to-joke",
            SessionState::Talking => "talking",
        };
        f.write_str(text)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tickets and outcomes
// ─────────────────────────────────────────────────────────────────────────────

/// Proof that a heartbeat owns the `Talking` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JokeTicket {
    epoch: u64,
    /// Index of the joke to tell.
    pub cursor: usize,
}

/// Proof that a face greeting is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GreetingTicket {
    epoch: u64,
}

/// Result of advancing the joke cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JokeOutcome {
    /// More jokes remain; `cursor` points at the next one.
    NextJoke { cursor: usize },
    /// The last joke was told and the cursor wrapped to 0.
    SequenceComplete,
}

/// Answer to "may this face event be greeted?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted(GreetingTicket),
    /// A joke is in flight; the event is dropped.
    Talking,
    /// Another greeting is already in flight.
    Busy,
}

// ─────────────────────────────────────────────────────────────────────────────
// SessionInner
// ─────────────────────────────────────────────────────────────────────────────

/// The coordinator's single state record.
#[derive(Debug, Default)]
pub struct SessionInner {
    state: SessionState,
    joke_cursor: usize,
    greeting: bool,
    face_rearm_pending: bool,
    epoch: u64,
    catalog: AssetCatalog,
}

impl SessionInner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn joke_cursor(&self) -> usize {
        self.joke_cursor
    }

    pub fn is_greeting(&self) -> bool {
        self.greeting
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    /// Begin a new run from scratch with a freshly fetched `catalog`.
    ///
    /// Sequences still in flight from a previous run lose their tickets.
    pub fn reset(&mut self, catalog: AssetCatalog) {
        self.epoch += 1;
        self.state = SessionState::Idle;
        self.joke_cursor = 0;
        self.greeting = false;
        self.face_rearm_pending = false;
        self.catalog = catalog;
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`SkillError::IllegalTransition`] for pairs rejected by
    /// [`SessionState::can_transition_to`].
    pub fn transition(&mut self, next: SessionState) -> Result<(), SkillError> {
        if !self.state.can_transition_to(next) {
            return Err(SkillError::IllegalTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    /// `ReadyToJoke → Talking`, unless a greeting is in flight.
    pub fn begin_joke(&mut self) -> Option<JokeTicket> {
        if self.state != SessionState::ReadyToJoke || self.greeting {
            return None;
        }
        self.state = SessionState::Talking;
        Some(JokeTicket {
            epoch: self.epoch,
            cursor: self.joke_cursor,
        })
    }

    /// Advance the cursor after the joke for `ticket` was told.
    ///
    /// # Errors
    ///
    /// Returns [`SkillError::IllegalTransition`] when `ticket` no longer owns
    /// the `Talking` state.
    pub fn advance_cursor(
        &mut self,
        ticket: &JokeTicket,
        joke_count: usize,
    ) -> Result<JokeOutcome, SkillError> {
        if ticket.epoch != self.epoch || self.state != SessionState::Talking {
            return Err(SkillError::IllegalTransition {
                from: self.state.to_string(),
                to: "next joke".to_string(),
            });
        }
        self.joke_cursor += 1;
        if self.joke_cursor >= joke_count {
            self.joke_cursor = 0;
            Ok(JokeOutcome::SequenceComplete)
        } else {
            Ok(JokeOutcome::NextJoke {
                cursor: self.joke_cursor,
            })
        }
    }

    /// Release `Talking`, moving to `next`.  Stale tickets are ignored.
    ///
    /// Returns `true` when the state was actually released.
    pub fn leave_talking(&mut self, ticket: &JokeTicket, next: SessionState) -> bool {
        if ticket.epoch != self.epoch || self.state != SessionState::Talking {
            return false;
        }
        self.transition(next).is_ok()
    }

    /// Decide whether a face event may be greeted.
    ///
    /// Events dropped because a joke is in flight leave a pending re-arm,
    /// collected with [`take_face_rearm`][Self::take_face_rearm] once the joke
    /// is over.
    pub fn admit_greeting(&mut self) -> Admission {
        if self.state == SessionState::Talking {
            self.face_rearm_pending = true;
            return Admission::Talking;
        }
        if self.greeting {
            return Admission::Busy;
        }
        self.greeting = true;
        Admission::Admitted(GreetingTicket { epoch: self.epoch })
    }

    pub fn end_greeting(&mut self, ticket: &GreetingTicket) {
        if ticket.epoch == self.epoch {
            self.greeting = false;
        }
    }

    /// Return and clear the "face subscription needs renewing" flag.
    pub fn take_face_rearm(&mut self) -> bool {
        std::mem::take(&mut self.face_rearm_pending)
    }

    /// Make the next heartbeat tell jokes again, unless one is in flight.
    pub fn rearm_jokes(&mut self) -> bool {
        if self.state == SessionState::Talking {
            return false;
        }
        self.transition(SessionState::ReadyToJoke).is_ok()
    }

    /// Stop scheduling jokes.  An in-flight sequence releases `Talking`
    /// itself when it observes cancellation.
    pub fn stop(&mut self) {
        if self.state == SessionState::ReadyToJoke {
            self.state = SessionState::Idle;
        }
        self.face_rearm_pending = false;
    }
}
