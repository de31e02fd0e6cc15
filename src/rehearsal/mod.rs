//! Rehearsal playback over a practice script.
//!
//! A [`Rehearsal`] walks one script's lines in order. Counterpart lines are
//! handed to a [`Narrator`]; once narration finishes and a short grace
//! interval passes, the session moves on by itself. Self lines wait for the
//! user to [`advance`](Rehearsal::advance). Reaching the end records one
//! practice run on the script.
//!
//! The engine is pull-based: hosts feed it narration events and clock ticks
//! ([`Rehearsal::poll`]) and read its state through [`Rehearsal::snapshot`].
//! Every command returns the [`Transition`] it caused.
//!
//! ```text
//!            start                 finished + grace / advance
//!   Idle ──────────────► Narrating ─────────────────────────► next line
//!     ▲                    │   ▲
//!     │ reset        pause │   │ resume
//!     │                    ▼   │
//!     └──────────────── Paused
//!
//!   AwaitingSelf ── advance ──► next line ... past last ──► Completed
//! ```

pub mod narrator;

pub use narrator::{
    ConsoleNarrator, NarrationEvent, NarrationOutcome, Narrator, UtteranceId, Voice,
};

use crate::models::{PracticeDialogue, PracticeScript};
use crate::storage::{SharedStore, lock};
use crate::{Error, Result};
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Pause between the end of a counterpart line and the next line.
pub const DEFAULT_GRACE: Duration = Duration::from_millis(500);

/// Rehearsal session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RehearsalState {
    Idle,
    NarratingCounterpart,
    AwaitingSelf,
    Paused,
    Completed,
}

impl RehearsalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RehearsalState::Idle => "idle",
            RehearsalState::NarratingCounterpart => "narrating_counterpart",
            RehearsalState::AwaitingSelf => "awaiting_self",
            RehearsalState::Paused => "paused",
            RehearsalState::Completed => "completed",
        }
    }

    /// Whether a session is in progress.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RehearsalState::NarratingCounterpart
                | RehearsalState::AwaitingSelf
                | RehearsalState::Paused
        )
    }
}

impl fmt::Display for RehearsalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A state change caused by one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: RehearsalState,
    pub to: RehearsalState,
    /// Cursor after the command
    pub cursor: usize,
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub state: RehearsalState,
    pub script_id: Option<Uuid>,
    pub cursor: usize,
    pub total: usize,
    pub current: Option<PracticeDialogue>,
    /// 0.0-1.0
    pub progress: f64,
}

/// What to do on resume.
#[derive(Debug, Clone, Copy)]
enum PausedPhase {
    /// Paused while a line was being spoken
    Speaking { resumable: bool },
    /// Paused after narration finished, before the grace interval ran out
    Grace { remaining: Duration },
}

/// A rehearsal session over one script.
pub struct Rehearsal<N: Narrator> {
    store: SharedStore,
    narrator: N,
    grace: Duration,
    script_id: Option<Uuid>,
    lines: Vec<PracticeDialogue>,
    cursor: usize,
    state: RehearsalState,
    next_utterance: u64,
    pending: Option<UtteranceId>,
    grace_deadline: Option<Instant>,
    paused: Option<PausedPhase>,
}

impl<N: Narrator> Rehearsal<N> {
    pub fn new(store: SharedStore, narrator: N) -> Self {
        Self {
            store,
            narrator,
            grace: DEFAULT_GRACE,
            script_id: None,
            lines: Vec::new(),
            cursor: 0,
            state: RehearsalState::Idle,
            next_utterance: 0,
            pending: None,
            grace_deadline: None,
            paused: None,
        }
    }

    /// Override the grace interval after counterpart lines.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn state(&self) -> RehearsalState {
        self.state
    }

    pub fn narrator(&self) -> &N {
        &self.narrator
    }

    /// When the running grace interval ends, if one is running.
    pub fn grace_deadline(&self) -> Option<Instant> {
        self.grace_deadline
    }

    pub fn snapshot(&self) -> Snapshot {
        let total = self.lines.len();
        let progress = match (self.state, total) {
            (RehearsalState::Completed, _) => 1.0,
            (_, 0) => 0.0,
            _ => self.cursor as f64 / total as f64,
        };
        Snapshot {
            state: self.state,
            script_id: self.script_id,
            cursor: self.cursor,
            total,
            current: self.current().cloned(),
            progress,
        }
    }

    /// The line under the cursor, while a session is running.
    pub fn current(&self) -> Option<&PracticeDialogue> {
        if self.state.is_active() {
            self.lines.get(self.cursor)
        } else {
            None
        }
    }

    // === Commands ===

    /// Load a script and begin at its first line.
    pub fn start(&mut self, script_id: Uuid) -> Result<Transition> {
        let from = self.state;
        if from.is_active() {
            return Err(invalid("start", from));
        }

        let (lines, voice) = {
            let mut store = lock(&self.store)?;
            store.get::<PracticeScript>(script_id)?;
            let lines = store.children::<PracticeDialogue>(script_id)?;
            let voice = Voice::from(&store.settings()?);
            (lines, voice)
        };
        self.narrator.configure(voice);

        self.script_id = Some(script_id);
        self.lines = lines;
        self.cursor = 0;
        self.clear_timers();
        tracing::info!(script = %script_id, lines = self.lines.len(), "rehearsal started");

        if self.lines.is_empty() {
            self.complete()?;
        } else {
            self.enter_current()?;
        }
        Ok(self.transition(from))
    }

    /// Move to the next line. While a counterpart line is being narrated this
    /// stops the narration first.
    pub fn advance(&mut self) -> Result<Transition> {
        let from = self.state;
        match from {
            RehearsalState::NarratingCounterpart => self.stop_pending(),
            RehearsalState::AwaitingSelf => {}
            _ => return Err(invalid("advance", from)),
        }
        self.step()?;
        Ok(self.transition(from))
    }

    /// Same as [`advance`](Self::advance).
    pub fn skip(&mut self) -> Result<Transition> {
        self.advance()
    }

    /// Suspend a counterpart line.
    pub fn pause(&mut self) -> Result<Transition> {
        let from = self.state;
        if from != RehearsalState::NarratingCounterpart {
            return Err(invalid("pause", from));
        }

        let phase = match self.pending {
            Some(utterance) => {
                if self.narrator.pause() {
                    PausedPhase::Speaking { resumable: true }
                } else {
                    // No mid-utterance resume: the line restarts on resume
                    self.narrator.stop(utterance);
                    self.pending = None;
                    PausedPhase::Speaking { resumable: false }
                }
            }
            None => PausedPhase::Grace {
                remaining: self
                    .grace_deadline
                    .take()
                    .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                    .unwrap_or(Duration::ZERO),
            },
        };
        self.paused = Some(phase);
        self.state = RehearsalState::Paused;
        Ok(self.transition(from))
    }

    pub fn resume(&mut self) -> Result<Transition> {
        let from = self.state;
        if from != RehearsalState::Paused {
            return Err(invalid("resume", from));
        }

        self.state = RehearsalState::NarratingCounterpart;
        match self.paused.take() {
            Some(PausedPhase::Speaking { resumable: true }) => self.narrator.resume(),
            Some(PausedPhase::Grace { remaining }) => {
                self.grace_deadline = Some(Instant::now() + remaining);
            }
            Some(PausedPhase::Speaking { resumable: false }) | None => self.speak_current()?,
        }
        Ok(self.transition(from))
    }

    /// Abandon the session and return to the first line. Valid in any state.
    pub fn reset(&mut self) -> Transition {
        let from = self.state;
        self.stop_pending();
        self.clear_timers();
        self.cursor = 0;
        self.state = RehearsalState::Idle;
        tracing::debug!(from = %from, "rehearsal reset");
        self.transition(from)
    }

    /// Report how an utterance ended.
    ///
    /// Events for anything but the outstanding utterance are ignored. A failed
    /// utterance counts as finished, then surfaces as
    /// [`Error::NarrationFailure`].
    pub fn on_narration(&mut self, event: NarrationEvent) -> Result<()> {
        if self.pending != Some(event.utterance) {
            tracing::debug!(utterance = %event.utterance, "ignoring stale narration event");
            return Ok(());
        }
        self.pending = None;
        match self.state {
            RehearsalState::NarratingCounterpart => {
                self.grace_deadline = Some(Instant::now() + self.grace);
            }
            RehearsalState::Paused => {
                self.paused = Some(PausedPhase::Grace {
                    remaining: self.grace,
                });
            }
            _ => {}
        }

        match event.outcome {
            NarrationOutcome::Finished => Ok(()),
            NarrationOutcome::Cancelled => {
                tracing::debug!(utterance = %event.utterance, "narration cancelled by narrator");
                Ok(())
            }
            NarrationOutcome::Failed(reason) => {
                tracing::warn!(utterance = %event.utterance, %reason, "narration failed");
                Err(Error::NarrationFailure(reason))
            }
        }
    }

    /// Advance past a counterpart line once its grace interval has elapsed.
    pub fn poll(&mut self, now: Instant) -> Result<Option<Transition>> {
        if self.state != RehearsalState::NarratingCounterpart {
            return Ok(None);
        }
        match self.grace_deadline {
            Some(deadline) if now >= deadline => {
                let from = self.state;
                self.step()?;
                Ok(Some(self.transition(from)))
            }
            _ => Ok(None),
        }
    }

    // === Internals ===

    fn transition(&self, from: RehearsalState) -> Transition {
        let transition = Transition {
            from,
            to: self.state,
            cursor: self.cursor,
        };
        if from != self.state {
            tracing::debug!(from = %from, to = %self.state, cursor = self.cursor, "rehearsal transition");
        }
        transition
    }

    fn step(&mut self) -> Result<()> {
        self.clear_timers();
        if self.cursor + 1 >= self.lines.len() {
            return self.complete();
        }
        self.cursor += 1;
        self.enter_current()
    }

    fn enter_current(&mut self) -> Result<()> {
        let is_user = match self.lines.get(self.cursor) {
            Some(line) => line.speaker.is_user(),
            None => return self.complete(),
        };
        if is_user {
            self.state = RehearsalState::AwaitingSelf;
            Ok(())
        } else {
            self.state = RehearsalState::NarratingCounterpart;
            self.speak_current()
        }
    }

    fn speak_current(&mut self) -> Result<()> {
        let utterance = UtteranceId(self.next_utterance);
        self.next_utterance += 1;
        self.pending = Some(utterance);
        self.grace_deadline = None;

        let text = self
            .lines
            .get(self.cursor)
            .map(|line| line.content.clone())
            .unwrap_or_default();
        if let Err(e) = self.narrator.speak(utterance, &text) {
            tracing::warn!(%utterance, error = %e, "narrator failed to start");
            self.on_narration(NarrationEvent::failed(utterance, e.to_string()))?;
        }
        Ok(())
    }

    /// Record the run, then enter `Completed`. A failed write leaves the
    /// session on its current line.
    fn complete(&mut self) -> Result<()> {
        if let Some(script_id) = self.script_id {
            lock(&self.store)?.record_practice(script_id, Utc::now())?;
        }
        self.state = RehearsalState::Completed;
        self.cursor = self.lines.len();
        self.clear_timers();
        Ok(())
    }

    fn stop_pending(&mut self) {
        if let Some(utterance) = self.pending.take() {
            self.narrator.stop(utterance);
        }
    }

    fn clear_timers(&mut self) {
        self.grace_deadline = None;
        self.paused = None;
    }
}

impl<N: Narrator> Drop for Rehearsal<N> {
    fn drop(&mut self) {
        self.stop_pending();
    }
}

fn invalid(command: &str, state: RehearsalState) -> Error {
    Error::InvalidState(format!("cannot {} while {}", command, state))
}
