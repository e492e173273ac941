//! Focus tracking state machine.
//!
//! The [`Tracker`] is the application context: it owns the open
//! [`FocusSession`], the [`FlushController`] (and through it the accumulated
//! totals and the durable store), and the clock. Host notifications are
//! modelled as [`TrackerEvent`]s and consumed one at a time by
//! [`Tracker::apply_at`].
//!
//! # Transitions
//!
//! | event                        | flush? | session afterwards            |
//! |------------------------------|--------|-------------------------------|
//! | `FocusChanged` (new file)    | yes    | opened on the new file at now |
//! | `FocusChanged` (same file)   | no     | unchanged                     |
//! | `WindowActivation(false)`    | if open| idle                          |
//! | `WindowActivation(true)`     | if open| opened on the active file     |
//! | `Checkpoint`                 | if open| same file, restarted at now   |
//! | `Teardown`                   | always | idle, tracker stops           |
//!
//! Every transition that flushes and keeps tracking replaces or restarts the
//! session in the same step, so an interval is never merged twice.
//!
//! Focus changes reported while the window is inactive open no session, but
//! the file is remembered: an activation that does not name a file reopens on
//! the last file the editor reported.

use serde::{Deserialize, Serialize};

use crate::accumulator::AccumulatedTime;
use crate::clock::{Clock, Timestamp};
use crate::flush::{FlushController, FlushOutcome};
use crate::session::FocusSession;
use crate::store::DurableStore;
use crate::types::FileId;

/// A notification from the host editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackerEvent {
    /// The active editor changed. `None` means no file is open.
    FocusChanged {
        #[serde(default)]
        file: Option<FileId>,
    },
    /// The editor window gained or lost OS focus.
    WindowActivation {
        focused: bool,
        /// The file active in the editor when the window regained focus.
        /// `None` falls back to the last file the editor reported.
        #[serde(default)]
        active_file: Option<FileId>,
    },
    /// Commit the open interval without ending the session.
    Checkpoint,
    /// The host is shutting down.
    Teardown,
}

/// Focus tracker and flush owner for one editor process.
pub struct Tracker {
    session: FocusSession,
    flush: FlushController,
    clock: Box<dyn Clock>,
    /// Last file the editor reported as active, focused window or not.
    editor_file: Option<FileId>,
    window_focused: bool,
    torn_down: bool,
}

impl Tracker {
    /// Loads prior totals from `store` and opens a session on `active_file`.
    ///
    /// The window is assumed to be in front at startup.
    pub fn start(
        store: Box<dyn DurableStore>,
        clock: Box<dyn Clock>,
        active_file: Option<FileId>,
    ) -> Self {
        let flush = FlushController::load(store);
        let session = FocusSession::open(active_file.clone(), clock.now());
        tracing::debug!(?session, "tracker started");
        Self {
            session,
            flush,
            clock,
            editor_file: active_file,
            window_focused: true,
            torn_down: false,
        }
    }

    /// Applies `event` at the current clock time.
    pub fn apply(&mut self, event: TrackerEvent) -> Option<FlushOutcome> {
        let now = self.clock.now();
        self.apply_at(event, now)
    }

    /// Applies `event` as if it happened at `now`.
    ///
    /// Returns the flush outcome when the transition flushed.
    pub fn apply_at(&mut self, event: TrackerEvent, now: Timestamp) -> Option<FlushOutcome> {
        if self.torn_down {
            tracing::debug!(?event, "tracker already torn down, ignoring event");
            return None;
        }

        match event {
            TrackerEvent::FocusChanged { file } => self.on_focus_changed(file, now),
            TrackerEvent::WindowActivation {
                focused,
                active_file,
            } => self.on_window_activation(focused, active_file, now),
            TrackerEvent::Checkpoint => self.on_checkpoint(now),
            TrackerEvent::Teardown => Some(self.on_teardown(now)),
        }
    }

    fn on_focus_changed(&mut self, file: Option<FileId>, now: Timestamp) -> Option<FlushOutcome> {
        self.editor_file.clone_from(&file);
        if !self.window_focused {
            tracing::debug!(?file, "focus changed while window inactive, not tracking");
            return None;
        }
        if self.session.file() == file.as_ref() {
            // Duplicate event for the same file: keep the running interval.
            return None;
        }

        let outcome = self.flush.flush(&self.session, now);
        self.session = FocusSession::open(file, now);
        Some(outcome)
    }

    fn on_window_activation(
        &mut self,
        focused: bool,
        active_file: Option<FileId>,
        now: Timestamp,
    ) -> Option<FlushOutcome> {
        self.window_focused = focused;

        let outcome = self
            .session
            .is_open()
            .then(|| self.flush.flush(&self.session, now));

        self.session = if focused {
            if active_file.is_some() {
                self.editor_file.clone_from(&active_file);
            }
            FocusSession::open(self.editor_file.clone(), now)
        } else {
            FocusSession::Idle
        };
        outcome
    }

    fn on_checkpoint(&mut self, now: Timestamp) -> Option<FlushOutcome> {
        if !self.session.is_open() {
            return None;
        }
        let outcome = self.flush.flush(&self.session, now);
        self.session.restart(now);
        Some(outcome)
    }

    fn on_teardown(&mut self, now: Timestamp) -> FlushOutcome {
        let outcome = self.flush.flush(&self.session, now);
        self.session = FocusSession::Idle;
        self.torn_down = true;
        tracing::debug!(persisted = outcome.persisted, "tracker torn down");
        outcome
    }

    pub const fn session(&self) -> &FocusSession {
        &self.session
    }

    /// Committed totals. The open session's time is not included until it is flushed.
    pub fn snapshot(&self) -> AccumulatedTime {
        self.flush.snapshot()
    }

    pub const fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}
