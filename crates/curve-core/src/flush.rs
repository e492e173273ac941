//! Closing the open interval and persisting the result.

use crate::accumulator::{AccumulatedTime, Accumulator};
use crate::clock::Timestamp;
use crate::session::FocusSession;
use crate::store::{DurableStore, RECORD_KEY};
use crate::types::FileId;

/// A session interval that was converted into a committed delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedSession {
    pub file: FileId,
    /// Milliseconds merged for this interval, after clamping.
    pub delta_ms: u64,
    /// Total for the file after the merge.
    pub total_ms: u64,
}

/// Result of a single flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushOutcome {
    /// The interval that was merged, if a file was open.
    pub closed: Option<ClosedSession>,
    /// Whether the durable write succeeded.
    pub persisted: bool,
}

/// Owns committed time and its durable store.
///
/// `flush` borrows the session immutably: replacing or restarting the session
/// afterwards is the caller's job. Any caller that keeps tracking after a
/// flush must restart the session, otherwise the next flush counts the same
/// interval again.
pub struct FlushController {
    accumulator: Accumulator,
    store: Box<dyn DurableStore>,
}

impl FlushController {
    /// Creates a controller, loading the durable record.
    ///
    /// A missing record starts from an empty mapping. So does an unreadable
    /// one; the next successful persist replaces it.
    pub fn load(store: Box<dyn DurableStore>) -> Self {
        let mut accumulator = Accumulator::new();
        match store.get(RECORD_KEY) {
            Ok(Some(record)) => {
                tracing::debug!(files = record.len(), "loaded accumulated time");
                accumulator.load_from(record);
            }
            Ok(None) => tracing::debug!("no accumulated time record, starting empty"),
            Err(err) => {
                tracing::warn!(error = %err, "failed to load accumulated time, starting empty");
            }
        }
        Self { accumulator, store }
    }

    /// Merges the open session's elapsed time and writes the full mapping.
    pub fn flush(&mut self, session: &FocusSession, now: Timestamp) -> FlushOutcome {
        let closed = match session {
            FocusSession::Open { file, started_at } => {
                let raw = now.signed_millis_since(*started_at);
                if raw < 0 {
                    tracing::debug!(file = %file, raw_delta_ms = raw, "clock went backwards, clamping delta");
                }
                let total_ms = self.accumulator.merge_delta(file, raw);
                let delta_ms = now.millis_since(*started_at);
                tracing::info!(
                    file = %file,
                    delta_secs = delta_ms / 1000,
                    total_secs = total_ms / 1000,
                    "closed focus session"
                );
                Some(ClosedSession {
                    file: file.clone(),
                    delta_ms,
                    total_ms,
                })
            }
            FocusSession::Idle => None,
        };

        let persisted = match self.accumulator.persist_to(self.store.as_mut()) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "failed to persist accumulated time, will retry on next flush");
                false
            }
        };

        FlushOutcome { closed, persisted }
    }

    pub fn snapshot(&self) -> AccumulatedTime {
        self.accumulator.snapshot()
    }
}
