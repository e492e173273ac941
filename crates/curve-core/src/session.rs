//! The currently open focus session.

use crate::clock::Timestamp;
use crate::types::FileId;

/// Time not yet committed: which file is focused, and since when.
///
/// At most one session is open per tracker. The file and its start time are
/// set together or not at all.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FocusSession {
    /// No file is focused (window in the background, or no editor open).
    #[default]
    Idle,
    /// A file is focused.
    Open {
        file: FileId,
        started_at: Timestamp,
    },
}

impl FocusSession {
    /// Opens a session on `file` at `now`, or returns `Idle` when there is no file.
    pub fn open(file: Option<FileId>, now: Timestamp) -> Self {
        match file {
            Some(file) => Self::Open {
                file,
                started_at: now,
            },
            None => Self::Idle,
        }
    }

    pub const fn file(&self) -> Option<&FileId> {
        match self {
            Self::Open { file, .. } => Some(file),
            Self::Idle => None,
        }
    }

    pub const fn started_at(&self) -> Option<Timestamp> {
        match self {
            Self::Open { started_at, .. } => Some(*started_at),
            Self::Idle => None,
        }
    }

    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// Restarts the interval for the same file. No-op when idle.
    pub(crate) fn restart(&mut self, now: Timestamp) {
        if let Self::Open { started_at, .. } = self {
            *started_at = now;
        }
    }
}
