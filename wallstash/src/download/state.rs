//! Transfer state and the events that drive it.

use std::fmt;

use serde::Serialize;

/// Observable lifecycle of one reference's download.
///
/// Within an attempt the state only moves forward:
/// `NotStarted → Downloading → Completed | Failed`. A new attempt resets
/// progress to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TransferState {
    /// Nothing in progress (never started, or cancelled).
    #[default]
    NotStarted,
    /// Transfer running; `progress` is in `[0.0, 1.0]`.
    Downloading { progress: f64 },
    /// The artifact is in the cache.
    Completed,
    /// The last attempt failed.
    Failed { reason: String },
    /// The attempt was stopped and its partial data discarded.
    Paused,
}

impl TransferState {
    /// Whether an attempt is currently running.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Downloading { .. })
    }

    /// Whether the state is an end state of an attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. })
    }

    /// Progress fraction; 1.0 once completed, 0.0 when idle.
    pub fn progress(&self) -> f64 {
        match self {
            Self::Downloading { progress } => *progress,
            Self::Completed => 1.0,
            _ => 0.0,
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::Downloading { progress } => write!(f, "downloading ({:.0}%)", progress * 100.0),
            Self::Completed => write!(f, "completed"),
            Self::Failed { reason } => write!(f, "failed: {}", reason),
            Self::Paused => write!(f, "paused"),
        }
    }
}

/// Identifies one download attempt.
///
/// Events carry the id of the attempt that produced them; events from an
/// attempt that is no longer current are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptId(pub(crate) u64);

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What happened inside an attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEventKind {
    /// Bytes arrived; fraction of the known total.
    Progress(f64),
    /// The artifact was stored.
    Completed,
    /// The attempt failed.
    Failed(String),
}

/// Message from a running attempt to the progress tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferEvent {
    /// Reference the attempt is downloading.
    pub reference: String,
    /// Attempt that produced the event.
    pub attempt: AttemptId,
    /// Event payload.
    pub kind: TransferEventKind,
}

impl TransferEvent {
    pub fn progress(reference: impl Into<String>, attempt: AttemptId, fraction: f64) -> Self {
        Self {
            reference: reference.into(),
            attempt,
            kind: TransferEventKind::Progress(fraction),
        }
    }

    pub fn completed(reference: impl Into<String>, attempt: AttemptId) -> Self {
        Self {
            reference: reference.into(),
            attempt,
            kind: TransferEventKind::Completed,
        }
    }

    pub fn failed(reference: impl Into<String>, attempt: AttemptId, reason: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            attempt,
            kind: TransferEventKind::Failed(reason.into()),
        }
    }
}

/// State change published to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusUpdate {
    pub reference: String,
    #[serde(flatten)]
    pub state: TransferState,
}
