//! Lifecycle states of the supervised worker.

use std::fmt;

/// Observable state of the current worker instance.
///
/// A live instance moves `Starting → Ready → (Busy ⇄ Ready)* → Dead`. `Dead`
/// is terminal for that instance; a respawn starts a new one at `Starting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No worker has been spawned yet.
    NotStarted,
    /// A worker is being spawned and configured.
    Starting,
    /// The worker is idle and accepting requests.
    Ready,
    /// A request is in flight.
    Busy,
    /// The worker exited or was torn down.
    Dead,
    /// The supervisor was shut down; no further workers are spawned.
    Stopped,
}

impl WorkerState {
    /// Returns `true` when a worker process is expected to be running.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Starting | Self::Ready | Self::Busy)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotStarted => "not_started",
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Busy => "busy",
            Self::Dead => "dead",
            Self::Stopped => "stopped",
        };
        formatter.write_str(label)
    }
}
