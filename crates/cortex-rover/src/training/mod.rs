//! # Mental-Command Training
//!
//! [`machine`] holds the per-attempt transition table; [`supervisor`]
//! drives it against the client for every configured action and runs the
//! validation pass after each non-neutral action.
//!
//! Progress is reported through a [`TrainingObserver`]. `()` ignores every
//! update and `Vec<TrainingUpdate>` records them.

pub mod machine;
pub mod supervisor;

use crate::protocol::training::TrainingStatus;
use crate::relay::RelayReport;

pub use supervisor::{
    AttemptOutcome, StrayEventPolicy, TrainingAttempt, TrainingPlan, TrainingReport,
    TrainingSupervisor,
};

/// A progress notification from a training run.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingUpdate {
    /// Training for an action begins.
    ActionStarted { action: String, attempts: u32 },
    /// `start` was sent for an attempt.
    AttemptStarted { action: String, attempt: u32 },
    /// The device reported recording progress.
    Recording { action: String, attempt: u32 },
    /// `accept` or `reject` was sent.
    VerdictSent {
        action: String,
        attempt: u32,
        status: TrainingStatus,
    },
    /// An event the current state tolerates but did not expect.
    StrayEvent {
        action: String,
        attempt: u32,
        event: String,
    },
    /// An attempt reached its outcome.
    AttemptFinished {
        action: String,
        attempt: u32,
        outcome: AttemptOutcome,
    },
    /// The `com` validation pass for an action begins.
    ValidationStarted { action: String, samples: u32 },
    /// One classified sample was relayed.
    Sample {
        index: u32,
        total: u32,
        label: String,
        triggered: bool,
    },
    /// The validation pass for an action finished.
    ValidationFinished { action: String, report: RelayReport },
}

/// Receives [`TrainingUpdate`]s as a run progresses.
pub trait TrainingObserver {
    fn notify(&mut self, update: TrainingUpdate);
}

impl TrainingObserver for () {
    fn notify(&mut self, _update: TrainingUpdate) {}
}

impl TrainingObserver for Vec<TrainingUpdate> {
    fn notify(&mut self, update: TrainingUpdate) {
        self.push(update);
    }
}
