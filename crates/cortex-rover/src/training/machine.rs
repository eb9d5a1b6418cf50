//! Transition table for a single training attempt.
//!
//! [`step`] is a pure function from the current [`AttemptState`] and one
//! [`TrainingInput`] to the next state plus the [`Effect`] the driver must
//! perform. It never touches the channel, so every path through the table
//! is testable with a plain list of inputs.
//!
//! ```text
//!  Idle ──Settled/send start──► Starting ──MC_Started──► InProgress
//!                                                         │      │
//!                                      MC_Succeeded/accept│      │MC_Failed/reject
//!                                                         ▼      ▼
//!                                                  Succeeded    Failed
//!                                                         │      │
//!                                               Dispatched│      │Dispatched
//!                                                         ▼      ▼
//!                                            Finalizing(verdict) ──MC_Completed──► Completed
//! ```

use std::fmt;

use crate::error::{CortexError, CortexResult};
use crate::protocol::constants::SysEvents;
use crate::protocol::training::TrainingStatus;

/// The decision sent for a recorded sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected,
}

/// Where an attempt is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// Waiting for the settle delay to elapse.
    Idle,
    /// `start` sent, waiting for the device to begin recording.
    Starting,
    /// The device is recording.
    InProgress,
    /// Recording succeeded; `accept` is being sent.
    Succeeded,
    /// Recording failed; `reject` is being sent.
    Failed,
    /// Verdict sent, waiting for `MC_Completed`.
    Finalizing(Verdict),
    /// Terminal.
    Completed(Verdict),
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptState::Idle => write!(f, "idle"),
            AttemptState::Starting => write!(f, "starting"),
            AttemptState::InProgress => write!(f, "in progress"),
            AttemptState::Succeeded => write!(f, "succeeded"),
            AttemptState::Failed => write!(f, "failed"),
            AttemptState::Finalizing(_) => write!(f, "finalizing"),
            AttemptState::Completed(_) => write!(f, "completed"),
        }
    }
}

/// A training-related `sys` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainingEvent {
    Started,
    Succeeded,
    Failed,
    Completed,
    /// Any other event name, kept for diagnostics.
    Other(String),
}

impl TrainingEvent {
    /// Classify a `sys` event name.
    pub fn from_name(name: &str) -> Self {
        match name {
            SysEvents::MC_STARTED => TrainingEvent::Started,
            SysEvents::MC_SUCCEEDED => TrainingEvent::Succeeded,
            SysEvents::MC_FAILED => TrainingEvent::Failed,
            SysEvents::MC_COMPLETED => TrainingEvent::Completed,
            other => TrainingEvent::Other(other.to_owned()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TrainingEvent::Started => SysEvents::MC_STARTED,
            TrainingEvent::Succeeded => SysEvents::MC_SUCCEEDED,
            TrainingEvent::Failed => SysEvents::MC_FAILED,
            TrainingEvent::Completed => SysEvents::MC_COMPLETED,
            TrainingEvent::Other(name) => name,
        }
    }
}

/// Everything that can move an attempt forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainingInput {
    /// The settle delay elapsed.
    Settled,
    /// The outstanding `training` request was acknowledged.
    Ack,
    /// A `sys` event arrived.
    System(TrainingEvent),
    /// The verdict request was written to the channel.
    Dispatched,
}

impl fmt::Display for TrainingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingInput::Settled => write!(f, "settled"),
            TrainingInput::Ack => write!(f, "ack"),
            TrainingInput::System(event) => write!(f, "{}", event.name()),
            TrainingInput::Dispatched => write!(f, "dispatched"),
        }
    }
}

/// What the driver must do after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send a `training` request with this status.
    Send(TrainingStatus),
    /// Recording is progressing.
    Progress,
    /// An event the state tolerates but does not expect.
    Diagnostic(String),
    None,
}

/// Result of one [`step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: AttemptState,
    pub effect: Effect,
}

impl Transition {
    fn to(next: AttemptState, effect: Effect) -> Self {
        Self { next, effect }
    }

    fn stay(state: AttemptState) -> Self {
        Self::to(state, Effect::None)
    }
}

/// Apply one input to an attempt.
///
/// Fails with [`CortexError::UnexpectedEvent`] for any pair the table does
/// not list.
pub fn step(state: AttemptState, input: &TrainingInput) -> CortexResult<Transition> {
    use AttemptState as S;
    use TrainingEvent as E;
    use TrainingInput as I;

    let transition = match (state, input) {
        (S::Idle, I::Settled) => Transition::to(S::Starting, Effect::Send(TrainingStatus::Start)),

        (S::Starting, I::Ack) => Transition::stay(S::Starting),
        (S::Starting, I::System(E::Started)) => Transition::to(S::InProgress, Effect::Progress),
        (S::Starting, I::System(other)) => {
            Transition::to(S::Starting, Effect::Diagnostic(other.name().to_owned()))
        }

        (S::InProgress, I::Ack) => Transition::stay(S::InProgress),
        (S::InProgress, I::System(E::Started)) => Transition::to(S::InProgress, Effect::Progress),
        (S::InProgress, I::System(E::Succeeded)) => {
            Transition::to(S::Succeeded, Effect::Send(TrainingStatus::Accept))
        }
        (S::InProgress, I::System(E::Failed)) => {
            Transition::to(S::Failed, Effect::Send(TrainingStatus::Reject))
        }

        (S::Succeeded, I::Dispatched) => Transition::stay(S::Finalizing(Verdict::Accepted)),
        (S::Failed, I::Dispatched) => Transition::stay(S::Finalizing(Verdict::Rejected)),

        (S::Finalizing(verdict), I::Ack) => Transition::stay(S::Finalizing(verdict)),
        (S::Finalizing(verdict), I::System(E::Completed)) => {
            Transition::stay(S::Completed(verdict))
        }
        (S::Finalizing(verdict), I::System(other)) => Transition::to(
            S::Finalizing(verdict),
            Effect::Diagnostic(other.name().to_owned()),
        ),

        (state, input) => {
            return Err(CortexError::UnexpectedEvent {
                state: state.to_string(),
                event: input.to_string(),
            });
        }
    };

    Ok(transition)
}
