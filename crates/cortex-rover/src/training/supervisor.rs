//! Drives the attempt state machine against a live session.
//!
//! For each action the supervisor runs `attempts` attempts in order. Each
//! attempt waits out the settle delay, sends `start`, follows the device's
//! `sys` events through [`machine::step`], and sends exactly one of
//! `accept`/`reject`. The attempt is over once both `MC_Completed` and the
//! verdict's acknowledgement have arrived, in either order. After the attempts
//! for any action other than the neutral one, the `com` stream is
//! subscribed for a validation pass through the [`CommandRelay`].
//!
//! When an attempt fails part-way, the supervisor makes one best-effort call
//! so the device is not left recording: `reset` while recording, `reject`
//! when a result arrived but no verdict was sent, nothing once finalizing.
//!
//! Each state gets one event-timeout deadline when it is entered. Traffic
//! that does not move the attempt forward never extends it.

use std::time::Duration;

use serde_json::json;

use crate::auth::AuthToken;
use crate::client::{CortexClient, Deadline, Interrupt};
use crate::config::RoverConfig;
use crate::error::{CortexError, CortexResult};
use crate::protocol::constants::{Methods, Streams};
use crate::protocol::rpc::Inbound;
use crate::protocol::streams::SysEvent;
use crate::protocol::training::{DetectionType, TrainingStatus};
use crate::relay::{Actuator, CommandRelay, RelayReport};
use crate::session::Session;
use crate::training::machine::{self, AttemptState, Effect, TrainingEvent, TrainingInput, Verdict};
use crate::training::{TrainingObserver, TrainingUpdate};
use crate::transport::Channel;

/// How to treat events a state tolerates but does not expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrayEventPolicy {
    /// Report them and keep waiting.
    Tolerate,
    /// Fail the attempt once more than this many arrive.
    EscalateAfter(u32),
}

impl StrayEventPolicy {
    fn exceeded(self, count: u32) -> bool {
        matches!(self, StrayEventPolicy::EscalateAfter(limit) if count > limit)
    }
}

impl From<Option<u32>> for StrayEventPolicy {
    fn from(limit: Option<u32>) -> Self {
        limit.map_or(StrayEventPolicy::Tolerate, StrayEventPolicy::EscalateAfter)
    }
}

/// What to train and how.
#[derive(Debug, Clone)]
pub struct TrainingPlan {
    /// Actions in training order.
    pub actions: Vec<String>,
    /// Attempts per action.
    pub attempts: u32,
    /// Pause before each `start`.
    pub settle: Duration,
    /// The action that gets no validation pass.
    pub neutral_action: String,
    pub stray_events: StrayEventPolicy,
    /// `com` samples relayed per validation pass.
    pub sample_count: u32,
}

impl TrainingPlan {
    pub fn from_config(config: &RoverConfig) -> Self {
        Self {
            actions: config.training.actions.clone(),
            attempts: config.training.attempts,
            settle: Duration::from_secs(config.training.settle_secs),
            neutral_action: config.training.neutral_action.clone(),
            stray_events: StrayEventPolicy::from(config.training.stray_event_limit),
            sample_count: config.relay.sample_count,
        }
    }
}

/// Terminal outcome of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The sample was accepted into the profile.
    Accepted,
    /// The sample was rejected.
    Rejected,
    /// The attempt ended in an error; the run stops there.
    Errored,
}

impl From<Verdict> for AttemptOutcome {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Accepted => AttemptOutcome::Accepted,
            Verdict::Rejected => AttemptOutcome::Rejected,
        }
    }
}

/// One finished attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingAttempt {
    pub action: String,
    /// 1-based attempt number within the action.
    pub index: u32,
    pub outcome: AttemptOutcome,
}

/// Everything a completed run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrainingReport {
    pub attempts: Vec<TrainingAttempt>,
    /// One entry per non-neutral action, in training order.
    pub validations: Vec<RelayReport>,
}

impl TrainingReport {
    pub fn accepted(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.outcome == AttemptOutcome::Accepted)
            .count()
    }
}

/// Mutable bookkeeping for the attempt in flight.
struct AttemptCursor<'a> {
    action: &'a str,
    index: u32,
    state: AttemptState,
    /// Id of the `training` request whose acknowledgement is expected.
    pending: Option<u64>,
    strays: u32,
}

/// Runs a [`TrainingPlan`] inside an open session.
pub struct TrainingSupervisor<'a, A> {
    plan: &'a TrainingPlan,
    relay: &'a CommandRelay<A>,
}

impl<'a, A: Actuator> TrainingSupervisor<'a, A> {
    pub fn new(plan: &'a TrainingPlan, relay: &'a CommandRelay<A>) -> Self {
        Self { plan, relay }
    }

    /// Train every action in the plan.
    ///
    /// The `sys` stream must already be subscribed. Stops at the first
    /// error; the attempt that failed is reported to the observer as
    /// [`AttemptOutcome::Errored`].
    pub async fn run<C: Channel, O: TrainingObserver>(
        &self,
        client: &mut CortexClient<C>,
        token: &AuthToken,
        session: &Session,
        observer: &mut O,
    ) -> CortexResult<TrainingReport> {
        let mut report = TrainingReport::default();

        for action in &self.plan.actions {
            tracing::info!(action, attempts = self.plan.attempts, "Training action");
            observer.notify(TrainingUpdate::ActionStarted {
                action: action.clone(),
                attempts: self.plan.attempts,
            });

            for index in 1..=self.plan.attempts {
                let outcome = match self
                    .run_attempt(client, token, session, action, index, observer)
                    .await
                {
                    Ok(verdict) => AttemptOutcome::from(verdict),
                    Err(e) => {
                        observer.notify(TrainingUpdate::AttemptFinished {
                            action: action.clone(),
                            attempt: index,
                            outcome: AttemptOutcome::Errored,
                        });
                        return Err(e);
                    }
                };

                tracing::info!(action, attempt = index, ?outcome, "Training attempt completed");
                observer.notify(TrainingUpdate::AttemptFinished {
                    action: action.clone(),
                    attempt: index,
                    outcome,
                });
                report.attempts.push(TrainingAttempt {
                    action: action.clone(),
                    index,
                    outcome,
                });
            }

            if *action != self.plan.neutral_action {
                let validation = self
                    .validate(client, token, session, action, observer)
                    .await?;
                report.validations.push(validation);
            }
        }

        Ok(report)
    }

    /// Relay `com` samples for `action`. Unsubscribes even when relaying
    /// fails; the relay error wins.
    async fn validate<C: Channel, O: TrainingObserver>(
        &self,
        client: &mut CortexClient<C>,
        token: &AuthToken,
        session: &Session,
        action: &str,
        observer: &mut O,
    ) -> CortexResult<RelayReport> {
        client.subscribe(token, session, Streams::COM).await?;
        observer.notify(TrainingUpdate::ValidationStarted {
            action: action.to_owned(),
            samples: self.plan.sample_count,
        });

        let relayed = self
            .relay
            .relay(client, self.plan.sample_count, observer)
            .await;
        let unsubscribed = client.unsubscribe(token, session, Streams::COM).await;

        let report = relayed?;
        unsubscribed?;

        tracing::info!(
            action,
            samples = report.samples,
            triggers = report.triggers,
            failures = report.failures,
            "Validation pass finished"
        );
        observer.notify(TrainingUpdate::ValidationFinished {
            action: action.to_owned(),
            report,
        });
        Ok(report)
    }

    async fn run_attempt<C: Channel, O: TrainingObserver>(
        &self,
        client: &mut CortexClient<C>,
        token: &AuthToken,
        session: &Session,
        action: &str,
        index: u32,
        observer: &mut O,
    ) -> CortexResult<Verdict> {
        let mut cursor = AttemptCursor {
            action,
            index,
            state: AttemptState::Idle,
            pending: None,
            strays: 0,
        };

        match self
            .drive(client, token, session, &mut cursor, observer)
            .await
        {
            Ok(verdict) => Ok(verdict),
            Err(err) => {
                abort(client, token, session, &cursor, &err).await;
                Err(err)
            }
        }
    }

    async fn drive<C: Channel, O: TrainingObserver>(
        &self,
        client: &mut CortexClient<C>,
        token: &AuthToken,
        session: &Session,
        cursor: &mut AttemptCursor<'_>,
        observer: &mut O,
    ) -> CortexResult<Verdict> {
        client.pause(self.plan.settle).await?;

        let limit = client.timeouts().event;
        let mut deadline = Deadline::after(limit);
        let mut input = TrainingInput::Settled;

        loop {
            let transition = machine::step(cursor.state, &input)?;
            if transition.next != cursor.state {
                deadline = Deadline::after(limit);
            }
            cursor.state = transition.next;
            let mut follow_up = None;

            match transition.effect {
                Effect::Send(status) => {
                    let id = send_training(client, token, session, cursor.action, status).await?;
                    cursor.pending = Some(id);
                    if status == TrainingStatus::Start {
                        tracing::info!(
                            action = cursor.action,
                            attempt = cursor.index,
                            of = self.plan.attempts,
                            "Preparing to start training"
                        );
                        observer.notify(TrainingUpdate::AttemptStarted {
                            action: cursor.action.to_owned(),
                            attempt: cursor.index,
                        });
                    } else {
                        tracing::info!(
                            action = cursor.action,
                            attempt = cursor.index,
                            status = status.as_str(),
                            "Training result received, verdict sent"
                        );
                        observer.notify(TrainingUpdate::VerdictSent {
                            action: cursor.action.to_owned(),
                            attempt: cursor.index,
                            status,
                        });
                        follow_up = Some(TrainingInput::Dispatched);
                    }
                }
                Effect::Progress => {
                    tracing::debug!(
                        action = cursor.action,
                        attempt = cursor.index,
                        "Training in progress"
                    );
                    observer.notify(TrainingUpdate::Recording {
                        action: cursor.action.to_owned(),
                        attempt: cursor.index,
                    });
                }
                Effect::Diagnostic(event) => {
                    cursor.strays += 1;
                    tracing::warn!(
                        action = cursor.action,
                        attempt = cursor.index,
                        state = %cursor.state,
                        event,
                        "Unexpected training event"
                    );
                    observer.notify(TrainingUpdate::StrayEvent {
                        action: cursor.action.to_owned(),
                        attempt: cursor.index,
                        event: event.clone(),
                    });
                    if self.plan.stray_events.exceeded(cursor.strays) {
                        return Err(CortexError::UnexpectedEvent {
                            state: cursor.state.to_string(),
                            event,
                        });
                    }
                }
                Effect::None => {}
            }

            if let AttemptState::Completed(verdict) = cursor.state {
                if cursor.pending.is_some() {
                    await_verdict_ack(client, &mut cursor.pending, deadline).await?;
                }
                return Ok(verdict);
            }

            input = match follow_up {
                Some(input) => input,
                None => next_input(client, &mut cursor.pending, deadline).await?,
            };
        }
    }
}

/// Wait for the next message that means something to the machine.
///
/// Successful responses to anything but the pending request and events
/// from other streams are skipped. An error payload fails the attempt
/// whichever request it answers.
async fn next_input<C: Channel>(
    client: &mut CortexClient<C>,
    pending: &mut Option<u64>,
    deadline: Deadline,
) -> CortexResult<TrainingInput> {
    loop {
        match client.next_inbound(deadline).await? {
            Inbound::Response(response) if response.id.is_some() && response.id == *pending => {
                *pending = None;
                response.into_result()?;
                return Ok(TrainingInput::Ack);
            }
            Inbound::Response(response) if response.is_error() => {
                tracing::warn!(
                    id = ?response.id,
                    pending = ?*pending,
                    "Error payload for an earlier training request"
                );
                response.into_result()?;
            }
            Inbound::Response(response) => {
                tracing::debug!(id = ?response.id, "Discarding response during training");
            }
            Inbound::Event(event) if event.stream == Streams::SYS => {
                match SysEvent::from_sys_array(&event.data) {
                    Some(sys) => {
                        return Ok(TrainingInput::System(TrainingEvent::from_name(&sys.event)));
                    }
                    None => tracing::warn!(data = ?event.data, "Malformed sys event"),
                }
            }
            Inbound::Event(event) => {
                tracing::trace!(stream = %event.stream, "Ignoring event during training");
            }
        }
    }
}

/// `MC_Completed` arrived before the verdict was acknowledged; drain until
/// the acknowledgement so an error payload on it is not lost.
async fn await_verdict_ack<C: Channel>(
    client: &mut CortexClient<C>,
    pending: &mut Option<u64>,
    deadline: Deadline,
) -> CortexResult<()> {
    while pending.is_some() {
        let input = next_input(client, pending, deadline).await?;
        if input != TrainingInput::Ack {
            tracing::debug!(%input, "Ignoring event while awaiting the verdict acknowledgement");
        }
    }
    Ok(())
}

async fn send_training<C: Channel>(
    client: &mut CortexClient<C>,
    token: &AuthToken,
    session: &Session,
    action: &str,
    status: TrainingStatus,
) -> CortexResult<u64> {
    client
        .send_request(Methods::TRAINING, training_params(token, session, action, status))
        .await
}

fn training_params(
    token: &AuthToken,
    session: &Session,
    action: &str,
    status: TrainingStatus,
) -> serde_json::Value {
    json!({
        "_auth": token.as_str(),
        "detection": DetectionType::MentalCommand.as_str(),
        "session": session.id(),
        "action": action,
        "status": status.as_str(),
    })
}

/// Best-effort cleanup for an attempt that ended in `err`.
async fn abort<C: Channel>(
    client: &mut CortexClient<C>,
    token: &AuthToken,
    session: &Session,
    cursor: &AttemptCursor<'_>,
    err: &CortexError,
) {
    let status = match cursor.state {
        AttemptState::Starting | AttemptState::InProgress => TrainingStatus::Reset,
        AttemptState::Succeeded | AttemptState::Failed => TrainingStatus::Reject,
        AttemptState::Idle | AttemptState::Finalizing(_) | AttemptState::Completed(_) => return,
    };

    if err.is_connection_error() {
        tracing::debug!(action = cursor.action, "Connection gone, skipping training cleanup");
        return;
    }

    tracing::warn!(
        action = cursor.action,
        attempt = cursor.index,
        state = %cursor.state,
        status = status.as_str(),
        error = %err,
        "Aborting training attempt"
    );

    let params = training_params(token, session, cursor.action, status);
    if let Err(e) = client
        .call_with(Methods::TRAINING, params, Interrupt::Shielded)
        .await
    {
        tracing::warn!(status = status.as_str(), error = %e, "Training cleanup failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedChannel, Step, scripted_client};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingActuator {
        calls: Mutex<u32>,
    }

    impl Actuator for CountingActuator {
        async fn drive(&self, _direction: &str) -> CortexResult<()> {
            *self.calls.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn plan(actions: &[&str], attempts: u32) -> TrainingPlan {
        TrainingPlan {
            actions: actions.iter().map(|a| (*a).to_owned()).collect(),
            attempts,
            settle: Duration::ZERO,
            neutral_action: "neutral".into(),
            stray_events: StrayEventPolicy::EscalateAfter(10),
            sample_count: 2,
        }
    }

    fn relay() -> CommandRelay<CountingActuator> {
        CommandRelay::new(CountingActuator::default(), "push", "forward", Duration::ZERO)
    }

    /// Opens a session on the scripted client; the script must start with
    /// the `createSession` ack.
    async fn open(client: &mut CortexClient<ScriptedChannel>) -> (AuthToken, Session) {
        let token = AuthToken::new("tok");
        let session = client.open_session(&token, "INSIGHT-1").await.unwrap();
        (token, session)
    }

    fn session_ack() -> Step {
        Step::Ack(json!({"id": "session-1"}))
    }

    fn successful_attempt() -> Vec<Step> {
        vec![
            Step::Ack(json!({"action": "neutral", "status": "start"})),
            Step::Sys("MC_Started"),
            Step::Sys("MC_Started"),
            Step::Sys("MC_Succeeded"),
            Step::Ack(json!({"status": "accept"})),
            Step::Sys("MC_Completed"),
        ]
    }

    #[tokio::test]
    async fn test_scripted_attempt_reaches_completed() {
        let mut script = vec![session_ack()];
        script.extend(successful_attempt());
        script.push(session_ack());
        let mut client = scripted_client(script);
        let (token, session) = open(&mut client).await;

        let plan = plan(&["neutral"], 1);
        let relay = relay();
        let mut updates = Vec::new();
        let report = TrainingSupervisor::new(&plan, &relay)
            .run(&mut client, &token, &session, &mut updates)
            .await
            .unwrap();

        assert_eq!(report.attempts.len(), 1);
        assert_eq!(report.attempts[0].outcome, AttemptOutcome::Accepted);
        assert!(report.validations.is_empty());
        assert_eq!(client.channel().training_statuses(), vec!["start", "accept"]);
        assert!(updates.contains(&TrainingUpdate::AttemptFinished {
            action: "neutral".into(),
            attempt: 1,
            outcome: AttemptOutcome::Accepted,
        }));

        let start = client.channel().params_of("training")[0];
        assert_eq!(start["detection"], "mentalCommand");
        assert_eq!(start["session"], "session-1");
        assert_eq!(start["action"], "neutral");

        session.close(&mut client, &token).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_recording_then_unexpected_event_never_accepts() {
        let mut client = scripted_client(vec![
            session_ack(),
            Step::Ack(json!({})),
            Step::Sys("MC_Started"),
            Step::Sys("MC_Failed"),
            Step::Ack(json!({})),
            Step::Sys("MC_Reset"),
            session_ack(),
        ]);
        let (token, session) = open(&mut client).await;

        let mut plan = plan(&["push"], 1);
        plan.stray_events = StrayEventPolicy::EscalateAfter(0);
        let relay = relay();
        let mut updates = Vec::new();
        let err = TrainingSupervisor::new(&plan, &relay)
            .run(&mut client, &token, &session, &mut updates)
            .await
            .unwrap_err();

        assert!(matches!(err, CortexError::UnexpectedEvent { .. }));
        // Finalizing: nothing further is sent on abort.
        assert_eq!(client.channel().training_statuses(), vec!["start", "reject"]);
        assert!(updates.contains(&TrainingUpdate::AttemptFinished {
            action: "push".into(),
            attempt: 1,
            outcome: AttemptOutcome::Errored,
        }));

        session.close(&mut client, &token).await.unwrap();
    }

    #[tokio::test]
    async fn test_stray_events_tolerated_until_completed() {
        let mut client = scripted_client(vec![
            session_ack(),
            Step::Ack(json!({})),
            Step::Sys("MC_Started"),
            Step::Sys("MC_Failed"),
            Step::Ack(json!({})),
            Step::Sys("MC_Started"),
            Step::Sys("MC_Completed"),
            session_ack(),
        ]);
        let (token, session) = open(&mut client).await;

        let mut plan = plan(&["neutral"], 1);
        plan.stray_events = StrayEventPolicy::Tolerate;
        let relay = relay();
        let mut updates = Vec::new();
        let report = TrainingSupervisor::new(&plan, &relay)
            .run(&mut client, &token, &session, &mut updates)
            .await
            .unwrap();

        assert_eq!(report.attempts[0].outcome, AttemptOutcome::Rejected);
        assert!(updates.iter().any(|u| matches!(
            u,
            TrainingUpdate::StrayEvent { event, .. } if event == "MC_Started"
        )));

        session.close(&mut client, &token).await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_event_while_recording_resets() {
        let mut client = scripted_client(vec![
            session_ack(),
            Step::Ack(json!({})),
            Step::Sys("MC_Started"),
            Step::Sys("MC_Reset"),
            Step::Ack(json!({"status": "reset"})),
            session_ack(),
        ]);
        let (token, session) = open(&mut client).await;

        let plan = plan(&["push"], 1);
        let relay = relay();
        let err = TrainingSupervisor::new(&plan, &relay)
            .run(&mut client, &token, &session, &mut ())
            .await
            .unwrap_err();

        assert!(matches!(err, CortexError::UnexpectedEvent { .. }));
        assert_eq!(client.channel().training_statuses(), vec!["start", "reset"]);

        session.close(&mut client, &token).await.unwrap();
    }

    #[tokio::test]
    async fn test_error_payload_on_ack_aborts() {
        let mut client = scripted_client(vec![
            session_ack(),
            Step::Error(-32102, "Invalid training action"),
            Step::Ack(json!({"status": "reset"})),
            session_ack(),
        ]);
        let (token, session) = open(&mut client).await;

        let plan = plan(&["push"], 3);
        let relay = relay();
        let err = TrainingSupervisor::new(&plan, &relay)
            .run(&mut client, &token, &session, &mut ())
            .await
            .unwrap_err();

        assert!(err.is_api_error());
        assert_eq!(client.channel().training_statuses(), vec!["start", "reset"]);

        session.close(&mut client, &token).await.unwrap();
    }

    #[tokio::test]
    async fn test_error_on_verdict_after_completed_aborts_run() {
        let mut client = scripted_client(vec![
            session_ack(),
            Step::Ack(json!({})),
            Step::Sys("MC_Started"),
            Step::Sys("MC_Succeeded"),
            Step::Sys("MC_Completed"),
            Step::Error(-32100, "Accept failed"),
            session_ack(),
        ]);
        let (token, session) = open(&mut client).await;

        let plan = plan(&["neutral"], 2);
        let relay = relay();
        let mut updates = Vec::new();
        let err = TrainingSupervisor::new(&plan, &relay)
            .run(&mut client, &token, &session, &mut updates)
            .await
            .unwrap_err();

        assert!(matches!(err, CortexError::ApiError { code: -32100, .. }));
        assert_eq!(client.channel().training_statuses(), vec!["start", "accept"]);
        assert!(updates.contains(&TrainingUpdate::AttemptFinished {
            action: "neutral".into(),
            attempt: 1,
            outcome: AttemptOutcome::Errored,
        }));
        assert!(!updates.iter().any(|u| matches!(
            u,
            TrainingUpdate::AttemptFinished {
                outcome: AttemptOutcome::Accepted,
                ..
            }
        )));

        session.close(&mut client, &token).await.unwrap();
    }

    #[tokio::test]
    async fn test_verdict_ack_after_completed_is_awaited() {
        let mut client = scripted_client(vec![
            session_ack(),
            Step::Ack(json!({})),
            Step::Sys("MC_Started"),
            Step::Sys("MC_Succeeded"),
            Step::Sys("MC_Completed"),
            Step::Ack(json!({"status": "accept"})),
            session_ack(),
        ]);
        let (token, session) = open(&mut client).await;

        let plan = plan(&["neutral"], 1);
        let relay = relay();
        let report = TrainingSupervisor::new(&plan, &relay)
            .run(&mut client, &token, &session, &mut ())
            .await
            .unwrap();

        assert_eq!(report.attempts[0].outcome, AttemptOutcome::Accepted);
        session.close(&mut client, &token).await.unwrap();
        assert_eq!(client.channel().methods().last(), Some(&"updateSession"));
    }

    #[tokio::test]
    async fn test_late_error_for_start_is_not_dropped() {
        // ids: createSession 1, start 2, accept 3
        let mut client = scripted_client(vec![
            session_ack(),
            Step::Sys("MC_Started"),
            Step::Sys("MC_Succeeded"),
            Step::Raw(json!({"id": 2, "error": {"code": -32100, "message": "Start failed"}})),
            session_ack(),
        ]);
        let (token, session) = open(&mut client).await;

        let plan = plan(&["neutral"], 1);
        let relay = relay();
        let err = TrainingSupervisor::new(&plan, &relay)
            .run(&mut client, &token, &session, &mut ())
            .await
            .unwrap_err();

        assert!(matches!(err, CortexError::ApiError { code: -32100, .. }));
        assert_eq!(client.channel().training_statuses(), vec!["start", "accept"]);

        session.close(&mut client, &token).await.unwrap();
    }

    #[tokio::test]
    async fn test_repeated_progress_events_do_not_extend_the_wait() {
        let mut client = CortexClient::new(
            ScriptedChannel::new(vec![
                session_ack(),
                Step::Ack(json!({})),
                Step::Flood("MC_Started", Duration::from_millis(10)),
            ]),
            crate::client::CallTimeouts {
                rpc: Duration::from_millis(100),
                event: Duration::from_millis(50),
            },
        );
        let (token, session) = open(&mut client).await;

        let plan = plan(&["push"], 1);
        let relay = relay();
        let mut updates = Vec::new();
        let supervisor = TrainingSupervisor::new(&plan, &relay);
        let training = supervisor.run(
            &mut client,
            &token,
            &session,
            &mut updates,
        );
        let err = tokio::time::timeout(Duration::from_secs(2), training)
            .await
            .expect("training should time out while the device keeps reporting progress")
            .unwrap_err();

        assert!(matches!(err, CortexError::Timeout { .. }));
        assert!(updates.iter().any(|u| matches!(u, TrainingUpdate::Recording { .. })));
        assert_eq!(client.channel().training_statuses(), vec!["start", "reset"]);
        drop(session);
    }

    #[tokio::test]
    async fn test_cancellation_resets_and_reports_cancelled() {
        let mut client = scripted_client(vec![
            session_ack(),
            Step::Ack(json!({})),
            Step::Sys("MC_Started"),
            Step::Hang,
        ]);
        let (token, session) = open(&mut client).await;

        let cancel = client.cancellation_token().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let plan = plan(&["push"], 1);
        let relay = relay();
        let err = TrainingSupervisor::new(&plan, &relay)
            .run(&mut client, &token, &session, &mut ())
            .await
            .unwrap_err();

        assert!(matches!(err, CortexError::Cancelled));
        // The shielded reset was still sent; its ack never comes.
        assert_eq!(client.channel().training_statuses(), vec!["start", "reset"]);
        drop(session);
    }

    #[tokio::test]
    async fn test_validation_pass_after_non_neutral_action() {
        let mut script = vec![session_ack()];
        script.extend(successful_attempt());
        script.extend(successful_attempt());
        script.extend([
            Step::Ack(json!({"success": [{"streamName": "com"}], "failure": []})),
            Step::Com("push"),
            Step::Com("neutral"),
            Step::Ack(json!({"success": [{"streamName": "com"}], "failure": []})),
            session_ack(),
        ]);
        let mut client = scripted_client(script);
        let (token, session) = open(&mut client).await;

        let plan = plan(&["neutral", "push"], 1);
        let relay = relay();
        let report = TrainingSupervisor::new(&plan, &relay)
            .run(&mut client, &token, &session, &mut ())
            .await
            .unwrap();

        assert_eq!(report.accepted(), 2);
        assert_eq!(report.validations.len(), 1);
        assert_eq!(report.validations[0].samples, 2);
        assert_eq!(report.validations[0].triggers, 1);
        assert_eq!(*relay.actuator().calls.lock().unwrap(), 1);
        assert!(client.subscriptions().is_empty());
        assert_eq!(
            client.channel().methods(),
            vec![
                "createSession",
                "training",
                "training",
                "training",
                "training",
                "subscribe",
                "unsubscribe"
            ]
        );

        session.close(&mut client, &token).await.unwrap();
    }

    #[tokio::test]
    async fn test_unsubscribe_runs_when_relay_fails() {
        let mut script = vec![session_ack()];
        script.extend(successful_attempt());
        script.extend([
            Step::Ack(json!({"success": [{"streamName": "com"}], "failure": []})),
            Step::Hang,
        ]);
        let mut client = CortexClient::new(
            ScriptedChannel::new(script),
            crate::client::CallTimeouts {
                rpc: Duration::from_millis(200),
                event: Duration::from_millis(30),
            },
        );
        let (token, session) = open(&mut client).await;

        let plan = plan(&["push"], 1);
        let relay = relay();
        let err = TrainingSupervisor::new(&plan, &relay)
            .run(&mut client, &token, &session, &mut ())
            .await
            .unwrap_err();

        assert!(matches!(err, CortexError::Timeout { .. }));
        assert_eq!(client.channel().params_of("unsubscribe").len(), 1);
        drop(session);
    }

    #[test]
    fn test_stray_policy_from_config_limit() {
        assert_eq!(StrayEventPolicy::from(None), StrayEventPolicy::Tolerate);
        assert_eq!(
            StrayEventPolicy::from(Some(3)),
            StrayEventPolicy::EscalateAfter(3)
        );
        assert!(!StrayEventPolicy::EscalateAfter(3).exceeded(3));
        assert!(StrayEventPolicy::EscalateAfter(3).exceeded(4));
        assert!(!StrayEventPolicy::Tolerate.exceeded(u32::MAX));
    }
}
