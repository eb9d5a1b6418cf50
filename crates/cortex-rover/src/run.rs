//! # Training Run
//!
//! The end-to-end sequence:
//!
//! ```text
//! authenticate → locate headset → [load or create profile]
//!   → check training vocabulary → open session
//!     → subscribe sys → train every action (with validation passes)
//!     → [save profile]
//!   → close session (always)
//! ```
//!
//! Once the session is open it is closed on every path, including errors
//! and cancellation. If the run failed, that error is returned and a close
//! failure is only logged.

use crate::auth::{AuthToken, Credentials};
use crate::client::CortexClient;
use crate::config::RoverConfig;
use crate::error::{CortexError, CortexResult};
use crate::protocol::constants::Streams;
use crate::protocol::profiles::ProfileStatus;
use crate::protocol::training::DetectionType;
use crate::relay::{Actuator, CommandRelay};
use crate::session::Session;
use crate::training::{TrainingObserver, TrainingPlan, TrainingReport, TrainingSupervisor};
use crate::transport::Channel;

/// Run a complete training session.
pub async fn run_training_session<C, A, O>(
    client: &mut CortexClient<C>,
    config: &RoverConfig,
    relay: &CommandRelay<A>,
    observer: &mut O,
) -> CortexResult<TrainingReport>
where
    C: Channel,
    A: Actuator,
    O: TrainingObserver,
{
    config.validate()?;
    let plan = TrainingPlan::from_config(config);

    let token = client.authenticate(&Credentials::from(config)).await?;
    let headset = client.locate_headset().await?;

    let profile = match &config.training.profile {
        Some(name) => Some(client.load_or_create_profile(&token, &headset, name).await?),
        None => None,
    };

    check_vocabulary(client, &plan).await?;

    let session = client.open_session(&token, &headset).await?;
    let outcome = train_in_session(
        client,
        &token,
        &session,
        &plan,
        relay,
        profile.as_deref(),
        observer,
    )
    .await;
    let closed = session.close(client, &token).await;

    match (outcome, closed) {
        (Ok(report), Ok(())) => {
            tracing::info!(
                attempts = report.attempts.len(),
                accepted = report.accepted(),
                "Training run finished"
            );
            Ok(report)
        }
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            tracing::warn!(error = %close_err, "Session close failed after run error");
            Err(e)
        }
    }
}

async fn train_in_session<C, A, O>(
    client: &mut CortexClient<C>,
    token: &AuthToken,
    session: &Session,
    plan: &TrainingPlan,
    relay: &CommandRelay<A>,
    profile: Option<&str>,
    observer: &mut O,
) -> CortexResult<TrainingReport>
where
    C: Channel,
    A: Actuator,
    O: TrainingObserver,
{
    client.subscribe(token, session, Streams::SYS).await?;

    let report = TrainingSupervisor::new(plan, relay)
        .run(client, token, session, observer)
        .await?;

    if let Some(profile) = profile {
        client
            .setup_profile(token, session.headset(), profile, ProfileStatus::Save)
            .await?;
    }

    Ok(report)
}

/// Reject configured actions the device cannot train.
async fn check_vocabulary<C: Channel>(
    client: &mut CortexClient<C>,
    plan: &TrainingPlan,
) -> CortexResult<()> {
    let info = client
        .get_detection_info(DetectionType::MentalCommand)
        .await?;

    let unsupported = info.unsupported(&plan.actions);
    if !unsupported.is_empty() {
        return Err(CortexError::ConfigError {
            reason: format!(
                "unsupported training actions {unsupported:?}; the device supports {:?}",
                info.actions
            ),
        });
    }
    Ok(())
}
