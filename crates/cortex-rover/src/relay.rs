//! # Command Relay
//!
//! Forwards classified mental commands from the `com` stream to the rover.
//! Every sample whose label matches the trigger action drives the
//! [`Actuator`] once; there is no debouncing. Actuator failures are logged
//! and counted but never end the run.

use std::future::Future;
use std::time::Duration;

use crate::client::{CortexClient, Deadline};
use crate::config::{RelayConfig, RoverConfig, has_direction_placeholder};
use crate::error::{CortexError, CortexResult};
use crate::protocol::constants::Streams;
use crate::protocol::rpc::Inbound;
use crate::protocol::streams::MentalCommand;
use crate::training::{TrainingObserver, TrainingUpdate};
use crate::transport::Channel;

/// Side effect triggered by a recognised command.
pub trait Actuator: Send + Sync {
    /// Move the vehicle in `direction`.
    fn drive(&self, direction: &str) -> impl Future<Output = CortexResult<()>> + Send;
}

/// Actuator that issues one HTTP `GET` per command.
///
/// The endpoint is a URL template containing `{direction}` or `{}`, e.g.
/// `http://rover.local:8080/move/{direction}`. The response is not inspected.
#[derive(Debug, Clone)]
pub struct HttpActuator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpActuator {
    /// Build an actuator for `endpoint` with a per-request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> CortexResult<Self> {
        let endpoint = endpoint.into();
        check_endpoint(&endpoint)?;
        Self::build(endpoint, timeout)
    }

    /// Build the actuator for a run.
    ///
    /// The endpoint is only required when [`RoverConfig::needs_relay`]; a
    /// neutral-only plan never drives the rover, so its endpoint is checked
    /// lazily on the first [`drive`](Actuator::drive) instead.
    pub fn from_config(config: &RoverConfig) -> CortexResult<Self> {
        let relay = &config.relay;
        if config.needs_relay() {
            check_endpoint(&relay.endpoint)?;
        }
        Self::build(
            relay.endpoint.clone(),
            Duration::from_secs(relay.http_timeout_secs),
        )
    }

    fn build(endpoint: String, timeout: Duration) -> CortexResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CortexError::ConfigError {
                reason: format!("HTTP client init failed: {e}"),
            })?;

        Ok(Self { client, endpoint })
    }

    /// The URL requested for `direction`.
    pub fn url_for(&self, direction: &str) -> String {
        if self.endpoint.contains("{direction}") {
            self.endpoint.replace("{direction}", direction)
        } else {
            self.endpoint.replacen("{}", direction, 1)
        }
    }
}

fn check_endpoint(endpoint: &str) -> CortexResult<()> {
    if has_direction_placeholder(endpoint) {
        return Ok(());
    }
    Err(CortexError::ConfigError {
        reason: format!("actuator endpoint {endpoint:?} has no {{direction}} placeholder"),
    })
}

impl Actuator for HttpActuator {
    async fn drive(&self, direction: &str) -> CortexResult<()> {
        check_endpoint(&self.endpoint)?;
        let url = self.url_for(direction);
        tracing::debug!(url, "Driving rover");
        self.client.get(&url).send().await?;
        Ok(())
    }
}

/// Counters from one relay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    /// `com` samples consumed.
    pub samples: u32,
    /// Samples whose label matched the trigger. Equals the number of
    /// actuator calls.
    pub triggers: u32,
    /// Actuator calls that failed.
    pub failures: u32,
}

/// Maps one trigger action to one actuator direction.
#[derive(Debug, Clone)]
pub struct CommandRelay<A> {
    actuator: A,
    trigger: String,
    direction: String,
    pacing: Duration,
}

impl<A: Actuator> CommandRelay<A> {
    pub fn new(
        actuator: A,
        trigger: impl Into<String>,
        direction: impl Into<String>,
        pacing: Duration,
    ) -> Self {
        Self {
            actuator,
            trigger: trigger.into(),
            direction: direction.into(),
            pacing,
        }
    }

    pub fn from_config(actuator: A, config: &RelayConfig) -> Self {
        Self::new(
            actuator,
            config.trigger_action.clone(),
            config.direction.clone(),
            Duration::from_millis(config.pacing_ms),
        )
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Consume `sample_count` `com` samples, driving the actuator for each
    /// trigger label. Other messages are skipped without counting.
    ///
    /// Each sample must arrive within the event timeout, however much other
    /// traffic arrives meanwhile.
    pub async fn relay<C: Channel, O: TrainingObserver>(
        &self,
        client: &mut CortexClient<C>,
        sample_count: u32,
        observer: &mut O,
    ) -> CortexResult<RelayReport> {
        let limit = client.timeouts().event;
        let mut report = RelayReport::default();

        tracing::info!(
            samples = sample_count,
            trigger = %self.trigger,
            direction = %self.direction,
            "Relaying mental commands to the rover"
        );

        let mut deadline = Deadline::after(limit);
        while report.samples < sample_count {
            let event = match client.next_inbound(deadline).await? {
                Inbound::Event(event) if event.stream == Streams::COM => event,
                Inbound::Event(event) => {
                    tracing::trace!(stream = %event.stream, "Skipping non-command event");
                    continue;
                }
                Inbound::Response(response) if response.is_error() => {
                    tracing::warn!(id = ?response.id, "Error payload while relaying");
                    response.into_result()?;
                    continue;
                }
                Inbound::Response(response) => {
                    tracing::debug!(id = ?response.id, "Discarding response while relaying");
                    continue;
                }
            };

            let Some(command) = MentalCommand::from_com_array(&event.data) else {
                tracing::warn!(data = ?event.data, "Malformed com event");
                continue;
            };

            report.samples += 1;
            let triggered = command.action == self.trigger;
            tracing::info!(
                sample = report.samples,
                total = sample_count,
                action = %command.action,
                power = command.power,
                "Mental command"
            );

            if triggered {
                report.triggers += 1;
                if let Err(e) = self.actuator.drive(&self.direction).await {
                    report.failures += 1;
                    tracing::warn!(direction = %self.direction, error = %e, "Actuator call failed");
                }
            }

            observer.notify(TrainingUpdate::Sample {
                index: report.samples,
                total: sample_count,
                label: command.action,
                triggered,
            });

            if report.samples < sample_count {
                client.pause(self.pacing).await?;
                deadline = Deadline::after(limit);
            }
        }

        Ok(report)
    }
}
