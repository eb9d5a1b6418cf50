//! # cortex-rover
//!
//! Trains Emotiv mental commands over the Cortex JSON-RPC API and relays the
//! classified commands to a remote rover over HTTP.
//!
//! A run authenticates, finds the headset, opens a session, walks every
//! configured action through a supervised multi-attempt training procedure,
//! and after each non-neutral action forwards live `com` samples to the
//! rover. The session is closed on every exit path.
//!
//! ## Quick Start
//!
//! ```ignore
//! use cortex_rover::{CommandRelay, CortexClient, HttpActuator, RoverConfig};
//!
//! #[tokio::main]
//! async fn main() -> cortex_rover::CortexResult<()> {
//!     // Load config from rover.toml or the environment
//!     let config = RoverConfig::discover(None)?;
//!
//!     let mut client = CortexClient::connect(&config).await?;
//!     let actuator = HttpActuator::from_config(&config)?;
//!     let relay = CommandRelay::from_config(actuator, &config.relay);
//!
//!     let report =
//!         cortex_rover::run_training_session(&mut client, &config, &relay, &mut ()).await?;
//!     println!("accepted {} samples", report.accepted());
//!
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Layers
//!
//! | Layer | Items | Role |
//! |-------|-------|------|
//! | Transport | [`Channel`], [`WsChannel`] | Ordered text frames |
//! | Client | [`CortexClient`] | Ids, correlation, timeouts, cancellation |
//! | Managers | `authenticate`, `open_session`, `subscribe`, ... | One Cortex concern each |
//! | Training | [`training`] | Attempt state machine and supervisor |
//! | Relay | [`CommandRelay`], [`Actuator`] | `com` samples to the rover |
//! | Run | [`run_training_session`] | The whole sequence |
//!
//! ## Configuration
//!
//! See [`RoverConfig`]. The minimal setup:
//!
//! ```toml
//! client_id = "your-client-id"
//! client_secret = "your-client-secret"
//!
//! [relay]
//! endpoint = "http://rover.local:8080/move/{direction}"
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod headset;
pub mod profile;
pub mod protocol;
pub mod relay;
pub mod run;
pub mod session;
pub mod subscription;
pub mod training;
pub mod transport;

#[cfg(test)]
mod testing;

// ─── Public re-exports ──────────────────────────────────────────────────

pub use auth::{AuthToken, Credentials};
pub use client::{CallTimeouts, CortexClient, Deadline, Interrupt};
pub use config::RoverConfig;
pub use error::{CortexError, CortexResult};
pub use relay::{Actuator, CommandRelay, HttpActuator, RelayReport};
pub use run::run_training_session;
pub use session::{Session, SessionState};
pub use training::{TrainingObserver, TrainingReport, TrainingUpdate};
pub use transport::{Channel, WsChannel};
