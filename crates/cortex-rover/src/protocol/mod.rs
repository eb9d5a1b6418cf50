//! Cortex API protocol domain modules.
//!
//! This namespace groups wire-compatible JSON-RPC protocol structures by domain:
//! - [`rpc`]: request envelope and the decoded [`rpc::Inbound`] message.
//! - [`constants`]: method names, error codes, stream and event names.
//! - [`auth`]: user-login and authorization payloads.
//! - [`headset`]: headset discovery payloads.
//! - [`session`]: session lifecycle payloads.
//! - [`streams`]: push-event payloads (`sys`, `com`).
//! - [`profiles`]: profile query and setup payloads.
//! - [`training`]: detection and training payloads.

pub mod auth;
pub mod constants;
pub mod headset;
pub mod profiles;
pub mod rpc;
pub mod session;
pub mod streams;
pub mod training;
