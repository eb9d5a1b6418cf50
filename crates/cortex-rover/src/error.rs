//! # Error Types
//!
//! Semantic error types for a training run. Every variant carries enough
//! context to diagnose the problem without digging through logs.
//!
//! ## Error Code Mapping
//!
//! The Cortex service answers a failed call with a JSON-RPC `error` payload.
//! [`CortexError::from_api_error`] maps known codes to semantic variants;
//! [`CortexError::is_api_error`] recognises the whole family. Every one of
//! them is fatal for the run.

use std::time::Duration;

use thiserror::Error;

use crate::protocol::constants::ErrorCodes;

/// Convenient Result alias for Cortex operations.
pub type CortexResult<T> = std::result::Result<T, CortexError>;

/// All errors that can occur while driving the headset and the rover.
#[derive(Error, Debug)]
pub enum CortexError {
    // ─── Connection ─────────────────────────────────────────────────
    /// Failed to establish the channel to the Cortex service.
    #[error("Failed to connect to Cortex at {url}: {reason}. Is the EMOTIV Launcher running?")]
    ConnectionFailed { url: String, reason: String },

    /// The channel was closed or broke after being established.
    #[error("Connection to Cortex lost: {reason}")]
    ConnectionLost { reason: String },

    // ─── Authentication ─────────────────────────────────────────────
    /// Login or authorization was refused.
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    /// The auth token is no longer accepted by the service.
    #[error("Auth token expired, re-authentication required")]
    TokenExpired,

    // ─── Headset / profile ──────────────────────────────────────────
    /// Device discovery returned nothing.
    #[error("No headset found. Connect your EEG device before continuing.")]
    NoHeadsetFound,

    /// No training profile is loaded for the headset.
    #[error("No profile has been created for headset {headset}")]
    NoProfile { headset: String },

    // ─── Session / streams ──────────────────────────────────────────
    /// Session-related error payload (create, update, close failed).
    #[error("Session error: {reason}")]
    SessionError { reason: String },

    /// Subscribe/unsubscribe failed for the requested stream.
    #[error("Stream error: {reason}")]
    StreamError { reason: String },

    // ─── API ────────────────────────────────────────────────────────
    /// Error payload that doesn't map to a more specific variant.
    #[error("Cortex API error {code}: {message}")]
    ApiError { code: i32, message: String },

    /// The requested API method was not found (likely a version mismatch).
    #[error("API method not found: {method}")]
    MethodNotFound { method: String },

    // ─── Training ───────────────────────────────────────────────────
    /// A push event arrived that the current training state cannot accept.
    #[error("Unexpected event {event} while training was {state}")]
    UnexpectedEvent { state: String, event: String },

    /// A bounded wait elapsed without the expected message.
    #[error("Operation timed out after {waited:?}")]
    Timeout { waited: Duration },

    /// The run was cancelled (Ctrl-C or a cancelled token).
    #[error("Operation cancelled")]
    Cancelled,

    // ─── Protocol ───────────────────────────────────────────────────
    /// Received an unexpected or malformed message from the Cortex service.
    #[error("Protocol error: {reason}")]
    ProtocolError { reason: String },

    // ─── Actuator ───────────────────────────────────────────────────
    /// The rover endpoint could not be reached.
    #[error("Actuator error: {reason}")]
    Actuator { reason: String },

    // ─── Config ─────────────────────────────────────────────────────
    /// Configuration file error (missing, malformed, or invalid values).
    #[error("Configuration error: {reason}")]
    ConfigError { reason: String },

    // ─── Transport ──────────────────────────────────────────────────
    /// Low-level WebSocket transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// TLS setup error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ─── I/O ────────────────────────────────────────────────────────
    /// Filesystem or I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CortexError {
    /// Map a Cortex error payload to the most specific error variant.
    ///
    /// Known codes:
    /// - `-32601`: Method not found
    /// - `-32001`, `-32004`: No headset connected / headset unavailable
    /// - `-32005`, `-32012`: Session already exists / must be activated
    /// - `-32014`, `-32021`: Invalid token / invalid client credentials
    /// - `-32015`: Token expired
    /// - `-32016`: Invalid stream
    pub fn from_api_error(code: i32, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            ErrorCodes::METHOD_NOT_FOUND => CortexError::MethodNotFound { method: message },
            ErrorCodes::NO_HEADSET_CONNECTED | ErrorCodes::HEADSET_UNAVAILABLE => {
                CortexError::NoHeadsetFound
            }
            ErrorCodes::SESSION_ALREADY_EXISTS | ErrorCodes::SESSION_MUST_BE_ACTIVATED => {
                CortexError::SessionError { reason: message }
            }
            ErrorCodes::INVALID_AUTH_TOKEN | ErrorCodes::INVALID_CLIENT_CREDENTIALS => {
                CortexError::AuthenticationFailed { reason: message }
            }
            ErrorCodes::TOKEN_EXPIRED => CortexError::TokenExpired,
            ErrorCodes::INVALID_STREAM => CortexError::StreamError { reason: message },
            _ => CortexError::ApiError { code, message },
        }
    }

    /// Returns `true` for the variants [`from_api_error`](Self::from_api_error)
    /// can produce.
    ///
    /// `NoHeadsetFound` and `AuthenticationFailed` are also raised locally.
    pub fn is_api_error(&self) -> bool {
        matches!(
            self,
            CortexError::ApiError { .. }
                | CortexError::MethodNotFound { .. }
                | CortexError::SessionError { .. }
                | CortexError::StreamError { .. }
                | CortexError::TokenExpired
                | CortexError::AuthenticationFailed { .. }
                | CortexError::NoHeadsetFound
        )
    }

    /// Returns `true` if this error indicates the channel is dead and no
    /// further calls can succeed.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            CortexError::ConnectionFailed { .. }
                | CortexError::ConnectionLost { .. }
                | CortexError::WebSocket(_)
        )
    }
}

// ─── From impls for external error types ────────────────────────────────

impl From<tokio_tungstenite::tungstenite::Error> for CortexError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        CortexError::WebSocket(err.to_string())
    }
}

impl From<rustls::Error> for CortexError {
    fn from(err: rustls::Error) -> Self {
        CortexError::Tls(err.to_string())
    }
}

impl From<reqwest::Error> for CortexError {
    fn from(err: reqwest::Error) -> Self {
        CortexError::Actuator {
            reason: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for CortexError {
    fn from(err: toml::de::Error) -> Self {
        CortexError::ConfigError {
            reason: err.to_string(),
        }
    }
}
