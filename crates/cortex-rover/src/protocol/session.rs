//! Session management protocol types.

use serde::Deserialize;

/// Session status values sent with `createSession` / `updateSession`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Open,
    Close,
}

impl SessionStatus {
    /// Returns the Cortex API string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Open => "open",
            SessionStatus::Close => "close",
        }
    }
}

/// The part of the `createSession` result a run relies on.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    /// Session ID assigned by the service.
    pub id: String,

    #[serde(default)]
    pub status: Option<String>,
}
