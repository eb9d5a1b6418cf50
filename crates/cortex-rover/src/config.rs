//! # Configuration
//!
//! [`RoverConfig`] holds everything a training run needs: Cortex
//! credentials, the service URL, timeouts, the training plan and the rover
//! endpoint.
//!
//! ## Loading Priority
//!
//! 1. Explicit path passed to [`RoverConfig::discover`]
//! 2. `ROVER_CONFIG` environment variable
//! 3. `./rover.toml` in the current directory
//! 4. `~/.config/cortex-rover/rover.toml`
//! 5. Environment variables only
//!
//! Credentials, the Cortex URL and the rover endpoint can always be
//! overridden by environment variables, even when loading from a file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CortexError, CortexResult};

/// Default Cortex WebSocket URL (localhost, self-signed TLS).
pub const DEFAULT_CORTEX_URL: &str = "wss://localhost:6868";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;
const DEFAULT_EVENT_TIMEOUT_SECS: u64 = 30;

const DEFAULT_ATTEMPTS: u32 = 3;
const DEFAULT_SETTLE_SECS: u64 = 3;
const DEFAULT_STRAY_EVENT_LIMIT: u32 = 10;

const DEFAULT_SAMPLE_COUNT: u32 = 50;
const DEFAULT_PACING_MS: u64 = 1000;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;

/// Complete configuration for a training run.
///
/// # Examples
///
/// ```
/// use cortex_rover::config::RoverConfig;
///
/// let config = RoverConfig::new("my-client-id", "my-client-secret");
/// assert_eq!(config.training.attempts, 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoverConfig {
    /// Cortex API client ID.
    pub client_id: String,

    /// Cortex API client secret.
    pub client_secret: String,

    /// EmotivID username, used only when nobody is logged in yet.
    #[serde(default)]
    pub username: Option<String>,

    /// EmotivID password, used only when nobody is logged in yet.
    #[serde(default)]
    pub password: Option<String>,

    /// WebSocket URL for the Cortex service.
    #[serde(default = "default_cortex_url")]
    pub cortex_url: String,

    /// Allow insecure TLS connections to non-localhost hosts.
    #[serde(default)]
    pub allow_insecure_tls: bool,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub training: TrainingConfig,

    #[serde(default)]
    pub relay: RelayConfig,
}

/// Bounds on every wait in the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Timeout for opening the WebSocket, in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Timeout for a JSON-RPC call to be answered, in seconds.
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_secs: u64,

    /// Timeout for the next push event while training or relaying, in seconds.
    #[serde(default = "default_event_timeout")]
    pub event_timeout_secs: u64,
}

/// The mental-command training plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Ordered training vocabulary.
    #[serde(default = "default_actions")]
    pub actions: Vec<String>,

    /// Attempts per action.
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Pause before each attempt so the operator can prepare, in seconds.
    #[serde(default = "default_settle")]
    pub settle_secs: u64,

    /// Action that is trained but never validated against the rover.
    #[serde(default = "default_neutral_action")]
    pub neutral_action: String,

    /// Profile to load (or create) before training and save afterwards.
    #[serde(default)]
    pub profile: Option<String>,

    /// Stray system events tolerated per attempt before giving up.
    /// `None` tolerates any number.
    #[serde(default = "default_stray_event_limit")]
    pub stray_event_limit: Option<u32>,
}

/// Rover relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Actuator URL template; `{direction}` or `{}` is replaced per call.
    #[serde(default)]
    pub endpoint: String,

    /// Classified label that moves the rover.
    #[serde(default = "default_trigger_action")]
    pub trigger_action: String,

    /// Direction token sent for every trigger.
    #[serde(default = "default_direction")]
    pub direction: String,

    /// Samples observed per validation pass.
    #[serde(default = "default_sample_count")]
    pub sample_count: u32,

    /// Delay between samples, in milliseconds.
    #[serde(default = "default_pacing")]
    pub pacing_ms: u64,

    /// Timeout for one actuator request, in seconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

// ─── Defaults ───────────────────────────────────────────────────────────

fn default_cortex_url() -> String {
    DEFAULT_CORTEX_URL.to_string()
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_rpc_timeout() -> u64 {
    DEFAULT_RPC_TIMEOUT_SECS
}

fn default_event_timeout() -> u64 {
    DEFAULT_EVENT_TIMEOUT_SECS
}

fn default_actions() -> Vec<String> {
    vec!["neutral".to_string(), "push".to_string()]
}

fn default_attempts() -> u32 {
    DEFAULT_ATTEMPTS
}

fn default_settle() -> u64 {
    DEFAULT_SETTLE_SECS
}

fn default_neutral_action() -> String {
    "neutral".to_string()
}

#[allow(clippy::unnecessary_wraps)]
fn default_stray_event_limit() -> Option<u32> {
    Some(DEFAULT_STRAY_EVENT_LIMIT)
}

fn default_trigger_action() -> String {
    "push".to_string()
}

fn default_direction() -> String {
    "forward".to_string()
}

fn default_sample_count() -> u32 {
    DEFAULT_SAMPLE_COUNT
}

fn default_pacing() -> u64 {
    DEFAULT_PACING_MS
}

fn default_http_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

// ─── Default impls ──────────────────────────────────────────────────────

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            rpc_timeout_secs: DEFAULT_RPC_TIMEOUT_SECS,
            event_timeout_secs: DEFAULT_EVENT_TIMEOUT_SECS,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            actions: default_actions(),
            attempts: DEFAULT_ATTEMPTS,
            settle_secs: DEFAULT_SETTLE_SECS,
            neutral_action: default_neutral_action(),
            profile: None,
            stray_event_limit: default_stray_event_limit(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            trigger_action: default_trigger_action(),
            direction: default_direction(),
            sample_count: DEFAULT_SAMPLE_COUNT,
            pacing_ms: DEFAULT_PACING_MS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

// ─── RoverConfig impl ───────────────────────────────────────────────────

impl RoverConfig {
    /// Create a config with just client credentials (all other fields use defaults).
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            username: None,
            password: None,
            cortex_url: default_cortex_url(),
            allow_insecure_tls: false,
            timeouts: TimeoutConfig::default(),
            training: TrainingConfig::default(),
            relay: RelayConfig::default(),
        }
    }

    /// Load config from environment variables.
    ///
    /// Required: `EMOTIV_CLIENT_ID`, `EMOTIV_CLIENT_SECRET`
    ///
    /// Optional: `EMOTIV_USERNAME`, `EMOTIV_PASSWORD`, `EMOTIV_CORTEX_URL`,
    /// `ROVER_ENDPOINT`
    pub fn from_env() -> CortexResult<Self> {
        let client_id =
            std::env::var("EMOTIV_CLIENT_ID").map_err(|_| CortexError::ConfigError {
                reason: "EMOTIV_CLIENT_ID environment variable not set".into(),
            })?;
        let client_secret =
            std::env::var("EMOTIV_CLIENT_SECRET").map_err(|_| CortexError::ConfigError {
                reason: "EMOTIV_CLIENT_SECRET environment variable not set".into(),
            })?;

        let mut config = Self::new(client_id, client_secret);
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load config from a TOML file, with environment variable overrides.
    pub fn from_file(path: impl AsRef<Path>) -> CortexResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| CortexError::ConfigError {
            reason: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;
        let mut config: Self = toml::from_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Discover and load config from the standard search path.
    ///
    /// Falls back to environment-variable-only config if no file is found.
    pub fn discover(explicit_path: Option<&Path>) -> CortexResult<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var("ROVER_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        let local_path = PathBuf::from("rover.toml");
        if local_path.exists() {
            return Self::from_file(&local_path);
        }

        if let Some(user_path) = user_config_path() {
            if user_path.exists() {
                return Self::from_file(&user_path);
            }
        }

        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("EMOTIV_CLIENT_ID") {
            self.client_id = id;
        }
        if let Ok(secret) = std::env::var("EMOTIV_CLIENT_SECRET") {
            self.client_secret = secret;
        }
        if let Ok(username) = std::env::var("EMOTIV_USERNAME") {
            self.username = Some(username);
        }
        if let Ok(password) = std::env::var("EMOTIV_PASSWORD") {
            self.password = Some(password);
        }
        if let Ok(url) = std::env::var("EMOTIV_CORTEX_URL") {
            self.cortex_url = url;
        }
        if let Ok(endpoint) = std::env::var("ROVER_ENDPOINT") {
            self.relay.endpoint = endpoint;
        }
    }

    /// Check that the training plan and relay settings can actually run.
    pub fn validate(&self) -> CortexResult<()> {
        if self.training.actions.is_empty() {
            return Err(CortexError::ConfigError {
                reason: "training.actions must name at least one action".into(),
            });
        }
        if self.training.attempts == 0 {
            return Err(CortexError::ConfigError {
                reason: "training.attempts must be at least 1".into(),
            });
        }
        if self.needs_relay() && !has_direction_placeholder(&self.relay.endpoint) {
            return Err(CortexError::ConfigError {
                reason: "relay.endpoint must contain a {direction} or {} placeholder".into(),
            });
        }
        Ok(())
    }

    /// Whether any configured action gets a validation pass, and so drives
    /// the rover.
    pub fn needs_relay(&self) -> bool {
        self.training
            .actions
            .iter()
            .any(|action| *action != self.training.neutral_action)
    }

    /// Returns `true` if insecure TLS should be allowed for the configured URL.
    ///
    /// The Cortex service on `localhost` uses a self-signed certificate, so
    /// it is always allowed there.
    pub fn should_accept_invalid_certs(&self) -> bool {
        if is_localhost(&self.cortex_url) {
            return true;
        }
        self.allow_insecure_tls
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

pub(crate) fn has_direction_placeholder(endpoint: &str) -> bool {
    endpoint.contains("{direction}") || endpoint.contains("{}")
}

/// Check if a WebSocket URL points to localhost.
fn is_localhost(url: &str) -> bool {
    let authority = url
        .strip_prefix("wss://")
        .or_else(|| url.strip_prefix("ws://"))
        .unwrap_or(url);
    let authority = authority.split('/').next().unwrap_or(authority);

    // [::1]:6868
    if let Some(rest) = authority.strip_prefix('[') {
        let host = rest.split(']').next().unwrap_or("");
        return host == "::1";
    }

    let host = if let Some(idx) = authority.rfind(':') {
        &authority[..idx]
    } else {
        authority
    };
    matches!(host, "localhost" | "127.0.0.1")
}

fn user_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA")
            .ok()
            .map(|dir| PathBuf::from(dir).join("cortex-rover").join("rover.toml"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME").ok().map(|dir| {
            PathBuf::from(dir)
                .join(".config")
                .join("cortex-rover")
                .join("rover.toml")
        })
    }
}
