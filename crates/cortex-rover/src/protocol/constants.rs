//! Protocol constants for method names, error codes, stream and event names.

/// Cortex API method names used by a training run.
pub struct Methods;

impl Methods {
    // ─── Authentication ─────────────────────────────────────────────

    /// List the users currently logged in to the service.
    pub const GET_USER_LOGIN: &'static str = "getUserLogin";

    /// Log a user in with EmotivID credentials.
    pub const LOGIN: &'static str = "login";

    /// Authorize the application and obtain an auth token.
    pub const AUTHORIZE: &'static str = "authorize";

    // ─── Headsets ───────────────────────────────────────────────────

    /// Query connected headsets.
    pub const QUERY_HEADSETS: &'static str = "queryHeadsets";

    // ─── Sessions ───────────────────────────────────────────────────

    /// Open a session.
    pub const CREATE_SESSION: &'static str = "createSession";

    /// Change a session's status (used to close it).
    pub const UPDATE_SESSION: &'static str = "updateSession";

    // ─── Streams ────────────────────────────────────────────────────

    /// Subscribe to a push stream.
    pub const SUBSCRIBE: &'static str = "subscribe";

    /// Unsubscribe from a push stream.
    pub const UNSUBSCRIBE: &'static str = "unsubscribe";

    // ─── Training / profiles ────────────────────────────────────────

    /// Get available actions/controls/events for a detection type.
    pub const GET_DETECTION_INFO: &'static str = "getDetectionInfo";

    /// Control the training lifecycle (start, accept, reject, reset).
    pub const TRAINING: &'static str = "training";

    /// Manage profiles (create, load, save).
    pub const SETUP_PROFILE: &'static str = "setupProfile";

    /// Get the profile loaded for a headset.
    pub const GET_CURRENT_PROFILE: &'static str = "getCurrentProfile";
}

// ─── Error Codes ────────────────────────────────────────────────────────

/// Cortex API error codes.
pub struct ErrorCodes;

impl ErrorCodes {
    /// Method not found (unknown or deprecated method name).
    pub const METHOD_NOT_FOUND: i32 = -32601;

    /// No headset connected.
    pub const NO_HEADSET_CONNECTED: i32 = -32001;

    /// Headset unavailable.
    pub const HEADSET_UNAVAILABLE: i32 = -32004;

    /// Session already exists.
    pub const SESSION_ALREADY_EXISTS: i32 = -32005;

    /// Session must be activated first.
    pub const SESSION_MUST_BE_ACTIVATED: i32 = -32012;

    /// Invalid auth token.
    pub const INVALID_AUTH_TOKEN: i32 = -32014;

    /// Auth token expired.
    pub const TOKEN_EXPIRED: i32 = -32015;

    /// Invalid stream for subscribe/unsubscribe.
    pub const INVALID_STREAM: i32 = -32016;

    /// Invalid client credentials.
    pub const INVALID_CLIENT_CREDENTIALS: i32 = -32021;
}

// ─── Stream Names ───────────────────────────────────────────────────────

/// Push stream names.
pub struct Streams;

impl Streams {
    /// Mental commands: `[action, power]`.
    pub const COM: &'static str = "com";
    /// System/training events.
    pub const SYS: &'static str = "sys";
}

// ─── Training Events ────────────────────────────────────────────────────

/// Mental-command training events carried on the `sys` stream.
pub struct SysEvents;

impl SysEvents {
    /// The device started recording a sample.
    pub const MC_STARTED: &'static str = "MC_Started";
    /// The recorded sample is usable.
    pub const MC_SUCCEEDED: &'static str = "MC_Succeeded";
    /// The recorded sample is unusable.
    pub const MC_FAILED: &'static str = "MC_Failed";
    /// The accept/reject decision has been applied.
    pub const MC_COMPLETED: &'static str = "MC_Completed";
}
