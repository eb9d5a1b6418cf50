//! Authentication-related protocol types.

use serde::Deserialize;

/// One entry of the `getUserLogin` result.
///
/// Older services list bare usernames, newer ones send objects.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UserLogin {
    Name(String),
    Info {
        username: String,
        #[serde(default, rename = "lastLoginTime")]
        last_login_time: Option<String>,
    },
}

impl UserLogin {
    /// Logged-in username.
    pub fn username(&self) -> &str {
        match self {
            UserLogin::Name(name) => name,
            UserLogin::Info { username, .. } => username,
        }
    }
}
