//! Login and authorization handshake.

use serde_json::json;

use crate::client::CortexClient;
use crate::config::RoverConfig;
use crate::error::{CortexError, CortexResult};
use crate::protocol::auth::UserLogin;
use crate::protocol::constants::Methods;
use crate::transport::Channel;

/// Opaque token returned by `authorize`.
///
/// Only [`CortexClient::authenticate`] can produce one, so every privileged
/// call taking `&AuthToken` is known to run after a successful handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub(crate) fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Application and user credentials for the handshake.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl From<&RoverConfig> for Credentials {
    fn from(config: &RoverConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }
}

impl<C: Channel> CortexClient<C> {
    /// Users currently logged in to the service.
    pub async fn get_user_login(&mut self) -> CortexResult<Vec<UserLogin>> {
        let result = self.call(Methods::GET_USER_LOGIN, json!({})).await?;

        serde_json::from_value(result).map_err(|e| CortexError::ProtocolError {
            reason: format!("Failed to parse user login info: {e}"),
        })
    }

    /// Authenticate with the Cortex API.
    ///
    /// Performs: `getUserLogin` → `login` (only when nobody is logged in) →
    /// `authorize`. Any error payload aborts the handshake.
    pub async fn authenticate(&mut self, credentials: &Credentials) -> CortexResult<AuthToken> {
        let logins = self.get_user_login().await?;

        if logins.is_empty() {
            let (Some(username), Some(password)) = (&credentials.username, &credentials.password)
            else {
                return Err(CortexError::AuthenticationFailed {
                    reason: "no user is logged in and no username/password are configured".into(),
                });
            };

            tracing::info!(username, "No active login, logging in");
            self.call(
                Methods::LOGIN,
                json!({
                    "username": username,
                    "password": password,
                    "client_id": credentials.client_id,
                    "client_secret": credentials.client_secret,
                }),
            )
            .await?;
        } else {
            let users: Vec<&str> = logins.iter().map(UserLogin::username).collect();
            tracing::debug!(?users, "Reusing existing login");
        }

        let result = self
            .call(
                Methods::AUTHORIZE,
                json!({
                    "client_id": credentials.client_id,
                    "client_secret": credentials.client_secret,
                }),
            )
            .await?;

        let token = result
            .get("_auth")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CortexError::ProtocolError {
                reason: "authorize response missing _auth".into(),
            })?;

        tracing::info!("Cortex authentication successful");

        Ok(AuthToken::new(token))
    }
}
