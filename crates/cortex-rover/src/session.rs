//! Session lifecycle.
//!
//! A [`Session`] is opened with [`CortexClient::open_session`] and closed
//! with [`Session::close`], which consumes it. Closing first tears down any
//! stream subscriptions still active, then sends `updateSession close`. Both
//! steps ignore cancellation so they still run after Ctrl-C.

use serde_json::json;

use crate::auth::AuthToken;
use crate::client::{CortexClient, Interrupt};
use crate::error::{CortexError, CortexResult};
use crate::protocol::constants::Methods;
use crate::protocol::session::{SessionInfo, SessionStatus};
use crate::transport::Channel;

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

/// An open device session.
#[derive(Debug)]
pub struct Session {
    id: String,
    headset: String,
    state: SessionState,
}

impl Session {
    /// Session id assigned by the service.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Headset the session was opened for.
    pub fn headset(&self) -> &str {
        &self.headset
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Tear down remaining subscriptions, then close the session.
    ///
    /// Runs every step even if an earlier one fails and returns the first
    /// error. The subscription set is empty afterwards either way.
    pub async fn close<C: Channel>(
        mut self,
        client: &mut CortexClient<C>,
        token: &AuthToken,
    ) -> CortexResult<()> {
        let mut first_error: Option<CortexError> = None;

        let streams: Vec<String> = client.subscriptions().iter().cloned().collect();
        for stream in streams {
            if let Err(e) = client.unsubscribe(token, &self, &stream).await {
                tracing::warn!(
                    session = %self.id,
                    stream,
                    error = %e,
                    "Unsubscribe during close failed"
                );
                first_error.get_or_insert(e);
            }
        }
        client.subscriptions_mut().clear();

        let result = client
            .call_with(
                Methods::UPDATE_SESSION,
                json!({
                    "_auth": token.as_str(),
                    "session": self.id,
                    "status": SessionStatus::Close.as_str(),
                }),
                Interrupt::Shielded,
            )
            .await;
        self.state = SessionState::Closed;

        match result {
            Ok(_) => tracing::info!(session = %self.id, "Session closed"),
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "Closing session failed");
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state == SessionState::Open {
            tracing::warn!(session = %self.id, "Session dropped without being closed");
        }
    }
}

impl<C: Channel> CortexClient<C> {
    /// Open a session for `headset`.
    pub async fn open_session(
        &mut self,
        token: &AuthToken,
        headset: &str,
    ) -> CortexResult<Session> {
        let result = self
            .call(
                Methods::CREATE_SESSION,
                json!({
                    "_auth": token.as_str(),
                    "status": SessionStatus::Open.as_str(),
                }),
            )
            .await?;

        let info: SessionInfo =
            serde_json::from_value(result).map_err(|e| CortexError::ProtocolError {
                reason: format!("Failed to parse session info: {e}"),
            })?;

        tracing::info!(session = %info.id, headset, "Session created");

        Ok(Session {
            id: info.id,
            headset: headset.to_owned(),
            state: SessionState::Open,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Step, scripted_client};

    #[tokio::test]
    async fn test_open_session_sends_auth_and_status() {
        let mut client = scripted_client(vec![
            Step::Ack(json!({"id": "session-1", "status": "opened"})),
            Step::Ack(json!({"id": "session-1", "status": "closed"})),
        ]);
        let token = AuthToken::new("tok");

        let session = client.open_session(&token, "INSIGHT-1").await.unwrap();
        assert_eq!(session.id(), "session-1");
        assert_eq!(session.headset(), "INSIGHT-1");
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(
            client.channel().params_of("createSession")[0],
            &json!({"_auth": "tok", "status": "open"})
        );

        session.close(&mut client, &token).await.unwrap();
        assert_eq!(
            client.channel().params_of("updateSession")[0],
            &json!({"_auth": "tok", "session": "session-1", "status": "close"})
        );
    }

    #[tokio::test]
    async fn test_open_session_missing_id() {
        let mut client = scripted_client(vec![Step::Ack(json!({"status": "opened"}))]);
        let err = client
            .open_session(&AuthToken::new("tok"), "INSIGHT-1")
            .await
            .unwrap_err();
        assert!(matches!(err, CortexError::ProtocolError { .. }));
    }

    #[tokio::test]
    async fn test_close_tears_down_subscriptions_first() {
        let mut client = scripted_client(vec![
            Step::Ack(json!({"id": "session-1"})),
            Step::Ack(json!({"success": [{"streamName": "sys"}], "failure": []})),
            Step::Ack(json!({"success": [{"streamName": "com"}], "failure": []})),
            Step::Ack(json!({"success": [{"streamName": "com"}], "failure": []})),
            Step::Ack(json!({"success": [{"streamName": "sys"}], "failure": []})),
            Step::Ack(json!({"id": "session-1"})),
        ]);
        let token = AuthToken::new("tok");

        let session = client.open_session(&token, "INSIGHT-1").await.unwrap();
        client.subscribe(&token, &session, "sys").await.unwrap();
        client.subscribe(&token, &session, "com").await.unwrap();

        session.close(&mut client, &token).await.unwrap();

        assert!(client.subscriptions().is_empty());
        assert_eq!(
            client.channel().methods(),
            vec![
                "createSession",
                "subscribe",
                "subscribe",
                "unsubscribe",
                "unsubscribe",
                "updateSession"
            ]
        );
    }

    #[tokio::test]
    async fn test_close_runs_after_cancellation() {
        let mut client = scripted_client(vec![
            Step::Ack(json!({"id": "session-1"})),
            Step::Ack(json!({"id": "session-1"})),
        ]);
        let token = AuthToken::new("tok");
        let session = client.open_session(&token, "INSIGHT-1").await.unwrap();

        client.cancellation_token().cancel();
        session.close(&mut client, &token).await.unwrap();

        assert_eq!(client.channel().params_of("updateSession").len(), 1);
    }

    #[tokio::test]
    async fn test_close_reports_update_failure() {
        let mut client = scripted_client(vec![
            Step::Ack(json!({"id": "session-1"})),
            Step::Error(-32005, "Session not found"),
        ]);
        let token = AuthToken::new("tok");
        let session = client.open_session(&token, "INSIGHT-1").await.unwrap();

        let err = session.close(&mut client, &token).await.unwrap_err();
        assert!(matches!(err, CortexError::SessionError { .. }));
    }
}
