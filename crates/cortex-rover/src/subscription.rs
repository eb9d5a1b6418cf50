//! Stream subscriptions.
//!
//! The client tracks which streams are subscribed so the session can tear
//! them down before it closes.

use serde_json::{Value, json};

use crate::auth::AuthToken;
use crate::client::{CortexClient, Interrupt};
use crate::error::{CortexError, CortexResult};
use crate::protocol::constants::Methods;
use crate::session::Session;
use crate::transport::Channel;

impl<C: Channel> CortexClient<C> {
    /// Subscribe to one push stream.
    pub async fn subscribe(
        &mut self,
        token: &AuthToken,
        session: &Session,
        stream: &str,
    ) -> CortexResult<()> {
        let result = self
            .call(Methods::SUBSCRIBE, stream_params(token, session, stream))
            .await?;
        check_failures(&result, stream)?;

        self.subscriptions_mut().insert(stream.to_owned());
        tracing::info!(session = session.id(), stream, "Subscribed to stream");
        Ok(())
    }

    /// Unsubscribe from one push stream.
    ///
    /// Shielded from cancellation: unsubscribing is part of teardown.
    pub async fn unsubscribe(
        &mut self,
        token: &AuthToken,
        session: &Session,
        stream: &str,
    ) -> CortexResult<()> {
        let result = self
            .call_with(
                Methods::UNSUBSCRIBE,
                stream_params(token, session, stream),
                Interrupt::Shielded,
            )
            .await?;
        check_failures(&result, stream)?;

        self.subscriptions_mut().remove(stream);
        tracing::info!(session = session.id(), stream, "Unsubscribed from stream");
        Ok(())
    }
}

fn stream_params(token: &AuthToken, session: &Session, stream: &str) -> Value {
    json!({
        "_auth": token.as_str(),
        "session": session.id(),
        "streams": [stream],
    })
}

/// The service reports per-stream problems in a `failure` array rather than
/// an error payload.
fn check_failures(result: &Value, stream: &str) -> CortexResult<()> {
    let Some(failure) = result
        .get("failure")
        .and_then(Value::as_array)
        .and_then(|failures| failures.first())
    else {
        return Ok(());
    };

    let message = failure
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("rejected by service");
    Err(CortexError::StreamError {
        reason: format!("{stream}: {message}"),
    })
}
