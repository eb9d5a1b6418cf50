//! Scripted in-memory channel for unit tests.

use std::collections::VecDeque;
use std::time::Duration;

use serde_json::{Value, json};

use crate::client::{CallTimeouts, CortexClient};
use crate::error::{CortexError, CortexResult};
use crate::transport::Channel;

/// One scripted inbound frame.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// Successful response to the most recent request.
    Ack(Value),
    /// Error payload for the most recent request.
    Error(i32, &'static str),
    /// `sys` push event with the given event name.
    Sys(&'static str),
    /// `com` push event with the given label.
    Com(&'static str),
    /// Any JSON frame, sent as-is.
    Raw(Value),
    /// Never produce a frame.
    Hang,
    /// Repeat this `sys` event at the given interval, forever.
    Flood(&'static str, Duration),
}

/// Channel that answers from a script and records what was sent.
///
/// Once the script runs out, `recv` reports a lost connection.
#[derive(Debug, Default)]
pub(crate) struct ScriptedChannel {
    script: VecDeque<Step>,
    sent: Vec<Value>,
    closed: bool,
}

impl ScriptedChannel {
    pub(crate) fn new(script: Vec<Step>) -> Self {
        Self {
            script: script.into(),
            ..Self::default()
        }
    }

    /// Every request sent so far, parsed.
    pub(crate) fn sent(&self) -> &[Value] {
        &self.sent
    }

    /// Method names of every request sent so far.
    pub(crate) fn methods(&self) -> Vec<&str> {
        self.sent
            .iter()
            .filter_map(|req| req["method"].as_str())
            .collect()
    }

    /// Params of every request with the given method.
    pub(crate) fn params_of(&self, method: &str) -> Vec<&Value> {
        self.sent
            .iter()
            .filter(|req| req["method"] == method)
            .map(|req| &req["params"])
            .collect()
    }

    /// `status` values of every `training` request.
    pub(crate) fn training_statuses(&self) -> Vec<&str> {
        self.params_of("training")
            .into_iter()
            .filter_map(|params| params["status"].as_str())
            .collect()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    fn last_id(&self) -> Value {
        self.sent.last().map_or(Value::Null, |req| req["id"].clone())
    }
}

impl Channel for ScriptedChannel {
    async fn send(&mut self, text: String) -> CortexResult<()> {
        let request: Value = serde_json::from_str(&text)?;
        self.sent.push(request);
        Ok(())
    }

    async fn recv(&mut self) -> CortexResult<String> {
        if let Some(&Step::Flood(name, every)) = self.script.front() {
            tokio::time::sleep(every).await;
            return Ok(sys_frame(name).to_string());
        }

        let Some(step) = self.script.pop_front() else {
            return Err(CortexError::ConnectionLost {
                reason: "script exhausted".into(),
            });
        };

        let frame = match step {
            Step::Ack(result) => json!({"jsonrpc": "2.0", "id": self.last_id(), "result": result}),
            Step::Error(code, message) => json!({
                "jsonrpc": "2.0",
                "id": self.last_id(),
                "error": {"code": code, "message": message}
            }),
            Step::Sys(name) => sys_frame(name),
            Step::Com(label) => json!({
                "sid": "session-1",
                "time": 1_609_459_201.0,
                "com": [label, 0.5]
            }),
            Step::Raw(frame) => frame,
            Step::Hang => std::future::pending().await,
            Step::Flood(..) => unreachable!("flood steps are never popped"),
        };
        Ok(frame.to_string())
    }

    async fn close(&mut self) -> CortexResult<()> {
        self.closed = true;
        Ok(())
    }
}

fn sys_frame(name: &str) -> Value {
    json!({
        "sid": "session-1",
        "time": 1_609_459_200.5,
        "sys": ["mentalCommand", name]
    })
}

/// Client over a [`ScriptedChannel`] with short timeouts.
pub(crate) fn scripted_client(script: Vec<Step>) -> CortexClient<ScriptedChannel> {
    CortexClient::new(
        ScriptedChannel::new(script),
        CallTimeouts {
            rpc: Duration::from_millis(500),
            event: Duration::from_millis(500),
        },
    )
}
