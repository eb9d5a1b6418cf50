//! JSON-RPC request/response protocol structures.
//!
//! Everything the service sends is decoded exactly once, by
//! [`Inbound::decode`], into either a response to one of our requests or an
//! unsolicited push event. Callers match on the variant instead of probing
//! keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CortexError, CortexResult};

/// A JSON-RPC 2.0 request to the Cortex API.
#[derive(Debug, Serialize)]
pub struct CortexRequest {
    pub id: u64,
    pub jsonrpc: &'static str,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl CortexRequest {
    /// Create a new request with the given method and params.
    ///
    /// Empty object params are omitted from the wire.
    pub fn new(id: u64, method: &'static str, params: Value) -> Self {
        let params = if params.as_object().is_some_and(Map::is_empty) {
            None
        } else {
            Some(params)
        };

        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

/// A JSON-RPC 2.0 error payload from the Cortex API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cortex API error {}: {}", self.code, self.message)
    }
}

/// Why a response carries no result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcFailure {
    /// A well-formed `error` payload.
    Api(RpcError),
    /// An `error` key whose value is not `{code, message}`.
    Malformed(String),
}

/// A response to a request, correlated by `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcResponse {
    /// Echoed request id. `None` when the service omitted it.
    pub id: Option<u64>,
    pub outcome: Result<Value, RpcFailure>,
}

impl RpcResponse {
    pub fn is_error(&self) -> bool {
        self.outcome.is_err()
    }

    /// Convert into the call result, mapping an error payload to a
    /// semantic [`CortexError`].
    pub fn into_result(self) -> CortexResult<Value> {
        let id = self.id;
        self.outcome.map_err(|failure| match failure {
            RpcFailure::Api(error) => {
                tracing::error!(
                    ?id,
                    code = error.code,
                    message = %error.message,
                    "Cortex API error in RPC response",
                );
                CortexError::from_api_error(error.code, error.message)
            }
            RpcFailure::Malformed(reason) => {
                tracing::error!(?id, reason, "Malformed error payload in RPC response");
                CortexError::ProtocolError {
                    reason: format!("Failed to parse error payload: {reason}"),
                }
            }
        })
    }
}

/// An unsolicited push event from a subscribed stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    /// Stream tag, e.g. `"sys"` or `"com"`.
    pub stream: String,
    pub sid: Option<String>,
    pub time: Option<f64>,
    pub data: Vec<Value>,
}

/// One decoded message from the channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Response(RpcResponse),
    Event(StreamEvent),
}

/// Keys that can appear next to a stream tag without being one.
const ENVELOPE_KEYS: &[&str] = &["sid", "time", "jsonrpc", "id"];

impl Inbound {
    /// Classify a raw message by shape.
    ///
    /// A message with a `result` or `error` key is a response; otherwise the
    /// first array-valued key outside the envelope is the stream tag.
    pub fn decode(text: &str) -> CortexResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut object) = value else {
            return Err(CortexError::ProtocolError {
                reason: format!("expected a JSON object, got: {text}"),
            });
        };

        let id = object.get("id").and_then(Value::as_u64);

        if let Some(error) = object.remove("error") {
            let failure = match serde_json::from_value::<RpcError>(error) {
                Ok(error) => RpcFailure::Api(error),
                Err(e) => RpcFailure::Malformed(e.to_string()),
            };
            return Ok(Inbound::Response(RpcResponse {
                id,
                outcome: Err(failure),
            }));
        }

        if let Some(result) = object.remove("result") {
            return Ok(Inbound::Response(RpcResponse {
                id,
                outcome: Ok(result),
            }));
        }

        let stream = object
            .iter()
            .find(|(key, value)| !ENVELOPE_KEYS.contains(&key.as_str()) && value.is_array())
            .map(|(key, _)| key.clone())
            .ok_or_else(|| CortexError::ProtocolError {
                reason: format!("message is neither a response nor a stream event: {text}"),
            })?;

        let data = match object.remove(&stream) {
            Some(Value::Array(data)) => data,
            _ => Vec::new(),
        };

        Ok(Inbound::Event(StreamEvent {
            stream,
            sid: object.get("sid").and_then(Value::as_str).map(str::to_owned),
            time: object.get("time").and_then(Value::as_f64),
            data,
        }))
    }
}
