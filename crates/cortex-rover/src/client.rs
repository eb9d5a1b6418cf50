//! # Cortex JSON-RPC Client
//!
//! [`CortexClient`] owns the [`Channel`] and is the only thing that reads
//! from it. Requests get monotonically increasing ids; every inbound frame
//! is decoded once into an [`Inbound`] value and routed by shape:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                    CortexClient<C>                     │
//! │                                                        │
//! │  call()  ──► send_request() ──► channel.send()         │
//! │                                                        │
//! │  await_response(id):                                   │
//! │    channel.recv() ─┬─► Response, same id  → result     │
//! │                    ├─► Error, other id    → surfaced   │
//! │                    ├─► Response, other id → discarded  │
//! │                    └─► Event              → backlog    │
//! │                                                        │
//! │  next_inbound(): backlog first, then channel.recv()    │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! Every wait is bounded by a [`Deadline`] and, unless the call is
//! [`Interrupt::Shielded`], raced against the client's cancellation token.
//! An error payload is never dropped, even when its id belongs to an
//! earlier request.
//! Manager operations (auth, session, subscriptions, profiles, training)
//! are `impl` blocks on this type in their own modules.

use std::collections::{BTreeSet, VecDeque};
use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::{RoverConfig, TimeoutConfig};
use crate::error::{CortexError, CortexResult};
use crate::protocol::rpc::{CortexRequest, Inbound, StreamEvent};
use crate::transport::{Channel, WsChannel};

/// Upper bounds for the two kinds of waits the client performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTimeouts {
    /// Wait for the response to a request.
    pub rpc: Duration,
    /// Wait for the next push event during training and relaying.
    pub event: Duration,
}

impl Default for CallTimeouts {
    fn default() -> Self {
        Self::from(&TimeoutConfig::default())
    }
}

impl From<&TimeoutConfig> for CallTimeouts {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            rpc: Duration::from_secs(config.rpc_timeout_secs),
            event: Duration::from_secs(config.event_timeout_secs),
        }
    }
}

/// The instant a wait must finish by.
///
/// Callers that loop over [`CortexClient::next_inbound`] share one deadline
/// across the whole loop, so unrelated traffic cannot extend the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
    limit: Duration,
}

impl Deadline {
    /// A deadline `limit` from now.
    pub fn after(limit: Duration) -> Self {
        Self {
            at: Instant::now() + limit,
            limit,
        }
    }

    /// The error reported when this deadline passes.
    fn elapsed(self) -> CortexError {
        CortexError::Timeout { waited: self.limit }
    }
}

/// Whether a wait observes the cancellation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Cancelling the token ends the wait with [`CortexError::Cancelled`].
    Cancellable,
    /// The wait ignores the token. Used for teardown calls, which are still
    /// bounded by the RPC timeout.
    Shielded,
}

/// JSON-RPC client for the Cortex API over a [`Channel`].
pub struct CortexClient<C> {
    channel: C,

    /// Next request id. Ids start at 1 and never repeat.
    next_id: u64,

    /// Push events that arrived while a call was waiting for its response.
    backlog: VecDeque<StreamEvent>,

    /// Streams currently subscribed in the open session.
    subscriptions: BTreeSet<String>,

    cancel: CancellationToken,
    timeouts: CallTimeouts,
}

impl CortexClient<WsChannel> {
    /// Connect to the Cortex service described by `config`.
    pub async fn connect(config: &RoverConfig) -> CortexResult<Self> {
        let channel = WsChannel::connect(config).await?;
        Ok(Self::new(channel, CallTimeouts::from(&config.timeouts)))
    }
}

impl<C: Channel> CortexClient<C> {
    /// Wrap an already-open channel.
    pub fn new(channel: C, timeouts: CallTimeouts) -> Self {
        Self {
            channel,
            next_id: 1,
            backlog: VecDeque::new(),
            subscriptions: BTreeSet::new(),
            cancel: CancellationToken::new(),
            timeouts,
        }
    }

    /// Use `token` as this client's cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The token that cancels this client's waits.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn timeouts(&self) -> CallTimeouts {
        self.timeouts
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Streams currently subscribed, in name order.
    pub fn subscriptions(&self) -> &BTreeSet<String> {
        &self.subscriptions
    }

    pub(crate) fn subscriptions_mut(&mut self) -> &mut BTreeSet<String> {
        &mut self.subscriptions
    }

    // ─── Core RPC ───────────────────────────────────────────────────────

    /// Send a request without waiting for its response. Returns the id the
    /// response will carry.
    pub async fn send_request(&mut self, method: &'static str, params: Value) -> CortexResult<u64> {
        let id = self.next_id;
        self.next_id += 1;

        let json = serde_json::to_string(&CortexRequest::new(id, method, params))?;
        tracing::debug!(method, id, "Sending Cortex request");

        let limit = self.timeouts.rpc;
        tokio::time::timeout(limit, self.channel.send(json))
            .await
            .map_err(|_| CortexError::Timeout { waited: limit })??;
        Ok(id)
    }

    /// Wait for the response carrying `id`.
    ///
    /// Push events seen meanwhile go to the backlog. Successful responses to
    /// other ids are discarded; an error payload for any id fails the wait.
    /// The whole wait shares one RPC deadline.
    pub async fn await_response(&mut self, id: u64, interrupt: Interrupt) -> CortexResult<Value> {
        let deadline = Deadline::after(self.timeouts.rpc);

        loop {
            let text = bounded(&self.cancel, interrupt, deadline, self.channel.recv()).await?;

            match Inbound::decode(&text) {
                Ok(Inbound::Response(response)) if response.id == Some(id) => {
                    return response.into_result();
                }
                Ok(Inbound::Response(response)) if response.is_error() => {
                    tracing::warn!(
                        expected = id,
                        received = ?response.id,
                        "Error payload for another request"
                    );
                    response.into_result()?;
                }
                Ok(Inbound::Response(response)) => {
                    tracing::debug!(
                        expected = id,
                        received = ?response.id,
                        "Discarding response for another request"
                    );
                }
                Ok(Inbound::Event(event)) => {
                    tracing::trace!(stream = %event.stream, "Buffering push event");
                    self.backlog.push_back(event);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable message");
                }
            }
        }
    }

    /// Send a request and wait for its result. Cancellable.
    pub async fn call(&mut self, method: &'static str, params: Value) -> CortexResult<Value> {
        self.call_with(method, params, Interrupt::Cancellable).await
    }

    /// Send a request and wait for its result with the given interrupt mode.
    pub async fn call_with(
        &mut self,
        method: &'static str,
        params: Value,
        interrupt: Interrupt,
    ) -> CortexResult<Value> {
        if interrupt == Interrupt::Cancellable && self.cancel.is_cancelled() {
            return Err(CortexError::Cancelled);
        }
        let id = self.send_request(method, params).await?;
        let result = self.await_response(id, interrupt).await?;
        tracing::debug!(method, id, "Cortex RPC succeeded");
        Ok(result)
    }

    // ─── Push events ────────────────────────────────────────────────────

    /// Next decoded message: buffered push events first, then the channel.
    ///
    /// Waits for a fresh frame until `deadline`. Undecodable frames are
    /// logged and skipped.
    pub async fn next_inbound(&mut self, deadline: Deadline) -> CortexResult<Inbound> {
        if self.cancel.is_cancelled() {
            return Err(CortexError::Cancelled);
        }
        if let Some(event) = self.backlog.pop_front() {
            return Ok(Inbound::Event(event));
        }

        loop {
            let text = bounded(
                &self.cancel,
                Interrupt::Cancellable,
                deadline,
                self.channel.recv(),
            )
            .await?;

            match Inbound::decode(&text) {
                Ok(inbound) => return Ok(inbound),
                Err(e) => tracing::warn!(error = %e, "Skipping undecodable message"),
            }
        }
    }

    /// Sleep for `duration` unless cancelled first.
    pub async fn pause(&self, duration: Duration) -> CortexResult<()> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(CortexError::Cancelled),
            () = tokio::time::sleep(duration) => Ok(()),
        }
    }

    // ─── Connection Management ──────────────────────────────────────────

    /// Close the underlying channel.
    pub async fn disconnect(&mut self) -> CortexResult<()> {
        self.channel.close().await
    }
}

/// Await `fut` until `deadline`, racing the token unless shielded.
async fn bounded<T>(
    cancel: &CancellationToken,
    interrupt: Interrupt,
    deadline: Deadline,
    fut: impl Future<Output = CortexResult<T>>,
) -> CortexResult<T> {
    let timed = tokio::time::timeout_at(deadline.at, fut);
    match interrupt {
        Interrupt::Shielded => timed.await.unwrap_or_else(|_| Err(deadline.elapsed())),
        Interrupt::Cancellable => tokio::select! {
            biased;
            () = cancel.cancelled() => Err(CortexError::Cancelled),
            result = timed => result.unwrap_or_else(|_| Err(deadline.elapsed())),
        },
    }
}
