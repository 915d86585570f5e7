//! Transport seam.
//!
//! The engine never talks to a browser itself. Outbound commands go through a
//! [`Transport`], inbound events are handed to the engine by whoever owns the session
//! (see [`NetworkWorker`](crate::NetworkWorker)).

use async_trait::async_trait;
use serde_json::Value;

/// Typed payloads for the inbound network events.
pub mod protocol;

#[cfg(test)]
pub(crate) mod recording;

/// Replaces the extra headers sent with every request.
pub const SET_EXTRA_HTTP_HEADERS: &str = "Network.setExtraHTTPHeaders";
/// Overrides the user agent of every request.
pub const SET_USER_AGENT_OVERRIDE: &str = "Network.setUserAgentOverride";
/// Turns request interception on or off.
pub const SET_REQUEST_INTERCEPTION: &str = "Network.setRequestInterceptionEnabled";
/// Continues (or, with an `errorReason`, aborts) an intercepted request.
pub const CONTINUE_INTERCEPTED_REQUEST: &str = "Network.continueInterceptedRequest";
/// Fetches the buffered body of a finished request.
pub const GET_RESPONSE_BODY: &str = "Network.getResponseBody";

/// Error reason sent when aborting an intercepted request.
pub const ABORT_ERROR_REASON: &str = "Failed";

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Protocol error {code}: {message}")]
    Protocol { code: i64, message: String },

    #[error("Transport error: {0}")]
    Other(String),
}

/// Bidirectional session to the remote debugging protocol, outbound half.
///
/// Implementations must be `Send + Sync`: requests and responses share a single
/// transport and may issue commands from different tasks.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `method` with `params` and waits for the result.
    async fn send(&self, method: &str, params: Value) -> Result<Value, TransportError>;
}
