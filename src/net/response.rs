//! Response model.
//!
//! A [`Response`] is created once per completed hop: from a `responseReceived` event, or
//! from the redirect status and headers when a hop is superseded by a redirect. Status,
//! headers and url never change afterwards.
//!
//! ## Body
//! The body is not part of any event. [`Response::body`] waits until the owning request
//! finished (or failed) loading, then asks the transport for the buffered body and caches
//! the decoded bytes. Concurrent callers share a single fetch.
//!
//! Redirect responses have an empty body.
//!
//! ## Owning request
//! The response only holds a weak reference to its [`Request`]. It keeps its own copy of
//! the request id and the completion signal, so fetching a body never requires the
//! request to be alive.

use crate::engine::errors::NetworkError;
use crate::net::headers::{header_value, Headers};
use crate::net::request::Request;
use crate::transport::{Transport, GET_RESPONSE_BODY};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures_intrusive::sync::ManualResetEvent;
use serde_json::{json, Value};
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::OnceCell;

pub struct Response {
    request: Weak<Request>,
    request_id: String,

    /// URL of the owning request at the time the response was created.
    url: String,
    /// Numeric HTTP status code (e.g., `200`, `302`).
    status: u16,
    /// Response headers, names as reported.
    headers: Headers,

    transport: Arc<dyn Transport>,
    completed: Arc<ManualResetEvent>,
    body: OnceCell<Vec<u8>>,
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("request_id", &self.request_id)
            .field("url", &self.url)
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_cached", &self.body.initialized())
            .finish_non_exhaustive()
    }
}

impl Response {
    pub(crate) fn new(request: &Arc<Request>, status: u16, headers: Headers) -> Arc<Self> {
        Arc::new(Self {
            request: Arc::downgrade(request),
            request_id: request.request_id().to_string(),
            url: request.url().to_string(),
            status,
            headers,
            transport: request.transport(),
            completed: request.completion(),
            body: OnceCell::new(),
        })
    }

    /// Response of a hop superseded by a redirect. Redirect bodies are not buffered by
    /// the browser, so the body is empty and never fetched.
    pub(crate) fn new_redirect(request: &Arc<Request>, status: u16, headers: Headers) -> Arc<Self> {
        Arc::new(Self {
            request: Arc::downgrade(request),
            request_id: request.request_id().to_string(),
            url: request.url().to_string(),
            status,
            headers,
            transport: request.transport(),
            completed: request.completion(),
            body: OnceCell::new_with(Some(Vec::new())),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// True for statuses in `200..=299`.
    pub fn ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Canonical reason phrase, `"Unknown"` for non-standard codes.
    pub fn status_text(&self) -> &'static str {
        http::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown")
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    /// The request this response belongs to. `None` only when nobody holds the request
    /// anymore.
    pub fn request(&self) -> Option<Arc<Request>> {
        self.request.upgrade()
    }

    /// Raw body bytes. Waits for the owning request to finish loading on first call.
    pub async fn body(&self) -> Result<&[u8], NetworkError> {
        let body = self
            .body
            .get_or_try_init(|| async {
                self.completed.wait().await;
                log::debug!("fetching body for request {}", self.request_id);

                let reply = self
                    .transport
                    .send(GET_RESPONSE_BODY, json!({"requestId": self.request_id}))
                    .await?;
                decode_body(reply)
            })
            .await?;

        Ok(body.as_slice())
    }

    /// Body decoded as UTF-8.
    pub async fn text(&self) -> Result<String, NetworkError> {
        let body = self.body().await?;
        Ok(String::from_utf8(body.to_vec())?)
    }

    /// Body parsed as JSON.
    pub async fn json(&self) -> Result<Value, NetworkError> {
        let text = self.text().await?;
        serde_json::from_str(&text).map_err(NetworkError::InvalidJson)
    }
}

/// Decodes a `getResponseBody` reply: `{ "body": String, "base64Encoded": bool }`.
fn decode_body(reply: Value) -> Result<Vec<u8>, NetworkError> {
    let body = reply
        .get("body")
        .and_then(Value::as_str)
        .ok_or_else(|| NetworkError::MalformedBodyPayload(format!("missing body in {reply}")))?;

    let base64_encoded = reply
        .get("base64Encoded")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if base64_encoded {
        Ok(STANDARD.decode(body)?)
    } else {
        Ok(body.as_bytes().to_vec())
    }
}
