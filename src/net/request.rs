//! Request model.
//!
//! A [`Request`] is one hop of a logical exchange. It is created by the manager once the
//! request is observed (in interception mode: once both event sources matched) and never
//! changes afterwards except for its response, failure text and completion signal.
//!
//! Intercepted requests are continued or aborted through [`Request::continue_request`]
//! and [`Request::abort`], at most once.

use crate::engine::errors::NetworkError;
use crate::net::correlation::is_data_url;
use crate::net::headers::{header_value, Headers};
use crate::net::lock;
use crate::net::response::Response;
use crate::transport::protocol::RequestPayload;
use crate::transport::{Transport, ABORT_ERROR_REASON, CONTINUE_INTERCEPTED_REQUEST};
use futures_intrusive::sync::ManualResetEvent;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Process-unique identity of a [`Request`].
///
/// Protocol request ids are reused by every hop of a redirect chain, so they cannot tell
/// two hops apart. A `RequestKey` can. Treat it as an opaque handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(Uuid);

impl RequestKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestKey {
    fn default() -> Self {
        Self::new()
    }
}

/// Changes applied to an intercepted request when it is continued.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContinueOverrides {
    pub url: Option<String>,
    pub method: Option<String>,
    pub post_data: Option<String>,
    pub headers: Option<Headers>,
}

impl ContinueOverrides {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn post_data(mut self, post_data: impl Into<String>) -> Self {
        self.post_data = Some(post_data.into());
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    fn into_params(self, interception_id: &str) -> Value {
        let mut params = Map::new();
        params.insert("interceptionId".into(), json!(interception_id));
        if let Some(url) = self.url {
            params.insert("url".into(), json!(url));
        }
        if let Some(method) = self.method {
            params.insert("method".into(), json!(method));
        }
        if let Some(post_data) = self.post_data {
            params.insert("postData".into(), json!(post_data));
        }
        if let Some(headers) = self.headers {
            params.insert("headers".into(), json!(headers));
        }
        Value::Object(params)
    }
}

/// One hop of a logical network exchange.
///
/// Requests are created by the [`NetworkManager`](crate::NetworkManager)
/// and handed out as `Arc<Request>`. The manager drops its own reference once the
/// request finishes, fails or is superseded by a redirect; every other holder keeps
/// observing the final state.
pub struct Request {
    key: RequestKey,
    request_id: String,
    interception_id: Option<String>,
    allow_interception: bool,
    url: String,
    method: String,
    post_data: Option<String>,
    headers: Headers,

    transport: Arc<dyn Transport>,
    /// Set once the request has been continued or aborted.
    interception_handled: AtomicBool,
    response: Mutex<Option<Arc<Response>>>,
    failure: Mutex<Option<String>>,
    /// Fires when loading finished or failed. Body fetches wait on it.
    completed: Arc<ManualResetEvent>,
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("key", &self.key)
            .field("request_id", &self.request_id)
            .field("interception_id", &self.interception_id)
            .field("url", &self.url)
            .field("method", &self.method)
            .field("completed", &self.completed.is_set())
            .finish_non_exhaustive()
    }
}

impl Request {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        request_id: impl Into<String>,
        interception_id: Option<String>,
        allow_interception: bool,
        url: impl Into<String>,
        payload: &RequestPayload,
    ) -> Arc<Self> {
        Arc::new(Self {
            key: RequestKey::new(),
            request_id: request_id.into(),
            interception_id,
            allow_interception,
            url: url.into(),
            method: payload.method.clone(),
            post_data: payload.post_data.clone(),
            headers: payload.headers.clone(),
            transport,
            interception_handled: AtomicBool::new(false),
            response: Mutex::new(None),
            failure: Mutex::new(None),
            completed: Arc::new(ManualResetEvent::new(false)),
        })
    }

    pub fn key(&self) -> RequestKey {
        self.key
    }

    /// Protocol request id. Shared by all hops of a redirect chain.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Protocol interception id, only present in interception mode.
    pub fn interception_id(&self) -> Option<&str> {
        self.interception_id.as_deref()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn post_data(&self) -> Option<&str> {
        self.post_data.as_deref()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    /// The response of this hop. For a redirected request this is the redirect response.
    pub fn response(&self) -> Option<Arc<Response>> {
        lock(&self.response).clone()
    }

    /// Error text of a failed load.
    pub fn failure(&self) -> Option<String> {
        lock(&self.failure).clone()
    }

    /// True once loading finished or failed.
    pub fn is_complete(&self) -> bool {
        self.completed.is_set()
    }

    /// True once the request has been continued or aborted.
    pub fn is_interception_handled(&self) -> bool {
        self.interception_handled.load(Ordering::Acquire)
    }

    /// Lets an intercepted request proceed, optionally modified.
    ///
    /// Inline `data:` requests are never intercepted; continuing them does nothing.
    /// Otherwise a request can be continued or aborted exactly once.
    pub async fn continue_request(&self, overrides: ContinueOverrides) -> Result<(), NetworkError> {
        let Some(interception_id) = self.claim_interception()? else {
            return Ok(());
        };

        log::debug!("continuing request {} ({})", self.request_id, self.url);
        self.transport
            .send(CONTINUE_INTERCEPTED_REQUEST, overrides.into_params(interception_id))
            .await?;
        Ok(())
    }

    /// Fails an intercepted request. Same preconditions as [`Request::continue_request`].
    pub async fn abort(&self) -> Result<(), NetworkError> {
        let Some(interception_id) = self.claim_interception()? else {
            return Ok(());
        };

        log::debug!("aborting request {} ({})", self.request_id, self.url);
        self.transport
            .send(
                CONTINUE_INTERCEPTED_REQUEST,
                json!({"interceptionId": interception_id, "errorReason": ABORT_ERROR_REASON}),
            )
            .await?;
        Ok(())
    }

    /// Checks the interception preconditions and marks the request handled.
    /// `Ok(None)` means there is nothing to send.
    fn claim_interception(&self) -> Result<Option<&str>, NetworkError> {
        if is_data_url(&self.url) {
            return Ok(None);
        }

        let interception_id = match (&self.interception_id, self.allow_interception) {
            (Some(id), true) => id.as_str(),
            _ => return Err(NetworkError::InterceptionNotEnabled),
        };

        self.interception_handled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| NetworkError::AlreadyHandled)?;

        Ok(Some(interception_id))
    }

    pub(crate) fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    pub(crate) fn completion(&self) -> Arc<ManualResetEvent> {
        self.completed.clone()
    }

    pub(crate) fn set_response(&self, response: Arc<Response>) {
        *lock(&self.response) = Some(response);
    }

    pub(crate) fn complete(&self) {
        self.completed.set();
    }

    pub(crate) fn fail(&self, error_text: impl Into<String>) {
        *lock(&self.failure) = Some(error_text.into());
        self.completed.set();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::recording::RecordingTransport;
    use crate::transport::TransportError;

    fn payload(url: &str) -> RequestPayload {
        let mut headers = Headers::new();
        headers.insert("Content-Type".into(), "text/plain".into());
        RequestPayload {
            url: url.into(),
            method: "POST".into(),
            headers,
            post_data: Some("hello".into()),
        }
    }

    fn intercepted(transport: &Arc<RecordingTransport>, url: &str) -> Arc<Request> {
        Request::new(
            transport.clone(),
            "r1",
            Some("i1".into()),
            true,
            url,
            &payload(url),
        )
    }

    #[test]
    fn exposes_payload() {
        let transport = Arc::new(RecordingTransport::new());
        let request = intercepted(&transport, "https://a.test/");

        assert_eq!(request.request_id(), "r1");
        assert_eq!(request.interception_id(), Some("i1"));
        assert_eq!(request.method(), "POST");
        assert_eq!(request.post_data(), Some("hello"));
        assert_eq!(request.header("content-type"), Some("text/plain"));
        assert!(request.response().is_none());
        assert!(!request.is_complete());
        assert!(format!("{request:?}").contains("https://a.test/"));
    }

    #[test]
    fn keys_are_unique() {
        let transport = Arc::new(RecordingTransport::new());
        let a = intercepted(&transport, "https://a.test/");
        let b = intercepted(&transport, "https://a.test/");
        assert_ne!(a.key(), b.key());
    }

    #[tokio::test]
    async fn continue_sends_overrides() {
        let transport = Arc::new(RecordingTransport::new());
        let request = intercepted(&transport, "https://a.test/");

        let mut headers = Headers::new();
        headers.insert("X-Extra".into(), "1".into());
        request
            .continue_request(
                ContinueOverrides::default()
                    .url("https://b.test/")
                    .method("PUT")
                    .headers(headers),
            )
            .await
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, CONTINUE_INTERCEPTED_REQUEST);
        assert_eq!(
            sent[0].1,
            json!({
                "interceptionId": "i1",
                "url": "https://b.test/",
                "method": "PUT",
                "headers": {"X-Extra": "1"},
            })
        );
        assert!(request.is_interception_handled());
    }

    #[tokio::test]
    async fn abort_sends_error_reason() {
        let transport = Arc::new(RecordingTransport::new());
        let request = intercepted(&transport, "https://a.test/");

        request.abort().await.unwrap();

        assert_eq!(
            transport.sent(),
            vec![(
                CONTINUE_INTERCEPTED_REQUEST.to_string(),
                json!({"interceptionId": "i1", "errorReason": "Failed"})
            )]
        );
    }

    #[tokio::test]
    async fn resolution_happens_at_most_once() {
        let transport = Arc::new(RecordingTransport::new());

        let request = intercepted(&transport, "https://a.test/");
        request.continue_request(ContinueOverrides::default()).await.unwrap();
        assert!(matches!(request.abort().await, Err(NetworkError::AlreadyHandled)));

        let other = intercepted(&transport, "https://a.test/other");
        other.abort().await.unwrap();
        assert!(matches!(
            other.continue_request(ContinueOverrides::default()).await,
            Err(NetworkError::AlreadyHandled)
        ));

        assert_eq!(transport.count(CONTINUE_INTERCEPTED_REQUEST), 2);
    }

    #[tokio::test]
    async fn requires_interception() {
        let transport = Arc::new(RecordingTransport::new());

        let not_allowed = Request::new(
            transport.clone(),
            "r1",
            Some("i1".into()),
            false,
            "https://a.test/",
            &payload("https://a.test/"),
        );
        assert!(matches!(
            not_allowed.continue_request(ContinueOverrides::default()).await,
            Err(NetworkError::InterceptionNotEnabled)
        ));

        let no_interception_id = Request::new(
            transport.clone(),
            "r2",
            None,
            true,
            "https://a.test/",
            &payload("https://a.test/"),
        );
        assert!(matches!(
            no_interception_id.abort().await,
            Err(NetworkError::InterceptionNotEnabled)
        ));

        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn data_urls_are_never_resolved() {
        let transport = Arc::new(RecordingTransport::new());
        let request = Request::new(
            transport.clone(),
            "r1",
            None,
            false,
            "data:text/plain,hi",
            &payload("data:text/plain,hi"),
        );

        request.continue_request(ContinueOverrides::default()).await.unwrap();
        request.abort().await.unwrap();
        request.continue_request(ContinueOverrides::default()).await.unwrap();

        assert!(transport.sent().is_empty());
        assert!(!request.is_interception_handled());
    }

    #[tokio::test]
    async fn transport_failure_reaches_caller() {
        let transport = Arc::new(RecordingTransport::new());
        transport.reply(CONTINUE_INTERCEPTED_REQUEST, Err(TransportError::ConnectionClosed));
        let request = intercepted(&transport, "https://a.test/");

        let err = request.continue_request(ContinueOverrides::default()).await.unwrap_err();
        assert!(matches!(err, NetworkError::Transport(TransportError::ConnectionClosed)));
        // The request was claimed before the command was sent.
        assert!(matches!(request.abort().await, Err(NetworkError::AlreadyHandled)));
    }

    #[test]
    fn fail_records_error_and_completes() {
        let transport = Arc::new(RecordingTransport::new());
        let request = intercepted(&transport, "https://a.test/");

        request.fail("net::ERR_ABORTED");
        assert!(request.is_complete());
        assert_eq!(request.failure().as_deref(), Some("net::ERR_ABORTED"));
    }
}
