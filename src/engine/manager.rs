//! The network lifecycle engine.
//!
//! [`NetworkManager`] consumes protocol events strictly in the order they are handed to
//! it and turns them into [`Request`]s and [`Response`]s:
//!
//! - Without interception a request starts on `requestWillBeSent`. A will-be-sent event
//!   carrying a redirect response first finalizes the previous hop under the same
//!   request id.
//! - With interception a request starts only once its will-be-sent event and its
//!   intercepted event have been paired through the [`PendingMatchIndex`]. Redirects are
//!   reported by the intercepted event; the matching will-be-sent is ignored.
//! - `responseReceived` attaches a response, `loadingFinished`/`loadingFailed` complete
//!   the request and drop it from the live indices.
//!
//! Events referring to requests the manager does not track are ignored. The two event
//! sources are known to have small coverage gaps (responses for uploads, finished events
//! without a will-be-sent), none of which is an error.
//!
//! Every handler runs to completion under the state lock and never awaits, so handlers
//! cannot interleave and notifications leave in processing order.

use crate::engine::config::{validate_headers, NetworkConfig};
use crate::engine::errors::NetworkError;
use crate::engine::events::{NetworkBus, NetworkEvent, Subscription};
use crate::net::correlation::{is_data_url, normalize_url, payload_key, CorrelationKey};
use crate::net::headers::Headers;
use crate::net::lock;
use crate::net::pending::PendingMatchIndex;
use crate::net::{Request, Response};
use crate::transport::protocol::{
    LoadingFailed, LoadingFinished, ProtocolEvent, RequestIntercepted, RequestPayload, RequestWillBeSent,
    ResponseReceived,
};
use crate::transport::{Transport, SET_EXTRA_HTTP_HEADERS, SET_REQUEST_INTERCEPTION, SET_USER_AGENT_OVERRIDE};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Engine-owned indices and settings. Only mutated from the event path and the setters.
#[derive(Default)]
struct ManagerState {
    /// Live requests by protocol request id
    requests: HashMap<String, Arc<Request>>,
    /// Live requests by interception id
    interceptions: HashMap<String, Arc<Request>>,
    /// Will-be-sent ids and interceptions still waiting for their sibling
    pending: PendingMatchIndex,
    extra_http_headers: Headers,
    user_agent: Option<String>,
    request_interception: bool,
}

pub struct NetworkManager {
    transport: Arc<dyn Transport>,
    /// Configuration pushed to the transport by [`NetworkManager::initialize`]
    config: NetworkConfig,
    state: Mutex<ManagerState>,
    bus: NetworkBus,
}

impl fmt::Debug for NetworkManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("NetworkManager")
            .field("config", &self.config)
            .field("inflight", &state.requests.len())
            .field("pending", &state.pending.counts())
            .field("request_interception", &state.request_interception)
            .finish_non_exhaustive()
    }
}

impl NetworkManager {
    /// Creates a manager on top of `transport`. Nothing is sent until
    /// [`NetworkManager::initialize`] is called.
    pub fn new(transport: Arc<dyn Transport>, config: NetworkConfig) -> Self {
        let bus = NetworkBus::new(config.event_capacity);

        Self {
            transport,
            config,
            state: Mutex::new(ManagerState::default()),
            bus,
        }
    }

    /// Pushes the configured headers, user agent and interception mode to the transport.
    pub async fn initialize(&self) -> Result<(), NetworkError> {
        if !self.config.extra_http_headers.is_empty() {
            self.set_extra_http_headers(self.config.extra_http_headers.clone()).await?;
        }
        if let Some(ua) = &self.config.user_agent {
            self.set_user_agent(ua).await?;
        }
        if self.config.request_interception {
            self.set_request_interception(true).await?;
        }
        Ok(())
    }

    /// Subscribe to lifecycle notifications. Only events published after this call are
    /// received.
    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    /// Replaces the extra headers sent with every subsequent request.
    pub async fn set_extra_http_headers(&self, headers: Headers) -> Result<(), NetworkError> {
        validate_headers(&headers)?;

        self.transport
            .send(SET_EXTRA_HTTP_HEADERS, json!({ "headers": headers }))
            .await?;

        log::debug!("extra HTTP headers replaced ({} entries)", headers.len());
        lock(&self.state).extra_http_headers = headers;
        Ok(())
    }

    /// Snapshot of the current extra headers.
    pub fn extra_http_headers(&self) -> Headers {
        lock(&self.state).extra_http_headers.clone()
    }

    pub async fn set_user_agent(&self, user_agent: &str) -> Result<(), NetworkError> {
        self.transport
            .send(SET_USER_AGENT_OVERRIDE, json!({ "userAgent": user_agent }))
            .await?;

        lock(&self.state).user_agent = Some(user_agent.to_string());
        Ok(())
    }

    pub fn user_agent(&self) -> Option<String> {
        lock(&self.state).user_agent.clone()
    }

    /// Turns interception on or off. Only requests observed after the transport accepted
    /// the change are affected.
    pub async fn set_request_interception(&self, enabled: bool) -> Result<(), NetworkError> {
        self.transport
            .send(SET_REQUEST_INTERCEPTION, json!({ "enabled": enabled }))
            .await?;

        log::debug!("request interception {}", if enabled { "enabled" } else { "disabled" });
        lock(&self.state).request_interception = enabled;
        Ok(())
    }

    pub fn request_interception(&self) -> bool {
        lock(&self.state).request_interception
    }

    /// Live request registered under a protocol request id.
    pub fn request(&self, request_id: &str) -> Option<Arc<Request>> {
        lock(&self.state).requests.get(request_id).cloned()
    }

    /// Live request registered under an interception id.
    pub fn request_by_interception(&self, interception_id: &str) -> Option<Arc<Request>> {
        lock(&self.state).interceptions.get(interception_id).cloned()
    }

    /// Number of live (started, not yet finished) requests.
    pub fn inflight_count(&self) -> usize {
        lock(&self.state).requests.len()
    }

    /// Unmatched `(will-be-sent ids, interceptions)` waiting for their sibling event.
    pub fn pending_counts(&self) -> (usize, usize) {
        lock(&self.state).pending.counts()
    }

    /// Parses and processes a raw `(method, params)` event. Methods outside the network
    /// lifecycle are ignored.
    pub fn handle_raw(&self, method: &str, params: Value) -> Result<(), NetworkError> {
        if let Some(event) = ProtocolEvent::parse(method, params)? {
            self.handle_event(event);
        }
        Ok(())
    }

    /// Processes a single protocol event.
    pub fn handle_event(&self, event: ProtocolEvent) {
        log::debug!("processing {}", event.method());

        let mut state = lock(&self.state);
        match event {
            ProtocolEvent::RequestWillBeSent(ev) => self.on_request_will_be_sent(&mut state, ev),
            ProtocolEvent::RequestIntercepted(ev) => self.on_request_intercepted(&mut state, ev),
            ProtocolEvent::ResponseReceived(ev) => self.on_response_received(&mut state, ev),
            ProtocolEvent::LoadingFinished(ev) => self.on_loading_finished(&mut state, ev),
            ProtocolEvent::LoadingFailed(ev) => self.on_loading_failed(&mut state, ev),
        }
    }

    fn on_request_will_be_sent(&self, state: &mut ManagerState, mut ev: RequestWillBeSent) {
        ev.request.url = normalize_url(&ev.request.url);

        if state.request_interception && !is_data_url(&ev.request.url) {
            // Redirects are reported (and handled) by the intercepted event.
            if ev.redirect_response.is_some() {
                return;
            }

            let key = payload_key(&ev.request);
            state.pending.record_request(key.clone(), ev.request_id);
            self.maybe_resolve(state, &key);
            return;
        }

        if let Some(redirect) = ev.redirect_response {
            match state.requests.get(&ev.request_id).cloned() {
                Some(previous) => self.handle_redirect(state, &previous, redirect.status, redirect.headers),
                None => log::warn!("redirect for unknown request {}", ev.request_id),
            }
        }

        let url = ev.request.url.clone();
        self.start_request(state, ev.request_id, None, url, &ev.request);
    }

    fn on_request_intercepted(&self, state: &mut ManagerState, mut ev: RequestIntercepted) {
        ev.request.url = normalize_url(&ev.request.url);

        if let Some(status) = ev.redirect_status_code {
            let Some(previous) = state.interceptions.get(&ev.interception_id).cloned() else {
                log::warn!("intercepted redirect for unknown interception {}", ev.interception_id);
                return;
            };

            self.handle_redirect(state, &previous, status, ev.redirect_headers.take().unwrap_or_default());

            let url = match ev.redirect_url.take() {
                Some(redirect_url) => normalize_url(&redirect_url),
                None => ev.request.url.clone(),
            };
            self.start_request(
                state,
                previous.request_id().to_string(),
                Some(ev.interception_id),
                url,
                &ev.request,
            );
            return;
        }

        let key = payload_key(&ev.request);
        state.pending.record_interception(key.clone(), ev);
        self.maybe_resolve(state, &key);
    }

    fn maybe_resolve(&self, state: &mut ManagerState, key: &CorrelationKey) {
        let Some(matched) = state.pending.try_resolve(key) else {
            return;
        };

        log::debug!(
            "matched request {} with interception {}",
            matched.request_id,
            matched.interception.interception_id
        );

        let RequestIntercepted {
            interception_id,
            request,
            ..
        } = matched.interception;
        let url = request.url.clone();
        self.start_request(state, matched.request_id, Some(interception_id), url, &request);
    }

    fn start_request(
        &self,
        state: &mut ManagerState,
        request_id: String,
        interception_id: Option<String>,
        url: String,
        payload: &RequestPayload,
    ) {
        let request = Request::new(
            self.transport.clone(),
            request_id.clone(),
            interception_id.clone(),
            state.request_interception,
            url,
            payload,
        );

        if let Some(replaced) = state.requests.insert(request_id, request.clone()) {
            log::debug!("request id {} reused while still live", replaced.request_id());
        }
        if let Some(interception_id) = interception_id {
            state.interceptions.insert(interception_id, request.clone());
        }

        self.bus.publish(NetworkEvent::Request(request));
    }

    /// Finalizes a hop that is superseded by a redirect.
    fn handle_redirect(&self, state: &mut ManagerState, request: &Arc<Request>, status: u16, headers: Headers) {
        let response = Response::new_redirect(request, status, headers);
        request.set_response(response.clone());
        request.complete();
        unlink(state, request);

        self.bus.publish(NetworkEvent::Response(response));
        self.bus.publish(NetworkEvent::RequestFinished(request.clone()));
    }

    fn on_response_received(&self, state: &mut ManagerState, ev: ResponseReceived) {
        // Uploads may report a response without a tracked request.
        let Some(request) = state.requests.get(&ev.request_id).cloned() else {
            log::debug!("response for untracked request {}", ev.request_id);
            return;
        };

        let response = Response::new(&request, ev.response.status, ev.response.headers);
        request.set_response(response.clone());
        self.bus.publish(NetworkEvent::Response(response));
    }

    fn on_loading_finished(&self, state: &mut ManagerState, ev: LoadingFinished) {
        // Some requests never report a will-be-sent event.
        let Some(request) = state.requests.get(&ev.request_id).cloned() else {
            log::debug!("loading finished for untracked request {}", ev.request_id);
            return;
        };

        request.complete();
        unlink(state, &request);
        if let Some(interception_id) = &ev.interception_id {
            remove_if_same(&mut state.interceptions, interception_id, &request);
        }

        self.bus.publish(NetworkEvent::RequestFinished(request));
    }

    fn on_loading_failed(&self, state: &mut ManagerState, ev: LoadingFailed) {
        let Some(request) = state.requests.get(&ev.request_id).cloned() else {
            log::debug!("loading failed for untracked request {}", ev.request_id);
            return;
        };

        request.fail(ev.error_text);
        unlink(state, &request);
        if let Some(interception_id) = &ev.interception_id {
            remove_if_same(&mut state.interceptions, interception_id, &request);
        }

        self.bus.publish(NetworkEvent::RequestFailed(request));
    }
}

/// Drops `request` from both live indices.
fn unlink(state: &mut ManagerState, request: &Arc<Request>) {
    remove_if_same(&mut state.requests, request.request_id(), request);
    if let Some(interception_id) = request.interception_id() {
        remove_if_same(&mut state.interceptions, interception_id, request);
    }
}

fn remove_if_same(index: &mut HashMap<String, Arc<Request>>, id: &str, request: &Arc<Request>) {
    if index.get(id).is_some_and(|live| Arc::ptr_eq(live, request)) {
        index.remove(id);
    }
}
