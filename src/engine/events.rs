//! Lifecycle notifications.
//!
//! The manager publishes one [`NetworkEvent`] per lifecycle transition on a broadcast
//! bus. Events arrive in the order the protocol events were processed. A redirected hop
//! produces `Response` and `RequestFinished` for itself before the `Request` of its
//! successor.

use crate::net::{Request, Response};
use std::sync::Arc;
use tokio::sync::broadcast;

/// A handle for receiving network notifications.
pub type Subscription = broadcast::Receiver<NetworkEvent>;

#[derive(Debug, Clone)]
pub enum NetworkEvent {
    /// A request was observed (for intercepted requests: after both event sources matched)
    Request(Arc<Request>),
    /// A response (final or redirect) was attached to a request
    Response(Arc<Response>),
    /// A request finished loading or was superseded by a redirect
    RequestFinished(Arc<Request>),
    /// A request failed loading
    RequestFailed(Arc<Request>),
}

impl NetworkEvent {
    /// Request the event is about. `None` for a response whose request is gone.
    pub fn request(&self) -> Option<Arc<Request>> {
        match self {
            NetworkEvent::Request(r) | NetworkEvent::RequestFinished(r) | NetworkEvent::RequestFailed(r) => {
                Some(r.clone())
            }
            NetworkEvent::Response(resp) => resp.request(),
        }
    }

    /// Short name, handy for logs.
    pub fn name(&self) -> &'static str {
        match self {
            NetworkEvent::Request(_) => "request",
            NetworkEvent::Response(_) => "response",
            NetworkEvent::RequestFinished(_) => "requestfinished",
            NetworkEvent::RequestFailed(_) => "requestfailed",
        }
    }
}

#[derive(Debug)]
pub(crate) struct NetworkBus {
    tx: broadcast::Sender<NetworkEvent>,
}

impl NetworkBus {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> Subscription {
        self.tx.subscribe()
    }

    pub(crate) fn publish(&self, ev: NetworkEvent) {
        log::trace!("publishing {} event", ev.name());
        // broadcast::Sender::send() fails only when there are 0 receivers.
        let _ = self.tx.send(ev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Headers;
    use crate::transport::protocol::RequestPayload;
    use crate::transport::recording::RecordingTransport;

    fn request() -> Arc<Request> {
        Request::new(
            Arc::new(RecordingTransport::new()),
            "r1",
            None,
            false,
            "https://a.test/",
            &RequestPayload {
                url: "https://a.test/".into(),
                method: "GET".into(),
                headers: Headers::new(),
                post_data: None,
            },
        )
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = NetworkBus::new(4);
        bus.publish(NetworkEvent::Request(request()));
    }

    #[tokio::test]
    async fn subscribers_receive_in_order() {
        let bus = NetworkBus::new(4);
        let mut rx = bus.subscribe();
        let req = request();

        bus.publish(NetworkEvent::Request(req.clone()));
        bus.publish(NetworkEvent::RequestFinished(req.clone()));

        assert_eq!(rx.recv().await.unwrap().name(), "request");
        let finished = rx.recv().await.unwrap();
        assert_eq!(finished.name(), "requestfinished");
        assert_eq!(finished.request().unwrap().key(), req.key());
    }

    #[test]
    fn response_event_resolves_request() {
        let req = request();
        let resp = Response::new(&req, 200, Headers::new());
        let ev = NetworkEvent::Response(resp);

        assert_eq!(ev.request().unwrap().key(), req.key());
        drop(req);
        assert!(ev.request().is_none());
    }
}
