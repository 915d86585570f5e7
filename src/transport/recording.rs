use super::{Transport, TransportError, GET_RESPONSE_BODY};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

/// Test transport that records every command and answers from a script.
#[derive(Default)]
pub(crate) struct RecordingTransport {
    sent: Mutex<Vec<(String, Value)>>,
    replies: Mutex<HashMap<String, Result<Value, TransportError>>>,
}

impl RecordingTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Replies to every future `method` with `reply`.
    pub(crate) fn reply(&self, method: &str, reply: Result<Value, TransportError>) {
        self.replies.lock().unwrap().insert(method.to_string(), reply);
    }

    /// Scripts the body returned by `Network.getResponseBody`.
    pub(crate) fn reply_body(&self, body: &str, base64_encoded: bool) {
        self.reply(
            GET_RESPONSE_BODY,
            Ok(json!({"body": body, "base64Encoded": base64_encoded})),
        );
    }

    pub(crate) fn sent(&self) -> Vec<(String, Value)> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn sent_methods(&self) -> Vec<String> {
        self.sent().into_iter().map(|(m, _)| m).collect()
    }

    pub(crate) fn count(&self, method: &str) -> usize {
        self.sent().iter().filter(|(m, _)| m == method).count()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        self.sent.lock().unwrap().push((method.to_string(), params));

        // Let concurrent callers interleave like a real round trip would.
        tokio::task::yield_now().await;

        self.replies
            .lock()
            .unwrap()
            .get(method)
            .cloned()
            .unwrap_or(Ok(Value::Null))
    }
}
