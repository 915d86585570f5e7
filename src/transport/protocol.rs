//! Network event payloads.
//!
//! Only the fields the engine consumes are modelled; unknown fields are ignored by serde.

use crate::engine::errors::NetworkError;
use crate::net::headers::Headers;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const REQUEST_WILL_BE_SENT: &str = "Network.requestWillBeSent";
pub const REQUEST_INTERCEPTED: &str = "Network.requestIntercepted";
pub const RESPONSE_RECEIVED: &str = "Network.responseReceived";
pub const LOADING_FINISHED: &str = "Network.loadingFinished";
pub const LOADING_FAILED: &str = "Network.loadingFailed";

/// The request as described by either event source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_data: Option<String>,
}

/// Status and headers of a (possibly redirect) response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload {
    pub status: u16,
    #[serde(default)]
    pub headers: Headers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestWillBeSent {
    pub request_id: String,
    pub request: RequestPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_response: Option<ResponsePayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestIntercepted {
    pub interception_id: String,
    pub request: RequestPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_headers: Option<Headers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseReceived {
    pub request_id: String,
    pub response: ResponsePayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingFinished {
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interception_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingFailed {
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interception_id: Option<String>,
    #[serde(default)]
    pub error_text: String,
}

/// One inbound network event.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolEvent {
    RequestWillBeSent(RequestWillBeSent),
    RequestIntercepted(RequestIntercepted),
    ResponseReceived(ResponseReceived),
    LoadingFinished(LoadingFinished),
    LoadingFailed(LoadingFailed),
}

impl ProtocolEvent {
    /// Parses a raw `(method, params)` event. Methods the engine does not consume yield
    /// `Ok(None)`.
    pub fn parse(method: &str, params: Value) -> Result<Option<Self>, NetworkError> {
        fn typed<T: serde::de::DeserializeOwned>(method: &str, params: Value) -> Result<T, NetworkError> {
            serde_json::from_value(params).map_err(|source| NetworkError::MalformedEvent {
                method: method.to_string(),
                source,
            })
        }

        let event = match method {
            REQUEST_WILL_BE_SENT => Self::RequestWillBeSent(typed(method, params)?),
            REQUEST_INTERCEPTED => Self::RequestIntercepted(typed(method, params)?),
            RESPONSE_RECEIVED => Self::ResponseReceived(typed(method, params)?),
            LOADING_FINISHED => Self::LoadingFinished(typed(method, params)?),
            LOADING_FAILED => Self::LoadingFailed(typed(method, params)?),
            _ => return Ok(None),
        };

        Ok(Some(event))
    }

    /// Protocol method name of this event.
    pub fn method(&self) -> &'static str {
        match self {
            Self::RequestWillBeSent(_) => REQUEST_WILL_BE_SENT,
            Self::RequestIntercepted(_) => REQUEST_INTERCEPTED,
            Self::ResponseReceived(_) => RESPONSE_RECEIVED,
            Self::LoadingFinished(_) => LOADING_FINISHED,
            Self::LoadingFailed(_) => LOADING_FAILED,
        }
    }
}
