use crate::engine::config::NetworkConfigError;
use crate::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("Request interception is not enabled for this request")]
    InterceptionNotEnabled,

    #[error("Request is already handled")]
    AlreadyHandled,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Invalid JSON body: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Body is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Body is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Malformed response body payload: {0}")]
    MalformedBodyPayload(String),

    #[error("Malformed {method} event: {source}")]
    MalformedEvent {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid network configuration: {0}")]
    Config(#[from] NetworkConfigError),
}
