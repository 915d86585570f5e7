//! Network configuration.
//!
//! `NetworkConfig` holds the state a [`NetworkManager`](crate::NetworkManager)
//! pushes to the transport when it is initialized: extra headers, a user agent override
//! and whether requests are intercepted. All three can be changed later through the
//! manager; the config only sets the starting point.
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use gosub_network::NetworkConfig;
//! let cfg = NetworkConfig::default();
//! assert!(!cfg.request_interception);
//! assert!(cfg.extra_http_headers.is_empty());
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use gosub_network::NetworkConfig;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = NetworkConfig::builder()
//!     .extra_http_header("X-Requested-By", "gosub")
//!     .user_agent("Gosub/0.1")
//!     .request_interception(true)
//!     .event_capacity(256)
//!     .build()?;
//! assert_eq!(cfg.event_capacity, 256);
//! # Ok(()) }
//! ```
//!
//! # Errors
//!
//! [`NetworkConfigBuilder::build`] returns a [`NetworkConfigError`] when the event
//! capacity is zero, a header name is empty or the user agent is an empty string.

use crate::engine::DEFAULT_CHANNEL_CAPACITY;
use crate::net::headers::Headers;
use std::fmt;

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Headers added to every request.
    pub extra_http_headers: Headers,
    /// User agent override, `None` keeps the browser's own.
    pub user_agent: Option<String>,
    /// Hold requests until they are continued or aborted.
    pub request_interception: bool,
    /// Capacity of the notification channel. Subscribers lagging further behind miss events.
    pub event_capacity: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            extra_http_headers: Headers::new(),
            user_agent: None,
            request_interception: false,
            event_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl NetworkConfig {
    pub fn builder() -> NetworkConfigBuilder {
        NetworkConfigBuilder::default()
    }
}

/// Builder for [`NetworkConfig`].
#[derive(Debug, Clone, Default)]
pub struct NetworkConfigBuilder {
    inner: NetworkConfig,
}

impl NetworkConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut NetworkConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn extra_http_header<K: Into<String>, V: Into<String>>(self, name: K, value: V) -> Self {
        self.map(|c| {
            c.extra_http_headers.insert(name.into(), value.into());
        })
    }
    pub fn extra_http_headers(self, headers: Headers) -> Self { self.map(|c| c.extra_http_headers = headers) }
    pub fn user_agent<S: Into<String>>(self, ua: S) -> Self { self.map(|c| c.user_agent = Some(ua.into())) }
    pub fn request_interception(self, on: bool) -> Self { self.map(|c| c.request_interception = on) }
    pub fn event_capacity(self, n: usize) -> Self { self.map(|c| c.event_capacity = n) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut NetworkConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<NetworkConfig, NetworkConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkConfigError {
    ZeroEventCapacity,
    EmptyHeaderName,
    EmptyUserAgent,
}

impl fmt::Display for NetworkConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkConfigError::ZeroEventCapacity =>
                write!(f, "event_capacity must be at least 1"),
            NetworkConfigError::EmptyHeaderName =>
                write!(f, "extra HTTP header names must not be empty"),
            NetworkConfigError::EmptyUserAgent =>
                write!(f, "user_agent must not be empty when set"),
        }
    }
}
impl std::error::Error for NetworkConfigError {}

pub(crate) fn validate_headers(headers: &Headers) -> Result<(), NetworkConfigError> {
    if headers.keys().any(|name| name.trim().is_empty()) {
        return Err(NetworkConfigError::EmptyHeaderName);
    }
    Ok(())
}

fn validate(c: &NetworkConfig) -> Result<(), NetworkConfigError> {
    if c.event_capacity == 0 {
        return Err(NetworkConfigError::ZeroEventCapacity);
    }
    validate_headers(&c.extra_http_headers)?;
    if c.user_agent.as_deref().is_some_and(|ua| ua.is_empty()) {
        return Err(NetworkConfigError::EmptyUserAgent);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = NetworkConfig::default();
        assert!(cfg.extra_http_headers.is_empty());
        assert!(cfg.user_agent.is_none());
        assert!(!cfg.request_interception);
        assert_eq!(cfg.event_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn builder_sets_fields() {
        let cfg = NetworkConfig::builder()
            .extra_http_header("X-A", "1")
            .extra_http_header("X-B", "2")
            .user_agent("Gosub/0.1")
            .request_interception(true)
            .event_capacity(8)
            .build()
            .unwrap();

        assert_eq!(cfg.extra_http_headers.len(), 2);
        assert_eq!(cfg.user_agent.as_deref(), Some("Gosub/0.1"));
        assert!(cfg.request_interception);
        assert_eq!(cfg.event_capacity, 8);
    }

    #[test]
    fn headers_replace_all() {
        let mut replacement = Headers::new();
        replacement.insert("X-Only".into(), "yes".into());

        let cfg = NetworkConfig::builder()
            .extra_http_header("X-Gone", "1")
            .extra_http_headers(replacement)
            .build()
            .unwrap();

        assert_eq!(cfg.extra_http_headers.len(), 1);
        assert!(cfg.extra_http_headers.contains_key("X-Only"));
    }

    #[test]
    fn validation_errors() {
        assert_eq!(
            NetworkConfig::builder().event_capacity(0).build().unwrap_err(),
            NetworkConfigError::ZeroEventCapacity
        );
        assert_eq!(
            NetworkConfig::builder().extra_http_header(" ", "x").build().unwrap_err(),
            NetworkConfigError::EmptyHeaderName
        );
        assert_eq!(
            NetworkConfig::builder().user_agent("").build().unwrap_err(),
            NetworkConfigError::EmptyUserAgent
        );
    }

    #[test]
    fn with_applies_closure() {
        let cfg = NetworkConfig::builder()
            .with(|c| {
                c.request_interception = true;
                c.event_capacity = 4;
            })
            .build()
            .unwrap();
        assert!(cfg.request_interception);
        assert_eq!(cfg.event_capacity, 4);
    }

    #[test]
    fn error_display() {
        assert_eq!(
            NetworkConfigError::ZeroEventCapacity.to_string(),
            "event_capacity must be at least 1"
        );
    }
}
