//! Correlation keys.
//!
//! In interception mode the protocol reports one logical request twice: once as
//! "will be sent" (carrying the request id) and once as "intercepted" (carrying the
//! interception id). Neither event references the other, so both are reduced to a
//! [`CorrelationKey`] computed from the request itself and paired on that.
//!
//! The key is the JSON serialization of the url, method, post data and the headers
//! minus the ones that differ between the two event sources. Headers are serialized
//! through a `BTreeMap`, so header order never influences the key. URLs go through
//! [`normalize_url`] first, so both sources agree on their spelling.

use crate::net::headers::Headers;
use crate::transport::protocol::RequestPayload;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Headers which are not reported identically by both event sources.
const IGNORED_HEADERS: [&str; 3] = [
    "Accept",
    "Referer",
    "X-DevTools-Emulate-Network-Conditions-Client-Id",
];

/// Opaque identity string of a logical request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyMaterial<'a> {
    url: &'a str,
    method: &'a str,
    post_data: Option<&'a str>,
    headers: BTreeMap<&'a str, &'a str>,
}

fn is_ignored(name: &str) -> bool {
    IGNORED_HEADERS.iter().any(|ignored| ignored.eq_ignore_ascii_case(name))
}

/// Computes the correlation key for the given request components.
pub fn correlation_key(url: &str, method: &str, post_data: Option<&str>, headers: &Headers) -> CorrelationKey {
    let material = KeyMaterial {
        url,
        method,
        post_data,
        headers: headers
            .iter()
            .filter(|(name, _)| !is_ignored(name))
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect(),
    };

    // Serializing borrowed strings and a BTreeMap cannot fail; the fallback keeps the
    // function total without panicking.
    let key = serde_json::to_string(&material)
        .unwrap_or_else(|_| format!("{method} {url} {}", post_data.unwrap_or_default()));

    CorrelationKey(key)
}

/// Computes the correlation key of a protocol request payload.
pub fn payload_key(payload: &RequestPayload) -> CorrelationKey {
    correlation_key(
        &payload.url,
        &payload.method,
        payload.post_data.as_deref(),
        &payload.headers,
    )
}

/// Canonical, fragment-free form of a URL. Interception events may carry a fragment and
/// a differently cased scheme or host, will-be-sent events never do. URLs that do not
/// parse are returned unchanged.
pub fn normalize_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.into()
        }
        Err(e) => {
            log::trace!("keeping unparsable url {raw:?} as is: {e}");
            raw.to_string()
        }
    }
}

/// Inline `data:` URLs are never intercepted by the protocol.
pub fn is_data_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|url| url.scheme() == "data")
}
