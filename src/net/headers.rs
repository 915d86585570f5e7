//! Header maps as delivered by the protocol.
//!
//! Header names are kept exactly as the protocol reported them. HTTP header names are
//! case-insensitive, so lookups go through [`header_value`] instead of indexing the map
//! directly.

use std::collections::HashMap;

/// Header name/value mapping. Keys are case-preserving, ordering is irrelevant.
pub type Headers = HashMap<String, String>;

/// Case-insensitive lookup of a single header value.
pub fn header_value<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    if let Some(v) = headers.get(name) {
        return Some(v.as_str());
    }

    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
