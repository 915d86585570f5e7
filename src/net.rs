//! Network entities: requests, responses and the correlation machinery that pairs the
//! two event sources of interception mode.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Correlation keys, URL normalization and `data:` detection.
pub mod correlation;
/// Header map type and lookups.
pub mod headers;
/// Unmatched will-be-sent ids and interceptions.
pub mod pending;
/// Request entity.
pub mod request;
/// Response entity.
pub mod response;

pub use correlation::CorrelationKey;
pub use headers::Headers;
pub use request::{ContinueOverrides, Request, RequestKey};
pub use response::Response;

/// Locks `mutex`, recovering the data of a poisoned lock. Every critical section in this
/// crate leaves its data consistent, so a panic elsewhere does not invalidate it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
