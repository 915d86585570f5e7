pub mod engine;
pub mod net;
pub mod transport;

pub use engine::*;
pub use net::{ContinueOverrides, CorrelationKey, Headers, Request, RequestKey, Response};
pub use transport::{Transport, TransportError};
