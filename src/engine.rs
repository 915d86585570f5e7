//! Network lifecycle engine: configuration, errors, notifications, the manager that
//! correlates protocol events and the worker that feeds it.

pub(crate) mod config;
pub(crate) mod errors;
pub(crate) mod events;
pub(crate) mod manager;
pub(crate) mod worker;

pub use config::{NetworkConfig, NetworkConfigBuilder, NetworkConfigError};
pub use errors::NetworkError;
pub use events::{NetworkEvent, Subscription};
pub use manager::NetworkManager;
pub use worker::{NetworkWorker, RawEvent};

/// Default capacity of the notification channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 512;
