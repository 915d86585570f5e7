//! Event pump.
//!
//! A [`NetworkWorker`] owns the receiving end of the raw event channel and hands every
//! `(method, params)` pair to its [`NetworkManager`] in arrival order. It stops when the
//! channel closes or the cancellation token fires.

use crate::engine::manager::NetworkManager;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Raw protocol event as delivered by a transport: method name and params.
pub type RawEvent = (String, Value);

pub struct NetworkWorker {
    manager: Arc<NetworkManager>,
    event_rx: mpsc::Receiver<RawEvent>,
}

impl NetworkWorker {
    pub fn new(manager: Arc<NetworkManager>, event_rx: mpsc::Receiver<RawEvent>) -> Self {
        Self { manager, event_rx }
    }

    /// Processes events until the channel closes or `cancel` fires. Returns the number of
    /// events handled.
    pub async fn run(mut self, cancel: CancellationToken) -> usize {
        let mut handled = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::debug!("network worker cancelled");
                    break;
                }
                msg = self.event_rx.recv() => {
                    let Some((method, params)) = msg else {
                        // Channel closed, exit the loop
                        break;
                    };

                    handled += 1;
                    if let Err(e) = self.manager.handle_raw(&method, params) {
                        log::error!("dropping event {method}: {e}");
                    }
                }
            }
        }

        log::debug!("network worker stopped after {handled} events");
        handled
    }
}
