//! Connectivity port
//!
//! The sync engine never asks the platform whether it is online; it asks a
//! [`ConnectivityPort`] handed to it by the caller.

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Source of the "are we online" signal
pub trait ConnectivityPort: Send + Sync {
    /// Current connectivity
    fn is_online(&self) -> bool;

    /// Receiver that observes every change of the online flag
    fn subscribe(&self) -> watch::Receiver<bool>;

    /// Call `callback` with the new value on every transition.
    ///
    /// Must be called inside a tokio runtime. The task ends when the port is
    /// dropped or the handle is aborted.
    fn on_change(&self, callback: Box<dyn Fn(bool) + Send + Sync>) -> JoinHandle<()> {
        let mut receiver = self.subscribe();
        tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let online = *receiver.borrow_and_update();
                callback(online);
            }
        })
    }
}

/// Connectivity flag driven by the host (network callbacks, CLI flags, tests)
#[derive(Debug)]
pub struct ConnectivityMonitor {
    sender: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    pub fn new(online: bool) -> Self {
        let (sender, _) = watch::channel(online);
        Self { sender }
    }

    /// Record the current state; subscribers are only woken on a change
    pub fn set_online(&self, online: bool) {
        let changed = self.sender.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        if changed {
            tracing::info!(
                "Connectivity changed: {}",
                if online { "online" } else { "offline" }
            );
        }
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivityPort for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}
