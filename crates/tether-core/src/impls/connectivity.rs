//! WatchConnectivity - tokio::sync::watch で作る接続状態
//!
//! 実際の検出（OS の通知など）をする側が `set_online` を呼びます。

use tokio::sync::watch;

use crate::ports::Connectivity;

pub struct WatchConnectivity {
    tx: watch::Sender<bool>,
}

impl WatchConnectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx }
    }

    /// Publish the current state. Subscribers are only woken on a change.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Connectivity for WatchConnectivity {
    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
