//! Connectivity port - オンライン状態の通知
//!
//! 検出の仕組み自体は外部に任せ、Engine は bool の変化だけを購読します。

use tokio::sync::watch;

/// Source of the boolean "online" signal.
///
/// The engine reads the current value before every step and subscribes once
/// in `Engine::start`; only a transition to `true` restarts the loop.
pub trait Connectivity: Send + Sync {
    fn subscribe(&self) -> watch::Receiver<bool>;
}
