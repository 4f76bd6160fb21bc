//! BroadcastEventSink - イベントを tokio::sync::broadcast に流す
//!
//! emit は同期で、重い処理は受信側のタスクで行います。
//! 遅れた受信者はイベントを取りこぼします（Lagged）。

use tokio::sync::broadcast;

use crate::domain::QueueEvent;
use crate::ports::EventSink;

pub struct BroadcastEventSink {
    tx: broadcast::Sender<QueueEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn emit(&self, event: &QueueEvent) {
        // ignore send error: no subscribers
        let _ = self.tx.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events() {
        let sink = BroadcastEventSink::new(8);
        let mut rx = sink.subscribe();

        sink.emit(&QueueEvent::DeadLetterQueueCleared { removed: 2 });

        assert_eq!(
            rx.recv().await.unwrap(),
            QueueEvent::DeadLetterQueueCleared { removed: 2 }
        );
    }

    #[test]
    fn emit_without_subscribers_is_fine() {
        BroadcastEventSink::new(1).emit(&QueueEvent::DeadLetterQueueCleared { removed: 0 });
    }
}
