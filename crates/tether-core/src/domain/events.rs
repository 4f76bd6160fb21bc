//! Events - エンジンで発生したイベント
//!
//! EventSink に同期的に通知されます（state のロックは解放済み）。

use serde::Serialize;

use super::{ActionId, ActionType, DeadLetterItem};

/// Something observable the engine just did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueEvent {
    Enqueued {
        action_id: ActionId,
        action_type: ActionType,
        queue_size: usize,
    },
    /// The hook succeeded and the head was removed.
    Processed {
        action_id: ActionId,
        action_type: ActionType,
        queue_size: usize,
    },
    /// The hook failed with a recoverable error and the head moved to the
    /// dead-letter queue.
    DeadLettered {
        item: DeadLetterItem,
        queue_size: usize,
    },
    /// The loop stopped on a fatal error. The head is still queued.
    Halted {
        action_id: Option<ActionId>,
        error: String,
    },
    DeadLetterQueueCleared {
        removed: usize,
    },
}
