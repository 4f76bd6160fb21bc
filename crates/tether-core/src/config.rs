//! Engine configuration.
//!
//! Deserializable so the application can keep it next to its own settings
//! (the CLI reads it from TOML). Every field has a default.

use serde::{Deserialize, Serialize};

/// When a mutation counts as done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    /// Return as soon as the snapshot is handed to the writer. In-memory state
    /// may run ahead of storage; `Engine::pending_writes` shows by how much.
    #[default]
    FireAndForget,
    /// Await the storage acknowledgement. `enqueue` and
    /// `clear_dead_letter_queue` report write failures to the caller.
    Acknowledged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub durability: Durability,

    /// Action types that must have a hook, checked by `EngineBuilder::build`.
    pub expected_action_types: Vec<String>,

    /// Reject `enqueue` for action types without a hook.
    pub reject_unregistered: bool,

    /// Buffer size for `BroadcastEventSink`.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            durability: Durability::default(),
            expected_action_types: Vec::new(),
            reject_unregistered: true,
            event_capacity: 64,
        }
    }
}
