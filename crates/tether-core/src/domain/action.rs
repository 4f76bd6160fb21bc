//! Action and DeadLetterItem: the two records the engine owns.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ulid::Ulid;

use super::ids::ActionId;

/// Name of an effect kind, used as the registry key (e.g. `"todo.create"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionType(String);

impl ActionType {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ActionType {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// An effect to perform plus its input.
///
/// Immutable once created. The payload is opaque to the engine; only the
/// registered transformer and hook for `action_type` interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub payload: Value,
}

impl Action {
    /// Create an action with a fresh id.
    pub fn new(action_type: impl Into<ActionType>, payload: Value) -> Self {
        Self::with_id(ActionId::from_ulid(Ulid::new()), action_type, payload)
    }

    pub fn with_id(id: ActionId, action_type: impl Into<ActionType>, payload: Value) -> Self {
        Self {
            id,
            action_type: action_type.into(),
            payload,
        }
    }
}

/// A failed action captured for diagnostics.
///
/// Built only by the dead-letter router. `payload` is the dead-letter
/// transform output (or the original payload when none is registered).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterItem {
    pub id: ActionId,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub entities: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub error: String,
}
