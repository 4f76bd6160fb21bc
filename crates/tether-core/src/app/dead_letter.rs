//! DeadLetterRouter - 失敗した action を DeadLetterItem に作り替える
//!
//! 追加・削除・保存は Engine が一つのロック区間で行います
//! （live queue と dead-letter queue の両方に同時に存在させないため）。

use std::sync::Arc;

use serde_json::Map;

use crate::domain::{Action, DeadLetterItem, HookError};
use crate::ports::Clock;
use crate::typed::ActionRegistry;

pub struct DeadLetterRouter {
    registry: Arc<ActionRegistry>,
    clock: Arc<dyn Clock>,
}

impl DeadLetterRouter {
    pub fn new(registry: Arc<ActionRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    /// Build the dead-letter entry for `action` failing with `error`.
    ///
    /// Uses the dead-letter transformer for the action type when one is
    /// registered, otherwise keeps the original payload.
    pub fn route(&self, action: &Action, error: &HookError) -> DeadLetterItem {
        let (payload, entities) = match self.registry.dead_letter_transformer(&action.action_type) {
            Some(transformer) => {
                let out = transformer.transform(&action.payload);
                (out.payload, out.entities)
            }
            None => (action.payload.clone(), Map::new()),
        };

        DeadLetterItem {
            id: action.id,
            action_type: action.action_type.clone(),
            payload,
            entities,
            created_at: self.clock.now(),
            error: error.to_string(),
        }
    }
}
