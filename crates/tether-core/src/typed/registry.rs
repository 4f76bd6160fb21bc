//! ActionRegistry - action_type ごとの hook / transformer の登録
//!
//! # 学習ポイント
//! - HashMap での型消去された trait object の管理
//! - Arc による共有所有権（Processor と DeadLetterRouter が同じ registry を読む）
//!
//! 構築時（mutable）に登録し、実行時は読むだけです。ロックは不要。

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::ActionType;

use super::hook::Hook;
use super::transform::{DeadLetterTransformer, Transformer};

/// RegistryError は ActionRegistry の操作エラー
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("{kind} for action type '{action_type}' is already registered")]
    AlreadyRegistered {
        kind: &'static str,
        action_type: ActionType,
    },
}

/// Capabilities registered per action type.
///
/// A hook is mandatory for every type the engine will process. Transformers
/// are optional; their absence means pass-through.
#[derive(Default)]
pub struct ActionRegistry {
    hooks: HashMap<ActionType, Arc<dyn Hook>>,
    transformers: HashMap<ActionType, Arc<dyn Transformer>>,
    dead_letter_transformers: HashMap<ActionType, Arc<dyn DeadLetterTransformer>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_hook<H: Hook + 'static>(
        &mut self,
        action_type: impl Into<ActionType>,
        hook: H,
    ) -> Result<(), RegistryError> {
        insert_unique(&mut self.hooks, "hook", action_type.into(), Arc::new(hook))
    }

    pub fn register_transformer<T: Transformer + 'static>(
        &mut self,
        action_type: impl Into<ActionType>,
        transformer: T,
    ) -> Result<(), RegistryError> {
        insert_unique(
            &mut self.transformers,
            "transformer",
            action_type.into(),
            Arc::new(transformer),
        )
    }

    pub fn register_dead_letter_transformer<T: DeadLetterTransformer + 'static>(
        &mut self,
        action_type: impl Into<ActionType>,
        transformer: T,
    ) -> Result<(), RegistryError> {
        insert_unique(
            &mut self.dead_letter_transformers,
            "dead-letter transformer",
            action_type.into(),
            Arc::new(transformer),
        )
    }

    pub fn hook(&self, action_type: &ActionType) -> Option<Arc<dyn Hook>> {
        self.hooks.get(action_type).cloned()
    }

    pub fn transformer(&self, action_type: &ActionType) -> Option<Arc<dyn Transformer>> {
        self.transformers.get(action_type).cloned()
    }

    pub fn dead_letter_transformer(
        &self,
        action_type: &ActionType,
    ) -> Option<Arc<dyn DeadLetterTransformer>> {
        self.dead_letter_transformers.get(action_type).cloned()
    }

    pub fn has_hook(&self, action_type: &ActionType) -> bool {
        self.hooks.contains_key(action_type)
    }

    /// Action types with a hook, sorted for stable output.
    pub fn registered_types(&self) -> Vec<ActionType> {
        let mut types: Vec<ActionType> = self.hooks.keys().cloned().collect();
        types.sort();
        types
    }
}

fn insert_unique<V: ?Sized>(
    map: &mut HashMap<ActionType, Arc<V>>,
    kind: &'static str,
    action_type: ActionType,
    value: Arc<V>,
) -> Result<(), RegistryError> {
    if map.contains_key(&action_type) {
        return Err(RegistryError::AlreadyRegistered { kind, action_type });
    }
    map.insert(action_type, value);
    Ok(())
}
