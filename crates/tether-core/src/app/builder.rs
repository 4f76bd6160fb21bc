//! EngineBuilder - Engine の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - expect_action_types() で期待される action_type を登録
//! - build() 時に「期待集合 ⊆ hook 登録済み集合」をチェック
//! - 不足があれば BuildError を返す
//!
//! hook が無いのは設定ミスであって、実行時に回復できる失敗ではありません。

use std::sync::Arc;

use tracing::{info, warn};

use super::dead_letter::DeadLetterRouter;
use super::engine::{Engine, EngineParts};
use super::processor::Processor;
use super::writer::SnapshotWriter;
use crate::config::{Durability, EngineConfig};
use crate::domain::{ActionType, PersistenceError};
use crate::ports::{Clock, Connectivity, EventSink, NoopEventSink, Persistence, SystemClock, UlidGenerator};
use crate::typed::{
    ActionRegistry, AlwaysRecoverable, DeadLetterTransformer, ErrorPolicy, Hook, RegistryError,
    Transformer,
};

/// BuildError は Engine 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing hooks for action types: {0:?}. These types were expected but not registered.")]
    MissingHooks(Vec<String>),

    #[error("failed to restore queues from persistence: {0}")]
    Restore(#[source] PersistenceError),
}

/// Builds an [`Engine`].
///
/// # 使用例
/// ```ignore
/// let engine = EngineBuilder::new()
///     .register_hook("todo.create", FnHook::new(create_todo))?
///     .register_transformer("todo.create", to_remote_todo)?
///     .expect_action_types(&["todo.create"])
///     .build(persistence, connectivity)
///     .await?;
/// let handle = engine.start();
/// ```
pub struct EngineBuilder {
    registry: ActionRegistry,
    config: EngineConfig,
    policy: Arc<dyn ErrorPolicy>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::from_config(EngineConfig::default())
    }

    pub fn from_config(config: EngineConfig) -> Self {
        Self {
            registry: ActionRegistry::new(),
            config,
            policy: Arc::new(AlwaysRecoverable),
            events: Arc::new(NoopEventSink),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn register_hook<H: Hook + 'static>(
        mut self,
        action_type: impl Into<ActionType>,
        hook: H,
    ) -> Result<Self, RegistryError> {
        self.registry.register_hook(action_type, hook)?;
        Ok(self)
    }

    pub fn register_transformer<T: Transformer + 'static>(
        mut self,
        action_type: impl Into<ActionType>,
        transformer: T,
    ) -> Result<Self, RegistryError> {
        self.registry.register_transformer(action_type, transformer)?;
        Ok(self)
    }

    pub fn register_dead_letter_transformer<T: DeadLetterTransformer + 'static>(
        mut self,
        action_type: impl Into<ActionType>,
        transformer: T,
    ) -> Result<Self, RegistryError> {
        self.registry
            .register_dead_letter_transformer(action_type, transformer)?;
        Ok(self)
    }

    /// Action types that must have a hook. Adds to the configured list.
    pub fn expect_action_types(mut self, action_types: &[&str]) -> Self {
        for &action_type in action_types {
            self.config.expected_action_types.push(action_type.to_string());
        }
        self
    }

    pub fn error_policy<P: ErrorPolicy + 'static>(mut self, policy: P) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn durability(mut self, durability: Durability) -> Self {
        self.config.durability = durability;
        self
    }

    /// Validate the registry, restore both queues and spawn the writer.
    ///
    /// Must be called inside a tokio runtime. The loop does not run until
    /// `Engine::start` or `Engine::listen` is called.
    pub async fn build(
        self,
        persistence: Arc<dyn Persistence>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Result<Arc<Engine>, BuildError> {
        let missing: Vec<String> = self
            .config
            .expected_action_types
            .iter()
            .filter(|ty| !self.registry.has_hook(&ActionType::new(ty.as_str())))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(BuildError::MissingHooks(missing));
        }

        info!(action_types = ?self.registry.registered_types(), "hooks registered");

        let queue = persistence.read_queue().await.map_err(BuildError::Restore)?;
        let dead_letters = persistence
            .read_dead_letter_queue()
            .await
            .map_err(BuildError::Restore)?;

        for action in queue.iter().filter(|a| !self.registry.has_hook(&a.action_type)) {
            warn!(
                action_id = %action.id,
                action_type = %action.action_type,
                "restored action has no hook; the loop will halt on it"
            );
        }
        info!(
            queue_size = queue.len(),
            dead_letter_size = dead_letters.len(),
            "restored queues"
        );

        let registry = Arc::new(self.registry);
        let router = DeadLetterRouter::new(Arc::clone(&registry), Arc::clone(&self.clock));
        let processor = Processor::new(Arc::clone(&registry), router);
        // writer タスクは SnapshotWriter が drop されると終わるので join は持たない
        let (writer, _join) = SnapshotWriter::spawn(persistence);

        Ok(Arc::new(Engine::from_parts(EngineParts {
            queue,
            dead_letters,
            registry,
            processor,
            policy: self.policy,
            writer,
            connectivity,
            events: self.events,
            ids: Box::new(UlidGenerator::new(self.clock)),
            config: self.config,
        })))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
