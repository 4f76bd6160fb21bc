//! tether-core
//!
//! Offline-first action queue: actions are held durably while offline and
//! drained strictly in order, one at a time, once connectivity returns.
//! Failures either move the action to a dead-letter queue (recoverable) or
//! halt the loop with the action still at the head (fatal).
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（Action, DeadLetterItem, ids, errors, events）
//! - **queue**: FIFO コンテナとループの状態機械
//! - **ports**: 抽象化レイヤー（Persistence, Connectivity, Clock, EventSink, IdGenerator）
//! - **typed**: action_type ごとの Hook / Transformer / ErrorPolicy
//! - **app**: EngineBuilder, Engine, Processor, DeadLetterRouter
//! - **impls**: ports の実装（InMemory, JSON ファイル, watch, broadcast）
//! - **config**: EngineConfig

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod queue;
pub mod typed;

pub use app::{BuildError, Engine, EngineBuilder, EngineHandle, EngineStatus, LoopExit, StepOutcome};
pub use config::{Durability, EngineConfig};
pub use domain::{Action, ActionId, ActionType, DeadLetterItem, EngineError, HookError, QueueEvent};
