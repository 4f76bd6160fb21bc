//! Persistence port - キューのスナップショット保存
//!
//! # 設計原則
//! - 受け取るのは常に所有権付きのコピー（Vec）で、Engine の state は参照しない
//! - 呼び出しは Engine 内の writer タスクから直列に行われる
//! - read は起動時の復元でのみ使う

use async_trait::async_trait;

use crate::domain::{Action, DeadLetterItem, PersistenceError};

/// Durable storage for the live queue and the dead-letter queue.
///
/// Every `save_*` replaces the whole stored snapshot. Order of the given
/// items must be kept so that `read_*` returns them in the same order.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn save_queue(&self, items: Vec<Action>) -> Result<(), PersistenceError>;

    async fn save_dead_letter_queue(
        &self,
        items: Vec<DeadLetterItem>,
    ) -> Result<(), PersistenceError>;

    async fn read_queue(&self) -> Result<Vec<Action>, PersistenceError>;

    async fn read_dead_letter_queue(&self) -> Result<Vec<DeadLetterItem>, PersistenceError>;
}
