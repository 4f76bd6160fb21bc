//! InMemoryPersistence - 開発・テスト用の Persistence
//!
//! 保存回数と失敗モードを持っているので、書き込み順や失敗時の挙動を
//! テストから観測できます。

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::domain::{Action, DeadLetterItem, PersistenceError};
use crate::ports::Persistence;

#[derive(Default)]
pub struct InMemoryPersistence {
    queue: Mutex<Vec<Action>>,
    dead_letters: Mutex<Vec<DeadLetterItem>>,
    queue_saves: AtomicUsize,
    dead_letter_saves: AtomicUsize,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with already-persisted snapshots (simulates a restart).
    pub fn with_snapshot(queue: Vec<Action>, dead_letters: Vec<DeadLetterItem>) -> Self {
        Self {
            queue: Mutex::new(queue),
            dead_letters: Mutex::new(dead_letters),
            ..Self::default()
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `save_queue` calls.
    pub fn queue_saves(&self) -> usize {
        self.queue_saves.load(Ordering::SeqCst)
    }

    /// Number of successful `save_dead_letter_queue` calls.
    pub fn dead_letter_saves(&self) -> usize {
        self.dead_letter_saves.load(Ordering::SeqCst)
    }

    pub fn read_queue_now(&self) -> Vec<Action> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn read_dead_letters_now(&self) -> Vec<DeadLetterItem> {
        self.dead_letters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn check_writes(&self) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Other("write failure injected".to_string()));
        }
        Ok(())
    }

    fn check_reads(&self) -> Result<(), PersistenceError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PersistenceError::Other("read failure injected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Persistence for InMemoryPersistence {
    async fn save_queue(&self, items: Vec<Action>) -> Result<(), PersistenceError> {
        self.check_writes()?;
        *self.queue.lock().unwrap_or_else(PoisonError::into_inner) = items;
        self.queue_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn save_dead_letter_queue(
        &self,
        items: Vec<DeadLetterItem>,
    ) -> Result<(), PersistenceError> {
        self.check_writes()?;
        *self
            .dead_letters
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = items;
        self.dead_letter_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read_queue(&self) -> Result<Vec<Action>, PersistenceError> {
        self.check_reads()?;
        Ok(self.read_queue_now())
    }

    async fn read_dead_letter_queue(&self) -> Result<Vec<DeadLetterItem>, PersistenceError> {
        self.check_reads()?;
        Ok(self.read_dead_letters_now())
    }
}
