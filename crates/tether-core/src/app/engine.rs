//! Engine - オフライン対応の単一実行キュー
//!
//! # 状態
//! - live queue / dead-letter queue（Engine だけが所有する）
//! - LoopState（listening と processing の二つのガード）
//!
//! # ループ
//! `listen()` が head を一つずつ `run_once()` に渡します。
//! - 成功: head を外して保存
//! - recoverable な失敗: dead-letter に移して head を外し、両方保存
//! - fatal な失敗: head を残したままループ停止（次のトリガーで再開）
//!
//! state は std の Mutex で守り、await を跨いで保持しません。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::processor::{ProcessOutcome, Processor};
use super::status::EngineStatus;
use super::writer::{PendingWrite, SnapshotWriter};
use crate::config::{Durability, EngineConfig};
use crate::domain::{
    Action, ActionId, ActionType, DeadLetterItem, EngineError, PersistenceError, ProcessError,
    QueueEvent,
};
use crate::ports::{Connectivity, EventSink, IdGenerator};
use crate::queue::{ListenTicket, LoopState, Queue};
use crate::typed::{ActionRegistry, ErrorPolicy};

/// Why `listen()` returned.
#[derive(Debug)]
pub enum LoopExit {
    /// Another `listen()` was already running; nothing was done.
    AlreadyListening,
    /// The live queue is empty.
    Drained,
    /// Connectivity is down. Reconnecting restarts the loop.
    Offline,
    /// `stop_listening()` was called.
    Stopped,
    /// A fatal error. The failed action is still the head.
    Halted(ProcessError),
}

/// Result of a single `run_once()` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Busy, empty, or offline.
    Skipped,
    Processed(ActionId),
    DeadLettered(ActionId),
}

struct EngineState {
    queue: Queue<Action>,
    dead_letters: Queue<DeadLetterItem>,
    loop_state: LoopState,
}

impl EngineState {
    fn remove_head(&mut self, expected: ActionId) {
        let found = self.queue.head().map(|a| a.id);
        if found == Some(expected) {
            self.queue.dequeue();
        } else {
            warn!(
                expected = %expected,
                found = ?found,
                "head changed while processing; leaving queue untouched"
            );
        }
    }
}

/// Everything the builder wires into an engine.
pub(crate) struct EngineParts {
    pub queue: Vec<Action>,
    pub dead_letters: Vec<DeadLetterItem>,
    pub registry: Arc<ActionRegistry>,
    pub processor: Processor,
    pub policy: Arc<dyn ErrorPolicy>,
    pub writer: SnapshotWriter,
    pub connectivity: Arc<dyn Connectivity>,
    pub events: Arc<dyn EventSink>,
    pub ids: Box<dyn IdGenerator>,
    pub config: EngineConfig,
}

pub struct Engine {
    state: Mutex<EngineState>,
    registry: Arc<ActionRegistry>,
    processor: Processor,
    policy: Arc<dyn ErrorPolicy>,
    writer: SnapshotWriter,
    connectivity: Arc<dyn Connectivity>,
    online: watch::Receiver<bool>,
    events: Arc<dyn EventSink>,
    ids: Box<dyn IdGenerator>,
    config: EngineConfig,
    trigger: Notify,
    /// Signalled whenever a step finishes.
    step_done: Notify,
    driver_running: AtomicBool,
}

impl Engine {
    pub(crate) fn from_parts(parts: EngineParts) -> Self {
        let online = parts.connectivity.subscribe();
        Self {
            state: Mutex::new(EngineState {
                queue: Queue::from_items(parts.queue),
                dead_letters: Queue::from_items(parts.dead_letters),
                loop_state: LoopState::default(),
            }),
            registry: parts.registry,
            processor: parts.processor,
            policy: parts.policy,
            writer: parts.writer,
            connectivity: parts.connectivity,
            online,
            events: parts.events,
            ids: parts.ids,
            config: parts.config,
            trigger: Notify::new(),
            step_done: Notify::new(),
            driver_running: AtomicBool::new(false),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create an action with an id from the engine's generator.
    pub fn action(&self, action_type: impl Into<ActionType>, payload: Value) -> Action {
        Action::with_id(self.ids.generate_action_id(), action_type, payload)
    }

    /// Append an action and wake the loop.
    pub async fn enqueue(&self, action: Action) -> Result<ActionId, EngineError> {
        if self.config.reject_unregistered && !self.registry.has_hook(&action.action_type) {
            warn!(action_type = %action.action_type, "rejecting action without a hook");
            return Err(EngineError::UnregisteredActionType(action.action_type));
        }

        let action_id = action.id;
        let action_type = action.action_type.clone();
        let (write, queue_size) = {
            let mut state = self.lock_state();
            state.queue.enqueue(action);
            (self.writer.save_queue(state.queue.snapshot()), state.queue.size())
        };

        info!(action_id = %action_id, action_type = %action_type, queue_size, "action enqueued");
        self.events.emit(&QueueEvent::Enqueued {
            action_id,
            action_type,
            queue_size,
        });

        let written = self.settle(write).await;
        self.trigger();
        written?;
        Ok(action_id)
    }

    /// Drop every dead-letter entry. Returns how many were removed.
    pub async fn clear_dead_letter_queue(&self) -> Result<usize, EngineError> {
        let (removed, write) = {
            let mut state = self.lock_state();
            let removed = state.dead_letters.clear();
            (removed, self.writer.save_dead_letter_queue(Vec::new()))
        };

        info!(removed, "dead-letter queue cleared");
        self.events
            .emit(&QueueEvent::DeadLetterQueueCleared { removed });

        self.settle(write).await?;
        Ok(removed)
    }

    pub fn queue_size(&self) -> usize {
        self.lock_state().queue.size()
    }

    pub fn dead_letter_size(&self) -> usize {
        self.lock_state().dead_letters.size()
    }

    pub fn queue_snapshot(&self) -> Vec<Action> {
        self.lock_state().queue.snapshot()
    }

    pub fn dead_letter_snapshot(&self) -> Vec<DeadLetterItem> {
        self.lock_state().dead_letters.snapshot()
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    pub fn status(&self) -> EngineStatus {
        let state = self.lock_state();
        EngineStatus {
            queue_size: state.queue.size(),
            dead_letter_size: state.dead_letters.size(),
            listening: state.loop_state.listening,
            processing: state.loop_state.status,
            online: self.is_online(),
            pending_writes: self.writer.pending_writes(),
        }
    }

    pub fn pending_writes(&self) -> usize {
        self.writer.pending_writes()
    }

    /// Wait until every snapshot taken so far has reached storage.
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        self.writer.flush().await
    }

    /// Ask the driver (if started) to run `listen()`.
    ///
    /// Intended for application lifecycle signals such as returning to the
    /// foreground or a background task firing.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Make a running `listen()` exit after its in-flight step.
    pub fn stop_listening(&self) {
        self.lock_state().loop_state.stop_listening();
    }

    /// Drain the live queue while online.
    ///
    /// Idempotent: a second concurrent call returns `AlreadyListening`.
    /// Dropping the future (timeout, abort, panic in a hook) releases the
    /// loop, so the next trigger can start a new one.
    pub async fn listen(&self) -> LoopExit {
        let claimed = self.lock_state().loop_state.try_start_listening();
        let Some(ticket) = claimed else {
            debug!("loop already listening");
            return LoopExit::AlreadyListening;
        };
        let _listening = ListenGuard {
            engine: self,
            ticket,
        };
        debug!("loop started");

        loop {
            // 条件の確認と listening=false は enqueue と同じロックの中で行う
            if let Some(exit) = self.check_continue(ticket) {
                debug!(?exit, "loop exited");
                return exit;
            }

            match self.run_once().await {
                Ok(StepOutcome::Skipped) => self.wait_for_foreign_step().await,
                Ok(_) => {}
                Err(err) => {
                    let action_id = {
                        let mut state = self.lock_state();
                        state.loop_state.stop_listening_as(ticket);
                        state.queue.head().map(|a| a.id)
                    };
                    warn!(error = %err, "loop halted; waiting for the next trigger");
                    self.events.emit(&QueueEvent::Halted {
                        action_id,
                        error: err.to_string(),
                    });
                    return LoopExit::Halted(err);
                }
            }
        }
    }

    fn check_continue(&self, ticket: ListenTicket) -> Option<LoopExit> {
        let mut state = self.lock_state();
        let exit = if !state.loop_state.is_listening_as(ticket) {
            return Some(LoopExit::Stopped);
        } else if state.queue.is_empty() {
            LoopExit::Drained
        } else if !self.is_online() {
            LoopExit::Offline
        } else {
            return None;
        };
        state.loop_state.stop_listening_as(ticket);
        Some(exit)
    }

    /// A `Skipped` step inside `listen()` means another caller's `run_once`
    /// holds the step, or the queue/connectivity changed since the check.
    /// Only the first case is worth waiting for.
    async fn wait_for_foreign_step(&self) {
        // notify_one keeps a permit, so a step that ends before we await is not missed
        let busy = self.lock_state().loop_state.is_processing();
        if busy {
            self.step_done.notified().await;
        }
    }

    /// Process the head once, if idle, non-empty and online.
    pub async fn run_once(&self) -> Result<StepOutcome, ProcessError> {
        let head = {
            let mut state = self.lock_state();
            if !self.is_online() {
                return Ok(StepOutcome::Skipped);
            }
            let Some(head) = state.queue.head().cloned() else {
                return Ok(StepOutcome::Skipped);
            };
            if !state.loop_state.try_begin_step() {
                return Ok(StepOutcome::Skipped);
            }
            head
        };
        let _step = StepGuard { engine: self };

        debug!(action_id = %head.id, action_type = %head.action_type, "processing head");
        let outcome = self.processor.process(&head, self.policy.as_ref()).await?;

        match outcome {
            ProcessOutcome::Executed => {
                let (write, queue_size) = {
                    let mut state = self.lock_state();
                    state.remove_head(head.id);
                    (self.writer.save_queue(state.queue.snapshot()), state.queue.size())
                };
                debug!(action_id = %head.id, queue_size, "action processed");
                self.events.emit(&QueueEvent::Processed {
                    action_id: head.id,
                    action_type: head.action_type,
                    queue_size,
                });
                self.settle_logged(write).await;
                Ok(StepOutcome::Processed(head.id))
            }
            ProcessOutcome::DeadLettered(item) => {
                // dead-letter への追加と head の削除は同じロック区間で
                let (dead_letter_write, queue_write, queue_size) = {
                    let mut state = self.lock_state();
                    state.dead_letters.enqueue(item.clone());
                    let dead_letter_write = self
                        .writer
                        .save_dead_letter_queue(state.dead_letters.snapshot());
                    state.remove_head(head.id);
                    let queue_write = self.writer.save_queue(state.queue.snapshot());
                    (dead_letter_write, queue_write, state.queue.size())
                };
                self.events
                    .emit(&QueueEvent::DeadLettered { item, queue_size });
                self.settle_logged(dead_letter_write).await;
                self.settle_logged(queue_write).await;
                Ok(StepOutcome::DeadLettered(head.id))
            }
        }
    }

    /// Spawn the driver task: restarts `listen()` on reconnect and on
    /// `trigger()`, and runs it once immediately.
    ///
    /// Only one driver runs at a time. Once its handle is shut down or
    /// dropped, `start` may be called again.
    pub fn start(self: &Arc<Self>) -> Result<EngineHandle, EngineError> {
        if self
            .driver_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("engine driver already running");
            return Err(EngineError::AlreadyStarted);
        }
        let connectivity = self.connectivity.subscribe();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(drive(Arc::clone(self), connectivity, shutdown_rx));
        Ok(EngineHandle {
            engine: Arc::clone(self),
            shutdown_tx,
            join,
        })
    }

    async fn settle(&self, write: PendingWrite) -> Result<(), PersistenceError> {
        match self.config.durability {
            Durability::FireAndForget => {
                drop(write);
                Ok(())
            }
            Durability::Acknowledged => write.wait().await,
        }
    }

    /// Loop-internal writes never stop the loop; failures are only logged
    /// (the writer already did).
    async fn settle_logged(&self, write: PendingWrite) {
        let _ = self.settle(write).await;
    }
}

/// Resets the single-flight guard on every exit from `run_once`,
/// including cancellation.
struct StepGuard<'a> {
    engine: &'a Engine,
}

impl Drop for StepGuard<'_> {
    fn drop(&mut self) {
        self.engine.lock_state().loop_state.end_step();
        self.engine.step_done.notify_one();
    }
}

/// Releases the outer loop on every exit from `listen`, including
/// cancellation and unwinding.
struct ListenGuard<'a> {
    engine: &'a Engine,
    ticket: ListenTicket,
}

impl Drop for ListenGuard<'_> {
    fn drop(&mut self) {
        self.engine
            .lock_state()
            .loop_state
            .stop_listening_as(self.ticket);
    }
}

/// Owns the driver task and its connectivity subscription.
///
/// Dropping the handle also stops the driver.
pub struct EngineHandle {
    engine: Arc<Engine>,
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl EngineHandle {
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn trigger(&self) {
        self.engine.trigger();
    }

    /// Stop listening, unsubscribe from connectivity and wait for the driver.
    ///
    /// An in-flight hook is not cancelled; its loop exits after the step.
    pub async fn shutdown(self) {
        self.engine.stop_listening();
        // ignore send error: the driver may already be gone
        let _ = self.shutdown_tx.send(true);
        let _ = self.join.await;
    }
}

async fn drive(
    engine: Arc<Engine>,
    mut connectivity: watch::Receiver<bool>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!("engine driver started");
    spawn_listen(&engine, "start");

    let mut connectivity_open = true;
    loop {
        tokio::select! {
            // sender が drop された場合（handle の drop）も止まる
            _ = shutdown_rx.changed() => break,
            changed = connectivity.changed(), if connectivity_open => {
                if changed.is_err() {
                    warn!("connectivity source closed; relying on triggers only");
                    connectivity_open = false;
                    continue;
                }
                let online = *connectivity.borrow_and_update();
                info!(online, "connectivity changed");
                if online {
                    spawn_listen(&engine, "reconnect");
                }
            }
            _ = engine.trigger.notified() => spawn_listen(&engine, "trigger"),
        }
    }
    engine.driver_running.store(false, Ordering::SeqCst);
    info!("engine driver stopped");
}

fn spawn_listen(engine: &Arc<Engine>, reason: &'static str) {
    let engine = Arc::clone(engine);
    tokio::spawn(async move {
        let exit = engine.listen().await;
        debug!(reason, ?exit, "listen finished");
    });
}
