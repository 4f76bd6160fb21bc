//! SnapshotWriter - Persistence への書き込みを一本のタスクで直列化する
//!
//! # 設計
//! - Engine は state のロック中に snapshot を送る → 変更順と書き込み順が一致する
//! - 送った側は PendingWrite を await してもよいし、捨ててもよい
//! - pending_writes() で「メモリが先行している書き込み数」が見える

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::{Action, DeadLetterItem, PersistenceError};
use crate::ports::Persistence;

type Ack = oneshot::Sender<Result<(), PersistenceError>>;

enum WriteCommand {
    Queue(Vec<Action>, Ack),
    DeadLetters(Vec<DeadLetterItem>, Ack),
    Flush(oneshot::Sender<()>),
}

/// Acknowledgement of one submitted snapshot.
///
/// Dropping it does not cancel the write.
#[must_use = "await the write or drop it explicitly"]
pub struct PendingWrite {
    rx: oneshot::Receiver<Result<(), PersistenceError>>,
}

impl PendingWrite {
    pub async fn wait(self) -> Result<(), PersistenceError> {
        self.rx.await.unwrap_or(Err(PersistenceError::WriterClosed))
    }
}

/// Handle to the background writer task.
pub struct SnapshotWriter {
    tx: mpsc::UnboundedSender<WriteCommand>,
    pending: Arc<AtomicUsize>,
}

impl SnapshotWriter {
    /// Spawn the writer task. It exits once every `SnapshotWriter` is dropped.
    pub fn spawn(persistence: Arc<dyn Persistence>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        let join = tokio::spawn(write_loop(persistence, rx, Arc::clone(&pending)));
        (Self { tx, pending }, join)
    }

    pub fn save_queue(&self, items: Vec<Action>) -> PendingWrite {
        self.submit(|ack| WriteCommand::Queue(items, ack))
    }

    pub fn save_dead_letter_queue(&self, items: Vec<DeadLetterItem>) -> PendingWrite {
        self.submit(|ack| WriteCommand::DeadLetters(items, ack))
    }

    /// Wait until every snapshot submitted before this call has been written.
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(WriteCommand::Flush(done_tx))
            .map_err(|_| PersistenceError::WriterClosed)?;
        done_rx.await.map_err(|_| PersistenceError::WriterClosed)
    }

    /// Snapshots handed over but not yet acknowledged by storage.
    pub fn pending_writes(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    fn submit(&self, command: impl FnOnce(Ack) -> WriteCommand) -> PendingWrite {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(command(ack_tx)).is_err() {
            // ack_tx は command と一緒に捨てられるので wait() は WriterClosed になる
            self.pending.fetch_sub(1, Ordering::SeqCst);
            warn!("persistence writer is gone; snapshot dropped");
        }
        PendingWrite { rx: ack_rx }
    }
}

async fn write_loop(
    persistence: Arc<dyn Persistence>,
    mut rx: mpsc::UnboundedReceiver<WriteCommand>,
    pending: Arc<AtomicUsize>,
) {
    while let Some(command) = rx.recv().await {
        let (result, ack, what) = match command {
            WriteCommand::Queue(items, ack) => {
                let len = items.len();
                debug!(len, "saving queue snapshot");
                (persistence.save_queue(items).await, ack, "queue")
            }
            WriteCommand::DeadLetters(items, ack) => {
                let len = items.len();
                debug!(len, "saving dead-letter snapshot");
                (
                    persistence.save_dead_letter_queue(items).await,
                    ack,
                    "dead-letter queue",
                )
            }
            WriteCommand::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };

        if let Err(err) = &result {
            warn!(error = %err, snapshot = what, "failed to persist snapshot");
        }
        pending.fetch_sub(1, Ordering::SeqCst);
        // 受け手がいなくても構わない（fire-and-forget）
        let _ = ack.send(result);
    }
    debug!("persistence writer stopped");
}
