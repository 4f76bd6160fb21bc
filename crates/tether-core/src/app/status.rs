//! Status - エンジンの現在の様子（観測用のコピー）

use serde::Serialize;

use crate::queue::ProcessingStatus;

/// Point-in-time view of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    pub queue_size: usize,
    pub dead_letter_size: usize,
    pub listening: bool,
    pub processing: ProcessingStatus,
    pub online: bool,
    /// Snapshots not yet acknowledged by storage.
    pub pending_writes: usize,
}
