//! EventSink port - イベント通知の抽象化
//!
//! # 通知の契約
//! - 同期呼び出し（emit が戻るまで Engine は次へ進まない）
//! - state のロックは解放済みなので、emit の中から Engine を読んでもよい
//! - 重い処理はチャネルに流すこと（BroadcastEventSink を参照）

use crate::domain::QueueEvent;

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &QueueEvent);
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: &QueueEvent) {}
}
