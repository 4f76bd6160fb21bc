//! Impls - ports の実装
//!
//! - InMemoryPersistence: 開発・テスト用
//! - JsonFilePersistence: ファイル保存
//! - WatchConnectivity: watch チャネルによる接続状態
//! - BroadcastEventSink: broadcast チャネルへのイベント配信

pub mod broadcast;
pub mod connectivity;
pub mod file;
pub mod memory;

pub use self::broadcast::BroadcastEventSink;
pub use self::connectivity::WatchConnectivity;
pub use self::file::JsonFilePersistence;
pub use self::memory::InMemoryPersistence;
