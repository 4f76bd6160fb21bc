//! App - アプリケーション層
//!
//! ports と typed を組み合わせて Engine を組み立てます。
//!
//! # 主要コンポーネント
//! - **EngineBuilder**: 構築と起動時検証
//! - **Engine**: キューと処理ループ
//! - **Processor**: transform → execute → classify
//! - **DeadLetterRouter**: 失敗した action を DeadLetterItem に
//! - **SnapshotWriter**: Persistence への直列書き込み

pub mod builder;
pub mod dead_letter;
pub mod engine;
pub mod processor;
pub mod status;
pub mod writer;

pub use self::builder::{BuildError, EngineBuilder};
pub use self::dead_letter::DeadLetterRouter;
pub use self::engine::{Engine, EngineHandle, LoopExit, StepOutcome};
pub use self::processor::{ProcessOutcome, Processor};
pub use self::status::EngineStatus;
pub use self::writer::{PendingWrite, SnapshotWriter};
