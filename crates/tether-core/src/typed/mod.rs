//! Typed - action_type ごとに差し込む処理
//!
//! - **Hook**: 外部への実行（必須）
//! - **Transformer**: hook 実行前の変換（任意、無ければ素通し）
//! - **DeadLetterTransformer**: dead-letter 記録時の変換（任意）
//! - **ErrorPolicy**: 失敗の分類

pub mod hook;
pub mod policy;
pub mod registry;
pub mod transform;

pub use self::hook::{FnHook, Hook};
pub use self::policy::{AlwaysRecoverable, ErrorClass, ErrorPolicy};
pub use self::registry::{ActionRegistry, RegistryError};
pub use self::transform::{DeadLetterPayload, DeadLetterTransformer, Transformed, Transformer};
