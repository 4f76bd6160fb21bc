//! Errors - エラー型
//!
//! 層ごとに thiserror の enum を分けています。
//! - HookError: hook / transformer が返す失敗（ErrorPolicy が分類する）
//! - ProcessError: ループを止める失敗
//! - PersistenceError: 保存・読込の失敗
//! - EngineError: 公開 API の失敗

use thiserror::Error;

use super::{ActionId, ActionType};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by a hook or a transformer.
#[derive(Debug, Error)]
#[error("hook failed: {message}")]
pub struct HookError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error, keeping it reachable through `source()`.
    pub fn from_source(source: impl Into<BoxError>) -> Self {
        let source = source.into();
        Self {
            message: source.to_string(),
            source: Some(source),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure that halts the processing loop. The head stays in the live queue.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("no hook registered for action_type={0}")]
    HookNotFound(ActionType),

    #[error("fatal error while processing {action_id}: {source}")]
    Fatal {
        action_id: ActionId,
        #[source]
        source: HookError,
    },
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("persistence writer is closed")]
    WriterClosed,

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("action_type={0} has no registered hook")]
    UnregisteredActionType(ActionType),

    #[error("engine driver is already running")]
    AlreadyStarted,

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn hook_error_display_is_never_empty() {
        let err = HookError::new("");
        assert_eq!(err.to_string(), "hook failed: ");
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn hook_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "request timed out");
        let err = HookError::from_source(io);

        assert_eq!(err.message(), "request timed out");
        assert!(err.source().is_some());
    }

    #[test]
    fn fatal_error_mentions_action() {
        let id = ActionId::from_ulid(ulid::Ulid::new());
        let err = ProcessError::Fatal {
            action_id: id,
            source: HookError::new("401"),
        };
        let msg = err.to_string();
        assert!(msg.contains(&id.to_string()));
        assert!(msg.contains("401"));
    }
}
