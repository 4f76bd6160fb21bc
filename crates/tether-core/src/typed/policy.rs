//! ErrorPolicy - hook の失敗を recoverable / fatal に分類する

use crate::domain::HookError;

/// Classification of a hook failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Move the action to the dead-letter queue and continue.
    Recoverable,
    /// Halt the loop; the action stays at the head.
    Fatal,
}

pub trait ErrorPolicy: Send + Sync {
    fn classify(&self, error: &HookError) -> ErrorClass;
}

/// Default policy: every failure is recoverable.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRecoverable;

impl ErrorPolicy for AlwaysRecoverable {
    fn classify(&self, _error: &HookError) -> ErrorClass {
        ErrorClass::Recoverable
    }
}

impl<F> ErrorPolicy for F
where
    F: Fn(&HookError) -> ErrorClass + Send + Sync,
{
    fn classify(&self, error: &HookError) -> ErrorClass {
        self(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_recoverable() {
        assert_eq!(
            AlwaysRecoverable.classify(&HookError::new("boom")),
            ErrorClass::Recoverable
        );
    }

    #[test]
    fn closure_policy() {
        let policy = |e: &HookError| {
            if e.message().contains("offline") {
                ErrorClass::Fatal
            } else {
                ErrorClass::Recoverable
            }
        };
        assert_eq!(policy.classify(&HookError::new("offline")), ErrorClass::Fatal);
        assert_eq!(policy.classify(&HookError::new("400")), ErrorClass::Recoverable);
    }
}
