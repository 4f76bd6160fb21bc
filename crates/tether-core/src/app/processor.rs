//! Processor - 一つの action を transform → execute → classify する
//!
//! # フロー
//! 1. hook を引く（無ければ設定ミスなので常に fatal）
//! 2. transformer があれば適用、無ければ素通し
//! 3. hook 実行
//! 4. 失敗したら ErrorPolicy で分類
//!    - Recoverable: DeadLetterRouter で DeadLetterItem を作って正常終了
//!    - Fatal: ProcessError を返してループを止める

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::dead_letter::DeadLetterRouter;
use crate::domain::{Action, DeadLetterItem, HookError, ProcessError};
use crate::typed::{ActionRegistry, ErrorClass, ErrorPolicy, Transformed};

/// How a processed action was resolved. Both variants remove the head.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Executed,
    DeadLettered(DeadLetterItem),
}

pub struct Processor {
    registry: Arc<ActionRegistry>,
    router: DeadLetterRouter,
}

impl Processor {
    pub fn new(registry: Arc<ActionRegistry>, router: DeadLetterRouter) -> Self {
        Self { registry, router }
    }

    pub async fn process(
        &self,
        action: &Action,
        policy: &dyn ErrorPolicy,
    ) -> Result<ProcessOutcome, ProcessError> {
        let Some(hook) = self.registry.hook(&action.action_type) else {
            error!(
                action_id = %action.id,
                action_type = %action.action_type,
                "no hook registered; halting"
            );
            return Err(ProcessError::HookNotFound(action.action_type.clone()));
        };

        let result = match self.transform(action) {
            Ok(transformed) => {
                debug!(
                    action_id = %action.id,
                    action_type = %action.action_type,
                    entity_id = %transformed.id,
                    "executing hook"
                );
                hook.execute(&transformed.id, transformed.payload).await
            }
            Err(err) => Err(err),
        };

        let Err(err) = result else {
            return Ok(ProcessOutcome::Executed);
        };

        match policy.classify(&err) {
            ErrorClass::Recoverable => {
                warn!(
                    action_id = %action.id,
                    action_type = %action.action_type,
                    error = %err,
                    "recoverable failure; moving to dead-letter queue"
                );
                Ok(ProcessOutcome::DeadLettered(self.router.route(action, &err)))
            }
            ErrorClass::Fatal => Err(ProcessError::Fatal {
                action_id: action.id,
                source: err,
            }),
        }
    }

    fn transform(&self, action: &Action) -> Result<Transformed, HookError> {
        match self.registry.transformer(&action.action_type) {
            Some(transformer) => transformer.transform(&action.payload),
            None => Ok(Transformed::passthrough(&action.payload)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::SystemClock;
    use crate::typed::{AlwaysRecoverable, FnHook};
    use serde_json::{Value, json};
    use std::sync::Mutex;

    type Calls = Arc<Mutex<Vec<(String, Value)>>>;

    fn recording_hook(calls: Calls, fail_with: Option<&'static str>) -> impl crate::typed::Hook {
        FnHook::new(move |id: String, payload: Value| {
            let calls = Arc::clone(&calls);
            async move {
                calls.lock().unwrap().push((id, payload));
                match fail_with {
                    Some(msg) => Err(HookError::new(msg)),
                    None => Ok(()),
                }
            }
        })
    }

    fn processor(registry: ActionRegistry) -> Processor {
        let registry = Arc::new(registry);
        let router = DeadLetterRouter::new(Arc::clone(&registry), Arc::new(SystemClock));
        Processor::new(registry, router)
    }

    #[tokio::test]
    async fn passes_payload_through_without_transformer() {
        let calls = Calls::default();
        let mut registry = ActionRegistry::new();
        registry
            .register_hook("todo.create", recording_hook(Arc::clone(&calls), None))
            .unwrap();

        let action = Action::new("todo.create", json!({"id": "t-1", "title": "milk"}));
        let outcome = processor(registry)
            .process(&action, &AlwaysRecoverable)
            .await
            .unwrap();

        assert_eq!(outcome, ProcessOutcome::Executed);
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "t-1");
        assert_eq!(calls[0].1, action.payload);
    }

    #[tokio::test]
    async fn applies_transformer_before_hook() {
        let calls = Calls::default();
        let mut registry = ActionRegistry::new();
        registry
            .register_hook("todo.create", recording_hook(Arc::clone(&calls), None))
            .unwrap();
        registry
            .register_transformer("todo.create", |p: &Value| -> Result<Transformed, HookError> {
                Ok(Transformed::new("remote-9", json!({"name": p["title"]})))
            })
            .unwrap();

        let action = Action::new("todo.create", json!({"title": "milk"}));
        processor(registry)
            .process(&action, &AlwaysRecoverable)
            .await
            .unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0], ("remote-9".to_string(), json!({"name": "milk"})));
    }

    #[tokio::test]
    async fn recoverable_failure_builds_dead_letter_from_original_action() {
        let calls = Calls::default();
        let mut registry = ActionRegistry::new();
        registry
            .register_hook("todo.create", recording_hook(Arc::clone(&calls), Some("500")))
            .unwrap();
        registry
            .register_transformer("todo.create", |_p: &Value| -> Result<Transformed, HookError> {
                Ok(Transformed::new("x", json!("reshaped")))
            })
            .unwrap();

        let action = Action::new("todo.create", json!({"title": "milk"}));
        let outcome = processor(registry)
            .process(&action, &AlwaysRecoverable)
            .await
            .unwrap();

        let ProcessOutcome::DeadLettered(item) = outcome else {
            panic!("expected dead-lettered outcome");
        };
        assert_eq!(item.id, action.id);
        assert_eq!(item.payload, json!({"title": "milk"}));
        assert!(item.error.contains("500"));
    }

    #[tokio::test]
    async fn fatal_failure_is_returned() {
        let mut registry = ActionRegistry::new();
        registry
            .register_hook("todo.create", recording_hook(Calls::default(), Some("401")))
            .unwrap();

        let action = Action::new("todo.create", json!({}));
        let fatal = |_e: &HookError| ErrorClass::Fatal;
        let err = processor(registry).process(&action, &fatal).await.unwrap_err();

        assert!(matches!(err, ProcessError::Fatal { action_id, .. } if action_id == action.id));
    }

    #[tokio::test]
    async fn transform_failure_is_classified_like_hook_failure() {
        let calls = Calls::default();
        let mut registry = ActionRegistry::new();
        registry
            .register_hook("todo.create", recording_hook(Arc::clone(&calls), None))
            .unwrap();
        registry
            .register_transformer("todo.create", |_p: &Value| -> Result<Transformed, HookError> {
                Err(HookError::new("missing local entity"))
            })
            .unwrap();

        let action = Action::new("todo.create", json!({}));
        let outcome = processor(registry)
            .process(&action, &AlwaysRecoverable)
            .await
            .unwrap();

        assert!(matches!(outcome, ProcessOutcome::DeadLettered(_)));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_hook_is_never_dead_lettered() {
        let action = Action::new("todo.create", json!({}));
        let err = processor(ActionRegistry::new())
            .process(&action, &AlwaysRecoverable)
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessError::HookNotFound(ty) if ty.as_str() == "todo.create"));
    }
}
