//! Transformers - hook 実行前と dead-letter 記録時の payload 変換
//!
//! 二つは意図的に別物です。実行に必要な形と、診断用に保存したい形は
//! 一致するとは限りません。

use serde_json::{Map, Value};

use crate::domain::HookError;

/// Output of a live transform: the entity id and the payload the hook sees.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed {
    pub id: String,
    pub payload: Value,
}

impl Transformed {
    pub fn new(id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }

    /// Pass-through used when no transformer is registered.
    ///
    /// The entity id is the payload's top-level `"id"` string, or empty.
    pub fn passthrough(payload: &Value) -> Self {
        let id = payload
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self {
            id,
            payload: payload.clone(),
        }
    }
}

/// Reshapes a payload before the hook runs. Failing here is treated like a
/// hook failure.
pub trait Transformer: Send + Sync {
    fn transform(&self, payload: &Value) -> Result<Transformed, HookError>;
}

impl<F> Transformer for F
where
    F: Fn(&Value) -> Result<Transformed, HookError> + Send + Sync,
{
    fn transform(&self, payload: &Value) -> Result<Transformed, HookError> {
        self(payload)
    }
}

/// Output of a dead-letter transform.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeadLetterPayload {
    pub payload: Value,
    pub entities: Map<String, Value>,
}

impl DeadLetterPayload {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            entities: Map::new(),
        }
    }

    pub fn with_entity(mut self, key: impl Into<String>, value: Value) -> Self {
        self.entities.insert(key.into(), value);
        self
    }
}

/// Reshapes a failed action's payload for diagnostic storage.
pub trait DeadLetterTransformer: Send + Sync {
    fn transform(&self, payload: &Value) -> DeadLetterPayload;
}

impl<F> DeadLetterTransformer for F
where
    F: Fn(&Value) -> DeadLetterPayload + Send + Sync,
{
    fn transform(&self, payload: &Value) -> DeadLetterPayload {
        self(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!({"id": "todo-1", "title": "milk"}), "todo-1")]
    #[case(json!({"title": "milk"}), "")]
    #[case(json!({"id": 42}), "")]
    #[case(json!("bare string"), "")]
    fn passthrough_takes_id_from_payload(#[case] payload: Value, #[case] expected_id: &str) {
        let out = Transformed::passthrough(&payload);
        assert_eq!(out.id, expected_id);
        assert_eq!(out.payload, payload);
    }

    #[test]
    fn closures_are_transformers() {
        let t = |p: &Value| -> Result<Transformed, HookError> {
            Ok(Transformed::new("local-7", json!({"name": p["title"]})))
        };
        let out = Transformer::transform(&t, &json!({"title": "milk"})).unwrap();
        assert_eq!(out, Transformed::new("local-7", json!({"name": "milk"})));
    }

    #[test]
    fn closures_are_dead_letter_transformers() {
        let t = |p: &Value| DeadLetterPayload::new(json!({"title": p["title"]})).with_entity("todo", p.clone());
        let out = DeadLetterTransformer::transform(&t, &json!({"title": "milk", "secret": 1}));
        assert_eq!(out.payload, json!({"title": "milk"}));
        assert_eq!(out.entities["todo"]["secret"], 1);
    }
}
