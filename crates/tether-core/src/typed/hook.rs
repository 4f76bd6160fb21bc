//! Hook trait - action を外部へ届ける処理
//!
//! Hook は Engine の中で唯一 await で止まる処理です（通常はネットワーク呼び出し）。
//! Engine 側にタイムアウトはないので、止まり続ける hook はキュー全体を止めます。

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::HookError;

/// Performs the external effect for one action type.
///
/// `id` is the entity id produced by the transformer. Returning `Err`
/// signals failure; the engine's error policy decides what happens next.
#[async_trait]
pub trait Hook: Send + Sync {
    async fn execute(&self, id: &str, payload: Value) -> Result<(), HookError>;
}

/// Adapts an async closure into a [`Hook`].
///
/// # 使用例
/// ```ignore
/// let hook = FnHook::new(|id, payload| async move {
///     api.create_todo(&id, payload).await.map_err(HookError::from_source)
/// });
/// ```
pub struct FnHook<F> {
    f: F,
}

impl<F> FnHook<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Hook for FnHook<F>
where
    F: Fn(String, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HookError>> + Send + 'static,
{
    async fn execute(&self, id: &str, payload: Value) -> Result<(), HookError> {
        (self.f)(id.to_string(), payload).await
    }
}
