// imgflow/src/core/adapter.rs

//! Defines the `TaskAdapter` trait: the uniform callable unit each stage invokes.

use crate::core::context::ExecutionContext;
use crate::core::control::StageResult;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// A unit of work behind a stage.
///
/// Implementations receive the current context read-only and must not panic or return early
/// with an error: every fault is translated into `StageResult::Failure` so the engine has one
/// signal to branch on. Triggers are delivered at least once, so adapters should be idempotent
/// with respect to the item key where feasible. Each adapter bounds its own latency.
#[async_trait]
pub trait TaskAdapter: Send + Sync {
  async fn invoke(&self, ctx: &ExecutionContext) -> StageResult;
}

#[async_trait]
impl<T: TaskAdapter + ?Sized> TaskAdapter for Arc<T> {
  async fn invoke(&self, ctx: &ExecutionContext) -> StageResult {
    (**self).invoke(ctx).await
  }
}

/// Adapter built from an async closure.
///
/// The closure receives an owned snapshot of the context, so its future can be `'static`.
pub struct FnAdapter<F> {
  handler: F,
}

impl<F, Fut> FnAdapter<F>
where
  F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = StageResult> + Send + 'static,
{
  pub fn new(handler: F) -> Self {
    Self { handler }
  }
}

#[async_trait]
impl<F, Fut> TaskAdapter for FnAdapter<F>
where
  F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = StageResult> + Send + 'static,
{
  async fn invoke(&self, ctx: &ExecutionContext) -> StageResult {
    (self.handler)(ctx.clone()).await
  }
}
