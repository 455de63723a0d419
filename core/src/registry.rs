// imgflow/src/registry.rs

//! Defines the `AdapterFactory` seam and `AdapterRegistry`, a name-keyed store of task adapters.
//! Stage definitions reference adapters by name; the engine resolves them once at construction.

use crate::core::adapter::{FnAdapter, TaskAdapter};
use crate::core::context::ExecutionContext;
use crate::core::control::StageResult;
use crate::core::stage::StageDefinition;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{event, Level};

/// Produces the adapter a stage should invoke.
pub trait AdapterFactory: Send + Sync {
  fn adapter_for(&self, stage: &StageDefinition) -> Option<Arc<dyn TaskAdapter>>;
}

#[derive(Default, Clone)]
pub struct AdapterRegistry {
  adapters: HashMap<String, Arc<dyn TaskAdapter>>,
}

impl AdapterRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers `adapter` under `name`, replacing any previous registration.
  pub fn register(&mut self, name: impl Into<String>, adapter: impl TaskAdapter + 'static) -> &mut Self {
    self.register_arc(name, Arc::new(adapter))
  }

  pub fn register_arc(&mut self, name: impl Into<String>, adapter: Arc<dyn TaskAdapter>) -> &mut Self {
    let name = name.into();
    event!(Level::DEBUG, adapter = %name, "Registering task adapter.");
    if self.adapters.insert(name.clone(), adapter).is_some() {
      event!(Level::WARN, adapter = %name, "Task adapter registration replaced an existing adapter.");
    }
    self
  }

  /// Registers an async closure as an adapter. The closure receives a snapshot of the context.
  pub fn register_fn<F, Fut>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
  where
    F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StageResult> + Send + 'static,
  {
    self.register(name, FnAdapter::new(handler))
  }

  pub fn contains(&self, name: &str) -> bool {
    self.adapters.contains_key(name)
  }

  pub fn len(&self) -> usize {
    self.adapters.len()
  }

  pub fn is_empty(&self) -> bool {
    self.adapters.is_empty()
  }
}

impl AdapterFactory for AdapterRegistry {
  fn adapter_for(&self, stage: &StageDefinition) -> Option<Arc<dyn TaskAdapter>> {
    stage.adapter.as_deref().and_then(|name| self.adapters.get(name).cloned())
  }
}

impl std::fmt::Debug for AdapterRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut names: Vec<&String> = self.adapters.keys().collect();
    names.sort();
    f.debug_struct("AdapterRegistry").field("adapters", &names).finish()
  }
}
