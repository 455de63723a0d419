// src/lib.rs

//! imgflow: an async orchestration engine for image-processing pipelines.
//!
//! A pipeline is a static graph of named stages. Each trigger event gets its own execution
//! context, which the `Engine` walks from the start stage to exactly one terminal state:
//!  - Work stages invoke a `TaskAdapter` and merge its output fields into the context.
//!  - Any work-stage failure, whatever its kind, is routed to the single failure handler.
//!  - Notification stages report the outcome; a notification fault ends in a fail terminal.
//!  - The persist stage writes a `StatusRecord`, later served through `StatusQuery`.
//!
//! Graphs are validated when they are built, so a running engine never meets a dangling
//! edge, a cycle or a missing adapter.

pub mod config;
pub mod core;
pub mod error;
pub mod notify;
pub mod pipeline;
pub mod registry;
pub mod stages;
pub mod status;
pub mod trigger;

// --- Re-exports for the Public API ---

pub use crate::core::adapter::{FnAdapter, TaskAdapter};
pub use crate::core::context::{ErrorDetail, ExecutionContext, Fields, StageOutput, TerminalStatus};
pub use crate::core::control::{StageFailure, StageResult, TerminalOutcome};
pub use crate::core::stage::{EdgeKind, StageDefinition, StageKind};

pub use crate::pipeline::definition::{PipelineDefinition, PipelineDefinitionBuilder};
pub use crate::pipeline::execution::Engine;
pub use crate::pipeline::standard::{standard_pipeline, ImagePipeline, ImagePipelineBuilder};

pub use crate::config::{PipelineConfig, ThumbnailSize};
pub use crate::error::{FlowError, FlowResult, GraphConfigError};
pub use crate::notify::{NotificationChannel, NotificationMessage, NotificationStatus, Notifier, OutboxChannel};
pub use crate::registry::{AdapterFactory, AdapterRegistry};
pub use crate::status::{
  InMemoryStatusStore, JsonFileStatusStore, StatusLookup, StatusQuery, StatusRecord, StatusResponse, StatusStore,
  StatusStoreAccessor,
};
pub use crate::trigger::TriggerEvent;
