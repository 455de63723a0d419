// imgflow/src/core/mod.rs

pub mod adapter;
pub mod context;
pub mod control;
pub mod stage;

pub use adapter::{FnAdapter, TaskAdapter};
pub use context::{ErrorDetail, ExecutionContext, Fields, StageOutput, TerminalStatus};
pub use control::{StageFailure, StageResult, TerminalOutcome};
pub use stage::{EdgeKind, StageDefinition, StageKind};
