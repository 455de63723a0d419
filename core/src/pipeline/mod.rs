// imgflow/src/pipeline/mod.rs

//! Pipeline graphs: their definition and validation, the engine that walks them, and the
//! standard image pipeline.

pub mod definition;
pub mod execution;
pub mod standard;
mod validate;

pub use definition::{PipelineDefinition, PipelineDefinitionBuilder};
pub use execution::Engine;
pub use standard::{standard_pipeline, ImagePipeline, ImagePipelineBuilder};
