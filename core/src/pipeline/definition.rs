// imgflow/src/pipeline/definition.rs

//! Contains the `PipelineDefinition`: an immutable, validated arena of stages indexed by name.

use crate::core::stage::StageDefinition;
use crate::error::{FlowError, FlowResult, GraphConfigError};
use crate::pipeline::validate::{self, Node};
use serde::Deserialize;
use std::collections::HashMap;

/// A static, ordered directed graph of named stages.
///
/// Built once at process start and shared read-only between all running instances.
/// Construction fails fast with `GraphConfigError` when the graph is cyclic, has dangling
/// edges, routes a work stage's error edge anywhere but the failure handler, or declares
/// zero or several failure handlers. Only a notification stage may end the success chain, so
/// every instance sends exactly one notification.
#[derive(Debug)]
pub struct PipelineDefinition {
  nodes: Vec<Node>,
  index: HashMap<String, usize>,
  start: usize,
  failure_handler: usize,
}

/// Serialized form of a definition.
#[derive(Debug, Deserialize)]
struct DefinitionDocument {
  start_at: String,
  stages: Vec<StageDefinition>,
}

impl PipelineDefinition {
  /// Validates `stages` and builds the definition. `start` names the single start stage.
  pub fn new(start: &str, stages: Vec<StageDefinition>) -> Result<Self, GraphConfigError> {
    let resolved = validate::resolve(start, stages)?;
    Ok(Self {
      nodes: resolved.nodes,
      index: resolved.index,
      start: resolved.start,
      failure_handler: resolved.failure_handler,
    })
  }

  pub fn builder(start: impl Into<String>) -> PipelineDefinitionBuilder {
    PipelineDefinitionBuilder {
      start: start.into(),
      stages: Vec::new(),
    }
  }

  /// Loads a definition from its JSON document form:
  /// `{"start_at": "...", "stages": [{"name": ..., "kind": ..., "adapter": ..., "next": ..., "catch": ...}]}`.
  pub fn from_json(json: &str) -> FlowResult<Self> {
    let doc: DefinitionDocument = serde_json::from_str(json)
      .map_err(|e| FlowError::config(format!("Invalid pipeline definition document: {}", e)))?;
    Ok(Self::new(&doc.start_at, doc.stages)?)
  }

  pub fn stage_at(&self, name: &str) -> FlowResult<&StageDefinition> {
    self
      .index
      .get(name)
      .map(|&idx| &self.nodes[idx].def)
      .ok_or_else(|| FlowError::StageNotFound {
        stage_name: name.to_string(),
      })
  }

  pub fn start_stage(&self) -> &StageDefinition {
    &self.nodes[self.start].def
  }

  pub fn failure_handler(&self) -> &StageDefinition {
    &self.nodes[self.failure_handler].def
  }

  /// Stage definitions in declaration order.
  pub fn stages(&self) -> impl Iterator<Item = &StageDefinition> {
    self.nodes.iter().map(|n| &n.def)
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub(crate) fn start_index(&self) -> usize {
    self.start
  }

  pub(crate) fn node(&self, idx: usize) -> &Node {
    &self.nodes[idx]
  }
}

/// Collects stage definitions and validates them on `build`.
#[derive(Debug, Clone)]
pub struct PipelineDefinitionBuilder {
  start: String,
  stages: Vec<StageDefinition>,
}

impl PipelineDefinitionBuilder {
  pub fn stage(mut self, stage: StageDefinition) -> Self {
    self.stages.push(stage);
    self
  }

  pub fn build(self) -> Result<PipelineDefinition, GraphConfigError> {
    PipelineDefinition::new(&self.start, self.stages)
  }
}
