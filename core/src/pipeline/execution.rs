// imgflow/src/pipeline/execution.rs

//! Contains the `Engine`, which drives one execution context per trigger from the start stage
//! to exactly one terminal state.

use crate::core::adapter::TaskAdapter;
use crate::core::context::{ExecutionContext, TerminalStatus};
use crate::core::control::{StageFailure, StageResult, TerminalOutcome};
use crate::core::stage::StageKind;
use crate::error::{FlowError, FlowResult};
use crate::pipeline::definition::PipelineDefinition;
use crate::registry::AdapterFactory;
use crate::trigger::TriggerEvent;
use std::sync::Arc;
use tracing::{event, info_span, instrument, Instrument, Level};

/// Failure kind used when the visit bound is exceeded. Unreachable for a validated graph.
pub const ENGINE_INVARIANT_KIND: &str = "EngineInvariant";

/// Failure kind recorded when a fail terminal is reached without any prior failure.
pub const FAIL_TERMINAL_KIND: &str = "Failed";

/// Executes pipeline instances against an immutable definition and adapter arena.
///
/// `Engine` is `Send + Sync`; share it behind an `Arc` and call `run` from as many tasks as
/// needed. Instances share nothing but the collaborators behind their adapters.
pub struct Engine {
  definition: Arc<PipelineDefinition>,
  /// Index-aligned with the definition's stages. `None` only for fail terminals.
  adapters: Vec<Option<Arc<dyn TaskAdapter>>>,
}

impl Engine {
  /// Resolves an adapter for every non-terminal stage. Fails if the factory cannot supply one.
  pub fn new(definition: PipelineDefinition, factory: &dyn AdapterFactory) -> FlowResult<Self> {
    let mut adapters = Vec::with_capacity(definition.len());
    for stage in definition.stages() {
      if stage.kind == StageKind::Fail {
        adapters.push(None);
        continue;
      }
      let adapter = factory.adapter_for(stage).ok_or_else(|| {
        event!(Level::ERROR, stage = %stage.name, adapter = ?stage.adapter, "No adapter available for stage.");
        FlowError::AdapterMissing {
          stage_name: stage.name.clone(),
          adapter: stage.adapter.clone().unwrap_or_default(),
        }
      })?;
      adapters.push(Some(adapter));
    }
    event!(Level::DEBUG, stages = definition.len(), "Engine constructed.");
    Ok(Self {
      definition: Arc::new(definition),
      adapters,
    })
  }

  pub fn definition(&self) -> &PipelineDefinition {
    &self.definition
  }

  /// Runs one pipeline instance for `trigger`.
  ///
  /// Returns `Err(FlowError::InvalidTrigger)` before any stage executes when the trigger has no
  /// usable item key. Otherwise every outcome, including stage failures and notification
  /// failures, is reported through the returned `TerminalOutcome`.
  #[instrument(
    name = "Engine::run",
    skip_all,
    fields(item_key = %trigger.item_key, execution_id = tracing::field::Empty)
  )]
  pub async fn run(&self, trigger: TriggerEvent) -> FlowResult<TerminalOutcome> {
    let item_key = trigger.resolve_key()?;
    let start = self.definition.start_index();
    let mut ctx = ExecutionContext::new(item_key, trigger.source_metadata, &self.definition.node(start).def.name);
    tracing::Span::current().record("execution_id", tracing::field::display(ctx.execution_id()));
    event!(Level::INFO, start_stage = %ctx.current_stage(), "Pipeline execution starting.");

    let bound = self.definition.len();
    let mut current = start;
    let mut visits = 0usize;

    loop {
      if visits >= bound {
        event!(Level::ERROR, visits, bound, "Stage visit bound exceeded; failing instance.");
        let stage = ctx.current_stage().to_string();
        ctx.fail(&stage, || {
          StageFailure::new(
            ENGINE_INVARIANT_KIND,
            format!("execution exceeded {} stage visits", bound),
          )
        })?;
        break;
      }
      visits += 1;

      let node = self.definition.node(current);
      let stage_name = node.def.name.as_str();
      ctx.enter(stage_name)?;

      if node.def.kind == StageKind::Fail {
        event!(Level::ERROR, stage = %stage_name, "Fail terminal reached.");
        ctx.fail(stage_name, || {
          StageFailure::new(FAIL_TERMINAL_KIND, format!("pipeline reached fail terminal '{}'", stage_name))
        })?;
        break;
      }

      let span = info_span!("stage", stage = %stage_name, step = visits - 1, kind = ?node.def.kind);
      let result = match &self.adapters[current] {
        Some(adapter) => adapter.invoke(&ctx).instrument(span).await,
        None => StageResult::failure(
          "AdapterMissing",
          format!("no adapter resolved for stage '{}'", stage_name),
        ),
      };

      match result {
        StageResult::Success(fields) => {
          event!(Level::DEBUG, stage = %stage_name, fields = fields.len(), "Stage succeeded.");
          ctx.record_success(stage_name, fields)?;
          match node.next {
            Some(next) => current = next,
            None => {
              ctx.succeed()?;
              break;
            }
          }
        }
        StageResult::Failure(failure) => {
          event!(
            Level::WARN,
            stage = %stage_name,
            kind = %failure.kind,
            message = %failure.message,
            "Stage failed; following error edge."
          );
          ctx.record_failure(stage_name, failure)?;
          match node.catch {
            Some(target) => current = target,
            None => {
              ctx.fail(stage_name, || StageFailure::new(FAIL_TERMINAL_KIND, "stage failed without an error edge"))?;
              break;
            }
          }
        }
      }
    }

    let status = ctx.status();
    match status {
      TerminalStatus::Succeeded => event!(Level::INFO, visits, "Pipeline execution succeeded."),
      _ => event!(
        Level::INFO,
        visits,
        error_stage = ctx.error().map(|e| e.stage.as_str()).unwrap_or(""),
        error_kind = ctx.error().map(|e| e.kind.as_str()).unwrap_or(""),
        "Pipeline execution failed."
      ),
    }
    Ok(TerminalOutcome { status, context: ctx })
  }
}

impl std::fmt::Debug for Engine {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Engine")
      .field("definition", &self.definition)
      .field("adapters", &self.adapters.iter().filter(|a| a.is_some()).count())
      .finish()
  }
}
