// tests/error_handling_tests.rs
mod common;

use common::*;
use imgflow::pipeline::standard::{GENERATE_THUMBNAILS, NOTIFY_FAILURE, NOTIFY_SUCCESS, PROCESSING_FAILED, STORE_RESULTS};
use imgflow::{
  AdapterRegistry, Engine, Fields, FlowError, NotificationStatus, PipelineDefinition, StageDefinition, StageResult,
  StatusStore, TerminalStatus, TriggerEvent,
};
use serde_json::json;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn failure_handler_fault_ends_in_fail_terminal_without_retry() {
  setup_tracing();
  let h = harness(Faults {
    thumbnails: true,
    notify_failure: true,
    ..Faults::default()
  });

  let outcome = h.engine.run(TriggerEvent::for_key("uploads/cat.jpg")).await.unwrap();

  assert_eq!(outcome.status, TerminalStatus::Failed);
  assert_eq!(outcome.context.current_stage(), PROCESSING_FAILED);
  assert_eq!(h.channel.attempts_with(NotificationStatus::Failure), 1);
  assert_eq!(h.channel.attempts_with(NotificationStatus::Success), 0);

  // The original failure stays the reported one; the delivery fault is only on the trail.
  let error = outcome.context.error().unwrap();
  assert_eq!(error.stage, GENERATE_THUMBNAILS);
  assert_eq!(error.kind, "ThumbnailError");
  let last = outcome.context.trail().last().unwrap();
  assert_eq!(last.stage, NOTIFY_FAILURE);
  match &last.result {
    StageResult::Failure(f) => assert_eq!(f.kind, "DeliveryError"),
    other => panic!("expected delivery failure on the trail, got {:?}", other),
  }
}

#[tokio::test]
async fn success_notification_fault_is_not_rerouted_to_failure_notification() {
  setup_tracing();
  let h = harness(Faults {
    notify_success: true,
    ..Faults::default()
  });

  let outcome = h.engine.run(TriggerEvent::for_key("uploads/cat.jpg")).await.unwrap();

  assert!(outcome.is_failed());
  assert_eq!(outcome.context.current_stage(), PROCESSING_FAILED);
  let error = outcome.context.error().unwrap();
  assert_eq!(error.stage, NOTIFY_SUCCESS);
  assert_eq!(error.kind, "DeliveryError");
  assert!(error.message.contains("notification topic unreachable"));

  assert_eq!(h.channel.attempts_with(NotificationStatus::Success), 1);
  assert_eq!(h.channel.attempts_with(NotificationStatus::Failure), 0);
  // Persistence already happened before the notification stage.
  assert!(h.store.get("uploads/cat.jpg").await.unwrap().is_some());
}

#[tokio::test]
async fn persist_failure_leaves_no_record() {
  setup_tracing();
  let h = harness(Faults {
    persist: true,
    ..Faults::default()
  });

  let outcome = h.engine.run(TriggerEvent::for_key("uploads/cat.jpg")).await.unwrap();

  assert!(outcome.is_failed());
  assert_eq!(outcome.context.error().unwrap().stage, STORE_RESULTS);
  assert_eq!(h.store.puts.load(Ordering::SeqCst), 1);
  assert!(h.store.inner.is_empty());
  assert_eq!(h.channel.attempts_with(NotificationStatus::Failure), 1);
}

#[tokio::test]
async fn invalid_trigger_fails_fast_without_notification() {
  setup_tracing();
  let h = harness(Faults::default());

  for key in ["", "   "] {
    match h.engine.run(TriggerEvent::for_key(key)).await {
      Err(FlowError::InvalidTrigger { .. }) => {}
      other => panic!("expected InvalidTrigger for {:?}, got {:?}", key, other),
    }
  }

  assert!(h.channel.attempts().is_empty());
  assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 0);
  assert_eq!(h.store.puts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn stage_without_error_edge_fails_the_instance() {
  setup_tracing();
  let mut registry = AdapterRegistry::new();
  registry
    .register_fn("work", |_ctx| async move {
      let mut fields = Fields::new();
      fields.insert("rendered".into(), json!(true));
      StageResult::success(fields)
    })
    .register_fn("announce", |_ctx| async move { StageResult::failure("Timeout", "gateway timed out") })
    .register_fn("notify_err", |_ctx| async move { StageResult::success(Fields::new()) });

  let definition = PipelineDefinition::builder("Work")
    .stage(StageDefinition::work("Work", "work").then("Announce").on_error("NotifyErr"))
    .stage(StageDefinition::notify("Announce", "announce"))
    .stage(StageDefinition::failure_handler("NotifyErr", "notify_err").then("Failed"))
    .stage(StageDefinition::fail("Failed"))
    .build()
    .unwrap();
  let engine = Engine::new(definition, &registry).unwrap();

  let outcome = engine.run(TriggerEvent::for_key("k")).await.unwrap();

  assert!(outcome.is_failed());
  assert_eq!(outcome.context.visited_stages(), vec!["Work", "Announce"]);
  let error = outcome.context.error().unwrap();
  assert_eq!((error.stage.as_str(), error.kind.as_str()), ("Announce", "Timeout"));
}

#[tokio::test]
async fn failure_handler_success_without_prior_error_still_reports_one() {
  setup_tracing();
  // A definition that starts at the failure handler: the fail terminal supplies the detail.
  let mut registry = AdapterRegistry::new();
  registry.register_fn("notify_err", |_ctx| async move { StageResult::success(Fields::new()) });
  let definition = PipelineDefinition::builder("NotifyErr")
    .stage(StageDefinition::failure_handler("NotifyErr", "notify_err").then("Failed"))
    .stage(StageDefinition::fail("Failed"))
    .build()
    .unwrap();
  let engine = Engine::new(definition, &registry).unwrap();

  let outcome = engine.run(TriggerEvent::for_key("k")).await.unwrap();

  assert!(outcome.is_failed());
  let error = outcome.context.error().unwrap();
  assert_eq!(error.stage, "Failed");
  assert_eq!(error.kind, imgflow::pipeline::execution::FAIL_TERMINAL_KIND);
}
