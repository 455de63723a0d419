use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use imgflow::{
  AdapterRegistry, Engine, Fields, PipelineDefinition, StageDefinition, StageResult, TriggerEvent,
};
use serde_json::json;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// A linear chain of `work_stages` work stages, a success notification, the failure handler and a fail terminal.
fn chain_definition(work_stages: usize) -> PipelineDefinition {
  let mut builder = PipelineDefinition::builder("work_0");
  for i in 0..work_stages {
    let next = if i + 1 == work_stages {
      "notify_ok".to_string()
    } else {
      format!("work_{}", i + 1)
    };
    builder = builder.stage(StageDefinition::work(format!("work_{}", i), "work").then(next).on_error("notify_err"));
  }
  builder
    .stage(StageDefinition::notify("notify_ok", "notify").on_error("failed"))
    .stage(StageDefinition::failure_handler("notify_err", "notify").then("failed"))
    .stage(StageDefinition::fail("failed"))
    .build()
    .unwrap()
}

fn registry(fail_marker: Option<&'static str>) -> AdapterRegistry {
  let mut registry = AdapterRegistry::new();
  registry
    .register_fn("work", move |ctx| async move {
      if fail_marker.map_or(false, |marker| ctx.item_key().contains(marker)) {
        return StageResult::failure("BenchFailure", "marked item");
      }
      let mut fields = Fields::new();
      fields.insert(ctx.current_stage().to_string(), json!(ctx.trail().len()));
      StageResult::success(fields)
    })
    .register_fn("notify", |_ctx| async move { StageResult::success(Fields::new()) });
  registry
}

fn bench_engine_paths(c: &mut Criterion) {
  let mut group = c.benchmark_group("EngineRun");
  let rt = Runtime::new().unwrap();

  for work_stages in [1usize, 4, 16] {
    let engine = Arc::new(Engine::new(chain_definition(work_stages), &registry(Some("fail"))).unwrap());
    group.throughput(Throughput::Elements(1));

    group.bench_with_input(BenchmarkId::new("success", work_stages), &work_stages, |b, _| {
      b.to_async(&rt).iter_batched(
        || TriggerEvent::for_key("uploads/ok.jpg"),
        |trigger| {
          let engine = engine.clone();
          async move { engine.run(trigger).await.unwrap() }
        },
        criterion::BatchSize::SmallInput,
      );
    });

    group.bench_with_input(BenchmarkId::new("failure", work_stages), &work_stages, |b, _| {
      b.to_async(&rt).iter_batched(
        || TriggerEvent::for_key("uploads/fail.jpg"),
        |trigger| {
          let engine = engine.clone();
          async move { engine.run(trigger).await.unwrap() }
        },
        criterion::BatchSize::SmallInput,
      );
    });
  }
  group.finish();
}

fn bench_concurrent_instances(c: &mut Criterion) {
  let mut group = c.benchmark_group("EngineConcurrent");
  let rt = Runtime::new().unwrap();
  let engine = Arc::new(Engine::new(chain_definition(4), &registry(None)).unwrap());

  for instances in [8usize, 64] {
    group.throughput(Throughput::Elements(instances as u64));
    group.bench_with_input(BenchmarkId::from_parameter(instances), &instances, |b, &n| {
      b.to_async(&rt).iter(|| {
        let engine = engine.clone();
        async move {
          let handles: Vec<_> = (0..n)
            .map(|i| {
              let engine = engine.clone();
              tokio::spawn(async move { engine.run(TriggerEvent::for_key(format!("uploads/{}.jpg", i))).await })
            })
            .collect();
          for handle in handles {
            handle.await.unwrap().unwrap();
          }
        }
      });
    });
  }
  group.finish();
}

criterion_group!(benches, bench_engine_paths, bench_concurrent_instances);
criterion_main!(benches);
