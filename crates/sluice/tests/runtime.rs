use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};

use sluice::core::ServiceKey;
use sluice::prelude::*;
use sluice::runtime::{ExecutorKind, RuntimeError};
use tower::ServiceExt;

struct Greeting;

impl ServiceType for Greeting {
    type Context = String;
    type Result = i32;
    type Mode = Plain;
}

struct Record;

impl ServiceType for Record {
    type Context = i32;
    type Result = State;
    type Mode = Consumer;
}

struct Lookup;

impl ServiceType for Lookup {
    type Context = ChunkedRequest<u32, String>;
    type Result = HashMap<u32, String>;
    type Mode = Plain;
}

fn runtime(kind: ExecutorKind) -> SluiceRuntime {
    let mut config = SluiceConfig::default();
    config.executor.kind = kind;
    SluiceRuntime::builder()
        .search_path("/nonexistent/sluice")
        .without_env()
        .init_logging(false)
        .merge(config)
        .build()
        .unwrap()
}

fn declare(pipeline: &Pipeline, seen: Arc<Mutex<Vec<i32>>>) {
    pipeline
        .register_service_type::<Greeting>(service_fn(|name: &String| {
            (name == "Hello").then_some(32).or(Some(name.len() as i32))
        }))
        .unwrap()
        .register_implementation::<Greeting>(
            service_fn(|_: &String| Some(999)),
            [filter(|name: &String| name == "potato")],
        )
        .unwrap()
        .register_service_type::<Record>(consumer_fn(move |value: &i32| {
            seen.lock().unwrap().push(*value);
            ControlFlow::Break(())
        }))
        .unwrap();
}

#[test]
fn test_runtime_builds_configured_pipeline() {
    let runtime = runtime(ExecutorKind::Worker);
    assert_eq!(runtime.config().executor.kind, ExecutorKind::Worker);

    let pipeline = runtime.pipeline();
    declare(&pipeline, Arc::default());

    assert_eq!(
        pipeline.registered_types(),
        {
            let mut keys = vec![ServiceKey::of::<Greeting>(), ServiceKey::of::<Record>()];
            keys.sort_by_key(|key| key.name());
            keys
        }
    );
    let result = pipeline
        .pump("potato".to_string())
        .through::<Greeting>()
        .result_async()
        .wait();
    assert_eq!(result, Ok(999));
}

#[test]
fn test_forward_matches_manual_chaining() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let pipeline = runtime(ExecutorKind::Inline).into_pipeline();
    declare(&pipeline, Arc::clone(&seen));

    let forwarded = pipeline
        .pump("Hello".to_string())
        .through::<Greeting>()
        .forward()
        .unwrap()
        .through::<Record>()
        .result();

    let manual = pipeline
        .pump("Hello".to_string())
        .through::<Greeting>()
        .result()
        .unwrap();
    let chained = pipeline.pump(manual).through::<Record>().result();

    assert_eq!(forwarded, Ok(State::Accepted));
    assert_eq!(forwarded, chained);
    assert_eq!(*seen.lock().unwrap(), vec![32, 32]);
}

#[test]
fn test_runtime_rejects_invalid_config() {
    let mut config = SluiceConfig::default();
    config.executor.workers = 0;

    let result = SluiceRuntime::builder()
        .search_path("/nonexistent/sluice")
        .without_env()
        .init_logging(false)
        .merge(config)
        .build();
    assert!(matches!(result, Err(RuntimeError::Config(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_async_dispatch_through_tower() {
    let pipeline = runtime(ExecutorKind::Tokio).into_pipeline();
    declare(&pipeline, Arc::default());

    let answers = futures::future::try_join_all(
        ["Hello", "potato", "oi"]
            .into_iter()
            .map(|name| pipeline.service::<Greeting>().oneshot(name.to_string())),
    )
    .await
    .unwrap();
    assert_eq!(answers, vec![32, 999, 2]);
}

#[test]
fn test_partial_results_through_runtime_pipeline() {
    let pipeline = runtime(ExecutorKind::Inline).into_pipeline();
    pipeline
        .register_service_type::<Lookup>(partial_fn(|ids: &[u32]| {
            ids.iter().map(|id| (*id, format!("remote-{id}"))).collect()
        }))
        .unwrap()
        .register_implementation::<Lookup>(
            partial_fn(|ids: &[u32]| {
                ids.iter()
                    .filter(|id| **id < 10)
                    .map(|id| (*id, format!("cached-{id}")))
                    .collect()
            })
            .with_order(ExecutionOrder::First),
            [],
        )
        .unwrap();

    let results = pipeline
        .pump(ChunkedRequest::new([3, 30]))
        .through::<Lookup>()
        .result()
        .unwrap();
    assert_eq!(results[&3], "cached-3");
    assert_eq!(results[&30], "remote-30");
}
