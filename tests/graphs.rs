mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use beamflow::document::Document;
use beamflow::event_bus::{Event, EventBus, MemorySink};
use beamflow::graph::FlowBuilder;
use beamflow::operator::DocumentOperator;
use beamflow::runtime::{FlowInstance, InstanceFaultKind, RuntimeConfig};
use common::{CollectingSink, RejectingSink, failing_op};

fn quiet_bus() -> EventBus {
    EventBus::with_sinks(Vec::new())
}

#[tokio::test]
async fn linear_flow_routes_whole_context_downstream() {
    let sink = CollectingSink::new();
    let flow = Arc::new(
        FlowBuilder::new()
            .add_task(
                "normalize",
                DocumentOperator::from_fn("normalize", |_args, kwargs| {
                    Ok(json!({"normalized": kwargs.get("data").cloned()}))
                }),
            )
            .add_task(
                "label",
                DocumentOperator::from_fn("label", |_args, kwargs| {
                    Ok(json!({"labelled": kwargs.contains_key("normalized")}))
                }),
            )
            .add_edge("normalize", "label")
            .add_sink("label", sink.clone())
            .compile()
            .expect("linear flow compiles"),
    );

    let seed = Document::builder().with_kwarg("data", json!([1, 2])).build();
    let report = flow.run(seed, &quiet_bus()).await;

    assert_eq!(report.ran_tasks, ["normalize", "label"]);
    assert!(report.is_clean());
    assert_eq!(report.sink_deliveries, 1);

    let deliveries = sink.deliveries();
    assert_eq!(deliveries.len(), 1);
    let (output, attributes) = &deliveries[0];
    assert_eq!(
        output.clone().into_value(),
        json!({"labelled": true}),
    );
    assert_eq!(attributes.function_list(), ["normalize", "label"]);
}

#[tokio::test]
async fn and_join_runs_destination_exactly_once_with_merged_input() {
    let sink = CollectingSink::new();
    let flow = Arc::new(
        FlowBuilder::new()
            .add_task(
                "input",
                DocumentOperator::from_fn("input", |_args, kwargs| {
                    Ok(json!({"image": kwargs.get("data").cloned()}))
                }),
            )
            .add_task(
                "calibrate",
                DocumentOperator::from_fn("calibrate", |_args, _kwargs| {
                    Ok(json!({"calibration": {"q_per_pixel": 0.002}}))
                }),
            )
            .add_task(
                "mask",
                DocumentOperator::from_fn("mask", |_args, _kwargs| {
                    Ok(json!({"mask": [[1, 1], [1, 0]]}))
                }),
            )
            .add_task(
                "reduce",
                DocumentOperator::from_fn("reduce", |_args, kwargs| {
                    Ok(json!({
                        "have_image": kwargs.contains_key("image"),
                        "have_calibration": kwargs.contains_key("calibration"),
                        "have_mask": kwargs.contains_key("mask"),
                    }))
                }),
            )
            .add_edge("input", "calibrate")
            .add_edge("input", "mask")
            .add_routed_edge("input", "reduce", "image")
            .add_routed_edge("calibrate", "reduce", "calibration")
            .add_routed_edge("mask", "reduce", "mask")
            .add_sink("reduce", sink.clone())
            .compile()
            .expect("diamond flow compiles"),
    );

    let seed = Document::builder()
        .with_kwarg("data", json!([[5, 5], [5, 5]]))
        .build();
    let report = flow.run(seed, &quiet_bus()).await;

    // Every task once, the join last.
    assert_eq!(report.ran_tasks.len(), 4);
    assert_eq!(
        report.ran_tasks.iter().filter(|t| *t == "reduce").count(),
        1
    );
    assert_eq!(report.ran_tasks.last().map(String::as_str), Some("reduce"));
    assert!(report.is_clean());

    let deliveries = sink.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(
        deliveries[0].0.clone().into_value(),
        json!({"have_image": true, "have_calibration": true, "have_mask": true}),
    );
}

#[tokio::test]
async fn failed_transform_produces_visibly_empty_downstream_artifacts() {
    let sink = CollectingSink::new();
    let flow = Arc::new(
        FlowBuilder::new()
            .add_task("broken", failing_op("broken"))
            .add_task(
                "observe",
                DocumentOperator::from_fn("observe", |args, kwargs| {
                    Ok(json!({"inputs": args.len() + kwargs.len()}))
                }),
            )
            .add_edge("broken", "observe")
            .add_sink("observe", sink.clone())
            .compile()
            .expect("flow compiles"),
    );

    let report = flow.run(Document::empty(), &quiet_bus()).await;

    // The failure is contained: downstream still ran, on an empty payload.
    assert_eq!(report.ran_tasks, ["broken", "observe"]);
    assert_eq!(report.faults.len(), 1);
    assert_eq!(report.faults[0].task, "broken");
    assert_eq!(report.faults[0].kind, InstanceFaultKind::Transform);

    let deliveries = sink.deliveries();
    assert_eq!(deliveries[0].0.clone().into_value(), json!({"inputs": 0}));
}

#[tokio::test]
async fn missing_routing_key_is_contained_as_addressing_fault() {
    let flow = Arc::new(
        FlowBuilder::new()
            .add_task(
                "produce",
                DocumentOperator::from_fn("produce", |_args, _kwargs| Ok(json!({"present": 1}))),
            )
            .add_task(
                "consume",
                DocumentOperator::from_fn("consume", |_args, kwargs| Ok(json!(kwargs.len()))),
            )
            .add_routed_edge("produce", "consume", "absent")
            .compile()
            .expect("flow compiles"),
    );

    let bus = EventBus::with_sink(MemorySink::new());
    let report = flow.run(Document::empty(), &bus).await;

    assert_eq!(report.ran_tasks, ["produce", "consume"]);
    assert_eq!(report.faults.len(), 1);
    assert_eq!(report.faults[0].kind, InstanceFaultKind::Addressing);
    assert!(report.faults[0].message.contains("absent"));
}

#[tokio::test]
async fn addressing_faults_are_published_to_the_event_bus() {
    let memory = MemorySink::new();
    let bus = EventBus::with_sink(memory.clone());

    let flow = Arc::new(
        FlowBuilder::new()
            .add_task(
                "produce",
                DocumentOperator::from_fn("produce", |_args, _kwargs| Ok(json!({"present": 1}))),
            )
            .add_task(
                "consume",
                DocumentOperator::from_fn("consume", |_args, _kwargs| Ok(json!(null))),
            )
            .add_routed_edge("produce", "consume", "ghost")
            .compile()
            .expect("flow compiles"),
    );

    let _ = flow.run(Document::empty(), &bus).await;

    // The listener drains asynchronously; give it a beat.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let events = memory.snapshot();
    assert!(events.iter().any(|event| matches!(
        event,
        Event::Task(task) if task.scope == "addressing"
    )));
}

#[tokio::test]
async fn panicking_callback_is_contained() {
    let flow = Arc::new(
        FlowBuilder::new()
            .add_task(
                "explode",
                beamflow::task::FnTask::new(|_doc: Document| panic!("kaboom")),
            )
            .add_task(
                "after",
                DocumentOperator::from_fn("after", |_args, _kwargs| Ok(json!("still here"))),
            )
            .add_edge("explode", "after")
            .compile()
            .expect("flow compiles"),
    );

    let report = flow.run(Document::empty(), &quiet_bus()).await;
    assert_eq!(report.ran_tasks, ["explode", "after"]);
    assert_eq!(report.faults.len(), 1);
    assert_eq!(report.faults[0].kind, InstanceFaultKind::Panic);
}

#[tokio::test]
async fn rejecting_sink_does_not_fault_the_instance() {
    let flow = Arc::new(
        FlowBuilder::new()
            .add_task(
                "emit",
                DocumentOperator::from_fn("emit", |_args, _kwargs| Ok(json!(1))),
            )
            .add_sink("emit", RejectingSink)
            .compile()
            .expect("flow compiles"),
    );

    let report = flow.run(Document::empty(), &quiet_bus()).await;
    assert!(report.is_clean());
    assert_eq!(report.sink_deliveries, 0);
}

#[tokio::test]
async fn single_threaded_evaluator_is_semantically_equivalent() {
    let sink = CollectingSink::new();
    let flow = Arc::new(
        FlowBuilder::new()
            .add_task(
                "left",
                DocumentOperator::from_fn("left", |_args, _kwargs| Ok(json!({"l": 1}))),
            )
            .add_task(
                "right",
                DocumentOperator::from_fn("right", |_args, _kwargs| Ok(json!({"r": 2}))),
            )
            .add_task(
                "join",
                DocumentOperator::from_fn("join", |_args, kwargs| {
                    Ok(json!(kwargs.contains_key("l") && kwargs.contains_key("r")))
                }),
            )
            .add_routed_edge("left", "join", "l")
            .add_routed_edge("right", "join", "r")
            .add_sink("join", sink.clone())
            .with_runtime_config(RuntimeConfig::with_parallelism(1))
            .compile()
            .expect("flow compiles"),
    );

    let report = flow.run(Document::empty(), &quiet_bus()).await;
    assert_eq!(report.ran_tasks.len(), 3);
    assert_eq!(sink.deliveries()[0].0.clone().into_value(), json!(true));
}

#[tokio::test]
async fn instances_share_no_state() {
    let flow = Arc::new(
        FlowBuilder::new()
            .add_task(
                "tag",
                DocumentOperator::from_fn("tag", |_args, kwargs| {
                    Ok(json!({"tagged": kwargs.get("data").cloned()}))
                }),
            )
            .compile()
            .expect("flow compiles"),
    );

    let bus = quiet_bus();
    bus.listen_for_events();
    let first = FlowInstance::new(Arc::clone(&flow), bus.sender());
    let second = FlowInstance::new(Arc::clone(&flow), bus.sender());
    assert_ne!(first.id(), second.id());

    let seed_a = Document::builder().with_kwarg("data", json!("a")).build();
    let seed_b = Document::builder().with_kwarg("data", json!("b")).build();
    let (ra, rb) = tokio::join!(first.run(seed_a), second.run(seed_b));

    assert_eq!(ra.ran_tasks, ["tag"]);
    assert_eq!(rb.ran_tasks, ["tag"]);
    assert_ne!(ra.instance_id, rb.instance_id);
}
