//! # Beamflow: Document-Oriented Dataflow for Instrument Pipelines
//!
//! Beamflow ingests scientific instrument events, routes them through a
//! graph of transformation steps, and produces derived artifacts. The
//! engine is built around four ideas:
//!
//! - **Documents**: a structured carrier of positional/keyword payload plus
//!   attributes, provenance, statistics, and a checkpoint marker, with a
//!   deterministic merge/select algebra and copy-on-write discipline.
//! - **Operators**: any plain transform becomes a fault-isolated,
//!   timeout-bounded Document→Document operator — one bad input never halts
//!   a workflow.
//! - **Flows**: static, acyclic task graphs with named routing keys and
//!   AND-join delivery, validated once and instantiated fresh per event.
//! - **Dispatch**: incoming events are schema-validated, fanned out into
//!   one independent sub-flow instance per data item, and joined.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use beamflow::event::InstrumentEvent;
//! use beamflow::graph::FlowBuilder;
//! use beamflow::operator::DocumentOperator;
//! use beamflow::runtime::{AttrType, Dispatcher, EventSchema};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // A transform is a plain function over JSON values; the operator
//! // wrapper adds timeout bounding, fault containment, and provenance.
//! let total = DocumentOperator::from_fn("total", |_args, kwargs| {
//!     let pixels = kwargs
//!         .get("data")
//!         .and_then(|v| v.as_array())
//!         .cloned()
//!         .unwrap_or_default();
//!     let sum: f64 = pixels.iter().filter_map(|p| p.as_f64()).sum();
//!     Ok(json!({"total": sum}))
//! });
//!
//! let flow = Arc::new(
//!     FlowBuilder::new()
//!         .add_task("total", total)
//!         .compile()?,
//! );
//!
//! // One sub-flow instance spawns per image in the event payload.
//! let dispatcher = Dispatcher::new(
//!     flow,
//!     EventSchema::new().require("sample_name", AttrType::String),
//!     ["image"],
//! );
//!
//! let event = InstrumentEvent::new("scan-1")
//!     .with_attribute("sample_name", json!("AgBH"))
//!     .with_payload("image", vec![json!([1.0, 2.0]), json!([3.0, 4.0])]);
//!
//! let report = dispatcher.dispatch(event).await;
//! assert_eq!(report.spawned, 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`document`] - Document value type and merge/select algebra
//! - [`arguments`] - Raw result normalization into positional/keyword form
//! - [`operator`] - Fault-isolated, timeout-bounded transform wrapper
//! - [`task`] - Task trait and execution context
//! - [`graph`] - Flow definition and compilation
//! - [`flow`] - The compiled, immutable flow graph
//! - [`runtime`] - Per-event instances and the dynamic spawner
//! - [`event`] - Instrument events and source/sink adapter seams
//! - [`event_bus`] - Observability fan-out to pluggable sinks
//! - [`telemetry`] - Tracing initialization

pub mod arguments;
pub mod document;
pub mod event;
pub mod event_bus;
pub mod flow;
pub mod graph;
pub mod operator;
pub mod runtime;
pub mod task;
pub mod telemetry;
