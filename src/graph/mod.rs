//! Flow graph definition and compilation.
//!
//! A flow is declared with [`FlowBuilder`]: named tasks (anything
//! implementing [`TaskCallback`](crate::task::TaskCallback), typically a
//! [`DocumentOperator`](crate::operator::DocumentOperator)) connected by
//! directed edges. Edges either forward the whole output context or, with a
//! routing key, just one keyword field. A destination with several inbound
//! edges is an AND-join: it runs once, after all inbound edges deliver.
//!
//! [`FlowBuilder::compile`] validates the definition (unique names, known
//! endpoints, acyclicity) and produces an immutable
//! [`Flow`](crate::flow::Flow). Structural violations are fatal there —
//! and only there; at runtime every fault is contained.
//!
//! # Quick Start
//!
//! ```rust
//! use beamflow::graph::FlowBuilder;
//! use beamflow::operator::DocumentOperator;
//! use serde_json::json;
//!
//! let flow = FlowBuilder::new()
//!     .add_task(
//!         "calibrate",
//!         DocumentOperator::from_fn("calibrate", |_args, _kwargs| {
//!             Ok(json!({"calibration": {"beam_x": 733.1}}))
//!         }),
//!     )
//!     .add_task(
//!         "reduce",
//!         DocumentOperator::from_fn("reduce", |_args, kwargs| {
//!             Ok(json!(kwargs.contains_key("calibration")))
//!         }),
//!     )
//!     .add_routed_edge("calibrate", "reduce", "calibration")
//!     .compile()
//!     .expect("two tasks and one edge form a valid flow");
//!
//! assert_eq!(flow.roots(), ["calibrate"]);
//! assert_eq!(flow.terminals(), ["reduce"]);
//! ```

mod builder;
mod compilation;
mod edges;


pub use builder::FlowBuilder;
pub use compilation::GraphError;
pub use edges::Edge;
