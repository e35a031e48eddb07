//! FlowBuilder implementation for constructing workflow graphs.
//!
//! This module contains the main FlowBuilder type and its fluent API for
//! declaring tasks, edges, and terminal sinks before compiling to an
//! executable [`Flow`](crate::flow::Flow).

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::edges::Edge;
use crate::event::SinkAdapter;
use crate::runtime::RuntimeConfig;
use crate::task::TaskCallback;

/// Builder for constructing flow graphs with a fluent API.
///
/// A flow is declared as named tasks plus directed edges. Tasks with no
/// inbound edges are roots and receive the triggering document; a task with
/// several inbound edges executes once all of them have delivered
/// (AND-join). The structure is validated — and becomes immutable — at
/// [`compile`](Self::compile) time.
///
/// # Examples
///
/// ```rust
/// use beamflow::graph::FlowBuilder;
/// use beamflow::operator::DocumentOperator;
/// use serde_json::json;
///
/// let flow = FlowBuilder::new()
///     .add_task(
///         "scale",
///         DocumentOperator::from_fn("scale", |_args, kwargs| {
///             Ok(json!({"scaled": kwargs.get("data").cloned()}))
///         }),
///     )
///     .add_task(
///         "report",
///         DocumentOperator::from_fn("report", |_args, kwargs| {
///             Ok(json!(kwargs.len()))
///         }),
///     )
///     .add_routed_edge("scale", "report", "scaled")
///     .compile()
///     .expect("flow should validate");
///
/// assert_eq!(flow.task_count(), 2);
/// ```
pub struct FlowBuilder {
    /// Registry of all tasks, keyed by name.
    pub(crate) tasks: FxHashMap<String, Arc<dyn TaskCallback>>,
    /// Task names in registration order, for deterministic iteration.
    pub(crate) insertion_order: Vec<String>,
    /// Names registered more than once; rejected at compile time.
    pub(crate) duplicates: Vec<String>,
    /// Edges in definition order; definition order decides merge order at
    /// AND-joins.
    pub(crate) edges: Vec<Edge>,
    /// Terminal sinks per task name.
    pub(crate) sinks: FxHashMap<String, Vec<Arc<dyn SinkAdapter>>>,
    /// Runtime configuration for compiled instances.
    pub(crate) runtime_config: RuntimeConfig,
}

impl Default for FlowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowBuilder {
    /// Creates a new, empty flow builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: FxHashMap::default(),
            insertion_order: Vec::new(),
            duplicates: Vec::new(),
            edges: Vec::new(),
            sinks: FxHashMap::default(),
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Registers a task under a unique name.
    ///
    /// Registering the same name twice is recorded and rejected when the
    /// flow is compiled.
    #[must_use]
    pub fn add_task(mut self, name: impl Into<String>, callback: impl TaskCallback + 'static) -> Self {
        let name = name.into();
        if self.tasks.insert(name.clone(), Arc::new(callback)).is_some() {
            tracing::warn!(task = %name, "task registered more than once");
            self.duplicates.push(name);
        } else {
            self.insertion_order.push(name);
        }
        self
    }

    /// Adds an edge forwarding the source's entire output context.
    ///
    /// Multiple edges into the same destination create an AND-join: the
    /// destination executes once after every inbound edge has delivered,
    /// with the contributions merged in edge-definition order.
    #[must_use]
    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(Edge::forward_all(from, to));
        self
    }

    /// Adds an edge forwarding only the named keyword field.
    ///
    /// The selected field is merged additively into the destination's
    /// input, so heterogeneous stages can share one consumer without
    /// positional coupling.
    #[must_use]
    pub fn add_routed_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        self.edges.push(Edge::routed(from, to, key));
        self
    }

    /// Registers a terminal sink for a task.
    ///
    /// After the task runs, its materialized return value and attributes
    /// are handed to the sink. Several sinks may share one task.
    #[must_use]
    pub fn add_sink(
        mut self,
        task: impl Into<String>,
        sink: impl SinkAdapter + 'static,
    ) -> Self {
        self.sinks
            .entry(task.into())
            .or_default()
            .push(Arc::new(sink));
        self
    }

    /// Configures runtime settings for compiled instances.
    #[must_use]
    pub fn with_runtime_config(mut self, runtime_config: RuntimeConfig) -> Self {
        self.runtime_config = runtime_config;
        self
    }
}
