//! The compiled, immutable flow graph.
//!
//! A [`Flow`] is the product of
//! [`FlowBuilder::compile`](crate::graph::FlowBuilder::compile): tasks,
//! validated acyclic edges, cached inbound/outbound indices, root and
//! terminal sets, a deterministic topological order, and the terminal
//! sinks. It is structurally immutable; every triggering event gets a
//! fresh [`FlowInstance`](crate::runtime::FlowInstance) so instances share
//! no mutable state.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::document::Document;
use crate::event::SinkAdapter;
use crate::event_bus::EventBus;
use crate::graph::Edge;
use crate::runtime::{FlowInstance, InstanceReport, RuntimeConfig};
use crate::task::TaskCallback;

/// An immutable, validated task graph ready for per-event instantiation.
#[derive(Clone)]
pub struct Flow {
    tasks: FxHashMap<String, Arc<dyn TaskCallback>>,
    edges: Vec<Edge>,
    inbound: FxHashMap<String, Vec<usize>>,
    outbound: FxHashMap<String, Vec<usize>>,
    roots: Vec<String>,
    terminals: Vec<String>,
    topological_order: Vec<String>,
    sinks: FxHashMap<String, Vec<Arc<dyn SinkAdapter>>>,
    runtime_config: RuntimeConfig,
}

impl Flow {
    /// Internal (crate) factory keeping the compiled structure private.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        tasks: FxHashMap<String, Arc<dyn TaskCallback>>,
        edges: Vec<Edge>,
        inbound: FxHashMap<String, Vec<usize>>,
        outbound: FxHashMap<String, Vec<usize>>,
        roots: Vec<String>,
        terminals: Vec<String>,
        topological_order: Vec<String>,
        sinks: FxHashMap<String, Vec<Arc<dyn SinkAdapter>>>,
        runtime_config: RuntimeConfig,
    ) -> Self {
        Self {
            tasks,
            edges,
            inbound,
            outbound,
            roots,
            terminals,
            topological_order,
            sinks,
            runtime_config,
        }
    }

    /// Number of registered tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Edges in definition order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Tasks with no inbound edges; they receive the seed document.
    #[must_use]
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Tasks with no outbound edges.
    #[must_use]
    pub fn terminals(&self) -> &[String] {
        &self.terminals
    }

    /// Deterministic topological order of all tasks.
    #[must_use]
    pub fn topological_order(&self) -> &[String] {
        &self.topological_order
    }

    /// Indices into [`edges`](Self::edges) arriving at `task`, in
    /// definition order. Definition order is also AND-join merge order.
    #[must_use]
    pub fn inbound(&self, task: &str) -> &[usize] {
        self.inbound.get(task).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Indices into [`edges`](Self::edges) leaving `task`, in definition
    /// order.
    #[must_use]
    pub fn outbound(&self, task: &str) -> &[usize] {
        self.outbound.get(task).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The callback registered under `task`.
    #[must_use]
    pub fn callback(&self, task: &str) -> Option<&Arc<dyn TaskCallback>> {
        self.tasks.get(task)
    }

    /// Sinks registered for `task`.
    #[must_use]
    pub fn sinks_for(&self, task: &str) -> &[Arc<dyn SinkAdapter>] {
        self.sinks.get(task).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Runtime configuration compiled into this flow.
    #[must_use]
    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.runtime_config
    }

    /// Run one instance of this flow over a seed document.
    ///
    /// Convenience entry point for single-shot execution; the dispatcher
    /// uses [`FlowInstance`] directly so many instances can share one
    /// event bus.
    pub async fn run(&self, seed: Document, bus: &EventBus) -> InstanceReport {
        bus.listen_for_events();
        FlowInstance::new(Arc::new(self.clone()), bus.sender())
            .run(seed)
            .await
    }
}
