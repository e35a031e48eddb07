//! Flow compilation logic and validation.
//!
//! Compiling a [`FlowBuilder`](super::FlowBuilder) is the single point
//! where graph-construction errors surface. They are the only fatal errors
//! in the engine, and they fire before any event is processed: once a
//! [`Flow`](crate::flow::Flow) exists, every runtime fault is contained.

use std::collections::VecDeque;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::flow::Flow;

/// Structural errors raised while compiling a flow definition.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    /// The builder holds no tasks at all.
    #[error("flow has no tasks")]
    #[diagnostic(
        code(beamflow::graph::empty),
        help("Register at least one task before compiling.")
    )]
    Empty,

    /// The same task name was registered more than once.
    #[error("task `{name}` registered more than once")]
    #[diagnostic(
        code(beamflow::graph::duplicate_task),
        help("Task names identify nodes; give each registration a unique name.")
    )]
    DuplicateTask { name: String },

    /// An edge references a task name that was never registered.
    #[error("edge {from} -> {to} references unknown task `{unknown}`")]
    #[diagnostic(
        code(beamflow::graph::unknown_task),
        help("Every edge endpoint must be a registered task.")
    )]
    UnknownTask {
        from: String,
        to: String,
        unknown: String,
    },

    /// A sink was registered for a task name that does not exist.
    #[error("sink registered for unknown task `{name}`")]
    #[diagnostic(code(beamflow::graph::unknown_sink_task))]
    UnknownSinkTask { name: String },

    /// The edge set contains a cycle; flows must be acyclic.
    #[error("flow contains a cycle through: {members}")]
    #[diagnostic(
        code(beamflow::graph::cycle),
        help("AND-join delivery requires an acyclic graph; break the cycle or split the flow.")
    )]
    Cycle { members: String },
}

impl super::builder::FlowBuilder {
    /// Compiles the flow definition into an executable [`Flow`].
    ///
    /// Validation checks, in order: non-empty task set, unique task names,
    /// known edge endpoints, known sink tasks, acyclicity. The compiled
    /// flow caches inbound/outbound edge indices per task, the root and
    /// terminal sets, and a deterministic topological order.
    pub fn compile(self) -> Result<Flow, GraphError> {
        if self.tasks.is_empty() {
            return Err(GraphError::Empty);
        }
        if let Some(name) = self.duplicates.first() {
            return Err(GraphError::DuplicateTask { name: name.clone() });
        }
        for edge in &self.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !self.tasks.contains_key(endpoint) {
                    return Err(GraphError::UnknownTask {
                        from: edge.from.clone(),
                        to: edge.to.clone(),
                        unknown: endpoint.clone(),
                    });
                }
            }
        }
        for name in self.sinks.keys() {
            if !self.tasks.contains_key(name) {
                return Err(GraphError::UnknownSinkTask { name: name.clone() });
            }
        }

        // Inbound/outbound edge indices per task, in edge-definition order.
        // That order decides how AND-join contributions merge.
        let mut inbound: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        let mut outbound: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        for name in &self.insertion_order {
            inbound.insert(name.clone(), Vec::new());
            outbound.insert(name.clone(), Vec::new());
        }
        for (index, edge) in self.edges.iter().enumerate() {
            outbound.entry(edge.from.clone()).or_default().push(index);
            inbound.entry(edge.to.clone()).or_default().push(index);
        }

        let topological_order = kahn_order(&self.insertion_order, &inbound, &outbound, &self.edges)
            .map_err(|members| GraphError::Cycle {
                members: members.join(", "),
            })?;

        let roots: Vec<String> = self
            .insertion_order
            .iter()
            .filter(|name| inbound[*name].is_empty())
            .cloned()
            .collect();
        let terminals: Vec<String> = self
            .insertion_order
            .iter()
            .filter(|name| outbound[*name].is_empty())
            .cloned()
            .collect();

        tracing::debug!(
            tasks = self.insertion_order.len(),
            edges = self.edges.len(),
            roots = roots.len(),
            terminals = terminals.len(),
            "flow compiled"
        );

        Ok(Flow::from_parts(
            self.tasks,
            self.edges,
            inbound,
            outbound,
            roots,
            terminals,
            topological_order,
            self.sinks,
            self.runtime_config,
        ))
    }
}

/// Kahn's algorithm with insertion-order tie-breaking.
///
/// Returns the surviving (cyclic) task names on failure.
fn kahn_order(
    insertion_order: &[String],
    inbound: &FxHashMap<String, Vec<usize>>,
    outbound: &FxHashMap<String, Vec<usize>>,
    edges: &[super::edges::Edge],
) -> Result<Vec<String>, Vec<String>> {
    let mut indegree: FxHashMap<&str, usize> = insertion_order
        .iter()
        .map(|name| (name.as_str(), inbound[name].len()))
        .collect();

    let mut queue: VecDeque<&str> = insertion_order
        .iter()
        .filter(|name| indegree[name.as_str()] == 0)
        .map(String::as_str)
        .collect();

    let mut order = Vec::with_capacity(insertion_order.len());
    while let Some(name) = queue.pop_front() {
        order.push(name.to_string());
        for &edge_index in &outbound[name] {
            let to = edges[edge_index].to.as_str();
            if let Some(count) = indegree.get_mut(to) {
                *count -= 1;
                if *count == 0 {
                    queue.push_back(to);
                }
            }
        }
    }

    if order.len() == insertion_order.len() {
        Ok(order)
    } else {
        Err(insertion_order
            .iter()
            .filter(|name| !order.contains(*name))
            .cloned()
            .collect())
    }
}
