//! Per-event execution of one compiled flow.
//!
//! A [`FlowInstance`] owns the transient state of a single run: which
//! inbound edges have delivered, the contribution ledger feeding each
//! AND-join, and the fault log. Ready tasks execute concurrently on a
//! [`JoinSet`], bounded by the flow's parallelism setting; as each task
//! completes, its output is routed along outbound edges and any
//! newly-complete joins are spawned. Terminal outputs are handed to the
//! registered sinks.
//!
//! Nothing a task does can abort the instance: operator faults arrive
//! pre-contained in the output document's statistics, routing addressing
//! faults degrade to an empty contribution, and a panicking callback is
//! caught and converted to a failure document.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::document::{Document, RunStatistics, RunStatus};
use crate::event_bus::Event;
use crate::flow::Flow;
use crate::task::TaskContext;

/// Where a contained instance-level fault came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceFaultKind {
    /// The task's output document carried a `Failure` status.
    Transform,
    /// A routed edge referenced a field the output did not carry.
    Addressing,
    /// The callback panicked; caught and contained.
    Panic,
}

/// One contained fault observed while running an instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstanceFault {
    pub task: String,
    pub kind: InstanceFaultKind,
    pub message: String,
}

/// Completion bookkeeping for one flow instance.
///
/// Contains no payload data — documents flow through edges and sinks; the
/// report only aggregates what ran and what was contained.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InstanceReport {
    pub instance_id: String,
    /// Task names in completion order.
    pub ran_tasks: Vec<String>,
    /// Faults contained during the run, in observation order.
    pub faults: Vec<InstanceFault>,
    /// Number of successful sink deliveries.
    pub sink_deliveries: usize,
}

impl InstanceReport {
    /// True when every task completed without a contained fault.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// One run of a compiled flow over one seed document.
pub struct FlowInstance {
    flow: Arc<Flow>,
    id: String,
    event_sender: flume::Sender<Event>,
}

impl FlowInstance {
    /// Create an instance with a fresh id.
    pub fn new(flow: Arc<Flow>, event_sender: flume::Sender<Event>) -> Self {
        Self {
            flow,
            id: Uuid::new_v4().to_string(),
            event_sender,
        }
    }

    /// Identifier of this instance.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Execute the flow to completion.
    ///
    /// Every task runs exactly once: roots receive clones of `seed`, joins
    /// fire when their last inbound edge delivers, and the loop ends when
    /// the join set drains. The returned report carries completion
    /// bookkeeping only.
    pub async fn run(&self, seed: Document) -> InstanceReport {
        let flow = Arc::clone(&self.flow);
        let mut report = InstanceReport {
            instance_id: self.id.clone(),
            ran_tasks: Vec::new(),
            faults: Vec::new(),
            sink_deliveries: 0,
        };

        // Contribution ledger: one slot per inbound edge, filled as
        // deliveries arrive, merged in edge-definition order at the join.
        let mut slots: FxHashMap<String, Vec<Option<Document>>> = FxHashMap::default();
        let mut remaining: FxHashMap<String, usize> = FxHashMap::default();
        for task in flow.topological_order() {
            let inbound = flow.inbound(task).len();
            slots.insert(task.clone(), vec![None; inbound]);
            remaining.insert(task.clone(), inbound);
        }

        let semaphore = Arc::new(Semaphore::new(
            flow.runtime_config().parallelism.max(1),
        ));
        let mut join_set: JoinSet<(String, Document)> = JoinSet::new();

        for root in flow.roots() {
            self.spawn_task(&mut join_set, &semaphore, root, seed.clone());
        }

        while let Some(joined) = join_set.join_next().await {
            let (task_name, output) = match joined {
                Ok(pair) => pair,
                // Panics are already converted inside the spawned future;
                // a join error here means the task was cancelled externally.
                Err(err) => {
                    tracing::error!(error = %err, "task join failed; abandoning instance");
                    break;
                }
            };

            tracing::debug!(
                instance = %self.id,
                task = %task_name,
                "task completed"
            );
            report.ran_tasks.push(task_name.clone());

            if output.statistics().is_failure() {
                let message = output
                    .statistics()
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "unspecified failure".to_string());
                let kind = if message == PANIC_MESSAGE {
                    InstanceFaultKind::Panic
                } else {
                    InstanceFaultKind::Transform
                };
                report.faults.push(InstanceFault {
                    task: task_name.clone(),
                    kind,
                    message,
                });
            }

            self.deliver_to_sinks(&task_name, &output, &mut report);

            for &edge_index in flow.outbound(&task_name) {
                let edge = &flow.edges()[edge_index];
                let contribution = match &edge.key {
                    None => output.clone(),
                    Some(key) => match output.select_kwarg(key) {
                        Ok(projected) => projected,
                        Err(err) => {
                            // Addressing faults are wiring defects; keep the
                            // join alive with an empty contribution that
                            // still carries the attributes.
                            tracing::error!(
                                instance = %self.id,
                                task = %task_name,
                                to = %edge.to,
                                error = %err,
                                "addressing fault while routing; delivering empty contribution"
                            );
                            let _ = self.event_sender.send(Event::task_scoped(
                                self.id.clone(),
                                task_name.clone(),
                                "addressing",
                                err.to_string(),
                            ));
                            report.faults.push(InstanceFault {
                                task: task_name.clone(),
                                kind: InstanceFaultKind::Addressing,
                                message: err.to_string(),
                            });
                            let mut empty = Document::empty();
                            empty.add_attributes(output.attributes());
                            empty
                        }
                    },
                };

                let Some(slot_index) = flow
                    .inbound(&edge.to)
                    .iter()
                    .position(|&index| index == edge_index)
                else {
                    continue;
                };
                if let Some(task_slots) = slots.get_mut(&edge.to) {
                    task_slots[slot_index] = Some(contribution);
                }

                let ready = match remaining.get_mut(&edge.to) {
                    Some(count) => {
                        *count = count.saturating_sub(1);
                        *count == 0
                    }
                    None => false,
                };
                if ready {
                    let contributions: Vec<Document> = slots
                        .remove(&edge.to)
                        .into_iter()
                        .flatten()
                        .flatten()
                        .collect();
                    let input = merge_contributions(contributions);
                    self.spawn_task(&mut join_set, &semaphore, &edge.to, input);
                }
            }
        }

        tracing::info!(
            instance = %self.id,
            ran = report.ran_tasks.len(),
            faults = report.faults.len(),
            "instance completed"
        );
        report
    }

    /// Hand a task's materialized output to its registered sinks.
    fn deliver_to_sinks(&self, task: &str, output: &Document, report: &mut InstanceReport) {
        let sinks = self.flow.sinks_for(task);
        if sinks.is_empty() {
            return;
        }
        let materialized = output.get_return();
        for sink in sinks {
            match sink.deliver(&materialized, output.attributes()) {
                Ok(()) => report.sink_deliveries += 1,
                Err(err) => {
                    tracing::warn!(
                        instance = %self.id,
                        task = %task,
                        error = %err,
                        "sink rejected delivery"
                    );
                }
            }
        }
    }

    /// Spawn one task onto the join set, bounded by the semaphore.
    fn spawn_task(
        &self,
        join_set: &mut JoinSet<(String, Document)>,
        semaphore: &Arc<Semaphore>,
        name: &str,
        input: Document,
    ) {
        let Some(callback) = self.flow.callback(name).cloned() else {
            tracing::error!(task = %name, "compiled flow is missing a callback");
            return;
        };
        let ctx = TaskContext {
            instance_id: self.id.clone(),
            task_name: name.to_string(),
            event_sender: self.event_sender.clone(),
        };
        let semaphore = Arc::clone(semaphore);
        let task_name = name.to_string();

        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let fallback_attributes = input.attributes().clone();
            let outcome = AssertUnwindSafe(callback.run(input, ctx)).catch_unwind().await;
            let output = match outcome {
                Ok(document) => document,
                Err(_) => {
                    tracing::error!(task = %task_name, "task callback panicked; contained");
                    let statistics = RunStatistics {
                        status: Some(RunStatus::Failure),
                        error_message: Some(PANIC_MESSAGE.to_string()),
                        ..RunStatistics::default()
                    };
                    let mut document = Document::new(
                        Vec::new(),
                        FxHashMap::default(),
                        fallback_attributes,
                    );
                    document.add_statistics(&statistics);
                    document
                }
            };
            (task_name, output)
        });
    }
}

const PANIC_MESSAGE: &str = "task callback panicked";

/// Merge AND-join contributions in edge-definition order.
fn merge_contributions(mut contributions: Vec<Document>) -> Document {
    if contributions.is_empty() {
        return Document::empty();
    }
    let first = contributions.remove(0);
    first.merge(contributions.iter())
}
