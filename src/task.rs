//! Task execution framework for flow graphs.
//!
//! This module provides the core abstractions for executable workflow
//! tasks: the [`TaskCallback`] trait, the execution context handed to each
//! task, and the context error type.
//!
//! A task receives its merged input [`Document`] and returns an output
//! [`Document`]. Task callbacks never fail the surrounding flow instance:
//! transform faults are contained upstream by the
//! [`DocumentOperator`](crate::operator::DocumentOperator) wrapper and ride
//! in the output document's statistics, so the graph always keeps moving.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::document::Document;
use crate::event_bus::Event;

/// Core trait defining executable workflow tasks.
///
/// Implementations should be stateless: each flow instance calls a task at
/// most once, but the same callback object is shared across all instances
/// spawned from one compiled flow.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use beamflow::document::Document;
/// use beamflow::task::{TaskCallback, TaskContext};
/// use serde_json::json;
///
/// struct TagStage;
///
/// #[async_trait]
/// impl TaskCallback for TagStage {
///     async fn run(&self, input: Document, _ctx: TaskContext) -> Document {
///         input.with_attributes([("stage".to_string(), json!("tagged"))])
///     }
/// }
/// ```
#[async_trait]
pub trait TaskCallback: Send + Sync {
    /// Execute this task with its merged input document.
    async fn run(&self, input: Document, ctx: TaskContext) -> Document;
}

/// Execution context passed to tasks during flow execution.
///
/// Carries the identity of the running flow instance and task, plus the
/// channel for emitting events to the bus.
#[derive(Clone, Debug)]
pub struct TaskContext {
    /// Identifier of the flow instance this task runs in.
    pub instance_id: String,
    /// Name of the task in the flow definition.
    pub task_name: String,
    /// Channel for emitting events to the workflow's event system.
    pub event_sender: flume::Sender<Event>,
}

impl TaskContext {
    /// Emit a task-scoped event enriched with this context's metadata.
    pub fn emit(
        &self,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), TaskContextError> {
        self.event_sender
            .send(Event::task_scoped(
                self.instance_id.clone(),
                self.task_name.clone(),
                scope,
                message,
            ))
            .map_err(|_| TaskContextError::EventBusUnavailable)
    }
}

/// Errors that can occur when using TaskContext methods.
#[derive(Debug, Error, Diagnostic)]
pub enum TaskContextError {
    /// Event could not be sent due to event bus disconnection.
    #[error("failed to emit event: event bus unavailable")]
    #[diagnostic(
        code(beamflow::task::event_bus_unavailable),
        help("The event bus may be disconnected. Check the flow runtime state.")
    )]
    EventBusUnavailable,
}

/// Adapter turning a plain closure over documents into a [`TaskCallback`].
///
/// Useful for routing or bookkeeping stages that never fault; anything that
/// executes a real transform should go through
/// [`DocumentOperator`](crate::operator::DocumentOperator) instead so
/// faults are contained and provenance is stamped.
pub struct FnTask<F>
where
    F: Fn(Document) -> Document + Send + Sync,
{
    func: F,
}

impl<F> FnTask<F>
where
    F: Fn(Document) -> Document + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> TaskCallback for FnTask<F>
where
    F: Fn(Document) -> Document + Send + Sync,
{
    async fn run(&self, input: Document, _ctx: TaskContext) -> Document {
        (self.func)(input)
    }
}
