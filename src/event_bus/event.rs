use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An observability event emitted during pipeline execution.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Event {
    Task(TaskEvent),
    Diagnostic(DiagnosticEvent),
}

impl Event {
    /// Build a task-scoped event carrying instance and task identity.
    pub fn task_scoped(
        instance: impl Into<String>,
        task: impl Into<String>,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Event::Task(TaskEvent {
            instance: Some(instance.into()),
            task: Some(task.into()),
            scope: scope.into(),
            message: message.into(),
            when: Utc::now(),
        })
    }

    /// Build an engine-level diagnostic event.
    pub fn diagnostic(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Diagnostic(DiagnosticEvent {
            scope: scope.into(),
            message: message.into(),
            when: Utc::now(),
        })
    }

    pub fn scope_label(&self) -> &str {
        match self {
            Event::Task(task) => &task.scope,
            Event::Diagnostic(diag) => &diag.scope,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Event::Task(task) => &task.message,
            Event::Diagnostic(diag) => &diag.message,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Task(task) => write!(
                f,
                "[{}] {}/{}: {}",
                task.scope,
                task.instance.as_deref().unwrap_or("-"),
                task.task.as_deref().unwrap_or("-"),
                task.message
            ),
            Event::Diagnostic(diag) => write!(f, "[{}] {}", diag.scope, diag.message),
        }
    }
}

/// Event emitted by (or about) a task inside a flow instance.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TaskEvent {
    /// Flow instance the task ran in, when known.
    pub instance: Option<String>,
    /// Task name, when known.
    pub task: Option<String>,
    /// Caller-chosen scope label (e.g. "fault", "routing").
    pub scope: String,
    pub message: String,
    pub when: DateTime<Utc>,
}

/// Engine-level diagnostic not tied to a single task.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticEvent {
    pub scope: String,
    pub message: String,
    pub when: DateTime<Utc>,
}
