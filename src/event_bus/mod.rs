//! Event bus utilities providing fan-out to pluggable sinks.
//!
//! Execution emits structured [`Event`]s (task-scoped messages, contained
//! faults, validation rejections) onto a flume channel; a background
//! listener owned by [`EventBus`] fans them out to every registered
//! [`EventSink`].

pub mod bus;
pub mod event;
pub mod sink;

pub use bus::EventBus;
pub use event::{DiagnosticEvent, Event, TaskEvent};
pub use sink::{ChannelSink, EventSink, MemorySink, StdOutSink};
