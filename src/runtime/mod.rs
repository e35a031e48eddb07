//! Flow execution runtime: per-event instances and the dynamic spawner.
//!
//! - [`FlowInstance`] runs one compiled flow over one seed document with
//!   AND-join delivery and concurrent task execution.
//! - [`Dispatcher`] validates instrument events against an [`EventSchema`]
//!   and spawns/joins one instance per discovered data item.
//! - [`RuntimeConfig`] carries injected execution settings.

mod config;
mod dispatcher;
mod instance;

pub use config::RuntimeConfig;
pub use dispatcher::{
    AttrType, DispatchCounts, DispatchReport, DispatchStats, Dispatcher, EventSchema,
    ValidationError,
};
pub use instance::{FlowInstance, InstanceFault, InstanceFaultKind, InstanceReport};
