//! Edge types for flow graph topology.
//!
//! An edge connects a source task to a destination task. Routing is
//! controlled by the optional key: `None` forwards the source's entire
//! output context unchanged, while a named key forwards only that keyword
//! field, merged additively into the destination's input alongside the
//! other inbound edges.

/// A directed connection between two tasks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    /// Source task name.
    pub from: String,
    /// Destination task name.
    pub to: String,
    /// Routing key: `None` forwards the whole context, `Some(key)` forwards
    /// only that keyword field.
    pub key: Option<String>,
}

impl Edge {
    /// Edge forwarding the source's entire output context.
    pub fn forward_all(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            key: None,
        }
    }

    /// Edge forwarding only the named keyword field.
    pub fn routed(from: impl Into<String>, to: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            key: Some(key.into()),
        }
    }
}
