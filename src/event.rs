//! Instrument events and the adapter seams at the system boundary.
//!
//! The core owns no wire or file format. A source adapter turns whatever an
//! acquisition system produces into [`InstrumentEvent`]s — an attribute map
//! plus a payload of named arrays — and the core only iterates and reads
//! fields. Sink adapters receive a terminal document's materialized return
//! value plus attributes and own all rendering and persistence.

use std::io::Result as IoResult;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{Attributes, Return};

/// One triggering event from an instrument: an identifier, raw metadata,
/// and a payload of named data arrays.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct InstrumentEvent {
    /// Source-assigned identifier (e.g. a run-start uid).
    pub id: String,
    /// Raw metadata, validated against the dispatcher's schema.
    pub attributes: FxHashMap<String, Value>,
    /// Named data arrays; each element is one spawnable data item.
    pub payload: FxHashMap<String, Vec<Value>>,
}

impl InstrumentEvent {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Set one metadata attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Set one named data array.
    #[must_use]
    pub fn with_payload(mut self, key: impl Into<String>, items: Vec<Value>) -> Self {
        self.payload.insert(key.into(), items);
        self
    }
}

/// Supplies events to a dispatcher. The core requires only iteration.
pub trait SourceAdapter: Send {
    /// Next event, or `None` when the source is exhausted.
    fn next_event(&mut self) -> Option<InstrumentEvent>;
}

/// Receives terminal outputs. Owns rendering, persistence, and format.
///
/// Delivery failures are logged by the flow instance and never fault the
/// pipeline.
pub trait SinkAdapter: Send + Sync {
    /// Accept one terminal result with its accompanying attributes.
    fn deliver(&self, output: &Return, attributes: &Attributes) -> IoResult<()>;
}

/// Source adapter over an in-memory event list, mainly for tests and
/// replays.
#[derive(Debug, Default)]
pub struct VecSource {
    events: std::vec::IntoIter<InstrumentEvent>,
}

impl VecSource {
    pub fn new(events: Vec<InstrumentEvent>) -> Self {
        Self {
            events: events.into_iter(),
        }
    }
}

impl SourceAdapter for VecSource {
    fn next_event(&mut self) -> Option<InstrumentEvent> {
        self.events.next()
    }
}
