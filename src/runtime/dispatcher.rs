//! Dynamic spawning of flow instances from instrument events.
//!
//! The dispatcher is the engine's front door. For each incoming
//! [`InstrumentEvent`] it:
//!
//! 1. validates the event's attributes against a required-attribute
//!    [`EventSchema`] (exact type check — a rejected event is logged,
//!    counted, and dropped, spawning nothing);
//! 2. discovers data items: for each configured data key present in the
//!    payload, every array element seeds one independent
//!    [`FlowInstance`](super::FlowInstance);
//! 3. joins all spawned instances (success or contained failure) and
//!    returns a [`DispatchReport`] aggregating completion bookkeeping only.
//!
//! Instances share no mutable state; schema and data keys are injected at
//! construction.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::join_all;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::FlowInstance;
use super::instance::InstanceReport;
use crate::document::{Attributes, Document};
use crate::event::{InstrumentEvent, SourceAdapter};
use crate::event_bus::{Event, EventBus};
use crate::flow::Flow;

/// Expected JSON type of a required attribute.
///
/// Matching is exact, not duck-typed: an integer does not satisfy `Float`,
/// a numeric string does not satisfy `Int`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrType {
    String,
    Int,
    Float,
    Bool,
    Array,
    Object,
}

impl AttrType {
    /// Whether `value` is exactly of this type.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            AttrType::String => value.is_string(),
            AttrType::Int => value.as_i64().is_some() || value.as_u64().is_some(),
            AttrType::Float => matches!(value, Value::Number(n) if n.is_f64()),
            AttrType::Bool => value.is_boolean(),
            AttrType::Array => value.is_array(),
            AttrType::Object => value.is_object(),
        }
    }

    /// Human-readable name of the JSON type of `value`.
    #[must_use]
    pub fn name_of(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(n) if n.is_f64() => "float",
            Value::Number(_) => "int",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

/// Event rejection raised by schema validation.
///
/// Non-fatal: the offending event is dropped and counted, nothing spawns.
#[derive(Clone, Debug, Error, Diagnostic, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationError {
    /// A required attribute key is absent.
    #[error("event is missing required attribute `{key}`")]
    #[diagnostic(
        code(beamflow::dispatch::missing_attribute),
        help("The acquisition side did not supply this key; check the source adapter.")
    )]
    MissingAttribute { key: String },

    /// A required attribute is present with the wrong type.
    #[error("attribute `{key}` has type {found}, expected {expected}")]
    #[diagnostic(code(beamflow::dispatch::type_mismatch))]
    TypeMismatch {
        key: String,
        expected: String,
        found: String,
    },
}

/// Required-attribute schema: attribute name → expected type.
///
/// # Examples
///
/// ```rust
/// use beamflow::runtime::{AttrType, EventSchema};
/// use rustc_hash::FxHashMap;
/// use serde_json::json;
///
/// let schema = EventSchema::new()
///     .require("sample_name", AttrType::String)
///     .require("exposure_time", AttrType::Float);
///
/// let mut attrs = FxHashMap::default();
/// attrs.insert("sample_name".to_string(), json!("AgBH"));
/// attrs.insert("exposure_time".to_string(), json!(0.1));
/// assert!(schema.validate(&attrs).is_ok());
///
/// attrs.insert("exposure_time".to_string(), json!("0.1"));
/// assert!(schema.validate(&attrs).is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct EventSchema {
    required: FxHashMap<String, AttrType>,
}

impl EventSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one required attribute.
    #[must_use]
    pub fn require(mut self, key: impl Into<String>, expected: AttrType) -> Self {
        self.required.insert(key.into(), expected);
        self
    }

    /// Check an attribute map against the schema.
    ///
    /// Reports the first missing key or type mismatch (keys checked in
    /// sorted order so the reported failure is deterministic).
    pub fn validate(&self, attributes: &FxHashMap<String, Value>) -> Result<(), ValidationError> {
        let mut keys: Vec<(&String, &AttrType)> = self.required.iter().collect();
        keys.sort_by_key(|(key, _)| key.as_str());
        for (key, expected) in keys {
            match attributes.get(key) {
                None => {
                    return Err(ValidationError::MissingAttribute { key: key.clone() });
                }
                Some(value) if !expected.matches(value) => {
                    return Err(ValidationError::TypeMismatch {
                        key: key.clone(),
                        expected: format!("{expected:?}").to_lowercase(),
                        found: AttrType::name_of(value).to_string(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Lifetime counters kept by a dispatcher.
#[derive(Debug, Default)]
pub struct DispatchStats {
    events: AtomicU64,
    rejected: AtomicU64,
    spawned: AtomicU64,
}

/// Point-in-time snapshot of [`DispatchStats`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchCounts {
    pub events: u64,
    pub rejected: u64,
    pub spawned: u64,
}

impl DispatchStats {
    fn snapshot(&self) -> DispatchCounts {
        DispatchCounts {
            events: self.events.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            spawned: self.spawned.load(Ordering::Relaxed),
        }
    }
}

/// Completion bookkeeping for one dispatched event.
#[derive(Debug)]
pub struct DispatchReport {
    pub event_id: String,
    /// Number of instances spawned (zero when rejected).
    pub spawned: usize,
    /// Per-instance reports, in spawn order.
    pub instances: Vec<InstanceReport>,
    /// Why the event was rejected, when it was.
    pub rejection: Option<ValidationError>,
}

impl DispatchReport {
    /// Total contained faults across all instances.
    #[must_use]
    pub fn fault_count(&self) -> usize {
        self.instances.iter().map(|r| r.faults.len()).sum()
    }
}

/// Validates events and spawns one flow instance per discovered data item.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use beamflow::event::InstrumentEvent;
/// use beamflow::graph::FlowBuilder;
/// use beamflow::operator::DocumentOperator;
/// use beamflow::runtime::{AttrType, Dispatcher, EventSchema};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let flow = Arc::new(
///     FlowBuilder::new()
///         .add_task(
///             "threshold",
///             DocumentOperator::from_fn("threshold", |_args, kwargs| {
///                 Ok(json!({"above": kwargs.get("data").is_some()}))
///             }),
///         )
///         .compile()?,
/// );
///
/// let schema = EventSchema::new().require("sample_name", AttrType::String);
/// let dispatcher = Dispatcher::new(flow, schema, ["image"]);
///
/// let event = InstrumentEvent::new("scan-42")
///     .with_attribute("sample_name", json!("AgBH"))
///     .with_payload("image", vec![json!([[0, 1], [1, 0]]), json!([[2, 2], [2, 2]])]);
///
/// let report = dispatcher.dispatch(event).await;
/// assert_eq!(report.spawned, 2);
/// # Ok(())
/// # }
/// ```
pub struct Dispatcher {
    flow: Arc<Flow>,
    schema: EventSchema,
    data_keys: Vec<String>,
    stats: DispatchStats,
    event_bus: EventBus,
}

impl Dispatcher {
    /// Create a dispatcher with a default event bus (stdout sink).
    pub fn new(
        flow: Arc<Flow>,
        schema: EventSchema,
        data_keys: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::with_event_bus(flow, schema, data_keys, EventBus::default())
    }

    /// Create a dispatcher publishing to a caller-supplied event bus.
    pub fn with_event_bus(
        flow: Arc<Flow>,
        schema: EventSchema,
        data_keys: impl IntoIterator<Item = impl Into<String>>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            flow,
            schema,
            data_keys: data_keys.into_iter().map(Into::into).collect(),
            stats: DispatchStats::default(),
            event_bus,
        }
    }

    /// Lifetime counters: events seen, rejected, instances spawned.
    pub fn stats(&self) -> DispatchCounts {
        self.stats.snapshot()
    }

    /// The event bus instances publish to.
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Process one event: validate, spawn per data item, join all.
    ///
    /// Blocks until every spawned instance reports completion (success or
    /// contained failure). Never fails: rejections and faults are reported,
    /// not raised.
    pub async fn dispatch(&self, event: InstrumentEvent) -> DispatchReport {
        self.stats.events.fetch_add(1, Ordering::Relaxed);
        self.event_bus.listen_for_events();

        if let Err(rejection) = self.schema.validate(&event.attributes) {
            tracing::warn!(
                event = %event.id,
                error = %rejection,
                "event rejected by schema; dropping"
            );
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            let _ = self.event_bus.sender().send(Event::diagnostic(
                "validation",
                format!("event {} rejected: {rejection}", event.id),
            ));
            return DispatchReport {
                event_id: event.id,
                spawned: 0,
                instances: Vec::new(),
                rejection: Some(rejection),
            };
        }

        let seeds = self.discover_items(&event);
        let spawned = seeds.len();
        self.stats
            .spawned
            .fetch_add(spawned as u64, Ordering::Relaxed);
        tracing::info!(event = %event.id, spawned, "spawning flow instances");

        let instances: Vec<FlowInstance> = seeds
            .iter()
            .map(|_| FlowInstance::new(Arc::clone(&self.flow), self.event_bus.sender()))
            .collect();
        let runs = instances
            .iter()
            .zip(seeds)
            .map(|(instance, seed)| instance.run(seed));
        let reports = join_all(runs).await;

        DispatchReport {
            event_id: event.id,
            spawned,
            instances: reports,
            rejection: None,
        }
    }

    /// Drain a source adapter, dispatching every event it yields.
    pub async fn run_source(&self, source: &mut dyn SourceAdapter) -> Vec<DispatchReport> {
        let mut reports = Vec::new();
        while let Some(event) = source.next_event() {
            reports.push(self.dispatch(event).await);
        }
        reports
    }

    /// One seed document per data item under the configured data keys.
    ///
    /// The item value lands in `kwargs["data"]`; the event's attributes,
    /// the originating data key, and the item's sequence number land in
    /// the seed's attributes.
    fn discover_items(&self, event: &InstrumentEvent) -> Vec<Document> {
        let mut seeds = Vec::new();
        for data_key in &self.data_keys {
            let Some(items) = event.payload.get(data_key) else {
                continue;
            };
            for (seq_num, item) in items.iter().enumerate() {
                let mut attributes = Attributes::from_map(event.attributes.clone());
                attributes
                    .insert("event_id", Value::String(event.id.clone()))
                    .insert("data_key", Value::String(data_key.clone()))
                    .insert("seq_num", Value::from(seq_num));
                let mut kwargs = FxHashMap::default();
                kwargs.insert("data".to_string(), item.clone());
                seeds.push(Document::new(Vec::new(), kwargs, attributes));
            }
        }
        seeds
    }
}
