//! The Document value type and its merge/select algebra.
//!
//! A [`Document`] is the unit of data that flows between pipeline stages. It
//! carries a positional payload (`args`), a keyword payload (`kwargs`),
//! cross-cutting metadata ([`Attributes`], including the ordered
//! `function_list` provenance), per-run [`RunStatistics`], an opaque
//! provenance map, an opaque checkpoint marker, and a unique id assigned at
//! construction.
//!
//! # Copy-on-write discipline
//!
//! Documents are immutable once shared: [`Document::merge`],
//! [`Document::select`], and the attribute-shuttling helpers all produce a
//! *new* document with a fresh uid. The `add_*` family mutates in place and
//! exists for the construction phase only, before a document has been handed
//! to more than one consumer. This is what makes it safe to fan a document
//! out to several downstream edges: no branch can observe another's changes.
//!
//! # Merge semantics
//!
//! - `args` are concatenated in document order, never overwritten.
//! - `kwargs`, attribute entries, statistics, provenance, and checkpoint are
//!   merged last-writer-wins (the right-hand document overrides on
//!   collision).
//!
//! # Examples
//!
//! ```rust
//! use beamflow::document::Document;
//! use serde_json::json;
//!
//! let left = Document::builder().with_kwarg("a", json!(1)).build();
//! let right = Document::builder()
//!     .with_kwarg("a", json!(2))
//!     .with_kwarg("b", json!(3))
//!     .build();
//!
//! let merged = left.merge([&right]);
//! assert_eq!(merged.kwargs().get("a"), Some(&json!(2)));
//! assert_eq!(merged.kwargs().get("b"), Some(&json!(3)));
//! assert_ne!(merged.uid(), left.uid());
//! ```

use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Key prefix used when positional args are folded into keyword form.
const ARG_KEY_PREFIX: &str = "arg_";

/// Addressing failure raised when a selection references a field the
/// document does not carry.
///
/// This usually indicates a wiring bug in the pipeline definition rather
/// than bad data, so it is surfaced distinctly from execution faults.
#[derive(Debug, Error, Diagnostic)]
pub enum AddressingError {
    /// A keyword field was requested that is not present in `kwargs`.
    #[error("missing keyword field `{key}`")]
    #[diagnostic(
        code(beamflow::document::missing_kwarg),
        help("Check the routing keys and select mappings of the upstream stage.")
    )]
    MissingKwarg { key: String },

    /// A positional index was requested beyond the end of `args`.
    #[error("positional index {index} out of range (document has {len} args)")]
    #[diagnostic(
        code(beamflow::document::missing_arg),
        help("Check the positional ordering produced by the upstream stage.")
    )]
    MissingArg { index: usize, len: usize },
}

/// Source side of a select mapping, and the selector for indexed access.
///
/// An integer addresses a positional arg; a string addresses a keyword
/// field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    /// Positional argument by index.
    Arg(usize),
    /// Keyword argument by name.
    Kwarg(String),
}

impl Selector {
    /// Selector for the positional argument at `index`.
    pub fn arg(index: usize) -> Self {
        Selector::Arg(index)
    }

    /// Selector for the keyword argument named `key`.
    pub fn kwarg(key: impl Into<String>) -> Self {
        Selector::Kwarg(key.into())
    }
}

impl From<usize> for Selector {
    fn from(index: usize) -> Self {
        Selector::Arg(index)
    }
}

impl From<&str> for Selector {
    fn from(key: &str) -> Self {
        Selector::Kwarg(key.to_string())
    }
}

impl From<String> for Selector {
    fn from(key: String) -> Self {
        Selector::Kwarg(key)
    }
}

/// Destination side of a select mapping.
///
/// [`Target::Args`] appends the selected value to the output's positional
/// payload; [`Target::Kwarg`] writes it under a (possibly new) keyword name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// Append to the output args.
    Args,
    /// Write to the output kwargs under this name.
    Kwarg(String),
}

impl Target {
    /// Target writing to the keyword argument named `key`.
    pub fn kwarg(key: impl Into<String>) -> Self {
        Target::Kwarg(key.into())
    }
}

impl From<&str> for Target {
    fn from(key: &str) -> Self {
        Target::Kwarg(key.to_string())
    }
}

impl From<String> for Target {
    fn from(key: String) -> Self {
        Target::Kwarg(key)
    }
}

/// What a transform "would have returned": the materialized payload of a
/// document, produced by [`Document::get_return`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Return {
    /// A single bare value (the document carried exactly one arg and no
    /// kwargs).
    Value(Value),
    /// The ordered positional payload (several args, no kwargs).
    Positional(Vec<Value>),
    /// The keyword payload (kwargs only).
    Keyword(FxHashMap<String, Value>),
    /// Both payloads were present; the shape is ambiguous, so the whole
    /// document is handed back and the caller must deal with it explicitly.
    Document(Box<Document>),
}

impl Return {
    /// Collapse into a plain JSON value.
    ///
    /// `Keyword` becomes an object, `Positional` an array, `Document` the
    /// document's full serialized form.
    pub fn into_value(self) -> Value {
        match self {
            Return::Value(v) => v,
            Return::Positional(args) => Value::Array(args),
            Return::Keyword(kwargs) => {
                Value::Object(kwargs.into_iter().collect::<serde_json::Map<_, _>>())
            }
            Return::Document(doc) => serde_json::to_value(*doc).unwrap_or(Value::Null),
        }
    }
}

/// Execution status recorded by the transform wrapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Success,
    Failure,
}

/// Per-run bookkeeping stamped onto a document by the transform wrapper.
///
/// Merged last-writer-wins like the other metadata maps: a later document's
/// populated fields override, unset fields leave the existing value alone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Whether the producing transform succeeded.
    pub status: Option<RunStatus>,
    /// Wall-clock runtime of the producing transform, in seconds.
    pub runtime: Option<f64>,
    /// When the producing transform started.
    pub runstart: Option<DateTime<Utc>>,
    /// Fault description when `status` is `Failure`.
    pub error_message: Option<String>,
}

impl RunStatistics {
    /// Last-writer-wins merge: populated fields of `other` override.
    pub fn merge_from(&mut self, other: &RunStatistics) {
        if other.status.is_some() {
            self.status = other.status;
        }
        if other.runtime.is_some() {
            self.runtime = other.runtime;
        }
        if other.runstart.is_some() {
            self.runstart = other.runstart;
        }
        if other.error_message.is_some() {
            self.error_message = other.error_message.clone();
        }
    }

    /// True when the recorded status is `Failure`.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status == Some(RunStatus::Failure)
    }
}

/// Cross-cutting metadata carried alongside a document's payload.
///
/// Arbitrary entries merge last-writer-wins; the `function_list` is the
/// ordered provenance of transform names applied along this document's
/// lineage and is appended to exactly once per transform application.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    entries: FxHashMap<String, Value>,
    function_list: Vec<String>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build attributes from an existing metadata map.
    pub fn from_map(entries: FxHashMap<String, Value>) -> Self {
        Self {
            entries,
            function_list: Vec::new(),
        }
    }

    /// Insert or overwrite a metadata entry.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.entries.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> &FxHashMap<String, Value> {
        &self.entries
    }

    /// Ordered provenance of transform names applied so far.
    pub fn function_list(&self) -> &[String] {
        &self.function_list
    }

    /// Append one transform name to the provenance record.
    pub fn push_function(&mut self, name: impl Into<String>) {
        self.function_list.push(name.into());
    }

    /// Last-writer-wins merge of entries; `other`'s provenance replaces
    /// this one's when non-empty.
    pub fn merge_from(&mut self, other: &Attributes) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
        if !other.function_list.is_empty() {
            self.function_list = other.function_list.clone();
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.function_list.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self::from_map(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Structured carrier of positional/keyword payload plus metadata.
///
/// See the [module docs](self) for the merge semantics and copy-on-write
/// discipline. Constructed via [`Document::new`] or [`Document::builder`];
/// combined via [`merge`](Self::merge); re-addressed via
/// [`select`](Self::select); materialized via [`get_return`](Self::get_return).
///
/// # Examples
///
/// ```rust
/// use beamflow::document::{Document, Return};
/// use serde_json::json;
///
/// // A single positional value materializes unwrapped, the way a plain
/// // function would have returned it.
/// let doc = Document::builder().with_arg(json!(42)).build();
/// assert_eq!(doc.get_return(), Return::Value(json!(42)));
///
/// // A keyword-only document materializes as its kwargs map.
/// let doc = Document::builder().with_kwarg("x", json!("v")).build();
/// match doc.get_return() {
///     Return::Keyword(kwargs) => assert_eq!(kwargs.get("x"), Some(&json!("v"))),
///     other => panic!("unexpected shape: {other:?}"),
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    args: Vec<Value>,
    kwargs: FxHashMap<String, Value>,
    attributes: Attributes,
    statistics: RunStatistics,
    provenance: FxHashMap<String, Value>,
    checkpoint: FxHashMap<String, Value>,
    uid: Uuid,
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl Document {
    /// Create a document with the given payload and attributes, a fresh
    /// uid, and empty statistics/provenance/checkpoint.
    pub fn new(args: Vec<Value>, kwargs: FxHashMap<String, Value>, attributes: Attributes) -> Self {
        Self {
            args,
            kwargs,
            attributes,
            statistics: RunStatistics::default(),
            provenance: FxHashMap::default(),
            checkpoint: FxHashMap::default(),
            uid: Uuid::new_v4(),
        }
    }

    /// An empty document (fresh uid, no payload).
    pub fn empty() -> Self {
        Self::new(Vec::new(), FxHashMap::default(), Attributes::default())
    }

    /// Fluent builder for constructing documents in tests and adapters.
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::default()
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn kwargs(&self) -> &FxHashMap<String, Value> {
        &self.kwargs
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn statistics(&self) -> &RunStatistics {
        &self.statistics
    }

    pub fn provenance(&self) -> &FxHashMap<String, Value> {
        &self.provenance
    }

    pub fn checkpoint(&self) -> &FxHashMap<String, Value> {
        &self.checkpoint
    }

    pub fn uid(&self) -> Uuid {
        self.uid
    }

    // ------------------------------------------------------------------
    // Construction-phase mutation
    // ------------------------------------------------------------------

    /// Append positional values. Args are only ever extended, never
    /// overwritten in place.
    pub fn add_args(&mut self, args: impl IntoIterator<Item = Value>) -> &mut Self {
        self.args.extend(args);
        self
    }

    /// Insert or overwrite one keyword value.
    pub fn add_kwarg(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.kwargs.insert(key.into(), value);
        self
    }

    /// Merge keyword values, last writer wins.
    pub fn add_kwargs(&mut self, kwargs: impl IntoIterator<Item = (String, Value)>) -> &mut Self {
        for (k, v) in kwargs {
            self.kwargs.insert(k, v);
        }
        self
    }

    /// Merge attribute metadata, last writer wins.
    pub fn add_attributes(&mut self, attributes: &Attributes) -> &mut Self {
        self.attributes.merge_from(attributes);
        self
    }

    /// Merge run statistics, last writer wins.
    pub fn add_statistics(&mut self, statistics: &RunStatistics) -> &mut Self {
        self.statistics.merge_from(statistics);
        self
    }

    /// Merge provenance entries, last writer wins.
    pub fn add_provenance(
        &mut self,
        provenance: impl IntoIterator<Item = (String, Value)>,
    ) -> &mut Self {
        for (k, v) in provenance {
            self.provenance.insert(k, v);
        }
        self
    }

    /// Merge checkpoint entries, last writer wins.
    pub fn add_checkpoint(
        &mut self,
        checkpoint: impl IntoIterator<Item = (String, Value)>,
    ) -> &mut Self {
        for (k, v) in checkpoint {
            self.checkpoint.insert(k, v);
        }
        self
    }

    // ------------------------------------------------------------------
    // Indexed access & materialization
    // ------------------------------------------------------------------

    /// Look up a single field by selector.
    ///
    /// Fails with [`AddressingError`] when the field is absent.
    pub fn get(&self, selector: &Selector) -> Result<&Value, AddressingError> {
        match selector {
            Selector::Arg(index) => self.args.get(*index).ok_or(AddressingError::MissingArg {
                index: *index,
                len: self.args.len(),
            }),
            Selector::Kwarg(key) => {
                self.kwargs
                    .get(key)
                    .ok_or_else(|| AddressingError::MissingKwarg { key: key.clone() })
            }
        }
    }

    /// Materialize what the producing transform "would have returned".
    ///
    /// - kwargs only → [`Return::Keyword`];
    /// - exactly one arg, no kwargs → that value unwrapped;
    /// - several args, no kwargs → [`Return::Positional`];
    /// - both present → [`Return::Document`] (ambiguous; the caller must
    ///   handle the full document explicitly).
    pub fn get_return(&self) -> Return {
        match (self.args.is_empty(), self.kwargs.is_empty()) {
            (true, false) => Return::Keyword(self.kwargs.clone()),
            (false, true) if self.args.len() == 1 => Return::Value(self.args[0].clone()),
            (false, true) => Return::Positional(self.args.clone()),
            _ => Return::Document(Box::new(self.clone())),
        }
    }

    // ------------------------------------------------------------------
    // Merge / select algebra
    // ------------------------------------------------------------------

    /// Combine this document with `others` into a new document.
    ///
    /// Right-biased union over kwargs/attributes/statistics/provenance/
    /// checkpoint; args concatenated in document order. The result carries
    /// a fresh uid; no input is modified.
    pub fn merge<'a>(&self, others: impl IntoIterator<Item = &'a Document>) -> Document {
        let mut merged = self.renewed();
        for other in others {
            merged.update_from(other);
        }
        merged
    }

    /// Re-address fields into a new document.
    ///
    /// Each mapping reads from this document ([`Selector`]) and writes into
    /// the output ([`Target`]): `Target::Args` appends positionally,
    /// `Target::Kwarg` names the field. All non-payload metadata carries
    /// over; the output gets a fresh uid. A missing source fails with
    /// [`AddressingError`] and leaves this document untouched.
    ///
    /// This is the sole mechanism for rewiring field names and positions
    /// between heterogeneous stages without positional coupling.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use beamflow::document::{Document, Selector, Target};
    /// use serde_json::json;
    ///
    /// let doc = Document::builder()
    ///     .with_arg(json!(10))
    ///     .with_arg(json!(20))
    ///     .with_kwarg("a", json!(5))
    ///     .build();
    ///
    /// let projected = doc
    ///     .select([
    ///         (Selector::kwarg("a"), Target::Args),
    ///         (Selector::arg(1), Target::kwarg("b")),
    ///     ])
    ///     .unwrap();
    ///
    /// assert_eq!(projected.args(), &[json!(5)]);
    /// assert_eq!(projected.kwargs().get("b"), Some(&json!(20)));
    /// ```
    pub fn select(
        &self,
        mappings: impl IntoIterator<Item = (Selector, Target)>,
    ) -> Result<Document, AddressingError> {
        let mut args = Vec::new();
        let mut kwargs = FxHashMap::default();
        for (selector, target) in mappings {
            let value = self.get(&selector)?.clone();
            match target {
                Target::Args => args.push(value),
                Target::Kwarg(key) => {
                    kwargs.insert(key, value);
                }
            }
        }
        let mut selected = self.renewed();
        selected.args = args;
        selected.kwargs = kwargs;
        Ok(selected)
    }

    /// Project a single keyword field under its own name.
    ///
    /// Shorthand for `select([(Selector::kwarg(key), Target::kwarg(key))])`;
    /// used by routed graph edges.
    pub fn select_kwarg(&self, key: &str) -> Result<Document, AddressingError> {
        self.select([(Selector::kwarg(key), Target::kwarg(key))])
    }

    /// Aggregate several documents into one.
    ///
    /// Every positional slot and every kwarg key collects its per-document
    /// values into a `Value::Array` in document order, uniformly; documents
    /// missing a slot or key simply contribute nothing to it. Attributes
    /// merge last-writer-wins across the inputs. Stacking of numeric arrays
    /// into higher-rank shapes is a domain-transform concern, not the
    /// carrier's.
    pub fn stack<'a>(docs: impl IntoIterator<Item = &'a Document>) -> Document {
        let mut args: Vec<Vec<Value>> = Vec::new();
        let mut kwargs: FxHashMap<String, Vec<Value>> = FxHashMap::default();
        let mut attributes = Attributes::default();

        for doc in docs {
            for (i, arg) in doc.args.iter().enumerate() {
                if args.len() <= i {
                    args.resize(i + 1, Vec::new());
                }
                args[i].push(arg.clone());
            }
            for (key, value) in &doc.kwargs {
                kwargs.entry(key.clone()).or_default().push(value.clone());
            }
            attributes.merge_from(&doc.attributes);
        }

        Document::new(
            args.into_iter().map(Value::Array).collect(),
            kwargs
                .into_iter()
                .map(|(k, vs)| (k, Value::Array(vs)))
                .collect(),
            attributes,
        )
    }

    // ------------------------------------------------------------------
    // Attribute shuttling
    // ------------------------------------------------------------------

    /// New document with extra attribute entries merged in.
    pub fn with_attributes(&self, entries: impl IntoIterator<Item = (String, Value)>) -> Document {
        let mut doc = self.renewed();
        for (k, v) in entries {
            doc.attributes.insert(k, v);
        }
        doc
    }

    /// New document with all attributes dropped.
    pub fn clear_attributes(&self) -> Document {
        let mut doc = self.renewed();
        doc.attributes = Attributes::default();
        doc
    }

    /// New document whose kwargs are this document's attribute entries.
    ///
    /// The inverse direction of [`kwargs_to_attributes`](Self::kwargs_to_attributes):
    /// lets a downstream transform consume metadata as ordinary keyword
    /// input.
    pub fn attributes_as_kwargs(&self) -> Document {
        Document::new(
            Vec::new(),
            self.attributes.entries().clone(),
            Attributes::default(),
        )
    }

    /// New document with the payload moved into the attribute entries.
    ///
    /// Kwargs move across under their own names; positional args are folded
    /// in under zero-padded `arg_NNNN` keys. The payload of the result is
    /// empty.
    pub fn kwargs_to_attributes(&self) -> Document {
        let mut doc = self.renewed();
        for (k, v) in doc.kwargs.drain() {
            doc.attributes.insert(k, v);
        }
        for (i, arg) in doc.args.drain(..).enumerate() {
            doc.attributes
                .insert(format!("{ARG_KEY_PREFIX}{i:04}"), arg);
        }
        doc
    }

    // ------------------------------------------------------------------
    // Fingerprinting
    // ------------------------------------------------------------------

    /// Deterministic fingerprint over the payload only.
    ///
    /// Derived from `(args, kwargs)` with canonical key ordering, and from
    /// nothing else — two documents with identical payload but different
    /// attributes, statistics, or uids fingerprint identically. Exposed so
    /// an external scheduler or cache can deduplicate identical
    /// invocations.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = FxHasher::default();
        hasher.write_usize(self.args.len());
        for arg in &self.args {
            hash_value(arg, &mut hasher);
        }
        let mut keys: Vec<&String> = self.kwargs.keys().collect();
        keys.sort();
        hasher.write_usize(keys.len());
        for key in keys {
            key.hash(&mut hasher);
            hash_value(&self.kwargs[key], &mut hasher);
        }
        hasher.finish()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Clone with a fresh uid; the seed of every copy-producing operation.
    fn renewed(&self) -> Document {
        let mut doc = self.clone();
        doc.uid = Uuid::new_v4();
        doc
    }

    /// In-place last-writer-wins merge used by [`merge`](Self::merge).
    fn update_from(&mut self, other: &Document) {
        self.args.extend(other.args.iter().cloned());
        for (k, v) in &other.kwargs {
            self.kwargs.insert(k.clone(), v.clone());
        }
        self.attributes.merge_from(&other.attributes);
        self.statistics.merge_from(&other.statistics);
        for (k, v) in &other.provenance {
            self.provenance.insert(k.clone(), v.clone());
        }
        for (k, v) in &other.checkpoint {
            self.checkpoint.insert(k.clone(), v.clone());
        }
    }
}

/// Canonical structural hash of a JSON value: type tag plus content, object
/// keys visited in sorted order, floats by bit pattern.
fn hash_value(value: &Value, hasher: &mut FxHasher) {
    match value {
        Value::Null => hasher.write_u8(0),
        Value::Bool(b) => {
            hasher.write_u8(1);
            b.hash(hasher);
        }
        Value::Number(n) => {
            hasher.write_u8(2);
            if let Some(i) = n.as_i64() {
                hasher.write_u8(0);
                i.hash(hasher);
            } else if let Some(u) = n.as_u64() {
                hasher.write_u8(1);
                u.hash(hasher);
            } else {
                hasher.write_u8(2);
                n.as_f64().unwrap_or(f64::NAN).to_bits().hash(hasher);
            }
        }
        Value::String(s) => {
            hasher.write_u8(3);
            s.hash(hasher);
        }
        Value::Array(items) => {
            hasher.write_u8(4);
            hasher.write_usize(items.len());
            for item in items {
                hash_value(item, hasher);
            }
        }
        Value::Object(map) => {
            hasher.write_u8(5);
            hasher.write_usize(map.len());
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                key.hash(hasher);
                hash_value(&map[key], hasher);
            }
        }
    }
}

/// Fluent builder for [`Document`].
///
/// # Examples
///
/// ```rust
/// use beamflow::document::Document;
/// use serde_json::json;
///
/// let doc = Document::builder()
///     .with_arg(json!([1, 2, 3]))
///     .with_kwarg("exposure_s", json!(0.1))
///     .with_attribute("detector", json!("pilatus2M"))
///     .build();
///
/// assert_eq!(doc.args().len(), 1);
/// assert_eq!(doc.attributes().get("detector"), Some(&json!("pilatus2M")));
/// ```
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    args: Vec<Value>,
    kwargs: FxHashMap<String, Value>,
    attributes: Attributes,
}

impl DocumentBuilder {
    /// Append one positional value.
    pub fn with_arg(mut self, value: Value) -> Self {
        self.args.push(value);
        self
    }

    /// Insert one keyword value.
    pub fn with_kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.kwargs.insert(key.into(), value);
        self
    }

    /// Insert one attribute entry.
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key, value);
        self
    }

    /// Build the document with a fresh uid.
    pub fn build(self) -> Document {
        Document::new(self.args, self.kwargs, self.attributes)
    }
}
