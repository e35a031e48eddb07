//! Normalization of raw transform results into positional/keyword form.
//!
//! A transform returns one plain JSON value. Before that value can seed a
//! fresh [`Document`](crate::document::Document) it is classified into a
//! tagged union, [`ParsedResult`]: either a keyword map (a JSON object,
//! exploded entry-by-entry) or a positional sequence (anything else, as a
//! single value). Dispatch on result shape happens exactly once, here, and
//! downstream code matches on the tag instead of sniffing value types.
//!
//! [`MapPolicy::Opaque`] is the escape hatch for transforms whose natural
//! return value *is* a map: it forces the object to be carried as one
//! positional value instead of exploded into keywords.

use rustc_hash::FxHashMap;
use serde_json::Value;

/// How a JSON object result should be treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MapPolicy {
    /// Explode object entries into keyword arguments (the default).
    #[default]
    Explode,
    /// Carry the object as one opaque positional value.
    Opaque,
}

/// Tagged classification of a raw transform result.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedResult {
    /// The result populates positional args.
    Positional(Vec<Value>),
    /// The result populates keyword args.
    Keyword(FxHashMap<String, Value>),
}

/// Classify a raw transform result under the given map policy.
///
/// A JSON object becomes [`ParsedResult::Keyword`] under
/// [`MapPolicy::Explode`]; any other value, or an object under
/// [`MapPolicy::Opaque`], becomes a one-element
/// [`ParsedResult::Positional`].
///
/// # Examples
///
/// ```rust
/// use beamflow::arguments::{parse_result, MapPolicy, ParsedResult};
/// use serde_json::json;
///
/// let keyword = parse_result(json!({"q": [0.1, 0.2]}), MapPolicy::Explode);
/// assert!(matches!(keyword, ParsedResult::Keyword(_)));
///
/// let positional = parse_result(json!({"q": [0.1, 0.2]}), MapPolicy::Opaque);
/// assert!(matches!(positional, ParsedResult::Positional(ref args) if args.len() == 1));
/// ```
pub fn parse_result(raw: Value, policy: MapPolicy) -> ParsedResult {
    match raw {
        Value::Object(map) if policy == MapPolicy::Explode => {
            ParsedResult::Keyword(map.into_iter().collect())
        }
        other => ParsedResult::Positional(vec![other]),
    }
}

/// Transient (positional, keyword) pair, immediately consumed to populate a
/// new document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Arguments {
    pub args: Vec<Value>,
    pub kwargs: FxHashMap<String, Value>,
}

impl Arguments {
    pub fn new(args: Vec<Value>, kwargs: FxHashMap<String, Value>) -> Self {
        Self { args, kwargs }
    }
}

impl From<ParsedResult> for Arguments {
    fn from(parsed: ParsedResult) -> Self {
        match parsed {
            ParsedResult::Positional(args) => Arguments {
                args,
                kwargs: FxHashMap::default(),
            },
            ParsedResult::Keyword(kwargs) => Arguments {
                args: Vec::new(),
                kwargs,
            },
        }
    }
}
