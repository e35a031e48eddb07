//! The transform wrapper: plain functions become fault-isolated,
//! timeout-bounded document operators.
//!
//! A domain transform is a pure function over array-like inputs. It knows
//! nothing about [`Document`]s, provenance, or fault policy — it simply
//! computes, and raises an error on invalid input. [`DocumentOperator`]
//! adapts such a [`Transform`] into a Document→Document operator that:
//!
//! - extracts args/kwargs/attributes from its input document(s);
//! - bounds execution with a wall-clock timeout;
//! - contains every fault (timeout, execution error, wiring mismatch) into
//!   a `Failure` statistics record on an empty-result document, so one bad
//!   input never halts the surrounding workflow;
//! - normalizes the raw result through the
//!   [argument parser](crate::arguments) into a fresh document;
//! - appends exactly one `function_list` provenance entry per application.
//!
//! Callers inspect the returned [`OperatorOutcome`]; nothing is thrown
//! across the wrapper boundary.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::arguments::{Arguments, MapPolicy, parse_result};
use crate::document::{Attributes, Document, RunStatistics, RunStatus};
use crate::task::{TaskCallback, TaskContext};

/// A plain domain transform over array-like inputs.
///
/// Implementations must be exception-transparent: fail with a
/// [`TransformError`] on invalid input and let the wrapper handle
/// containment. The returned value is a single JSON value; a JSON object is
/// exploded into keyword outputs by the argument parser (see
/// [`MapPolicy`]).
#[async_trait]
pub trait Transform: Send + Sync {
    /// Name recorded in the `function_list` provenance of every output.
    fn name(&self) -> &str;

    /// Compute over positional and keyword inputs.
    async fn call(
        &self,
        args: &[Value],
        kwargs: &FxHashMap<String, Value>,
    ) -> Result<Value, TransformError>;
}

/// Failure raised by a transform.
///
/// `Wiring` marks a mismatch between the projected inputs and what the
/// transform expects — a pipeline-definition defect rather than bad data.
/// Both variants follow the same containment path.
#[derive(Debug, Error, Diagnostic)]
pub enum TransformError {
    /// The input shape does not match the transform's signature.
    #[error("input wiring mismatch: expected {expected}, got {got}")]
    #[diagnostic(
        code(beamflow::operator::wiring),
        help("The projected inputs do not fit this transform; check the select mappings and routing keys feeding it.")
    )]
    Wiring { expected: String, got: String },

    /// Any other computation fault.
    #[error("{message}")]
    #[diagnostic(code(beamflow::operator::fault))]
    Fault { message: String },
}

impl TransformError {
    /// Convenience constructor for an execution fault.
    pub fn fault(message: impl Into<String>) -> Self {
        TransformError::Fault {
            message: message.into(),
        }
    }

    /// Convenience constructor for a wiring mismatch.
    pub fn wiring(expected: impl Into<String>, got: impl Into<String>) -> Self {
        TransformError::Wiring {
            expected: expected.into(),
            got: got.into(),
        }
    }
}

/// Classification of a contained fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultKind {
    /// Input shape mismatched the transform signature (wiring defect).
    Wiring,
    /// The transform exceeded its wall-clock budget.
    Timeout,
    /// Any other raised fault.
    Execution,
}

/// Structured record of one contained fault.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaultRecord {
    pub kind: FaultKind,
    /// Name of the transform that faulted.
    pub transform: String,
    pub message: String,
    pub when: DateTime<Utc>,
}

/// Result of applying a document operator.
///
/// Always carries a document (empty-result on failure) so downstream stages
/// proceed; `fault` is populated when containment fired. Callers inspect
/// rather than catch.
#[derive(Clone, Debug)]
pub struct OperatorOutcome {
    pub document: Document,
    pub fault: Option<FaultRecord>,
}

impl OperatorOutcome {
    /// True when the transform completed without containment.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.fault.is_none()
    }

    /// Discard the fault record and keep the document.
    pub fn into_document(self) -> Document {
        self.document
    }
}

/// Configuration injected at operator construction.
///
/// Never read from process-wide state; construct explicitly and share where
/// several operators should agree.
#[derive(Clone, Copy, Debug)]
pub struct OperatorConfig {
    /// Wall-clock budget for one transform invocation.
    pub timeout: Duration,
    /// How JSON object results are normalized into a document.
    pub map_policy: MapPolicy,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            map_policy: MapPolicy::Explode,
        }
    }
}

/// A fault-isolated, timeout-bounded Document→Document operator.
///
/// Wraps a [`Transform`]; apply it to one document
/// ([`apply`](Self::apply)), or to two for accumulation semantics
/// (`new_state = transform(prev_state, new_instance)`,
/// [`apply_binary`](Self::apply_binary)). Implements
/// [`TaskCallback`], so wrapped transforms drop straight into flow graphs.
///
/// # Examples
///
/// ```rust,no_run
/// use beamflow::document::Document;
/// use beamflow::operator::{DocumentOperator, TransformError};
/// use serde_json::json;
///
/// # async fn example() {
/// let double = DocumentOperator::from_fn("double", |args, _kwargs| {
///     let x = args
///         .first()
///         .and_then(|v| v.as_f64())
///         .ok_or_else(|| TransformError::wiring("one numeric arg", "none"))?;
///     Ok(json!(x * 2.0))
/// });
///
/// let input = Document::builder().with_arg(json!(21.0)).build();
/// let outcome = double.apply(&input).await;
/// assert!(outcome.is_success());
/// assert_eq!(outcome.document.args(), &[json!(42.0)]);
/// # }
/// ```
#[derive(Clone)]
pub struct DocumentOperator {
    transform: Arc<dyn Transform>,
    config: OperatorConfig,
}

impl DocumentOperator {
    /// Wrap a transform with the default configuration.
    pub fn new(transform: impl Transform + 'static) -> Self {
        Self {
            transform: Arc::new(transform),
            config: OperatorConfig::default(),
        }
    }

    /// Wrap a plain closure as a named transform.
    pub fn from_fn<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value], &FxHashMap<String, Value>) -> Result<Value, TransformError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(FnTransform {
            name: name.into(),
            func,
        })
    }

    /// Replace the operator configuration.
    #[must_use]
    pub fn with_config(mut self, config: OperatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Name of the wrapped transform.
    pub fn name(&self) -> &str {
        self.transform.name()
    }

    /// Apply to one document: args/kwargs/attributes are taken directly
    /// from the input.
    pub async fn apply(&self, input: &Document) -> OperatorOutcome {
        self.invoke(
            input.args().to_vec(),
            input.kwargs().clone(),
            input.attributes().clone(),
        )
        .await
    }

    /// Apply to two documents with accumulation semantics:
    /// `new_state = transform(prev_state, new_instance)`.
    ///
    /// The positional inputs are each document's materialized return value;
    /// attributes merge with the second input taking precedence.
    pub async fn apply_binary(&self, prev: &Document, new: &Document) -> OperatorOutcome {
        let args = vec![
            prev.get_return().into_value(),
            new.get_return().into_value(),
        ];
        let mut attributes = prev.attributes().clone();
        attributes.merge_from(new.attributes());
        self.invoke(args, FxHashMap::default(), attributes).await
    }

    /// Bounded invocation plus containment, normalization, and provenance
    /// stamping. The single path every application goes through.
    async fn invoke(
        &self,
        args: Vec<Value>,
        kwargs: FxHashMap<String, Value>,
        mut attributes: Attributes,
    ) -> OperatorOutcome {
        let runstart = Utc::now();
        let started = Instant::now();
        let invocation =
            tokio::time::timeout(self.config.timeout, self.transform.call(&args, &kwargs)).await;
        let runtime = started.elapsed().as_secs_f64();

        attributes.push_function(self.transform.name());

        let mut statistics = RunStatistics {
            runstart: Some(runstart),
            runtime: Some(runtime),
            ..RunStatistics::default()
        };

        match invocation {
            Ok(Ok(raw)) => {
                statistics.status = Some(RunStatus::Success);
                let Arguments { args, kwargs } =
                    Arguments::from(parse_result(raw, self.config.map_policy));
                let mut document = Document::new(args, kwargs, attributes);
                document.add_statistics(&statistics);
                OperatorOutcome {
                    document,
                    fault: None,
                }
            }
            Ok(Err(err)) => {
                let kind = match &err {
                    TransformError::Wiring { .. } => FaultKind::Wiring,
                    TransformError::Fault { .. } => FaultKind::Execution,
                };
                self.contained(kind, err.to_string(), attributes, statistics)
            }
            Err(_elapsed) => {
                let message = format!(
                    "transform exceeded its {:.1}s budget",
                    self.config.timeout.as_secs_f64()
                );
                self.contained(FaultKind::Timeout, message, attributes, statistics)
            }
        }
    }

    /// Build the empty-result failure document and fault record.
    fn contained(
        &self,
        kind: FaultKind,
        message: String,
        attributes: Attributes,
        mut statistics: RunStatistics,
    ) -> OperatorOutcome {
        statistics.status = Some(RunStatus::Failure);
        statistics.error_message = Some(message.clone());

        match kind {
            FaultKind::Wiring => tracing::error!(
                transform = self.transform.name(),
                %message,
                "wiring defect contained; emitting empty result"
            ),
            _ => tracing::error!(
                transform = self.transform.name(),
                ?kind,
                %message,
                "transform fault contained; emitting empty result"
            ),
        }

        let mut document = Document::new(Vec::new(), FxHashMap::default(), attributes);
        document.add_statistics(&statistics);
        OperatorOutcome {
            document,
            fault: Some(FaultRecord {
                kind,
                transform: self.transform.name().to_string(),
                message,
                when: statistics.runstart.unwrap_or_else(Utc::now),
            }),
        }
    }
}

#[async_trait]
impl TaskCallback for DocumentOperator {
    async fn run(&self, input: Document, ctx: TaskContext) -> Document {
        let outcome = self.apply(&input).await;
        if let Some(fault) = &outcome.fault
            && ctx.emit("fault", fault.message.clone()).is_err()
        {
            tracing::warn!(
                task = %ctx.task_name,
                "event bus unavailable while reporting contained fault"
            );
        }
        outcome.document
    }
}

/// Named wrapper turning a plain closure into a [`Transform`].
struct FnTransform<F>
where
    F: Fn(&[Value], &FxHashMap<String, Value>) -> Result<Value, TransformError> + Send + Sync,
{
    name: String,
    func: F,
}

#[async_trait]
impl<F> Transform for FnTransform<F>
where
    F: Fn(&[Value], &FxHashMap<String, Value>) -> Result<Value, TransformError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(
        &self,
        args: &[Value],
        kwargs: &FxHashMap<String, Value>,
    ) -> Result<Value, TransformError> {
        (self.func)(args, kwargs)
    }
}
