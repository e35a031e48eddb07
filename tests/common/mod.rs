#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Value, json};

use beamflow::document::{Attributes, Return};
use beamflow::event::SinkAdapter;
use beamflow::operator::{DocumentOperator, Transform, TransformError};

/// Operator echoing its `data` kwarg under a new name.
pub fn echo_op(name: &str) -> DocumentOperator {
    DocumentOperator::from_fn(name, |_args, kwargs| {
        Ok(json!({"echo": kwargs.get("data").cloned().unwrap_or(Value::Null)}))
    })
}

/// Operator summing every numeric positional argument.
pub fn sum_op() -> DocumentOperator {
    DocumentOperator::from_fn("sum", |args, _kwargs| {
        let total: f64 = args.iter().filter_map(Value::as_f64).sum();
        Ok(json!(total))
    })
}

/// Operator that always raises an execution fault.
pub fn failing_op(name: &str) -> DocumentOperator {
    DocumentOperator::from_fn(name, |_args, _kwargs| {
        Err(TransformError::fault("detector returned garbage"))
    })
}

/// Operator that always reports a wiring mismatch.
pub fn wiring_op(name: &str) -> DocumentOperator {
    DocumentOperator::from_fn(name, |args, _kwargs| {
        Err(TransformError::wiring(
            "two positional arrays",
            format!("{} args", args.len()),
        ))
    })
}

/// Transform that sleeps before answering; used for timeout tests.
pub struct SleepyTransform {
    pub duration: Duration,
}

#[async_trait]
impl Transform for SleepyTransform {
    fn name(&self) -> &str {
        "sleepy"
    }

    async fn call(
        &self,
        _args: &[Value],
        _kwargs: &FxHashMap<String, Value>,
    ) -> Result<Value, TransformError> {
        tokio::time::sleep(self.duration).await;
        Ok(json!("done"))
    }
}

/// Sink capturing every delivery for later assertions.
#[derive(Clone, Default)]
pub struct CollectingSink {
    deliveries: Arc<Mutex<Vec<(Return, Attributes)>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<(Return, Attributes)> {
        self.deliveries.lock().clone()
    }
}

impl SinkAdapter for CollectingSink {
    fn deliver(&self, output: &Return, attributes: &Attributes) -> std::io::Result<()> {
        self.deliveries
            .lock()
            .push((output.clone(), attributes.clone()));
        Ok(())
    }
}

/// Sink that refuses every delivery; instances must shrug it off.
pub struct RejectingSink;

impl SinkAdapter for RejectingSink {
    fn deliver(&self, _output: &Return, _attributes: &Attributes) -> std::io::Result<()> {
        Err(std::io::Error::other("sink offline"))
    }
}
