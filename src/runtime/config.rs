//! Runtime configuration for flow execution.
//!
//! Configuration is injected at flow/dispatcher construction, never read
//! from process-wide mutable state.

/// Execution settings compiled into a flow.
#[derive(Clone, Copy, Debug)]
pub struct RuntimeConfig {
    /// Maximum number of tasks of one instance running concurrently.
    ///
    /// `1` gives a single-threaded eager evaluator with identical
    /// semantics; higher values let data-independent branches overlap.
    pub parallelism: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { parallelism: 8 }
    }
}

impl RuntimeConfig {
    /// Config with a specific per-instance parallelism bound.
    #[must_use]
    pub fn with_parallelism(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.max(1),
        }
    }
}
