//! Runtime configuration.
//!
//! The defaults match what a UI session expects: Observers launched by the
//! same flush interleave at their suspension points, and the first failing
//! Observer ends the flush.

use serde::{Deserialize, Serialize};

/// How a flush runs the Observers it dequeues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushMode {
    /// Every Observer pending at the start of a pass is launched as its own
    /// task. Tasks are resumed in launch order at each suspension point.
    #[default]
    Concurrent,

    /// One Observer at a time, each run to completion before the next one
    /// is dequeued.
    Sequential,
}

/// What a flush does when an Observer fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Stop at the first failure. Observers that are still queued stay
    /// queued and run on the next flush.
    #[default]
    Abort,

    /// Keep draining and report every failure once the queue is empty.
    Continue,
}

/// Per-thread runtime settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Scheduling used by `flush_async`. The synchronous `flush` is always
    /// sequential.
    pub flush_mode: FlushMode,

    /// Failure handling for both flush variants.
    pub error_policy: ErrorPolicy,
}

impl RuntimeConfig {
    pub fn with_flush_mode(mut self, flush_mode: FlushMode) -> Self {
        self.flush_mode = flush_mode;
        self
    }

    pub fn with_error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }
}
