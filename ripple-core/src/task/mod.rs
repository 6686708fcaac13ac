//! Async Task Coordination
//!
//! Async Reactive and Observer bodies are sequences of synchronous
//! segments separated by suspension points. This module runs the bodies
//! launched by one flush pass side by side: a segment always runs to its
//! next suspension point without interruption, and when several bodies are
//! ready they resume in the order they were launched.
//!
//! There is no invalidation barrier between segments. A write performed by
//! one body's segment invalidates immediately, and every segment that runs
//! afterwards, in any body, observes it.
//!
//! Suspension is cooperative. A body that neither returns nor reaches a
//! suspension point blocks the flush that launched it.

mod coordinator;
mod yield_now;

pub use coordinator::{TaskCoordinator, TaskId};
pub use yield_now::{yield_now, YieldNow};
