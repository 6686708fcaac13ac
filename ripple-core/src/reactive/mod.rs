//! Reactive Primitives
//!
//! This module implements the core reactive system: values, Reactives and
//! Observers, plus the per-thread runtime that connects them.
//!
//! # Concepts
//!
//! ## ReactiveValue
//!
//! A ReactiveValue is a container for mutable state. When it is read inside
//! a Reactive or an Observer, that computation becomes one of its
//! dependents. Writing a different value invalidates every dependent.
//!
//! ## Reactive
//!
//! A Reactive is a derived value that caches its result, or its error. It
//! is lazy: invalidation only drops the cache, and the body runs again on
//! the next read.
//!
//! ## Observer
//!
//! An Observer is a side-effecting computation. It is eager: invalidation
//! queues it, and the next [`flush`] runs it.
//!
//! # Implementation Notes
//!
//! Dependencies are discovered at run time. Every execution starts with an
//! empty dependency set and records exactly the sources it reads, through a
//! context stack that names the computation currently running. Reads inside
//! [`isolate`] are not recorded.
//!
//! Async bodies are supported throughout. Concurrently running Observers
//! interleave only at suspension points, and each keeps its own context.

mod context;
mod isolate;
mod memo;
mod observer;
mod runtime;
mod subscriber;
mod value;

pub use context::{Frame, ReactiveContext};
pub use isolate::{isolate, isolate_async, IsolateScope};
pub use memo::{Reactive, ReactiveAsync};
pub use observer::{Observer, ObserverAsync};
pub use runtime::Runtime;
pub use subscriber::Subscriber;
pub use value::ReactiveValue;

pub(crate) use context::swap_stack;

use crate::error::Result;

/// Run pending Observers on this thread until none remain.
///
/// See [`Runtime::flush`].
pub fn flush() -> Result<()> {
    Runtime::flush()
}

/// Async counterpart of [`flush`].
///
/// See [`Runtime::flush_async`].
pub async fn flush_async() -> Result<()> {
    Runtime::flush_async().await
}
