//! Ripple Core
//!
//! This crate provides the dependency-tracking and invalidation engine of
//! the Ripple reactive UI framework. It implements:
//!
//! - Reactive primitives (values, Reactives, Observers)
//! - Automatic, dynamic dependency discovery
//! - Invalidation propagation and a flush queue for Observers
//! - Cooperative interleaving of async Reactive and Observer bodies
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Reactive primitives, the context stack and the runtime
//! - `graph`: Dependency graph and flush queue
//! - `task`: Task coordinator that interleaves async bodies
//! - `config`: Runtime configuration
//! - `error`: Error type shared by every fallible operation
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use ripple_core::reactive::{flush, Observer, Reactive, ReactiveValue};
//!
//! // Create a value
//! let count = ReactiveValue::new(0);
//!
//! // Create a derived value
//! let doubled = Reactive::new({
//!     let count = count.clone();
//!     move || count.read() * 2
//! });
//!
//! // Create an Observer
//! let seen = Rc::new(Cell::new(0));
//! let _observer = Observer::new({
//!     let (doubled, seen) = (doubled.clone(), Rc::clone(&seen));
//!     move || seen.set(doubled.invoke().unwrap_or_default())
//! });
//!
//! // Update the value; the Observer runs on the next flush
//! count.write(5);
//! flush().unwrap();
//! assert_eq!(seen.get(), 10);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod task;

pub use config::{ErrorPolicy, FlushMode, RuntimeConfig};
pub use error::{Error, Result};
pub use reactive::{
    flush, flush_async, isolate, isolate_async, Observer, ObserverAsync, Reactive, ReactiveAsync,
    ReactiveValue, Runtime,
};
