//! Isolation
//!
//! `isolate` runs a closure with dependency tracking suspended. Reads inside
//! it still execute invalid Reactives, which record their own dependencies
//! as usual, but nothing read inside the closure becomes a dependency of the
//! computation that called `isolate`.

use std::future::Future;

use super::context::ReactiveContext;

/// A scope in which no context is current.
///
/// The enclosing context is restored when the scope is dropped, including
/// on unwinding.
pub struct IsolateScope {
    _context: ReactiveContext,
}

impl IsolateScope {
    pub fn enter() -> Self {
        Self {
            _context: ReactiveContext::isolate(),
        }
    }
}

/// Run `body` without recording dependencies, returning its result
/// unchanged.
pub fn isolate<F, R>(body: F) -> R
where
    F: FnOnce() -> R,
{
    let _scope = IsolateScope::enter();
    body()
}

/// Async counterpart of [`isolate`]. Tracking stays suspended across every
/// suspension point of the body.
pub async fn isolate_async<F, Fut, R>(body: F) -> R
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = R>,
{
    let _scope = IsolateScope::enter();
    body().await
}
