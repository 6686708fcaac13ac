//! Reactive Implementation
//!
//! A Reactive is a cached derived value that re-executes only when its
//! dependencies change.
//!
//! # How Reactives Work
//!
//! 1. A Reactive starts invalid. Nothing runs at construction.
//!
//! 2. On first read, it runs its body inside its own context, caching the
//!    returned value or the returned error.
//!
//! 3. While valid, reads return (or re-raise) the cached outcome.
//!
//! 4. When a dependency changes, the Reactive is marked invalid, its cache
//!    is dropped and the invalidation continues to its own dependents. It
//!    does not re-execute until somebody reads it again.
//!
//! # Re-entrancy
//!
//! A Reactive that is already executing re-executes when read again, each
//! call in its own context frame. This lets a body call itself. The engine
//! does not detect cycles: a body that never stops recursing is a bug in
//! that body.
//!
//! # Async Reactives
//!
//! [`ReactiveAsync`] has the same caching rules. Executing its body costs
//! two suspension points, one before the body starts and one after it
//! finishes, so concurrently running Observers get a turn in between.

use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};
use std::future::Future;
use std::rc::{Rc, Weak};

use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;

use super::context::ReactiveContext;
use super::runtime::Runtime;
use super::subscriber::Subscriber;
use crate::error::Result;
use crate::graph::NodeId;
use crate::task::yield_now;

/// State shared by the sync and async variants.
struct ReactiveCore<T> {
    id: NodeId,

    /// Outcome of the most recent execution. Dropped on invalidation.
    cached: RefCell<Option<Result<T>>>,

    exec_count: Cell<u64>,

    /// Number of executions currently on the stack (or suspended).
    running: Cell<u32>,
}

impl<T: Clone + 'static> ReactiveCore<T> {
    fn register() -> Rc<Self> {
        let core = Rc::new(Self {
            id: NodeId::new(),
            cached: RefCell::new(None),
            exec_count: Cell::new(0),
            running: Cell::new(0),
        });
        let subscriber: Weak<dyn Subscriber> = Rc::downgrade(&core) as Weak<dyn Subscriber>;
        Runtime::register_reactive(core.id, subscriber);
        core
    }

    /// The cached outcome, if it may be returned without executing.
    fn cached_outcome(&self) -> Option<Result<T>> {
        if self.running.get() > 0 || !Runtime::is_valid(self.id) {
            return None;
        }
        self.cached.borrow().clone()
    }

    fn begin(&self) -> Execution<'_> {
        self.exec_count.set(self.exec_count.get() + 1);
        self.running.set(self.running.get() + 1);
        Runtime::begin_execution(self.id);
        Execution {
            running: &self.running,
            _context: ReactiveContext::enter(self.id),
        }
    }

    fn store(&self, outcome: &Result<T>) {
        *self.cached.borrow_mut() = Some(outcome.clone());
    }
}

impl<T> Subscriber for ReactiveCore<T> {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn invalidated(&self) {
        let stale = self.cached.borrow_mut().take();
        drop(stale);
    }
}

impl<T> Drop for ReactiveCore<T> {
    fn drop(&mut self) {
        Runtime::unregister(self.id);
    }
}

/// One execution of a Reactive body.
struct Execution<'a> {
    running: &'a Cell<u32>,
    _context: ReactiveContext,
}

impl Drop for Execution<'_> {
    fn drop(&mut self) {
        self.running.set(self.running.get().saturating_sub(1));
    }
}

/// A memoized, lazily recomputed derived value.
///
/// # Example
///
/// ```rust
/// use ripple_core::reactive::{Reactive, ReactiveValue};
///
/// let count = ReactiveValue::new(2);
/// let doubled = Reactive::new({
///     let count = count.clone();
///     move || count.read() * 2
/// });
///
/// assert_eq!(doubled.invoke().unwrap(), 4);
/// count.write(5);
/// assert_eq!(doubled.invoke().unwrap(), 10);
/// ```
pub struct Reactive<T>
where
    T: Clone + 'static,
{
    core: Rc<ReactiveCore<T>>,
    compute: Rc<dyn Fn() -> Result<T>>,
}

impl<T> Reactive<T>
where
    T: Clone + 'static,
{
    /// Create a Reactive from an infallible body.
    ///
    /// The body is not run until the first [`invoke`](Self::invoke).
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::try_new(move || Ok(compute()))
    }

    /// Create a Reactive whose body may fail. A failure is cached like a
    /// value.
    pub fn try_new<F>(compute: F) -> Self
    where
        F: Fn() -> Result<T> + 'static,
    {
        Self {
            core: ReactiveCore::register(),
            compute: Rc::new(compute),
        }
    }

    pub fn id(&self) -> NodeId {
        self.core.id
    }

    /// Read the value, executing the body first if the cache is invalid.
    ///
    /// When called from inside another Reactive or an Observer, the caller
    /// becomes a dependent of this Reactive before the body runs.
    pub fn invoke(&self) -> Result<T> {
        Runtime::track(self.core.id);
        if let Some(outcome) = self.core.cached_outcome() {
            return outcome;
        }

        let _execution = self.core.begin();
        let outcome = (self.compute)();
        self.core.store(&outcome);
        outcome
    }

    /// Number of times the body has been executed.
    pub fn exec_count(&self) -> u64 {
        self.core.exec_count.get()
    }

    /// Whether the cached outcome is current.
    pub fn is_valid(&self) -> bool {
        Runtime::is_valid(self.core.id)
    }
}

impl<T> Clone for Reactive<T>
where
    T: Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
            compute: Rc::clone(&self.compute),
        }
    }
}

impl<T> Debug for Reactive<T>
where
    T: Clone + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("id", &self.core.id)
            .field("valid", &self.is_valid())
            .field("exec_count", &self.exec_count())
            .finish()
    }
}

/// A Reactive whose body is asynchronous.
pub struct ReactiveAsync<T>
where
    T: Clone + 'static,
{
    core: Rc<ReactiveCore<T>>,
    compute: Rc<dyn Fn() -> LocalBoxFuture<'static, Result<T>>>,
}

impl<T> ReactiveAsync<T>
where
    T: Clone + 'static,
{
    pub fn new<F, Fut>(compute: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = T> + 'static,
    {
        Self::try_new(move || compute().map(Ok))
    }

    pub fn try_new<F, Fut>(compute: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<T>> + 'static,
    {
        Self {
            core: ReactiveCore::register(),
            compute: Rc::new(move || compute().boxed_local()),
        }
    }

    pub fn id(&self) -> NodeId {
        self.core.id
    }

    /// Read the value, executing the body first if the cache is invalid.
    ///
    /// A cached read completes without suspending.
    pub async fn invoke(&self) -> Result<T> {
        Runtime::track(self.core.id);
        if let Some(outcome) = self.core.cached_outcome() {
            return outcome;
        }

        yield_now().await;
        let outcome = {
            let _execution = self.core.begin();
            let outcome = (self.compute)().await;
            self.core.store(&outcome);
            outcome
        };
        yield_now().await;
        outcome
    }

    pub fn exec_count(&self) -> u64 {
        self.core.exec_count.get()
    }

    pub fn is_valid(&self) -> bool {
        Runtime::is_valid(self.core.id)
    }
}

impl<T> Clone for ReactiveAsync<T>
where
    T: Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
            compute: Rc::clone(&self.compute),
        }
    }
}

impl<T> Debug for ReactiveAsync<T>
where
    T: Clone + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveAsync")
            .field("id", &self.core.id)
            .field("valid", &self.is_valid())
            .field("exec_count", &self.exec_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::reactive::ReactiveValue;

    #[test]
    fn reactive_computes_on_first_access() {
        let reactive = Reactive::new(|| 42);

        assert_eq!(reactive.exec_count(), 0);
        assert!(!reactive.is_valid());

        assert_eq!(reactive.invoke().unwrap(), 42);
        assert_eq!(reactive.exec_count(), 1);
        assert!(reactive.is_valid());
    }

    #[test]
    fn reactive_caches_value_when_valid() {
        let reactive = Reactive::new(|| 42);

        assert_eq!(reactive.invoke().unwrap(), 42);
        assert_eq!(reactive.invoke().unwrap(), 42);
        assert_eq!(reactive.invoke().unwrap(), 42);
        assert_eq!(reactive.exec_count(), 1);
    }

    #[test]
    fn reactive_recomputes_after_dependency_changes() {
        let value = ReactiveValue::new(1);
        let reactive = Reactive::new({
            let value = value.clone();
            move || value.read() + 10
        });

        assert_eq!(reactive.invoke().unwrap(), 11);

        value.write(2);
        assert!(!reactive.is_valid());
        assert_eq!(reactive.exec_count(), 1);

        assert_eq!(reactive.invoke().unwrap(), 12);
        assert_eq!(reactive.exec_count(), 2);
    }

    #[test]
    fn reactive_chain_invalidates_transitively() {
        let base = ReactiveValue::new(5);
        let doubled = Reactive::new({
            let base = base.clone();
            move || base.read() * 2
        });
        let plus_ten = Reactive::try_new({
            let doubled = doubled.clone();
            move || Ok(doubled.invoke()? + 10)
        });

        assert_eq!(plus_ten.invoke().unwrap(), 20);

        base.write(10);
        assert!(!doubled.is_valid());
        assert!(!plus_ten.is_valid());

        assert_eq!(plus_ten.invoke().unwrap(), 30);
        assert_eq!(doubled.exec_count(), 2);
        assert_eq!(plus_ten.exec_count(), 2);
    }

    #[test]
    fn cached_error_is_re_raised_without_re_running() {
        let value = ReactiveValue::new(0);
        let reactive = Reactive::try_new({
            let value = value.clone();
            move || match value.read() {
                0 => Err(Error::msg("zero")),
                n => Ok(100 / n),
            }
        });

        assert_eq!(reactive.invoke().unwrap_err().to_string(), "zero");
        assert_eq!(reactive.invoke().unwrap_err().to_string(), "zero");
        assert_eq!(reactive.exec_count(), 1);

        value.write(4);
        assert_eq!(reactive.invoke().unwrap(), 25);
        assert_eq!(reactive.exec_count(), 2);
    }

    #[test]
    fn dynamic_dependencies_drop_stale_edges() {
        let use_a = ReactiveValue::new(true);
        let a = ReactiveValue::new(1);
        let b = ReactiveValue::new(2);
        let reactive = Reactive::new({
            let (use_a, a, b) = (use_a.clone(), a.clone(), b.clone());
            move || if use_a.read() { a.read() } else { b.read() }
        });

        assert_eq!(reactive.invoke().unwrap(), 1);

        use_a.write(false);
        assert_eq!(reactive.invoke().unwrap(), 2);
        assert_eq!(reactive.exec_count(), 2);

        // `a` was not read by the latest execution.
        a.write(100);
        assert!(reactive.is_valid());
        assert_eq!(reactive.invoke().unwrap(), 2);
        assert_eq!(reactive.exec_count(), 2);
    }

    #[test]
    fn clone_shares_state() {
        let reactive1 = Reactive::new(|| 42);
        assert_eq!(reactive1.invoke().unwrap(), 42);

        let reactive2 = reactive1.clone();
        assert_eq!(reactive1.id(), reactive2.id());
        assert!(reactive2.is_valid());
        assert_eq!(reactive2.invoke().unwrap(), 42);
        assert_eq!(reactive2.exec_count(), 1);
    }

    #[test]
    fn async_reactive_caches_like_sync() {
        let value = ReactiveValue::new(1);
        let reactive = ReactiveAsync::new({
            let value = value.clone();
            move || {
                let value = value.clone();
                async move { value.read() + 10 }
            }
        });

        pollster::block_on(async {
            assert_eq!(reactive.invoke().await.unwrap(), 11);
            assert_eq!(reactive.invoke().await.unwrap(), 11);
            assert_eq!(reactive.exec_count(), 1);

            value.write(2);
            assert_eq!(reactive.invoke().await.unwrap(), 12);
            assert_eq!(reactive.exec_count(), 2);
        });
    }
}
