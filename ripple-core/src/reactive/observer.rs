//! Observer Implementation
//!
//! An Observer is a side-effecting computation that re-runs whenever its
//! dependencies change.
//!
//! # How Observers Work
//!
//! 1. When created, the Observer is queued. It runs on the next flush.
//!
//! 2. Each run starts from an empty dependency set and records whatever
//!    the body reads.
//!
//! 3. When any of those dependencies changes, the Observer is marked invalid
//!    and queued again. Further invalidations before the next flush are
//!    coalesced into that one queued run.
//!
//! # Differences from Reactive
//!
//! - Reactives return a value; Observers do not.
//! - Reactives are lazy (run when read); Observers are eager (queued as
//!   soon as a dependency changes).
//! - Reactives cache results; Observers just run their side effect.
//!
//! # Lifetime
//!
//! The runtime keeps every Observer alive, even after all handles are
//! dropped, until [`dispose`](Observer::dispose) is called.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;
use tracing::debug;

use super::context::ReactiveContext;
use super::runtime::Runtime;
use super::subscriber::{Job, Subscriber};
use crate::error::Result;
use crate::graph::NodeId;

enum Body {
    Sync(Box<dyn Fn() -> Result<()>>),
    Async(Box<dyn Fn() -> LocalBoxFuture<'static, Result<()>>>),
}

struct ObserverInner {
    id: NodeId,
    body: Body,
    exec_count: Cell<u64>,
    disposed: Cell<bool>,
    on_invalidate: RefCell<Vec<Rc<dyn Fn()>>>,
}

impl ObserverInner {
    fn register(body: Body) -> Rc<Self> {
        let inner = Rc::new(Self {
            id: NodeId::new(),
            body,
            exec_count: Cell::new(0),
            disposed: Cell::new(false),
            on_invalidate: RefCell::new(Vec::new()),
        });
        let subscriber: Weak<dyn Subscriber> = Rc::downgrade(&inner) as Weak<dyn Subscriber>;
        Runtime::register_observer(Rc::clone(&inner) as Rc<dyn Job>, subscriber);
        inner
    }

    async fn run(&self) -> Result<()> {
        if self.disposed.get() {
            return Ok(());
        }

        self.exec_count.set(self.exec_count.get() + 1);
        debug!(observer = %self.id, run = self.exec_count.get(), "running observer");

        Runtime::begin_execution(self.id);
        let _context = ReactiveContext::enter(self.id);
        match &self.body {
            Body::Sync(body) => body(),
            Body::Async(body) => body().await,
        }
    }

    fn dispose(&self) {
        if !self.disposed.replace(true) {
            debug!(observer = %self.id, "observer disposed");
            Runtime::unregister(self.id);
        }
    }

    fn on_invalidate(&self, callback: Rc<dyn Fn()>) {
        self.on_invalidate.borrow_mut().push(callback);
    }
}

impl Subscriber for ObserverInner {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn invalidated(&self) {
        let callbacks = self.on_invalidate.borrow().clone();
        for callback in callbacks {
            callback();
        }
    }
}

impl Job for ObserverInner {
    fn launch(self: Rc<Self>) -> LocalBoxFuture<'static, Result<()>> {
        async move { self.run().await }.boxed_local()
    }
}

/// An eager side-effecting computation with a synchronous body.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use ripple_core::reactive::{flush, Observer, ReactiveValue};
///
/// let count = ReactiveValue::new(0);
/// let seen = Rc::new(Cell::new(-1));
///
/// let _observer = Observer::new({
///     let (count, seen) = (count.clone(), Rc::clone(&seen));
///     move || seen.set(count.read())
/// });
///
/// flush().unwrap();
/// assert_eq!(seen.get(), 0);
///
/// count.write(5);
/// flush().unwrap();
/// assert_eq!(seen.get(), 5);
/// ```
#[derive(Clone)]
pub struct Observer {
    inner: Rc<ObserverInner>,
}

impl Observer {
    /// Create an Observer. It is queued immediately and first runs on the
    /// next flush.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self::try_new(move || {
            body();
            Ok(())
        })
    }

    /// Create an Observer whose body may fail. Failures are reported to the
    /// caller of the flush that ran it.
    pub fn try_new<F>(body: F) -> Self
    where
        F: Fn() -> Result<()> + 'static,
    {
        Self {
            inner: ObserverInner::register(Body::Sync(Box::new(body))),
        }
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Number of runs started so far.
    pub fn exec_count(&self) -> u64 {
        self.inner.exec_count.get()
    }

    /// Stop all future runs and drop the Observer's edges.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Register a callback that runs every time this Observer goes from
    /// valid to invalid.
    pub fn on_invalidate<F>(&self, callback: F)
    where
        F: Fn() + 'static,
    {
        self.inner.on_invalidate(Rc::new(callback));
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("id", &self.inner.id)
            .field("exec_count", &self.exec_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// An eager side-effecting computation with an asynchronous body.
#[derive(Clone)]
pub struct ObserverAsync {
    inner: Rc<ObserverInner>,
}

impl ObserverAsync {
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        Self::try_new(move || body().map(Ok))
    }

    pub fn try_new<F, Fut>(body: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<()>> + 'static,
    {
        Self {
            inner: ObserverInner::register(Body::Async(Box::new(move || body().boxed_local()))),
        }
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    pub fn exec_count(&self) -> u64 {
        self.inner.exec_count.get()
    }

    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    pub fn on_invalidate<F>(&self, callback: F)
    where
        F: Fn() + 'static,
    {
        self.inner.on_invalidate(Rc::new(callback));
    }
}

impl fmt::Debug for ObserverAsync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverAsync")
            .field("id", &self.inner.id)
            .field("exec_count", &self.exec_count())
            .field("disposed", &self.is_disposed())
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
    use crate::reactive::{flush, ReactiveValue};

    #[test]
    fn observer_runs_on_first_flush() {
        let run_count = Rc::new(Cell::new(0));
        let observer = Observer::new({
            let run_count = Rc::clone(&run_count);
            move || run_count.set(run_count.get() + 1)
        });

        assert_eq!(run_count.get(), 0);
        assert_eq!(observer.exec_count(), 0);

        flush().unwrap();
        assert_eq!(run_count.get(), 1);
        assert_eq!(observer.exec_count(), 1);

        // Nothing changed, nothing runs.
        flush().unwrap();
        assert_eq!(observer.exec_count(), 1);
    }

    #[test]
    fn invalidations_coalesce_into_one_run() {
        let a = ReactiveValue::new(0);
        let b = ReactiveValue::new(0);
        let observer = Observer::new({
            let (a, b) = (a.clone(), b.clone());
            move || {
                a.read();
                b.read();
            }
        });
        flush().unwrap();

        a.write(1);
        b.write(1);
        a.write(2);
        flush().unwrap();

        assert_eq!(observer.exec_count(), 2);
    }

    #[test]
    fn observer_does_not_run_after_disposal() {
        let value = ReactiveValue::new(0);
        let observer = Observer::new({
            let value = value.clone();
            move || {
                value.read();
            }
        });
        flush().unwrap();
        assert_eq!(observer.exec_count(), 1);

        observer.dispose();
        assert!(observer.is_disposed());

        value.write(1);
        flush().unwrap();
        assert_eq!(observer.exec_count(), 1);
    }

    #[test]
    fn disposing_a_queued_observer_removes_it() {
        let observer = Observer::new(|| {});
        assert_eq!(Runtime::pending(), 1);

        observer.dispose();
        assert_eq!(Runtime::pending(), 0);

        flush().unwrap();
        assert_eq!(observer.exec_count(), 0);
    }

    #[test]
    fn dropped_handle_keeps_observer_alive() {
        let value = ReactiveValue::new(0);
        let seen = Rc::new(Cell::new(0));
        drop(Observer::new({
            let (value, seen) = (value.clone(), Rc::clone(&seen));
            move || seen.set(value.read())
        }));

        flush().unwrap();
        value.write(7);
        flush().unwrap();
        assert_eq!(seen.get(), 7);
    }

    #[test]
    fn on_invalidate_fires_once_per_invalidation() {
        let value = ReactiveValue::new(0);
        let observer = Observer::new({
            let value = value.clone();
            move || {
                value.read();
            }
        });
        let fired = Rc::new(Cell::new(0));
        observer.on_invalidate({
            let fired = Rc::clone(&fired);
            move || fired.set(fired.get() + 1)
        });

        flush().unwrap();
        assert_eq!(fired.get(), 0);

        value.write(1);
        value.write(2);
        assert_eq!(fired.get(), 1);

        flush().unwrap();
        value.write(3);
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn failing_observer_stays_scheduled_on_later_changes() {
        let value = ReactiveValue::new(0);
        let observer = Observer::try_new({
            let value = value.clone();
            move || match value.read() {
                0 => Err(Error::msg("not ready")),
                _ => Ok(()),
            }
        });

        assert_eq!(flush().unwrap_err().to_string(), "not ready");
        assert_eq!(observer.exec_count(), 1);

        value.write(1);
        flush().unwrap();
        assert_eq!(observer.exec_count(), 2);
    }

    #[test]
    fn observer_invalidated_during_its_own_run_is_requeued() {
        let value = ReactiveValue::new(0);
        let observer = Observer::new({
            let value = value.clone();
            move || {
                let current = value.read();
                if current < 3 {
                    value.write(current + 1);
                }
            }
        });

        flush().unwrap();
        assert_eq!(value.read_untracked(), 3);
        assert_eq!(observer.exec_count(), 4);
    }
}
