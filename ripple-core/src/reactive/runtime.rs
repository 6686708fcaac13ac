//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects values, Reactives
//! and Observers. It owns the dependency graph and the flush queue, and it
//! drains that queue when the host calls [`flush`](Runtime::flush) or
//! [`flush_async`](Runtime::flush_async).
//!
//! # How It Works
//!
//! 1. Every value, Reactive and Observer registers a node with the runtime.
//!
//! 2. When a Reactive or Observer reads a source, the runtime records an
//!    edge from the source to the reader.
//!
//! 3. When a value changes, the runtime:
//!    a. Walks the graph depth-first from the value
//!    b. Marks every Reactive and Observer it reaches as invalid
//!    c. Queues the Observers; nothing runs yet
//!    d. Reactives are lazy - they recompute on next read
//!
//! 4. A flush pops Observers off the queue and runs them. Whatever they
//!    invalidate while running is queued behind them and runs in the same
//!    flush.
//!
//! # Thread Model
//!
//! There is one runtime per thread and it is never shared. All graph and
//! queue mutation happens between suspension points of the single strand
//! that is currently running, so plain `RefCell`s are enough.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use super::context::ReactiveContext;
use super::subscriber::{Job, Subscriber};
use crate::config::{ErrorPolicy, FlushMode, RuntimeConfig};
use crate::error::{Error, Result};
use crate::graph::{DependencyGraph, FlushQueue, Node, NodeId, NodeKind};
use crate::task::TaskCoordinator;

thread_local! {
    static RUNTIME: Runtime = Runtime::new();
}

/// The reactive runtime of the calling thread.
pub struct Runtime {
    graph: RefCell<DependencyGraph>,
    queue: RefCell<FlushQueue>,
    /// Live Observers. The runtime keeps them alive until they are disposed.
    jobs: RefCell<HashMap<NodeId, Rc<dyn Job>>>,
    config: Cell<RuntimeConfig>,
    flushing: Cell<bool>,
}

impl Runtime {
    fn new() -> Self {
        Self {
            graph: RefCell::new(DependencyGraph::new()),
            queue: RefCell::new(FlushQueue::new()),
            jobs: RefCell::new(HashMap::new()),
            config: Cell::new(RuntimeConfig::default()),
            flushing: Cell::new(false),
        }
    }

    fn with<R>(f: impl FnOnce(&Runtime) -> R) -> R {
        RUNTIME.with(f)
    }

    /// Like [`with`](Self::with) but tolerates thread teardown, for use in
    /// `Drop` impls.
    fn try_with<R>(f: impl FnOnce(&Runtime) -> R) -> Option<R> {
        RUNTIME.try_with(f).ok()
    }

    /// Replace this thread's configuration.
    pub fn configure(config: RuntimeConfig) {
        Self::with(|rt| rt.config.set(config));
    }

    /// This thread's configuration.
    pub fn config() -> RuntimeConfig {
        Self::with(|rt| rt.config.get())
    }

    /// Number of Observers waiting for the next flush.
    pub fn pending() -> usize {
        Self::with(|rt| rt.queue.borrow().len())
    }

    /// Number of live nodes in this thread's graph.
    pub fn node_count() -> usize {
        Self::with(|rt| rt.graph.borrow().node_count())
    }

    /// Whether a flush is currently draining the queue on this thread.
    pub fn is_flushing() -> bool {
        Self::with(|rt| rt.flushing.get())
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    pub(crate) fn register_value(id: NodeId) {
        Self::with(|rt| {
            rt.graph.borrow_mut().add_node(Node::new(id, NodeKind::Value));
        });
    }

    pub(crate) fn register_reactive(id: NodeId, subscriber: Weak<dyn Subscriber>) {
        Self::with(|rt| {
            rt.graph
                .borrow_mut()
                .add_node(Node::new(id, NodeKind::Reactive).with_subscriber(subscriber));
        });
    }

    /// Register an Observer and queue its first run.
    pub(crate) fn register_observer(job: Rc<dyn Job>, subscriber: Weak<dyn Subscriber>) {
        let id = job.node_id();
        Self::with(|rt| {
            let mut node = Node::new(id, NodeKind::Observer).with_subscriber(subscriber);
            node.set_enqueued(true);
            rt.graph.borrow_mut().add_node(node);
            rt.queue.borrow_mut().push(id);
            rt.jobs.borrow_mut().insert(id, job);
        });
        trace!(observer = %id, "observer scheduled");
    }

    /// Remove a node and every edge touching it.
    pub(crate) fn unregister(id: NodeId) {
        let job = Self::try_with(|rt| {
            rt.graph.borrow_mut().remove_node(id);
            rt.queue.borrow_mut().remove(id);
            rt.jobs.borrow_mut().remove(&id)
        });
        // Dropping an Observer can drop the Reactives its body captured,
        // which unregister themselves in turn.
        drop(job);
    }

    // ------------------------------------------------------------------
    // Tracking and invalidation
    // ------------------------------------------------------------------

    /// Record a read of `source` by whatever is currently executing.
    pub(crate) fn track(source: NodeId) {
        if let Some(sink) = ReactiveContext::current() {
            trace!(source = %source, sink = %sink, "dependency recorded");
            Self::with(|rt| rt.graph.borrow_mut().add_edge(source, sink));
        }
    }

    /// Start a fresh execution of `id`: forget the previous run's edges and
    /// claim validity. An invalidation that arrives while the body runs
    /// flips it back, so it is never lost.
    pub(crate) fn begin_execution(id: NodeId) {
        Self::with(|rt| {
            let mut graph = rt.graph.borrow_mut();
            graph.clear_dependencies(id);
            if let Some(node) = graph.get_node_mut(id) {
                node.set_valid(true);
            }
        });
    }

    pub(crate) fn is_valid(id: NodeId) -> bool {
        Self::with(|rt| {
            rt.graph
                .borrow()
                .get_node(id)
                .is_some_and(|node| node.is_valid())
        })
    }

    /// Propagate a change of `source` to everything downstream.
    ///
    /// Observers are queued, not run.
    pub(crate) fn notify_changed(source: NodeId) {
        let cascade = Self::with(|rt| {
            let cascade = rt.graph.borrow_mut().invalidate_from(source);
            let mut queue = rt.queue.borrow_mut();
            for &observer in &cascade.enqueue {
                queue.push(observer);
            }
            cascade
        });

        trace!(
            source = %source,
            queued = cascade.enqueue.len(),
            invalidated = cascade.notify.len(),
            "change propagated"
        );

        // Callbacks run with no runtime borrow held; they may write values.
        for subscriber in cascade.notify {
            if let Some(subscriber) = subscriber.upgrade() {
                subscriber.invalidated();
            }
        }
    }

    // ------------------------------------------------------------------
    // Flushing
    // ------------------------------------------------------------------

    /// Run pending Observers until none remain.
    ///
    /// Observers run one at a time in the order they became pending. Async
    /// Observers are driven to completion on the calling thread; hosts with
    /// an async event loop should prefer [`flush_async`](Self::flush_async).
    ///
    /// Calling `flush` from inside an Observer is a no-op: the flush that is
    /// already running will pick up whatever was queued.
    pub fn flush() -> Result<()> {
        pollster::block_on(Self::drain(FlushMode::Sequential))
    }

    /// Run pending Observers until none remain, honouring the configured
    /// [`FlushMode`].
    ///
    /// Completes once the queue is empty and every run launched along the
    /// way has finished.
    pub async fn flush_async() -> Result<()> {
        let mode = Self::config().flush_mode;
        Self::drain(mode).await
    }

    async fn drain(mode: FlushMode) -> Result<()> {
        let Some(_flushing) = FlushGuard::acquire() else {
            debug!("flush requested while flushing; deferring to the running flush");
            return Ok(());
        };
        let policy = Self::config().error_policy;
        let mut errors = Vec::new();
        let mut passes = 0usize;

        loop {
            let batch = Self::dequeue(mode);
            if batch.is_empty() {
                break;
            }
            passes += 1;
            debug!(pass = passes, observers = batch.len(), ?mode, "flush pass");

            let mut coordinator = TaskCoordinator::new();
            let mut launched = Vec::with_capacity(batch.len());
            for job in batch {
                launched.push(job.node_id());
                coordinator.spawn(job.launch());
            }

            for (observer, outcome) in launched.into_iter().zip(coordinator.run().await) {
                if let Err(err) = outcome {
                    warn!(observer = %observer, error = %err, "observer failed");
                    errors.push(err);
                }
            }

            if policy == ErrorPolicy::Abort && !errors.is_empty() {
                debug!(pass = passes, pending = Self::pending(), "flush aborted");
                // A concurrent pass can fail more than once before the check.
                return Err(match errors.len() {
                    1 => errors.swap_remove(0),
                    _ => Error::Observers(errors),
                });
            }
        }

        debug!(passes, "flush complete");
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Observers(errors))
        }
    }

    /// Take the next batch of Observers off the queue: one in sequential
    /// mode, all of them in concurrent mode. Each is marked dequeued and
    /// valid before it runs.
    fn dequeue(mode: FlushMode) -> Vec<Rc<dyn Job>> {
        Self::with(|rt| {
            let ids = {
                let mut queue = rt.queue.borrow_mut();
                match mode {
                    FlushMode::Sequential => queue.pop().into_iter().collect(),
                    FlushMode::Concurrent => queue.drain(),
                }
            };

            let mut graph = rt.graph.borrow_mut();
            let jobs = rt.jobs.borrow();
            ids.into_iter()
                .filter_map(|id| {
                    let node = graph.get_node_mut(id)?;
                    node.set_enqueued(false);
                    node.set_valid(true);
                    jobs.get(&id).cloned()
                })
                .collect()
        })
    }
}

/// Marks the thread as flushing for as long as it is held.
struct FlushGuard;

impl FlushGuard {
    fn acquire() -> Option<Self> {
        Runtime::with(|rt| (!rt.flushing.replace(true)).then_some(FlushGuard))
    }
}

impl Drop for FlushGuard {
    fn drop(&mut self) {
        let _ = Runtime::try_with(|rt| rt.flushing.set(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Observer, ReactiveValue};

    #[test]
    fn observers_are_queued_on_creation() {
        assert_eq!(Runtime::pending(), 0);

        let a = Observer::new(|| {});
        let b = Observer::new(|| {});
        assert_eq!(Runtime::pending(), 2);

        Runtime::flush().unwrap();
        assert_eq!(Runtime::pending(), 0);
        assert_eq!(a.exec_count(), 1);
        assert_eq!(b.exec_count(), 1);
    }

    #[test]
    fn write_queues_but_does_not_run() {
        let value = ReactiveValue::new(1);
        let observer = Observer::new({
            let value = value.clone();
            move || {
                value.read();
            }
        });
        Runtime::flush().unwrap();

        value.write(2);
        assert_eq!(Runtime::pending(), 1);
        assert_eq!(observer.exec_count(), 1);

        Runtime::flush().unwrap();
        assert_eq!(observer.exec_count(), 2);
    }

    #[test]
    fn nested_flush_is_a_no_op() {
        let inner_result = Rc::new(Cell::new(None));
        let _observer = Observer::new({
            let inner_result = Rc::clone(&inner_result);
            move || {
                assert!(Runtime::is_flushing());
                inner_result.set(Some(Runtime::flush().is_ok()));
            }
        });

        Runtime::flush().unwrap();
        assert_eq!(inner_result.get(), Some(true));
        assert!(!Runtime::is_flushing());
    }

    #[test]
    fn configure_is_per_thread() {
        let config = RuntimeConfig::default().with_error_policy(ErrorPolicy::Continue);
        Runtime::configure(config);
        assert_eq!(Runtime::config(), config);

        let other = std::thread::spawn(Runtime::config).join().unwrap();
        assert_eq!(other, RuntimeConfig::default());
    }

    #[test]
    fn dropped_values_leave_the_graph() {
        let before = Runtime::node_count();
        let value = ReactiveValue::new("a");
        assert_eq!(Runtime::node_count(), before + 1);
        drop(value);
        assert_eq!(Runtime::node_count(), before);
    }
}
