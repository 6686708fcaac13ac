//! Task Coordinator
//!
//! A single-threaded cooperative executor for the async bodies launched by
//! one flush pass.
//!
//! # Scheduling
//!
//! Tasks sit in a FIFO ready queue. Spawning a task makes it ready; a task
//! that suspends is made ready again by its waker, which appends it to the
//! back of the queue. With every body yielding through [`yield_now`], two
//! tasks spawned in order `a, b` therefore run `a1 b1 a2 b2 ...`: each
//! segment runs alone, and at every suspension point the other ready
//! tasks get their turn in the order they became ready.
//!
//! Tasks that wait on something external (a timer, a channel) are simply
//! absent from the ready queue until their waker fires. The coordinator's
//! own future then parks the host executor and is woken together with the
//! task.
//!
//! # Context stacks
//!
//! Every task owns a private context stack. It is swapped in right before
//! the task is polled and swapped out right after, so the frames pushed by
//! a suspended Observer or Reactive are invisible to the other tasks.
//!
//! [`yield_now`]: super::yield_now

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

use futures_util::future::{poll_fn, LocalBoxFuture};
use parking_lot::Mutex;
use tracing::trace;

use crate::reactive::{swap_stack, Frame};

/// Identifier of a task within one coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(usize);

#[derive(Default)]
struct ReadyState {
    ready: VecDeque<TaskId>,
    /// Waker of whoever is driving the coordinator.
    driver: Option<Waker>,
}

/// Ready queue shared with task wakers. Wakers must be `Send + Sync`, so
/// this is the only part of the coordinator behind a lock.
#[derive(Default)]
struct ReadyQueue {
    state: Mutex<ReadyState>,
}

impl ReadyQueue {
    fn schedule(&self, id: TaskId) {
        let driver = {
            let mut state = self.state.lock();
            if !state.ready.contains(&id) {
                state.ready.push_back(id);
            }
            state.driver.take()
        };
        if let Some(driver) = driver {
            driver.wake();
        }
    }

    /// Pop the next ready task, or remember `driver` to be woken when one
    /// becomes ready.
    fn next(&self, driver: &Waker) -> Option<TaskId> {
        let mut state = self.state.lock();
        let next = state.ready.pop_front();
        if next.is_none() {
            match &state.driver {
                Some(existing) if existing.will_wake(driver) => {}
                _ => state.driver = Some(driver.clone()),
            }
        }
        next
    }
}

struct TaskWaker {
    id: TaskId,
    queue: Arc<ReadyQueue>,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.queue.schedule(self.id);
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.queue.schedule(self.id);
    }
}

struct Task<T> {
    future: LocalBoxFuture<'static, T>,
    waker: Waker,
    frames: Vec<Frame>,
}

/// Puts a task's context stack in place for the duration of a poll and
/// restores the driver's stack afterwards, even if the poll panics.
struct StackSwap<'a> {
    frames: &'a mut Vec<Frame>,
}

impl<'a> StackSwap<'a> {
    fn enter(frames: &'a mut Vec<Frame>) -> Self {
        swap_stack(frames);
        Self { frames }
    }
}

impl Drop for StackSwap<'_> {
    fn drop(&mut self) {
        swap_stack(self.frames);
    }
}

/// Interleaves a batch of local futures at their suspension points.
pub struct TaskCoordinator<T> {
    tasks: HashMap<TaskId, Task<T>>,
    outputs: Vec<Option<T>>,
    ready: Arc<ReadyQueue>,
}

impl<T> TaskCoordinator<T> {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            outputs: Vec::new(),
            ready: Arc::new(ReadyQueue::default()),
        }
    }

    /// Add a task. Tasks start in spawn order.
    pub fn spawn(&mut self, future: LocalBoxFuture<'static, T>) -> TaskId {
        let id = TaskId(self.outputs.len());
        let waker = Waker::from(Arc::new(TaskWaker {
            id,
            queue: Arc::clone(&self.ready),
        }));
        self.tasks.insert(
            id,
            Task {
                future,
                waker,
                frames: Vec::new(),
            },
        );
        self.outputs.push(None);
        self.ready.schedule(id);
        id
    }

    /// Number of tasks that have not completed yet.
    pub fn active(&self) -> usize {
        self.tasks.len()
    }

    /// Drive every task to completion. Outputs are returned in spawn order.
    pub async fn run(mut self) -> Vec<T> {
        poll_fn(|cx| self.poll_tasks(cx)).await;
        std::mem::take(&mut self.outputs).into_iter().flatten().collect()
    }

    fn poll_tasks(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        loop {
            if self.tasks.is_empty() {
                return Poll::Ready(());
            }

            let Some(id) = self.ready.next(cx.waker()) else {
                return Poll::Pending;
            };
            let Some(task) = self.tasks.get_mut(&id) else {
                continue;
            };

            trace!(task = id.0, "resuming task");
            let poll = {
                let _swap = StackSwap::enter(&mut task.frames);
                let mut task_cx = Context::from_waker(&task.waker);
                Pin::new(&mut task.future).poll(&mut task_cx)
            };

            if let Poll::Ready(output) = poll {
                trace!(task = id.0, "task finished");
                self.tasks.remove(&id);
                self.outputs[id.0] = Some(output);
            }
        }
    }
}

impl<T> Default for TaskCoordinator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for TaskCoordinator<T> {
    /// Tasks dropped while suspended unwind their context guards on their
    /// own stack, not on the driver's.
    fn drop(&mut self) {
        for (id, mut task) in self.tasks.drain() {
            trace!(task = id.0, "dropping unfinished task");
            let _swap = StackSwap::enter(&mut task.frames);
            drop(task.future);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use futures_util::task::noop_waker;
    use futures_util::FutureExt;

    use super::*;
    use crate::graph::NodeId;
    use crate::reactive::ReactiveContext;
    use crate::task::yield_now;

    fn log_task(
        log: &Rc<RefCell<Vec<String>>>,
        name: &'static str,
        segments: usize,
    ) -> LocalBoxFuture<'static, usize> {
        let log = Rc::clone(log);
        async move {
            for i in 1..=segments {
                log.borrow_mut().push(format!("{name}{i}"));
                if i < segments {
                    yield_now().await;
                }
            }
            segments
        }
        .boxed_local()
    }

    #[test]
    fn tasks_interleave_in_spawn_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut coordinator = TaskCoordinator::new();
        coordinator.spawn(log_task(&log, "a", 3));
        coordinator.spawn(log_task(&log, "b", 2));
        coordinator.spawn(log_task(&log, "c", 1));

        let outputs = pollster::block_on(coordinator.run());

        assert_eq!(outputs, vec![3, 2, 1]);
        assert_eq!(*log.borrow(), vec!["a1", "b1", "c1", "a2", "b2", "a3"]);
    }

    #[test]
    fn empty_coordinator_finishes_immediately() {
        let coordinator: TaskCoordinator<()> = TaskCoordinator::new();
        assert_eq!(coordinator.active(), 0);
        assert!(pollster::block_on(coordinator.run()).is_empty());
    }

    #[test]
    fn each_task_sees_its_own_context() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut coordinator = TaskCoordinator::new();

        for _ in 0..2 {
            let seen = Rc::clone(&seen);
            coordinator.spawn(
                async move {
                    let id = NodeId::new();
                    let _ctx = ReactiveContext::enter(id);
                    yield_now().await;
                    seen.borrow_mut().push(ReactiveContext::current() == Some(id));
                }
                .boxed_local(),
            );
        }

        pollster::block_on(coordinator.run());

        assert_eq!(*seen.borrow(), vec![true, true]);
        assert_eq!(ReactiveContext::depth(), 0);
    }

    #[test]
    fn dropping_a_suspended_task_unwinds_its_own_frames() {
        let outer = NodeId::new();
        let _ctx = ReactiveContext::enter(outer);

        let mut coordinator = TaskCoordinator::new();
        coordinator.spawn(
            async move {
                let _inner = ReactiveContext::enter(NodeId::new());
                futures_util::future::pending::<()>().await;
            }
            .boxed_local(),
        );

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert!(coordinator.poll_tasks(&mut cx).is_pending());
        assert_eq!(coordinator.active(), 1);
        assert_eq!(ReactiveContext::current(), Some(outer));

        drop(coordinator);
        assert_eq!(ReactiveContext::current(), Some(outer));
        assert_eq!(ReactiveContext::depth(), 1);
    }
}
