//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a value is read,
//! we can register the current computation as a dependent.
//!
//! # Implementation
//!
//! We use a thread-local stack to track the currently executing computation.
//! When entering a reactive context (running a Reactive or an Observer), we
//! push its node onto the stack. When the computation completes, we pop it.
//! `isolate` pushes an empty frame, which hides every frame below it.
//!
//! The stack belongs to one logical strand of execution. Async bodies that
//! are interleaved by the task coordinator each carry their own stack; the
//! coordinator swaps it in before polling a task and back out afterwards
//! (see [`swap_stack`]).

use std::cell::RefCell;

use crate::graph::NodeId;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the reactive context stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// A Reactive or Observer is executing.
    Node(NodeId),

    /// Dependency tracking is suspended.
    Isolated,
}

/// Guard that pops the context when dropped.
///
/// This ensures the context stack is properly maintained even if
/// the computation panics. A body suspended inside a task coordinator
/// keeps its guards on the task's own stack; the coordinator swaps that
/// stack back in before dropping an unfinished task, so the guards pop
/// the frames they pushed.
pub struct ReactiveContext {
    frame: Frame,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given node.
    ///
    /// While this context is active, any value or Reactive that is read
    /// records an edge to `node`.
    pub fn enter(node: NodeId) -> Self {
        Self::push(Frame::Node(node))
    }

    /// Suspend tracking until the returned guard is dropped.
    pub fn isolate() -> Self {
        Self::push(Frame::Isolated)
    }

    fn push(frame: Frame) -> Self {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(frame));
        Self { frame }
    }

    /// Check if there is an active reactive context.
    pub fn is_active() -> bool {
        Self::current().is_some()
    }

    /// The node that reads are currently attributed to, if any.
    pub fn current() -> Option<NodeId> {
        CONTEXT_STACK.with(|stack| match stack.borrow().last() {
            Some(Frame::Node(node)) => Some(*node),
            Some(Frame::Isolated) | None => None,
        })
    }

    /// Number of frames on this strand's stack.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        // The thread-local may already be gone during thread teardown.
        let _ = CONTEXT_STACK.try_with(|stack| {
            let popped = stack.borrow_mut().pop();

            debug_assert_eq!(
                popped,
                Some(self.frame),
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.frame,
                popped
            );
        });
    }
}

/// Exchange the current strand's stack with `stack`.
///
/// Calling it twice with the same buffer restores the original stack.
pub(crate) fn swap_stack(stack: &mut Vec<Frame>) {
    CONTEXT_STACK.with(|current| std::mem::swap(&mut *current.borrow_mut(), stack));
}
