//! ReactiveValue Implementation
//!
//! A ReactiveValue is the fundamental reactive primitive. It holds a value
//! and tracks which computations read it.
//!
//! # How ReactiveValues Work
//!
//! 1. When a value is read within a reactive context (Reactive/Observer),
//!    the value records that context as a dependent.
//!
//! 2. When the value is written with something different from what it
//!    holds, every dependent is invalidated, transitively.
//!
//! 3. Invalidated Observers are queued. They run on the next flush.
//!
//! Writing an equal value is a no-op: the revision does not move and
//! nothing downstream is invalidated.

use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};
use std::rc::Rc;

use super::runtime::Runtime;
use crate::graph::NodeId;

struct ValueInner<T> {
    id: NodeId,
    value: RefCell<T>,
    revision: Cell<u64>,
}

impl<T> Drop for ValueInner<T> {
    fn drop(&mut self) {
        Runtime::unregister(self.id);
    }
}

/// A mutable reactive cell.
///
/// Clones share the same cell.
///
/// # Example
///
/// ```rust
/// use ripple_core::reactive::ReactiveValue;
///
/// let count = ReactiveValue::new(0);
/// count.write(5);
/// assert_eq!(count.read(), 5);
/// assert_eq!(count.revision(), 1);
/// ```
pub struct ReactiveValue<T>
where
    T: Clone + PartialEq + 'static,
{
    inner: Rc<ValueInner<T>>,
}

impl<T> ReactiveValue<T>
where
    T: Clone + PartialEq + 'static,
{
    pub fn new(value: T) -> Self {
        let id = NodeId::new();
        Runtime::register_value(id);
        Self {
            inner: Rc::new(ValueInner {
                id,
                value: RefCell::new(value),
                revision: Cell::new(0),
            }),
        }
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Get the current value.
    ///
    /// If called within a reactive context, this also records the current
    /// computation as a dependent.
    pub fn read(&self) -> T {
        Runtime::track(self.inner.id);
        self.read_untracked()
    }

    /// Get the current value without recording a dependency.
    pub fn read_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Set a new value.
    ///
    /// If it differs from the current one, every dependent is invalidated
    /// and affected Observers are queued for the next flush.
    pub fn write(&self, value: T) {
        if *self.inner.value.borrow() == value {
            return;
        }

        let previous = self.inner.value.replace(value);
        self.inner.revision.set(self.inner.revision.get() + 1);
        drop(previous);

        Runtime::notify_changed(self.inner.id);
    }

    /// Update the value using a function of the current one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let current = self.inner.value.borrow();
            f(&current)
        };
        self.write(next);
    }

    /// Number of writes that changed the value.
    pub fn revision(&self) -> u64 {
        self.inner.revision.get()
    }
}

impl<T> Clone for ReactiveValue<T>
where
    T: Clone + PartialEq + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Debug for ReactiveValue<T>
where
    T: Clone + PartialEq + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveValue")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("revision", &self.revision())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
