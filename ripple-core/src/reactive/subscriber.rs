//! Subscriber types for the reactive system.
//!
//! A subscriber is any computation that depends on reactive values: a
//! Reactive or an Observer. The graph only stores ids and flags; the typed
//! state (cached values, bodies, callbacks) lives behind these traits.

use std::rc::Rc;

use futures_util::future::LocalBoxFuture;

use crate::error::Result;
use crate::graph::NodeId;

/// A computation that can be notified when its dependencies change.
pub trait Subscriber {
    /// The graph node backing this computation.
    fn node_id(&self) -> NodeId;

    /// Called once per transition from valid to invalid, after the graph
    /// has been updated.
    fn invalidated(&self);
}

/// An Observer as seen by the flush scheduler.
pub(crate) trait Job: Subscriber {
    /// Produce one run of the Observer's body.
    ///
    /// Nothing executes until the returned future is first polled, so the
    /// scheduler controls the start order of every run it launches.
    fn launch(self: Rc<Self>) -> LocalBoxFuture<'static, Result<()>>;
}
