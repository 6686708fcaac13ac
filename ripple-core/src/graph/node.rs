//! Graph Nodes
//!
//! This module defines the node types that live in the dependency graph.

use std::cell::Cell;
use std::fmt;
use std::rc::Weak;

use indexmap::IndexSet;

use crate::reactive::Subscriber;

/// Unique identifier for a node in the dependency graph.
///
/// Ids are handed out by a per-thread counter, so comparing two ids
/// compares the creation order of their nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        thread_local! {
            static COUNTER: Cell<u64> = const { Cell::new(0) };
        }
        COUNTER.with(|counter| {
            let id = counter.get();
            counter.set(id + 1);
            Self(id)
        })
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A mutable leaf cell. The only origin of invalidation; it has
    /// dependents but never dependencies.
    Value,

    /// A memoized derived computation. Has both dependencies and dependents.
    Reactive,

    /// An eager side-effecting computation. Has dependencies only.
    Observer,
}

/// A node in the dependency graph.
pub struct Node {
    id: NodeId,

    kind: NodeKind,

    /// False once any dependency has changed since the last execution began.
    /// Values are always valid.
    valid: bool,

    /// Observers only: true while sitting in the flush queue.
    enqueued: bool,

    /// Sources read during the most recent execution, in read order.
    dependencies: IndexSet<NodeId>,

    /// Sinks that read this node during their most recent execution.
    dependents: IndexSet<NodeId>,

    /// Notified when this node goes from valid to invalid.
    subscriber: Option<Weak<dyn Subscriber>>,
}

impl Node {
    /// Create a new node with the given kind.
    ///
    /// Computations start invalid so their first read (or first flush)
    /// executes them.
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            valid: kind == NodeKind::Value,
            enqueued: false,
            dependencies: IndexSet::new(),
            dependents: IndexSet::new(),
            subscriber: None,
        }
    }

    pub fn with_subscriber(mut self, subscriber: Weak<dyn Subscriber>) -> Self {
        self.subscriber = Some(subscriber);
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    pub fn is_enqueued(&self) -> bool {
        self.enqueued
    }

    pub fn set_enqueued(&mut self, enqueued: bool) {
        self.enqueued = enqueued;
    }

    pub fn subscriber(&self) -> Option<&Weak<dyn Subscriber>> {
        self.subscriber.as_ref()
    }

    pub fn add_dependency(&mut self, node_id: NodeId) {
        self.dependencies.insert(node_id);
    }

    pub fn remove_dependency(&mut self, node_id: NodeId) {
        self.dependencies.shift_remove(&node_id);
    }

    pub fn dependencies(&self) -> &IndexSet<NodeId> {
        &self.dependencies
    }

    pub fn add_dependent(&mut self, node_id: NodeId) {
        self.dependents.insert(node_id);
    }

    pub fn remove_dependent(&mut self, node_id: NodeId) {
        self.dependents.shift_remove(&node_id);
    }

    pub fn dependents(&self) -> &IndexSet<NodeId> {
        &self.dependents
    }

    pub(crate) fn take_dependencies(&mut self) -> IndexSet<NodeId> {
        std::mem::take(&mut self.dependencies)
    }

    pub(crate) fn take_dependents(&mut self) -> IndexSet<NodeId> {
        std::mem::take(&mut self.dependents)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("valid", &self.valid)
            .field("enqueued", &self.enqueued)
            .field("dependencies", &self.dependencies)
            .field("dependents", &self.dependents)
            .finish()
    }
}
