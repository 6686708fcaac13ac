//! Dependency Graph storage
//!
//! The graph owns every node; edges are plain id pairs stored on both
//! endpoints. A sink's edges are dropped when it is invalidated and when it
//! starts a new execution, so an edge only ever describes a read made by
//! the sink's current (or most recent) execution.

use std::collections::HashMap;
use std::rc::Weak;

use smallvec::SmallVec;

use super::node::{Node, NodeId, NodeKind};
use crate::reactive::Subscriber;

/// Scratch buffer of node ids used while walking the graph.
type NodeIds = SmallVec<[NodeId; 8]>;

/// Result of propagating a change through the graph.
#[derive(Default)]
pub struct Cascade {
    /// Observers that became pending, in the order they must be queued.
    pub enqueue: Vec<NodeId>,

    /// Subscribers of nodes that went from valid to invalid.
    pub notify: Vec<Weak<dyn Subscriber>>,
}

/// The dependency graph: all nodes, indexed by id.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: HashMap<NodeId, Node>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Add a node to the graph.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id();
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node from the graph.
    ///
    /// Also removes all edges involving this node.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(&node_id)?;

        for dep_id in node.dependencies() {
            if let Some(dep) = self.nodes.get_mut(dep_id) {
                dep.remove_dependent(node_id);
            }
        }

        for dependent_id in node.dependents() {
            if let Some(dependent) = self.nodes.get_mut(dependent_id) {
                dependent.remove_dependency(node_id);
            }
        }

        Some(node)
    }

    pub fn get_node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    pub fn get_node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Record that `sink` read `source`.
    ///
    /// Edges touching a node that is no longer in the graph (a disposed
    /// Observer, a dropped Reactive) are ignored.
    pub fn add_edge(&mut self, source: NodeId, sink: NodeId) {
        if !self.nodes.contains_key(&source) || !self.nodes.contains_key(&sink) {
            return;
        }
        if let Some(source_node) = self.nodes.get_mut(&source) {
            source_node.add_dependent(sink);
        }
        if let Some(sink_node) = self.nodes.get_mut(&sink) {
            sink_node.add_dependency(source);
        }
    }

    pub fn remove_edge(&mut self, source: NodeId, sink: NodeId) {
        if let Some(source_node) = self.nodes.get_mut(&source) {
            source_node.remove_dependent(sink);
        }
        if let Some(sink_node) = self.nodes.get_mut(&sink) {
            sink_node.remove_dependency(source);
        }
    }

    /// Drop every edge into `sink`.
    pub fn clear_dependencies(&mut self, sink: NodeId) {
        let Some(node) = self.nodes.get_mut(&sink) else {
            return;
        };
        for source in node.take_dependencies() {
            if let Some(source_node) = self.nodes.get_mut(&source) {
                source_node.remove_dependent(sink);
            }
        }
    }

    /// Detach and return every edge out of `source`, in creation order of
    /// the sinks.
    fn take_dependents(&mut self, source: NodeId) -> NodeIds {
        let Some(node) = self.nodes.get_mut(&source) else {
            return NodeIds::new();
        };
        let mut dependents: NodeIds = node.take_dependents().into_iter().collect();
        dependents.sort_unstable();
        for &sink in &dependents {
            if let Some(sink_node) = self.nodes.get_mut(&sink) {
                sink_node.remove_dependency(source);
            }
        }
        dependents
    }

    /// Invalidate everything downstream of `source`.
    ///
    /// The walk is depth-first and visits siblings in creation order, so two
    /// Observers reached from the same write are queued oldest first. Every
    /// visited node loses its edges: a computation that has been invalidated
    /// is only reachable again after it re-executes and reads its sources
    /// anew. Observers already in the queue are not queued twice.
    pub fn invalidate_from(&mut self, source: NodeId) -> Cascade {
        let mut cascade = Cascade::default();
        let mut stack = self.take_dependents(source);
        stack.reverse();

        while let Some(node_id) = stack.pop() {
            let Some(node) = self.nodes.get_mut(&node_id) else {
                continue;
            };

            let was_valid = node.is_valid();
            node.set_valid(false);
            if was_valid {
                if let Some(subscriber) = node.subscriber() {
                    cascade.notify.push(subscriber.clone());
                }
            }

            match node.kind() {
                NodeKind::Value => {}
                NodeKind::Reactive => {
                    self.clear_dependencies(node_id);
                    let mut downstream = self.take_dependents(node_id);
                    downstream.reverse();
                    stack.extend(downstream);
                }
                NodeKind::Observer => {
                    if !node.is_enqueued() {
                        node.set_enqueued(true);
                        cascade.enqueue.push(node_id);
                    }
                    self.clear_dependencies(node_id);
                }
            }
        }

        cascade
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
