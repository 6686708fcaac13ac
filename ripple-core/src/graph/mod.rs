//! Dependency Graph
//!
//! This module implements the dependency graph that records which
//! computations read which reactive sources.
//!
//! # Overview
//!
//! - Nodes are ReactiveValues, Reactives and Observers, owned by the graph
//!   and addressed by [`NodeId`].
//! - An edge `source -> sink` means `sink` read `source` during its current
//!   or most recent execution.
//!
//! The graph is dynamic. A sink's edges are discarded when the sink is
//! invalidated and again when it begins re-executing; whatever it reads
//! during that execution becomes its new edge set. Stale edges from earlier
//! runs therefore never survive.
//!
//! Invalidation walks the graph depth-first from a changed value, marking
//! Reactives and Observers invalid and collecting the Observers that must
//! be queued in the [`FlushQueue`].

mod dependency;
mod node;
mod scheduler;

pub use dependency::{Cascade, DependencyGraph};
pub use node::{Node, NodeId, NodeKind};
pub use scheduler::FlushQueue;
