//! DataGraph: the arena-backed dataflow graph the rewrite engine operates on.
//!
//! Nodes live in a single owning `StableGraph` and are referred to by stable
//! [`NodeId`] indices, so the same node can be shared as an input by any
//! number of consumers without ownership or aliasing hazards. Each node owns
//! an ordered list of input slots, represented as incoming edges tagged with
//! a slot number; slots are dense `0..arity`.
//!
//! Nodes do not store their consumers. "Who reads this value" is derived by
//! traversal ([`DataGraph::consumers`]), never cached on the node.
//!
//! The data graph is a DAG. [`DataGraph::ancestors_first`] enumerates every
//! ancestor of the program's `Output` nodes in inputs-before-consumers order,
//! which is the order the rewrite engine relies on: by the time a node is
//! examined as somebody's input, its own inputs have already been visited.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::CoreError;
use crate::id::NodeId;
use crate::ops::Op;
use crate::types::ConstValue;

/// An input edge. `slot` is the operand position on the consumer side:
/// the edge `a -> b` with slot 1 makes `a` the second operand of `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEdge {
    pub slot: u16,
}

/// The dataflow graph.
///
/// All mutations go through `DataGraph` methods. [`DataGraph::set_input`] is
/// the only way to redirect an existing edge; during a fixing pass only the
/// pass driver calls it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataGraph {
    nodes: StableGraph<Op, InputEdge, Directed, u32>,
    /// Next output index handed out by [`DataGraph::add_output`].
    next_output: u16,
}

impl DataGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        DataGraph {
            nodes: StableGraph::new(),
            next_output: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Adds a node with no inputs wired yet.
    pub fn add_node(&mut self, op: Op) -> NodeId {
        NodeId::from(self.nodes.add_node(op))
    }

    /// Adds a node and wires its inputs to the given nodes, in order.
    ///
    /// Slot `i` is connected to `inputs[i]`. Errors if any input does not
    /// exist.
    pub fn add_node_with_inputs(
        &mut self,
        op: Op,
        inputs: &[NodeId],
    ) -> Result<NodeId, CoreError> {
        for &input in inputs {
            if !self.contains(input) {
                return Err(CoreError::NodeNotFound { id: input });
            }
        }
        let idx = self.nodes.add_node(op);
        for (slot, &input) in inputs.iter().enumerate() {
            let src: NodeIndex<u32> = input.into();
            self.nodes.add_edge(src, idx, InputEdge { slot: slot as u16 });
        }
        Ok(NodeId::from(idx))
    }

    /// Convenience: adds a `Const` node.
    pub fn constant(&mut self, value: ConstValue) -> NodeId {
        self.add_node(Op::Const(value))
    }

    /// Adds an `Output` node observing `source`, allocating the next output
    /// index.
    pub fn add_output(&mut self, source: NodeId) -> Result<NodeId, CoreError> {
        let index = self.next_output;
        let id = self.add_node_with_inputs(Op::Output { index }, &[source])?;
        self.next_output += 1;
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Node accessors
    // -----------------------------------------------------------------------

    /// Looks up a node's operation.
    pub fn op(&self, id: NodeId) -> Option<&Op> {
        self.nodes.node_weight(id.into())
    }

    /// Returns `true` if the node exists.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.node_weight(id.into()).is_some()
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.node_count()
    }

    // -----------------------------------------------------------------------
    // Input slots
    // -----------------------------------------------------------------------

    /// Number of wired input slots on a node.
    pub fn input_count(&self, id: NodeId) -> usize {
        let idx: NodeIndex<u32> = id.into();
        self.nodes
            .edges_directed(idx, Direction::Incoming)
            .count()
    }

    /// The node wired to `slot` of `id`, if any.
    pub fn input(&self, id: NodeId, slot: u16) -> Option<NodeId> {
        let idx: NodeIndex<u32> = id.into();
        self.nodes
            .edges_directed(idx, Direction::Incoming)
            .find(|edge| edge.weight().slot == slot)
            .map(|edge| NodeId::from(edge.source()))
    }

    /// A node's ordered input list (slot 0 first).
    pub fn inputs(&self, id: NodeId) -> SmallVec<[NodeId; 2]> {
        let idx: NodeIndex<u32> = id.into();
        let mut slots: SmallVec<[(u16, NodeId); 2]> = self
            .nodes
            .edges_directed(idx, Direction::Incoming)
            .map(|edge| (edge.weight().slot, NodeId::from(edge.source())))
            .collect();
        slots.sort_by_key(|&(slot, _)| slot);
        slots.into_iter().map(|(_, id)| id).collect()
    }

    /// Rewires input `slot` of `id` to read from `source`.
    ///
    /// The slot must already be wired; this redirects an existing operand,
    /// it does not grow the input list. Errors if either node is missing or
    /// the slot is not wired.
    pub fn set_input(&mut self, id: NodeId, slot: u16, source: NodeId) -> Result<(), CoreError> {
        let idx: NodeIndex<u32> = id.into();
        if self.nodes.node_weight(idx).is_none() {
            return Err(CoreError::NodeNotFound { id });
        }
        let src: NodeIndex<u32> = source.into();
        if self.nodes.node_weight(src).is_none() {
            return Err(CoreError::NodeNotFound { id: source });
        }
        let existing = self
            .nodes
            .edges_directed(idx, Direction::Incoming)
            .find(|edge| edge.weight().slot == slot)
            .map(|edge| edge.id());
        let Some(edge_idx) = existing else {
            return Err(CoreError::SlotNotFound { node: id, slot });
        };
        self.nodes.remove_edge(edge_idx);
        self.nodes.add_edge(src, idx, InputEdge { slot });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Derived relationships
    // -----------------------------------------------------------------------

    /// The nodes reading this node's value, deduplicated and in id order.
    ///
    /// Derived by traversal; consumers are never stored on the node.
    pub fn consumers(&self, id: NodeId) -> Vec<NodeId> {
        let idx: NodeIndex<u32> = id.into();
        let mut out: Vec<NodeId> = self
            .nodes
            .edges_directed(idx, Direction::Outgoing)
            .map(|edge| NodeId::from(edge.target()))
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// All `Output` nodes, in id order.
    pub fn outputs(&self) -> Vec<NodeId> {
        self.nodes
            .node_indices()
            .filter(|&idx| self.nodes[idx].is_output())
            .map(NodeId::from)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Ancestor enumeration
    // -----------------------------------------------------------------------

    /// Every ancestor of the program's `Output` nodes (the outputs included),
    /// in inputs-before-consumers order.
    ///
    /// Each node appears exactly once no matter how many consumers share it,
    /// and always after every node reachable through its own input edges.
    pub fn ancestors_first(&self) -> Vec<NodeId> {
        self.ancestors_of(&self.outputs())
    }

    /// Like [`DataGraph::ancestors_first`] with explicit roots. Roots that do
    /// not exist are skipped.
    pub fn ancestors_of(&self, roots: &[NodeId]) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut visited: HashSet<NodeId> = HashSet::new();
        // Iterative post-order DFS over input edges. A node is emitted when
        // it is popped the second time, after its whole input subtree.
        let mut stack: Vec<(NodeId, bool)> = Vec::new();
        for &root in roots {
            if !self.contains(root) {
                continue;
            }
            stack.push((root, false));
            while let Some((node, expanded)) = stack.pop() {
                if expanded {
                    order.push(node);
                    continue;
                }
                if !visited.insert(node) {
                    continue;
                }
                stack.push((node, true));
                let inputs = self.inputs(node);
                for &child in inputs.iter().rev() {
                    if !visited.contains(&child) {
                        stack.push((child, false));
                    }
                }
            }
        }
        order
    }
}
