//! Semantic typing with demand-driven caching and explicit invalidation.
//!
//! Computing a node's representation requires the representations of all of
//! its ancestors, which is expensive to redo from scratch on every query.
//! [`LatticeTyper`] computes on demand and caches. When a fixing pass rewires
//! a node's inputs it must call [`Typer::update_type`] on that node; the
//! typer then recomputes the node and evicts every cached transitive
//! consumer, so stale representations are never observed. Evicted nodes are
//! recomputed lazily on their next lookup.

use std::collections::HashSet;

use indexmap::IndexMap;
use weft_core::{DataGraph, NodeId, Op, ValueType};

use crate::coerce;

/// Associates a representation with each graph node.
///
/// Lookups are safe to call at any time; implementations cache internally.
/// After any edge of `node` changes, `update_type(node)` must be called. The
/// implementation is responsible for propagating the invalidation to every
/// cached consumer type that depended on `node`.
pub trait Typer {
    /// The representation `node` evaluates in.
    fn type_of(&mut self, graph: &DataGraph, node: NodeId) -> ValueType;

    /// Recomputes `node`'s representation and invalidates all cached
    /// transitive consumers.
    fn update_type(&mut self, graph: &DataGraph, node: NodeId);
}

/// The standard [`Typer`] for the scalar target.
#[derive(Debug, Default)]
pub struct LatticeTyper {
    cache: IndexMap<NodeId, ValueType>,
}

impl LatticeTyper {
    /// Creates a typer with an empty cache.
    pub fn new() -> Self {
        LatticeTyper {
            cache: IndexMap::new(),
        }
    }

    /// The cached representation, without computing. Mainly for tests.
    pub fn cached(&self, node: NodeId) -> Option<ValueType> {
        self.cache.get(&node).copied()
    }

    /// Computes the representation of `node` assuming every input is cached.
    fn compute(&self, graph: &DataGraph, node: NodeId) -> ValueType {
        let Some(op) = graph.op(node) else {
            return ValueType::Unknown;
        };
        let inputs = graph.inputs(node);
        if inputs.len() != op.arity() {
            return ValueType::Unknown;
        }
        let input_type = |i: usize| self.cache[&inputs[i]];
        match op {
            Op::Const(value) => value.value_type(),
            Op::Cast(target) => *target,
            // Logical and comparison nodes evaluate to Bool by construction;
            // whether their operands are acceptable is the fixers' concern.
            Op::Not | Op::Compare(_) => ValueType::Bool,
            Op::Add | Op::Mul => coerce::arith_result(input_type(0), input_type(1))
                .unwrap_or(ValueType::Unknown),
            Op::Neg => {
                let t = input_type(0);
                coerce::arith_result(t, t).unwrap_or(ValueType::Unknown)
            }
            Op::Output { .. } => input_type(0),
        }
    }
}

impl Typer for LatticeTyper {
    fn type_of(&mut self, graph: &DataGraph, node: NodeId) -> ValueType {
        if let Some(&cached) = self.cache.get(&node) {
            return cached;
        }
        // Explicit work stack: a node is computed once all its inputs are
        // cached. The graph is a DAG, so this terminates.
        let mut stack = vec![node];
        while let Some(&top) = stack.last() {
            if self.cache.contains_key(&top) {
                stack.pop();
                continue;
            }
            let pending: Vec<NodeId> = graph
                .inputs(top)
                .into_iter()
                .filter(|input| !self.cache.contains_key(input))
                .collect();
            if pending.is_empty() {
                let ty = self.compute(graph, top);
                self.cache.insert(top, ty);
                stack.pop();
            } else {
                stack.extend(pending);
            }
        }
        self.cache[&node]
    }

    fn update_type(&mut self, graph: &DataGraph, node: NodeId) {
        // Evict every transitive consumer; they recompute on demand.
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut queue: Vec<NodeId> = vec![node];
        while let Some(current) = queue.pop() {
            for consumer in graph.consumers(current) {
                if seen.insert(consumer) {
                    self.cache.shift_remove(&consumer);
                    queue.push(consumer);
                }
            }
        }
        self.cache.shift_remove(&node);
        self.type_of(graph, node);
    }
}
