//! Node fixers: the pluggable repair policy and its combinators.
//!
//! A node fixer is a function from one node to a [`NodeFix`] verdict. It may
//! allocate new nodes through the [`FixContext`] but must never rewire
//! existing edges; only the pass driver mutates edges, so that replacements
//! are memoized and every consumer of a shared node converges on the same
//! substitute.
//!
//! The four verdicts are deliberately distinct. `Unchanged` means "this node
//! is already correct" and ends a [`first_match`] chain; `Inapplicable` means
//! "not my problem" and lets the next fixer in the chain have a look. A fixer
//! that conflates the two either masks later fixers or runs them on nodes
//! that were already accepted.

use weft_core::{DataGraph, NodeId, OpKind, ValueType};

use crate::typer::Typer;

/// Verdict of a node fixer for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeFix {
    /// The node already satisfies the target's constraints. Terminates a
    /// first-match chain.
    Unchanged,
    /// Substitute this node wherever the original appears as an input. May
    /// be a freshly allocated node or a different existing one.
    Replacement(NodeId),
    /// This fixer does not recognize the node; try the next one.
    Inapplicable,
    /// The node is recognized and provably unrepairable. The pass records a
    /// diagnostic (at most once per node) and keeps scanning for independent
    /// problems.
    Fatal,
}

/// Everything a fixer may touch: the graph (to inspect and to allocate
/// replacement nodes) and the typer (to inspect representations).
pub struct FixContext<'a> {
    pub graph: &'a mut DataGraph,
    pub typer: &'a mut dyn Typer,
}

impl FixContext<'_> {
    /// The representation of `node`, via the typer's cache.
    pub fn type_of(&mut self, node: NodeId) -> ValueType {
        self.typer.type_of(self.graph, node)
    }
}

/// A pluggable repair policy for single nodes.
///
/// Implemented by any `FnMut(&mut FixContext<'_>, NodeId) -> NodeFix`, so
/// plain functions and closures are fixers.
pub trait NodeFixer {
    fn fix(&mut self, cx: &mut FixContext<'_>, node: NodeId) -> NodeFix;
}

impl<F> NodeFixer for F
where
    F: FnMut(&mut FixContext<'_>, NodeId) -> NodeFix,
{
    fn fix(&mut self, cx: &mut FixContext<'_>, node: NodeId) -> NodeFix {
        self(cx, node)
    }
}

// ---------------------------------------------------------------------------
// Combinators
// ---------------------------------------------------------------------------

/// Tries fixers in order; the first verdict that is not
/// [`NodeFix::Inapplicable`] wins. See [`first_match`].
pub struct FirstMatch<'a> {
    fixers: Vec<Box<dyn NodeFixer + 'a>>,
}

/// Combines fixers into one that evaluates them in order and short-circuits
/// on the first decisive verdict. If every fixer declines, the combination
/// declines.
pub fn first_match<'a>(fixers: Vec<Box<dyn NodeFixer + 'a>>) -> FirstMatch<'a> {
    FirstMatch { fixers }
}

impl NodeFixer for FirstMatch<'_> {
    fn fix(&mut self, cx: &mut FixContext<'_>, node: NodeId) -> NodeFix {
        for fixer in &mut self.fixers {
            match fixer.fix(cx, node) {
                NodeFix::Inapplicable => continue,
                decisive => return decisive,
            }
        }
        NodeFix::Inapplicable
    }
}

/// Restricts a fixer to nodes of one kind. See [`kind_guard`].
pub struct KindGuard<F> {
    kind: OpKind,
    inner: F,
}

/// Wraps `inner` so it only ever sees nodes whose [`Op::kind`] equals
/// `kind`; every other node is declined.
///
/// Dispatch goes through the closed [`OpKind`] mirror, so introducing a new
/// node kind is a compile-time event at the catalogue, not a silent runtime
/// miss here.
///
/// [`Op::kind`]: weft_core::Op::kind
pub fn kind_guard<F: NodeFixer>(kind: OpKind, inner: F) -> KindGuard<F> {
    KindGuard { kind, inner }
}

impl<F: NodeFixer> NodeFixer for KindGuard<F> {
    fn fix(&mut self, cx: &mut FixContext<'_>, node: NodeId) -> NodeFix {
        match cx.graph.op(node) {
            Some(op) if op.kind() == self.kind => self.inner.fix(cx, node),
            _ => NodeFix::Inapplicable,
        }
    }
}
