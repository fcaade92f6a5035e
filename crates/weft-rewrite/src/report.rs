//! Diagnostics and the pass-level error report.
//!
//! [`Diagnostic`] captures full context for every lowering error: which node
//! is broken, which consumer edge surfaced it, and the representations
//! involved. [`ErrorReport`] accumulates diagnostics across a pass without
//! aborting; whoever runs the pass inspects it afterwards and decides whether
//! compilation may continue.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use weft_core::{NodeId, OpKind, ValueType};

/// A user-facing lowering error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum Diagnostic {
    /// A node cannot be lowered to the target representation, discovered on
    /// one of its consumer edges.
    #[error("node {node} (operand {slot} of node {consumer}) cannot be lowered to the target")]
    UnloweredOperand {
        /// The node that cannot be lowered.
        node: NodeId,
        /// The consumer whose edge surfaced the problem.
        consumer: NodeId,
        /// Input slot of `consumer` that reads `node`.
        slot: u16,
    },

    /// An operation that is only defined for Bool received another
    /// representation.
    #[error("{op} node {node} requires a Bool operand, found {actual}")]
    NonBooleanOperand {
        /// The node with the bad operand.
        node: NodeId,
        /// Kind of that node.
        op: OpKind,
        /// The representation actually supplied.
        actual: ValueType,
    },
}

/// Ordered, append-only collection of diagnostics for one or more passes.
///
/// Non-empty after a pass means the pipeline must stop once the report is
/// inspected; the pass itself never stops early because of it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorReport {
    errors: Vec<Diagnostic>,
}

impl ErrorReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        ErrorReport { errors: Vec::new() }
    }

    /// Appends a diagnostic.
    pub fn add_error(&mut self, error: Diagnostic) {
        self.errors.push(error);
    }

    /// Returns `true` if no diagnostics were recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of recorded diagnostics.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// The recorded diagnostics, in the order they were appended.
    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }
}
