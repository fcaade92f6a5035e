//! The closed operation catalogue.
//!
//! Every node in a [`DataGraph`](crate::graph::DataGraph) carries exactly one
//! [`Op`]. The set is closed: rewrite rules and the typer match on it
//! exhaustively, so adding a variant surfaces every call site that needs a
//! handler at compile time. [`OpKind`] is the fieldless mirror used for
//! kind-based dispatch.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{ConstValue, ValueType};

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Lt,
}

/// An operation in the dataflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op {
    /// A literal value.
    Const(ConstValue),
    /// Binary addition over two operands of identical representation.
    Add,
    /// Binary multiplication over two operands of identical representation.
    Mul,
    /// Arithmetic negation.
    Neg,
    /// Logical negation. Defined only for Bool operands on the target.
    Not,
    /// Comparison producing a Bool.
    Compare(CmpOp),
    /// Explicit representation conversion to the carried type.
    Cast(ValueType),
    /// A point of interest: the value observed at this node is an output of
    /// the program. Output nodes are the roots of ancestor enumeration.
    Output { index: u16 },
}

impl Op {
    /// The fieldless kind of this operation.
    pub fn kind(&self) -> OpKind {
        match self {
            Op::Const(_) => OpKind::Const,
            Op::Add => OpKind::Add,
            Op::Mul => OpKind::Mul,
            Op::Neg => OpKind::Neg,
            Op::Not => OpKind::Not,
            Op::Compare(_) => OpKind::Compare,
            Op::Cast(_) => OpKind::Cast,
            Op::Output { .. } => OpKind::Output,
        }
    }

    /// Number of input slots this operation expects.
    pub fn arity(&self) -> usize {
        match self {
            Op::Const(_) => 0,
            Op::Neg | Op::Not | Op::Cast(_) | Op::Output { .. } => 1,
            Op::Add | Op::Mul | Op::Compare(_) => 2,
        }
    }

    /// Returns `true` if this is an `Output` node.
    pub fn is_output(&self) -> bool {
        matches!(self, Op::Output { .. })
    }
}

/// Fieldless mirror of [`Op`], used for kind-based dispatch in guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    Const,
    Add,
    Mul,
    Neg,
    Not,
    Compare,
    Cast,
    Output,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpKind::Const => "Const",
            OpKind::Add => "Add",
            OpKind::Mul => "Mul",
            OpKind::Neg => "Neg",
            OpKind::Not => "Not",
            OpKind::Compare => "Compare",
            OpKind::Cast => "Cast",
            OpKind::Output => "Output",
        };
        write!(f, "{name}")
    }
}
