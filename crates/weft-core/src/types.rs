//! Value representations for the scalar target.
//!
//! The target machine evaluates every value in one of three concrete
//! representations: `Bool`, `Int` (64-bit signed), or `Real` (64-bit float).
//! `Bool < Int < Real` is the widening order. [`ValueType::Unknown`] is the
//! bottom element produced when a node is malformed (wrong operand count or a
//! dangling operand) and never participates in widening.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The representation of a value on the target machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Bool,
    Int,
    Real,
    /// Produced for malformed nodes. Not a real representation.
    Unknown,
}

impl ValueType {
    /// Position in the widening order `Bool < Int < Real`.
    /// `None` for [`ValueType::Unknown`].
    pub fn widening_rank(self) -> Option<u8> {
        match self {
            ValueType::Bool => Some(0),
            ValueType::Int => Some(1),
            ValueType::Real => Some(2),
            ValueType::Unknown => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Bool => "Bool",
            ValueType::Int => "Int",
            ValueType::Real => "Real",
            ValueType::Unknown => "Unknown",
        };
        write!(f, "{name}")
    }
}

/// A constant value carried by a `Const` node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConstValue {
    Bool(bool),
    Int(i64),
    Real(f64),
}

impl ConstValue {
    /// The representation this constant has on the target.
    pub fn value_type(&self) -> ValueType {
        match self {
            ConstValue::Bool(_) => ValueType::Bool,
            ConstValue::Int(_) => ValueType::Int,
            ConstValue::Real(_) => ValueType::Real,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Bool(v) => write!(f, "{v}"),
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::Real(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_rank_order() {
        assert!(ValueType::Bool.widening_rank() < ValueType::Int.widening_rank());
        assert!(ValueType::Int.widening_rank() < ValueType::Real.widening_rank());
    }

    #[test]
    fn unknown_has_no_rank() {
        assert_eq!(ValueType::Unknown.widening_rank(), None);
    }

    #[test]
    fn const_value_types() {
        assert_eq!(ConstValue::Bool(true).value_type(), ValueType::Bool);
        assert_eq!(ConstValue::Int(-3).value_type(), ValueType::Int);
        assert_eq!(ConstValue::Real(0.5).value_type(), ValueType::Real);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", ValueType::Real), "Real");
        assert_eq!(format!("{}", ConstValue::Int(7)), "7");
    }

    #[test]
    fn serde_roundtrip() {
        let ty = ValueType::Int;
        let json = serde_json::to_string(&ty).unwrap();
        let back: ValueType = serde_json::from_str(&json).unwrap();
        assert_eq!(ty, back);

        let value = ConstValue::Real(2.25);
        let json = serde_json::to_string(&value).unwrap();
        let back: ConstValue = serde_json::from_str(&json).unwrap();
        assert_eq!(value, back);
    }
}
