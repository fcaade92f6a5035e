//! Built-in lowering rules for the scalar target.
//!
//! The engine never decides what is broken; these rules do, for the one
//! constraint set the weft backend actually has: arithmetic and comparison
//! nodes evaluate both operands in a single representation, Bool participates
//! in arithmetic only after promotion to Int, and logical negation exists
//! only for Bool.
//!
//! Every rule is a plain function fixer. Each inspects the node's own
//! operand representations through the typer, which is exactly why the pass
//! driver visits inputs before consumers: by the time a rule sees a node,
//! that node's operands are already in their final, post-fix shape.

use weft_core::{NodeId, Op, OpKind, ValueType};

use crate::coerce;
use crate::fixer::{first_match, kind_guard, FirstMatch, FixContext, NodeFix};
use crate::report::Diagnostic;

/// Rewrites a binary node whose operands disagree on representation into the
/// same node over `Cast`-widened operands.
///
/// Arithmetic results are floored at Int, so `Add(Bool, Bool)` is rewritten
/// even though its operands agree. Comparisons have no floor: operands that
/// already agree compare as they are.
pub fn uniform_operands(cx: &mut FixContext<'_>, node: NodeId) -> NodeFix {
    let op = match cx.graph.op(node) {
        Some(op @ (Op::Add | Op::Mul | Op::Compare(_))) => op.clone(),
        _ => return NodeFix::Inapplicable,
    };
    let inputs = cx.graph.inputs(node);
    if inputs.len() != 2 {
        return NodeFix::Inapplicable;
    }
    let (a, b) = (inputs[0], inputs[1]);
    let ta = cx.type_of(a);
    let tb = cx.type_of(b);

    if matches!(op, Op::Compare(_)) && ta == tb && ta != ValueType::Unknown {
        return NodeFix::Unchanged;
    }
    let Some(target) = coerce::arith_result(ta, tb) else {
        return NodeFix::Inapplicable;
    };
    if ta == target && tb == target {
        return NodeFix::Unchanged;
    }

    let a = widen(cx, a, ta, target);
    let b = widen(cx, b, tb, target);
    let Ok(replacement) = cx.graph.add_node_with_inputs(op, &[a, b]) else {
        return NodeFix::Inapplicable;
    };
    NodeFix::Replacement(replacement)
}

/// Wraps `operand` in a `Cast` to `target` unless it is already there.
fn widen(cx: &mut FixContext<'_>, operand: NodeId, current: ValueType, target: ValueType) -> NodeId {
    if current == target {
        return operand;
    }
    cx.graph
        .add_node_with_inputs(Op::Cast(target), &[operand])
        .unwrap_or(operand)
}

/// Promotes the operand of a `Neg` node: the target has no Bool negation, so
/// `Neg(Bool)` becomes `Neg(Cast<Int>(Bool))`.
pub fn widen_neg_operand(cx: &mut FixContext<'_>, node: NodeId) -> NodeFix {
    if !matches!(cx.graph.op(node), Some(Op::Neg)) {
        return NodeFix::Inapplicable;
    }
    let Some(operand) = cx.graph.input(node, 0) else {
        return NodeFix::Inapplicable;
    };
    match cx.type_of(operand) {
        ValueType::Bool => {
            let cast = widen(cx, operand, ValueType::Bool, ValueType::Int);
            let Ok(replacement) = cx.graph.add_node_with_inputs(Op::Neg, &[cast]) else {
                return NodeFix::Inapplicable;
            };
            NodeFix::Replacement(replacement)
        }
        ValueType::Int | ValueType::Real => NodeFix::Unchanged,
        ValueType::Unknown => NodeFix::Inapplicable,
    }
}

/// Replaces a `Cast` whose operand already has the target representation
/// with the operand itself.
pub fn collapse_identity_cast(cx: &mut FixContext<'_>, node: NodeId) -> NodeFix {
    let target = match cx.graph.op(node) {
        Some(Op::Cast(target)) => *target,
        _ => return NodeFix::Inapplicable,
    };
    let Some(operand) = cx.graph.input(node, 0) else {
        return NodeFix::Inapplicable;
    };
    let current = cx.type_of(operand);
    if current == ValueType::Unknown {
        return NodeFix::Inapplicable;
    }
    if current == target {
        NodeFix::Replacement(operand)
    } else {
        NodeFix::Unchanged
    }
}

/// `Not` is only defined for Bool on the target; an Int or Real operand is
/// unrepairable.
pub fn reject_non_bool_not(cx: &mut FixContext<'_>, node: NodeId) -> NodeFix {
    if !matches!(cx.graph.op(node), Some(Op::Not)) {
        return NodeFix::Inapplicable;
    }
    let Some(operand) = cx.graph.input(node, 0) else {
        return NodeFix::Inapplicable;
    };
    match cx.type_of(operand) {
        ValueType::Bool => NodeFix::Unchanged,
        ValueType::Int | ValueType::Real => NodeFix::Fatal,
        ValueType::Unknown => NodeFix::Inapplicable,
    }
}

/// The standard lowering policy: all built-in rules, first match wins.
pub fn standard_fixer() -> FirstMatch<'static> {
    first_match(vec![
        Box::new(kind_guard(OpKind::Cast, collapse_identity_cast)),
        Box::new(uniform_operands),
        Box::new(kind_guard(OpKind::Neg, widen_neg_operand)),
        Box::new(kind_guard(OpKind::Not, reject_non_bool_not)),
    ])
}

/// Diagnostic factory matching [`standard_fixer`]: a bad `Not` gets the
/// specific message, everything else the generic one.
pub fn standard_diagnostic(
    cx: &mut FixContext<'_>,
    consumer: NodeId,
    slot: u16,
) -> Option<Diagnostic> {
    let node = cx.graph.input(consumer, slot)?;
    match cx.graph.op(node) {
        Some(Op::Not) => {
            let operand = cx.graph.input(node, 0)?;
            let actual = cx.type_of(operand);
            Some(Diagnostic::NonBooleanOperand {
                node,
                op: OpKind::Not,
                actual,
            })
        }
        _ => Some(Diagnostic::UnloweredOperand {
            node,
            consumer,
            slot,
        }),
    }
}
