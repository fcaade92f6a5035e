//! End-to-end lowering scenarios: the standard rules driven over whole
//! graphs, exercising memoization, ordering, error dedup, and fixpoint
//! behavior together.

use std::cell::RefCell;
use std::collections::HashSet;

use proptest::prelude::*;

use weft_core::{CmpOp, ConstValue, DataGraph, NodeId, Op, OpKind, ValueType};
use weft_rewrite::driver::DiagnosticFactory;
use weft_rewrite::rules::{standard_diagnostic, standard_fixer, uniform_operands};
use weft_rewrite::{
    fix_ancestors_first, kind_guard, run_to_fixpoint, Diagnostic, FixContext, LatticeTyper,
    NodeFix,
};

fn run_standard(graph: &mut DataGraph, typer: &mut LatticeTyper) -> weft_rewrite::FixReport {
    let mut fixer = standard_fixer();
    let mut factory = standard_diagnostic;
    fix_ancestors_first(graph, typer, &mut fixer, Some(&mut factory)).unwrap()
}

/// The smallest interesting program: an identity cast that the standard
/// policy removes in one pass.
#[test]
fn identity_cast_is_collapsed_in_one_pass() {
    let mut graph = DataGraph::new();
    let value = graph.constant(ConstValue::Real(1.0));
    let cast = graph
        .add_node_with_inputs(Op::Cast(ValueType::Real), &[value])
        .unwrap();
    let out = graph.add_output(cast).unwrap();

    let mut typer = LatticeTyper::new();
    let report = run_standard(&mut graph, &mut typer);

    assert!(report.progress);
    assert!(report.errors.is_empty());
    assert_eq!(graph.input(out, 0), Some(value));
    // The cast node is orphaned, not part of the observed program anymore.
    assert!(!graph.ancestors_first().contains(&cast));
}

/// A three-level chain where the outer repair is only decidable after the
/// inner one: Add(Add(Bool, Bool), Real). The inner Add must become Int
/// before the outer Add can see the Int/Real mismatch, all in one pass.
#[test]
fn nested_mixed_arithmetic_is_fixed_in_one_pass() {
    let mut graph = DataGraph::new();
    let t = graph.constant(ConstValue::Bool(true));
    let f = graph.constant(ConstValue::Bool(false));
    let inner = graph.add_node_with_inputs(Op::Add, &[t, f]).unwrap();
    let half = graph.constant(ConstValue::Real(0.5));
    let outer = graph.add_node_with_inputs(Op::Add, &[inner, half]).unwrap();
    let out = graph.add_output(outer).unwrap();

    let mut typer = LatticeTyper::new();
    let report = run_standard(&mut graph, &mut typer);
    assert!(report.progress);
    assert!(report.errors.is_empty());

    // The observed program no longer contains the unfixed nodes.
    let live: Vec<NodeId> = graph.ancestors_first();
    assert!(!live.contains(&inner));
    assert!(!live.contains(&outer));

    // Everything the output observes evaluates in Real, every live
    // arithmetic node has uniform operands.
    assert_eq!(typer.type_of(&graph, out), ValueType::Real);
    for &node in &live {
        if matches!(graph.op(node), Some(Op::Add | Op::Mul)) {
            let inputs = graph.inputs(node);
            let ta = typer.type_of(&graph, inputs[0]);
            let tb = typer.type_of(&graph, inputs[1]);
            assert_eq!(ta, tb, "node {node} still has mixed operands");
        }
    }

    // Second pass: nothing left to do, and the graph is untouched.
    let count = graph.node_count();
    let report = run_standard(&mut graph, &mut typer);
    assert!(!report.progress);
    assert!(report.errors.is_empty());
    assert_eq!(graph.node_count(), count);
}

/// One shared broken node, five observers, one diagnostic.
#[test]
fn fatal_node_with_five_consumers_reports_once() {
    let mut graph = DataGraph::new();
    let r = graph.constant(ConstValue::Real(1.0));
    let bad = graph.add_node_with_inputs(Op::Not, &[r]).unwrap();
    for _ in 0..5 {
        graph.add_output(bad).unwrap();
    }

    let mut typer = LatticeTyper::new();
    let report = run_standard(&mut graph, &mut typer);

    assert!(!report.progress);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(
        report.errors.errors()[0],
        Diagnostic::NonBooleanOperand {
            node: bad,
            op: OpKind::Not,
            actual: ValueType::Real,
        }
    );
}

/// A fatal node does not stop the pass: an unrelated repair in a sibling
/// subgraph still happens.
#[test]
fn pass_continues_past_fatal_nodes() {
    let mut graph = DataGraph::new();
    let r = graph.constant(ConstValue::Real(1.0));
    let bad = graph.add_node_with_inputs(Op::Not, &[r]).unwrap();
    graph.add_output(bad).unwrap();

    let i = graph.constant(ConstValue::Int(1));
    let mixed = graph.add_node_with_inputs(Op::Add, &[i, r]).unwrap();
    let out = graph.add_output(mixed).unwrap();

    let mut typer = LatticeTyper::new();
    let report = run_standard(&mut graph, &mut typer);

    assert_eq!(report.errors.len(), 1);
    assert!(report.progress);
    assert_ne!(graph.input(out, 0), Some(mixed));
    assert_eq!(typer.type_of(&graph, out), ValueType::Real);
}

/// Shared subgraph: both consumers of a mixed Add converge on the same
/// replacement, and the fixer ran on it once.
#[test]
fn shared_mixed_node_converges_and_fixes_once() {
    let mut graph = DataGraph::new();
    let i = graph.constant(ConstValue::Int(3));
    let r = graph.constant(ConstValue::Real(0.25));
    let shared = graph.add_node_with_inputs(Op::Add, &[i, r]).unwrap();
    let left = graph.add_node_with_inputs(Op::Mul, &[shared, shared]).unwrap();
    let right = graph
        .add_node_with_inputs(Op::Add, &[shared, r])
        .unwrap();
    graph.add_output(left).unwrap();
    graph.add_output(right).unwrap();

    let calls = RefCell::new(Vec::new());
    let mut fixer = |cx: &mut FixContext<'_>, node: NodeId| {
        calls.borrow_mut().push(node);
        uniform_operands(cx, node)
    };

    let mut typer = LatticeTyper::new();
    let report = fix_ancestors_first(&mut graph, &mut typer, &mut fixer, None).unwrap();
    assert!(report.progress);

    // The shared node was fixed exactly once, and no decided node was ever
    // revisited. (Declined nodes are the one case the pass may revisit:
    // `Inapplicable` is not memoized.)
    let calls = calls.into_inner();
    assert_eq!(calls.iter().filter(|&&n| n == shared).count(), 1);
    let decided: HashSet<NodeId> = calls
        .iter()
        .copied()
        .filter(|&n| matches!(graph.op(n), Some(Op::Add | Op::Mul | Op::Compare(_))))
        .collect();
    for node in decided {
        assert_eq!(calls.iter().filter(|&&n| n == node).count(), 1);
    }

    // Every consumer of the old shared node reads the same substitute,
    // including both slots of the Mul.
    let substitute = graph.input(right, 0).unwrap();
    assert_ne!(substitute, shared);
    assert_eq!(graph.input(left, 0), Some(substitute));
    assert_eq!(graph.input(left, 1), Some(substitute));
}

/// Fixpoint driving: a graph with no problems converges immediately and
/// repeat runs are idempotent.
#[test]
fn fixpoint_on_clean_graph_is_idempotent() {
    let mut graph = DataGraph::new();
    let a = graph.constant(ConstValue::Real(1.0));
    let b = graph.constant(ConstValue::Real(2.0));
    let add = graph.add_node_with_inputs(Op::Add, &[a, b]).unwrap();
    graph.add_output(add).unwrap();
    let count = graph.node_count();

    let mut typer = LatticeTyper::new();
    let mut fixer = standard_fixer();
    let mut factory = standard_diagnostic;
    let factory: &mut DiagnosticFactory<'_> = &mut factory;
    let report = run_to_fixpoint(&mut graph, &mut typer, &mut fixer, Some(factory), 8).unwrap();

    assert!(!report.progress);
    assert!(report.errors.is_empty());
    assert_eq!(graph.node_count(), count);
}

#[test]
fn fixpoint_converges_on_mixed_graph() {
    let mut graph = DataGraph::new();
    let b = graph.constant(ConstValue::Bool(true));
    let i = graph.constant(ConstValue::Int(2));
    let r = graph.constant(ConstValue::Real(0.5));
    let sum = graph.add_node_with_inputs(Op::Add, &[b, i]).unwrap();
    let prod = graph.add_node_with_inputs(Op::Mul, &[sum, r]).unwrap();
    let cmp = graph
        .add_node_with_inputs(Op::Compare(CmpOp::Lt), &[prod, r])
        .unwrap();
    let out = graph.add_output(cmp).unwrap();

    let mut typer = LatticeTyper::new();
    let mut fixer = standard_fixer();
    let report = run_to_fixpoint(&mut graph, &mut typer, &mut fixer, None, 8).unwrap();

    assert!(!report.progress);
    assert!(report.errors.is_empty());
    assert_eq!(typer.type_of(&graph, out), ValueType::Bool);

    // Converged: every live binary node has uniform operands.
    for node in graph.ancestors_first() {
        if matches!(graph.op(node), Some(Op::Add | Op::Mul | Op::Compare(_))) {
            let inputs = graph.inputs(node);
            assert_eq!(
                typer.type_of(&graph, inputs[0]),
                typer.type_of(&graph, inputs[1]),
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Property: a kind guard never leaks nodes of other kinds
// ---------------------------------------------------------------------------

/// Each entry picks earlier nodes as inputs; kinds are mixed deliberately.
fn mixed_dag() -> impl Strategy<Value = Vec<Vec<prop::sample::Index>>> {
    prop::collection::vec(
        prop::collection::vec(any::<prop::sample::Index>(), 0..=2),
        1..20,
    )
}

fn build_mixed(picks: &[Vec<prop::sample::Index>]) -> DataGraph {
    let mut graph = DataGraph::new();
    let mut ids: Vec<NodeId> = Vec::new();
    for (i, inputs) in picks.iter().enumerate() {
        let chosen: Vec<NodeId> = if i == 0 {
            Vec::new()
        } else {
            inputs.iter().map(|pick| ids[pick.index(i)]).collect()
        };
        let id = match chosen.len() {
            0 => graph.constant(match i % 3 {
                0 => ConstValue::Bool(true),
                1 => ConstValue::Int(i as i64),
                _ => ConstValue::Real(i as f64),
            }),
            1 => match i % 3 {
                0 => graph.add_node_with_inputs(Op::Neg, &chosen).unwrap(),
                1 => graph.add_node_with_inputs(Op::Not, &chosen).unwrap(),
                _ => graph
                    .add_node_with_inputs(Op::Cast(ValueType::Real), &chosen)
                    .unwrap(),
            },
            _ => match i % 3 {
                0 => graph.add_node_with_inputs(Op::Add, &chosen).unwrap(),
                1 => graph.add_node_with_inputs(Op::Mul, &chosen).unwrap(),
                _ => graph
                    .add_node_with_inputs(Op::Compare(CmpOp::Eq), &chosen)
                    .unwrap(),
            },
        };
        ids.push(id);
    }
    let last = *ids.last().unwrap();
    graph.add_output(last).unwrap();
    graph
}

proptest! {
    #[test]
    fn kind_guard_isolation_over_mixed_graphs(picks in mixed_dag(), kind_pick in 0usize..6) {
        let guarded = [
            OpKind::Const,
            OpKind::Add,
            OpKind::Mul,
            OpKind::Neg,
            OpKind::Not,
            OpKind::Cast,
        ][kind_pick];

        let mut graph = build_mixed(&picks);
        let mut typer = LatticeTyper::new();

        let seen = RefCell::new(Vec::new());
        let recorder = |cx: &mut FixContext<'_>, node: NodeId| {
            seen.borrow_mut().push(cx.graph.op(node).map(|op| op.kind()));
            NodeFix::Inapplicable
        };
        let mut fixer = kind_guard(guarded, recorder);
        let report = fix_ancestors_first(&mut graph, &mut typer, &mut fixer, None).unwrap();

        prop_assert!(!report.progress);
        for kind in seen.borrow().iter() {
            prop_assert_eq!(*kind, Some(guarded));
        }
    }
}
