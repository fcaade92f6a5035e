//! Fixpoint graph rewriting for the weft scalar backend.
//!
//! The backend cannot execute every graph the front end builds: operand
//! representations must line up with what the target supports. This crate
//! walks the dataflow graph ancestors-first and lets a pluggable policy
//! replace individual nodes until the graph reaches a fixpoint, while a
//! cached typer tracks each node's representation and an error report
//! collects every independent problem instead of stopping at the first.
//!
//! The engine itself never decides that a node is broken. It drives the
//! traversal and memoizes what the policy decides; what to repair and how is
//! supplied as a [`NodeFixer`] (plain functions, composable with
//! [`first_match`] and [`kind_guard`]) or as a [`ProblemFixer`]
//! implementation. Both styles run on the same driver.

pub mod coerce;
pub mod driver;
pub mod fixer;
pub mod report;
pub mod rules;
pub mod typer;

// Re-export commonly used types
pub use driver::{fix_ancestors_first, fix_problems, run_to_fixpoint, FixReport, ProblemFixer};
pub use fixer::{first_match, kind_guard, FirstMatch, FixContext, KindGuard, NodeFix, NodeFixer};
pub use report::{Diagnostic, ErrorReport};
pub use typer::{LatticeTyper, Typer};
