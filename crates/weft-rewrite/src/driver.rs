//! The ancestors-first fixing pass.
//!
//! One pass walks every ancestor of the program's outputs in
//! inputs-before-consumers order and applies a repair policy one *edge* at a
//! time: when a node is enumerated, each of its input edges is checked and,
//! if the input node needs replacing, the edge is redirected to the
//! substitute.
//!
//! Because the same input node is encountered once per consumer, the pass
//! memoizes replacements: the policy runs at most once per node per pass and
//! every consumer converges on the identical substitute. A node judged
//! unrepairable is recorded in a reported set so it produces exactly one
//! diagnostic no matter how many consumers read it, and the pass keeps
//! scanning so independent problems surface together.
//!
//! The ancestors-first order matters for correctness, not just speed: a
//! policy deciding how to repair a node usually needs that node's
//! representation, and the representation must reflect repairs already made
//! to the node's own inputs. By the time a node is examined as somebody's
//! input, the pass has already processed it as a consumer, rewired its
//! operands, and told the typer to recompute it.
//!
//! There is exactly one traversal implementation, [`drive`], parameterized by
//! [`PassPolicy`]. [`fix_ancestors_first`] adapts a plain [`NodeFixer`] plus
//! an optional diagnostic factory; [`fix_problems`] adapts a [`ProblemFixer`]
//! implementation. Both produce identical behavior for equivalent policies.

use std::collections::{HashMap, HashSet};

use weft_core::{CoreError, DataGraph, NodeId};

use crate::fixer::{FixContext, NodeFix, NodeFixer};
use crate::report::{Diagnostic, ErrorReport};
use crate::typer::Typer;

/// Outcome of one pass (or of a fixpoint run).
#[derive(Debug, Default)]
pub struct FixReport {
    /// Whether the pass rewired at least one edge to a new replacement.
    pub progress: bool,
    /// Diagnostics collected during the pass. Non-empty means the pipeline
    /// must stop once it inspects the report.
    pub errors: ErrorReport,
}

/// A diagnostic factory: called for an edge whose input was judged
/// unrepairable, to materialize the user-facing error. Returning `None`
/// still marks the node reported but surfaces nothing.
pub type DiagnosticFactory<'a> =
    dyn FnMut(&mut FixContext<'_>, NodeId, u16) -> Option<Diagnostic> + 'a;

/// The capability interface the traversal consumes. Both extension styles
/// adapt to this.
pub trait PassPolicy {
    /// Verdict for one node, encountered as somebody's input.
    fn fix_node(&mut self, cx: &mut FixContext<'_>, node: NodeId) -> NodeFix;

    /// Materialize the diagnostic for an unrepairable input of `consumer`
    /// at `slot`.
    fn diagnose(
        &mut self,
        cx: &mut FixContext<'_>,
        consumer: NodeId,
        slot: u16,
    ) -> Option<Diagnostic>;
}

/// The single traversal. See the module docs for the algorithm; the
/// replacement map and reported set live exactly as long as this call.
pub fn drive(
    graph: &mut DataGraph,
    typer: &mut dyn Typer,
    policy: &mut dyn PassPolicy,
) -> Result<FixReport, CoreError> {
    let mut errors = ErrorReport::new();
    let mut replacements: HashMap<NodeId, NodeId> = HashMap::new();
    let mut reported: HashSet<NodeId> = HashSet::new();
    let order = graph.ancestors_first();
    let mut progress = false;

    for node in order {
        let mut node_was_updated = false;
        let input_count = graph.input_count(node) as u16;
        for slot in 0..input_count {
            let Some(child) = graph.input(node, slot) else {
                continue;
            };
            // Already diagnosed as unrepairable? Leave the edge alone.
            if reported.contains(&child) {
                continue;
            }
            // Already resolved? Reuse the memoized replacement without
            // consulting the policy again.
            if let Some(&cached) = replacements.get(&child) {
                if graph.input(node, slot) != Some(cached) {
                    graph.set_input(node, slot, cached)?;
                    node_was_updated = true;
                }
                continue;
            }

            let verdict = {
                let mut cx = FixContext {
                    graph: &mut *graph,
                    typer: &mut *typer,
                };
                policy.fix_node(&mut cx, child)
            };

            match verdict {
                NodeFix::Inapplicable => {}
                NodeFix::Unchanged => {
                    // The node is already correct; memoize the identity so
                    // other consumers skip the policy entirely.
                    replacements.insert(child, child);
                }
                NodeFix::Replacement(replacement) => {
                    replacements.insert(child, replacement);
                    if graph.input(node, slot) != Some(replacement) {
                        graph.set_input(node, slot, replacement)?;
                        node_was_updated = true;
                        progress = true;
                    }
                }
                NodeFix::Fatal => {
                    reported.insert(child);
                    let mut cx = FixContext {
                        graph: &mut *graph,
                        typer: &mut *typer,
                    };
                    if let Some(diagnostic) = policy.diagnose(&mut cx, node, slot) {
                        errors.add_error(diagnostic);
                    }
                }
            }
        }
        if node_was_updated {
            typer.update_type(graph, node);
        }
    }

    Ok(FixReport { progress, errors })
}

// ---------------------------------------------------------------------------
// Functional front-end
// ---------------------------------------------------------------------------

struct FixerPolicy<'a, 'b> {
    fixer: &'a mut dyn NodeFixer,
    get_error: Option<&'a mut DiagnosticFactory<'b>>,
}

impl PassPolicy for FixerPolicy<'_, '_> {
    fn fix_node(&mut self, cx: &mut FixContext<'_>, node: NodeId) -> NodeFix {
        self.fixer.fix(cx, node)
    }

    fn diagnose(
        &mut self,
        cx: &mut FixContext<'_>,
        consumer: NodeId,
        slot: u16,
    ) -> Option<Diagnostic> {
        self.get_error.as_mut().and_then(|f| f(cx, consumer, slot))
    }
}

/// Runs one ancestors-first pass of `fixer` over the whole graph.
///
/// `get_error` is consulted once per unrepairable node, on the first edge
/// that discovered it; pass `None` to record unrepairable nodes without
/// surfacing diagnostics.
pub fn fix_ancestors_first(
    graph: &mut DataGraph,
    typer: &mut dyn Typer,
    fixer: &mut dyn NodeFixer,
    get_error: Option<&mut DiagnosticFactory<'_>>,
) -> Result<FixReport, CoreError> {
    let mut policy = FixerPolicy { fixer, get_error };
    drive(graph, typer, &mut policy)
}

// ---------------------------------------------------------------------------
// Template-method front-end
// ---------------------------------------------------------------------------

/// The overridable-operations style of writing a fixing policy, kept so
/// existing pass implementations can migrate to plain node fixers one at a
/// time. Not a second algorithm: an adapter maps it onto the same traversal.
pub trait ProblemFixer {
    /// Does this node violate the target's constraints?
    fn needs_fixing(&mut self, cx: &mut FixContext<'_>, node: NodeId) -> bool;

    /// The substitute for a node that needs fixing. `None` means the node is
    /// unrepairable. Called only when [`ProblemFixer::needs_fixing`]
    /// returned `true`.
    fn replacement(&mut self, cx: &mut FixContext<'_>, node: NodeId) -> Option<NodeId>;

    /// Materialize the diagnostic for an unrepairable input of `consumer`.
    /// Defaults to no diagnostic.
    fn diagnose(
        &mut self,
        cx: &mut FixContext<'_>,
        consumer: NodeId,
        slot: u16,
    ) -> Option<Diagnostic> {
        let _ = (cx, consumer, slot);
        None
    }
}

struct TemplatePolicy<'a>(&'a mut dyn ProblemFixer);

impl PassPolicy for TemplatePolicy<'_> {
    fn fix_node(&mut self, cx: &mut FixContext<'_>, node: NodeId) -> NodeFix {
        if !self.0.needs_fixing(cx, node) {
            return NodeFix::Unchanged;
        }
        match self.0.replacement(cx, node) {
            Some(replacement) => NodeFix::Replacement(replacement),
            None => NodeFix::Fatal,
        }
    }

    fn diagnose(
        &mut self,
        cx: &mut FixContext<'_>,
        consumer: NodeId,
        slot: u16,
    ) -> Option<Diagnostic> {
        self.0.diagnose(cx, consumer, slot)
    }
}

/// Runs one ancestors-first pass of a [`ProblemFixer`] policy.
///
/// Observably identical to [`fix_ancestors_first`] with the equivalent
/// functional fixer.
pub fn fix_problems(
    graph: &mut DataGraph,
    typer: &mut dyn Typer,
    policy: &mut dyn ProblemFixer,
) -> Result<FixReport, CoreError> {
    drive(graph, typer, &mut TemplatePolicy(policy))
}

// ---------------------------------------------------------------------------
// Fixpoint
// ---------------------------------------------------------------------------

/// Reruns the pass until it stops making progress, reports an error, or
/// `max_passes` is reached. Returns the last pass's report, so a `false`
/// progress flag means the graph converged and a `true` one means the cap
/// cut a still-progressing policy short.
pub fn run_to_fixpoint(
    graph: &mut DataGraph,
    typer: &mut dyn Typer,
    fixer: &mut dyn NodeFixer,
    mut get_error: Option<&mut DiagnosticFactory<'_>>,
    max_passes: usize,
) -> Result<FixReport, CoreError> {
    let mut last = FixReport::default();
    for _ in 0..max_passes {
        let factory = get_error.as_mut().map(|f| &mut **f);
        let report = fix_ancestors_first(graph, typer, fixer, factory)?;
        let done = !report.progress || !report.errors.is_empty();
        last = report;
        if done {
            break;
        }
    }
    Ok(last)
}
