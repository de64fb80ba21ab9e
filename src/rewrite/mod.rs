//! The rewriter kernel and fixpoint pipeline.
//!
//! Every rewriter is a stateless unit: it looks at one node (plus the
//! parent chain and the run context) and reports whether it changed
//! anything, optionally requesting a structural edit. The pipeline runs
//! pre-passes once, then sweeps the main pass list until a full sweep
//! reports no changes or a bound is hit, then runs post-passes.
//!
//! A failure inside a single node's rewrite never aborts the pass: it is
//! logged (under verbose) and the pass continues on siblings.

mod accessor;
mod blocks;
mod booleans;
mod dead_code;
mod empty_fn;
mod fold;
mod prepare;
mod properties;
mod rename;
mod sequence;
mod strings;

pub use accessor::AccessorInline;
pub use blocks::BlockWrap;
pub use booleans::BooleanRecovery;
pub use dead_code::DeadCodeElimination;
pub use empty_fn::{EmptyFunctionSimplify, PruneEmptyFunctions};
pub use fold::{js_number_to_string, ConstantFold};
pub use prepare::{CountCalls, CreateScopes, RegisterFunctions, StripLocations};
pub use properties::PropertySimplify;
pub use rename::ApplyRenames;
pub use sequence::SequenceLift;
pub use strings::{decode_string_escapes, has_obfuscated_escapes, StringDecode};

use std::collections::BTreeMap;
use std::time::Instant;

use crate::ast::{walk_bottom_up, walk_top_down, Node, ParentChain, VisitAction};
use crate::context::{Phase, ProcessingContext};
use crate::error::Result;
use crate::unpack::BundleUnpack;

/// A single tree rewriter.
///
/// Rewriters never retain state across invocations; everything they need
/// lives in the tree and the context.
pub trait Rewriter {
    /// Stable pass name, used in change accounting and diagnostics.
    fn name(&self) -> &'static str;

    /// Inspect `node` and possibly mutate it in place or request an
    /// edit. Returning `changed = true` re-arms the fixpoint.
    fn rewrite(
        &self,
        node: &mut Node,
        ctx: &mut ProcessingContext,
        chain: &ParentChain,
    ) -> Result<VisitAction>;
}

/// Walk order of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOrder {
    /// Pre-order; for symbol construction and structural recognition
    /// that must see outer context intact.
    TopDown,
    /// Post-order; for rewrites whose premise is "children are already
    /// simplified".
    BottomUp,
}

/// An ordered group of rewriters sharing one walk.
///
/// Rewriters run in the order given; each sees the node as modified by
/// the rewriters before it.
pub struct Pass {
    pub name: &'static str,
    pub order: PassOrder,
    pub rewriters: Vec<Box<dyn Rewriter>>,
}

impl Pass {
    pub fn top_down(name: &'static str, rewriters: Vec<Box<dyn Rewriter>>) -> Self {
        Self {
            name,
            order: PassOrder::TopDown,
            rewriters,
        }
    }

    pub fn bottom_up(name: &'static str, rewriters: Vec<Box<dyn Rewriter>>) -> Self {
        Self {
            name,
            order: PassOrder::BottomUp,
            rewriters,
        }
    }
}

/// What one pipeline run did.
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// Fixpoint sweeps executed.
    pub iterations: usize,
    /// True when the loop ended because a sweep made no changes.
    pub converged: bool,
    /// True when the wall-clock bound fired between passes.
    pub timed_out: bool,
    /// Per-rewriter change counts, accumulated over all sweeps.
    pub changes: BTreeMap<&'static str, usize>,
    /// Identifier renames applied by the post-pass.
    pub renames_applied: usize,
}

impl PipelineReport {
    pub fn total_changes(&self) -> usize {
        self.changes.values().sum()
    }
}

/// The full pre/fixpoint/post orchestration for one tree.
pub struct Pipeline {
    pre: Vec<Pass>,
    main: Vec<Pass>,
}

impl Pipeline {
    /// The standard pass order.
    ///
    /// Pre-passes, one sweep each: strip locations, create scopes and
    /// register declarations, count call sites, recover booleans,
    /// register function definitions.
    ///
    /// Main loop: bundle unpacking first (top-down, structural), then the
    /// folding-class rewriters (bottom-up). Boolean recovery rides in the
    /// main loop too so literals synthesized by other passes keep
    /// normalizing.
    pub fn standard(unpack: bool) -> Self {
        let mut main = Vec::new();
        if unpack {
            main.push(Pass::top_down("unpack", vec![Box::new(BundleUnpack::new()) as _]));
        }
        main.push(Pass::bottom_up(
            "simplify",
            vec![
                Box::new(StringDecode::new()) as _,
                Box::new(BooleanRecovery) as _,
                Box::new(ConstantFold) as _,
                Box::new(PropertySimplify::new()) as _,
                Box::new(AccessorInline) as _,
                Box::new(SequenceLift) as _,
                Box::new(DeadCodeElimination) as _,
                Box::new(BlockWrap) as _,
                Box::new(EmptyFunctionSimplify) as _,
            ],
        ));

        Self {
            pre: vec![
                Pass::top_down("strip-locations", vec![Box::new(StripLocations) as _]),
                Pass::top_down("create-scopes", vec![Box::new(CreateScopes) as _]),
                Pass::top_down("count-calls", vec![Box::new(CountCalls) as _]),
                Pass::top_down("recover-booleans", vec![Box::new(BooleanRecovery) as _]),
                Pass::top_down("register-functions", vec![Box::new(RegisterFunctions) as _]),
            ],
            main,
        }
    }

    /// Run the pre-passes only, once. Detectors that want the symbol
    /// model with the tree still unrewritten run between this and
    /// [`Pipeline::run`].
    pub fn prepare(&self, tree: &mut Node, ctx: &mut ProcessingContext) -> Result<()> {
        if ctx.phase != Phase::Initial {
            return Ok(());
        }
        let mut changes = BTreeMap::new();
        for pass in &self.pre {
            run_pass(pass, tree, ctx, &mut changes);
        }
        ctx.scopes.check_acyclic()?;
        ctx.phase = Phase::Prepared;
        Ok(())
    }

    /// Run pre-passes, the fixpoint loop, and post-passes on `tree`.
    pub fn run(&self, tree: &mut Node, ctx: &mut ProcessingContext) -> Result<PipelineReport> {
        let mut report = PipelineReport::default();
        let started = Instant::now();

        self.prepare(tree, ctx)?;

        if ctx.phase == Phase::Prepared {
            loop {
                if report.iterations >= ctx.options.max_iterations {
                    log::warn!(
                        "fixpoint did not converge after {} iterations; continuing with current tree",
                        report.iterations
                    );
                    break;
                }
                let mut sweep_changed = false;
                for pass in &self.main {
                    if started.elapsed() >= ctx.options.timeout {
                        log::warn!(
                            "fixpoint timed out after {:.1?}; continuing with current tree",
                            started.elapsed()
                        );
                        report.timed_out = true;
                        break;
                    }
                    sweep_changed |= run_pass(pass, tree, ctx, &mut report.changes);
                }
                report.iterations += 1;
                if report.timed_out {
                    break;
                }
                if !sweep_changed {
                    report.converged = true;
                    break;
                }
            }
            ctx.phase = Phase::Rewritten;
        }

        if ctx.phase == Phase::Rewritten {
            // The renamer may block on the network; it runs strictly
            // outside the fixpoint, and its failure skips the step.
            if ctx.options.rename {
                if let Some(renamer) = ctx.renamer.take() {
                    match renamer.suggest(tree, ctx) {
                        Ok(count) => {
                            if ctx.options.verbose {
                                log::info!("renamer produced {count} suggestions");
                            }
                        }
                        Err(e) => log::warn!("renamer failed, skipping: {e}"),
                    }
                    ctx.renamer = Some(renamer);
                }
            }

            let apply = Pass::top_down("apply-renames", vec![Box::new(ApplyRenames::new()) as _]);
            run_pass(&apply, tree, ctx, &mut report.changes);
            report.renames_applied = report.changes.get("apply-renames").copied().unwrap_or(0);

            let prune = Pass::top_down("prune-empty-functions", vec![Box::new(PruneEmptyFunctions) as _]);
            run_pass(&prune, tree, ctx, &mut report.changes);

            ctx.phase = Phase::Finalized;
        }

        Ok(report)
    }
}

/// One walk of one pass over the whole tree.
fn run_pass(
    pass: &Pass,
    tree: &mut Node,
    ctx: &mut ProcessingContext,
    counts: &mut BTreeMap<&'static str, usize>,
) -> bool {
    let mut visit = |node: &mut Node, chain: &ParentChain| -> VisitAction {
        let mut changed = false;
        for rewriter in &pass.rewriters {
            match rewriter.rewrite(node, ctx, chain) {
                Ok(action) => {
                    if action.changed {
                        *counts.entry(rewriter.name()).or_default() += 1;
                        changed = true;
                    }
                    if action.edit.is_some() {
                        // The node is being replaced; later rewriters see
                        // the replacement on the next sweep.
                        return VisitAction {
                            changed: true,
                            edit: action.edit,
                        };
                    }
                }
                Err(e) => {
                    if ctx.options.verbose {
                        log::info!(
                            "rewriter '{}' left {} node unchanged: {e}",
                            rewriter.name(),
                            node.kind_name()
                        );
                    }
                }
            }
        }
        VisitAction {
            changed,
            edit: None,
        }
    };

    let outcome = match pass.order {
        PassOrder::TopDown => walk_top_down(tree, &mut visit),
        PassOrder::BottomUp => walk_bottom_up(tree, &mut visit),
    };
    outcome.changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;
    use crate::context::Options;

    struct CountDown;

    impl Rewriter for CountDown {
        fn name(&self) -> &'static str {
            "count-down"
        }

        fn rewrite(
            &self,
            node: &mut Node,
            _ctx: &mut ProcessingContext,
            _chain: &ParentChain,
        ) -> Result<VisitAction> {
            if let Some(v) = node.number_value() {
                if v > 0.0 {
                    node.kind = NodeKind::Number {
                        value: v - 1.0,
                        raw: None,
                    };
                    return Ok(VisitAction::changed());
                }
            }
            Ok(VisitAction::unchanged())
        }
    }

    fn program(expr: Node) -> Node {
        Node::new(NodeKind::Program {
            body: vec![Node::expression_stmt(expr)],
        })
    }

    #[test]
    fn test_fixpoint_runs_until_quiescent() {
        let pipeline = Pipeline {
            pre: Vec::new(),
            main: vec![Pass::bottom_up("main", vec![Box::new(CountDown) as _])],
        };
        let mut tree = program(Node::number(3.0));
        let mut ctx = ProcessingContext::new("test.js", Options::default());
        ctx.phase = Phase::Prepared;

        let report = pipeline.run(&mut tree, &mut ctx).unwrap();
        assert!(report.converged);
        // Three changing sweeps plus the quiescent one.
        assert_eq!(report.iterations, 4);
        assert_eq!(report.changes.get("count-down"), Some(&3));
    }

    #[test]
    fn test_iteration_cap_stops_nonconverging_pass() {
        struct Flip;
        impl Rewriter for Flip {
            fn name(&self) -> &'static str {
                "flip"
            }
            fn rewrite(
                &self,
                node: &mut Node,
                _ctx: &mut ProcessingContext,
                _chain: &ParentChain,
            ) -> Result<VisitAction> {
                if let NodeKind::Bool { value } = &mut node.kind {
                    *value = !*value;
                    return Ok(VisitAction::changed());
                }
                Ok(VisitAction::unchanged())
            }
        }

        let pipeline = Pipeline {
            pre: Vec::new(),
            main: vec![Pass::bottom_up("main", vec![Box::new(Flip) as _])],
        };
        let mut tree = program(Node::bool(true));
        let mut ctx = ProcessingContext::new(
            "test.js",
            Options {
                max_iterations: 5,
                ..Options::default()
            },
        );
        ctx.phase = Phase::Prepared;

        let report = pipeline.run(&mut tree, &mut ctx).unwrap();
        assert!(!report.converged);
        assert_eq!(report.iterations, 5);
        // The tree is still valid after the cap.
        assert!(matches!(tree.kind, NodeKind::Program { .. }));
    }

    #[test]
    fn test_failing_rewriter_does_not_abort_pass() {
        struct Fails;
        impl Rewriter for Fails {
            fn name(&self) -> &'static str {
                "fails"
            }
            fn rewrite(
                &self,
                node: &mut Node,
                _ctx: &mut ProcessingContext,
                _chain: &ParentChain,
            ) -> Result<VisitAction> {
                if node.number_value().is_some() {
                    return Err(crate::error::UnweaveError::RewriteFailed {
                        pass: "fails",
                        kind: "NumericLiteral",
                        message: "boom".into(),
                    });
                }
                Ok(VisitAction::unchanged())
            }
        }

        let pipeline = Pipeline {
            pre: Vec::new(),
            main: vec![Pass::bottom_up(
                "main",
                vec![Box::new(Fails) as _, Box::new(CountDown) as _],
            )],
        };
        let mut tree = program(Node::number(1.0));
        let mut ctx = ProcessingContext::new("test.js", Options::default());
        ctx.phase = Phase::Prepared;

        // The failure on the numeric literal is contained and the later
        // rewriter still runs.
        let report = pipeline.run(&mut tree, &mut ctx).unwrap();
        assert_eq!(report.changes.get("count-down"), Some(&1));
    }
}
