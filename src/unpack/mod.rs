//! Bundle unpacking.
//!
//! Recognises several generations of module-bundler output sitting at
//! program top level, extracts the contained modules into individual
//! source files with heuristic names, and replaces the bundle IIFE with
//! an empty statement so later sweeps never re-enter it. Wrapper-only
//! dialects (UMD, Closure namespaces, plain IIFEs) are unwrapped in
//! place instead.

mod emit;
mod naming;
mod webpack;
mod wrappers;

pub use emit::{write_unpacked, ExtractedModule, UnpackSummary};
pub use naming::{classify_module, ModuleName, NamePattern, NAME_PATTERNS};
pub use webpack::{detect as detect_bundle, modules_from_container, Dialect};
pub use wrappers::{detect as detect_wrapper, unwrap as unwrap_wrapper, Wrapper};

use crate::ast::{Node, NodeKind, ParentChain, Slot, Tag, VisitAction};
use crate::codegen;
use crate::context::ProcessingContext;
use crate::error::Result;
use crate::rewrite::Rewriter;

/// The unpacking rewriter: runs top-down so the bundle IIFE is seen with
/// its outer context intact.
#[derive(Default)]
pub struct BundleUnpack;

impl BundleUnpack {
    pub fn new() -> Self {
        Self
    }
}

/// True when the current statement sits directly in the program body.
fn at_program_level(chain: &ParentChain) -> bool {
    chain
        .parent()
        .is_some_and(|f| f.tag == Tag::Program && f.slot == Slot::Body && f.index.is_some())
}

impl Rewriter for BundleUnpack {
    fn name(&self) -> &'static str {
        "unpack-bundles"
    }

    fn rewrite(
        &self,
        node: &mut Node,
        ctx: &mut ProcessingContext,
        chain: &ParentChain,
    ) -> Result<VisitAction> {
        if !ctx.options.unpack || !at_program_level(chain) {
            return Ok(VisitAction::unchanged());
        }
        let NodeKind::ExpressionStmt { expression } = &node.kind else {
            return Ok(VisitAction::unchanged());
        };

        if let Some(dialect) = webpack::detect(expression) {
            // Take the statement apart; the empty statement left behind
            // keeps re-runs from matching again.
            let stmt = std::mem::replace(node, Node::empty_stmt());
            let NodeKind::ExpressionStmt { expression } = stmt.kind else {
                return Ok(VisitAction::changed());
            };
            let pairs = webpack::extract(*expression, dialect);
            if pairs.is_empty() {
                log::warn!("recognised {dialect:?} bundle but found no modules");
                return Ok(VisitAction::changed());
            }

            let modules: Vec<ExtractedModule> = pairs
                .into_iter()
                .map(|(id, func)| {
                    let naming = naming::classify_module(&func, &id);
                    let code = codegen::generate_snippet(&Node::expression_stmt(func));
                    ExtractedModule { id, code, naming }
                })
                .collect();

            let summary = emit::write_unpacked(ctx, modules)?;
            log::info!(
                "unpacked {} module(s) ({} suspicious) into {}",
                summary.module_count,
                summary.suspicious_count,
                summary.directory.display()
            );
            return Ok(VisitAction::changed());
        }

        if wrappers::detect(expression).is_some() {
            let stmt = std::mem::replace(node, Node::empty_stmt());
            let NodeKind::ExpressionStmt { expression } = stmt.kind else {
                return Ok(VisitAction::changed());
            };
            let stmts = wrappers::unwrap(*expression);
            if stmts.is_empty() {
                return Ok(VisitAction::changed());
            }
            return Ok(VisitAction::splice(stmts));
        }

        Ok(VisitAction::unchanged())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::walk_top_down;
    use crate::context::Options;
    use tempfile::TempDir;

    fn func_expr(params: Vec<&str>, body: Vec<Node>) -> Node {
        Node::new(NodeKind::FunctionExpr {
            id: None,
            params: params.into_iter().map(Node::ident).collect(),
            body: Box::new(Node::block(body)),
            is_async: false,
            is_generator: false,
        })
    }

    fn call(callee: Node, arguments: Vec<Node>) -> Node {
        Node::new(NodeKind::Call {
            callee: Box::new(callee),
            arguments,
            optional: false,
        })
    }

    fn run(tree: &mut Node, input: &std::path::Path) -> ProcessingContext {
        let mut ctx = ProcessingContext::new(input, Options::default());
        let unpack = BundleUnpack::new();
        walk_top_down(tree, &mut |node, chain| {
            unpack
                .rewrite(node, &mut ctx, chain)
                .unwrap_or_else(|_| VisitAction::unchanged())
        });
        ctx
    }

    #[test]
    fn test_simple_iife_unwrapped_at_top_level() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.js");
        std::fs::write(&input, "").unwrap();

        let mut tree = Node::new(NodeKind::Program {
            body: vec![Node::expression_stmt(call(
                func_expr(
                    Vec::new(),
                    vec![Node::expression_stmt(call(Node::ident("boot"), Vec::new()))],
                ),
                Vec::new(),
            ))],
        });
        run(&mut tree, &input);

        match &tree.kind {
            NodeKind::Program { body } => {
                assert_eq!(body.len(), 1);
                assert!(matches!(body[0].kind, NodeKind::ExpressionStmt { .. }));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_nested_iife_left_alone() {
        // The same IIFE inside a function body is not program level.
        let inner_iife = Node::expression_stmt(call(
            func_expr(
                Vec::new(),
                vec![Node::expression_stmt(call(Node::ident("boot"), Vec::new()))],
            ),
            Vec::new(),
        ));
        let mut tree = Node::new(NodeKind::Program {
            body: vec![Node::new(NodeKind::FunctionDecl {
                id: Some(Box::new(Node::ident("outer"))),
                params: Vec::new(),
                body: Box::new(Node::block(vec![inner_iife])),
                is_async: false,
                is_generator: false,
            })],
        });
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.js");
        std::fs::write(&input, "").unwrap();
        run(&mut tree, &input);

        match &tree.kind {
            NodeKind::Program { body } => match &body[0].kind {
                NodeKind::FunctionDecl { body, .. } => match &body.kind {
                    NodeKind::Block { body } => {
                        assert!(matches!(body[0].kind, NodeKind::ExpressionStmt { .. }));
                    }
                    _ => unreachable!(),
                },
                other => panic!("expected function decl, got {other:?}"),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_unpack_disabled_is_a_noop() {
        let mut tree = Node::new(NodeKind::Program {
            body: vec![Node::expression_stmt(call(
                func_expr(
                    Vec::new(),
                    vec![Node::expression_stmt(call(Node::ident("boot"), Vec::new()))],
                ),
                Vec::new(),
            ))],
        });
        let mut ctx = ProcessingContext::new(
            "in.js",
            Options {
                unpack: false,
                ..Options::default()
            },
        );
        let unpack = BundleUnpack::new();
        let outcome = walk_top_down(&mut tree, &mut |node, chain| {
            unpack
                .rewrite(node, &mut ctx, chain)
                .unwrap_or_else(|_| VisitAction::unchanged())
        });
        assert!(!outcome.changed);
    }
}
