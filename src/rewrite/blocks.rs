//! Control-flow normalisation.
//!
//! Minifiers strip the braces from single-statement branches; this
//! rewriter puts them back so every branch slot holds a block. `else if`
//! chains are left alone: an `IfStatement` in the alternate slot is the
//! readable form.

use crate::ast::{Node, NodeKind, ParentChain, VisitAction};
use crate::context::ProcessingContext;
use crate::error::Result;
use crate::rewrite::Rewriter;

pub struct BlockWrap;

fn wrap_slot(slot: &mut Box<Node>) -> bool {
    if matches!(slot.kind, NodeKind::Block { .. }) {
        return false;
    }
    let stmt = std::mem::replace(&mut **slot, Node::empty_stmt());
    **slot = Node::wrap_in_block(stmt);
    true
}

impl Rewriter for BlockWrap {
    fn name(&self) -> &'static str {
        "wrap-blocks"
    }

    fn rewrite(
        &self,
        node: &mut Node,
        _ctx: &mut ProcessingContext,
        _chain: &ParentChain,
    ) -> Result<VisitAction> {
        let mut changed = false;
        match &mut node.kind {
            NodeKind::If {
                consequent,
                alternate,
                ..
            } => {
                changed |= wrap_slot(consequent);
                if let Some(alt) = alternate {
                    // `else if` stays a chain.
                    if !matches!(alt.kind, NodeKind::If { .. }) {
                        changed |= wrap_slot(alt);
                    }
                }
            }
            NodeKind::For { body, .. }
            | NodeKind::ForIn { body, .. }
            | NodeKind::ForOf { body, .. }
            | NodeKind::While { body, .. }
            | NodeKind::DoWhile { body, .. }
            | NodeKind::Labeled { body, .. } => {
                changed |= wrap_slot(body);
            }
            _ => {}
        }
        Ok(if changed {
            VisitAction::changed()
        } else {
            VisitAction::unchanged()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::walk_bottom_up;
    use crate::context::Options;

    fn run(tree: &mut Node) {
        let mut ctx = ProcessingContext::new("test.js", Options::default());
        walk_bottom_up(tree, &mut |node, chain| {
            BlockWrap
                .rewrite(node, &mut ctx, chain)
                .unwrap_or_else(|_| VisitAction::unchanged())
        });
    }

    fn call_stmt(name: &str) -> Node {
        Node::expression_stmt(Node::new(NodeKind::Call {
            callee: Box::new(Node::ident(name)),
            arguments: Vec::new(),
            optional: false,
        }))
    }

    #[test]
    fn test_single_statement_consequent_wrapped() {
        let mut tree = Node::new(NodeKind::Program {
            body: vec![Node::new(NodeKind::If {
                test: Box::new(Node::ident("c")),
                consequent: Box::new(call_stmt("a")),
                alternate: Some(Box::new(call_stmt("b"))),
            })],
        });
        run(&mut tree);
        match &tree.kind {
            NodeKind::Program { body } => match &body[0].kind {
                NodeKind::If {
                    consequent,
                    alternate,
                    ..
                } => {
                    assert!(matches!(consequent.kind, NodeKind::Block { .. }));
                    assert!(matches!(
                        alternate.as_ref().unwrap().kind,
                        NodeKind::Block { .. }
                    ));
                }
                other => panic!("expected if, got {other:?}"),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_else_if_chain_preserved() {
        let mut tree = Node::new(NodeKind::Program {
            body: vec![Node::new(NodeKind::If {
                test: Box::new(Node::ident("a")),
                consequent: Box::new(Node::block(Vec::new())),
                alternate: Some(Box::new(Node::new(NodeKind::If {
                    test: Box::new(Node::ident("b")),
                    consequent: Box::new(Node::block(Vec::new())),
                    alternate: None,
                }))),
            })],
        });
        run(&mut tree);
        match &tree.kind {
            NodeKind::Program { body } => match &body[0].kind {
                NodeKind::If { alternate, .. } => {
                    assert!(matches!(
                        alternate.as_ref().unwrap().kind,
                        NodeKind::If { .. }
                    ));
                }
                other => panic!("expected if, got {other:?}"),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_loop_bodies_wrapped() {
        let mut tree = Node::new(NodeKind::Program {
            body: vec![Node::new(NodeKind::While {
                test: Box::new(Node::ident("c")),
                body: Box::new(call_stmt("a")),
            })],
        });
        run(&mut tree);
        match &tree.kind {
            NodeKind::Program { body } => match &body[0].kind {
                NodeKind::While { body, .. } => {
                    assert!(matches!(body.kind, NodeKind::Block { .. }));
                }
                other => panic!("expected while, got {other:?}"),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_already_blocked_is_stable() {
        let mut tree = Node::new(NodeKind::Program {
            body: vec![Node::new(NodeKind::While {
                test: Box::new(Node::ident("c")),
                body: Box::new(Node::block(vec![call_stmt("a")])),
            })],
        });
        let mut ctx = ProcessingContext::new("test.js", Options::default());
        let outcome = walk_bottom_up(&mut tree, &mut |node, chain| {
            BlockWrap
                .rewrite(node, &mut ctx, chain)
                .unwrap_or_else(|_| VisitAction::unchanged())
        });
        assert!(!outcome.changed);
    }
}
