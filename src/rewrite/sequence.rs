//! Sequence-expression lifting and bare-logical recovery.
//!
//! Comma chains are an obfuscator staple: whole statement groups get
//! packed into one `(a, b, c)` expression. This rewriter expands them
//! back into sibling statements, hoists non-terminal expressions out of
//! `return`/`if`-test/`for`-init positions, and rewrites bare `&&`/`||`
//! and ternary expression statements into `if` form.

use crate::ast::{LogicalOp, Node, NodeKind, ParentChain, UnaryOp, VisitAction};
use crate::context::ProcessingContext;
use crate::error::Result;
use crate::rewrite::Rewriter;

pub struct SequenceLift;

impl Rewriter for SequenceLift {
    fn name(&self) -> &'static str {
        "lift-sequences"
    }

    fn rewrite(
        &self,
        node: &mut Node,
        _ctx: &mut ProcessingContext,
        chain: &ParentChain,
    ) -> Result<VisitAction> {
        // The in-place statement rewrites first; they work in any slot.
        if let Some(kind) = bare_logical_to_if(node) {
            node.kind = kind;
            return Ok(VisitAction::changed());
        }

        // The splicing rewrites need sibling position.
        if !chain.in_list_slot() {
            return Ok(VisitAction::unchanged());
        }

        match &mut node.kind {
            NodeKind::ExpressionStmt { expression } => {
                if let NodeKind::Sequence { expressions } = &mut expression.kind {
                    let exprs = std::mem::take(expressions);
                    return Ok(VisitAction::splice(
                        exprs.into_iter().map(Node::expression_stmt).collect(),
                    ));
                }
                Ok(VisitAction::unchanged())
            }
            NodeKind::Return {
                argument: Some(argument),
            } => {
                if let NodeKind::Sequence { expressions } = &mut argument.kind {
                    let mut exprs = std::mem::take(expressions);
                    let Some(last) = exprs.pop() else {
                        return Ok(VisitAction::unchanged());
                    };
                    let mut stmts: Vec<Node> =
                        exprs.into_iter().map(Node::expression_stmt).collect();
                    stmts.push(Node::new(NodeKind::Return {
                        argument: Some(Box::new(last)),
                    }));
                    return Ok(VisitAction::splice(stmts));
                }
                Ok(VisitAction::unchanged())
            }
            NodeKind::If {
                test,
                consequent,
                alternate,
            } => {
                if let NodeKind::Sequence { expressions } = &mut test.kind {
                    let mut exprs = std::mem::take(expressions);
                    let Some(last) = exprs.pop() else {
                        return Ok(VisitAction::unchanged());
                    };
                    let consequent = std::mem::replace(&mut **consequent, Node::empty_stmt());
                    let alternate = alternate.take();
                    let mut stmts: Vec<Node> =
                        exprs.into_iter().map(Node::expression_stmt).collect();
                    stmts.push(Node::new(NodeKind::If {
                        test: Box::new(last),
                        consequent: Box::new(consequent),
                        alternate,
                    }));
                    return Ok(VisitAction::splice(stmts));
                }
                Ok(VisitAction::unchanged())
            }
            NodeKind::For {
                init,
                test,
                update,
                body,
            } => {
                let is_seq = init
                    .as_deref()
                    .is_some_and(|i| matches!(i.kind, NodeKind::Sequence { .. }));
                if !is_seq {
                    return Ok(VisitAction::unchanged());
                }
                let Some(taken) = init.take() else {
                    return Ok(VisitAction::unchanged());
                };
                let NodeKind::Sequence { expressions } = taken.kind else {
                    return Ok(VisitAction::unchanged());
                };
                let mut exprs = expressions;
                let last = exprs.pop();
                let mut stmts: Vec<Node> = exprs.into_iter().map(Node::expression_stmt).collect();
                stmts.push(Node::new(NodeKind::For {
                    init: last.map(Box::new),
                    test: test.take(),
                    update: update.take(),
                    body: Box::new(std::mem::replace(&mut **body, Node::empty_stmt())),
                }));
                Ok(VisitAction::splice(stmts))
            }
            _ => Ok(VisitAction::unchanged()),
        }
    }
}

/// `LHS && RHS;` becomes `if (LHS) { RHS }`, `LHS || RHS;` becomes
/// `if (!LHS) { RHS }`, and a bare ternary becomes `if`/`else`.
fn bare_logical_to_if(node: &mut Node) -> Option<NodeKind> {
    let NodeKind::ExpressionStmt { expression } = &mut node.kind else {
        return None;
    };
    match &mut expression.kind {
        NodeKind::Logical { op, left, right } if matches!(op, LogicalOp::And | LogicalOp::Or) => {
            let left = std::mem::replace(&mut **left, Node::empty_stmt());
            let right = std::mem::replace(&mut **right, Node::empty_stmt());
            let test = match op {
                LogicalOp::And => left,
                _ => Node::unary(UnaryOp::Not, left),
            };
            Some(NodeKind::If {
                test: Box::new(test),
                consequent: Box::new(Node::block(vec![Node::expression_stmt(right)])),
                alternate: None,
            })
        }
        NodeKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            let test = std::mem::replace(&mut **test, Node::empty_stmt());
            let consequent = std::mem::replace(&mut **consequent, Node::empty_stmt());
            let alternate = std::mem::replace(&mut **alternate, Node::empty_stmt());
            Some(NodeKind::If {
                test: Box::new(test),
                consequent: Box::new(Node::block(vec![Node::expression_stmt(consequent)])),
                alternate: Some(Box::new(Node::block(vec![Node::expression_stmt(
                    alternate,
                )]))),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::walk_bottom_up;
    use crate::context::Options;

    fn run(tree: &mut Node) {
        let mut ctx = ProcessingContext::new("test.js", Options::default());
        for _ in 0..5 {
            let outcome = walk_bottom_up(tree, &mut |node, chain| {
                SequenceLift
                    .rewrite(node, &mut ctx, chain)
                    .unwrap_or_else(|_| VisitAction::unchanged())
            });
            if !outcome.changed {
                break;
            }
        }
    }

    fn assign(name: &str, value: f64) -> Node {
        Node::new(NodeKind::Assignment {
            op: crate::ast::AssignOp::Assign,
            left: Box::new(Node::ident(name)),
            right: Box::new(Node::number(value)),
        })
    }

    fn program_body(tree: &Node) -> &[Node] {
        match &tree.kind {
            NodeKind::Program { body } => body,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_sequence_statement_expands_to_siblings() {
        let mut tree = Node::new(NodeKind::Program {
            body: vec![Node::expression_stmt(Node::new(NodeKind::Sequence {
                expressions: vec![assign("a", 1.0), assign("b", 2.0), assign("c", 3.0)],
            }))],
        });
        run(&mut tree);
        let body = program_body(&tree);
        assert_eq!(body.len(), 3);
        assert!(body
            .iter()
            .all(|s| matches!(s.kind, NodeKind::ExpressionStmt { .. })));
    }

    #[test]
    fn test_return_sequence_hoists_prefix() {
        let mut tree = Node::new(NodeKind::Program {
            body: vec![Node::new(NodeKind::Return {
                argument: Some(Box::new(Node::new(NodeKind::Sequence {
                    expressions: vec![assign("a", 1.0), Node::ident("result")],
                }))),
            })],
        });
        run(&mut tree);
        let body = program_body(&tree);
        assert_eq!(body.len(), 2);
        assert!(matches!(body[0].kind, NodeKind::ExpressionStmt { .. }));
        match &body[1].kind {
            NodeKind::Return {
                argument: Some(arg),
            } => assert_eq!(arg.ident_name(), Some("result")),
            other => panic!("expected return, got {other:?}"),
        }
    }

    #[test]
    fn test_if_test_sequence_hoists_prefix() {
        let mut tree = Node::new(NodeKind::Program {
            body: vec![Node::new(NodeKind::If {
                test: Box::new(Node::new(NodeKind::Sequence {
                    expressions: vec![assign("a", 1.0), Node::ident("cond")],
                })),
                consequent: Box::new(Node::block(Vec::new())),
                alternate: None,
            })],
        });
        run(&mut tree);
        let body = program_body(&tree);
        assert_eq!(body.len(), 2);
        match &body[1].kind {
            NodeKind::If { test, .. } => assert_eq!(test.ident_name(), Some("cond")),
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn test_bare_and_becomes_if() {
        let mut tree = Node::new(NodeKind::Program {
            body: vec![Node::expression_stmt(Node::new(NodeKind::Logical {
                op: LogicalOp::And,
                left: Box::new(Node::ident("guard")),
                right: Box::new(assign("a", 1.0)),
            }))],
        });
        run(&mut tree);
        match &program_body(&tree)[0].kind {
            NodeKind::If {
                test, alternate, ..
            } => {
                assert_eq!(test.ident_name(), Some("guard"));
                assert!(alternate.is_none());
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn test_bare_or_negates_test() {
        let mut tree = Node::new(NodeKind::Program {
            body: vec![Node::expression_stmt(Node::new(NodeKind::Logical {
                op: LogicalOp::Or,
                left: Box::new(Node::ident("present")),
                right: Box::new(assign("a", 1.0)),
            }))],
        });
        run(&mut tree);
        match &program_body(&tree)[0].kind {
            NodeKind::If { test, .. } => {
                assert!(matches!(
                    test.kind,
                    NodeKind::Unary {
                        op: UnaryOp::Not,
                        ..
                    }
                ));
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn test_bare_ternary_becomes_if_else() {
        let mut tree = Node::new(NodeKind::Program {
            body: vec![Node::expression_stmt(Node::new(NodeKind::Conditional {
                test: Box::new(Node::ident("cond")),
                consequent: Box::new(assign("a", 1.0)),
                alternate: Box::new(assign("b", 2.0)),
            }))],
        });
        run(&mut tree);
        match &program_body(&tree)[0].kind {
            NodeKind::If { alternate, .. } => assert!(alternate.is_some()),
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_sequence_not_lifted_from_expression_position() {
        // `x = (a, b)` keeps its sequence: there is no sibling position.
        let mut tree = Node::new(NodeKind::Program {
            body: vec![Node::expression_stmt(Node::new(NodeKind::Assignment {
                op: crate::ast::AssignOp::Assign,
                left: Box::new(Node::ident("x")),
                right: Box::new(Node::new(NodeKind::Sequence {
                    expressions: vec![Node::ident("a"), Node::ident("b")],
                })),
            }))],
        });
        run(&mut tree);
        assert_eq!(program_body(&tree).len(), 1);
    }
}
