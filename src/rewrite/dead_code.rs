//! Dead-code elimination.
//!
//! Removes branches guarded by known-falsy literal tests, loops that can
//! never run, statements behind an unconditional terminator, and empty
//! blocks in statement position (function bodies excepted).

use crate::ast::{Node, NodeKind, ParentChain, Slot, Tag, VisitAction};
use crate::context::ProcessingContext;
use crate::error::Result;
use crate::rewrite::Rewriter;

pub struct DeadCodeElimination;

impl Rewriter for DeadCodeElimination {
    fn name(&self) -> &'static str {
        "dead-code"
    }

    fn rewrite(
        &self,
        node: &mut Node,
        _ctx: &mut ProcessingContext,
        chain: &ParentChain,
    ) -> Result<VisitAction> {
        match &mut node.kind {
            NodeKind::If {
                test,
                consequent,
                alternate,
            } => {
                let Some(truthy) = known_test(test) else {
                    return Ok(VisitAction::unchanged());
                };
                if truthy {
                    let taken = std::mem::replace(&mut **consequent, Node::empty_stmt());
                    Ok(branch_action(taken, chain))
                } else if let Some(alt) = alternate.take() {
                    Ok(branch_action(*alt, chain))
                } else {
                    Ok(VisitAction::remove())
                }
            }
            NodeKind::While { test, .. } => {
                if known_test(test) == Some(false) {
                    Ok(VisitAction::remove())
                } else {
                    Ok(VisitAction::unchanged())
                }
            }
            NodeKind::For { init, test, .. } => {
                let dead = test.as_deref().and_then(|t| known_test(t)) == Some(false);
                if !dead {
                    return Ok(VisitAction::unchanged());
                }
                match init.take() {
                    None => Ok(VisitAction::remove()),
                    Some(init) => match init.kind {
                        // `for (var i = …; false; )` keeps its declarations.
                        NodeKind::VariableDecl { .. } => Ok(VisitAction::replace(*init)),
                        _ if init.is_literal() => Ok(VisitAction::remove()),
                        _ => Ok(VisitAction::replace(Node::expression_stmt(*init))),
                    },
                }
            }
            NodeKind::Block { body } => {
                let changed = truncate_after_terminator(body);
                if body.is_empty() && collapsible_block_position(chain) {
                    return Ok(VisitAction::remove());
                }
                Ok(if changed {
                    VisitAction::changed()
                } else {
                    VisitAction::unchanged()
                })
            }
            NodeKind::Program { body } => {
                let changed = truncate_after_terminator(body);
                Ok(if changed {
                    VisitAction::changed()
                } else {
                    VisitAction::unchanged()
                })
            }
            _ => Ok(VisitAction::unchanged()),
        }
    }
}

/// Statically known truthiness of a test expression.
fn known_test(test: &Node) -> Option<bool> {
    test.truthiness()
}

/// Install the surviving branch of a dead `if`. In sibling position its
/// block's statements splice straight into the parent list, which is
/// what lets a collapsed branch settle into plain statements; anywhere
/// else (or when the block carries block-scoped bindings) the branch is
/// installed as-is.
fn branch_action(mut branch: Node, chain: &ParentChain) -> VisitAction {
    let collapse = chain.in_list_slot()
        && matches!(&branch.kind, NodeKind::Block { body } if !body.iter().any(has_lexical_binding));
    if collapse {
        if let NodeKind::Block { body } = &mut branch.kind {
            if body.is_empty() {
                return VisitAction::remove();
            }
            return VisitAction::splice(std::mem::take(body));
        }
    }
    VisitAction::replace(branch)
}

/// Drop statements behind `return`/`throw`/`break`/`continue`.
fn truncate_after_terminator(body: &mut Vec<Node>) -> bool {
    if let Some(pos) = body.iter().position(Node::is_terminator) {
        if pos + 1 < body.len() {
            body.truncate(pos + 1);
            return true;
        }
    }
    false
}

/// Empty blocks collapse only in statement-list position; a block that
/// is a function or method body stays.
fn collapsible_block_position(chain: &ParentChain) -> bool {
    chain.parent().is_some_and(|f| {
        f.index.is_some() && f.slot == Slot::Body && matches!(f.tag, Tag::Block | Tag::Program)
    })
}

/// `let`/`const`/`class` are scoped to their block; flattening would
/// widen them.
fn has_lexical_binding(stmt: &Node) -> bool {
    matches!(
        &stmt.kind,
        NodeKind::VariableDecl {
            kind: crate::ast::DeclKind::Let | crate::ast::DeclKind::Const,
            ..
        } | NodeKind::ClassDecl { .. }
    )
}
