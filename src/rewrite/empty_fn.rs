//! Empty-function handling.
//!
//! Dead-code injection leaves behind functions that do nothing, plus
//! thin wrappers that only call one of them. The main-loop rewriter
//! collapses the wrappers; the post-pass prunes declarations that ended
//! up empty and are never called.

use crate::ast::{Node, NodeKind, ParentChain, VisitAction};
use crate::context::ProcessingContext;
use crate::error::Result;
use crate::rewrite::prepare::body_is_empty;
use crate::rewrite::Rewriter;

/// Name of the single function called by a one-statement body, when the
/// body has that shape.
fn sole_callee(body: &[Node]) -> Option<&str> {
    let [stmt] = body else {
        return None;
    };
    let expr = match &stmt.kind {
        NodeKind::ExpressionStmt { expression } => expression,
        NodeKind::Return {
            argument: Some(argument),
        } => argument,
        _ => return None,
    };
    match &expr.kind {
        NodeKind::Call { callee, .. } => callee.ident_name(),
        _ => None,
    }
}

/// Collapses a function whose body is a single call to a known empty
/// function into an empty function itself.
pub struct EmptyFunctionSimplify;

impl Rewriter for EmptyFunctionSimplify {
    fn name(&self) -> &'static str {
        "simplify-empty-functions"
    }

    fn rewrite(
        &self,
        node: &mut Node,
        ctx: &mut ProcessingContext,
        _chain: &ParentChain,
    ) -> Result<VisitAction> {
        let name = {
            let NodeKind::FunctionDecl {
                id: Some(id), body, ..
            } = &node.kind
            else {
                return Ok(VisitAction::unchanged());
            };
            let Some(name) = id.ident_name() else {
                return Ok(VisitAction::unchanged());
            };
            let NodeKind::Block { body } = &body.kind else {
                return Ok(VisitAction::unchanged());
            };
            let Some(callee) = sole_callee(body) else {
                return Ok(VisitAction::unchanged());
            };
            if !ctx.functions.get(callee).is_some_and(|f| f.is_empty) {
                return Ok(VisitAction::unchanged());
            }
            name.to_string()
        };

        if let NodeKind::FunctionDecl { body, .. } = &mut node.kind {
            if let NodeKind::Block { body } = &mut body.kind {
                body.clear();
            }
        }
        if let Some(info) = ctx.functions.get_mut(&name) {
            info.is_empty = true;
        }
        Ok(VisitAction::changed())
    }
}

/// Post-pass: removes function declarations that are empty and were
/// never called, keeping the functions table in step.
pub struct PruneEmptyFunctions;

impl Rewriter for PruneEmptyFunctions {
    fn name(&self) -> &'static str {
        "prune-empty-functions"
    }

    fn rewrite(
        &self,
        node: &mut Node,
        ctx: &mut ProcessingContext,
        chain: &ParentChain,
    ) -> Result<VisitAction> {
        if !chain.in_list_slot() {
            return Ok(VisitAction::unchanged());
        }
        let NodeKind::FunctionDecl { id: Some(id), .. } = &node.kind else {
            return Ok(VisitAction::unchanged());
        };
        let Some(name) = id.ident_name() else {
            return Ok(VisitAction::unchanged());
        };
        let empty = body_is_empty(node) || ctx.functions.get(name).is_some_and(|f| f.is_empty);
        let called = ctx.functions.get(name).is_some_and(|f| f.call_count > 0);
        if empty && !called {
            ctx.functions.remove(name);
            return Ok(VisitAction::remove());
        }
        Ok(VisitAction::unchanged())
    }
}
