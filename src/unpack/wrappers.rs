//! Unwrapping of UMD / AMD / Closure-style and plain IIFE wrappers.
//!
//! These dialects carry no modules container; the payload is the wrapper
//! body itself, hoisted into the enclosing program when the wrapper sits
//! directly at top level (possibly behind a single `!`).

use crate::ast::{Node, NodeKind, UnaryOp};
use crate::unpack::webpack::iife;

/// A wrapper dialect, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrapper {
    /// Two-parameter factory pattern mentioning `define.amd` and
    /// `exports`.
    Umd,
    /// Single-parameter namespace pattern with many `ns.x = …`
    /// assignments.
    Closure,
    /// Any small IIFE: at most two params and two arguments, non-empty
    /// body.
    Simple,
}

pub fn detect(expr: &Node) -> Option<Wrapper> {
    let shape = iife(expr)?;
    let params = shape.func.function_params()?;
    let body = shape.func.function_body()?;
    if body.is_empty() {
        return None;
    }

    if params.len() == 2 && mentions_define_amd(body) && mentions_exports(body) {
        return Some(Wrapper::Umd);
    }

    if params.len() == 1 {
        if let Some(ns) = params[0].ident_name() {
            if namespace_assignments(body, ns) >= 10 {
                return Some(Wrapper::Closure);
            }
        }
    }

    if params.len() <= 2 && shape.args.len() <= 2 {
        return Some(Wrapper::Simple);
    }

    None
}

fn mentions_define_amd(body: &[Node]) -> bool {
    body.iter().any(|stmt| {
        stmt.any_node(&mut |n| n.member_path().is_some_and(|p| p.ends_with("define.amd")))
    })
}

fn mentions_exports(body: &[Node]) -> bool {
    body.iter()
        .any(|stmt| stmt.any_node(&mut |n| n.ident_name() == Some("exports")))
}

/// Count `ns.prop = …` assignments to the namespace parameter.
fn namespace_assignments(body: &[Node], ns: &str) -> usize {
    let mut count = 0;
    for stmt in body {
        stmt.any_node(&mut |n| {
            if let NodeKind::Assignment { left, .. } = &n.kind {
                if let NodeKind::Member { object, .. } = &left.kind {
                    if object.ident_name() == Some(ns) {
                        count += 1;
                    }
                }
            }
            false
        });
    }
    count
}

/// Consume the wrapper and return its body statements, ready to splice
/// into the program. Top-level `return`s make no sense after hoisting:
/// a valued return becomes its expression statement, a bare one is
/// dropped.
pub fn unwrap(expr: Node) -> Vec<Node> {
    let expr = match expr.kind {
        NodeKind::Unary {
            op: UnaryOp::Not,
            argument,
        } => *argument,
        _ => expr,
    };
    let NodeKind::Call { callee, .. } = expr.kind else {
        return Vec::new();
    };
    let body = match callee.kind {
        NodeKind::FunctionDecl { body, .. }
        | NodeKind::FunctionExpr { body, .. }
        | NodeKind::Arrow { body, .. } => *body,
        _ => return Vec::new(),
    };
    let NodeKind::Block { body } = body.kind else {
        return Vec::new();
    };
    body.into_iter()
        .filter_map(|stmt| match stmt.kind {
            NodeKind::Return { argument: Some(a) } => Some(Node::expression_stmt(*a)),
            NodeKind::Return { argument: None } => None,
            _ => Some(stmt),
        })
        .collect()
}
