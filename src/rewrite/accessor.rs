//! String-array accessor inlining.
//!
//! Obfuscators route every string through a tiny accessor:
//!
//! ```text
//! var f = function (i) { return arr[i]; };   // sometimes atob(arr[i])
//! …
//! f(407)
//! ```
//!
//! Call sites are rewritten to index the array directly; constant
//! folding and property simplification then finish the job.

use crate::ast::{Node, NodeKind, ParentChain, VisitAction};
use crate::context::ProcessingContext;
use crate::error::Result;
use crate::rewrite::Rewriter;

struct AccessorShape {
    array: String,
    wrap_atob: bool,
}

/// Match `function (i) { return arr[i]; }` or
/// `function (i) { return atob(arr[i]); }`.
fn accessor_shape(func: &Node) -> Option<AccessorShape> {
    let [param] = func.function_params()? else {
        return None;
    };
    let param_name = param.ident_name()?;
    let [stmt] = func.function_body()? else {
        return None;
    };
    let NodeKind::Return {
        argument: Some(expr),
    } = &stmt.kind
    else {
        return None;
    };

    if let Some(shape) = indexed_read(expr, param_name, false) {
        return Some(shape);
    }
    if let NodeKind::Call {
        callee, arguments, ..
    } = &expr.kind
    {
        if callee.ident_name() == Some("atob") {
            if let [only] = arguments.as_slice() {
                return indexed_read(only, param_name, true);
            }
        }
    }
    None
}

fn indexed_read(expr: &Node, param_name: &str, wrap_atob: bool) -> Option<AccessorShape> {
    let NodeKind::Member {
        object,
        property,
        computed: true,
        ..
    } = &expr.kind
    else {
        return None;
    };
    if property.ident_name() != Some(param_name) {
        return None;
    }
    Some(AccessorShape {
        array: object.ident_name()?.to_string(),
        wrap_atob,
    })
}

pub struct AccessorInline;

impl Rewriter for AccessorInline {
    fn name(&self) -> &'static str {
        "inline-accessors"
    }

    fn rewrite(
        &self,
        node: &mut Node,
        ctx: &mut ProcessingContext,
        chain: &ParentChain,
    ) -> Result<VisitAction> {
        let shape = {
            let NodeKind::Call {
                callee, arguments, ..
            } = &node.kind
            else {
                return Ok(VisitAction::unchanged());
            };
            if arguments.len() != 1 {
                return Ok(VisitAction::unchanged());
            }
            let Some(name) = callee.ident_name() else {
                return Ok(VisitAction::unchanged());
            };
            let scope = chain.nearest_scope().unwrap_or(ctx.scopes.root());
            let Some(variable) = ctx.scopes.get_variable(scope, name)? else {
                return Ok(VisitAction::unchanged());
            };
            let Some(shape) = variable.current_value().and_then(accessor_shape) else {
                return Ok(VisitAction::unchanged());
            };
            shape
        };

        let NodeKind::Call { arguments, .. } = &mut node.kind else {
            return Ok(VisitAction::unchanged());
        };
        let index = arguments.remove(0);
        let read = Node::new(NodeKind::Member {
            object: Box::new(Node::ident(shape.array)),
            property: Box::new(index),
            computed: true,
            optional: false,
        });
        *node = if shape.wrap_atob {
            Node::new(NodeKind::Call {
                callee: Box::new(Node::ident("atob")),
                arguments: vec![read],
                optional: false,
            })
        } else {
            read
        };
        Ok(VisitAction::changed())
    }
}
