//! Pre-passes: single top-down sweeps that prepare the tree and the
//! symbol model before the fixpoint loop starts.

use crate::ast::{Node, NodeKind, ParentChain, VisitAction};
use crate::context::ProcessingContext;
use crate::error::Result;
use crate::rewrite::Rewriter;
use crate::scope::FunctionInfo;

/// Clears source-location fields so synthesized nodes and survivors of
/// the original parse are indistinguishable downstream.
pub struct StripLocations;

impl Rewriter for StripLocations {
    fn name(&self) -> &'static str {
        "strip-locations"
    }

    fn rewrite(
        &self,
        node: &mut Node,
        _ctx: &mut ProcessingContext,
        _chain: &ParentChain,
    ) -> Result<VisitAction> {
        if node.span.take().is_some() {
            Ok(VisitAction::changed())
        } else {
            Ok(VisitAction::unchanged())
        }
    }
}

/// True for values worth recording in a variable's history: the accessor
/// and folding rewriters only ever consult small shapes, and cloning a
/// bundle-sized initializer into the history would defeat the memory
/// bound.
fn is_compact_value(node: &Node) -> bool {
    fn compact(node: &Node, depth: usize) -> bool {
        if depth == 0 {
            return false;
        }
        match &node.kind {
            NodeKind::String { .. }
            | NodeKind::Number { .. }
            | NodeKind::Bool { .. }
            | NodeKind::Null
            | NodeKind::Regex { .. }
            | NodeKind::Ident { .. }
            | NodeKind::This => true,
            NodeKind::Unary { argument, .. } => compact(argument, depth - 1),
            NodeKind::Binary { left, right, .. } => {
                compact(left, depth - 1) && compact(right, depth - 1)
            }
            NodeKind::Member {
                object, property, ..
            } => compact(object, depth - 1) && compact(property, depth - 1),
            NodeKind::Call {
                callee, arguments, ..
            } => {
                arguments.len() <= 3
                    && compact(callee, depth - 1)
                    && arguments.iter().all(|a| compact(a, depth - 1))
            }
            NodeKind::Array { elements } => {
                elements.len() <= 16 && elements.iter().all(|e| compact(e, depth - 1))
            }
            NodeKind::FunctionExpr { body, .. } | NodeKind::Arrow { body, .. } => {
                match &body.kind {
                    NodeKind::Block { body } => body.len() <= 3,
                    _ => true,
                }
            }
            _ => false,
        }
    }
    compact(node, 6)
}

/// Creates the scope tree and registers declarations.
///
/// Scope-bearing nodes get a fresh scope whose parent is the nearest
/// enclosing one; parameters and declarators are installed where they
/// lexically appear; plain assignments record values, promoting
/// undeclared targets into the root scope the way JavaScript treats
/// implicit globals.
pub struct CreateScopes;

impl Rewriter for CreateScopes {
    fn name(&self) -> &'static str {
        "create-scopes"
    }

    fn rewrite(
        &self,
        node: &mut Node,
        ctx: &mut ProcessingContext,
        chain: &ParentChain,
    ) -> Result<VisitAction> {
        let enclosing = chain.nearest_scope().unwrap_or(ctx.scopes.root());
        let mut changed = false;

        if node.is_scope_bearing() {
            let own = match node.kind {
                NodeKind::Program { .. } => ctx.scopes.root(),
                _ => ctx.scopes.create_scope(enclosing),
            };
            node.scope = Some(own);
            changed = true;

            if let Some(params) = node.function_params() {
                for param in params {
                    let name = match &param.kind {
                        NodeKind::Ident { name } => Some(name.clone()),
                        NodeKind::AssignPattern { left, .. } => {
                            left.ident_name().map(str::to_string)
                        }
                        NodeKind::RestElement { argument } => {
                            argument.ident_name().map(str::to_string)
                        }
                        _ => None,
                    };
                    if let Some(name) = name {
                        ctx.scopes.add_variable(own, &name)?;
                    }
                }
            }
        }

        match &node.kind {
            NodeKind::FunctionDecl { id: Some(id), .. } => {
                if let Some(name) = id.ident_name() {
                    ctx.scopes.add_function(enclosing, name)?;
                    changed = true;
                }
            }
            NodeKind::VariableDeclarator { id, init } => {
                if let Some(name) = id.ident_name() {
                    ctx.scopes.add_variable(enclosing, name)?;
                    if let Some(init) = init {
                        if is_compact_value(init) {
                            ctx.scopes
                                .set_value(enclosing, name, (**init).clone(), node.span)?;
                        } else if let Some(var) =
                            ctx.scopes.get_variable_mut(enclosing, name)?
                        {
                            var.add_definer(node.span);
                        }
                    }
                    changed = true;
                }
            }
            NodeKind::Assignment {
                op: crate::ast::AssignOp::Assign,
                left,
                right,
            } => {
                if let Some(path) = left.member_path() {
                    let head = path.split('.').next().unwrap_or(&path);
                    if ctx.scopes.defining_scope(enclosing, head)?.is_none() {
                        // JavaScript's implicit globals.
                        ctx.scopes.promote_global(&path)?;
                    }
                    if is_compact_value(right) {
                        ctx.scopes
                            .set_value(enclosing, &path, (**right).clone(), node.span)?;
                    } else if let Some(var) = ctx.scopes.get_variable_mut(enclosing, &path)? {
                        var.add_definer(node.span);
                    }
                    changed = true;
                }
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

/// Seeds call counts for every named callee in the tree.
pub struct CountCalls;

impl Rewriter for CountCalls {
    fn name(&self) -> &'static str {
        "count-calls"
    }

    fn rewrite(
        &self,
        node: &mut Node,
        ctx: &mut ProcessingContext,
        chain: &ParentChain,
    ) -> Result<VisitAction> {
        let NodeKind::Call { callee, .. } = &node.kind else {
            return Ok(VisitAction::unchanged());
        };
        let Some(path) = callee.member_path() else {
            return Ok(VisitAction::unchanged());
        };
        let scope = chain.nearest_scope().unwrap_or(ctx.scopes.root());
        ctx.functions
            .entry(path.clone())
            .or_insert_with(|| FunctionInfo::new(path, scope, 0))
            .call_count += 1;
        Ok(VisitAction::changed())
    }
}

/// True when a function body is empty or a single bare `return`.
pub fn body_is_empty(func: &Node) -> bool {
    match func.function_body() {
        Some([]) => true,
        Some([only]) => matches!(only.kind, NodeKind::Return { argument: None }),
        _ => false,
    }
}

/// Registers function declarations (and function-valued variables) in
/// the context's functions table, flagging empty bodies.
pub struct RegisterFunctions;

impl RegisterFunctions {
    fn register(ctx: &mut ProcessingContext, name: &str, func: &Node, scope: crate::scope::ScopeId) {
        let params = func.function_params().map_or(0, <[Node]>::len);
        let empty = body_is_empty(func);
        let entry = ctx
            .functions
            .entry(name.to_string())
            .or_insert_with(|| FunctionInfo::new(name, scope, params));
        entry.scope = scope;
        entry.param_count = params;
        entry.is_empty = empty;
    }
}

impl Rewriter for RegisterFunctions {
    fn name(&self) -> &'static str {
        "register-functions"
    }

    fn rewrite(
        &self,
        node: &mut Node,
        ctx: &mut ProcessingContext,
        chain: &ParentChain,
    ) -> Result<VisitAction> {
        let enclosing = chain.nearest_scope().unwrap_or(ctx.scopes.root());
        match &node.kind {
            NodeKind::FunctionDecl { id: Some(id), .. } => {
                if let Some(name) = id.ident_name() {
                    Self::register(ctx, name, node, enclosing);
                    return Ok(VisitAction::changed());
                }
            }
            NodeKind::VariableDeclarator {
                id,
                init: Some(init),
            } if init.is_function() => {
                if let Some(name) = id.ident_name() {
                    Self::register(ctx, name, init, enclosing);
                    return Ok(VisitAction::changed());
                }
            }
            _ => {}
        }
        Ok(VisitAction::unchanged())
    }
}
