//! Structural recognition of webpack-family bundle shapes.
//!
//! Detection is structural: predicates over the tree, not string matches
//! against stringified nodes, so fully minifier-renamed bundles still
//! match. The keyword check on classical bundles survives only as a
//! cheap accelerator in front of the six-invariant structural test.

use crate::ast::{Node, NodeKind, UnaryOp};

/// A recognised modules-carrying dialect, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `webpackJsonp.push([[ids], modules])` or `webpackJsonp([ids], modules)`.
    ChunkPush,
    /// Generation-5+ runtime: zero-arg IIFE holding a module object, a
    /// loader function and `__webpack_require__` plumbing.
    Modern,
    /// Generation ≤4 runtime recognised by its leftover identifiers.
    ClassicalKeyword,
    /// Same runtime recognised purely by shape (obfuscated input).
    ClassicalStructural,
}

/// An IIFE viewed through at most one leading `!`.
pub struct Iife<'a> {
    pub func: &'a Node,
    pub args: &'a [Node],
}

pub fn iife(expr: &Node) -> Option<Iife<'_>> {
    let expr = match &expr.kind {
        NodeKind::Unary {
            op: UnaryOp::Not,
            argument,
        } => argument,
        _ => expr,
    };
    let NodeKind::Call {
        callee, arguments, ..
    } = &expr.kind
    else {
        return None;
    };
    if callee.is_function() {
        Some(Iife {
            func: callee,
            args: arguments,
        })
    } else {
        None
    }
}

pub fn detect(expr: &Node) -> Option<Dialect> {
    if detect_chunk_push(expr) {
        return Some(Dialect::ChunkPush);
    }
    let shape = iife(expr)?;
    if is_modern(&shape) {
        return Some(Dialect::Modern);
    }
    if is_classical_shape(&shape) {
        let body = shape.func.function_body()?;
        if has_webpack_keywords(body) {
            return Some(Dialect::ClassicalKeyword);
        }
        if satisfies_structural_invariants(body) {
            return Some(Dialect::ClassicalStructural);
        }
    }
    None
}

fn detect_chunk_push(expr: &Node) -> bool {
    let NodeKind::Call {
        callee, arguments, ..
    } = &expr.kind
    else {
        return false;
    };

    // `….webpackJsonp.push([[ids], modules])`
    if let NodeKind::Member {
        object,
        property,
        computed: false,
        ..
    } = &callee.kind
    {
        if property.ident_name() == Some("push")
            && object
                .member_path()
                .is_some_and(|p| p.ends_with("webpackJsonp"))
        {
            return matches!(
                arguments.as_slice(),
                [Node {
                    kind: NodeKind::Array { .. },
                    ..
                }]
            );
        }
    }

    // Direct `webpackJsonp([ids], modules)`
    callee.ident_name() == Some("webpackJsonp") && arguments.len() >= 2
}

fn is_modern(shape: &Iife) -> bool {
    let params = shape.func.function_params().map_or(usize::MAX, <[Node]>::len);
    if params != 0 || !shape.args.is_empty() {
        return false;
    }
    let Some(body) = shape.func.function_body() else {
        return false;
    };
    let has_module_object = body.iter().any(|stmt| {
        declarator_with_module_object(stmt).is_some()
    });
    let has_loader = body
        .iter()
        .any(|stmt| matches!(stmt.kind, NodeKind::FunctionDecl { .. }));
    let has_require = body.iter().any(|stmt| {
        stmt.any_node(&mut |n| n.ident_name() == Some("__webpack_require__"))
    });
    has_module_object && has_loader && has_require
}

/// A declarator whose init is an object literal where every property
/// value is a function (the modules container).
fn declarator_with_module_object(stmt: &Node) -> Option<&Node> {
    let NodeKind::VariableDecl { declarations, .. } = &stmt.kind else {
        return None;
    };
    declarations.iter().find_map(|decl| {
        let NodeKind::VariableDeclarator {
            init: Some(init), ..
        } = &decl.kind
        else {
            return None;
        };
        let NodeKind::Object { properties } = &init.kind else {
            return None;
        };
        let all_functions = !properties.is_empty()
            && properties.iter().all(|p| match &p.kind {
                NodeKind::Property { value, .. } => value.is_function(),
                _ => false,
            });
        all_functions.then_some(&**init)
    })
}

fn is_classical_shape(shape: &Iife) -> bool {
    let params = shape.func.function_params().map_or(usize::MAX, <[Node]>::len);
    params == 1
        && shape.args.len() == 1
        && matches!(
            shape.args[0].kind,
            NodeKind::Array { .. } | NodeKind::Object { .. }
        )
}

/// Keyword accelerator: the runtime's own identifiers survived.
fn has_webpack_keywords(body: &[Node]) -> bool {
    body.iter().any(|stmt| {
        stmt.any_node(&mut |n| {
            n.ident_name().is_some_and(|name| {
                name.contains("__webpack_require__")
                    || name.contains("webpackJsonp")
                    || name.contains("__WEBPACK")
            })
        })
    })
}

/// The six invariants that jointly identify the classical loader on
/// fully obfuscated input: a cache object declarator, a loader function,
/// a `.call(…)` dispatch, member access, a return, and an assignment of
/// an object literal.
fn satisfies_structural_invariants(body: &[Node]) -> bool {
    let mut cache_object = false;
    let mut loader_fn = false;
    let mut call_dispatch = false;
    let mut member_access = false;
    let mut has_return = false;
    let mut object_assignment = false;

    for stmt in body {
        cache_object |= stmt.any_node(&mut |n| {
            matches!(
                &n.kind,
                NodeKind::VariableDeclarator { init: Some(init), .. }
                    if matches!(init.kind, NodeKind::Object { .. })
            )
        });
        loader_fn |= stmt.any_node(&mut |n| matches!(n.kind, NodeKind::FunctionDecl { .. }));
        call_dispatch |= stmt.any_node(&mut |n| {
            let NodeKind::Call { callee, .. } = &n.kind else {
                return false;
            };
            matches!(
                &callee.kind,
                NodeKind::Member { property, computed: false, .. }
                    if property.ident_name() == Some("call")
            )
        });
        member_access |= stmt.any_node(&mut |n| matches!(n.kind, NodeKind::Member { .. }));
        has_return |= stmt.any_node(&mut |n| matches!(n.kind, NodeKind::Return { .. }));
        object_assignment |= stmt.any_node(&mut |n| {
            matches!(
                &n.kind,
                NodeKind::Assignment { right, .. }
                    if matches!(right.kind, NodeKind::Object { .. })
            )
        });
    }

    cache_object && loader_fn && call_dispatch && member_access && has_return && object_assignment
}

/// Pull `{id, function}` pairs out of a modules container (array index
/// or object key ids).
pub fn modules_from_container(container: Node) -> Vec<(String, Node)> {
    match container.kind {
        NodeKind::Array { elements } => elements
            .into_iter()
            .enumerate()
            .filter(|(_, el)| el.is_function())
            .map(|(i, el)| (i.to_string(), el))
            .collect(),
        NodeKind::Object { properties } => properties
            .into_iter()
            .filter_map(|prop| {
                let NodeKind::Property { key, value, .. } = prop.kind else {
                    return None;
                };
                if !value.is_function() {
                    return None;
                }
                let id = match &key.kind {
                    NodeKind::Ident { name } => name.clone(),
                    NodeKind::String { value, .. } => value.clone(),
                    NodeKind::Number { value, .. } => {
                        crate::rewrite::js_number_to_string(*value)
                    }
                    _ => return None,
                };
                Some((id, *value))
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Consume a detected bundle expression and return its module pairs.
pub fn extract(expr: Node, dialect: Dialect) -> Vec<(String, Node)> {
    match dialect {
        Dialect::ChunkPush => extract_chunk_push(expr),
        Dialect::Modern => extract_modern(expr),
        Dialect::ClassicalKeyword | Dialect::ClassicalStructural => extract_classical(expr),
    }
}

fn extract_chunk_push(expr: Node) -> Vec<(String, Node)> {
    let NodeKind::Call { callee, arguments, .. } = expr.kind else {
        return Vec::new();
    };

    // Direct call form: the container is the second argument.
    if callee.ident_name() == Some("webpackJsonp") {
        return arguments
            .into_iter()
            .nth(1)
            .map(modules_from_container)
            .unwrap_or_default();
    }

    // Push form: the container sits inside the pushed tuple.
    let Some(tuple) = arguments.into_iter().next() else {
        return Vec::new();
    };
    let NodeKind::Array { elements } = tuple.kind else {
        return Vec::new();
    };
    elements
        .into_iter()
        .skip(1)
        .find(|el| {
            matches!(el.kind, NodeKind::Object { .. })
                || matches!(&el.kind, NodeKind::Array { elements } if elements.iter().any(Node::is_function))
        })
        .map(modules_from_container)
        .unwrap_or_default()
}

fn into_iife_func(expr: Node) -> Option<(Node, Vec<Node>)> {
    let expr = match expr.kind {
        NodeKind::Unary {
            op: UnaryOp::Not,
            argument,
        } => *argument,
        _ => expr,
    };
    match expr.kind {
        NodeKind::Call {
            callee, arguments, ..
        } if callee.is_function() => Some((*callee, arguments)),
        _ => None,
    }
}

fn extract_modern(expr: Node) -> Vec<(String, Node)> {
    let Some((func, _)) = into_iife_func(expr) else {
        return Vec::new();
    };
    let body = match func.kind {
        NodeKind::FunctionDecl { body, .. }
        | NodeKind::FunctionExpr { body, .. }
        | NodeKind::Arrow { body, .. } => *body,
        _ => return Vec::new(),
    };
    let NodeKind::Block { body } = body.kind else {
        return Vec::new();
    };
    for stmt in body {
        if declarator_with_module_object(&stmt).is_none() {
            continue;
        }
        let NodeKind::VariableDecl { declarations, .. } = stmt.kind else {
            continue;
        };
        for decl in declarations {
            if let NodeKind::VariableDeclarator {
                init: Some(init), ..
            } = decl.kind
            {
                if matches!(init.kind, NodeKind::Object { .. }) {
                    return modules_from_container(*init);
                }
            }
        }
    }
    Vec::new()
}

fn extract_classical(expr: Node) -> Vec<(String, Node)> {
    let Some((_, args)) = into_iife_func(expr) else {
        return Vec::new();
    };
    args.into_iter()
        .next()
        .map(modules_from_container)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn classical_loader_body() -> Vec<Node> {
        // var cache = {};
        let cache = Node::new(NodeKind::VariableDecl {
            kind: crate::ast::DeclKind::Var,
            declarations: vec![Node::new(NodeKind::VariableDeclarator {
                id: Box::new(Node::ident("c")),
                init: Some(Box::new(Node::new(NodeKind::Object {
                    properties: Vec::new(),
                }))),
            })],
        });
        // function r(i) { c[i] = {}; m[i].call(x); return c[i].exports; }
        let loader = Node::new(NodeKind::FunctionDecl {
            id: Some(Box::new(Node::ident("r"))),
            params: vec![Node::ident("i")],
            body: Box::new(Node::block(vec![
                Node::expression_stmt(Node::new(NodeKind::Assignment {
                    op: crate::ast::AssignOp::Assign,
                    left: Box::new(Node::new(NodeKind::Member {
                        object: Box::new(Node::ident("c")),
                        property: Box::new(Node::ident("i")),
                        computed: true,
                        optional: false,
                    })),
                    right: Box::new(Node::new(NodeKind::Object {
                        properties: Vec::new(),
                    })),
                })),
                Node::expression_stmt(call(
                    Node::new(NodeKind::Member {
                        object: Box::new(Node::new(NodeKind::Member {
                            object: Box::new(Node::ident("m")),
                            property: Box::new(Node::ident("i")),
                            computed: true,
                            optional: false,
                        })),
                        property: Box::new(Node::ident("call")),
                        computed: false,
                        optional: false,
                    }),
                    vec![Node::ident("x")],
                )),
                Node::new(NodeKind::Return {
                    argument: Some(Box::new(Node::new(NodeKind::Member {
                        object: Box::new(Node::new(NodeKind::Member {
                            object: Box::new(Node::ident("c")),
                            property: Box::new(Node::ident("i")),
                            computed: true,
                            optional: false,
                        })),
                        property: Box::new(Node::ident("exports")),
                        computed: false,
                        optional: false,
                    }))),
                }),
            ])),
            is_async: false,
            is_generator: false,
        });
        vec![cache, loader, Node::expression_stmt(call(Node::ident("r"), vec![Node::number(0.0)]))]
    }

    fn module_fn() -> Node {
        func_expr(vec!["e", "t", "n"], Vec::new())
    }

    #[test]
    fn test_classical_structural_detection() {
        // Fully renamed loader, array container.
        let bundle = Node::unary(
            UnaryOp::Not,
            call(
                func_expr(vec!["m"], classical_loader_body()),
                vec![Node::new(NodeKind::Array {
                    elements: vec![module_fn(), module_fn()],
                })],
            ),
        );
        assert_eq!(detect(&bundle), Some(Dialect::ClassicalStructural));

        let modules = extract(bundle, Dialect::ClassicalStructural);
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].0, "0");
        assert_eq!(modules[1].0, "1");
    }

    #[test]
    fn test_classical_keyword_detection() {
        let body = vec![Node::expression_stmt(call(
            Node::ident("__webpack_require__"),
            vec![Node::number(0.0)],
        ))];
        let bundle = call(
            func_expr(vec!["m"], body),
            vec![Node::new(NodeKind::Array {
                elements: vec![module_fn()],
            })],
        );
        assert_eq!(detect(&bundle), Some(Dialect::ClassicalKeyword));
    }

    #[test]
    fn test_modern_detection() {
        let modules_object = Node::new(NodeKind::Object {
            properties: vec![
                Node::new(NodeKind::Property {
                    key: Box::new(Node::number(143.0)),
                    value: Box::new(module_fn()),
                    kind: crate::ast::PropertyKind::Init,
                    computed: false,
                    shorthand: false,
                    method: false,
                }),
                Node::new(NodeKind::Property {
                    key: Box::new(Node::number(256.0)),
                    value: Box::new(module_fn()),
                    kind: crate::ast::PropertyKind::Init,
                    computed: false,
                    shorthand: false,
                    method: false,
                }),
            ],
        });
        let body = vec![
            Node::new(NodeKind::VariableDecl {
                kind: crate::ast::DeclKind::Var,
                declarations: vec![Node::new(NodeKind::VariableDeclarator {
                    id: Box::new(Node::ident("modules")),
                    init: Some(Box::new(modules_object)),
                })],
            }),
            Node::new(NodeKind::FunctionDecl {
                id: Some(Box::new(Node::ident("__webpack_require__"))),
                params: vec![Node::ident("id")],
                body: Box::new(Node::block(Vec::new())),
                is_async: false,
                is_generator: false,
            }),
        ];
        let bundle = call(func_expr(Vec::new(), body), Vec::new());
        assert_eq!(detect(&bundle), Some(Dialect::Modern));

        let modules = extract(bundle, Dialect::Modern);
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].0, "143");
    }

    #[test]
    fn test_chunk_push_detection() {
        let bundle = call(
            Node::new(NodeKind::Member {
                object: Box::new(Node::new(NodeKind::Member {
                    object: Box::new(Node::ident("window")),
                    property: Box::new(Node::ident("webpackJsonp")),
                    computed: false,
                    optional: false,
                })),
                property: Box::new(Node::ident("push")),
                computed: false,
                optional: false,
            }),
            vec![Node::new(NodeKind::Array {
                elements: vec![
                    Node::new(NodeKind::Array {
                        elements: vec![Node::number(3.0)],
                    }),
                    Node::new(NodeKind::Array {
                        elements: vec![module_fn(), module_fn(), module_fn()],
                    }),
                ],
            })],
        );
        assert_eq!(detect(&bundle), Some(Dialect::ChunkPush));

        let modules = extract(bundle, Dialect::ChunkPush);
        assert_eq!(modules.len(), 3);
    }

    #[test]
    fn test_plain_iife_not_a_bundle() {
        let bundle = call(func_expr(Vec::new(), vec![Node::expression_stmt(call(
            Node::ident("init"),
            Vec::new(),
        ))]), Vec::new());
        assert_eq!(detect(&bundle), None);
    }
}
