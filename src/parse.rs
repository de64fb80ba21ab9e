//! The parser hook: tree-sitter-javascript adapted to the crate's node
//! vocabulary.
//!
//! The rewriting core never sees tree-sitter types; this module turns
//! the concrete syntax tree into the owned [`Node`] hierarchy, cooking
//! string escapes eagerly and keeping the raw literal spellings so the
//! generator can round-trip untouched code.

use std::path::Path;

use tree_sitter::Node as TsNode;

use crate::ast::{
    AssignOp, BinaryOp, DeclKind, LogicalOp, Node, NodeKind, PropertyKind, Span, UnaryOp, UpdateOp,
};
use crate::error::{Result, UnweaveError};
use crate::rewrite::decode_string_escapes;

/// Parse a source string into a tree.
pub fn parse_source(source: &str, path: &Path) -> Result<Node> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_javascript::LANGUAGE.into())
        .map_err(|e| UnweaveError::Parse {
            path: path.to_path_buf(),
            message: format!("failed to load grammar: {e}"),
        })?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| UnweaveError::Parse {
            path: path.to_path_buf(),
            message: "parser returned no tree".to_string(),
        })?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(UnweaveError::Parse {
            path: path.to_path_buf(),
            message: "source contains syntax errors".to_string(),
        });
    }
    let converter = Converter { src: source, path };
    converter.program(root)
}

/// Read and parse a file.
pub fn parse_file(path: &Path) -> Result<(String, Node)> {
    if !path.exists() {
        return Err(UnweaveError::FileNotFound(path.to_path_buf()));
    }
    let source = std::fs::read_to_string(path)?;
    let tree = parse_source(&source, path)?;
    Ok((source, tree))
}

struct Converter<'a> {
    src: &'a str,
    path: &'a Path,
}

impl<'a> Converter<'a> {
    fn text(&self, node: TsNode) -> &'a str {
        &self.src[node.byte_range()]
    }

    fn span(&self, node: TsNode) -> Span {
        Span {
            start: node.start_byte(),
            end: node.end_byte(),
        }
    }

    fn err(&self, node: TsNode, what: &str) -> UnweaveError {
        UnweaveError::Parse {
            path: self.path.to_path_buf(),
            message: format!("unsupported {what} `{}` at byte {}", node.kind(), node.start_byte()),
        }
    }

    fn named_children<'t>(&self, node: TsNode<'t>) -> Vec<TsNode<'t>> {
        let mut cursor = node.walk();
        node.named_children(&mut cursor).collect()
    }

    fn program(&self, node: TsNode) -> Result<Node> {
        let mut body = Vec::new();
        for child in self.named_children(node) {
            if child.kind() == "comment" || child.kind() == "hash_bang_line" {
                continue;
            }
            body.push(self.statement(child)?);
        }
        Ok(Node::new(NodeKind::Program { body }).with_span(self.span(node)))
    }

    fn statements(&self, node: TsNode) -> Result<Vec<Node>> {
        let mut out = Vec::new();
        for child in self.named_children(node) {
            if child.kind() == "comment" {
                continue;
            }
            out.push(self.statement(child)?);
        }
        Ok(out)
    }

    fn field<'t>(&self, node: TsNode<'t>, name: &str) -> Option<TsNode<'t>> {
        node.child_by_field_name(name)
    }

    fn statement(&self, node: TsNode) -> Result<Node> {
        let span = self.span(node);
        let kind = match node.kind() {
            "expression_statement" => {
                let expr = self
                    .named_children(node)
                    .into_iter()
                    .find(|c| c.kind() != "comment")
                    .ok_or_else(|| self.err(node, "statement"))?;
                NodeKind::ExpressionStmt {
                    expression: Box::new(self.expression(expr)?),
                }
            }
            "variable_declaration" => self.variable_declaration(node, DeclKind::Var)?,
            "lexical_declaration" => {
                let decl_kind = match node.child(0).map(|c| c.kind()) {
                    Some("const") => DeclKind::Const,
                    _ => DeclKind::Let,
                };
                self.variable_declaration(node, decl_kind)?
            }
            "function_declaration" | "generator_function_declaration" => {
                let (id, params, body, is_async) = self.function_parts(node)?;
                NodeKind::FunctionDecl {
                    id: id.map(Box::new),
                    params,
                    body: Box::new(body),
                    is_async,
                    is_generator: node.kind() == "generator_function_declaration",
                }
            }
            "class_declaration" => {
                let (id, super_class, body) = self.class_parts(node)?;
                NodeKind::ClassDecl {
                    id: id.map(Box::new),
                    super_class: super_class.map(Box::new),
                    body,
                }
            }
            "statement_block" => NodeKind::Block {
                body: self.statements(node)?,
            },
            "if_statement" => {
                let test = self.condition_of(node)?;
                let consequent = self
                    .field(node, "consequence")
                    .ok_or_else(|| self.err(node, "if statement"))?;
                let alternate = match self.field(node, "alternative") {
                    Some(clause) => {
                        // else_clause wraps the actual statement.
                        let inner = self
                            .named_children(clause)
                            .into_iter()
                            .next()
                            .ok_or_else(|| self.err(clause, "else clause"))?;
                        Some(Box::new(self.statement(inner)?))
                    }
                    None => None,
                };
                NodeKind::If {
                    test: Box::new(test),
                    consequent: Box::new(self.statement(consequent)?),
                    alternate,
                }
            }
            "for_statement" => {
                let init = match self.field(node, "initializer") {
                    Some(init) if init.kind() == "empty_statement" => None,
                    Some(init) if init.kind() == "expression_statement" => {
                        let inner = self
                            .named_children(init)
                            .into_iter()
                            .next()
                            .ok_or_else(|| self.err(init, "for initializer"))?;
                        Some(Box::new(self.expression(inner)?))
                    }
                    Some(init) => Some(Box::new(self.statement(init)?)),
                    None => None,
                };
                let test = match self.field(node, "condition") {
                    Some(cond) if cond.kind() == "expression_statement" => {
                        let inner = self
                            .named_children(cond)
                            .into_iter()
                            .next()
                            .ok_or_else(|| self.err(cond, "for condition"))?;
                        Some(Box::new(self.expression(inner)?))
                    }
                    Some(cond) if cond.kind() == "empty_statement" => None,
                    Some(cond) => Some(Box::new(self.expression(cond)?)),
                    None => None,
                };
                let update = match self.field(node, "increment") {
                    Some(inc) => Some(Box::new(self.expression(inc)?)),
                    None => None,
                };
                let body = self
                    .field(node, "body")
                    .ok_or_else(|| self.err(node, "for statement"))?;
                NodeKind::For {
                    init,
                    test,
                    update,
                    body: Box::new(self.statement(body)?),
                }
            }
            "for_in_statement" => {
                let left_node = self
                    .field(node, "left")
                    .ok_or_else(|| self.err(node, "for-in left"))?;
                let left = match self.field(node, "kind") {
                    Some(kind_tok) => {
                        let decl_kind = match self.text(kind_tok) {
                            "var" => DeclKind::Var,
                            "const" => DeclKind::Const,
                            _ => DeclKind::Let,
                        };
                        Node::new(NodeKind::VariableDecl {
                            kind: decl_kind,
                            declarations: vec![Node::new(NodeKind::VariableDeclarator {
                                id: Box::new(self.expression(left_node)?),
                                init: None,
                            })],
                        })
                    }
                    None => self.expression(left_node)?,
                };
                let right = self
                    .field(node, "right")
                    .ok_or_else(|| self.err(node, "for-in right"))?;
                let body = self
                    .field(node, "body")
                    .ok_or_else(|| self.err(node, "for-in body"))?;
                let is_of = self
                    .field(node, "operator")
                    .is_some_and(|op| self.text(op) == "of");
                if is_of {
                    NodeKind::ForOf {
                        left: Box::new(left),
                        right: Box::new(self.expression(right)?),
                        body: Box::new(self.statement(body)?),
                    }
                } else {
                    NodeKind::ForIn {
                        left: Box::new(left),
                        right: Box::new(self.expression(right)?),
                        body: Box::new(self.statement(body)?),
                    }
                }
            }
            "while_statement" => NodeKind::While {
                test: Box::new(self.condition_of(node)?),
                body: Box::new(self.statement(
                    self.field(node, "body")
                        .ok_or_else(|| self.err(node, "while body"))?,
                )?),
            },
            "do_statement" => NodeKind::DoWhile {
                body: Box::new(self.statement(
                    self.field(node, "body")
                        .ok_or_else(|| self.err(node, "do body"))?,
                )?),
                test: Box::new(self.condition_of(node)?),
            },
            "switch_statement" => {
                let discriminant = self
                    .field(node, "value")
                    .ok_or_else(|| self.err(node, "switch value"))?;
                let body = self
                    .field(node, "body")
                    .ok_or_else(|| self.err(node, "switch body"))?;
                let mut cases = Vec::new();
                for case in self.named_children(body) {
                    match case.kind() {
                        "switch_case" => {
                            let value = self
                                .field(case, "value")
                                .ok_or_else(|| self.err(case, "switch case"))?;
                            let consequent = self
                                .named_children(case)
                                .into_iter()
                                .filter(|c| c.id() != value.id() && c.kind() != "comment")
                                .map(|c| self.statement(c))
                                .collect::<Result<Vec<_>>>()?;
                            cases.push(Node::new(NodeKind::SwitchCase {
                                test: Some(Box::new(self.unwrap_parens(value)?)),
                                consequent,
                            }));
                        }
                        "switch_default" => {
                            let consequent = self.statements(case)?;
                            cases.push(Node::new(NodeKind::SwitchCase {
                                test: None,
                                consequent,
                            }));
                        }
                        _ => {}
                    }
                }
                NodeKind::Switch {
                    discriminant: Box::new(self.unwrap_parens(discriminant)?),
                    cases,
                }
            }
            "return_statement" => {
                let argument = self
                    .named_children(node)
                    .into_iter()
                    .find(|c| c.kind() != "comment")
                    .map(|c| self.expression(c))
                    .transpose()?;
                NodeKind::Return {
                    argument: argument.map(Box::new),
                }
            }
            "throw_statement" => {
                let argument = self
                    .named_children(node)
                    .into_iter()
                    .find(|c| c.kind() != "comment")
                    .ok_or_else(|| self.err(node, "throw statement"))?;
                NodeKind::Throw {
                    argument: Box::new(self.expression(argument)?),
                }
            }
            "try_statement" => {
                let block = self
                    .field(node, "body")
                    .ok_or_else(|| self.err(node, "try body"))?;
                let handler = match self.field(node, "handler") {
                    Some(handler) => {
                        let param = self
                            .field(handler, "parameter")
                            .map(|p| self.expression(p))
                            .transpose()?;
                        let body = self
                            .field(handler, "body")
                            .ok_or_else(|| self.err(handler, "catch body"))?;
                        Some(Box::new(Node::new(NodeKind::CatchClause {
                            param: param.map(Box::new),
                            body: Box::new(self.statement(body)?),
                        })))
                    }
                    None => None,
                };
                let finalizer = match self.field(node, "finalizer") {
                    Some(fin) => {
                        let body = self
                            .named_children(fin)
                            .into_iter()
                            .next()
                            .ok_or_else(|| self.err(fin, "finally clause"))?;
                        Some(Box::new(self.statement(body)?))
                    }
                    None => None,
                };
                NodeKind::Try {
                    block: Box::new(self.statement(block)?),
                    handler,
                    finalizer,
                }
            }
            "break_statement" => NodeKind::Break {
                label: self
                    .field(node, "label")
                    .map(|l| self.expression(l))
                    .transpose()?
                    .map(Box::new),
            },
            "continue_statement" => NodeKind::Continue {
                label: self
                    .field(node, "label")
                    .map(|l| self.expression(l))
                    .transpose()?
                    .map(Box::new),
            },
            "labeled_statement" => NodeKind::Labeled {
                label: Box::new(self.expression(
                    self.field(node, "label")
                        .ok_or_else(|| self.err(node, "label"))?,
                )?),
                body: Box::new(self.statement(
                    self.field(node, "body")
                        .ok_or_else(|| self.err(node, "labeled body"))?,
                )?),
            },
            "empty_statement" => NodeKind::Empty,
            "debugger_statement" => NodeKind::Debugger,
            // Function/class expressions can appear directly as the
            // child of an export or similar; treat the rest as an
            // expression in statement position.
            _ => {
                return Ok(Node::new(NodeKind::ExpressionStmt {
                    expression: Box::new(self.expression(node)?),
                })
                .with_span(span));
            }
        };
        Ok(Node::new(kind).with_span(span))
    }

    fn variable_declaration(&self, node: TsNode, kind: DeclKind) -> Result<NodeKind> {
        let mut declarations = Vec::new();
        for child in self.named_children(node) {
            if child.kind() != "variable_declarator" {
                continue;
            }
            let id = self
                .field(child, "name")
                .ok_or_else(|| self.err(child, "declarator"))?;
            let init = self
                .field(child, "value")
                .map(|v| self.expression(v))
                .transpose()?;
            declarations.push(
                Node::new(NodeKind::VariableDeclarator {
                    id: Box::new(self.expression(id)?),
                    init: init.map(Box::new),
                })
                .with_span(self.span(child)),
            );
        }
        Ok(NodeKind::VariableDecl { kind, declarations })
    }

    fn condition_of(&self, node: TsNode) -> Result<Node> {
        let cond = self
            .field(node, "condition")
            .ok_or_else(|| self.err(node, "condition"))?;
        self.unwrap_parens(cond)
    }

    fn unwrap_parens(&self, node: TsNode) -> Result<Node> {
        if node.kind() == "parenthesized_expression" {
            let inner = self
                .named_children(node)
                .into_iter()
                .find(|c| c.kind() != "comment")
                .ok_or_else(|| self.err(node, "parenthesized expression"))?;
            return self.expression(inner);
        }
        self.expression(node)
    }

    fn function_parts(&self, node: TsNode) -> Result<(Option<Node>, Vec<Node>, Node, bool)> {
        let id = self
            .field(node, "name")
            .map(|n| self.expression(n))
            .transpose()?;
        let params = match self.field(node, "parameters") {
            Some(params) => self
                .named_children(params)
                .into_iter()
                .filter(|c| c.kind() != "comment")
                .map(|c| self.expression(c))
                .collect::<Result<Vec<_>>>()?,
            None => match self.field(node, "parameter") {
                Some(p) => vec![self.expression(p)?],
                None => Vec::new(),
            },
        };
        let body_node = self
            .field(node, "body")
            .ok_or_else(|| self.err(node, "function body"))?;
        let body = if body_node.kind() == "statement_block" {
            self.statement(body_node)?
        } else {
            self.expression(body_node)?
        };
        let is_async = node
            .child(0)
            .is_some_and(|c| c.kind() == "async");
        Ok((id, params, body, is_async))
    }

    fn class_parts(&self, node: TsNode) -> Result<(Option<Node>, Option<Node>, Vec<Node>)> {
        let id = self
            .field(node, "name")
            .map(|n| self.expression(n))
            .transpose()?;
        let super_class = match node
            .children(&mut node.walk())
            .find(|c| c.kind() == "class_heritage")
        {
            Some(heritage) => self
                .named_children(heritage)
                .into_iter()
                .next()
                .map(|c| self.expression(c))
                .transpose()?,
            None => None,
        };
        let body_node = self
            .field(node, "body")
            .ok_or_else(|| self.err(node, "class body"))?;
        let mut body = Vec::new();
        for member in self.named_children(body_node) {
            if member.kind() != "method_definition" {
                continue;
            }
            let key = self
                .field(member, "name")
                .ok_or_else(|| self.err(member, "method name"))?;
            let (_, params, fn_body, is_async) = self.function_parts(member)?;
            let computed = key.kind() == "computed_property_name";
            let key_node = if computed {
                let inner = self
                    .named_children(key)
                    .into_iter()
                    .next()
                    .ok_or_else(|| self.err(key, "computed key"))?;
                self.expression(inner)?
            } else {
                self.expression(key)?
            };
            let is_static = member.child(0).is_some_and(|c| c.kind() == "static");
            body.push(
                Node::new(NodeKind::MethodDef {
                    key: Box::new(key_node),
                    value: Box::new(Node::new(NodeKind::FunctionExpr {
                        id: None,
                        params,
                        body: Box::new(fn_body),
                        is_async,
                        is_generator: false,
                    })),
                    computed,
                    is_static,
                })
                .with_span(self.span(member)),
            );
        }
        Ok((id, super_class, body))
    }

    fn expression(&self, node: TsNode) -> Result<Node> {
        let span = self.span(node);
        let kind = match node.kind() {
            "identifier"
            | "property_identifier"
            | "shorthand_property_identifier"
            | "shorthand_property_identifier_pattern"
            | "statement_identifier"
            | "undefined" => NodeKind::Ident {
                name: self.text(node).to_string(),
            },
            "this" => NodeKind::This,
            "super" => NodeKind::SuperExpr,
            "number" => {
                let raw = self.text(node);
                NodeKind::Number {
                    value: parse_js_number(raw),
                    raw: Some(raw.to_string()),
                }
            }
            "string" => {
                let raw = self.text(node);
                let inner = raw
                    .strip_prefix(['"', '\''])
                    .and_then(|r| r.strip_suffix(['"', '\'']))
                    .unwrap_or(raw);
                NodeKind::String {
                    value: decode_string_escapes(inner),
                    raw: Some(raw.to_string()),
                }
            }
            "true" => NodeKind::Bool { value: true },
            "false" => NodeKind::Bool { value: false },
            "null" => NodeKind::Null,
            "regex" => NodeKind::Regex {
                pattern: self
                    .field(node, "pattern")
                    .map(|p| self.text(p).to_string())
                    .unwrap_or_default(),
                flags: self
                    .field(node, "flags")
                    .map(|f| self.text(f).to_string())
                    .unwrap_or_default(),
            },
            "parenthesized_expression" => return self.unwrap_parens(node),
            "binary_expression" => {
                let op_text = self
                    .field(node, "operator")
                    .map(|o| self.text(o))
                    .ok_or_else(|| self.err(node, "binary operator"))?;
                let left = self.expression(
                    self.field(node, "left")
                        .ok_or_else(|| self.err(node, "binary left"))?,
                )?;
                let right = self.expression(
                    self.field(node, "right")
                        .ok_or_else(|| self.err(node, "binary right"))?,
                )?;
                match op_text {
                    "&&" => NodeKind::Logical {
                        op: LogicalOp::And,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    "||" => NodeKind::Logical {
                        op: LogicalOp::Or,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    "??" => NodeKind::Logical {
                        op: LogicalOp::Nullish,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    _ => NodeKind::Binary {
                        op: BinaryOp::from_str(op_text)
                            .ok_or_else(|| self.err(node, "binary operator"))?,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                }
            }
            "unary_expression" => {
                let op_text = self
                    .field(node, "operator")
                    .map(|o| self.text(o))
                    .ok_or_else(|| self.err(node, "unary operator"))?;
                let op = match op_text {
                    "-" => UnaryOp::Minus,
                    "+" => UnaryOp::Plus,
                    "!" => UnaryOp::Not,
                    "~" => UnaryOp::BitNot,
                    "typeof" => UnaryOp::TypeOf,
                    "void" => UnaryOp::Void,
                    "delete" => UnaryOp::Delete,
                    _ => return Err(self.err(node, "unary operator")),
                };
                NodeKind::Unary {
                    op,
                    argument: Box::new(self.expression(
                        self.field(node, "argument")
                            .ok_or_else(|| self.err(node, "unary argument"))?,
                    )?),
                }
            }
            "update_expression" => {
                let argument = self
                    .field(node, "argument")
                    .ok_or_else(|| self.err(node, "update argument"))?;
                let op = match self.field(node, "operator").map(|o| self.text(o)) {
                    Some("++") => UpdateOp::Increment,
                    _ => UpdateOp::Decrement,
                };
                let prefix = node
                    .child(0)
                    .is_some_and(|c| c.kind() == "++" || c.kind() == "--");
                NodeKind::Update {
                    op,
                    argument: Box::new(self.expression(argument)?),
                    prefix,
                }
            }
            "assignment_expression" => NodeKind::Assignment {
                op: AssignOp::Assign,
                left: Box::new(self.expression(
                    self.field(node, "left")
                        .ok_or_else(|| self.err(node, "assignment left"))?,
                )?),
                right: Box::new(self.expression(
                    self.field(node, "right")
                        .ok_or_else(|| self.err(node, "assignment right"))?,
                )?),
            },
            "augmented_assignment_expression" => {
                let op_text = self
                    .field(node, "operator")
                    .map(|o| self.text(o))
                    .ok_or_else(|| self.err(node, "assignment operator"))?;
                let op = match op_text {
                    "+=" => AssignOp::Add,
                    "-=" => AssignOp::Sub,
                    "*=" => AssignOp::Mul,
                    "/=" => AssignOp::Div,
                    "%=" => AssignOp::Mod,
                    "**=" => AssignOp::Exp,
                    "<<=" => AssignOp::ShiftLeft,
                    ">>=" => AssignOp::ShiftRight,
                    ">>>=" => AssignOp::ShiftRightUnsigned,
                    "&=" => AssignOp::BitAnd,
                    "|=" => AssignOp::BitOr,
                    "^=" => AssignOp::BitXor,
                    "&&=" => AssignOp::And,
                    "||=" => AssignOp::Or,
                    "??=" => AssignOp::Nullish,
                    _ => return Err(self.err(node, "assignment operator")),
                };
                NodeKind::Assignment {
                    op,
                    left: Box::new(self.expression(
                        self.field(node, "left")
                            .ok_or_else(|| self.err(node, "assignment left"))?,
                    )?),
                    right: Box::new(self.expression(
                        self.field(node, "right")
                            .ok_or_else(|| self.err(node, "assignment right"))?,
                    )?),
                }
            }
            "ternary_expression" => NodeKind::Conditional {
                test: Box::new(self.expression(
                    self.field(node, "condition")
                        .ok_or_else(|| self.err(node, "ternary condition"))?,
                )?),
                consequent: Box::new(self.expression(
                    self.field(node, "consequence")
                        .ok_or_else(|| self.err(node, "ternary consequence"))?,
                )?),
                alternate: Box::new(self.expression(
                    self.field(node, "alternative")
                        .ok_or_else(|| self.err(node, "ternary alternative"))?,
                )?),
            },
            "call_expression" => {
                let callee = self
                    .field(node, "function")
                    .ok_or_else(|| self.err(node, "call function"))?;
                let arguments = match self.field(node, "arguments") {
                    Some(args) if args.kind() == "arguments" => self
                        .named_children(args)
                        .into_iter()
                        .filter(|c| c.kind() != "comment")
                        .map(|c| self.expression(c))
                        .collect::<Result<Vec<_>>>()?,
                    // Tagged template: `tag\`…\`` parses as a call with a
                    // template argument.
                    Some(args) => {
                        let quasi = self.expression(args)?;
                        return Ok(Node::new(NodeKind::TaggedTemplate {
                            tag: Box::new(self.expression(callee)?),
                            quasi: Box::new(quasi),
                        })
                        .with_span(span));
                    }
                    None => Vec::new(),
                };
                let optional = node
                    .children(&mut node.walk())
                    .any(|c| c.kind() == "optional_chain");
                NodeKind::Call {
                    callee: Box::new(self.expression(callee)?),
                    arguments,
                    optional,
                }
            }
            "new_expression" => {
                let callee = self
                    .field(node, "constructor")
                    .ok_or_else(|| self.err(node, "new constructor"))?;
                let arguments = match self.field(node, "arguments") {
                    Some(args) => self
                        .named_children(args)
                        .into_iter()
                        .filter(|c| c.kind() != "comment")
                        .map(|c| self.expression(c))
                        .collect::<Result<Vec<_>>>()?,
                    None => Vec::new(),
                };
                NodeKind::New {
                    callee: Box::new(self.expression(callee)?),
                    arguments,
                }
            }
            "member_expression" => {
                let optional = node
                    .children(&mut node.walk())
                    .any(|c| c.kind() == "optional_chain");
                NodeKind::Member {
                    object: Box::new(self.expression(
                        self.field(node, "object")
                            .ok_or_else(|| self.err(node, "member object"))?,
                    )?),
                    property: Box::new(self.expression(
                        self.field(node, "property")
                            .ok_or_else(|| self.err(node, "member property"))?,
                    )?),
                    computed: false,
                    optional,
                }
            }
            "subscript_expression" => NodeKind::Member {
                object: Box::new(self.expression(
                    self.field(node, "object")
                        .ok_or_else(|| self.err(node, "subscript object"))?,
                )?),
                property: Box::new(self.expression(
                    self.field(node, "index")
                        .ok_or_else(|| self.err(node, "subscript index"))?,
                )?),
                computed: true,
                optional: false,
            },
            "sequence_expression" => NodeKind::Sequence {
                expressions: self
                    .named_children(node)
                    .into_iter()
                    .filter(|c| c.kind() != "comment")
                    .map(|c| self.expression(c))
                    .collect::<Result<Vec<_>>>()?,
            },
            "function_expression" | "function" | "generator_function" => {
                let (id, params, body, is_async) = self.function_parts(node)?;
                NodeKind::FunctionExpr {
                    id: id.map(Box::new),
                    params,
                    body: Box::new(body),
                    is_async,
                    is_generator: node.kind() == "generator_function",
                }
            }
            "arrow_function" => {
                let (_, params, body, is_async) = self.function_parts(node)?;
                let expression = !matches!(body.kind, NodeKind::Block { .. });
                NodeKind::Arrow {
                    params,
                    body: Box::new(body),
                    is_async,
                    expression,
                }
            }
            "class" => {
                let (id, super_class, body) = self.class_parts(node)?;
                NodeKind::ClassExpr {
                    id: id.map(Box::new),
                    super_class: super_class.map(Box::new),
                    body,
                }
            }
            "object" => NodeKind::Object {
                properties: self.object_properties(node)?,
            },
            "array" => NodeKind::Array {
                elements: self
                    .named_children(node)
                    .into_iter()
                    .filter(|c| c.kind() != "comment")
                    .map(|c| self.expression(c))
                    .collect::<Result<Vec<_>>>()?,
            },
            "spread_element" => NodeKind::Spread {
                argument: Box::new(self.expression(
                    self.named_children(node)
                        .into_iter()
                        .next()
                        .ok_or_else(|| self.err(node, "spread"))?,
                )?),
            },
            "template_string" => self.template_string(node)?,
            "await_expression" => NodeKind::Await {
                argument: Box::new(self.expression(
                    self.named_children(node)
                        .into_iter()
                        .next()
                        .ok_or_else(|| self.err(node, "await"))?,
                )?),
            },
            "yield_expression" => {
                let delegate = node.children(&mut node.walk()).any(|c| c.kind() == "*");
                NodeKind::Yield {
                    argument: self
                        .named_children(node)
                        .into_iter()
                        .next()
                        .map(|c| self.expression(c))
                        .transpose()?
                        .map(Box::new),
                    delegate,
                }
            }
            "object_pattern" => NodeKind::ObjectPattern {
                properties: self.object_properties(node)?,
            },
            "array_pattern" => NodeKind::ArrayPattern {
                elements: self
                    .named_children(node)
                    .into_iter()
                    .map(|c| self.expression(c))
                    .collect::<Result<Vec<_>>>()?,
            },
            "rest_pattern" | "rest_element" => NodeKind::RestElement {
                argument: Box::new(self.expression(
                    self.named_children(node)
                        .into_iter()
                        .next()
                        .ok_or_else(|| self.err(node, "rest pattern"))?,
                )?),
            },
            "assignment_pattern" => NodeKind::AssignPattern {
                left: Box::new(self.expression(
                    self.field(node, "left")
                        .ok_or_else(|| self.err(node, "pattern left"))?,
                )?),
                right: Box::new(self.expression(
                    self.field(node, "right")
                        .ok_or_else(|| self.err(node, "pattern right"))?,
                )?),
            },
            "pair" | "pair_pattern" => return self.pair(node),
            _ => return Err(self.err(node, "expression")),
        };
        Ok(Node::new(kind).with_span(span))
    }

    fn object_properties(&self, node: TsNode) -> Result<Vec<Node>> {
        let mut properties = Vec::new();
        for child in self.named_children(node) {
            match child.kind() {
                "comment" => {}
                "pair" | "pair_pattern" => properties.push(self.pair(child)?),
                "shorthand_property_identifier" | "shorthand_property_identifier_pattern" => {
                    let ident = self.expression(child)?;
                    properties.push(Node::new(NodeKind::Property {
                        key: Box::new(ident.clone()),
                        value: Box::new(ident),
                        kind: PropertyKind::Init,
                        computed: false,
                        shorthand: true,
                        method: false,
                    }));
                }
                "spread_element" | "rest_pattern" => properties.push(self.expression(child)?),
                "method_definition" => {
                    let key = self
                        .field(child, "name")
                        .ok_or_else(|| self.err(child, "method name"))?;
                    let (_, params, fn_body, is_async) = self.function_parts(child)?;
                    properties.push(Node::new(NodeKind::Property {
                        key: Box::new(self.expression(key)?),
                        value: Box::new(Node::new(NodeKind::FunctionExpr {
                            id: None,
                            params,
                            body: Box::new(fn_body),
                            is_async,
                            is_generator: false,
                        })),
                        kind: PropertyKind::Init,
                        computed: false,
                        shorthand: false,
                        method: true,
                    }));
                }
                _ => properties.push(self.expression(child)?),
            }
        }
        Ok(properties)
    }

    fn pair(&self, node: TsNode) -> Result<Node> {
        let key_node = self
            .field(node, "key")
            .ok_or_else(|| self.err(node, "pair key"))?;
        let computed = key_node.kind() == "computed_property_name";
        let key = if computed {
            let inner = self
                .named_children(key_node)
                .into_iter()
                .next()
                .ok_or_else(|| self.err(key_node, "computed key"))?;
            self.expression(inner)?
        } else {
            self.expression(key_node)?
        };
        let value = self.expression(
            self.field(node, "value")
                .ok_or_else(|| self.err(node, "pair value"))?,
        )?;
        Ok(Node::new(NodeKind::Property {
            key: Box::new(key),
            value: Box::new(value),
            kind: PropertyKind::Init,
            computed,
            shorthand: false,
            method: false,
        })
        .with_span(self.span(node)))
    }

    fn template_string(&self, node: TsNode) -> Result<NodeKind> {
        let mut quasis = Vec::new();
        let mut expressions = Vec::new();
        let mut current = String::new();
        for child in self.named_children(node) {
            match child.kind() {
                "template_substitution" => {
                    quasis.push(Node::new(NodeKind::TemplateElement {
                        cooked: Some(decode_string_escapes(&current)),
                        raw: std::mem::take(&mut current),
                        tail: false,
                    }));
                    let inner = self
                        .named_children(child)
                        .into_iter()
                        .next()
                        .ok_or_else(|| self.err(child, "template substitution"))?;
                    expressions.push(self.expression(inner)?);
                }
                "string_fragment" | "escape_sequence" => {
                    current.push_str(self.text(child));
                }
                _ => {}
            }
        }
        quasis.push(Node::new(NodeKind::TemplateElement {
            cooked: Some(decode_string_escapes(&current)),
            raw: current,
            tail: true,
        }));
        Ok(NodeKind::TemplateLiteral {
            quasis,
            expressions,
        })
    }
}

/// Parse a JavaScript numeric literal (hex, octal, binary, decimal,
/// trailing BigInt suffix tolerated).
fn parse_js_number(raw: &str) -> f64 {
    let cleaned: String = raw.chars().filter(|c| *c != '_').collect();
    let cleaned = cleaned.strip_suffix('n').unwrap_or(&cleaned);
    if let Some(hex) = cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        return u128::from_str_radix(hex, 16).map_or(f64::NAN, |v| v as f64);
    }
    if let Some(oct) = cleaned.strip_prefix("0o").or_else(|| cleaned.strip_prefix("0O")) {
        return u128::from_str_radix(oct, 8).map_or(f64::NAN, |v| v as f64);
    }
    if let Some(bin) = cleaned.strip_prefix("0b").or_else(|| cleaned.strip_prefix("0B")) {
        return u128::from_str_radix(bin, 2).map_or(f64::NAN, |v| v as f64);
    }
    cleaned.parse().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Node {
        parse_source(source, Path::new("test.js")).unwrap()
    }

    fn program_body(tree: &Node) -> &[Node] {
        match &tree.kind {
            NodeKind::Program { body } => body,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_parse_variable_declaration() {
        let tree = parse("var x = 2 + 3 * 4;");
        let body = program_body(&tree);
        assert_eq!(body.len(), 1);
        match &body[0].kind {
            NodeKind::VariableDecl { kind, declarations } => {
                assert_eq!(*kind, DeclKind::Var);
                match &declarations[0].kind {
                    NodeKind::VariableDeclarator { id, init } => {
                        assert_eq!(id.ident_name(), Some("x"));
                        assert!(matches!(
                            init.as_ref().unwrap().kind,
                            NodeKind::Binary { .. }
                        ));
                    }
                    _ => unreachable!(),
                }
            }
            other => panic!("expected var decl, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_string_cooks_escapes() {
        let tree = parse(r#"var s = "\x48\x65\x6c\x6c\x6f";"#);
        let mut found = false;
        tree.any_node(&mut |n| {
            if let NodeKind::String { value, raw } = &n.kind {
                assert_eq!(value, "Hello");
                assert!(raw.as_deref().unwrap().contains("\\x48"));
                found = true;
            }
            false
        });
        assert!(found);
    }

    #[test]
    fn test_parse_if_else_chain() {
        let tree = parse("if (a) { b(); } else if (c) { d(); } else { e(); }");
        match &program_body(&tree)[0].kind {
            NodeKind::If { alternate, .. } => {
                assert!(matches!(
                    alternate.as_ref().unwrap().kind,
                    NodeKind::If { .. }
                ));
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_iife_with_bang() {
        let tree = parse("!function(m){ return m; }([1]);");
        match &program_body(&tree)[0].kind {
            NodeKind::ExpressionStmt { expression } => {
                assert!(matches!(
                    expression.kind,
                    NodeKind::Unary {
                        op: UnaryOp::Not,
                        ..
                    }
                ));
            }
            other => panic!("expected expression stmt, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_sequence_and_logical() {
        let tree = parse("(a = 1, b = 2, c = 3); x && y();");
        let body = program_body(&tree);
        assert_eq!(body.len(), 2);
        match &body[0].kind {
            NodeKind::ExpressionStmt { expression } => match &expression.kind {
                NodeKind::Sequence { expressions } => assert_eq!(expressions.len(), 3),
                other => panic!("expected sequence, got {other:?}"),
            },
            _ => unreachable!(),
        }
        match &body[1].kind {
            NodeKind::ExpressionStmt { expression } => {
                assert!(matches!(
                    expression.kind,
                    NodeKind::Logical {
                        op: LogicalOp::And,
                        ..
                    }
                ));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_parse_switch_in_while() {
        let tree = parse(
            "while (true) { switch (s) { case '0': a(); continue; case '1': b(); continue; default: break; } }",
        );
        let mut cases_seen = 0;
        tree.any_node(&mut |n| {
            if let NodeKind::Switch { cases, .. } = &n.kind {
                cases_seen = cases.len();
            }
            false
        });
        assert_eq!(cases_seen, 3);
    }

    #[test]
    fn test_parse_member_and_subscript() {
        let tree = parse("a.b.c; a[\"d\"];");
        let body = program_body(&tree);
        match &body[0].kind {
            NodeKind::ExpressionStmt { expression } => {
                assert_eq!(expression.member_path().as_deref(), Some("a.b.c"));
            }
            _ => unreachable!(),
        }
        match &body[1].kind {
            NodeKind::ExpressionStmt { expression } => match &expression.kind {
                NodeKind::Member { computed, .. } => assert!(computed),
                other => panic!("expected member, got {other:?}"),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_js_number("14"), 14.0);
        assert_eq!(parse_js_number("0x10"), 16.0);
        assert_eq!(parse_js_number("0b101"), 5.0);
        assert_eq!(parse_js_number("0o17"), 15.0);
        assert_eq!(parse_js_number("1_000"), 1000.0);
        assert_eq!(parse_js_number("1.5e2"), 150.0);
    }

    #[test]
    fn test_parse_error_is_fatal() {
        let err = parse_source("var = = 2;", Path::new("bad.js")).unwrap_err();
        assert!(matches!(err, UnweaveError::Parse { .. }));
    }

    #[test]
    fn test_roundtrip_simple_program() {
        let source = "var x = 1;\nfunction add(a, b) {\n  return a + b;\n}\nadd(x, 2);\n";
        let tree = parse(source);
        let out = crate::codegen::generate(&tree).code;
        assert_eq!(out, source);
    }

    #[test]
    fn test_parse_template_string() {
        let tree = parse("var t = `a${x}b`;");
        let mut quasi_count = 0;
        let mut expr_count = 0;
        tree.any_node(&mut |n| {
            if let NodeKind::TemplateLiteral {
                quasis,
                expressions,
            } = &n.kind
            {
                quasi_count = quasis.len();
                expr_count = expressions.len();
            }
            false
        });
        assert_eq!(quasi_count, 2);
        assert_eq!(expr_count, 1);
    }
}
