//! JavaScript code generation.
//!
//! Emits readable source from the tree: two-space indentation,
//! statements on their own lines, parentheses only where precedence
//! demands them. String literals reuse their raw spelling when one
//! survived the rewrites; otherwise the cooked value is quoted and
//! re-escaped.

use crate::ast::{BinaryOp, DeclKind, LogicalOp, Node, NodeKind, PropertyKind, UnaryOp};

/// Generator output. A source map is not produced by this emitter.
pub struct Output {
    pub code: String,
    pub source_map: Option<String>,
}

/// Emit a whole tree.
pub fn generate(tree: &Node) -> Output {
    let mut emitter = Emitter::new();
    emitter.emit_node(tree);
    Output {
        code: emitter.out,
        source_map: None,
    }
}

/// Emit a single expression or statement (used for extracted modules).
pub fn generate_snippet(node: &Node) -> String {
    let mut emitter = Emitter::new();
    emitter.emit_node(node);
    emitter.out
}

struct Emitter {
    out: String,
    indent: usize,
}

// Operator precedence, loosest binding first.
const PREC_SEQUENCE: u8 = 1;
const PREC_ASSIGN: u8 = 2;
const PREC_CONDITIONAL: u8 = 3;
const PREC_NULLISH: u8 = 4;
const PREC_OR: u8 = 4;
const PREC_AND: u8 = 5;
const PREC_BIT_OR: u8 = 6;
const PREC_BIT_XOR: u8 = 7;
const PREC_BIT_AND: u8 = 8;
const PREC_EQUALITY: u8 = 9;
const PREC_RELATIONAL: u8 = 10;
const PREC_SHIFT: u8 = 11;
const PREC_ADDITIVE: u8 = 12;
const PREC_MULTIPLICATIVE: u8 = 13;
const PREC_EXP: u8 = 14;
const PREC_UNARY: u8 = 15;
const PREC_POSTFIX: u8 = 16;
const PREC_CALL: u8 = 17;
const PREC_PRIMARY: u8 = 20;

fn binary_prec(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => {
            PREC_EQUALITY
        }
        BinaryOp::Lt
        | BinaryOp::LtEq
        | BinaryOp::Gt
        | BinaryOp::GtEq
        | BinaryOp::In
        | BinaryOp::InstanceOf => PREC_RELATIONAL,
        BinaryOp::ShiftLeft | BinaryOp::ShiftRight | BinaryOp::ShiftRightUnsigned => PREC_SHIFT,
        BinaryOp::Add | BinaryOp::Sub => PREC_ADDITIVE,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => PREC_MULTIPLICATIVE,
        BinaryOp::Exp => PREC_EXP,
        BinaryOp::BitAnd => PREC_BIT_AND,
        BinaryOp::BitOr => PREC_BIT_OR,
        BinaryOp::BitXor => PREC_BIT_XOR,
    }
}

fn expr_prec(node: &Node) -> u8 {
    match &node.kind {
        NodeKind::Sequence { .. } => PREC_SEQUENCE,
        NodeKind::Assignment { .. } | NodeKind::Arrow { .. } | NodeKind::Yield { .. } => {
            PREC_ASSIGN
        }
        NodeKind::Conditional { .. } => PREC_CONDITIONAL,
        NodeKind::Logical { op, .. } => match op {
            LogicalOp::And => PREC_AND,
            LogicalOp::Or => PREC_OR,
            LogicalOp::Nullish => PREC_NULLISH,
        },
        NodeKind::Binary { op, .. } => binary_prec(*op),
        NodeKind::Unary { .. } | NodeKind::Await { .. } => PREC_UNARY,
        NodeKind::Update { prefix, .. } => {
            if *prefix {
                PREC_UNARY
            } else {
                PREC_POSTFIX
            }
        }
        NodeKind::Call { .. } | NodeKind::New { .. } | NodeKind::Member { .. } => PREC_CALL,
        _ => PREC_PRIMARY,
    }
}

/// True when an expression statement would mis-parse because its first
/// token opens a function, class or object literal.
fn needs_statement_parens(expr: &Node) -> bool {
    match &expr.kind {
        NodeKind::FunctionExpr { .. } | NodeKind::ClassExpr { .. } | NodeKind::Object { .. } => {
            true
        }
        NodeKind::Call { callee, .. } | NodeKind::New { callee, .. } => {
            needs_statement_parens(callee)
        }
        NodeKind::Member { object, .. } => needs_statement_parens(object),
        NodeKind::Binary { left, .. }
        | NodeKind::Logical { left, .. }
        | NodeKind::Assignment { left, .. } => needs_statement_parens(left),
        NodeKind::Sequence { expressions } => {
            expressions.first().is_some_and(needs_statement_parens)
        }
        _ => false,
    }
}

impl Emitter {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    fn line_start(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn newline(&mut self) {
        self.out.push('\n');
    }

    fn emit_node(&mut self, node: &Node) {
        match &node.kind {
            NodeKind::Program { body } => {
                for stmt in body {
                    self.emit_stmt(stmt);
                }
            }
            _ => self.emit_stmt(node),
        }
    }

    fn emit_stmt(&mut self, stmt: &Node) {
        self.line_start();
        self.emit_stmt_inner(stmt);
        self.newline();
    }

    fn emit_stmt_inner(&mut self, stmt: &Node) {
        match &stmt.kind {
            NodeKind::Block { body } => {
                self.out.push('{');
                self.newline();
                self.indent += 1;
                for s in body {
                    self.emit_stmt(s);
                }
                self.indent -= 1;
                self.line_start();
                self.out.push('}');
            }
            NodeKind::ExpressionStmt { expression } => {
                if needs_statement_parens(expression) {
                    self.out.push('(');
                    self.emit_expr(expression, PREC_SEQUENCE);
                    self.out.push(')');
                } else {
                    self.emit_expr(expression, PREC_SEQUENCE);
                }
                self.out.push(';');
            }
            NodeKind::VariableDecl { kind, declarations } => {
                self.emit_variable_decl(*kind, declarations);
                self.out.push(';');
            }
            NodeKind::FunctionDecl {
                id,
                params,
                body,
                is_async,
                is_generator,
            } => {
                if *is_async {
                    self.out.push_str("async ");
                }
                self.out.push_str("function");
                if *is_generator {
                    self.out.push('*');
                }
                if let Some(id) = id {
                    self.out.push(' ');
                    self.emit_expr(id, PREC_PRIMARY);
                }
                self.emit_params(params);
                self.out.push(' ');
                self.emit_stmt_inner(body);
            }
            NodeKind::ClassDecl {
                id,
                super_class,
                body,
            } => self.emit_class(id.as_deref(), super_class.as_deref(), body),
            NodeKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.out.push_str("if (");
                self.emit_expr(test, PREC_SEQUENCE);
                self.out.push_str(") ");
                self.emit_stmt_inner(consequent);
                if let Some(alt) = alternate {
                    self.out.push_str(" else ");
                    self.emit_stmt_inner(alt);
                }
            }
            NodeKind::For {
                init,
                test,
                update,
                body,
            } => {
                self.out.push_str("for (");
                if let Some(init) = init {
                    match &init.kind {
                        NodeKind::VariableDecl { kind, declarations } => {
                            self.emit_variable_decl(*kind, declarations);
                        }
                        _ => self.emit_expr(init, PREC_SEQUENCE),
                    }
                }
                self.out.push_str("; ");
                if let Some(test) = test {
                    self.emit_expr(test, PREC_SEQUENCE);
                }
                self.out.push_str("; ");
                if let Some(update) = update {
                    self.emit_expr(update, PREC_SEQUENCE);
                }
                self.out.push_str(") ");
                self.emit_stmt_inner(body);
            }
            NodeKind::ForIn { left, right, body } => {
                self.emit_for_each("in", left, right, body);
            }
            NodeKind::ForOf { left, right, body } => {
                self.emit_for_each("of", left, right, body);
            }
            NodeKind::While { test, body } => {
                self.out.push_str("while (");
                self.emit_expr(test, PREC_SEQUENCE);
                self.out.push_str(") ");
                self.emit_stmt_inner(body);
            }
            NodeKind::DoWhile { body, test } => {
                self.out.push_str("do ");
                self.emit_stmt_inner(body);
                self.out.push_str(" while (");
                self.emit_expr(test, PREC_SEQUENCE);
                self.out.push_str(");");
            }
            NodeKind::Switch {
                discriminant,
                cases,
            } => {
                self.out.push_str("switch (");
                self.emit_expr(discriminant, PREC_SEQUENCE);
                self.out.push_str(") {");
                self.newline();
                self.indent += 1;
                for case in cases {
                    self.line_start();
                    self.emit_stmt_inner(case);
                    self.newline();
                }
                self.indent -= 1;
                self.line_start();
                self.out.push('}');
            }
            NodeKind::SwitchCase { test, consequent } => {
                match test {
                    Some(test) => {
                        self.out.push_str("case ");
                        self.emit_expr(test, PREC_SEQUENCE);
                        self.out.push(':');
                    }
                    None => self.out.push_str("default:"),
                }
                self.newline();
                self.indent += 1;
                for s in consequent {
                    self.emit_stmt(s);
                }
                self.indent -= 1;
                // Trim the trailing newline the loop added; the caller
                // terminates the case line.
                if self.out.ends_with('\n') {
                    self.out.pop();
                }
            }
            NodeKind::Return { argument } => {
                self.out.push_str("return");
                if let Some(argument) = argument {
                    self.out.push(' ');
                    self.emit_expr(argument, PREC_SEQUENCE);
                }
                self.out.push(';');
            }
            NodeKind::Throw { argument } => {
                self.out.push_str("throw ");
                self.emit_expr(argument, PREC_SEQUENCE);
                self.out.push(';');
            }
            NodeKind::Try {
                block,
                handler,
                finalizer,
            } => {
                self.out.push_str("try ");
                self.emit_stmt_inner(block);
                if let Some(handler) = handler {
                    self.emit_stmt_inner(handler);
                }
                if let Some(finalizer) = finalizer {
                    self.out.push_str(" finally ");
                    self.emit_stmt_inner(finalizer);
                }
            }
            NodeKind::CatchClause { param, body } => {
                self.out.push_str(" catch ");
                if let Some(param) = param {
                    self.out.push('(');
                    self.emit_expr(param, PREC_SEQUENCE);
                    self.out.push_str(") ");
                }
                self.emit_stmt_inner(body);
            }
            NodeKind::Break { label } => {
                self.out.push_str("break");
                if let Some(label) = label {
                    self.out.push(' ');
                    self.emit_expr(label, PREC_PRIMARY);
                }
                self.out.push(';');
            }
            NodeKind::Continue { label } => {
                self.out.push_str("continue");
                if let Some(label) = label {
                    self.out.push(' ');
                    self.emit_expr(label, PREC_PRIMARY);
                }
                self.out.push(';');
            }
            NodeKind::Labeled { label, body } => {
                self.emit_expr(label, PREC_PRIMARY);
                self.out.push_str(": ");
                self.emit_stmt_inner(body);
            }
            NodeKind::Empty => self.out.push(';'),
            NodeKind::Debugger => self.out.push_str("debugger;"),
            _ => {
                // An expression in statement position.
                self.emit_expr(stmt, PREC_SEQUENCE);
                self.out.push(';');
            }
        }
    }

    fn emit_for_each(&mut self, keyword: &str, left: &Node, right: &Node, body: &Node) {
        self.out.push_str("for (");
        match &left.kind {
            NodeKind::VariableDecl { kind, declarations } => {
                self.emit_variable_decl(*kind, declarations);
            }
            _ => self.emit_expr(left, PREC_ASSIGN),
        }
        self.out.push(' ');
        self.out.push_str(keyword);
        self.out.push(' ');
        self.emit_expr(right, PREC_SEQUENCE);
        self.out.push_str(") ");
        self.emit_stmt_inner(body);
    }

    fn emit_variable_decl(&mut self, kind: DeclKind, declarations: &[Node]) {
        self.out.push_str(kind.as_str());
        self.out.push(' ');
        for (i, decl) in declarations.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            if let NodeKind::VariableDeclarator { id, init } = &decl.kind {
                self.emit_expr(id, PREC_PRIMARY);
                if let Some(init) = init {
                    self.out.push_str(" = ");
                    self.emit_expr(init, PREC_ASSIGN);
                }
            }
        }
    }

    fn emit_class(&mut self, id: Option<&Node>, super_class: Option<&Node>, body: &[Node]) {
        self.out.push_str("class");
        if let Some(id) = id {
            self.out.push(' ');
            self.emit_expr(id, PREC_PRIMARY);
        }
        if let Some(sup) = super_class {
            self.out.push_str(" extends ");
            self.emit_expr(sup, PREC_CALL);
        }
        self.out.push_str(" {");
        self.newline();
        self.indent += 1;
        for member in body {
            self.line_start();
            if let NodeKind::MethodDef {
                key,
                value,
                computed,
                is_static,
            } = &member.kind
            {
                if *is_static {
                    self.out.push_str("static ");
                }
                if *computed {
                    self.out.push('[');
                    self.emit_expr(key, PREC_SEQUENCE);
                    self.out.push(']');
                } else {
                    self.emit_expr(key, PREC_PRIMARY);
                }
                if let NodeKind::FunctionExpr { params, body, .. } = &value.kind {
                    self.emit_params(params);
                    self.out.push(' ');
                    self.emit_stmt_inner(body);
                }
            }
            self.newline();
        }
        self.indent -= 1;
        self.line_start();
        self.out.push('}');
    }

    fn emit_params(&mut self, params: &[Node]) {
        self.out.push('(');
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.emit_expr(param, PREC_ASSIGN);
        }
        self.out.push(')');
    }

    fn emit_expr(&mut self, node: &Node, min_prec: u8) {
        let prec = expr_prec(node);
        let parens = prec < min_prec;
        if parens {
            self.out.push('(');
        }
        self.emit_expr_inner(node, prec);
        if parens {
            self.out.push(')');
        }
    }

    fn emit_expr_inner(&mut self, node: &Node, prec: u8) {
        match &node.kind {
            NodeKind::Ident { name } => self.out.push_str(name),
            NodeKind::This => self.out.push_str("this"),
            NodeKind::SuperExpr => self.out.push_str("super"),
            NodeKind::String { value, raw } => match raw {
                Some(raw) => self.out.push_str(raw),
                None => self.out.push_str(&quote_string(value)),
            },
            NodeKind::Number { value, raw } => match raw {
                Some(raw) => self.out.push_str(raw),
                None => self
                    .out
                    .push_str(&crate::rewrite::js_number_to_string(*value)),
            },
            NodeKind::Bool { value } => self.out.push_str(if *value { "true" } else { "false" }),
            NodeKind::Null => self.out.push_str("null"),
            NodeKind::Regex { pattern, flags } => {
                self.out.push('/');
                self.out.push_str(pattern);
                self.out.push('/');
                self.out.push_str(flags);
            }
            NodeKind::Hole => {}
            NodeKind::Sequence { expressions } => {
                for (i, expr) in expressions.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.emit_expr(expr, PREC_ASSIGN);
                }
            }
            NodeKind::Assignment { op, left, right } => {
                self.emit_expr(left, PREC_POSTFIX);
                self.out.push(' ');
                self.out.push_str(op.as_str());
                self.out.push(' ');
                self.emit_expr(right, PREC_ASSIGN);
            }
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.emit_expr(test, PREC_CONDITIONAL + 1);
                self.out.push_str(" ? ");
                self.emit_expr(consequent, PREC_ASSIGN);
                self.out.push_str(" : ");
                self.emit_expr(alternate, PREC_ASSIGN);
            }
            NodeKind::Logical { op, left, right } => {
                self.emit_expr(left, prec);
                self.out.push(' ');
                self.out.push_str(op.as_str());
                self.out.push(' ');
                self.emit_expr(right, prec + 1);
            }
            NodeKind::Binary { op, left, right } => {
                let (lp, rp) = if *op == BinaryOp::Exp {
                    (prec + 1, prec)
                } else {
                    (prec, prec + 1)
                };
                self.emit_expr(left, lp);
                self.out.push(' ');
                self.out.push_str(op.as_str());
                self.out.push(' ');
                self.emit_expr(right, rp);
            }
            NodeKind::Unary { op, argument } => {
                self.out.push_str(op.as_str());
                if matches!(op, UnaryOp::TypeOf | UnaryOp::Void | UnaryOp::Delete) {
                    self.out.push(' ');
                }
                self.emit_expr(argument, PREC_UNARY);
            }
            NodeKind::Update {
                op,
                argument,
                prefix,
            } => {
                if *prefix {
                    self.out.push_str(op.as_str());
                    self.emit_expr(argument, PREC_UNARY);
                } else {
                    self.emit_expr(argument, PREC_POSTFIX);
                    self.out.push_str(op.as_str());
                }
            }
            NodeKind::Call {
                callee,
                arguments,
                optional,
            } => {
                self.emit_expr(callee, PREC_CALL);
                if *optional {
                    self.out.push_str("?.");
                }
                self.emit_arguments(arguments);
            }
            NodeKind::New { callee, arguments } => {
                self.out.push_str("new ");
                self.emit_expr(callee, PREC_CALL + 1);
                self.emit_arguments(arguments);
            }
            NodeKind::Member {
                object,
                property,
                computed,
                optional,
            } => {
                self.emit_expr(object, PREC_CALL);
                if *computed {
                    if *optional {
                        self.out.push_str("?.");
                    }
                    self.out.push('[');
                    self.emit_expr(property, PREC_SEQUENCE);
                    self.out.push(']');
                } else {
                    self.out.push_str(if *optional { "?." } else { "." });
                    self.emit_expr(property, PREC_PRIMARY);
                }
            }
            NodeKind::FunctionExpr {
                id,
                params,
                body,
                is_async,
                is_generator,
            } => {
                if *is_async {
                    self.out.push_str("async ");
                }
                self.out.push_str("function");
                if *is_generator {
                    self.out.push('*');
                }
                if let Some(id) = id {
                    self.out.push(' ');
                    self.emit_expr(id, PREC_PRIMARY);
                }
                self.emit_params(params);
                self.out.push(' ');
                self.emit_stmt_inner(body);
            }
            NodeKind::Arrow {
                params,
                body,
                is_async,
                expression,
            } => {
                if *is_async {
                    self.out.push_str("async ");
                }
                self.emit_params(params);
                self.out.push_str(" => ");
                if *expression {
                    self.emit_expr(body, PREC_ASSIGN);
                } else {
                    self.emit_stmt_inner(body);
                }
            }
            NodeKind::ClassExpr {
                id,
                super_class,
                body,
            } => self.emit_class(id.as_deref(), super_class.as_deref(), body),
            NodeKind::Object { properties } => {
                if properties.is_empty() {
                    self.out.push_str("{}");
                    return;
                }
                self.out.push('{');
                self.newline();
                self.indent += 1;
                for (i, prop) in properties.iter().enumerate() {
                    self.line_start();
                    self.emit_property(prop);
                    if i + 1 < properties.len() {
                        self.out.push(',');
                    }
                    self.newline();
                }
                self.indent -= 1;
                self.line_start();
                self.out.push('}');
            }
            NodeKind::Property { .. } => self.emit_property(node),
            NodeKind::Array { elements } => {
                self.out.push('[');
                for (i, el) in elements.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    if !matches!(el.kind, NodeKind::Hole) {
                        self.emit_expr(el, PREC_ASSIGN);
                    }
                }
                self.out.push(']');
            }
            NodeKind::Spread { argument } => {
                self.out.push_str("...");
                self.emit_expr(argument, PREC_ASSIGN);
            }
            NodeKind::TemplateLiteral {
                quasis,
                expressions,
            } => {
                self.out.push('`');
                for (i, quasi) in quasis.iter().enumerate() {
                    if let NodeKind::TemplateElement { raw, .. } = &quasi.kind {
                        self.out.push_str(raw);
                    }
                    if let Some(expr) = expressions.get(i) {
                        self.out.push_str("${");
                        self.emit_expr(expr, PREC_SEQUENCE);
                        self.out.push('}');
                    }
                }
                self.out.push('`');
            }
            NodeKind::TaggedTemplate { tag, quasi } => {
                self.emit_expr(tag, PREC_CALL);
                self.emit_expr(quasi, PREC_PRIMARY);
            }
            NodeKind::Yield { argument, delegate } => {
                self.out.push_str("yield");
                if *delegate {
                    self.out.push('*');
                }
                if let Some(argument) = argument {
                    self.out.push(' ');
                    self.emit_expr(argument, PREC_ASSIGN);
                }
            }
            NodeKind::Await { argument } => {
                self.out.push_str("await ");
                self.emit_expr(argument, PREC_UNARY);
            }
            NodeKind::ObjectPattern { properties } => {
                self.out.push('{');
                for (i, prop) in properties.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.emit_property(prop);
                }
                self.out.push('}');
            }
            NodeKind::ArrayPattern { elements } => {
                self.out.push('[');
                for (i, el) in elements.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    if !matches!(el.kind, NodeKind::Hole) {
                        self.emit_expr(el, PREC_ASSIGN);
                    }
                }
                self.out.push(']');
            }
            NodeKind::RestElement { argument } => {
                self.out.push_str("...");
                self.emit_expr(argument, PREC_ASSIGN);
            }
            NodeKind::AssignPattern { left, right } => {
                self.emit_expr(left, PREC_PRIMARY);
                self.out.push_str(" = ");
                self.emit_expr(right, PREC_ASSIGN);
            }
            // Statement kinds reached via expression position emit as
            // statements; this keeps the emitter total.
            _ => self.emit_stmt_inner(node),
        }
    }

    fn emit_arguments(&mut self, arguments: &[Node]) {
        self.out.push('(');
        for (i, arg) in arguments.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.emit_expr(arg, PREC_ASSIGN);
        }
        self.out.push(')');
    }

    fn emit_property(&mut self, prop: &Node) {
        let NodeKind::Property {
            key,
            value,
            kind,
            computed,
            shorthand,
            method,
        } = &prop.kind
        else {
            if let NodeKind::Spread { argument } = &prop.kind {
                self.out.push_str("...");
                self.emit_expr(argument, PREC_ASSIGN);
            }
            return;
        };

        match kind {
            PropertyKind::Get => self.out.push_str("get "),
            PropertyKind::Set => self.out.push_str("set "),
            PropertyKind::Init => {}
        }

        if *shorthand {
            self.emit_expr(key, PREC_PRIMARY);
            return;
        }

        if *computed {
            self.out.push('[');
            self.emit_expr(key, PREC_SEQUENCE);
            self.out.push(']');
        } else {
            self.emit_expr(key, PREC_PRIMARY);
        }

        if *method || !matches!(kind, PropertyKind::Init) {
            if let NodeKind::FunctionExpr { params, body, .. } = &value.kind {
                self.emit_params(params);
                self.out.push(' ');
                self.emit_stmt_inner(body);
                return;
            }
        }

        self.out.push_str(": ");
        self.emit_expr(value, PREC_ASSIGN);
    }
}

/// Quote a cooked string value, escaping only what the literal form
/// requires.
fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, DeclKind};

    fn var_decl(name: &str, init: Node) -> Node {
        Node::new(NodeKind::VariableDecl {
            kind: DeclKind::Var,
            declarations: vec![Node::new(NodeKind::VariableDeclarator {
                id: Box::new(Node::ident(name)),
                init: Some(Box::new(init)),
            })],
        })
    }

    #[test]
    fn test_emit_variable_declaration() {
        let tree = Node::new(NodeKind::Program {
            body: vec![var_decl("x", Node::number(14.0))],
        });
        assert_eq!(generate(&tree).code, "var x = 14;\n");
    }

    #[test]
    fn test_emit_string_prefers_raw() {
        let tree = Node::new(NodeKind::Program {
            body: vec![var_decl(
                "s",
                Node::new(NodeKind::String {
                    value: "a\nb".to_string(),
                    raw: Some("'a\\nb'".to_string()),
                }),
            )],
        });
        assert_eq!(generate(&tree).code, "var s = 'a\\nb';\n");
    }

    #[test]
    fn test_emit_string_quotes_cooked_value() {
        let tree = Node::new(NodeKind::Program {
            body: vec![var_decl("s", Node::string("Hello"))],
        });
        assert_eq!(generate(&tree).code, "var s = \"Hello\";\n");
    }

    #[test]
    fn test_precedence_parens() {
        // (1 + 2) * 3 keeps its parens; 1 + 2 * 3 has none.
        let grouped = Node::new(NodeKind::Binary {
            op: BinaryOp::Mul,
            left: Box::new(Node::new(NodeKind::Binary {
                op: BinaryOp::Add,
                left: Box::new(Node::number(1.0)),
                right: Box::new(Node::number(2.0)),
            })),
            right: Box::new(Node::number(3.0)),
        });
        let tree = Node::new(NodeKind::Program {
            body: vec![Node::expression_stmt(grouped)],
        });
        assert_eq!(generate(&tree).code, "(1 + 2) * 3;\n");

        let flat = Node::new(NodeKind::Binary {
            op: BinaryOp::Add,
            left: Box::new(Node::number(1.0)),
            right: Box::new(Node::new(NodeKind::Binary {
                op: BinaryOp::Mul,
                left: Box::new(Node::number(2.0)),
                right: Box::new(Node::number(3.0)),
            })),
        });
        let tree = Node::new(NodeKind::Program {
            body: vec![Node::expression_stmt(flat)],
        });
        assert_eq!(generate(&tree).code, "1 + 2 * 3;\n");
    }

    #[test]
    fn test_iife_gets_statement_parens() {
        let iife = Node::new(NodeKind::Call {
            callee: Box::new(Node::new(NodeKind::FunctionExpr {
                id: None,
                params: Vec::new(),
                body: Box::new(Node::block(Vec::new())),
                is_async: false,
                is_generator: false,
            })),
            arguments: Vec::new(),
            optional: false,
        });
        let tree = Node::new(NodeKind::Program {
            body: vec![Node::expression_stmt(iife)],
        });
        let code = generate(&tree).code;
        assert!(code.starts_with("(function"), "got: {code}");
    }

    #[test]
    fn test_if_else_layout() {
        let tree = Node::new(NodeKind::Program {
            body: vec![Node::new(NodeKind::If {
                test: Box::new(Node::ident("c")),
                consequent: Box::new(Node::block(vec![Node::expression_stmt(Node::ident(
                    "a",
                ))])),
                alternate: Some(Box::new(Node::block(vec![Node::expression_stmt(
                    Node::ident("b"),
                )]))),
            })],
        });
        assert_eq!(
            generate(&tree).code,
            "if (c) {\n  a;\n} else {\n  b;\n}\n"
        );
    }

    #[test]
    fn test_member_and_call_chain() {
        let expr = Node::new(NodeKind::Call {
            callee: Box::new(Node::new(NodeKind::Member {
                object: Box::new(Node::ident("console")),
                property: Box::new(Node::ident("log")),
                computed: false,
                optional: false,
            })),
            arguments: vec![Node::string("hi"), Node::number(2.0)],
            optional: false,
        });
        let tree = Node::new(NodeKind::Program {
            body: vec![Node::expression_stmt(expr)],
        });
        assert_eq!(generate(&tree).code, "console.log(\"hi\", 2);\n");
    }

    #[test]
    fn test_computed_member() {
        let expr = Node::new(NodeKind::Member {
            object: Box::new(Node::ident("arr")),
            property: Box::new(Node::number(3.0)),
            computed: true,
            optional: false,
        });
        let tree = Node::new(NodeKind::Program {
            body: vec![Node::expression_stmt(expr)],
        });
        assert_eq!(generate(&tree).code, "arr[3];\n");
    }
}
