//! Constant folding with JavaScript semantics.
//!
//! Fires only when both operands of a binary (or the argument of a
//! unary) are syntactic literals of compatible kind. Division and modulo
//! by zero are left alone so the runtime exception/Infinity semantics of
//! the original program survive. Arithmetic is IEEE-754 double;
//! bitwise operators go through ToInt32/ToUint32 the way the language
//! specifies.

use crate::ast::{BinaryOp, LogicalOp, Node, NodeKind, ParentChain, UnaryOp, VisitAction};
use crate::context::ProcessingContext;
use crate::error::Result;
use crate::rewrite::Rewriter;

/// Render a double the way JavaScript's ToString does for the common
/// cases: no trailing `.0`, `NaN`, signed `Infinity`.
pub fn js_number_to_string(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if v == 0.0 {
        "0".to_string()
    } else {
        format!("{v}")
    }
}

/// JavaScript ToString for the literal kinds the folder concatenates.
fn literal_to_js_string(node: &Node) -> Option<String> {
    match &node.kind {
        NodeKind::String { value, .. } => Some(value.clone()),
        NodeKind::Number { value, .. } => Some(js_number_to_string(*value)),
        NodeKind::Bool { value } => Some(value.to_string()),
        NodeKind::Null => Some("null".to_string()),
        _ => None,
    }
}

/// JavaScript ToInt32.
fn to_int32(v: f64) -> i32 {
    if !v.is_finite() {
        return 0;
    }
    let m = v.trunc() as i64;
    (m & 0xFFFF_FFFF) as u32 as i32
}

/// JavaScript ToUint32.
fn to_uint32(v: f64) -> u32 {
    to_int32(v) as u32
}

enum Folded {
    Kind(NodeKind),
    KeepLeft,
    KeepRight,
}

fn num(value: f64) -> Folded {
    Folded::Kind(NodeKind::Number { value, raw: None })
}

fn boolean(value: bool) -> Folded {
    Folded::Kind(NodeKind::Bool { value })
}

fn string(value: String) -> Folded {
    Folded::Kind(NodeKind::String { value, raw: None })
}

fn fold_binary(op: BinaryOp, left: &Node, right: &Node) -> Option<Folded> {
    if !left.is_literal() || !right.is_literal() {
        return None;
    }

    // String concatenation fires when either operand is a string.
    if op == BinaryOp::Add
        && (matches!(left.kind, NodeKind::String { .. })
            || matches!(right.kind, NodeKind::String { .. }))
    {
        let l = literal_to_js_string(left)?;
        let r = literal_to_js_string(right)?;
        return Some(string(l + &r));
    }

    if let (Some(a), Some(b)) = (left.number_value(), right.number_value()) {
        return Some(match op {
            BinaryOp::Add => num(a + b),
            BinaryOp::Sub => num(a - b),
            BinaryOp::Mul => num(a * b),
            BinaryOp::Exp => num(a.powf(b)),
            // Preserves the runtime Infinity/NaN surprise.
            BinaryOp::Div if b == 0.0 => return None,
            BinaryOp::Div => num(a / b),
            BinaryOp::Mod if b == 0.0 => return None,
            BinaryOp::Mod => num(a % b),
            BinaryOp::BitAnd => num(f64::from(to_int32(a) & to_int32(b))),
            BinaryOp::BitOr => num(f64::from(to_int32(a) | to_int32(b))),
            BinaryOp::BitXor => num(f64::from(to_int32(a) ^ to_int32(b))),
            BinaryOp::ShiftLeft => num(f64::from(to_int32(a) << (to_uint32(b) & 31))),
            BinaryOp::ShiftRight => num(f64::from(to_int32(a) >> (to_uint32(b) & 31))),
            BinaryOp::ShiftRightUnsigned => num(f64::from(to_uint32(a) >> (to_uint32(b) & 31))),
            BinaryOp::Lt => boolean(a < b),
            BinaryOp::LtEq => boolean(a <= b),
            BinaryOp::Gt => boolean(a > b),
            BinaryOp::GtEq => boolean(a >= b),
            BinaryOp::Eq | BinaryOp::StrictEq => boolean(a == b),
            BinaryOp::NotEq | BinaryOp::StrictNotEq => boolean(a != b),
            BinaryOp::In | BinaryOp::InstanceOf => return None,
        });
    }

    if let (Some(a), Some(b)) = (left.string_value(), right.string_value()) {
        return Some(match op {
            BinaryOp::Lt => boolean(a < b),
            BinaryOp::LtEq => boolean(a <= b),
            BinaryOp::Gt => boolean(a > b),
            BinaryOp::GtEq => boolean(a >= b),
            BinaryOp::Eq | BinaryOp::StrictEq => boolean(a == b),
            BinaryOp::NotEq | BinaryOp::StrictNotEq => boolean(a != b),
            _ => return None,
        });
    }

    if let (NodeKind::Bool { value: a }, NodeKind::Bool { value: b }) = (&left.kind, &right.kind) {
        return Some(match op {
            BinaryOp::Eq | BinaryOp::StrictEq => boolean(a == b),
            BinaryOp::NotEq | BinaryOp::StrictNotEq => boolean(a != b),
            _ => return None,
        });
    }

    if matches!(left.kind, NodeKind::Null) && matches!(right.kind, NodeKind::Null) {
        return Some(match op {
            BinaryOp::Eq | BinaryOp::StrictEq => boolean(true),
            BinaryOp::NotEq | BinaryOp::StrictNotEq => boolean(false),
            _ => return None,
        });
    }

    // Distinct literal kinds never compare strictly equal.
    match op {
        BinaryOp::StrictEq => Some(boolean(false)),
        BinaryOp::StrictNotEq => Some(boolean(true)),
        _ => None,
    }
}

fn fold_unary(op: UnaryOp, argument: &Node) -> Option<Folded> {
    if !argument.is_literal() {
        return None;
    }
    match op {
        UnaryOp::Minus => argument.number_value().map(|v| num(-v)),
        UnaryOp::Plus => argument.number_value().map(num),
        UnaryOp::Not => argument.truthiness().map(|t| boolean(!t)),
        UnaryOp::BitNot => argument.number_value().map(|v| num(f64::from(!to_int32(v)))),
        UnaryOp::TypeOf => {
            let name = match argument.kind {
                NodeKind::Number { .. } => "number",
                NodeKind::String { .. } => "string",
                NodeKind::Bool { .. } => "boolean",
                NodeKind::Null => "object",
                _ => return None,
            };
            Some(string(name.to_string()))
        }
        UnaryOp::Void => Some(Folded::Kind(NodeKind::Ident {
            name: "undefined".to_string(),
        })),
        UnaryOp::Delete => None,
    }
}

fn fold_logical(op: LogicalOp, left: &Node) -> Option<Folded> {
    match op {
        LogicalOp::And | LogicalOp::Or => {
            if !left.is_literal() {
                return None;
            }
            let truthy = left.truthiness()?;
            Some(match (op, truthy) {
                (LogicalOp::And, false) | (LogicalOp::Or, true) => Folded::KeepLeft,
                _ => Folded::KeepRight,
            })
        }
        LogicalOp::Nullish => match left.kind {
            NodeKind::Null => Some(Folded::KeepRight),
            _ if left.is_literal() => Some(Folded::KeepLeft),
            _ => None,
        },
    }
}

pub struct ConstantFold;

impl Rewriter for ConstantFold {
    fn name(&self) -> &'static str {
        "fold-constants"
    }

    fn rewrite(
        &self,
        node: &mut Node,
        _ctx: &mut ProcessingContext,
        _chain: &ParentChain,
    ) -> Result<VisitAction> {
        let folded = match &node.kind {
            NodeKind::Binary { op, left, right } => fold_binary(*op, left, right),
            NodeKind::Unary { op, argument } => fold_unary(*op, argument),
            NodeKind::Logical { op, left, .. } => fold_logical(*op, left),
            _ => None,
        };

        match folded {
            Some(Folded::Kind(kind)) => {
                node.kind = kind;
                Ok(VisitAction::changed())
            }
            Some(keep) => {
                if let NodeKind::Logical { left, right, .. } = &mut node.kind {
                    let side = match keep {
                        Folded::KeepLeft => left,
                        _ => right,
                    };
                    let taken = std::mem::replace(&mut **side, Node::empty_stmt());
                    *node = taken;
                }
                Ok(VisitAction::changed())
            }
            None => Ok(VisitAction::unchanged()),
        }
    }
}
