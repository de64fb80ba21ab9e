//! Boolean and `undefined` recovery.
//!
//! Obfuscators spell constants as `!0`, `!1` and `void 0`; this rewriter
//! restores the readable forms. It runs both as a pre-pass and inside the
//! main loop so literals synthesized by other rewriters normalize too.

use crate::ast::{Node, NodeKind, ParentChain, UnaryOp, VisitAction};
use crate::context::ProcessingContext;
use crate::error::Result;
use crate::rewrite::Rewriter;

pub struct BooleanRecovery;

impl Rewriter for BooleanRecovery {
    fn name(&self) -> &'static str {
        "recover-booleans"
    }

    fn rewrite(
        &self,
        node: &mut Node,
        _ctx: &mut ProcessingContext,
        _chain: &ParentChain,
    ) -> Result<VisitAction> {
        let NodeKind::Unary { op, argument } = &node.kind else {
            return Ok(VisitAction::unchanged());
        };
        let replacement = match (*op, argument.number_value()) {
            (UnaryOp::Not, Some(v)) if v == 0.0 => NodeKind::Bool { value: true },
            (UnaryOp::Not, Some(v)) if v == 1.0 => NodeKind::Bool { value: false },
            (UnaryOp::Void, Some(v)) if v == 0.0 => NodeKind::Ident {
                name: "undefined".to_string(),
            },
            _ => return Ok(VisitAction::unchanged()),
        };
        node.kind = replacement;
        Ok(VisitAction::changed())
    }
}
