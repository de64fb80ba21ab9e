//! Property-access simplification.
//!
//! `obj["name"]` becomes `obj.name` whenever the key is a valid
//! identifier. Reserved words are allowed in property position, so the
//! identifier shape is the only requirement.

use regex::Regex;

use crate::ast::{Node, NodeKind, ParentChain, VisitAction};
use crate::context::ProcessingContext;
use crate::error::Result;
use crate::rewrite::Rewriter;

pub struct PropertySimplify {
    ident: Regex,
}

impl PropertySimplify {
    pub fn new() -> Self {
        Self {
            ident: Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("static pattern"),
        }
    }
}

impl Default for PropertySimplify {
    fn default() -> Self {
        Self::new()
    }
}

impl Rewriter for PropertySimplify {
    fn name(&self) -> &'static str {
        "simplify-properties"
    }

    fn rewrite(
        &self,
        node: &mut Node,
        _ctx: &mut ProcessingContext,
        _chain: &ParentChain,
    ) -> Result<VisitAction> {
        let NodeKind::Member {
            property, computed, ..
        } = &mut node.kind
        else {
            return Ok(VisitAction::unchanged());
        };
        if !*computed {
            return Ok(VisitAction::unchanged());
        }
        let Some(name) = property.string_value().map(str::to_string) else {
            return Ok(VisitAction::unchanged());
        };
        if !self.ident.is_match(&name) {
            return Ok(VisitAction::unchanged());
        }
        **property = Node::ident(name);
        *computed = false;
        Ok(VisitAction::changed())
    }
}
