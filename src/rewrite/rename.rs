//! Applying rename suggestions.
//!
//! A renamer hook writes `suggested_name` onto variables and functions;
//! this post-pass walks identifier references, resolves each one through
//! the scope chain, and installs the suggestion. Malformed suggestions
//! (not an identifier, a reserved word, empty) are silently discarded.

use regex::Regex;

use crate::ast::{Node, NodeKind, ParentChain, Slot, Tag, VisitAction};
use crate::context::ProcessingContext;
use crate::error::Result;
use crate::rewrite::Rewriter;

const RESERVED_WORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "enum", "export", "extends", "false", "finally", "for", "function", "if", "import",
    "in", "instanceof", "let", "new", "null", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "undefined", "var", "void", "while", "with", "yield",
];

pub struct ApplyRenames {
    ident: Regex,
}

impl ApplyRenames {
    pub fn new() -> Self {
        Self {
            ident: Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("static pattern"),
        }
    }

    fn is_valid(&self, name: &str) -> bool {
        !name.is_empty() && self.ident.is_match(name) && !RESERVED_WORDS.contains(&name)
    }
}

impl Default for ApplyRenames {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier positions that are names-of-things rather than variable
/// references: fixed property names, object keys, labels.
fn is_fixed_name_position(chain: &ParentChain) -> bool {
    chain.parent().is_some_and(|f| {
        matches!(
            (f.tag, f.slot),
            (Tag::Member, Slot::Property)
                | (Tag::Property, Slot::Key)
                | (Tag::MethodDef, Slot::Key)
                | (Tag::Labeled, Slot::Label)
                | (Tag::Break, Slot::Label)
                | (Tag::Continue, Slot::Label)
        )
    })
}

impl Rewriter for ApplyRenames {
    fn name(&self) -> &'static str {
        "apply-renames"
    }

    fn rewrite(
        &self,
        node: &mut Node,
        ctx: &mut ProcessingContext,
        chain: &ParentChain,
    ) -> Result<VisitAction> {
        let NodeKind::Ident { name } = &node.kind else {
            return Ok(VisitAction::unchanged());
        };
        let name = name.clone();
        if is_fixed_name_position(chain) {
            return Ok(VisitAction::unchanged());
        }

        let scope = chain.nearest_scope().unwrap_or(ctx.scopes.root());
        let suggestion = ctx
            .scopes
            .get_variable(scope, &name)?
            .and_then(|v| v.suggested_name.clone())
            .or_else(|| {
                ctx.functions
                    .get(&name)
                    .and_then(|f| f.suggested_name.clone())
            });

        match suggestion {
            Some(new_name) if self.is_valid(&new_name) && new_name != name => {
                node.kind = NodeKind::Ident { name: new_name };
                Ok(VisitAction::changed())
            }
            _ => Ok(VisitAction::unchanged()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::walk_top_down;
    use crate::context::Options;
    use crate::rewrite::CreateScopes;
    use crate::scope::Confidence;

    fn prepared_tree() -> (Node, ProcessingContext) {
        let mut tree = Node::new(NodeKind::Program {
            body: vec![
                Node::new(NodeKind::VariableDecl {
                    kind: crate::ast::DeclKind::Var,
                    declarations: vec![Node::new(NodeKind::VariableDeclarator {
                        id: Box::new(Node::ident("_0x1f2a")),
                        init: Some(Box::new(Node::number(1.0))),
                    })],
                }),
                Node::expression_stmt(Node::ident("_0x1f2a")),
            ],
        });
        let mut ctx = ProcessingContext::new("test.js", Options::default());
        walk_top_down(&mut tree, &mut |node, chain| {
            CreateScopes
                .rewrite(node, &mut ctx, chain)
                .unwrap_or_else(|_| VisitAction::unchanged())
        });
        (tree, ctx)
    }

    fn suggest(ctx: &mut ProcessingContext, old: &str, new: &str) {
        let root = ctx.scopes.root();
        let var = ctx
            .scopes
            .get_variable_mut(root, old)
            .unwrap()
            .expect("declared");
        var.suggested_name = Some(new.to_string());
        var.confidence = Some(Confidence::High);
        var.reason = Some("test".to_string());
    }

    fn apply(tree: &mut Node, ctx: &mut ProcessingContext) -> usize {
        let pass = ApplyRenames::new();
        let mut count = 0;
        walk_top_down(tree, &mut |node, chain| {
            let action = pass
                .rewrite(node, ctx, chain)
                .unwrap_or_else(|_| VisitAction::unchanged());
            if action.changed {
                count += 1;
            }
            action
        });
        count
    }

    fn idents(tree: &mut Node) -> Vec<String> {
        let mut names = Vec::new();
        walk_top_down(tree, &mut |node, _| {
            if let Some(name) = node.ident_name() {
                names.push(name.to_string());
            }
            VisitAction::unchanged()
        });
        names
    }

    #[test]
    fn test_declaration_and_references_renamed_together() {
        let (mut tree, mut ctx) = prepared_tree();
        suggest(&mut ctx, "_0x1f2a", "retryCount");
        let count = apply(&mut tree, &mut ctx);
        assert_eq!(count, 2);
        assert!(idents(&mut tree).iter().all(|n| n == "retryCount"));
    }

    #[test]
    fn test_reserved_word_suggestion_discarded() {
        let (mut tree, mut ctx) = prepared_tree();
        suggest(&mut ctx, "_0x1f2a", "return");
        assert_eq!(apply(&mut tree, &mut ctx), 0);
    }

    #[test]
    fn test_invalid_identifier_suggestion_discarded() {
        let (mut tree, mut ctx) = prepared_tree();
        suggest(&mut ctx, "_0x1f2a", "not valid");
        assert_eq!(apply(&mut tree, &mut ctx), 0);

        suggest(&mut ctx, "_0x1f2a", "");
        assert_eq!(apply(&mut tree, &mut ctx), 0);
    }

    #[test]
    fn test_property_names_not_renamed() {
        let mut tree = Node::new(NodeKind::Program {
            body: vec![Node::expression_stmt(Node::new(NodeKind::Member {
                object: Box::new(Node::ident("_0x1f2a")),
                property: Box::new(Node::ident("_0x1f2a")),
                computed: false,
                optional: false,
            }))],
        });
        let mut ctx = ProcessingContext::new("test.js", Options::default());
        walk_top_down(&mut tree, &mut |node, chain| {
            CreateScopes
                .rewrite(node, &mut ctx, chain)
                .unwrap_or_else(|_| VisitAction::unchanged())
        });
        ctx.scopes.promote_global("_0x1f2a").unwrap();
        suggest(&mut ctx, "_0x1f2a", "config");

        apply(&mut tree, &mut ctx);
        let names = idents(&mut tree);
        // Object position renamed, property position kept.
        assert_eq!(names, vec!["config".to_string(), "_0x1f2a".to_string()]);
    }
}
