//! Heuristic naming of extracted modules.
//!
//! Each module body is scanned against an ordered keyword table; the
//! winning tag names the output file. Malware-suspicious tags always
//! outrank benign ones, whatever the scores. When nothing strong
//! matches but the module has exports, the first export name is used;
//! the last resort is `module_<id>`.

use std::collections::BTreeSet;

use crate::ast::{Node, NodeKind};
use crate::scope::Confidence;

pub struct NamePattern {
    pub tag: &'static str,
    pub keywords: &'static [&'static str],
    pub suspicious: bool,
}

/// Ordered pattern table; earlier entries win ties.
pub const NAME_PATTERNS: &[NamePattern] = &[
    NamePattern {
        tag: "api_client",
        keywords: &[
            "fetch", "xhr", "xmlhttprequest", "ajax", "endpoint", "request", "response", "http",
        ],
        suspicious: false,
    },
    NamePattern {
        tag: "auth",
        keywords: &[
            "login", "logout", "token", "password", "auth", "session", "credential", "oauth",
        ],
        suspicious: false,
    },
    NamePattern {
        tag: "router",
        keywords: &[
            "route", "router", "navigate", "history", "pushstate", "redirect",
        ],
        suspicious: false,
    },
    NamePattern {
        tag: "ui",
        keywords: &[
            "render", "component", "element", "button", "click", "view", "template",
        ],
        suspicious: false,
    },
    NamePattern {
        tag: "store",
        keywords: &[
            "store", "dispatch", "reducer", "state", "mutation", "subscribe", "commit",
        ],
        suspicious: false,
    },
    NamePattern {
        tag: "utils",
        keywords: &["util", "helper", "clone", "merge", "debounce", "throttle"],
        suspicious: false,
    },
    NamePattern {
        tag: "validation",
        keywords: &["validate", "validator", "schema", "required", "isvalid"],
        suspicious: false,
    },
    NamePattern {
        tag: "crypto",
        keywords: &[
            "encrypt", "decrypt", "aes", "sha256", "md5", "cipher", "hmac", "crypto",
        ],
        suspicious: false,
    },
    NamePattern {
        tag: "socket",
        keywords: &["socket", "websocket", "emit", "onmessage", "reconnect"],
        suspicious: false,
    },
    NamePattern {
        tag: "logger",
        keywords: &["logger", "warn", "debug", "trace", "console"],
        suspicious: false,
    },
    NamePattern {
        tag: "config",
        keywords: &["config", "settings", "options", "defaults", "env"],
        suspicious: false,
    },
    NamePattern {
        tag: "parser",
        keywords: &["parse", "parser", "tokenize", "lexer", "ast"],
        suspicious: false,
    },
    NamePattern {
        tag: "formatter",
        keywords: &["format", "formatter", "stringify", "serialize", "pretty"],
        suspicious: false,
    },
    NamePattern {
        tag: "error_handler",
        keywords: &["error", "exception", "onerror", "errorhandler", "stacktrace"],
        suspicious: false,
    },
    NamePattern {
        tag: "SUSPICIOUS_executor",
        keywords: &["eval", "execscript", "atob"],
        suspicious: true,
    },
    NamePattern {
        tag: "SUSPICIOUS_decoder",
        keywords: &["fromcharcode", "charcodeat", "unescape", "decodeuricomponent"],
        suspicious: true,
    },
    NamePattern {
        tag: "SUSPICIOUS_exfil",
        keywords: &["sendbeacon", "keylog", "clipboard", "cookie", "localstorage"],
        suspicious: true,
    },
    NamePattern {
        tag: "SUSPICIOUS_dom_inject",
        keywords: &[
            "createelement", "appendchild", "innerhtml", "insertbefore", "document.write",
        ],
        suspicious: true,
    },
];

/// What the classifier decided for one module.
#[derive(Debug, Clone)]
pub struct ModuleName {
    /// Base filename (no extension, collisions not yet resolved).
    pub name: String,
    /// Winning pattern tag, or a synthetic one for export/fallback.
    pub pattern: String,
    pub confidence: Confidence,
    pub reason: String,
    pub suspicious: bool,
}

/// Lower-cased token bag of a module body: identifier names, string
/// values and property names.
fn token_bag(func: &Node) -> Vec<String> {
    let mut bag = Vec::new();
    let mut stack = vec![func];
    while let Some(node) = stack.pop() {
        match &node.kind {
            NodeKind::Ident { name } => bag.push(name.to_lowercase()),
            NodeKind::String { value, .. } => bag.push(value.to_lowercase()),
            _ => {}
        }
        stack.extend(node.children());
    }
    bag
}

fn score_pattern(pattern: &NamePattern, bag: &[String]) -> (usize, Vec<&'static str>) {
    let mut hits = Vec::new();
    let mut score = 0;
    for keyword in pattern.keywords {
        let count = bag.iter().filter(|t| t.contains(keyword)).count();
        if count > 0 {
            score += count;
            hits.push(*keyword);
        }
    }
    (score, hits)
}

/// Export names assigned in the module body, in document order
/// (`exports.x = …`, `module.exports.x = …`).
fn export_names(func: &Node) -> Vec<String> {
    let mut names = Vec::new();
    let mut seen = BTreeSet::new();
    collect_exports(func, &mut names, &mut seen);
    names
}

fn collect_exports(node: &Node, names: &mut Vec<String>, seen: &mut BTreeSet<String>) {
    if let NodeKind::Assignment { left, .. } = &node.kind {
        if let Some(path) = left.member_path() {
            let export = path
                .strip_prefix("exports.")
                .or_else(|| path.strip_prefix("module.exports."));
            if let Some(name) = export {
                let head = name.split('.').next().unwrap_or(name);
                if seen.insert(head.to_string()) {
                    names.push(head.to_string());
                }
            }
        }
    }
    for child in node.children() {
        collect_exports(child, names, seen);
    }
}

fn confidence_for(score: usize) -> Confidence {
    if score >= 5 {
        Confidence::High
    } else if score >= 3 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

/// Keep filename characters filesystem- and identifier-safe.
pub fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() || cleaned.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        format!("m_{cleaned}")
    } else {
        cleaned
    }
}

/// Classify one module body and pick its filename.
pub fn classify_module(func: &Node, id: &str) -> ModuleName {
    let bag = token_bag(func);

    let mut best_suspicious: Option<(&NamePattern, usize, Vec<&'static str>)> = None;
    let mut best_benign: Option<(&NamePattern, usize, Vec<&'static str>)> = None;
    for pattern in NAME_PATTERNS {
        let (score, hits) = score_pattern(pattern, &bag);
        if score == 0 {
            continue;
        }
        let slot = if pattern.suspicious {
            &mut best_suspicious
        } else {
            &mut best_benign
        };
        // Strictly-greater keeps the table order as the tiebreak.
        if slot.as_ref().is_none_or(|(_, s, _)| score > *s) {
            *slot = Some((pattern, score, hits));
        }
    }

    // Malware tags outrank benign ones regardless of score.
    if let Some((pattern, score, hits)) = best_suspicious {
        return ModuleName {
            name: sanitize(pattern.tag),
            pattern: pattern.tag.to_string(),
            confidence: confidence_for(score),
            reason: format!("matched suspicious keywords: {}", hits.join(", ")),
            suspicious: true,
        };
    }

    if let Some((pattern, score, hits)) = &best_benign {
        if *score >= 3 {
            return ModuleName {
                name: sanitize(pattern.tag),
                pattern: pattern.tag.to_string(),
                confidence: confidence_for(*score),
                reason: format!("matched keywords: {}", hits.join(", ")),
                suspicious: false,
            };
        }
    }

    let exports = export_names(func);
    if let Some(first) = exports.first() {
        return ModuleName {
            name: sanitize(first),
            pattern: "exports".to_string(),
            confidence: Confidence::Medium,
            reason: format!("named after first export '{first}'"),
            suspicious: false,
        };
    }

    ModuleName {
        name: format!("module_{}", sanitize(id)),
        pattern: "unknown".to_string(),
        confidence: Confidence::Low,
        reason: "no naming pattern matched".to_string(),
        suspicious: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_with_stmts(stmts: Vec<Node>) -> Node {
        Node::new(NodeKind::FunctionExpr {
            id: None,
            params: vec![Node::ident("e"), Node::ident("t"), Node::ident("n")],
            body: Box::new(Node::block(stmts)),
            is_async: false,
            is_generator: false,
        })
    }

    fn call(name: &str, args: Vec<Node>) -> Node {
        Node::new(NodeKind::Call {
            callee: Box::new(Node::ident(name)),
            arguments: args,
            optional: false,
        })
    }

    fn export_assign(name: &str) -> Node {
        Node::expression_stmt(Node::new(NodeKind::Assignment {
            op: crate::ast::AssignOp::Assign,
            left: Box::new(Node::new(NodeKind::Member {
                object: Box::new(Node::ident("exports")),
                property: Box::new(Node::ident(name)),
                computed: false,
                optional: false,
            })),
            right: Box::new(Node::new(NodeKind::FunctionExpr {
                id: None,
                params: Vec::new(),
                body: Box::new(Node::block(Vec::new())),
                is_async: false,
                is_generator: false,
            })),
        }))
    }

    #[test]
    fn test_eval_module_flagged_as_executor() {
        let module = module_with_stmts(vec![Node::expression_stmt(call(
            "eval",
            vec![call("atob", vec![Node::ident("x")])],
        ))]);
        let named = classify_module(&module, "1");
        assert_eq!(named.pattern, "SUSPICIOUS_executor");
        assert!(named.suspicious);
        assert_eq!(named.name, "SUSPICIOUS_executor");
    }

    #[test]
    fn test_suspicious_outranks_benign() {
        // Plenty of benign router keywords plus one eval.
        let module = module_with_stmts(vec![
            Node::expression_stmt(call("navigate", vec![Node::ident("route")])),
            Node::expression_stmt(call("redirect", vec![Node::ident("router")])),
            Node::expression_stmt(call("eval", vec![Node::string("payload")])),
        ]);
        let named = classify_module(&module, "0");
        assert!(named.suspicious);
        assert_eq!(named.pattern, "SUSPICIOUS_executor");
    }

    #[test]
    fn test_export_name_used_without_strong_pattern() {
        let module = module_with_stmts(vec![export_assign("getUser")]);
        let named = classify_module(&module, "0");
        assert_eq!(named.name, "getUser");
        assert_eq!(named.pattern, "exports");
        assert_eq!(named.confidence, Confidence::Medium);
    }

    #[test]
    fn test_fallback_name() {
        let module = module_with_stmts(vec![Node::expression_stmt(call(
            "doWork",
            vec![Node::number(1.0)],
        ))]);
        let named = classify_module(&module, "7");
        assert_eq!(named.name, "module_7");
        assert_eq!(named.confidence, Confidence::Low);
    }

    #[test]
    fn test_weak_benign_score_falls_back() {
        // Two "utils" hits score 2: below the strong threshold, and with
        // no exports the module keeps its id-based name.
        let module = module_with_stmts(vec![
            Node::expression_stmt(call("debounce", Vec::new())),
            Node::expression_stmt(call("throttle", Vec::new())),
        ]);
        let named = classify_module(&module, "4");
        assert_eq!(named.name, "module_4");
        assert_eq!(named.pattern, "unknown");
    }

    #[test]
    fn test_strong_benign_pattern_names_by_tag() {
        let module = module_with_stmts(vec![
            Node::expression_stmt(call("encrypt", vec![Node::ident("aes")])),
            Node::expression_stmt(call("decrypt", vec![Node::ident("cipher")])),
        ]);
        let named = classify_module(&module, "2");
        assert_eq!(named.pattern, "crypto");
        assert!(!named.suspicious);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("getUser"), "getUser");
        assert_eq!(sanitize("a-b.c"), "a_b_c");
        assert_eq!(sanitize("0weird"), "m_0weird");
        assert_eq!(sanitize(""), "m_");
    }
}
