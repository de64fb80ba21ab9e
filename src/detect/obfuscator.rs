//! Obfuscator-io style pattern recognition.
//!
//! Three signatures: the rotated string array, the flattened
//! control-flow state machine, and mass dead-code injection. These are
//! read-only detectors; the tree is never modified.

use regex::Regex;

use crate::ast::{Node, NodeKind, UpdateOp};
use crate::context::ProcessingContext;
use crate::detect::{Finding, Severity};
use crate::scope::Confidence;

pub fn detect_obfuscator_patterns(tree: &Node, ctx: &ProcessingContext) -> Vec<Finding> {
    let mut findings = Vec::new();
    if let Some(f) = detect_string_array(tree) {
        findings.push(f);
    }
    findings.extend(detect_control_flow_flattening(tree));
    if let Some(f) = detect_dead_code_injection(ctx) {
        findings.push(f);
    }
    findings
}

/// Obfuscator-generated identifiers look like `_0x3f2a1c`.
fn obfuscated_name_pattern() -> Regex {
    Regex::new(r"^_0x[0-9a-fA-F]+$").expect("static pattern")
}

/// A declarator binding an obfuscated name to an array of more than ten
/// string literals.
fn find_string_array(tree: &Node, name_re: &Regex) -> Option<(String, usize)> {
    let mut found = None;
    tree.any_node(&mut |n| {
        let NodeKind::VariableDeclarator {
            id,
            init: Some(init),
        } = &n.kind
        else {
            return false;
        };
        let Some(name) = id.ident_name() else {
            return false;
        };
        if !name_re.is_match(name) {
            return false;
        }
        let NodeKind::Array { elements } = &init.kind else {
            return false;
        };
        let strings = elements
            .iter()
            .filter(|e| matches!(e.kind, NodeKind::String { .. }))
            .count();
        if strings > 10 && strings == elements.len() {
            found = Some((name.to_string(), strings));
            return true;
        }
        false
    });
    found
}

/// The rotation helper: a two-parameter IIFE whose body has a while
/// loop, `push`+`shift` calls and a `--` somewhere.
fn has_rotation_iife(tree: &Node) -> bool {
    let mut found = false;
    tree.any_node(&mut |n| {
        let NodeKind::Call { callee, .. } = &n.kind else {
            return false;
        };
        if !callee.is_function() {
            return false;
        }
        if callee.function_params().map_or(0, <[Node]>::len) != 2 {
            return false;
        }
        let has_while = callee.any_node(&mut |m| matches!(m.kind, NodeKind::While { .. }));
        let has_push = callee.any_node(&mut |m| member_call_named(m, "push"));
        let has_shift = callee.any_node(&mut |m| member_call_named(m, "shift"));
        let has_decrement = callee.any_node(&mut |m| {
            matches!(
                m.kind,
                NodeKind::Update {
                    op: UpdateOp::Decrement,
                    ..
                }
            )
        });
        if has_while && has_push && has_shift && has_decrement {
            found = true;
            return true;
        }
        false
    });
    found
}

fn member_call_named(node: &Node, name: &str) -> bool {
    let NodeKind::Call { callee, .. } = &node.kind else {
        return false;
    };
    matches!(
        &callee.kind,
        NodeKind::Member { property, computed: false, .. }
            if property.ident_name() == Some(name)
    )
}

fn detect_string_array(tree: &Node) -> Option<Finding> {
    let name_re = obfuscated_name_pattern();
    let (name, count) = find_string_array(tree, &name_re)?;
    let rotated = has_rotation_iife(tree);
    let confidence = if rotated {
        Confidence::High
    } else {
        Confidence::Medium
    };
    Some(
        Finding::new(
            "String Array Rotation",
            confidence,
            Severity::Medium,
            "large obfuscated string array feeding an accessor",
            "javascript-obfuscator",
        )
        .with_detail("array", name)
        .with_detail("strings", count.to_string())
        .with_detail("rotation_helper", rotated.to_string()),
    )
}

fn detect_control_flow_flattening(tree: &Node) -> Vec<Finding> {
    let mut findings = Vec::new();
    tree.any_node(&mut |n| {
        let NodeKind::While { test, body } = &n.kind else {
            return false;
        };
        if test.truthiness() != Some(true) {
            return false;
        }
        let Some(switch) = find_switch(body) else {
            return false;
        };
        let NodeKind::Switch { cases, .. } = &switch.kind else {
            return false;
        };
        if cases.len() < 5 {
            return false;
        }
        let string_cases = cases
            .iter()
            .filter(|c| {
                matches!(
                    &c.kind,
                    NodeKind::SwitchCase { test: Some(t), .. }
                        if matches!(t.kind, NodeKind::String { .. })
                )
            })
            .count();
        let has_continue =
            switch.any_node(&mut |m| matches!(m.kind, NodeKind::Continue { .. }));
        if !has_continue {
            return false;
        }
        let confidence = if string_cases > 0 {
            Confidence::High
        } else {
            Confidence::Medium
        };
        findings.push(
            Finding::new(
                "Control Flow Flattening",
                confidence,
                Severity::Medium,
                "while(true)/switch state machine with continue-driven dispatch",
                "javascript-obfuscator",
            )
            .with_detail("cases", cases.len().to_string())
            .with_detail("string_cases", string_cases.to_string()),
        );
        false
    });
    findings
}

fn find_switch(body: &Node) -> Option<&Node> {
    match &body.kind {
        NodeKind::Switch { .. } => Some(body),
        NodeKind::Block { body } => body
            .iter()
            .find(|s| matches!(s.kind, NodeKind::Switch { .. })),
        _ => None,
    }
}

/// Over ten known functions with at least 30% never called.
fn detect_dead_code_injection(ctx: &ProcessingContext) -> Option<Finding> {
    let total = ctx.functions.len();
    if total < 10 {
        return None;
    }
    let uncalled = ctx
        .functions
        .values()
        .filter(|f| f.call_count == 0)
        .count();
    if (uncalled as f64) / (total as f64) < 0.3 {
        return None;
    }
    Some(
        Finding::new(
            "Dead Code Injection",
            Confidence::Medium,
            Severity::Low,
            "a large share of declared functions is never invoked",
            "javascript-obfuscator",
        )
        .with_detail("functions", total.to_string())
        .with_detail("uncalled", uncalled.to_string()),
    )
}
