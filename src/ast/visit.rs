//! Deterministic tree walks.
//!
//! Two orders are provided: top-down (pre-order, the visitor sees a node
//! before its children) and bottom-up (post-order, the visitor sees a node
//! only after its entire subtree). Both thread a [`ParentChain`] into the
//! visitor and apply any structural edit the visitor requests at the
//! child slot being walked.
//!
//! Iteration bounds and timeouts are enforced by the fixpoint caller, not
//! here.

use crate::ast::{Frame, Node, NodeKind, ParentChain, Slot, Tag};
use crate::scope::ScopeId;

/// A structural edit requested by a visitor for the node it was given.
#[derive(Debug)]
pub enum Edit {
    /// Replace the node with another one.
    Replace(Node),
    /// Replace the node with several siblings. Only honored in list
    /// slots; elsewhere it is dropped.
    Splice(Vec<Node>),
    /// Unlink the node. List slots shrink; optional slots become empty;
    /// a mandatory slot is left holding an empty statement.
    Remove,
}

/// What a visitor reports for one node.
pub struct VisitAction {
    pub changed: bool,
    pub edit: Option<Edit>,
}

impl VisitAction {
    pub fn unchanged() -> Self {
        Self {
            changed: false,
            edit: None,
        }
    }

    pub fn changed() -> Self {
        Self {
            changed: true,
            edit: None,
        }
    }

    pub fn replace(node: Node) -> Self {
        Self {
            changed: true,
            edit: Some(Edit::Replace(node)),
        }
    }

    pub fn splice(nodes: Vec<Node>) -> Self {
        Self {
            changed: true,
            edit: Some(Edit::Splice(nodes)),
        }
    }

    pub fn remove() -> Self {
        Self {
            changed: true,
            edit: Some(Edit::Remove),
        }
    }
}

/// Aggregate result of a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOutcome {
    pub changed: bool,
}

/// The visitor callback: one node plus its ancestry, returning what (if
/// anything) changed.
pub type VisitFn<'a> = dyn FnMut(&mut Node, &ParentChain) -> VisitAction + 'a;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Order {
    TopDown,
    BottomUp,
}

/// Pre-order walk: the visitor runs on a node before its children.
pub fn walk_top_down(root: &mut Node, visit: &mut VisitFn) -> WalkOutcome {
    walk_root(root, Order::TopDown, visit)
}

/// Post-order walk: the visitor runs on a node after its whole subtree.
pub fn walk_bottom_up(root: &mut Node, visit: &mut VisitFn) -> WalkOutcome {
    walk_root(root, Order::BottomUp, visit)
}

fn walk_root(root: &mut Node, order: Order, visit: &mut VisitFn) -> WalkOutcome {
    let chain = ParentChain::empty();
    let res = walk_node(root, &chain, order, visit);
    let mut changed = res.changed;
    // The root has no parent slot: only a whole-tree replacement applies.
    if let Some(Edit::Replace(new_root)) = res.edit {
        *root = new_root;
        changed = true;
    }
    WalkOutcome { changed }
}

struct NodeResult {
    changed: bool,
    edit: Option<Edit>,
}

fn walk_node(node: &mut Node, chain: &ParentChain, order: Order, visit: &mut VisitFn) -> NodeResult {
    let mut changed = false;

    if order == Order::TopDown {
        let action = visit(node, chain);
        changed |= action.changed;
        if action.edit.is_some() {
            // The node is about to be replaced in its parent slot; its
            // replacement is picked up on the next sweep.
            return NodeResult {
                changed: true,
                edit: action.edit,
            };
        }
    }

    changed |= walk_children(node, chain, order, visit);

    if order == Order::BottomUp {
        let action = visit(node, chain);
        changed |= action.changed;
        if action.edit.is_some() {
            return NodeResult {
                changed: true,
                edit: action.edit,
            };
        }
    }

    NodeResult {
        changed,
        edit: None,
    }
}

fn walk_box(
    child: &mut Box<Node>,
    tag: Tag,
    slot: Slot,
    scope: Option<ScopeId>,
    chain: &ParentChain,
    order: Order,
    visit: &mut VisitFn,
) -> bool {
    let child_chain = chain.push(Frame {
        tag,
        slot,
        index: None,
        scope,
    });
    let res = walk_node(child, &child_chain, order, visit);
    let mut changed = res.changed;
    match res.edit {
        Some(Edit::Replace(node)) => {
            **child = node;
            changed = true;
        }
        Some(Edit::Remove) => {
            **child = Node::empty_stmt();
            changed = true;
        }
        Some(Edit::Splice(_)) => {
            log::warn!("splice requested in single slot {}; dropped", slot.as_str());
        }
        None => {}
    }
    changed
}

fn walk_opt(
    child: &mut Option<Box<Node>>,
    tag: Tag,
    slot: Slot,
    scope: Option<ScopeId>,
    chain: &ParentChain,
    order: Order,
    visit: &mut VisitFn,
) -> bool {
    let Some(inner) = child.as_mut() else {
        return false;
    };
    let child_chain = chain.push(Frame {
        tag,
        slot,
        index: None,
        scope,
    });
    let res = walk_node(inner, &child_chain, order, visit);
    let mut changed = res.changed;
    match res.edit {
        Some(Edit::Replace(node)) => {
            **inner = node;
            changed = true;
        }
        Some(Edit::Remove) => {
            *child = None;
            changed = true;
        }
        Some(Edit::Splice(_)) => {
            log::warn!("splice requested in single slot {}; dropped", slot.as_str());
        }
        None => {}
    }
    changed
}

fn walk_vec(
    list: &mut Vec<Node>,
    tag: Tag,
    slot: Slot,
    scope: Option<ScopeId>,
    chain: &ParentChain,
    order: Order,
    visit: &mut VisitFn,
) -> bool {
    let mut changed = false;
    let mut i = 0;
    while i < list.len() {
        let child_chain = chain.push(Frame {
            tag,
            slot,
            index: Some(i),
            scope,
        });
        let res = walk_node(&mut list[i], &child_chain, order, visit);
        changed |= res.changed;
        match res.edit {
            Some(Edit::Replace(node)) => {
                list[i] = node;
                changed = true;
                i += 1;
            }
            Some(Edit::Splice(nodes)) => {
                let added = nodes.len();
                list.splice(i..=i, nodes);
                changed = true;
                // Spliced-in nodes are fresh; the fixpoint revisits them.
                i += added;
            }
            Some(Edit::Remove) => {
                list.remove(i);
                changed = true;
            }
            None => i += 1,
        }
    }
    changed
}

fn walk_children(node: &mut Node, chain: &ParentChain, order: Order, visit: &mut VisitFn) -> bool {
    let tag = node.tag();
    let scope = node.scope;
    let mut c = false;

    macro_rules! vec_slot {
        ($list:expr, $slot:expr) => {
            c |= walk_vec($list, tag, $slot, scope, chain, order, visit)
        };
    }
    macro_rules! box_slot {
        ($child:expr, $slot:expr) => {
            c |= walk_box($child, tag, $slot, scope, chain, order, visit)
        };
    }
    macro_rules! opt_slot {
        ($child:expr, $slot:expr) => {
            c |= walk_opt($child, tag, $slot, scope, chain, order, visit)
        };
    }

    match &mut node.kind {
        NodeKind::Program { body } => vec_slot!(body, Slot::Body),
        NodeKind::FunctionDecl {
            id, params, body, ..
        }
        | NodeKind::FunctionExpr {
            id, params, body, ..
        } => {
            opt_slot!(id, Slot::Id);
            vec_slot!(params, Slot::Params);
            box_slot!(body, Slot::Body);
        }
        NodeKind::VariableDecl { declarations, .. } => {
            vec_slot!(declarations, Slot::Declarations)
        }
        NodeKind::VariableDeclarator { id, init } => {
            box_slot!(id, Slot::Id);
            opt_slot!(init, Slot::Init);
        }
        NodeKind::ClassDecl {
            id,
            super_class,
            body,
        }
        | NodeKind::ClassExpr {
            id,
            super_class,
            body,
        } => {
            opt_slot!(id, Slot::Id);
            opt_slot!(super_class, Slot::SuperClass);
            vec_slot!(body, Slot::Body);
        }
        NodeKind::MethodDef { key, value, .. } => {
            box_slot!(key, Slot::Key);
            box_slot!(value, Slot::Value);
        }
        NodeKind::Block { body } => vec_slot!(body, Slot::Body),
        NodeKind::ExpressionStmt { expression } => box_slot!(expression, Slot::Expression),
        NodeKind::If {
            test,
            consequent,
            alternate,
        } => {
            box_slot!(test, Slot::Test);
            box_slot!(consequent, Slot::Consequent);
            opt_slot!(alternate, Slot::Alternate);
        }
        NodeKind::For {
            init,
            test,
            update,
            body,
        } => {
            opt_slot!(init, Slot::Init);
            opt_slot!(test, Slot::Test);
            opt_slot!(update, Slot::Update);
            box_slot!(body, Slot::Body);
        }
        NodeKind::ForIn { left, right, body } | NodeKind::ForOf { left, right, body } => {
            box_slot!(left, Slot::Left);
            box_slot!(right, Slot::Right);
            box_slot!(body, Slot::Body);
        }
        NodeKind::While { test, body } => {
            box_slot!(test, Slot::Test);
            box_slot!(body, Slot::Body);
        }
        NodeKind::DoWhile { body, test } => {
            box_slot!(body, Slot::Body);
            box_slot!(test, Slot::Test);
        }
        NodeKind::Switch {
            discriminant,
            cases,
        } => {
            box_slot!(discriminant, Slot::Discriminant);
            vec_slot!(cases, Slot::Cases);
        }
        NodeKind::SwitchCase { test, consequent } => {
            opt_slot!(test, Slot::Test);
            vec_slot!(consequent, Slot::Consequent);
        }
        NodeKind::Return { argument } => opt_slot!(argument, Slot::Argument),
        NodeKind::Throw { argument } => box_slot!(argument, Slot::Argument),
        NodeKind::Try {
            block,
            handler,
            finalizer,
        } => {
            box_slot!(block, Slot::Block);
            opt_slot!(handler, Slot::Handler);
            opt_slot!(finalizer, Slot::Finalizer);
        }
        NodeKind::CatchClause { param, body } => {
            opt_slot!(param, Slot::Param);
            box_slot!(body, Slot::Body);
        }
        NodeKind::Break { label } | NodeKind::Continue { label } => opt_slot!(label, Slot::Label),
        NodeKind::Labeled { label, body } => {
            box_slot!(label, Slot::Label);
            box_slot!(body, Slot::Body);
        }
        NodeKind::Binary { left, right, .. }
        | NodeKind::Logical { left, right, .. }
        | NodeKind::Assignment { left, right, .. }
        | NodeKind::AssignPattern { left, right } => {
            box_slot!(left, Slot::Left);
            box_slot!(right, Slot::Right);
        }
        NodeKind::Unary { argument, .. }
        | NodeKind::Update { argument, .. }
        | NodeKind::Spread { argument }
        | NodeKind::RestElement { argument }
        | NodeKind::Await { argument } => box_slot!(argument, Slot::Argument),
        NodeKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            box_slot!(test, Slot::Test);
            box_slot!(consequent, Slot::Consequent);
            box_slot!(alternate, Slot::Alternate);
        }
        NodeKind::Call {
            callee, arguments, ..
        }
        | NodeKind::New { callee, arguments } => {
            box_slot!(callee, Slot::Callee);
            vec_slot!(arguments, Slot::Arguments);
        }
        NodeKind::Member {
            object, property, ..
        } => {
            box_slot!(object, Slot::Object);
            box_slot!(property, Slot::Property);
        }
        NodeKind::Sequence { expressions } => vec_slot!(expressions, Slot::Expressions),
        NodeKind::Arrow { params, body, .. } => {
            vec_slot!(params, Slot::Params);
            box_slot!(body, Slot::Body);
        }
        NodeKind::Object { properties } | NodeKind::ObjectPattern { properties } => {
            vec_slot!(properties, Slot::Properties)
        }
        NodeKind::Property { key, value, .. } => {
            box_slot!(key, Slot::Key);
            box_slot!(value, Slot::Value);
        }
        NodeKind::Array { elements } | NodeKind::ArrayPattern { elements } => {
            vec_slot!(elements, Slot::Elements)
        }
        NodeKind::TemplateLiteral {
            quasis,
            expressions,
        } => {
            vec_slot!(quasis, Slot::Quasis);
            vec_slot!(expressions, Slot::Expressions);
        }
        NodeKind::TaggedTemplate { tag: t, quasi } => {
            box_slot!(t, Slot::Tag);
            box_slot!(quasi, Slot::Quasi);
        }
        NodeKind::Yield { argument, .. } => opt_slot!(argument, Slot::Argument),
        NodeKind::Empty
        | NodeKind::Debugger
        | NodeKind::Ident { .. }
        | NodeKind::This
        | NodeKind::SuperExpr
        | NodeKind::String { .. }
        | NodeKind::Number { .. }
        | NodeKind::Bool { .. }
        | NodeKind::Null
        | NodeKind::Regex { .. }
        | NodeKind::TemplateElement { .. }
        | NodeKind::Hole => {}
    }

    c
}
