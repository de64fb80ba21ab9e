//! The parent chain threaded through traversals.
//!
//! Nodes never store parent pointers. While walking, the traverser pushes
//! one immutable frame per descent recording the parent's kind tag, the
//! slot being entered and, for list slots, the index. Sharing the tail via
//! `Rc` keeps a push at O(1) instead of copying an ancestor array per
//! recursion, which matters on deeply nested bundle output.

use std::rc::Rc;

use crate::ast::{Node, NodeKind};
use crate::scope::ScopeId;

/// Fieldless tag identifying a node kind, carried in chain frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Program,
    FunctionDecl,
    VariableDecl,
    VariableDeclarator,
    ClassDecl,
    MethodDef,
    Block,
    ExpressionStmt,
    If,
    For,
    ForIn,
    ForOf,
    While,
    DoWhile,
    Switch,
    SwitchCase,
    Return,
    Throw,
    Try,
    CatchClause,
    Break,
    Continue,
    Labeled,
    Empty,
    Debugger,
    Binary,
    Logical,
    Unary,
    Update,
    Assignment,
    Conditional,
    Call,
    New,
    Member,
    Sequence,
    FunctionExpr,
    Arrow,
    ClassExpr,
    Object,
    Property,
    Array,
    Spread,
    TemplateLiteral,
    TemplateElement,
    TaggedTemplate,
    Yield,
    Await,
    Ident,
    This,
    SuperExpr,
    String,
    Number,
    Bool,
    Null,
    Regex,
    ObjectPattern,
    ArrayPattern,
    RestElement,
    AssignPattern,
    Hole,
}

impl Node {
    /// The fieldless tag of this node's kind.
    pub fn tag(&self) -> Tag {
        match &self.kind {
            NodeKind::Program { .. } => Tag::Program,
            NodeKind::FunctionDecl { .. } => Tag::FunctionDecl,
            NodeKind::VariableDecl { .. } => Tag::VariableDecl,
            NodeKind::VariableDeclarator { .. } => Tag::VariableDeclarator,
            NodeKind::ClassDecl { .. } => Tag::ClassDecl,
            NodeKind::MethodDef { .. } => Tag::MethodDef,
            NodeKind::Block { .. } => Tag::Block,
            NodeKind::ExpressionStmt { .. } => Tag::ExpressionStmt,
            NodeKind::If { .. } => Tag::If,
            NodeKind::For { .. } => Tag::For,
            NodeKind::ForIn { .. } => Tag::ForIn,
            NodeKind::ForOf { .. } => Tag::ForOf,
            NodeKind::While { .. } => Tag::While,
            NodeKind::DoWhile { .. } => Tag::DoWhile,
            NodeKind::Switch { .. } => Tag::Switch,
            NodeKind::SwitchCase { .. } => Tag::SwitchCase,
            NodeKind::Return { .. } => Tag::Return,
            NodeKind::Throw { .. } => Tag::Throw,
            NodeKind::Try { .. } => Tag::Try,
            NodeKind::CatchClause { .. } => Tag::CatchClause,
            NodeKind::Break { .. } => Tag::Break,
            NodeKind::Continue { .. } => Tag::Continue,
            NodeKind::Labeled { .. } => Tag::Labeled,
            NodeKind::Empty => Tag::Empty,
            NodeKind::Debugger => Tag::Debugger,
            NodeKind::Binary { .. } => Tag::Binary,
            NodeKind::Logical { .. } => Tag::Logical,
            NodeKind::Unary { .. } => Tag::Unary,
            NodeKind::Update { .. } => Tag::Update,
            NodeKind::Assignment { .. } => Tag::Assignment,
            NodeKind::Conditional { .. } => Tag::Conditional,
            NodeKind::Call { .. } => Tag::Call,
            NodeKind::New { .. } => Tag::New,
            NodeKind::Member { .. } => Tag::Member,
            NodeKind::Sequence { .. } => Tag::Sequence,
            NodeKind::FunctionExpr { .. } => Tag::FunctionExpr,
            NodeKind::Arrow { .. } => Tag::Arrow,
            NodeKind::ClassExpr { .. } => Tag::ClassExpr,
            NodeKind::Object { .. } => Tag::Object,
            NodeKind::Property { .. } => Tag::Property,
            NodeKind::Array { .. } => Tag::Array,
            NodeKind::Spread { .. } => Tag::Spread,
            NodeKind::TemplateLiteral { .. } => Tag::TemplateLiteral,
            NodeKind::TemplateElement { .. } => Tag::TemplateElement,
            NodeKind::TaggedTemplate { .. } => Tag::TaggedTemplate,
            NodeKind::Yield { .. } => Tag::Yield,
            NodeKind::Await { .. } => Tag::Await,
            NodeKind::Ident { .. } => Tag::Ident,
            NodeKind::This => Tag::This,
            NodeKind::SuperExpr => Tag::SuperExpr,
            NodeKind::String { .. } => Tag::String,
            NodeKind::Number { .. } => Tag::Number,
            NodeKind::Bool { .. } => Tag::Bool,
            NodeKind::Null => Tag::Null,
            NodeKind::Regex { .. } => Tag::Regex,
            NodeKind::ObjectPattern { .. } => Tag::ObjectPattern,
            NodeKind::ArrayPattern { .. } => Tag::ArrayPattern,
            NodeKind::RestElement { .. } => Tag::RestElement,
            NodeKind::AssignPattern { .. } => Tag::AssignPattern,
            NodeKind::Hole => Tag::Hole,
        }
    }
}

/// Named child slot of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Body,
    Params,
    Id,
    Init,
    Test,
    Update,
    Consequent,
    Alternate,
    Declarations,
    SuperClass,
    Key,
    Value,
    Expression,
    Expressions,
    Discriminant,
    Cases,
    Argument,
    Arguments,
    Block,
    Handler,
    Finalizer,
    Param,
    Label,
    Left,
    Right,
    Callee,
    Object,
    Property,
    Properties,
    Elements,
    Quasis,
    Tag,
    Quasi,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Body => "body",
            Slot::Params => "params",
            Slot::Id => "id",
            Slot::Init => "init",
            Slot::Test => "test",
            Slot::Update => "update",
            Slot::Consequent => "consequent",
            Slot::Alternate => "alternate",
            Slot::Declarations => "declarations",
            Slot::SuperClass => "superClass",
            Slot::Key => "key",
            Slot::Value => "value",
            Slot::Expression => "expression",
            Slot::Expressions => "expressions",
            Slot::Discriminant => "discriminant",
            Slot::Cases => "cases",
            Slot::Argument => "argument",
            Slot::Arguments => "arguments",
            Slot::Block => "block",
            Slot::Handler => "handler",
            Slot::Finalizer => "finalizer",
            Slot::Param => "param",
            Slot::Label => "label",
            Slot::Left => "left",
            Slot::Right => "right",
            Slot::Callee => "callee",
            Slot::Object => "object",
            Slot::Property => "property",
            Slot::Properties => "properties",
            Slot::Elements => "elements",
            Slot::Quasis => "quasis",
            Slot::Tag => "tag",
            Slot::Quasi => "quasi",
        }
    }
}

/// One ancestry frame: the parent's tag, the slot the current node
/// occupies, and the index when that slot is a list.
///
/// Invariant: `index` is `Some` exactly when the slot holds a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub tag: Tag,
    pub slot: Slot,
    pub index: Option<usize>,
    /// Nearest enclosing scope at this point of the walk.
    pub scope: Option<ScopeId>,
}

struct Link {
    frame: Frame,
    next: Option<Rc<Link>>,
    depth: usize,
}

/// Persistent linked chain of ancestry frames.
///
/// `push` and `clone` are O(1); retrieving the n-th frame from the tip is
/// O(n). The default value is the shared empty chain.
#[derive(Clone, Default)]
pub struct ParentChain {
    head: Option<Rc<Link>>,
}

impl ParentChain {
    /// The empty chain (a program root has no ancestors).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Extend the chain with one frame, leaving `self` untouched.
    pub fn push(&self, frame: Frame) -> Self {
        let depth = self.depth() + 1;
        Self {
            head: Some(Rc::new(Link {
                frame,
                next: self.head.clone(),
                depth,
            })),
        }
    }

    /// Number of frames in the chain.
    pub fn depth(&self) -> usize {
        self.head.as_ref().map_or(0, |l| l.depth)
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// The immediate parent frame, if any.
    pub fn parent(&self) -> Option<&Frame> {
        self.last(0)
    }

    /// The n-th frame from the tip (n = 0 is the immediate parent).
    pub fn last(&self, n: usize) -> Option<&Frame> {
        let mut link = self.head.as_deref()?;
        for _ in 0..n {
            link = link.next.as_deref()?;
        }
        Some(&link.frame)
    }

    /// Nearest enclosing scope recorded on any frame, tip first.
    pub fn nearest_scope(&self) -> Option<ScopeId> {
        let mut link = self.head.as_deref();
        while let Some(l) = link {
            if let Some(scope) = l.frame.scope {
                return Some(scope);
            }
            link = l.next.as_deref();
        }
        None
    }

    /// True when the current node sits in a list slot (its frame carries
    /// an index).
    pub fn in_list_slot(&self) -> bool {
        self.parent().is_some_and(|f| f.index.is_some())
    }
}

impl std::fmt::Debug for ParentChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut frames = Vec::new();
        let mut link = self.head.as_deref();
        while let Some(l) = link {
            frames.push(&l.frame);
            link = l.next.as_deref();
        }
        f.debug_list().entries(frames).finish()
    }
}
