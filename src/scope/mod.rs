//! Lexical scopes and the symbol model.
//!
//! Scopes form an acyclic tree mirroring the program's nesting. Each
//! scope maps names to [`Variable`]s; a variable records a bounded history
//! of assigned values (newest first), a recursive property tree so that
//! `a.b.c` chains resolve as nested variables, and optional rename
//! metadata written by a renamer hook.
//!
//! Name resolution is lexical: the first enclosing scope that defines the
//! name wins. Resolution visits each scope at most once; revisiting a
//! scope is a corrupt-tree condition and raises a fatal error.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::ast::{Node, Span};
use crate::error::{Result, UnweaveError};

/// Upper bound on a variable's assigned-value history. Obfuscated inputs
/// reassign the same slot thousands of times; older entries are dropped
/// silently.
pub const MAX_VALUE_HISTORY: usize = 10;

/// A unique identifier for a scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// The program root scope.
    pub fn root() -> Self {
        Self(0)
    }
}

/// Confidence attached to rename suggestions and detector findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn name(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

/// A variable declared or assigned in some scope.
#[derive(Debug, Clone, Default)]
pub struct Variable {
    /// One lexical identifier (never a dotted path).
    pub name: String,
    /// Assigned value nodes, newest first, capped at
    /// [`MAX_VALUE_HISTORY`].
    history: VecDeque<Node>,
    /// Nested member variables: `a.b` lives at `properties["b"]` of `a`.
    pub properties: HashMap<String, Variable>,
    /// Spans of declaration/assignment sites, for context extraction.
    pub definers: Vec<Span>,
    /// How many times a property of this variable was read.
    property_reads: usize,
    pub suggested_name: Option<String>,
    pub confidence: Option<Confidence>,
    pub reason: Option<String>,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Record an assigned value; the newest entry becomes the current
    /// value and the history is trimmed to the bound.
    pub fn set_value(&mut self, value: Node) {
        self.history.push_front(value);
        self.history.truncate(MAX_VALUE_HISTORY);
    }

    /// The current (most recently assigned) value.
    pub fn current_value(&self) -> Option<&Node> {
        self.history.front()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn note_property_read(&mut self) {
        self.property_reads += 1;
    }

    /// A variable counts as used once it has an assignment or any of its
    /// properties is used.
    pub fn is_used(&self) -> bool {
        !self.history.is_empty()
            || self.property_reads > 0
            || self.properties.values().any(Variable::is_used)
    }

    /// Child variable for a property name, created on first use.
    pub fn property_mut(&mut self, name: &str) -> &mut Variable {
        self.properties
            .entry(name.to_string())
            .or_insert_with(|| Variable::new(name))
    }

    pub fn property(&self, name: &str) -> Option<&Variable> {
        self.properties.get(name)
    }

    pub fn add_definer(&mut self, span: Option<Span>) {
        if let Some(span) = span {
            self.definers.push(span);
        }
    }
}

/// A function known to the run, tracked across nodes for invocation
/// counting and empty-function pruning.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub name: String,
    /// Scope the function was declared in.
    pub scope: ScopeId,
    pub param_count: usize,
    pub call_count: usize,
    /// Body is empty or a bare `return`.
    pub is_empty: bool,
    pub suggested_name: Option<String>,
    pub confidence: Option<Confidence>,
    pub reason: Option<String>,
}

impl FunctionInfo {
    pub fn new(name: impl Into<String>, scope: ScopeId, param_count: usize) -> Self {
        Self {
            name: name.into(),
            scope,
            param_count,
            call_count: 0,
            is_empty: false,
            suggested_name: None,
            confidence: None,
            reason: None,
        }
    }
}

/// One lexical region and its symbol table.
#[derive(Debug, Default)]
pub struct Scope {
    pub id: ScopeId,
    pub parent: Option<ScopeId>,
    variables: HashMap<String, Variable>,
    /// Names of functions declared directly in this scope.
    pub function_names: Vec<String>,
}

impl Scope {
    pub fn declares(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.get_mut(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }
}

/// All scopes of one run, keyed by id. Owned by the processing context;
/// created once by the scope pre-pass and never torn down during the
/// fixpoint.
#[derive(Debug)]
pub struct ScopeTable {
    scopes: HashMap<ScopeId, Scope>,
    next_id: u32,
}

impl Default for ScopeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTable {
    pub fn new() -> Self {
        let mut scopes = HashMap::new();
        scopes.insert(
            ScopeId::root(),
            Scope {
                id: ScopeId::root(),
                ..Scope::default()
            },
        );
        Self { scopes, next_id: 1 }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId::root()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Create a child scope of `parent`.
    pub fn create_scope(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.next_id);
        self.next_id += 1;
        self.scopes.insert(
            id,
            Scope {
                id,
                parent: Some(parent),
                ..Scope::default()
            },
        );
        id
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(&id)
    }

    pub fn get_mut(&mut self, id: ScopeId) -> Option<&mut Scope> {
        self.scopes.get_mut(&id)
    }

    /// Install a variable for `path` in `scope`, idempotently. A dotted
    /// path installs nested property variables under the head name.
    /// Returns the head name.
    pub fn add_variable(&mut self, scope: ScopeId, path: &str) -> Result<()> {
        let scope = self
            .scopes
            .get_mut(&scope)
            .ok_or(UnweaveError::UnknownScope(scope))?;
        let mut parts = path.split('.');
        let head = parts.next().unwrap_or(path);
        let mut var = scope
            .variables
            .entry(head.to_string())
            .or_insert_with(|| Variable::new(head));
        for part in parts {
            var = var.property_mut(part);
        }
        Ok(())
    }

    /// Record an assignment of `value` to `path`, resolving the head name
    /// lexically from `scope`. Undeclared heads are not created here; the
    /// assignment rewriter decides whether to promote them to the root
    /// scope (JavaScript's implicit globals).
    pub fn set_value(
        &mut self,
        scope: ScopeId,
        path: &str,
        value: Node,
        definer: Option<Span>,
    ) -> Result<bool> {
        let head = path.split('.').next().unwrap_or(path);
        let Some(owner) = self.defining_scope(scope, head)? else {
            return Ok(false);
        };
        let scope = self.scopes.get_mut(&owner).expect("scope exists");
        let mut var = scope.variables.get_mut(head).expect("declared");
        for part in path.split('.').skip(1) {
            var = var.property_mut(part);
        }
        var.set_value(value);
        var.add_definer(definer);
        Ok(true)
    }

    /// Install `path` directly in the root scope (implicit global).
    pub fn promote_global(&mut self, path: &str) -> Result<()> {
        self.add_variable(ScopeId::root(), path)
    }

    /// Resolve `path` lexically from `scope`: walk parent scopes to find
    /// the first one declaring the head name, then follow properties for
    /// the remaining segments.
    ///
    /// Each scope is visited at most once; a revisit means the scope tree
    /// is corrupt and is reported as a fatal error.
    pub fn get_variable(&self, scope: ScopeId, path: &str) -> Result<Option<&Variable>> {
        let head = path.split('.').next().unwrap_or(path);
        let Some(owner) = self.defining_scope(scope, head)? else {
            return Ok(None);
        };
        let mut var = self
            .scopes
            .get(&owner)
            .and_then(|s| s.variable(head))
            .expect("defining scope declares head");
        for part in path.split('.').skip(1) {
            match var.property(part) {
                Some(child) => var = child,
                None => return Ok(None),
            }
        }
        Ok(Some(var))
    }

    /// The scope that lexically defines `name`, searched from `scope`
    /// upward. Cycle-guarded.
    pub fn defining_scope(&self, scope: ScopeId, name: &str) -> Result<Option<ScopeId>> {
        let mut visited = HashSet::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            if !visited.insert(id) {
                return Err(UnweaveError::CircularScope(id));
            }
            let scope = self
                .scopes
                .get(&id)
                .ok_or(UnweaveError::UnknownScope(id))?;
            if scope.declares(name) {
                return Ok(Some(id));
            }
            current = scope.parent;
        }
        Ok(None)
    }

    /// Mutable access to the variable for `path` resolved from `scope`.
    pub fn get_variable_mut(&mut self, scope: ScopeId, path: &str) -> Result<Option<&mut Variable>> {
        let head = path.split('.').next().unwrap_or(path);
        let Some(owner) = self.defining_scope(scope, head)? else {
            return Ok(None);
        };
        let scope = self.scopes.get_mut(&owner).expect("scope exists");
        let mut var = scope.variables.get_mut(head).expect("declared");
        for part in path.split('.').skip(1) {
            match var.properties.get_mut(part) {
                Some(child) => var = child,
                None => return Ok(None),
            }
        }
        Ok(Some(var))
    }

    /// Register a function declaration in `scope`.
    pub fn add_function(&mut self, scope: ScopeId, name: &str) -> Result<()> {
        self.add_variable(scope, name)?;
        if let Some(s) = self.scopes.get_mut(&scope) {
            if !s.function_names.iter().any(|n| n == name) {
                s.function_names.push(name.to_string());
            }
        }
        Ok(())
    }

    /// Verify the whole table is acyclic, for the structural-invariant
    /// check after scope construction.
    pub fn check_acyclic(&self) -> Result<()> {
        for &id in self.scopes.keys() {
            let mut visited = HashSet::new();
            let mut current = Some(id);
            while let Some(c) = current {
                if !visited.insert(c) {
                    return Err(UnweaveError::CircularScope(c));
                }
                current = self.scopes.get(&c).and_then(|s| s.parent);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;

    #[test]
    fn test_history_is_bounded() {
        let mut var = Variable::new("x");
        for i in 0..25 {
            var.set_value(Node::number(f64::from(i)));
        }
        assert_eq!(var.history_len(), MAX_VALUE_HISTORY);
        // Newest first.
        assert_eq!(var.current_value().unwrap().number_value(), Some(24.0));
    }

    #[test]
    fn test_lexical_shadowing() {
        let mut table = ScopeTable::new();
        let inner = table.create_scope(table.root());

        table.add_variable(table.root(), "x").unwrap();
        table.add_variable(inner, "x").unwrap();

        table
            .set_value(inner, "x", Node::number(1.0), None)
            .unwrap();

        // The inner scope shadows the root: the root's x has no value.
        let root_x = table.get_variable(table.root(), "x").unwrap().unwrap();
        assert!(root_x.current_value().is_none());

        let inner_x = table.get_variable(inner, "x").unwrap().unwrap();
        assert_eq!(inner_x.current_value().unwrap().number_value(), Some(1.0));
    }

    #[test]
    fn test_dotted_path_resolution() {
        let mut table = ScopeTable::new();
        table.add_variable(table.root(), "a.b.c").unwrap();

        let a = table.get_variable(table.root(), "a").unwrap().unwrap();
        assert!(a.property("b").is_some());

        let c = table.get_variable(table.root(), "a.b.c").unwrap();
        assert!(c.is_some());

        let missing = table.get_variable(table.root(), "a.b.z").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_lookup_walks_parent_scopes() {
        let mut table = ScopeTable::new();
        let f = table.create_scope(table.root());
        let g = table.create_scope(f);

        table.add_variable(table.root(), "top").unwrap();
        assert!(table.get_variable(g, "top").unwrap().is_some());
        assert!(table.get_variable(g, "missing").unwrap().is_none());
    }

    #[test]
    fn test_cycle_detection_is_fatal() {
        let mut table = ScopeTable::new();
        let a = table.create_scope(table.root());
        let b = table.create_scope(a);
        // Corrupt the tree: a's parent becomes b.
        table.get_mut(a).unwrap().parent = Some(b);

        let err = table.get_variable(b, "anything").unwrap_err();
        assert!(matches!(err, UnweaveError::CircularScope(_)));
        assert!(table.check_acyclic().is_err());
    }

    #[test]
    fn test_is_used_via_property() {
        let mut var = Variable::new("obj");
        assert!(!var.is_used());
        var.property_mut("field").set_value(Node::number(1.0));
        assert!(var.is_used());
    }

    #[test]
    fn test_set_value_skips_undeclared() {
        let mut table = ScopeTable::new();
        let inner = table.create_scope(table.root());
        let hit = table
            .set_value(inner, "ghost", Node::number(1.0), None)
            .unwrap();
        assert!(!hit);
    }
}
