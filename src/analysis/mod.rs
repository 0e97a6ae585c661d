//! Semantic analysis
//!
//! Name resolution and type checking over a finished [`Ast`]. The pass walks
//! the tree once to build scopes and register attribute rules, then runs the
//! rules to a fixpoint. Errors are collected, never thrown.

mod checker;
mod engine;
mod generics;
mod logic;
mod scope;
mod types;
mod walker;


pub use engine::{Attr, CellId, Conflict, Engine, Firing, Fixpoint, Rule, RuleId, Subject, Value};
pub use generics::PlaceholderGraph;
pub use logic::predicate_arity;
pub use scope::{Builtin, DeclRef, Scope, ScopeId, Scopes};
pub use types::{PlaceholderRef, StructRef, Type};

use rustc_hash::FxHashMap;

use crate::ast::{Ast, NodeId, NodeKind};
use crate::errors::{SemaError, SemaResult};
use walker::{Walked, Walker};

/// What every rule can see while it fires
///
/// The scope tree and the placeholder graph are owned here so that the rules
/// only borrow from the caller's tree and configuration.
pub(crate) struct Context<'a> {
    pub ast: &'a Ast,
    pub config: &'a AnalysisConfig,
    pub scopes: Scopes,
    pub placeholders: PlaceholderGraph,
}

pub(crate) type SemaRule<'a> = Rule<'a, Context<'a>>;
pub(crate) type SemaFiring<'f, 'a> = Firing<'f, 'a, Context<'a>>;

/// What to do with a second declaration of a name in one scope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Report it and keep the first declaration
    #[default]
    Error,
    /// Let the later declaration replace the earlier one
    LastWins,
}

/// Options for the pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// The only name a template parameter may have
    pub placeholder_name: String,
    pub duplicates: DuplicatePolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            placeholder_name: "T".to_string(),
            duplicates: DuplicatePolicy::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placeholder_name(mut self, name: impl Into<String>) -> Self {
        self.placeholder_name = name.into();
        self
    }

    pub fn with_duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }
}

/// The annotated view of a tree after the pass
#[derive(Debug, Clone)]
pub struct Analysis {
    cells: FxHashMap<CellId, Value>,
    errors: Vec<SemaError>,
    conflicts: Vec<Conflict>,
    scopes: Scopes,
    stalled: usize,
}

impl Analysis {
    pub fn get(&self, cell: CellId) -> Option<&Value> {
        self.cells.get(&cell)
    }

    /// `type` of an expression or declaration
    pub fn type_of(&self, node: NodeId) -> Option<&Type> {
        self.get(CellId::ty(node)).and_then(Value::as_type)
    }

    /// Declaration a reference or type name resolved to
    pub fn decl_of(&self, node: NodeId) -> Option<DeclRef> {
        self.get(CellId::new(node, Attr::Decl)).and_then(Value::as_decl)
    }

    pub fn scope_of(&self, node: NodeId) -> Option<ScopeId> {
        self.get(CellId::new(node, Attr::Scope)).and_then(Value::as_scope)
    }

    pub fn returns(&self, node: NodeId) -> Option<bool> {
        self.get(CellId::returns(node)).and_then(Value::as_bool)
    }

    /// Type denoted by a type node
    pub fn value_of(&self, node: NodeId) -> Option<&Type> {
        self.get(CellId::value(node)).and_then(Value::as_type)
    }

    /// Type introduced by a struct, template parameter or built-in type
    pub fn declared_of(&self, decl: impl Into<Subject>) -> Option<&Type> {
        self.get(CellId::declared(decl)).and_then(Value::as_type)
    }

    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.get(CellId::new(node, Attr::Index)).and_then(Value::as_index)
    }

    pub fn errors(&self) -> &[SemaError] {
        &self.errors
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    /// Every attribute cell, in a stable order
    pub fn attributes(&self) -> Vec<(CellId, &Value)> {
        let mut cells: Vec<_> = self.cells.iter().map(|(cell, value)| (*cell, value)).collect();
        cells.sort_by_key(|(cell, _)| *cell);
        cells
    }

    /// Cells some rule tried to write a second time
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    /// Rules that never fired
    pub fn stalled(&self) -> usize {
        self.stalled
    }

    /// The analysis if no error was found, every error otherwise
    pub fn into_result(self) -> SemaResult<Analysis> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(self.errors)
        }
    }
}

/// Run the pass with the default configuration
pub fn analyze(ast: &Ast) -> Analysis {
    analyze_with(ast, &AnalysisConfig::default())
}

pub fn analyze_with(ast: &Ast, config: &AnalysisConfig) -> Analysis {
    tracing::debug!(nodes = ast.len(), "starting semantic analysis");

    let Walked {
        mut engine,
        scopes,
        resolved,
        deferred,
    } = Walker::new(ast, config).walk();

    let placeholders = PlaceholderGraph::build(ast, |node| {
        resolved.get(&node).copied().or_else(|| {
            let scope = deferred.get(&node)?;
            let name = match ast.kind(node) {
                NodeKind::Reference { name } | NodeKind::SimpleType { name } => name,
                _ => return None,
            };
            scopes.lookup(*scope, name).map(|(decl, _)| decl)
        })
    });

    let ctx = Context {
        ast,
        config,
        scopes,
        placeholders,
    };
    let fixpoint = engine.run(&ctx);
    let (cells, errors, conflicts) = engine.into_parts();

    tracing::debug!(
        cells = cells.len(),
        errors = errors.len(),
        fired = fixpoint.fired,
        stalled = fixpoint.stalled,
        "semantic analysis finished"
    );

    Analysis {
        cells,
        errors,
        conflicts,
        scopes: ctx.scopes,
        stalled: fixpoint.stalled,
    }
}
