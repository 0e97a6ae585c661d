//! Scopes and declarations for name resolution
//!
//! Scopes live in an arena and point to their parent by index. A scope maps
//! names to the declarations visible in it; lookups walk the parent chain.

use std::fmt;

use indexmap::IndexMap;

use super::types::Type;
use crate::ast::{Ast, NodeId, NodeKind};

/// Index of a scope in the [`Scopes`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope{}", self.0)
    }
}

/// Declarations that exist without a node in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Builtin {
    Int,
    Float,
    Bool,
    String,
    Void,
    Type,
    Term,
    True,
    False,
    Null,
    Print,
}

impl Builtin {
    pub const ALL: [Builtin; 11] = [
        Builtin::Int,
        Builtin::Float,
        Builtin::Bool,
        Builtin::String,
        Builtin::Void,
        Builtin::Type,
        Builtin::Term,
        Builtin::True,
        Builtin::False,
        Builtin::Null,
        Builtin::Print,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Int => "Int",
            Builtin::Float => "Float",
            Builtin::Bool => "Bool",
            Builtin::String => "String",
            Builtin::Void => "Void",
            Builtin::Type => "Type",
            Builtin::Term => "Term",
            Builtin::True => "true",
            Builtin::False => "false",
            Builtin::Null => "null",
            Builtin::Print => "print",
        }
    }

    /// The `type` attribute of the declaration
    pub fn value_type(self) -> Type {
        match self {
            Builtin::True | Builtin::False => Type::Bool,
            Builtin::Null => Type::Null,
            Builtin::Print => Type::function(vec![Type::String], Type::String),
            _ => Type::Meta,
        }
    }

    /// The type introduced by a type declaration, `None` for values
    pub fn declared(self) -> Option<Type> {
        match self {
            Builtin::Int => Some(Type::Int),
            Builtin::Float => Some(Type::Float),
            Builtin::Bool => Some(Type::Bool),
            Builtin::String => Some(Type::String),
            Builtin::Void => Some(Type::Void),
            Builtin::Type => Some(Type::Meta),
            Builtin::Term => Some(Type::Term),
            Builtin::True | Builtin::False | Builtin::Null | Builtin::Print => None,
        }
    }
}

/// What a name resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeclRef {
    Node(NodeId),
    Builtin(Builtin),
}

impl DeclRef {
    pub fn node(self) -> Option<NodeId> {
        match self {
            DeclRef::Node(id) => Some(id),
            DeclRef::Builtin(_) => None,
        }
    }

    /// Whether the declaration introduces a type
    pub fn is_type(self, ast: &Ast) -> bool {
        match self {
            DeclRef::Builtin(builtin) => builtin.declared().is_some(),
            DeclRef::Node(id) => matches!(
                ast.kind(id),
                NodeKind::StructDecl { .. } | NodeKind::GenericParam { .. }
            ),
        }
    }

    /// Whether the declaration is a logic predicate (fact or clause)
    pub fn is_predicate(self, ast: &Ast) -> bool {
        match self {
            DeclRef::Builtin(_) => false,
            DeclRef::Node(id) => matches!(
                ast.kind(id),
                NodeKind::Fact { .. } | NodeKind::Clause { .. }
            ),
        }
    }

    /// What kind of thing is declared, for diagnostics
    pub fn describe(self, ast: &Ast) -> &'static str {
        match self {
            DeclRef::Builtin(builtin) if builtin.declared().is_some() => "built-in type",
            DeclRef::Builtin(Builtin::Print) => "built-in function",
            DeclRef::Builtin(_) => "built-in constant",
            DeclRef::Node(id) => match ast.kind(id) {
                NodeKind::VarDecl { .. } => "variable",
                NodeKind::Parameter { .. } => "parameter",
                NodeKind::FieldDecl { .. } => "field",
                NodeKind::FunDecl { .. } => "function",
                NodeKind::StructDecl { .. } => "struct",
                NodeKind::GenericParam { .. } => "template parameter",
                NodeKind::Fact { .. } => "fact",
                NodeKind::Clause { .. } => "clause",
                _ => "unknown",
            },
        }
    }
}

impl From<NodeId> for DeclRef {
    fn from(id: NodeId) -> Self {
        DeclRef::Node(id)
    }
}

impl From<Builtin> for DeclRef {
    fn from(builtin: Builtin) -> Self {
        DeclRef::Builtin(builtin)
    }
}

/// A single scope
#[derive(Debug, Clone)]
pub struct Scope {
    parent: Option<ScopeId>,
    /// Node that opened the scope (root, block or function)
    owner: NodeId,
    /// Names in declaration order
    names: IndexMap<String, DeclRef>,
}

impl Scope {
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Look up a name in this scope only
    pub fn get(&self, name: &str) -> Option<DeclRef> {
        self.names.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = (&str, DeclRef)> {
        self.names.iter().map(|(name, decl)| (name.as_str(), *decl))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// All scopes of a program
#[derive(Debug, Clone, Default)]
pub struct Scopes {
    scopes: Vec<Scope>,
}

impl Scopes {
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    /// Create the root scope, pre-populated with the built-in declarations
    pub fn root(&mut self, owner: NodeId) -> ScopeId {
        let id = self.push(None, owner);
        for builtin in Builtin::ALL {
            self.scopes[id.index()]
                .names
                .insert(builtin.name().to_string(), DeclRef::Builtin(builtin));
        }
        id
    }

    /// Create a new scope nested in `parent`
    pub fn push(&mut self, parent: Option<ScopeId>, owner: NodeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent,
            owner,
            names: IndexMap::new(),
        });
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    /// Declare a name in `scope`.
    ///
    /// Returns the existing declaration if the name is already taken in that
    /// scope, in which case nothing changes.
    pub fn declare(&mut self, scope: ScopeId, name: &str, decl: DeclRef) -> Result<(), DeclRef> {
        let names = &mut self.scopes[scope.index()].names;
        if let Some(existing) = names.get(name) {
            return Err(*existing);
        }
        names.insert(name.to_string(), decl);
        Ok(())
    }

    /// Declare a name in `scope`, replacing any previous declaration
    pub fn replace(&mut self, scope: ScopeId, name: &str, decl: DeclRef) -> Option<DeclRef> {
        self.scopes[scope.index()]
            .names
            .insert(name.to_string(), decl)
    }

    /// Look up a name, searching from `scope` outward.
    ///
    /// Returns the declaration and the scope it was found in.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<(DeclRef, ScopeId)> {
        self.ancestors(scope)
            .find_map(|id| self.get(id).get(name).map(|decl| (decl, id)))
    }

    /// `scope` followed by all its enclosing scopes
    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), move |id| self.get(*id).parent)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScopeId, &Scope)> {
        self.scopes
            .iter()
            .enumerate()
            .map(|(i, scope)| (ScopeId(i as u32), scope))
    }
}
