//! Abstract Syntax Tree (AST) consumed by the semantic pass
//!
//! The tree is produced by an external parser and is never restructured:
//! nodes live in an arena and refer to their children by [`NodeId`].

mod builder;

use std::fmt;

use crate::errors::SourceSpan;

pub use builder::AstBuilder;

/// Index of a node in the [`Ast`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A complete program
#[derive(Debug, Clone)]
pub struct Ast {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Ast {
    /// Build an AST from its arena and root node.
    ///
    /// The root must be a [`NodeKind::Root`] node and every child id must
    /// point into `nodes`.
    pub fn new(nodes: Vec<Node>, root: NodeId) -> Self {
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn span(&self, id: NodeId) -> SourceSpan {
        self.nodes[id.index()].span
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node ids in arena order
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Name introduced by a declaration node, if it is one
    pub fn declared_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::VarDecl { name, .. }
            | NodeKind::FieldDecl { name, .. }
            | NodeKind::Parameter { name, .. }
            | NodeKind::FunDecl { name, .. }
            | NodeKind::StructDecl { name, .. }
            | NodeKind::GenericParam { name }
            | NodeKind::Fact { name, .. } => Some(name),
            NodeKind::Clause { head, .. } => match self.kind(*head) {
                NodeKind::Atom { name, .. } => Some(name),
                _ => None,
            },
            _ => None,
        }
    }
}

/// A node with its source location
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: SourceSpan,
}

/// Every node kind the parser can produce
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // Expressions
    /// Integer literal: `42`
    IntLiteral(i64),
    /// Floating point literal: `4.2`
    FloatLiteral(f64),
    /// String literal: `"hello"`
    StringLiteral(String),
    /// Logic atom symbol: `#harry`
    TermLiteral(String),
    /// Name use: `x`
    Reference { name: String },
    /// Constructor operator on a struct reference: `$Point`
    Constructor { reference: NodeId },
    /// Array literal: `[a, b, c]`
    ArrayLiteral { components: Vec<NodeId> },
    /// `(expr)`
    Parenthesized { expression: NodeId },
    /// `stem.field`
    FieldAccess { stem: NodeId, field: String },
    /// `array[index]`
    ArrayAccess { array: NodeId, index: NodeId },
    /// `function<TypeArg>(args)`; the type argument is optional
    Call {
        function: NodeId,
        type_argument: Option<NodeId>,
        arguments: Vec<NodeId>,
    },
    Unary { op: UnaryOp, operand: NodeId },
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    /// `left = right`
    Assignment { left: NodeId, right: NodeId },

    // Types
    /// Named type: `Int`, `Point`, `T`
    SimpleType { name: String },
    /// Array type: `Int[]`
    ArrayType { component: NodeId },

    // Declarations and statements
    /// The program
    Root { statements: Vec<NodeId> },
    /// `{ statements }`
    Block { statements: Vec<NodeId> },
    /// `var name: ty = initializer`
    VarDecl {
        name: String,
        ty: NodeId,
        initializer: NodeId,
    },
    /// `var name: ty` inside a struct
    FieldDecl { name: String, ty: NodeId },
    /// `name: ty` in a parameter list
    Parameter { name: String, ty: NodeId },
    /// `template<T> fun name(params): ret { body }`
    FunDecl {
        name: String,
        generic: Option<NodeId>,
        parameters: Vec<NodeId>,
        return_type: NodeId,
        body: NodeId,
    },
    /// `struct Name { fields }`
    StructDecl { name: String, fields: Vec<NodeId> },
    /// The type parameter of a template function
    GenericParam { name: String },
    If {
        condition: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },
    While { condition: NodeId, body: NodeId },
    /// `for (var i: Int = 0 : condition : step) body`
    For {
        init: NodeId,
        condition: NodeId,
        step: NodeId,
        body: NodeId,
    },
    Return { expression: Option<NodeId> },
    ExpressionStatement { expression: NodeId },

    // Logic declarations
    /// `LP name(terms)`
    Fact { name: String, terms: Vec<NodeId> },
    /// `LPC head :- body1, body2`
    Clause { head: NodeId, body: Vec<NodeId> },
    /// `-? goal`
    Query { goal: NodeId },
    /// `name(terms)` inside a clause or query
    Atom { name: String, terms: Vec<NodeId> },
}

impl NodeKind {
    /// Whether the node is an lvalue form
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self,
            NodeKind::Reference { .. } | NodeKind::FieldAccess { .. } | NodeKind::ArrayAccess { .. }
        )
    }

    /// Whether the node can carry a `returns` attribute
    pub fn is_return_container(&self) -> bool {
        matches!(
            self,
            NodeKind::Block { .. } | NodeKind::If { .. } | NodeKind::Return { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `++`
    Increment,
    /// `--`
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Subtract
                | BinaryOp::Multiply
                | BinaryOp::Divide
                | BinaryOp::Remainder
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual
        )
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Equal | BinaryOp::NotEqual)
    }

    pub fn is_logic(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Xor)
    }

    /// Verb used in diagnostics ("trying to add Int with Bool")
    pub fn verb(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Subtract => "subtract",
            BinaryOp::Multiply => "multiply",
            BinaryOp::Divide => "divide",
            BinaryOp::Remainder => "take the remainder of",
            BinaryOp::Equal | BinaryOp::NotEqual => "compare",
            BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
                "order"
            }
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Remainder => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Xor => "^",
        };
        write!(f, "{}", symbol)
    }
}
