//! Programmatic AST construction
//!
//! Used by embedders that produce trees without going through a parser,
//! and by the test suites. Children must be built before their parents.

use crate::errors::SourceSpan;

use super::{Ast, BinaryOp, Node, NodeId, NodeKind, UnaryOp};

#[derive(Debug, Default)]
pub struct AstBuilder {
    nodes: Vec<Node>,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Add a node with an explicit span
    pub fn push(&mut self, kind: NodeKind, span: SourceSpan) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { kind, span });
        id
    }

    fn add(&mut self, kind: NodeKind) -> NodeId {
        self.push(kind, SourceSpan::default())
    }

    /// Wrap the given top-level statements in a root node and finish the tree
    pub fn finish(mut self, statements: Vec<NodeId>) -> Ast {
        let root = self.add(NodeKind::Root { statements });
        Ast::new(self.nodes, root)
    }

    pub fn int(&mut self, value: i64) -> NodeId {
        self.add(NodeKind::IntLiteral(value))
    }

    pub fn float(&mut self, value: f64) -> NodeId {
        self.add(NodeKind::FloatLiteral(value))
    }

    pub fn string(&mut self, value: &str) -> NodeId {
        self.add(NodeKind::StringLiteral(value.to_string()))
    }

    pub fn term(&mut self, symbol: &str) -> NodeId {
        self.add(NodeKind::TermLiteral(symbol.to_string()))
    }

    pub fn reference(&mut self, name: &str) -> NodeId {
        self.add(NodeKind::Reference {
            name: name.to_string(),
        })
    }

    /// `$Name`
    pub fn constructor(&mut self, struct_name: &str) -> NodeId {
        let reference = self.reference(struct_name);
        self.add(NodeKind::Constructor { reference })
    }

    pub fn array(&mut self, components: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::ArrayLiteral { components })
    }

    pub fn paren(&mut self, expression: NodeId) -> NodeId {
        self.add(NodeKind::Parenthesized { expression })
    }

    pub fn field(&mut self, stem: NodeId, field: &str) -> NodeId {
        self.add(NodeKind::FieldAccess {
            stem,
            field: field.to_string(),
        })
    }

    pub fn index(&mut self, array: NodeId, index: NodeId) -> NodeId {
        self.add(NodeKind::ArrayAccess { array, index })
    }

    pub fn call(&mut self, function: NodeId, arguments: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Call {
            function,
            type_argument: None,
            arguments,
        })
    }

    /// `name(args)`
    pub fn call_named(&mut self, name: &str, arguments: Vec<NodeId>) -> NodeId {
        let function = self.reference(name);
        self.call(function, arguments)
    }

    /// `name<TypeArg>(args)`
    pub fn call_generic(
        &mut self,
        name: &str,
        type_argument: &str,
        arguments: Vec<NodeId>,
    ) -> NodeId {
        let function = self.reference(name);
        let type_argument = self.simple_type(type_argument);
        self.add(NodeKind::Call {
            function,
            type_argument: Some(type_argument),
            arguments,
        })
    }

    pub fn unary(&mut self, op: UnaryOp, operand: NodeId) -> NodeId {
        self.add(NodeKind::Unary { op, operand })
    }

    pub fn binary(&mut self, op: BinaryOp, left: NodeId, right: NodeId) -> NodeId {
        self.add(NodeKind::Binary { op, left, right })
    }

    pub fn assign(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.add(NodeKind::Assignment { left, right })
    }

    pub fn simple_type(&mut self, name: &str) -> NodeId {
        self.add(NodeKind::SimpleType {
            name: name.to_string(),
        })
    }

    /// `Name[]`
    pub fn array_type(&mut self, component: &str) -> NodeId {
        let component = self.simple_type(component);
        self.add(NodeKind::ArrayType { component })
    }

    pub fn block(&mut self, statements: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Block { statements })
    }

    /// `var name: Type = initializer`
    pub fn var(&mut self, name: &str, ty: &str, initializer: NodeId) -> NodeId {
        let ty = self.simple_type(ty);
        self.var_typed(name, ty, initializer)
    }

    /// `var name: <type node> = initializer`
    pub fn var_typed(&mut self, name: &str, ty: NodeId, initializer: NodeId) -> NodeId {
        self.add(NodeKind::VarDecl {
            name: name.to_string(),
            ty,
            initializer,
        })
    }

    pub fn field_decl(&mut self, name: &str, ty: &str) -> NodeId {
        let ty = self.simple_type(ty);
        self.add(NodeKind::FieldDecl {
            name: name.to_string(),
            ty,
        })
    }

    pub fn param(&mut self, name: &str, ty: &str) -> NodeId {
        let ty = self.simple_type(ty);
        self.param_typed(name, ty)
    }

    pub fn param_typed(&mut self, name: &str, ty: NodeId) -> NodeId {
        self.add(NodeKind::Parameter {
            name: name.to_string(),
            ty,
        })
    }

    /// `fun name(params): ret { statements }`; a missing return type means `Void`
    pub fn fun(
        &mut self,
        name: &str,
        parameters: Vec<NodeId>,
        return_type: Option<&str>,
        statements: Vec<NodeId>,
    ) -> NodeId {
        self.function(name, None, parameters, return_type, statements)
    }

    /// `template<generic> name(params): ret { statements }`
    pub fn template(
        &mut self,
        name: &str,
        generic: &str,
        parameters: Vec<NodeId>,
        return_type: Option<&str>,
        statements: Vec<NodeId>,
    ) -> NodeId {
        let generic = self.add(NodeKind::GenericParam {
            name: generic.to_string(),
        });
        self.function(name, Some(generic), parameters, return_type, statements)
    }

    fn function(
        &mut self,
        name: &str,
        generic: Option<NodeId>,
        parameters: Vec<NodeId>,
        return_type: Option<&str>,
        statements: Vec<NodeId>,
    ) -> NodeId {
        let return_type = self.simple_type(return_type.unwrap_or("Void"));
        let body = self.block(statements);
        self.add(NodeKind::FunDecl {
            name: name.to_string(),
            generic,
            parameters,
            return_type,
            body,
        })
    }

    pub fn structure(&mut self, name: &str, fields: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::StructDecl {
            name: name.to_string(),
            fields,
        })
    }

    pub fn if_else(
        &mut self,
        condition: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    ) -> NodeId {
        self.add(NodeKind::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    pub fn while_loop(&mut self, condition: NodeId, body: NodeId) -> NodeId {
        self.add(NodeKind::While { condition, body })
    }

    pub fn for_loop(
        &mut self,
        init: NodeId,
        condition: NodeId,
        step: NodeId,
        body: NodeId,
    ) -> NodeId {
        self.add(NodeKind::For {
            init,
            condition,
            step,
            body,
        })
    }

    pub fn ret(&mut self, expression: Option<NodeId>) -> NodeId {
        self.add(NodeKind::Return { expression })
    }

    pub fn expr_stmt(&mut self, expression: NodeId) -> NodeId {
        self.add(NodeKind::ExpressionStatement { expression })
    }

    pub fn fact(&mut self, name: &str, terms: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Fact {
            name: name.to_string(),
            terms,
        })
    }

    pub fn atom(&mut self, name: &str, terms: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Atom {
            name: name.to_string(),
            terms,
        })
    }

    pub fn clause(&mut self, head: NodeId, body: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Clause { head, body })
    }

    pub fn query(&mut self, goal: NodeId) -> NodeId {
        self.add(NodeKind::Query { goal })
    }
}
