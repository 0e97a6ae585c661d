//! Tree traversal and rule registration
//!
//! A single depth-first walk. Root, block and function nodes push a scope on
//! entry and pop it on exit; every other handler only registers rules. Literal
//! types are the one thing written synchronously.

use rustc_hash::FxHashMap;

use super::checker;
use super::engine::{Attr, CellId, Engine};
use super::generics;
use super::logic;
use super::scope::{Builtin, DeclRef, ScopeId, Scopes};
use super::types::{PlaceholderRef, StructRef, Type};
use super::{AnalysisConfig, Context, DuplicatePolicy, SemaRule};
use crate::ast::{Ast, NodeId, NodeKind};
use crate::errors::{ErrorKind, SemaError};

/// Where an expression with nothing to infer from takes its type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Inference {
    Nothing,
    /// Initializer of the variable
    Variable(NodeId),
    /// An argument of a call to `function`
    Argument { function: NodeId, argument: NodeId },
}

/// Everything the traversal produced, ready to run
pub(super) struct Walked<'c> {
    pub engine: Engine<'c, Context<'c>>,
    pub scopes: Scopes,
    /// References bound during the walk
    pub resolved: FxHashMap<NodeId, DeclRef>,
    /// Names resolved once every scope exists, with the scope to search from
    pub deferred: FxHashMap<NodeId, ScopeId>,
}

pub(super) struct Walker<'a, 'c> {
    ast: &'a Ast,
    config: &'a AnalysisConfig,
    scopes: Scopes,
    stack: Vec<ScopeId>,
    root: ScopeId,
    engine: Engine<'c, Context<'c>>,
    resolved: FxHashMap<NodeId, DeclRef>,
    deferred: FxHashMap<NodeId, ScopeId>,
}

impl<'a, 'c> Walker<'a, 'c> {
    pub fn new(ast: &'a Ast, config: &'a AnalysisConfig) -> Self {
        let mut scopes = Scopes::new();
        let root = scopes.root(ast.root());

        let mut engine = Engine::new();
        for builtin in Builtin::ALL {
            engine.set(CellId::ty(builtin), builtin.value_type());
            if let Some(declared) = builtin.declared() {
                engine.set(CellId::declared(builtin), declared);
            }
        }

        Self {
            ast,
            config,
            scopes,
            stack: Vec::new(),
            root,
            engine,
            resolved: FxHashMap::default(),
            deferred: FxHashMap::default(),
        }
    }

    pub fn walk(mut self) -> Walked<'c> {
        self.visit(self.ast.root());
        tracing::debug!(
            rules = self.engine.rule_count(),
            scopes = self.scopes.len(),
            deferred = self.deferred.len(),
            "traversal finished"
        );
        Walked {
            engine: self.engine,
            scopes: self.scopes,
            resolved: self.resolved,
            deferred: self.deferred,
        }
    }

    fn current(&self) -> ScopeId {
        self.stack.last().copied().unwrap_or(self.root)
    }

    fn rule(&mut self, rule: SemaRule<'c>) {
        self.engine.add(rule);
    }

    /// Push a fresh scope owned by `node`
    fn enter(&mut self, node: NodeId) {
        let parent = self.current();
        let scope = self.scopes.push(Some(parent), node);
        self.stack.push(scope);
        self.engine.set(CellId::new(node, Attr::Scope), scope);
    }

    fn leave(&mut self) {
        self.stack.pop();
    }

    fn enclosing_function(&self) -> Option<NodeId> {
        self.stack
            .iter()
            .rev()
            .map(|scope| self.scopes.get(*scope).owner())
            .find(|owner| matches!(self.ast.kind(*owner), NodeKind::FunDecl { .. }))
    }

    fn declare(&mut self, name: &str, decl: NodeId) {
        let ast = self.ast;
        let scope = self.current();
        let Err(existing) = self.scopes.declare(scope, name, decl.into()) else {
            return;
        };

        // Clauses and facts may add to an existing predicate
        if existing.is_predicate(ast) && DeclRef::from(decl).is_predicate(ast) {
            if let Some(error) = existing
                .node()
                .and_then(|first| logic::redeclaration(ast, name, first, decl))
            {
                self.engine.report(error);
            }
            return;
        }

        match self.config.duplicates {
            DuplicatePolicy::Error => self.engine.report(SemaError::new(
                ErrorKind::DuplicateDeclaration,
                format!("{} is already declared in this scope", name),
                decl,
            )),
            DuplicatePolicy::LastWins => {
                tracing::debug!(name, %decl, "replacing earlier declaration");
                self.scopes.replace(scope, name, decl.into());
            }
        }
    }

    fn visit(&mut self, node: NodeId) {
        self.visit_with(node, Inference::Nothing);
    }

    fn visit_with(&mut self, node: NodeId, inference: Inference) {
        let ast = self.ast;
        match ast.kind(node) {
            NodeKind::IntLiteral(_) => self.engine.set(CellId::ty(node), Type::Int),
            NodeKind::FloatLiteral(_) => self.engine.set(CellId::ty(node), Type::Float),
            NodeKind::StringLiteral(_) => self.engine.set(CellId::ty(node), Type::String),
            NodeKind::TermLiteral(_) => self.engine.set(CellId::ty(node), Type::Term),

            NodeKind::Reference { name } => self.reference(node, name),
            NodeKind::Constructor { reference } => {
                self.visit(*reference);
                self.rule(checker::constructor(node, *reference));
            }
            NodeKind::ArrayLiteral { components } => {
                for &component in components {
                    self.visit(component);
                }
                if components.is_empty() {
                    if let Some(rule) = checker::empty_array(node, inference) {
                        self.rule(rule);
                    }
                } else {
                    self.rule(checker::array_literal(node, components.clone()));
                }
            }
            NodeKind::Parenthesized { expression } => {
                self.visit_with(*expression, inference);
                self.rule(checker::parenthesized(node, *expression));
            }
            NodeKind::FieldAccess { stem, field } => {
                self.visit(*stem);
                self.rule(checker::field_access(node, *stem, field.clone()));
            }
            NodeKind::ArrayAccess { array, index } => {
                self.visit(*array);
                self.visit(*index);
                for rule in checker::array_access(node, *array, *index) {
                    self.rule(rule);
                }
            }
            NodeKind::Call {
                function,
                type_argument,
                arguments,
            } => {
                self.visit(*function);
                if let Some(type_argument) = type_argument {
                    self.visit(*type_argument);
                }
                for (i, &argument) in arguments.iter().enumerate() {
                    self.engine.set(CellId::new(argument, Attr::Index), i);
                    self.visit_with(
                        argument,
                        Inference::Argument {
                            function: *function,
                            argument,
                        },
                    );
                }
                self.rule(checker::call(node, *function, *type_argument, arguments.clone()));
            }
            NodeKind::Unary { op, operand } => {
                self.visit(*operand);
                self.rule(checker::unary(node, *op, *operand));
            }
            NodeKind::Binary { op, left, right } => {
                self.visit(*left);
                self.visit(*right);
                self.rule(checker::binary(node, *op, *left, *right));
            }
            NodeKind::Assignment { left, right } => {
                self.visit(*left);
                self.visit(*right);
                self.rule(checker::assignment(node, *left, *right));
            }

            NodeKind::SimpleType { name } => {
                let scope = self.current();
                self.deferred.insert(node, scope);
                self.rule(resolve_type(node, name.clone(), scope));
            }
            NodeKind::ArrayType { component } => {
                self.visit(*component);
                self.rule(checker::array_type(node, *component));
            }

            NodeKind::Root { statements } => {
                self.stack.push(self.root);
                self.engine.set(CellId::new(node, Attr::Scope), self.root);
                for &statement in statements {
                    self.visit(statement);
                }
                self.leave();
            }
            NodeKind::Block { statements } => {
                self.enter(node);
                for &statement in statements {
                    self.visit(statement);
                }
                self.rule(checker::block_returns(
                    node,
                    checker::return_containers(ast, statements),
                ));
                self.leave();
            }
            NodeKind::VarDecl {
                name,
                ty,
                initializer,
            } => {
                self.visit(*ty);
                self.visit_with(*initializer, Inference::Variable(node));
                // Declared after the initializer: `var x: Int = x` is a use before declaration
                self.declare(name, node);
                let scope = self.current();
                self.engine.set(CellId::new(node, Attr::Scope), scope);
                self.rule(checker::declared_type(node, *ty));
                self.rule(checker::initializer(name.clone(), *ty, *initializer));
            }
            NodeKind::FieldDecl { ty, .. } => {
                self.visit(*ty);
                self.rule(checker::declared_type(node, *ty));
            }
            NodeKind::Parameter { name, ty } => {
                self.visit(*ty);
                self.declare(name, node);
                let scope = self.current();
                self.engine.set(CellId::new(node, Attr::Scope), scope);
                self.rule(checker::declared_type(node, *ty));
            }
            NodeKind::FunDecl {
                name,
                generic,
                parameters,
                return_type,
                body,
            } => {
                self.declare(name, node);
                self.enter(node);
                if let Some(generic) = generic {
                    self.visit(*generic);
                    self.rule(generics::parameter_name(node, *generic));
                }
                for &parameter in parameters {
                    self.visit(parameter);
                }
                self.visit(*return_type);
                self.visit(*body);
                self.rule(checker::function_type(node, parameters.clone(), *return_type));
                self.rule(checker::missing_return(node, *body, *return_type));
                self.leave();
            }
            NodeKind::StructDecl { name, fields } => {
                self.declare(name, node);
                let declared = Type::Struct(StructRef {
                    decl: node,
                    name: name.clone(),
                });
                self.rule(checker::constant("struct-type", CellId::ty(node), Type::Meta));
                self.rule(checker::constant("struct-declared", CellId::declared(node), declared));
                for &field in fields {
                    self.visit(field);
                }
            }
            NodeKind::GenericParam { name } => {
                let function = self.scopes.get(self.current()).owner();
                self.declare(name, node);
                let declared = Type::Generic(PlaceholderRef {
                    decl: node,
                    function,
                    name: name.clone(),
                });
                self.rule(checker::constant("generic-type", CellId::ty(node), Type::Meta));
                self.rule(checker::constant("generic-declared", CellId::declared(node), declared));
            }

            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.visit(*condition);
                self.rule(checker::expect_type(
                    "if-condition",
                    *condition,
                    Type::Bool,
                    "non-boolean if condition",
                ));
                self.visit(*then_branch);
                let mut branches = vec![*then_branch];
                if let Some(else_branch) = else_branch {
                    self.visit(*else_branch);
                    branches.push(*else_branch);
                }
                self.rule(checker::if_returns(
                    node,
                    checker::return_containers(ast, &branches),
                ));
            }
            NodeKind::While { condition, body } => {
                self.visit(*condition);
                self.rule(checker::expect_type(
                    "while-condition",
                    *condition,
                    Type::Bool,
                    "non-boolean while condition",
                ));
                self.visit(*body);
            }
            NodeKind::For {
                init,
                condition,
                step,
                body,
            } => {
                self.visit(*init);
                self.rule(checker::expect_type(
                    "for-init",
                    *init,
                    Type::Int,
                    "non-Int for loop counter",
                ));
                self.visit(*condition);
                self.rule(checker::expect_type(
                    "for-condition",
                    *condition,
                    Type::Bool,
                    "non-boolean for loop condition",
                ));
                self.visit(*step);
                self.rule(checker::expect_type(
                    "for-step",
                    *step,
                    Type::Int,
                    "non-Int for loop step",
                ));
                self.visit(*body);
            }
            NodeKind::Return { expression } => {
                if let Some(expression) = expression {
                    self.visit(*expression);
                }
                self.rule(checker::constant("return-returns", CellId::returns(node), true));
                let function = self.enclosing_function().map(|function| ast.kind(function));
                if let Some(NodeKind::FunDecl { return_type, .. }) = function {
                    self.rule(checker::return_statement(node, *return_type, *expression));
                }
            }
            NodeKind::ExpressionStatement { expression } => self.visit(*expression),

            NodeKind::Fact { name, terms } => {
                self.declare(name, node);
                for &term in terms {
                    self.visit(term);
                }
                self.term_types(node);
            }
            NodeKind::Clause { head, body } => {
                // The head declares the predicate, it is not checked against it
                if let NodeKind::Atom { name, terms } = ast.kind(*head) {
                    self.declare(name, node);
                    for &term in terms {
                        self.visit(term);
                    }
                }
                for &atom in body {
                    self.visit(atom);
                }
                self.term_types(node);
            }
            NodeKind::Query { goal } => {
                self.visit(*goal);
                self.term_types(node);
            }
            NodeKind::Atom { terms, .. } => {
                for &term in terms {
                    self.visit(term);
                }
                let scope = self.current();
                self.rule(logic::atom_arity(node, scope));
            }
        }
    }

    fn reference(&mut self, node: NodeId, name: &str) {
        let scope = self.current();
        let Some((decl, found)) = self.scopes.lookup(scope, name) else {
            tracing::trace!(name, %node, "deferring name resolution");
            self.deferred.insert(node, scope);
            self.rule(resolve_reference(node, name.to_string(), scope));
            return;
        };

        self.resolved.insert(node, decl);
        self.engine.set(CellId::new(node, Attr::Decl), decl);
        self.engine.set(CellId::new(node, Attr::Scope), found);
        match reference_type(self.ast, node, name, decl) {
            Ok(rule) => self.rule(rule),
            Err(error) => self.engine.report(error),
        }
    }

    fn term_types(&mut self, decl: NodeId) {
        for term in logic::declaration_terms(self.ast, decl) {
            self.rule(logic::term_type(term));
        }
    }
}

/// A reference takes the type of its declaration
fn reference_type<'c>(
    ast: &Ast,
    node: NodeId,
    name: &str,
    decl: DeclRef,
) -> Result<SemaRule<'c>, SemaError> {
    if decl.is_predicate(ast) {
        return Err(SemaError::type_mismatch(
            format!("{} is a logic predicate and cannot be used as a value", name),
            node,
        ));
    }
    Ok(SemaRule::copy("reference-type", CellId::ty(decl), CellId::ty(node)))
}

/// Retry a failed lookup once the whole tree has been walked
fn resolve_reference<'c>(node: NodeId, name: String, scope: ScopeId) -> SemaRule<'c> {
    SemaRule::new(
        "resolve-reference",
        vec![],
        vec![CellId::new(node, Attr::Decl), CellId::new(node, Attr::Scope)],
        move |f| {
            let ctx = f.ctx();
            let Some((decl, found)) = ctx.scopes.lookup(scope, &name) else {
                f.error(SemaError::unresolved(&name, node));
                return;
            };
            f.set(0, decl);
            f.set(1, found);

            // Variables are not hoisted: the binding stays, the type does not flow
            if let Some(NodeKind::VarDecl { .. }) = decl.node().map(|id| ctx.ast.kind(id)) {
                f.error(SemaError::new(
                    ErrorKind::UsedBeforeDeclaration,
                    format!("variable used before declaration: {}", name),
                    node,
                ));
                return;
            }

            match reference_type(ctx.ast, node, &name, decl) {
                Ok(rule) => f.spawn(rule),
                Err(error) => f.error(error),
            }
        },
    )
}

/// A type name denotes the type its declaration introduces
fn resolve_type<'c>(node: NodeId, name: String, scope: ScopeId) -> SemaRule<'c> {
    SemaRule::new(
        "resolve-type",
        vec![],
        vec![CellId::new(node, Attr::Decl), CellId::new(node, Attr::Scope)],
        move |f| {
            let ctx = f.ctx();
            let Some((decl, found)) = ctx.scopes.lookup(scope, &name) else {
                f.error(SemaError::unresolved(&name, node));
                return;
            };
            if !decl.is_type(ctx.ast) {
                f.error(SemaError::new(
                    ErrorKind::NotAType,
                    format!(
                        "{} did not resolve to a type declaration but to a {} declaration",
                        name,
                        decl.describe(ctx.ast)
                    ),
                    node,
                ));
                return;
            }

            f.set(0, decl);
            f.set(1, found);
            f.spawn(SemaRule::copy(
                "type-value",
                CellId::declared(decl),
                CellId::value(node),
            ));
        },
    )
}
