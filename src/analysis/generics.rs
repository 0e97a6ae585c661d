//! Single-parameter templates
//!
//! A template declares one placeholder type. Call sites substitute a concrete
//! type for it when checking arguments and computing the result type; the
//! template's own declaration is never rewritten.
//!
//! Inside a template body, a binary operator with a placeholder-typed operand
//! takes the placeholder type. Which expressions can carry the placeholder is
//! decided once, by [`PlaceholderGraph`], before rules start firing.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use super::scope::DeclRef;
use super::types::{PlaceholderRef, Type};
use super::SemaRule;
use crate::ast::{Ast, BinaryOp, NodeId, NodeKind};
use crate::errors::{ErrorKind, SemaError};

/// Nodes whose type may depend on a template placeholder.
///
/// Edges go from an expression to its operands, from a name use to the
/// variable, parameter or template parameter it resolves to, and from a
/// declaration to its type node.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderGraph {
    dependent: FxHashSet<NodeId>,
}

impl PlaceholderGraph {
    /// Build the graph; `resolve` gives the declaration a name node refers to
    pub fn build(ast: &Ast, resolve: impl Fn(NodeId) -> Option<DeclRef>) -> Self {
        let mut users: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
        for id in ast.ids() {
            for target in edges(ast, id, &resolve) {
                users.entry(target).or_default().push(id);
            }
        }

        let mut dependent = FxHashSet::default();
        let mut worklist: VecDeque<NodeId> = ast
            .ids()
            .filter(|id| matches!(ast.kind(*id), NodeKind::GenericParam { .. }))
            .collect();

        while let Some(node) = worklist.pop_front() {
            if !dependent.insert(node) {
                continue;
            }
            if let Some(sources) = users.get(&node) {
                for &source in sources {
                    if !dependent.contains(&source) {
                        worklist.push_back(source);
                    }
                }
            }
        }

        tracing::trace!(dependent = dependent.len(), "placeholder graph built");
        Self { dependent }
    }

    pub fn depends_on_placeholder(&self, node: NodeId) -> bool {
        self.dependent.contains(&node)
    }
}

fn edges(ast: &Ast, id: NodeId, resolve: &impl Fn(NodeId) -> Option<DeclRef>) -> Vec<NodeId> {
    match ast.kind(id) {
        NodeKind::Reference { .. } | NodeKind::SimpleType { .. } => resolve(id)
            .and_then(DeclRef::node)
            .filter(|decl| {
                matches!(
                    ast.kind(*decl),
                    NodeKind::VarDecl { .. }
                        | NodeKind::Parameter { .. }
                        | NodeKind::GenericParam { .. }
                )
            })
            .into_iter()
            .collect(),
        NodeKind::Parenthesized { expression } => vec![*expression],
        NodeKind::Unary { operand, .. } => vec![*operand],
        NodeKind::Binary { left, right, .. } | NodeKind::Assignment { left, right } => {
            vec![*left, *right]
        }
        NodeKind::FieldAccess { stem, .. } => vec![*stem],
        NodeKind::ArrayAccess { array, .. } => vec![*array],
        NodeKind::ArrayLiteral { components } => components.clone(),
        NodeKind::Call {
            function,
            type_argument,
            arguments,
        } => std::iter::once(*function)
            .chain(*type_argument)
            .chain(arguments.iter().copied())
            .collect(),
        NodeKind::ArrayType { component } => vec![*component],
        NodeKind::VarDecl { ty, .. } | NodeKind::Parameter { ty, .. } => vec![*ty],
        _ => Vec::new(),
    }
}

/// The placeholder-typed operand of a binary expression, left first
pub fn placeholder_operand<'t>(left: &'t Type, right: &'t Type) -> Option<&'t Type> {
    [left, right]
        .into_iter()
        .find(|ty| matches!(ty, Type::Generic(_)))
}

/// A callee type after call-site substitution
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub callee: Type,
    /// The placeholder and the concrete type standing in for it
    pub binding: Option<(PlaceholderRef, Type)>,
}

/// Substitute the callee's placeholder for this call.
///
/// The concrete type is the explicit type argument when there is one, else
/// the type of the first argument whose parameter is exactly the placeholder.
pub fn instantiate(callee: &Type, explicit: Option<&Type>, arguments: &[&Type]) -> Instance {
    let Some(placeholder) = callee.placeholder() else {
        return Instance {
            callee: callee.clone(),
            binding: None,
        };
    };

    let concrete = explicit.cloned().or_else(|| match callee {
        Type::Function { params, .. } => params
            .iter()
            .zip(arguments)
            .find(|(param, _)| matches!(param, Type::Generic(p) if p == placeholder))
            .map(|(_, arg)| (*arg).clone()),
        _ => None,
    });

    match concrete {
        Some(concrete) => Instance {
            callee: callee.substitute(placeholder, &concrete),
            binding: Some((placeholder.clone(), concrete)),
        },
        None => Instance {
            callee: callee.clone(),
            binding: None,
        },
    }
}

/// Whether the template body is exactly `{ return a + b }`
pub fn is_concatenation_body(ast: &Ast, function: NodeId) -> bool {
    let NodeKind::FunDecl { body, .. } = ast.kind(function) else {
        return false;
    };
    let NodeKind::Block { statements } = ast.kind(*body) else {
        return false;
    };
    let [statement] = statements.as_slice() else {
        return false;
    };
    let NodeKind::Return {
        expression: Some(expression),
    } = ast.kind(*statement)
    else {
        return false;
    };
    matches!(
        ast.kind(*expression),
        NodeKind::Binary {
            op: BinaryOp::Add,
            ..
        }
    )
}

/// The template parameter must carry the reserved placeholder name
pub(super) fn parameter_name<'a>(function: NodeId, generic: NodeId) -> SemaRule<'a> {
    SemaRule::new("template-parameter-name", vec![], vec![], move |f| {
        let ctx = f.ctx();
        let Some(name) = ctx.ast.declared_name(generic) else {
            return;
        };
        let expected = ctx.config.placeholder_name.as_str();
        if name != expected {
            f.error(SemaError::new(
                ErrorKind::GenericParameterName,
                format!(
                    "{} should be used as template parameter instead of {}",
                    expected, name
                ),
                function,
            ));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstBuilder;

    fn placeholder() -> PlaceholderRef {
        PlaceholderRef {
            decl: NodeId(0),
            function: NodeId(1),
            name: "T".into(),
        }
    }

    #[test]
    fn test_instantiate_with_explicit_argument() {
        let t = Type::Generic(placeholder());
        let callee = Type::function(vec![t.clone(), t.clone()], t);

        let instance = instantiate(&callee, Some(&Type::Float), &[&Type::Int, &Type::Float]);
        assert_eq!(
            instance.callee,
            Type::function(vec![Type::Float, Type::Float], Type::Float)
        );
        assert_eq!(instance.binding, Some((placeholder(), Type::Float)));
    }

    #[test]
    fn test_instantiate_infers_from_arguments() {
        let t = Type::Generic(placeholder());
        let callee = Type::function(vec![Type::Int, t.clone()], Type::array(t));

        let instance = instantiate(&callee, None, &[&Type::Int, &Type::String]);
        assert_eq!(
            instance.callee,
            Type::function(vec![Type::Int, Type::String], Type::array(Type::String))
        );
    }

    #[test]
    fn test_instantiate_plain_function_is_unchanged() {
        let callee = Type::function(vec![Type::Int], Type::Int);
        let instance = instantiate(&callee, Some(&Type::String), &[&Type::Int]);
        assert_eq!(instance.callee, callee);
        assert_eq!(instance.binding, None);
    }

    #[test]
    fn test_placeholder_operand() {
        let t = Type::Generic(placeholder());
        assert_eq!(placeholder_operand(&Type::Int, &t), Some(&t));
        assert_eq!(placeholder_operand(&Type::Int, &Type::Float), None);
    }

    #[test]
    fn test_concatenation_body() {
        let mut b = AstBuilder::new();
        let x = b.reference("x");
        let y = b.reference("y");
        let sum = b.binary(BinaryOp::Add, x, y);
        let ret = b.ret(Some(sum));
        let concat = b.template("concat", "T", vec![], Some("T"), vec![ret]);

        let x = b.reference("x");
        let y = b.reference("y");
        let product = b.binary(BinaryOp::Multiply, x, y);
        let ret = b.ret(Some(product));
        let multiply = b.template("multiply", "T", vec![], Some("T"), vec![ret]);
        let ast = b.finish(vec![concat, multiply]);

        assert!(is_concatenation_body(&ast, concat));
        assert!(!is_concatenation_body(&ast, multiply));
    }

    #[test]
    fn test_graph_follows_declarations() {
        let mut b = AstBuilder::new();
        let param = b.param("x", "T");
        let x = b.reference("x");
        let one = b.int(1);
        let sum = b.binary(BinaryOp::Add, x, one);
        let ret = b.ret(Some(sum));
        let function = b.template("f", "T", vec![param], Some("T"), vec![ret]);
        let other = b.int(2);
        let ast = b.finish(vec![function, other]);

        let NodeKind::Parameter { ty, .. } = ast.kind(param) else {
            panic!("expected a parameter");
        };
        let NodeKind::FunDecl {
            generic: Some(generic),
            ..
        } = ast.kind(function)
        else {
            panic!("expected a template");
        };
        let (ty, generic) = (*ty, *generic);
        let graph = PlaceholderGraph::build(&ast, |id| {
            if id == x {
                Some(DeclRef::Node(param))
            } else if id == ty {
                Some(DeclRef::Node(generic))
            } else {
                None
            }
        });

        assert!(graph.depends_on_placeholder(x));
        assert!(graph.depends_on_placeholder(sum));
        assert!(!graph.depends_on_placeholder(one));
        assert!(!graph.depends_on_placeholder(other));
    }
}
