//! Typing rules for expressions, declarations and statements
//!
//! Each function builds the rules for one construct. The rules read the
//! types of the construct's children and write its own attributes.

use super::engine::{Attr, CellId, Value};
use super::generics;
use super::types::Type;
use super::walker::Inference;
use super::{SemaFiring, SemaRule};
use crate::ast::{Ast, BinaryOp, NodeId, NodeKind, UnaryOp};
use crate::errors::{ErrorKind, SemaError};

/// A rule without inputs that writes a fixed value
pub(super) fn constant<'a>(
    label: &'static str,
    cell: CellId,
    value: impl Into<Value>,
) -> SemaRule<'a> {
    let value = value.into();
    SemaRule::new(label, vec![], vec![cell], move |f| f.set(0, value))
}

// Expressions

pub(super) fn parenthesized<'a>(node: NodeId, expression: NodeId) -> SemaRule<'a> {
    SemaRule::copy("parenthesized", CellId::ty(expression), CellId::ty(node))
}

/// Type of `$Name`: a function from the field types to the struct type
pub(super) fn constructor<'a>(node: NodeId, reference: NodeId) -> SemaRule<'a> {
    SemaRule::new(
        "constructor",
        vec![CellId::new(reference, Attr::Decl)],
        vec![],
        move |f| {
            let Some(decl) = f.decl(0) else { return };
            let ast = f.ctx().ast;

            let fields = decl.node().and_then(|id| match ast.kind(id) {
                NodeKind::StructDecl { fields, .. } => Some((id, fields.clone())),
                _ => None,
            });
            let Some((structure, fields)) = fields else {
                let name = match ast.kind(reference) {
                    NodeKind::Reference { name } => name.as_str(),
                    _ => "?",
                };
                f.error(SemaError::new(
                    ErrorKind::InvalidConstructorTarget,
                    format!(
                        "applying the constructor operator ($) to a non-struct reference: {} is a {}",
                        name,
                        decl.describe(ast)
                    ),
                    node,
                ));
                return;
            };

            let mut inputs = vec![CellId::declared(structure)];
            inputs.extend(fields.iter().map(|field| CellId::ty(*field)));
            let count = fields.len();
            f.spawn(SemaRule::new(
                "constructor-type",
                inputs,
                vec![CellId::ty(node)],
                move |g| {
                    let Some(structure) = g.ty(0) else { return };
                    let params: Option<Vec<Type>> = (1..=count).map(|i| g.ty(i).cloned()).collect();
                    if let Some(params) = params {
                        g.set(0, Type::function(params, structure.clone()));
                    }
                },
            ));
        },
    )
}

/// Type of a non-empty array literal: the common supertype of its elements
pub(super) fn array_literal<'a>(node: NodeId, components: Vec<NodeId>) -> SemaRule<'a> {
    let inputs = components.iter().map(|c| CellId::ty(*c)).collect();
    SemaRule::new("array-literal", inputs, vec![CellId::ty(node)], move |f| {
        let mut supertype: Option<Type> = None;

        for (i, component) in components.iter().enumerate() {
            let Some(ty) = f.ty(i) else { continue };
            if ty.is_void() {
                // Reported, but the other elements still decide the type
                f.error(SemaError::new(
                    ErrorKind::InvalidArrayLiteral,
                    "void-valued expression in array literal",
                    *component,
                ));
                continue;
            }
            supertype = match supertype {
                None => Some(ty.clone()),
                Some(current) => match Type::common_supertype(&current, ty) {
                    Some(common) => Some(common),
                    None => {
                        f.error(SemaError::new(
                            ErrorKind::InvalidArrayLiteral,
                            format!(
                                "could not find common supertype in array literal: {} and {}",
                                current, ty
                            ),
                            node,
                        ));
                        return;
                    }
                },
            };
        }

        match supertype {
            Some(component) => f.set(0, Type::array(component)),
            None => f.error(SemaError::new(
                ErrorKind::InvalidArrayLiteral,
                "could not find common supertype in array literal: all members have Void type",
                node,
            )),
        }
    })
}

/// Type of `[]`, taken from the location it initializes
pub(super) fn empty_array<'a>(node: NodeId, inference: Inference) -> Option<SemaRule<'a>> {
    match inference {
        Inference::Nothing => None,
        Inference::Variable(decl) => Some(SemaRule::new(
            "empty-array",
            vec![CellId::ty(decl)],
            vec![CellId::ty(node)],
            move |f| {
                if let Some(ty) = f.ty(0) {
                    expect_array(f, node, ty);
                }
            },
        )),
        Inference::Argument { function, argument } => Some(SemaRule::new(
            "empty-array",
            vec![CellId::ty(function), CellId::new(argument, Attr::Index)],
            vec![CellId::ty(node)],
            move |f| {
                let (Some(Type::Function { params, .. }), Some(index)) = (f.ty(0), f.position(1))
                else {
                    return;
                };
                // A missing parameter is reported by the call itself
                if let Some(param) = params.get(index) {
                    expect_array(f, node, param);
                }
            },
        )),
    }
}

fn expect_array(f: &mut SemaFiring<'_, '_>, node: NodeId, ty: &Type) {
    if matches!(ty, Type::Array(_)) {
        f.set(0, ty.clone());
    } else {
        f.error(SemaError::new(
            ErrorKind::InvalidArrayLiteral,
            format!("empty array literal used where {} is expected", ty),
            node,
        ));
    }
}

pub(super) fn field_access<'a>(node: NodeId, stem: NodeId, field: String) -> SemaRule<'a> {
    SemaRule::new("field-access", vec![CellId::ty(stem)], vec![CellId::ty(node)], move |f| {
        let Some(stem_type) = f.ty(0) else { return };
        let ast = f.ctx().ast;

        match stem_type {
            Type::Array(_) if field == "length" => f.set(0, Type::Int),
            Type::Array(_) => f.error(SemaError::new(
                ErrorKind::InvalidFieldAccess,
                format!("trying to access a non-length field on an array: {}", field),
                node,
            )),
            Type::Struct(structure) => {
                let NodeKind::StructDecl { fields, .. } = ast.kind(structure.decl) else {
                    return;
                };
                match fields
                    .iter()
                    .find(|decl| ast.declared_name(**decl) == Some(field.as_str()))
                {
                    Some(decl) => f.spawn(SemaRule::copy(
                        "field-type",
                        CellId::ty(*decl),
                        CellId::ty(node),
                    )),
                    None => f.error(SemaError::new(
                        ErrorKind::InvalidFieldAccess,
                        format!(
                            "trying to access missing field {} on struct {}",
                            field, structure.name
                        ),
                        node,
                    )),
                }
            }
            other => f.error(SemaError::new(
                ErrorKind::InvalidFieldAccess,
                format!("trying to access a field on an expression of type {}", other),
                node,
            )),
        }
    })
}

pub(super) fn array_access<'a>(node: NodeId, array: NodeId, index: NodeId) -> [SemaRule<'a>; 2] {
    [
        SemaRule::new("array-index", vec![CellId::ty(index)], vec![], move |f| {
            if let Some(ty) = f.ty(0) {
                if *ty != Type::Int {
                    f.error(SemaError::new(
                        ErrorKind::InvalidIndexing,
                        format!("indexing an array using a non-Int-valued expression of type {}", ty),
                        index,
                    ));
                }
            }
        }),
        SemaRule::new("array-access", vec![CellId::ty(array)], vec![CellId::ty(node)], move |f| {
            match f.ty(0) {
                Some(Type::Array(component)) => f.set(0, (**component).clone()),
                Some(other) => f.error(SemaError::new(
                    ErrorKind::InvalidIndexing,
                    format!("trying to index a non-array expression of type {}", other),
                    node,
                )),
                None => {}
            }
        }),
    ]
}

/// Calls, including constructor calls and template instantiations
pub(super) fn call<'a>(
    node: NodeId,
    function: NodeId,
    type_argument: Option<NodeId>,
    arguments: Vec<NodeId>,
) -> SemaRule<'a> {
    let mut inputs = vec![CellId::ty(function)];
    inputs.extend(arguments.iter().map(|arg| CellId::ty(*arg)));
    if let Some(type_argument) = type_argument {
        inputs.push(CellId::value(type_argument));
    }

    SemaRule::new("call", inputs, vec![CellId::ty(node)], move |f| {
        let Some(callee) = f.ty(0) else { return };
        if !matches!(callee, Type::Function { .. }) {
            f.error(SemaError::new(
                ErrorKind::InvalidCallTarget,
                format!("trying to call a non-function expression of type {}", callee),
                function,
            ));
            return;
        }

        let args: Vec<&Type> = (1..=arguments.len()).filter_map(|i| f.ty(i)).collect();
        let explicit = type_argument.and_then(|_| f.ty(arguments.len() + 1));
        let instance = generics::instantiate(callee, explicit, &args);

        if let Some((placeholder, concrete)) = &instance.binding {
            if *concrete == Type::String
                && !generics::is_concatenation_body(f.ctx().ast, placeholder.function)
            {
                f.error(SemaError::new(
                    ErrorKind::GenericBodyShape,
                    "a template instantiated with String must return a single `+` expression",
                    node,
                ));
            }
        }

        let Type::Function { params, ret } = instance.callee else {
            return;
        };
        f.set(0, *ret);

        if params.len() != args.len() {
            f.error(SemaError::new(
                ErrorKind::ArityMismatch,
                format!(
                    "wrong number of arguments, expected {} but got {}",
                    params.len(),
                    args.len()
                ),
                node,
            ));
        }

        // Check the overlapping prefix even when the counts differ
        for (i, (param, arg)) in params.iter().zip(&args).enumerate() {
            if !arg.is_assignable_to(param) {
                f.error(SemaError::type_mismatch(
                    format!(
                        "incompatible argument provided for argument {}: expected {} but got {}",
                        i, param, arg
                    ),
                    arguments[i],
                ));
            }
        }
    })
}

pub(super) fn unary<'a>(node: NodeId, op: UnaryOp, operand: NodeId) -> SemaRule<'a> {
    SemaRule::new("unary", vec![CellId::ty(operand)], vec![CellId::ty(node)], move |f| {
        let Some(ty) = f.ty(0) else { return };
        let (expected, verb) = match op {
            UnaryOp::Not => (Type::Bool, "negate"),
            UnaryOp::Increment => (Type::Int, "increment"),
            UnaryOp::Decrement => (Type::Int, "decrement"),
        };
        if *ty != expected {
            f.error(SemaError::operand(
                format!("trying to {} type: {}", verb, ty),
                node,
            ));
        }
        f.set(0, expected);
    })
}

pub(super) fn binary<'a>(node: NodeId, op: BinaryOp, left: NodeId, right: NodeId) -> SemaRule<'a> {
    SemaRule::new(
        "binary",
        vec![CellId::ty(left), CellId::ty(right)],
        vec![CellId::ty(node)],
        move |f| {
            let (Some(l), Some(r)) = (f.ty(0), f.ty(1)) else {
                return;
            };

            let placeholders = &f.ctx().placeholders;
            if placeholders.depends_on_placeholder(left)
                || placeholders.depends_on_placeholder(right)
            {
                if let Some(placeholder) = generics::placeholder_operand(l, r) {
                    f.set(0, placeholder.clone());
                    return;
                }
            }

            if op.is_arithmetic() {
                match Type::arithmetic(op, l, r) {
                    Some(ty) => f.set(0, ty),
                    None => f.error(SemaError::operand(
                        format!("trying to {} {} with {}", op.verb(), l, r),
                        node,
                    )),
                }
            } else if op.is_comparison() {
                f.set(0, Type::Bool);
                for (side, ty) in [(left, l), (right, r)] {
                    if !ty.is_numeric() {
                        f.error(SemaError::operand(
                            format!(
                                "attempting to perform arithmetic comparison on non-numeric type: {}",
                                ty
                            ),
                            side,
                        ));
                    }
                }
            } else if op.is_logic() {
                f.set(0, Type::Bool);
                for (side, ty) in [(left, l), (right, r)] {
                    if *ty != Type::Bool {
                        f.error(SemaError::operand(
                            format!(
                                "attempting to perform binary logic on non-boolean type: {}",
                                ty
                            ),
                            side,
                        ));
                    }
                }
            } else {
                f.set(0, Type::Bool);
                if !l.is_comparable_with(r) {
                    f.error(SemaError::operand(
                        format!("trying to compare incomparable types {} and {}", l, r),
                        node,
                    ));
                }
            }
        },
    )
}

pub(super) fn assignment<'a>(node: NodeId, left: NodeId, right: NodeId) -> SemaRule<'a> {
    SemaRule::new(
        "assignment",
        vec![CellId::ty(left), CellId::ty(right)],
        vec![CellId::ty(node)],
        move |f| {
            let (Some(l), Some(r)) = (f.ty(0), f.ty(1)) else {
                return;
            };
            f.set(0, l.clone());

            if !f.ctx().ast.kind(left).is_lvalue() {
                f.error(SemaError::new(
                    ErrorKind::InvalidAssignmentTarget,
                    "trying to assign to a non-lvalue expression",
                    left,
                ));
            } else if !r.is_assignable_to(l) {
                f.error(SemaError::type_mismatch(
                    format!("cannot assign a value of type {} to an lvalue of type {}", r, l),
                    node,
                ));
            }
        },
    )
}

// Types and declarations

pub(super) fn array_type<'a>(node: NodeId, component: NodeId) -> SemaRule<'a> {
    SemaRule::new(
        "array-type",
        vec![CellId::value(component)],
        vec![CellId::value(node)],
        |f| {
            if let Some(component) = f.ty(0) {
                f.set(0, Type::array(component.clone()));
            }
        },
    )
}

/// `type` of a variable, parameter or field: the value of its type node
pub(super) fn declared_type<'a>(decl: NodeId, ty: NodeId) -> SemaRule<'a> {
    SemaRule::copy("declared-type", CellId::value(ty), CellId::ty(decl))
}

pub(super) fn initializer<'a>(name: String, ty: NodeId, initializer: NodeId) -> SemaRule<'a> {
    SemaRule::new(
        "initializer",
        vec![CellId::value(ty), CellId::ty(initializer)],
        vec![],
        move |f| {
            let (Some(expected), Some(actual)) = (f.ty(0), f.ty(1)) else {
                return;
            };
            if !actual.is_assignable_to(expected) {
                f.error(SemaError::type_mismatch(
                    format!(
                        "incompatible initializer type provided for variable `{}`: expected {} but got {}",
                        name, expected, actual
                    ),
                    initializer,
                ));
            }
        },
    )
}

pub(super) fn function_type<'a>(
    function: NodeId,
    parameters: Vec<NodeId>,
    return_type: NodeId,
) -> SemaRule<'a> {
    let mut inputs = vec![CellId::value(return_type)];
    inputs.extend(parameters.iter().map(|param| CellId::ty(*param)));
    let count = parameters.len();

    SemaRule::new("function-type", inputs, vec![CellId::ty(function)], move |f| {
        let Some(ret) = f.ty(0) else { return };
        let params: Option<Vec<Type>> = (1..=count).map(|i| f.ty(i).cloned()).collect();
        if let Some(params) = params {
            f.set(0, Type::function(params, ret.clone()));
        }
    })
}

pub(super) fn missing_return<'a>(
    function: NodeId,
    body: NodeId,
    return_type: NodeId,
) -> SemaRule<'a> {
    SemaRule::new(
        "missing-return",
        vec![CellId::returns(body), CellId::value(return_type)],
        vec![],
        move |f| {
            let (Some(returns), Some(ty)) = (f.flag(0), f.ty(1)) else {
                return;
            };
            if !returns && !ty.is_void() {
                let name = f.ctx().ast.declared_name(function).unwrap_or("?");
                f.error(SemaError::new(
                    ErrorKind::MissingReturn,
                    format!("missing return in function `{}`", name),
                    function,
                ));
            }
        },
    )
}

// Statements

/// A block returns if any of its statements does
pub(super) fn block_returns<'a>(block: NodeId, containers: Vec<NodeId>) -> SemaRule<'a> {
    let inputs = containers.iter().map(|c| CellId::returns(*c)).collect();
    let count = containers.len();
    SemaRule::new("block-returns", inputs, vec![CellId::returns(block)], move |f| {
        let returns = (0..count).any(|i| f.flag(i) == Some(true));
        f.set(0, returns);
    })
}

/// An `if` returns if both of its branches do
pub(super) fn if_returns<'a>(node: NodeId, containers: Vec<NodeId>) -> SemaRule<'a> {
    let inputs = containers.iter().map(|c| CellId::returns(*c)).collect();
    let count = containers.len();
    SemaRule::new("if-returns", inputs, vec![CellId::returns(node)], move |f| {
        let returns = count == 2 && (0..count).all(|i| f.flag(i) == Some(true));
        f.set(0, returns);
    })
}

/// The node must have type `expected`
pub(super) fn expect_type<'a>(
    label: &'static str,
    node: NodeId,
    expected: Type,
    describe: &'static str,
) -> SemaRule<'a> {
    SemaRule::new(label, vec![CellId::ty(node)], vec![], move |f| {
        if let Some(ty) = f.ty(0) {
            if *ty != expected {
                f.error(SemaError::type_mismatch(
                    format!("{} of type: {}", describe, ty),
                    node,
                ));
            }
        }
    })
}

pub(super) fn return_statement<'a>(
    node: NodeId,
    return_type: NodeId,
    expression: Option<NodeId>,
) -> SemaRule<'a> {
    let Some(expression) = expression else {
        return SemaRule::new("return", vec![CellId::value(return_type)], vec![], move |f| {
            if let Some(ty) = f.ty(0) {
                if !ty.is_void() {
                    f.error(SemaError::type_mismatch(
                        format!("return without value in a function returning {}", ty),
                        node,
                    ));
                }
            }
        });
    };

    SemaRule::new(
        "return",
        vec![CellId::value(return_type), CellId::ty(expression)],
        vec![],
        move |f| {
            let (Some(formal), Some(actual)) = (f.ty(0), f.ty(1)) else {
                return;
            };
            if formal.is_void() {
                f.error(SemaError::type_mismatch(
                    "return with value in a Void function",
                    node,
                ));
            } else if !actual.is_assignable_to(formal) {
                f.error(SemaError::type_mismatch(
                    format!(
                        "incompatible return type, expected {} but got {}",
                        formal, actual
                    ),
                    expression,
                ));
            }
        },
    )
}

/// Children whose `returns` attribute feeds their parent's
pub(super) fn return_containers(ast: &Ast, children: &[NodeId]) -> Vec<NodeId> {
    children
        .iter()
        .copied()
        .filter(|child| ast.kind(*child).is_return_container())
        .collect()
}
