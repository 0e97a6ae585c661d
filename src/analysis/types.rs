//! Type representation for semantic analysis
//!
//! These types are values computed by the pass and are separate from the
//! AST type nodes that denote them.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::ast::{BinaryOp, NodeId};

/// A struct type, identified by its declaration
#[derive(Debug, Clone, Eq)]
pub struct StructRef {
    pub decl: NodeId,
    pub name: String,
}

impl PartialEq for StructRef {
    fn eq(&self, other: &Self) -> bool {
        self.decl == other.decl
    }
}

impl Hash for StructRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.decl.hash(state);
    }
}

/// The placeholder type of a template, identified by its parameter declaration
#[derive(Debug, Clone, Eq)]
pub struct PlaceholderRef {
    /// The generic parameter node
    pub decl: NodeId,
    /// The template function declaring it
    pub function: NodeId,
    pub name: String,
}

impl PartialEq for PlaceholderRef {
    fn eq(&self, other: &Self) -> bool {
        self.decl == other.decl
    }
}

impl Hash for PlaceholderRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.decl.hash(state);
    }
}

/// A resolved type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Float,
    Bool,
    String,
    Void,
    Null,
    /// Logic-programming atom or variable
    Term,
    /// The type of expressions that denote a type
    Meta,
    Array(Box<Type>),
    Struct(StructRef),
    Function { params: Vec<Type>, ret: Box<Type> },
    Generic(PlaceholderRef),
}

impl Type {
    pub fn array(component: Type) -> Self {
        Type::Array(Box::new(component))
    }

    pub fn function(params: Vec<Type>, ret: Type) -> Self {
        Type::Function {
            params,
            ret: Box::new(ret),
        }
    }

    /// Struct, array and string values are references and admit `null`
    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Struct(_) | Type::Array(_) | Type::String)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    /// Check if a value of this type can be stored in a location of type `target`
    pub fn is_assignable_to(&self, target: &Type) -> bool {
        match (self, target) {
            (Type::Void, _) | (_, Type::Void) => false,
            (Type::Int, Type::Float) => true,
            (Type::Array(from), Type::Array(to)) => from.is_assignable_to(to),
            (Type::Array(_), _) => false,
            (Type::Null, to) if to.is_reference() => true,
            (from, to) => from == to,
        }
    }

    /// Check if values of the two types can be compared with `==` and `!=`
    pub fn is_comparable_with(&self, other: &Type) -> bool {
        if self.is_void() || other.is_void() {
            return false;
        }
        let nullable = |ty: &Type| ty.is_reference() || *ty == Type::Null;
        (nullable(self) && nullable(other))
            || self == other
            || (self.is_numeric() && other.is_numeric())
    }

    /// The type both arguments can be assigned to, if one of them is it
    pub fn common_supertype(a: &Type, b: &Type) -> Option<Type> {
        if a.is_assignable_to(b) {
            Some(b.clone())
        } else if b.is_assignable_to(a) {
            Some(a.clone())
        } else {
            None
        }
    }

    /// Result of an arithmetic operator, `None` if the operands don't support it
    pub fn arithmetic(op: BinaryOp, left: &Type, right: &Type) -> Option<Type> {
        if op == BinaryOp::Add && (*left == Type::String || *right == Type::String) {
            return Some(Type::String);
        }
        match (left, right) {
            (Type::Int, Type::Int) => Some(Type::Int),
            (Type::Int, Type::Float) | (Type::Float, Type::Int) | (Type::Float, Type::Float) => {
                Some(Type::Float)
            }
            _ => None,
        }
    }

    /// The first placeholder occurring in this type
    pub fn placeholder(&self) -> Option<&PlaceholderRef> {
        match self {
            Type::Generic(placeholder) => Some(placeholder),
            Type::Array(component) => component.placeholder(),
            Type::Function { params, ret } => params
                .iter()
                .find_map(Type::placeholder)
                .or_else(|| ret.placeholder()),
            _ => None,
        }
    }

    /// Replace every occurrence of `placeholder` by `concrete`
    pub fn substitute(&self, placeholder: &PlaceholderRef, concrete: &Type) -> Type {
        match self {
            Type::Generic(p) if p == placeholder => concrete.clone(),
            Type::Array(component) => Type::array(component.substitute(placeholder, concrete)),
            Type::Function { params, ret } => Type::function(
                params
                    .iter()
                    .map(|param| param.substitute(placeholder, concrete))
                    .collect(),
                ret.substitute(placeholder, concrete),
            ),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "Int"),
            Type::Float => write!(f, "Float"),
            Type::Bool => write!(f, "Bool"),
            Type::String => write!(f, "String"),
            Type::Void => write!(f, "Void"),
            Type::Null => write!(f, "Null"),
            Type::Term => write!(f, "Term"),
            Type::Meta => write!(f, "Type"),
            Type::Array(component) => write!(f, "{}[]", component),
            Type::Struct(s) => write!(f, "{}", s.name),
            Type::Function { params, ret } => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ret)
            }
            Type::Generic(p) => write!(f, "{}", p.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> Type {
        Type::Struct(StructRef {
            decl: NodeId(3),
            name: "Point".into(),
        })
    }

    fn placeholder() -> PlaceholderRef {
        PlaceholderRef {
            decl: NodeId(1),
            function: NodeId(2),
            name: "T".into(),
        }
    }

    #[test]
    fn test_assignability() {
        assert!(Type::Int.is_assignable_to(&Type::Int));
        assert!(Type::Int.is_assignable_to(&Type::Float));
        assert!(!Type::Float.is_assignable_to(&Type::Int));
        assert!(!Type::Void.is_assignable_to(&Type::Void));
        assert!(Type::Null.is_assignable_to(&Type::String));
        assert!(Type::Null.is_assignable_to(&point()));
        assert!(Type::Null.is_assignable_to(&Type::array(Type::Int)));
        assert!(!Type::Null.is_assignable_to(&Type::Int));
        assert!(!Type::Bool.is_assignable_to(&Type::Int));
    }

    #[test]
    fn test_array_assignability_is_covariant() {
        let ints = Type::array(Type::Int);
        let floats = Type::array(Type::Float);

        assert!(ints.is_assignable_to(&floats));
        assert!(!floats.is_assignable_to(&ints));
        assert!(!ints.is_assignable_to(&Type::Int));
        assert!(!Type::array(Type::array(Type::Float))
            .is_assignable_to(&Type::array(Type::array(Type::Int))));
    }

    #[test]
    fn test_struct_identity() {
        let same_name = Type::Struct(StructRef {
            decl: NodeId(9),
            name: "Point".into(),
        });
        let renamed = Type::Struct(StructRef {
            decl: NodeId(3),
            name: "Other".into(),
        });
        assert_ne!(point(), same_name);
        assert_eq!(point(), renamed);
    }

    #[test]
    fn test_comparability() {
        assert!(Type::Int.is_comparable_with(&Type::Float));
        assert!(Type::Float.is_comparable_with(&Type::Int));
        assert!(Type::String.is_comparable_with(&point()));
        assert!(Type::Null.is_comparable_with(&point()));
        assert!(!Type::Null.is_comparable_with(&Type::Int));
        assert!(Type::Bool.is_comparable_with(&Type::Bool));
        assert!(!Type::Bool.is_comparable_with(&Type::Int));
        assert!(!Type::Void.is_comparable_with(&Type::Void));
    }

    #[test]
    fn test_common_supertype() {
        assert_eq!(
            Type::common_supertype(&Type::Int, &Type::Float),
            Some(Type::Float)
        );
        assert_eq!(
            Type::common_supertype(&Type::Float, &Type::Int),
            Some(Type::Float)
        );
        assert_eq!(Type::common_supertype(&Type::Int, &Type::Bool), None);
        assert_eq!(Type::common_supertype(&Type::Void, &Type::Void), None);
    }

    #[test]
    fn test_arithmetic() {
        use BinaryOp::*;
        assert_eq!(Type::arithmetic(Add, &Type::Int, &Type::Int), Some(Type::Int));
        assert_eq!(Type::arithmetic(Multiply, &Type::Int, &Type::Float), Some(Type::Float));
        assert_eq!(Type::arithmetic(Divide, &Type::Float, &Type::Int), Some(Type::Float));
        assert_eq!(Type::arithmetic(Add, &Type::String, &Type::Bool), Some(Type::String));
        assert_eq!(Type::arithmetic(Add, &Type::Int, &Type::String), Some(Type::String));
        assert_eq!(Type::arithmetic(Subtract, &Type::String, &Type::Int), None);
        assert_eq!(Type::arithmetic(Add, &Type::Int, &Type::Bool), None);
    }

    #[test]
    fn test_substitute() {
        let t = Type::Generic(placeholder());
        let f = Type::function(vec![t.clone(), Type::array(t.clone())], t);

        assert_eq!(f.placeholder(), Some(&placeholder()));
        let concrete = f.substitute(&placeholder(), &Type::Int);
        assert_eq!(
            concrete,
            Type::function(vec![Type::Int, Type::array(Type::Int)], Type::Int)
        );
        assert_eq!(concrete.placeholder(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::array(Type::Int).to_string(), "Int[]");
        assert_eq!(Type::Meta.to_string(), "Type");
        assert_eq!(point().to_string(), "Point");
        assert_eq!(
            Type::function(vec![Type::Int, Type::String], Type::Void).to_string(),
            "(Int, String) -> Void"
        );
        assert_eq!(Type::Generic(placeholder()).to_string(), "T");
    }
}
