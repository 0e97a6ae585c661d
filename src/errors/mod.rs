//! Error handling for the semantic pass
//!
//! Every error is tied to the AST node it was found on. Errors are collected
//! in batch and never abort the pass.

mod diagnostic;

use std::ops::Range;
use thiserror::Error;

use crate::ast::NodeId;

pub use diagnostic::{format_error, format_errors};

/// A span in the source code, represented as a byte range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl SourceSpan {
    /// Create a new source span
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl From<Range<usize>> for SourceSpan {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl From<SourceSpan> for Range<usize> {
    fn from(span: SourceSpan) -> Self {
        span.start..span.end
    }
}

/// A semantic error reported by the pass
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SemaError {
    #[error("{message}")]
    UnresolvedName { message: String, node: NodeId },

    #[error("{message}")]
    UsedBeforeDeclaration { message: String, node: NodeId },

    #[error("{message}")]
    DuplicateDeclaration { message: String, node: NodeId },

    #[error("{message}")]
    NotAType { message: String, node: NodeId },

    #[error("{message}")]
    TypeMismatch { message: String, node: NodeId },

    #[error("{message}")]
    ArityMismatch { message: String, node: NodeId },

    #[error("{message}")]
    InvalidOperandType { message: String, node: NodeId },

    #[error("{message}")]
    InvalidFieldAccess { message: String, node: NodeId },

    #[error("{message}")]
    InvalidIndexing { message: String, node: NodeId },

    #[error("{message}")]
    InvalidCallTarget { message: String, node: NodeId },

    #[error("{message}")]
    InvalidConstructorTarget { message: String, node: NodeId },

    #[error("{message}")]
    InvalidArrayLiteral { message: String, node: NodeId },

    #[error("{message}")]
    MissingReturn { message: String, node: NodeId },

    #[error("{message}")]
    InvalidAssignmentTarget { message: String, node: NodeId },

    #[error("{message}")]
    GenericParameterName { message: String, node: NodeId },

    #[error("{message}")]
    GenericBodyShape { message: String, node: NodeId },

    #[error("{message}")]
    NonTermArgument { message: String, node: NodeId },
}

/// Discriminant of [`SemaError`], handy for matching in tests and tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    UnresolvedName,
    UsedBeforeDeclaration,
    DuplicateDeclaration,
    NotAType,
    TypeMismatch,
    ArityMismatch,
    InvalidOperandType,
    InvalidFieldAccess,
    InvalidIndexing,
    InvalidCallTarget,
    InvalidConstructorTarget,
    InvalidArrayLiteral,
    MissingReturn,
    InvalidAssignmentTarget,
    GenericParameterName,
    GenericBodyShape,
    NonTermArgument,
}

impl SemaError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, node: NodeId) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::UnresolvedName => SemaError::UnresolvedName { message, node },
            ErrorKind::UsedBeforeDeclaration => SemaError::UsedBeforeDeclaration { message, node },
            ErrorKind::DuplicateDeclaration => SemaError::DuplicateDeclaration { message, node },
            ErrorKind::NotAType => SemaError::NotAType { message, node },
            ErrorKind::TypeMismatch => SemaError::TypeMismatch { message, node },
            ErrorKind::ArityMismatch => SemaError::ArityMismatch { message, node },
            ErrorKind::InvalidOperandType => SemaError::InvalidOperandType { message, node },
            ErrorKind::InvalidFieldAccess => SemaError::InvalidFieldAccess { message, node },
            ErrorKind::InvalidIndexing => SemaError::InvalidIndexing { message, node },
            ErrorKind::InvalidCallTarget => SemaError::InvalidCallTarget { message, node },
            ErrorKind::InvalidConstructorTarget => {
                SemaError::InvalidConstructorTarget { message, node }
            }
            ErrorKind::InvalidArrayLiteral => SemaError::InvalidArrayLiteral { message, node },
            ErrorKind::MissingReturn => SemaError::MissingReturn { message, node },
            ErrorKind::InvalidAssignmentTarget => {
                SemaError::InvalidAssignmentTarget { message, node }
            }
            ErrorKind::GenericParameterName => SemaError::GenericParameterName { message, node },
            ErrorKind::GenericBodyShape => SemaError::GenericBodyShape { message, node },
            ErrorKind::NonTermArgument => SemaError::NonTermArgument { message, node },
        }
    }

    /// Create an unresolved-name error
    pub fn unresolved(name: &str, node: NodeId) -> Self {
        Self::new(ErrorKind::UnresolvedName, format!("could not resolve: {}", name), node)
    }

    /// Create a type mismatch error
    pub fn type_mismatch(message: impl Into<String>, node: NodeId) -> Self {
        Self::new(ErrorKind::TypeMismatch, message, node)
    }

    /// Create an invalid operand error
    pub fn operand(message: impl Into<String>, node: NodeId) -> Self {
        Self::new(ErrorKind::InvalidOperandType, message, node)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SemaError::UnresolvedName { .. } => ErrorKind::UnresolvedName,
            SemaError::UsedBeforeDeclaration { .. } => ErrorKind::UsedBeforeDeclaration,
            SemaError::DuplicateDeclaration { .. } => ErrorKind::DuplicateDeclaration,
            SemaError::NotAType { .. } => ErrorKind::NotAType,
            SemaError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            SemaError::ArityMismatch { .. } => ErrorKind::ArityMismatch,
            SemaError::InvalidOperandType { .. } => ErrorKind::InvalidOperandType,
            SemaError::InvalidFieldAccess { .. } => ErrorKind::InvalidFieldAccess,
            SemaError::InvalidIndexing { .. } => ErrorKind::InvalidIndexing,
            SemaError::InvalidCallTarget { .. } => ErrorKind::InvalidCallTarget,
            SemaError::InvalidConstructorTarget { .. } => ErrorKind::InvalidConstructorTarget,
            SemaError::InvalidArrayLiteral { .. } => ErrorKind::InvalidArrayLiteral,
            SemaError::MissingReturn { .. } => ErrorKind::MissingReturn,
            SemaError::InvalidAssignmentTarget { .. } => ErrorKind::InvalidAssignmentTarget,
            SemaError::GenericParameterName { .. } => ErrorKind::GenericParameterName,
            SemaError::GenericBodyShape { .. } => ErrorKind::GenericBodyShape,
            SemaError::NonTermArgument { .. } => ErrorKind::NonTermArgument,
        }
    }

    /// The node this error is attached to
    pub fn node(&self) -> NodeId {
        match self {
            SemaError::UnresolvedName { node, .. }
            | SemaError::UsedBeforeDeclaration { node, .. }
            | SemaError::DuplicateDeclaration { node, .. }
            | SemaError::NotAType { node, .. }
            | SemaError::TypeMismatch { node, .. }
            | SemaError::ArityMismatch { node, .. }
            | SemaError::InvalidOperandType { node, .. }
            | SemaError::InvalidFieldAccess { node, .. }
            | SemaError::InvalidIndexing { node, .. }
            | SemaError::InvalidCallTarget { node, .. }
            | SemaError::InvalidConstructorTarget { node, .. }
            | SemaError::InvalidArrayLiteral { node, .. }
            | SemaError::MissingReturn { node, .. }
            | SemaError::InvalidAssignmentTarget { node, .. }
            | SemaError::GenericParameterName { node, .. }
            | SemaError::GenericBodyShape { node, .. }
            | SemaError::NonTermArgument { node, .. } => *node,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            SemaError::UnresolvedName { message, .. }
            | SemaError::UsedBeforeDeclaration { message, .. }
            | SemaError::DuplicateDeclaration { message, .. }
            | SemaError::NotAType { message, .. }
            | SemaError::TypeMismatch { message, .. }
            | SemaError::ArityMismatch { message, .. }
            | SemaError::InvalidOperandType { message, .. }
            | SemaError::InvalidFieldAccess { message, .. }
            | SemaError::InvalidIndexing { message, .. }
            | SemaError::InvalidCallTarget { message, .. }
            | SemaError::InvalidConstructorTarget { message, .. }
            | SemaError::InvalidArrayLiteral { message, .. }
            | SemaError::MissingReturn { message, .. }
            | SemaError::InvalidAssignmentTarget { message, .. }
            | SemaError::GenericParameterName { message, .. }
            | SemaError::GenericBodyShape { message, .. }
            | SemaError::NonTermArgument { message, .. } => message,
        }
    }
}

/// Result type for a whole pass: either the value or every error found
pub type SemaResult<T> = Result<T, Vec<SemaError>>;
