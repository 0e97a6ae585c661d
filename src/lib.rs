//! attrsema - semantic analysis over attribute rules
//!
//! This crate provides the semantic pass of a small imperative language with
//! structs, arrays, single-parameter templates and embedded logic
//! declarations. It resolves names and checks types over a tree produced by
//! an external parser, computing per-node attributes to a fixpoint.

pub mod errors;
pub mod ast;
pub mod analysis;

// Re-export commonly used types
pub use errors::{ErrorKind, SemaError, SemaResult, SourceSpan};
pub use ast::{Ast, AstBuilder, NodeId, NodeKind};
pub use analysis::{analyze, analyze_with, Analysis, AnalysisConfig, DuplicatePolicy, Type};
