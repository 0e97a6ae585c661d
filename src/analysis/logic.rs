//! Static checks for logic declarations
//!
//! Facts, clauses and queries are only validated: every term must have type
//! `Term`, and atoms naming a known predicate must use its arity. Nothing is
//! proven or unified here.

use super::engine::CellId;
use super::scope::{DeclRef, ScopeId};
use super::types::Type;
use super::SemaRule;
use crate::ast::{Ast, NodeId, NodeKind};
use crate::errors::{ErrorKind, SemaError};

/// Number of terms a fact or clause head takes
pub fn predicate_arity(ast: &Ast, decl: NodeId) -> Option<usize> {
    match ast.kind(decl) {
        NodeKind::Fact { terms, .. } => Some(terms.len()),
        NodeKind::Clause { head, .. } => atom_terms(ast, *head).map(<[NodeId]>::len),
        _ => None,
    }
}

pub fn atom_terms(ast: &Ast, atom: NodeId) -> Option<&[NodeId]> {
    match ast.kind(atom) {
        NodeKind::Atom { terms, .. } => Some(terms),
        _ => None,
    }
}

/// Every term of a logic declaration, head and body included
pub fn declaration_terms(ast: &Ast, decl: NodeId) -> Vec<NodeId> {
    match ast.kind(decl) {
        NodeKind::Fact { terms, .. } => terms.clone(),
        NodeKind::Clause { head, body } => std::iter::once(head)
            .chain(body)
            .filter_map(|atom| atom_terms(ast, *atom))
            .flatten()
            .copied()
            .collect(),
        NodeKind::Query { goal } => atom_terms(ast, *goal)
            .map(<[NodeId]>::to_vec)
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// The term must be of type `Term`
pub(super) fn term_type<'a>(term: NodeId) -> SemaRule<'a> {
    SemaRule::new("term-type", vec![CellId::ty(term)], vec![], move |f| {
        if let Some(ty) = f.ty(0) {
            if *ty != Type::Term {
                f.error(SemaError::new(
                    ErrorKind::NonTermArgument,
                    format!("non term type found where term type required instead of {}", ty),
                    term,
                ));
            }
        }
    })
}

/// An atom naming a known predicate must match its arity.
///
/// Runs once every scope is complete, so predicates declared later count.
pub(super) fn atom_arity<'a>(atom: NodeId, scope: ScopeId) -> SemaRule<'a> {
    SemaRule::new("atom-arity", vec![], vec![], move |f| {
        let ctx = f.ctx();
        let NodeKind::Atom { name, terms } = ctx.ast.kind(atom) else {
            return;
        };
        let Some((DeclRef::Node(decl), _)) = ctx.scopes.lookup(scope, name) else {
            return;
        };
        let Some(expected) = predicate_arity(ctx.ast, decl) else {
            return;
        };
        if expected != terms.len() {
            f.error(SemaError::new(
                ErrorKind::ArityMismatch,
                format!(
                    "predicate {} expects {} terms but got {}",
                    name,
                    expected,
                    terms.len()
                ),
                atom,
            ));
        }
    })
}

/// Check a repeated predicate declaration against the first one
pub fn redeclaration(ast: &Ast, name: &str, first: NodeId, again: NodeId) -> Option<SemaError> {
    let expected = predicate_arity(ast, first)?;
    let found = predicate_arity(ast, again)?;
    (expected != found).then(|| {
        SemaError::new(
            ErrorKind::ArityMismatch,
            format!(
                "predicate {} was declared with {} terms, got {}",
                name, expected, found
            ),
            again,
        )
    })
}
