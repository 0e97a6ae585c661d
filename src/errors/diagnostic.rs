//! Error reports using ariadne
//!
//! Renders semantic errors against the source text they were found in.
//! Output is plain text; printing it is up to the caller.

use ariadne::{Config, Label, Report, ReportKind, Source};

use crate::ast::Ast;
use crate::errors::{ErrorKind, SemaError};

fn title(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::UnresolvedName
        | ErrorKind::UsedBeforeDeclaration
        | ErrorKind::DuplicateDeclaration
        | ErrorKind::NotAType => "Name resolution error",
        ErrorKind::MissingReturn => "Control flow error",
        ErrorKind::GenericParameterName | ErrorKind::GenericBodyShape => "Template error",
        ErrorKind::NonTermArgument => "Logic declaration error",
        _ => "Type error",
    }
}

/// Format an error as a string with source context
pub fn format_error(source: &str, ast: &Ast, error: &SemaError) -> String {
    let span = ast.span(error.node());
    let range = span.start.min(source.len())..span.end.min(source.len());

    let mut output = Vec::new();
    let written = Report::build(ReportKind::Error, range.clone())
        .with_config(Config::default().with_color(false))
        .with_message(title(error.kind()))
        .with_label(Label::new(range).with_message(error.message()))
        .finish()
        .write(Source::from(source), &mut output);

    match written {
        Ok(()) => String::from_utf8_lossy(&output).into_owned(),
        Err(_) => format!("{}: {}", title(error.kind()), error.message()),
    }
}

/// Format a batch of errors, one report after the other
pub fn format_errors(source: &str, ast: &Ast, errors: &[SemaError]) -> String {
    errors
        .iter()
        .map(|error| format_error(source, ast, error))
        .collect::<Vec<_>>()
        .join("\n")
}
