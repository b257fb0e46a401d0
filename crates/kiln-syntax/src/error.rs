//! Errors for malformed trees

use crate::Span;
use thiserror::Error;

/// A tree the front-end handed over that cannot be compiled.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SyntaxError {
    #[error("cannot decode tree: {message} (at {line}:{column})")]
    Decode {
        message: String,
        line: u32,
        column: u32,
    },

    #[error("{kind} ends before it starts")]
    InvertedSpan { kind: &'static str, span: Span },

    #[error("{kind} has an empty name")]
    EmptyIdentifier { kind: &'static str, span: Span },

    #[error("rest parameter '{name}' must be the last parameter")]
    RestNotLast { name: String, span: Span },

    #[error("rest parameter '{name}' cannot be optional or have a default value")]
    RestWithDefault { name: String, span: Span },

    #[error("template literal has {quasis} text parts for {expressions} expressions")]
    TemplateArity {
        quasis: usize,
        expressions: usize,
        span: Span,
    },

    #[error("class '{class}' declares more than one constructor body")]
    DuplicateConstructor { class: String, span: Span },

    #[error("variable declaration without declarators")]
    EmptyDeclaration { span: Span },
}

impl SyntaxError {
    /// Location of the offending node, when there is one.
    pub fn span(&self) -> Option<Span> {
        match self {
            SyntaxError::Decode { .. } => None,
            SyntaxError::InvertedSpan { span, .. }
            | SyntaxError::EmptyIdentifier { span, .. }
            | SyntaxError::RestNotLast { span, .. }
            | SyntaxError::RestWithDefault { span, .. }
            | SyntaxError::TemplateArity { span, .. }
            | SyntaxError::DuplicateConstructor { span, .. }
            | SyntaxError::EmptyDeclaration { span } => Some(*span),
        }
    }
}
