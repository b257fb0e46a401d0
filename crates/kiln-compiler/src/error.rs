//! Fatal compilation errors
//!
//! Either of these aborts the unit it occurs in; sibling units are unaffected.

use crate::diagnostics::DiagnosticCode;
use kiln_syntax::{Span, SyntaxError};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    /// The external tree is malformed
    #[error("malformed input tree: {message}")]
    ParseInput { message: String, span: Span },

    /// A stage received IR it cannot process
    #[error("internal invariant violated: {message}")]
    InternalInvariant { message: String, span: Span },
}

impl CompileError {
    pub fn invariant(message: impl Into<String>, span: Span) -> Self {
        CompileError::InternalInvariant {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            CompileError::ParseInput { span, .. } | CompileError::InternalInvariant { span, .. } => *span,
        }
    }

    pub fn code(&self) -> DiagnosticCode {
        match self {
            CompileError::ParseInput { .. } => DiagnosticCode::ParseInput,
            CompileError::InternalInvariant { .. } => DiagnosticCode::InternalInvariant,
        }
    }
}

impl From<SyntaxError> for CompileError {
    fn from(err: SyntaxError) -> Self {
        let span = err.span().unwrap_or_else(|| match &err {
            SyntaxError::Decode { line, column, .. } => Span::new(0, 0, *line, *column),
            _ => Span::default(),
        });
        CompileError::ParseInput {
            message: err.to_string(),
            span,
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
