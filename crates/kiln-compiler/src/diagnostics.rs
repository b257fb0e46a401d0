//! Diagnostics collected across every stage of a compilation unit
//!
//! Warnings never abort a unit: the offending node degrades to a dynamic or
//! placeholder form and compilation continues. Fatal errors are reported
//! through [`crate::CompileError`] and converted into an error diagnostic by
//! the pipeline.
//!
//! The library never prints. [`render`] produces the human-readable form via
//! codespan-reporting for drivers that want it.

use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label, Severity as CsSeverity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::NoColor;
use kiln_syntax::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Note,
    Warning,
    Error,
}

/// Stable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// Malformed input tree
    ParseInput,
    /// A stage handed the next one an IR it cannot process
    InternalInvariant,
    /// Annotation could not be mapped; the binding stays dynamic
    TypeResolution,
    /// Node kind has no transform rule
    UnsupportedConstruct,
    /// Ownership hint contradicts how the binding is used
    MemoryPolicyConflict,
    /// Identifier not declared in any enclosing scope
    UnresolvedIdentifier,
    /// Overload set that runtime dispatch cannot fully honor
    OverloadShadowed,
    /// Construct emitted in a reduced form for the selected dialect
    DialectDowngrade,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::ParseInput => "E0001",
            DiagnosticCode::InternalInvariant => "E0002",
            DiagnosticCode::TypeResolution => "W1001",
            DiagnosticCode::UnsupportedConstruct => "W1002",
            DiagnosticCode::MemoryPolicyConflict => "W1003",
            DiagnosticCode::UnresolvedIdentifier => "W1004",
            DiagnosticCode::OverloadShadowed => "W1005",
            DiagnosticCode::DialectDowngrade => "W1006",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub start: usize,
    pub end: usize,
}

impl Location {
    pub fn new(file: &str, span: Span) -> Self {
        Self {
            file: file.to_string(),
            line: span.line,
            column: span.column,
            start: span.start,
            end: span.end,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub location: Location,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}: {}[{}]: {}", self.location, level, self.code, self.message)
    }
}

/// Ordered collector threaded through a single unit's stages.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    file: String,
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            items: Vec::new(),
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn push(&mut self, severity: Severity, code: DiagnosticCode, message: impl Into<String>, span: Span) {
        let diagnostic = Diagnostic {
            severity,
            code,
            message: message.into(),
            location: Location::new(&self.file, span),
        };
        log::trace!("diagnostic {}", diagnostic);
        self.items.push(diagnostic);
    }

    pub fn warn(&mut self, code: DiagnosticCode, message: impl Into<String>, span: Span) {
        self.push(Severity::Warning, code, message, span);
    }

    pub fn note(&mut self, code: DiagnosticCode, message: impl Into<String>, span: Span) {
        self.push(Severity::Note, code, message, span);
    }

    pub fn error(&mut self, code: DiagnosticCode, message: impl Into<String>, span: Span) {
        self.push(Severity::Error, code, message, span);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count(&self, code: DiagnosticCode) -> usize {
        self.items.iter().filter(|d| d.code == code).count()
    }

    /// Append another collector's entries, keeping their order.
    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

/// Render diagnostics against the source text they refer to.
pub fn render(diagnostics: &[Diagnostic], file_name: &str, source: &str) -> String {
    let mut files = SimpleFiles::new();
    let file_id = files.add(file_name.to_string(), source.to_string());
    let config = term::Config::default();
    let mut writer = NoColor::new(Vec::new());

    for d in diagnostics {
        let severity = match d.severity {
            Severity::Note => CsSeverity::Note,
            Severity::Warning => CsSeverity::Warning,
            Severity::Error => CsSeverity::Error,
        };
        let mut cs = CsDiagnostic::new(severity)
            .with_message(d.message.clone())
            .with_code(d.code.as_str());
        if d.location.end > d.location.start && d.location.end <= source.len() {
            cs = cs.with_labels(vec![Label::primary(file_id, d.location.start..d.location.end)]);
        } else {
            cs = cs.with_notes(vec![format!("at {}", d.location)]);
        }
        if let Err(e) = term::emit(&mut writer, &config, &files, &cs) {
            log::warn!("could not render diagnostic {}: {}", d.code, e);
        }
    }

    String::from_utf8_lossy(&writer.into_inner()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_keeps_order_and_location() {
        let mut diags = Diagnostics::new("main.ts");
        diags.warn(DiagnosticCode::TypeResolution, "first", Span::new(0, 1, 3, 4));
        diags.note(DiagnosticCode::DialectDowngrade, "second", Span::default());
        assert_eq!(diags.len(), 2);
        assert!(!diags.has_errors());
        let items = diags.into_vec();
        assert_eq!(items[0].message, "first");
        assert_eq!(items[0].location.to_string(), "main.ts:3:4");
        assert_eq!(items[1].severity, Severity::Note);
    }

    #[test]
    fn test_display_includes_code() {
        let mut diags = Diagnostics::new("a.ts");
        diags.error(DiagnosticCode::ParseInput, "bad tree", Span::new(0, 0, 1, 1));
        let text = diags.iter().next().map(|d| d.to_string()).unwrap_or_default();
        assert_eq!(text, "a.ts:1:1: error[E0001]: bad tree");
    }

    #[test]
    fn test_render_points_at_source() {
        let source = "let x: Foo = 1;\n";
        let mut diags = Diagnostics::new("a.ts");
        diags.warn(DiagnosticCode::TypeResolution, "cannot resolve type `Foo`", Span::new(7, 10, 1, 8));
        let text = render(&diags.into_vec(), "a.ts", source);
        assert!(text.contains("warning[W1001]"));
        assert!(text.contains("cannot resolve type `Foo`"));
        assert!(text.contains("let x: Foo = 1;"));
    }
}
