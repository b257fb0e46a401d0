//! Parse-tree vocabulary
//!
//! The front-end hands the compiler one [`SourceFile`] per module. The tree is
//! plain data: every node owns its children and carries a [`Span`]. Nothing in
//! this module reads source text.
//!
//! Trees cross the front-end boundary as JSON (externally tagged enums,
//! snake_case fields), see [`SourceFile::from_json`].

mod expression;
mod statement;
mod types;

pub use expression::*;
pub use statement::*;
pub use types::*;

use crate::Span;
use serde::{Deserialize, Serialize};

/// One parsed module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path as reported by the front-end; used for diagnostics and hint lookup.
    pub path: String,
    pub statements: Vec<Statement>,
    #[serde(default)]
    pub span: Span,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, statements: Vec<Statement>) -> Self {
        Self {
            path: path.into(),
            statements,
            span: Span::default(),
        }
    }

    /// Decode a tree produced by an external front-end.
    pub fn from_json(json: &str) -> Result<Self, crate::SyntaxError> {
        serde_json::from_str(json).map_err(|e| crate::SyntaxError::Decode {
            message: e.to_string(),
            line: e.line() as u32,
            column: e.column() as u32,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Module name derived from the path: file stem without directories.
    pub fn module_stem(&self) -> &str {
        let file = self.path.rsplit(['/', '\\']).next().unwrap_or(&self.path);
        match file.find('.') {
            Some(0) | None => file,
            Some(idx) => &file[..idx],
        }
    }
}

/// Identifier with its location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    #[serde(default)]
    pub span: Span,
}

impl Identifier {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// Member visibility. Parameter properties reuse it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

/// `@Name(args)` attached to a class, method or property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decorator {
    pub name: Identifier,
    #[serde(default)]
    pub arguments: Vec<Expression>,
    #[serde(default)]
    pub span: Span,
}

/// Generic parameter: `T`, `T extends Shape`, `const T`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeParameter {
    pub name: Identifier,
    #[serde(default)]
    pub constraint: Option<TypeAnnotation>,
    /// `const T`; carried through but has no effect on emitted code.
    #[serde(default)]
    pub is_const: bool,
    #[serde(default)]
    pub span: Span,
}

/// Function, method, constructor or arrow parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: Identifier,
    #[serde(default)]
    pub type_annotation: Option<TypeAnnotation>,
    #[serde(default)]
    pub default: Option<Expression>,
    #[serde(default)]
    pub optional: bool,
    /// `...name: T[]`
    #[serde(default)]
    pub is_rest: bool,
    /// Constructor parameter property (`constructor(private x: T)`).
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_stem() {
        let file = SourceFile::new("src/shapes/circle.ts", vec![]);
        assert_eq!(file.module_stem(), "circle");
        let file = SourceFile::new("main", vec![]);
        assert_eq!(file.module_stem(), "main");
        let file = SourceFile::new("lib\\util.d.ts", vec![]);
        assert_eq!(file.module_stem(), "util");
    }

    #[test]
    fn test_json_roundtrip_preserves_tree() {
        let json = r#"{
            "path": "a.ts",
            "statements": [
                {"Expression": {"expression": {"NumberLiteral": {"value": 1.0}}}}
            ]
        }"#;
        let file = SourceFile::from_json(json).expect("decode");
        assert_eq!(file.statements.len(), 1);
        let again = SourceFile::from_json(&file.to_json().expect("encode")).expect("decode");
        assert_eq!(file, again);
    }

    #[test]
    fn test_json_decode_error_reports_position() {
        let err = SourceFile::from_json("{\"path\": 3}").unwrap_err();
        match err {
            crate::SyntaxError::Decode { line, .. } => assert_eq!(line, 1),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
