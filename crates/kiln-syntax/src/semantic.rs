//! Optional semantic-type side table
//!
//! A front-end with a full type checker can record the type it computed for
//! an expression, keyed by the expression's byte range. The compiler consults
//! the table before falling back to its own initializer inference.

use crate::ast::TypeAnnotation;
use crate::Span;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeTableEntry {
    pub start: usize,
    pub end: usize,
    pub ty: TypeAnnotation,
}

#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    types: FxHashMap<(usize, usize), TypeAnnotation>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = TypeTableEntry>) -> Self {
        let mut table = Self::new();
        for e in entries {
            table.types.insert((e.start, e.end), e.ty);
        }
        table
    }

    pub fn from_json(json: &str) -> Result<Self, crate::SyntaxError> {
        let entries: Vec<TypeTableEntry> =
            serde_json::from_str(json).map_err(|e| crate::SyntaxError::Decode {
                message: e.to_string(),
                line: e.line() as u32,
                column: e.column() as u32,
            })?;
        Ok(Self::from_entries(entries))
    }

    pub fn insert(&mut self, span: Span, ty: TypeAnnotation) {
        self.types.insert((span.start, span.end), ty);
    }

    /// Empty spans never match; synthesized nodes would collide.
    pub fn lookup(&self, span: &Span) -> Option<&TypeAnnotation> {
        if span.is_empty() {
            return None;
        }
        self.types.get(&(span.start, span.end))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{PrimitiveKeyword, Type};

    #[test]
    fn test_lookup_by_range() {
        let mut table = TypeTable::new();
        let ty = TypeAnnotation::new(Type::Primitive(PrimitiveKeyword::String), Span::default());
        table.insert(Span::new(4, 9, 1, 5), ty.clone());
        assert_eq!(table.lookup(&Span::new(4, 9, 7, 7)), Some(&ty));
        assert_eq!(table.lookup(&Span::new(4, 10, 1, 5)), None);
    }

    #[test]
    fn test_empty_span_never_matches() {
        let mut table = TypeTable::new();
        let ty = TypeAnnotation::new(Type::Primitive(PrimitiveKeyword::Number), Span::default());
        table.insert(Span::default(), ty);
        assert_eq!(table.lookup(&Span::default()), None);
    }

    #[test]
    fn test_from_json() {
        let json = r#"[{"start": 0, "end": 3, "ty": {"ty": {"Primitive": "boolean"}}}]"#;
        let table = TypeTable::from_json(json).expect("decode");
        assert_eq!(table.len(), 1);
    }
}
