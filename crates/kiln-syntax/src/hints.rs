//! Authoring hints for binding ownership
//!
//! Authors pin the ownership of a binding with a comment directive:
//!
//! ```text
//! parent: Node;            // @weak
//! // @unique
//! const buffer = new Buffer(1024);
//! ```
//!
//! A directive trailing code applies to that line; a directive on a line of
//! its own applies to the next non-blank line. The index is keyed by
//! `(file, line, binding name)` and is consulted before any inference.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ownership category an author can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipHint {
    Unique,
    Shared,
    Weak,
    Value,
}

impl OwnershipHint {
    pub fn directive(&self) -> &'static str {
        match self {
            OwnershipHint::Unique => "@unique",
            OwnershipHint::Shared => "@shared",
            OwnershipHint::Weak => "@weak",
            OwnershipHint::Value => "@value",
        }
    }

    fn from_directive(word: &str) -> Option<Self> {
        match word {
            "@unique" => Some(OwnershipHint::Unique),
            "@shared" => Some(OwnershipHint::Shared),
            "@weak" => Some(OwnershipHint::Weak),
            "@value" => Some(OwnershipHint::Value),
            _ => None,
        }
    }
}

impl fmt::Display for OwnershipHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.directive())
    }
}

/// One serialized index entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintEntry {
    pub file: String,
    pub line: u32,
    pub name: String,
    pub hint: OwnershipHint,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct HintKey {
    file: String,
    line: u32,
    name: String,
}

/// `(file, line, binding name) -> ownership`
#[derive(Debug, Clone, Default)]
pub struct HintIndex {
    entries: FxHashMap<HintKey, OwnershipHint>,
}

impl HintIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = HintEntry>) -> Self {
        let mut index = Self::new();
        for e in entries {
            index.insert(e.file, e.line, e.name, e.hint);
        }
        index
    }

    pub fn insert(
        &mut self,
        file: impl Into<String>,
        line: u32,
        name: impl Into<String>,
        hint: OwnershipHint,
    ) {
        let key = HintKey {
            file: file.into(),
            line,
            name: name.into(),
        };
        self.entries.insert(key, hint);
    }

    pub fn get(&self, file: &str, line: u32, name: &str) -> Option<OwnershipHint> {
        let key = HintKey {
            file: file.to_string(),
            line,
            name: name.to_string(),
        };
        self.entries.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by file, line and name.
    pub fn entries(&self) -> Vec<HintEntry> {
        let mut out: Vec<HintEntry> = self
            .entries
            .iter()
            .map(|(k, v)| HintEntry {
                file: k.file.clone(),
                line: k.line,
                name: k.name.clone(),
                hint: *v,
            })
            .collect();
        out.sort_by(|a, b| (&a.file, a.line, &a.name).cmp(&(&b.file, b.line, &b.name)));
        out
    }

    /// Collect directives from raw source text.
    pub fn scan_source(file: &str, source: &str) -> Self {
        let mut index = Self::new();
        let lines: Vec<&str> = source.lines().collect();
        let mut pending: Option<OwnershipHint> = None;

        for (idx, raw) in lines.iter().enumerate() {
            let line_no = idx as u32 + 1;
            let (code, comment) = split_comment(raw);
            let directive = comment.and_then(find_directive);
            let code = code.trim();

            if code.is_empty() {
                if directive.is_some() {
                    pending = directive;
                }
                continue;
            }

            let hint = directive.or(pending.take());
            if let Some(hint) = hint {
                if let Some(name) = binding_name(code) {
                    index.insert(file, line_no, name, hint);
                }
            }
        }
        index
    }
}

fn split_comment(line: &str) -> (&str, Option<&str>) {
    let line_comment = line.find("//");
    let block_comment = line.find("/*");
    let at = match (line_comment, block_comment) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    match at {
        Some(pos) => (&line[..pos], Some(&line[pos..])),
        None => (line, None),
    }
}

fn find_directive(comment: &str) -> Option<OwnershipHint> {
    comment
        .split(|c: char| c.is_whitespace() || c == '*' || c == '/')
        .find_map(OwnershipHint::from_directive)
}

const MODIFIERS: &[&str] = &[
    "let", "const", "var", "public", "private", "protected", "readonly", "static", "declare",
    "export", "this",
];

/// First identifier on the line that is not a declaration modifier.
fn binding_name(code: &str) -> Option<String> {
    let mut chars = code.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c.is_alphabetic() || c == '_' || c == '$' {
            let mut end = start + c.len_utf8();
            while let Some(&(i, n)) = chars.peek() {
                if n.is_alphanumeric() || n == '_' || n == '$' {
                    end = i + n.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let word = &code[start..end];
            if !MODIFIERS.contains(&word) {
                return Some(word.to_string());
            }
        } else if !(c.is_whitespace() || c == '.' || c == '#') {
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_directive_applies_to_same_line() {
        let src = "class Node {\n  parent: Node; // @weak\n}\n";
        let index = HintIndex::scan_source("tree.ts", src);
        assert_eq!(index.get("tree.ts", 2, "parent"), Some(OwnershipHint::Weak));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_leading_directive_applies_to_next_line() {
        let src = "// @unique\n\nconst buffer = new Buffer(1);\n";
        let index = HintIndex::scan_source("a.ts", src);
        assert_eq!(index.get("a.ts", 3, "buffer"), Some(OwnershipHint::Unique));
    }

    #[test]
    fn test_block_comment_and_this_assignment() {
        let src = "this.owner = owner; /* @shared */\nprivate readonly cache = 1; // @value\n";
        let index = HintIndex::scan_source("a.ts", src);
        assert_eq!(index.get("a.ts", 1, "owner"), Some(OwnershipHint::Shared));
        assert_eq!(index.get("a.ts", 2, "cache"), Some(OwnershipHint::Value));
    }

    #[test]
    fn test_unknown_directive_is_ignored() {
        let index = HintIndex::scan_source("a.ts", "let x = 1; // @fast\n");
        assert!(index.is_empty());
    }

    #[test]
    fn test_entries_are_sorted() {
        let mut index = HintIndex::new();
        index.insert("b.ts", 1, "x", OwnershipHint::Shared);
        index.insert("a.ts", 9, "y", OwnershipHint::Weak);
        index.insert("a.ts", 2, "z", OwnershipHint::Value);
        let lines: Vec<u32> = index.entries().iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![2, 9, 1]);
        let rebuilt = HintIndex::from_entries(index.entries());
        assert_eq!(rebuilt.get("a.ts", 9, "y"), Some(OwnershipHint::Weak));
    }
}
