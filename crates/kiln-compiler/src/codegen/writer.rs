//! Indented text output with an optional line map

use kiln_syntax::Span;
use serde::{Deserialize, Serialize};

const INDENT: &str = "    ";

/// One emitted line traced back to its source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineMapEntry {
    /// 1-based line in the definition unit.
    pub generated_line: u32,
    pub source_line: u32,
    pub source_column: u32,
}

/// Leading whitespace for `level` indentation steps.
pub(crate) fn indentation(level: usize) -> String {
    INDENT.repeat(level)
}

#[derive(Debug, Default)]
pub(crate) struct CodeWriter {
    buf: String,
    indent: usize,
    /// Lines written so far.
    lines: u32,
    map: Option<Vec<LineMapEntry>>,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line_map() -> Self {
        Self {
            map: Some(Vec::new()),
            ..Self::default()
        }
    }

    /// Writer for a nested body (lambda, dispatch branch) that starts at
    /// `indent` levels.
    pub fn nested(indent: usize) -> Self {
        Self {
            indent,
            ..Self::default()
        }
    }

    pub fn indent_level(&self) -> usize {
        self.indent
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Write one logical line. `text` may span several physical lines when
    /// it embeds a nested body; those lines already carry their indentation.
    pub fn line(&mut self, text: &str) {
        if !text.is_empty() {
            self.buf.push_str(&indentation(self.indent));
        }
        self.buf.push_str(text);
        self.buf.push('\n');
        self.lines += 1 + text.matches('\n').count() as u32;
    }

    pub fn blank(&mut self) {
        self.buf.push('\n');
        self.lines += 1;
    }

    /// `text {` and indent.
    pub fn open(&mut self, text: &str) {
        if text.is_empty() {
            self.line("{");
        } else {
            self.line(&format!("{} {{", text));
        }
        self.indent();
    }

    /// Dedent and write `}` followed by `suffix`.
    pub fn close(&mut self, suffix: &str) {
        self.dedent();
        self.line(&format!("}}{}", suffix));
    }

    /// Record that the next line comes from `span`.
    pub fn mark(&mut self, span: Span) {
        if span.line == 0 {
            return;
        }
        if let Some(map) = &mut self.map {
            map.push(LineMapEntry {
                generated_line: self.lines + 1,
                source_line: span.line,
                source_column: span.column,
            });
        }
    }

    /// Text of a nested body: every line but without the trailing newline.
    pub fn into_inline(self) -> String {
        self.buf.trim_end_matches('\n').to_string()
    }

    pub fn finish(self) -> (String, Vec<LineMapEntry>) {
        (self.buf, self.map.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indentation() {
        let mut w = CodeWriter::new();
        w.open("void f()");
        w.line("return;");
        w.close("");
        let (text, map) = w.finish();
        assert_eq!(text, "void f() {\n    return;\n}\n");
        assert!(map.is_empty());
    }

    #[test]
    fn test_line_map_counts_embedded_lines() {
        let mut w = CodeWriter::with_line_map();
        w.line("auto f = [=]() {\n    return 1;\n};");
        w.mark(Span::new(0, 1, 7, 3));
        w.line("f();");
        let (_, map) = w.finish();
        assert_eq!(
            map,
            vec![LineMapEntry {
                generated_line: 4,
                source_line: 7,
                source_column: 3
            }]
        );
    }

    #[test]
    fn test_unknown_lines_are_not_mapped() {
        let mut w = CodeWriter::with_line_map();
        w.mark(Span::default());
        w.line("x;");
        assert!(w.finish().1.is_empty());
    }
}
