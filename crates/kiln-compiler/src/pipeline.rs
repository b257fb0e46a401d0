//! Compilation pipeline
//!
//! Runs one unit through validation, lowering, ownership analysis and both
//! emission passes. Units share nothing but the options, so a fatal error
//! in one never reaches another.

use crate::codegen::{CodeGenerator, EmittedUnit};
use crate::config::CompilerOptions;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{CompileError, CompileResult};
use crate::lower::lower_module;
use crate::memory::MemoryAnalyzer;
use kiln_syntax::{HintIndex, SourceFile, TypeTable};
use serde::{Deserialize, Serialize};

/// One source file plus its optional side tables.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    pub source: SourceFile,
    pub hints: Option<HintIndex>,
    pub semantic_types: Option<TypeTable>,
}

impl CompilationUnit {
    pub fn new(source: SourceFile) -> Self {
        Self {
            source,
            hints: None,
            semantic_types: None,
        }
    }

    /// Decode a tree handed over by an external front-end.
    pub fn from_json(json: &str) -> CompileResult<Self> {
        Ok(Self::new(SourceFile::from_json(json)?))
    }

    pub fn with_hints(mut self, hints: HintIndex) -> Self {
        self.hints = Some(hints);
        self
    }

    pub fn with_semantic_types(mut self, table: TypeTable) -> Self {
        self.semantic_types = Some(table);
        self
    }

    pub fn module_name(&self) -> &str {
        self.source.module_stem()
    }
}

/// Result of compiling one unit. `emitted` is `None` exactly when a fatal
/// error was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOutput {
    pub module_name: String,
    pub emitted: Option<EmittedUnit>,
    pub diagnostics: Vec<Diagnostic>,
}

impl UnitOutput {
    pub fn is_success(&self) -> bool {
        self.emitted.is_some()
    }
}

pub struct Compiler {
    options: CompilerOptions,
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn compile(&self, unit: &CompilationUnit) -> UnitOutput {
        let module_name = unit.module_name().to_string();
        log::debug!("compiling unit `{}` ({})", module_name, unit.source.path);

        let mut diags = Diagnostics::new(unit.source.path.clone());
        let emitted = match self.run(unit, &mut diags) {
            Ok(emitted) => Some(emitted),
            Err(err) => {
                log::debug!("unit `{}` aborted: {}", module_name, err);
                diags.error(err.code(), err.to_string(), err.span());
                None
            }
        };
        UnitOutput {
            module_name,
            emitted,
            diagnostics: diags.into_vec(),
        }
    }

    /// Decode then compile. A tree that fails to decode yields an output
    /// carrying only the decode error.
    pub fn compile_json(&self, json: &str) -> UnitOutput {
        match CompilationUnit::from_json(json) {
            Ok(unit) => self.compile(&unit),
            Err(err) => {
                let mut diags = Diagnostics::new("<input>");
                diags.error(err.code(), err.to_string(), err.span());
                UnitOutput {
                    module_name: String::new(),
                    emitted: None,
                    diagnostics: diags.into_vec(),
                }
            }
        }
    }

    pub fn compile_all(&self, units: &[CompilationUnit]) -> Vec<UnitOutput> {
        units.iter().map(|unit| self.compile(unit)).collect()
    }

    fn run(&self, unit: &CompilationUnit, diags: &mut Diagnostics) -> CompileResult<EmittedUnit> {
        unit.source.validate().map_err(CompileError::from)?;

        log::debug!("lowering `{}`", unit.source.path);
        let (mut module, lowered) = lower_module(
            &unit.source,
            &self.options,
            unit.hints.as_ref(),
            unit.semantic_types.as_ref(),
        );
        diags.extend(lowered);

        log::debug!("resolving ownership for `{}`", module.name);
        MemoryAnalyzer::new(&self.options).finalize(&mut module, diags);

        CodeGenerator::new(&self.options).generate(&module, diags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticCode;
    use kiln_syntax::build;

    #[test]
    fn test_module_name_from_path() {
        let unit = CompilationUnit::new(SourceFile::new("src/app/main.ts", vec![]));
        assert_eq!(unit.module_name(), "main");
    }

    #[test]
    fn test_empty_unit_compiles() {
        let unit = CompilationUnit::new(SourceFile::new("empty.ts", vec![]));
        let output = Compiler::new(CompilerOptions::default()).compile(&unit);
        assert!(output.is_success());
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        let output = Compiler::new(CompilerOptions::default()).compile_json("{ not json");
        assert!(output.emitted.is_none());
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].code, DiagnosticCode::ParseInput);
    }

    #[test]
    fn test_json_round_trip_through_compiler() {
        let file = SourceFile::new("answer.ts", vec![build::const_stmt("answer", build::num(42.0))]);
        let json = file.to_json().expect("serialize");
        let output = Compiler::new(CompilerOptions::default()).compile_json(&json);
        let emitted = output.emitted.expect("emitted");
        assert!(emitted.definition.contains("42"));
        assert_eq!(output.module_name, "answer");
    }
}
