//! Kiln Compiler
//!
//! Translates a typed, class-based scripting language into C++ source:
//! - **types**: type descriptors, the registry of named types and the resolver
//! - **lower**: builds the IR from a validated syntax tree
//! - **memory**: settles the ownership category of every binding
//! - **codegen**: emits a header (declaration pass) and an implementation
//!   file (definition pass)
//! - **pipeline**: runs units end to end and collects diagnostics
//!
//! # Example
//!
//! ```rust,ignore
//! use kiln_compiler::{CompilationUnit, Compiler, CompilerOptions};
//!
//! let unit = CompilationUnit::from_json(&tree_json)?;
//! let output = Compiler::new(CompilerOptions::default()).compile(&unit);
//! if let Some(emitted) = output.emitted {
//!     std::fs::write("main.h", emitted.declaration)?;
//!     std::fs::write("main.cpp", emitted.definition)?;
//! }
//! ```

#![warn(rust_2018_idioms)]

pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod ir;
pub mod lower;
pub mod memory;
pub mod pipeline;
pub mod types;

pub use codegen::{CodeGenerator, EmittedUnit, LineMapEntry};
pub use config::{CompilerOptions, ConfigError, TargetDialect};
pub use diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, Severity};
pub use error::{CompileError, CompileResult};
pub use memory::MemoryAnalyzer;
pub use pipeline::{CompilationUnit, Compiler, UnitOutput};
