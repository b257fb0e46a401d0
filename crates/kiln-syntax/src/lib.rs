//! Kiln syntax
//!
//! The parse-tree vocabulary shared between an external front-end and the
//! Kiln compiler:
//! - **ast**: statements, expressions and type annotations with spans
//! - **hints**: `(file, line, binding) -> ownership` authoring hints
//! - **semantic**: optional per-expression types from an external checker
//! - **build**: shorthand constructors for assembling trees by hand
//!
//! Trees are validated structurally before compilation; see
//! [`ast::SourceFile::validate`].

pub mod ast;
pub mod build;
mod error;
pub mod hints;
pub mod semantic;
mod span;
mod validate;

pub use ast::SourceFile;
pub use error::SyntaxError;
pub use hints::{HintEntry, HintIndex, OwnershipHint};
pub use semantic::{TypeTable, TypeTableEntry};
pub use span::Span;
