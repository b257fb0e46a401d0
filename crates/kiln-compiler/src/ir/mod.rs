//! Intermediate Representation (IR) for Kiln
//!
//! The IR sits between the external parse tree and C++ emission. It is a
//! tree, not a graph: children are owned, and bindings live in an arena that
//! nodes refer to by index.
//!
//! # Structure
//!
//! - `IrModule` - one compilation unit: body, imports, bindings, type registry
//! - `IrNode` - a module-level statement or declaration
//! - `Stmt` / `Expr` / `Decl` - the three node families
//! - `Binding` - a variable, parameter or field with its type and
//!   `MemoryAnnotation`
//! - `ScopeStack` - name resolution while the IR is being built

pub mod binding;
pub mod module;
pub mod node;
pub mod pretty;
pub mod scope;
pub mod visit;

pub use binding::{Binding, BindingId, BindingKind, BindingTable, MemoryAnnotation};
pub use module::{Import, IrModule};
pub use node::*;
pub use pretty::PrettyPrint;
pub use scope::{FrameKind, ScopeStack, ScopeView, Symbol};
pub use visit::{Visitor, VisitorMut};
