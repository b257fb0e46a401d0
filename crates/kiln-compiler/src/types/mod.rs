//! Type model and resolution
//!
//! - `descriptor` - the resolved type model
//! - `registry` - named types and functions of one module
//! - `resolver` - annotations and initializers to descriptors
//! - `names` - descriptors to C++ type names

pub mod descriptor;
pub mod names;
pub mod registry;
pub mod resolver;

pub use descriptor::{DispatchCategory, FieldDescriptor, FunctionSignature, ParamDescriptor, PrimitiveType, TypeDescriptor};
pub use names::{TypeNamer, DYNAMIC, STRING_OR_NUMBER};
pub use registry::{AliasEntry, ClassEntry, ClassKind, FunctionEntry, MemberEntry, MethodEntry, ShapeEntry, ShapeField, TypeRegistry};
pub use resolver::{substitute, EmptyScope, ResolvedType, TypeResolver, TypeScope};
