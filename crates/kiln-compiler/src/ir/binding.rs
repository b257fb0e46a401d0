//! Bindings and ownership categories
//!
//! Every variable, parameter and field is a [`Binding`] in one per-module
//! arena. IR nodes refer to bindings by [`BindingId`]; cyclic object graphs
//! in the source never become cyclic ownership inside the compiler.

use crate::types::TypeDescriptor;
use kiln_syntax::{OwnershipHint, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifetime strategy of a heap value held by a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryAnnotation {
    /// Not yet decided; never reaches code generation.
    #[default]
    Auto,
    Unique,
    Shared,
    Weak,
    Value,
}

impl MemoryAnnotation {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, MemoryAnnotation::Auto)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryAnnotation::Auto => "auto",
            MemoryAnnotation::Unique => "unique",
            MemoryAnnotation::Shared => "shared",
            MemoryAnnotation::Weak => "weak",
            MemoryAnnotation::Value => "value",
        }
    }
}

impl From<OwnershipHint> for MemoryAnnotation {
    fn from(hint: OwnershipHint) -> Self {
        match hint {
            OwnershipHint::Unique => MemoryAnnotation::Unique,
            OwnershipHint::Shared => MemoryAnnotation::Shared,
            OwnershipHint::Weak => MemoryAnnotation::Weak,
            OwnershipHint::Value => MemoryAnnotation::Value,
        }
    }
}

impl fmt::Display for MemoryAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index into the module's binding arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub u32);

impl BindingId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingKind {
    Variable { is_const: bool },
    Parameter,
    Field { class: String, is_static: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub id: BindingId,
    pub name: String,
    pub kind: BindingKind,
    pub ty: TypeDescriptor,
    pub memory: MemoryAnnotation,
    /// Category came from an authoring hint.
    pub hinted: bool,
    /// Declared at module or namespace scope.
    pub is_global: bool,
    pub span: Span,
}

impl Binding {
    pub fn is_field(&self) -> bool {
        matches!(self.kind, BindingKind::Field { .. })
    }

    /// Owning class of an instance field.
    pub fn field_owner(&self) -> Option<&str> {
        match &self.kind {
            BindingKind::Field { class, is_static: false } => Some(class),
            _ => None,
        }
    }
}

/// Arena of all bindings in one module.
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    bindings: Vec<Binding>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, kind: BindingKind, ty: TypeDescriptor, span: Span) -> BindingId {
        let id = BindingId(self.bindings.len() as u32);
        self.bindings.push(Binding {
            id,
            name: name.to_string(),
            kind,
            ty,
            memory: MemoryAnnotation::Auto,
            hinted: false,
            is_global: false,
            span,
        });
        id
    }

    pub fn get(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: BindingId) -> Option<&mut Binding> {
        self.bindings.get_mut(id.0 as usize)
    }

    /// Bindings in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Binding> {
        self.bindings.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Instance field `name` declared directly on `class`.
    pub fn field(&self, class: &str, name: &str) -> Option<BindingId> {
        self.bindings
            .iter()
            .find(|b| {
                b.name == name
                    && matches!(&b.kind, BindingKind::Field { class: owner, .. } if owner == class)
            })
            .map(|b| b.id)
    }

    /// Instance and static fields of `class` in declaration order.
    pub fn fields_of<'s>(&'s self, class: &'s str) -> impl Iterator<Item = &'s Binding> + 's {
        self.bindings
            .iter()
            .filter(move |b| matches!(&b.kind, BindingKind::Field { class: owner, .. } if owner == class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_conversion() {
        assert_eq!(MemoryAnnotation::from(OwnershipHint::Weak), MemoryAnnotation::Weak);
        assert_eq!(MemoryAnnotation::from(OwnershipHint::Value), MemoryAnnotation::Value);
        assert!(!MemoryAnnotation::Auto.is_resolved());
        assert!(MemoryAnnotation::Unique.is_resolved());
    }

    #[test]
    fn test_table_lookup() {
        let mut table = BindingTable::new();
        let x = table.add("x", BindingKind::Variable { is_const: false }, TypeDescriptor::number(), Span::default());
        let f = table.add(
            "engine",
            BindingKind::Field {
                class: "Car".into(),
                is_static: false,
            },
            TypeDescriptor::class("Engine"),
            Span::default(),
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(x).map(|b| b.name.as_str()), Some("x"));
        assert_eq!(table.field("Car", "engine"), Some(f));
        assert_eq!(table.field("Car", "x"), None);
        assert_eq!(table.get(f).and_then(|b| b.field_owner()), Some("Car"));
        assert_eq!(f.to_string(), "b1");
    }

    #[test]
    fn test_memory_serde_lowercase() {
        let json = serde_json::to_string(&MemoryAnnotation::Shared).expect("serialize");
        assert_eq!(json, "\"shared\"");
    }
}
