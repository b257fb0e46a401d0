//! Scope stack used while building the IR
//!
//! Owned by one builder invocation. A frame is pushed for every module,
//! namespace, class, function and block body and popped when the body is
//! done; lookups go innermost first.

use super::binding::{BindingId, BindingTable};
use crate::types::{TypeDescriptor, TypeRegistry, TypeScope};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Binding(BindingId),
    Function,
    Class,
    Namespace,
    Imported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Module,
    Namespace,
    Class,
    Function,
    Method,
    Block,
}

#[derive(Debug, Clone)]
struct Frame {
    kind: FrameKind,
    symbols: FxHashMap<String, Symbol>,
    type_params: Vec<String>,
    class: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: FrameKind) {
        self.frames.push(Frame {
            kind,
            symbols: FxHashMap::default(),
            type_params: Vec::new(),
            class: None,
        });
    }

    pub fn push_class(&mut self, name: &str, type_params: Vec<String>) {
        self.push(FrameKind::Class);
        if let Some(frame) = self.frames.last_mut() {
            frame.class = Some(name.to_string());
            frame.type_params = type_params;
        }
    }

    pub fn push_function(&mut self, kind: FrameKind, type_params: Vec<String>) {
        self.push(kind);
        if let Some(frame) = self.frames.last_mut() {
            frame.type_params = type_params;
        }
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Declare in the innermost frame, shadowing outer declarations.
    pub fn declare(&mut self, name: &str, symbol: Symbol) {
        if let Some(frame) = self.frames.last_mut() {
            frame.symbols.insert(name.to_string(), symbol);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        self.frames.iter().rev().find_map(|f| f.symbols.get(name).copied())
    }

    /// Symbol declared in the innermost frame only.
    pub fn lookup_local(&self, name: &str) -> Option<Symbol> {
        self.frames.last().and_then(|f| f.symbols.get(name).copied())
    }

    pub fn is_type_param(&self, name: &str) -> bool {
        self.frames.iter().any(|f| f.type_params.iter().any(|t| t == name))
    }

    /// Innermost enclosing class.
    pub fn current_class(&self) -> Option<&str> {
        self.frames.iter().rev().find_map(|f| f.class.as_deref())
    }

    /// Inside a method body (possibly nested in lambdas and blocks).
    pub fn in_method(&self) -> bool {
        for frame in self.frames.iter().rev() {
            match frame.kind {
                FrameKind::Method => return true,
                FrameKind::Class | FrameKind::Module | FrameKind::Namespace => return false,
                FrameKind::Function | FrameKind::Block => continue,
            }
        }
        false
    }

    /// Directly at module or namespace level.
    pub fn at_top_level(&self) -> bool {
        matches!(
            self.frames.last().map(|f| f.kind),
            Some(FrameKind::Module | FrameKind::Namespace)
        )
    }
}

/// Read-only view the type resolver sees while the builder runs.
pub struct ScopeView<'a> {
    pub scopes: &'a ScopeStack,
    pub bindings: &'a BindingTable,
    pub registry: &'a TypeRegistry,
}

impl TypeScope for ScopeView<'_> {
    fn is_type_param(&self, name: &str) -> bool {
        self.scopes.is_type_param(name)
    }

    fn value_type(&self, name: &str) -> Option<TypeDescriptor> {
        match self.scopes.lookup(name)? {
            Symbol::Binding(id) => self.bindings.get(id).map(|b| b.ty.clone()),
            Symbol::Function => match self.registry.functions(name) {
                [only] if only.type_params.is_empty() => Some(TypeDescriptor::Function(only.signature.clone())),
                _ => None,
            },
            Symbol::Class | Symbol::Namespace | Symbol::Imported => None,
        }
    }

    fn current_class(&self) -> Option<&str> {
        self.scopes.current_class()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::BindingKind;
    use kiln_syntax::Span;

    #[test]
    fn test_shadowing_and_pop() {
        let mut bindings = BindingTable::new();
        let outer = bindings.add("x", BindingKind::Variable { is_const: false }, TypeDescriptor::number(), Span::default());
        let inner = bindings.add("x", BindingKind::Variable { is_const: false }, TypeDescriptor::string(), Span::default());

        let mut scopes = ScopeStack::new();
        scopes.push(FrameKind::Module);
        scopes.declare("x", Symbol::Binding(outer));
        scopes.push(FrameKind::Block);
        scopes.declare("x", Symbol::Binding(inner));
        assert_eq!(scopes.lookup("x"), Some(Symbol::Binding(inner)));

        let registry = TypeRegistry::new();
        let view = ScopeView {
            scopes: &scopes,
            bindings: &bindings,
            registry: &registry,
        };
        assert_eq!(view.value_type("x"), Some(TypeDescriptor::string()));

        scopes.pop();
        assert_eq!(scopes.lookup("x"), Some(Symbol::Binding(outer)));
        assert_eq!(scopes.lookup("y"), None);
    }

    #[test]
    fn test_class_and_method_context() {
        let mut scopes = ScopeStack::new();
        scopes.push(FrameKind::Module);
        assert!(scopes.at_top_level());
        scopes.push_class("Box", vec!["T".into()]);
        scopes.push_function(FrameKind::Method, Vec::new());
        scopes.push_function(FrameKind::Function, Vec::new());
        assert_eq!(scopes.current_class(), Some("Box"));
        assert!(scopes.is_type_param("T"));
        assert!(scopes.in_method());
        scopes.pop();
        scopes.pop();
        assert!(!scopes.in_method());
    }
}
