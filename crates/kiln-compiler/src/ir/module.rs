//! IR Module
//!
//! Top-level container for one compilation unit.

use super::binding::{Binding, BindingId, BindingTable};
use super::node::{Class, DeclKind, Function, IrNode};
use crate::types::TypeRegistry;

/// `import { a, b } from "./other"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Source specifier as written.
    pub source: String,
    /// Module name the specifier refers to (`./geo/point` -> `point`).
    pub module: String,
    pub names: Vec<String>,
}

impl Import {
    pub fn new(source: &str, names: Vec<String>) -> Self {
        let file = source.rsplit(['/', '\\']).next().unwrap_or(source);
        let module = match file.find('.') {
            Some(0) | None => file,
            Some(idx) => &file[..idx],
        };
        Self {
            source: source.to_string(),
            module: module.to_string(),
            names,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IrModule {
    /// Module name; names the emitted unit pair.
    pub name: String,
    /// Source path, for diagnostics and hint lookup.
    pub file: String,
    pub body: Vec<IrNode>,
    pub imports: Vec<Import>,
    pub bindings: BindingTable,
    pub registry: TypeRegistry,
}

impl IrModule {
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            body: Vec::new(),
            imports: Vec::new(),
            bindings: BindingTable::new(),
            registry: TypeRegistry::new(),
        }
    }

    pub fn binding(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.get(id)
    }

    /// Classes at any namespace depth, in source order.
    pub fn classes(&self) -> Vec<&Class> {
        let mut out = Vec::new();
        collect_classes(&self.body, &mut out);
        out
    }

    pub fn class(&self, name: &str) -> Option<&Class> {
        self.classes().into_iter().find(|c| c.name == name)
    }

    /// Top-level functions (outside namespaces), in source order.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.body.iter().filter_map(|n| match n {
            IrNode::Decl(d) => match &d.kind {
                DeclKind::Function(f) => Some(f),
                _ => None,
            },
            _ => None,
        })
    }
}

fn collect_classes<'a>(nodes: &'a [IrNode], out: &mut Vec<&'a Class>) {
    for node in nodes {
        if let IrNode::Decl(decl) = node {
            match &decl.kind {
                DeclKind::Class(c) => out.push(c),
                DeclKind::Namespace(ns) => collect_classes(&ns.body, out),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_module_name() {
        assert_eq!(Import::new("./geo/point", vec![]).module, "point");
        assert_eq!(Import::new("./util.js", vec![]).module, "util");
        assert_eq!(Import::new("lib", vec![]).module, "lib");
    }
}
