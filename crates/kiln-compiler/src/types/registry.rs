//! Module-wide table of named types and functions
//!
//! Filled by the IR Builder's hoisting pass before any body is lowered, so
//! forward references resolve. Registration happens in two steps: names
//! first (so annotations can refer to any declared type), then member types
//! and signatures.

use super::descriptor::{FunctionSignature, TypeDescriptor};
use kiln_syntax::ast::TypeAnnotation;
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    /// Interface declaring methods; emitted as an abstract class.
    Interface,
}

#[derive(Debug, Clone)]
pub struct MemberEntry {
    pub name: String,
    pub ty: TypeDescriptor,
    pub is_static: bool,
}

#[derive(Debug, Clone)]
pub struct MethodEntry {
    pub name: String,
    pub signature: FunctionSignature,
    pub is_static: bool,
    pub is_abstract: bool,
}

#[derive(Debug, Clone)]
pub struct ClassEntry {
    pub name: String,
    /// Enclosing namespaces, outermost first.
    pub path: Vec<String>,
    pub kind: ClassKind,
    pub type_params: Vec<String>,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub is_abstract: bool,
    pub properties: Vec<MemberEntry>,
    pub methods: Vec<MethodEntry>,
}

impl ClassEntry {
    pub fn new(name: &str, kind: ClassKind) -> Self {
        Self {
            name: name.to_string(),
            path: Vec::new(),
            kind,
            type_params: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            is_abstract: false,
            properties: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&MemberEntry> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodEntry> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct ShapeField {
    pub name: String,
    pub annotation: TypeAnnotation,
    pub optional: bool,
}

/// Property-only interface; emitted as a struct.
#[derive(Debug, Clone)]
pub struct ShapeEntry {
    pub name: String,
    pub path: Vec<String>,
    pub type_params: Vec<String>,
    pub extends: Vec<String>,
    pub fields: Vec<ShapeField>,
}

#[derive(Debug, Clone)]
pub struct AliasEntry {
    pub name: String,
    pub type_params: Vec<String>,
    pub annotation: TypeAnnotation,
}

#[derive(Debug, Clone)]
pub struct FunctionEntry {
    pub name: String,
    pub type_params: Vec<String>,
    pub signature: FunctionSignature,
    pub has_body: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    classes: FxHashMap<String, ClassEntry>,
    class_order: Vec<String>,
    shapes: FxHashMap<String, ShapeEntry>,
    aliases: FxHashMap<String, AliasEntry>,
    functions: FxHashMap<String, Vec<FunctionEntry>>,
    namespaces: FxHashSet<String>,
    imported: FxHashSet<String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&mut self, entry: ClassEntry) {
        if !self.classes.contains_key(&entry.name) {
            self.class_order.push(entry.name.clone());
        }
        self.classes.insert(entry.name.clone(), entry);
    }

    pub fn add_shape(&mut self, entry: ShapeEntry) {
        self.shapes.insert(entry.name.clone(), entry);
    }

    pub fn add_alias(&mut self, entry: AliasEntry) {
        self.aliases.insert(entry.name.clone(), entry);
    }

    pub fn add_function(&mut self, entry: FunctionEntry) {
        self.functions.entry(entry.name.clone()).or_default().push(entry);
    }

    pub fn add_namespace(&mut self, name: &str) {
        self.namespaces.insert(name.to_string());
    }

    pub fn add_import(&mut self, name: &str) {
        self.imported.insert(name.to_string());
    }

    pub fn class(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.get(name)
    }

    pub fn class_mut(&mut self, name: &str) -> Option<&mut ClassEntry> {
        self.classes.get_mut(name)
    }

    /// Classes in registration order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassEntry> {
        self.class_order.iter().filter_map(|n| self.classes.get(n))
    }

    pub fn shape(&self, name: &str) -> Option<&ShapeEntry> {
        self.shapes.get(name)
    }

    pub fn alias(&self, name: &str) -> Option<&AliasEntry> {
        self.aliases.get(name)
    }

    pub fn functions(&self, name: &str) -> &[FunctionEntry] {
        self.functions.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn functions_mut(&mut self, name: &str) -> Option<&mut Vec<FunctionEntry>> {
        self.functions.get_mut(name)
    }

    pub fn is_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn is_namespace(&self, name: &str) -> bool {
        self.namespaces.contains(name)
    }

    pub fn is_imported(&self, name: &str) -> bool {
        self.imported.contains(name)
    }

    pub fn is_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Superclass chain starting at `name` itself.
    pub fn ancestry(&self, name: &str) -> Vec<&ClassEntry> {
        let mut chain: Vec<&ClassEntry> = Vec::new();
        let mut current = self.classes.get(name);
        while let Some(entry) = current {
            if chain.iter().any(|c| c.name == entry.name) {
                break;
            }
            chain.push(entry);
            current = entry.superclass.as_deref().and_then(|s| self.classes.get(s));
        }
        chain
    }

    /// Whether `derived` is `base` or inherits from it.
    pub fn is_subclass_of(&self, derived: &str, base: &str) -> bool {
        self.ancestry(derived).iter().any(|c| c.name == base)
    }

    /// C++ qualified path of a class or shape (`Geo::Point`).
    pub fn qualified_name(&self, name: &str) -> String {
        let path = self
            .classes
            .get(name)
            .map(|c| &c.path)
            .or_else(|| self.shapes.get(name).map(|s| &s.path));
        match path {
            Some(path) if !path.is_empty() => format!("{}::{}", path.join("::"), name),
            _ => name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str, superclass: Option<&str>) -> ClassEntry {
        let mut entry = ClassEntry::new(name, ClassKind::Class);
        entry.superclass = superclass.map(String::from);
        entry
    }

    #[test]
    fn test_ancestry_and_order() {
        let mut reg = TypeRegistry::new();
        reg.add_class(class("Dog", Some("Animal")));
        reg.add_class(class("Animal", None));
        let names: Vec<&str> = reg.ancestry("Dog").iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Dog", "Animal"]);
        assert!(reg.is_subclass_of("Dog", "Animal"));
        assert!(!reg.is_subclass_of("Animal", "Dog"));
        let order: Vec<&str> = reg.classes().map(|c| c.name.as_str()).collect();
        assert_eq!(order, vec!["Dog", "Animal"]);
    }

    #[test]
    fn test_ancestry_stops_on_cycle() {
        let mut reg = TypeRegistry::new();
        reg.add_class(class("A", Some("B")));
        reg.add_class(class("B", Some("A")));
        assert_eq!(reg.ancestry("A").len(), 2);
    }

    #[test]
    fn test_qualified_name() {
        let mut reg = TypeRegistry::new();
        let mut point = class("Point", None);
        point.path = vec!["Geo".into(), "Flat".into()];
        reg.add_class(point);
        assert_eq!(reg.qualified_name("Point"), "Geo::Flat::Point");
        assert_eq!(reg.qualified_name("Other"), "Other");
    }
}
