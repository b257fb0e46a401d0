//! Class hierarchy facts the emitter needs
//!
//! Virtual/override marking is decided over the whole hierarchy at once so
//! every override marker refers to a method a base really declares.

use crate::ir::visit::{self, Visitor};
use crate::ir::{Class, DeclKind, Expr, ExprKind, IrModule, MemoryAnnotation, Method, MethodKind, Param};
use crate::types::TypeRegistry;
use rustc_hash::{FxHashMap, FxHashSet};

/// How a method is marked in its class declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MethodMarker {
    Static,
    Virtual,
    Override,
}

pub(crate) struct ClassHierarchy<'m> {
    registry: &'m TypeRegistry,
    classes: FxHashMap<&'m str, &'m Class>,
    subclassed: FxHashSet<&'m str>,
    /// Classes whose `this` is used as a value.
    escaping: FxHashSet<String>,
}

impl<'m> ClassHierarchy<'m> {
    pub fn new(module: &'m IrModule) -> Self {
        let mut classes = FxHashMap::default();
        let mut subclassed = FxHashSet::default();
        for class in module.classes() {
            classes.insert(class.name.as_str(), class);
            if let Some(base) = class.superclass_name() {
                subclassed.insert(base);
            }
            for iface in &class.implements {
                subclassed.insert(iface.as_str());
            }
        }

        let mut finder = ThisEscapes::default();
        for node in &module.body {
            finder.visit_node(node);
        }

        Self {
            registry: &module.registry,
            classes,
            subclassed,
            escaping: finder.escaping,
        }
    }

    pub fn class(&self, name: &str) -> Option<&'m Class> {
        self.classes.get(name).copied()
    }

    /// Base class declared in this module.
    pub fn base(&self, class: &Class) -> Option<&'m Class> {
        class.superclass_name().and_then(|b| self.class(b))
    }

    /// Interfaces with methods this class inherits from.
    pub fn interfaces(&self, class: &Class) -> Vec<&'m Class> {
        class
            .implements
            .iter()
            .filter_map(|i| self.class(i))
            .filter(|i| i.is_interface)
            .collect()
    }

    /// Topmost ancestor declared in this module.
    pub fn root(&self, class: &'m Class) -> &'m Class {
        let mut current = class;
        let mut seen = FxHashSet::default();
        while let Some(base) = self.base(current) {
            if !seen.insert(base.name.as_str()) {
                break;
            }
            current = base;
        }
        current
    }

    pub fn is_root(&self, class: &Class) -> bool {
        self.base(class).is_none()
    }

    fn members_of_tree(&self, root: &str) -> impl Iterator<Item = &'m Class> + '_ {
        let root = root.to_string();
        self.classes.values().copied().filter(move |c| self.root(c).name == root)
    }

    /// Root needs a virtual destructor.
    pub fn is_polymorphic(&self, root: &Class) -> bool {
        root.is_interface
            || self.subclassed.contains(root.name.as_str())
            || self
                .members_of_tree(&root.name)
                .any(|c| c.methods().any(|m| m.kind == MethodKind::Method && !m.is_static))
    }

    /// Root must derive from `std::enable_shared_from_this`.
    pub fn shares_this(&self, root: &Class) -> bool {
        self.members_of_tree(&root.name).any(|c| self.escaping.contains(&c.name))
    }

    /// Root must derive from the metadata base.
    pub fn carries_metadata(&self, root: &Class) -> bool {
        self.members_of_tree(&root.name).any(|c| !c.metadata.is_empty())
    }

    pub fn marker(&self, class: &Class, method: &Method) -> MethodMarker {
        if method.is_static {
            return MethodMarker::Static;
        }
        let arity = method.params.len();
        let mut visited = FxHashSet::default();
        if self.ancestor_declares(&class.name, &method.name, arity, &mut visited) {
            MethodMarker::Override
        } else {
            MethodMarker::Virtual
        }
    }

    fn ancestor_declares(&self, class: &str, method: &str, arity: usize, visited: &mut FxHashSet<String>) -> bool {
        let Some(entry) = self.registry.class(class) else {
            return false;
        };
        let parents = entry.superclass.iter().chain(entry.interfaces.iter());
        for parent in parents {
            if !visited.insert(parent.clone()) {
                continue;
            }
            let declares = self.registry.class(parent).map_or(false, |p| {
                p.methods
                    .iter()
                    .any(|m| m.name == method && !m.is_static && m.signature.params.len() == arity)
            });
            if declares || self.ancestor_declares(parent, method, arity, visited) {
                return true;
            }
        }
        false
    }

    /// Parameters a class without its own constructor inherits: those of
    /// the nearest module ancestor that declares one.
    pub fn inherited_ctor_params(&self, class: &Class) -> Option<&'m [Param]> {
        let mut current = self.base(class)?;
        let mut seen = FxHashSet::default();
        loop {
            if let Some(ctor) = constructor(current) {
                return Some(&ctor.params);
            }
            if !seen.insert(current.name.as_str()) {
                return None;
            }
            current = self.base(current)?;
        }
    }

    /// Classes of one scope, bases and by-value members first, otherwise in
    /// source order.
    pub fn order(&self, classes: &[&'m Class], module: &IrModule) -> Vec<&'m Class> {
        let deps = |c: &&'m Class| -> Vec<String> {
            let mut out: Vec<String> = c.superclass_name().map(String::from).into_iter().collect();
            out.extend(self.interfaces(c).iter().map(|i| i.name.clone()));
            for p in c.properties() {
                if let Some(b) = module.binding(p.binding) {
                    if b.memory == MemoryAnnotation::Value {
                        if let Some(name) = b.ty.class_name() {
                            out.push(name.to_string());
                        }
                    }
                }
            }
            out
        };
        topo_order(classes, |c| c.name.as_str(), deps)
            .into_iter()
            .map(|i| classes[i])
            .collect()
    }
}

/// The constructor with a body, else the first declared.
pub(crate) fn constructor(class: &Class) -> Option<&Method> {
    let mut ctors = class.methods().filter(|m| m.kind == MethodKind::Constructor);
    let first = ctors.next()?;
    if first.body.is_some() {
        return Some(first);
    }
    ctors.find(|m| m.body.is_some()).or(Some(first))
}

/// Indices of `items` with each item's in-set dependencies before it;
/// ties keep input order. Cycles are cut where they close.
pub(crate) fn topo_order<T>(items: &[T], name: impl Fn(&T) -> &str, deps: impl Fn(&T) -> Vec<String>) -> Vec<usize> {
    let index: FxHashMap<&str, usize> = items.iter().enumerate().map(|(i, t)| (name(t), i)).collect();
    let mut state = vec![0u8; items.len()];
    let mut out = Vec::with_capacity(items.len());

    fn visit<T>(
        i: usize,
        items: &[T],
        index: &FxHashMap<&str, usize>,
        deps: &dyn Fn(&T) -> Vec<String>,
        state: &mut [u8],
        out: &mut Vec<usize>,
    ) {
        // 0 = new, 1 = on stack, 2 = done
        if state[i] != 0 {
            return;
        }
        state[i] = 1;
        for dep in deps(&items[i]) {
            if let Some(&j) = index.get(dep.as_str()) {
                if j != i {
                    visit(j, items, index, deps, state, out);
                }
            }
        }
        state[i] = 2;
        out.push(i);
    }

    for i in 0..items.len() {
        visit(i, items, &index, &deps, &mut state, &mut out);
    }
    out
}

// ============================================================================
// `this` escape detection
// ============================================================================

#[derive(Default)]
struct ThisEscapes {
    class: Option<String>,
    escaping: FxHashSet<String>,
}

impl Visitor for ThisEscapes {
    fn visit_decl(&mut self, decl: &crate::ir::Decl) {
        if let DeclKind::Class(class) = &decl.kind {
            let saved = self.class.replace(class.name.clone());
            visit::walk_decl(self, decl);
            self.class = saved;
        } else {
            visit::walk_decl(self, decl);
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            // `this.x` reads through the raw pointer
            ExprKind::Member { object, .. } if object.is_this() => {}
            ExprKind::This => {
                if let Some(class) = &self.class {
                    self.escaping.insert(class.clone());
                }
            }
            _ => visit::walk_expr(self, expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topo_order_puts_dependencies_first() {
        let items = vec![("Dog", vec!["Animal"]), ("Animal", vec![]), ("Cat", vec!["Animal"])];
        let order = topo_order(&items, |i| i.0, |i| i.1.iter().map(|s| s.to_string()).collect());
        let names: Vec<&str> = order.iter().map(|&i| items[i].0).collect();
        assert_eq!(names, vec!["Animal", "Dog", "Cat"]);
    }

    #[test]
    fn test_topo_order_survives_cycles() {
        let items = vec![("A", vec!["B"]), ("B", vec!["A"])];
        let order = topo_order(&items, |i| i.0, |i| i.1.iter().map(|s| s.to_string()).collect());
        assert_eq!(order.len(), 2);
    }
}
