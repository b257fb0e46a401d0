//! Memory Strategy Analyzer
//!
//! Runs once over a finished [`IrModule`] and gives every binding a concrete
//! [`MemoryAnnotation`]. Precedence, highest first:
//!
//! 1. an authoring hint on the binding (unless it conflicts, see below);
//!    a `Shared` or `Unique` hint on a plain value boxes it
//! 2. anything else that is not a class instance lives by value: `Value`
//! 3. bindings initialized or assigned by construction own their object: `Shared`
//! 4. back-references in the object graph: `Weak`
//! 5. everything else: the configured default
//!
//! A back-reference is a field that
//! - has `this` stored into it (`child.parent = this`)
//! - receives constructor parameter *i* of a class constructed with `this`
//!   as argument *i* (`new Child(this)`)
//! - closes a cycle between distinct classes in the field graph, visited
//!   depth-first in declaration order
//!
//! Hints that cannot be honored are reported as `W1003` and fall back to
//! `Shared`. Finally every construction expression is stamped with the
//! category of the binding it initializes.

use crate::config::CompilerOptions;
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::ir::visit::{self, Visitor, VisitorMut};
use crate::ir::{
    Binding, BindingId, BindingTable, Decl, DeclKind, Expr, ExprKind, IrModule, MemoryAnnotation, MethodKind,
    Param, Resolution, Stmt, StmtKind,
};
use crate::types::{ClassKind, TypeDescriptor, TypeRegistry};
use kiln_syntax::ast::AssignmentOperator;
use rustc_hash::{FxHashMap, FxHashSet};

/// Finalizes ownership categories for one module.
pub struct MemoryAnalyzer {
    default_ownership: MemoryAnnotation,
}

impl MemoryAnalyzer {
    pub fn new(options: &CompilerOptions) -> Self {
        // Auto is rejected when options are validated; guard anyway
        let default_ownership = match options.default_ownership {
            MemoryAnnotation::Auto => MemoryAnnotation::Shared,
            other => other,
        };
        Self { default_ownership }
    }

    /// Resolve every binding and stamp construction sites.
    pub fn finalize(&self, module: &mut IrModule, diags: &mut Diagnostics) {
        let mut facts = FactCollector::default();
        for node in &module.body {
            facts.visit_node(node);
        }
        let mut back_refs = facts.back_references();
        back_refs.extend(cycle_back_references(&module.registry, &module.bindings));

        let mut conflicts = 0;
        for binding in module.bindings.iter_mut() {
            let (memory, conflict) = self.resolve(binding, &facts.constructed, &back_refs, &module.registry);
            if let Some(message) = conflict {
                diags.warn(DiagnosticCode::MemoryPolicyConflict, message, binding.span);
                conflicts += 1;
            }
            log::trace!("{} `{}`: {}", binding.id, binding.name, memory);
            binding.memory = memory;
        }

        let IrModule { body, bindings, .. } = module;
        let mut stamper = ConstructStamper { bindings: &*bindings };
        for node in body.iter_mut() {
            stamper.visit_node_mut(node);
        }

        log::debug!(
            "memory: {} bindings finalized, {} back-references, {} conflicts",
            module.bindings.len(),
            back_refs.len(),
            conflicts
        );
    }

    fn resolve(
        &self,
        binding: &Binding,
        constructed: &FxHashSet<BindingId>,
        back_refs: &FxHashSet<BindingId>,
        registry: &TypeRegistry,
    ) -> (MemoryAnnotation, Option<String>) {
        let is_constructed = constructed.contains(&binding.id);
        let is_back_ref = back_refs.contains(&binding.id);

        if binding.hinted && binding.memory.is_resolved() {
            let hint = binding.memory;
            let conflict = match hint {
                MemoryAnnotation::Weak if binding.ty.is_value_typed() => Some(format!(
                    "`{}` is not a class instance and nothing else owns it",
                    binding.name
                )),
                MemoryAnnotation::Value if is_back_ref => {
                    Some(format!("`{}` closes an ownership cycle and cannot be held by value", binding.name))
                }
                MemoryAnnotation::Value if is_abstract(&binding.ty, registry) => Some(format!(
                    "`{}` has an abstract type and cannot be held by value",
                    binding.name
                )),
                MemoryAnnotation::Weak if is_constructed => Some(format!(
                    "`{}` is initialized by construction; a weak reference would leave it unowned",
                    binding.name
                )),
                _ => None,
            };
            return match conflict {
                Some(message) => (MemoryAnnotation::Shared, Some(format!("{message}; using shared ownership"))),
                None => (hint, None),
            };
        }

        let memory = if binding.ty.is_value_typed() {
            MemoryAnnotation::Value
        } else if is_constructed {
            MemoryAnnotation::Shared
        } else if is_back_ref {
            MemoryAnnotation::Weak
        } else {
            self.default_ownership
        };
        (memory, None)
    }
}

fn is_abstract(ty: &TypeDescriptor, registry: &TypeRegistry) -> bool {
    ty.class_name()
        .and_then(|name| registry.class(name))
        .map_or(false, |c| c.is_abstract || c.kind == ClassKind::Interface)
}

// ============================================================================
// Fact collection
// ============================================================================

/// Gathers construction and `this`-escape facts in one walk.
#[derive(Default)]
struct FactCollector {
    /// Bindings initialized or assigned by construction.
    constructed: FxHashSet<BindingId>,
    /// Fields `this` is stored into directly.
    this_stores: FxHashSet<BindingId>,
    /// Per class: (constructor parameter index, field assigned from it).
    ctor_param_fields: FxHashMap<String, Vec<(usize, BindingId)>>,
    /// Constructions passing `this`: (class, argument index).
    this_args: Vec<(String, usize)>,
    /// Parameters of the constructor being walked, with its class.
    ctor: Option<(String, Vec<BindingId>)>,
    current_class: Option<String>,
}

impl FactCollector {
    fn back_references(&self) -> FxHashSet<BindingId> {
        let mut out = self.this_stores.clone();
        for (class, index) in &self.this_args {
            let Some(fields) = self.ctor_param_fields.get(class) else {
                continue;
            };
            out.extend(fields.iter().filter(|(i, _)| i == index).map(|(_, f)| *f));
        }
        out
    }

    fn note_init(&mut self, binding: BindingId, value: &Expr) {
        if matches!(value.kind, ExprKind::Construct { builtin: false, .. }) {
            self.constructed.insert(binding);
        }
    }
}

impl Visitor for FactCollector {
    fn visit_decl(&mut self, decl: &Decl) {
        match &decl.kind {
            DeclKind::Class(class) => {
                let saved = self.current_class.replace(class.name.clone());
                visit::walk_decl(self, decl);
                self.current_class = saved;
            }
            DeclKind::Method(m) if m.kind == MethodKind::Constructor => {
                let class = self.current_class.clone().unwrap_or_default();
                let params = m.params.iter().map(|p| p.binding).collect();
                let saved = self.ctor.replace((class, params));
                visit::walk_decl(self, decl);
                self.ctor = saved;
            }
            DeclKind::Property(p) => {
                if let Some(init) = &p.init {
                    self.note_init(p.binding, init);
                }
                visit::walk_decl(self, decl);
            }
            _ => visit::walk_decl(self, decl),
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let StmtKind::VarDecl(decls) = &stmt.kind {
            for d in decls {
                if let Some(init) = &d.init {
                    self.note_init(d.binding, init);
                }
            }
        }
        visit::walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Assign {
                op: AssignmentOperator::Assign,
                target,
                value,
            } => {
                if let Some(binding) = target.binding() {
                    self.note_init(binding, value);
                }
                if let ExprKind::Member { field: Some(field), .. } = &target.kind {
                    if value.is_this() {
                        self.this_stores.insert(*field);
                    }
                    // `this.f = p` inside a constructor
                    if let (Some((class, params)), ExprKind::Ident {
                        resolution: Resolution::Binding(source),
                        ..
                    }) = (&self.ctor, &value.kind)
                    {
                        if is_this_member(target) {
                            if let Some(index) = params.iter().position(|p| p == source) {
                                self.ctor_param_fields
                                    .entry(class.clone())
                                    .or_default()
                                    .push((index, *field));
                            }
                        }
                    }
                }
            }
            ExprKind::Construct {
                class,
                args,
                builtin: false,
                ..
            } => {
                for (i, arg) in args.iter().enumerate() {
                    if arg.is_this() {
                        self.this_args.push((class.clone(), i));
                    }
                }
            }
            _ => {}
        }
        visit::walk_expr(self, expr);
    }
}

fn is_this_member(expr: &Expr) -> bool {
    matches!(&expr.kind, ExprKind::Member { object, .. } if object.is_this())
}

// ============================================================================
// Class field graph
// ============================================================================

/// Class an instance field points at, and whether the edge goes through an
/// array.
fn field_target<'t>(ty: &'t TypeDescriptor, registry: &TypeRegistry) -> Option<(&'t str, bool)> {
    let ty = ty.unwrap_nullable();
    let (target, via_array) = match ty.element_type() {
        Some(elem) => (elem.class_name()?, true),
        None => (ty.class_name()?, false),
    };
    registry.is_class(target).then_some((target, via_array))
}

/// Fields closing a cycle between distinct classes.
fn cycle_back_references(registry: &TypeRegistry, bindings: &BindingTable) -> FxHashSet<BindingId> {
    let mut search = CycleSearch {
        registry,
        bindings,
        stack: Vec::new(),
        visited: FxHashSet::default(),
        found: FxHashSet::default(),
    };
    for class in registry.classes() {
        if !search.visited.contains(class.name.as_str()) {
            search.visit(&class.name);
        }
    }
    search.found
}

struct CycleSearch<'a> {
    registry: &'a TypeRegistry,
    bindings: &'a BindingTable,
    stack: Vec<&'a str>,
    visited: FxHashSet<&'a str>,
    found: FxHashSet<BindingId>,
}

impl<'a> CycleSearch<'a> {
    fn visit(&mut self, class: &'a str) {
        self.visited.insert(class);
        self.stack.push(class);
        let bindings = self.bindings;
        for field in bindings.fields_of(class) {
            if field.field_owner().is_none() {
                continue;
            }
            let Some((target, via_array)) = field_target(&field.ty, self.registry) else {
                continue;
            };
            if target == class {
                continue;
            }
            if self.stack.contains(&target) {
                if !via_array {
                    self.found.insert(field.id);
                } else if let Some(reverse) = self.direct_field(target, class) {
                    // Collections keep owning; the single reverse pointer yields
                    self.found.insert(reverse);
                }
            } else if !self.visited.contains(target) {
                self.visit(target);
            }
        }
        self.stack.pop();
    }

    /// First non-array instance field of `from` pointing at `to`.
    fn direct_field(&self, from: &str, to: &str) -> Option<BindingId> {
        self.bindings
            .fields_of(from)
            .filter(|f| f.field_owner().is_some())
            .find(|f| matches!(field_target(&f.ty, self.registry), Some((t, false)) if t == to))
            .map(|f| f.id)
    }
}

// ============================================================================
// Construction stamping
// ============================================================================

struct ConstructStamper<'a> {
    bindings: &'a BindingTable,
}

impl ConstructStamper<'_> {
    fn stamp(&self, expr: &mut Expr, binding: BindingId) {
        let Some(binding) = self.bindings.get(binding) else {
            return;
        };
        if let ExprKind::Construct {
            ownership, builtin, ..
        } = &mut expr.kind
        {
            *ownership = match binding.memory {
                _ if *builtin => MemoryAnnotation::Value,
                // Held as `js::any` or similar; the object still needs an owner
                _ if !binding.ty.is_heap_class() => MemoryAnnotation::Shared,
                MemoryAnnotation::Weak | MemoryAnnotation::Auto => MemoryAnnotation::Shared,
                other => other,
            };
        }
    }

    fn stamp_defaults(&self, params: &mut [Param]) {
        for p in params {
            if let Some(default) = &mut p.default {
                self.stamp(default, p.binding);
            }
        }
    }
}

impl VisitorMut for ConstructStamper<'_> {
    fn visit_decl_mut(&mut self, decl: &mut Decl) {
        match &mut decl.kind {
            DeclKind::Property(p) => {
                if let Some(init) = &mut p.init {
                    self.stamp(init, p.binding);
                }
            }
            DeclKind::Function(f) => self.stamp_defaults(&mut f.params),
            DeclKind::Method(m) => self.stamp_defaults(&mut m.params),
            _ => {}
        }
        visit::walk_decl_mut(self, decl);
    }

    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        if let StmtKind::VarDecl(decls) = &mut stmt.kind {
            for d in decls.iter_mut() {
                if let Some(init) = &mut d.init {
                    self.stamp(init, d.binding);
                }
            }
        }
        visit::walk_stmt_mut(self, stmt);
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        match &mut expr.kind {
            ExprKind::Assign { target, value, .. } => {
                if let Some(binding) = target.binding() {
                    self.stamp(value, binding);
                }
            }
            ExprKind::Lambda(lambda) => self.stamp_defaults(&mut lambda.params),
            ExprKind::Construct {
                ownership, builtin, ..
            } if !ownership.is_resolved() => {
                *ownership = if *builtin {
                    MemoryAnnotation::Value
                } else {
                    MemoryAnnotation::Shared
                };
            }
            _ => {}
        }
        visit::walk_expr_mut(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower::lower_module;
    use kiln_syntax::ast::{ClassMember, Statement};
    use kiln_syntax::build::*;
    use kiln_syntax::{HintIndex, OwnershipHint, SourceFile};

    fn analyze(statements: Vec<Statement>, hints: Option<&HintIndex>) -> (IrModule, Diagnostics) {
        let options = CompilerOptions::default();
        let file = SourceFile::new("main.ts", statements);
        let (mut module, mut diags) = lower_module(&file, &options, hints, None);
        MemoryAnalyzer::new(&options).finalize(&mut module, &mut diags);
        (module, diags)
    }

    fn field_memory(module: &IrModule, class: &str, name: &str) -> MemoryAnnotation {
        let id = module.bindings.field(class, name).expect("field");
        module.binding(id).expect("binding").memory
    }

    fn first_construct(module: &IrModule) -> MemoryAnnotation {
        struct Find(Option<MemoryAnnotation>);
        impl Visitor for Find {
            fn visit_expr(&mut self, expr: &Expr) {
                if let ExprKind::Construct { ownership, .. } = &expr.kind {
                    self.0.get_or_insert(*ownership);
                }
                visit::walk_expr(self, expr);
            }
        }
        let mut find = Find(None);
        for node in &module.body {
            find.visit_node(node);
        }
        find.0.expect("construction")
    }

    fn class_field(name: &str, ty: &str) -> ClassMember {
        ClassMember::Property(property(name, Some(ref_ty(ty, vec![])), None))
    }

    #[test]
    fn test_constructed_field_is_shared() {
        let engine = class_decl("Engine", None, vec![]);
        let car = class_decl(
            "Car",
            None,
            vec![ClassMember::Property(property(
                "engine",
                Some(ref_ty("Engine", vec![])),
                Some(new_expr("Engine", vec![])),
            ))],
        );
        let (module, diags) = analyze(vec![Statement::ClassDecl(engine), Statement::ClassDecl(car)], None);
        assert!(diags.is_empty());
        assert_eq!(field_memory(&module, "Car", "engine"), MemoryAnnotation::Shared);
        assert_eq!(first_construct(&module), MemoryAnnotation::Shared);
    }

    #[test]
    fn test_primitives_are_values() {
        let (module, _) = analyze(vec![let_stmt("count", Some(num(1.0))), let_stmt("name", Some(str_lit("a")))], None);
        assert!(module.bindings.iter().all(|b| b.memory == MemoryAnnotation::Value));
    }

    #[test]
    fn test_this_store_is_weak() {
        let child = class_decl("Child", None, vec![class_field("parent", "Parent")]);
        let adopt = method(
            "adopt",
            vec![param("c", Some(ref_ty("Child", vec![])))],
            None,
            vec![expr_stmt(assign(member(ident("c"), "parent"), this()))],
        );
        let parent = class_decl("Parent", None, vec![ClassMember::Method(adopt)]);
        let (module, _) = analyze(vec![Statement::ClassDecl(child), Statement::ClassDecl(parent)], None);
        assert_eq!(field_memory(&module, "Child", "parent"), MemoryAnnotation::Weak);
    }

    #[test]
    fn test_this_passed_to_constructor_parameter_is_weak() {
        let ctor = method(
            "constructor",
            vec![param("owner", Some(ref_ty("Parent", vec![])))],
            None,
            vec![expr_stmt(assign(member(this(), "owner"), ident("owner")))],
        );
        let child = class_decl("Child", None, vec![class_field("owner", "Parent"), ClassMember::Method(ctor)]);
        let spawn = method(
            "spawn",
            vec![],
            None,
            vec![const_stmt("c", new_expr("Child", vec![this()]))],
        );
        let parent = class_decl("Parent", None, vec![ClassMember::Method(spawn)]);
        let (module, _) = analyze(vec![Statement::ClassDecl(child), Statement::ClassDecl(parent)], None);
        assert_eq!(field_memory(&module, "Child", "owner"), MemoryAnnotation::Weak);
    }

    #[test]
    fn test_field_cycle_breaks_on_the_back_edge() {
        let a = class_decl("A", None, vec![class_field("b", "B")]);
        let b = class_decl("B", None, vec![class_field("a", "A")]);
        let (module, _) = analyze(vec![Statement::ClassDecl(a), Statement::ClassDecl(b)], None);
        assert_eq!(field_memory(&module, "A", "b"), MemoryAnnotation::Shared);
        assert_eq!(field_memory(&module, "B", "a"), MemoryAnnotation::Weak);
    }

    #[test]
    fn test_array_edge_keeps_owning() {
        // Child is visited first; the back edge runs through Tree's array
        let child = class_decl("Child", None, vec![class_field("tree", "Tree")]);
        let tree = class_decl(
            "Tree",
            None,
            vec![ClassMember::Property(property(
                "children",
                Some(array_ty(ref_ty("Child", vec![]))),
                None,
            ))],
        );
        let (module, _) = analyze(vec![Statement::ClassDecl(child), Statement::ClassDecl(tree)], None);
        assert_eq!(field_memory(&module, "Child", "tree"), MemoryAnnotation::Weak);
        assert_eq!(field_memory(&module, "Tree", "children"), MemoryAnnotation::Value);
    }

    #[test]
    fn test_self_reference_is_not_a_cycle() {
        let node = class_decl("Node", None, vec![class_field("next", "Node")]);
        let (module, _) = analyze(vec![Statement::ClassDecl(node)], None);
        assert_eq!(field_memory(&module, "Node", "next"), MemoryAnnotation::Shared);
    }

    #[test]
    fn test_hint_wins_over_inference() {
        let engine = class_decl("Engine", None, vec![]);
        let mut hints = HintIndex::new();
        hints.insert("main.ts", 4, "e", OwnershipHint::Unique);
        let e = typed_let("e", 4, None, Some(new_expr("Engine", vec![])));
        let (module, diags) = analyze(vec![Statement::ClassDecl(engine), e], Some(&hints));
        assert!(diags.is_empty());
        let b = module.bindings.iter().find(|b| b.name == "e").expect("binding");
        assert_eq!(b.memory, MemoryAnnotation::Unique);
        assert_eq!(first_construct(&module), MemoryAnnotation::Unique);
    }

    #[test]
    fn test_weak_hint_on_construction_conflicts() {
        let engine = class_decl("Engine", None, vec![]);
        let mut hints = HintIndex::new();
        hints.insert("main.ts", 2, "e", OwnershipHint::Weak);
        let e = typed_let("e", 2, None, Some(new_expr("Engine", vec![])));
        let (module, diags) = analyze(vec![Statement::ClassDecl(engine), e], Some(&hints));
        assert_eq!(diags.count(DiagnosticCode::MemoryPolicyConflict), 1);
        let b = module.bindings.iter().find(|b| b.name == "e").expect("binding");
        assert_eq!(b.memory, MemoryAnnotation::Shared);
    }

    #[test]
    fn test_value_hint_on_abstract_type_conflicts() {
        let mut shape = class_decl("Shape", None, vec![]);
        shape.is_abstract = true;
        let mut hints = HintIndex::new();
        hints.insert("main.ts", 7, "s", OwnershipHint::Value);
        let s = typed_let("s", 7, Some(ref_ty("Shape", vec![])), None);
        let (module, diags) = analyze(vec![Statement::ClassDecl(shape), s], Some(&hints));
        assert_eq!(diags.count(DiagnosticCode::MemoryPolicyConflict), 1);
        let b = module.bindings.iter().find(|b| b.name == "s").expect("binding");
        assert_eq!(b.memory, MemoryAnnotation::Shared);
    }

    #[test]
    fn test_unique_hint_on_number_is_kept() {
        let mut hints = HintIndex::new();
        hints.insert("main.ts", 3, "count", OwnershipHint::Unique);
        let count = typed_let("count", 3, Some(number_ty()), Some(num(1.0)));
        let (module, diags) = analyze(vec![count], Some(&hints));
        assert!(diags.is_empty());
        let b = module.bindings.iter().find(|b| b.name == "count").expect("binding");
        assert_eq!(b.memory, MemoryAnnotation::Unique);
    }

    #[test]
    fn test_weak_hint_on_number_conflicts() {
        let mut hints = HintIndex::new();
        hints.insert("main.ts", 5, "n", OwnershipHint::Weak);
        let n = typed_let("n", 5, Some(number_ty()), Some(num(2.0)));
        let (module, diags) = analyze(vec![n], Some(&hints));
        assert_eq!(diags.count(DiagnosticCode::MemoryPolicyConflict), 1);
        let b = module.bindings.iter().find(|b| b.name == "n").expect("binding");
        assert_eq!(b.memory, MemoryAnnotation::Shared);
    }

    #[test]
    fn test_default_ownership_applies_to_plain_class_bindings() {
        let engine = class_decl("Engine", None, vec![]);
        let f = function(
            "run",
            vec![param("e", Some(ref_ty("Engine", vec![])))],
            None,
            vec![],
        );
        let options = CompilerOptions::default().with_default_ownership(MemoryAnnotation::Unique);
        let file = SourceFile::new("main.ts", vec![Statement::ClassDecl(engine), Statement::FunctionDecl(f)]);
        let (mut module, mut diags) = lower_module(&file, &options, None, None);
        MemoryAnalyzer::new(&options).finalize(&mut module, &mut diags);
        let b = module.bindings.iter().find(|b| b.name == "e").expect("param");
        assert_eq!(b.memory, MemoryAnnotation::Unique);
    }

    #[test]
    fn test_unbound_construction_defaults_to_shared() {
        let engine = class_decl("Engine", None, vec![]);
        let (module, _) = analyze(
            vec![Statement::ClassDecl(engine), expr_stmt(call(ident("use"), vec![new_expr("Engine", vec![])]))],
            None,
        );
        assert_eq!(first_construct(&module), MemoryAnnotation::Shared);
    }
}
