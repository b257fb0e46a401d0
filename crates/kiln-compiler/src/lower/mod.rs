//! IR Builder
//!
//! Turns a validated [`SourceFile`] into an [`IrModule`]:
//! - hoists every named type, function and global before any body is
//!   lowered, so forward references resolve
//! - resolves every name to a binding, function, class or namespace
//! - attaches resolved types to bindings and expressions
//! - carries ownership hints onto the bindings they name
//!
//! Constructs outside the modelled vocabulary become placeholders with a
//! warning; lowering never fails.

mod decl;
mod expr;
mod stmt;

use crate::config::CompilerOptions;
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::ir::{
    BindingId, BindingKind, BindingTable, FrameKind, Import, IrModule, IrNode, ScopeStack, ScopeView, Symbol,
};
use crate::types::{
    AliasEntry, ClassEntry, ClassKind, FunctionEntry, FunctionSignature, MemberEntry, MethodEntry, ShapeEntry,
    ShapeField, TypeDescriptor, TypeRegistry, TypeResolver,
};
use kiln_syntax::ast::{
    self, ClassDecl, ClassMember, Expression, Identifier, InterfaceDecl, InterfaceMember, Statement, TypeAnnotation,
};
use kiln_syntax::{HintIndex, SourceFile, Span, TypeTable};
use rustc_hash::{FxHashMap, FxHashSet};

/// Build the IR for one source file. Never fails; problems are reported in
/// the returned diagnostics.
pub fn lower_module(
    file: &SourceFile,
    options: &CompilerOptions,
    hints: Option<&HintIndex>,
    semantic: Option<&TypeTable>,
) -> (IrModule, Diagnostics) {
    let lowerer = Lowerer::new(&file.path, options, hints, semantic);
    lowerer.lower(file.module_stem(), file)
}

/// Identity of an AST node for the lifetime of one lowering run.
fn node_key<T>(node: &T) -> usize {
    node as *const T as usize
}

pub(crate) struct Lowerer<'a> {
    file: String,
    options: &'a CompilerOptions,
    hints: Option<&'a HintIndex>,
    semantic: Option<&'a TypeTable>,
    registry: TypeRegistry,
    bindings: BindingTable,
    scopes: ScopeStack,
    diags: Diagnostics,
    imports: Vec<Import>,
    /// Enclosing namespaces, outermost first.
    path: Vec<String>,
    /// Signatures computed while hoisting, keyed by declaration node.
    signatures: FxHashMap<usize, FunctionSignature>,
    /// `(class, field)` to field binding.
    fields: FxHashMap<(String, String), BindingId>,
    /// Qualified global name to binding.
    globals: FxHashMap<String, BindingId>,
    /// Names already reported as unresolved.
    unresolved: FxHashSet<String>,
    /// Declared return type of the function being lowered.
    current_return: Option<TypeDescriptor>,
}

impl<'a> Lowerer<'a> {
    pub(crate) fn new(
        file: &str,
        options: &'a CompilerOptions,
        hints: Option<&'a HintIndex>,
        semantic: Option<&'a TypeTable>,
    ) -> Self {
        Self {
            file: file.to_string(),
            options,
            hints,
            semantic,
            registry: TypeRegistry::new(),
            bindings: BindingTable::new(),
            scopes: ScopeStack::new(),
            diags: Diagnostics::new(file),
            imports: Vec::new(),
            path: Vec::new(),
            signatures: FxHashMap::default(),
            fields: FxHashMap::default(),
            globals: FxHashMap::default(),
            unresolved: FxHashSet::default(),
            current_return: None,
        }
    }

    pub(crate) fn lower(mut self, name: &str, file: &SourceFile) -> (IrModule, Diagnostics) {
        log::debug!("lowering module `{}` ({} statements)", name, file.statements.len());
        self.scopes.push(FrameKind::Module);

        // First pass: register every type name, namespace and import
        self.register_names(&file.statements);

        // Second pass: function signatures and class member types
        self.declare_hoisted(&file.statements);
        self.register_members(&file.statements);

        // Third pass: global variables, in source order
        self.register_globals(&file.statements);

        // Field bindings exist before any body refers to them
        self.declare_fields(&file.statements);

        // Fourth pass: lower all declarations and statements
        let mut body = Vec::new();
        for stmt in &file.statements {
            if let Some(node) = self.lower_top_level(stmt, false) {
                body.push(node);
            }
        }
        self.scopes.pop();

        let mut module = IrModule::new(name, &self.file);
        module.body = body;
        module.imports = self.imports;
        module.bindings = self.bindings;
        module.registry = self.registry;
        log::debug!(
            "lowered `{}`: {} nodes, {} bindings, {} diagnostics",
            module.name,
            module.body.len(),
            module.bindings.len(),
            self.diags.len()
        );
        (module, self.diags)
    }

    /// Peel `export` off a statement.
    fn unwrap_export(stmt: &Statement) -> (&Statement, bool) {
        match stmt {
            Statement::ExportDecl(export) => (Self::unwrap_export(&export.declaration).0, true),
            other => (other, false),
        }
    }

    fn qualified(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}::{}", self.path.join("::"), name)
        }
    }

    // ========================================================================
    // Hoisting
    // ========================================================================

    fn register_names(&mut self, stmts: &[Statement]) {
        for stmt in stmts {
            let (stmt, _) = Self::unwrap_export(stmt);
            match stmt {
                Statement::ClassDecl(class) => {
                    let mut entry = ClassEntry::new(&class.name.name, ClassKind::Class);
                    entry.path = self.path.clone();
                    entry.type_params = class.type_params.iter().map(|t| t.name.name.clone()).collect();
                    entry.superclass = class.extends.as_ref().map(|e| strip_qualifier(&e.name).to_string());
                    entry.interfaces = class.implements.iter().map(|i| strip_qualifier(&i.name).to_string()).collect();
                    entry.is_abstract = class.is_abstract;
                    self.registry.add_class(entry);
                }
                Statement::InterfaceDecl(iface) if has_methods(iface) => {
                    let mut entry = ClassEntry::new(&iface.name.name, ClassKind::Interface);
                    entry.path = self.path.clone();
                    entry.type_params = iface.type_params.iter().map(|t| t.name.name.clone()).collect();
                    entry.interfaces = iface.extends.iter().map(|e| e.name.clone()).collect();
                    entry.is_abstract = true;
                    self.registry.add_class(entry);
                }
                Statement::InterfaceDecl(iface) => {
                    let fields = iface
                        .members
                        .iter()
                        .filter_map(|m| match m {
                            InterfaceMember::Property {
                                name,
                                type_annotation,
                                optional,
                                ..
                            } => Some(ShapeField {
                                name: name.name.clone(),
                                annotation: type_annotation.clone(),
                                optional: *optional,
                            }),
                            InterfaceMember::Method { .. } => None,
                        })
                        .collect();
                    self.registry.add_shape(ShapeEntry {
                        name: iface.name.name.clone(),
                        path: self.path.clone(),
                        type_params: iface.type_params.iter().map(|t| t.name.name.clone()).collect(),
                        extends: iface.extends.iter().map(|e| e.name.clone()).collect(),
                        fields,
                    });
                }
                Statement::TypeAliasDecl(alias) => {
                    self.registry.add_alias(AliasEntry {
                        name: alias.name.name.clone(),
                        type_params: alias.type_params.iter().map(|t| t.name.name.clone()).collect(),
                        annotation: alias.type_annotation.clone(),
                    });
                }
                Statement::ModuleDecl(ns) => {
                    self.registry.add_namespace(&ns.name.name);
                    self.path.push(ns.name.name.clone());
                    self.register_names(&ns.body);
                    self.path.pop();
                }
                Statement::ImportDecl(import) => {
                    let names: Vec<String> = import.specifiers.iter().map(|s| s.local_name().to_string()).collect();
                    for name in &names {
                        self.registry.add_import(name);
                    }
                    self.imports.push(Import::new(&import.source, names));
                }
                _ => {}
            }
        }
    }

    /// Put the hoisted names of one module or namespace body in scope.
    fn declare_hoisted(&mut self, stmts: &[Statement]) {
        for stmt in stmts {
            let (stmt, _) = Self::unwrap_export(stmt);
            match stmt {
                Statement::FunctionDecl(f) => self.scopes.declare(&f.name.name, Symbol::Function),
                Statement::ClassDecl(c) => self.scopes.declare(&c.name.name, Symbol::Class),
                Statement::ModuleDecl(ns) => self.scopes.declare(&ns.name.name, Symbol::Namespace),
                Statement::ImportDecl(import) => {
                    for spec in &import.specifiers {
                        self.scopes.declare(spec.local_name(), Symbol::Imported);
                    }
                }
                Statement::VariableDecl(var) => {
                    for d in &var.declarations {
                        if let Some(id) = self.globals.get(&self.qualified(&d.name.name)).copied() {
                            self.scopes.declare(&d.name.name, Symbol::Binding(id));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn register_members(&mut self, stmts: &[Statement]) {
        for stmt in stmts {
            let (stmt, _) = Self::unwrap_export(stmt);
            match stmt {
                Statement::FunctionDecl(f) => {
                    let type_params: Vec<String> = f.type_params.iter().map(|t| t.name.name.clone()).collect();
                    self.scopes.push_function(FrameKind::Function, type_params.clone());
                    let sig = self.signature(&f.params, f.return_type.as_ref(), f.body.as_ref(), f.is_async);
                    self.scopes.pop();
                    self.signatures.insert(node_key(f), sig.clone());
                    self.registry.add_function(FunctionEntry {
                        name: f.name.name.clone(),
                        type_params,
                        signature: sig,
                        has_body: f.body.is_some(),
                    });
                }
                Statement::ClassDecl(class) => self.register_class_members(class),
                Statement::InterfaceDecl(iface) if has_methods(iface) => self.register_interface_members(iface),
                Statement::ModuleDecl(ns) => {
                    self.enter_namespace(&ns.name.name, &ns.body);
                    self.register_members(&ns.body);
                    self.leave_namespace();
                }
                _ => {}
            }
        }
    }

    fn register_class_members(&mut self, class: &ClassDecl) {
        let name = class.name.name.as_str();
        let type_params = class.type_params.iter().map(|t| t.name.name.clone()).collect();
        self.scopes.push_class(name, type_params);

        let mut properties = Vec::new();
        let mut methods = Vec::new();
        for member in &class.members {
            match member {
                ClassMember::Property(p) => {
                    let ty = match (&p.type_annotation, &p.initializer) {
                        (Some(ann), _) => self.resolve_type(ann),
                        (None, Some(init)) => self.infer_type(init),
                        (None, None) => TypeDescriptor::DynamicFallback,
                    };
                    let ty = if p.optional { TypeDescriptor::nullable(ty) } else { ty };
                    properties.push(MemberEntry {
                        name: p.name.name.clone(),
                        ty,
                        is_static: p.is_static,
                    });
                }
                ClassMember::Method(m) => {
                    let method_params = m.type_params.iter().map(|t| t.name.name.clone()).collect();
                    self.scopes.push_function(FrameKind::Method, method_params);
                    let sig = self.signature(&m.params, m.return_type.as_ref(), m.body.as_ref(), m.is_async);
                    self.scopes.pop();
                    if m.is_constructor() {
                        for (param, desc) in m.params.iter().zip(&sig.params) {
                            if is_param_property(param) {
                                properties.push(MemberEntry {
                                    name: param.name.name.clone(),
                                    ty: desc.ty.clone(),
                                    is_static: false,
                                });
                            }
                        }
                    }
                    self.signatures.insert(node_key(m), sig.clone());
                    methods.push(MethodEntry {
                        name: m.name.name.clone(),
                        signature: sig,
                        is_static: m.is_static,
                        is_abstract: m.is_abstract || m.body.is_none(),
                    });
                }
                ClassMember::Unknown(_) => {}
            }
        }
        self.scopes.pop();

        if let Some(entry) = self.registry.class_mut(name) {
            entry.properties = properties;
            entry.methods = methods;
        }
    }

    fn register_interface_members(&mut self, iface: &InterfaceDecl) {
        let name = iface.name.name.as_str();
        let type_params = iface.type_params.iter().map(|t| t.name.name.clone()).collect();
        self.scopes.push_class(name, type_params);

        let mut properties = Vec::new();
        let mut methods = Vec::new();
        for member in &iface.members {
            match member {
                InterfaceMember::Property {
                    name,
                    type_annotation,
                    optional,
                    ..
                } => {
                    let ty = self.resolve_type(type_annotation);
                    properties.push(MemberEntry {
                        name: name.name.clone(),
                        ty: if *optional { TypeDescriptor::nullable(ty) } else { ty },
                        is_static: false,
                    });
                }
                InterfaceMember::Method {
                    name,
                    params,
                    return_type,
                    ..
                } => {
                    self.scopes.push_function(FrameKind::Method, Vec::new());
                    let sig = self.signature(params, return_type.as_ref(), None, false);
                    self.scopes.pop();
                    self.signatures.insert(node_key(member), sig.clone());
                    methods.push(MethodEntry {
                        name: name.name.clone(),
                        signature: sig,
                        is_static: false,
                        is_abstract: true,
                    });
                }
            }
        }
        self.scopes.pop();

        if let Some(entry) = self.registry.class_mut(name) {
            entry.properties = properties;
            entry.methods = methods;
        }
    }

    fn register_globals(&mut self, stmts: &[Statement]) {
        for stmt in stmts {
            let (stmt, _) = Self::unwrap_export(stmt);
            match stmt {
                Statement::VariableDecl(var) => {
                    let is_const = var.kind == ast::VariableKind::Const;
                    for d in &var.declarations {
                        let ty = self.declared_type(d.type_annotation.as_ref(), d.initializer.as_ref());
                        let id = self.declare_binding(&d.name, BindingKind::Variable { is_const }, ty);
                        if let Some(b) = self.bindings.get_mut(id) {
                            b.is_global = true;
                        }
                        let key = self.qualified(&d.name.name);
                        self.globals.insert(key, id);
                    }
                }
                Statement::ModuleDecl(ns) => {
                    self.enter_namespace(&ns.name.name, &ns.body);
                    self.register_globals(&ns.body);
                    self.leave_namespace();
                }
                _ => {}
            }
        }
    }

    fn declare_fields(&mut self, stmts: &[Statement]) {
        for stmt in stmts {
            let (stmt, _) = Self::unwrap_export(stmt);
            match stmt {
                Statement::ClassDecl(class) => {
                    let owner = class.name.name.clone();
                    let idents: Vec<(&Identifier, bool)> = class
                        .members
                        .iter()
                        .flat_map(|member| match member {
                            ClassMember::Property(p) => vec![(&p.name, p.is_static)],
                            ClassMember::Method(m) if m.is_constructor() => m
                                .params
                                .iter()
                                .filter(|p| is_param_property(p))
                                .map(|p| (&p.name, false))
                                .collect(),
                            _ => Vec::new(),
                        })
                        .collect();
                    for (ident, is_static) in idents {
                        let ty = self
                            .registry
                            .class(&owner)
                            .and_then(|c| c.property(&ident.name))
                            .map_or(TypeDescriptor::DynamicFallback, |p| p.ty.clone());
                        let kind = BindingKind::Field {
                            class: owner.clone(),
                            is_static,
                        };
                        let id = self.new_binding(ident, kind, ty);
                        self.fields.insert((owner.clone(), ident.name.clone()), id);
                    }
                }
                Statement::ModuleDecl(ns) => self.declare_fields(&ns.body),
                _ => {}
            }
        }
    }

    fn enter_namespace(&mut self, name: &str, body: &[Statement]) {
        self.scopes.push(FrameKind::Namespace);
        self.path.push(name.to_string());
        self.declare_hoisted(body);
    }

    fn leave_namespace(&mut self) {
        self.path.pop();
        self.scopes.pop();
    }

    // ========================================================================
    // Bindings
    // ========================================================================

    /// Create a binding, picking up an ownership hint for its declaration
    /// site.
    fn new_binding(&mut self, ident: &Identifier, kind: BindingKind, ty: TypeDescriptor) -> BindingId {
        let id = self.bindings.add(&ident.name, kind, ty, ident.span);
        let hint = self.hints.and_then(|h| h.get(&self.file, ident.span.line, &ident.name));
        if let (Some(hint), Some(binding)) = (hint, self.bindings.get_mut(id)) {
            binding.memory = hint.into();
            binding.hinted = true;
        }
        id
    }

    /// Create a binding and declare it in the innermost scope.
    fn declare_binding(&mut self, ident: &Identifier, kind: BindingKind, ty: TypeDescriptor) -> BindingId {
        let id = self.new_binding(ident, kind, ty);
        self.scopes.declare(&ident.name, Symbol::Binding(id));
        id
    }

    /// Field binding for `name` on `class` or the nearest ancestor that
    /// declares it.
    fn find_field(&self, class: &str, name: &str) -> Option<BindingId> {
        self.registry
            .ancestry(class)
            .iter()
            .find_map(|entry| self.fields.get(&(entry.name.clone(), name.to_string())).copied())
    }

    fn binding_type(&self, id: BindingId) -> TypeDescriptor {
        self.bindings
            .get(id)
            .map_or(TypeDescriptor::DynamicFallback, |b| b.ty.clone())
    }

    // ========================================================================
    // Type resolution
    // ========================================================================

    fn resolve_type(&mut self, ann: &TypeAnnotation) -> TypeDescriptor {
        let resolver = TypeResolver::new(&self.registry, self.options, self.semantic);
        let view = ScopeView {
            scopes: &self.scopes,
            bindings: &self.bindings,
            registry: &self.registry,
        };
        resolver.descriptor(ann, &view, &mut self.diags)
    }

    /// Inferred type of an expression. Inference itself never warns; any
    /// annotation problems inside it are reported when that part is lowered.
    fn infer_type(&self, expr: &Expression) -> TypeDescriptor {
        let resolver = TypeResolver::new(&self.registry, self.options, self.semantic);
        let view = ScopeView {
            scopes: &self.scopes,
            bindings: &self.bindings,
            registry: &self.registry,
        };
        let mut scratch = Diagnostics::new(&self.file);
        resolver.infer_descriptor(expr, &view, &mut scratch)
    }

    /// Type of a declaration: its annotation, else its initializer.
    fn declared_type(&mut self, ann: Option<&TypeAnnotation>, init: Option<&Expression>) -> TypeDescriptor {
        match (ann, init) {
            (Some(ann), _) => self.resolve_type(ann),
            (None, Some(init)) => self.infer_type(init),
            (None, None) => TypeDescriptor::DynamicFallback,
        }
    }

    fn signature(
        &mut self,
        params: &[ast::Parameter],
        ret: Option<&TypeAnnotation>,
        body: Option<&ast::BlockStatement>,
        is_async: bool,
    ) -> FunctionSignature {
        let resolver = TypeResolver::new(&self.registry, self.options, self.semantic);
        let view = ScopeView {
            scopes: &self.scopes,
            bindings: &self.bindings,
            registry: &self.registry,
        };
        resolver.signature(params, ret, body, is_async, &view, &mut self.diags)
    }

    /// Signature computed while hoisting, or a fresh one for declarations
    /// that were not hoisted.
    fn signature_for<T>(
        &mut self,
        node: &T,
        params: &[ast::Parameter],
        ret: Option<&TypeAnnotation>,
        body: Option<&ast::BlockStatement>,
        is_async: bool,
    ) -> FunctionSignature {
        match self.signatures.get(&node_key(node)) {
            Some(sig) => sig.clone(),
            None => self.signature(params, ret, body, is_async),
        }
    }

    fn member_type(&self, object: &TypeDescriptor, name: &str) -> Option<TypeDescriptor> {
        TypeResolver::new(&self.registry, self.options, self.semantic).member_type(object, name)
    }

    fn this_type(&self) -> TypeDescriptor {
        let view = ScopeView {
            scopes: &self.scopes,
            bindings: &self.bindings,
            registry: &self.registry,
        };
        TypeResolver::new(&self.registry, self.options, self.semantic).this_type(&view)
    }

    // ========================================================================
    // Reporting
    // ========================================================================

    fn unsupported(&mut self, what: &str, span: Span) {
        self.diags.warn(
            DiagnosticCode::UnsupportedConstruct,
            format!("{} is not supported; emitted as a placeholder", what),
            span,
        );
    }

    fn report_unresolved(&mut self, name: &str, span: Span) {
        if self.unresolved.insert(name.to_string()) {
            self.diags.warn(
                DiagnosticCode::UnresolvedIdentifier,
                format!("cannot resolve `{}`; treated as an external name", name),
                span,
            );
        }
    }

    // ========================================================================
    // Module body
    // ========================================================================

    fn lower_top_level(&mut self, stmt: &Statement, exported: bool) -> Option<IrNode> {
        match stmt {
            Statement::ExportDecl(export) => self.lower_top_level(&export.declaration, true),
            Statement::FunctionDecl(f) => Some(IrNode::Decl(self.lower_function(f, exported))),
            Statement::ClassDecl(c) => Some(IrNode::Decl(self.lower_class(c, exported))),
            Statement::InterfaceDecl(i) => Some(IrNode::Decl(self.lower_interface(i, exported))),
            Statement::ModuleDecl(ns) => Some(IrNode::Decl(self.lower_namespace(ns))),
            Statement::ImportDecl(_) | Statement::TypeAliasDecl(_) | Statement::Empty(_) => None,
            other => self.lower_stmt(other).map(IrNode::Stmt),
        }
    }
}

/// `Geo.Point` -> `Point`
fn strip_qualifier(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn has_methods(iface: &InterfaceDecl) -> bool {
    iface
        .members
        .iter()
        .any(|m| matches!(m, InterfaceMember::Method { .. }))
}

fn is_param_property(p: &ast::Parameter) -> bool {
    p.visibility.is_some() || p.readonly
}

#[cfg(test)]
mod tests;
