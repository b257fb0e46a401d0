//! Code Generator
//!
//! Turns one finalized [`IrModule`] into a C++ unit pair:
//!
//! - the declaration unit: include guard, forward declarations, structs,
//!   class declarations, prototypes, `extern` globals and every template
//!   definition callers must see
//! - the definition unit: globals, function and method bodies, static
//!   fields and the entry point
//!
//! Both passes read the same tree and never mutate it, so generating twice
//! yields identical text. The only fatal condition is an IR that still
//! carries an unresolved ownership category (`E0002`).

mod declaration;
mod definition;
mod expr;
mod hierarchy;
mod overload;
mod stmt;
mod writer;

pub use writer::LineMapEntry;

use crate::config::CompilerOptions;
use crate::diagnostics::Diagnostics;
use crate::error::{CompileError, CompileResult};
use crate::ir::visit::{self, Visitor};
use crate::ir::{
    Binding, BindingId, BindingKind, Class, DeclKind, Expr, ExprKind, Function, IrNode, IrModule, MemoryAnnotation, Method,
    MethodKind, Namespace, Param, Shape, Stmt, StmtKind, TypeParam, VarDeclarator,
};
use crate::types::{TypeDescriptor, TypeNamer};
use hierarchy::ClassHierarchy;
use kiln_syntax::Span;
use overload::{Callable, Planned};
use serde::{Deserialize, Serialize};
use stmt::BodyEmitter;

/// Emitted text of one compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedUnit {
    pub declaration: String,
    pub definition: String,
    /// Empty unless line maps were requested.
    pub line_map: Vec<LineMapEntry>,
}

pub struct CodeGenerator<'o> {
    options: &'o CompilerOptions,
}

impl<'o> CodeGenerator<'o> {
    pub fn new(options: &'o CompilerOptions) -> Self {
        Self { options }
    }

    pub fn generate(&self, module: &IrModule, diags: &mut Diagnostics) -> CompileResult<EmittedUnit> {
        check_resolved(module)?;

        let ctx = Context::new(module, self.options);
        let declaration = declaration::emit(&ctx, diags);
        log::debug!("codegen: declaration unit for `{}` ({} bytes)", module.name, declaration.len());

        let (definition, line_map) = definition::emit(&ctx);
        log::debug!(
            "codegen: definition unit for `{}` ({} bytes, {} mapped lines)",
            module.name,
            definition.len(),
            line_map.len()
        );

        Ok(EmittedUnit {
            declaration,
            definition,
            line_map,
        })
    }
}

// ============================================================================
// Shared emission context
// ============================================================================

pub(crate) struct Context<'m> {
    pub module: &'m IrModule,
    pub options: &'m CompilerOptions,
    pub namer: TypeNamer<'m>,
    pub hierarchy: ClassHierarchy<'m>,
}

impl<'m> Context<'m> {
    fn new(module: &'m IrModule, options: &'m CompilerOptions) -> Self {
        Self {
            module,
            options,
            namer: TypeNamer::new(&module.registry, &options.type_name_overrides),
            hierarchy: ClassHierarchy::new(module),
        }
    }

    pub fn cxx20(&self) -> bool {
        self.options.target_dialect.is_cxx20()
    }

    pub fn binding(&self, id: BindingId) -> Option<&'m Binding> {
        self.module.binding(id)
    }

    pub fn memory(&self, id: BindingId) -> MemoryAnnotation {
        self.binding(id).map_or(MemoryAnnotation::Shared, |b| b.memory)
    }

    pub fn binding_name(&self, id: BindingId) -> String {
        self.binding(id)
            .map_or_else(|| format!("v{}", id.as_u32()), |b| ident(&b.name))
    }

    /// Declared C++ type of a binding.
    pub fn binding_type(&self, id: BindingId) -> String {
        match self.binding(id) {
            Some(b) => self.namer.binding_type(&b.ty, b.memory),
            None => self.namer.name(&TypeDescriptor::DynamicFallback),
        }
    }

    pub fn binding_ty(&self, id: BindingId) -> TypeDescriptor {
        self.binding(id)
            .map_or(TypeDescriptor::DynamicFallback, |b| b.ty.clone())
    }

    pub fn type_name(&self, ty: &TypeDescriptor) -> String {
        self.namer.name(ty)
    }

    /// Return type of a function; suspendable ones become `js::Task<T>`
    /// under C++20 and block on the plain value under C++17.
    pub fn return_type(&self, ret: &TypeDescriptor, is_async: bool) -> String {
        if !is_async {
            return self.type_name(ret);
        }
        let value = ret.awaited();
        if self.cxx20() {
            format!("js::Task<{}>", self.type_name(&value))
        } else {
            self.type_name(&value)
        }
    }

    /// `template<...>` line for type parameters and a rest pack, with a
    /// `requires` clause for class-constrained parameters under C++20.
    pub fn template_header(&self, type_params: &[TypeParam], params: &[Param]) -> Option<String> {
        let mut names: Vec<String> = type_params.iter().map(|t| format!("typename {}", t.name)).collect();
        if params.iter().any(|p| p.is_rest) {
            names.push(format!("typename... {}", REST_PACK));
        }
        if names.is_empty() {
            return None;
        }
        let mut header = format!("template<{}>", names.join(", "));
        if self.cxx20() {
            let constraints: Vec<String> = type_params
                .iter()
                .filter_map(|t| {
                    let bound = t.constraint.as_ref()?;
                    bound.class_name()?;
                    Some(format!("std::convertible_to<{}, {}>", t.name, self.type_name(bound)))
                })
                .collect();
            if !constraints.is_empty() {
                header.push_str(&format!(" requires {}", constraints.join(" && ")));
            }
        }
        Some(header)
    }

    /// A non-class value held behind an owning pointer because a hint asked
    /// for it. Reads and writes go through `*`.
    pub fn is_boxed(&self, id: BindingId) -> bool {
        self.binding(id).map_or(false, |b| {
            matches!(b.memory, MemoryAnnotation::Shared | MemoryAnnotation::Unique) && !b.ty.is_heap_class()
        })
    }

    /// Allocation of a boxed binding around `value`.
    pub fn box_value(&self, id: BindingId, value: &str) -> String {
        let ty = self.type_name(&self.binding_ty(id));
        match self.memory(id) {
            MemoryAnnotation::Unique => format!("std::make_unique<{}>({})", ty, value),
            _ => format!("std::make_shared<{}>({})", ty, value),
        }
    }

    /// One parameter as declared: `T name`, or the pack for a rest parameter.
    /// A boxed parameter arrives by value as `name_value`.
    pub fn param_decl(&self, param: &Param) -> String {
        let name = self.binding_name(param.binding);
        if param.is_rest {
            format!("{}... {}_pack", REST_PACK, name)
        } else if self.is_boxed(param.binding) {
            format!("{} {}_value", self.type_name(&self.binding_ty(param.binding)), name)
        } else {
            format!("{} {}", self.binding_type(param.binding), name)
        }
    }

    /// A parameter passed on unchanged to another call.
    pub fn param_arg(&self, param: &Param) -> String {
        let name = self.binding_name(param.binding);
        if param.is_rest {
            format!("{}_pack...", name)
        } else if self.is_boxed(param.binding) {
            format!("{}_value", name)
        } else {
            name
        }
    }

    /// Parameter list; defaults are rendered only when `defaults` is given.
    pub fn params_text(&self, params: &[Param], defaults: Option<&BodyEmitter<'_, 'm>>) -> String {
        params
            .iter()
            .map(|p| {
                let decl = self.param_decl(p);
                match (defaults, &p.default) {
                    (_, _) if p.is_rest => decl,
                    (Some(b), Some(value)) => format!("{} = {}", decl, b.expr(value)),
                    (Some(_), None) if p.optional => format!("{} = {{}}", decl),
                    _ => decl,
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// A variable binding declared `const`. Unique owners stay mutable so
    /// they can be moved from.
    pub fn is_const(&self, id: BindingId) -> bool {
        matches!(
            self.binding(id).map(|b| (&b.kind, b.memory)),
            Some((BindingKind::Variable { is_const: true }, memory)) if memory != MemoryAnnotation::Unique
        )
    }

    /// `Name<T, U>` of a class as seen from its own members.
    pub fn self_type(&self, class: &Class) -> String {
        let args: Vec<TypeDescriptor> = class
            .type_params
            .iter()
            .map(|t| TypeDescriptor::TypeParam(t.name.clone()))
            .collect();
        self.namer.class_type(&class.name, &args)
    }

    /// Bare base class type.
    pub fn base_type(&self, class: &Class) -> Option<String> {
        match class.superclass.as_ref()? {
            TypeDescriptor::ClassRef { name, args } => Some(self.namer.class_type(name, args)),
            other => Some(self.type_name(other)),
        }
    }

    /// Statements run before a body: boxing of hinted parameters, then the
    /// rest pack materialized into an array.
    pub fn param_prologue(&self, params: &[Param]) -> Vec<String> {
        let mut lines: Vec<String> = params
            .iter()
            .filter(|p| !p.is_rest && self.is_boxed(p.binding))
            .map(|p| {
                let name = self.binding_name(p.binding);
                format!(
                    "{} {} = {};",
                    self.binding_type(p.binding),
                    name,
                    self.box_value(p.binding, &format!("{}_value", name))
                )
            })
            .collect();
        if let Some(rest) = params.iter().find(|p| p.is_rest) {
            let name = self.binding_name(rest.binding);
            let elem = self
                .binding_ty(rest.binding)
                .element_type()
                .map_or_else(|| self.type_name(&TypeDescriptor::DynamicFallback), |e| self.type_name(e));
            lines.push(format!("js::array<{elem}> {name}{{{elem}({name}_pack)...}};"));
        }
        lines
    }
}

// ============================================================================
// Scopes and plans shared by both passes
// ============================================================================

/// Members of the module body or of one namespace, in source order.
#[derive(Default)]
pub(crate) struct Scope<'m> {
    pub functions: Vec<(&'m Function, Span)>,
    pub classes: Vec<(&'m Class, Span)>,
    pub shapes: Vec<&'m Shape>,
    pub namespaces: Vec<&'m Namespace>,
    pub globals: Vec<(&'m VarDeclarator, Span)>,
    pub statements: Vec<&'m Stmt>,
}

impl<'m> Scope<'m> {
    pub fn collect(nodes: &'m [IrNode]) -> Self {
        let mut scope = Scope::default();
        for node in nodes {
            match node {
                IrNode::Decl(decl) => match &decl.kind {
                    DeclKind::Function(f) => scope.functions.push((f, decl.span)),
                    DeclKind::Class(c) => scope.classes.push((c, decl.span)),
                    DeclKind::Interface(s) => scope.shapes.push(s),
                    DeclKind::Namespace(ns) => scope.namespaces.push(ns),
                    DeclKind::Property(_) | DeclKind::Method(_) => {}
                },
                IrNode::Stmt(stmt) => match &stmt.kind {
                    StmtKind::VarDecl(decls) => scope.globals.extend(decls.iter().map(|d| (d, stmt.span))),
                    _ => scope.statements.push(stmt),
                },
            }
        }
        scope
    }

    pub fn function_span(&self, f: &Function) -> Span {
        self.functions
            .iter()
            .find(|(g, _)| std::ptr::eq(*g, f))
            .map_or_else(Span::default, |(_, span)| *span)
    }

    pub fn planned_functions(&self, ctx: &Context<'m>, diags: &mut Diagnostics) -> Vec<Planned<'m, Function>> {
        let items: Vec<&'m Function> = self.functions.iter().map(|(f, _)| *f).collect();
        overload::plan(&items, &ctx.module.bindings, diags, |f| self.function_span(f))
    }
}

pub(crate) fn member_span(class: &Class, method: &Method) -> Span {
    class
        .members
        .iter()
        .find(|d| matches!(&d.kind, DeclKind::Method(m) if std::ptr::eq(m, method)))
        .map_or_else(Span::default, |d| d.span)
}

/// Non-constructor methods of a class, planned.
pub(crate) fn planned_methods<'m>(ctx: &Context<'m>, class: &'m Class, diags: &mut Diagnostics) -> Vec<Planned<'m, Method>> {
    let items: Vec<&'m Method> = class.methods().filter(|m| m.kind == MethodKind::Method).collect();
    overload::plan(&items, &ctx.module.bindings, diags, |m| member_span(class, m))
}

/// Generic, or variadic: the definition must live in the header.
pub(crate) fn is_template<F: Callable>(f: &F) -> bool {
    !f.type_params().is_empty() || f.params().iter().any(|p| p.is_rest)
}

pub(crate) fn planned_is_template<F: Callable>(planned: &Planned<'_, F>) -> bool {
    match planned {
        Planned::Plain(f) => is_template(*f),
        Planned::Thunk { overload, .. } => is_template(*overload),
        Planned::Dispatch(_) => false,
    }
}

/// How a class gets its constructor.
pub(crate) enum CtorPlan<'m> {
    Explicit(&'m Method),
    /// Forwards these parameters to the base and runs field initializers.
    Synthesized(&'m [Param]),
    /// `using Base::Base;`
    Inherit,
    Default,
}

pub(crate) fn ctor_plan<'m>(ctx: &Context<'m>, class: &'m Class) -> CtorPlan<'m> {
    if let Some(ctor) = hierarchy::constructor(class) {
        return CtorPlan::Explicit(ctor);
    }
    let inherited = ctx.hierarchy.inherited_ctor_params(class).unwrap_or(&[]);
    let has_inits = class
        .properties()
        .any(|p| !p.is_static && (p.init.is_some() || ctx.is_boxed(p.binding)));
    if has_inits || !class.metadata.is_empty() {
        CtorPlan::Synthesized(inherited)
    } else if !inherited.is_empty() {
        CtorPlan::Inherit
    } else {
        CtorPlan::Default
    }
}

/// Type parameter name of a rest pack.
pub(crate) const REST_PACK: &str = "Rest";

const CXX_KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and", "and_eq", "asm", "auto", "bitand", "bitor", "bool", "case", "catch", "char",
    "char16_t", "char32_t", "char8_t", "class", "co_await", "co_return", "co_yield", "compl", "concept",
    "const", "const_cast", "consteval", "constexpr", "constinit", "decltype", "default", "delete", "double",
    "dynamic_cast", "enum", "explicit", "export", "extern", "float", "friend", "goto", "inline", "int",
    "long", "main", "mutable", "namespace", "new", "noexcept", "not", "not_eq", "nullptr", "operator", "or",
    "or_eq", "private", "protected", "public", "register", "reinterpret_cast", "requires", "short", "signed",
    "sizeof", "static", "static_assert", "static_cast", "struct", "switch", "template", "this",
    "thread_local", "throw", "try", "typedef", "typeid", "typename", "union", "unsigned", "using", "virtual",
    "volatile", "wchar_t", "xor", "xor_eq",
];

/// Identifier safe to emit: C++ keywords and `main` get a trailing `_`.
pub(crate) fn ident(name: &str) -> String {
    if CXX_KEYWORDS.contains(&name) {
        format!("{}_", name)
    } else {
        name.to_string()
    }
}

/// `MODULE_NAME_H` from a module name.
pub(crate) fn include_guard(module: &str) -> String {
    let mut guard: String = module
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    if guard.starts_with(|c: char| c.is_ascii_digit()) {
        guard.insert(0, '_');
    }
    guard.push_str("_H");
    guard
}

// ============================================================================
// Pre-emission check
// ============================================================================

fn check_resolved(module: &IrModule) -> CompileResult<()> {
    if let Some(b) = module.bindings.iter().find(|b| !b.memory.is_resolved()) {
        return Err(CompileError::invariant(
            format!("binding `{}` reached code generation without an ownership category", b.name),
            b.span,
        ));
    }
    let mut check = ConstructCheck::default();
    for node in &module.body {
        check.visit_node(node);
    }
    match check.unresolved {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[derive(Default)]
struct ConstructCheck {
    unresolved: Option<CompileError>,
}

impl Visitor for ConstructCheck {
    fn visit_expr(&mut self, expr: &Expr) {
        if self.unresolved.is_some() {
            return;
        }
        if let ExprKind::Construct { class, ownership, .. } = &expr.kind {
            if !ownership.is_resolved() {
                self.unresolved = Some(CompileError::invariant(
                    format!("construction of `{}` reached code generation without an ownership category", class),
                    expr.span,
                ));
                return;
            }
        }
        visit::walk_expr(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticCode;
    use crate::ir::BindingKind;
    use kiln_syntax::Span;

    #[test]
    fn test_keywords_are_escaped() {
        assert_eq!(ident("delete"), "delete_");
        assert_eq!(ident("template"), "template_");
        assert_eq!(ident("main"), "main_");
        assert_eq!(ident("count"), "count");
    }

    #[test]
    fn test_include_guard() {
        assert_eq!(include_guard("main"), "MAIN_H");
        assert_eq!(include_guard("geo-point"), "GEO_POINT_H");
        assert_eq!(include_guard("3d"), "_3D_H");
    }

    #[test]
    fn test_auto_binding_is_fatal() {
        let mut module = IrModule::new("main", "main.ts");
        module.bindings.add(
            "x",
            BindingKind::Variable { is_const: false },
            TypeDescriptor::number(),
            Span::new(0, 1, 4, 1),
        );
        let options = CompilerOptions::default();
        let mut diags = Diagnostics::new("main.ts");
        let err = CodeGenerator::new(&options)
            .generate(&module, &mut diags)
            .expect_err("unresolved binding");
        assert_eq!(err.code(), DiagnosticCode::InternalInvariant);
        assert_eq!(err.span().line, 4);
    }
}
