//! Declaration pass
//!
//! Produces the header: everything another unit needs to call into this
//! one, plus the definitions C++ requires to be visible at every use
//! (templates).

use super::definition::{ctor_template, emit_constructor, emit_planned};
use super::hierarchy::{topo_order, MethodMarker};
use super::overload::Planned;
use super::stmt::BodyEmitter;
use super::writer::CodeWriter;
use super::{
    ctor_plan, ident, include_guard, is_template, member_span, planned_is_template, planned_methods, Context, CtorPlan,
    Scope,
};
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::ir::{Class, Function, IrNode, Method, Param, Shape, TypeParam};
use crate::types::TypeDescriptor;
use kiln_syntax::ast::Visibility;

const SYSTEM_INCLUDES: &[&str] = &["<cmath>", "<functional>", "<memory>", "<tuple>"];

pub(super) fn emit<'m>(ctx: &Context<'m>, diags: &mut Diagnostics) -> String {
    let mut out = CodeWriter::new();
    let guard = include_guard(&ctx.module.name);
    out.line(&format!("#ifndef {}", guard));
    out.line(&format!("#define {}", guard));
    out.blank();

    for header in SYSTEM_INCLUDES {
        out.line(&format!("#include {}", header));
    }
    if ctx.cxx20() {
        out.line("#include <concepts>");
    }
    out.line(&format!("#include \"{}\"", ctx.options.runtime_header));
    let mut included: Vec<&str> = Vec::new();
    for import in &ctx.module.imports {
        if import.module != ctx.module.name && !included.contains(&import.module.as_str()) {
            included.push(&import.module);
            out.line(&format!("#include \"{}.h\"", import.module));
        }
    }

    let mut forward = CodeWriter::new();
    forward_declarations(ctx, &mut forward, &ctx.module.body);
    for name in imported_classes(ctx) {
        forward.line(&format!("class {};", name));
    }
    let (forward, _) = forward.finish();
    if !forward.is_empty() {
        out.blank();
        out.line("// Forward declarations");
        for line in forward.lines() {
            out.line(line);
        }
    }

    emit_scope(ctx, &mut out, &ctx.module.body, diags);

    if has_statements(&ctx.module.body) {
        out.blank();
        out.line("void Main();");
    }
    out.blank();
    out.line(&format!("#endif // {}", guard));
    out.finish().0
}

fn has_statements(nodes: &[IrNode]) -> bool {
    let scope = Scope::collect(nodes);
    !scope.statements.is_empty() || scope.namespaces.iter().any(|ns| has_statements(&ns.body))
}

/// Classes referenced here but declared in an imported unit.
fn imported_classes(ctx: &Context<'_>) -> Vec<String> {
    let registry = &ctx.module.registry;
    let mut names: Vec<String> = Vec::new();
    for binding in ctx.module.bindings.iter() {
        let Some(name) = binding.ty.class_name() else {
            continue;
        };
        if registry.is_imported(name) && !registry.is_class(name) && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

fn forward_declarations(ctx: &Context<'_>, out: &mut CodeWriter, nodes: &[IrNode]) {
    let scope = Scope::collect(nodes);
    for shape in &scope.shapes {
        if let Some(header) = ctx.template_header(&shape.type_params, &[]) {
            out.line(&header);
        }
        out.line(&format!("struct {};", ident(&shape.name)));
    }
    for (class, _) in &scope.classes {
        if let Some(header) = ctx.template_header(&class.type_params, &[]) {
            out.line(&header);
        }
        out.line(&format!("class {};", ident(&class.name)));
    }
    for ns in &scope.namespaces {
        let mut inner = CodeWriter::nested(out.indent_level() + 1);
        forward_declarations(ctx, &mut inner, &ns.body);
        let inner = inner.into_inline();
        if inner.is_empty() {
            continue;
        }
        out.line(&format!("namespace {} {{", ident(&ns.name)));
        for line in inner.lines() {
            out.line(line.trim_start());
        }
        out.line("}");
    }
}

fn emit_scope<'m>(ctx: &Context<'m>, out: &mut CodeWriter, nodes: &'m [IrNode], diags: &mut Diagnostics) {
    let scope = Scope::collect(nodes);

    emit_shapes(ctx, out, &scope.shapes);

    // Prototypes
    for (f, span) in &scope.functions {
        if f.is_async && !ctx.cxx20() {
            diags.note(
                DiagnosticCode::DialectDowngrade,
                format!("`{}` is suspendable; C++17 output blocks on every await", f.name),
                *span,
            );
        }
    }
    let functions = scope.planned_functions(ctx, diags);
    let mut prototypes = Vec::new();
    for planned in &functions {
        if planned_is_template(planned) {
            continue;
        }
        prototypes.push(prototype(ctx, planned));
    }
    if !prototypes.is_empty() {
        out.blank();
        for p in prototypes {
            out.line(&p);
        }
    }

    for ns in &scope.namespaces {
        out.blank();
        out.line(&format!("namespace {} {{", ident(&ns.name)));
        emit_scope(ctx, out, &ns.body, diags);
        out.blank();
        out.line(&format!("}} // namespace {}", ident(&ns.name)));
    }

    let classes: Vec<&'m Class> = scope.classes.iter().map(|(c, _)| *c).collect();
    let ordered = ctx.hierarchy.order(&classes, ctx.module);
    let mut class_plans = Vec::new();
    for class in ordered {
        let plans = planned_methods(ctx, class, diags);
        emit_class(ctx, out, class, &plans, diags);
        class_plans.push((class, plans));
    }

    if !scope.globals.is_empty() {
        out.blank();
        for (decl, _) in &scope.globals {
            let constness = if ctx.is_const(decl.binding) { "const " } else { "" };
            out.line(&format!(
                "extern {}{} {};",
                constness,
                ctx.binding_type(decl.binding),
                ctx.binding_name(decl.binding)
            ));
        }
    }

    // Template definitions
    for planned in &functions {
        if planned_is_template(planned) {
            out.blank();
            emit_planned(ctx, out, None, planned, &|f| scope.function_span(f), true);
        }
    }
    for (class, plans) in &class_plans {
        let class = *class;
        let generic = !class.type_params.is_empty();
        if class.is_interface {
            continue;
        }
        let span = scope
            .classes
            .iter()
            .find(|(c, _)| std::ptr::eq(*c, class))
            .map(|(_, s)| *s)
            .unwrap_or_default();
        if ctor_template(ctx, class) == Some(true) {
            out.blank();
            emit_constructor(ctx, out, class, span, false);
        }
        for planned in plans {
            if let Planned::Plain(m) = planned {
                if m.body.is_none() {
                    continue;
                }
            }
            if generic || planned_is_template(planned) {
                out.blank();
                emit_planned(ctx, out, Some(class), planned, &|m| member_span(class, m), false);
            }
        }
    }
}

fn prototype(ctx: &Context<'_>, planned: &Planned<'_, Function>) -> String {
    let scratch = BodyEmitter::new(ctx, CodeWriter::new(), None, false);
    match planned {
        Planned::Plain(f) | Planned::Thunk { overload: f, .. } => format!(
            "{} {}({});",
            ctx.return_type(&f.ret, f.is_async),
            ident(&f.name),
            ctx.params_text(&f.params, Some(&scratch))
        ),
        Planned::Dispatch(d) => {
            let is_async = d.branches.iter().any(|b| b.overload.is_async);
            let params: Vec<String> = d
                .params
                .iter()
                .map(|(name, ty)| format!("{} {}", ctx.type_name(ty), ident(name)))
                .collect();
            format!(
                "{} {}({});",
                ctx.return_type(&d.ret, is_async),
                ident(&d.name),
                params.join(", ")
            )
        }
    }
}

// ============================================================================
// Structs
// ============================================================================

fn emit_shapes(ctx: &Context<'_>, out: &mut CodeWriter, shapes: &[&Shape]) {
    let deps = |s: &&Shape| -> Vec<String> {
        s.fields
            .iter()
            .filter_map(|f| match f.ty.unwrap_nullable() {
                TypeDescriptor::Object { name: Some(n), .. } => Some(n.clone()),
                TypeDescriptor::Generic { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    };
    for i in topo_order(shapes, |s| s.name.as_str(), deps) {
        let shape = shapes[i];
        out.blank();
        if let Some(header) = ctx.template_header(&shape.type_params, &[]) {
            out.line(&header);
        }
        out.open(&format!("struct {}", ident(&shape.name)));
        for field in &shape.fields {
            let ty = if field.optional {
                TypeDescriptor::nullable(field.ty.clone())
            } else {
                field.ty.clone()
            };
            out.line(&format!("{} {};", ctx.type_name(&ty), ident(&field.name)));
        }
        out.close(";");
    }
}

// ============================================================================
// Classes
// ============================================================================

#[derive(Default)]
struct Sections {
    public: Vec<String>,
    protected: Vec<String>,
    private: Vec<String>,
}

impl Sections {
    fn push(&mut self, visibility: Visibility, line: String) {
        match visibility {
            Visibility::Public => self.public.push(line),
            Visibility::Protected => self.protected.push(line),
            Visibility::Private => self.private.push(line),
        }
    }

    fn write(self, out: &mut CodeWriter) {
        for (label, lines) in [("public:", self.public), ("protected:", self.protected), ("private:", self.private)] {
            if lines.is_empty() {
                continue;
            }
            out.dedent();
            out.line(label);
            out.indent();
            for line in lines {
                out.line(&line);
            }
        }
    }
}

fn emit_class<'m>(
    ctx: &Context<'m>,
    out: &mut CodeWriter,
    class: &'m Class,
    plans: &[Planned<'m, Method>],
    diags: &mut Diagnostics,
) {
    log::trace!("codegen: declaring class `{}`", class.name);
    let name = ident(&class.name);
    let self_type = ctx.self_type(class);
    let is_root = ctx.hierarchy.is_root(class);

    let mut bases = Vec::new();
    if let Some(base) = ctx.base_type(class) {
        bases.push(format!("public {}", base));
    }
    for iface in ctx.hierarchy.interfaces(class) {
        bases.push(format!("public {}", ctx.namer.class_type(&iface.name, &[])));
    }
    if is_root {
        if ctx.hierarchy.carries_metadata(class) {
            bases.push("public js::Metadata".to_string());
        }
        if ctx.hierarchy.shares_this(class) {
            bases.push(format!("public std::enable_shared_from_this<{}>", self_type));
        }
    }

    out.blank();
    if let Some(header) = ctx.template_header(&class.type_params, &[]) {
        out.line(&header);
    }
    if bases.is_empty() {
        out.open(&format!("class {}", name));
    } else {
        out.open(&format!("class {} : {}", name, bases.join(", ")));
    }

    let scratch = BodyEmitter::new(ctx, CodeWriter::new(), Some(class), false);
    let mut sections = Sections::default();
    let generic = !class.type_params.is_empty();

    if is_root && ctx.hierarchy.is_polymorphic(class) {
        sections.public.push(format!("virtual ~{}() = default;", name));
    }

    if !class.is_interface {
        for prop in class.properties() {
            let ty = ctx.binding_type(prop.binding);
            let field = ctx.binding_name(prop.binding);
            let line = match (prop.is_static, generic, &prop.init) {
                (true, true, Some(init)) => {
                    format!("inline static {} {} = {};", ty, field, scratch.initializer(init, prop.binding))
                }
                (true, true, None) if ctx.is_boxed(prop.binding) => {
                    format!("inline static {} {} = {};", ty, field, ctx.box_value(prop.binding, ""))
                }
                (true, true, None) => format!("inline static {} {}{{}};", ty, field),
                (true, false, _) => format!("static {} {};", ty, field),
                (false, _, _) => format!("{} {};", ty, field),
            };
            sections.push(prop.visibility, line);
        }

        match ctor_plan(ctx, class) {
            CtorPlan::Explicit(m) => {
                let prefix = template_prefix(ctx, &m.type_params, &m.params);
                let line = format!("{}{}({});", prefix, name, ctx.params_text(&m.params, Some(&scratch)));
                sections.push(m.visibility, line);
            }
            CtorPlan::Synthesized(params) => {
                let prefix = template_prefix(ctx, &[], params);
                sections
                    .public
                    .push(format!("{}{}({});", prefix, name, ctx.params_text(params, Some(&scratch))));
            }
            CtorPlan::Inherit => {
                if let Some(base) = ctx.base_type(class) {
                    let base_name = base.rsplit("::").next().unwrap_or(&base);
                    let base_name = base_name.split('<').next().unwrap_or(base_name);
                    sections.public.push(format!("using {}::{};", base, base_name));
                }
            }
            CtorPlan::Default => {}
        }
    }

    for method in class.methods() {
        if method.is_async && !ctx.cxx20() {
            diags.note(
                DiagnosticCode::DialectDowngrade,
                format!("`{}.{}` is suspendable; C++17 output blocks on every await", class.name, method.name),
                member_span(class, method),
            );
        }
    }

    for planned in plans {
        match planned {
            Planned::Plain(m) => {
                let pure = m.body.is_none();
                sections.push(m.visibility, method_decl(ctx, class, m, pure, &scratch));
            }
            Planned::Thunk { overload, .. } => {
                sections.push(overload.visibility, method_decl(ctx, class, overload, false, &scratch));
            }
            Planned::Dispatch(d) => {
                let Some(first) = d.branches.first() else {
                    continue;
                };
                let params: Vec<String> = d
                    .params
                    .iter()
                    .map(|(n, ty)| format!("{} {}", ctx.type_name(ty), ident(n)))
                    .collect();
                let is_async = d.branches.iter().any(|b| b.overload.is_async);
                let signature = format!(
                    "{} {}({})",
                    ctx.return_type(&d.ret, is_async),
                    ident(&d.name),
                    params.join(", ")
                );
                let line = match ctx.hierarchy.marker(class, first.overload) {
                    MethodMarker::Static => format!("static {};", signature),
                    MethodMarker::Virtual => format!("virtual {};", signature),
                    MethodMarker::Override => format!("{} override;", signature),
                };
                sections.push(first.overload.visibility, line);
            }
        }
    }

    sections.write(out);
    out.close(";");
}

fn template_prefix(ctx: &Context<'_>, type_params: &[TypeParam], params: &[Param]) -> String {
    ctx.template_header(type_params, params)
        .map_or_else(String::new, |h| format!("{} ", h))
}

/// A member function declaration; member templates cannot be virtual.
fn method_decl(ctx: &Context<'_>, class: &Class, method: &Method, pure: bool, scratch: &BodyEmitter<'_, '_>) -> String {
    let signature = format!(
        "{} {}({})",
        ctx.return_type(&method.ret, method.is_async),
        ident(&method.name),
        ctx.params_text(&method.params, Some(scratch))
    );
    if is_template(method) {
        let prefix = template_prefix(ctx, &method.type_params, &method.params);
        let storage = if method.is_static { "static " } else { "" };
        return format!("{}{}{};", prefix, storage, signature);
    }
    match (ctx.hierarchy.marker(class, method), pure) {
        (MethodMarker::Static, _) => format!("static {};", signature),
        (MethodMarker::Virtual, false) => format!("virtual {};", signature),
        (MethodMarker::Virtual, true) => format!("virtual {} = 0;", signature),
        (MethodMarker::Override, false) => format!("{} override;", signature),
        (MethodMarker::Override, true) => format!("{} override = 0;", signature),
    }
}
