//! Definition pass
//!
//! Executable bodies. The routines that emit one function, method or
//! constructor are shared with the declaration pass, which uses them for
//! template definitions.

use super::expr::string_literal;
use super::overload::{Callable, Dispatch, Planned};
use super::stmt::{nested_block, BodyEmitter};
use super::writer::{CodeWriter, LineMapEntry};
use super::{ctor_plan, ident, is_template, member_span, planned_is_template, planned_methods, Context, CtorPlan, Scope};
use crate::diagnostics::Diagnostics;
use crate::ir::{Class, IrNode, Metadata, Method, Param, Stmt, TypeParam};
use crate::types::DispatchCategory;
use kiln_syntax::Span;

pub(super) fn emit<'m>(ctx: &Context<'m>) -> (String, Vec<LineMapEntry>) {
    let mut out = if ctx.options.emit_line_map {
        CodeWriter::with_line_map()
    } else {
        CodeWriter::new()
    };
    out.line(&format!("#include \"{}.h\"", ctx.module.name));

    // Plans were already reported by the declaration pass
    let mut scratch = Diagnostics::new(ctx.module.file.as_str());
    emit_scope(ctx, &mut out, &ctx.module.body, &mut scratch);

    let mut statements: Vec<(Vec<&str>, Vec<&Stmt>)> = Vec::new();
    collect_statements(&ctx.module.body, &mut Vec::new(), &mut statements);
    if !statements.is_empty() {
        out.blank();
        out.line("// Entry point");
        out.open("void Main()");
        with_body(ctx, &mut out, None, false, |b| {
            for (path, stmts) in &statements {
                if !path.is_empty() {
                    b.out.open("");
                    b.line(&format!("using namespace {};", path.join("::")));
                }
                for stmt in stmts {
                    b.stmt(stmt);
                }
                if !path.is_empty() {
                    b.out.close("");
                }
            }
        });
        out.close("");

        if ctx.options.emit_entry_point {
            out.blank();
            out.open("int main(int /*argc*/, char** /*argv*/)");
            out.line("Main();");
            out.line("return 0;");
            out.close("");
        }
    }
    log::trace!("codegen: {} top-level statement groups", statements.len());
    out.finish()
}

fn collect_statements<'m>(nodes: &'m [IrNode], path: &mut Vec<&'m str>, out: &mut Vec<(Vec<&'m str>, Vec<&'m Stmt>)>) {
    let scope = Scope::collect(nodes);
    if !scope.statements.is_empty() {
        out.push((path.clone(), scope.statements));
    }
    for ns in scope.namespaces {
        path.push(&ns.name);
        collect_statements(&ns.body, path, out);
        path.pop();
    }
}

fn emit_scope<'m>(ctx: &Context<'m>, out: &mut CodeWriter, nodes: &'m [IrNode], scratch: &mut Diagnostics) {
    let scope = Scope::collect(nodes);

    if !scope.globals.is_empty() {
        out.blank();
        for (decl, span) in &scope.globals {
            out.mark(*span);
            with_body(ctx, out, None, false, |b| {
                let text = format!("{};", b.var_decl(decl));
                b.line(&text);
            });
        }
    }

    for planned in scope.planned_functions(ctx, scratch) {
        if planned_is_template(&planned) {
            continue;
        }
        out.blank();
        emit_planned(ctx, out, None, &planned, &|f| scope.function_span(f), false);
    }

    for &(class, span) in &scope.classes {
        if !class.type_params.is_empty() || class.is_interface {
            continue;
        }
        log::trace!("codegen: defining class `{}`", class.name);
        emit_static_fields(ctx, out, class);

        if let Some(ctor_is_template) = ctor_template(ctx, class) {
            if !ctor_is_template {
                out.blank();
                emit_constructor(ctx, out, class, span, false);
            }
        }
        for planned in planned_methods(ctx, class, scratch) {
            if planned_is_template(&planned) {
                continue;
            }
            if let Planned::Plain(m) = &planned {
                if m.body.is_none() {
                    continue;
                }
            }
            out.blank();
            emit_planned(ctx, out, Some(class), &planned, &|m| member_span(class, m), false);
        }
    }

    for ns in scope.namespaces {
        out.blank();
        out.line(&format!("namespace {} {{", ident(&ns.name)));
        emit_scope(ctx, out, &ns.body, scratch);
        out.blank();
        out.line(&format!("}} // namespace {}", ident(&ns.name)));
    }
}

/// Whether the class has an out-of-line constructor, and if so whether it
/// is a template.
pub(super) fn ctor_template(ctx: &Context<'_>, class: &Class) -> Option<bool> {
    match ctor_plan(ctx, class) {
        CtorPlan::Explicit(m) => Some(!class.type_params.is_empty() || is_template(m)),
        CtorPlan::Synthesized(params) => {
            Some(!class.type_params.is_empty() || params.iter().any(|p| p.is_rest))
        }
        CtorPlan::Inherit | CtorPlan::Default => None,
    }
}

fn emit_static_fields(ctx: &Context<'_>, out: &mut CodeWriter, class: &Class) {
    let statics: Vec<_> = class.properties().filter(|p| p.is_static).collect();
    if statics.is_empty() {
        return;
    }
    out.blank();
    let owner = ctx.self_type(class);
    for prop in statics {
        let name = ctx.binding_name(prop.binding);
        let ty = ctx.binding_type(prop.binding);
        let text = match &prop.init {
            Some(init) => {
                let value = BodyEmitter::new(ctx, CodeWriter::new(), Some(class), false).initializer(init, prop.binding);
                format!("{} {}::{} = {};", ty, owner, name, value)
            }
            None if ctx.is_boxed(prop.binding) => {
                format!("{} {}::{} = {};", ty, owner, name, ctx.box_value(prop.binding, ""))
            }
            None => format!("{} {}::{}{{}};", ty, owner, name),
        };
        out.line(&text);
    }
}

/// Hand `out` to a body emitter for the duration of `build`.
pub(super) fn with_body<'c, 'm>(
    ctx: &'c Context<'m>,
    out: &mut CodeWriter,
    class: Option<&'m Class>,
    coroutine: bool,
    build: impl FnOnce(&mut BodyEmitter<'c, 'm>),
) {
    let writer = std::mem::take(out);
    let mut body = BodyEmitter::new(ctx, writer, class, coroutine);
    build(&mut body);
    *out = body.finish();
}

/// Template prologue lines of a class (if generic) and then of a member.
fn template_lines(ctx: &Context<'_>, out: &mut CodeWriter, owner: Option<&Class>, type_params: &[TypeParam], params: &[Param]) {
    if let Some(class) = owner {
        if let Some(header) = ctx.template_header(&class.type_params, &[]) {
            out.line(&header);
        }
    }
    if let Some(header) = ctx.template_header(type_params, params) {
        out.line(&header);
    }
}

fn qualifier(ctx: &Context<'_>, owner: Option<&Class>) -> String {
    owner.map_or_else(String::new, |c| format!("{}::", ctx.self_type(c)))
}

/// One planned function or method. `defaults` repeats default arguments,
/// for template functions that have no separate prototype.
pub(super) fn emit_planned<'m, F: Callable>(
    ctx: &Context<'m>,
    out: &mut CodeWriter,
    owner: Option<&'m Class>,
    planned: &Planned<'m, F>,
    span: &dyn Fn(&F) -> Span,
    defaults: bool,
) {
    match planned {
        Planned::Plain(f) => emit_callable(ctx, out, owner, *f, span(*f), defaults),
        Planned::Thunk { overload, target } => {
            out.mark(span(*overload));
            template_lines(ctx, out, owner, overload.type_params(), overload.params());
            let head = format!(
                "{} {}{}({})",
                ctx.return_type(overload.ret(), overload.is_async()),
                qualifier(ctx, owner),
                ident(overload.name()),
                ctx.params_text(overload.params(), None)
            );
            out.open(&head);
            let args: Vec<String> = overload
                .params()
                .iter()
                .zip(&target.params)
                .map(|(p, widened)| {
                    let name = ctx.param_arg(p);
                    if ctx.binding_ty(p.binding) == *widened {
                        name
                    } else {
                        format!("{}({})", ctx.type_name(widened), name)
                    }
                })
                .collect();
            let call = format!("{}({})", ident(overload.name()), args.join(", "));
            let ret = ctx.return_type(overload.ret(), overload.is_async());
            if overload.ret().awaited().is_void() {
                out.line(&format!("{};", call));
            } else if ret == ctx.return_type(&target.ret, overload.is_async()) {
                out.line(&format!("return {};", call));
            } else {
                out.line(&format!("return js::cast<{}>({});", ret, call));
            }
            out.close("");
        }
        Planned::Dispatch(dispatch) => emit_dispatch(ctx, out, owner, dispatch, span),
    }
}

fn emit_callable<'m, F: Callable>(
    ctx: &Context<'m>,
    out: &mut CodeWriter,
    owner: Option<&'m Class>,
    f: &F,
    span: Span,
    defaults: bool,
) {
    let Some(body) = f.body() else {
        return;
    };
    out.mark(span);
    template_lines(ctx, out, owner, f.type_params(), f.params());
    let params = if defaults {
        let scratch = BodyEmitter::new(ctx, CodeWriter::new(), owner, false);
        ctx.params_text(f.params(), Some(&scratch))
    } else {
        ctx.params_text(f.params(), None)
    };
    let head = format!(
        "{} {}{}({})",
        ctx.return_type(f.ret(), f.is_async()),
        qualifier(ctx, owner),
        ident(f.name()),
        params
    );
    out.open(&head);
    let coroutine = f.is_async() && ctx.cxx20();
    let void = f.ret().awaited().is_void();
    with_body(ctx, out, owner, coroutine, |b| {
        for line in ctx.param_prologue(f.params()) {
            b.line(&line);
        }
        b.stmts(&body.stmts);
        if coroutine && void {
            b.line("co_return;");
        }
    });
    out.close("");
}

fn emit_dispatch<'m, F: Callable>(
    ctx: &Context<'m>,
    out: &mut CodeWriter,
    owner: Option<&'m Class>,
    dispatch: &Dispatch<'m, F>,
    span: &dyn Fn(&F) -> Span,
) {
    if let Some(first) = dispatch.branches.first() {
        out.mark(span(first.overload));
    }
    if let Some(class) = owner {
        if let Some(header) = ctx.template_header(&class.type_params, &[]) {
            out.line(&header);
        }
    }
    let is_async = dispatch.branches.iter().any(|b| b.overload.is_async());
    let params: Vec<String> = dispatch
        .params
        .iter()
        .map(|(name, ty)| format!("{} {}", ctx.type_name(ty), ident(name)))
        .collect();
    let head = format!(
        "{} {}{}({})",
        ctx.return_type(&dispatch.ret, is_async),
        qualifier(ctx, owner),
        ident(&dispatch.name),
        params.join(", ")
    );
    out.open(&head);

    let tested = dispatch
        .params
        .get(dispatch.position)
        .map_or_else(String::new, |(name, _)| ident(name));
    let mut has_fallback = false;
    for branch in &dispatch.branches {
        let test = match branch.category {
            DispatchCategory::Text => Some("string"),
            DispatchCategory::Numeric => Some("number"),
            DispatchCategory::Boolean => Some("boolean"),
            DispatchCategory::Other => None,
        };
        match test {
            Some(kind) => {
                out.open(&format!(
                    "if (js::typeof_op({}) == {})",
                    tested,
                    string_literal(kind)
                ));
                emit_branch(ctx, out, owner, dispatch, branch.overload);
                out.close("");
            }
            None => {
                has_fallback = true;
                emit_branch(ctx, out, owner, dispatch, branch.overload);
            }
        }
    }
    if !has_fallback {
        let message = format!("no overload of {} matches the arguments", dispatch.name);
        out.line(&format!("throw js::TypeError({});", string_literal(&message)));
    }
    out.close("");
}

/// The overload's own body in an immediately-invoked lambda whose
/// parameters rebind the narrowed arguments.
fn emit_branch<'m, F: Callable>(
    ctx: &Context<'m>,
    out: &mut CodeWriter,
    owner: Option<&'m Class>,
    dispatch: &Dispatch<'m, F>,
    overload: &F,
) {
    let params = ctx.params_text(overload.params(), None);
    let args: Vec<String> = overload
        .params()
        .iter()
        .zip(&dispatch.params)
        .map(|(p, (name, widened))| {
            if ctx.binding_ty(p.binding) == *widened {
                ident(name)
            } else if ctx.is_boxed(p.binding) {
                format!("js::cast<{}>({})", ctx.type_name(&ctx.binding_ty(p.binding)), ident(name))
            } else {
                format!("js::cast<{}>({})", ctx.binding_type(p.binding), ident(name))
            }
        })
        .collect();
    let coroutine = overload.is_async() && ctx.cxx20();
    let void = overload.ret().awaited().is_void();
    let body = nested_block(ctx, owner, coroutine, out.indent_level(), |b| {
        for line in ctx.param_prologue(overload.params()) {
            b.line(&line);
        }
        if let Some(body) = overload.body() {
            b.stmts(&body.stmts);
        }
        if coroutine && void {
            b.line("co_return;");
        }
    });
    let call = format!(
        "[&]({}) -> {} {}({})",
        params,
        ctx.return_type(overload.ret(), overload.is_async()),
        body,
        args.join(", ")
    );
    if dispatch.ret.awaited().is_void() && !coroutine {
        out.line(&format!("{};", call));
        out.line("return;");
    } else {
        out.line(&format!("return {};", call));
    }
}

/// Constructor definition: base initializer, metadata, field initializers,
/// then the body.
pub(super) fn emit_constructor<'m>(ctx: &Context<'m>, out: &mut CodeWriter, class: &'m Class, span: Span, defaults: bool) {
    let (ctor, params): (Option<&Method>, &[Param]) = match ctor_plan(ctx, class) {
        CtorPlan::Explicit(m) => (Some(m), m.params.as_slice()),
        CtorPlan::Synthesized(params) => (None, params),
        CtorPlan::Inherit | CtorPlan::Default => return,
    };
    let scratch = BodyEmitter::new(ctx, CodeWriter::new(), Some(class), false);
    let super_args: Option<Vec<String>> = match ctor {
        Some(m) => m
            .super_args
            .as_ref()
            .map(|args| args.iter().map(|a| scratch.expr(a)).collect()),
        None if !params.is_empty() && class.superclass.is_some() => {
            Some(params.iter().map(|p| ctx.param_arg(p)).collect())
        }
        None => None,
    };
    let type_params: &[TypeParam] = match ctor {
        Some(m) => m.type_params.as_slice(),
        None => &[],
    };

    out.mark(ctor.map_or(span, |m| member_span(class, m)));
    template_lines(ctx, out, Some(class), type_params, params);
    let params_text = ctx.params_text(params, if defaults { Some(&scratch) } else { None });

    let mut inits = Vec::new();
    if let (Some(args), Some(base)) = (super_args, ctx.base_type(class)) {
        inits.push(format!("{}({})", base, args.join(", ")));
    }
    let is_root = ctx.hierarchy.is_root(class);
    if is_root && !class.metadata.is_empty() {
        let entries: Vec<String> = class.metadata.iter().map(|m| metadata_entry(&scratch, m)).collect();
        inits.push(format!("js::Metadata({{{}}})", entries.join(", ")));
    }
    for prop in class.properties().filter(|p| !p.is_static) {
        let name = ctx.binding_name(prop.binding);
        match &prop.init {
            Some(init) => inits.push(format!("{}({})", name, scratch.initializer(init, prop.binding))),
            None if ctx.is_boxed(prop.binding) => inits.push(format!("{}({})", name, ctx.box_value(prop.binding, ""))),
            None => {}
        }
    }

    let mut head = format!("{}::{}({})", ctx.self_type(class), ident(&class.name), params_text);
    if !inits.is_empty() {
        head.push_str(&format!(" : {}", inits.join(", ")));
    }
    out.open(&head);
    let body = ctor.and_then(|m| m.body.as_ref());
    with_body(ctx, out, Some(class), false, |b| {
        if !is_root {
            for m in &class.metadata {
                let text = format!("this->add_metadata({});", metadata_entry(b, m));
                b.line(&text);
            }
        }
        for line in ctx.param_prologue(params) {
            b.line(&line);
        }
        if let Some(body) = body {
            b.stmts(&body.stmts);
        }
    });
    out.close("");
}

fn metadata_entry(b: &BodyEmitter<'_, '_>, metadata: &Metadata) -> String {
    let args: Vec<String> = metadata.args.iter().map(|a| b.expr(a)).collect();
    format!(
        "{{{}, js::array<js::any>{{{}}}}}",
        string_literal(&metadata.name),
        args.join(", ")
    )
}
