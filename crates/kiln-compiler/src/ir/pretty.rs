//! Pretty-printing for IR
//!
//! Human-readable dump of declarations, bindings and their categories, for
//! debugging and tests. Statement bodies are summarized by kind.

use super::binding::BindingTable;
use super::module::IrModule;
use super::node::*;

/// Trait for pretty-printing IR constructs
pub trait PrettyPrint {
    fn pretty_print(&self) -> String;
}

impl PrettyPrint for IrModule {
    fn pretty_print(&self) -> String {
        let mut out = format!("; module {}\n", self.name);
        for import in &self.imports {
            out.push_str(&format!("; import {{ {} }} from {}\n", import.names.join(", "), import.module));
        }
        for node in &self.body {
            print_node(&mut out, node, &self.bindings, 0);
        }
        out
    }
}

fn binding_text(bindings: &BindingTable, id: super::BindingId) -> String {
    match bindings.get(id) {
        Some(b) => format!("{}: {} [{}]", b.name, b.ty, b.memory),
        None => format!("<missing {}>", id),
    }
}

fn params_text(bindings: &BindingTable, params: &[Param]) -> String {
    params
        .iter()
        .map(|p| {
            let prefix = if p.is_rest { "..." } else { "" };
            format!("{}{}", prefix, binding_text(bindings, p.binding))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn type_params_text(params: &[TypeParam]) -> String {
    if params.is_empty() {
        return String::new();
    }
    let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
    format!("<{}>", names.join(", "))
}

fn print_node(out: &mut String, node: &IrNode, bindings: &BindingTable, depth: usize) {
    match node {
        IrNode::Decl(d) => print_decl(out, d, bindings, depth),
        IrNode::Stmt(s) => print_stmt(out, s, bindings, depth),
    }
}

fn print_decl(out: &mut String, decl: &Decl, bindings: &BindingTable, depth: usize) {
    let pad = "  ".repeat(depth);
    match &decl.kind {
        DeclKind::Function(f) => {
            let asyncness = if f.is_async { "async " } else { "" };
            let body = if f.body.is_some() { "" } else { " ;signature" };
            out.push_str(&format!(
                "{pad}{asyncness}fn {}{}({}) -> {}{body}\n",
                f.name,
                type_params_text(&f.type_params),
                params_text(bindings, &f.params),
                f.ret
            ));
            if let Some(b) = &f.body {
                print_block(out, b, bindings, depth + 1);
            }
        }
        DeclKind::Class(c) => {
            let keyword = match (c.is_interface, c.is_abstract) {
                (true, _) => "interface",
                (false, true) => "abstract class",
                (false, false) => "class",
            };
            let mut header = format!("{pad}{keyword} {}{}", c.name, type_params_text(&c.type_params));
            if let Some(sup) = &c.superclass {
                header.push_str(&format!(" extends {}", sup));
            }
            if !c.implements.is_empty() {
                header.push_str(&format!(" implements {}", c.implements.join(", ")));
            }
            out.push_str(&header);
            out.push_str(" {\n");
            for meta in &c.metadata {
                out.push_str(&format!("{pad}  @{}({} args)\n", meta.name, meta.args.len()));
            }
            for member in &c.members {
                print_decl(out, member, bindings, depth + 1);
            }
            out.push_str(&format!("{pad}}}\n"));
        }
        DeclKind::Interface(shape) => {
            out.push_str(&format!("{pad}struct {}{} {{\n", shape.name, type_params_text(&shape.type_params)));
            for field in &shape.fields {
                let optional = if field.optional { "?" } else { "" };
                out.push_str(&format!("{pad}  {}{optional}: {}\n", field.name, field.ty));
            }
            out.push_str(&format!("{pad}}}\n"));
        }
        DeclKind::Property(p) => {
            let stat = if p.is_static { "static " } else { "" };
            let init = if p.init.is_some() { " = ..." } else { "" };
            out.push_str(&format!(
                "{pad}{:?} {stat}field {}{init}\n",
                p.visibility,
                binding_text(bindings, p.binding)
            ));
        }
        DeclKind::Method(m) => {
            let kind = match m.kind {
                MethodKind::Constructor => "ctor".to_string(),
                MethodKind::Method => format!("method {}", m.name),
            };
            let mut flags = String::new();
            if m.is_static {
                flags.push_str("static ");
            }
            if m.is_abstract {
                flags.push_str("abstract ");
            }
            if m.is_async {
                flags.push_str("async ");
            }
            out.push_str(&format!(
                "{pad}{flags}{kind}{}({}) -> {}",
                type_params_text(&m.type_params),
                params_text(bindings, &m.params),
                m.ret
            ));
            if let Some(args) = &m.super_args {
                out.push_str(&format!(" : super({} args)", args.len()));
            }
            out.push('\n');
            if let Some(b) = &m.body {
                print_block(out, b, bindings, depth + 1);
            }
        }
        DeclKind::Namespace(ns) => {
            out.push_str(&format!("{pad}namespace {} {{\n", ns.name));
            for node in &ns.body {
                print_node(out, node, bindings, depth + 1);
            }
            out.push_str(&format!("{pad}}}\n"));
        }
    }
}

fn print_block(out: &mut String, block: &Block, bindings: &BindingTable, depth: usize) {
    for stmt in &block.stmts {
        print_stmt(out, stmt, bindings, depth);
    }
}

fn print_stmt(out: &mut String, stmt: &Stmt, bindings: &BindingTable, depth: usize) {
    let pad = "  ".repeat(depth);
    match &stmt.kind {
        StmtKind::VarDecl(decls) => {
            for d in decls {
                let init = match &d.init {
                    Some(e) => format!(" = {}", e.kind.kind_name()),
                    None => String::new(),
                };
                out.push_str(&format!("{pad}let {}{init}\n", binding_text(bindings, d.binding)));
            }
        }
        StmtKind::Expr(e) => out.push_str(&format!("{pad}expr {}\n", e.kind.kind_name())),
        StmtKind::Placeholder { kind } => out.push_str(&format!("{pad}placeholder {}\n", kind)),
        StmtKind::Block(b) => {
            out.push_str(&format!("{pad}block\n"));
            print_block(out, b, bindings, depth + 1);
        }
        StmtKind::If { then, otherwise, .. } => {
            out.push_str(&format!("{pad}if\n"));
            print_stmt(out, then, bindings, depth + 1);
            if let Some(o) = otherwise {
                out.push_str(&format!("{pad}else\n"));
                print_stmt(out, o, bindings, depth + 1);
            }
        }
        StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } | StmtKind::For { body, .. } => {
            out.push_str(&format!("{pad}{}\n", stmt.kind.kind_name()));
            print_stmt(out, body, bindings, depth + 1);
        }
        StmtKind::ForOf { binding, body, .. } => {
            out.push_str(&format!("{pad}{} {}\n", stmt.kind.kind_name(), binding_text(bindings, *binding)));
            print_stmt(out, body, bindings, depth + 1);
        }
        other => out.push_str(&format!("{pad}{}\n", other.kind_name())),
    }
}
