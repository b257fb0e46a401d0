//! Statement emission

use super::writer::{indentation, CodeWriter};
use super::Context;
use crate::ir::{BindingId, BindingKind, Block, Class, Expr, ExprKind, MemoryAnnotation, Stmt, StmtKind, VarDeclarator};

/// Emits executable bodies. Expressions render to strings (see `expr.rs`);
/// statements go straight into the writer.
pub(crate) struct BodyEmitter<'c, 'm> {
    pub(super) ctx: &'c Context<'m>,
    pub(super) out: CodeWriter,
    /// Class whose member is being emitted.
    pub(super) class: Option<&'m Class>,
    /// Body of a C++20 coroutine.
    pub(super) coroutine: bool,
}

impl<'c, 'm> BodyEmitter<'c, 'm> {
    pub fn new(ctx: &'c Context<'m>, out: CodeWriter, class: Option<&'m Class>, coroutine: bool) -> Self {
        Self {
            ctx,
            out,
            class,
            coroutine,
        }
    }

    pub fn finish(self) -> CodeWriter {
        self.out
    }

    pub fn line(&mut self, text: &str) {
        self.out.line(text);
    }

    /// `{ ... }` rendered inline at the current indentation, for lambdas and
    /// other bodies nested inside an expression.
    pub fn nested_block(&self, coroutine: bool, build: impl FnOnce(&mut BodyEmitter<'c, 'm>)) -> String {
        nested_block(self.ctx, self.class, coroutine, self.out.indent_level(), build)
    }

    pub fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    pub fn stmt(&mut self, stmt: &Stmt) {
        self.out.mark(stmt.span);
        match &stmt.kind {
            StmtKind::Block(block) => {
                self.out.open("");
                self.stmts(&block.stmts);
                self.out.close("");
            }
            StmtKind::If { .. } => self.if_chain(stmt),
            StmtKind::While { test, body } => {
                let head = format!("while ({})", self.condition(test));
                self.out.open(&head);
                self.branch(body);
                self.out.close("");
            }
            StmtKind::DoWhile { body, test } => {
                self.out.open("do");
                self.branch(body);
                let tail = format!(" while ({});", self.condition(test));
                self.out.close(&tail);
            }
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => self.for_loop(init.as_deref(), test.as_ref(), update.as_ref(), body),
            StmtKind::ForOf {
                binding,
                iterable,
                body,
                keys,
            } => {
                let is_const = matches!(
                    self.ctx.binding(*binding).map(|b| &b.kind),
                    Some(BindingKind::Variable { is_const: true })
                );
                let decl = if is_const { "const auto&" } else { "auto" };
                let source = if *keys {
                    format!("js::keys({})", self.expr(iterable))
                } else {
                    self.expr(iterable)
                };
                let head = format!("for ({} {} : {})", decl, self.loop_name(*binding), source);
                self.out.open(&head);
                self.rebox(*binding);
                self.branch(body);
                self.out.close("");
            }
            StmtKind::Try { body, catch, finally } => self.try_stmt(body, catch.as_ref(), finally.as_ref()),
            StmtKind::Throw(value) => {
                let text = format!("throw js::any({});", self.expr(value));
                self.out.line(&text);
            }
            StmtKind::Return(value) => {
                let keyword = if self.coroutine { "co_return" } else { "return" };
                let text = match value {
                    Some(v) => format!("{} {};", keyword, self.expr(v)),
                    None => format!("{};", keyword),
                };
                self.out.line(&text);
            }
            StmtKind::Break => self.out.line("break;"),
            StmtKind::Continue => self.out.line("continue;"),
            StmtKind::VarDecl(decls) => {
                for decl in decls {
                    let text = format!("{};", self.var_decl(decl));
                    self.out.line(&text);
                }
            }
            StmtKind::Expr(e) => {
                let text = format!("{};", self.expr(e));
                self.out.line(&text);
            }
            StmtKind::Placeholder { kind } => {
                let text = format!("// unsupported: {}", kind);
                self.out.line(&text);
            }
        }
    }

    /// Body of a loop or branch without an extra brace level.
    fn branch(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(block) => self.stmts(&block.stmts),
            _ => self.stmt(stmt),
        }
    }

    fn if_chain(&mut self, stmt: &Stmt) {
        let mut current = stmt;
        let mut head = "if";
        loop {
            let StmtKind::If { test, then, otherwise } = &current.kind else {
                break;
            };
            let line = format!("{} ({})", head, self.condition(test));
            self.out.open(&line);
            self.branch(then);
            match otherwise.as_deref() {
                None => {
                    self.out.close("");
                    return;
                }
                Some(next) if matches!(next.kind, StmtKind::If { .. }) => {
                    self.out.dedent();
                    head = "} else if";
                    current = next;
                }
                Some(other) => {
                    self.out.dedent();
                    self.out.open("} else");
                    self.branch(other);
                    self.out.close("");
                    return;
                }
            }
        }
    }

    fn for_loop(&mut self, init: Option<&Stmt>, test: Option<&Expr>, update: Option<&Expr>, body: &Stmt) {
        // Several declarators cannot share one C++ init-statement when their
        // types differ; they move into an enclosing block.
        let (wrap, init_text) = match init.map(|s| &s.kind) {
            Some(StmtKind::VarDecl(decls)) if decls.len() == 1 => (false, self.var_decl(&decls[0])),
            Some(StmtKind::VarDecl(_)) => (true, String::new()),
            Some(StmtKind::Expr(e)) => (false, self.expr(e)),
            _ => (false, String::new()),
        };
        if wrap {
            self.out.open("");
            if let Some(s) = init {
                self.stmt(s);
            }
        }
        let test_text = test.map(|t| self.condition(t)).unwrap_or_default();
        let update_text = update.map(|u| self.expr(u)).unwrap_or_default();
        let head = format!("for ({}; {}; {})", init_text, test_text, update_text);
        self.out.open(&head);
        self.branch(body);
        self.out.close("");
        if wrap {
            self.out.close("");
        }
    }

    fn try_stmt(&mut self, body: &Block, catch: Option<&crate::ir::CatchClause>, finally: Option<&Block>) {
        if let Some(finally) = finally {
            self.out.open("");
            let guard = self.nested_block(false, |b| b.stmts(&finally.stmts));
            self.out.line(&format!("auto finally_guard = js::defer([&]() {});", guard));
        }

        match catch {
            Some(clause) => {
                self.out.open("try");
                self.stmts(&body.stmts);
                self.out.dedent();
                let head = match clause.binding {
                    Some(id) => format!("}} catch (js::any& {})", self.loop_name(id)),
                    None => "} catch (...)".to_string(),
                };
                self.out.open(&head);
                if let Some(id) = clause.binding {
                    self.rebox(id);
                }
                self.stmts(&clause.body.stmts);
                self.out.close("");
            }
            None => {
                self.out.open("");
                self.stmts(&body.stmts);
                self.out.close("");
            }
        }

        if finally.is_some() {
            self.out.close("");
        }
    }

    /// Name a loop or catch variable is bound under; boxed ones are
    /// rebound by [`Self::rebox`] inside the body.
    fn loop_name(&self, id: BindingId) -> String {
        let name = self.ctx.binding_name(id);
        if self.ctx.is_boxed(id) {
            format!("{}_value", name)
        } else {
            name
        }
    }

    fn rebox(&mut self, id: BindingId) {
        if self.ctx.is_boxed(id) {
            let name = self.ctx.binding_name(id);
            let text = format!(
                "{} {} = {};",
                self.ctx.binding_type(id),
                name,
                self.ctx.box_value(id, &format!("{}_value", name))
            );
            self.out.line(&text);
        }
    }

    /// `[const] T name [= init]` without the semicolon.
    pub fn var_decl(&self, decl: &VarDeclarator) -> String {
        let name = self.ctx.binding_name(decl.binding);
        let ty = self.ctx.binding_type(decl.binding);
        let constness = if self.ctx.is_const(decl.binding) { "const " } else { "" };
        match &decl.init {
            Some(init) => format!("{}{} {} = {}", constness, ty, name, self.initializer(init, decl.binding)),
            None if self.ctx.is_boxed(decl.binding) => {
                format!("{} {} = {}", ty, name, self.ctx.box_value(decl.binding, ""))
            }
            None => format!("{} {}", ty, name),
        }
    }

    /// Value stored into `binding` when it is created.
    pub fn initializer(&self, value: &Expr, binding: BindingId) -> String {
        if self.ctx.is_boxed(binding) {
            self.ctx.box_value(binding, &self.expr(value))
        } else {
            self.moved(value, self.ctx.memory(binding))
        }
    }

    /// Value handed to a binding of category `into`; unique owners move.
    pub fn moved(&self, value: &Expr, into: MemoryAnnotation) -> String {
        let text = self.expr(value);
        let from_unique = match &value.kind {
            ExprKind::Ident { .. } | ExprKind::Member { .. } => value.binding().map_or(false, |id| {
                self.ctx.memory(id) == MemoryAnnotation::Unique && !self.ctx.is_boxed(id)
            }),
            _ => false,
        };
        if from_unique && matches!(into, MemoryAnnotation::Unique | MemoryAnnotation::Shared) {
            format!("std::move({})", text)
        } else {
            text
        }
    }
}

/// Render a nested body as `{\n...\n<indent>}` starting at `indent`.
pub(super) fn nested_block<'c, 'm>(
    ctx: &'c Context<'m>,
    class: Option<&'m Class>,
    coroutine: bool,
    indent: usize,
    build: impl FnOnce(&mut BodyEmitter<'c, 'm>),
) -> String {
    let mut inner = BodyEmitter::new(ctx, CodeWriter::nested(indent + 1), class, coroutine);
    build(&mut inner);
    let text = inner.finish().into_inline();
    if text.is_empty() {
        "{}".to_string()
    } else {
        format!("{{\n{}\n{}}}", text, indentation(indent))
    }
}
