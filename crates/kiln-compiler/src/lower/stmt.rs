//! Statement lowering

use super::decl::expect;
use super::Lowerer;
use crate::ir::{
    BindingKind, Block, CatchClause, Expr, ExprKind, FrameKind, Lambda, LambdaBody, Stmt, StmtKind, VarDeclarator,
};
use crate::types::TypeDescriptor;
use kiln_syntax::ast::{self, ForInit, Statement, VariableKind};

impl Lowerer<'_> {
    pub(super) fn lower_stmts(&mut self, stmts: &[Statement]) -> Vec<Stmt> {
        stmts.iter().filter_map(|s| self.lower_stmt(s)).collect()
    }

    fn placeholder(&mut self, what: &str, span: kiln_syntax::Span) -> Stmt {
        self.unsupported(what, span);
        Stmt::new(
            StmtKind::Placeholder {
                kind: what.to_string(),
            },
            span,
        )
    }

    pub(super) fn lower_stmt(&mut self, stmt: &Statement) -> Option<Stmt> {
        let span = *stmt.span();
        let kind = match stmt {
            Statement::VariableDecl(var) => StmtKind::VarDecl(self.lower_var_decl(var)),
            Statement::FunctionDecl(f) => return Some(self.lower_local_function(f)),
            Statement::ClassDecl(_) if !self.scopes.at_top_level() => {
                return Some(self.placeholder("class declaration inside a function", span))
            }
            Statement::ModuleDecl(_) | Statement::ImportDecl(_) | Statement::ExportDecl(_)
                if !self.scopes.at_top_level() =>
            {
                return Some(self.placeholder(stmt.kind_name(), span))
            }
            Statement::ClassDecl(_)
            | Statement::InterfaceDecl(_)
            | Statement::TypeAliasDecl(_)
            | Statement::ModuleDecl(_)
            | Statement::ImportDecl(_)
            | Statement::ExportDecl(_)
            | Statement::Empty(_) => return None,
            Statement::Expression(e) => StmtKind::Expr(self.lower_expr(&e.expression)),
            Statement::Block(b) => StmtKind::Block(self.lower_block(b)),
            Statement::If(s) => StmtKind::If {
                test: self.lower_expr(&s.condition),
                then: Box::new(self.lower_branch(&s.then_branch)),
                otherwise: s.else_branch.as_ref().map(|e| Box::new(self.lower_branch(e))),
            },
            Statement::While(s) => StmtKind::While {
                test: self.lower_expr(&s.condition),
                body: Box::new(self.lower_branch(&s.body)),
            },
            Statement::DoWhile(s) => StmtKind::DoWhile {
                body: Box::new(self.lower_branch(&s.body)),
                test: self.lower_expr(&s.condition),
            },
            Statement::For(s) => {
                // The initializer gets its own frame
                self.scopes.push(FrameKind::Block);
                let init = s.init.as_ref().map(|init| {
                    let span = match init {
                        ForInit::VariableDecl(v) => v.span,
                        ForInit::Expression(e) => *e.span(),
                    };
                    let kind = match init {
                        ForInit::VariableDecl(v) => StmtKind::VarDecl(self.lower_var_decl(v)),
                        ForInit::Expression(e) => StmtKind::Expr(self.lower_expr(e)),
                    };
                    Box::new(Stmt::new(kind, span))
                });
                let test = s.test.as_ref().map(|t| self.lower_expr(t));
                let update = s.update.as_ref().map(|u| self.lower_expr(u));
                let body = Box::new(self.lower_branch(&s.body));
                self.scopes.pop();
                StmtKind::For {
                    init,
                    test,
                    update,
                    body,
                }
            }
            Statement::ForOf(s) => {
                let iterable = self.lower_expr(&s.iterable);
                let elem = match &s.type_annotation {
                    Some(ann) => self.resolve_type(ann),
                    None => element_of(iterable.ty_or_dynamic()),
                };
                self.scopes.push(FrameKind::Block);
                let is_const = s.kind == VariableKind::Const;
                let binding = self.declare_binding(&s.binding, BindingKind::Variable { is_const }, elem);
                let body = Box::new(self.lower_branch(&s.body));
                self.scopes.pop();
                StmtKind::ForOf {
                    binding,
                    iterable,
                    body,
                    keys: false,
                }
            }
            Statement::ForIn(s) => {
                let iterable = self.lower_expr(&s.object);
                self.scopes.push(FrameKind::Block);
                let is_const = s.kind == VariableKind::Const;
                let binding = self.declare_binding(&s.binding, BindingKind::Variable { is_const }, TypeDescriptor::string());
                let body = Box::new(self.lower_branch(&s.body));
                self.scopes.pop();
                StmtKind::ForOf {
                    binding,
                    iterable,
                    body,
                    keys: true,
                }
            }
            Statement::Return(r) => {
                let value = r.value.as_ref().map(|v| {
                    let mut e = self.lower_expr(v);
                    if let Some(ret) = self.current_return.clone() {
                        expect(&mut e, &ret);
                    }
                    e
                });
                StmtKind::Return(value)
            }
            Statement::Break(j) if j.label.is_some() => return Some(self.placeholder("labeled break", span)),
            Statement::Continue(j) if j.label.is_some() => return Some(self.placeholder("labeled continue", span)),
            Statement::Break(_) => StmtKind::Break,
            Statement::Continue(_) => StmtKind::Continue,
            Statement::Throw(t) => StmtKind::Throw(self.lower_expr(&t.value)),
            Statement::Try(t) => {
                let body = self.lower_block(&t.body);
                let catch = t.catch_clause.as_ref().map(|c| {
                    self.scopes.push(FrameKind::Block);
                    let binding = c.param.as_ref().map(|p| {
                        self.declare_binding(p, BindingKind::Variable { is_const: false }, TypeDescriptor::DynamicFallback)
                    });
                    let stmts = self.lower_stmts(&c.body.statements);
                    self.scopes.pop();
                    CatchClause {
                        binding,
                        body: Block {
                            stmts,
                            span: c.body.span,
                        },
                    }
                });
                let finally = t.finally_clause.as_ref().map(|f| self.lower_block(f));
                StmtKind::Try { body, catch, finally }
            }
            Statement::Labeled(_) => return Some(self.placeholder("labeled statement", span)),
            Statement::Unknown(u) => return Some(self.placeholder(&u.kind, span)),
        };
        Some(Stmt::new(kind, span))
    }

    pub(super) fn lower_block(&mut self, block: &ast::BlockStatement) -> Block {
        self.scopes.push(FrameKind::Block);
        let stmts = self.lower_stmts(&block.statements);
        self.scopes.pop();
        Block { stmts, span: block.span }
    }

    /// Branch or loop body; always yields a statement.
    fn lower_branch(&mut self, stmt: &Statement) -> Stmt {
        match stmt {
            Statement::Block(_) => self.lower_stmt(stmt),
            other => {
                self.scopes.push(FrameKind::Block);
                let lowered = self.lower_stmt(other);
                self.scopes.pop();
                lowered
            }
        }
        .unwrap_or_else(|| Stmt::new(StmtKind::Block(Block::default()), *stmt.span()))
    }

    pub(super) fn lower_var_decl(&mut self, var: &ast::VariableDecl) -> Vec<VarDeclarator> {
        let is_const = var.kind == VariableKind::Const;
        let mut out = Vec::with_capacity(var.declarations.len());
        for d in &var.declarations {
            // Globals were bound while hoisting
            let hoisted = if self.scopes.at_top_level() {
                self.globals.get(&self.qualified(&d.name.name)).copied()
            } else {
                None
            };
            let binding = match hoisted {
                Some(id) => id,
                None => {
                    let ty = self.declared_type(d.type_annotation.as_ref(), d.initializer.as_ref());
                    // The initializer is lowered before the name is in scope
                    let init = d.initializer.as_ref().map(|i| self.lower_expr(i));
                    let id = self.declare_binding(&d.name, BindingKind::Variable { is_const }, ty.clone());
                    let init = init.map(|mut e| {
                        expect(&mut e, &ty);
                        e
                    });
                    out.push(VarDeclarator { binding: id, init });
                    continue;
                }
            };
            let ty = self.binding_type(binding);
            let init = d.initializer.as_ref().map(|i| {
                let mut e = self.lower_expr(i);
                expect(&mut e, &ty);
                e
            });
            out.push(VarDeclarator { binding, init });
        }
        out
    }

    /// A function declared inside a body becomes a local holding a lambda.
    fn lower_local_function(&mut self, f: &ast::FunctionDecl) -> Stmt {
        if !f.type_params.is_empty() {
            self.unsupported("generic local function", f.span);
        }
        let names: Vec<String> = f.type_params.iter().map(|t| t.name.name.clone()).collect();
        self.scopes.push_function(FrameKind::Function, names.clone());
        let sig = self.signature(&f.params, f.return_type.as_ref(), f.body.as_ref(), f.is_async);
        self.scopes.pop();

        let ty = TypeDescriptor::Function(sig.clone());
        let binding = self.declare_binding(&f.name, BindingKind::Variable { is_const: true }, ty.clone());

        let in_method = self.scopes.in_method();
        self.scopes.push_function(FrameKind::Function, names);
        let saved = self.current_return.replace((*sig.ret).clone());
        let params = self.lower_params(&f.params, &sig);
        let body = match &f.body {
            Some(b) => self.lower_body(b),
            None => Block::default(),
        };
        self.current_return = saved;
        self.scopes.pop();

        let lambda = Lambda {
            params,
            ret: (*sig.ret).clone(),
            body: LambdaBody::Block(body),
            is_async: f.is_async,
            in_method,
        };
        let init = Expr::new(ExprKind::Lambda(Box::new(lambda)), f.span, Some(ty));
        Stmt::new(
            StmtKind::VarDecl(vec![VarDeclarator {
                binding,
                init: Some(init),
            }]),
            f.span,
        )
    }
}

/// Element type produced by iterating a value of type `ty`.
fn element_of(ty: &TypeDescriptor) -> TypeDescriptor {
    if ty.is_text() {
        return TypeDescriptor::string();
    }
    ty.element_type().cloned().unwrap_or(TypeDescriptor::DynamicFallback)
}
