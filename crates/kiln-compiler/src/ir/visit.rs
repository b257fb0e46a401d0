//! Tree walkers
//!
//! Override the `visit_*` hooks you care about and call the matching
//! `walk_*` function to keep descending.

use super::node::*;

pub trait Visitor {
    fn visit_node(&mut self, node: &IrNode) {
        walk_node(self, node);
    }

    fn visit_decl(&mut self, decl: &Decl) {
        walk_decl(self, decl);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

pub fn walk_node<V: Visitor + ?Sized>(v: &mut V, node: &IrNode) {
    match node {
        IrNode::Stmt(s) => v.visit_stmt(s),
        IrNode::Decl(d) => v.visit_decl(d),
    }
}

pub fn walk_params<V: Visitor + ?Sized>(v: &mut V, params: &[Param]) {
    for p in params {
        if let Some(default) = &p.default {
            v.visit_expr(default);
        }
    }
}

pub fn walk_block<V: Visitor + ?Sized>(v: &mut V, block: &Block) {
    for stmt in &block.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_decl<V: Visitor + ?Sized>(v: &mut V, decl: &Decl) {
    match &decl.kind {
        DeclKind::Function(f) => {
            walk_params(v, &f.params);
            if let Some(body) = &f.body {
                walk_block(v, body);
            }
        }
        DeclKind::Class(c) => {
            for meta in &c.metadata {
                for arg in &meta.args {
                    v.visit_expr(arg);
                }
            }
            for member in &c.members {
                v.visit_decl(member);
            }
        }
        DeclKind::Interface(_) => {}
        DeclKind::Property(p) => {
            if let Some(init) = &p.init {
                v.visit_expr(init);
            }
        }
        DeclKind::Method(m) => {
            walk_params(v, &m.params);
            if let Some(args) = &m.super_args {
                for arg in args {
                    v.visit_expr(arg);
                }
            }
            if let Some(body) = &m.body {
                walk_block(v, body);
            }
        }
        DeclKind::Namespace(ns) => {
            for node in &ns.body {
                v.visit_node(node);
            }
        }
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Block(b) => walk_block(v, b),
        StmtKind::If { test, then, otherwise } => {
            v.visit_expr(test);
            v.visit_stmt(then);
            if let Some(o) = otherwise {
                v.visit_stmt(o);
            }
        }
        StmtKind::While { test, body } | StmtKind::DoWhile { body, test } => {
            v.visit_expr(test);
            v.visit_stmt(body);
        }
        StmtKind::For { init, test, update, body } => {
            if let Some(i) = init {
                v.visit_stmt(i);
            }
            if let Some(t) = test {
                v.visit_expr(t);
            }
            if let Some(u) = update {
                v.visit_expr(u);
            }
            v.visit_stmt(body);
        }
        StmtKind::ForOf { iterable, body, .. } => {
            v.visit_expr(iterable);
            v.visit_stmt(body);
        }
        StmtKind::Try { body, catch, finally } => {
            walk_block(v, body);
            if let Some(c) = catch {
                walk_block(v, &c.body);
            }
            if let Some(f) = finally {
                walk_block(v, f);
            }
        }
        StmtKind::Throw(e) | StmtKind::Expr(e) => v.visit_expr(e),
        StmtKind::Return(value) => {
            if let Some(e) = value {
                v.visit_expr(e);
            }
        }
        StmtKind::VarDecl(decls) => {
            for d in decls {
                if let Some(init) = &d.init {
                    v.visit_expr(init);
                }
            }
        }
        StmtKind::Break | StmtKind::Continue | StmtKind::Placeholder { .. } => {}
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Array(items) => {
            for item in items {
                v.visit_expr(item);
            }
        }
        ExprKind::Object(props) => {
            for (_, value) in props {
                v.visit_expr(value);
            }
        }
        ExprKind::Call { callee, args, .. } => {
            v.visit_expr(callee);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        ExprKind::Member { object, .. } => v.visit_expr(object),
        ExprKind::Index { object, index } => {
            v.visit_expr(object);
            v.visit_expr(index);
        }
        ExprKind::Binary { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        ExprKind::Unary { operand, .. } => v.visit_expr(operand),
        ExprKind::Update { target, .. } => v.visit_expr(target),
        ExprKind::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            v.visit_expr(test);
            v.visit_expr(consequent);
            v.visit_expr(alternate);
        }
        ExprKind::Template { exprs, .. } => {
            for e in exprs {
                v.visit_expr(e);
            }
        }
        ExprKind::Construct { args, .. } => {
            for arg in args {
                v.visit_expr(arg);
            }
        }
        ExprKind::Lambda(lambda) => {
            walk_params(v, &lambda.params);
            match &lambda.body {
                LambdaBody::Expr(e) => v.visit_expr(e),
                LambdaBody::Block(b) => walk_block(v, b),
            }
        }
        ExprKind::Await(inner) => v.visit_expr(inner),
        ExprKind::Ident { .. }
        | ExprKind::Literal(_)
        | ExprKind::This
        | ExprKind::SuperMember { .. }
        | ExprKind::Placeholder { .. } => {}
    }
}

// ============================================================================
// Mutable walk
// ============================================================================

pub trait VisitorMut {
    fn visit_node_mut(&mut self, node: &mut IrNode) {
        walk_node_mut(self, node);
    }

    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        walk_stmt_mut(self, stmt);
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
    }

    fn visit_decl_mut(&mut self, decl: &mut Decl) {
        walk_decl_mut(self, decl);
    }
}

pub fn walk_node_mut<V: VisitorMut + ?Sized>(v: &mut V, node: &mut IrNode) {
    match node {
        IrNode::Stmt(s) => v.visit_stmt_mut(s),
        IrNode::Decl(d) => v.visit_decl_mut(d),
    }
}

fn walk_params_mut<V: VisitorMut + ?Sized>(v: &mut V, params: &mut [Param]) {
    for p in params {
        if let Some(default) = &mut p.default {
            v.visit_expr_mut(default);
        }
    }
}

fn walk_block_mut<V: VisitorMut + ?Sized>(v: &mut V, block: &mut Block) {
    for stmt in &mut block.stmts {
        v.visit_stmt_mut(stmt);
    }
}

pub fn walk_decl_mut<V: VisitorMut + ?Sized>(v: &mut V, decl: &mut Decl) {
    match &mut decl.kind {
        DeclKind::Function(f) => {
            walk_params_mut(v, &mut f.params);
            if let Some(body) = &mut f.body {
                walk_block_mut(v, body);
            }
        }
        DeclKind::Class(c) => {
            for meta in &mut c.metadata {
                for arg in &mut meta.args {
                    v.visit_expr_mut(arg);
                }
            }
            for member in &mut c.members {
                v.visit_decl_mut(member);
            }
        }
        DeclKind::Interface(_) => {}
        DeclKind::Property(p) => {
            if let Some(init) = &mut p.init {
                v.visit_expr_mut(init);
            }
        }
        DeclKind::Method(m) => {
            walk_params_mut(v, &mut m.params);
            if let Some(args) = &mut m.super_args {
                for arg in args {
                    v.visit_expr_mut(arg);
                }
            }
            if let Some(body) = &mut m.body {
                walk_block_mut(v, body);
            }
        }
        DeclKind::Namespace(ns) => {
            for node in &mut ns.body {
                v.visit_node_mut(node);
            }
        }
    }
}

pub fn walk_stmt_mut<V: VisitorMut + ?Sized>(v: &mut V, stmt: &mut Stmt) {
    match &mut stmt.kind {
        StmtKind::Block(b) => walk_block_mut(v, b),
        StmtKind::If { test, then, otherwise } => {
            v.visit_expr_mut(test);
            v.visit_stmt_mut(then);
            if let Some(o) = otherwise {
                v.visit_stmt_mut(o);
            }
        }
        StmtKind::While { test, body } | StmtKind::DoWhile { body, test } => {
            v.visit_expr_mut(test);
            v.visit_stmt_mut(body);
        }
        StmtKind::For { init, test, update, body } => {
            if let Some(i) = init {
                v.visit_stmt_mut(i);
            }
            if let Some(t) = test {
                v.visit_expr_mut(t);
            }
            if let Some(u) = update {
                v.visit_expr_mut(u);
            }
            v.visit_stmt_mut(body);
        }
        StmtKind::ForOf { iterable, body, .. } => {
            v.visit_expr_mut(iterable);
            v.visit_stmt_mut(body);
        }
        StmtKind::Try { body, catch, finally } => {
            walk_block_mut(v, body);
            if let Some(c) = catch {
                walk_block_mut(v, &mut c.body);
            }
            if let Some(f) = finally {
                walk_block_mut(v, f);
            }
        }
        StmtKind::Throw(e) | StmtKind::Expr(e) => v.visit_expr_mut(e),
        StmtKind::Return(value) => {
            if let Some(e) = value {
                v.visit_expr_mut(e);
            }
        }
        StmtKind::VarDecl(decls) => {
            for d in decls {
                if let Some(init) = &mut d.init {
                    v.visit_expr_mut(init);
                }
            }
        }
        StmtKind::Break | StmtKind::Continue | StmtKind::Placeholder { .. } => {}
    }
}

pub fn walk_expr_mut<V: VisitorMut + ?Sized>(v: &mut V, expr: &mut Expr) {
    match &mut expr.kind {
        ExprKind::Array(items) => {
            for item in items {
                v.visit_expr_mut(item);
            }
        }
        ExprKind::Object(props) => {
            for (_, value) in props {
                v.visit_expr_mut(value);
            }
        }
        ExprKind::Call { callee, args, .. } => {
            v.visit_expr_mut(callee);
            for arg in args {
                v.visit_expr_mut(arg);
            }
        }
        ExprKind::Member { object, .. } => v.visit_expr_mut(object),
        ExprKind::Index { object, index } => {
            v.visit_expr_mut(object);
            v.visit_expr_mut(index);
        }
        ExprKind::Binary { left, right, .. } => {
            v.visit_expr_mut(left);
            v.visit_expr_mut(right);
        }
        ExprKind::Unary { operand, .. } => v.visit_expr_mut(operand),
        ExprKind::Update { target, .. } => v.visit_expr_mut(target),
        ExprKind::Assign { target, value, .. } => {
            v.visit_expr_mut(target);
            v.visit_expr_mut(value);
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            v.visit_expr_mut(test);
            v.visit_expr_mut(consequent);
            v.visit_expr_mut(alternate);
        }
        ExprKind::Template { exprs, .. } => {
            for e in exprs {
                v.visit_expr_mut(e);
            }
        }
        ExprKind::Construct { args, .. } => {
            for arg in args {
                v.visit_expr_mut(arg);
            }
        }
        ExprKind::Lambda(lambda) => {
            walk_params_mut(v, &mut lambda.params);
            match &mut lambda.body {
                LambdaBody::Expr(e) => v.visit_expr_mut(e),
                LambdaBody::Block(b) => walk_block_mut(v, b),
            }
        }
        ExprKind::Await(inner) => v.visit_expr_mut(inner),
        ExprKind::Ident { .. }
        | ExprKind::Literal(_)
        | ExprKind::This
        | ExprKind::SuperMember { .. }
        | ExprKind::Placeholder { .. } => {}
    }
}
