//! Expression lowering

use super::decl::expect;
use super::{strip_qualifier, Lowerer};
use crate::ir::{Expr, ExprKind, FrameKind, Lambda, LambdaBody, Literal, MemoryAnnotation, Resolution, Symbol};
use crate::types::{FunctionSignature, PrimitiveType, TypeDescriptor};
use kiln_syntax::ast::{
    self, ArrowBody, ArrowFunction, AssertionKind, CallExpression, Expression, Identifier, MemberExpression,
    NewExpression, UnaryOperator,
};
use kiln_syntax::Span;

/// Globals provided by the runtime library.
pub(crate) const BUILTIN_GLOBALS: &[&str] = &[
    "console",
    "Math",
    "JSON",
    "Object",
    "Array",
    "Number",
    "String",
    "Boolean",
    "Promise",
    "Date",
    "Error",
    "TypeError",
    "RangeError",
    "Map",
    "Set",
    "RegExp",
    "Symbol",
    "parseInt",
    "parseFloat",
    "isNaN",
    "isFinite",
    "NaN",
    "Infinity",
    "globalThis",
    "setTimeout",
    "clearTimeout",
    "setInterval",
    "clearInterval",
];

/// Runtime classes that `new` may construct.
pub(crate) const BUILTIN_CLASSES: &[&str] = &[
    "Array", "Date", "Error", "Map", "Object", "Promise", "RangeError", "RegExp", "Set", "TypeError",
];

impl Lowerer<'_> {
    pub(super) fn lower_expr(&mut self, expr: &Expression) -> Expr {
        let span = *expr.span();
        let ty = self.infer_type(expr);
        let kind = match expr {
            Expression::Identifier(id) => return self.lower_ident(id),
            Expression::NumberLiteral(n) => ExprKind::Literal(Literal::Number(n.value)),
            Expression::StringLiteral(s) => ExprKind::Literal(Literal::String(s.value.clone())),
            Expression::BooleanLiteral(b) => ExprKind::Literal(Literal::Boolean(b.value)),
            Expression::NullLiteral(_) => ExprKind::Literal(Literal::Null),
            Expression::BigIntLiteral(b) => ExprKind::Literal(Literal::BigInt(b.digits.clone())),
            Expression::Template(t) => ExprKind::Template {
                quasis: t.quasis.clone(),
                exprs: t.expressions.iter().map(|e| self.lower_expr(e)).collect(),
            },
            Expression::Array(a) => ExprKind::Array(a.elements.iter().map(|e| self.lower_expr(e)).collect()),
            Expression::Object(o) => ExprKind::Object(
                o.properties
                    .iter()
                    .map(|p| (p.key.clone(), self.lower_expr(&p.value)))
                    .collect(),
            ),
            Expression::Call(c) => return self.lower_call(c, ty),
            Expression::Member(m) => return self.lower_member(m, ty),
            Expression::Index(i) => ExprKind::Index {
                object: Box::new(self.lower_expr(&i.object)),
                index: Box::new(self.lower_expr(&i.index)),
            },
            Expression::Binary(b) => ExprKind::Binary {
                op: b.operator,
                left: Box::new(self.lower_expr(&b.left)),
                right: Box::new(self.lower_expr(&b.right)),
            },
            Expression::Unary(u) if u.operator == UnaryOperator::Delete => {
                return self.placeholder_expr("delete operator", span)
            }
            Expression::Unary(u) => ExprKind::Unary {
                op: u.operator,
                operand: Box::new(self.lower_expr(&u.operand)),
            },
            Expression::Update(u) => ExprKind::Update {
                op: u.operator,
                prefix: u.prefix,
                target: Box::new(self.lower_expr(&u.argument)),
            },
            Expression::Assignment(a) => {
                let target = self.lower_expr(&a.target);
                let mut value = self.lower_expr(&a.value);
                expect(&mut value, target.ty_or_dynamic());
                ExprKind::Assign {
                    op: a.operator,
                    target: Box::new(target),
                    value: Box::new(value),
                }
            }
            Expression::Conditional(c) => ExprKind::Conditional {
                test: Box::new(self.lower_expr(&c.test)),
                consequent: Box::new(self.lower_expr(&c.consequent)),
                alternate: Box::new(self.lower_expr(&c.alternate)),
            },
            Expression::New(n) => return self.lower_new(n, ty),
            Expression::This(_) if self.scopes.current_class().is_none() => {
                return self.placeholder_expr("`this` outside a class", span)
            }
            Expression::This(_) => ExprKind::This,
            Expression::Super(_) => return self.placeholder_expr("bare `super`", span),
            Expression::Arrow(a) => return self.lower_arrow(a),
            Expression::Await(a) => ExprKind::Await(Box::new(self.lower_expr(&a.argument))),
            Expression::As(a) => return self.lower_assertion(a),
            Expression::NonNull(n) => return self.lower_expr(&n.expression),
            Expression::Parenthesized(p) => return self.lower_expr(&p.expression),
            Expression::Yield(_) => return self.placeholder_expr("generator `yield`", span),
            Expression::Unknown(u) => return self.placeholder_expr(&u.kind, span),
        };
        Expr::new(kind, span, Some(ty))
    }

    fn placeholder_expr(&mut self, what: &str, span: Span) -> Expr {
        self.unsupported(what, span);
        Expr::new(
            ExprKind::Placeholder {
                kind: what.to_string(),
            },
            span,
            Some(TypeDescriptor::DynamicFallback),
        )
    }

    fn lower_ident(&mut self, id: &Identifier) -> Expr {
        let name = id.name.as_str();
        if name == "undefined" && self.scopes.lookup(name).is_none() {
            return Expr::new(
                ExprKind::Literal(Literal::Undefined),
                id.span,
                Some(TypeDescriptor::Primitive(PrimitiveType::Undefined)),
            );
        }
        let (resolution, ty) = match self.scopes.lookup(name) {
            Some(Symbol::Binding(b)) => (Resolution::Binding(b), self.binding_type(b)),
            Some(Symbol::Function) => (Resolution::Function, self.infer_type(&Expression::Identifier(id.clone()))),
            Some(Symbol::Class) => (Resolution::Class, TypeDescriptor::DynamicFallback),
            Some(Symbol::Namespace) => (Resolution::Namespace, TypeDescriptor::DynamicFallback),
            Some(Symbol::Imported) => (Resolution::Imported, TypeDescriptor::DynamicFallback),
            None if BUILTIN_GLOBALS.contains(&name) => (Resolution::Builtin, TypeDescriptor::DynamicFallback),
            None if self.registry.is_class(name) => (Resolution::Class, TypeDescriptor::DynamicFallback),
            None if self.registry.is_namespace(name) => (Resolution::Namespace, TypeDescriptor::DynamicFallback),
            None => {
                self.report_unresolved(name, id.span);
                (Resolution::External, TypeDescriptor::DynamicFallback)
            }
        };
        let ty = match (name, resolution) {
            ("NaN" | "Infinity", Resolution::Builtin) => TypeDescriptor::number(),
            _ => ty,
        };
        Expr::new(
            ExprKind::Ident {
                name: name.to_string(),
                resolution,
            },
            id.span,
            Some(ty),
        )
    }

    fn lower_member(&mut self, m: &MemberExpression, ty: TypeDescriptor) -> Expr {
        let property = m.property.name.clone();
        if matches!(*m.object, Expression::Super(_)) {
            let base_ty = self
                .scopes
                .current_class()
                .and_then(|c| self.registry.class(c))
                .and_then(|c| c.superclass.clone())
                .map(TypeDescriptor::class);
            let ty = base_ty
                .and_then(|b| self.member_type(&b, &property))
                .unwrap_or(TypeDescriptor::DynamicFallback);
            return Expr::new(ExprKind::SuperMember { property }, m.span, Some(ty));
        }

        let object = self.lower_expr(&m.object);
        let field = match &object.kind {
            ExprKind::Ident {
                name,
                resolution: Resolution::Class,
            } => self.find_field(name, &property),
            _ => object
                .ty_or_dynamic()
                .unwrap_nullable()
                .class_name()
                .and_then(|c| self.find_field(c, &property)),
        };
        let ty = match field {
            Some(f) if ty.is_dynamic() => self.binding_type(f),
            _ => ty,
        };
        Expr::new(
            ExprKind::Member {
                object: Box::new(object),
                property,
                field,
            },
            m.span,
            Some(ty),
        )
    }

    fn lower_call(&mut self, c: &CallExpression, ty: TypeDescriptor) -> Expr {
        if matches!(*c.callee, Expression::Super(_)) {
            return self.placeholder_expr("`super(...)` outside the start of a constructor", c.span);
        }
        let callee = self.lower_expr(&c.callee);
        let type_args = c.type_args.iter().map(|a| self.resolve_type(a)).collect();
        let params = match callee.ty_or_dynamic() {
            TypeDescriptor::Function(sig) => sig.params.clone(),
            _ => Vec::new(),
        };
        let args = c
            .arguments
            .iter()
            .enumerate()
            .map(|(i, a)| {
                let mut arg = self.lower_expr(a);
                if let Some(p) = params.get(i).filter(|p| !p.is_rest) {
                    expect(&mut arg, &p.ty);
                }
                arg
            })
            .collect();
        Expr::new(
            ExprKind::Call {
                callee: Box::new(callee),
                type_args,
                args,
            },
            c.span,
            Some(ty),
        )
    }

    fn lower_new(&mut self, n: &NewExpression, ty: TypeDescriptor) -> Expr {
        let class = strip_qualifier(&n.callee.name).to_string();
        let builtin = if self.registry.is_class(&class) || self.registry.is_imported(&class) {
            false
        } else if BUILTIN_CLASSES.contains(&class.as_str()) {
            true
        } else {
            self.report_unresolved(&class, n.callee.span);
            false
        };
        let type_args = n.type_args.iter().map(|a| self.resolve_type(a)).collect();
        let params = self
            .registry
            .class(&class)
            .and_then(|c| c.method(ast::CONSTRUCTOR_NAME))
            .map(|m| m.signature.params.clone())
            .unwrap_or_default();
        let args = n
            .arguments
            .iter()
            .enumerate()
            .map(|(i, a)| {
                let mut arg = self.lower_expr(a);
                if let Some(p) = params.get(i).filter(|p| !p.is_rest) {
                    expect(&mut arg, &p.ty);
                }
                arg
            })
            .collect();
        Expr::new(
            ExprKind::Construct {
                class,
                type_args,
                args,
                ownership: MemoryAnnotation::Auto,
                builtin,
            },
            n.span,
            Some(ty),
        )
    }

    fn lower_arrow(&mut self, a: &ArrowFunction) -> Expr {
        let in_method = self.scopes.in_method();
        self.scopes.push_function(FrameKind::Function, Vec::new());
        let block = match &a.body {
            ArrowBody::Block(b) => Some(b),
            ArrowBody::Expression(_) => None,
        };
        let sig = self.signature(&a.params, a.return_type.as_ref(), block, a.is_async);
        let params = self.lower_params(&a.params, &sig);
        let (body, ret) = match &a.body {
            ArrowBody::Block(b) => {
                let saved = self.current_return.replace((*sig.ret).clone());
                let body = self.lower_body(b);
                self.current_return = saved;
                (LambdaBody::Block(body), (*sig.ret).clone())
            }
            ArrowBody::Expression(e) => {
                let mut value = self.lower_expr(e);
                let ret = match &a.return_type {
                    Some(_) => {
                        expect(&mut value, &sig.ret);
                        (*sig.ret).clone()
                    }
                    None if a.is_async => TypeDescriptor::Generic {
                        name: "Promise".to_string(),
                        args: vec![value.ty_or_dynamic().clone()],
                    },
                    None => value.ty_or_dynamic().clone(),
                };
                (LambdaBody::Expr(Box::new(value)), ret)
            }
        };
        self.scopes.pop();

        let ty = TypeDescriptor::Function(FunctionSignature {
            params: sig.params,
            ret: Box::new(ret.clone()),
        });
        let lambda = Lambda {
            params,
            ret,
            body,
            is_async: a.is_async,
            in_method,
        };
        Expr::new(ExprKind::Lambda(Box::new(lambda)), a.span, Some(ty))
    }

    /// `x as T` checks nothing at runtime; a dynamic value asserted to a
    /// static type is converted with the runtime's checked cast.
    fn lower_assertion(&mut self, a: &ast::AsExpression) -> Expr {
        let mut inner = self.lower_expr(&a.expression);
        let Some(ann) = &a.type_annotation else {
            return inner;
        };
        let target = self.resolve_type(ann);
        match a.kind {
            AssertionKind::Const => inner,
            AssertionKind::Satisfies => {
                expect(&mut inner, &target);
                inner
            }
            AssertionKind::As if inner.ty_or_dynamic().is_dynamic() && !target.is_dynamic() => {
                let callee = Expr::new(
                    ExprKind::Ident {
                        name: "cast".to_string(),
                        resolution: Resolution::Builtin,
                    },
                    a.span,
                    None,
                );
                Expr::new(
                    ExprKind::Call {
                        callee: Box::new(callee),
                        type_args: vec![target.clone()],
                        args: vec![inner],
                    },
                    a.span,
                    Some(target),
                )
            }
            AssertionKind::As => {
                expect(&mut inner, &target);
                inner
            }
        }
    }
}
