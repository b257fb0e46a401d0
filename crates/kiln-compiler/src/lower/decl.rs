//! Declaration lowering: functions, classes, interfaces, namespaces.

use super::{is_param_property, strip_qualifier, Lowerer};
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::ir::{
    BindingKind, Block, Class, Decl, DeclKind, Expr, ExprKind, FrameKind, Function, IrNode, Literal, Metadata,
    Method, MethodKind, Namespace, Param, Property, Resolution, Shape, Stmt, StmtKind, TypeParam,
};
use crate::types::{EmptyScope, FieldDescriptor, FunctionSignature, TypeDescriptor, TypeResolver};
use kiln_syntax::ast::{
    self, AssignmentOperator, ClassDecl, ClassMember, Decorator, Expression, FunctionDecl, InterfaceDecl,
    InterfaceMember, MethodDecl, ModuleDecl, Statement, TypeParameter,
};
use kiln_syntax::Span;

impl Lowerer<'_> {
    pub(super) fn lower_function(&mut self, f: &FunctionDecl, exported: bool) -> Decl {
        let sig = self.signature_for(f, &f.params, f.return_type.as_ref(), f.body.as_ref(), f.is_async);
        let names = f.type_params.iter().map(|t| t.name.name.clone()).collect();
        self.scopes.push_function(FrameKind::Function, names);
        let type_params = self.lower_type_params(&f.type_params);
        let params = self.lower_params(&f.params, &sig);
        let saved = self.current_return.replace((*sig.ret).clone());
        let body = f.body.as_ref().map(|b| self.lower_body(b));
        self.current_return = saved;
        self.scopes.pop();

        if !f.decorators.is_empty() {
            self.diags.warn(
                DiagnosticCode::UnsupportedConstruct,
                format!("decorators on function `{}` are ignored", f.name.name),
                f.span,
            );
        }

        let function = Function {
            name: f.name.name.clone(),
            type_params,
            params,
            ret: (*sig.ret).clone(),
            body,
            is_async: f.is_async,
            is_exported: exported,
        };
        Decl::new(DeclKind::Function(function), f.span, Some(TypeDescriptor::Function(sig)))
    }

    pub(super) fn lower_type_params(&mut self, params: &[TypeParameter]) -> Vec<TypeParam> {
        params
            .iter()
            .map(|p| TypeParam {
                name: p.name.name.clone(),
                constraint: p.constraint.as_ref().map(|c| self.resolve_type(c)),
                is_const: p.is_const,
            })
            .collect()
    }

    /// Declare parameter bindings in the current frame.
    pub(super) fn lower_params(&mut self, params: &[ast::Parameter], sig: &FunctionSignature) -> Vec<Param> {
        let mut out = Vec::with_capacity(params.len());
        for (i, p) in params.iter().enumerate() {
            let ty = match sig.params.get(i) {
                Some(d) if d.is_rest => TypeDescriptor::array_of(d.ty.clone()),
                Some(d) => d.ty.clone(),
                None => TypeDescriptor::DynamicFallback,
            };
            let default = p.default.as_ref().map(|d| {
                let mut e = self.lower_expr(d);
                expect(&mut e, &ty);
                e
            });
            let binding = self.declare_binding(&p.name, BindingKind::Parameter, ty);
            out.push(Param {
                binding,
                default,
                is_rest: p.is_rest,
                optional: p.optional,
            });
        }
        out
    }

    /// Statements of a function or method body, lowered into the current
    /// frame.
    pub(super) fn lower_body(&mut self, body: &ast::BlockStatement) -> Block {
        Block {
            stmts: self.lower_stmts(&body.statements),
            span: body.span,
        }
    }

    fn lower_metadata(&mut self, decorators: &[Decorator]) -> Vec<Metadata> {
        decorators
            .iter()
            .map(|d| Metadata {
                name: d.name.name.clone(),
                args: d.arguments.iter().map(|a| self.lower_expr(a)).collect(),
            })
            .collect()
    }

    // ========================================================================
    // Classes
    // ========================================================================

    pub(super) fn lower_class(&mut self, class: &ClassDecl, exported: bool) -> Decl {
        let name = class.name.name.clone();
        let names = class.type_params.iter().map(|t| t.name.name.clone()).collect();
        self.scopes.push_class(&name, names);
        let type_params = self.lower_type_params(&class.type_params);

        let superclass = class.extends.as_ref().and_then(|base| {
            let base_name = strip_qualifier(&base.name).to_string();
            let args: Vec<TypeDescriptor> = class.extends_type_args.iter().map(|a| self.resolve_type(a)).collect();
            if self.registry.is_class(&base_name) || self.registry.is_imported(&base_name) {
                Some(TypeDescriptor::ClassRef { name: base_name, args })
            } else {
                self.diags.warn(
                    DiagnosticCode::TypeResolution,
                    format!("cannot resolve base class `{}` of `{}`; inheritance dropped", base.name, name),
                    base.span,
                );
                None
            }
        });

        let metadata = self.lower_metadata(&class.decorators);
        let mut members = Vec::new();

        // Parameter properties become fields ahead of the other members
        for member in &class.members {
            if let ClassMember::Method(m) = member {
                if m.is_constructor() {
                    for p in m.params.iter().filter(|p| is_param_property(p)) {
                        if let Some(binding) = self.fields.get(&(name.clone(), p.name.name.clone())).copied() {
                            let property = Property {
                                binding,
                                visibility: p.visibility.unwrap_or_default(),
                                is_static: false,
                                is_readonly: p.readonly,
                                init: None,
                            };
                            members.push(Decl::new(
                                DeclKind::Property(property),
                                p.span,
                                Some(self.binding_type(binding)),
                            ));
                        }
                    }
                }
            }
        }

        for member in &class.members {
            match member {
                ClassMember::Property(p) => {
                    let Some(binding) = self.fields.get(&(name.clone(), p.name.name.clone())).copied() else {
                        continue;
                    };
                    let ty = self.binding_type(binding);
                    let init = p.initializer.as_ref().map(|i| {
                        let mut e = self.lower_expr(i);
                        expect(&mut e, &ty);
                        e
                    });
                    if !p.decorators.is_empty() {
                        self.diags.warn(
                            DiagnosticCode::UnsupportedConstruct,
                            format!("decorators on property `{}` are ignored", p.name.name),
                            p.span,
                        );
                    }
                    let property = Property {
                        binding,
                        visibility: p.visibility,
                        is_static: p.is_static,
                        is_readonly: p.is_readonly,
                        init,
                    };
                    members.push(Decl::new(DeclKind::Property(property), p.span, Some(ty)));
                }
                ClassMember::Method(m) => members.push(self.lower_method(&name, m)),
                ClassMember::Unknown(u) => {
                    self.diags.warn(
                        DiagnosticCode::UnsupportedConstruct,
                        format!("class member `{}` is not supported and was dropped", u.kind),
                        u.span,
                    );
                }
            }
        }
        self.scopes.pop();

        let decl = Class {
            name: name.clone(),
            type_params,
            superclass,
            implements: class.implements.iter().map(|i| strip_qualifier(&i.name).to_string()).collect(),
            is_abstract: class.is_abstract,
            is_interface: false,
            members,
            metadata,
            is_exported: exported,
        };
        Decl::new(DeclKind::Class(decl), class.span, Some(TypeDescriptor::class(name)))
    }

    fn lower_method(&mut self, class: &str, m: &MethodDecl) -> Decl {
        let sig = self.signature_for(m, &m.params, m.return_type.as_ref(), m.body.as_ref(), m.is_async);
        let names = m.type_params.iter().map(|t| t.name.name.clone()).collect();
        self.scopes.push_function(FrameKind::Method, names);
        let type_params = self.lower_type_params(&m.type_params);
        let params = self.lower_params(&m.params, &sig);
        let is_constructor = m.is_constructor();
        let saved = self.current_return.replace((*sig.ret).clone());

        let mut super_args = None;
        let body = m.body.as_ref().map(|b| {
            let mut statements: &[Statement] = &b.statements;
            if is_constructor {
                if let Some((first, rest)) = statements.split_first() {
                    if let Some(call) = super_call(first) {
                        super_args = Some(call.arguments.iter().map(|a| self.lower_expr(a)).collect::<Vec<_>>());
                        statements = rest;
                    }
                }
            }
            let mut stmts = if is_constructor {
                self.param_property_prologue(class, &m.params, &params)
            } else {
                Vec::new()
            };
            stmts.extend(self.lower_stmts(statements));
            Block { stmts, span: b.span }
        });
        self.current_return = saved;
        self.scopes.pop();

        if !m.decorators.is_empty() {
            self.diags.warn(
                DiagnosticCode::UnsupportedConstruct,
                format!("decorators on method `{}` are ignored", m.name.name),
                m.span,
            );
        }

        let method = Method {
            name: m.name.name.clone(),
            kind: if is_constructor { MethodKind::Constructor } else { MethodKind::Method },
            type_params,
            params,
            ret: (*sig.ret).clone(),
            body,
            visibility: m.visibility,
            is_static: m.is_static,
            is_abstract: m.is_abstract || m.body.is_none(),
            is_async: m.is_async,
            super_args,
        };
        Decl::new(DeclKind::Method(method), m.span, Some(TypeDescriptor::Function(sig)))
    }

    /// `this.x = x;` for every constructor parameter property.
    fn param_property_prologue(&mut self, class: &str, params: &[ast::Parameter], lowered: &[Param]) -> Vec<Stmt> {
        let this_ty = self.this_type();
        let mut out = Vec::new();
        for (p, param) in params.iter().zip(lowered) {
            if !is_param_property(p) {
                continue;
            }
            let Some(field) = self.fields.get(&(class.to_string(), p.name.name.clone())).copied() else {
                continue;
            };
            let ty = self.binding_type(param.binding);
            let target = Expr::new(
                ExprKind::Member {
                    object: Box::new(Expr::new(ExprKind::This, p.span, Some(this_ty.clone()))),
                    property: p.name.name.clone(),
                    field: Some(field),
                },
                p.span,
                Some(self.binding_type(field)),
            );
            let value = Expr::new(
                ExprKind::Ident {
                    name: p.name.name.clone(),
                    resolution: Resolution::Binding(param.binding),
                },
                p.span,
                Some(ty.clone()),
            );
            let assign = Expr::new(
                ExprKind::Assign {
                    op: AssignmentOperator::Assign,
                    target: Box::new(target),
                    value: Box::new(value),
                },
                p.span,
                Some(ty),
            );
            out.push(Stmt::new(StmtKind::Expr(assign), p.span));
        }
        out
    }

    // ========================================================================
    // Interfaces
    // ========================================================================

    pub(super) fn lower_interface(&mut self, iface: &InterfaceDecl, exported: bool) -> Decl {
        let name = iface.name.name.clone();
        let names: Vec<String> = iface.type_params.iter().map(|t| t.name.name.clone()).collect();

        if !super::has_methods(iface) {
            self.scopes.push_function(FrameKind::Block, names);
            let type_params = self.lower_type_params(&iface.type_params);
            let mut fields = Vec::new();
            for parent in &iface.extends {
                let known = self.registry.shape(&parent.name).is_some() || self.registry.is_class(&parent.name);
                if !known {
                    self.diags.warn(
                        DiagnosticCode::TypeResolution,
                        format!("interface `{}` extends unknown `{}`; its members are dropped", name, parent.name),
                        parent.span,
                    );
                }
            }
            for member in &iface.members {
                if let InterfaceMember::Property {
                    name: field,
                    type_annotation,
                    optional,
                    ..
                } = member
                {
                    let ty = self.resolve_type(type_annotation);
                    fields.push(FieldDescriptor {
                        name: field.name.clone(),
                        ty: if *optional { TypeDescriptor::nullable(ty) } else { ty },
                        optional: *optional,
                    });
                }
            }
            self.scopes.pop();
            // Inherited fields come first, resolved the same way uses see them
            let resolved = self.shape_fields(&name);
            let inherited: Vec<_> = resolved
                .into_iter()
                .filter(|f| !fields.iter().any(|own| own.name == f.name))
                .collect();
            let shape = Shape {
                name: name.clone(),
                type_params,
                fields: inherited.into_iter().chain(fields).collect(),
            };
            return Decl::new(DeclKind::Interface(shape), iface.span, None);
        }

        self.scopes.push_class(&name, names);
        let type_params = self.lower_type_params(&iface.type_params);
        let mut members = Vec::new();
        for member in &iface.members {
            if let InterfaceMember::Method {
                name: method,
                params,
                return_type,
                ..
            } = member
            {
                let sig = self.signature_for(member, params, return_type.as_ref(), None, false);
                self.scopes.push_function(FrameKind::Method, Vec::new());
                let lowered = self.lower_params(params, &sig);
                self.scopes.pop();
                let decl = Method {
                    name: method.name.clone(),
                    kind: MethodKind::Method,
                    type_params: Vec::new(),
                    params: lowered,
                    ret: (*sig.ret).clone(),
                    body: None,
                    visibility: ast::Visibility::Public,
                    is_static: false,
                    is_abstract: true,
                    is_async: false,
                    super_args: None,
                };
                members.push(Decl::new(DeclKind::Method(decl), method.span, Some(TypeDescriptor::Function(sig))));
            }
        }
        self.scopes.pop();

        let class = Class {
            name: name.clone(),
            type_params,
            superclass: None,
            implements: iface.extends.iter().map(|e| e.name.clone()).collect(),
            is_abstract: true,
            is_interface: true,
            members,
            metadata: Vec::new(),
            is_exported: exported,
        };
        Decl::new(DeclKind::Class(class), iface.span, Some(TypeDescriptor::class(name)))
    }

    /// Fields of a named shape as every use site resolves them.
    fn shape_fields(&self, name: &str) -> Vec<FieldDescriptor> {
        let reference = ast::TypeAnnotation::new(
            ast::Type::Reference(ast::TypeReference {
                name: name.to_string(),
                type_args: Vec::new(),
            }),
            Span::default(),
        );
        let mut scratch = Diagnostics::new("");
        let resolver = TypeResolver::new(&self.registry, self.options, self.semantic);
        match resolver.descriptor(&reference, &EmptyScope, &mut scratch) {
            TypeDescriptor::Object { fields, .. } => fields,
            _ => Vec::new(),
        }
    }

    // ========================================================================
    // Namespaces
    // ========================================================================

    pub(super) fn lower_namespace(&mut self, ns: &ModuleDecl) -> Decl {
        self.enter_namespace(&ns.name.name, &ns.body);
        let mut body: Vec<IrNode> = Vec::new();
        for stmt in &ns.body {
            if let Some(node) = self.lower_top_level(stmt, false) {
                body.push(node);
            }
        }
        self.leave_namespace();
        let namespace = Namespace {
            name: ns.name.name.clone(),
            body,
        };
        Decl::new(DeclKind::Namespace(namespace), ns.span, None)
    }
}

/// A leading `super(...)` call statement.
fn super_call(stmt: &Statement) -> Option<&ast::CallExpression> {
    match stmt {
        Statement::Expression(e) => match &e.expression {
            Expression::Call(call) if matches!(*call.callee, Expression::Super(_)) => Some(call),
            _ => None,
        },
        _ => None,
    }
}

/// Propagate a declared type into literals that cannot name their own type.
pub(super) fn expect(expr: &mut Expr, ty: &TypeDescriptor) {
    let target = ty.unwrap_nullable();
    match &mut expr.kind {
        ExprKind::Object(props) => match target {
            TypeDescriptor::Object { name: Some(_), fields } => {
                for (key, value) in props.iter_mut() {
                    if let Some(field) = fields.iter().find(|f| &f.name == key) {
                        expect(value, &field.ty);
                    }
                }
                expr.ty = Some(target.clone());
            }
            TypeDescriptor::Generic { .. } | TypeDescriptor::Object { .. } => expr.ty = Some(target.clone()),
            _ => {}
        },
        ExprKind::Array(items) => {
            if let TypeDescriptor::Array(elem) = target {
                for item in items.iter_mut() {
                    expect(item, elem);
                }
                expr.ty = Some(target.clone());
            }
        }
        ExprKind::Conditional {
            consequent, alternate, ..
        } => {
            expect(consequent, ty);
            expect(alternate, ty);
            expr.ty = Some(ty.clone());
        }
        ExprKind::Literal(Literal::Null | Literal::Undefined) => {
            expr.ty = Some(ty.clone());
        }
        _ => {}
    }
}
