//! Type Resolver
//!
//! Maps author annotations, or initializer expressions when there is no
//! annotation, onto [`TypeDescriptor`]s.
//!
//! Unions with a static representation are limited on purpose:
//! - exactly one text and one numeric member become the disjoint
//!   `StringOrNumber` wrapper;
//! - one member plus `null`/`undefined` becomes `Nullable(member)` (the two
//!   sentinels count as one);
//! - unions of literal types of one primitive collapse to that primitive.
//!
//! Every other union degrades to `DynamicFallback` with a warning.
//! Intersections keep the first structural member in declaration order and
//! drop the rest; this is a simplification, not structural merging, and it
//! is reported when anything is dropped.
//!
//! Inference never warns: an initializer whose type cannot be worked out is
//! silently dynamic.

use super::descriptor::{FieldDescriptor, FunctionSignature, ParamDescriptor, PrimitiveType, TypeDescriptor};
use super::names::TypeNamer;
use super::registry::{ClassKind, FunctionEntry, TypeRegistry};
use crate::config::CompilerOptions;
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use kiln_syntax::ast::{
    self, ArrowBody, AssertionKind, BinaryOperator, BlockStatement, CallExpression, Expression,
    ForInit, FunctionType, NewExpression, PrimitiveKeyword, Statement, Type, TypeAnnotation,
    TypeReference, UnaryOperator,
};
use kiln_syntax::{Span, TypeTable};
use rustc_hash::FxHashMap;

/// What the resolver needs to know about the names in scope.
pub trait TypeScope {
    fn is_type_param(&self, name: &str) -> bool;
    /// Type of a value binding visible under `name`.
    fn value_type(&self, name: &str) -> Option<TypeDescriptor>;
    /// Class whose body is being lowered.
    fn current_class(&self) -> Option<&str>;
}

/// Scope with nothing in it.
pub struct EmptyScope;

impl TypeScope for EmptyScope {
    fn is_type_param(&self, _name: &str) -> bool {
        false
    }

    fn value_type(&self, _name: &str) -> Option<TypeDescriptor> {
        None
    }

    fn current_class(&self) -> Option<&str> {
        None
    }
}

/// Function parameters and locals layered over an outer scope, used while
/// inferring a return type before the body is lowered.
struct LocalScope<'s> {
    outer: &'s dyn TypeScope,
    type_params: Vec<String>,
    values: Vec<(String, TypeDescriptor)>,
}

impl TypeScope for LocalScope<'_> {
    fn is_type_param(&self, name: &str) -> bool {
        self.type_params.iter().any(|t| t == name) || self.outer.is_type_param(name)
    }

    fn value_type(&self, name: &str) -> Option<TypeDescriptor> {
        self.values
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.clone())
            .or_else(|| self.outer.value_type(name))
    }

    fn current_class(&self) -> Option<&str> {
        self.outer.current_class()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedType {
    pub descriptor: TypeDescriptor,
    /// C++ spelling in value position.
    pub target: String,
}

struct Env<'s> {
    scope: &'s dyn TypeScope,
    subst: FxHashMap<String, TypeDescriptor>,
    /// Aliases and shapes currently being expanded.
    expanding: Vec<String>,
}

impl<'s> Env<'s> {
    fn new(scope: &'s dyn TypeScope) -> Self {
        Self {
            scope,
            subst: FxHashMap::default(),
            expanding: Vec::new(),
        }
    }
}

/// Replace type parameters bound in `map`.
pub fn substitute(ty: &TypeDescriptor, map: &FxHashMap<String, TypeDescriptor>) -> TypeDescriptor {
    if map.is_empty() {
        return ty.clone();
    }
    let all = |items: &[TypeDescriptor]| items.iter().map(|i| substitute(i, map)).collect::<Vec<_>>();
    match ty {
        TypeDescriptor::TypeParam(name) => map.get(name).cloned().unwrap_or_else(|| ty.clone()),
        TypeDescriptor::Array(e) => TypeDescriptor::Array(Box::new(substitute(e, map))),
        TypeDescriptor::Nullable(e) => TypeDescriptor::nullable(substitute(e, map)),
        TypeDescriptor::Tuple(items) => TypeDescriptor::Tuple(all(items)),
        TypeDescriptor::Union(items) => TypeDescriptor::Union(all(items)),
        TypeDescriptor::Intersection(items) => TypeDescriptor::Intersection(all(items)),
        TypeDescriptor::Generic { name, args } => TypeDescriptor::Generic {
            name: name.clone(),
            args: all(args),
        },
        TypeDescriptor::ClassRef { name, args } => TypeDescriptor::ClassRef {
            name: name.clone(),
            args: all(args),
        },
        TypeDescriptor::Object { name, fields } => TypeDescriptor::Object {
            name: name.clone(),
            fields: fields
                .iter()
                .map(|f| FieldDescriptor {
                    name: f.name.clone(),
                    ty: substitute(&f.ty, map),
                    optional: f.optional,
                })
                .collect(),
        },
        TypeDescriptor::Function(sig) => TypeDescriptor::Function(substitute_signature(sig, map)),
        TypeDescriptor::Primitive(_) | TypeDescriptor::DynamicFallback => ty.clone(),
    }
}

pub fn substitute_signature(sig: &FunctionSignature, map: &FxHashMap<String, TypeDescriptor>) -> FunctionSignature {
    FunctionSignature {
        params: sig
            .params
            .iter()
            .map(|p| ParamDescriptor {
                ty: substitute(&p.ty, map),
                ..p.clone()
            })
            .collect(),
        ret: Box::new(substitute(&sig.ret, map)),
    }
}

/// Bind type parameters in `pattern` against a concrete `actual` type.
fn bind(pattern: &TypeDescriptor, actual: &TypeDescriptor, params: &[String], map: &mut FxHashMap<String, TypeDescriptor>) {
    match (pattern, actual) {
        (TypeDescriptor::TypeParam(name), _) if params.contains(name) => {
            if !actual.is_dynamic() {
                map.entry(name.clone()).or_insert_with(|| actual.clone());
            }
        }
        (TypeDescriptor::Array(p), TypeDescriptor::Array(a)) => bind(p, a, params, map),
        (TypeDescriptor::Nullable(p), a) => bind(p, a.unwrap_nullable(), params, map),
        (
            TypeDescriptor::Generic { args: pa, .. } | TypeDescriptor::ClassRef { args: pa, .. },
            TypeDescriptor::Generic { args: aa, .. } | TypeDescriptor::ClassRef { args: aa, .. },
        ) => {
            for (p, a) in pa.iter().zip(aa) {
                bind(p, a, params, map);
            }
        }
        _ => {}
    }
}

pub struct TypeResolver<'a> {
    registry: &'a TypeRegistry,
    names: TypeNamer<'a>,
    semantic: Option<&'a TypeTable>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(registry: &'a TypeRegistry, options: &'a CompilerOptions, semantic: Option<&'a TypeTable>) -> Self {
        Self {
            registry,
            names: TypeNamer::new(registry, &options.type_name_overrides),
            semantic,
        }
    }

    pub fn names(&self) -> TypeNamer<'a> {
        self.names
    }

    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    /// Resolve an annotation and its target name.
    pub fn resolve(&self, ann: &TypeAnnotation, scope: &dyn TypeScope, diags: &mut Diagnostics) -> ResolvedType {
        let descriptor = self.descriptor(ann, scope, diags);
        ResolvedType {
            target: self.names.name(&descriptor),
            descriptor,
        }
    }

    pub fn descriptor(&self, ann: &TypeAnnotation, scope: &dyn TypeScope, diags: &mut Diagnostics) -> TypeDescriptor {
        let mut env = Env::new(scope);
        self.resolve_in(ann, &mut env, diags)
    }

    /// Resolve an initializer's type when the binding has no annotation.
    pub fn infer(&self, expr: &Expression, scope: &dyn TypeScope, diags: &mut Diagnostics) -> ResolvedType {
        let descriptor = self.infer_descriptor(expr, scope, diags);
        ResolvedType {
            target: self.names.name(&descriptor),
            descriptor,
        }
    }

    pub fn infer_descriptor(&self, expr: &Expression, scope: &dyn TypeScope, diags: &mut Diagnostics) -> TypeDescriptor {
        let mut env = Env::new(scope);
        self.infer_in(expr, &mut env, diags)
    }

    // ------------------------------------------------------------------
    // Annotations
    // ------------------------------------------------------------------

    fn resolve_in(&self, ann: &TypeAnnotation, env: &mut Env<'_>, diags: &mut Diagnostics) -> TypeDescriptor {
        match &ann.ty {
            Type::Primitive(keyword) => keyword_type(*keyword),
            Type::Reference(r) => self.reference(r, ann.span, env, diags),
            Type::Array(elem) => TypeDescriptor::array_of(self.resolve_in(elem, env, diags)),
            Type::Tuple(items) => {
                TypeDescriptor::Tuple(items.iter().map(|i| self.resolve_in(i, env, diags)).collect())
            }
            Type::Union(members) => self.union(members, ann.span, env, diags),
            Type::Intersection(members) => self.intersection(members, ann.span, env, diags),
            Type::Function(f) => TypeDescriptor::Function(self.function_type(f, env, diags)),
            Type::Object(members) => TypeDescriptor::Object {
                name: None,
                fields: members
                    .iter()
                    .map(|m| FieldDescriptor {
                        name: m.name.clone(),
                        ty: self.resolve_in(&m.ty, env, diags),
                        optional: m.optional,
                    })
                    .collect(),
            },
            Type::StringLiteral(_) => TypeDescriptor::string(),
            Type::NumberLiteral(_) => TypeDescriptor::number(),
            Type::BooleanLiteral(_) => TypeDescriptor::boolean(),
            Type::Parenthesized(inner) => self.resolve_in(inner, env, diags),
            Type::Unsupported(text) => {
                diags.warn(
                    DiagnosticCode::TypeResolution,
                    format!("type `{}` has no static representation; using a dynamic value", text),
                    ann.span,
                );
                TypeDescriptor::DynamicFallback
            }
        }
    }

    fn reference(&self, r: &TypeReference, span: Span, env: &mut Env<'_>, diags: &mut Diagnostics) -> TypeDescriptor {
        if let Some(bound) = env.subst.get(&r.name) {
            return bound.clone();
        }
        if env.scope.is_type_param(&r.name) {
            return TypeDescriptor::TypeParam(r.name.clone());
        }

        let args: Vec<TypeDescriptor> = r.type_args.iter().map(|a| self.resolve_in(a, env, diags)).collect();
        let name = r.name.rsplit('.').next().unwrap_or(&r.name);

        if self.names_override(&r.name) {
            return TypeDescriptor::Generic {
                name: r.name.clone(),
                args,
            };
        }

        match name {
            "Array" | "ReadonlyArray" => {
                return TypeDescriptor::array_of(args.into_iter().next().unwrap_or(TypeDescriptor::DynamicFallback));
            }
            "Promise" | "Map" | "Set" | "Record" | "Error" | "Date" | "RegExp" => {
                return TypeDescriptor::Generic {
                    name: name.to_string(),
                    args,
                };
            }
            "Object" => {
                return TypeDescriptor::Object {
                    name: None,
                    fields: Vec::new(),
                }
            }
            "String" => return TypeDescriptor::string(),
            "Number" => return TypeDescriptor::number(),
            "Boolean" => return TypeDescriptor::boolean(),
            "Function" => return TypeDescriptor::DynamicFallback,
            _ => {}
        }

        if self.registry.is_class(name) {
            return TypeDescriptor::ClassRef {
                name: name.to_string(),
                args,
            };
        }

        if let Some(shape) = self.registry.shape(name) {
            if !shape.type_params.is_empty() {
                return TypeDescriptor::Generic {
                    name: name.to_string(),
                    args,
                };
            }
            return self.shape(name, env);
        }

        if let Some(alias) = self.registry.alias(name) {
            if env.expanding.iter().any(|n| n == name) {
                diags.warn(
                    DiagnosticCode::TypeResolution,
                    format!("type alias `{}` refers to itself; using a dynamic value", name),
                    span,
                );
                return TypeDescriptor::DynamicFallback;
            }
            let mut subst = FxHashMap::default();
            for (i, param) in alias.type_params.iter().enumerate() {
                let arg = args.get(i).cloned().unwrap_or(TypeDescriptor::DynamicFallback);
                subst.insert(param.clone(), arg);
            }
            let saved = std::mem::replace(&mut env.subst, subst);
            env.expanding.push(name.to_string());
            let resolved = self.resolve_in(&alias.annotation, env, diags);
            env.expanding.pop();
            env.subst = saved;
            return resolved;
        }

        if self.registry.is_imported(name) {
            return TypeDescriptor::ClassRef {
                name: name.to_string(),
                args,
            };
        }

        diags.warn(
            DiagnosticCode::TypeResolution,
            format!("cannot resolve type `{}`; using a dynamic value", r.name),
            span,
        );
        TypeDescriptor::DynamicFallback
    }

    fn names_override(&self, name: &str) -> bool {
        // Overrides make otherwise unknown names resolvable.
        self.names.class_type(name, &[]) != self.registry.qualified_name(name)
    }

    /// Named shape with its fields, parents' fields first. Field problems
    /// are reported where the shape is declared, not at every use.
    fn shape(&self, name: &str, env: &mut Env<'_>) -> TypeDescriptor {
        let Some(shape) = self.registry.shape(name) else {
            return TypeDescriptor::DynamicFallback;
        };
        if env.expanding.iter().any(|n| n == name) {
            return TypeDescriptor::Object {
                name: Some(name.to_string()),
                fields: Vec::new(),
            };
        }
        env.expanding.push(name.to_string());
        let mut scratch = Diagnostics::new("");
        let mut fields = Vec::new();
        for parent in &shape.extends {
            if let TypeDescriptor::Object { fields: inherited, .. } = self.shape(parent, env) {
                fields.extend(inherited);
            }
        }
        for field in &shape.fields {
            let ty = self.resolve_in(&field.annotation, env, &mut scratch);
            fields.push(FieldDescriptor {
                name: field.name.clone(),
                ty: if field.optional { TypeDescriptor::nullable(ty) } else { ty },
                optional: field.optional,
            });
        }
        env.expanding.pop();
        TypeDescriptor::Object {
            name: Some(name.to_string()),
            fields,
        }
    }

    fn union(&self, members: &[TypeAnnotation], span: Span, env: &mut Env<'_>, diags: &mut Diagnostics) -> TypeDescriptor {
        let mut flat = Vec::new();
        for member in members {
            match self.resolve_in(member, env, diags) {
                TypeDescriptor::Union(inner) => flat.extend(inner),
                TypeDescriptor::Nullable(inner) => {
                    flat.push(*inner);
                    flat.push(TypeDescriptor::Primitive(PrimitiveType::Null));
                }
                other => flat.push(other),
            }
        }

        if flat.iter().any(TypeDescriptor::is_dynamic) {
            return TypeDescriptor::DynamicFallback;
        }

        let is_nullish = |d: &TypeDescriptor| d.as_primitive().map_or(false, |p| p.is_nullish());
        let has_nullish = flat.iter().any(is_nullish);
        let mut rest: Vec<TypeDescriptor> = Vec::new();
        for d in flat {
            if !is_nullish(&d) && !rest.contains(&d) {
                rest.push(d);
            }
        }

        match (has_nullish, rest.len()) {
            (_, 0) => TypeDescriptor::Primitive(PrimitiveType::Null),
            (true, 1) => TypeDescriptor::nullable(rest.remove(0)),
            (false, 1) => rest.remove(0),
            (false, 2) if rest.iter().any(|d| d.is_text()) && rest.iter().any(|d| d.is_numeric()) => {
                TypeDescriptor::Union(rest)
            }
            _ => {
                let text: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                diags.warn(
                    DiagnosticCode::TypeResolution,
                    format!(
                        "union `{}` has no static representation; using a dynamic value",
                        text.join(" | ")
                    ),
                    span,
                );
                TypeDescriptor::DynamicFallback
            }
        }
    }

    fn intersection(&self, members: &[TypeAnnotation], span: Span, env: &mut Env<'_>, diags: &mut Diagnostics) -> TypeDescriptor {
        let resolved: Vec<TypeDescriptor> = members.iter().map(|m| self.resolve_in(m, env, diags)).collect();
        let structural: Vec<&TypeDescriptor> = resolved.iter().filter(|d| d.is_structural()).collect();

        if let Some(first) = structural.first() {
            if structural.len() > 1 {
                diags.warn(
                    DiagnosticCode::TypeResolution,
                    format!(
                        "intersection keeps only its first object member `{}`; other members are not merged",
                        first
                    ),
                    span,
                );
            }
            return (*first).clone();
        }

        let mut distinct: Vec<TypeDescriptor> = Vec::new();
        for d in resolved {
            if !distinct.contains(&d) {
                distinct.push(d);
            }
        }
        if distinct.len() == 1 {
            return distinct.remove(0);
        }
        let text: Vec<String> = members.iter().map(|m| m.to_string()).collect();
        diags.warn(
            DiagnosticCode::TypeResolution,
            format!("intersection `{}` has no static representation; using a dynamic value", text.join(" & ")),
            span,
        );
        TypeDescriptor::Intersection(distinct)
    }

    fn function_type(&self, f: &FunctionType, env: &mut Env<'_>, diags: &mut Diagnostics) -> FunctionSignature {
        let params = f
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let ty = self.resolve_in(&p.ty, env, diags);
                let ty = if p.is_rest {
                    self.rest_element(ty, p.ty.span, diags)
                } else {
                    ty
                };
                ParamDescriptor {
                    name: p.name.clone().unwrap_or_else(|| format!("arg{}", i)),
                    ty,
                    is_rest: p.is_rest,
                    optional: p.optional,
                }
            })
            .collect();
        FunctionSignature {
            params,
            ret: Box::new(self.resolve_in(&f.return_type, env, diags)),
        }
    }

    /// Element type of a rest parameter's array annotation.
    pub fn rest_element(&self, ty: TypeDescriptor, span: Span, diags: &mut Diagnostics) -> TypeDescriptor {
        match ty {
            TypeDescriptor::Array(elem) => *elem,
            TypeDescriptor::DynamicFallback => TypeDescriptor::DynamicFallback,
            other => {
                diags.warn(
                    DiagnosticCode::TypeResolution,
                    format!("rest parameter type `{}` is not an array; elements are dynamic", other),
                    span,
                );
                TypeDescriptor::DynamicFallback
            }
        }
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    /// Signature of a function, method or arrow. Unannotated returns are
    /// inferred from the body; suspendable functions return a promise.
    pub fn signature(
        &self,
        params: &[ast::Parameter],
        return_type: Option<&TypeAnnotation>,
        body: Option<&BlockStatement>,
        is_async: bool,
        scope: &dyn TypeScope,
        diags: &mut Diagnostics,
    ) -> FunctionSignature {
        let params: Vec<ParamDescriptor> = params.iter().map(|p| self.parameter(p, scope, diags)).collect();

        let ret = match return_type {
            Some(ann) => self.descriptor(ann, scope, diags),
            None => {
                let inferred = match body {
                    Some(body) => {
                        let mut local = LocalScope {
                            outer: scope,
                            type_params: Vec::new(),
                            values: params.iter().map(|p| (p.name.clone(), param_value_type(p))).collect(),
                        };
                        // The body reports its own problems when it is lowered
                        let mut scratch = Diagnostics::new("");
                        self.infer_return(&body.statements, &mut local, &mut scratch)
                    }
                    None => TypeDescriptor::void(),
                };
                if is_async {
                    TypeDescriptor::Generic {
                        name: "Promise".to_string(),
                        args: vec![inferred],
                    }
                } else {
                    inferred
                }
            }
        };

        FunctionSignature {
            params,
            ret: Box::new(ret),
        }
    }

    pub fn parameter(&self, p: &ast::Parameter, scope: &dyn TypeScope, diags: &mut Diagnostics) -> ParamDescriptor {
        let ty = match (&p.type_annotation, &p.default) {
            (Some(ann), _) => self.descriptor(ann, scope, diags),
            (None, Some(default)) => self.infer_descriptor(default, scope, diags),
            (None, None) if p.is_rest => TypeDescriptor::array_of(TypeDescriptor::DynamicFallback),
            (None, None) => TypeDescriptor::DynamicFallback,
        };
        let ty = if p.is_rest {
            let span = p.type_annotation.as_ref().map_or(p.span, |a| a.span);
            self.rest_element(ty, span, diags)
        } else if p.optional && p.default.is_none() {
            TypeDescriptor::nullable(ty)
        } else {
            ty
        };
        ParamDescriptor {
            name: p.name.name.clone(),
            ty,
            is_rest: p.is_rest,
            optional: p.optional,
        }
    }

    /// Common type of every `return <value>` in a body, `void` if none.
    fn infer_return(&self, stmts: &[Statement], local: &mut LocalScope<'_>, diags: &mut Diagnostics) -> TypeDescriptor {
        let mut found: Vec<TypeDescriptor> = Vec::new();
        self.collect_returns(stmts, local, &mut found, diags);
        let mut iter = found.into_iter();
        match iter.next() {
            None => TypeDescriptor::void(),
            Some(first) => {
                if iter.all(|t| t == first) {
                    first
                } else {
                    TypeDescriptor::DynamicFallback
                }
            }
        }
    }

    fn collect_returns(
        &self,
        stmts: &[Statement],
        local: &mut LocalScope<'_>,
        found: &mut Vec<TypeDescriptor>,
        diags: &mut Diagnostics,
    ) {
        for stmt in stmts {
            match stmt {
                Statement::VariableDecl(v) => self.declare_locals(v, local, diags),
                Statement::Return(r) => {
                    if let Some(value) = &r.value {
                        let mut env = Env::new(&*local);
                        let ty = self.infer_in(value, &mut env, diags);
                        found.push(ty);
                    }
                }
                Statement::Block(b) => self.collect_returns(&b.statements, local, found, diags),
                Statement::If(s) => {
                    self.collect_returns(std::slice::from_ref(&*s.then_branch), local, found, diags);
                    if let Some(e) = &s.else_branch {
                        self.collect_returns(std::slice::from_ref(&**e), local, found, diags);
                    }
                }
                Statement::While(s) => self.collect_returns(std::slice::from_ref(&*s.body), local, found, diags),
                Statement::DoWhile(s) => self.collect_returns(std::slice::from_ref(&*s.body), local, found, diags),
                Statement::For(s) => {
                    if let Some(ForInit::VariableDecl(v)) = &s.init {
                        self.declare_locals(v, local, diags);
                    }
                    self.collect_returns(std::slice::from_ref(&*s.body), local, found, diags);
                }
                Statement::ForOf(s) => {
                    let iterable = {
                        let mut env = Env::new(&*local);
                        self.infer_in(&s.iterable, &mut env, diags)
                    };
                    let elem = iterable.element_type().cloned().unwrap_or(TypeDescriptor::DynamicFallback);
                    local.values.push((s.binding.name.clone(), elem));
                    self.collect_returns(std::slice::from_ref(&*s.body), local, found, diags);
                }
                Statement::ForIn(s) => self.collect_returns(std::slice::from_ref(&*s.body), local, found, diags),
                Statement::Try(t) => {
                    self.collect_returns(&t.body.statements, local, found, diags);
                    if let Some(c) = &t.catch_clause {
                        self.collect_returns(&c.body.statements, local, found, diags);
                    }
                    if let Some(f) = &t.finally_clause {
                        self.collect_returns(&f.statements, local, found, diags);
                    }
                }
                Statement::Labeled(l) => self.collect_returns(std::slice::from_ref(&*l.body), local, found, diags),
                _ => {}
            }
        }
    }

    fn declare_locals(&self, v: &ast::VariableDecl, local: &mut LocalScope<'_>, diags: &mut Diagnostics) {
        for d in &v.declarations {
            let ty = match (&d.type_annotation, &d.initializer) {
                (Some(ann), _) => self.descriptor(ann, &*local, diags),
                (None, Some(init)) => {
                    let mut env = Env::new(&*local);
                    self.infer_in(init, &mut env, diags)
                }
                (None, None) => TypeDescriptor::DynamicFallback,
            };
            local.values.push((d.name.name.clone(), ty));
        }
    }

    // ------------------------------------------------------------------
    // Inference
    // ------------------------------------------------------------------

    fn infer_in(&self, expr: &Expression, env: &mut Env<'_>, diags: &mut Diagnostics) -> TypeDescriptor {
        if let Some(ann) = self.semantic.and_then(|t| t.lookup(expr.span())) {
            return self.resolve_in(ann, env, diags);
        }

        match expr {
            Expression::Identifier(id) => match id.name.as_str() {
                "NaN" | "Infinity" => TypeDescriptor::number(),
                name => env.scope.value_type(name).unwrap_or(TypeDescriptor::DynamicFallback),
            },
            Expression::NumberLiteral(_) => TypeDescriptor::number(),
            Expression::StringLiteral(_) | Expression::Template(_) => TypeDescriptor::string(),
            Expression::BooleanLiteral(_) => TypeDescriptor::boolean(),
            Expression::BigIntLiteral(_) => TypeDescriptor::Primitive(PrimitiveType::BigInt),
            Expression::NullLiteral(_) => TypeDescriptor::DynamicFallback,
            Expression::Array(a) => {
                let mut elems = a.elements.iter().map(|e| self.infer_in(e, env, diags));
                let elem = match elems.next() {
                    None => TypeDescriptor::DynamicFallback,
                    Some(first) => {
                        if elems.all(|t| t == first) {
                            first
                        } else {
                            TypeDescriptor::DynamicFallback
                        }
                    }
                };
                TypeDescriptor::array_of(elem)
            }
            Expression::Object(o) => TypeDescriptor::Object {
                name: None,
                fields: o
                    .properties
                    .iter()
                    .map(|p| FieldDescriptor {
                        name: p.key.clone(),
                        ty: self.infer_in(&p.value, env, diags),
                        optional: false,
                    })
                    .collect(),
            },
            Expression::Call(c) => self.call_type(c, env, diags),
            Expression::Member(m) => {
                if let Expression::Identifier(obj) = m.object.unwrap_transparent() {
                    if obj.name == "Math" && env.scope.value_type("Math").is_none() {
                        return TypeDescriptor::number();
                    }
                }
                let object = self.infer_in(&m.object, env, diags);
                self.member_type(&object, &m.property.name)
                    .unwrap_or(TypeDescriptor::DynamicFallback)
            }
            Expression::Index(i) => match self.infer_in(&i.object, env, diags) {
                TypeDescriptor::Array(elem) => *elem,
                TypeDescriptor::Primitive(PrimitiveType::String) => TypeDescriptor::string(),
                TypeDescriptor::Tuple(items) => match i.index.unwrap_transparent() {
                    Expression::NumberLiteral(n) if n.value >= 0.0 && n.value.fract() == 0.0 => items
                        .get(n.value as usize)
                        .cloned()
                        .unwrap_or(TypeDescriptor::DynamicFallback),
                    _ => TypeDescriptor::DynamicFallback,
                },
                _ => TypeDescriptor::DynamicFallback,
            },
            Expression::Binary(b) => {
                let left = self.infer_in(&b.left, env, diags);
                let right = self.infer_in(&b.right, env, diags);
                binary_type(b.operator, &left, &right)
            }
            Expression::Unary(u) => match u.operator {
                UnaryOperator::Not | UnaryOperator::Delete => TypeDescriptor::boolean(),
                UnaryOperator::Typeof => TypeDescriptor::string(),
                UnaryOperator::Void => TypeDescriptor::DynamicFallback,
                UnaryOperator::Minus => {
                    let operand = self.infer_in(&u.operand, env, diags);
                    if operand.is_primitive(PrimitiveType::BigInt) {
                        operand
                    } else {
                        TypeDescriptor::number()
                    }
                }
                UnaryOperator::Plus | UnaryOperator::BitwiseNot => TypeDescriptor::number(),
            },
            Expression::Update(_) => TypeDescriptor::number(),
            Expression::Assignment(a) => self.infer_in(&a.value, env, diags),
            Expression::Conditional(c) => {
                let a = self.infer_in(&c.consequent, env, diags);
                let b = self.infer_in(&c.alternate, env, diags);
                if a == b {
                    a
                } else {
                    TypeDescriptor::DynamicFallback
                }
            }
            Expression::New(n) => self.new_type(n, env, diags),
            Expression::This(_) => self.this_type(env.scope),
            Expression::Super(_) => TypeDescriptor::DynamicFallback,
            Expression::Arrow(a) => {
                let sig = match &a.body {
                    ArrowBody::Block(body) => self.signature(&a.params, a.return_type.as_ref(), Some(body), a.is_async, env.scope, diags),
                    ArrowBody::Expression(body) => {
                        let mut sig = self.signature(&a.params, a.return_type.as_ref(), None, false, env.scope, diags);
                        if a.return_type.is_none() {
                            let local = LocalScope {
                                outer: env.scope,
                                type_params: Vec::new(),
                                values: sig.params.iter().map(|p| (p.name.clone(), param_value_type(p))).collect(),
                            };
                            let mut inner = Env::new(&local);
                            let ret = self.infer_in(body, &mut inner, diags);
                            sig.ret = Box::new(if a.is_async {
                                TypeDescriptor::Generic {
                                    name: "Promise".to_string(),
                                    args: vec![ret],
                                }
                            } else {
                                ret
                            });
                        }
                        sig
                    }
                };
                TypeDescriptor::Function(sig)
            }
            Expression::Await(a) => self.infer_in(&a.argument, env, diags).awaited(),
            Expression::As(a) => match (&a.kind, &a.type_annotation) {
                (AssertionKind::As, Some(ann)) => self.resolve_in(ann, env, diags),
                _ => self.infer_in(&a.expression, env, diags),
            },
            Expression::NonNull(n) => self.infer_in(&n.expression, env, diags).unwrap_nullable().clone(),
            Expression::Parenthesized(p) => self.infer_in(&p.expression, env, diags),
            Expression::Yield(_) | Expression::Unknown(_) => TypeDescriptor::DynamicFallback,
        }
    }

    /// `this` inside the current class, type parameters left open.
    pub fn this_type(&self, scope: &dyn TypeScope) -> TypeDescriptor {
        match scope.current_class().and_then(|c| self.registry.class(c)) {
            Some(entry) => TypeDescriptor::ClassRef {
                name: entry.name.clone(),
                args: entry.type_params.iter().cloned().map(TypeDescriptor::TypeParam).collect(),
            },
            None => TypeDescriptor::DynamicFallback,
        }
    }

    fn new_type(&self, n: &NewExpression, env: &mut Env<'_>, diags: &mut Diagnostics) -> TypeDescriptor {
        // `new Geo.Point()` names the class by its last segment
        let name = n.callee.name.rsplit('.').next().unwrap_or(&n.callee.name);
        let mut args: Vec<TypeDescriptor> = n.type_args.iter().map(|a| self.resolve_in(a, env, diags)).collect();

        if let Some(entry) = self.registry.class(name) {
            if args.is_empty() && !entry.type_params.is_empty() {
                let mut map = FxHashMap::default();
                if let Some(ctor) = entry.method(ast::CONSTRUCTOR_NAME) {
                    for (param, arg) in ctor.signature.params.iter().zip(&n.arguments) {
                        let actual = self.infer_in(arg, env, diags);
                        bind(&param.ty, &actual, &entry.type_params, &mut map);
                    }
                }
                args = entry
                    .type_params
                    .iter()
                    .map(|t| map.get(t).cloned().unwrap_or(TypeDescriptor::DynamicFallback))
                    .collect();
            }
            return TypeDescriptor::ClassRef {
                name: name.to_string(),
                args,
            };
        }

        match name {
            "Map" | "Set" | "Promise" => TypeDescriptor::Generic {
                name: name.to_string(),
                args: if args.is_empty() {
                    let arity = if name == "Map" { 2 } else { 1 };
                    vec![TypeDescriptor::DynamicFallback; arity]
                } else {
                    args
                },
            },
            "Error" | "Date" | "RegExp" => TypeDescriptor::Generic {
                name: name.to_string(),
                args: Vec::new(),
            },
            "Array" => TypeDescriptor::array_of(args.into_iter().next().unwrap_or(TypeDescriptor::DynamicFallback)),
            "Object" => TypeDescriptor::Object {
                name: None,
                fields: Vec::new(),
            },
            _ if self.registry.is_imported(name) => TypeDescriptor::ClassRef {
                name: name.to_string(),
                args,
            },
            _ => TypeDescriptor::DynamicFallback,
        }
    }

    fn call_type(&self, c: &CallExpression, env: &mut Env<'_>, diags: &mut Diagnostics) -> TypeDescriptor {
        let explicit: Vec<TypeDescriptor> = c.type_args.iter().map(|a| self.resolve_in(a, env, diags)).collect();
        match c.callee.unwrap_transparent() {
            Expression::Identifier(id) => {
                if let Some(ty) = env.scope.value_type(&id.name) {
                    return match ty {
                        TypeDescriptor::Function(sig) => *sig.ret,
                        _ => TypeDescriptor::DynamicFallback,
                    };
                }
                let entries = self.registry.functions(&id.name);
                if entries.is_empty() {
                    return builtin_call(&id.name);
                }
                self.function_call(entries, &explicit, &c.arguments, env, diags)
            }
            Expression::Member(m) => {
                if let Expression::Identifier(obj) = m.object.unwrap_transparent() {
                    if env.scope.value_type(&obj.name).is_none() {
                        match (obj.name.as_str(), m.property.name.as_str()) {
                            ("Math", _) => return TypeDescriptor::number(),
                            ("console", _) => return TypeDescriptor::void(),
                            ("JSON", "stringify") => return TypeDescriptor::string(),
                            _ => {}
                        }
                    }
                }
                let object = self.infer_in(&m.object, env, diags);
                match self.member_type(&object, &m.property.name) {
                    Some(TypeDescriptor::Function(sig)) => *sig.ret,
                    Some(_) => TypeDescriptor::DynamicFallback,
                    None => library_method(&object, &m.property.name),
                }
            }
            _ => TypeDescriptor::DynamicFallback,
        }
    }

    fn function_call(
        &self,
        entries: &[FunctionEntry],
        explicit: &[TypeDescriptor],
        arguments: &[Expression],
        env: &mut Env<'_>,
        diags: &mut Diagnostics,
    ) -> TypeDescriptor {
        // Prefer the overloads whose arity matches the call.
        let matching: Vec<&FunctionEntry> = entries
            .iter()
            .filter(|e| {
                let fixed = e.signature.params.iter().filter(|p| !p.is_rest && !p.optional).count();
                let has_rest = e.signature.rest().is_some();
                arguments.len() >= fixed && (has_rest || arguments.len() <= e.signature.params.len())
            })
            .collect();
        let candidates: Vec<&FunctionEntry> = if matching.is_empty() {
            entries.iter().collect()
        } else {
            matching
        };
        let first = candidates[0];
        if candidates.iter().any(|e| e.signature.ret != first.signature.ret) {
            return TypeDescriptor::DynamicFallback;
        }
        if first.type_params.is_empty() {
            return (*first.signature.ret).clone();
        }

        let mut map = FxHashMap::default();
        for (param, arg) in first.type_params.iter().zip(explicit) {
            map.insert(param.clone(), arg.clone());
        }
        if explicit.is_empty() {
            for (param, arg) in first.signature.params.iter().zip(arguments) {
                let actual = self.infer_in(arg, env, diags);
                bind(&param.ty, &actual, &first.type_params, &mut map);
            }
        }
        for param in &first.type_params {
            map.entry(param.clone()).or_insert(TypeDescriptor::DynamicFallback);
        }
        substitute(&first.signature.ret, &map)
    }

    /// Type of `object.name`, searching superclasses.
    pub fn member_type(&self, object: &TypeDescriptor, name: &str) -> Option<TypeDescriptor> {
        match object.unwrap_nullable() {
            TypeDescriptor::ClassRef { name: class, args } => {
                for (depth, entry) in self.registry.ancestry(class).into_iter().enumerate() {
                    let mut map = FxHashMap::default();
                    for (i, param) in entry.type_params.iter().enumerate() {
                        let arg = if depth == 0 { args.get(i).cloned() } else { None };
                        map.insert(param.clone(), arg.unwrap_or(TypeDescriptor::DynamicFallback));
                    }
                    if let Some(p) = entry.property(name) {
                        return Some(substitute(&p.ty, &map));
                    }
                    if let Some(m) = entry.method(name) {
                        return Some(TypeDescriptor::Function(substitute_signature(&m.signature, &map)));
                    }
                }
                None
            }
            TypeDescriptor::Object { name: shape, fields } => {
                if let Some(f) = fields.iter().find(|f| f.name == name) {
                    return Some(f.ty.clone());
                }
                let shape = shape.as_deref()?;
                let mut env = Env::new(&EmptyScope);
                match self.shape(shape, &mut env) {
                    TypeDescriptor::Object { fields, .. } => {
                        fields.into_iter().find(|f| f.name == name).map(|f| f.ty)
                    }
                    _ => None,
                }
            }
            TypeDescriptor::Array(_) | TypeDescriptor::Primitive(PrimitiveType::String) if name == "length" => {
                Some(TypeDescriptor::number())
            }
            TypeDescriptor::Generic { name: g, .. } if (g == "Map" || g == "Set") && name == "size" => {
                Some(TypeDescriptor::number())
            }
            _ => None,
        }
    }

    /// Whether a class-like name is an interface with methods.
    pub fn is_interface(&self, name: &str) -> bool {
        self.registry
            .class(name)
            .map_or(false, |c| c.kind == ClassKind::Interface)
    }
}

fn keyword_type(keyword: PrimitiveKeyword) -> TypeDescriptor {
    match keyword {
        PrimitiveKeyword::Number => TypeDescriptor::number(),
        PrimitiveKeyword::String => TypeDescriptor::string(),
        PrimitiveKeyword::Boolean => TypeDescriptor::boolean(),
        PrimitiveKeyword::Void => TypeDescriptor::void(),
        PrimitiveKeyword::Null => TypeDescriptor::Primitive(PrimitiveType::Null),
        PrimitiveKeyword::Undefined => TypeDescriptor::Primitive(PrimitiveType::Undefined),
        PrimitiveKeyword::Never => TypeDescriptor::Primitive(PrimitiveType::Never),
        PrimitiveKeyword::BigInt => TypeDescriptor::Primitive(PrimitiveType::BigInt),
        PrimitiveKeyword::Any | PrimitiveKeyword::Unknown => TypeDescriptor::DynamicFallback,
        PrimitiveKeyword::Object => TypeDescriptor::Object {
            name: None,
            fields: Vec::new(),
        },
    }
}

/// Value seen inside the body for a parameter (rest parameters are arrays).
fn param_value_type(p: &ParamDescriptor) -> TypeDescriptor {
    if p.is_rest {
        TypeDescriptor::array_of(p.ty.clone())
    } else {
        p.ty.clone()
    }
}

fn binary_type(op: BinaryOperator, left: &TypeDescriptor, right: &TypeDescriptor) -> TypeDescriptor {
    use BinaryOperator::*;
    let both_bigint =
        left.is_primitive(PrimitiveType::BigInt) && right.is_primitive(PrimitiveType::BigInt);
    match op {
        Add => {
            if left.is_text() || right.is_text() {
                TypeDescriptor::string()
            } else if both_bigint {
                left.clone()
            } else if left.is_numeric() && right.is_numeric() {
                TypeDescriptor::number()
            } else {
                TypeDescriptor::DynamicFallback
            }
        }
        Subtract | Multiply | Divide | Modulo | Exponent => {
            if both_bigint {
                left.clone()
            } else {
                TypeDescriptor::number()
            }
        }
        _ if op.is_bitwise() => TypeDescriptor::number(),
        _ if op.is_comparison() => TypeDescriptor::boolean(),
        NullishCoalescing => {
            let inner = left.unwrap_nullable();
            if inner == right {
                right.clone()
            } else {
                TypeDescriptor::DynamicFallback
            }
        }
        _ => {
            if left == right {
                left.clone()
            } else {
                TypeDescriptor::DynamicFallback
            }
        }
    }
}

fn builtin_call(name: &str) -> TypeDescriptor {
    match name {
        "parseInt" | "parseFloat" | "Number" => TypeDescriptor::number(),
        "String" => TypeDescriptor::string(),
        "Boolean" | "isNaN" | "isFinite" => TypeDescriptor::boolean(),
        _ => TypeDescriptor::DynamicFallback,
    }
}

fn library_method(object: &TypeDescriptor, method: &str) -> TypeDescriptor {
    match object {
        TypeDescriptor::Primitive(PrimitiveType::String) => match method {
            "toUpperCase" | "toLowerCase" | "trim" | "slice" | "substring" | "charAt" | "padStart"
            | "padEnd" | "repeat" | "replace" | "concat" | "toString" => TypeDescriptor::string(),
            "indexOf" | "lastIndexOf" | "charCodeAt" => TypeDescriptor::number(),
            "includes" | "startsWith" | "endsWith" => TypeDescriptor::boolean(),
            "split" => TypeDescriptor::array_of(TypeDescriptor::string()),
            _ => TypeDescriptor::DynamicFallback,
        },
        TypeDescriptor::Array(elem) => match method {
            "join" => TypeDescriptor::string(),
            "push" | "indexOf" | "unshift" => TypeDescriptor::number(),
            "includes" | "some" | "every" => TypeDescriptor::boolean(),
            "filter" | "slice" | "concat" | "reverse" | "sort" => object.clone(),
            "pop" | "shift" | "find" => (**elem).clone(),
            _ => TypeDescriptor::DynamicFallback,
        },
        TypeDescriptor::Primitive(PrimitiveType::Number) => match method {
            "toFixed" | "toString" | "toPrecision" => TypeDescriptor::string(),
            _ => TypeDescriptor::DynamicFallback,
        },
        _ if method == "toString" => TypeDescriptor::string(),
        _ => TypeDescriptor::DynamicFallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::registry::{AliasEntry, ClassEntry, MemberEntry, ShapeEntry, ShapeField};
    use kiln_syntax::build::*;

    fn resolve_with(reg: &TypeRegistry, ann: &TypeAnnotation) -> (TypeDescriptor, Diagnostics) {
        let options = CompilerOptions::default();
        let resolver = TypeResolver::new(reg, &options, None);
        let mut diags = Diagnostics::new("t.ts");
        let d = resolver.descriptor(ann, &EmptyScope, &mut diags);
        (d, diags)
    }

    fn resolve(ann: &TypeAnnotation) -> (TypeDescriptor, Diagnostics) {
        resolve_with(&TypeRegistry::new(), ann)
    }

    // =========================================================================
    // Unions
    // =========================================================================

    #[test]
    fn test_text_numeric_union_is_disjoint_wrapper() {
        for members in [vec![string_ty(), number_ty()], vec![number_ty(), string_ty()]] {
            let (d, diags) = resolve(&union_ty(members));
            assert!(d.is_text_numeric_union(), "got {d}");
            assert!(diags.is_empty());
        }
    }

    #[test]
    fn test_union_with_null_is_nullable() {
        let (d, diags) = resolve(&union_ty(vec![string_ty(), null_ty()]));
        assert_eq!(d, TypeDescriptor::nullable(TypeDescriptor::string()));
        assert!(diags.is_empty());

        let (d, _) = resolve(&union_ty(vec![undefined_ty(), number_ty()]));
        assert_eq!(d, TypeDescriptor::nullable(TypeDescriptor::number()));
    }

    #[test]
    fn test_null_and_undefined_count_as_one_sentinel() {
        let (d, diags) = resolve(&union_ty(vec![string_ty(), null_ty(), undefined_ty()]));
        assert_eq!(d, TypeDescriptor::nullable(TypeDescriptor::string()));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_three_member_union_falls_back_with_warning() {
        let (d, diags) = resolve(&union_ty(vec![string_ty(), number_ty(), boolean_ty()]));
        assert!(d.is_dynamic());
        assert_eq!(diags.count(DiagnosticCode::TypeResolution), 1);
    }

    #[test]
    fn test_literal_union_collapses() {
        let (d, diags) = resolve(&union_ty(vec![string_literal_ty("a"), string_literal_ty("b")]));
        assert_eq!(d, TypeDescriptor::string());
        assert!(diags.is_empty());
        let (d, _) = resolve(&union_ty(vec![number_literal_ty(1.0), number_literal_ty(2.0), null_ty()]));
        assert_eq!(d, TypeDescriptor::nullable(TypeDescriptor::number()));
    }

    #[test]
    fn test_union_with_any_is_silently_dynamic() {
        let (d, diags) = resolve(&union_ty(vec![any_ty(), string_ty(), number_ty(), boolean_ty()]));
        assert!(d.is_dynamic());
        assert!(diags.is_empty());
    }

    // =========================================================================
    // Intersections
    // =========================================================================

    fn shapes_registry() -> TypeRegistry {
        let mut reg = TypeRegistry::new();
        for (name, field) in [("Named", "name"), ("Aged", "age")] {
            reg.add_shape(ShapeEntry {
                name: name.into(),
                path: vec![],
                type_params: vec![],
                extends: vec![],
                fields: vec![ShapeField {
                    name: field.into(),
                    annotation: string_ty(),
                    optional: false,
                }],
            });
        }
        reg
    }

    #[test]
    fn test_intersection_first_structural_member_wins() {
        let reg = shapes_registry();
        let (d, diags) = resolve_with(
            &reg,
            &intersection_ty(vec![number_ty(), ref_ty("Aged", vec![]), ref_ty("Named", vec![])]),
        );
        match d {
            TypeDescriptor::Object { name, .. } => assert_eq!(name.as_deref(), Some("Aged")),
            other => panic!("expected Aged, got {other}"),
        }
        assert_eq!(diags.count(DiagnosticCode::TypeResolution), 1);
    }

    #[test]
    fn test_intersection_single_structural_is_silent() {
        let reg = shapes_registry();
        let (d, diags) = resolve_with(&reg, &intersection_ty(vec![ref_ty("Named", vec![]), string_ty()]));
        assert!(d.is_structural());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_intersection_of_primitives() {
        let (d, diags) = resolve(&intersection_ty(vec![string_ty(), string_ty()]));
        assert_eq!(d, TypeDescriptor::string());
        assert!(diags.is_empty());
        let (d, diags) = resolve(&intersection_ty(vec![string_ty(), number_ty()]));
        assert!(matches!(d, TypeDescriptor::Intersection(_)));
        assert_eq!(diags.len(), 1);
    }

    // =========================================================================
    // References, aliases, functions
    // =========================================================================

    #[test]
    fn test_unknown_reference_warns() {
        let (d, diags) = resolve(&ref_ty("Mystery", vec![]));
        assert!(d.is_dynamic());
        assert_eq!(diags.count(DiagnosticCode::TypeResolution), 1);
    }

    #[test]
    fn test_override_makes_name_known() {
        let reg = TypeRegistry::new();
        let options = CompilerOptions::default().with_override("Buffer", "std::vector<uint8_t>");
        let resolver = TypeResolver::new(&reg, &options, None);
        let mut diags = Diagnostics::new("t.ts");
        let r = resolver.resolve(&ref_ty("Buffer", vec![]), &EmptyScope, &mut diags);
        assert!(diags.is_empty());
        assert_eq!(r.target, "std::vector<uint8_t>");
    }

    #[test]
    fn test_alias_substitution_and_cycle() {
        let mut reg = TypeRegistry::new();
        reg.add_alias(AliasEntry {
            name: "Pair".into(),
            type_params: vec!["T".into()],
            annotation: tuple_ty(vec![ref_ty("T", vec![]), ref_ty("T", vec![])]),
        });
        reg.add_alias(AliasEntry {
            name: "Loop".into(),
            type_params: vec![],
            annotation: array_ty(ref_ty("Loop", vec![])),
        });
        let (d, diags) = resolve_with(&reg, &ref_ty("Pair", vec![number_ty()]));
        assert_eq!(d, TypeDescriptor::Tuple(vec![TypeDescriptor::number(), TypeDescriptor::number()]));
        assert!(diags.is_empty());

        let (d, diags) = resolve_with(&reg, &ref_ty("Loop", vec![]));
        assert_eq!(d, TypeDescriptor::array_of(TypeDescriptor::DynamicFallback));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_function_type_rest_parameter() {
        let (d, diags) = resolve(&fn_ty(vec![string_ty(), array_ty(number_ty())], void_ty(), true));
        match d {
            TypeDescriptor::Function(sig) => {
                assert!(sig.params[1].is_rest);
                assert_eq!(sig.params[1].ty, TypeDescriptor::number());
                assert!(!sig.params[0].is_rest);
            }
            other => panic!("expected function, got {other}"),
        }
        assert!(diags.is_empty());
    }

    #[test]
    fn test_any_and_unknown_are_silent() {
        for keyword in [PrimitiveKeyword::Any, PrimitiveKeyword::Unknown] {
            let (d, diags) = resolve(&keyword_ty(keyword));
            assert!(d.is_dynamic());
            assert!(diags.is_empty());
        }
    }

    // =========================================================================
    // Inference
    // =========================================================================

    #[test]
    fn test_infer_literals_and_operators() {
        let reg = TypeRegistry::new();
        let options = CompilerOptions::default();
        let resolver = TypeResolver::new(&reg, &options, None);
        let mut diags = Diagnostics::new("t.ts");
        let infer = |e: &Expression, d: &mut Diagnostics| resolver.infer_descriptor(e, &EmptyScope, d);

        assert_eq!(infer(&num(1.0), &mut diags), TypeDescriptor::number());
        assert_eq!(
            infer(&binary(BinaryOperator::Add, str_lit("a"), num(1.0)), &mut diags),
            TypeDescriptor::string()
        );
        assert_eq!(
            infer(&binary(BinaryOperator::LessThan, num(1.0), num(2.0)), &mut diags),
            TypeDescriptor::boolean()
        );
        assert_eq!(
            infer(&array(vec![num(1.0), num(2.0)]), &mut diags),
            TypeDescriptor::array_of(TypeDescriptor::number())
        );
        assert!(infer(&ident("nowhere"), &mut diags).is_dynamic());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_infer_construction_and_member() {
        let mut reg = TypeRegistry::new();
        let mut entry = ClassEntry::new("Engine", ClassKind::Class);
        entry.properties.push(MemberEntry {
            name: "power".into(),
            ty: TypeDescriptor::number(),
            is_static: false,
        });
        reg.add_class(entry);
        let options = CompilerOptions::default();
        let resolver = TypeResolver::new(&reg, &options, None);
        let mut diags = Diagnostics::new("t.ts");
        let ty = resolver.infer_descriptor(&new_expr("Engine", vec![]), &EmptyScope, &mut diags);
        assert_eq!(ty, TypeDescriptor::class("Engine"));
        assert_eq!(resolver.member_type(&ty, "power"), Some(TypeDescriptor::number()));
        assert_eq!(resolver.member_type(&ty, "missing"), None);
    }

    #[test]
    fn test_generic_call_binds_type_parameter() {
        let mut reg = TypeRegistry::new();
        reg.add_function(FunctionEntry {
            name: "identity".into(),
            type_params: vec!["T".into()],
            signature: FunctionSignature {
                params: vec![ParamDescriptor {
                    name: "value".into(),
                    ty: TypeDescriptor::TypeParam("T".into()),
                    is_rest: false,
                    optional: false,
                }],
                ret: Box::new(TypeDescriptor::TypeParam("T".into())),
            },
            has_body: true,
        });
        let options = CompilerOptions::default();
        let resolver = TypeResolver::new(&reg, &options, None);
        let mut diags = Diagnostics::new("t.ts");
        let ty = resolver.infer_descriptor(&call(ident("identity"), vec![str_lit("x")]), &EmptyScope, &mut diags);
        assert_eq!(ty, TypeDescriptor::string());
    }

    #[test]
    fn test_return_inference_from_body() {
        let reg = TypeRegistry::new();
        let options = CompilerOptions::default();
        let resolver = TypeResolver::new(&reg, &options, None);
        let mut diags = Diagnostics::new("t.ts");
        let body = block(vec![
            const_stmt("sum", binary(BinaryOperator::Add, ident("a"), ident("b"))),
            ret(Some(ident("sum"))),
        ]);
        let params = vec![param("a", Some(number_ty())), param("b", Some(number_ty()))];
        let sig = resolver.signature(&params, None, Some(&body), false, &EmptyScope, &mut diags);
        assert_eq!(*sig.ret, TypeDescriptor::number());

        let empty = block(vec![]);
        let sig = resolver.signature(&[], None, Some(&empty), true, &EmptyScope, &mut diags);
        assert_eq!(
            *sig.ret,
            TypeDescriptor::Generic {
                name: "Promise".into(),
                args: vec![TypeDescriptor::void()]
            }
        );
    }

    #[test]
    fn test_semantic_table_consulted_first() {
        let reg = TypeRegistry::new();
        let options = CompilerOptions::default();
        let mut table = TypeTable::new();
        let span = Span::new(3, 8, 1, 4);
        table.insert(span, string_ty());
        let resolver = TypeResolver::new(&reg, &options, Some(&table));
        let mut diags = Diagnostics::new("t.ts");
        let expr = Expression::Identifier(kiln_syntax::ast::Identifier::new("external", span));
        assert_eq!(resolver.infer_descriptor(&expr, &EmptyScope, &mut diags), TypeDescriptor::string());
    }
}
