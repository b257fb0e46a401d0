//! Overload planning
//!
//! Same-named functions (or methods) of one scope are grouped and each
//! group becomes one of:
//! - a single function emitted as written
//! - C++ overloads, when arities differ or the overloads are generic
//! - typed forwarding thunks plus the author's implementation, when the
//!   source gives bodyless signatures followed by one body
//! - typed forwarding thunks plus a synthesized implementation over the
//!   widened parameter types that tests the argument at runtime: text,
//!   then numeric, then boolean, then the fallback
//!
//! Overloads no runtime test can reach, and exact duplicates, are reported
//! as `W1005`.

use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::ir::{Block, BindingTable, Function, Method, Param, TypeParam};
use crate::types::{DispatchCategory, TypeDescriptor};
use kiln_syntax::Span;

/// Common view of functions and methods.
pub(crate) trait Callable {
    fn name(&self) -> &str;
    fn params(&self) -> &[Param];
    fn ret(&self) -> &TypeDescriptor;
    fn body(&self) -> Option<&Block>;
    fn type_params(&self) -> &[TypeParam];
    fn is_async(&self) -> bool;
}

impl Callable for Function {
    fn name(&self) -> &str {
        &self.name
    }
    fn params(&self) -> &[Param] {
        &self.params
    }
    fn ret(&self) -> &TypeDescriptor {
        &self.ret
    }
    fn body(&self) -> Option<&Block> {
        self.body.as_ref()
    }
    fn type_params(&self) -> &[TypeParam] {
        &self.type_params
    }
    fn is_async(&self) -> bool {
        self.is_async
    }
}

impl Callable for Method {
    fn name(&self) -> &str {
        &self.name
    }
    fn params(&self) -> &[Param] {
        &self.params
    }
    fn ret(&self) -> &TypeDescriptor {
        &self.ret
    }
    fn body(&self) -> Option<&Block> {
        self.body.as_ref()
    }
    fn type_params(&self) -> &[TypeParam] {
        &self.type_params
    }
    fn is_async(&self) -> bool {
        self.is_async
    }
}

/// Parameter list a thunk forwards into.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Target {
    pub params: Vec<TypeDescriptor>,
    pub ret: TypeDescriptor,
}

#[derive(Debug)]
pub(crate) struct DispatchBranch<'f, F> {
    pub category: DispatchCategory,
    pub overload: &'f F,
}

/// Synthesized implementation over widened parameter types.
#[derive(Debug)]
pub(crate) struct Dispatch<'f, F> {
    pub name: String,
    /// Parameter tested at runtime.
    pub position: usize,
    /// Widened parameter names and types.
    pub params: Vec<(String, TypeDescriptor)>,
    pub ret: TypeDescriptor,
    /// Branches in test order; an `Other` branch is the fallback.
    pub branches: Vec<DispatchBranch<'f, F>>,
}

#[derive(Debug)]
pub(crate) enum Planned<'f, F> {
    /// Emitted as written.
    Plain(&'f F),
    /// Typed signature forwarding into `target`.
    Thunk { overload: &'f F, target: Target },
    Dispatch(Dispatch<'f, F>),
}

/// Plan every group of same-named callables, in order of first appearance.
pub(crate) fn plan<'f, F: Callable>(
    items: &[&'f F],
    bindings: &BindingTable,
    diags: &mut Diagnostics,
    span: impl Fn(&F) -> Span,
) -> Vec<Planned<'f, F>> {
    let mut groups: Vec<(&str, Vec<&'f F>)> = Vec::new();
    for &item in items {
        match groups.iter_mut().find(|(n, _)| *n == item.name()) {
            Some((_, group)) => group.push(item),
            None => groups.push((item.name(), vec![item])),
        }
    }

    let mut out = Vec::new();
    for (_, group) in groups {
        plan_group(&group, bindings, diags, &span, &mut out);
    }
    out
}

fn param_types<F: Callable>(f: &F, bindings: &BindingTable) -> Vec<TypeDescriptor> {
    f.params()
        .iter()
        .map(|p| bindings.get(p.binding).map_or(TypeDescriptor::DynamicFallback, |b| b.ty.clone()))
        .collect()
}

fn param_names<F: Callable>(f: &F, bindings: &BindingTable) -> Vec<String> {
    f.params()
        .iter()
        .enumerate()
        .map(|(i, p)| bindings.get(p.binding).map_or_else(|| format!("arg{}", i), |b| b.name.clone()))
        .collect()
}

fn plan_group<'f, F: Callable>(
    group: &[&'f F],
    bindings: &BindingTable,
    diags: &mut Diagnostics,
    span: &dyn Fn(&F) -> Span,
    out: &mut Vec<Planned<'f, F>>,
) {
    if group.len() == 1 {
        out.push(Planned::Plain(group[0]));
        return;
    }

    // Drop exact duplicates first
    let mut unique: Vec<&'f F> = Vec::new();
    for &f in group {
        let types = param_types(f, bindings);
        let duplicate = unique
            .iter()
            .any(|u| u.body().is_some() == f.body().is_some() && param_types(*u, bindings) == types);
        if duplicate {
            diags.warn(
                DiagnosticCode::OverloadShadowed,
                format!("`{}` is declared twice with the same parameter types; the later one is dropped", f.name()),
                span(f),
            );
            continue;
        }
        unique.push(f);
    }

    let bodies: Vec<&'f F> = unique.iter().copied().filter(|f| f.body().is_some()).collect();
    let signatures: Vec<&'f F> = unique.iter().copied().filter(|f| f.body().is_none()).collect();

    // Bodyless signatures plus one implementation
    if bodies.len() == 1 && !signatures.is_empty() {
        let implementation = bodies[0];
        let target = Target {
            params: param_types(implementation, bindings),
            ret: implementation.ret().clone(),
        };
        for &sig in &signatures {
            if param_types(sig, bindings) == target.params {
                continue;
            }
            out.push(Planned::Thunk {
                overload: sig,
                target: target.clone(),
            });
        }
        out.push(Planned::Plain(implementation));
        return;
    }

    // No body at all: abstract methods or external declarations
    if bodies.is_empty() {
        out.extend(unique.into_iter().map(Planned::Plain));
        return;
    }

    // Several bodies: dispatch within each arity
    let mut by_arity: Vec<(usize, Vec<&'f F>)> = Vec::new();
    for f in bodies {
        let arity = f.params().len();
        match by_arity.iter_mut().find(|(a, _)| *a == arity) {
            Some((_, fs)) => fs.push(f),
            None => by_arity.push((arity, vec![f])),
        }
    }
    for (_, fs) in by_arity {
        let dispatchable = fs.len() > 1
            && fs
                .iter()
                .all(|f| f.type_params().is_empty() && !f.params().iter().any(|p| p.is_rest));
        if !dispatchable {
            out.extend(fs.into_iter().map(Planned::Plain));
            continue;
        }
        plan_dispatch(&fs, bindings, diags, span, out);
    }
}

fn plan_dispatch<'f, F: Callable>(
    fs: &[&'f F],
    bindings: &BindingTable,
    diags: &mut Diagnostics,
    span: &dyn Fn(&F) -> Span,
    out: &mut Vec<Planned<'f, F>>,
) {
    let types: Vec<Vec<TypeDescriptor>> = fs.iter().map(|f| param_types(*f, bindings)).collect();
    let arity = types[0].len();

    let position = (0..arity)
        .find(|&i| {
            let first = types[0][i].dispatch_category();
            types.iter().any(|t| t[i].dispatch_category() != first)
        })
        .unwrap_or(0);

    let widened: Vec<TypeDescriptor> = (0..arity)
        .map(|i| widen(types.iter().map(|t| &t[i])))
        .collect();
    let ret = widen(fs.iter().map(|f| f.ret()));

    // Stable sort keeps source order inside a category
    let mut ranked: Vec<(DispatchCategory, &'f F)> = fs
        .iter()
        .zip(&types)
        .map(|(f, t)| (t.get(position).map_or(DispatchCategory::Other, |ty| ty.dispatch_category()), *f))
        .collect();
    ranked.sort_by_key(|(c, _)| *c);

    let mut branches: Vec<DispatchBranch<'f, F>> = Vec::new();
    for (category, f) in ranked {
        if branches.iter().any(|b| b.category == category) {
            diags.warn(
                DiagnosticCode::OverloadShadowed,
                format!(
                    "overload of `{}` is unreachable: an earlier overload takes the same kind of argument",
                    f.name()
                ),
                span(f),
            );
            continue;
        }
        branches.push(DispatchBranch { category, overload: f });
    }

    let target = Target {
        params: widened.clone(),
        ret: ret.clone(),
    };
    for (f, t) in fs.iter().zip(&types) {
        // Its C++ signature is the implementation's own
        if *t == widened {
            continue;
        }
        out.push(Planned::Thunk {
            overload: *f,
            target: target.clone(),
        });
    }

    let names = param_names(fs[0], bindings);
    out.push(Planned::Dispatch(Dispatch {
        name: fs[0].name().to_string(),
        position,
        params: names.into_iter().zip(widened).collect(),
        ret,
        branches,
    }));
}

/// Narrowest single type covering every member: the member itself when
/// all agree, the text + numeric union, otherwise dynamic.
pub(crate) fn widen<'t>(types: impl Iterator<Item = &'t TypeDescriptor>) -> TypeDescriptor {
    let types: Vec<&TypeDescriptor> = types.collect();
    let Some(first) = types.first() else {
        return TypeDescriptor::DynamicFallback;
    };
    if types.iter().all(|t| t == first) {
        return (*first).clone();
    }
    if types.iter().all(|t| t.is_text() || t.is_numeric() || t.is_text_numeric_union()) {
        return TypeDescriptor::Union(vec![TypeDescriptor::string(), TypeDescriptor::number()]);
    }
    if types.iter().all(|t| t.is_void()) {
        return TypeDescriptor::void();
    }
    TypeDescriptor::DynamicFallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BindingKind, Param};

    fn function(bindings: &mut BindingTable, name: &str, params: &[(&str, TypeDescriptor)], ret: TypeDescriptor) -> Function {
        let params = params
            .iter()
            .map(|(n, ty)| Param {
                binding: bindings.add(n, BindingKind::Parameter, ty.clone(), Span::default()),
                default: None,
                is_rest: false,
                optional: false,
            })
            .collect();
        Function {
            name: name.to_string(),
            type_params: vec![],
            params,
            ret,
            body: Some(Block::default()),
            is_async: false,
            is_exported: false,
        }
    }

    #[test]
    fn test_widen() {
        let s = TypeDescriptor::string();
        let n = TypeDescriptor::number();
        let b = TypeDescriptor::boolean();
        assert_eq!(widen([&s, &s].into_iter()), s);
        assert!(widen([&s, &n].into_iter()).is_text_numeric_union());
        assert!(widen([&s, &n, &b].into_iter()).is_dynamic());
    }

    #[test]
    fn test_dispatch_orders_text_numeric_boolean() {
        let mut bindings = BindingTable::new();
        let flag = function(&mut bindings, "show", &[("v", TypeDescriptor::boolean())], TypeDescriptor::void());
        let num = function(&mut bindings, "show", &[("v", TypeDescriptor::number())], TypeDescriptor::void());
        let text = function(&mut bindings, "show", &[("v", TypeDescriptor::string())], TypeDescriptor::void());
        let mut diags = Diagnostics::new("main.ts");
        let plans = plan(&[&flag, &num, &text], &bindings, &mut diags, |_| Span::default());

        assert!(diags.is_empty());
        let dispatch = plans
            .iter()
            .find_map(|p| match p {
                Planned::Dispatch(d) => Some(d),
                _ => None,
            })
            .expect("dispatch");
        let order: Vec<DispatchCategory> = dispatch.branches.iter().map(|b| b.category).collect();
        assert_eq!(
            order,
            vec![DispatchCategory::Text, DispatchCategory::Numeric, DispatchCategory::Boolean]
        );
        assert!(dispatch.params[0].1.is_dynamic());
        assert_eq!(plans.iter().filter(|p| matches!(p, Planned::Thunk { .. })).count(), 3);
    }

    #[test]
    fn test_same_category_is_shadowed() {
        let mut bindings = BindingTable::new();
        let a = function(&mut bindings, "f", &[("v", TypeDescriptor::class("A"))], TypeDescriptor::void());
        let b = function(&mut bindings, "f", &[("v", TypeDescriptor::class("B"))], TypeDescriptor::void());
        let mut diags = Diagnostics::new("main.ts");
        plan(&[&a, &b], &bindings, &mut diags, |_| Span::default());
        assert_eq!(diags.count(DiagnosticCode::OverloadShadowed), 1);
    }

    #[test]
    fn test_differing_arity_stays_plain() {
        let mut bindings = BindingTable::new();
        let one = function(&mut bindings, "f", &[("a", TypeDescriptor::number())], TypeDescriptor::void());
        let two = function(
            &mut bindings,
            "f",
            &[("a", TypeDescriptor::number()), ("b", TypeDescriptor::number())],
            TypeDescriptor::void(),
        );
        let mut diags = Diagnostics::new("main.ts");
        let plans = plan(&[&one, &two], &bindings, &mut diags, |_| Span::default());
        assert!(plans.iter().all(|p| matches!(p, Planned::Plain(_))));
    }

    #[test]
    fn test_signatures_forward_to_implementation() {
        let mut bindings = BindingTable::new();
        let mut sig = function(&mut bindings, "f", &[("a", TypeDescriptor::string())], TypeDescriptor::string());
        sig.body = None;
        let imp = function(&mut bindings, "f", &[("a", TypeDescriptor::DynamicFallback)], TypeDescriptor::DynamicFallback);
        let mut diags = Diagnostics::new("main.ts");
        let plans = plan(&[&sig, &imp], &bindings, &mut diags, |_| Span::default());
        assert_eq!(plans.len(), 2);
        match &plans[0] {
            Planned::Thunk { target, .. } => assert!(target.params[0].is_dynamic()),
            other => panic!("expected thunk, got {other:?}"),
        }
        assert!(matches!(plans[1], Planned::Plain(_)));
    }
}
