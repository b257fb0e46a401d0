//! Expression emission
//!
//! Every expression renders to a self-contained string. Binary forms are
//! parenthesized so nesting never depends on C++ precedence.

use super::stmt::BodyEmitter;
use super::ident;
use crate::ir::{Expr, ExprKind, Lambda, LambdaBody, Literal, MemoryAnnotation, Resolution};
use crate::types::TypeDescriptor;
use kiln_syntax::ast::{AssignmentOperator, BinaryOperator, UnaryOperator, UpdateOperator};

impl<'c, 'm> BodyEmitter<'c, 'm> {
    pub fn expr(&self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Ident { name, resolution } => self.ident_expr(name, *resolution),
            ExprKind::Literal(lit) => literal(lit),
            ExprKind::Array(items) => {
                let elem = expr
                    .ty_or_dynamic()
                    .element_type()
                    .cloned()
                    .unwrap_or(TypeDescriptor::DynamicFallback);
                format!("js::array<{}>{{{}}}", self.ctx.type_name(&elem), self.list(items))
            }
            ExprKind::Object(props) => self.object(expr, props),
            ExprKind::Call { callee, type_args, args } => self.call(callee, type_args, args),
            ExprKind::Member {
                object,
                property,
                field: Some(id),
            } if self.ctx.memory(*id) == MemoryAnnotation::Weak => format!("{}.lock()", self.member(object, property)),
            ExprKind::Member {
                object,
                property,
                field: Some(id),
            } if self.ctx.is_boxed(*id) => format!("(*{})", self.member(object, property)),
            ExprKind::Member { object, property, .. } => self.member(object, property),
            ExprKind::Index { object, index } => self.index(object, index),
            ExprKind::Binary { op, left, right } => self.binary(*op, left, right),
            ExprKind::Unary { op, operand } => self.unary(*op, operand),
            ExprKind::Update { op, prefix, target } => {
                let sym = match op {
                    UpdateOperator::Increment => "++",
                    UpdateOperator::Decrement => "--",
                };
                let target = self.target(target);
                if *prefix {
                    format!("{}{}", sym, target)
                } else {
                    format!("{}{}", target, sym)
                }
            }
            ExprKind::Assign { op, target, value } => self.assign(*op, target, value),
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => format!(
                "({} ? {} : {})",
                self.condition(test),
                self.expr(consequent),
                self.expr(alternate)
            ),
            ExprKind::Template { quasis, exprs } => self.template(quasis, exprs),
            ExprKind::Construct { .. } => self.construct(expr),
            ExprKind::This => self.this_value(),
            ExprKind::SuperMember { property } => format!("{}::{}", self.base_name(), ident(property)),
            ExprKind::Lambda(lambda) => self.lambda(lambda),
            ExprKind::Await(inner) => {
                if self.coroutine {
                    format!("(co_await {})", self.expr(inner))
                } else {
                    format!("js::await({})", self.expr(inner))
                }
            }
            ExprKind::Placeholder { kind } => format!("js::any() /* unsupported: {} */", kind),
        }
    }

    /// Test of a branch or loop; only booleans are used as-is.
    pub fn condition(&self, expr: &Expr) -> String {
        if expr.ty_or_dynamic().is_boolean() {
            self.expr(expr)
        } else {
            format!("js::truthy({})", self.expr(expr))
        }
    }

    fn list(&self, items: &[Expr]) -> String {
        items.iter().map(|i| self.expr(i)).collect::<Vec<_>>().join(", ")
    }

    fn ident_expr(&self, name: &str, resolution: Resolution) -> String {
        match resolution {
            Resolution::Binding(id) => {
                let name = self.ctx.binding_name(id);
                // A weak reference read as a value yields the owner, if alive
                if self.ctx.memory(id) == MemoryAnnotation::Weak {
                    format!("{}.lock()", name)
                } else if self.ctx.is_boxed(id) {
                    format!("(*{})", name)
                } else {
                    name
                }
            }
            Resolution::Class => self.ctx.module.registry.qualified_name(name),
            Resolution::Builtin => format!("js::{}", name),
            Resolution::Function | Resolution::Namespace | Resolution::Imported | Resolution::External => ident(name),
        }
    }

    /// Expression on the left of an assignment: never unwraps weak
    /// references, writes boxed values in place.
    pub fn target(&self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Ident {
                resolution: Resolution::Binding(id),
                ..
            } if self.ctx.is_boxed(*id) => format!("(*{})", self.ctx.binding_name(*id)),
            ExprKind::Ident {
                resolution: Resolution::Binding(id),
                ..
            } => self.ctx.binding_name(*id),
            ExprKind::Member {
                object,
                property,
                field: Some(id),
            } if self.ctx.is_boxed(*id) => format!("(*{})", self.member(object, property)),
            ExprKind::Member { object, property, .. } => self.member(object, property),
            _ => self.expr(expr),
        }
    }

    // ========================================================================
    // Member access
    // ========================================================================

    fn member(&self, object: &Expr, property: &str) -> String {
        let prop = ident(property);
        match &object.kind {
            ExprKind::This => return format!("this->{}", prop),
            ExprKind::Ident {
                name,
                resolution: Resolution::Class,
            } => return format!("{}::{}", self.ctx.module.registry.qualified_name(name), prop),
            ExprKind::Ident {
                name,
                resolution: Resolution::Namespace,
            } => return format!("{}::{}", ident(name), prop),
            ExprKind::Ident {
                name,
                resolution: Resolution::Builtin,
            } => return format!("js::{}.{}", name, prop),
            _ => {}
        }

        let ty = object.ty_or_dynamic().unwrap_nullable();
        if property == "length" && (ty.is_text() || ty.element_type().is_some()) {
            return format!("{}.length()", self.expr(object));
        }
        if matches!(ty, TypeDescriptor::DynamicFallback | TypeDescriptor::Object { name: None, .. }) {
            return format!("{}[\"{}\"]", self.expr(object), property);
        }
        let (text, op) = self.access(object);
        format!("{}{}{}", text, op, prop)
    }

    /// Object text and the member operator its ownership category needs.
    fn access(&self, object: &Expr) -> (String, &'static str) {
        if let Some(id) = object.binding() {
            let op = match self.ctx.memory(id) {
                MemoryAnnotation::Weak => ".lock()->",
                MemoryAnnotation::Value => ".",
                _ if self.ctx.binding_ty(id).is_heap_class() => "->",
                _ => ".",
            };
            return (self.target(object), op);
        }
        let op = if object.ty_or_dynamic().is_heap_class() { "->" } else { "." };
        (self.expr(object), op)
    }

    fn index(&self, object: &Expr, index: &Expr) -> String {
        let ty = object.ty_or_dynamic().unwrap_nullable();
        let index_text = if (ty.element_type().is_some() || ty.is_text()) && index.ty_or_dynamic().is_numeric() {
            format!("js::to_int32({})", self.expr(index))
        } else {
            self.expr(index)
        };
        let object_text = if ty.is_heap_class() {
            format!("(*{})", self.expr(object))
        } else {
            self.expr(object)
        };
        format!("{}[{}]", object_text, index_text)
    }

    fn call(&self, callee: &Expr, type_args: &[TypeDescriptor], args: &[Expr]) -> String {
        let args_text = self.list(args);
        let targs = if type_args.is_empty() {
            String::new()
        } else {
            let names: Vec<String> = type_args.iter().map(|t| self.ctx.type_name(t)).collect();
            format!("<{}>", names.join(", "))
        };
        format!("{}{}({})", self.expr(callee), targs, args_text)
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn binary(&self, op: BinaryOperator, left: &Expr, right: &Expr) -> String {
        use BinaryOperator::*;
        let l = self.expr(left);
        let r = self.expr(right);
        let both_bool = left.ty_or_dynamic().is_boolean() && right.ty_or_dynamic().is_boolean();
        match op {
            Add => format!("({} + {})", l, r),
            Subtract => format!("({} - {})", l, r),
            Multiply => format!("({} * {})", l, r),
            Divide => format!("({} / {})", l, r),
            Modulo => format!("std::fmod({}, {})", l, r),
            Exponent => format!("std::pow({}, {})", l, r),
            Equal | StrictEqual => format!("({} == {})", l, r),
            NotEqual | StrictNotEqual => format!("({} != {})", l, r),
            LessThan => format!("({} < {})", l, r),
            LessEqual => format!("({} <= {})", l, r),
            GreaterThan => format!("({} > {})", l, r),
            GreaterEqual => format!("({} >= {})", l, r),
            LogicalAnd if both_bool => format!("({} && {})", l, r),
            LogicalOr if both_bool => format!("({} || {})", l, r),
            LogicalAnd => format!("js::logical_and({}, {})", l, r),
            LogicalOr => format!("js::logical_or({}, {})", l, r),
            NullishCoalescing => format!("js::coalesce({}, {})", l, r),
            BitwiseAnd => format!("(js::to_int32({}) & js::to_int32({}))", l, r),
            BitwiseOr => format!("(js::to_int32({}) | js::to_int32({}))", l, r),
            BitwiseXor => format!("(js::to_int32({}) ^ js::to_int32({}))", l, r),
            LeftShift => format!("(js::to_int32({}) << (js::to_int32({}) & 31))", l, r),
            RightShift => format!("(js::to_int32({}) >> (js::to_int32({}) & 31))", l, r),
            UnsignedRightShift => format!("(js::to_uint32({}) >> (js::to_int32({}) & 31))", l, r),
            InstanceOf => format!("js::instanceof<{}>({})", self.instance_type(right), l),
            In => format!("js::in({}, {})", l, r),
        }
    }

    /// Class named on the right of `instanceof`.
    fn instance_type(&self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Ident {
                name,
                resolution: Resolution::Class,
            }
            | ExprKind::Ident {
                name,
                resolution: Resolution::Imported,
            } => self.ctx.namer.class_type(name, &[]),
            ExprKind::Ident {
                name,
                resolution: Resolution::Builtin,
            } => format!("js::{}", name),
            _ => format!("decltype({})", self.expr(expr)),
        }
    }

    fn unary(&self, op: UnaryOperator, operand: &Expr) -> String {
        let v = self.expr(operand);
        match op {
            UnaryOperator::Minus => format!("(-{})", v),
            UnaryOperator::Plus if operand.ty_or_dynamic().is_numeric() => v,
            UnaryOperator::Plus => format!("js::to_number({})", v),
            UnaryOperator::Not if operand.ty_or_dynamic().is_boolean() => format!("(!{})", v),
            UnaryOperator::Not => format!("(!js::truthy({}))", v),
            UnaryOperator::BitwiseNot => format!("(~js::to_int32({}))", v),
            UnaryOperator::Typeof => format!("js::typeof_op({})", v),
            UnaryOperator::Void => format!("(static_cast<void>({}), js::undefined)", v),
            UnaryOperator::Delete => format!("js::remove({})", v),
        }
    }

    fn assign(&self, op: AssignmentOperator, target: &Expr, value: &Expr) -> String {
        use AssignmentOperator::*;
        let t = self.target(target);
        let into = target.binding().map_or(MemoryAnnotation::Shared, |id| self.ctx.memory(id));
        let v = self.moved(value, into);
        match op {
            Assign => format!("{} = {}", t, v),
            AddAssign => format!("{} += {}", t, v),
            SubtractAssign => format!("{} -= {}", t, v),
            MultiplyAssign => format!("{} *= {}", t, v),
            DivideAssign => format!("{} /= {}", t, v),
            ModuloAssign => format!("{t} = std::fmod({t}, {v})"),
            ExponentAssign => format!("{t} = std::pow({t}, {v})"),
            BitwiseAndAssign => format!("{t} = (js::to_int32({t}) & js::to_int32({v}))"),
            BitwiseOrAssign => format!("{t} = (js::to_int32({t}) | js::to_int32({v}))"),
            BitwiseXorAssign => format!("{t} = (js::to_int32({t}) ^ js::to_int32({v}))"),
            LeftShiftAssign => format!("{t} = (js::to_int32({t}) << (js::to_int32({v}) & 31))"),
            RightShiftAssign => format!("{t} = (js::to_int32({t}) >> (js::to_int32({v}) & 31))"),
            NullishAssign => format!("{t} = js::coalesce({t}, {v})"),
            LogicalAndAssign => format!("{t} = js::logical_and({t}, {v})"),
            LogicalOrAssign => format!("{t} = js::logical_or({t}, {v})"),
        }
    }

    // ========================================================================
    // Literals and constructions
    // ========================================================================

    fn template(&self, quasis: &[String], exprs: &[Expr]) -> String {
        let mut parts = Vec::new();
        for (i, quasi) in quasis.iter().enumerate() {
            if !quasi.is_empty() {
                parts.push(string_literal(quasi));
            }
            if let Some(e) = exprs.get(i) {
                if e.ty_or_dynamic().is_text() {
                    parts.push(self.expr(e));
                } else {
                    parts.push(format!("js::toString({})", self.expr(e)));
                }
            }
        }
        match parts.len() {
            0 => string_literal(""),
            1 => parts.remove(0),
            _ => format!("({})", parts.join(" + ")),
        }
    }

    fn object(&self, expr: &Expr, props: &[(String, Expr)]) -> String {
        let ty = expr.ty_or_dynamic().unwrap_nullable();
        match ty {
            TypeDescriptor::Object {
                name: Some(_),
                fields,
            } => {
                let name = self.ctx.type_name(ty);
                let value = |field: &str| props.iter().find(|(k, _)| k == field).map(|(_, v)| self.expr(v));
                if self.ctx.cxx20() {
                    let inits: Vec<String> = fields
                        .iter()
                        .filter_map(|f| value(&f.name).map(|v| format!(".{} = {}", ident(&f.name), v)))
                        .collect();
                    format!("{}{{{}}}", name, inits.join(", "))
                } else {
                    let inits: Vec<String> = fields
                        .iter()
                        .map(|f| value(&f.name).unwrap_or_else(|| "{}".to_string()))
                        .collect();
                    format!("{}{{{}}}", name, inits.join(", "))
                }
            }
            TypeDescriptor::Generic { .. } => {
                let values: Vec<String> = props.iter().map(|(_, v)| self.expr(v)).collect();
                format!("{}{{{}}}", self.ctx.type_name(ty), values.join(", "))
            }
            _ => {
                let entries: Vec<String> = props
                    .iter()
                    .map(|(k, v)| format!("{{{}, js::any({})}}", string_literal(k), self.expr(v)))
                    .collect();
                format!("js::object{{{}}}", entries.join(", "))
            }
        }
    }

    fn construct(&self, expr: &Expr) -> String {
        let ExprKind::Construct {
            class,
            type_args,
            args,
            ownership,
            builtin,
        } = &expr.kind
        else {
            return self.expr(expr);
        };
        let args = self.list(args);
        if *builtin {
            let ty = expr.ty_or_dynamic();
            let name = if ty.is_dynamic() {
                format!("js::{}", class)
            } else {
                self.ctx.type_name(ty)
            };
            return format!("{}({})", name, args);
        }
        let class = self.ctx.namer.class_type(class, type_args);
        match ownership {
            MemoryAnnotation::Unique => format!("std::make_unique<{}>({})", class, args),
            MemoryAnnotation::Value => format!("{}({})", class, args),
            _ => format!("std::make_shared<{}>({})", class, args),
        }
    }

    fn base_name(&self) -> String {
        self.class
            .and_then(|c| self.ctx.base_type(c))
            .unwrap_or_else(|| "super".to_string())
    }

    /// `this` used as a value: the owning pointer of the current object.
    fn this_value(&self) -> String {
        let Some(class) = self.class else {
            return "this".to_string();
        };
        if self.ctx.hierarchy.is_root(class) {
            "shared_from_this()".to_string()
        } else {
            let args: Vec<TypeDescriptor> = class
                .type_params
                .iter()
                .map(|t| TypeDescriptor::TypeParam(t.name.clone()))
                .collect();
            format!(
                "std::static_pointer_cast<{}>(shared_from_this())",
                self.ctx.namer.class_type(&class.name, &args)
            )
        }
    }

    fn lambda(&self, lambda: &Lambda) -> String {
        let capture = if lambda.in_method && self.ctx.cxx20() { "[=, this]" } else { "[=]" };
        let params: Vec<String> = lambda
            .params
            .iter()
            .map(|p| {
                let name = self.ctx.binding_name(p.binding);
                if p.is_rest {
                    format!("auto... {}_pack", name)
                } else {
                    let decl = self.ctx.param_decl(p);
                    match &p.default {
                        Some(d) => format!("{} = {}", decl, self.expr(d)),
                        None => decl,
                    }
                }
            })
            .collect();
        let coroutine = lambda.is_async && self.ctx.cxx20();
        let ret = self.ctx.return_type(&lambda.ret, lambda.is_async);
        let value_ret = lambda.ret.awaited();

        let body = self.nested_block(coroutine, |b| {
            for line in b.ctx.param_prologue(&lambda.params) {
                b.line(&line);
            }
            match &lambda.body {
                LambdaBody::Block(block) => b.stmts(&block.stmts),
                LambdaBody::Expr(value) => {
                    let keyword = if coroutine { "co_return" } else { "return" };
                    let text = if value_ret.is_void() {
                        format!("{};", b.expr(value))
                    } else {
                        format!("{} {};", keyword, b.expr(value))
                    };
                    b.line(&text);
                }
            }
            if coroutine && value_ret.is_void() {
                b.line("co_return;");
            }
        });
        format!("{}({}) -> {} {}", capture, params.join(", "), ret, body)
    }
}

// ============================================================================
// Literals
// ============================================================================

pub(crate) fn literal(lit: &Literal) -> String {
    match lit {
        Literal::Number(n) => format!("js::number({})", number(*n)),
        Literal::String(s) => string_literal(s),
        Literal::Boolean(b) => b.to_string(),
        Literal::Null => "js::null".to_string(),
        Literal::Undefined => "js::undefined".to_string(),
        Literal::BigInt(digits) => format!("js::bigint(\"{}\")", digits),
    }
}

fn number(n: f64) -> String {
    if n.is_nan() {
        "js::NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{}js::Infinity", sign)
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{:?}", n)
    }
}

/// `"..."_S` with C++ escapes.
pub(crate) fn string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push_str("\"_S");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_literals() {
        assert_eq!(literal(&Literal::Number(42.0)), "js::number(42)");
        assert_eq!(literal(&Literal::Number(-3.0)), "js::number(-3)");
        assert_eq!(literal(&Literal::Number(0.5)), "js::number(0.5)");
        assert_eq!(literal(&Literal::Number(f64::NAN)), "js::number(js::NaN)");
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(string_literal("hi"), "\"hi\"_S");
        assert_eq!(string_literal("a\"b\\c\n"), "\"a\\\"b\\\\c\\n\"_S");
        assert_eq!(string_literal("\u{1}"), "\"\\x01\"_S");
    }

    #[test]
    fn test_other_literals() {
        assert_eq!(literal(&Literal::Boolean(true)), "true");
        assert_eq!(literal(&Literal::Null), "js::null");
        assert_eq!(literal(&Literal::BigInt("12".into())), "js::bigint(\"12\")");
    }
}
