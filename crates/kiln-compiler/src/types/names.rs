//! Target type names
//!
//! Maps descriptors onto the runtime library's C++ spelling. Class instances
//! are heap objects; the ownership category of the binding picks the smart
//! pointer around them.

use super::descriptor::{FunctionSignature, PrimitiveType, TypeDescriptor};
use super::registry::TypeRegistry;
use crate::ir::MemoryAnnotation;
use std::collections::BTreeMap;

pub const STRING_OR_NUMBER: &str = "js::typed::StringOrNumber";
pub const DYNAMIC: &str = "js::any";

#[derive(Clone, Copy)]
pub struct TypeNamer<'a> {
    registry: &'a TypeRegistry,
    overrides: &'a BTreeMap<String, String>,
}

impl<'a> TypeNamer<'a> {
    pub fn new(registry: &'a TypeRegistry, overrides: &'a BTreeMap<String, String>) -> Self {
        Self { registry, overrides }
    }

    pub fn primitive(&self, p: PrimitiveType) -> String {
        if let Some(name) = self.overrides.get(p.source_name()) {
            return name.clone();
        }
        match p {
            PrimitiveType::Number => "js::number",
            PrimitiveType::String => "js::string",
            PrimitiveType::Boolean => "bool",
            PrimitiveType::Void | PrimitiveType::Never => "void",
            PrimitiveType::Null => "js::null_t",
            PrimitiveType::Undefined => "js::undefined_t",
            PrimitiveType::BigInt => "js::bigint",
        }
        .to_string()
    }

    fn args(&self, args: &[TypeDescriptor]) -> String {
        if args.is_empty() {
            return String::new();
        }
        let names: Vec<String> = args.iter().map(|a| self.name(a)).collect();
        format!("<{}>", names.join(", "))
    }

    /// Bare class type (`Node`, `Geo::Point`, `Box<js::number>`).
    pub fn class_type(&self, name: &str, args: &[TypeDescriptor]) -> String {
        if let Some(over) = self.overrides.get(name) {
            return over.clone();
        }
        format!("{}{}", self.registry.qualified_name(name), self.args(args))
    }

    pub fn signature(&self, sig: &FunctionSignature) -> String {
        let params: Vec<String> = sig
            .params
            .iter()
            .map(|p| {
                if p.is_rest {
                    format!("js::array<{}>", self.name(&p.ty))
                } else {
                    self.name(&p.ty)
                }
            })
            .collect();
        format!("std::function<{}({})>", self.name(&sig.ret), params.join(", "))
    }

    /// Name of a type in value position: parameters, returns, container
    /// elements. Class instances appear as shared pointers.
    pub fn name(&self, ty: &TypeDescriptor) -> String {
        match ty {
            TypeDescriptor::Primitive(p) => self.primitive(*p),
            TypeDescriptor::Array(elem) => format!("js::array<{}>", self.name(elem)),
            TypeDescriptor::Tuple(items) => {
                let names: Vec<String> = items.iter().map(|i| self.name(i)).collect();
                format!("std::tuple<{}>", names.join(", "))
            }
            TypeDescriptor::Object { name: Some(name), .. } => self.class_type(name, &[]),
            TypeDescriptor::Object { name: None, .. } => "js::object".to_string(),
            TypeDescriptor::Function(sig) => self.signature(sig),
            TypeDescriptor::Union(_) if ty.is_text_numeric_union() => STRING_OR_NUMBER.to_string(),
            TypeDescriptor::Union(_) | TypeDescriptor::Intersection(_) => DYNAMIC.to_string(),
            TypeDescriptor::Generic { name, args } => self.generic(name, args),
            TypeDescriptor::Nullable(inner) if inner.is_heap_class() => self.name(inner),
            TypeDescriptor::Nullable(inner) => format!("js::typed::Nullable<{}>", self.name(inner)),
            TypeDescriptor::ClassRef { name, args } => {
                format!("std::shared_ptr<{}>", self.class_type(name, args))
            }
            TypeDescriptor::TypeParam(name) => name.clone(),
            TypeDescriptor::DynamicFallback => DYNAMIC.to_string(),
        }
    }

    fn generic(&self, name: &str, args: &[TypeDescriptor]) -> String {
        if let Some(over) = self.overrides.get(name) {
            return format!("{}{}", over, self.args(args));
        }
        match name {
            "Promise" | "Map" | "Set" => format!("js::{}{}", name, self.args(args)),
            "Record" => "js::object".to_string(),
            "Error" | "Date" | "RegExp" => format!("js::{}", name),
            _ => self.class_type(name, args),
        }
    }

    /// Declared type of a binding with the given ownership category.
    pub fn binding_type(&self, ty: &TypeDescriptor, memory: MemoryAnnotation) -> String {
        let pointee = match ty.unwrap_nullable() {
            TypeDescriptor::ClassRef { name, args } => self.class_type(name, args),
            _ => self.name(ty),
        };
        match memory {
            MemoryAnnotation::Auto => self.name(ty),
            MemoryAnnotation::Value => pointee,
            MemoryAnnotation::Shared => format!("std::shared_ptr<{}>", pointee),
            MemoryAnnotation::Unique => format!("std::unique_ptr<{}>", pointee),
            MemoryAnnotation::Weak => format!("std::weak_ptr<{}>", pointee),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::descriptor::ParamDescriptor;

    fn namer_with<'a>(reg: &'a TypeRegistry, over: &'a BTreeMap<String, String>) -> TypeNamer<'a> {
        TypeNamer::new(reg, over)
    }

    #[test]
    fn test_primitive_names() {
        let reg = TypeRegistry::new();
        let over = BTreeMap::new();
        let n = namer_with(&reg, &over);
        assert_eq!(n.name(&TypeDescriptor::number()), "js::number");
        assert_eq!(n.name(&TypeDescriptor::string()), "js::string");
        assert_eq!(n.name(&TypeDescriptor::boolean()), "bool");
        assert_eq!(n.name(&TypeDescriptor::void()), "void");
    }

    #[test]
    fn test_override_wins() {
        let reg = TypeRegistry::new();
        let mut over = BTreeMap::new();
        over.insert("number".to_string(), "double".to_string());
        over.insert("Date".to_string(), "std::tm".to_string());
        let n = namer_with(&reg, &over);
        assert_eq!(n.name(&TypeDescriptor::array_of(TypeDescriptor::number())), "js::array<double>");
        let date = TypeDescriptor::Generic {
            name: "Date".into(),
            args: vec![],
        };
        assert_eq!(n.name(&date), "std::tm");
    }

    #[test]
    fn test_union_and_nullable_names() {
        let reg = TypeRegistry::new();
        let over = BTreeMap::new();
        let n = namer_with(&reg, &over);
        let union = TypeDescriptor::Union(vec![TypeDescriptor::string(), TypeDescriptor::number()]);
        assert_eq!(n.name(&union), STRING_OR_NUMBER);
        assert_eq!(
            n.name(&TypeDescriptor::nullable(TypeDescriptor::string())),
            "js::typed::Nullable<js::string>"
        );
        assert_eq!(
            n.name(&TypeDescriptor::nullable(TypeDescriptor::class("Node"))),
            "std::shared_ptr<Node>"
        );
    }

    #[test]
    fn test_binding_wrappers() {
        let reg = TypeRegistry::new();
        let over = BTreeMap::new();
        let n = namer_with(&reg, &over);
        let node = TypeDescriptor::class("Node");
        assert_eq!(n.binding_type(&node, MemoryAnnotation::Shared), "std::shared_ptr<Node>");
        assert_eq!(n.binding_type(&node, MemoryAnnotation::Unique), "std::unique_ptr<Node>");
        assert_eq!(n.binding_type(&node, MemoryAnnotation::Weak), "std::weak_ptr<Node>");
        assert_eq!(n.binding_type(&node, MemoryAnnotation::Value), "Node");
        assert_eq!(
            n.binding_type(&TypeDescriptor::number(), MemoryAnnotation::Value),
            "js::number"
        );
    }

    #[test]
    fn test_function_signature_name() {
        let reg = TypeRegistry::new();
        let over = BTreeMap::new();
        let n = namer_with(&reg, &over);
        let sig = TypeDescriptor::Function(FunctionSignature {
            params: vec![
                ParamDescriptor {
                    name: "a".into(),
                    ty: TypeDescriptor::string(),
                    is_rest: false,
                    optional: false,
                },
                ParamDescriptor {
                    name: "rest".into(),
                    ty: TypeDescriptor::number(),
                    is_rest: true,
                    optional: false,
                },
            ],
            ret: Box::new(TypeDescriptor::boolean()),
        });
        assert_eq!(
            n.name(&sig),
            "std::function<bool(js::string, js::array<js::number>)>"
        );
    }
}
