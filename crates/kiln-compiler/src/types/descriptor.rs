//! Resolved type model
//!
//! A [`TypeDescriptor`] is what the resolver produces from an annotation or
//! an initializer and what the code generator turns into C++ type names.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Number,
    String,
    Boolean,
    Void,
    Null,
    Undefined,
    BigInt,
    Never,
}

impl PrimitiveType {
    /// Keyword spelling in source programs.
    pub fn source_name(&self) -> &'static str {
        match self {
            PrimitiveType::Number => "number",
            PrimitiveType::String => "string",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Void => "void",
            PrimitiveType::Null => "null",
            PrimitiveType::Undefined => "undefined",
            PrimitiveType::BigInt => "bigint",
            PrimitiveType::Never => "never",
        }
    }

    pub fn is_text_like(&self) -> bool {
        matches!(self, PrimitiveType::String)
    }

    pub fn is_numeric_like(&self) -> bool {
        matches!(self, PrimitiveType::Number | PrimitiveType::BigInt)
    }

    pub fn is_boolean_like(&self) -> bool {
        matches!(self, PrimitiveType::Boolean)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, PrimitiveType::Null | PrimitiveType::Undefined)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: TypeDescriptor,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamDescriptor {
    pub name: String,
    /// For rest parameters, the element type.
    pub ty: TypeDescriptor,
    pub is_rest: bool,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSignature {
    pub params: Vec<ParamDescriptor>,
    pub ret: Box<TypeDescriptor>,
}

impl FunctionSignature {
    pub fn rest(&self) -> Option<&ParamDescriptor> {
        self.params.last().filter(|p| p.is_rest)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Primitive(PrimitiveType),
    Array(Box<TypeDescriptor>),
    Tuple(Vec<TypeDescriptor>),
    /// Named shapes come from property-only interfaces and emit as structs;
    /// anonymous shapes emit as the dynamic object type.
    Object {
        name: Option<String>,
        fields: Vec<FieldDescriptor>,
    },
    Function(FunctionSignature),
    /// Only ever a text + numeric pair; see the resolver's union rule.
    Union(Vec<TypeDescriptor>),
    Intersection(Vec<TypeDescriptor>),
    /// Library generic (`Promise<T>`, `Map<K, V>`) or generic shape.
    Generic {
        name: String,
        args: Vec<TypeDescriptor>,
    },
    Nullable(Box<TypeDescriptor>),
    /// Heap-allocated class instance (also interfaces with methods).
    ClassRef {
        name: String,
        args: Vec<TypeDescriptor>,
    },
    TypeParam(String),
    DynamicFallback,
}

/// Branch position of a type in overload dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DispatchCategory {
    Text,
    Numeric,
    Boolean,
    Other,
}

impl TypeDescriptor {
    pub fn number() -> Self {
        TypeDescriptor::Primitive(PrimitiveType::Number)
    }

    pub fn string() -> Self {
        TypeDescriptor::Primitive(PrimitiveType::String)
    }

    pub fn boolean() -> Self {
        TypeDescriptor::Primitive(PrimitiveType::Boolean)
    }

    pub fn void() -> Self {
        TypeDescriptor::Primitive(PrimitiveType::Void)
    }

    pub fn class(name: impl Into<String>) -> Self {
        TypeDescriptor::ClassRef {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn array_of(elem: TypeDescriptor) -> Self {
        TypeDescriptor::Array(Box::new(elem))
    }

    /// `T | null` with the degenerate cases folded.
    pub fn nullable(inner: TypeDescriptor) -> Self {
        match inner {
            TypeDescriptor::DynamicFallback => TypeDescriptor::DynamicFallback,
            TypeDescriptor::Nullable(_) => inner,
            other => TypeDescriptor::Nullable(Box::new(other)),
        }
    }

    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            TypeDescriptor::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn is_primitive(&self, p: PrimitiveType) -> bool {
        self.as_primitive() == Some(p)
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, TypeDescriptor::DynamicFallback)
    }

    pub fn is_void(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Primitive(PrimitiveType::Void | PrimitiveType::Never)
        )
    }

    pub fn is_boolean(&self) -> bool {
        self.is_primitive(PrimitiveType::Boolean)
    }

    pub fn is_text(&self) -> bool {
        self.as_primitive().map_or(false, |p| p.is_text_like())
    }

    pub fn is_numeric(&self) -> bool {
        self.as_primitive().map_or(false, |p| p.is_numeric_like())
    }

    /// Object shapes, class instances and generic shapes.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Object { .. } | TypeDescriptor::ClassRef { .. } | TypeDescriptor::Generic { .. }
        )
    }

    /// Class name for class instances, nullable or not.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            TypeDescriptor::ClassRef { name, .. } => Some(name),
            TypeDescriptor::Nullable(inner) => inner.class_name(),
            _ => None,
        }
    }

    pub fn is_heap_class(&self) -> bool {
        self.class_name().is_some()
    }

    /// Anything that is not a class instance lives by value.
    pub fn is_value_typed(&self) -> bool {
        !self.is_heap_class()
    }

    pub fn unwrap_nullable(&self) -> &TypeDescriptor {
        match self {
            TypeDescriptor::Nullable(inner) => inner,
            other => other,
        }
    }

    pub fn element_type(&self) -> Option<&TypeDescriptor> {
        match self {
            TypeDescriptor::Array(elem) => Some(elem),
            _ => None,
        }
    }

    /// The text + numeric union.
    pub fn is_text_numeric_union(&self) -> bool {
        match self {
            TypeDescriptor::Union(members) if members.len() == 2 => {
                members.iter().any(|m| m.is_text()) && members.iter().any(|m| m.is_numeric())
            }
            _ => false,
        }
    }

    pub fn dispatch_category(&self) -> DispatchCategory {
        if self.is_text() {
            DispatchCategory::Text
        } else if self.is_numeric() {
            DispatchCategory::Numeric
        } else if self.is_boolean() {
            DispatchCategory::Boolean
        } else {
            DispatchCategory::Other
        }
    }

    /// Unwrap `Promise<T>` to `T`.
    pub fn awaited(&self) -> TypeDescriptor {
        match self {
            TypeDescriptor::Generic { name, args } if name == "Promise" => {
                args.first().cloned().unwrap_or(TypeDescriptor::DynamicFallback)
            }
            other => other.clone(),
        }
    }

    pub fn contains_type_param(&self) -> bool {
        match self {
            TypeDescriptor::TypeParam(_) => true,
            TypeDescriptor::Array(e) | TypeDescriptor::Nullable(e) => e.contains_type_param(),
            TypeDescriptor::Tuple(items)
            | TypeDescriptor::Union(items)
            | TypeDescriptor::Intersection(items) => items.iter().any(|i| i.contains_type_param()),
            TypeDescriptor::Generic { args, .. } | TypeDescriptor::ClassRef { args, .. } => {
                args.iter().any(|a| a.contains_type_param())
            }
            TypeDescriptor::Object { fields, .. } => fields.iter().any(|f| f.ty.contains_type_param()),
            TypeDescriptor::Function(sig) => {
                sig.ret.contains_type_param() || sig.params.iter().any(|p| p.ty.contains_type_param())
            }
            TypeDescriptor::Primitive(_) | TypeDescriptor::DynamicFallback => false,
        }
    }
}

fn list(f: &mut fmt::Formatter<'_>, items: &[TypeDescriptor], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Source-like spelling, for diagnostics and IR dumps.
impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Primitive(p) => f.write_str(p.source_name()),
            TypeDescriptor::Array(elem) => write!(f, "{elem}[]"),
            TypeDescriptor::Tuple(items) => {
                f.write_str("[")?;
                list(f, items, ", ")?;
                f.write_str("]")
            }
            TypeDescriptor::Object { name: Some(name), .. } => f.write_str(name),
            TypeDescriptor::Object { name: None, fields } => {
                f.write_str("{")?;
                for (i, field) in fields.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{sep}{}: {}", field.name, field.ty)?;
                }
                f.write_str(" }")
            }
            TypeDescriptor::Function(sig) => {
                f.write_str("(")?;
                for (i, p) in sig.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if p.is_rest {
                        write!(f, "...{}: {}[]", p.name, p.ty)?;
                    } else {
                        write!(f, "{}: {}", p.name, p.ty)?;
                    }
                }
                write!(f, ") => {}", sig.ret)
            }
            TypeDescriptor::Union(items) => list(f, items, " | "),
            TypeDescriptor::Intersection(items) => list(f, items, " & "),
            TypeDescriptor::Generic { name, args } | TypeDescriptor::ClassRef { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    list(f, args, ", ")?;
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeDescriptor::Nullable(inner) => write!(f, "{inner} | null"),
            TypeDescriptor::TypeParam(name) => f.write_str(name),
            TypeDescriptor::DynamicFallback => f.write_str("any"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullable_folds() {
        assert_eq!(
            TypeDescriptor::nullable(TypeDescriptor::DynamicFallback),
            TypeDescriptor::DynamicFallback
        );
        let once = TypeDescriptor::nullable(TypeDescriptor::number());
        assert_eq!(TypeDescriptor::nullable(once.clone()), once);
    }

    #[test]
    fn test_class_name_sees_through_nullable() {
        let ty = TypeDescriptor::nullable(TypeDescriptor::class("Node"));
        assert_eq!(ty.class_name(), Some("Node"));
        assert!(ty.is_heap_class());
        assert!(TypeDescriptor::array_of(TypeDescriptor::class("Node")).is_value_typed());
    }

    #[test]
    fn test_dispatch_categories_order() {
        let mut cats = vec![
            TypeDescriptor::boolean().dispatch_category(),
            TypeDescriptor::class("A").dispatch_category(),
            TypeDescriptor::number().dispatch_category(),
            TypeDescriptor::string().dispatch_category(),
        ];
        cats.sort();
        assert_eq!(
            cats,
            vec![
                DispatchCategory::Text,
                DispatchCategory::Numeric,
                DispatchCategory::Boolean,
                DispatchCategory::Other
            ]
        );
    }

    #[test]
    fn test_display() {
        let sig = TypeDescriptor::Function(FunctionSignature {
            params: vec![ParamDescriptor {
                name: "xs".into(),
                ty: TypeDescriptor::number(),
                is_rest: true,
                optional: false,
            }],
            ret: Box::new(TypeDescriptor::void()),
        });
        assert_eq!(sig.to_string(), "(...xs: number[]) => void");
        let union = TypeDescriptor::Union(vec![TypeDescriptor::string(), TypeDescriptor::number()]);
        assert_eq!(union.to_string(), "string | number");
        assert!(union.is_text_numeric_union());
    }

    #[test]
    fn test_awaited_unwraps_promise() {
        let p = TypeDescriptor::Generic {
            name: "Promise".into(),
            args: vec![TypeDescriptor::string()],
        };
        assert_eq!(p.awaited(), TypeDescriptor::string());
        assert_eq!(TypeDescriptor::number().awaited(), TypeDescriptor::number());
    }
}
