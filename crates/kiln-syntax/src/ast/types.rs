//! Type annotation nodes

use crate::Span;
use serde::{Deserialize, Serialize};

/// Type annotation as written by the author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAnnotation {
    pub ty: Type,
    #[serde(default)]
    pub span: Span,
}

impl TypeAnnotation {
    pub fn new(ty: Type, span: Span) -> Self {
        Self { ty, span }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    /// Keyword types: number, string, any, ...
    Primitive(PrimitiveKeyword),
    /// `Name` or `Name<Args>`
    Reference(TypeReference),
    /// `T[]`
    Array(Box<TypeAnnotation>),
    /// `[A, B]`
    Tuple(Vec<TypeAnnotation>),
    /// `A | B`
    Union(Vec<TypeAnnotation>),
    /// `A & B`
    Intersection(Vec<TypeAnnotation>),
    /// `(a: A, ...rest: B[]) => R`
    Function(FunctionType),
    /// `{ x: number; y?: string }`
    Object(Vec<ObjectTypeMember>),
    StringLiteral(String),
    NumberLiteral(f64),
    BooleanLiteral(bool),
    Parenthesized(Box<TypeAnnotation>),
    /// `keyof T`, mapped and conditional types, `typeof x`, ...
    Unsupported(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKeyword {
    Number,
    String,
    Boolean,
    Void,
    Null,
    Undefined,
    Any,
    Unknown,
    Never,
    #[serde(rename = "bigint")]
    BigInt,
    Object,
}

impl PrimitiveKeyword {
    pub fn keyword(&self) -> &'static str {
        match self {
            PrimitiveKeyword::Number => "number",
            PrimitiveKeyword::String => "string",
            PrimitiveKeyword::Boolean => "boolean",
            PrimitiveKeyword::Void => "void",
            PrimitiveKeyword::Null => "null",
            PrimitiveKeyword::Undefined => "undefined",
            PrimitiveKeyword::Any => "any",
            PrimitiveKeyword::Unknown => "unknown",
            PrimitiveKeyword::Never => "never",
            PrimitiveKeyword::BigInt => "bigint",
            PrimitiveKeyword::Object => "object",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeReference {
    pub name: String,
    #[serde(default)]
    pub type_args: Vec<TypeAnnotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionType {
    #[serde(default)]
    pub params: Vec<FunctionTypeParam>,
    pub return_type: Box<TypeAnnotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionTypeParam {
    #[serde(default)]
    pub name: Option<String>,
    pub ty: TypeAnnotation,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub is_rest: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectTypeMember {
    pub name: String,
    pub ty: TypeAnnotation,
    #[serde(default)]
    pub optional: bool,
}

impl std::fmt::Display for TypeAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ty)
    }
}

fn join(f: &mut std::fmt::Formatter<'_>, items: &[TypeAnnotation], sep: &str) -> std::fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Primitive(p) => f.write_str(p.keyword()),
            Type::Reference(r) => {
                f.write_str(&r.name)?;
                if !r.type_args.is_empty() {
                    f.write_str("<")?;
                    join(f, &r.type_args, ", ")?;
                    f.write_str(">")?;
                }
                Ok(())
            }
            Type::Array(elem) => write!(f, "{elem}[]"),
            Type::Tuple(items) => {
                f.write_str("[")?;
                join(f, items, ", ")?;
                f.write_str("]")
            }
            Type::Union(items) => join(f, items, " | "),
            Type::Intersection(items) => join(f, items, " & "),
            Type::Function(func) => {
                f.write_str("(")?;
                for (i, p) in func.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if p.is_rest {
                        f.write_str("...")?;
                    }
                    if let Some(name) = &p.name {
                        write!(f, "{name}: ")?;
                    }
                    write!(f, "{}", p.ty)?;
                }
                write!(f, ") => {}", func.return_type)
            }
            Type::Object(members) => {
                f.write_str("{ ")?;
                for m in members {
                    let opt = if m.optional { "?" } else { "" };
                    write!(f, "{}{}: {}; ", m.name, opt, m.ty)?;
                }
                f.write_str("}")
            }
            Type::StringLiteral(s) => write!(f, "{s:?}"),
            Type::NumberLiteral(n) => write!(f, "{n}"),
            Type::BooleanLiteral(b) => write!(f, "{b}"),
            Type::Parenthesized(inner) => write!(f, "({inner})"),
            Type::Unsupported(text) => f.write_str(text),
        }
    }
}
