//! IR node families
//!
//! Three closed families mirror the source tree: [`Stmt`], [`Expr`] and
//! [`Decl`]. Each node owns its children, carries the span it came from and
//! an optional resolved type.

use super::binding::{BindingId, MemoryAnnotation};
use crate::types::TypeDescriptor;
use kiln_syntax::ast::{AssignmentOperator, BinaryOperator, UnaryOperator, UpdateOperator, Visibility};
use kiln_syntax::Span;

static DYNAMIC: TypeDescriptor = TypeDescriptor::DynamicFallback;

// ============================================================================
// Module body
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum IrNode {
    Stmt(Stmt),
    Decl(Decl),
}

impl IrNode {
    pub fn span(&self) -> Span {
        match self {
            IrNode::Stmt(s) => s.span,
            IrNode::Decl(d) => d.span,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            IrNode::Stmt(s) => s.kind.kind_name(),
            IrNode::Decl(d) => d.kind.kind_name(),
        }
    }

    pub fn ty(&self) -> Option<&TypeDescriptor> {
        match self {
            IrNode::Stmt(s) => s.ty.as_ref(),
            IrNode::Decl(d) => d.ty.as_ref(),
        }
    }
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
    pub ty: Option<TypeDescriptor>,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span, ty: None }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclarator {
    pub binding: BindingId,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub binding: Option<BindingId>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Block(Block),
    If {
        test: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Expr,
    },
    For {
        init: Option<Box<Stmt>>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    /// `for..of`; with `keys` set, iterates property names (`for..in`).
    ForOf {
        binding: BindingId,
        iterable: Expr,
        body: Box<Stmt>,
        keys: bool,
    },
    Try {
        body: Block,
        catch: Option<CatchClause>,
        finally: Option<Block>,
    },
    Throw(Expr),
    Return(Option<Expr>),
    Break,
    Continue,
    VarDecl(Vec<VarDeclarator>),
    Expr(Expr),
    /// Stands in for a construct with no transform rule.
    Placeholder {
        kind: String,
    },
}

impl StmtKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            StmtKind::Block(_) => "block",
            StmtKind::If { .. } => "if",
            StmtKind::While { .. } => "while",
            StmtKind::DoWhile { .. } => "do-while",
            StmtKind::For { .. } => "for",
            StmtKind::ForOf { .. } => "for-of",
            StmtKind::Try { .. } => "try",
            StmtKind::Throw(_) => "throw",
            StmtKind::Return(_) => "return",
            StmtKind::Break => "break",
            StmtKind::Continue => "continue",
            StmtKind::VarDecl(_) => "var-decl",
            StmtKind::Expr(_) => "expr",
            StmtKind::Placeholder { .. } => "placeholder",
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub ty: Option<TypeDescriptor>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span, ty: Option<TypeDescriptor>) -> Self {
        Self { kind, span, ty }
    }

    /// Resolved type, dynamic when unknown.
    pub fn ty_or_dynamic(&self) -> &TypeDescriptor {
        self.ty.as_ref().unwrap_or(&DYNAMIC)
    }

    pub fn is_this(&self) -> bool {
        matches!(self.kind, ExprKind::This)
    }

    /// Binding named by an identifier or a field access.
    pub fn binding(&self) -> Option<BindingId> {
        match &self.kind {
            ExprKind::Ident {
                resolution: Resolution::Binding(id),
                ..
            } => Some(*id),
            ExprKind::Member { field, .. } => *field,
            _ => None,
        }
    }
}

/// What an identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Binding(BindingId),
    Function,
    Class,
    Namespace,
    /// Runtime library global (`console`, `Math`, ...).
    Builtin,
    /// Imported from another unit.
    Imported,
    /// Unresolved; assumed to be provided elsewhere.
    External,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
    Undefined,
    BigInt(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub binding: BindingId,
    pub default: Option<Expr>,
    pub is_rest: bool,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub params: Vec<Param>,
    pub ret: TypeDescriptor,
    pub body: LambdaBody,
    pub is_async: bool,
    /// Defined inside a method body, so `this` is reachable.
    pub in_method: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Ident {
        name: String,
        resolution: Resolution,
    },
    Literal(Literal),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Call {
        callee: Box<Expr>,
        type_args: Vec<TypeDescriptor>,
        args: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: String,
        /// Field binding when the property is a known class field.
        field: Option<BindingId>,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Update {
        op: UpdateOperator,
        prefix: bool,
        target: Box<Expr>,
    },
    Assign {
        op: AssignmentOperator,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Template {
        quasis: Vec<String>,
        exprs: Vec<Expr>,
    },
    Construct {
        class: String,
        type_args: Vec<TypeDescriptor>,
        args: Vec<Expr>,
        /// Filled in by the memory analyzer.
        ownership: MemoryAnnotation,
        /// Runtime library type (`Map`, `Error`, ...).
        builtin: bool,
    },
    This,
    /// `super.name` inside a method.
    SuperMember {
        property: String,
    },
    Lambda(Box<Lambda>),
    Await(Box<Expr>),
    Placeholder {
        kind: String,
    },
}

impl ExprKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ExprKind::Ident { .. } => "ident",
            ExprKind::Literal(_) => "literal",
            ExprKind::Array(_) => "array",
            ExprKind::Object(_) => "object",
            ExprKind::Call { .. } => "call",
            ExprKind::Member { .. } => "member",
            ExprKind::Index { .. } => "index",
            ExprKind::Binary { .. } => "binary",
            ExprKind::Unary { .. } => "unary",
            ExprKind::Update { .. } => "update",
            ExprKind::Assign { .. } => "assign",
            ExprKind::Conditional { .. } => "conditional",
            ExprKind::Template { .. } => "template",
            ExprKind::Construct { .. } => "construct",
            ExprKind::This => "this",
            ExprKind::SuperMember { .. } => "super-member",
            ExprKind::Lambda(_) => "lambda",
            ExprKind::Await(_) => "await",
            ExprKind::Placeholder { .. } => "placeholder",
        }
    }
}

// ============================================================================
// Declarations
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub kind: DeclKind,
    pub span: Span,
    pub ty: Option<TypeDescriptor>,
}

impl Decl {
    pub fn new(kind: DeclKind, span: Span, ty: Option<TypeDescriptor>) -> Self {
        Self { kind, span, ty }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: String,
    pub constraint: Option<TypeDescriptor>,
    /// Informational only.
    pub is_const: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub ret: TypeDescriptor,
    /// Absent for overload signatures.
    pub body: Option<Block>,
    pub is_async: bool,
    pub is_exported: bool,
}

/// Authoring annotation carried to the emitted constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub name: String,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    /// `ClassRef` of the base class, with type arguments.
    pub superclass: Option<TypeDescriptor>,
    pub implements: Vec<String>,
    pub is_abstract: bool,
    /// Interface with methods, emitted as an abstract class.
    pub is_interface: bool,
    pub members: Vec<Decl>,
    pub metadata: Vec<Metadata>,
    pub is_exported: bool,
}

impl Class {
    pub fn superclass_name(&self) -> Option<&str> {
        self.superclass.as_ref().and_then(|s| s.class_name())
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.members.iter().filter_map(|m| match &m.kind {
            DeclKind::Method(method) => Some(method),
            _ => None,
        })
    }

    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.members.iter().filter_map(|m| match &m.kind {
            DeclKind::Property(p) => Some(p),
            _ => None,
        })
    }

    pub fn constructor(&self) -> Option<&Method> {
        self.methods().find(|m| m.kind == MethodKind::Constructor)
    }
}

/// Property-only interface, emitted as a plain struct.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub fields: Vec<crate::types::FieldDescriptor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub binding: BindingId,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_readonly: bool,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Constructor,
    Method,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub kind: MethodKind,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub ret: TypeDescriptor,
    pub body: Option<Block>,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_async: bool,
    /// Arguments of the leading `super(...)` call.
    pub super_args: Option<Vec<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Namespace {
    pub name: String,
    pub body: Vec<IrNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    Function(Function),
    Class(Class),
    Interface(Shape),
    Property(Property),
    Method(Method),
    Namespace(Namespace),
}

impl DeclKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            DeclKind::Function(_) => "function",
            DeclKind::Class(_) => "class",
            DeclKind::Interface(_) => "interface",
            DeclKind::Property(_) => "property",
            DeclKind::Method(_) => "method",
            DeclKind::Namespace(_) => "namespace",
        }
    }
}
