//! Statement and declaration nodes

use super::*;
use crate::Span;
use serde::{Deserialize, Serialize};

/// Top-level or block-level statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// `let` / `const` / `var` with one or more declarators
    VariableDecl(VariableDecl),
    FunctionDecl(FunctionDecl),
    ClassDecl(ClassDecl),
    InterfaceDecl(InterfaceDecl),
    /// `type X = ...` (no runtime effect)
    TypeAliasDecl(TypeAliasDecl),
    /// `namespace X { ... }` / `module X { ... }`
    ModuleDecl(ModuleDecl),
    ImportDecl(ImportDecl),
    ExportDecl(ExportDecl),
    Expression(ExpressionStatement),
    Block(BlockStatement),
    If(IfStatement),
    While(WhileStatement),
    DoWhile(DoWhileStatement),
    For(ForStatement),
    ForOf(ForOfStatement),
    ForIn(ForInStatement),
    Return(ReturnStatement),
    Break(JumpStatement),
    Continue(JumpStatement),
    Throw(ThrowStatement),
    Try(TryStatement),
    Labeled(LabeledStatement),
    Empty(Span),
    /// A construct the front-end recognized but this vocabulary does not model.
    Unknown(UnknownNode),
}

impl Statement {
    /// Get the span of this statement
    pub fn span(&self) -> &Span {
        match self {
            Statement::VariableDecl(s) => &s.span,
            Statement::FunctionDecl(s) => &s.span,
            Statement::ClassDecl(s) => &s.span,
            Statement::InterfaceDecl(s) => &s.span,
            Statement::TypeAliasDecl(s) => &s.span,
            Statement::ModuleDecl(s) => &s.span,
            Statement::ImportDecl(s) => &s.span,
            Statement::ExportDecl(s) => &s.span,
            Statement::Expression(s) => &s.span,
            Statement::Block(s) => &s.span,
            Statement::If(s) => &s.span,
            Statement::While(s) => &s.span,
            Statement::DoWhile(s) => &s.span,
            Statement::For(s) => &s.span,
            Statement::ForOf(s) => &s.span,
            Statement::ForIn(s) => &s.span,
            Statement::Return(s) => &s.span,
            Statement::Break(s) | Statement::Continue(s) => &s.span,
            Statement::Throw(s) => &s.span,
            Statement::Try(s) => &s.span,
            Statement::Labeled(s) => &s.span,
            Statement::Empty(span) => span,
            Statement::Unknown(s) => &s.span,
        }
    }

    /// Short kind name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::VariableDecl(_) => "variable declaration",
            Statement::FunctionDecl(_) => "function declaration",
            Statement::ClassDecl(_) => "class declaration",
            Statement::InterfaceDecl(_) => "interface declaration",
            Statement::TypeAliasDecl(_) => "type alias",
            Statement::ModuleDecl(_) => "namespace",
            Statement::ImportDecl(_) => "import",
            Statement::ExportDecl(_) => "export",
            Statement::Expression(_) => "expression statement",
            Statement::Block(_) => "block",
            Statement::If(_) => "if statement",
            Statement::While(_) => "while loop",
            Statement::DoWhile(_) => "do-while loop",
            Statement::For(_) => "for loop",
            Statement::ForOf(_) => "for-of loop",
            Statement::ForIn(_) => "for-in loop",
            Statement::Return(_) => "return statement",
            Statement::Break(_) => "break statement",
            Statement::Continue(_) => "continue statement",
            Statement::Throw(_) => "throw statement",
            Statement::Try(_) => "try statement",
            Statement::Labeled(_) => "labeled statement",
            Statement::Empty(_) => "empty statement",
            Statement::Unknown(_) => "unknown statement",
        }
    }

    /// Check if this statement is a declaration
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            Statement::VariableDecl(_)
                | Statement::FunctionDecl(_)
                | Statement::ClassDecl(_)
                | Statement::InterfaceDecl(_)
                | Statement::TypeAliasDecl(_)
                | Statement::ModuleDecl(_)
        )
    }
}

/// Node kind outside the modelled vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownNode {
    pub kind: String,
    #[serde(default)]
    pub span: Span,
}

// ============================================================================
// Variable Declaration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Let,
    Const,
    Var,
}

/// `let a = 1, b: string = "x";`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub kind: VariableKind,
    pub declarations: Vec<VariableDeclarator>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclarator {
    pub name: Identifier,
    #[serde(default)]
    pub type_annotation: Option<TypeAnnotation>,
    #[serde(default)]
    pub initializer: Option<Expression>,
    #[serde(default)]
    pub span: Span,
}

// ============================================================================
// Functions
// ============================================================================

/// Function declaration. A missing body marks an overload signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: Identifier,
    #[serde(default)]
    pub type_params: Vec<TypeParameter>,
    #[serde(default)]
    pub params: Vec<Parameter>,
    #[serde(default)]
    pub return_type: Option<TypeAnnotation>,
    #[serde(default)]
    pub body: Option<BlockStatement>,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default)]
    pub decorators: Vec<Decorator>,
    #[serde(default)]
    pub span: Span,
}

// ============================================================================
// Classes
// ============================================================================

/// Name of the member that acts as a class constructor.
pub const CONSTRUCTOR_NAME: &str = "constructor";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: Identifier,
    #[serde(default)]
    pub type_params: Vec<TypeParameter>,
    /// Superclass name.
    #[serde(default)]
    pub extends: Option<Identifier>,
    /// Type arguments applied to the superclass (`extends Base<number>`).
    #[serde(default)]
    pub extends_type_args: Vec<TypeAnnotation>,
    #[serde(default)]
    pub implements: Vec<Identifier>,
    #[serde(default)]
    pub members: Vec<ClassMember>,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub decorators: Vec<Decorator>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClassMember {
    Property(PropertyDecl),
    /// Methods, including the one named [`CONSTRUCTOR_NAME`].
    Method(MethodDecl),
    /// Accessors, static blocks, index signatures.
    Unknown(UnknownNode),
}

impl ClassMember {
    pub fn span(&self) -> &Span {
        match self {
            ClassMember::Property(p) => &p.span,
            ClassMember::Method(m) => &m.span,
            ClassMember::Unknown(u) => &u.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub name: Identifier,
    #[serde(default)]
    pub type_annotation: Option<TypeAnnotation>,
    #[serde(default)]
    pub initializer: Option<Expression>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_readonly: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub decorators: Vec<Decorator>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: Identifier,
    #[serde(default)]
    pub type_params: Vec<TypeParameter>,
    #[serde(default)]
    pub params: Vec<Parameter>,
    #[serde(default)]
    pub return_type: Option<TypeAnnotation>,
    /// `None` for abstract methods and overload signatures.
    #[serde(default)]
    pub body: Option<BlockStatement>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default)]
    pub decorators: Vec<Decorator>,
    #[serde(default)]
    pub span: Span,
}

impl MethodDecl {
    pub fn is_constructor(&self) -> bool {
        self.name.name == CONSTRUCTOR_NAME
    }
}

// ============================================================================
// Interfaces, aliases, namespaces, modules
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDecl {
    pub name: Identifier,
    #[serde(default)]
    pub type_params: Vec<TypeParameter>,
    #[serde(default)]
    pub extends: Vec<Identifier>,
    #[serde(default)]
    pub members: Vec<InterfaceMember>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InterfaceMember {
    Property {
        name: Identifier,
        type_annotation: TypeAnnotation,
        #[serde(default)]
        optional: bool,
        #[serde(default)]
        readonly: bool,
    },
    Method {
        name: Identifier,
        #[serde(default)]
        params: Vec<Parameter>,
        #[serde(default)]
        return_type: Option<TypeAnnotation>,
        #[serde(default)]
        optional: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAliasDecl {
    pub name: Identifier,
    #[serde(default)]
    pub type_params: Vec<TypeParameter>,
    pub type_annotation: TypeAnnotation,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDecl {
    pub name: Identifier,
    #[serde(default)]
    pub body: Vec<Statement>,
    #[serde(default)]
    pub span: Span,
}

/// `import { a, b as c } from "./mod";`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDecl {
    #[serde(default)]
    pub specifiers: Vec<ImportSpecifier>,
    pub source: String,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSpecifier {
    pub imported: Identifier,
    #[serde(default)]
    pub local: Option<Identifier>,
}

impl ImportSpecifier {
    /// Name the import is bound to in this module.
    pub fn local_name(&self) -> &str {
        self.local.as_ref().map_or(&self.imported.name, |l| &l.name)
    }
}

/// `export <declaration>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDecl {
    pub declaration: Box<Statement>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub span: Span,
}

// ============================================================================
// Control flow
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionStatement {
    pub expression: Expression,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockStatement {
    #[serde(default)]
    pub statements: Vec<Statement>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStatement {
    pub condition: Expression,
    pub then_branch: Box<Statement>,
    #[serde(default)]
    pub else_branch: Option<Box<Statement>>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: Box<Statement>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoWhileStatement {
    pub body: Box<Statement>,
    pub condition: Expression,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForInit {
    VariableDecl(VariableDecl),
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForStatement {
    #[serde(default)]
    pub init: Option<ForInit>,
    #[serde(default)]
    pub test: Option<Expression>,
    #[serde(default)]
    pub update: Option<Expression>,
    pub body: Box<Statement>,
    #[serde(default)]
    pub span: Span,
}

/// `for (const x of xs)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForOfStatement {
    pub kind: VariableKind,
    pub binding: Identifier,
    #[serde(default)]
    pub type_annotation: Option<TypeAnnotation>,
    pub iterable: Expression,
    pub body: Box<Statement>,
    #[serde(default)]
    pub span: Span,
}

/// `for (const k in obj)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForInStatement {
    pub kind: VariableKind,
    pub binding: Identifier,
    pub object: Expression,
    pub body: Box<Statement>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStatement {
    #[serde(default)]
    pub value: Option<Expression>,
    #[serde(default)]
    pub span: Span,
}

/// `break` / `continue`, optionally labeled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpStatement {
    #[serde(default)]
    pub label: Option<Identifier>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrowStatement {
    pub value: Expression,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryStatement {
    pub body: BlockStatement,
    #[serde(default)]
    pub catch_clause: Option<CatchClause>,
    #[serde(default)]
    pub finally_clause: Option<BlockStatement>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    #[serde(default)]
    pub param: Option<Identifier>,
    pub body: BlockStatement,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledStatement {
    pub label: Identifier,
    pub body: Box<Statement>,
    #[serde(default)]
    pub span: Span,
}
