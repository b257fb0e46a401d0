//! Shorthand constructors for trees
//!
//! Front-ends embedding the compiler and tests both need to assemble trees
//! by hand; these helpers fill in default spans and empty optional parts.

use crate::ast::*;
use crate::Span;

pub fn name(text: &str) -> Identifier {
    Identifier::new(text, Span::default())
}

/// Identifier whose span starts on `line`.
pub fn name_at(text: &str, line: u32) -> Identifier {
    Identifier::new(text, Span::at_line(line))
}

// ============================================================================
// Types
// ============================================================================

fn ty(t: Type) -> TypeAnnotation {
    TypeAnnotation::new(t, Span::default())
}

pub fn number_ty() -> TypeAnnotation {
    ty(Type::Primitive(PrimitiveKeyword::Number))
}

pub fn string_ty() -> TypeAnnotation {
    ty(Type::Primitive(PrimitiveKeyword::String))
}

pub fn boolean_ty() -> TypeAnnotation {
    ty(Type::Primitive(PrimitiveKeyword::Boolean))
}

pub fn void_ty() -> TypeAnnotation {
    ty(Type::Primitive(PrimitiveKeyword::Void))
}

pub fn null_ty() -> TypeAnnotation {
    ty(Type::Primitive(PrimitiveKeyword::Null))
}

pub fn undefined_ty() -> TypeAnnotation {
    ty(Type::Primitive(PrimitiveKeyword::Undefined))
}

pub fn any_ty() -> TypeAnnotation {
    ty(Type::Primitive(PrimitiveKeyword::Any))
}

pub fn keyword_ty(keyword: PrimitiveKeyword) -> TypeAnnotation {
    ty(Type::Primitive(keyword))
}

pub fn ref_ty(name: &str, type_args: Vec<TypeAnnotation>) -> TypeAnnotation {
    ty(Type::Reference(TypeReference {
        name: name.to_string(),
        type_args,
    }))
}

pub fn array_ty(elem: TypeAnnotation) -> TypeAnnotation {
    ty(Type::Array(Box::new(elem)))
}

pub fn tuple_ty(items: Vec<TypeAnnotation>) -> TypeAnnotation {
    ty(Type::Tuple(items))
}

pub fn union_ty(members: Vec<TypeAnnotation>) -> TypeAnnotation {
    ty(Type::Union(members))
}

pub fn intersection_ty(members: Vec<TypeAnnotation>) -> TypeAnnotation {
    ty(Type::Intersection(members))
}

pub fn string_literal_ty(value: &str) -> TypeAnnotation {
    ty(Type::StringLiteral(value.to_string()))
}

pub fn number_literal_ty(value: f64) -> TypeAnnotation {
    ty(Type::NumberLiteral(value))
}

pub fn object_ty(members: Vec<(&str, TypeAnnotation)>) -> TypeAnnotation {
    ty(Type::Object(
        members
            .into_iter()
            .map(|(n, t)| ObjectTypeMember {
                name: n.to_string(),
                ty: t,
                optional: false,
            })
            .collect(),
    ))
}

/// `(p0, p1, ...) => ret`; the last parameter is a rest parameter when
/// `rest` is set.
pub fn fn_ty(params: Vec<TypeAnnotation>, ret: TypeAnnotation, rest: bool) -> TypeAnnotation {
    let count = params.len();
    ty(Type::Function(FunctionType {
        params: params
            .into_iter()
            .enumerate()
            .map(|(i, t)| FunctionTypeParam {
                name: Some(format!("p{i}")),
                ty: t,
                optional: false,
                is_rest: rest && i + 1 == count,
            })
            .collect(),
        return_type: Box::new(ret),
    }))
}

// ============================================================================
// Expressions
// ============================================================================

pub fn ident(text: &str) -> Expression {
    Expression::Identifier(name(text))
}

pub fn num(value: f64) -> Expression {
    Expression::NumberLiteral(NumberLiteral {
        value,
        span: Span::default(),
    })
}

pub fn str_lit(value: &str) -> Expression {
    Expression::StringLiteral(StringLiteral {
        value: value.to_string(),
        span: Span::default(),
    })
}

pub fn bool_lit(value: bool) -> Expression {
    Expression::BooleanLiteral(BooleanLiteral {
        value,
        span: Span::default(),
    })
}

pub fn null() -> Expression {
    Expression::NullLiteral(Span::default())
}

pub fn this() -> Expression {
    Expression::This(Span::default())
}

pub fn super_expr() -> Expression {
    Expression::Super(Span::default())
}

pub fn call(callee: Expression, arguments: Vec<Expression>) -> Expression {
    Expression::Call(CallExpression {
        callee: Box::new(callee),
        type_args: vec![],
        arguments,
        span: Span::default(),
    })
}

pub fn member(object: Expression, property: &str) -> Expression {
    Expression::Member(MemberExpression {
        object: Box::new(object),
        property: name(property),
        span: Span::default(),
    })
}

pub fn index(object: Expression, idx: Expression) -> Expression {
    Expression::Index(IndexExpression {
        object: Box::new(object),
        index: Box::new(idx),
        span: Span::default(),
    })
}

pub fn new_expr(class: &str, arguments: Vec<Expression>) -> Expression {
    Expression::New(NewExpression {
        callee: name(class),
        type_args: vec![],
        arguments,
        span: Span::default(),
    })
}

pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::Binary(BinaryExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
        span: Span::default(),
    })
}

pub fn unary(operator: UnaryOperator, operand: Expression) -> Expression {
    Expression::Unary(UnaryExpression {
        operator,
        operand: Box::new(operand),
        span: Span::default(),
    })
}

pub fn assign(target: Expression, value: Expression) -> Expression {
    Expression::Assignment(AssignmentExpression {
        operator: AssignmentOperator::Assign,
        target: Box::new(target),
        value: Box::new(value),
        span: Span::default(),
    })
}

pub fn template(quasis: Vec<&str>, expressions: Vec<Expression>) -> Expression {
    Expression::Template(TemplateLiteral {
        quasis: quasis.into_iter().map(String::from).collect(),
        expressions,
        span: Span::default(),
    })
}

pub fn array(elements: Vec<Expression>) -> Expression {
    Expression::Array(ArrayExpression {
        elements,
        span: Span::default(),
    })
}

pub fn object(properties: Vec<(&str, Expression)>) -> Expression {
    Expression::Object(ObjectExpression {
        properties: properties
            .into_iter()
            .map(|(k, v)| ObjectProperty {
                key: k.to_string(),
                value: v,
                span: Span::default(),
            })
            .collect(),
        span: Span::default(),
    })
}

pub fn arrow(params: Vec<Parameter>, body: Expression) -> Expression {
    Expression::Arrow(ArrowFunction {
        params,
        return_type: None,
        body: ArrowBody::Expression(Box::new(body)),
        is_async: false,
        span: Span::default(),
    })
}

pub fn await_expr(argument: Expression) -> Expression {
    Expression::Await(AwaitExpression {
        argument: Box::new(argument),
        span: Span::default(),
    })
}

// ============================================================================
// Statements
// ============================================================================

fn var(kind: VariableKind, id: Identifier, annotation: Option<TypeAnnotation>, init: Option<Expression>) -> Statement {
    let span = id.span;
    Statement::VariableDecl(VariableDecl {
        kind,
        declarations: vec![VariableDeclarator {
            name: id,
            type_annotation: annotation,
            initializer: init,
            span,
        }],
        span,
    })
}

pub fn let_stmt(binding: &str, init: Option<Expression>) -> Statement {
    var(VariableKind::Let, name(binding), None, init)
}

pub fn const_stmt(binding: &str, init: Expression) -> Statement {
    var(VariableKind::Const, name(binding), None, Some(init))
}

/// `let binding: annotation = init;` placed on `line`.
pub fn typed_let(binding: &str, line: u32, annotation: Option<TypeAnnotation>, init: Option<Expression>) -> Statement {
    var(VariableKind::Let, name_at(binding, line), annotation, init)
}

pub fn expr_stmt(expression: Expression) -> Statement {
    Statement::Expression(ExpressionStatement {
        expression,
        span: Span::default(),
    })
}

pub fn ret(value: Option<Expression>) -> Statement {
    Statement::Return(ReturnStatement {
        value,
        span: Span::default(),
    })
}

pub fn block(statements: Vec<Statement>) -> BlockStatement {
    BlockStatement {
        statements,
        span: Span::default(),
    }
}

pub fn if_stmt(condition: Expression, then: Vec<Statement>, otherwise: Option<Vec<Statement>>) -> Statement {
    Statement::If(IfStatement {
        condition,
        then_branch: Box::new(Statement::Block(block(then))),
        else_branch: otherwise.map(|s| Box::new(Statement::Block(block(s)))),
        span: Span::default(),
    })
}

pub fn while_stmt(condition: Expression, body: Vec<Statement>) -> Statement {
    Statement::While(WhileStatement {
        condition,
        body: Box::new(Statement::Block(block(body))),
        span: Span::default(),
    })
}

// ============================================================================
// Declarations
// ============================================================================

pub fn param(binding: &str, annotation: Option<TypeAnnotation>) -> Parameter {
    Parameter {
        name: name(binding),
        type_annotation: annotation,
        default: None,
        optional: false,
        is_rest: false,
        visibility: None,
        readonly: false,
        span: Span::default(),
    }
}

pub fn rest_param(binding: &str, annotation: TypeAnnotation) -> Parameter {
    Parameter {
        is_rest: true,
        ..param(binding, Some(annotation))
    }
}

pub fn type_param(text: &str) -> TypeParameter {
    TypeParameter {
        name: name(text),
        constraint: None,
        is_const: false,
        span: Span::default(),
    }
}

pub fn function(
    fn_name: &str,
    params: Vec<Parameter>,
    return_type: Option<TypeAnnotation>,
    body: Vec<Statement>,
) -> FunctionDecl {
    FunctionDecl {
        name: name(fn_name),
        type_params: vec![],
        params,
        return_type,
        body: Some(block(body)),
        is_async: false,
        decorators: vec![],
        span: Span::default(),
    }
}

/// Overload signature without a body.
pub fn signature(fn_name: &str, params: Vec<Parameter>, return_type: Option<TypeAnnotation>) -> FunctionDecl {
    FunctionDecl {
        body: None,
        ..function(fn_name, params, return_type, vec![])
    }
}

pub fn method(
    method_name: &str,
    params: Vec<Parameter>,
    return_type: Option<TypeAnnotation>,
    body: Vec<Statement>,
) -> MethodDecl {
    MethodDecl {
        name: name(method_name),
        type_params: vec![],
        params,
        return_type,
        body: Some(block(body)),
        visibility: Visibility::Public,
        is_static: false,
        is_abstract: false,
        is_async: false,
        decorators: vec![],
        span: Span::default(),
    }
}

pub fn property(prop: &str, annotation: Option<TypeAnnotation>, init: Option<Expression>) -> PropertyDecl {
    PropertyDecl {
        name: name(prop),
        type_annotation: annotation,
        initializer: init,
        visibility: Visibility::Public,
        is_static: false,
        is_readonly: false,
        optional: false,
        decorators: vec![],
        span: Span::default(),
    }
}

pub fn class_decl(class: &str, extends: Option<&str>, members: Vec<ClassMember>) -> ClassDecl {
    ClassDecl {
        name: name(class),
        type_params: vec![],
        extends: extends.map(name),
        extends_type_args: vec![],
        implements: vec![],
        members,
        is_abstract: false,
        decorators: vec![],
        span: Span::default(),
    }
}

pub fn decorator(deco: &str, arguments: Vec<Expression>) -> Decorator {
    Decorator {
        name: name(deco),
        arguments,
        span: Span::default(),
    }
}

pub fn interface(iface: &str, members: Vec<InterfaceMember>) -> InterfaceDecl {
    InterfaceDecl {
        name: name(iface),
        type_params: vec![],
        extends: vec![],
        members,
        span: Span::default(),
    }
}

pub fn interface_property(prop: &str, annotation: TypeAnnotation) -> InterfaceMember {
    InterfaceMember::Property {
        name: name(prop),
        type_annotation: annotation,
        optional: false,
        readonly: false,
    }
}

pub fn interface_method(m: &str, params: Vec<Parameter>, return_type: Option<TypeAnnotation>) -> InterfaceMember {
    InterfaceMember::Method {
        name: name(m),
        params,
        return_type,
        optional: false,
    }
}

pub fn type_alias(alias: &str, annotation: TypeAnnotation) -> Statement {
    Statement::TypeAliasDecl(TypeAliasDecl {
        name: name(alias),
        type_params: vec![],
        type_annotation: annotation,
        span: Span::default(),
    })
}
