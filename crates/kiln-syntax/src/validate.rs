//! Structural validation of incoming trees
//!
//! The front-end is trusted to produce well-typed nodes (serde enforces
//! that), but not well-formed ones. These checks reject trees no later stage
//! could make sense of. The first problem found is reported.

use crate::ast::*;
use crate::{Span, SyntaxError};

type Result<T> = std::result::Result<T, SyntaxError>;

impl SourceFile {
    pub fn validate(&self) -> Result<()> {
        check_span("source file", &self.span)?;
        self.statements.iter().try_for_each(statement)
    }
}

fn check_span(kind: &'static str, span: &Span) -> Result<()> {
    if span.end < span.start {
        return Err(SyntaxError::InvertedSpan { kind, span: *span });
    }
    Ok(())
}

fn ident(kind: &'static str, id: &Identifier) -> Result<()> {
    check_span(kind, &id.span)?;
    if id.name.is_empty() {
        return Err(SyntaxError::EmptyIdentifier { kind, span: id.span });
    }
    Ok(())
}

fn params(list: &[Parameter]) -> Result<()> {
    for (i, p) in list.iter().enumerate() {
        ident("parameter", &p.name)?;
        if p.is_rest {
            if i + 1 != list.len() {
                return Err(SyntaxError::RestNotLast {
                    name: p.name.name.clone(),
                    span: p.span,
                });
            }
            if p.optional || p.default.is_some() {
                return Err(SyntaxError::RestWithDefault {
                    name: p.name.name.clone(),
                    span: p.span,
                });
            }
        }
        if let Some(d) = &p.default {
            expression(d)?;
        }
    }
    Ok(())
}

fn block(b: &BlockStatement) -> Result<()> {
    check_span("block", &b.span)?;
    b.statements.iter().try_for_each(statement)
}

fn var_decl(v: &VariableDecl) -> Result<()> {
    if v.declarations.is_empty() {
        return Err(SyntaxError::EmptyDeclaration { span: v.span });
    }
    for d in &v.declarations {
        ident("variable", &d.name)?;
        if let Some(init) = &d.initializer {
            expression(init)?;
        }
    }
    Ok(())
}

fn class(c: &ClassDecl) -> Result<()> {
    ident("class", &c.name)?;
    let mut constructor_bodies = 0;
    for member in &c.members {
        check_span("class member", member.span())?;
        match member {
            ClassMember::Property(p) => {
                ident("property", &p.name)?;
                if let Some(init) = &p.initializer {
                    expression(init)?;
                }
            }
            ClassMember::Method(m) => {
                ident("method", &m.name)?;
                params(&m.params)?;
                if let Some(body) = &m.body {
                    if m.is_constructor() {
                        constructor_bodies += 1;
                        if constructor_bodies > 1 {
                            return Err(SyntaxError::DuplicateConstructor {
                                class: c.name.name.clone(),
                                span: m.span,
                            });
                        }
                    }
                    block(body)?;
                }
            }
            ClassMember::Unknown(_) => {}
        }
    }
    Ok(())
}

fn statement(stmt: &Statement) -> Result<()> {
    check_span(stmt.kind_name(), stmt.span())?;
    match stmt {
        Statement::VariableDecl(v) => var_decl(v),
        Statement::FunctionDecl(f) => {
            ident("function", &f.name)?;
            params(&f.params)?;
            f.body.as_ref().map_or(Ok(()), block)
        }
        Statement::ClassDecl(c) => class(c),
        Statement::InterfaceDecl(i) => ident("interface", &i.name),
        Statement::TypeAliasDecl(t) => ident("type alias", &t.name),
        Statement::ModuleDecl(m) => {
            ident("namespace", &m.name)?;
            m.body.iter().try_for_each(statement)
        }
        Statement::ImportDecl(i) => i
            .specifiers
            .iter()
            .try_for_each(|s| ident("import specifier", &s.imported)),
        Statement::ExportDecl(e) => statement(&e.declaration),
        Statement::Expression(e) => expression(&e.expression),
        Statement::Block(b) => block(b),
        Statement::If(s) => {
            expression(&s.condition)?;
            statement(&s.then_branch)?;
            s.else_branch.as_deref().map_or(Ok(()), statement)
        }
        Statement::While(s) => {
            expression(&s.condition)?;
            statement(&s.body)
        }
        Statement::DoWhile(s) => {
            statement(&s.body)?;
            expression(&s.condition)
        }
        Statement::For(s) => {
            match &s.init {
                Some(ForInit::VariableDecl(v)) => var_decl(v)?,
                Some(ForInit::Expression(e)) => expression(e)?,
                None => {}
            }
            if let Some(t) = &s.test {
                expression(t)?;
            }
            if let Some(u) = &s.update {
                expression(u)?;
            }
            statement(&s.body)
        }
        Statement::ForOf(s) => {
            ident("loop binding", &s.binding)?;
            expression(&s.iterable)?;
            statement(&s.body)
        }
        Statement::ForIn(s) => {
            ident("loop binding", &s.binding)?;
            expression(&s.object)?;
            statement(&s.body)
        }
        Statement::Return(r) => r.value.as_ref().map_or(Ok(()), expression),
        Statement::Throw(t) => expression(&t.value),
        Statement::Try(t) => {
            block(&t.body)?;
            if let Some(c) = &t.catch_clause {
                block(&c.body)?;
            }
            t.finally_clause.as_ref().map_or(Ok(()), block)
        }
        Statement::Labeled(l) => statement(&l.body),
        Statement::Break(_) | Statement::Continue(_) | Statement::Empty(_) => Ok(()),
        Statement::Unknown(_) => Ok(()),
    }
}

fn expression(expr: &Expression) -> Result<()> {
    check_span("expression", expr.span())?;
    match expr {
        Expression::Identifier(id) => ident("identifier", id),
        Expression::Template(t) => {
            if t.quasis.len() != t.expressions.len() + 1 {
                return Err(SyntaxError::TemplateArity {
                    quasis: t.quasis.len(),
                    expressions: t.expressions.len(),
                    span: t.span,
                });
            }
            t.expressions.iter().try_for_each(expression)
        }
        Expression::Array(a) => a.elements.iter().try_for_each(expression),
        Expression::Object(o) => o.properties.iter().try_for_each(|p| expression(&p.value)),
        Expression::Call(c) => {
            expression(&c.callee)?;
            c.arguments.iter().try_for_each(expression)
        }
        Expression::Member(m) => {
            ident("property", &m.property)?;
            expression(&m.object)
        }
        Expression::Index(i) => {
            expression(&i.object)?;
            expression(&i.index)
        }
        Expression::Binary(b) => {
            expression(&b.left)?;
            expression(&b.right)
        }
        Expression::Unary(u) => expression(&u.operand),
        Expression::Update(u) => expression(&u.argument),
        Expression::Assignment(a) => {
            expression(&a.target)?;
            expression(&a.value)
        }
        Expression::Conditional(c) => {
            expression(&c.test)?;
            expression(&c.consequent)?;
            expression(&c.alternate)
        }
        Expression::New(n) => {
            ident("constructor", &n.callee)?;
            n.arguments.iter().try_for_each(expression)
        }
        Expression::Arrow(a) => {
            params(&a.params)?;
            match &a.body {
                ArrowBody::Expression(e) => expression(e),
                ArrowBody::Block(b) => block(b),
            }
        }
        Expression::Await(a) => expression(&a.argument),
        Expression::As(a) => expression(&a.expression),
        Expression::NonNull(n) => expression(&n.expression),
        Expression::Parenthesized(p) => expression(&p.expression),
        Expression::Yield(y) => y.argument.as_deref().map_or(Ok(()), expression),
        Expression::NumberLiteral(_)
        | Expression::StringLiteral(_)
        | Expression::BooleanLiteral(_)
        | Expression::NullLiteral(_)
        | Expression::BigIntLiteral(_)
        | Expression::This(_)
        | Expression::Super(_)
        | Expression::Unknown(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::*;
    use crate::build::ident;

    #[test]
    fn test_valid_tree_passes() {
        let file = SourceFile::new(
            "ok.ts",
            vec![
                let_stmt("x", Some(num(1.0))),
                expr_stmt(call(ident("print"), vec![ident("x")])),
            ],
        );
        assert!(file.validate().is_ok());
    }

    #[test]
    fn test_rest_parameter_must_be_last() {
        let mut f = function("f", vec![rest_param("xs", array_ty(number_ty())), param("y", None)], None, vec![]);
        f.params[0].span = Span::at_line(3);
        let file = SourceFile::new("bad.ts", vec![Statement::FunctionDecl(f)]);
        match file.validate() {
            Err(SyntaxError::RestNotLast { name, span }) => {
                assert_eq!(name, "xs");
                assert_eq!(span.line, 3);
            }
            other => panic!("expected RestNotLast, got {other:?}"),
        }
    }

    #[test]
    fn test_inverted_span_rejected() {
        let mut stmt = expr_stmt(num(1.0));
        if let Statement::Expression(e) = &mut stmt {
            e.span = Span::new(10, 2, 1, 1);
        }
        let file = SourceFile::new("bad.ts", vec![stmt]);
        assert!(matches!(file.validate(), Err(SyntaxError::InvertedSpan { .. })));
    }

    #[test]
    fn test_template_arity() {
        let bad = Expression::Template(TemplateLiteral {
            quasis: vec!["a".into()],
            expressions: vec![ident("x")],
            span: Span::default(),
        });
        let file = SourceFile::new("bad.ts", vec![expr_stmt(bad)]);
        assert!(matches!(
            file.validate(),
            Err(SyntaxError::TemplateArity { quasis: 1, expressions: 1, .. })
        ));
    }

    #[test]
    fn test_duplicate_constructor() {
        let ctor = || ClassMember::Method(method("constructor", vec![], None, vec![]));
        let c = class_decl("Point", None, vec![ctor(), ctor()]);
        let file = SourceFile::new("bad.ts", vec![Statement::ClassDecl(c)]);
        assert!(matches!(
            file.validate(),
            Err(SyntaxError::DuplicateConstructor { .. })
        ));
    }

    #[test]
    fn test_empty_identifier() {
        let file = SourceFile::new("bad.ts", vec![expr_stmt(ident(""))]);
        assert!(matches!(
            file.validate(),
            Err(SyntaxError::EmptyIdentifier { kind: "identifier", .. })
        ));
    }
}
