use super::*;
use crate::diagnostics::DiagnosticCode;
use crate::ir::{DeclKind, ExprKind, MemoryAnnotation, MethodKind, Resolution, StmtKind};
use kiln_syntax::ast::{ClassMember, LabeledStatement, Statement, Visibility};
use kiln_syntax::build::*;
use kiln_syntax::OwnershipHint;

fn lower(statements: Vec<Statement>) -> (IrModule, Diagnostics) {
    let file = SourceFile::new("main.ts", statements);
    lower_module(&file, &CompilerOptions::default(), None, None)
}

fn class_of<'m>(module: &'m IrModule, name: &str) -> &'m crate::ir::Class {
    module.class(name).expect("class lowered")
}

#[test]
fn test_forward_class_reference_resolves() {
    // Car is declared before Engine but its field names Engine
    let car = class_decl("Car", None, vec![ClassMember::Property(property("engine", Some(ref_ty("Engine", vec![])), None))]);
    let engine = class_decl("Engine", None, vec![]);
    let (module, diags) = lower(vec![Statement::ClassDecl(car), Statement::ClassDecl(engine)]);

    assert!(diags.is_empty(), "{:?}", diags.iter().collect::<Vec<_>>());
    let field = module.bindings.field("Car", "engine").expect("field binding");
    assert_eq!(module.binding(field).map(|b| b.ty.clone()), Some(TypeDescriptor::class("Engine")));
}

#[test]
fn test_unresolved_identifier_reported_once() {
    let (module, diags) = lower(vec![
        expr_stmt(call(ident("mystery"), vec![])),
        expr_stmt(call(ident("mystery"), vec![])),
    ]);
    assert_eq!(diags.count(DiagnosticCode::UnresolvedIdentifier), 1);
    match &module.body[0] {
        IrNode::Stmt(stmt) => match &stmt.kind {
            StmtKind::Expr(e) => match &e.kind {
                ExprKind::Call { callee, .. } => assert!(matches!(
                    callee.kind,
                    ExprKind::Ident {
                        resolution: Resolution::External,
                        ..
                    }
                )),
                other => panic!("expected call, got {other:?}"),
            },
            other => panic!("expected expression statement, got {other:?}"),
        },
        other => panic!("expected statement, got {other:?}"),
    }
}

#[test]
fn test_unknown_local_type_reported_once_with_inferred_return() {
    let body = vec![typed_let("q", 2, Some(ref_ty("Missing", vec![])), None), ret(Some(num(1.0)))];
    let inferred = function("g", vec![], None, body.clone());
    let annotated = function("h", vec![], Some(number_ty()), body);

    let (_, diags) = lower(vec![Statement::FunctionDecl(inferred)]);
    assert_eq!(diags.count(DiagnosticCode::TypeResolution), 1);
    let (_, diags) = lower(vec![Statement::FunctionDecl(annotated)]);
    assert_eq!(diags.count(DiagnosticCode::TypeResolution), 1);
}

#[test]
fn test_builtins_resolve_without_warning() {
    let log = member(ident("console"), "log");
    let (_, diags) = lower(vec![expr_stmt(call(log, vec![str_lit("hi")]))]);
    assert!(diags.is_empty());
}

#[test]
fn test_hint_is_attached_to_binding() {
    let file = SourceFile::new("main.ts", vec![typed_let("owner", 3, None, Some(num(1.0)))]);
    let mut hints = HintIndex::new();
    hints.insert("main.ts", 3, "owner", OwnershipHint::Value);
    let (module, _) = lower_module(&file, &CompilerOptions::default(), Some(&hints), None);

    let binding = module.bindings.iter().find(|b| b.name == "owner").expect("binding");
    assert!(binding.hinted);
    assert_eq!(binding.memory, MemoryAnnotation::Value);
    assert!(binding.is_global);
}

#[test]
fn test_constructor_super_call_and_parameter_property() {
    let base = class_decl(
        "Base",
        None,
        vec![ClassMember::Method(method("constructor", vec![param("id", Some(number_ty()))], None, vec![]))],
    );
    let mut label = param("label", Some(string_ty()));
    label.visibility = Some(Visibility::Private);
    let ctor = method(
        "constructor",
        vec![param("id", Some(number_ty())), label],
        None,
        vec![expr_stmt(call(super_expr(), vec![ident("id")]))],
    );
    let derived = class_decl("Derived", Some("Base"), vec![ClassMember::Method(ctor)]);
    let (module, diags) = lower(vec![Statement::ClassDecl(base), Statement::ClassDecl(derived)]);

    assert!(diags.is_empty(), "{:?}", diags.iter().collect::<Vec<_>>());
    let class = class_of(&module, "Derived");
    assert_eq!(class.superclass_name(), Some("Base"));

    let field = class.properties().next().expect("parameter property field");
    assert_eq!(field.visibility, Visibility::Private);
    assert_eq!(module.binding(field.binding).map(|b| b.name.as_str()), Some("label"));

    let ctor = class.constructor().expect("constructor");
    assert_eq!(ctor.kind, MethodKind::Constructor);
    assert_eq!(ctor.super_args.as_ref().map(Vec::len), Some(1));
    let body = ctor.body.as_ref().expect("body");
    // Only the `this.label = label` prologue remains
    assert_eq!(body.stmts.len(), 1);
    match &body.stmts[0].kind {
        StmtKind::Expr(e) => match &e.kind {
            ExprKind::Assign { target, .. } => assert!(target.binding().is_some()),
            other => panic!("expected assignment, got {other:?}"),
        },
        other => panic!("expected expression statement, got {other:?}"),
    }
}

#[test]
fn test_stray_super_call_is_placeholder() {
    let m = method("reset", vec![], None, vec![expr_stmt(call(super_expr(), vec![]))]);
    let base = class_decl("Base", None, vec![]);
    let derived = class_decl("Derived", Some("Base"), vec![ClassMember::Method(m)]);
    let (_, diags) = lower(vec![Statement::ClassDecl(base), Statement::ClassDecl(derived)]);
    assert_eq!(diags.count(DiagnosticCode::UnsupportedConstruct), 1);
}

#[test]
fn test_labeled_statement_becomes_placeholder() {
    let labeled = Statement::Labeled(LabeledStatement {
        label: name("outer"),
        body: Box::new(while_stmt(bool_lit(true), vec![])),
        span: Span::default(),
    });
    let (module, diags) = lower(vec![labeled]);
    assert_eq!(diags.count(DiagnosticCode::UnsupportedConstruct), 1);
    assert!(matches!(
        &module.body[0],
        IrNode::Stmt(s) if matches!(s.kind, StmtKind::Placeholder { .. })
    ));
}

#[test]
fn test_object_literal_takes_declared_shape() {
    let point = interface(
        "Point",
        vec![interface_property("x", number_ty()), interface_property("y", number_ty())],
    );
    let origin = typed_let(
        "origin",
        1,
        Some(ref_ty("Point", vec![])),
        Some(object(vec![("x", num(0.0)), ("y", num(0.0))])),
    );
    let (module, diags) = lower(vec![Statement::InterfaceDecl(point), origin]);
    assert!(diags.is_empty());

    let init = module.body.iter().find_map(|n| match n {
        IrNode::Stmt(s) => match &s.kind {
            StmtKind::VarDecl(decls) => decls[0].init.clone(),
            _ => None,
        },
        _ => None,
    });
    let init = init.expect("initializer");
    match init.ty {
        Some(TypeDescriptor::Object { name, fields }) => {
            assert_eq!(name.as_deref(), Some("Point"));
            assert_eq!(fields.len(), 2);
        }
        other => panic!("expected named shape, got {other:?}"),
    }
}

#[test]
fn test_local_function_becomes_lambda() {
    let inner = function("helper", vec![], Some(number_ty()), vec![ret(Some(num(1.0)))]);
    let outer = function("outer", vec![], None, vec![Statement::FunctionDecl(inner)]);
    let (module, _) = lower(vec![Statement::FunctionDecl(outer)]);

    let f = module.functions().next().expect("outer");
    let body = f.body.as_ref().expect("body");
    match &body.stmts[0].kind {
        StmtKind::VarDecl(decls) => {
            assert!(matches!(decls[0].init.as_ref().map(|e| &e.kind), Some(ExprKind::Lambda(_))));
        }
        other => panic!("expected local binding, got {other:?}"),
    }
}

#[test]
fn test_namespace_members_lowered_in_place() {
    let ns = Statement::ModuleDecl(kiln_syntax::ast::ModuleDecl {
        name: name("Geo"),
        body: vec![Statement::ClassDecl(class_decl("Point", None, vec![]))],
        span: Span::default(),
    });
    let (module, diags) = lower(vec![ns, const_stmt("p", new_expr("Geo.Point", vec![]))]);
    assert!(diags.is_empty(), "{:?}", diags.iter().collect::<Vec<_>>());
    assert!(matches!(
        &module.body[0],
        IrNode::Decl(d) if matches!(d.kind, DeclKind::Namespace(_))
    ));
    assert_eq!(module.classes().len(), 1);
    assert_eq!(module.registry.qualified_name("Point"), "Geo::Point");
}
