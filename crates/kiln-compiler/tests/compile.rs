//! End-to-end compilation tests
//!
//! Builds trees by hand, runs the full pipeline and checks fragments of the
//! emitted header and implementation.
//! Run with: cargo test -p kiln-compiler --test compile

use kiln_compiler::{
    CompilationUnit, Compiler, CompilerOptions, DiagnosticCode, EmittedUnit, TargetDialect, UnitOutput,
};
use kiln_syntax::ast::{BinaryOperator, ClassDecl, ClassMember, FunctionDecl, MethodDecl, Parameter, PropertyDecl, Statement};
use kiln_syntax::build::*;
use kiln_syntax::{HintIndex, OwnershipHint, SourceFile};

fn compile_with(options: CompilerOptions, statements: Vec<Statement>) -> UnitOutput {
    let unit = CompilationUnit::new(SourceFile::new("main.ts", statements));
    Compiler::new(options).compile(&unit)
}

fn compile(statements: Vec<Statement>) -> UnitOutput {
    compile_with(CompilerOptions::default(), statements)
}

fn compile_hinted(statements: Vec<Statement>, hints: HintIndex) -> UnitOutput {
    let unit = CompilationUnit::new(SourceFile::new("main.ts", statements)).with_hints(hints);
    Compiler::new(CompilerOptions::default()).compile(&unit)
}

fn emitted(output: &UnitOutput) -> &EmittedUnit {
    output.emitted.as_ref().expect("unit should compile")
}

fn position(text: &str, needle: &str) -> usize {
    text.find(needle)
        .unwrap_or_else(|| panic!("`{}` not found in:\n{}", needle, text))
}

fn car_and_engine() -> Vec<Statement> {
    let engine = class_decl(
        "Engine",
        None,
        vec![ClassMember::Method(method("start", vec![], Some(void_ty()), vec![]))],
    );
    let car = class_decl(
        "Car",
        None,
        vec![
            ClassMember::Property(property(
                "engine",
                Some(ref_ty("Engine", vec![])),
                Some(new_expr("Engine", vec![])),
            )),
            ClassMember::Method(method(
                "constructor",
                vec![param("name", Some(string_ty()))],
                None,
                vec![],
            )),
            ClassMember::Method(method(
                "drive",
                vec![],
                Some(void_ty()),
                vec![expr_stmt(call(member(member(this(), "engine"), "start"), vec![]))],
            )),
        ],
    );
    vec![Statement::ClassDecl(engine), Statement::ClassDecl(car)]
}

fn text_and_number_overloads() -> Vec<Statement> {
    vec![
        Statement::FunctionDecl(function(
            "f",
            vec![param("s", Some(string_ty()))],
            Some(string_ty()),
            vec![ret(Some(ident("s")))],
        )),
        Statement::FunctionDecl(function(
            "f",
            vec![param("n", Some(number_ty()))],
            Some(number_ty()),
            vec![ret(Some(ident("n")))],
        )),
    ]
}

// =============================================================================
// CLASSES AND OWNERSHIP
// =============================================================================

mod classes {
    use super::*;

    #[test]
    fn test_constructed_field_is_a_shared_pointer() {
        let output = compile(car_and_engine());
        let unit = emitted(&output);
        assert!(unit.declaration.contains("std::shared_ptr<Engine> engine;"));
        assert!(unit.declaration.contains("Car(js::string name);"));
        assert!(unit.definition.contains("engine(std::make_shared<Engine>())"));
        assert!(unit.definition.contains("this->engine->start();"));
    }

    #[test]
    fn test_forward_declarations_precede_classes() {
        let output = compile(car_and_engine());
        let header = &emitted(&output).declaration;
        let forward = position(header, "class Car;");
        let class = position(header, "class Car {");
        assert!(forward < class);
    }

    #[test]
    fn test_virtual_and_override_through_two_levels() {
        let speak = |text: &str| {
            ClassMember::Method(method(
                "speak",
                vec![],
                Some(string_ty()),
                vec![ret(Some(str_lit(text)))],
            ))
        };
        // Declared leaf first; the header must still order bases first
        let statements = vec![
            Statement::ClassDecl(class_decl("Puppy", Some("Dog"), vec![speak("yip")])),
            Statement::ClassDecl(class_decl("Dog", Some("Animal"), vec![speak("woof")])),
            Statement::ClassDecl(class_decl("Animal", None, vec![speak("...")])),
        ];
        let output = compile(statements);
        let header = &emitted(&output).declaration;

        assert!(header.contains("virtual js::string speak();"));
        assert_eq!(header.matches("js::string speak() override;").count(), 2);
        assert!(header.contains("virtual ~Animal() = default;"));
        assert!(header.contains("class Dog : public Animal"));
        assert!(header.contains("class Puppy : public Dog"));

        let animal = position(header, "class Animal ");
        let dog = position(header, "class Dog :");
        let puppy = position(header, "class Puppy :");
        assert!(animal < dog && dog < puppy);
    }

    /// Abstract `Shape` with a static factory and class metadata, then
    /// `Circle` and `Ring` below it, plus a unique and a weak global.
    fn shapes() -> (Vec<Statement>, HintIndex) {
        let area = MethodDecl {
            body: None,
            is_abstract: true,
            ..method("area", vec![], Some(number_ty()), vec![])
        };
        let make = MethodDecl {
            is_static: true,
            ..method("make", vec![], Some(number_ty()), vec![ret(Some(num(0.0)))])
        };
        let shape = ClassDecl {
            is_abstract: true,
            decorators: vec![decorator("Entity", vec![str_lit("shape")])],
            ..class_decl("Shape", None, vec![ClassMember::Method(area), ClassMember::Method(make)])
        };
        let circle = ClassDecl {
            decorators: vec![decorator("Tracked", vec![])],
            ..class_decl(
                "Circle",
                Some("Shape"),
                vec![ClassMember::Method(method("area", vec![], Some(number_ty()), vec![ret(Some(num(1.0)))]))],
            )
        };
        let ring = class_decl("Ring", Some("Circle"), vec![]);

        let mut hints = HintIndex::new();
        hints.insert("main.ts", 20, "u", OwnershipHint::Unique);
        hints.insert("main.ts", 21, "w", OwnershipHint::Weak);
        let statements = vec![
            Statement::ClassDecl(shape),
            Statement::ClassDecl(circle),
            Statement::ClassDecl(ring),
            typed_let("u", 20, Some(ref_ty("Ring", vec![])), Some(new_expr("Ring", vec![]))),
            typed_let("w", 21, Some(ref_ty("Ring", vec![])), None),
            expr_stmt(call(member(ident("w"), "area"), vec![])),
        ];
        (statements, hints)
    }

    #[test]
    fn test_abstract_method_is_pure_virtual() {
        let (statements, hints) = shapes();
        let output = compile_hinted(statements, hints);
        let header = &emitted(&output).declaration;
        assert!(header.contains("virtual js::number area() = 0;"));
        assert!(header.contains("js::number area() override;"));
    }

    #[test]
    fn test_static_method_is_never_virtual() {
        let (statements, hints) = shapes();
        let output = compile_hinted(statements, hints);
        let header = &emitted(&output).declaration;
        assert!(header.contains("static js::number make();"));
        assert!(!header.contains("virtual static"));
        assert!(!header.contains("virtual js::number make("));
        assert!(!header.contains("make() override"));
    }

    #[test]
    fn test_class_metadata_initializes_root_and_extends_in_subclass() {
        let (statements, hints) = shapes();
        let output = compile_hinted(statements, hints);
        let unit = emitted(&output);
        assert!(unit.declaration.contains("public js::Metadata"));
        assert!(unit
            .definition
            .contains("Shape::Shape() : js::Metadata({{\"Entity\"_S, js::array<js::any>{\"shape\"_S}}})"));
        assert!(unit
            .definition
            .contains("this->add_metadata({\"Tracked\"_S, js::array<js::any>{}});"));
    }

    #[test]
    fn test_unique_and_weak_bindings() {
        let (statements, hints) = shapes();
        let output = compile_hinted(statements, hints);
        let unit = emitted(&output);
        assert!(unit.declaration.contains("extern std::unique_ptr<Ring> u;"));
        assert!(unit
            .definition
            .contains("std::unique_ptr<Ring> u = std::make_unique<Ring>();"));
        assert!(unit.declaration.contains("extern std::weak_ptr<Ring> w;"));
        assert!(unit.definition.contains("w.lock()->area();"));
        assert!(output
            .diagnostics
            .iter()
            .all(|d| d.code != DiagnosticCode::MemoryPolicyConflict));
    }
}

// =============================================================================
// OWNERSHIP HINTS ON PLAIN VALUES
// =============================================================================

mod boxed_values {
    use super::*;

    #[test]
    fn test_unique_hint_boxes_a_global_number() {
        let mut hints = HintIndex::new();
        hints.insert("main.ts", 3, "count", OwnershipHint::Unique);
        let statements = vec![
            typed_let("count", 3, Some(number_ty()), Some(num(1.0))),
            expr_stmt(assign(
                ident("count"),
                binary(BinaryOperator::Add, ident("count"), num(1.0)),
            )),
        ];
        let output = compile_hinted(statements, hints);
        let unit = emitted(&output);

        assert!(unit.declaration.contains("extern std::unique_ptr<js::number> count;"));
        assert!(unit
            .definition
            .contains("std::unique_ptr<js::number> count = std::make_unique<js::number>(js::number(1));"));
        assert!(unit
            .definition
            .contains("(*count) = ((*count) + js::number(1));"));
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_shared_hint_boxes_a_parameter_on_entry() {
        let mut hints = HintIndex::new();
        hints.insert("main.ts", 9, "n", OwnershipHint::Shared);
        let n = Parameter {
            name: name_at("n", 9),
            ..param("n", Some(number_ty()))
        };
        let bump = function(
            "bump",
            vec![n],
            Some(number_ty()),
            vec![
                expr_stmt(assign(ident("n"), binary(BinaryOperator::Add, ident("n"), num(1.0)))),
                ret(Some(ident("n"))),
            ],
        );
        let output = compile_hinted(vec![Statement::FunctionDecl(bump)], hints);
        let unit = emitted(&output);

        assert!(unit.declaration.contains("js::number bump(js::number n_value);"));
        let boxed = position(
            &unit.definition,
            "std::shared_ptr<js::number> n = std::make_shared<js::number>(n_value);",
        );
        let body = position(&unit.definition, "(*n) = ((*n) + js::number(1));");
        assert!(boxed < body);
        assert!(unit.definition.contains("return (*n);"));
    }

    #[test]
    fn test_unique_hint_boxes_a_field() {
        let mut hints = HintIndex::new();
        hints.insert("main.ts", 4, "hits", OwnershipHint::Unique);
        let hits = PropertyDecl {
            name: name_at("hits", 4),
            ..property("hits", Some(number_ty()), Some(num(0.0)))
        };
        let bump = method(
            "bump",
            vec![],
            Some(void_ty()),
            vec![expr_stmt(assign(
                member(this(), "hits"),
                binary(BinaryOperator::Add, member(this(), "hits"), num(1.0)),
            ))],
        );
        let counter = class_decl("Counter", None, vec![ClassMember::Property(hits), ClassMember::Method(bump)]);
        let output = compile_hinted(vec![Statement::ClassDecl(counter)], hints);
        let unit = emitted(&output);

        assert!(unit.declaration.contains("std::unique_ptr<js::number> hits;"));
        assert!(unit
            .definition
            .contains("hits(std::make_unique<js::number>(js::number(0)))"));
        assert!(unit
            .definition
            .contains("(*this->hits) = ((*this->hits) + js::number(1));"));
    }
}

// =============================================================================
// OVERLOADS
// =============================================================================

mod overloads {
    use super::*;

    #[test]
    fn test_text_and_numeric_overloads_dispatch_in_order() {
        let output = compile(text_and_number_overloads());
        let unit = emitted(&output);

        assert!(unit.declaration.contains("js::string f(js::string s);"));
        assert!(unit.declaration.contains("js::number f(js::number n);"));
        assert!(unit
            .declaration
            .contains("js::typed::StringOrNumber f(js::typed::StringOrNumber s);"));

        let text = position(&unit.definition, "js::typeof_op(s) == \"string\"_S");
        let numeric = position(&unit.definition, "js::typeof_op(s) == \"number\"_S");
        let fallback = position(&unit.definition, "throw js::TypeError(");
        assert!(text < numeric && numeric < fallback);
    }

    #[test]
    fn test_duplicate_overload_is_reported() {
        let mut statements = text_and_number_overloads();
        statements.push(statements[0].clone());
        let output = compile(statements);
        assert!(output.is_success());
        assert!(output
            .diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::OverloadShadowed));
    }
}

// =============================================================================
// TYPES
// =============================================================================

mod types {
    use super::*;

    #[test]
    fn test_text_numeric_union_and_nullable_globals() {
        let statements = vec![
            typed_let(
                "id",
                1,
                Some(union_ty(vec![string_ty(), number_ty()])),
                Some(num(1.0)),
            ),
            typed_let("count", 2, Some(union_ty(vec![number_ty(), null_ty()])), Some(null())),
        ];
        let output = compile(statements);
        let unit = emitted(&output);
        assert!(unit.declaration.contains("extern js::typed::StringOrNumber id;"));
        assert!(unit
            .declaration
            .contains("extern js::typed::Nullable<js::number> count;"));
        assert!(unit.definition.contains("js::null"));
    }

    #[test]
    fn test_rest_parameter_becomes_variadic_template() {
        let sum = function(
            "sum",
            vec![rest_param("nums", array_ty(number_ty()))],
            Some(number_ty()),
            vec![ret(Some(member(ident("nums"), "length")))],
        );
        let output = compile(vec![Statement::FunctionDecl(sum)]);
        let header = &emitted(&output).declaration;
        assert!(header.contains("template<typename... Rest>"));
        assert!(header.contains("js::number sum(Rest... nums_pack)"));
        assert!(header.contains("js::array<js::number> nums{js::number(nums_pack)...};"));
    }

    #[test]
    fn test_type_name_override_applies() {
        let options = CompilerOptions::default().with_override("number", "double");
        let output = compile_with(options, vec![typed_let("x", 1, Some(number_ty()), Some(num(2.0)))]);
        assert!(emitted(&output).declaration.contains("extern double x;"));
    }
}

// =============================================================================
// DIALECTS
// =============================================================================

mod dialects {
    use super::*;

    fn load() -> Vec<Statement> {
        let f = FunctionDecl {
            is_async: true,
            ..function(
                "load",
                vec![],
                Some(ref_ty("Promise", vec![number_ty()])),
                vec![ret(Some(num(1.0)))],
            )
        };
        vec![Statement::FunctionDecl(f)]
    }

    #[test]
    fn test_async_is_a_coroutine_on_cxx20() {
        let output = compile(load());
        let unit = emitted(&output);
        assert!(unit.declaration.contains("js::Task<js::number> load();"));
        assert!(unit.definition.contains("co_return js::number(1);"));
        assert!(output
            .diagnostics
            .iter()
            .all(|d| d.code != DiagnosticCode::DialectDowngrade));
    }

    #[test]
    fn test_async_downgrades_on_cxx17() {
        let options = CompilerOptions::default().with_dialect(TargetDialect::Cxx17);
        let output = compile_with(options, load());
        let unit = emitted(&output);
        assert!(unit.declaration.contains("js::number load();"));
        assert!(!unit.definition.contains("co_return"));
        assert_eq!(
            output
                .diagnostics
                .iter()
                .filter(|d| d.code == DiagnosticCode::DialectDowngrade)
                .count(),
            1
        );
    }

    #[test]
    fn test_options_from_toml() {
        let options = CompilerOptions::from_toml_str("target_dialect = \"c++17\"\nemit_entry_point = false\n")
            .expect("valid options");
        let output = compile_with(options, vec![expr_stmt(call(ident("print"), vec![]))]);
        let unit = emitted(&output);
        assert!(!unit.declaration.contains("#include <concepts>"));
        assert!(!unit.definition.contains("int main("));
    }
}

// =============================================================================
// UNITS
// =============================================================================

mod units {
    use super::*;

    #[test]
    fn test_unit_layout() {
        let statements = vec![
            let_stmt("total", Some(num(0.0))),
            expr_stmt(assign(
                ident("total"),
                binary(BinaryOperator::Add, ident("total"), num(1.0)),
            )),
        ];
        let output = compile(statements);
        let unit = emitted(&output);

        assert!(unit.declaration.starts_with("#ifndef MAIN_H\n#define MAIN_H"));
        assert!(unit.declaration.contains("#include \"core.h\""));
        assert!(unit.declaration.contains("void Main();"));
        assert!(unit.declaration.trim_end().ends_with("#endif // MAIN_H"));

        assert!(unit.definition.starts_with("#include \"main.h\""));
        assert!(unit.definition.contains("void Main()"));
        assert!(unit.definition.contains("int main(int /*argc*/, char** /*argv*/)"));
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let first = compile(car_and_engine());
        let second = compile(car_and_engine());
        assert_eq!(first, second);
    }

    #[test]
    fn test_json_hand_off_matches_in_memory_tree() {
        let file = SourceFile::new("main.ts", text_and_number_overloads());
        let json = file.to_json().expect("serialize tree");
        let compiler = Compiler::new(CompilerOptions::default());

        let from_json = compiler.compile_json(&json);
        let direct = compiler.compile(&CompilationUnit::new(file));
        assert_eq!(from_json, direct);

        let encoded = serde_json::to_string(&from_json).expect("serialize output");
        let decoded: UnitOutput = serde_json::from_str(&encoded).expect("decode output");
        assert_eq!(decoded, from_json);
    }

    #[test]
    fn test_line_map_points_at_source_lines() {
        let options = CompilerOptions::default().with_line_map(true);
        let output = compile_with(options, vec![typed_let("x", 7, Some(number_ty()), Some(num(3.0)))]);
        let unit = emitted(&output);
        let entry = unit
            .line_map
            .iter()
            .find(|e| e.source_line == 7)
            .expect("mapped line");
        let line = unit
            .definition
            .lines()
            .nth(entry.generated_line as usize - 1)
            .expect("generated line");
        assert!(line.contains("x = js::number(3)"));
    }

    #[test]
    fn test_fatal_error_stays_in_its_unit() {
        let broken = CompilationUnit::new(SourceFile::new("broken.ts", vec![let_stmt("", None)]));
        let healthy = CompilationUnit::new(SourceFile::new("healthy.ts", car_and_engine()));
        let outputs = Compiler::new(CompilerOptions::default()).compile_all(&[broken, healthy]);

        assert_eq!(outputs.len(), 2);
        assert!(outputs[0].emitted.is_none());
        assert_eq!(outputs[0].diagnostics.len(), 1);
        assert_eq!(outputs[0].diagnostics[0].code, DiagnosticCode::ParseInput);

        assert!(outputs[1].is_success());
        assert_eq!(outputs[1].module_name, "healthy");
    }
}
