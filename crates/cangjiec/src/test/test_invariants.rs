use super::compile_ok;

#[test]
fn tuple_literal_round_trips_through_pattern_destructuring() {
    compile_ok(
        "var pair = (1, 2);\n\
         match pair {\n\
           (a, b) => { var sum = a + b; }\n\
         }",
    );
}

#[test]
fn empty_tuple_literal_compiles() {
    compile_ok("var unit = ();");
}

#[test]
fn parenthesized_expression_is_not_mistaken_for_a_tuple() {
    let proto = compile_ok("var x = (1 + 2) * 3;");
    assert!(proto.code.iter().any(|ins| ins.op == crate::opcode::OpCode::Mul));
}

#[test]
fn too_many_locals_is_a_compile_error_not_a_panic() {
    let mut src = String::new();
    for i in 0..300 {
        src.push_str(&format!("var v{i} = {i};\n"));
    }
    let err = crate::compile(&src).unwrap_err();
    assert_eq!(err.kind, crate::CangjieError::TooManyLocals);
}

#[test]
fn enum_case_constructor_is_exported_as_a_bare_global() {
    let proto = compile_ok(
        "enum Shape { case Circle(Float), case Point }\n\
         var s = Circle(1.0);\n\
         match s {\n\
           Circle(r) => { }\n\
           Point => { }\n\
           _ => { }\n\
         }",
    );
    assert!(!proto.code.is_empty());
}

#[test]
fn error_messages_report_the_chunk_name_and_line() {
    let err = crate::compiler::compile_with_options(
        "var x = ;",
        crate::compiler::CompileOptions { chunk_name: "demo.cj".to_string() },
    )
    .unwrap_err();
    assert_eq!(err.chunk_name.as_str(), "demo.cj");
    assert_eq!(err.line, 1);
}
