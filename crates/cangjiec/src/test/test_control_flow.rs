use super::compile_ok;
use crate::opcode::OpCode;

fn has_op(proto: &crate::value::FunctionProto, op: OpCode) -> bool {
    proto.code.iter().any(|ins| ins.op == op)
}

#[test]
fn if_else_compiles_with_conditional_jumps() {
    let proto = compile_ok("if true { var x = 1; } else { var x = 2; }");
    assert!(has_op(&proto, OpCode::Jmp));
}

#[test]
fn while_loop_compiles_with_backward_jump() {
    let proto = compile_ok("var i = 0; while i < 10 { i = i + 1; }");
    assert!(has_op(&proto, OpCode::Lt));
    assert!(has_op(&proto, OpCode::Jmp));
}

#[test]
fn break_inside_while_is_accepted() {
    compile_ok("while true { break; }");
}

#[test]
fn break_outside_loop_is_a_compile_error() {
    let err = crate::compile("break;").unwrap_err();
    assert_eq!(err.kind, crate::CangjieError::BreakOutsideLoop);
}

#[test]
fn continue_outside_loop_is_a_compile_error() {
    let err = crate::compile("continue;").unwrap_err();
    assert_eq!(err.kind, crate::CangjieError::BreakOutsideLoop);
}

#[test]
fn for_over_range_adapts_through_iter_primitive_and_tforcall() {
    let proto = compile_ok("for (i in 1..10) { }");
    assert!(has_op(&proto, OpCode::TForCall));
    assert!(has_op(&proto, OpCode::Call));
}

#[test]
fn generic_for_over_iterable_compiles_through_tforcall() {
    let proto = compile_ok("var xs = [1, 2, 3]; for (x in xs) { }");
    assert!(has_op(&proto, OpCode::TForCall));
}

#[test]
fn for_with_two_variables_reserves_two_loop_registers() {
    let proto = compile_ok("var xs = [1, 2, 3]; for (k, v in xs) { }");
    assert!(has_op(&proto, OpCode::TForCall));
}

#[test]
fn for_with_step_routes_through_range_step_primitive() {
    let proto = compile_ok("var sum = 0; for (i in 0..=10:2) { sum += i; }");
    assert!(has_op(&proto, OpCode::TForCall));
    assert!(has_op(&proto, OpCode::Call));
}

#[test]
fn for_without_parens_is_a_syntax_error() {
    let err = crate::compile("for i in 1..10 { }").unwrap_err();
    assert_eq!(err.kind, crate::CangjieError::Syntax);
}

#[test]
fn if_let_binds_the_enum_payload_in_the_then_branch() {
    let proto = compile_ok("if (let Some(c) <- __cangjie_option_wrap(1)) { var x = c; } else { }");
    assert!(has_op(&proto, OpCode::Test));
    assert!(has_op(&proto, OpCode::Jmp));
}

#[test]
fn while_let_loops_until_the_pattern_stops_matching() {
    let proto = compile_ok("while (let Some(c) <- __cangjie_option_wrap(1)) { break; }");
    assert!(has_op(&proto, OpCode::Test));
}

#[test]
fn while_let_with_and_extra_checks_both_conditions() {
    let proto = compile_ok("var flag = true; while (let Some(c) <- __cangjie_option_wrap(1) && flag) { break; }");
    assert!(has_op(&proto, OpCode::Test));
}

#[test]
fn while_let_with_or_extra_falls_through_on_failed_match() {
    let proto = compile_ok("var flag = true; while (let Some(c) <- __cangjie_option_wrap(1) || flag) { break; }");
    assert!(has_op(&proto, OpCode::Test));
}

#[test]
fn dot_size_suffix_reads_the_underscore_n_field() {
    compile_ok("var xs = [1, 2, 3]; var n = xs.size;");
}

#[test]
fn labeled_while_loop_compiles() {
    compile_ok("::outer:: while true { break; }");
}

#[test]
fn match_statement_with_literal_and_wildcard_arms_compiles() {
    compile_ok(
        "var x = 1;\n\
         match x {\n\
           0 => { }\n\
           _ => { }\n\
         }",
    );
}

#[test]
fn match_statement_with_tuple_pattern_compiles() {
    compile_ok(
        "var pair = (1, 2);\n\
         match pair {\n\
           (a, b) => { }\n\
         }",
    );
}
