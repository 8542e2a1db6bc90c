use super::compile_ok;
use crate::opcode::OpCode;

fn has_op(proto: &crate::value::FunctionProto, op: OpCode) -> bool {
    proto.code.iter().any(|ins| ins.op == op)
}

#[test]
fn arithmetic_expression_emits_add_and_mul() {
    let proto = compile_ok("var x = 1 + 2 * 3;");
    assert!(has_op(&proto, OpCode::Add));
    assert!(has_op(&proto, OpCode::Mul));
}

#[test]
fn comparison_emits_lt() {
    let proto = compile_ok("var x = 1 < 2;");
    assert!(has_op(&proto, OpCode::Lt));
}

#[test]
fn range_literal_compiles_through_a_primitive_call_not_concat() {
    let proto = compile_ok("var r = 1..5;");
    assert!(!has_op(&proto, OpCode::Concat));
    assert!(has_op(&proto, OpCode::Call));
}

#[test]
fn coalesce_compiles_through_a_primitive_call() {
    let proto = compile_ok("var x = nil ?? 5;");
    assert!(has_op(&proto, OpCode::Call));
}

#[test]
fn logical_and_or_short_circuit_via_test_and_jump() {
    let proto = compile_ok("var x = true && false;");
    assert!(has_op(&proto, OpCode::Test) || has_op(&proto, OpCode::Jmp));
}

#[test]
fn string_interpolation_compiles_without_error() {
    let proto = compile_ok(r#"var name = "world"; var greeting = "hi ${name}!";"#);
    assert!(!proto.code.is_empty());
}

#[test]
fn array_literal_emits_newtable_and_setlist() {
    let proto = compile_ok("var xs = [1, 2, 3];");
    assert!(has_op(&proto, OpCode::NewTable));
}
