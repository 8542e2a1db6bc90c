use super::compile_ok;
use crate::opcode::OpCode;

fn global_setgets(proto: &crate::value::FunctionProto) -> Vec<&str> {
    proto
        .code
        .iter()
        .filter(|ins| ins.op == OpCode::GetGlobal)
        .filter_map(|ins| match proto.constants.get(ins.bx() as usize) {
            Some(crate::value::Value::Str(s)) => Some(s.as_str()),
            _ => None,
        })
        .collect()
}

#[test]
fn struct_decl_calls_setup_struct_not_setup_class() {
    let proto = compile_ok("struct Point { var x: Int = 0; var y: Int = 0; }");
    let calls = global_setgets(&proto);
    assert!(calls.contains(&"__cangjie_setup_struct"));
    assert!(!calls.contains(&"__cangjie_setup_class"));
}

#[test]
fn class_decl_with_parent_calls_set_parent() {
    let proto = compile_ok(
        "class Animal { func speak() { } }\n\
         class Dog : Animal { func speak() { } }",
    );
    let calls = global_setgets(&proto);
    assert!(calls.contains(&"__cangjie_setup_class"));
    assert!(calls.contains(&"__cangjie_set_parent"));
}

#[test]
fn class_with_init_calls_define_init() {
    let proto = compile_ok("class Point { var x: Int = 0; init(x: Int) { this.x = x; } }");
    let calls = global_setgets(&proto);
    assert!(calls.contains(&"__cangjie_define_init"));
}

#[test]
fn operator_overload_uses_dunder_method_name() {
    let proto = compile_ok("class Vec { operator func +(other: Vec) { } }");
    let calls = global_setgets(&proto);
    assert!(calls.contains(&"__cangjie_define_method"));
}

#[test]
fn interface_decl_calls_setup_interface_and_declare_signature() {
    let proto = compile_ok("interface Greeter { func greet(name: String); }");
    let calls = global_setgets(&proto);
    assert!(calls.contains(&"__cangjie_setup_interface"));
    assert!(calls.contains(&"__cangjie_declare_signature"));
}

#[test]
fn extend_rejects_stored_fields() {
    let err = crate::compile("class Point { } extend Point { var z: Int = 0; }").unwrap_err();
    assert_eq!(err.kind, crate::CangjieError::Syntax);
}

#[test]
fn extend_with_interface_calls_apply_interface() {
    let proto = compile_ok(
        "interface Greeter { func greet(); }\n\
         class Dog { }\n\
         extend Dog : Greeter { func greet() { } }",
    );
    let calls = global_setgets(&proto);
    assert!(calls.contains(&"__cangjie_apply_interface"));
}

#[test]
fn enum_decl_declares_each_case() {
    let proto = compile_ok("enum Shape { case Circle(Float), case Square(Float), case Point }");
    let calls = global_setgets(&proto);
    assert!(calls.contains(&"__cangjie_setup_enum"));
    let declare_count = proto
        .code
        .iter()
        .filter(|ins| ins.op == OpCode::GetGlobal)
        .filter(|ins| matches!(proto.constants.get(ins.bx() as usize), Some(crate::value::Value::Str(s)) if s.as_str() == "__cangjie_declare_case"))
        .count();
    assert_eq!(declare_count, 3);
}
