use crate::runtime;

/// Every `GETGLOBAL "__cangjie_*"` the compiler can emit must resolve to a
/// primitive the catalog actually registers — otherwise a chunk this crate
/// produces would reference a global no embedder could ever satisfy.
#[test]
fn every_emitted_primitive_name_is_in_the_catalog() {
    let catalog: std::collections::HashSet<&str> = runtime::catalog().iter().map(|p| p.name).collect();
    let samples = [
        "struct Point { var x: Int = 0; }",
        "class Animal { func speak() { } } class Dog : Animal { func speak() { } }",
        "interface Greeter { func greet(); }",
        "class Dog { } extend Dog : Greeter { func greet() { } }",
        "enum Shape { case Circle(Float), case Point }",
        "var r = 1..5; var s = 1..=5;",
        "var x = nil ?? 5;",
        "var pair = (1, 2);",
        "var xs = [1, 2, 3]; for x in xs { }",
        "match 1 { (a, b) => { } _ => { } }",
    ];
    for src in samples {
        let proto = crate::compile(src).unwrap_or_else(|e| panic!("{src:?}: {e}"));
        for ins in &proto.code {
            if ins.op == crate::opcode::OpCode::GetGlobal {
                if let Some(crate::value::Value::Str(s)) = proto.constants.get(ins.bx() as usize) {
                    if s.starts_with("__cangjie_") {
                        assert!(catalog.contains(s.as_str()), "missing primitive {s} compiled from {src:?}");
                    }
                }
            }
        }
    }
}

#[test]
fn install_populates_globals_under_reserved_names() {
    let mut interner = crate::interner::Interner::new();
    let globals = std::rc::Rc::new(std::cell::RefCell::new(crate::value::Table::new()));
    runtime::install(&globals, &mut interner);
    let sym = interner.intern("__cangjie_setup_class");
    assert!(matches!(globals.borrow().get_str(sym), crate::value::Value::Function(_)));
}

#[test]
fn class_and_enum_primitives_compose_end_to_end() {
    let mut interner = crate::interner::Interner::new();
    let animal = runtime::class::setup_class(&mut interner, &[crate::value::Value::Str(std::rc::Rc::new("Animal".to_string()))])
        .unwrap()
        .remove(0);
    let inst = runtime::class::instantiate(&mut interner, &[animal]).unwrap();
    assert!(matches!(inst[0], crate::value::Value::Instance { .. }));
}
