//! Higher-level/integration tests driven through the public `compile` API,
//! complementing the `#[cfg(test)]` unit tests colocated with each module.
//! Grounded in `luars`' own split between unit tests beside the code they
//! cover and a top-level integration suite exercising whole chunks.

mod test_control_flow;
mod test_declarations;
mod test_expr;
mod test_invariants;
mod test_lexer;
mod test_runtime;

/// Shared helper: compile and panic with the compiler's own message on
/// failure, since a test asserting on the happy path has no use for a
/// `Result` it never expects to be `Err`.
fn compile_ok(src: &str) -> std::rc::Rc<crate::value::FunctionProto> {
    crate::compile(src).unwrap_or_else(|e| panic!("expected {src:?} to compile: {e}"))
}
