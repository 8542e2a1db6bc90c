//! Overload and named-argument call dispatch (spec.md §4.B "overload
//! resolution", §4.E "overload"/"named_call").
//!
//! Overload sets are stored as a table keyed by parameter count, mapping to
//! the `Function` declared with that arity. Resolution picks an exact match
//! first, then falls back to the nearest overload with *more* parameters
//! (trailing defaults fill the gap) and finally the nearest with *fewer*
//! (variadic-style fallback), matching spec.md §4.E's overload algorithm.

use super::{arg, as_int, as_table, err, RuntimeResult};
use crate::interner::Interner;
use crate::value::{Table, TableKey, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// `__cangjie_overload(old, new_fn, nparams)`: `old` is `Nil` the first time
/// a name is declared, or a dispatcher table from a previous call. Returns
/// the (possibly newly built) dispatcher table keyed by parameter count.
pub fn overload(_interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let old = arg(args, 0)?.clone();
    let new_fn = arg(args, 1)?.clone();
    let nparams = as_int(arg(args, 2)?)?;

    let table = match old {
        Value::Table(t) => t,
        _ => Rc::new(RefCell::new(Table::new())),
    };
    table.borrow_mut().set_int(nparams + 1, new_fn);
    Ok(vec![Value::Table(table)])
}

fn pick_overload(dispatcher: &Rc<RefCell<Table>>, nargs: i64) -> Option<Value> {
    let dispatcher = dispatcher.borrow();
    if let Some(exact) = dispatcher.hash.get(&TableKey::Int(nargs + 1)) {
        return Some(exact.clone());
    }
    let mut candidates: Vec<i64> = dispatcher
        .hash
        .keys()
        .filter_map(|k| if let TableKey::Int(n) = k { Some(*n - 1) } else { None })
        .collect();
    candidates.sort_unstable();
    if let Some(&more) = candidates.iter().find(|&&n| n > nargs) {
        return dispatcher.hash.get(&TableKey::Int(more + 1)).cloned();
    }
    candidates.iter().rev().find(|&&n| n < nargs).and_then(|&fewer| dispatcher.hash.get(&TableKey::Int(fewer + 1)).cloned())
}

/// Resolves `fn(args…)` when `fn` is an overload dispatcher table rather
/// than a plain function. Call sites that aren't overloaded never reach
/// this: `parser.rs` compiles them as an ordinary `CALL`.
pub fn resolve_call(dispatcher: &Rc<RefCell<Table>>, nargs: i64) -> RuntimeResult<Value> {
    pick_overload(dispatcher, nargs).ok_or_else(|| err(format!("no overload accepts {nargs} argument(s)")))
}

/// `__cangjie_named_call(fn, pos1, …, posN, npos, named)`: selects the
/// smallest-arity overload that can accommodate `npos` positional arguments,
/// then fills trailing parameters from `named` by the target's recorded
/// parameter names, leaving `nil` where `named` has no entry for a name
/// (spec.md §4.E "named_call").
pub fn named_call(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let target = arg(args, 0)?.clone();
    let named_idx = args.len().checked_sub(1).ok_or_else(|| err("named_call requires a trailing named-args table"))?;
    let named = as_table(arg(args, named_idx)?)?;
    let npos_idx = named_idx.checked_sub(1).ok_or_else(|| err("named_call requires an npos argument"))?;
    let npos = as_int(arg(args, npos_idx)?)? as usize;
    let positional = &args[1..npos_idx.min(args.len())];
    let positional = &positional[..npos.min(positional.len())];

    let proto = match &target {
        Value::Function(p) => p.clone(),
        Value::Table(dispatcher) => {
            let resolved = resolve_call(dispatcher, npos as i64)?;
            match resolved {
                Value::Function(p) => p,
                _ => return Err(err("resolved overload is not callable")),
            }
        }
        _ => return Err(err("named_call target is not callable")),
    };

    let mut final_args: Vec<Value> = positional.to_vec();
    for pname in proto.param_names.iter().skip(positional.len()) {
        let key_sym = *pname;
        let value = named.borrow().get_str(key_sym);
        let _ = interner; // param names are already Sym-keyed from compile time
        final_args.push(value);
    }
    Ok(vec![Value::Function(proto)].into_iter().chain(final_args).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interner::Interner;

    fn dummy_fn(name: &str, params: Vec<crate::interner::Sym>) -> Value {
        Value::Function(Rc::new(crate::value::FunctionProto {
            name: Some(name.to_string()),
            num_params: params.len() as u8,
            is_vararg: false,
            code: vec![],
            constants: vec![],
            param_names: params,
            upvalue_names: vec![],
            nested: vec![],
        }))
    }

    #[test]
    fn overload_picks_exact_arity_match() {
        let mut interner = Interner::new();
        let one = dummy_fn("greet1", vec![interner.intern("name")]);
        let two = dummy_fn("greet2", vec![interner.intern("name"), interner.intern("greeting")]);
        let dispatcher = overload(&mut interner, &[Value::Nil, one, Value::Int(1)]).unwrap().remove(0);
        let dispatcher = overload(&mut interner, &[dispatcher, two, Value::Int(2)]).unwrap().remove(0);
        let Value::Table(table) = dispatcher else { panic!() };
        let resolved = resolve_call(&table, 2).unwrap();
        assert!(matches!(resolved, Value::Function(p) if p.name.as_deref() == Some("greet2")));
    }

    #[test]
    fn overload_falls_back_to_more_params_when_no_exact_match() {
        let mut interner = Interner::new();
        let two = dummy_fn("greet2", vec![interner.intern("a"), interner.intern("b")]);
        let dispatcher = overload(&mut interner, &[Value::Nil, two, Value::Int(2)]).unwrap().remove(0);
        let Value::Table(table) = dispatcher else { panic!() };
        let resolved = resolve_call(&table, 1).unwrap();
        assert!(matches!(resolved, Value::Function(_)));
    }
}
