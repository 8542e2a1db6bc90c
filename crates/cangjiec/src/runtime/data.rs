//! Ranges, tuples, and `Option` (spec.md §3.6, §4.E).

use super::{arg, as_int, err, RuntimeResult};
use crate::interner::Interner;
use crate::value::Value;
use std::rc::Rc;

/// `__cangjie_range(start, end, step, inclusive)`, the canonical 4-argument
/// constructor spec.md §6.4 describes and the one `for (i in a..b:step)`
/// emits (spec.md §4.D).
pub fn range(_interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let start = as_int(arg(args, 0)?)?;
    let end = as_int(arg(args, 1)?)?;
    let step = match args.get(2) {
        Some(v) if !matches!(v, Value::Nil) => as_int(v)?,
        _ => 1,
    };
    let inclusive = match args.get(3) {
        Some(Value::Bool(b)) => *b,
        _ => false,
    };
    Ok(vec![Value::Range { start, end, inclusive, step }])
}

/// `a..b`, as compiled by `subexpr`'s `Concat` case.
pub fn range_new(_interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let start = as_int(arg(args, 0)?)?;
    let end = as_int(arg(args, 1)?)?;
    Ok(vec![Value::Range { start, end, inclusive: false, step: 1 }])
}

/// `a..=b`, as compiled by `subexpr`'s `ConcatEq` case.
pub fn range_new_inclusive(_interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let start = as_int(arg(args, 0)?)?;
    let end = as_int(arg(args, 1)?)?;
    Ok(vec![Value::Range { start, end, inclusive: true, step: 1 }])
}

/// `__cangjie_range_step(range, step)`: overrides an already-built range's
/// stride, as emitted by `for (i in a..b:step)` once the bare `a..b`/`a..=b`
/// range has already been constructed by the ordinary `..`/`..=` dispatch
/// (spec.md §4.D "for").
pub fn range_step(_interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let (start, end, inclusive) = match arg(args, 0)? {
        Value::Range { start, end, inclusive, .. } => (*start, *end, *inclusive),
        other => return Err(err(format!("cannot step {}: not a range", other.type_name()))),
    };
    let step = as_int(arg(args, 1)?)?;
    Ok(vec![Value::Range { start, end, inclusive, step }])
}

/// `a ?? b`: nil or `None` falls through to `b`; `Some(x)` unwraps to `x`;
/// anything else passes through unchanged (spec.md §4.E "coalesce").
pub fn coalesce(_interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let a = arg(args, 0)?.clone();
    let b = arg(args, 1)?.clone();
    let result = match a {
        Value::Nil | Value::OptionNone => b,
        Value::OptionSome(inner) => (*inner).clone(),
        other => other,
    };
    Ok(vec![result])
}

/// `(e1, e2, …)` tuple literal.
pub fn tuple(_interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    Ok(vec![Value::Tuple(Rc::new(args.to_vec()))])
}

/// Positional element access used both by tuple-destructuring assignment
/// and by `pattern.rs`'s tuple-pattern compilation.
pub fn tuple_get(_interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let idx = as_int(arg(args, 1)?)? as usize;
    match arg(args, 0)? {
        Value::Tuple(items) => Ok(vec![items.get(idx).cloned().unwrap_or(Value::Nil)]),
        other => Err(err(format!("cannot index {} as a tuple", other.type_name()))),
    }
}

/// Normalizes a value into `Option` shape: `nil` becomes `None`, an existing
/// `Option` passes through, everything else becomes `Some(v)` (spec.md §4.E
/// "option_wrap").
pub fn option_wrap(_interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let v = arg(args, 0)?.clone();
    let wrapped = match v {
        Value::Nil => Value::OptionNone,
        Value::OptionSome(_) | Value::OptionNone => v,
        other => Value::OptionSome(Rc::new(other)),
    };
    Ok(vec![wrapped])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesce_falls_through_none_and_unwraps_some() {
        let mut interner = Interner::new();
        let none_case = coalesce(&mut interner, &[Value::OptionNone, Value::Int(5)]).unwrap();
        assert!(matches!(none_case[0], Value::Int(5)));

        let some_case = coalesce(&mut interner, &[Value::OptionSome(Rc::new(Value::Int(1))), Value::Int(5)]).unwrap();
        assert!(matches!(some_case[0], Value::Int(1)));
    }

    #[test]
    fn range_new_inclusive_sets_the_flag() {
        let mut interner = Interner::new();
        let r = range_new_inclusive(&mut interner, &[Value::Int(1), Value::Int(10)]).unwrap();
        assert!(matches!(r[0], Value::Range { start: 1, end: 10, inclusive: true, step: 1 }));
    }

    #[test]
    fn range_step_overrides_stride_and_keeps_bounds() {
        let mut interner = Interner::new();
        let r = range_step(&mut interner, &[Value::Range { start: 0, end: 10, inclusive: true, step: 1 }, Value::Int(2)]).unwrap();
        assert!(matches!(r[0], Value::Range { start: 0, end: 10, inclusive: true, step: 2 }));
    }

    #[test]
    fn range_step_rejects_non_range_argument() {
        let mut interner = Interner::new();
        assert!(range_step(&mut interner, &[Value::Int(5), Value::Int(2)]).is_err());
    }

    #[test]
    fn tuple_get_reads_positional_elements() {
        let mut interner = Interner::new();
        let t = tuple(&mut interner, &[Value::Int(1), Value::Int(2)]).unwrap().remove(0);
        let second = tuple_get(&mut interner, &[t, Value::Int(1)]).unwrap();
        assert!(matches!(second[0], Value::Int(2)));
    }
}
