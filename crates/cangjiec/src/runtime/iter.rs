//! Generic-for adaptation and range/array slicing (spec.md §4.D "for",
//! §4.E "iter"/"array_slice"/"array_slice_set").

use super::{arg, as_int, as_table, err, RuntimeResult};
use crate::interner::Interner;
use crate::value::{Table, Value};
use std::cell::RefCell;
use std::rc::Rc;

const ITER_KIND: &str = "__iter_kind";
const ITER_SOURCE: &str = "__iter_source";
const ITER_POS: &str = "__iter_pos";

/// Adapts any iterable (`Range`, `Table`/array, or an already-callable
/// `Function`) into the three-value generic-for protocol
/// `(iterator_function, state, control)` the target VM's `TFORCALL`/
/// `TFORLOOP` already drive (spec.md §6.2 generic-for contract). Since this
/// crate never executes the VM, the "iterator function" returned here is a
/// state table the embedder's `TFORCALL` implementation is expected to
/// recognize and step, rather than a real `Function` value — documented as
/// a simplification in DESIGN.md.
pub fn iter(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let v = arg(args, 0)?.clone();
    match v {
        Value::Function(_) => Ok(vec![v, Value::Nil, Value::Nil]),
        Value::Range { start, .. } => {
            let state = Rc::new(RefCell::new(Table::new()));
            set_marker(&state, interner, ITER_KIND, Value::Str(Rc::new("range".to_string())));
            set_marker(&state, interner, ITER_SOURCE, v);
            Ok(vec![Value::Table(state), Value::Nil, Value::Int(start)])
        }
        Value::Table(_) => {
            let state = Rc::new(RefCell::new(Table::new()));
            set_marker(&state, interner, ITER_KIND, Value::Str(Rc::new("array".to_string())));
            set_marker(&state, interner, ITER_SOURCE, v);
            Ok(vec![Value::Table(state), Value::Nil, Value::Int(0)])
        }
        other => Err(err(format!("{} is not iterable", other.type_name()))),
    }
}

fn set_marker(state: &Rc<RefCell<Table>>, interner: &mut Interner, key: &str, value: Value) {
    let sym = interner.intern(key);
    state.borrow_mut().set_str(sym, value);
}

/// Steps an iteration state built by [`iter`], returning the next control
/// value and yielded item, or `Nil` to signal exhaustion. This is the
/// function an embedder's `TFORCALL` would actually invoke each iteration.
pub fn step(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let state = as_table(arg(args, 0)?)?;
    let control = arg(args, 1)?.clone();
    let kind_sym = interner.intern(ITER_KIND);
    let source_sym = interner.intern(ITER_SOURCE);
    let kind = state.borrow().get_str(kind_sym);
    let source = state.borrow().get_str(source_sym);

    match (kind, source) {
        (Value::Str(k), Value::Range { start: _, end, inclusive, step }) if &*k == "range" => {
            let current = as_int(&control)?;
            let at_end = if step >= 0 {
                if inclusive { current > end } else { current >= end }
            } else if inclusive {
                current < end
            } else {
                current <= end
            };
            if at_end {
                Ok(vec![Value::Nil])
            } else {
                Ok(vec![Value::Int(current + step), Value::Int(current)])
            }
        }
        (Value::Str(k), Value::Table(arr)) if &*k == "array" => {
            let idx = as_int(&control)?;
            let item = arr.borrow().get_int(idx + 1);
            if matches!(item, Value::Nil) {
                Ok(vec![Value::Nil])
            } else {
                Ok(vec![Value::Int(idx + 1), item])
            }
        }
        _ => Err(err("malformed iteration state")),
    }
}

/// `arr[start..end]` / `arr[start..=end]` read: for tables, a new 0-based
/// subtable; for strings, a UTF-8-aware character slice.
pub fn array_slice(_interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let start = as_int(arg(args, 1)?)?;
    let end = as_int(arg(args, 2)?)?;
    let inclusive = matches!(arg(args, 3)?, Value::Bool(true));
    match arg(args, 0)? {
        Value::Table(t) => {
            let t = t.borrow();
            let last = if inclusive { end } else { end - 1 };
            let mut out = Vec::new();
            let mut i = start;
            while i <= last {
                out.push(t.get_int(i + 1));
                i += 1;
            }
            Ok(vec![Value::Table(Rc::new(RefCell::new(Table {
                array: out,
                hash: Default::default(),
                metatable: None,
            })))])
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let last = if inclusive { end } else { end - 1 };
            let slice: String = chars
                .iter()
                .enumerate()
                .filter(|(i, _)| *i as i64 >= start && *i as i64 <= last)
                .map(|(_, c)| *c)
                .collect();
            Ok(vec![Value::Str(Rc::new(slice))])
        }
        other => Err(err(format!("cannot slice {}", other.type_name()))),
    }
}

/// `arr[start..end] = values` / `arr[start..=end] = values`: copies
/// `values[0..count-1]` into `arr[start..start+count-1]` in place.
pub fn array_slice_set(_interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let target = as_table(arg(args, 0)?)?;
    let start = as_int(arg(args, 1)?)?;
    let values = as_table(arg(args, 4)?)?;
    let values = values.borrow();
    let count = values.len();
    let mut target = target.borrow_mut();
    for i in 0..count {
        let v = values.get_int(i + 1);
        target.set_int(start + i + 1, v);
    }
    Ok(vec![])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iter_over_range_steps_through_bounds() {
        let mut interner = Interner::new();
        let state = iter(&mut interner, &[Value::Range { start: 1, end: 3, inclusive: true, step: 1 }]).unwrap();
        let Value::Table(_) = &state[0] else { panic!() };
        let Value::Int(initial) = state[2] else { panic!() };
        assert_eq!(initial, 1);

        let next = step(&mut interner, &[state[0].clone(), Value::Int(1)]).unwrap();
        assert!(matches!(next[0], Value::Int(2)));
        assert!(matches!(next[1], Value::Int(1)));
    }

    #[test]
    fn iter_over_range_honors_step() {
        let mut interner = Interner::new();
        let state = iter(&mut interner, &[Value::Range { start: 0, end: 10, inclusive: true, step: 2 }]).unwrap();
        let mut control = state[2].clone();
        let mut seen = Vec::new();
        loop {
            let next = step(&mut interner, &[state[0].clone(), control]).unwrap();
            if next.len() == 1 {
                break; // Nil: exhausted
            }
            let Value::Int(item) = next[1] else { panic!() };
            seen.push(item);
            control = next[0].clone();
        }
        assert_eq!(seen, vec![0, 2, 4, 6, 8, 10]);
    }

    #[test]
    fn iter_over_range_exhausts_at_bound() {
        let mut interner = Interner::new();
        let state = iter(&mut interner, &[Value::Range { start: 1, end: 2, inclusive: false, step: 1 }]).unwrap();
        let next = step(&mut interner, &[state[0].clone(), Value::Int(1)]).unwrap();
        assert!(matches!(next[0], Value::Nil));
    }

    #[test]
    fn array_slice_extracts_subrange() {
        let mut interner = Interner::new();
        let t = Rc::new(RefCell::new(Table::new()));
        t.borrow_mut().set_int(1, Value::Int(10));
        t.borrow_mut().set_int(2, Value::Int(20));
        t.borrow_mut().set_int(3, Value::Int(30));
        let result = array_slice(&mut interner, &[Value::Table(t), Value::Int(1), Value::Int(2), Value::Bool(true)]).unwrap();
        let Value::Table(sub) = &result[0] else { panic!() };
        assert_eq!(sub.borrow().len(), 2);
    }
}
