//! `ArrayList`/`ArrayStack`/`HashMap`/`HashSet` constructors (spec.md §4.E
//! "mirror the outline tables in the source"). These are ordinary classes
//! built from the same machinery [`super::class`] provides — a
//! `Table` with a `__kind` tag plus whatever array/hash contents the
//! constructor call supplied — rather than a separate collection runtime.

use super::{as_table, RuntimeResult};
use crate::interner::Interner;
use crate::value::{Table, TableKey, Value};
use std::cell::RefCell;
use std::rc::Rc;

fn tagged(interner: &mut Interner, kind: &str, array: Vec<Value>, hash: ahash::AHashMap<TableKey, Value>) -> Value {
    let sym = interner.intern("__kind");
    let mut t = Table { array, hash, metatable: None };
    t.set_str(sym, Value::Str(Rc::new(kind.to_string())));
    Value::Table(Rc::new(RefCell::new(t)))
}

/// `ArrayList(e1, e2, …)`: backed by `Table`'s array part directly, so
/// indexing/`len`/`iter` all fall out of the primitives already built for
/// plain tables.
pub fn array_list_new(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    Ok(vec![tagged(interner, "ArrayList", args.to_vec(), Default::default())])
}

/// `ArrayStack(e1, e2, …)`: same array-part backing as `ArrayList`; push/pop
/// are just `set_int(len+1, v)` / dropping the last array slot, which callers
/// do directly through `__cangjie_array_slice`/table ops rather than a
/// dedicated primitive.
pub fn array_stack_new(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    Ok(vec![tagged(interner, "ArrayStack", args.to_vec(), Default::default())])
}

/// `HashMap((k1, v1), (k2, v2), …)`: each argument is a 2-element `Tuple`
/// from a `(key, value)` literal; string and int keys land in the table's
/// hash part, matching how field lookups already key on `TableKey`.
pub fn hash_map_new(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let mut hash = ahash::AHashMap::default();
    for pair in args {
        if let Value::Tuple(items) = pair {
            if items.len() == 2 {
                let key = to_table_key(interner, &items[0]);
                hash.insert(key, items[1].clone());
            }
        }
    }
    Ok(vec![tagged(interner, "HashMap", Vec::new(), hash)])
}

/// `HashSet(e1, e2, …)`: membership is a hash-part presence check, so each
/// element becomes a key mapped to `true`.
pub fn hash_set_new(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let mut hash = ahash::AHashMap::default();
    for v in args {
        let key = to_table_key(interner, v);
        hash.insert(key, Value::Bool(true));
    }
    Ok(vec![tagged(interner, "HashSet", Vec::new(), hash)])
}

fn to_table_key(interner: &mut Interner, v: &Value) -> TableKey {
    match v {
        Value::Int(i) => TableKey::Int(*i),
        Value::Bool(b) => TableKey::Bool(*b),
        Value::Str(s) => TableKey::Str(interner.intern(s.as_str())),
        other => TableKey::Str(interner.intern(&format!("{other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_list_new_keeps_positional_order() {
        let mut interner = Interner::new();
        let result = array_list_new(&mut interner, &[Value::Int(1), Value::Int(2), Value::Int(3)]).unwrap();
        let t = as_table(&result[0]).unwrap();
        assert_eq!(t.borrow().len(), 3);
    }

    #[test]
    fn hash_set_new_dedupes_via_table_key_equality() {
        let mut interner = Interner::new();
        let result = hash_set_new(&mut interner, &[Value::Int(1), Value::Int(1), Value::Int(2)]).unwrap();
        let t = as_table(&result[0]).unwrap();
        assert_eq!(t.borrow().hash.len(), 2);
    }

    #[test]
    fn hash_map_new_reads_pairs_from_tuples() {
        let mut interner = Interner::new();
        let pair = Value::Tuple(Rc::new(vec![Value::Str(Rc::new("x".to_string())), Value::Int(42)]));
        let result = hash_map_new(&mut interner, &[pair]).unwrap();
        let t = as_table(&result[0]).unwrap();
        let sym = interner.intern("x");
        assert!(matches!(t.borrow().get_str(sym), Value::Int(42)));
    }
}
