//! String interning table.
//!
//! Ported from `luars::gc::string_interner`'s anchoring idea: every
//! identifier and string literal token is interned once so that equal byte
//! content always yields the same handle, and handle equality is integer
//! equality rather than a byte compare. Strings stay anchored in `by_text`
//! for the whole parse (spec.md §3.2, §5 "String interning table"); there is
//! no GC here to reclaim them mid-parse, so anchoring is just "never remove".

use ahash::AHashMap;
use smol_str::SmolStr;

/// Interned string handle. Two `Sym`s are equal iff the underlying text is
/// equal — comparing `Sym`s is comparing `u32`s, never bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sym(u32);

impl Sym {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Default)]
pub struct Interner {
    strings: Vec<SmolStr>,
    by_text: AHashMap<SmolStr, Sym>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, text: &str) -> Sym {
        if let Some(sym) = self.by_text.get(text) {
            return *sym;
        }
        let sym = Sym(self.strings.len() as u32);
        let owned = SmolStr::new(text);
        self.strings.push(owned.clone());
        self.by_text.insert(owned, sym);
        sym
    }

    pub fn resolve(&self, sym: Sym) -> &str {
        &self.strings[sym.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_pointer_equal_for_equal_bytes() {
        let mut interner = Interner::new();
        let a = interner.intern("describe");
        let b = interner.intern("describe");
        assert_eq!(a, b);
        let c = interner.intern("other");
        assert_ne!(a, c);
    }

    #[test]
    fn resolve_round_trips() {
        let mut interner = Interner::new();
        let sym = interner.intern("Animal");
        assert_eq!(interner.resolve(sym), "Animal");
    }
}
