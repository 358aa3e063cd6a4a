//! The name pool: a process-wide interner mapping strings to stable
//! integer ids, used everywhere an identifier appears in the
//! compiler's data model.

use fxhash::FxHashMap;

/// A stable integer id for an interned identifier. `NO_NAME` (zero)
/// is reserved and never returned by [`NamePool::intern`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NameId(pub u32);

pub const NO_NAME: NameId = NameId(0);

/// Insertion-stable string interner. Two identical strings always
/// resolve to the same [`NameId`].
#[derive(Debug, Default)]
pub struct NamePool {
    strings: Vec<String>,
    lookup: FxHashMap<String, NameId>,
}

impl NamePool {
    pub fn new() -> Self {
        // id 0 is NO_NAME; push a placeholder so real ids start at 1.
        let mut pool = NamePool {
            strings: vec![String::new()],
            lookup: FxHashMap::default(),
        };
        pool.lookup.insert(String::new(), NO_NAME);
        pool
    }

    pub fn intern(&mut self, s: &str) -> NameId {
        if let Some(&id) = self.lookup.get(s) {
            return id;
        }
        let id = NameId(self.strings.len() as u32);
        self.strings.push(s.to_owned());
        self.lookup.insert(s.to_owned(), id);
        id
    }

    pub fn get(&self, id: NameId) -> &str {
        &self.strings[id.0 as usize]
    }

    pub fn lookup(&self, s: &str) -> Option<NameId> {
        self.lookup.get(s).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let mut pool = NamePool::new();
        let a = pool.intern("foo");
        let b = pool.intern("bar");
        let c = pool.intern("foo");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(pool.get(a), "foo");
    }

    #[test]
    fn no_name_is_reserved() {
        let pool = NamePool::new();
        assert_eq!(pool.get(NO_NAME), "");
    }
}
