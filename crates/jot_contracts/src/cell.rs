use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

/// A per-type store of `'static` values, for statics inside generic functions.
///
/// A `static` item declared inside a generic function is shared across every
/// instantiation, so generic `Shaped` impls cannot use a plain `OnceLock` to
/// hold their shape. This cell keys the value by [`TypeId`] instead.
pub struct StaticCell<V: Copy + 'static> {
    map: OnceLock<RwLock<HashMap<TypeId, V>>>,
}

impl<V: Copy + 'static> StaticCell<V> {
    pub const fn new() -> Self {
        Self {
            map: OnceLock::new(),
        }
    }

    /// Returns the value stored for `T`, computing and publishing it on the
    /// first call. `f` typically leaks a box to produce a `'static` borrow.
    ///
    /// `f` runs with no lock held: a self-nested init (`Vec<Vec<T>>` reaches
    /// this cell for `Vec<T>` while computing `Vec<Vec<T>>`) must not block
    /// on its own outer call. The cost is that a race can run `f` twice; the
    /// first published value wins and the loser's leak is permanent but tiny.
    pub fn get_or_init<T: 'static>(&self, f: impl FnOnce() -> V) -> V {
        let map = self.map.get_or_init(|| RwLock::new(HashMap::new()));
        let id = TypeId::of::<T>();
        {
            let read = map.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(v) = read.get(&id) {
                return *v;
            }
        }
        let value = f();
        let mut write = map.write().unwrap_or_else(PoisonError::into_inner);
        *write.entry(id).or_insert(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static STRINGS: StaticCell<&'static str> = StaticCell::new();

    #[test]
    fn distinct_types_get_distinct_slots() {
        let a = STRINGS.get_or_init::<u8>(|| "u8");
        let b = STRINGS.get_or_init::<u16>(|| "u16");
        assert_eq!(a, "u8");
        assert_eq!(b, "u16");
    }

    #[test]
    fn init_may_reenter_for_another_type() {
        static NESTED: StaticCell<&'static str> = StaticCell::new();
        let outer = NESTED.get_or_init::<u64>(|| {
            match NESTED.get_or_init::<i64>(|| "inner") {
                "inner" => "outer",
                other => other,
            }
        });
        assert_eq!(outer, "outer");
        assert_eq!(NESTED.get_or_init::<i64>(|| "late"), "inner");
    }

    #[test]
    fn second_init_is_ignored() {
        let a = STRINGS.get_or_init::<u32>(|| "first");
        let b = STRINGS.get_or_init::<u32>(|| "second");
        assert_eq!(a, "first");
        assert_eq!(b, "first");
        assert!(std::ptr::eq(a, b));
    }
}
