use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use crate::shape::{Shape, Shaped, TypeIdent};
use crate::value::Value;

// -----------------------------------------------------------------------------
// Registration

/// One registered type: its shape, and through it everything needed to
/// construct instances when a `$type` discriminator names it.
#[derive(Clone, Copy, Debug)]
pub struct Registration {
    shape: &'static Shape,
}

impl Registration {
    pub fn of<T: Shaped>() -> Self {
        Self { shape: T::shape() }
    }

    pub fn from_shape(shape: &'static Shape) -> Self {
        Self { shape }
    }

    #[inline]
    pub fn shape(&self) -> &'static Shape {
        self.shape
    }

    #[inline]
    pub fn ty(&self) -> TypeIdent {
        self.shape.ty()
    }
}

// -----------------------------------------------------------------------------
// Registry

/// The store of types addressable by name.
///
/// `$type` binding looks types up here: first by full path, then by short
/// name. A short name claimed by two registered types becomes ambiguous
/// and refuses resolution from then on, rather than silently picking one.
pub struct Registry {
    by_id: HashMap<TypeId, Registration>,
    path_to_id: HashMap<&'static str, TypeId>,
    name_to_id: HashMap<&'static str, TypeId>,
    ambiguous_names: HashSet<&'static str>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn empty() -> Self {
        Self {
            by_id: HashMap::new(),
            path_to_id: HashMap::new(),
            name_to_id: HashMap::new(),
            ambiguous_names: HashSet::new(),
        }
    }

    /// A registry preloaded with the scalar primitives, `String` and
    /// [`Value`].
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register::<bool>();
        registry.register::<u8>();
        registry.register::<u16>();
        registry.register::<u32>();
        registry.register::<u64>();
        registry.register::<i8>();
        registry.register::<i16>();
        registry.register::<i32>();
        registry.register::<i64>();
        registry.register::<f32>();
        registry.register::<f64>();
        registry.register::<String>();
        registry.register::<Value>();
        registry
    }

    /// Adds `T`, returning `false` when it was already present.
    pub fn register<T: Shaped>(&mut self) -> bool {
        self.register_shape(T::shape())
    }

    /// Adds a type by shape, returning `false` when it was already present.
    pub fn register_shape(&mut self, shape: &'static Shape) -> bool {
        let ty = shape.ty();
        if self.by_id.contains_key(&ty.id()) {
            return false;
        }
        self.by_id.insert(ty.id(), Registration::from_shape(shape));
        self.path_to_id.insert(ty.path(), ty.id());

        let name = ty.name();
        if !self.ambiguous_names.contains(name) {
            if self.name_to_id.contains_key(name) {
                self.name_to_id.remove(name);
                self.ambiguous_names.insert(name);
            } else {
                self.name_to_id.insert(name, ty.id());
            }
        }
        true
    }

    pub fn get(&self, id: TypeId) -> Option<&Registration> {
        self.by_id.get(&id)
    }

    pub fn get_with_path(&self, path: &str) -> Option<&Registration> {
        self.by_id.get(self.path_to_id.get(path)?)
    }

    /// Short-name lookup; `None` for unknown *and* ambiguous names.
    pub fn get_with_name(&self, name: &str) -> Option<&Registration> {
        self.by_id.get(self.name_to_id.get(name)?)
    }

    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.ambiguous_names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// The process-wide registry.
    ///
    /// With the `auto_register` feature every `#[derive(Mapped)]` type is
    /// present; without it, only the preloaded primitives.
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let mut registry = Registry::new();
            #[cfg(feature = "auto_register")]
            for entry in inventory::iter::<AutoRegistration> {
                registry.register_shape((entry.shape)());
            }
            registry
        })
    }
}

// -----------------------------------------------------------------------------
// Auto registration

/// An inventory entry submitted by `#[derive(Mapped)]`.
#[cfg(feature = "auto_register")]
pub struct AutoRegistration {
    pub shape: fn() -> &'static Shape,
}

#[cfg(feature = "auto_register")]
inventory::collect!(AutoRegistration);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_lookup_finds_primitives() {
        let registry = Registry::new();
        let reg = registry.get_with_path("alloc::string::String").unwrap();
        assert_eq!(reg.ty().name(), "String");
    }

    #[test]
    fn short_name_lookup() {
        let registry = Registry::new();
        assert!(registry.get_with_name("String").is_some());
        assert!(registry.get_with_name("NoSuchType").is_none());
    }

    #[test]
    fn double_register_is_a_noop() {
        let mut registry = Registry::empty();
        assert!(registry.register::<String>());
        assert!(!registry.register::<String>());
        assert_eq!(registry.len(), 1);
    }
}
