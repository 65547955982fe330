//! `$type` name binding.

use std::sync::Arc;

use jot_contracts::registry::{Registration, Registry};
use jot_contracts::shape::TypeIdent;

// -----------------------------------------------------------------------------
// TypeBinder

/// Maps between type identities and the names written as `$type`.
///
/// Both directions are fallible: a type may have no wire name, and a wire
/// name may bind to nothing. The engine treats binder failure as a
/// recoverable [`TypeResolution`](crate::FaultKind::TypeResolution) fault.
pub trait TypeBinder: Send + Sync {
    /// The name to write as `$type` for the given type.
    fn name_for(&self, ty: &TypeIdent) -> Option<String>;

    /// Binds a `$type` string back to a registered type.
    fn resolve(&self, name: &str) -> Option<Registration>;
}

// -----------------------------------------------------------------------------
// RegistryBinder

/// The default binder, backed by a [`Registry`].
///
/// Writes full type paths. Resolution tries the full path first, then the
/// unambiguous short name; a short name claimed by several registered types
/// refuses to bind.
pub struct RegistryBinder {
    registry: Source,
}

enum Source {
    Global,
    Owned(Arc<Registry>),
}

impl Default for RegistryBinder {
    fn default() -> Self {
        Self::global()
    }
}

impl RegistryBinder {
    /// Binds through [`Registry::global`].
    pub fn global() -> Self {
        Self {
            registry: Source::Global,
        }
    }

    /// Binds through an explicitly populated registry.
    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self {
            registry: Source::Owned(registry),
        }
    }

    fn registry(&self) -> &Registry {
        match &self.registry {
            Source::Global => Registry::global(),
            Source::Owned(registry) => registry,
        }
    }
}

impl TypeBinder for RegistryBinder {
    fn name_for(&self, ty: &TypeIdent) -> Option<String> {
        Some(ty.path().to_owned())
    }

    fn resolve(&self, name: &str) -> Option<Registration> {
        let registry = self.registry();
        registry
            .get_with_path(name)
            .or_else(|| registry.get_with_name(name))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jot_contracts::shape::Shaped;

    #[test]
    fn resolves_full_path_and_short_name() {
        let mut registry = Registry::empty();
        registry.register::<String>();
        let binder = RegistryBinder::with_registry(Arc::new(registry));

        let by_path = binder.resolve("alloc::string::String").unwrap();
        assert_eq!(by_path.ty().name(), "String");
        let by_name = binder.resolve("String").unwrap();
        assert_eq!(by_name.ty().id(), by_path.ty().id());
        assert!(binder.resolve("NoSuchType").is_none());
    }

    #[test]
    fn name_for_writes_the_full_path() {
        let binder = RegistryBinder::with_registry(Arc::new(Registry::empty()));
        let ty = <String as Shaped>::shape().ty();
        assert_eq!(binder.name_for(&ty).as_deref(), Some("alloc::string::String"));
    }
}
