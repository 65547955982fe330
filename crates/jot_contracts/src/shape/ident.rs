use core::any::TypeId;
use core::fmt;

use crate::shape::Shape;

// -----------------------------------------------------------------------------
// Named / Shaped

/// A type with a stable textual identity.
///
/// `type_path` is the full module path (`my_app::model::Person`), used as the
/// `$type` discriminator and as the registry key. `type_name` is the final
/// segment, used as a fallback discriminator when unambiguous.
pub trait Named: 'static {
    fn type_path() -> &'static str;
    fn type_name() -> &'static str;
}

/// A type with a static [`Shape`].
///
/// Implemented by `#[derive(Mapped)]`, by the built-in impls in
/// [`impls`](crate::impls), or by hand for exotic types.
pub trait Shaped: Named {
    fn shape() -> &'static Shape;
}

// -----------------------------------------------------------------------------
// TypeIdent

/// The runtime identity of a shaped type: its [`TypeId`] plus its names.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct TypeIdent {
    id: TypeId,
    path: &'static str,
    name: &'static str,
}

impl TypeIdent {
    pub fn of<T: Named>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            path: T::type_path(),
            name: T::type_name(),
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn path(&self) -> &'static str {
        self.path
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for TypeIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ident_carries_both_names() {
        let ident = TypeIdent::of::<String>();
        assert_eq!(ident.path(), "alloc::string::String");
        assert_eq!(ident.name(), "String");
        assert_eq!(ident.id(), TypeId::of::<String>());
    }
}
