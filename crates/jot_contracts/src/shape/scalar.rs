use jot_tokens::{Scalar, ScalarKind};

use crate::node::Node;
use crate::shape::{ConstructError, Named, TypeIdent};

/// The static description of a leaf type carried by a single token.
///
/// `from_scalar` is the coercion from a wire scalar into a boxed instance;
/// it rejects out-of-range and wrong-kind values. Unit-only enums derive as
/// string scalars, so their coercion also rejects unknown variant names.
pub struct ScalarShape {
    ty: TypeIdent,
    kind: ScalarKind,
    from_scalar: fn(Scalar) -> Result<Box<dyn Node>, ConstructError>,
}

impl ScalarShape {
    pub fn new<T: Named>(
        kind: ScalarKind,
        from_scalar: fn(Scalar) -> Result<Box<dyn Node>, ConstructError>,
    ) -> Self {
        Self {
            ty: TypeIdent::of::<T>(),
            kind,
            from_scalar,
        }
    }

    #[inline]
    pub fn ty(&self) -> TypeIdent {
        self.ty
    }

    /// The scalar kind this type is written as.
    #[inline]
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    pub fn from_scalar(&self, value: Scalar) -> Result<Box<dyn Node>, ConstructError> {
        (self.from_scalar)(value)
    }
}

impl core::fmt::Debug for ScalarShape {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScalarShape")
            .field("ty", &self.ty)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
