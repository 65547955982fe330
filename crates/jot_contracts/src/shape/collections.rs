use crate::node::Node;
use crate::shape::{ConstructError, Named, Shape, TypeIdent};

// -----------------------------------------------------------------------------
// ArrayShape

/// A growable sequence. `make` builds an empty instance to push items into.
#[derive(Debug)]
pub struct ArrayShape {
    ty: TypeIdent,
    item: fn() -> &'static Shape,
    make: fn() -> Box<dyn Node>,
}

impl ArrayShape {
    pub fn new<T: Named>(item: fn() -> &'static Shape, make: fn() -> Box<dyn Node>) -> Self {
        Self {
            ty: TypeIdent::of::<T>(),
            item,
            make,
        }
    }

    #[inline]
    pub fn ty(&self) -> TypeIdent {
        self.ty
    }

    #[inline]
    pub fn item(&self) -> &'static Shape {
        (self.item)()
    }

    #[inline]
    pub fn item_fn(&self) -> fn() -> &'static Shape {
        self.item
    }

    pub fn make(&self) -> Box<dyn Node> {
        (self.make)()
    }
}

// -----------------------------------------------------------------------------
// MapShape

/// String-keyed entries. Keys are always JSON object keys on the wire.
#[derive(Debug)]
pub struct MapShape {
    ty: TypeIdent,
    value: fn() -> &'static Shape,
    make: fn() -> Box<dyn Node>,
}

impl MapShape {
    pub fn new<T: Named>(value: fn() -> &'static Shape, make: fn() -> Box<dyn Node>) -> Self {
        Self {
            ty: TypeIdent::of::<T>(),
            value,
            make,
        }
    }

    #[inline]
    pub fn ty(&self) -> TypeIdent {
        self.ty
    }

    #[inline]
    pub fn value(&self) -> &'static Shape {
        (self.value)()
    }

    #[inline]
    pub fn value_fn(&self) -> fn() -> &'static Shape {
        self.value
    }

    pub fn make(&self) -> Box<dyn Node> {
        (self.make)()
    }
}

// -----------------------------------------------------------------------------
// OptShape

/// `Option<T>`: `null` on the wire maps to `None`.
#[derive(Debug)]
pub struct OptShape {
    ty: TypeIdent,
    inner: fn() -> &'static Shape,
    none: fn() -> Box<dyn Node>,
    wrap: fn(Box<dyn Node>) -> Result<Box<dyn Node>, ConstructError>,
}

impl OptShape {
    pub fn new<T: Named>(
        inner: fn() -> &'static Shape,
        none: fn() -> Box<dyn Node>,
        wrap: fn(Box<dyn Node>) -> Result<Box<dyn Node>, ConstructError>,
    ) -> Self {
        Self {
            ty: TypeIdent::of::<T>(),
            inner,
            none,
            wrap,
        }
    }

    #[inline]
    pub fn ty(&self) -> TypeIdent {
        self.ty
    }

    #[inline]
    pub fn inner(&self) -> &'static Shape {
        (self.inner)()
    }

    #[inline]
    pub fn inner_fn(&self) -> fn() -> &'static Shape {
        self.inner
    }

    pub fn none(&self) -> Box<dyn Node> {
        (self.none)()
    }

    /// Wraps a built inner value into `Some`.
    pub fn wrap(&self, inner: Box<dyn Node>) -> Result<Box<dyn Node>, ConstructError> {
        (self.wrap)(inner)
    }
}

// -----------------------------------------------------------------------------
// SharedShape

/// A handle around an inner shape.
///
/// `tracked` handles (`Rc`, `Arc`, `Rc<RefCell<T>>`) participate in identity
/// preservation; `Box` does not. Handles with interior mutability also offer
/// `make_cell`, a pre-constructed blank target that can be registered under
/// a `$id` before its members are read, which is what makes cyclic graphs
/// deserializable.
#[derive(Debug)]
pub struct SharedShape {
    ty: TypeIdent,
    inner: fn() -> &'static Shape,
    tracked: bool,
    make_cell: Option<fn() -> Box<dyn Node>>,
    wrap: fn(Box<dyn Node>) -> Result<Box<dyn Node>, ConstructError>,
}

impl SharedShape {
    pub fn new<T: Named>(
        inner: fn() -> &'static Shape,
        tracked: bool,
        wrap: fn(Box<dyn Node>) -> Result<Box<dyn Node>, ConstructError>,
    ) -> Self {
        Self {
            ty: TypeIdent::of::<T>(),
            inner,
            tracked,
            make_cell: None,
            wrap,
        }
    }

    pub fn with_make_cell(mut self, make_cell: fn() -> Box<dyn Node>) -> Self {
        self.make_cell = Some(make_cell);
        self
    }

    #[inline]
    pub fn ty(&self) -> TypeIdent {
        self.ty
    }

    #[inline]
    pub fn inner(&self) -> &'static Shape {
        (self.inner)()
    }

    #[inline]
    pub fn inner_fn(&self) -> fn() -> &'static Shape {
        self.inner
    }

    /// Whether handles of this shape carry reference identity.
    #[inline]
    pub fn tracked(&self) -> bool {
        self.tracked
    }

    /// Builds a blank, registrable target when the handle supports it.
    pub fn make_cell(&self) -> Option<Box<dyn Node>> {
        self.make_cell.map(|f| f())
    }

    /// Wraps a fully built inner value into the handle.
    pub fn wrap(&self, inner: Box<dyn Node>) -> Result<Box<dyn Node>, ConstructError> {
        (self.wrap)(inner)
    }
}

// -----------------------------------------------------------------------------
// DynamicShape

/// An untyped value; members are discovered at runtime.
#[derive(Debug)]
pub struct DynamicShape {
    ty: TypeIdent,
    make: fn() -> Box<dyn Node>,
}

impl DynamicShape {
    pub fn new<T: Named>(make: fn() -> Box<dyn Node>) -> Self {
        Self {
            ty: TypeIdent::of::<T>(),
            make,
        }
    }

    #[inline]
    pub fn ty(&self) -> TypeIdent {
        self.ty
    }

    pub fn make(&self) -> Box<dyn Node> {
        (self.make)()
    }
}
