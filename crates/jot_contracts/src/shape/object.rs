use std::sync::Arc;

use crate::contract::{LoopHandling, NullHandling, TypeNameHandling};
use crate::convert::Converter;
use crate::shape::{Construct, Named, Shape, TypeIdent};

// -----------------------------------------------------------------------------
// ObjectShape

/// The static description of a struct with named fields.
///
/// Field order is declaration order; a resolved contract may reorder its
/// properties, but the shape never does.
#[derive(Debug)]
pub struct ObjectShape {
    ty: TypeIdent,
    fields: Box<[FieldShape]>,
    construct: Construct,
    attrs: ContainerAttrs,
}

impl ObjectShape {
    pub fn new<T: Named>(fields: Vec<FieldShape>, construct: Construct) -> Self {
        Self {
            ty: TypeIdent::of::<T>(),
            fields: fields.into_boxed_slice(),
            construct,
            attrs: ContainerAttrs::default(),
        }
    }

    pub fn with_attrs(mut self, attrs: ContainerAttrs) -> Self {
        self.attrs = attrs;
        self
    }

    #[inline]
    pub fn ty(&self) -> TypeIdent {
        self.ty
    }

    #[inline]
    pub fn fields(&self) -> &[FieldShape] {
        &self.fields
    }

    pub fn field(&self, declared: &str) -> Option<&FieldShape> {
        self.fields.iter().find(|f| f.name() == declared)
    }

    #[inline]
    pub fn construct(&self) -> &Construct {
        &self.construct
    }

    #[inline]
    pub fn attrs(&self) -> &ContainerAttrs {
        &self.attrs
    }
}

// -----------------------------------------------------------------------------
// FieldShape

/// One named field: its declared name, its (lazily reachable) shape, and the
/// `#[json(...)]` attributes captured at derive time.
///
/// The shape is behind a function pointer so self-referential types
/// terminate: `Person { partner: Option<Box<Person>> }` only touches the
/// field's shape when a walk actually descends into it.
#[derive(Debug)]
pub struct FieldShape {
    name: &'static str,
    shape: fn() -> &'static Shape,
    attrs: FieldAttrs,
}

impl FieldShape {
    pub fn new(name: &'static str, shape: fn() -> &'static Shape) -> Self {
        Self {
            name,
            shape,
            attrs: FieldAttrs::default(),
        }
    }

    pub fn with_attrs(mut self, attrs: FieldAttrs) -> Self {
        self.attrs = attrs;
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn shape(&self) -> &'static Shape {
        (self.shape)()
    }

    #[inline]
    pub fn shape_fn(&self) -> fn() -> &'static Shape {
        self.shape
    }

    #[inline]
    pub fn attrs(&self) -> &FieldAttrs {
        &self.attrs
    }
}

// -----------------------------------------------------------------------------
// Attributes

/// Container-level `#[json(...)]` attributes.
#[derive(Debug, Default)]
pub struct ContainerAttrs {
    pub null_handling: Option<NullHandling>,
    pub loop_handling: Option<LoopHandling>,
    pub preserve_refs: Option<bool>,
    pub type_names: Option<TypeNameHandling>,
}

/// Field-level `#[json(...)]` attributes.
#[derive(Default)]
pub struct FieldAttrs {
    pub rename: Option<&'static str>,
    pub required: bool,
    pub ignore: bool,
    pub order: Option<i32>,
    pub extension: bool,
    pub null_handling: Option<NullHandling>,
    pub loop_handling: Option<LoopHandling>,
    pub preserve_refs: Option<bool>,
    pub type_names: Option<TypeNameHandling>,
    pub converter: Option<fn() -> Arc<dyn Converter>>,
}

impl core::fmt::Debug for FieldAttrs {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FieldAttrs")
            .field("rename", &self.rename)
            .field("required", &self.required)
            .field("ignore", &self.ignore)
            .field("order", &self.order)
            .field("extension", &self.extension)
            .field("converter", &self.converter.is_some())
            .finish_non_exhaustive()
    }
}
