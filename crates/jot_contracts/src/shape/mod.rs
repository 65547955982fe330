//! Static type descriptions.
//!
//! Every serializable type carries a `&'static` [`Shape`] built once per
//! process (usually by `#[derive(Mapped)]`). Shapes say what a type *is* —
//! an object with named fields, an array of items, a scalar — without any
//! policy attached. Policy (naming, required-ness, ordering) is applied
//! when a [`Contract`](crate::Contract) is resolved from a shape.

mod collections;
mod construct;
mod ident;
mod object;
mod scalar;

pub use collections::{ArrayShape, DynamicShape, MapShape, OptShape, SharedShape};
pub use construct::{Construct, ConstructError, MemberBag};
pub use ident::{Named, Shaped, TypeIdent};
pub use object::{ContainerAttrs, FieldAttrs, FieldShape, ObjectShape};
pub use scalar::ScalarShape;

/// The static description of a serializable type.
#[derive(Debug)]
pub enum Shape {
    /// A struct with named fields.
    Object(ObjectShape),
    /// A growable sequence.
    Array(ArrayShape),
    /// String-keyed entries.
    Map(MapShape),
    /// `Option<T>`.
    Opt(OptShape),
    /// A leaf value carried by a single token.
    Scalar(ScalarShape),
    /// A handle (`Box`, `Rc`, `Arc`, `Rc<RefCell<T>>`) around an inner shape.
    Shared(SharedShape),
    /// An untyped value whose members are only known at runtime.
    Dynamic(DynamicShape),
}

impl Shape {
    /// The identity of the described type.
    pub fn ty(&self) -> TypeIdent {
        match self {
            Shape::Object(s) => s.ty(),
            Shape::Array(s) => s.ty(),
            Shape::Map(s) => s.ty(),
            Shape::Opt(s) => s.ty(),
            Shape::Scalar(s) => s.ty(),
            Shape::Shared(s) => s.ty(),
            Shape::Dynamic(s) => s.ty(),
        }
    }

    /// A short label for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Shape::Object(_) => "object",
            Shape::Array(_) => "array",
            Shape::Map(_) => "map",
            Shape::Opt(_) => "option",
            Shape::Scalar(_) => "scalar",
            Shape::Shared(_) => "shared",
            Shape::Dynamic(_) => "dynamic",
        }
    }

    pub fn as_object(&self) -> Option<&ObjectShape> {
        match self {
            Shape::Object(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayShape> {
        match self {
            Shape::Array(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapShape> {
        match self {
            Shape::Map(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarShape> {
        match self {
            Shape::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_shared(&self) -> Option<&SharedShape> {
        match self {
            Shape::Shared(s) => Some(s),
            _ => None,
        }
    }
}
