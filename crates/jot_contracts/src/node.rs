use core::any::Any;

use jot_tokens::Scalar;

use crate::ops::{ArrayNode, DynamicNode, MapNode, ObjectNode, OptNode, ScalarNode, SharedNode};
use crate::shape::Shape;

// -----------------------------------------------------------------------------
// Node

/// A type-erased serializable value.
///
/// `Node` is the runtime half of the model: a [`Shape`](crate::Shape) says
/// what a type looks like, a `Node` is an actual value the engine can walk.
/// The kind accessors return a view matching the value's shape, so the
/// engine never needs the concrete type.
///
/// Implemented by `#[derive(Mapped)]` and by the built-in impls.
pub trait Node: Any {
    /// The static shape of this value's type.
    fn shape(&self) -> &'static Shape;

    /// A kind-dispatched read view.
    fn node_ref(&self) -> NodeRef<'_>;

    /// A kind-dispatched write view.
    fn node_mut(&mut self) -> NodeMut<'_>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl dyn Node {
    pub fn is<T: Node>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Node>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Node>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// The full path of the value's type, for diagnostics.
    pub fn type_path(&self) -> &'static str {
        self.shape().ty().path()
    }
}

impl core::fmt::Debug for dyn Node {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Node({})", self.type_path())
    }
}

// -----------------------------------------------------------------------------
// NodeRef / NodeMut

/// A read view over a [`Node`], dispatched by kind.
pub enum NodeRef<'a> {
    Object(&'a dyn ObjectNode),
    Array(&'a dyn ArrayNode),
    Map(&'a dyn MapNode),
    /// `None` renders as `null`.
    Opt(Option<&'a dyn Node>),
    /// Leaf values are surfaced as an owned wire scalar.
    Scalar(Scalar),
    Dynamic(&'a dyn DynamicNode),
    Shared(&'a dyn SharedNode),
}

impl NodeRef<'_> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeRef::Object(_) => "object",
            NodeRef::Array(_) => "array",
            NodeRef::Map(_) => "map",
            NodeRef::Opt(_) => "option",
            NodeRef::Scalar(_) => "scalar",
            NodeRef::Dynamic(_) => "dynamic",
            NodeRef::Shared(_) => "shared",
        }
    }
}

/// A write view over a [`Node`], dispatched by kind.
pub enum NodeMut<'a> {
    Object(&'a mut dyn ObjectNode),
    Array(&'a mut dyn ArrayNode),
    Map(&'a mut dyn MapNode),
    Opt(&'a mut dyn OptNode),
    Scalar(&'a mut dyn ScalarNode),
    Dynamic(&'a mut dyn DynamicNode),
    Shared(&'a mut dyn SharedNode),
}

impl NodeMut<'_> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeMut::Object(_) => "object",
            NodeMut::Array(_) => "array",
            NodeMut::Map(_) => "map",
            NodeMut::Opt(_) => "option",
            NodeMut::Scalar(_) => "scalar",
            NodeMut::Dynamic(_) => "dynamic",
            NodeMut::Shared(_) => "shared",
        }
    }
}
