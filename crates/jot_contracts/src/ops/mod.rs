//! Kind-specific operations over type-erased values.
//!
//! Each trait here corresponds to one [`NodeRef`](crate::NodeRef) /
//! [`NodeMut`](crate::NodeMut) arm; the engine drives values exclusively
//! through these, so a hand-written impl only has to cover the traits its
//! kind actually uses.

mod array_ops;
mod dynamic_ops;
mod map_ops;
mod object_ops;
mod ops_error;
mod opt_ops;
mod scalar_ops;
mod shared_ops;

pub use array_ops::ArrayNode;
pub use dynamic_ops::DynamicNode;
pub use map_ops::MapNode;
pub use object_ops::ObjectNode;
pub use ops_error::OpsError;
pub use opt_ops::OptNode;
pub use scalar_ops::ScalarNode;
pub use shared_ops::SharedNode;
