use crate::node::Node;
use crate::ops::OpsError;

/// Operations on a growable sequence.
pub trait ArrayNode: Node {
    fn len(&self) -> usize;

    fn get(&self, index: usize) -> Option<&dyn Node>;

    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Node>;

    /// Appends a boxed value of the item type.
    fn push(&mut self, value: Box<dyn Node>) -> Result<(), OpsError>;

    /// Removes every item. Populating an existing array starts from empty.
    fn clear(&mut self);
}
