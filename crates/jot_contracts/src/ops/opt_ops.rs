use crate::node::Node;
use crate::ops::OpsError;

/// Operations on `Option<T>`.
pub trait OptNode: Node {
    fn is_some(&self) -> bool;

    fn get(&self) -> Option<&dyn Node>;

    fn get_inner_mut(&mut self) -> Option<&mut dyn Node>;

    fn set_none(&mut self);

    /// Replaces the contents with `Some` of the boxed inner value.
    fn set_value(&mut self, value: Box<dyn Node>) -> Result<(), OpsError>;
}
