use crate::node::Node;
use crate::ops::OpsError;

/// Operations on a struct with named fields.
///
/// Names are the *declared* Rust field names; logical (wire) names only
/// exist on the resolved contract.
pub trait ObjectNode: Node {
    fn field(&self, name: &str) -> Option<&dyn Node>;

    fn field_mut(&mut self, name: &str) -> Option<&mut dyn Node>;

    /// Replaces the named field with a boxed value of the field's type.
    fn set_field(&mut self, name: &str, value: Box<dyn Node>) -> Result<(), OpsError>;

    fn field_len(&self) -> usize;

    /// Field access in declaration order.
    fn field_at(&self, index: usize) -> Option<&dyn Node>;

    fn field_name_at(&self, index: usize) -> Option<&'static str>;
}
