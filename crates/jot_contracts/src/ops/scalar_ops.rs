use jot_tokens::Scalar;

use crate::node::Node;
use crate::ops::OpsError;

/// Operations on a leaf value.
pub trait ScalarNode: Node {
    /// The value as a wire scalar.
    fn get(&self) -> Scalar;

    /// Replaces the value, coercing from the wire scalar. Out-of-range
    /// numbers and wrong kinds are rejected.
    fn set(&mut self, value: Scalar) -> Result<(), OpsError>;
}
