use crate::node::Node;
use crate::ops::OpsError;

/// Operations on string-keyed entries.
///
/// Iteration follows the container's own order: sorted for `BTreeMap`,
/// unspecified for `HashMap`.
pub trait MapNode: Node {
    fn len(&self) -> usize;

    /// Keys in container order.
    fn keys(&self) -> Vec<String>;

    fn get_entry(&self, key: &str) -> Option<&dyn Node>;

    fn insert_entry(&mut self, key: String, value: Box<dyn Node>) -> Result<(), OpsError>;

    fn clear(&mut self);
}
