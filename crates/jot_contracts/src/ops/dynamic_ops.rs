use crate::node::Node;
use crate::value::Value;

/// Operations on an untyped object whose members are only known at runtime.
///
/// Backing the extension-data slot and [`Value`] itself. Member values move
/// by owned [`Value`]; implementors with richer internal representations
/// convert at the boundary.
pub trait DynamicNode: Node {
    /// Member names in the container's own order.
    fn member_names(&self) -> Vec<String>;

    fn get_member(&self, name: &str) -> Option<Value>;

    fn set_member(&mut self, name: &str, value: Value);
}
