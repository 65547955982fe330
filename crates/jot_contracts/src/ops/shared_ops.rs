use crate::node::Node;
use crate::ops::OpsError;

/// Operations on a handle (`Box`, `Rc`, `Arc`, `Rc<RefCell<T>>`).
///
/// Identity attaches to the handle's target address: two handles to the
/// same allocation report the same address, which is what `$id`/`$ref`
/// preservation and loop detection key on. `Box` targets are never aliased,
/// so boxes report `tracked() == false` and stay out of identity tracking.
pub trait SharedNode: Node {
    /// Whether this handle participates in identity preservation.
    fn tracked(&self) -> bool;

    /// The address of the target allocation.
    fn target_address(&self) -> usize;

    /// Runs `f` with a read view of the target.
    ///
    /// Closure-based because interior-mutability handles hand out borrow
    /// guards that cannot escape the call.
    fn with_target(&self, f: &mut dyn FnMut(&dyn Node));

    /// Runs `f` with a write view of the target. Fails for shared handles
    /// without interior mutability whose target is aliased.
    fn with_target_mut(&mut self, f: &mut dyn FnMut(&mut dyn Node)) -> Result<(), OpsError>;

    /// A second handle to the same target, for resolving `$ref`.
    /// `None` for handle kinds that do not alias.
    fn clone_handle(&self) -> Option<Box<dyn Node>>;
}
