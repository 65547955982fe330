use core::any::Any;
use core::cell::{Ref, RefCell, RefMut};
use core::fmt;
use std::rc::Rc;

use crate::cell::StaticCell;
use crate::node::{Node, NodeMut, NodeRef};
use crate::ops::{OpsError, SharedNode};
use crate::shape::{ConstructError, Named, Shape, Shaped, SharedShape};

/// A cheaply cloneable, mutable handle: `Rc<RefCell<T>>` with a shape.
///
/// This is the handle for object graphs with cycles. Plain `Rc`/`Arc`
/// preserve identity but cannot be constructed cyclically from the wire;
/// `Shared` can, because a blank target is created and registered under
/// its `$id` before any member is read, so a descendant `$ref` back into
/// an ancestor resolves while the ancestor is still being populated.
///
/// `T: Default` supplies that blank target.
pub struct Shared<T>(Rc<RefCell<T>>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Read access to the target.
    ///
    /// # Panics
    ///
    /// Panics if the target is currently mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    /// Write access to the target.
    ///
    /// # Panics
    ///
    /// Panics if the target is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    /// Whether two handles point at the same target.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: Default> Default for Shared<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(target) => f.debug_tuple("Shared").field(&*target).finish(),
            Err(_) => f.write_str("Shared(<borrowed>)"),
        }
    }
}

impl<T: Shaped + Node + Default> Named for Shared<T> {
    fn type_path() -> &'static str {
        static PATHS: StaticCell<&'static str> = StaticCell::new();
        PATHS.get_or_init::<Self>(|| {
            Box::leak(format!("jot_contracts::handle::Shared<{}>", T::type_path()).into_boxed_str())
        })
    }

    fn type_name() -> &'static str {
        static NAMES: StaticCell<&'static str> = StaticCell::new();
        NAMES.get_or_init::<Self>(|| {
            Box::leak(format!("Shared<{}>", T::type_name()).into_boxed_str())
        })
    }
}

impl<T: Shaped + Node + Default> Shaped for Shared<T> {
    fn shape() -> &'static Shape {
        static SHAPES: StaticCell<&'static Shape> = StaticCell::new();
        SHAPES.get_or_init::<Self>(|| {
            Box::leak(Box::new(Shape::Shared(
                SharedShape::new::<Self>(<T as Shaped>::shape, true, |inner| {
                    match inner.into_any().downcast::<T>() {
                        Ok(v) => Ok(Box::new(Shared::new(*v))),
                        Err(_) => Err(ConstructError::Failed(format!(
                            "expected a `{}`",
                            T::type_path()
                        ))),
                    }
                })
                .with_make_cell(|| Box::new(Shared::<T>::default())),
            )))
        })
    }
}

impl<T: Shaped + Node + Default> Node for Shared<T> {
    fn shape(&self) -> &'static Shape {
        <Self as Shaped>::shape()
    }

    fn node_ref(&self) -> NodeRef<'_> {
        NodeRef::Shared(self)
    }

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Shared(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl<T: Shaped + Node + Default> SharedNode for Shared<T> {
    fn tracked(&self) -> bool {
        true
    }

    fn target_address(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    fn with_target(&self, f: &mut dyn FnMut(&dyn Node)) {
        f(&*self.0.borrow());
    }

    fn with_target_mut(&mut self, f: &mut dyn FnMut(&mut dyn Node)) -> Result<(), OpsError> {
        f(&mut *self.0.borrow_mut());
        Ok(())
    }

    fn clone_handle(&self) -> Option<Box<dyn Node>> {
        Some(Box::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_alias_the_target() {
        let a = Shared::new(1u32);
        let b = a.clone();
        *b.borrow_mut() = 5;
        assert_eq!(*a.borrow(), 5);
        assert!(Shared::ptr_eq(&a, &b));
        assert_eq!(a.target_address(), b.target_address());
    }

    #[test]
    fn mutation_works_while_aliased() {
        let mut a = Shared::new(0u32);
        let _b = a.clone();
        a.with_target_mut(&mut |n| {
            if let NodeMut::Scalar(s) = n.node_mut() {
                s.set(jot_tokens::Scalar::Int(3)).unwrap();
            }
        })
        .unwrap();
        assert_eq!(*a.borrow(), 3);
    }

    #[test]
    fn shape_offers_a_blank_cell() {
        let shape = <Shared<u32> as Shaped>::shape();
        let cell = shape.as_shared().unwrap().make_cell().unwrap();
        let cell = cell.downcast_ref::<Shared<u32>>().unwrap();
        assert_eq!(*cell.borrow(), 0);
    }
}
