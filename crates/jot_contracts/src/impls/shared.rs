use core::any::Any;
use std::rc::Rc;
use std::sync::Arc;

use crate::cell::StaticCell;
use crate::node::{Node, NodeMut, NodeRef};
use crate::ops::{OpsError, SharedNode};
use crate::shape::{ConstructError, Named, Shape, Shaped, SharedShape};

// `Rc` and `Arc` carry identity but no interior mutability: their targets
// serialize with `$id`/`$ref` preservation, and deserialize by building the
// inner value first and wrapping it. Graphs that need in-place cyclic
// construction use [`Shared`](crate::handle::Shared) instead.
macro_rules! impl_counted {
    ($rc:ident, $path_prefix:literal) => {
        impl<T: Shaped + Node> Named for $rc<T> {
            fn type_path() -> &'static str {
                static PATHS: StaticCell<&'static str> = StaticCell::new();
                PATHS.get_or_init::<Self>(|| {
                    Box::leak(
                        format!(concat!($path_prefix, "<{}>"), T::type_path()).into_boxed_str(),
                    )
                })
            }

            fn type_name() -> &'static str {
                static NAMES: StaticCell<&'static str> = StaticCell::new();
                NAMES.get_or_init::<Self>(|| {
                    Box::leak(
                        format!(concat!(stringify!($rc), "<{}>"), T::type_name())
                            .into_boxed_str(),
                    )
                })
            }
        }

        impl<T: Shaped + Node> Shaped for $rc<T> {
            fn shape() -> &'static Shape {
                static SHAPES: StaticCell<&'static Shape> = StaticCell::new();
                SHAPES.get_or_init::<Self>(|| {
                    Box::leak(Box::new(Shape::Shared(SharedShape::new::<Self>(
                        <T as Shaped>::shape,
                        true,
                        |inner| match inner.into_any().downcast::<T>() {
                            Ok(v) => Ok(Box::new($rc::new(*v))),
                            Err(_) => Err(ConstructError::Failed(format!(
                                "expected a `{}`",
                                T::type_path()
                            ))),
                        },
                    ))))
                })
            }
        }

        impl<T: Shaped + Node> Node for $rc<T> {
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

        impl<T: Shaped + Node> SharedNode for $rc<T> {
            fn tracked(&self) -> bool {
                true
            }

            fn target_address(&self) -> usize {
                $rc::as_ptr(self) as *const () as usize
            }

            fn with_target(&self, f: &mut dyn FnMut(&dyn Node)) {
                f(&**self);
            }

            fn with_target_mut(
                &mut self,
                f: &mut dyn FnMut(&mut dyn Node),
            ) -> Result<(), OpsError> {
                match $rc::get_mut(self) {
                    Some(target) => {
                        f(target);
                        Ok(())
                    }
                    None => Err(OpsError::Immutable(<Self as Named>::type_path())),
                }
            }

            fn clone_handle(&self) -> Option<Box<dyn Node>> {
                Some(Box::new($rc::clone(self)))
            }
        }
    };
}

impl_counted!(Rc, "alloc::rc::Rc");
impl_counted!(Arc, "alloc::sync::Arc");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliased_handles_share_an_address() {
        let a = Rc::new(3u8);
        let b = Rc::clone(&a);
        assert_eq!(a.target_address(), b.target_address());

        let c = Rc::new(3u8);
        assert_ne!(a.target_address(), c.target_address());
    }

    #[test]
    fn aliased_targets_refuse_mutation() {
        let mut a = Arc::new(1u32);
        let _b = Arc::clone(&a);
        assert!(a.with_target_mut(&mut |_| {}).is_err());
    }

    #[test]
    fn cloned_handle_aliases() {
        let a = Rc::new(7u32);
        let clone = a.clone_handle().unwrap();
        let clone = clone.downcast_ref::<Rc<u32>>().unwrap();
        assert!(Rc::ptr_eq(&a, clone));
    }
}
