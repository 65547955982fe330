use core::any::Any;

use crate::cell::StaticCell;
use crate::node::{Node, NodeMut, NodeRef};
use crate::ops::{OpsError, SharedNode};
use crate::shape::{ConstructError, Named, Shape, Shaped, SharedShape};

impl<T: Shaped + Node> Named for Box<T> {
    fn type_path() -> &'static str {
        static PATHS: StaticCell<&'static str> = StaticCell::new();
        PATHS.get_or_init::<Self>(|| {
            Box::leak(format!("alloc::boxed::Box<{}>", T::type_path()).into_boxed_str())
        })
    }

    fn type_name() -> &'static str {
        static NAMES: StaticCell<&'static str> = StaticCell::new();
        NAMES.get_or_init::<Self>(|| {
            Box::leak(format!("Box<{}>", T::type_name()).into_boxed_str())
        })
    }
}

impl<T: Shaped + Node> Shaped for Box<T> {
    fn shape() -> &'static Shape {
        static SHAPES: StaticCell<&'static Shape> = StaticCell::new();
        SHAPES.get_or_init::<Self>(|| {
            Box::leak(Box::new(Shape::Shared(SharedShape::new::<Self>(
                <T as Shaped>::shape,
                false,
                |inner| match inner.into_any().downcast::<T>() {
                    Ok(v) => Ok(Box::new(v)),
                    Err(_) => Err(ConstructError::Failed(format!(
                        "expected a `{}`",
                        T::type_path()
                    ))),
                },
            ))))
        })
    }
}

impl<T: Shaped + Node> Node for Box<T> {
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

impl<T: Shaped + Node> SharedNode for Box<T> {
    fn tracked(&self) -> bool {
        false
    }

    fn target_address(&self) -> usize {
        &**self as *const T as *const () as usize
    }

    fn with_target(&self, f: &mut dyn FnMut(&dyn Node)) {
        f(&**self);
    }

    fn with_target_mut(&mut self, f: &mut dyn FnMut(&mut dyn Node)) -> Result<(), OpsError> {
        f(&mut **self);
        Ok(())
    }

    fn clone_handle(&self) -> Option<Box<dyn Node>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxes_are_untracked() {
        let boxed = Box::new(5u32);
        assert!(!SharedNode::tracked(&boxed));
        assert!(SharedNode::clone_handle(&boxed).is_none());
    }

    #[test]
    fn target_is_reachable_both_ways() {
        let mut boxed = Box::new(1u32);
        boxed
            .with_target_mut(&mut |n| {
                if let NodeMut::Scalar(s) = n.node_mut() {
                    s.set(jot_tokens::Scalar::Int(9)).unwrap();
                }
            })
            .unwrap();
        let mut seen = 0;
        boxed.with_target(&mut |n| {
            if let NodeRef::Scalar(jot_tokens::Scalar::Int(v)) = n.node_ref() {
                seen = v;
            }
        });
        assert_eq!(seen, 9);
        assert_eq!(*boxed, 9);
    }
}
