use core::any::Any;

use crate::cell::StaticCell;
use crate::node::{Node, NodeMut, NodeRef};
use crate::ops::{ArrayNode, OpsError};
use crate::shape::{ArrayShape, Named, Shape, Shaped};

impl<T: Shaped + Node> Named for Vec<T> {
    fn type_path() -> &'static str {
        static PATHS: StaticCell<&'static str> = StaticCell::new();
        PATHS.get_or_init::<Self>(|| {
            Box::leak(format!("alloc::vec::Vec<{}>", T::type_path()).into_boxed_str())
        })
    }

    fn type_name() -> &'static str {
        static NAMES: StaticCell<&'static str> = StaticCell::new();
        NAMES.get_or_init::<Self>(|| {
            Box::leak(format!("Vec<{}>", T::type_name()).into_boxed_str())
        })
    }
}

impl<T: Shaped + Node> Shaped for Vec<T> {
    fn shape() -> &'static Shape {
        static SHAPES: StaticCell<&'static Shape> = StaticCell::new();
        SHAPES.get_or_init::<Self>(|| {
            Box::leak(Box::new(Shape::Array(ArrayShape::new::<Self>(
                <T as Shaped>::shape,
                || Box::new(Vec::<T>::new()),
            ))))
        })
    }
}

impl<T: Shaped + Node> Node for Vec<T> {
    fn shape(&self) -> &'static Shape {
        <Self as Shaped>::shape()
    }

    fn node_ref(&self) -> NodeRef<'_> {
        NodeRef::Array(self)
    }

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Array(self)
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

impl<T: Shaped + Node> ArrayNode for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn get(&self, index: usize) -> Option<&dyn Node> {
        self.as_slice().get(index).map(|v| v as &dyn Node)
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Node> {
        self.as_mut_slice()
            .get_mut(index)
            .map(|v| v as &mut dyn Node)
    }

    fn push(&mut self, value: Box<dyn Node>) -> Result<(), OpsError> {
        let actual = value.type_path();
        match value.into_any().downcast::<T>() {
            Ok(v) => {
                Vec::push(self, *v);
                Ok(())
            }
            Err(_) => Err(OpsError::TypeMismatch {
                expected: T::type_path(),
                actual,
            }),
        }
    }

    fn clear(&mut self) {
        Vec::clear(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_checks_item_type() {
        let mut items: Vec<u32> = vec![1];
        ArrayNode::push(&mut items, Box::new(2u32)).unwrap();
        assert!(ArrayNode::push(&mut items, Box::new("x".to_owned())).is_err());
        assert_eq!(items, vec![1, 2]);
    }

    #[test]
    fn nested_path() {
        assert_eq!(
            <Vec<Vec<bool>> as Named>::type_path(),
            "alloc::vec::Vec<alloc::vec::Vec<bool>>"
        );
    }
}
