use core::any::Any;

use crate::cell::StaticCell;
use crate::node::{Node, NodeMut, NodeRef};
use crate::ops::{OpsError, OptNode};
use crate::shape::{ConstructError, Named, OptShape, Shape, Shaped};

impl<T: Shaped + Node> Named for Option<T> {
    fn type_path() -> &'static str {
        static PATHS: StaticCell<&'static str> = StaticCell::new();
        PATHS.get_or_init::<Self>(|| {
            Box::leak(format!("core::option::Option<{}>", T::type_path()).into_boxed_str())
        })
    }

    fn type_name() -> &'static str {
        static NAMES: StaticCell<&'static str> = StaticCell::new();
        NAMES.get_or_init::<Self>(|| {
            Box::leak(format!("Option<{}>", T::type_name()).into_boxed_str())
        })
    }
}

impl<T: Shaped + Node> Shaped for Option<T> {
    fn shape() -> &'static Shape {
        static SHAPES: StaticCell<&'static Shape> = StaticCell::new();
        SHAPES.get_or_init::<Self>(|| {
            Box::leak(Box::new(Shape::Opt(OptShape::new::<Self>(
                <T as Shaped>::shape,
                || Box::new(None::<T>),
                |inner| match inner.into_any().downcast::<T>() {
                    Ok(v) => Ok(Box::new(Some(*v))),
                    Err(_) => Err(ConstructError::Failed(format!(
                        "expected a `{}`",
                        T::type_path()
                    ))),
                },
            ))))
        })
    }
}

impl<T: Shaped + Node> Node for Option<T> {
    fn shape(&self) -> &'static Shape {
        <Self as Shaped>::shape()
    }

    fn node_ref(&self) -> NodeRef<'_> {
        NodeRef::Opt(self.as_ref().map(|v| v as &dyn Node))
    }

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Opt(self)
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

impl<T: Shaped + Node> OptNode for Option<T> {
    fn is_some(&self) -> bool {
        Option::is_some(self)
    }

    fn get(&self) -> Option<&dyn Node> {
        self.as_ref().map(|v| v as &dyn Node)
    }

    fn get_inner_mut(&mut self) -> Option<&mut dyn Node> {
        self.as_mut().map(|v| v as &mut dyn Node)
    }

    fn set_none(&mut self) {
        *self = None;
    }

    fn set_value(&mut self, value: Box<dyn Node>) -> Result<(), OpsError> {
        let actual = value.type_path();
        match value.into_any().downcast::<T>() {
            Ok(v) => {
                *self = Some(*v);
                Ok(())
            }
            Err(_) => Err(OpsError::TypeMismatch {
                expected: T::type_path(),
                actual,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_nest() {
        assert_eq!(
            <Option<Option<u8>> as Named>::type_path(),
            "core::option::Option<core::option::Option<u8>>"
        );
    }

    #[test]
    fn set_value_wraps_into_some() {
        let mut slot: Option<u32> = None;
        OptNode::set_value(&mut slot, Box::new(7u32)).unwrap();
        assert_eq!(slot, Some(7));
        OptNode::set_none(&mut slot);
        assert_eq!(slot, None);
    }
}
