use core::any::Any;
use std::collections::{BTreeMap, HashMap};

use crate::cell::StaticCell;
use crate::node::{Node, NodeMut, NodeRef};
use crate::ops::{MapNode, OpsError};
use crate::shape::{MapShape, Named, Shape, Shaped};

// Only string-keyed maps are serializable: JSON object keys are strings,
// and keeping keys textual end to end avoids a lossy key codec.
macro_rules! impl_string_map {
    ($map:ident, $path_prefix:literal) => {
        impl<V: Shaped + Node> Named for $map<String, V> {
            fn type_path() -> &'static str {
                static PATHS: StaticCell<&'static str> = StaticCell::new();
                PATHS.get_or_init::<Self>(|| {
                    Box::leak(
                        format!(
                            concat!($path_prefix, "<alloc::string::String, {}>"),
                            V::type_path()
                        )
                        .into_boxed_str(),
                    )
                })
            }

            fn type_name() -> &'static str {
                static NAMES: StaticCell<&'static str> = StaticCell::new();
                NAMES.get_or_init::<Self>(|| {
                    Box::leak(
                        format!(concat!(stringify!($map), "<String, {}>"), V::type_name())
                            .into_boxed_str(),
                    )
                })
            }
        }

        impl<V: Shaped + Node> Shaped for $map<String, V> {
            fn shape() -> &'static Shape {
                static SHAPES: StaticCell<&'static Shape> = StaticCell::new();
                SHAPES.get_or_init::<Self>(|| {
                    Box::leak(Box::new(Shape::Map(MapShape::new::<Self>(
                        <V as Shaped>::shape,
                        || Box::new($map::<String, V>::new()),
                    ))))
                })
            }
        }

        impl<V: Shaped + Node> Node for $map<String, V> {
            fn shape(&self) -> &'static Shape {
                <Self as Shaped>::shape()
            }

            fn node_ref(&self) -> NodeRef<'_> {
                NodeRef::Map(self)
            }

            fn node_mut(&mut self) -> NodeMut<'_> {
                NodeMut::Map(self)
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

        impl<V: Shaped + Node> MapNode for $map<String, V> {
            fn len(&self) -> usize {
                $map::len(self)
            }

            fn keys(&self) -> Vec<String> {
                $map::keys(self).cloned().collect()
            }

            fn get_entry(&self, key: &str) -> Option<&dyn Node> {
                $map::get(self, key).map(|v| v as &dyn Node)
            }

            fn insert_entry(&mut self, key: String, value: Box<dyn Node>) -> Result<(), OpsError> {
                let actual = value.type_path();
                match value.into_any().downcast::<V>() {
                    Ok(v) => {
                        $map::insert(self, key, *v);
                        Ok(())
                    }
                    Err(_) => Err(OpsError::TypeMismatch {
                        expected: V::type_path(),
                        actual,
                    }),
                }
            }

            fn clear(&mut self) {
                $map::clear(self);
            }
        }
    };
}

impl_string_map!(HashMap, "std::collections::HashMap");
impl_string_map!(BTreeMap, "alloc::collections::BTreeMap");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn btree_keys_come_out_sorted() {
        let mut map: BTreeMap<String, u32> = BTreeMap::new();
        map.insert("b".into(), 2);
        map.insert("a".into(), 1);
        assert_eq!(MapNode::keys(&map), vec!["a", "b"]);
    }

    #[test]
    fn insert_checks_value_type() {
        let mut map: HashMap<String, u32> = HashMap::new();
        MapNode::insert_entry(&mut map, "x".into(), Box::new(1u32)).unwrap();
        assert!(MapNode::insert_entry(&mut map, "y".into(), Box::new(true)).is_err());
        assert_eq!(map.get("x"), Some(&1));
    }
}
