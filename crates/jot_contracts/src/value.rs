use core::any::Any;
use std::sync::OnceLock;

use jot_tokens::Scalar;

use crate::node::{Node, NodeMut, NodeRef};
use crate::ops::{ArrayNode, DynamicNode, OpsError, ScalarNode};
use crate::shape::{DynamicShape, Named, Shape, Shaped};

// -----------------------------------------------------------------------------
// Value

/// A minimal untyped JSON value.
///
/// Carries extension data, dynamic members and untyped deserialization
/// results. Object members keep insertion order. This is deliberately not a
/// full document model: no path queries, no parent links.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
}

/// A JSON number in one of the representations the reader produces.
#[derive(Clone, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    UInt(u64),
    Float(f64),
    /// A decimal literal beyond `i64`/`u64`, kept as text.
    Big(String),
}

impl Value {
    /// Looks up an object member by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object(members) => members.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(Number::Int(v)) => Some(*v),
            Value::Number(Number::UInt(v)) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(Number::Float(v)) => Some(*v),
            Value::Number(Number::Int(v)) => Some(*v as f64),
            Value::Number(Number::UInt(v)) => Some(*v as f64),
            _ => None,
        }
    }

    /// The wire scalar for leaf variants; `None` for arrays and objects.
    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Value::Null => Some(Scalar::Null),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(Number::Int(v)) => Some(Scalar::Int(*v)),
            Value::Number(Number::UInt(v)) => Some(Scalar::UInt(*v)),
            Value::Number(Number::Float(v)) => Some(Scalar::Float(*v)),
            Value::Number(Number::Big(v)) => Some(Scalar::BigInt(v.clone())),
            Value::String(s) => Some(Scalar::Str(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Null | Scalar::Undefined => Value::Null,
            Scalar::Bool(b) => Value::Bool(b),
            Scalar::Int(v) => Value::Number(Number::Int(v)),
            Scalar::UInt(v) => Value::Number(Number::UInt(v)),
            Scalar::BigInt(v) => Value::Number(Number::Big(v)),
            Scalar::Float(v) => Value::Number(Number::Float(v)),
            Scalar::Str(s) => Value::String(s),
            Scalar::Date(d) => Value::String(d.format_iso()),
        }
    }
}

// -----------------------------------------------------------------------------
// Shape

impl Named for Value {
    fn type_path() -> &'static str {
        "jot_contracts::value::Value"
    }

    fn type_name() -> &'static str {
        "Value"
    }
}

impl Shaped for Value {
    fn shape() -> &'static Shape {
        static SHAPE: OnceLock<Shape> = OnceLock::new();
        SHAPE.get_or_init(|| {
            Shape::Dynamic(DynamicShape::new::<Value>(|| Box::new(Value::Null)))
        })
    }
}

// -----------------------------------------------------------------------------
// Node

impl Node for Value {
    fn shape(&self) -> &'static Shape {
        <Value as Shaped>::shape()
    }

    fn node_ref(&self) -> NodeRef<'_> {
        match self {
            Value::Array(_) => NodeRef::Array(self),
            Value::Object(_) => NodeRef::Dynamic(self),
            other => match other.as_scalar() {
                Some(scalar) => NodeRef::Scalar(scalar),
                None => NodeRef::Scalar(Scalar::Null),
            },
        }
    }

    fn node_mut(&mut self) -> NodeMut<'_> {
        match self {
            Value::Array(_) => NodeMut::Array(self),
            Value::Object(_) => NodeMut::Dynamic(self),
            _ => NodeMut::Scalar(self),
        }
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

impl ScalarNode for Value {
    fn get(&self) -> Scalar {
        self.as_scalar().unwrap_or(Scalar::Null)
    }

    fn set(&mut self, value: Scalar) -> Result<(), OpsError> {
        *self = Value::from(value);
        Ok(())
    }
}

impl ArrayNode for Value {
    fn len(&self) -> usize {
        match self {
            Value::Array(items) => items.len(),
            _ => 0,
        }
    }

    fn get(&self, index: usize) -> Option<&dyn Node> {
        match self {
            Value::Array(items) => items.get(index).map(|v| v as &dyn Node),
            _ => None,
        }
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Node> {
        match self {
            Value::Array(items) => items.get_mut(index).map(|v| v as &mut dyn Node),
            _ => None,
        }
    }

    fn push(&mut self, value: Box<dyn Node>) -> Result<(), OpsError> {
        let actual = value.type_path();
        let item = match value.into_any().downcast::<Value>() {
            Ok(item) => *item,
            Err(_) => {
                return Err(OpsError::TypeMismatch {
                    expected: "jot_contracts::value::Value",
                    actual,
                });
            }
        };
        match self {
            Value::Array(items) => {
                items.push(item);
                Ok(())
            }
            _ => Err(OpsError::KindMismatch { expected: "array" }),
        }
    }

    fn clear(&mut self) {
        if let Value::Array(items) = self {
            items.clear();
        }
    }
}

impl DynamicNode for Value {
    fn member_names(&self) -> Vec<String> {
        match self {
            Value::Object(members) => members.iter().map(|(k, _)| k.clone()).collect(),
            _ => Vec::new(),
        }
    }

    fn get_member(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }

    fn set_member(&mut self, name: &str, value: Value) {
        if !matches!(self, Value::Object(_)) {
            *self = Value::Object(Vec::new());
        }
        if let Value::Object(members) = self {
            match members.iter_mut().find(|(k, _)| k == name) {
                Some((_, slot)) => *slot = value,
                None => members.push((name.to_owned(), value)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_members_keep_insertion_order() {
        let mut value = Value::Object(Vec::new());
        value.set_member("b", Value::Bool(true));
        value.set_member("a", Value::Number(Number::Int(1)));
        assert_eq!(value.member_names(), vec!["b", "a"]);
    }

    #[test]
    fn set_member_replaces_in_place() {
        let mut value = Value::Object(Vec::new());
        value.set_member("x", Value::Number(Number::Int(1)));
        value.set_member("x", Value::Number(Number::Int(2)));
        assert_eq!(value.member_names().len(), 1);
        assert_eq!(value.get("x").and_then(Value::as_i64), Some(2));
    }

    #[test]
    fn scalar_round_trip() {
        let value = Value::from(Scalar::Str("hi".into()));
        assert_eq!(value.as_scalar(), Some(Scalar::Str("hi".into())));
    }

    #[test]
    fn array_ops_reject_non_arrays() {
        let mut value = Value::Null;
        let err = ArrayNode::push(&mut value, Box::new(Value::Bool(true)));
        assert!(err.is_err());
    }
}
