use core::any::Any;
use std::sync::OnceLock;

use jot_tokens::{Scalar, ScalarKind};

use crate::node::{Node, NodeMut, NodeRef};
use crate::ops::{OpsError, ScalarNode};
use crate::shape::{ConstructError, Named, ScalarShape, Shape, Shaped};

// -----------------------------------------------------------------------------
// Coercion helpers

pub(crate) fn scalar_kind_str(scalar: &Scalar) -> &'static str {
    match scalar.kind() {
        ScalarKind::Null => "null",
        ScalarKind::Undefined => "undefined",
        ScalarKind::Bool => "boolean",
        ScalarKind::Integer => "integer",
        ScalarKind::Float => "float",
        ScalarKind::String => "string",
        ScalarKind::Date => "date",
    }
}

/// Integer coercion shared by every integer width: all three wire carriers
/// funnel through decimal text, so range checking is uniform.
pub(crate) fn parse_integer<T: core::str::FromStr>(
    scalar: &Scalar,
    target: &'static str,
) -> Result<T, OpsError> {
    let text = match scalar {
        Scalar::Int(v) => v.to_string(),
        Scalar::UInt(v) => v.to_string(),
        Scalar::BigInt(t) => t.clone(),
        other => {
            return Err(OpsError::TypeMismatch {
                expected: target,
                actual: scalar_kind_str(other),
            });
        }
    };
    text.parse::<T>().map_err(|_| OpsError::OutOfRange {
        value: text,
        target,
    })
}

pub(crate) fn parse_float(scalar: &Scalar, target: &'static str) -> Result<f64, OpsError> {
    scalar.as_f64().ok_or_else(|| OpsError::TypeMismatch {
        expected: target,
        actual: scalar_kind_str(scalar),
    })
}

fn i128_scalar(v: i128) -> Scalar {
    if let Ok(x) = i64::try_from(v) {
        Scalar::Int(x)
    } else if let Ok(x) = u64::try_from(v) {
        Scalar::UInt(x)
    } else {
        Scalar::BigInt(v.to_string())
    }
}

fn u128_scalar(v: u128) -> Scalar {
    if let Ok(x) = i64::try_from(v) {
        Scalar::Int(x)
    } else if let Ok(x) = u64::try_from(v) {
        Scalar::UInt(x)
    } else {
        Scalar::BigInt(v.to_string())
    }
}

// -----------------------------------------------------------------------------
// Node boilerplate shared by every scalar impl

macro_rules! impl_scalar_node {
    ($ty:ty) => {
        impl Node for $ty {
            fn shape(&self) -> &'static Shape {
                <$ty as Shaped>::shape()
            }

            fn node_ref(&self) -> NodeRef<'_> {
                NodeRef::Scalar(ScalarNode::get(self))
            }

            fn node_mut(&mut self) -> NodeMut<'_> {
                NodeMut::Scalar(self)
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
    };
}

// -----------------------------------------------------------------------------
// Integers

macro_rules! impl_integer {
    ($ty:ty, $mid:ty, $via:path) => {
        impl Named for $ty {
            fn type_path() -> &'static str {
                stringify!($ty)
            }

            fn type_name() -> &'static str {
                stringify!($ty)
            }
        }

        impl Shaped for $ty {
            fn shape() -> &'static Shape {
                static SHAPE: OnceLock<Shape> = OnceLock::new();
                SHAPE.get_or_init(|| {
                    Shape::Scalar(ScalarShape::new::<$ty>(ScalarKind::Integer, |scalar| {
                        match parse_integer::<$ty>(&scalar, stringify!($ty)) {
                            Ok(v) => Ok(Box::new(v)),
                            Err(e) => Err(ConstructError::Failed(e.to_string())),
                        }
                    }))
                })
            }
        }

        impl_scalar_node!($ty);

        impl ScalarNode for $ty {
            fn get(&self) -> Scalar {
                $via(*self as $mid)
            }

            fn set(&mut self, value: Scalar) -> Result<(), OpsError> {
                *self = parse_integer::<$ty>(&value, stringify!($ty))?;
                Ok(())
            }
        }
    };
}

impl_integer!(i8, i128, i128_scalar);
impl_integer!(i16, i128, i128_scalar);
impl_integer!(i32, i128, i128_scalar);
impl_integer!(i64, i128, i128_scalar);
impl_integer!(i128, i128, i128_scalar);
impl_integer!(isize, i128, i128_scalar);
impl_integer!(u8, u128, u128_scalar);
impl_integer!(u16, u128, u128_scalar);
impl_integer!(u32, u128, u128_scalar);
impl_integer!(u64, u128, u128_scalar);
impl_integer!(u128, u128, u128_scalar);
impl_integer!(usize, u128, u128_scalar);

// -----------------------------------------------------------------------------
// Floats

macro_rules! impl_float {
    ($ty:ty) => {
        impl Named for $ty {
            fn type_path() -> &'static str {
                stringify!($ty)
            }

            fn type_name() -> &'static str {
                stringify!($ty)
            }
        }

        impl Shaped for $ty {
            fn shape() -> &'static Shape {
                static SHAPE: OnceLock<Shape> = OnceLock::new();
                SHAPE.get_or_init(|| {
                    Shape::Scalar(ScalarShape::new::<$ty>(ScalarKind::Float, |scalar| {
                        match parse_float(&scalar, stringify!($ty)) {
                            Ok(v) => Ok(Box::new(v as $ty)),
                            Err(e) => Err(ConstructError::Failed(e.to_string())),
                        }
                    }))
                })
            }
        }

        impl_scalar_node!($ty);

        impl ScalarNode for $ty {
            fn get(&self) -> Scalar {
                Scalar::Float(*self as f64)
            }

            fn set(&mut self, value: Scalar) -> Result<(), OpsError> {
                *self = parse_float(&value, stringify!($ty))? as $ty;
                Ok(())
            }
        }
    };
}

impl_float!(f32);
impl_float!(f64);

// -----------------------------------------------------------------------------
// bool

impl Named for bool {
    fn type_path() -> &'static str {
        "bool"
    }

    fn type_name() -> &'static str {
        "bool"
    }
}

impl Shaped for bool {
    fn shape() -> &'static Shape {
        static SHAPE: OnceLock<Shape> = OnceLock::new();
        SHAPE.get_or_init(|| {
            Shape::Scalar(ScalarShape::new::<bool>(ScalarKind::Bool, |scalar| {
                match scalar {
                    Scalar::Bool(b) => Ok(Box::new(b)),
                    other => Err(ConstructError::Failed(format!(
                        "expected a boolean, got {}",
                        scalar_kind_str(&other)
                    ))),
                }
            }))
        })
    }
}

impl_scalar_node!(bool);

impl ScalarNode for bool {
    fn get(&self) -> Scalar {
        Scalar::Bool(*self)
    }

    fn set(&mut self, value: Scalar) -> Result<(), OpsError> {
        match value {
            Scalar::Bool(b) => {
                *self = b;
                Ok(())
            }
            other => Err(OpsError::TypeMismatch {
                expected: "bool",
                actual: scalar_kind_str(&other),
            }),
        }
    }
}

// -----------------------------------------------------------------------------
// char

impl Named for char {
    fn type_path() -> &'static str {
        "char"
    }

    fn type_name() -> &'static str {
        "char"
    }
}

fn char_from_scalar(scalar: &Scalar) -> Result<char, OpsError> {
    let text = scalar.as_str().ok_or_else(|| OpsError::TypeMismatch {
        expected: "char",
        actual: scalar_kind_str(scalar),
    })?;
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(OpsError::OutOfRange {
            value: text.to_owned(),
            target: "char",
        }),
    }
}

impl Shaped for char {
    fn shape() -> &'static Shape {
        static SHAPE: OnceLock<Shape> = OnceLock::new();
        SHAPE.get_or_init(|| {
            Shape::Scalar(ScalarShape::new::<char>(ScalarKind::String, |scalar| {
                match char_from_scalar(&scalar) {
                    Ok(c) => Ok(Box::new(c)),
                    Err(e) => Err(ConstructError::Failed(e.to_string())),
                }
            }))
        })
    }
}

impl_scalar_node!(char);

impl ScalarNode for char {
    fn get(&self) -> Scalar {
        Scalar::Str(self.to_string())
    }

    fn set(&mut self, value: Scalar) -> Result<(), OpsError> {
        *self = char_from_scalar(&value)?;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// String

impl Named for String {
    fn type_path() -> &'static str {
        "alloc::string::String"
    }

    fn type_name() -> &'static str {
        "String"
    }
}

fn string_from_scalar(scalar: Scalar) -> Result<String, OpsError> {
    match scalar {
        Scalar::Str(s) => Ok(s),
        // A string slot absorbs a recognized date literal as its text form.
        Scalar::Date(d) => Ok(d.format_iso()),
        other => Err(OpsError::TypeMismatch {
            expected: "alloc::string::String",
            actual: scalar_kind_str(&other),
        }),
    }
}

impl Shaped for String {
    fn shape() -> &'static Shape {
        static SHAPE: OnceLock<Shape> = OnceLock::new();
        SHAPE.get_or_init(|| {
            Shape::Scalar(ScalarShape::new::<String>(ScalarKind::String, |scalar| {
                match string_from_scalar(scalar) {
                    Ok(s) => Ok(Box::new(s)),
                    Err(e) => Err(ConstructError::Failed(e.to_string())),
                }
            }))
        })
    }
}

impl_scalar_node!(String);

impl ScalarNode for String {
    fn get(&self) -> Scalar {
        Scalar::Str(self.clone())
    }

    fn set(&mut self, value: Scalar) -> Result<(), OpsError> {
        *self = string_from_scalar(value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_narrowing_round_trips_extremes() {
        assert_eq!(ScalarNode::get(&i64::MIN), Scalar::Int(i64::MIN));
        assert_eq!(ScalarNode::get(&u64::MAX), Scalar::UInt(u64::MAX));
        assert_eq!(
            ScalarNode::get(&u128::MAX),
            Scalar::BigInt(u128::MAX.to_string())
        );
    }

    #[test]
    fn out_of_range_is_rejected() {
        let mut v = 0u8;
        assert!(v.set(Scalar::Int(300)).is_err());
        assert!(v.set(Scalar::Int(255)).is_ok());
        assert_eq!(v, 255);
    }

    #[test]
    fn negative_into_unsigned_is_rejected() {
        let mut v = 0u32;
        assert!(v.set(Scalar::Int(-1)).is_err());
    }

    #[test]
    fn bigint_text_coerces_when_it_fits() {
        let mut v = 0i128;
        v.set(Scalar::BigInt("170141183460469231731687303715884105727".into()))
            .unwrap();
        assert_eq!(v, i128::MAX);
    }

    #[test]
    fn float_slot_accepts_integers() {
        let mut v = 0.0f64;
        v.set(Scalar::Int(3)).unwrap();
        assert_eq!(v, 3.0);
    }

    #[test]
    fn char_wants_exactly_one() {
        let mut c = 'a';
        assert!(c.set(Scalar::Str("xy".into())).is_err());
        assert!(c.set(Scalar::Str("é".into())).is_ok());
        assert_eq!(c, 'é');
    }
}
