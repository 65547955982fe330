use core::any::Any;
use std::sync::OnceLock;

use jot_tokens::{JsonDate, Scalar, ScalarKind};

use crate::impls::scalar_kind_str;
use crate::node::{Node, NodeMut, NodeRef};
use crate::ops::{OpsError, ScalarNode};
use crate::shape::{ConstructError, Named, ScalarShape, Shape, Shaped};

impl Named for JsonDate {
    fn type_path() -> &'static str {
        "jot_tokens::date::JsonDate"
    }

    fn type_name() -> &'static str {
        "JsonDate"
    }
}

fn date_from_scalar(scalar: &Scalar) -> Result<JsonDate, OpsError> {
    match scalar {
        Scalar::Date(d) => Ok(*d),
        // Reaches here when the reader's date recognition is disabled.
        Scalar::Str(text) => JsonDate::parse(text).ok_or_else(|| OpsError::OutOfRange {
            value: text.clone(),
            target: "jot_tokens::date::JsonDate",
        }),
        Scalar::Int(millis) => Ok(JsonDate::from_unix_millis(*millis)),
        other => Err(OpsError::TypeMismatch {
            expected: "jot_tokens::date::JsonDate",
            actual: scalar_kind_str(other),
        }),
    }
}

impl Shaped for JsonDate {
    fn shape() -> &'static Shape {
        static SHAPE: OnceLock<Shape> = OnceLock::new();
        SHAPE.get_or_init(|| {
            Shape::Scalar(ScalarShape::new::<JsonDate>(ScalarKind::Date, |scalar| {
                match date_from_scalar(&scalar) {
                    Ok(d) => Ok(Box::new(d)),
                    Err(e) => Err(ConstructError::Failed(e.to_string())),
                }
            }))
        })
    }
}

impl Node for JsonDate {
    fn shape(&self) -> &'static Shape {
        <JsonDate as Shaped>::shape()
    }

    fn node_ref(&self) -> NodeRef<'_> {
        NodeRef::Scalar(Scalar::Date(*self))
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

impl ScalarNode for JsonDate {
    fn get(&self) -> Scalar {
        Scalar::Date(*self)
    }

    fn set(&mut self, value: Scalar) -> Result<(), OpsError> {
        *self = date_from_scalar(&value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_text_and_millis() {
        let mut d = JsonDate::from_unix_millis(0);
        d.set(Scalar::Int(86_400_000)).unwrap();
        assert_eq!(d.unix_millis(), 86_400_000);

        d.set(Scalar::Str("1970-01-01T00:00:00Z".into())).unwrap();
        assert_eq!(d.unix_millis(), 0);

        assert!(d.set(Scalar::Str("not a date".into())).is_err());
    }
}
