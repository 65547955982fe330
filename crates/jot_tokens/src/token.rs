use core::fmt;

use crate::date::JsonDate;

// -----------------------------------------------------------------------------
// Token

/// A single structural or scalar element of a JSON document.
///
/// A document is a stream of tokens: `{"a":[1]}` becomes `ObjectStart`,
/// `Property("a")`, `ArrayStart`, `Scalar(Int(1))`, `ArrayEnd`, `ObjectEnd`.
///
/// `ConstructorStart`/`ConstructorEnd` carry the non-standard
/// `new Name(args)` syntax; readers must accept it, writers only emit it
/// when explicitly asked to.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    ObjectStart,
    ObjectEnd,
    ArrayStart,
    ArrayEnd,
    /// A member name inside an object.
    Property(String),
    ConstructorStart(String),
    ConstructorEnd,
    /// A line or block comment, without its delimiters.
    Comment(String),
    Scalar(Scalar),
}

impl Token {
    /// Returns `true` for tokens that open a container.
    #[inline]
    pub fn opens_container(&self) -> bool {
        matches!(
            self,
            Token::ObjectStart | Token::ArrayStart | Token::ConstructorStart(_)
        )
    }

    /// Returns `true` for tokens that close a container.
    #[inline]
    pub fn closes_container(&self) -> bool {
        matches!(
            self,
            Token::ObjectEnd | Token::ArrayEnd | Token::ConstructorEnd
        )
    }
}

// -----------------------------------------------------------------------------
// Scalar

/// A scalar JSON value carried by [`Token::Scalar`].
///
/// Integer literals narrow to the smallest carrier that holds them exactly:
/// [`Int`](Scalar::Int) first, [`UInt`](Scalar::UInt) for values above
/// `i64::MAX`, and [`BigInt`](Scalar::BigInt) — the raw decimal text — for
/// anything beyond 64 bits, so extreme literals round-trip losslessly.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Null,
    /// The non-standard `undefined` literal.
    Undefined,
    Bool(bool),
    Int(i64),
    UInt(u64),
    /// An integer literal outside the 64-bit range, kept as decimal text.
    BigInt(String),
    Float(f64),
    Str(String),
    Date(JsonDate),
}

impl Scalar {
    /// The [`ScalarKind`] of this value.
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Null => ScalarKind::Null,
            Scalar::Undefined => ScalarKind::Undefined,
            Scalar::Bool(_) => ScalarKind::Bool,
            Scalar::Int(_) | Scalar::UInt(_) | Scalar::BigInt(_) => ScalarKind::Integer,
            Scalar::Float(_) => ScalarKind::Float,
            Scalar::Str(_) => ScalarKind::String,
            Scalar::Date(_) => ScalarKind::Date,
        }
    }

    /// Returns `true` for `Null` and `Undefined`.
    #[inline]
    pub fn is_null_like(&self) -> bool {
        matches!(self, Scalar::Null | Scalar::Undefined)
    }

    /// The value as an `i64`, if it is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(v) => Some(*v),
            Scalar::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// The value as a `u64`, if it is a non-negative integer that fits.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Scalar::Int(v) => u64::try_from(*v).ok(),
            Scalar::UInt(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as an `f64`; integers convert, possibly losing precision.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(v) => Some(*v as f64),
            Scalar::UInt(v) => Some(*v as f64),
            Scalar::Float(v) => Some(*v),
            Scalar::BigInt(raw) => raw.parse().ok(),
            _ => None,
        }
    }

    /// The value as a string slice, for `Str` only.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }
}

// -----------------------------------------------------------------------------
// ScalarKind

/// The coarse classification of a [`Scalar`], used in fault messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    Null,
    Undefined,
    Bool,
    Integer,
    Float,
    String,
    Date,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::Null => "null",
            ScalarKind::Undefined => "undefined",
            ScalarKind::Bool => "boolean",
            ScalarKind::Integer => "integer",
            ScalarKind::Float => "float",
            ScalarKind::String => "string",
            ScalarKind::Date => "date",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_accessors_narrow_and_widen() {
        assert_eq!(Scalar::Int(-3).as_i64(), Some(-3));
        assert_eq!(Scalar::Int(-3).as_u64(), None);
        assert_eq!(Scalar::UInt(u64::MAX).as_i64(), None);
        assert_eq!(Scalar::UInt(7).as_i64(), Some(7));
        assert_eq!(Scalar::BigInt("123456".into()).as_f64(), Some(123456.0));
    }

    #[test]
    fn kind_classification() {
        assert_eq!(Scalar::BigInt("9".repeat(40)).kind(), ScalarKind::Integer);
        assert_eq!(Scalar::Undefined.kind(), ScalarKind::Undefined);
        assert!(Scalar::Undefined.is_null_like());
        assert!(!Scalar::Bool(false).is_null_like());
    }
}
