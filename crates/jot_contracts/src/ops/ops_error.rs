use core::fmt;

/// A failed operation on a type-erased value.
#[derive(Debug)]
pub enum OpsError {
    /// The object has no field with this declared name.
    UnknownMember(String),
    /// The supplied value's runtime type does not match the slot.
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    /// The value is not of the kind the operation needs.
    KindMismatch { expected: &'static str },
    /// The handle has no interior mutability, so its target cannot be
    /// written through.
    Immutable(&'static str),
    /// A scalar did not fit the target type.
    OutOfRange {
        value: String,
        target: &'static str,
    },
    /// A string scalar named no variant of the target enum.
    UnknownVariant {
        value: String,
        target: &'static str,
    },
}

impl fmt::Display for OpsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpsError::UnknownMember(name) => write!(f, "no member named `{name}`"),
            OpsError::TypeMismatch { expected, actual } => {
                write!(f, "expected a `{expected}`, got a `{actual}`")
            }
            OpsError::KindMismatch { expected } => {
                write!(f, "value is not {expected}")
            }
            OpsError::Immutable(path) => {
                write!(f, "`{path}` cannot be mutated through a shared handle")
            }
            OpsError::OutOfRange { value, target } => {
                write!(f, "{value} does not fit in `{target}`")
            }
            OpsError::UnknownVariant { value, target } => {
                write!(f, "`{value}` is not a variant of `{target}`")
            }
        }
    }
}

impl core::error::Error for OpsError {}
