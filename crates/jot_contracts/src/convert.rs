use core::fmt;

use jot_tokens::{ReaderError, TokenSink, TokenSource, WriterError};

use crate::node::Node;
use crate::shape::Shape;

/// A custom wire representation for some set of types.
///
/// Converters claim values by shape and then own the token-level encoding
/// entirely; the engine does not descend into a converted value. Attach one
/// globally through the settings or per member with
/// `#[json(convert_with = Type)]`.
pub trait Converter: Send + Sync {
    /// Whether this converter wants values of the given shape.
    fn handles(&self, shape: &'static Shape) -> bool;

    /// Writes `node` as tokens.
    fn write(&self, node: &dyn Node, sink: &mut dyn TokenSink) -> Result<(), ConvertError>;

    /// Reads one value as tokens and builds an instance of `shape`.
    fn read(
        &self,
        source: &mut dyn TokenSource,
        shape: &'static Shape,
    ) -> Result<Box<dyn Node>, ConvertError>;
}

/// A converter failure, surfaced to the engine's recovery machinery.
#[derive(Debug)]
pub struct ConvertError {
    message: String,
}

impl ConvertError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl core::error::Error for ConvertError {}

impl From<ReaderError> for ConvertError {
    fn from(err: ReaderError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<WriterError> for ConvertError {
    fn from(err: WriterError) -> Self {
        Self::new(err.to_string())
    }
}
