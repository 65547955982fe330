#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Modules

mod date;
mod error;
mod path;
mod reader;
mod stream;
mod token;
mod writer;

// -----------------------------------------------------------------------------
// Exports

pub use date::{DateKind, JsonDate};
pub use error::{Location, ReaderError, ReaderErrorKind, WriterError, WriterErrorKind};
pub use path::PathStack;
pub use reader::{DateParsing, JsonReader};
pub use stream::{TokenBuffer, TokenSink, TokenSource};
pub use token::{Scalar, ScalarKind, Token};
pub use writer::{DateFormat, EscapePolicy, Formatting, JsonWriter, NonFinitePolicy};
