use core::fmt;
use std::error;
use std::io;

// -----------------------------------------------------------------------------
// Location

/// A line/column position in the input text, both 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

// -----------------------------------------------------------------------------
// ReaderError

/// What went wrong while pulling tokens from the input.
#[derive(Debug)]
pub enum ReaderErrorKind {
    /// The input ended inside a container, string, or literal.
    UnexpectedEnd,
    /// A character that cannot start or continue the expected construct.
    UnexpectedChar(char),
    UnterminatedString,
    UnterminatedComment,
    /// An escape sequence the grammar does not allow, e.g. `\x`.
    InvalidEscape(String),
    /// A `]`/`}`/`)` closing a container that was never opened, or closing
    /// the wrong kind of container.
    UnbalancedClose(char),
    /// A literal that started like a number but does not parse as one.
    InvalidNumber(String),
    /// Bytes after the root value that are not whitespace or comments.
    TrailingData,
    /// String content that is not valid UTF-8.
    InvalidUtf8,
    Io(io::Error),
}

/// A fault raised by [`JsonReader`](crate::JsonReader), tagged with the
/// position and path where it occurred.
#[derive(Debug)]
pub struct ReaderError {
    pub kind: ReaderErrorKind,
    pub location: Location,
    pub path: String,
}

impl ReaderError {
    pub(crate) fn new(kind: ReaderErrorKind, location: Location, path: String) -> Self {
        Self {
            kind,
            location,
            path,
        }
    }
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ReaderErrorKind::UnexpectedEnd => write!(f, "unexpected end of input")?,
            ReaderErrorKind::UnexpectedChar(c) => write!(f, "unexpected character `{c}`")?,
            ReaderErrorKind::UnterminatedString => write!(f, "unterminated string")?,
            ReaderErrorKind::UnterminatedComment => write!(f, "unterminated comment")?,
            ReaderErrorKind::InvalidEscape(seq) => write!(f, "invalid escape sequence `{seq}`")?,
            ReaderErrorKind::UnbalancedClose(c) => {
                write!(f, "`{c}` closes a container that is not open")?
            }
            ReaderErrorKind::InvalidNumber(raw) => write!(f, "invalid number literal `{raw}`")?,
            ReaderErrorKind::TrailingData => write!(f, "unexpected data after the root value")?,
            ReaderErrorKind::InvalidUtf8 => write!(f, "string content is not valid UTF-8")?,
            ReaderErrorKind::Io(e) => write!(f, "read failed: {e}")?,
        }
        write!(f, " at {}", self.location)?;
        if !self.path.is_empty() {
            write!(f, ", path `{}`", self.path)?;
        }
        Ok(())
    }
}

impl error::Error for ReaderError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.kind {
            ReaderErrorKind::Io(e) => Some(e),
            _ => None,
        }
    }
}

// -----------------------------------------------------------------------------
// WriterError

/// What went wrong while pushing tokens to the output.
#[derive(Debug)]
pub enum WriterErrorKind {
    /// An end token with no matching start, or the wrong kind of end token.
    UnbalancedClose,
    /// A property name outside an object, or a value where a name is due.
    TokenOutOfPlace(&'static str),
    /// A non-finite float under [`NonFinitePolicy::Error`](crate::NonFinitePolicy).
    NonFiniteNumber(f64),
    /// `finish` was called with containers still open.
    IncompleteDocument,
    Io(io::Error),
}

/// A fault raised by [`JsonWriter`](crate::JsonWriter), tagged with the path
/// being written when it occurred.
#[derive(Debug)]
pub struct WriterError {
    pub kind: WriterErrorKind,
    pub path: String,
}

impl WriterError {
    pub(crate) fn new(kind: WriterErrorKind, path: String) -> Self {
        Self { kind, path }
    }
}

impl fmt::Display for WriterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WriterErrorKind::UnbalancedClose => {
                write!(f, "end token closes a container that is not open")?
            }
            WriterErrorKind::TokenOutOfPlace(what) => {
                write!(f, "{what} is not valid at this position")?
            }
            WriterErrorKind::NonFiniteNumber(v) => {
                write!(f, "non-finite number `{v}` cannot be written as JSON")?
            }
            WriterErrorKind::IncompleteDocument => {
                write!(f, "document finished with unclosed containers")?
            }
            WriterErrorKind::Io(e) => write!(f, "write failed: {e}")?,
        }
        if !self.path.is_empty() {
            write!(f, ", path `{}`", self.path)?;
        }
        Ok(())
    }
}

impl error::Error for WriterError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.kind {
            WriterErrorKind::Io(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_error_display_includes_position_and_path() {
        let err = ReaderError::new(
            ReaderErrorKind::UnterminatedString,
            Location { line: 3, column: 9 },
            "items[2].name".into(),
        );
        let text = err.to_string();
        assert!(text.contains("unterminated string"));
        assert!(text.contains("line 3, column 9"));
        assert!(text.contains("items[2].name"));
    }

    #[test]
    fn writer_error_display_includes_path() {
        let err = WriterError::new(WriterErrorKind::NonFiniteNumber(f64::NAN), "a.b".into());
        let text = err.to_string();
        assert!(text.contains("non-finite"));
        assert!(text.contains("`a.b`"));
    }
}
