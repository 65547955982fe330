use std::collections::VecDeque;

use crate::error::{Location, ReaderError, ReaderErrorKind, WriterError};
use crate::token::Token;

// -----------------------------------------------------------------------------
// TokenSource / TokenSink

/// The pull end of the token protocol.
///
/// Object-safe so higher layers (the engine, converters) can work over any
/// reader without being generic over the underlying byte source.
pub trait TokenSource {
    /// Pulls the next token; `None` at end of input.
    fn next_token(&mut self) -> Result<Option<Token>, ReaderError>;

    /// Current path in dot/bracket notation.
    fn path(&self) -> String;

    /// Current position in the text, when the source has one.
    fn location(&self) -> Option<Location> {
        None
    }
}

/// The push end of the token protocol.
pub trait TokenSink {
    /// Pushes one token.
    fn write(&mut self, token: Token) -> Result<(), WriterError>;

    /// Current path in dot/bracket notation.
    fn path(&self) -> String;
}

// -----------------------------------------------------------------------------
// TokenBuffer

/// An in-memory token sequence implementing both ends of the protocol.
///
/// Used for the read-ahead metadata mode (buffer an object, scan it, replay
/// it), for staging converter output, and in tests. Unlike
/// [`JsonWriter`](crate::JsonWriter) it performs no structural validation;
/// it stores whatever it is given.
#[derive(Debug, Default)]
pub struct TokenBuffer {
    tokens: VecDeque<Token>,
}

impl TokenBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Appends a token without consuming anything.
    pub fn push(&mut self, token: Token) {
        self.tokens.push_back(token);
    }

    /// Looks at the `n`-th unconsumed token.
    pub fn peek(&self, n: usize) -> Option<&Token> {
        self.tokens.get(n)
    }

    /// Puts a token back at the front, so it is returned by the next pull.
    pub fn unread(&mut self, token: Token) {
        self.tokens.push_front(token);
    }

    /// Transfers one complete value (a scalar, or a container with all of
    /// its children) from `source` into this buffer. Comments inside the
    /// value are preserved. Returns `false` at end of input.
    pub fn buffer_value(&mut self, source: &mut dyn TokenSource) -> Result<bool, ReaderError> {
        let mut depth = 0usize;
        loop {
            let token = match source.next_token()? {
                Some(token) => token,
                None => return Ok(depth == 0 && !self.tokens.is_empty()),
            };
            let opens = token.opens_container();
            let closes = token.closes_container();
            let comment = matches!(token, Token::Comment(_));
            if closes && depth == 0 {
                // An unbalanced close from a non-validating source.
                let close = match token {
                    Token::ArrayEnd => ']',
                    Token::ConstructorEnd => ')',
                    _ => '}',
                };
                return Err(ReaderError::new(
                    ReaderErrorKind::UnbalancedClose(close),
                    source.location().unwrap_or(Location { line: 1, column: 1 }),
                    source.path(),
                ));
            }
            self.tokens.push_back(token);
            if opens {
                depth += 1;
            } else if closes {
                depth -= 1;
                if depth == 0 {
                    return Ok(true);
                }
            } else if depth == 0 && !comment {
                // A bare scalar or property token completes immediately.
                return Ok(true);
            }
        }
    }

    /// Iterates the buffered tokens without consuming them.
    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }
}

impl TokenSource for TokenBuffer {
    fn next_token(&mut self) -> Result<Option<Token>, ReaderError> {
        Ok(self.tokens.pop_front())
    }

    fn path(&self) -> String {
        String::new()
    }
}

impl TokenSink for TokenBuffer {
    fn write(&mut self, token: Token) -> Result<(), WriterError> {
        self.tokens.push_back(token);
        Ok(())
    }

    fn path(&self) -> String {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::JsonReader;
    use crate::token::Scalar;

    #[test]
    fn buffers_a_complete_container() {
        let mut reader = JsonReader::new(r#"[{"a": 1}, 2]"#.as_bytes());
        // Consume the array start so the object is the next value.
        reader.next_token().unwrap();

        let mut buffer = TokenBuffer::new();
        assert!(buffer.buffer_value(&mut reader).unwrap());
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.peek(0), Some(&Token::ObjectStart));
        assert_eq!(buffer.peek(3), Some(&Token::ObjectEnd));

        // The source continues after the buffered value.
        assert_eq!(
            reader.next_token().unwrap(),
            Some(Token::Scalar(Scalar::Int(2)))
        );
    }

    #[test]
    fn replay_matches_what_was_buffered() {
        let mut reader = JsonReader::new(r#"{"x": [1, 2]}"#.as_bytes());
        let mut buffer = TokenBuffer::new();
        assert!(buffer.buffer_value(&mut reader).unwrap());

        let mut replayed = Vec::new();
        while let Some(token) = buffer.next_token().unwrap() {
            replayed.push(token);
        }
        assert_eq!(replayed.len(), 7);
        assert_eq!(replayed[0], Token::ObjectStart);
        assert_eq!(replayed[6], Token::ObjectEnd);
    }

    #[test]
    fn unread_returns_first() {
        let mut buffer = TokenBuffer::new();
        buffer.push(Token::Scalar(Scalar::Int(2)));
        buffer.unread(Token::Scalar(Scalar::Int(1)));
        assert_eq!(
            buffer.next_token().unwrap(),
            Some(Token::Scalar(Scalar::Int(1)))
        );
    }

    #[test]
    fn unbalanced_close_is_refused() {
        // Another buffer is a non-validating source, so a stray close can
        // arrive first.
        let mut stray = TokenBuffer::new();
        stray.push(Token::ObjectEnd);

        let mut buffer = TokenBuffer::new();
        let err = buffer.buffer_value(&mut stray).unwrap_err();
        assert!(matches!(err.kind, ReaderErrorKind::UnbalancedClose('}')));
        assert!(buffer.is_empty());
    }

    #[test]
    fn empty_source_reports_false() {
        let mut reader = JsonReader::new("".as_bytes());
        let mut buffer = TokenBuffer::new();
        assert!(!buffer.buffer_value(&mut reader).unwrap());
    }
}
