use std::io::Read;

use crate::date::JsonDate;
use crate::error::{Location, ReaderError, ReaderErrorKind};
use crate::path::PathStack;
use crate::stream::TokenSource;
use crate::token::{Scalar, Token};

// -----------------------------------------------------------------------------
// DateParsing

/// Whether value strings that look like dates become [`Scalar::Date`].
///
/// Member names are never date-parsed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DateParsing {
    /// Leave date-like strings as plain strings.
    None,
    /// Recognize ISO-8601 and `"\/Date(ms)\/"` forms.
    #[default]
    DateTime,
}

// -----------------------------------------------------------------------------
// JsonReader

const CHUNK: usize = 8 * 1024;

/// A pull-based JSON tokenizer over any [`Read`] source.
///
/// Reads one token at a time without buffering the whole document. Always
/// accepts the documented extensions on top of RFC 8259: `//` and `/* */`
/// comments (surfaced as [`Token::Comment`]), single-quoted strings,
/// unquoted object keys, bare `NaN`/`Infinity`/`-Infinity`, the
/// `new Name(args)` constructor syntax and the epoch date wrapper.
///
/// # Examples
///
/// ```
/// use jot_tokens::{JsonReader, Scalar, Token, TokenSource};
///
/// let mut reader = JsonReader::new(r#"{"a": [1, true]}"#.as_bytes());
/// assert_eq!(reader.next_token().unwrap(), Some(Token::ObjectStart));
/// assert_eq!(reader.next_token().unwrap(), Some(Token::Property("a".into())));
/// assert_eq!(reader.next_token().unwrap(), Some(Token::ArrayStart));
/// assert_eq!(reader.next_token().unwrap(), Some(Token::Scalar(Scalar::Int(1))));
/// ```
pub struct JsonReader<R: Read> {
    src: R,
    buf: Vec<u8>,
    pos: usize,
    end: usize,
    eof: bool,
    line: usize,
    column: usize,
    path: PathStack,
    stack: Vec<Container>,
    state: State,
    date_parsing: DateParsing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Container {
    Object,
    Array,
    Constructor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    /// Expecting the root value.
    Start,
    /// Inside an object, expecting a member name or `}`.
    BeforeKey { separated: bool },
    /// Inside an object, after `name:`, expecting the member value.
    BeforeValue,
    /// Inside an array or constructor, expecting an item or the close.
    BeforeItem { separated: bool },
    /// The root value is complete.
    End,
}

impl<R: Read> JsonReader<R> {
    pub fn new(src: R) -> Self {
        Self {
            src,
            buf: vec![0; CHUNK],
            pos: 0,
            end: 0,
            eof: false,
            line: 1,
            column: 1,
            path: PathStack::new(),
            stack: Vec::new(),
            state: State::Start,
            date_parsing: DateParsing::default(),
        }
    }

    pub fn with_date_parsing(mut self, mode: DateParsing) -> Self {
        self.date_parsing = mode;
        self
    }

    /// Current position in the input.
    pub fn location(&self) -> Location {
        Location {
            line: self.line,
            column: self.column,
        }
    }

    /// Current path in dot/bracket notation.
    pub fn path(&self) -> String {
        self.path.render()
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Pulls the next token; `None` once the root value and any trailing
    /// whitespace/comments are consumed.
    pub fn next_token(&mut self) -> Result<Option<Token>, ReaderError> {
        loop {
            self.skip_whitespace()?;
            if let Some(comment) = self.try_comment()? {
                return Ok(Some(Token::Comment(comment)));
            }

            match self.state {
                State::Start => {
                    // An empty document ends cleanly before any token.
                    if self.peek()?.is_none() {
                        self.state = State::End;
                        return Ok(None);
                    }
                    return self.read_value().map(Some);
                }
                State::BeforeValue => return self.read_value().map(Some),
                State::BeforeKey { separated } => {
                    let b = match self.peek()? {
                        Some(b) => b,
                        None => return Err(self.fault(ReaderErrorKind::UnexpectedEnd)),
                    };
                    if b == b'}' {
                        self.bump();
                        return self.close(Container::Object, Token::ObjectEnd).map(Some);
                    }
                    if !separated {
                        if b != b',' {
                            return Err(self.fault(ReaderErrorKind::UnexpectedChar(b as char)));
                        }
                        self.bump();
                        self.state = State::BeforeKey { separated: true };
                        continue;
                    }
                    return self.read_key(b).map(Some);
                }
                State::BeforeItem { separated } => {
                    let container = *self.stack.last().unwrap_or(&Container::Array);
                    let closer = if container == Container::Constructor {
                        b')'
                    } else {
                        b']'
                    };
                    let b = match self.peek()? {
                        Some(b) => b,
                        None => return Err(self.fault(ReaderErrorKind::UnexpectedEnd)),
                    };
                    if b == closer {
                        self.bump();
                        let token = if container == Container::Constructor {
                            Token::ConstructorEnd
                        } else {
                            Token::ArrayEnd
                        };
                        return self.close(container, token).map(Some);
                    }
                    if b == b'}' || b == b']' || b == b')' {
                        return Err(self.fault(ReaderErrorKind::UnbalancedClose(b as char)));
                    }
                    if !separated {
                        if b != b',' {
                            return Err(self.fault(ReaderErrorKind::UnexpectedChar(b as char)));
                        }
                        self.bump();
                        self.state = State::BeforeItem { separated: true };
                        continue;
                    }
                    self.path.advance_item();
                    return self.read_value().map(Some);
                }
                State::End => {
                    return match self.peek()? {
                        None => Ok(None),
                        Some(_) => Err(self.fault(ReaderErrorKind::TrailingData)),
                    };
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Values

    fn read_value(&mut self) -> Result<Token, ReaderError> {
        let b = match self.peek()? {
            Some(b) => b,
            None => return Err(self.fault(ReaderErrorKind::UnexpectedEnd)),
        };
        match b {
            b'{' => {
                self.bump();
                self.stack.push(Container::Object);
                self.path.push_object();
                self.state = State::BeforeKey { separated: true };
                Ok(Token::ObjectStart)
            }
            b'[' => {
                self.bump();
                self.stack.push(Container::Array);
                self.path.push_array();
                self.state = State::BeforeItem { separated: true };
                Ok(Token::ArrayStart)
            }
            b'"' | b'\'' => {
                self.bump();
                let text = self.read_quoted(b)?;
                self.after_value();
                if self.date_parsing == DateParsing::DateTime {
                    if let Some(date) = JsonDate::parse(&text) {
                        return Ok(Token::Scalar(Scalar::Date(date)));
                    }
                }
                Ok(Token::Scalar(Scalar::Str(text)))
            }
            b'}' | b']' | b')' => Err(self.fault(ReaderErrorKind::UnbalancedClose(b as char))),
            b'-' | b'+' | b'.' | b'0'..=b'9' => self.read_number(),
            _ => self.read_keyword(),
        }
    }

    /// Sets the post-value state from the innermost container.
    fn after_value(&mut self) {
        self.state = match self.stack.last() {
            Some(Container::Object) => State::BeforeKey { separated: false },
            Some(Container::Array) | Some(Container::Constructor) => {
                State::BeforeItem { separated: false }
            }
            None => State::End,
        };
    }

    fn close(&mut self, expected: Container, token: Token) -> Result<Token, ReaderError> {
        match self.stack.pop() {
            Some(kind) if kind == expected => {
                self.path.pop();
                self.after_value();
                Ok(token)
            }
            _ => {
                let c = match token {
                    Token::ObjectEnd => '}',
                    Token::ConstructorEnd => ')',
                    _ => ']',
                };
                Err(self.fault(ReaderErrorKind::UnbalancedClose(c)))
            }
        }
    }

    fn read_key(&mut self, first: u8) -> Result<Token, ReaderError> {
        let name = match first {
            b'"' | b'\'' => {
                self.bump();
                self.read_quoted(first)?
            }
            b if is_ident_start(b) => self.read_ident(),
            b => return Err(self.fault(ReaderErrorKind::UnexpectedChar(b as char))),
        };
        self.skip_whitespace()?;
        while let Some(comment) = self.try_comment()? {
            // Comments between a member name and its `:` are legal but not
            // surfaced; the name token must come out atomically.
            let _ = comment;
            self.skip_whitespace()?;
        }
        match self.peek()? {
            Some(b':') => {
                self.bump();
            }
            Some(b) => return Err(self.fault(ReaderErrorKind::UnexpectedChar(b as char))),
            None => return Err(self.fault(ReaderErrorKind::UnexpectedEnd)),
        }
        self.path.set_property(&name);
        self.state = State::BeforeValue;
        Ok(Token::Property(name))
    }

    fn read_keyword(&mut self) -> Result<Token, ReaderError> {
        let b = self.peek()?.unwrap_or(0);
        if !is_ident_start(b) {
            return Err(self.fault(ReaderErrorKind::UnexpectedChar(b as char)));
        }
        let word = self.read_ident();
        match word.as_str() {
            "true" => {
                self.after_value();
                Ok(Token::Scalar(Scalar::Bool(true)))
            }
            "false" => {
                self.after_value();
                Ok(Token::Scalar(Scalar::Bool(false)))
            }
            "null" => {
                self.after_value();
                Ok(Token::Scalar(Scalar::Null))
            }
            "undefined" => {
                self.after_value();
                Ok(Token::Scalar(Scalar::Undefined))
            }
            "NaN" => {
                self.after_value();
                Ok(Token::Scalar(Scalar::Float(f64::NAN)))
            }
            "Infinity" => {
                self.after_value();
                Ok(Token::Scalar(Scalar::Float(f64::INFINITY)))
            }
            "new" => self.read_constructor(),
            _ => Err(self.fault(ReaderErrorKind::UnexpectedChar(b as char))),
        }
    }

    fn read_constructor(&mut self) -> Result<Token, ReaderError> {
        self.skip_whitespace()?;
        let b = self.peek()?.unwrap_or(0);
        if !is_ident_start(b) {
            return Err(self.fault(ReaderErrorKind::UnexpectedChar(b as char)));
        }
        let name = self.read_ident();
        self.skip_whitespace()?;
        match self.peek()? {
            Some(b'(') => {
                self.bump();
            }
            Some(b) => return Err(self.fault(ReaderErrorKind::UnexpectedChar(b as char))),
            None => return Err(self.fault(ReaderErrorKind::UnexpectedEnd)),
        }
        self.stack.push(Container::Constructor);
        self.path.push_constructor(&name);
        self.state = State::BeforeItem { separated: true };
        Ok(Token::ConstructorStart(name))
    }

    fn read_number(&mut self) -> Result<Token, ReaderError> {
        let mut raw = String::new();
        // `-Infinity` starts like a number.
        if self.peek()? == Some(b'-') {
            raw.push('-');
            self.bump();
            if self.peek()? == Some(b'I') {
                let word = self.read_ident();
                return if word == "Infinity" {
                    self.after_value();
                    Ok(Token::Scalar(Scalar::Float(f64::NEG_INFINITY)))
                } else {
                    Err(self.fault(ReaderErrorKind::InvalidNumber(format!("-{word}"))))
                };
            }
        }
        while let Some(b) = self.peek()? {
            match b {
                b'0'..=b'9' | b'.' | b'e' | b'E' | b'+' | b'-' => {
                    raw.push(b as char);
                    self.bump();
                }
                _ => break,
            }
        }
        self.after_value();
        let scalar = parse_number(&raw)
            .ok_or_else(|| self.fault(ReaderErrorKind::InvalidNumber(raw.clone())))?;
        Ok(Token::Scalar(scalar))
    }

    // -------------------------------------------------------------------------
    // Strings

    fn read_quoted(&mut self, quote: u8) -> Result<String, ReaderError> {
        let mut bytes = Vec::new();
        loop {
            let b = match self.peek()? {
                Some(b) => b,
                None => return Err(self.fault(ReaderErrorKind::UnterminatedString)),
            };
            self.bump();
            if b == quote {
                break;
            }
            if b == b'\\' {
                self.read_escape(&mut bytes)?;
                continue;
            }
            if b == b'\n' {
                return Err(self.fault(ReaderErrorKind::UnterminatedString));
            }
            bytes.push(b);
        }
        String::from_utf8(bytes).map_err(|_| self.fault(ReaderErrorKind::InvalidUtf8))
    }

    fn read_escape(&mut self, out: &mut Vec<u8>) -> Result<(), ReaderError> {
        let b = match self.peek()? {
            Some(b) => b,
            None => return Err(self.fault(ReaderErrorKind::UnterminatedString)),
        };
        self.bump();
        let decoded = match b {
            b'"' => '"',
            b'\'' => '\'',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => {
                let unit = self.read_hex4()?;
                let c = if (0xD800..0xDC00).contains(&unit) {
                    // High surrogate: pair it with the following `\uXXXX`,
                    // or substitute U+FFFD for a lone half.
                    self.try_low_surrogate(unit)?
                } else if (0xDC00..0xE000).contains(&unit) {
                    '\u{FFFD}'
                } else {
                    char::from_u32(u32::from(unit)).unwrap_or('\u{FFFD}')
                };
                c
            }
            other => {
                return Err(self.fault(ReaderErrorKind::InvalidEscape(format!(
                    "\\{}",
                    other as char
                ))));
            }
        };
        let mut utf8 = [0u8; 4];
        out.extend_from_slice(decoded.encode_utf8(&mut utf8).as_bytes());
        Ok(())
    }

    fn try_low_surrogate(&mut self, high: u16) -> Result<char, ReaderError> {
        if self.peek()? == Some(b'\\') {
            self.bump();
            if self.peek()? == Some(b'u') {
                self.bump();
                let low = self.read_hex4()?;
                if (0xDC00..0xE000).contains(&low) {
                    let c = 0x10000
                        + ((u32::from(high) - 0xD800) << 10)
                        + (u32::from(low) - 0xDC00);
                    return Ok(char::from_u32(c).unwrap_or('\u{FFFD}'));
                }
                return Ok('\u{FFFD}');
            }
            return Err(self.fault(ReaderErrorKind::InvalidEscape("\\".into())));
        }
        Ok('\u{FFFD}')
    }

    fn read_hex4(&mut self) -> Result<u16, ReaderError> {
        let mut value: u16 = 0;
        for _ in 0..4 {
            let b = match self.peek()? {
                Some(b) => b,
                None => return Err(self.fault(ReaderErrorKind::UnterminatedString)),
            };
            let digit = (b as char)
                .to_digit(16)
                .ok_or_else(|| self.fault(ReaderErrorKind::InvalidEscape("\\u".into())))?;
            self.bump();
            value = value << 4 | digit as u16;
        }
        Ok(value)
    }

    fn read_ident(&mut self) -> String {
        let mut out = String::new();
        while let Ok(Some(b)) = self.peek() {
            if is_ident_continue(b) {
                out.push(b as char);
                self.bump();
            } else {
                break;
            }
        }
        out
    }

    // -------------------------------------------------------------------------
    // Whitespace and comments

    fn skip_whitespace(&mut self) -> Result<(), ReaderError> {
        while let Some(b) = self.peek()? {
            match b {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.bump();
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn try_comment(&mut self) -> Result<Option<String>, ReaderError> {
        if self.peek()? != Some(b'/') {
            return Ok(None);
        }
        self.bump();
        match self.peek()? {
            Some(b'/') => {
                self.bump();
                let mut text = String::new();
                while let Some(b) = self.peek()? {
                    if b == b'\n' {
                        break;
                    }
                    if b != b'\r' {
                        text.push(b as char);
                    }
                    self.bump();
                }
                Ok(Some(text))
            }
            Some(b'*') => {
                self.bump();
                let mut text = String::new();
                loop {
                    let b = match self.peek()? {
                        Some(b) => b,
                        None => return Err(self.fault(ReaderErrorKind::UnterminatedComment)),
                    };
                    self.bump();
                    if b == b'*' && self.peek()? == Some(b'/') {
                        self.bump();
                        return Ok(Some(text));
                    }
                    text.push(b as char);
                }
            }
            Some(b) => Err(self.fault(ReaderErrorKind::UnexpectedChar(b as char))),
            None => Err(self.fault(ReaderErrorKind::UnexpectedEnd)),
        }
    }

    // -------------------------------------------------------------------------
    // Byte-level input

    fn peek(&mut self) -> Result<Option<u8>, ReaderError> {
        if self.pos == self.end {
            self.fill()?;
        }
        if self.pos == self.end {
            return Ok(None);
        }
        Ok(Some(self.buf[self.pos]))
    }

    fn bump(&mut self) {
        if self.pos < self.end {
            let b = self.buf[self.pos];
            self.pos += 1;
            if b == b'\n' {
                self.line += 1;
                self.column = 1;
            } else if b & 0xC0 != 0x80 {
                // Continuation bytes don't advance the column.
                self.column += 1;
            }
        }
    }

    fn fill(&mut self) -> Result<(), ReaderError> {
        if self.eof {
            return Ok(());
        }
        match self.src.read(&mut self.buf) {
            Ok(0) => {
                self.eof = true;
                self.pos = 0;
                self.end = 0;
                Ok(())
            }
            Ok(n) => {
                self.pos = 0;
                self.end = n;
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => self.fill(),
            Err(e) => Err(self.fault(ReaderErrorKind::Io(e))),
        }
    }

    fn fault(&self, kind: ReaderErrorKind) -> ReaderError {
        ReaderError::new(kind, self.location(), self.path.render())
    }
}

impl<R: Read> TokenSource for JsonReader<R> {
    fn next_token(&mut self) -> Result<Option<Token>, ReaderError> {
        JsonReader::next_token(self)
    }

    fn path(&self) -> String {
        JsonReader::path(self)
    }

    fn location(&self) -> Option<Location> {
        Some(JsonReader::location(self))
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Narrows an integer literal to `Int`, `UInt`, then raw `BigInt`; anything
/// with a fraction or exponent is a `Float`.
fn parse_number(raw: &str) -> Option<Scalar> {
    if raw.is_empty() || raw == "-" {
        return None;
    }
    if raw.contains(['.', 'e', 'E']) {
        return raw.parse::<f64>().ok().map(Scalar::Float);
    }
    if let Ok(v) = raw.parse::<i64>() {
        return Some(Scalar::Int(v));
    }
    if let Ok(v) = raw.parse::<u64>() {
        return Some(Scalar::UInt(v));
    }
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return Some(Scalar::BigInt(raw.to_owned()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::DateKind;

    fn drain(json: &str) -> Vec<Token> {
        let mut reader = JsonReader::new(json.as_bytes());
        let mut out = Vec::new();
        while let Some(token) = reader.next_token().unwrap() {
            out.push(token);
        }
        out
    }

    fn fail(json: &str) -> ReaderError {
        let mut reader = JsonReader::new(json.as_bytes());
        loop {
            match reader.next_token() {
                Ok(Some(_)) => {}
                Ok(None) => panic!("input `{json}` parsed cleanly"),
                Err(e) => return e,
            }
        }
    }

    #[test]
    fn flat_object() {
        assert_eq!(
            drain(r#"{"a":1,"b":[1,2,3]}"#),
            vec![
                Token::ObjectStart,
                Token::Property("a".into()),
                Token::Scalar(Scalar::Int(1)),
                Token::Property("b".into()),
                Token::ArrayStart,
                Token::Scalar(Scalar::Int(1)),
                Token::Scalar(Scalar::Int(2)),
                Token::Scalar(Scalar::Int(3)),
                Token::ArrayEnd,
                Token::ObjectEnd,
            ]
        );
    }

    #[test]
    fn integer_extremes_round_trip() {
        let tokens = drain("[-9223372036854775808,18446744073709551615]");
        assert_eq!(tokens[1], Token::Scalar(Scalar::Int(i64::MIN)));
        assert_eq!(tokens[2], Token::Scalar(Scalar::UInt(u64::MAX)));
    }

    #[test]
    fn oversized_integer_becomes_bigint() {
        let tokens = drain("[340282366920938463463374607431768211456]");
        assert_eq!(
            tokens[1],
            Token::Scalar(Scalar::BigInt(
                "340282366920938463463374607431768211456".into()
            ))
        );
    }

    #[test]
    fn non_finite_literals() {
        let tokens = drain("[NaN,Infinity,-Infinity]");
        match &tokens[1] {
            Token::Scalar(Scalar::Float(v)) => assert!(v.is_nan()),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(tokens[2], Token::Scalar(Scalar::Float(f64::INFINITY)));
        assert_eq!(tokens[3], Token::Scalar(Scalar::Float(f64::NEG_INFINITY)));
    }

    #[test]
    fn comments_are_surfaced() {
        let tokens = drain("/* head */ {\"a\": 1 // tail\n}");
        assert_eq!(tokens[0], Token::Comment(" head ".into()));
        assert!(tokens.contains(&Token::Comment(" tail".into())));
    }

    #[test]
    fn single_quotes_and_unquoted_keys() {
        assert_eq!(
            drain("{key: 'value'}"),
            vec![
                Token::ObjectStart,
                Token::Property("key".into()),
                Token::Scalar(Scalar::Str("value".into())),
                Token::ObjectEnd,
            ]
        );
    }

    #[test]
    fn constructor_syntax() {
        assert_eq!(
            drain("new Date(1234)"),
            vec![
                Token::ConstructorStart("Date".into()),
                Token::Scalar(Scalar::Int(1234)),
                Token::ConstructorEnd,
            ]
        );
    }

    #[test]
    fn escape_sequences() {
        let tokens = drain(r#"["a\nbA😀"]"#);
        assert_eq!(tokens[1], Token::Scalar(Scalar::Str("a\nbA😀".into())));
    }

    #[test]
    fn lone_surrogate_becomes_replacement() {
        let tokens = drain(r#"["\ud800"]"#);
        assert_eq!(tokens[1], Token::Scalar(Scalar::Str("\u{FFFD}".into())));
    }

    #[test]
    fn date_strings_parse_by_default() {
        let tokens = drain(r#"["2009-02-15T12:30:00Z","\/Date(1234699800000)\/"]"#);
        match (&tokens[1], &tokens[2]) {
            (Token::Scalar(Scalar::Date(a)), Token::Scalar(Scalar::Date(b))) => {
                assert_eq!(a.kind(), DateKind::Utc);
                assert_eq!(b.unix_millis(), 1234699800000);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn date_parsing_can_be_disabled() {
        let mut reader = JsonReader::new(r#""2009-02-15T12:30:00Z""#.as_bytes())
            .with_date_parsing(DateParsing::None);
        assert_eq!(
            reader.next_token().unwrap(),
            Some(Token::Scalar(Scalar::Str("2009-02-15T12:30:00Z".into())))
        );
    }

    #[test]
    fn property_names_are_never_dates() {
        let tokens = drain(r#"{"2009-02-15T12:30:00Z": 1}"#);
        assert_eq!(tokens[1], Token::Property("2009-02-15T12:30:00Z".into()));
    }

    #[test]
    fn empty_input_ends_without_tokens() {
        assert!(drain("").is_empty());
        assert!(drain("  \n\t").is_empty());
        assert!(drain("// nothing here\n").len() == 1); // the comment token
    }

    #[test]
    fn truncated_container_faults() {
        let err = fail(r#"{"a": [1, 2"#);
        assert!(matches!(err.kind, ReaderErrorKind::UnexpectedEnd));
        assert_eq!(err.path, "a[1]");
    }

    #[test]
    fn unbalanced_close_faults() {
        let err = fail(r#"{"a": 1]"#);
        assert!(matches!(
            err.kind,
            ReaderErrorKind::UnbalancedClose(']') | ReaderErrorKind::UnexpectedChar(']')
        ));
    }

    #[test]
    fn unterminated_string_reports_position() {
        let err = fail("{\"a\": \"oops");
        assert!(matches!(err.kind, ReaderErrorKind::UnterminatedString));
        assert_eq!(err.location.line, 1);
    }

    #[test]
    fn invalid_escape_faults() {
        let err = fail(r#"["\q"]"#);
        assert!(matches!(err.kind, ReaderErrorKind::InvalidEscape(_)));
    }

    #[test]
    fn trailing_data_faults() {
        let err = fail("1 2");
        assert!(matches!(err.kind, ReaderErrorKind::TrailingData));
    }

    #[test]
    fn multiline_input_tracks_lines() {
        let err = fail("{\n  \"a\": oops\n}");
        assert_eq!(err.location.line, 2);
    }
}
