use std::io::Write;

use crate::date::JsonDate;
use crate::error::{WriterError, WriterErrorKind};
use crate::path::PathStack;
use crate::stream::TokenSink;
use crate::token::{Scalar, Token};

// -----------------------------------------------------------------------------
// Policies

/// Output layout. Formatting only; never changes semantic content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Formatting {
    #[default]
    Compact,
    /// Multi-line output with two-space indentation.
    Indented,
}

/// How `NaN` and the infinities are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NonFinitePolicy {
    /// Refuse to write them (strict RFC 8259).
    #[default]
    Error,
    /// Bare `NaN`/`Infinity`/`-Infinity` literals (invalid but common).
    Symbol,
    /// Write `0.0` instead.
    Zero,
    /// Write the symbol as a quoted string.
    String,
}

/// Which characters get `\uXXXX`-escaped beyond the mandatory set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EscapePolicy {
    /// Control characters, the active quote and the backslash only.
    #[default]
    Default,
    /// Additionally `<`, `>`, `&`, `'`, `"`.
    EscapeHtml,
    /// Additionally every non-ASCII code point.
    EscapeNonAscii,
}

/// Which textual convention dates are written under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DateFormat {
    /// `"2009-02-15T12:30:00Z"` with offset/zone suffix rules per
    /// [`DateKind`](crate::DateKind).
    #[default]
    Iso8601,
    /// `"\/Date(1234699800000)\/"` epoch-milliseconds wrapper.
    Epoch,
}

// -----------------------------------------------------------------------------
// JsonWriter

/// A push-based JSON formatter over any [`Write`] sink.
///
/// Enforces structural validity (a value token where a member name is due is
/// a fault, as is closing a container that is not open) and tracks the path
/// for diagnostics, mirroring [`JsonReader`](crate::JsonReader).
///
/// # Examples
///
/// ```
/// use jot_tokens::{JsonWriter, Scalar, Token, TokenSink};
///
/// let mut out = Vec::new();
/// let mut writer = JsonWriter::new(&mut out);
/// writer.write(Token::ObjectStart).unwrap();
/// writer.write(Token::Property("a".into())).unwrap();
/// writer.write(Token::Scalar(Scalar::Int(1))).unwrap();
/// writer.write(Token::ObjectEnd).unwrap();
/// writer.finish().unwrap();
/// assert_eq!(out, br#"{"a":1}"#);
/// ```
pub struct JsonWriter<W: Write> {
    out: W,
    formatting: Formatting,
    non_finite: NonFinitePolicy,
    escape: EscapePolicy,
    date_format: DateFormat,
    quote: char,
    stack: Vec<Frame>,
    pending_name: bool,
    root_written: bool,
    path: PathStack,
}

#[derive(Debug)]
struct Frame {
    kind: Container,
    count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Container {
    Object,
    Array,
    Constructor,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            formatting: Formatting::default(),
            non_finite: NonFinitePolicy::default(),
            escape: EscapePolicy::default(),
            date_format: DateFormat::default(),
            quote: '"',
            stack: Vec::new(),
            pending_name: false,
            root_written: false,
            path: PathStack::new(),
        }
    }

    pub fn with_formatting(mut self, formatting: Formatting) -> Self {
        self.formatting = formatting;
        self
    }

    pub fn with_non_finite(mut self, policy: NonFinitePolicy) -> Self {
        self.non_finite = policy;
        self
    }

    pub fn with_escape_policy(mut self, policy: EscapePolicy) -> Self {
        self.escape = policy;
        self
    }

    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.date_format = format;
        self
    }

    /// Sets the quote character; `'` produces single-quoted strings.
    pub fn with_quote_char(mut self, quote: char) -> Self {
        debug_assert!(quote == '"' || quote == '\'');
        self.quote = quote;
        self
    }

    /// Current path in dot/bracket notation.
    pub fn path(&self) -> String {
        self.path.render()
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Pushes one token to the output.
    pub fn write(&mut self, token: Token) -> Result<(), WriterError> {
        match token {
            Token::ObjectStart => {
                self.before_value()?;
                self.raw("{")?;
                self.stack.push(Frame {
                    kind: Container::Object,
                    count: 0,
                });
                self.path.push_object();
                Ok(())
            }
            Token::ObjectEnd => self.close(Container::Object, "}"),
            Token::ArrayStart => {
                self.before_value()?;
                self.raw("[")?;
                self.stack.push(Frame {
                    kind: Container::Array,
                    count: 0,
                });
                self.path.push_array();
                Ok(())
            }
            Token::ArrayEnd => self.close(Container::Array, "]"),
            Token::ConstructorStart(name) => {
                self.before_value()?;
                self.raw("new ")?;
                self.raw(&name)?;
                self.raw("(")?;
                self.stack.push(Frame {
                    kind: Container::Constructor,
                    count: 0,
                });
                self.path.push_constructor(&name);
                Ok(())
            }
            Token::ConstructorEnd => self.close(Container::Constructor, ")"),
            Token::Property(name) => self.property(&name),
            Token::Comment(text) => {
                // Comments are written verbatim and do not take part in
                // separator bookkeeping.
                self.raw("/*")?;
                self.raw(&text)?;
                self.raw("*/")
            }
            Token::Scalar(scalar) => self.scalar(scalar),
        }
    }

    /// Writes a member name; the next token must be its value.
    pub fn property(&mut self, name: &str) -> Result<(), WriterError> {
        let in_object = matches!(
            self.stack.last(),
            Some(Frame {
                kind: Container::Object,
                ..
            })
        );
        if !in_object || self.pending_name {
            return Err(self.fault(WriterErrorKind::TokenOutOfPlace("property name")));
        }
        let count = self.stack.last().map_or(0, |f| f.count);
        if count > 0 {
            self.raw(",")?;
        }
        self.newline_indent(self.stack.len())?;
        let escaped = escape_string(name, self.quote, self.escape);
        self.raw(&escaped)?;
        self.raw(":")?;
        if self.formatting == Formatting::Indented {
            self.raw(" ")?;
        }
        if let Some(frame) = self.stack.last_mut() {
            frame.count += 1;
        }
        self.path.set_property(name);
        self.pending_name = true;
        Ok(())
    }

    /// Writes a scalar value at the current position.
    pub fn scalar(&mut self, scalar: Scalar) -> Result<(), WriterError> {
        let text = self.format_scalar(&scalar)?;
        self.before_value()?;
        self.raw(&text)
    }

    /// Checks the document is complete and flushes the sink.
    pub fn finish(&mut self) -> Result<(), WriterError> {
        if !self.stack.is_empty() || self.pending_name {
            return Err(self.fault(WriterErrorKind::IncompleteDocument));
        }
        self.out.flush().map_err(|e| self.io(e))
    }

    // -------------------------------------------------------------------------
    // Position bookkeeping

    /// Separator/indent handling before any value token; also rejects values
    /// written where a member name is due.
    fn before_value(&mut self) -> Result<(), WriterError> {
        if self.pending_name {
            self.pending_name = false;
            return Ok(());
        }
        match self.stack.last() {
            Some(Frame {
                kind: Container::Object,
                ..
            }) => Err(self.fault(WriterErrorKind::TokenOutOfPlace("value"))),
            Some(Frame {
                kind: Container::Array,
                count,
            }) => {
                if *count > 0 {
                    self.raw(",")?;
                }
                self.newline_indent(self.stack.len())?;
                if let Some(frame) = self.stack.last_mut() {
                    frame.count += 1;
                }
                self.path.advance_item();
                Ok(())
            }
            Some(Frame {
                kind: Container::Constructor,
                count,
            }) => {
                if *count > 0 {
                    self.raw(",")?;
                }
                if let Some(frame) = self.stack.last_mut() {
                    frame.count += 1;
                }
                self.path.advance_item();
                Ok(())
            }
            None => {
                if self.root_written {
                    return Err(self.fault(WriterErrorKind::TokenOutOfPlace("second root value")));
                }
                self.root_written = true;
                Ok(())
            }
        }
    }

    fn close(&mut self, expected: Container, text: &str) -> Result<(), WriterError> {
        match self.stack.last() {
            Some(frame) if frame.kind == expected && !self.pending_name => {
                let had_items = frame.count > 0;
                self.stack.pop();
                self.path.pop();
                if had_items && expected != Container::Constructor {
                    self.newline_indent(self.stack.len())?;
                }
                self.raw(text)
            }
            _ => Err(self.fault(WriterErrorKind::UnbalancedClose)),
        }
    }

    fn newline_indent(&mut self, depth: usize) -> Result<(), WriterError> {
        if self.formatting == Formatting::Indented {
            self.raw("\n")?;
            for _ in 0..depth {
                self.raw("  ")?;
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Scalar formatting

    fn format_scalar(&self, scalar: &Scalar) -> Result<String, WriterError> {
        Ok(match scalar {
            Scalar::Null => "null".into(),
            Scalar::Undefined => "undefined".into(),
            Scalar::Bool(true) => "true".into(),
            Scalar::Bool(false) => "false".into(),
            Scalar::Int(v) => v.to_string(),
            Scalar::UInt(v) => v.to_string(),
            Scalar::BigInt(raw) => raw.clone(),
            Scalar::Float(v) => self.format_float(*v)?,
            Scalar::Str(s) => escape_string(s, self.quote, self.escape),
            Scalar::Date(date) => self.format_date(date),
        })
    }

    fn format_float(&self, v: f64) -> Result<String, WriterError> {
        if v.is_finite() {
            // Shortest representation that parses back to the same bits;
            // integral values keep a `.0` so they stay recognizable as floats.
            return Ok(ryu::Buffer::new().format_finite(v).to_owned());
        }
        let symbol = if v.is_nan() {
            "NaN"
        } else if v > 0.0 {
            "Infinity"
        } else {
            "-Infinity"
        };
        match self.non_finite {
            NonFinitePolicy::Error => Err(self.fault(WriterErrorKind::NonFiniteNumber(v))),
            NonFinitePolicy::Symbol => Ok(symbol.into()),
            NonFinitePolicy::Zero => Ok("0.0".into()),
            NonFinitePolicy::String => Ok(format!("{0}{symbol}{0}", self.quote)),
        }
    }

    fn format_date(&self, date: &JsonDate) -> String {
        match self.date_format {
            DateFormat::Iso8601 => format!("{0}{1}{0}", self.quote, date.format_iso()),
            DateFormat::Epoch => {
                format!("{0}\\/Date({1})\\/{0}", self.quote, date.format_epoch_body())
            }
        }
    }

    // -------------------------------------------------------------------------
    // Output

    fn raw(&mut self, text: &str) -> Result<(), WriterError> {
        self.out.write_all(text.as_bytes()).map_err(|e| self.io(e))
    }

    fn fault(&self, kind: WriterErrorKind) -> WriterError {
        WriterError::new(kind, self.path.render())
    }

    fn io(&self, e: std::io::Error) -> WriterError {
        WriterError::new(WriterErrorKind::Io(e), self.path.render())
    }
}

impl<W: Write> TokenSink for JsonWriter<W> {
    fn write(&mut self, token: Token) -> Result<(), WriterError> {
        JsonWriter::write(self, token)
    }

    fn path(&self) -> String {
        JsonWriter::path(self)
    }
}

// -----------------------------------------------------------------------------
// String escaping

fn escape_string(s: &str, quote: char, policy: EscapePolicy) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '<' | '>' | '&' | '\'' | '"' if policy == EscapePolicy::EscapeHtml => {
                push_unicode_escape(&mut out, c);
            }
            c if c == quote => {
                out.push('\\');
                out.push(quote);
            }
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => push_unicode_escape(&mut out, c),
            c if policy == EscapePolicy::EscapeNonAscii && !c.is_ascii() => {
                push_unicode_escape(&mut out, c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// `\uXXXX`, as a surrogate pair for code points above the BMP.
fn push_unicode_escape(out: &mut String, c: char) {
    let mut units = [0u16; 2];
    for unit in c.encode_utf16(&mut units) {
        out.push_str(&format!("\\u{unit:04x}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::JsonReader;
    use time::macros::datetime;

    fn run(tokens: Vec<Token>, configure: impl FnOnce(JsonWriter<&mut Vec<u8>>) -> JsonWriter<&mut Vec<u8>>) -> String {
        let mut out = Vec::new();
        let mut writer = configure(JsonWriter::new(&mut out));
        for token in tokens {
            writer.write(token).unwrap();
        }
        writer.finish().unwrap();
        String::from_utf8(out).unwrap()
    }

    fn object_with_array() -> Vec<Token> {
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
    }

    #[test]
    fn compact_output() {
        assert_eq!(run(object_with_array(), |w| w), r#"{"a":1,"b":[1,2,3]}"#);
    }

    #[test]
    fn indented_output_is_canonical() {
        let expected = "{\n  \"a\": 1,\n  \"b\": [\n    1,\n    2,\n    3\n  ]\n}";
        let text = run(object_with_array(), |w| {
            w.with_formatting(Formatting::Indented)
        });
        assert_eq!(text, expected);
    }

    #[test]
    fn indented_output_reads_back_equal() {
        let text = run(object_with_array(), |w| {
            w.with_formatting(Formatting::Indented)
        });
        let mut reader = JsonReader::new(text.as_bytes());
        let mut tokens = Vec::new();
        while let Some(t) = reader.next_token().unwrap() {
            tokens.push(t);
        }
        assert_eq!(tokens, object_with_array());
    }

    #[test]
    fn strict_output_is_valid_json() {
        let text = run(object_with_array(), |w| w);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["b"][2], serde_json::json!(3));
    }

    #[test]
    fn integer_extremes() {
        let text = run(
            vec![
                Token::ArrayStart,
                Token::Scalar(Scalar::Int(i64::MIN)),
                Token::Scalar(Scalar::UInt(u64::MAX)),
                Token::Scalar(Scalar::BigInt("170141183460469231731687303715884105727".into())),
                Token::ArrayEnd,
            ],
            |w| w,
        );
        assert_eq!(
            text,
            "[-9223372036854775808,18446744073709551615,170141183460469231731687303715884105727]"
        );
    }

    #[test]
    fn floats_stay_floats() {
        let text = run(
            vec![
                Token::ArrayStart,
                Token::Scalar(Scalar::Float(1.0)),
                Token::Scalar(Scalar::Float(0.1)),
                Token::Scalar(Scalar::Float(-0.0)),
                Token::Scalar(Scalar::Float(1e100)),
                Token::ArrayEnd,
            ],
            |w| w,
        );
        assert_eq!(text, "[1.0,0.1,-0.0,1e100]");
    }

    #[test]
    fn non_finite_policies() {
        let nan = vec![Token::Scalar(Scalar::Float(f64::NAN))];
        assert_eq!(run(nan.clone(), |w| w.with_non_finite(NonFinitePolicy::Symbol)), "NaN");
        assert_eq!(run(nan.clone(), |w| w.with_non_finite(NonFinitePolicy::Zero)), "0.0");
        assert_eq!(
            run(nan.clone(), |w| w.with_non_finite(NonFinitePolicy::String)),
            "\"NaN\""
        );

        let mut out = Vec::new();
        let mut writer = JsonWriter::new(&mut out);
        let err = writer.write(nan[0].clone()).unwrap_err();
        assert!(matches!(err.kind, WriterErrorKind::NonFiniteNumber(_)));
    }

    #[test]
    fn default_escapes() {
        let text = run(
            vec![Token::Scalar(Scalar::Str("a\"b\\c\n\u{1}é".into()))],
            |w| w,
        );
        assert_eq!(text, "\"a\\\"b\\\\c\\n\\u0001é\"");
    }

    #[test]
    fn html_escapes() {
        let text = run(
            vec![Token::Scalar(Scalar::Str("<b>&'\"".into()))],
            |w| w.with_escape_policy(EscapePolicy::EscapeHtml),
        );
        assert_eq!(text, "\"\\u003cb\\u003e\\u0026\\u0027\\u0022\"");
    }

    #[test]
    fn non_ascii_escapes_use_surrogate_pairs() {
        let text = run(
            vec![Token::Scalar(Scalar::Str("é😀".into()))],
            |w| w.with_escape_policy(EscapePolicy::EscapeNonAscii),
        );
        assert_eq!(text, "\"\\u00e9\\ud83d\\ude00\"");
    }

    #[test]
    fn single_quote_mode() {
        let text = run(
            vec![Token::Scalar(Scalar::Str("it's".into()))],
            |w| w.with_quote_char('\''),
        );
        assert_eq!(text, r#"'it\'s'"#);
    }

    #[test]
    fn iso_date() {
        let date = JsonDate::utc(datetime!(2009-02-15 12:30:00 UTC));
        let text = run(vec![Token::Scalar(Scalar::Date(date))], |w| w);
        assert_eq!(text, "\"2009-02-15T12:30:00Z\"");
    }

    #[test]
    fn epoch_date_round_trips_through_reader() {
        let date = JsonDate::from_unix_millis(1234699800000);
        let text = run(vec![Token::Scalar(Scalar::Date(date))], |w| {
            w.with_date_format(DateFormat::Epoch)
        });
        assert_eq!(text, "\"\\/Date(1234699800000)\\/\"");

        let mut reader = JsonReader::new(text.as_bytes());
        assert_eq!(
            reader.next_token().unwrap(),
            Some(Token::Scalar(Scalar::Date(date)))
        );
    }

    #[test]
    fn constructor_tokens() {
        let text = run(
            vec![
                Token::ConstructorStart("Date".into()),
                Token::Scalar(Scalar::Int(0)),
                Token::Scalar(Scalar::Int(1)),
                Token::ConstructorEnd,
            ],
            |w| w,
        );
        assert_eq!(text, "new Date(0,1)");
    }

    #[test]
    fn value_in_object_without_name_faults() {
        let mut out = Vec::new();
        let mut writer = JsonWriter::new(&mut out);
        writer.write(Token::ObjectStart).unwrap();
        let err = writer.write(Token::Scalar(Scalar::Int(1))).unwrap_err();
        assert!(matches!(err.kind, WriterErrorKind::TokenOutOfPlace(_)));
    }

    #[test]
    fn closing_unopened_container_faults() {
        let mut out = Vec::new();
        let mut writer = JsonWriter::new(&mut out);
        let err = writer.write(Token::ArrayEnd).unwrap_err();
        assert!(matches!(err.kind, WriterErrorKind::UnbalancedClose));
    }

    #[test]
    fn mismatched_close_faults() {
        let mut out = Vec::new();
        let mut writer = JsonWriter::new(&mut out);
        writer.write(Token::ObjectStart).unwrap();
        let err = writer.write(Token::ArrayEnd).unwrap_err();
        assert!(matches!(err.kind, WriterErrorKind::UnbalancedClose));
    }

    #[test]
    fn unfinished_document_faults() {
        let mut out = Vec::new();
        let mut writer = JsonWriter::new(&mut out);
        writer.write(Token::ArrayStart).unwrap();
        let err = writer.finish().unwrap_err();
        assert!(matches!(err.kind, WriterErrorKind::IncompleteDocument));
    }

    #[test]
    fn fault_paths_name_the_node() {
        let mut out = Vec::new();
        let mut writer = JsonWriter::new(&mut out);
        writer.write(Token::ObjectStart).unwrap();
        writer.write(Token::Property("x".into())).unwrap();
        let err = writer.write(Token::Scalar(Scalar::Float(f64::NAN))).unwrap_err();
        assert_eq!(err.path, "x");
    }
}
