use core::fmt;

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

// -----------------------------------------------------------------------------
// DateKind

/// How a timestamp relates to a timezone, controlling suffix emission.
///
/// - `Utc`: ISO text ends with `Z`, epoch text carries no offset.
/// - `Local`: ISO text ends with `±hh:mm`, epoch text with `±hhmm`.
/// - `Unspecified`: wall-clock time with no suffix at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateKind {
    Utc,
    Local,
    Unspecified,
}

// -----------------------------------------------------------------------------
// JsonDate

/// A timestamp as it appears in JSON text.
///
/// Serializes under one of two conventions (see
/// [`DateFormat`](crate::DateFormat)): ISO-8601 (`"2009-02-15T12:30:00Z"`)
/// or the epoch-milliseconds wrapper (`"\/Date(1234699800000)\/"`). Both
/// forms parse back through [`JsonDate::parse`].
///
/// The epoch form has millisecond resolution; sub-millisecond precision is
/// only preserved by the ISO form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JsonDate {
    stamp: OffsetDateTime,
    kind: DateKind,
}

impl JsonDate {
    /// A UTC timestamp. The input is normalized to offset zero.
    pub fn utc(stamp: OffsetDateTime) -> Self {
        Self {
            stamp: stamp.to_offset(UtcOffset::UTC),
            kind: DateKind::Utc,
        }
    }

    /// A timestamp with a known local offset, kept as given.
    pub fn local(stamp: OffsetDateTime) -> Self {
        Self {
            stamp,
            kind: DateKind::Local,
        }
    }

    /// A wall-clock timestamp with no timezone information.
    pub fn unspecified(stamp: PrimitiveDateTime) -> Self {
        Self {
            stamp: stamp.assume_utc(),
            kind: DateKind::Unspecified,
        }
    }

    /// A UTC timestamp from milliseconds since the Unix epoch.
    pub fn from_unix_millis(millis: i64) -> Self {
        let nanos = i128::from(millis) * 1_000_000;
        let stamp = OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);
        Self {
            stamp,
            kind: DateKind::Utc,
        }
    }

    /// Milliseconds since the Unix epoch (UTC).
    pub fn unix_millis(&self) -> i64 {
        (self.stamp.unix_timestamp_nanos() / 1_000_000) as i64
    }

    /// The underlying timestamp. For `Unspecified` this is the wall-clock
    /// time with an assumed zero offset.
    #[inline]
    pub fn stamp(&self) -> OffsetDateTime {
        self.stamp
    }

    #[inline]
    pub fn kind(&self) -> DateKind {
        self.kind
    }

    /// Renders the ISO-8601 text form, without quotes.
    pub fn format_iso(&self) -> String {
        let base = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
        let mut out = self
            .stamp
            .format(&base)
            .unwrap_or_else(|_| String::from("0000-01-01T00:00:00"));

        let nanos = self.stamp.nanosecond();
        if nanos != 0 {
            let frac = format!("{nanos:09}");
            let frac = frac.trim_end_matches('0');
            out.push('.');
            out.push_str(frac);
        }

        match self.kind {
            DateKind::Utc => out.push('Z'),
            DateKind::Local => {
                let offset = self.stamp.offset();
                let total = offset.whole_minutes();
                let sign = if total < 0 { '-' } else { '+' };
                let total = total.unsigned_abs();
                out.push(sign);
                out.push_str(&format!("{:02}:{:02}", total / 60, total % 60));
            }
            DateKind::Unspecified => {}
        }
        out
    }

    /// Renders the body of the epoch wrapper: the text between `/Date(` and
    /// `)/`, e.g. `1234699800000` or `1234699800000+0530`.
    pub fn format_epoch_body(&self) -> String {
        let millis = self.unix_millis();
        match self.kind {
            DateKind::Utc | DateKind::Unspecified => millis.to_string(),
            DateKind::Local => {
                let total = self.stamp.offset().whole_minutes();
                let sign = if total < 0 { '-' } else { '+' };
                let total = total.unsigned_abs();
                format!("{millis}{sign}{:02}{:02}", total / 60, total % 60)
            }
        }
    }

    /// Parses either textual convention; `None` if the text is not a date.
    pub fn parse(text: &str) -> Option<Self> {
        if let Some(body) = text.strip_prefix("/Date(").and_then(|t| t.strip_suffix(")/")) {
            return Self::parse_epoch_body(body);
        }
        Self::parse_iso(text)
    }

    fn parse_epoch_body(body: &str) -> Option<Self> {
        if body.is_empty() {
            return None;
        }
        // An offset suffix looks like `+0530`; a sign at position 0 is the
        // millisecond sign, not an offset.
        let split = body[1..]
            .find(['+', '-'])
            .map(|i| i + 1)
            .unwrap_or(body.len());
        let (millis, offset) = body.split_at(split);
        let millis: i64 = millis.parse().ok()?;
        let date = Self::from_unix_millis(millis);

        if offset.is_empty() {
            return Some(date);
        }
        if offset.len() != 5 {
            return None;
        }
        let hours: i32 = offset[1..3].parse().ok()?;
        let minutes: i32 = offset[3..5].parse().ok()?;
        let mut total = hours * 60 + minutes;
        if offset.starts_with('-') {
            total = -total;
        }
        let offset = UtcOffset::from_whole_seconds(total * 60).ok()?;
        Some(Self::local(date.stamp.to_offset(offset)))
    }

    fn parse_iso(text: &str) -> Option<Self> {
        if !looks_like_iso(text) {
            return None;
        }
        if text.ends_with(['Z', 'z']) {
            let stamp = OffsetDateTime::parse(text, &Rfc3339).ok()?;
            return Some(Self::utc(stamp));
        }
        // RFC 3339 requires an offset, so try it first and fall back to the
        // offset-less wall-clock form.
        if let Ok(stamp) = OffsetDateTime::parse(text, &Rfc3339) {
            return Some(Self::local(stamp));
        }
        let plain = format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
        );
        let stamp = PrimitiveDateTime::parse(text, &plain).ok()?;
        Some(Self::unspecified(stamp))
    }
}

impl fmt::Display for JsonDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_iso())
    }
}

/// Cheap shape check before attempting a full parse: `YYYY-MM-DDTHH:MM:SS`.
fn looks_like_iso(text: &str) -> bool {
    let b = text.as_bytes();
    b.len() >= 19
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[7] == b'-'
        && b[10] == b'T'
        && b[13] == b':'
        && b[16] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn iso_utc_round_trip() {
        let date = JsonDate::utc(datetime!(2009-02-15 12:30:00 UTC));
        let text = date.format_iso();
        assert_eq!(text, "2009-02-15T12:30:00Z");
        assert_eq!(JsonDate::parse(&text), Some(date));
    }

    #[test]
    fn iso_local_keeps_offset() {
        let date = JsonDate::local(datetime!(2009-02-15 12:30:00 +05:30));
        let text = date.format_iso();
        assert_eq!(text, "2009-02-15T12:30:00+05:30");
        let back = JsonDate::parse(&text).unwrap();
        assert_eq!(back.kind(), DateKind::Local);
        assert_eq!(back.stamp(), date.stamp());
    }

    #[test]
    fn iso_unspecified_has_no_suffix() {
        let date = JsonDate::unspecified(datetime!(2009-02-15 12:30:00));
        let text = date.format_iso();
        assert_eq!(text, "2009-02-15T12:30:00");
        let back = JsonDate::parse(&text).unwrap();
        assert_eq!(back.kind(), DateKind::Unspecified);
        assert_eq!(back, date);
    }

    #[test]
    fn iso_fractional_seconds_trimmed() {
        let date = JsonDate::utc(datetime!(2020-01-02 03:04:05.120 UTC));
        assert_eq!(date.format_iso(), "2020-01-02T03:04:05.12Z");
        assert_eq!(JsonDate::parse("2020-01-02T03:04:05.12Z"), Some(date));
    }

    #[test]
    fn epoch_round_trip() {
        let date = JsonDate::from_unix_millis(1234699800000);
        assert_eq!(date.format_epoch_body(), "1234699800000");
        assert_eq!(JsonDate::parse("/Date(1234699800000)/"), Some(date));
    }

    #[test]
    fn epoch_with_offset() {
        let date = JsonDate::local(datetime!(2009-02-15 18:00:00 +05:30));
        let body = date.format_epoch_body();
        assert!(body.ends_with("+0530"), "body = {body}");
        let back = JsonDate::parse(&format!("/Date({body})/")).unwrap();
        assert_eq!(back.kind(), DateKind::Local);
        assert_eq!(back.unix_millis(), date.unix_millis());
        assert_eq!(back.stamp().offset(), date.stamp().offset());
    }

    #[test]
    fn negative_epoch_millis() {
        let date = JsonDate::from_unix_millis(-1000);
        assert_eq!(JsonDate::parse("/Date(-1000)/"), Some(date));
    }

    #[test]
    fn non_dates_are_rejected() {
        assert_eq!(JsonDate::parse("not a date"), None);
        assert_eq!(JsonDate::parse("2020-99-99T00:00:00Z"), None);
        assert_eq!(JsonDate::parse("/Date(abc)/"), None);
    }
}
