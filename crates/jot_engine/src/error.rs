use core::fmt;
use std::error;

use jot_tokens::{ReaderError, ReaderErrorKind, WriterError};

// -----------------------------------------------------------------------------
// Fault

/// How a fault is classified, independent of where it occurred.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FaultKind {
    /// Malformed token structure: unbalanced containers, truncated input,
    /// a value where a member name is due.
    Structural,
    /// A well-formed value that cannot be represented in the target:
    /// wrong scalar kind, out-of-range number, unknown enum variant.
    Format,
    /// A wire member with no counterpart on the contract, under
    /// [`MissingMemberHandling::Error`](crate::MissingMemberHandling).
    MissingMember,
    /// A `#[json(required)]` member absent from the wire.
    RequiredMember,
    /// `$id`/`$ref` bookkeeping went wrong: unknown or duplicate id, or a
    /// back-reference into a slot that cannot share.
    Reference,
    /// A `$type` discriminator that does not bind to a usable type.
    TypeResolution,
    /// Writing reached a handle already on the open ancestor stack.
    SelfReferenceLoop,
    /// Nesting exceeded [`Settings::max_depth`](crate::Settings::max_depth).
    DepthExceeded,
    /// The recovery hook kept handling faults at the same position without
    /// the operation making progress.
    InfiniteRecovery,
    /// A value the writer cannot emit under the active policies, e.g. a
    /// non-finite float under the strict policy.
    UnsupportedValue,
    Io,
}

impl FaultKind {
    pub fn name(&self) -> &'static str {
        match self {
            FaultKind::Structural => "structural",
            FaultKind::Format => "format",
            FaultKind::MissingMember => "missing member",
            FaultKind::RequiredMember => "required member",
            FaultKind::Reference => "reference",
            FaultKind::TypeResolution => "type resolution",
            FaultKind::SelfReferenceLoop => "self-reference loop",
            FaultKind::DepthExceeded => "depth exceeded",
            FaultKind::InfiniteRecovery => "infinite recovery",
            FaultKind::UnsupportedValue => "unsupported value",
            FaultKind::Io => "io",
        }
    }
}

/// One failure, tagged with the path where the engine was at the time.
///
/// A fault is both the error type of every engine operation and the record
/// kept in the fault list when the recovery hook handles one.
#[derive(Debug)]
pub struct Fault {
    kind: FaultKind,
    path: String,
    member: Option<String>,
    message: String,
    // Set once the recovery hook has declined this fault, so outer
    // recovery boundaries do not offer it a second time.
    offered: bool,
}

impl Fault {
    pub fn new(kind: FaultKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            member: None,
            message: message.into(),
            offered: false,
        }
    }

    pub(crate) fn mark_offered(&mut self) {
        self.offered = true;
    }

    pub(crate) fn was_offered(&self) -> bool {
        self.offered
    }

    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.member = Some(member.into());
        self
    }

    #[inline]
    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    /// The dot/bracket path the operation had reached.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The wire member being processed, when the fault is member-scoped.
    #[inline]
    pub fn member(&self) -> Option<&str> {
        self.member.as_deref()
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fault: {}", self.kind.name(), self.message)?;
        if let Some(member) = &self.member {
            write!(f, ", member `{member}`")?;
        }
        if !self.path.is_empty() {
            write!(f, ", path `{}`", self.path)?;
        }
        Ok(())
    }
}

impl error::Error for Fault {}

impl From<ReaderError> for Fault {
    fn from(err: ReaderError) -> Self {
        let kind = match &err.kind {
            ReaderErrorKind::Io(_) => FaultKind::Io,
            ReaderErrorKind::InvalidEscape(_)
            | ReaderErrorKind::InvalidNumber(_)
            | ReaderErrorKind::InvalidUtf8 => FaultKind::Format,
            _ => FaultKind::Structural,
        };
        let path = err.path.clone();
        Fault::new(kind, path, err.to_string())
    }
}

impl From<WriterError> for Fault {
    fn from(err: WriterError) -> Self {
        let kind = match &err.kind {
            jot_tokens::WriterErrorKind::Io(_) => FaultKind::Io,
            jot_tokens::WriterErrorKind::NonFiniteNumber(_) => FaultKind::UnsupportedValue,
            _ => FaultKind::Structural,
        };
        let path = err.path.clone();
        Fault::new(kind, path, err.to_string())
    }
}

// -----------------------------------------------------------------------------
// ErrorContext

/// What the recovery hook sees for each fault.
///
/// Calling [`handle`](ErrorContext::handle) marks the fault as handled: the
/// engine substitutes a default/absent value, records the fault, and moves
/// on to the next sibling. An unhandled fault aborts the operation.
pub struct ErrorContext<'a> {
    fault: &'a Fault,
    handled: bool,
}

impl<'a> ErrorContext<'a> {
    pub(crate) fn new(fault: &'a Fault) -> Self {
        Self {
            fault,
            handled: false,
        }
    }

    #[inline]
    pub fn fault(&self) -> &Fault {
        self.fault
    }

    #[inline]
    pub fn path(&self) -> &str {
        self.fault.path()
    }

    #[inline]
    pub fn member(&self) -> Option<&str> {
        self.fault.member()
    }

    /// Marks the fault as handled.
    pub fn handle(&mut self) {
        self.handled = true;
    }

    #[inline]
    pub fn handled(&self) -> bool {
        self.handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jot_tokens::{JsonReader, TokenSource};

    fn first_error(input: &str) -> ReaderError {
        let mut reader = JsonReader::new(input.as_bytes());
        loop {
            match reader.next_token() {
                Ok(Some(_)) => {}
                Ok(None) => panic!("input `{input}` tokenized cleanly"),
                Err(err) => return err,
            }
        }
    }

    #[test]
    fn display_carries_member_and_path() {
        let fault = Fault::new(FaultKind::RequiredMember, "orders[2]", "member `id` is missing")
            .with_member("id");
        let text = fault.to_string();
        assert!(text.contains("required member fault"));
        assert!(text.contains("`id`"));
        assert!(text.contains("orders[2]"));
    }

    #[test]
    fn reader_errors_classify_by_kind() {
        assert_eq!(
            Fault::from(first_error("[1,")).kind(),
            FaultKind::Structural
        );
        assert_eq!(Fault::from(first_error("1e")).kind(), FaultKind::Format);
    }
}
