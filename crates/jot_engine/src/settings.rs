//! Per-operation configuration.

use std::sync::Arc;

use jot_contracts::contract::{LoopHandling, NullHandling, TypeNameHandling};
use jot_contracts::convert::Converter;
use jot_contracts::resolver::{ContractResolver, DefaultContractResolver};
use jot_tokens::{DateFormat, DateParsing, EscapePolicy, Formatting, NonFinitePolicy};

use crate::binder::{RegistryBinder, TypeBinder};
use crate::error::ErrorContext;
use crate::trace::{TraceSink, TracingSink};

// -----------------------------------------------------------------------------
// Policies

/// What to do with wire members no contract property matches.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MissingMemberHandling {
    /// Skip the member's value.
    #[default]
    Ignore,
    /// Fail the member (recoverable).
    Error,
}

/// How `$id`/`$ref`/`$type` metadata members are treated on read.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MetadataHandling {
    /// Honor metadata when it leads the object.
    #[default]
    Default,
    /// Treat metadata members as plain members.
    Ignore,
    /// Buffer each object and honor metadata wherever it appears.
    ReadAhead,
    /// Any metadata member is a fault.
    Error,
}

/// The recovery hook: called with every fault before it aborts the
/// operation.
pub type ErrorHook = Arc<dyn Fn(&mut ErrorContext<'_>) + Send + Sync>;

// -----------------------------------------------------------------------------
// Settings

/// Everything one serialize/deserialize operation is configured by.
///
/// Built once, then immutable for the duration of the operation. The
/// builder methods consume and return `self`:
///
/// ```
/// use jot_engine::Settings;
/// use jot_contracts::contract::LoopHandling;
///
/// let settings = Settings::new()
///     .with_loop_handling(LoopHandling::Ignore)
///     .with_preserve_references(true)
///     .with_max_depth(16);
/// ```
#[derive(Clone)]
pub struct Settings {
    null_handling: NullHandling,
    missing_members: MissingMemberHandling,
    loop_handling: LoopHandling,
    preserve_references: bool,
    type_names: TypeNameHandling,
    metadata: MetadataHandling,
    max_depth: usize,
    formatting: Formatting,
    escape: EscapePolicy,
    non_finite: NonFinitePolicy,
    date_format: DateFormat,
    date_parsing: DateParsing,
    converters: Vec<Arc<dyn Converter>>,
    resolver: Arc<dyn ContractResolver>,
    binder: Arc<dyn TypeBinder>,
    error_hook: Option<ErrorHook>,
    trace: Arc<dyn TraceSink>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    pub fn new() -> Self {
        Self {
            null_handling: NullHandling::default(),
            missing_members: MissingMemberHandling::default(),
            loop_handling: LoopHandling::default(),
            preserve_references: false,
            type_names: TypeNameHandling::default(),
            metadata: MetadataHandling::default(),
            max_depth: 64,
            formatting: Formatting::default(),
            escape: EscapePolicy::default(),
            non_finite: NonFinitePolicy::default(),
            date_format: DateFormat::default(),
            date_parsing: DateParsing::default(),
            converters: Vec::new(),
            resolver: Arc::new(DefaultContractResolver::new()),
            binder: Arc::new(RegistryBinder::global()),
            error_hook: None,
            trace: Arc::new(TracingSink),
        }
    }

    pub fn with_null_handling(mut self, policy: NullHandling) -> Self {
        self.null_handling = policy;
        self
    }

    pub fn with_missing_members(mut self, policy: MissingMemberHandling) -> Self {
        self.missing_members = policy;
        self
    }

    pub fn with_loop_handling(mut self, policy: LoopHandling) -> Self {
        self.loop_handling = policy;
        self
    }

    /// Emit `$id` for shared handles and `$ref` for repeat encounters.
    pub fn with_preserve_references(mut self, on: bool) -> Self {
        self.preserve_references = on;
        self
    }

    pub fn with_type_names(mut self, policy: TypeNameHandling) -> Self {
        self.type_names = policy;
        self
    }

    pub fn with_metadata(mut self, policy: MetadataHandling) -> Self {
        self.metadata = policy;
        self
    }

    /// Maximum nesting depth before a node fails with `DepthExceeded`.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_formatting(mut self, formatting: Formatting) -> Self {
        self.formatting = formatting;
        self
    }

    pub fn with_escape_policy(mut self, policy: EscapePolicy) -> Self {
        self.escape = policy;
        self
    }

    pub fn with_non_finite(mut self, policy: NonFinitePolicy) -> Self {
        self.non_finite = policy;
        self
    }

    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.date_format = format;
        self
    }

    pub fn with_date_parsing(mut self, mode: DateParsing) -> Self {
        self.date_parsing = mode;
        self
    }

    /// Adds a converter. Converters are consulted in registration order,
    /// before any per-member converter.
    pub fn with_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converters.push(converter);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ContractResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_binder(mut self, binder: Arc<dyn TypeBinder>) -> Self {
        self.binder = binder;
        self
    }

    /// Installs the recovery hook. Without one, the first fault aborts.
    pub fn with_error_hook(mut self, hook: ErrorHook) -> Self {
        self.error_hook = Some(hook);
        self
    }

    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace = sink;
        self
    }

    #[inline]
    pub fn null_handling(&self) -> NullHandling {
        self.null_handling
    }

    #[inline]
    pub fn missing_members(&self) -> MissingMemberHandling {
        self.missing_members
    }

    #[inline]
    pub fn loop_handling(&self) -> LoopHandling {
        self.loop_handling
    }

    #[inline]
    pub fn preserve_references(&self) -> bool {
        self.preserve_references
    }

    #[inline]
    pub fn type_names(&self) -> TypeNameHandling {
        self.type_names
    }

    #[inline]
    pub fn metadata(&self) -> MetadataHandling {
        self.metadata
    }

    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    #[inline]
    pub fn formatting(&self) -> Formatting {
        self.formatting
    }

    #[inline]
    pub fn escape_policy(&self) -> EscapePolicy {
        self.escape
    }

    #[inline]
    pub fn non_finite(&self) -> NonFinitePolicy {
        self.non_finite
    }

    #[inline]
    pub fn date_format(&self) -> DateFormat {
        self.date_format
    }

    #[inline]
    pub fn date_parsing(&self) -> DateParsing {
        self.date_parsing
    }

    #[inline]
    pub fn converters(&self) -> &[Arc<dyn Converter>] {
        &self.converters
    }

    #[inline]
    pub fn resolver(&self) -> &Arc<dyn ContractResolver> {
        &self.resolver
    }

    #[inline]
    pub fn binder(&self) -> &Arc<dyn TypeBinder> {
        &self.binder
    }

    #[inline]
    pub fn error_hook(&self) -> Option<&ErrorHook> {
        self.error_hook.as_ref()
    }

    #[inline]
    pub fn trace(&self) -> &Arc<dyn TraceSink> {
        &self.trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_policies() {
        let settings = Settings::new();
        assert_eq!(settings.null_handling(), NullHandling::Include);
        assert_eq!(settings.missing_members(), MissingMemberHandling::Ignore);
        assert_eq!(settings.loop_handling(), LoopHandling::Error);
        assert!(!settings.preserve_references());
        assert_eq!(settings.type_names(), TypeNameHandling::None);
        assert_eq!(settings.metadata(), MetadataHandling::Default);
        assert_eq!(settings.max_depth(), 64);
        assert!(settings.error_hook().is_none());
    }

    #[test]
    fn builder_methods_chain() {
        let settings = Settings::new()
            .with_loop_handling(LoopHandling::Serialize)
            .with_max_depth(8)
            .with_preserve_references(true);
        assert_eq!(settings.loop_handling(), LoopHandling::Serialize);
        assert_eq!(settings.max_depth(), 8);
        assert!(settings.preserve_references());
    }
}
