//! Engine diagnostics.

// -----------------------------------------------------------------------------
// TraceSink

/// Severity of a trace event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TraceLevel {
    Info,
    Warning,
    Error,
}

/// Receives engine diagnostics: handled faults, reference bookkeeping,
/// type binding decisions.
///
/// Events never influence the operation's outcome.
pub trait TraceSink: Send + Sync {
    fn event(&self, level: TraceLevel, path: &str, message: &str);
}

/// The default sink, forwarding to `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn event(&self, level: TraceLevel, path: &str, message: &str) {
        match level {
            TraceLevel::Info => tracing::debug!(path, "{message}"),
            TraceLevel::Warning => tracing::warn!(path, "{message}"),
            TraceLevel::Error => tracing::error!(path, "{message}"),
        }
    }
}

/// Drops every event.
#[derive(Debug, Default)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn event(&self, _level: TraceLevel, _path: &str, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    pub(crate) struct Capture(pub Mutex<Vec<(TraceLevel, String, String)>>);

    impl TraceSink for Capture {
        fn event(&self, level: TraceLevel, path: &str, message: &str) {
            self.0
                .lock()
                .unwrap()
                .push((level, path.to_owned(), message.to_owned()));
        }
    }

    #[test]
    fn capture_sink_records_events() {
        let sink = Capture(Mutex::new(Vec::new()));
        sink.event(TraceLevel::Warning, "a.b", "cyclic edge omitted");
        let events = sink.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, TraceLevel::Warning);
        assert_eq!(events[0].1, "a.b");
    }
}
