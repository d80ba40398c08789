//! The three interception entry points and the dispatch they share.

use std::sync::{Arc, Mutex};

use crate::context::{ContextBuilder, SourceLocation};
use crate::kind::{classify_code, is_fatal_code, ReportingMask};
use crate::severity::Severity;
use crate::signal::{RawKind, RawSignal};
use crate::sink::LogSink;

/// Tag prefixed to uncaught-exception messages.
pub const EXCEPTION_TAG: &str = "Uncaught exception";

/// What the error-notification entry point decided.
///
/// The host runtime distinguishes three cases: a record was dispatched, the
/// event was declined but the runtime's own display is still suppressed, or
/// the event was declined and left to the runtime's default handling.
/// Collapsing this to a boolean loses the second case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Classified and dispatched; the runtime's default display is suppressed.
    Logged,
    /// Declined without logging; the runtime's default display is still
    /// suppressed.
    Suppressed,
    /// Declined without logging; the runtime applies its default handling.
    Deferred,
}

impl HandlerOutcome {
    /// Whether the runtime's own default display is suppressed.
    pub fn suppresses_default(self) -> bool {
        !matches!(self, HandlerOutcome::Deferred)
    }
}

/// Receives raw runtime error signals and dispatches one classified record
/// per qualifying event to the configured sink.
///
/// Stateless aside from the injected sink, the execution-environment
/// snapshot, and the last-seen slot read by the process-termination path.
/// Shared behind an [`Arc`] so runtime hooks can capture it.
pub struct FaultHandler {
    sink: Option<Arc<dyn LogSink>>,
    context: ContextBuilder,
    mask: ReportingMask,
    last_seen: Mutex<Option<RawSignal>>,
}

impl FaultHandler {
    /// Handler over the given sink, with the detected execution environment
    /// and the env-configured reporting mask.
    pub fn new(sink: Arc<dyn LogSink>) -> FaultHandler {
        FaultHandler {
            sink: Some(sink),
            context: ContextBuilder::detect(),
            mask: ReportingMask::from_env(),
            last_seen: Mutex::new(None),
        }
    }

    /// Handler with no sink configured. Notifications are declined (and the
    /// runtime's display suppressed) until a sink-bearing handler replaces
    /// this one.
    pub fn without_sink() -> FaultHandler {
        FaultHandler {
            sink: None,
            context: ContextBuilder::detect(),
            mask: ReportingMask::from_env(),
            last_seen: Mutex::new(None),
        }
    }

    /// Replace the execution-environment snapshot.
    pub fn with_context(mut self, context: ContextBuilder) -> FaultHandler {
        self.context = context;
        self
    }

    /// Replace the reporting mask.
    pub fn with_mask(mut self, mask: ReportingMask) -> FaultHandler {
        self.mask = mask;
        self
    }

    /// The configured sink, if any.
    pub fn sink(&self) -> Option<&Arc<dyn LogSink>> {
        self.sink.as_ref()
    }

    /// Uncaught-exception entry point.
    ///
    /// Unconditional: anything reaching this point is by definition
    /// unreported, so it always dispatches at error severity. File and line
    /// go into the source location only, never the primary message.
    pub fn on_exception(&self, message: &str, file: &str, line: u32) {
        let formatted = format!("{}: {}", EXCEPTION_TAG, message);
        self.dispatch(Severity::Error, &formatted, SourceLocation::new(file, line));
    }

    /// Error-notification entry point.
    ///
    /// Guards, in order: no sink configured declines with
    /// [`HandlerOutcome::Suppressed`]; a symbolic kind declines with
    /// [`HandlerOutcome::Deferred`]; a code the reporting mask excludes
    /// declines with [`HandlerOutcome::Suppressed`] and no substitute
    /// fallback. Everything else classifies, dispatches once, and returns
    /// [`HandlerOutcome::Logged`].
    pub fn on_error(
        &self,
        kind: impl Into<RawKind>,
        message: &str,
        file: &str,
        line: u32,
    ) -> HandlerOutcome {
        let kind = kind.into();

        if let RawKind::Code(code) = &kind {
            self.record_last(RawSignal::new(*code, message, file, line));
        }

        if self.sink.is_none() {
            return HandlerOutcome::Suppressed;
        }

        let code = match kind {
            RawKind::Code(code) => code,
            RawKind::Name(_) => return HandlerOutcome::Deferred,
        };

        if !self.mask.allows(code) {
            return HandlerOutcome::Suppressed;
        }

        let (severity, label) = classify_code(code);
        let formatted = format_signal(label, message, file, line);
        self.dispatch(severity, &formatted, SourceLocation::new(file, line));

        HandlerOutcome::Logged
    }

    /// Process-termination entry point.
    ///
    /// Reports fatal residue only. Non-fatal residue was already reported
    /// by the notification path at the time it occurred, and is dropped
    /// here without a record.
    pub fn on_process_end(&self) {
        let last = {
            let mut slot = self.lock_last_seen();
            slot.take()
        };

        let signal = match last {
            Some(signal) => signal,
            None => return,
        };

        if !is_fatal_code(signal.code) {
            return;
        }

        let (severity, label) = classify_code(signal.code);
        let formatted = format_signal(label, &signal.message, &signal.file, signal.line);

        let mut location = SourceLocation::new(&signal.file, signal.line);
        if let Some(function) = signal.function {
            location = location.with_function(function);
        }

        self.dispatch(severity, &formatted, location);
    }

    /// Record the most recent raw signal for the process-termination path.
    ///
    /// The notification entry point records automatically; hosts whose
    /// fatal signals bypass that callback record them here directly.
    pub fn record_last(&self, signal: RawSignal) {
        *self.lock_last_seen() = Some(signal);
    }

    /// The most recently recorded signal, if any.
    pub fn last_recorded(&self) -> Option<RawSignal> {
        self.lock_last_seen().clone()
    }

    fn lock_last_seen(&self) -> std::sync::MutexGuard<'_, Option<RawSignal>> {
        // The slot may be poisoned by a panicking thread mid-record; the
        // stored signal is still usable.
        self.last_seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn dispatch(&self, severity: Severity, message: &str, location: SourceLocation) {
        if let Some(sink) = &self.sink {
            let context = self.context.build(location);
            sink.log(severity, message, &context);
        }
    }
}

/// Primary message for notification and process-termination records.
fn format_signal(label: &str, message: &str, file: &str, line: u32) -> String {
    format!("{}: {} in {} on line {}", label, message, file, line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ExecutionEnv, HttpEnv, LogContext};
    use crate::kind::ErrorKind;

    #[derive(Default)]
    struct RecordingSink {
        records: Mutex<Vec<(Severity, String, LogContext)>>,
    }

    impl RecordingSink {
        fn records(&self) -> Vec<(Severity, String, LogContext)> {
            self.records.lock().unwrap().clone()
        }

        fn count(&self) -> usize {
            self.records.lock().unwrap().len()
        }
    }

    impl LogSink for RecordingSink {
        fn log(&self, severity: Severity, message: &str, context: &LogContext) {
            self.records
                .lock()
                .unwrap()
                .push((severity, message.to_string(), context.clone()));
        }
    }

    fn cli_context() -> ContextBuilder {
        ContextBuilder::new(ExecutionEnv::Cli {
            argv: Some(vec!["prog".to_string(), "--serve".to_string()]),
        })
    }

    fn handler_with_sink() -> (Arc<RecordingSink>, FaultHandler) {
        let sink = Arc::new(RecordingSink::default());
        let handler = FaultHandler::new(sink.clone())
            .with_context(cli_context())
            .with_mask(ReportingMask::ALL);
        (sink, handler)
    }

    #[test]
    fn test_message_formatting() {
        assert_eq!(
            format_signal("Warning", "deprecated call", "/a/b.ext", 42),
            "Warning: deprecated call in /a/b.ext on line 42"
        );
    }

    #[test]
    fn test_exception_always_dispatches_at_error_severity() {
        let (sink, handler) = handler_with_sink();

        handler.on_exception("boom", "/srv/app/lib.ext", 12);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        let (severity, message, context) = &records[0];
        assert_eq!(*severity, Severity::Error);
        assert_eq!(message, "Uncaught exception: boom");
        // File and line ride only in the source location.
        assert_eq!(context.source_location.file, "/srv/app/lib.ext");
        assert_eq!(context.source_location.line, 12);
        assert_eq!(context.source_location.function, "");
    }

    #[test]
    fn test_notification_classifies_and_formats() {
        let (sink, handler) = handler_with_sink();

        let outcome = handler.on_error(ErrorKind::UserWarning, "odd input", "/srv/a.ext", 3);

        assert_eq!(outcome, HandlerOutcome::Logged);
        assert!(outcome.suppresses_default());
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, Severity::Warning);
        assert_eq!(records[0].1, "Warning: odd input in /srv/a.ext on line 3");
    }

    #[test]
    fn test_unrecognized_code_logs_as_notice() {
        let (sink, handler) = handler_with_sink();

        let outcome = handler.on_error(32768u32, "mystery", "/srv/a.ext", 9);

        assert_eq!(outcome, HandlerOutcome::Logged);
        assert_eq!(sink.records()[0].0, Severity::Notice);
        assert_eq!(sink.records()[0].1, "Notice: mystery in /srv/a.ext on line 9");
    }

    #[test]
    fn test_missing_sink_declines_and_suppresses() {
        let handler = FaultHandler::without_sink().with_context(cli_context());

        let outcome = handler.on_error(ErrorKind::Warning, "w", "/f", 1);

        assert_eq!(outcome, HandlerOutcome::Suppressed);
        assert!(outcome.suppresses_default());
    }

    #[test]
    fn test_symbolic_kind_defers_to_runtime() {
        let (sink, handler) = handler_with_sink();

        let outcome = handler.on_error("segfault", "s", "/f", 1);

        assert_eq!(outcome, HandlerOutcome::Deferred);
        assert!(!outcome.suppresses_default());
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_masked_kind_is_dropped_silently() {
        let sink = Arc::new(RecordingSink::default());
        let handler = FaultHandler::new(sink.clone())
            .with_context(cli_context())
            .with_mask(ReportingMask::from_kinds(&[ErrorKind::Fatal]));

        let outcome = handler.on_error(ErrorKind::Notice, "n", "/f", 1);

        assert_eq!(outcome, HandlerOutcome::Suppressed);
        assert!(outcome.suppresses_default());
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_process_end_without_residue_does_nothing() {
        let (sink, handler) = handler_with_sink();
        handler.on_process_end();
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_process_end_drops_non_fatal_residue() {
        let (sink, handler) = handler_with_sink();
        handler.record_last(RawSignal::new(ErrorKind::Notice.code(), "n", "/f", 1));

        handler.on_process_end();

        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_process_end_reports_fatal_residue_once() {
        let (sink, handler) = handler_with_sink();
        handler.record_last(RawSignal::new(ErrorKind::Parse.code(), "bad token", "/srv/a.ext", 2));

        handler.on_process_end();

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, Severity::Critical);
        assert_eq!(records[0].1, "Parse error: bad token in /srv/a.ext on line 2");

        // The slot was consumed; a second pass has nothing left.
        handler.on_process_end();
        assert_eq!(sink.count(), 1);
    }

    #[test]
    fn test_process_end_keeps_recorded_function_name() {
        let (sink, handler) = handler_with_sink();
        handler.record_last(
            RawSignal::new(ErrorKind::Fatal.code(), "oom", "/srv/a.ext", 88)
                .with_function("allocate"),
        );

        handler.on_process_end();

        assert_eq!(sink.records()[0].2.source_location.function, "allocate");
    }

    #[test]
    fn test_notification_records_last_seen_before_guards() {
        let handler = FaultHandler::without_sink().with_context(cli_context());

        handler.on_error(ErrorKind::UserFatal, "f", "/f", 5);

        let last = handler.last_recorded().unwrap();
        assert_eq!(last.code, ErrorKind::UserFatal.code());
        assert_eq!(last.line, 5);
    }

    #[test]
    fn test_symbolic_kind_is_not_recorded() {
        let (_sink, handler) = handler_with_sink();
        handler.on_error("segfault", "s", "/f", 1);
        assert!(handler.last_recorded().is_none());
    }

    #[test]
    fn test_cli_dispatch_carries_operation_context_only() {
        let (sink, handler) = handler_with_sink();

        handler.on_error(ErrorKind::Warning, "w", "/f", 1);

        let context = &sink.records()[0].2;
        assert!(context.operation.is_some());
        assert!(context.http_request.is_none());
    }

    #[test]
    fn test_http_dispatch_carries_request_context_only() {
        let sink = Arc::new(RecordingSink::default());
        let handler = FaultHandler::new(sink.clone())
            .with_context(ContextBuilder::new(ExecutionEnv::Http(HttpEnv {
                host: Some("example.test".to_string()),
                uri: Some("/x".to_string()),
                ..HttpEnv::default()
            })))
            .with_mask(ReportingMask::ALL);

        handler.on_exception("boom", "/f", 1);

        let context = &sink.records()[0].2;
        assert!(context.operation.is_none());
        let request = context.http_request.as_ref().unwrap();
        assert_eq!(request.request_url, "http://example.test/x");
    }
}
