//! Pluggable destination for classified records.

use crate::context::LogContext;
use crate::severity::Severity;

/// Destination for classified log records.
///
/// Implementations own the transport and must tolerate their own write
/// failures internally; the dispatcher makes a single synchronous call per
/// qualifying event and never retries, buffers, or inspects a result.
pub trait LogSink: Send + Sync {
    fn log(&self, severity: Severity, message: &str, context: &LogContext);

    fn debug(&self, message: &str, context: &LogContext) {
        self.log(Severity::Debug, message, context);
    }

    fn notice(&self, message: &str, context: &LogContext) {
        self.log(Severity::Notice, message, context);
    }

    fn warning(&self, message: &str, context: &LogContext) {
        self.log(Severity::Warning, message, context);
    }

    fn error(&self, message: &str, context: &LogContext) {
        self.log(Severity::Error, message, context);
    }

    fn critical(&self, message: &str, context: &LogContext) {
        self.log(Severity::Critical, message, context);
    }
}
