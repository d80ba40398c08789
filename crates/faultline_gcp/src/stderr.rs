//! JSON-line sink shaped for Google Cloud log ingestion.

use std::io::{self, Write};
use std::sync::Mutex;

use chrono::Utc;
use faultline::{LogContext, LogSink, Severity};
use serde_json::{json, Map, Value};

/// Writes one JSON object per event, one per line.
///
/// The aggregator reads `severity`, `message`, and `time` at the top level,
/// with every context key flattened alongside them rather than nested under
/// a `context` key. Base fields are written first; context keys overwrite
/// them on collision.
pub struct GcpStderrSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl GcpStderrSink {
    /// Sink over the process stderr stream.
    pub fn new() -> GcpStderrSink {
        GcpStderrSink::with_writer(Box::new(io::stderr()))
    }

    /// Sink over an arbitrary writer. Tests inject an in-memory buffer.
    pub fn with_writer(writer: Box<dyn Write + Send>) -> GcpStderrSink {
        GcpStderrSink {
            writer: Mutex::new(writer),
        }
    }

    fn render(severity: Severity, message: &str, context: &LogContext) -> Value {
        let mut record = Map::new();
        record.insert("severity".to_string(), json!(severity.as_str()));
        record.insert("message".to_string(), json!(message));
        record.insert("time".to_string(), json!(Utc::now().to_rfc3339()));

        if let Ok(Value::Object(fields)) = serde_json::to_value(context) {
            for (key, value) in fields {
                record.insert(key, value);
            }
        }

        Value::Object(record)
    }
}

impl Default for GcpStderrSink {
    fn default() -> GcpStderrSink {
        GcpStderrSink::new()
    }
}

impl LogSink for GcpStderrSink {
    fn log(&self, severity: Severity, message: &str, context: &LogContext) {
        let record = GcpStderrSink::render(severity, message, context);
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if writeln!(writer, "{}", record).is_err() {
            tracing::debug!("dropped log record, stderr write failed");
        }
    }
}
