//! Raw error state captured at an interception point.

use crate::kind::ErrorKind;

/// Kind classification exactly as the runtime delivered it.
///
/// Only integer codes participate in classification; a symbolic kind is
/// declined and left to the runtime's default handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawKind {
    /// Integer kind code, the normal case.
    Code(u32),
    /// Symbolic classification the runtime could not express as a code.
    Name(String),
}

impl From<u32> for RawKind {
    fn from(code: u32) -> RawKind {
        RawKind::Code(code)
    }
}

impl From<ErrorKind> for RawKind {
    fn from(kind: ErrorKind) -> RawKind {
        RawKind::Code(kind.code())
    }
}

impl From<&str> for RawKind {
    fn from(name: &str) -> RawKind {
        RawKind::Name(name.to_string())
    }
}

impl From<String> for RawKind {
    fn from(name: String) -> RawKind {
        RawKind::Name(name)
    }
}

/// One raw error signal: consumed synchronously at the interception point,
/// and kept only as the candidate for the process-termination report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSignal {
    pub code: u32,
    pub message: String,
    pub file: String,
    pub line: u32,
    pub function: Option<String>,
}

impl RawSignal {
    pub fn new(code: u32, message: impl Into<String>, file: impl Into<String>, line: u32) -> RawSignal {
        RawSignal {
            code,
            message: message.into(),
            file: file.into(),
            line,
            function: None,
        }
    }

    /// Attach the originating function or frame name.
    pub fn with_function(mut self, function: impl Into<String>) -> RawSignal {
        self.function = Some(function.into());
        self
    }
}
