//! Recognized kind codes, the classification table, and the reporting mask.

use std::str::FromStr;

use thiserror::Error;

use crate::severity::Severity;

/// Environment variable holding the reporting mask.
pub const REPORTING_ENV: &str = "FAULTLINE_REPORTING";

/// The closed set of recognized runtime kind codes.
///
/// Discriminants are the runtime's conventional bit values, so a raw code
/// can be tested against [`ReportingMask`] directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorKind {
    Fatal = 1,
    Warning = 2,
    Parse = 4,
    Notice = 8,
    CoreFatal = 16,
    CoreWarning = 32,
    CompileFatal = 64,
    CompileWarning = 128,
    UserFatal = 256,
    UserWarning = 512,
    UserNotice = 1024,
    Strict = 2048,
    Recoverable = 4096,
    Deprecated = 8192,
    UserDeprecated = 16384,
}

impl ErrorKind {
    /// Every recognized kind, in code order.
    pub const ALL: [ErrorKind; 15] = [
        ErrorKind::Fatal,
        ErrorKind::Warning,
        ErrorKind::Parse,
        ErrorKind::Notice,
        ErrorKind::CoreFatal,
        ErrorKind::CoreWarning,
        ErrorKind::CompileFatal,
        ErrorKind::CompileWarning,
        ErrorKind::UserFatal,
        ErrorKind::UserWarning,
        ErrorKind::UserNotice,
        ErrorKind::Strict,
        ErrorKind::Recoverable,
        ErrorKind::Deprecated,
        ErrorKind::UserDeprecated,
    ];

    /// The kind for a raw integer code, if recognized.
    pub fn from_code(code: u32) -> Option<ErrorKind> {
        ErrorKind::ALL.iter().copied().find(|kind| kind.code() == code)
    }

    /// Raw integer code for this kind.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Severity this kind classifies to.
    pub fn severity(self) -> Severity {
        match self {
            ErrorKind::Parse => Severity::Critical,

            ErrorKind::Fatal
            | ErrorKind::CoreFatal
            | ErrorKind::CompileFatal
            | ErrorKind::UserFatal
            | ErrorKind::Recoverable => Severity::Error,

            ErrorKind::Warning
            | ErrorKind::CoreWarning
            | ErrorKind::CompileWarning
            | ErrorKind::UserWarning => Severity::Warning,

            ErrorKind::Strict => Severity::Debug,

            // Deprecated kinds keep a label of their own but have no
            // severity row; they ride the default notice level.
            ErrorKind::Notice
            | ErrorKind::UserNotice
            | ErrorKind::Deprecated
            | ErrorKind::UserDeprecated => Severity::Notice,
        }
    }

    /// Display label this kind classifies to.
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::CoreFatal => "Core error",
            ErrorKind::CompileFatal => "Compile error",
            ErrorKind::Parse => "Parse error",
            ErrorKind::Fatal | ErrorKind::UserFatal => "Fatal error",

            ErrorKind::Warning
            | ErrorKind::CoreWarning
            | ErrorKind::CompileWarning
            | ErrorKind::UserWarning => "Warning",

            ErrorKind::Strict => "Strict standards",
            ErrorKind::Recoverable => "Catchable fatal error",
            ErrorKind::Deprecated | ErrorKind::UserDeprecated => "Deprecated",
            ErrorKind::Notice | ErrorKind::UserNotice => "Notice",
        }
    }

    /// Whether this kind terminates the process.
    ///
    /// Consulted only by the process-termination path, which re-reports
    /// fatal residue and nothing else.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorKind::CoreFatal
                | ErrorKind::CompileFatal
                | ErrorKind::Parse
                | ErrorKind::Fatal
                | ErrorKind::UserFatal
                | ErrorKind::Recoverable
        )
    }
}

/// Severity and label for a raw code. Unrecognized codes take the default
/// notice row.
pub fn classify_code(code: u32) -> (Severity, &'static str) {
    match ErrorKind::from_code(code) {
        Some(kind) => (kind.severity(), kind.label()),
        None => (Severity::Notice, "Notice"),
    }
}

/// Whether a raw code is fatal. Unrecognized codes are not.
pub fn is_fatal_code(code: u32) -> bool {
    ErrorKind::from_code(code).map(ErrorKind::is_fatal).unwrap_or(false)
}

/// Bit filter over kind codes: a code is reported iff it shares a bit with
/// the mask. The operator opts kind classes out by clearing their bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingMask(u32);

impl ReportingMask {
    /// Every recognized kind enabled.
    pub const ALL: ReportingMask = ReportingMask(0x7fff);

    /// Nothing enabled.
    pub const NONE: ReportingMask = ReportingMask(0);

    /// Mask enabling exactly the given kinds.
    pub fn from_kinds(kinds: &[ErrorKind]) -> ReportingMask {
        ReportingMask(kinds.iter().fold(0, |bits, kind| bits | kind.code()))
    }

    /// Raw bit value.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Whether the given raw code is enabled under this mask.
    pub fn allows(self, code: u32) -> bool {
        code & self.0 != 0
    }

    /// Mask from the `FAULTLINE_REPORTING` environment variable.
    ///
    /// Absent or unparseable values fall back to [`ReportingMask::ALL`].
    pub fn from_env() -> ReportingMask {
        match std::env::var(REPORTING_ENV) {
            Ok(raw) => match raw.parse() {
                Ok(mask) => mask,
                Err(_) => {
                    tracing::warn!(value = %raw, "invalid reporting mask, defaulting to all");
                    ReportingMask::ALL
                }
            },
            Err(_) => ReportingMask::ALL,
        }
    }
}

/// A reporting mask value that is neither a keyword nor a bit value.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid reporting mask: {0:?}")]
pub struct ParseMaskError(String);

impl FromStr for ReportingMask {
    type Err = ParseMaskError;

    fn from_str(s: &str) -> Result<ReportingMask, ParseMaskError> {
        match s.trim() {
            "all" => Ok(ReportingMask::ALL),
            "none" => Ok(ReportingMask::NONE),
            other => other
                .parse::<u32>()
                .map(ReportingMask)
                .map_err(|_| ParseMaskError(s.to_string())),
        }
    }
}
