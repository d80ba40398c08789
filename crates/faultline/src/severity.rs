//! Log severity taxonomy.

use serde::{Deserialize, Serialize};

/// Severity of a dispatched log record, least to most severe.
///
/// The set is closed: the downstream aggregator keys on exactly these five
/// levels, serialized as lowercase syslog-style strings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Notice,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Wire string for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Notice => "notice",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_strings() {
        assert_eq!(Severity::Debug.as_str(), "debug");
        assert_eq!(Severity::Notice.as_str(), "notice");
        assert_eq!(Severity::Warning.as_str(), "warning");
        assert_eq!(Severity::Error.as_str(), "error");
        assert_eq!(Severity::Critical.as_str(), "critical");
    }

    #[test]
    fn test_serializes_as_lowercase_string() {
        let value = serde_json::to_value(Severity::Critical).unwrap();
        assert_eq!(value, serde_json::json!("critical"));
    }

    #[test]
    fn test_display_matches_wire_string() {
        assert_eq!(Severity::Warning.to_string(), "warning");
    }
}
