//! Invocation/request identity attached to every dispatched record.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Producer labels are cut to this many bytes.
const PRODUCER_MAX_BYTES: usize = 30;

/// Ambient request state in HTTP mode, CGI variable conventions.
///
/// Every field is optional; absent values take documented defaults when the
/// context is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpEnv {
    pub https: Option<String>,
    pub host: Option<String>,
    pub uri: Option<String>,
    pub method: Option<String>,
    pub user_agent: Option<String>,
    pub remote_ip: Option<String>,
    pub referer: Option<String>,
}

impl HttpEnv {
    /// Snapshot of the CGI variable set from the process environment.
    pub fn from_env() -> HttpEnv {
        let var = |name: &str| std::env::var(name).ok();
        HttpEnv {
            https: var("HTTPS"),
            host: var("HTTP_HOST"),
            uri: var("REQUEST_URI"),
            method: var("REQUEST_METHOD"),
            user_agent: var("HTTP_USER_AGENT"),
            remote_ip: var("REMOTE_ADDR"),
            referer: var("HTTP_REFERER"),
        }
    }
}

/// The active execution mode and its ambient state. Binary and mutually
/// exclusive: an invocation is either command-line or request-serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionEnv {
    Cli { argv: Option<Vec<String>> },
    Http(HttpEnv),
}

impl ExecutionEnv {
    /// Detect the ambient execution mode: HTTP iff the CGI request-method
    /// variable is present, CLI otherwise.
    pub fn detect() -> ExecutionEnv {
        if std::env::var("REQUEST_METHOD").is_ok() {
            ExecutionEnv::Http(HttpEnv::from_env())
        } else {
            ExecutionEnv::Cli {
                argv: Some(std::env::args().collect()),
            }
        }
    }
}

/// Source position of the originating signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub function: String,
}

impl SourceLocation {
    /// Location with no function name recorded.
    pub fn new(file: impl Into<String>, line: u32) -> SourceLocation {
        SourceLocation {
            file: file.into(),
            line,
            function: String::new(),
        }
    }

    pub fn with_function(mut self, function: impl Into<String>) -> SourceLocation {
        self.function = function.into();
        self
    }
}

/// Command-line invocation identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationContext {
    /// Stable content digest of the full command string.
    pub id: String,
    /// Human-readable prefix of the command string.
    pub producer: String,
}

/// HTTP request identity, passed through verbatim from the ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestContext {
    pub request_method: String,
    pub request_url: String,
    pub user_agent: String,
    pub remote_ip: String,
    pub referer: String,
}

/// Structured context merged into every dispatched record: always the
/// source location, plus the identity block of the active mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogContext {
    pub source_location: SourceLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<OperationContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_request: Option<HttpRequestContext>,
}

/// Builds the mode-specific context block from an execution-environment
/// snapshot. Building never fails: every ambient lookup has a default.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    env: ExecutionEnv,
}

impl ContextBuilder {
    pub fn new(env: ExecutionEnv) -> ContextBuilder {
        ContextBuilder { env }
    }

    /// Builder over the detected ambient environment.
    pub fn detect() -> ContextBuilder {
        ContextBuilder::new(ExecutionEnv::detect())
    }

    pub fn env(&self) -> &ExecutionEnv {
        &self.env
    }

    /// Context for one record: the given source position plus the identity
    /// block of the active mode.
    ///
    /// A CLI invocation with no argument list available yields no identity
    /// block at all; that is a defined degenerate case, not an error.
    pub fn build(&self, source_location: SourceLocation) -> LogContext {
        let mut context = LogContext {
            source_location,
            operation: None,
            http_request: None,
        };

        match &self.env {
            ExecutionEnv::Cli { argv: Some(argv) } => {
                context.operation = Some(cli_operation(argv));
            }
            ExecutionEnv::Cli { argv: None } => {}
            ExecutionEnv::Http(http) => {
                context.http_request = Some(http_request(http));
            }
        }

        context
    }
}

fn cli_operation(argv: &[String]) -> OperationContext {
    let command = format!("$ {}", argv.join(" "));
    let digest = Sha256::digest(command.as_bytes());

    OperationContext {
        id: hex::encode(digest),
        producer: truncate_bytes(&command, PRODUCER_MAX_BYTES).to_string(),
    }
}

fn http_request(env: &HttpEnv) -> HttpRequestContext {
    let scheme = if env.https.as_deref() == Some("on") {
        "https"
    } else {
        "http"
    };
    let host = env.host.as_deref().unwrap_or("unknown-host");
    let uri = env.uri.as_deref().unwrap_or("");

    HttpRequestContext {
        request_method: env.method.clone().unwrap_or_default(),
        request_url: format!("{}://{}{}", scheme, host, uri),
        user_agent: env.user_agent.clone().unwrap_or_default(),
        remote_ip: env.remote_ip.clone().unwrap_or_default(),
        referer: env.referer.clone().unwrap_or_default(),
    }
}

/// Byte-wise prefix of `s`, backed off to the previous char boundary so the
/// result stays valid UTF-8.
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
