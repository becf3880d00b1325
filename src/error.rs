use crate::transport::TransportError;
use thiserror::Error;

/// Maximum number of characters of a response body kept for diagnostics.
pub(crate) const BODY_EXCERPT_CHARS: usize = 200;

/// Structured error context attached to every failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    /// HTTP method of the failed call (e.g., "POST")
    pub method: Option<String>,
    /// Endpoint path relative to the base URL (e.g., "/app/entry/data/create")
    pub path: Option<String>,
    /// 1-based attempt number that produced the error
    pub attempt: Option<u32>,
    /// Transaction token threaded through the call, if any
    pub transaction_id: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    pub fn with_transaction_id(mut self, id: impl Into<String>) -> Self {
        self.transaction_id = Some(id.into());
        self
    }

    fn is_empty(&self) -> bool {
        self.method.is_none()
            && self.path.is_none()
            && self.attempt.is_none()
            && self.transaction_id.is_none()
    }
}

/// Error kinds callers can match on without inspecting messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    InvalidRequest,
    Transport,
    ResponseFormat,
    Application,
    Permission,
    NotFound,
    Http,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Transport => "transport",
            ErrorKind::ResponseFormat => "response_format",
            ErrorKind::Application => "application",
            ErrorKind::Permission => "permission_denied",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Http => "http",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for gateway calls and the layers built on top of it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid request: {message}{}", format_context(.context))]
    InvalidRequest {
        message: String,
        context: ErrorContext,
    },

    #[error("Network transport error: {source}{}", format_context(.context))]
    Transport {
        #[source]
        source: TransportError,
        context: ErrorContext,
    },

    #[error("Response format error: {message} (body: {body}){}", format_context(.context))]
    ResponseFormat {
        message: String,
        body: String,
        context: ErrorContext,
    },

    #[error("API error {code}: {message}{}", format_context(.context))]
    Application {
        code: i64,
        message: String,
        context: ErrorContext,
    },

    #[error("Permission denied (HTTP 403), check the API key and app permissions: {message}{}", format_context(.context))]
    Permission {
        message: String,
        context: ErrorContext,
    },

    #[error("Not found (HTTP 404), check the app id and entry id: {message}{}", format_context(.context))]
    NotFound {
        message: String,
        context: ErrorContext,
    },

    #[error("HTTP {status}: {body}{}", format_context(.context))]
    Http {
        status: u16,
        body: String,
        context: ErrorContext,
    },
}

fn format_context(ctx: &ErrorContext) -> String {
    if ctx.is_empty() {
        return String::new();
    }
    let mut parts = Vec::new();
    match (&ctx.method, &ctx.path) {
        (Some(m), Some(p)) => parts.push(format!("{} {}", m, p)),
        (Some(m), None) => parts.push(m.clone()),
        (None, Some(p)) => parts.push(p.clone()),
        (None, None) => {}
    }
    if let Some(attempt) = ctx.attempt {
        parts.push(format!("attempt {}", attempt));
    }
    if let Some(ref id) = ctx.transaction_id {
        parts.push(format!("transaction_id: {}", id));
    }
    format!(" ({})", parts.join(", "))
}

/// First `max` characters of `body`, cut on a char boundary.
pub(crate) fn excerpt(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration {
            message: msg.into(),
        }
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Error::InvalidRequest {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    pub(crate) fn response_format(msg: impl Into<String>, body: &str) -> Self {
        Error::ResponseFormat {
            message: msg.into(),
            body: excerpt(body, BODY_EXCERPT_CHARS),
            context: ErrorContext::new(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration { .. } => ErrorKind::Configuration,
            Error::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Error::Transport { .. } => ErrorKind::Transport,
            Error::ResponseFormat { .. } => ErrorKind::ResponseFormat,
            Error::Application { .. } => ErrorKind::Application,
            Error::Permission { .. } => ErrorKind::Permission,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Http { .. } => ErrorKind::Http,
        }
    }

    /// Whether the failure can be recovered by sending the same call again.
    ///
    /// Configuration and request-shape errors are fatal; everything that came
    /// back from the wire (or failed on it) is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Error::Configuration { .. } | Error::InvalidRequest { .. }
        )
    }

    /// HTTP status that produced the error, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Permission { .. } => Some(403),
            Error::NotFound { .. } => Some(404),
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { .. } => None,
            Error::InvalidRequest { context, .. }
            | Error::Transport { context, .. }
            | Error::ResponseFormat { context, .. }
            | Error::Application { context, .. }
            | Error::Permission { context, .. }
            | Error::NotFound { context, .. }
            | Error::Http { context, .. } => Some(context),
        }
    }

    /// Attach (replace) the structured context.
    pub fn with_context(mut self, new_ctx: ErrorContext) -> Self {
        match &mut self {
            Error::Configuration { .. } => {}
            Error::InvalidRequest { context, .. }
            | Error::Transport { context, .. }
            | Error::ResponseFormat { context, .. }
            | Error::Application { context, .. }
            | Error::Permission { context, .. }
            | Error::NotFound { context, .. }
            | Error::Http { context, .. } => *context = new_ctx,
        }
        self
    }
}

impl From<TransportError> for Error {
    fn from(source: TransportError) -> Self {
        Error::Transport {
            source,
            context: ErrorContext::new(),
        }
    }
}
