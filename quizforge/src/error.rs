//! Error types for the extraction pipeline, provider adapters and dispatch.

use std::fmt;

use crate::schema::TargetKind;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors produced by [`extract_and_coerce`](crate::extract_and_coerce).
///
/// The pipeline surfaces exactly two kinds of failure: the response text
/// could not be decoded at all, or it decoded but does not fit the target
/// schema even after autofixes.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    /// No decode strategy produced a JSON document.
    #[error(transparent)]
    ResponseParse(#[from] ResponseParseError),

    /// A document was decoded but does not match the target schema.
    #[error(transparent)]
    SchemaValidation(#[from] SchemaValidationError),
}

impl PipelineError {
    /// Machine-readable error type used in boundary payloads.
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::ResponseParse(_) => "response_parse_error",
            Self::SchemaValidation(_) => "schema_validation_error",
        }
    }
}

/// Raised when no decode strategy could obtain parseable JSON.
#[derive(Debug, Clone, thiserror::Error)]
#[error("could not parse JSON from response ({}): {snippet:?}", summarize(.attempts))]
pub struct ResponseParseError {
    /// Truncated copy of the offending raw text.
    pub snippet: String,
    /// One entry per strategy that was tried, in order.
    pub attempts: Vec<StrategyError>,
}

impl ResponseParseError {
    /// Creates a parse error, truncating `raw` to `max_len` characters.
    pub fn new(raw: &str, max_len: usize, attempts: Vec<StrategyError>) -> Self {
        Self {
            snippet: truncate_snippet(raw, max_len),
            attempts,
        }
    }
}

fn summarize(attempts: &[StrategyError]) -> String {
    if attempts.is_empty() {
        return "no strategies attempted".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Details of a failed decode strategy attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyError {
    /// Name of the strategy that failed.
    pub strategy: &'static str,
    /// Error message describing why it failed.
    pub error: String,
}

impl StrategyError {
    /// Creates a new strategy error.
    #[inline]
    pub fn new(strategy: &'static str, error: impl Into<String>) -> Self {
        Self {
            strategy,
            error: error.into(),
        }
    }
}

impl fmt::Display for StrategyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.error)
    }
}

/// Raised when a decoded document does not satisfy the target schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} response does not match schema: {}", join_issues(.issues))]
pub struct SchemaValidationError {
    /// The schema that was being built.
    pub kind: TargetKind,
    /// Every offending field, in discovery order.
    pub issues: Vec<FieldIssue>,
}

impl SchemaValidationError {
    /// Creates an error for a single offending field.
    pub fn single(kind: TargetKind, field: impl Into<String>, problem: impl Into<String>) -> Self {
        Self {
            kind,
            issues: vec![FieldIssue::new(field, problem)],
        }
    }

    /// Returns the paths of all offending fields.
    pub fn fields(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.field.as_str()).collect()
    }

    /// Returns true if `field` is among the offending paths.
    pub fn mentions(&self, field: &str) -> bool {
        self.issues.iter().any(|i| i.field == field)
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A single missing or invalid field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    /// Dotted path of the field, e.g. `answerLevels.beginner.tests[0].answer`.
    pub field: String,
    /// What is wrong with it.
    pub problem: String,
}

impl FieldIssue {
    /// Creates a new field issue.
    #[inline]
    pub fn new(field: impl Into<String>, problem: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            problem: problem.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.field, self.problem)
    }
}

/// Errors raised by provider adapters.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// The requested model is not in the provider's catalogue.
    #[error("model '{model}' is not supported by provider '{provider}'")]
    UnsupportedModel {
        /// Provider identifier.
        provider: &'static str,
        /// Requested model name.
        model: String,
    },

    /// The provider has no API key configured.
    #[error("no API key configured for provider '{0}'")]
    MissingApiKey(&'static str),

    /// The request is missing data the operation needs.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The upstream API call failed.
    #[error("{provider} API error: {message}")]
    Api {
        /// Provider identifier.
        provider: &'static str,
        /// Upstream error text.
        message: String,
    },

    /// The upstream API returned no text.
    #[error("empty response from {0}")]
    EmptyResponse(&'static str),

    /// The response text could not be turned into the target schema.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ProviderError {
    /// Machine-readable error type used in boundary payloads.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::UnsupportedModel { .. } => "model_not_supported",
            Self::MissingApiKey(_) => "api_key",
            Self::InvalidRequest(_) => "value_error",
            Self::Api { message, .. } => {
                let lower = message.to_lowercase();
                if lower.contains("rate limit") {
                    "rate_limit_error"
                } else if lower.contains("api key")
                    || lower.contains("authentication")
                    || lower.contains("permission denied")
                {
                    "api_key"
                } else {
                    "api_error"
                }
            }
            Self::EmptyResponse(_) => "api_error",
            Self::Pipeline(e) => e.error_type(),
        }
    }
}

/// Errors raised while routing a request to a provider operation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchError {
    /// No provider is registered under this identifier.
    #[error("resource '{0}' not found")]
    UnknownProvider(String),

    /// The provider does not implement this operation.
    #[error("operation '{operation}' not supported by resource '{provider}'")]
    UnsupportedOperation {
        /// Provider identifier.
        provider: String,
        /// Requested operation name.
        operation: String,
    },

    /// The request payload could not be read.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The provider is registered but no completion client was configured.
    #[error("no completion client configured for provider '{0}'")]
    NoClient(String),

    /// The provider operation itself failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl DispatchError {
    /// Machine-readable error type used in boundary payloads.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::UnknownProvider(_) => "resource_not_found",
            Self::UnsupportedOperation { .. } => "operation_not_supported",
            Self::InvalidPayload(_) | Self::NoClient(_) => "config_error",
            Self::Provider(e) => e.error_type(),
        }
    }
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(pub String);

/// Truncates `text` to at most `max_len` characters, marking the cut.
pub(crate) fn truncate_snippet(text: &str, max_len: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_len {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max_len).collect();
    out.push_str("...");
    out
}
