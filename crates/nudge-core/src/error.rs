//! Error types for nudge operations.
//!
//! Errors carry a structured [`ErrorCode`] and, where it helps, a suggestion
//! for resolving the problem.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for nudge operations.
pub type NudgeResult<T> = Result<T, NudgeError>;

/// Main error type for all nudge operations.
#[derive(Error, Debug)]
pub enum NudgeError {
    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// Text generation failed.
    #[error("Generation error: {message}")]
    Generation {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Conversation store operation failed.
    #[error("Conversation error: {message}")]
    Conversation {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication with a generation provider failed.
    #[error("Authentication error: {message}")]
    Authentication { message: String, code: ErrorCode },

    /// Rate limit exceeded at the generation provider.
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        code: ErrorCode,
        retry_after: Option<u64>,
    },

    /// Network error.
    #[error("Network error: {message}")]
    Network {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider not supported.
    #[error("Provider not supported: {provider}")]
    UnsupportedProvider { provider: String },

    /// Operation needs a running async runtime.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Configuration (CFG_xxx)
    CfgInvalid,
    CfgUnreadable,
    CfgUnsupportedFormat,

    // Validation (VAL_xxx)
    ValInvalidInput,
    ValOutOfRange,

    // Generation (GEN_xxx)
    GenConnectionFailed,
    GenFailed,
    GenInvalidResponse,

    // Conversation (CONV_xxx)
    ConvNotFound,
    ConvAppendFailed,

    // Authentication (AUTH_xxx)
    AuthInvalidKey,

    // Rate Limit (RATE_xxx)
    RateLimitExceeded,

    // Network (NET_xxx)
    NetTimeout,
    NetConnectionFailed,

    // Runtime (RT_xxx)
    RtNoRuntime,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::CfgInvalid => "CFG_001",
            ErrorCode::CfgUnreadable => "CFG_002",
            ErrorCode::CfgUnsupportedFormat => "CFG_003",
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValOutOfRange => "VAL_002",
            ErrorCode::GenConnectionFailed => "GEN_001",
            ErrorCode::GenFailed => "GEN_002",
            ErrorCode::GenInvalidResponse => "GEN_003",
            ErrorCode::ConvNotFound => "CONV_001",
            ErrorCode::ConvAppendFailed => "CONV_002",
            ErrorCode::AuthInvalidKey => "AUTH_001",
            ErrorCode::RateLimitExceeded => "RATE_001",
            ErrorCode::NetTimeout => "NET_001",
            ErrorCode::NetConnectionFailed => "NET_002",
            ErrorCode::RtNoRuntime => "RT_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl NudgeError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error with suggestion.
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create a validation error listing every offending field.
    pub fn invalid_fields(problems: Vec<(String, String)>) -> Self {
        let message = problems
            .iter()
            .map(|(field, problem)| format!("{}: {}", field, problem))
            .collect::<Vec<_>>()
            .join("; ");
        Self::Validation {
            message,
            code: ErrorCode::ValOutOfRange,
            details: problems.into_iter().collect(),
            suggestion: Some("Fix the listed settings or run `nudge config init`".to_string()),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a generation error.
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
            code: ErrorCode::GenFailed,
            source: None,
        }
    }

    /// Create a generation error for a malformed provider response.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
            code: ErrorCode::GenInvalidResponse,
            source: None,
        }
    }

    /// Create a conversation store error.
    pub fn conversation(message: impl Into<String>) -> Self {
        Self::Conversation {
            message: message.into(),
            code: ErrorCode::ConvAppendFailed,
            source: None,
        }
    }

    /// Create a conversation-not-found error.
    pub fn conversation_not_found(conversation_id: impl AsRef<str>) -> Self {
        Self::Conversation {
            message: format!("Conversation '{}' not found", conversation_id.as_ref()),
            code: ErrorCode::ConvNotFound,
            source: None,
        }
    }

    /// Create an API error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            code: ErrorCode::NetConnectionFailed,
            source: None,
        }
    }

    /// Create an error for operations that need a tokio runtime.
    pub fn no_runtime(operation: &str) -> Self {
        Self::Runtime(format!("{} must be called from within a tokio runtime", operation))
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::Generation { code, .. } => *code,
            Self::Conversation { code, .. } => *code,
            Self::Authentication { code, .. } => *code,
            Self::RateLimit { code, .. } => *code,
            Self::Network { code, .. } => *code,
            Self::Configuration(_) => ErrorCode::CfgInvalid,
            Self::UnsupportedProvider { .. } => ErrorCode::CfgInvalid,
            Self::Runtime(_) => ErrorCode::RtNoRuntime,
            _ => ErrorCode::Internal,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::Authentication { .. } => Some("Please check your API key"),
            Self::RateLimit { .. } => Some("Please wait before making more requests"),
            Self::Generation { .. } => Some("Please check your generation provider configuration"),
            Self::UnsupportedProvider { .. } => {
                Some("Enable the matching cargo feature or choose another provider")
            }
            Self::Runtime(_) => Some("Start the scheduler from inside a tokio runtime"),
            _ => None,
        }
    }

    /// Whether this error is worth retrying on the next trigger.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::RateLimit { .. } | Self::Generation { .. }
        )
    }

    /// Convert from an HTTP status code returned by a provider.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            400 => Self::validation_with_suggestion(body, "Please check your request parameters"),
            401 | 403 => Self::Authentication {
                message: body.to_string(),
                code: ErrorCode::AuthInvalidKey,
            },
            429 => Self::RateLimit {
                message: body.to_string(),
                code: ErrorCode::RateLimitExceeded,
                retry_after: None,
            },
            500..=599 => Self::Generation {
                message: format!("HTTP {}: {}", status, body),
                code: ErrorCode::GenConnectionFailed,
                source: None,
            },
            _ => Self::Internal(format!("HTTP {}: {}", status, body)),
        }
    }
}

impl From<toml::de::Error> for NudgeError {
    fn from(err: toml::de::Error) -> Self {
        Self::Configuration(format!("Invalid TOML: {}", err))
    }
}

impl From<serde_yaml::Error> for NudgeError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Configuration(format!("Invalid YAML: {}", err))
    }
}
