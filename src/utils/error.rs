use thiserror::Error;

#[derive(Error, Debug)]
pub enum TripError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    ApiResponseError { status: u16, body: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("LLM response error: {message}")]
    LlmResponseError { message: String },

    #[error("Schema error: {message}")]
    SchemaError { message: String },

    #[error("Media processing error: {message}")]
    MediaError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

pub type Result<T> = std::result::Result<T, TripError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Llm,
    Media,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TripError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn llm(message: impl Into<String>) -> Self {
        Self::LlmResponseError {
            message: message.into(),
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::SchemaError {
            message: message.into(),
        }
    }

    pub fn media(message: impl Into<String>) -> Self {
        Self::MediaError {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiError(_) | Self::ApiResponseError { .. } => ErrorCategory::Network,
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::LlmResponseError { .. } | Self::SchemaError { .. } => ErrorCategory::Llm,
            Self::MediaError { .. } => ErrorCategory::Media,
            Self::SerializationError(_)
            | Self::ProcessingError { .. }
            | Self::ValidationError { .. } => ErrorCategory::Data,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 模型回應格式不穩定，重跑通常就會成功
            Self::LlmResponseError { .. } | Self::SchemaError { .. } => ErrorSeverity::Medium,
            Self::ApiError(e) if e.is_timeout() || e.is_connect() => ErrorSeverity::Medium,
            Self::ApiResponseError { status, .. } if *status == 429 || *status >= 500 => {
                ErrorSeverity::Medium
            }
            Self::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ApiError(_) => "Check your network connection and the LLM base URL, then retry",
            Self::ApiResponseError { status, .. } => match status {
                401 | 403 => "Verify OPENAI_API_KEY or the api_key in secret/keys.local.toml",
                429 => "Rate limited by the LLM provider; wait a moment and retry",
                _ => "Inspect the response body above and retry the request",
            },
            Self::MissingConfigError { .. } => {
                "Set OPENAI_API_KEY or fill [openai] api_key in secret/keys.local.toml"
            }
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => {
                "Fix the trip file (run `reel-trip init` for a template) and retry"
            }
            Self::LlmResponseError { .. } | Self::SchemaError { .. } => {
                "The model returned unusable output; rerun the step or pick another model"
            }
            Self::MediaError { .. } => "Make sure ffmpeg and ffprobe are installed and on PATH",
            Self::IoError(_) => "Check file paths and permissions of the output directory",
            Self::SerializationError(_) | Self::ProcessingError { .. } => {
                "Inspect the intermediate JSON files in the output directory"
            }
            Self::ValidationError { .. } => "Correct the input value and retry",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Network => format!("Could not reach the LLM service: {}", self),
            ErrorCategory::Llm => format!("The model response could not be used: {}", self),
            ErrorCategory::Media => format!("Reel processing failed: {}", self),
            ErrorCategory::Data => format!("Invalid data: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_and_severity() {
        let err = TripError::llm("empty response");
        assert_eq!(err.category(), ErrorCategory::Llm);
        assert_eq!(err.severity(), ErrorSeverity::Medium);

        let err = TripError::MissingConfigError {
            field: "openai.api_key".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.recovery_suggestion().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_server_errors_are_retryable() {
        let err = TripError::ApiResponseError {
            status: 503,
            body: "overloaded".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Medium);

        let err = TripError::ApiResponseError {
            status: 401,
            body: "bad key".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.user_friendly_message().starts_with("Could not reach"));
    }
}
