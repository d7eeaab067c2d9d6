use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Every way a code generation run can fail.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// The settings file exists but could not be parsed.
    #[error("Error loading settings file '{path}': {message}")]
    EnvFile {
        /// Path to the settings file
        path: PathBuf,
        /// Parser error message
        message: String,
    },

    /// The API credential is absent or empty.
    #[error("API key is missing: set the {var} environment variable")]
    MissingCredential {
        /// Name of the expected environment variable
        var: String,
    },

    /// The tokenizer failed to load or encode.
    #[error("Error counting tokens: {message}")]
    Tokenizer {
        /// Error message
        message: String,
    },

    /// Payload exceeds the maximum token limit.
    #[error(
        "Input exceeds the maximum token limit. Actual tokens: {actual}, Maximum tokens: {limit}"
    )]
    TokenLimitExceeded {
        /// Token count of the payload
        actual: usize,
        /// Maximum allowed tokens
        limit: usize,
    },

    /// The completion API answered with an error.
    #[error("Completion API error{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Api {
        /// HTTP status, when the error came from the response status line
        status: Option<u16>,
        /// Error message reported by the API
        message: String,
    },

    /// Transport level failure talking to the API.
    #[error("HTTP error: {message}")]
    Http {
        /// Error message
        message: String,
    },

    /// The completion did not finish before the deadline.
    #[error("Completion request timed out after {}s", .limit.as_secs_f64())]
    Timeout {
        /// Configured deadline
        limit: Duration,
    },

    /// The response stream was malformed.
    #[error("Malformed completion stream: {message}")]
    Stream {
        /// Error message
        message: String,
    },

    /// JSON serialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },
}

impl Error {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a tokenizer error.
    #[must_use]
    pub fn tokenizer(message: impl Into<String>) -> Self {
        Self::Tokenizer {
            message: message.into(),
        }
    }

    /// Creates an API error.
    #[must_use]
    pub fn api(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Creates a stream error.
    #[must_use]
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream {
            message: message.into(),
        }
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::EnvFile { .. } | Self::MissingCredential { .. }
        )
    }

    /// Returns true if the deadline was exceeded.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Maps a transport error, classifying timeouts against the deadline.
    pub(crate) fn from_reqwest(source: &reqwest::Error, limit: Duration) -> Self {
        if source.is_timeout() {
            Self::Timeout { limit }
        } else if let Some(status) = source.status() {
            Self::api(Some(status.as_u16()), source.to_string())
        } else {
            Self::Http {
                message: source.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::config("test message");
        assert!(err.is_config());
        assert!(err.to_string().contains("test message"));
    }

    #[test]
    fn test_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::io("/tmp/input_code.txt", io_err);
        assert!(err.is_io());
        assert!(err.to_string().contains("/tmp/input_code.txt"));
    }

    #[test]
    fn test_token_limit_reports_both_counts() {
        let err = Error::TokenLimitExceeded {
            actual: 4012,
            limit: 3500,
        };
        let message = err.to_string();
        assert!(message.contains("Actual tokens: 4012"));
        assert!(message.contains("Maximum tokens: 3500"));
    }

    #[test]
    fn test_api_error_status_formatting() {
        let with_status = Error::api(Some(401), "Incorrect API key provided");
        assert_eq!(
            with_status.to_string(),
            "Completion API error (status 401): Incorrect API key provided"
        );

        let without_status = Error::api(None, "overloaded");
        assert_eq!(without_status.to_string(), "Completion API error: overloaded");
    }

    #[test]
    fn test_timeout_error() {
        let err = Error::Timeout {
            limit: Duration::from_secs(60),
        };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("60s"));
    }

    #[test]
    fn test_missing_credential_is_config() {
        let err = Error::MissingCredential {
            var: "CHATGPT_API_KEY".to_string(),
        };
        assert!(err.is_config());
        assert!(err.to_string().contains("CHATGPT_API_KEY"));
    }

    #[test]
    fn test_serialization_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(err.to_string().contains("Serialization error"));
    }
}
