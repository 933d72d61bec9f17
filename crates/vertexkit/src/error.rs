//! Error types for structured generation.
//!
//! Every failure of a generation call falls into one [`ErrorCategory`].
//! Categories carry the short title and advice shown to users, so callers
//! can turn any [`Error`] into a diagnostic without matching on variants.
//! Nothing in this crate retries; each category is terminal for the call.

use std::fmt;

/// Result type alias for vertexkit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of generation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The response schema text could not be parsed.
    SchemaParse,
    /// The backend connection could not be established.
    ClientCreation,
    /// The backend rejected or failed the call.
    Generation,
    /// The call succeeded but produced no usable content.
    EmptyResponse,
    /// The caller cancelled, or the deadline passed, before a response arrived.
    Cancelled,
}

impl ErrorCategory {
    /// Short title for diagnostics.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::SchemaParse => "Invalid response schema",
            Self::ClientCreation => "Error creating Vertex AI client",
            Self::Generation => "Error generating content",
            Self::EmptyResponse => "Empty response",
            Self::Cancelled => "Generation cancelled",
        }
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::SchemaParse => "The response schema is not well-formed JSON",
            Self::ClientCreation => "Could not connect to the model backend",
            Self::Generation => "The model backend failed the request",
            Self::EmptyResponse => "The model returned no content",
            Self::Cancelled => "The request did not complete in time",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::SchemaParse => "Check response_schema for truncated or invalid JSON",
            Self::ClientCreation => {
                "Check credentials, or set GOOGLE_OAUTH_ACCESS_TOKEN, or run `gcloud auth application-default login`"
            }
            Self::Generation => "Verify the project, location and model name, then try again",
            Self::EmptyResponse => "Try a different prompt or model",
            Self::Cancelled => "Raise the timeout or try again",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while generating content.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Response schema text is not well-formed.
    #[error("could not parse response schema: {0}")]
    SchemaParse(#[source] serde_json::Error),

    /// Backend connection could not be established.
    #[error("could not create client: {0}")]
    ClientCreation(String),

    /// Backend call failed.
    #[error("could not generate content: {message}")]
    Generation {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// Call succeeded without candidates or content parts.
    #[error("the model returned an empty response")]
    EmptyResponse,

    /// The caller cancelled the call.
    #[error("generation was cancelled")]
    Cancelled,

    /// The call deadline passed before a response arrived.
    #[error("deadline exceeded while waiting for the model")]
    DeadlineExceeded,
}

impl Error {
    /// Create a generation error.
    pub fn generation(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Generation {
            message: message.into(),
            status,
        }
    }

    /// Create a client creation error.
    pub fn client(message: impl Into<String>) -> Self {
        Self::ClientCreation(message.into())
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::SchemaParse(_) => ErrorCategory::SchemaParse,
            Error::ClientCreation(_) => ErrorCategory::ClientCreation,
            Error::Generation { .. } => ErrorCategory::Generation,
            Error::EmptyResponse => ErrorCategory::EmptyResponse,
            Error::Cancelled | Error::DeadlineExceeded => ErrorCategory::Cancelled,
        }
    }

    /// Short diagnostic title for this error.
    #[must_use]
    pub fn title(&self) -> &'static str {
        self.category().title()
    }

    /// Whether this error belongs to the cancellation class.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        self.category() == ErrorCategory::Cancelled
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Generation {
                message: format!("HTTP {code}"),
                status: Some(code),
            },
            ureq::Error::Timeout(_) => Self::DeadlineExceeded,
            other => Self::Generation {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_error() -> Error {
        Error::SchemaParse(serde_json::from_str::<serde_json::Value>("{").unwrap_err())
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(parse_error().category(), ErrorCategory::SchemaParse);
        assert_eq!(
            Error::client("no token").category(),
            ErrorCategory::ClientCreation
        );
        assert_eq!(
            Error::generation("boom", Some(500)).category(),
            ErrorCategory::Generation
        );
        assert_eq!(Error::EmptyResponse.category(), ErrorCategory::EmptyResponse);
        assert_eq!(Error::Cancelled.category(), ErrorCategory::Cancelled);
        assert_eq!(Error::DeadlineExceeded.category(), ErrorCategory::Cancelled);
    }

    #[test]
    fn test_titles_are_distinct() {
        let titles = [
            ErrorCategory::SchemaParse.title(),
            ErrorCategory::ClientCreation.title(),
            ErrorCategory::Generation.title(),
            ErrorCategory::EmptyResponse.title(),
            ErrorCategory::Cancelled.title(),
        ];
        for (i, a) in titles.iter().enumerate() {
            for b in &titles[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_error_category_advice() {
        assert!(!ErrorCategory::ClientCreation.advice().is_empty());
        assert!(!ErrorCategory::Generation.advice().is_empty());
        assert!(!ErrorCategory::EmptyResponse.advice().is_empty());
    }

    #[test]
    fn test_error_display() {
        let err = Error::generation("quota exhausted", Some(429));
        assert_eq!(err.to_string(), "could not generate content: quota exhausted");
        assert_eq!(err.title(), "Error generating content");

        let display = format!("{}", ErrorCategory::EmptyResponse);
        assert!(display.contains("no content"));
    }

    #[test]
    fn test_cancellation_class() {
        assert!(Error::Cancelled.is_cancellation());
        assert!(Error::DeadlineExceeded.is_cancellation());
        assert!(!Error::EmptyResponse.is_cancellation());
    }

    #[test]
    fn test_from_ureq_status_code() {
        let err: Error = ureq::Error::StatusCode(503).into();
        match err {
            Error::Generation { status, .. } => assert_eq!(status, Some(503)),
            other => panic!("Expected Error::Generation, got {other:?}"),
        }
    }

    #[test]
    fn test_from_ureq_timeout_is_deadline() {
        let err = Error::from(ureq::Error::Timeout(ureq::Timeout::Global));
        assert!(matches!(err, Error::DeadlineExceeded));
        assert!(err.is_cancellation());
    }

    #[test]
    fn test_from_other_ureq_error_has_no_status() {
        let err = Error::from(ureq::Error::HostNotFound);
        assert!(matches!(err, Error::Generation { status: None, .. }));
    }
}
