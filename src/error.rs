// Error handling module
// Defines the error taxonomy shared by every component

use thiserror::Error;

/// Errors that can occur while authenticating or talking to the Google Ads API
#[derive(Error, Debug)]
pub enum ApiError {
    /// Required configuration values missing or malformed
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// No usable credential could be produced
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Platform-level failure from a remote Google service
    #[error("Remote service error: {status} - {detail}")]
    RemoteServiceError { status: u16, detail: String },

    /// Caller-supplied input violates a precondition
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ApiError::AuthError("consent declined".to_string());
        assert_eq!(err.to_string(), "Authentication failed: consent declined");

        let err = ApiError::ConfigError("developer token missing".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: developer token missing"
        );

        let err = ApiError::RemoteServiceError {
            status: 429,
            detail: "Resource exhausted".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Remote service error: 429 - Resource exhausted"
        );
    }

    #[test]
    fn test_invalid_argument_message() {
        let err = ApiError::InvalidArgument("cost threshold must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid argument: cost threshold must be positive"
        );
    }

    #[test]
    fn test_internal_error_message() {
        let err = ApiError::Internal(anyhow::anyhow!("something went wrong"));
        assert_eq!(err.to_string(), "Internal error: something went wrong");
    }
}
