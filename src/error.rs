//! Error types for chathub.

use thiserror::Error;

/// Common error type for chathub.
#[derive(Error, Debug)]
pub enum ChatHubError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for configuration or user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Response generation error.
    #[error("generation error: {0}")]
    Generation(#[from] crate::assistant::GenerationError),
}

/// Result type alias for chathub operations.
pub type Result<T> = std::result::Result<T, ChatHubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ChatHubError::Validation("room name empty".to_string());
        assert_eq!(err.to_string(), "validation error: room name empty");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = ChatHubError::NotFound("room".to_string());
        assert_eq!(err.to_string(), "room not found");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ChatHubError = io_err.into();
        assert!(matches!(err, ChatHubError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(ChatHubError::Validation("test".to_string()))
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
