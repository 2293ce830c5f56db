//! Error Types

use thiserror::Error;

/// Result type alias for generation operations
pub type Result<T> = std::result::Result<T, GenerationError>;

/// Text generation error types
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Upstream provider returned an error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Provider response could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error (missing API key, bad URL)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limited by the provider
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication against the provider failed
    #[error("Authentication failed: {0}")]
    Auth(String),
}

impl GenerationError {
    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_) | Self::RateLimited(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(msg) => format!("The story service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) => {
                "The story service is currently unavailable. Please try again.".into()
            }
            Self::Config(msg) => msg.clone(),
            Self::RateLimited(_) => "Too many stories are being written right now. Please wait a moment.".into(),
            Self::Auth(_) => "The story service rejected our credentials.".into(),
            Self::Parse(_) => "Failed to generate story".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(GenerationError::ProviderUnavailable("down".into()).is_retryable());
        assert!(GenerationError::RateLimited("429".into()).is_retryable());
        assert!(!GenerationError::Config("GEMINI_API_KEY is not configured".into()).is_retryable());
    }

    #[test]
    fn test_config_message_passes_through() {
        let err = GenerationError::Config("GEMINI_API_KEY is not configured".into());
        assert_eq!(err.user_message(), "GEMINI_API_KEY is not configured");
        assert_eq!(GenerationError::Parse("no candidates".into()).user_message(), "Failed to generate story");
    }
}
