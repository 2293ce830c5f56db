//! Payment Error Types

use bluehour_ledger::LedgerError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Payment processor API error
    #[error("{processor} API error: {message}")]
    Api {
        processor: &'static str,
        message: String,
    },

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Product or variant id not in the catalog
    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ledger storage error
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl PaymentError {
    pub(crate) fn api(processor: &'static str, message: impl Into<String>) -> Self {
        Self::Api {
            processor,
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Api { .. } => true,
            Self::Ledger(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Get user-friendly message
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Api { .. } => "Failed to create checkout session",
            Self::WebhookSignature(_) => "Invalid signature",
            Self::WebhookParse(_) => "Invalid webhook payload",
            Self::UnknownProduct(_) => "Invalid product selected",
            Self::Config(_) => "Service configuration error.",
            _ => "Internal Server Error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(PaymentError::api("Polar", "502 Bad Gateway").is_retryable());
        assert!(PaymentError::Ledger(LedgerError::Database("timeout".into())).is_retryable());
        assert!(!PaymentError::Ledger(LedgerError::Config("bad url".into())).is_retryable());
        assert!(!PaymentError::WebhookSignature("mismatch".into()).is_retryable());
    }

    #[test]
    fn test_user_message_hides_detail() {
        let err = PaymentError::UnknownProduct("prod_x".into());
        assert_eq!(err.user_message(), "Invalid product selected");
    }
}
