//! HTTP Error Responses

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bluehour_core::Language;
use bluehour_payments::{PaymentError, Processor};
use serde::Serialize;

use crate::story::StoryError;

/// JSON error body
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Machine-readable code
    pub error: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_count: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<i32>,
}

/// Error response with status
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error,
                message: Some(message.into()),
                ..ErrorBody::default()
            },
        }
    }

    pub fn missing_fields(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "MISSING_FIELDS", message)
    }

    pub fn payments_disabled(processor: Processor) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "PAYMENTS_DISABLED",
            format!("{} payments are not configured", processor.display_name()),
        )
    }

    pub fn unknown_processor(name: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "UNKNOWN_PROCESSOR",
            format!("Unknown payment processor: {name}"),
        )
    }

    /// Map a story failure, with human text in the caller's language
    pub fn from_story(err: &StoryError, language: Language) -> Self {
        let message = err.user_message(language);
        match err {
            StoryError::MissingFields(fields) => {
                let fields: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
                Self::missing_fields(format!("{message} ({})", fields.join(", ")))
            }
            StoryError::MissingUser => Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message),
            StoryError::IpAbuse { .. } => Self::new(StatusCode::FORBIDDEN, "IP_ABUSE", message),
            StoryError::NoCredits { usage, limit } => {
                Self::quota(StatusCode::FORBIDDEN, "NO_CREDITS", message, usage.free_count, *limit, usage.credits)
            }
            StoryError::FreeLimitExceeded { usage, limit } => Self::quota(
                StatusCode::FORBIDDEN,
                "FREE_LIMIT_EXCEEDED",
                message,
                usage.free_count,
                *limit,
                usage.credits,
            ),
            StoryError::Generation(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "GENERATION_FAILED", message)
            }
            StoryError::Ledger(_) => Self::new(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", message),
            StoryError::LedgerWrite(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "LEDGER_WRITE_FAILED", message)
            }
        }
    }

    fn quota(status: StatusCode, error: &'static str, message: String, used: i32, limit: i32, credits: i32) -> Self {
        Self {
            status,
            body: ErrorBody {
                error,
                message: Some(message),
                used_count: Some(used),
                limit: Some(limit),
                credits: Some(credits),
            },
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        let message = err.user_message();
        match err {
            PaymentError::WebhookSignature(_) => Self::new(StatusCode::BAD_REQUEST, "INVALID_SIGNATURE", message),
            PaymentError::WebhookParse(_) => Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INVALID_PAYLOAD", message),
            PaymentError::UnknownProduct(_) => Self::new(StatusCode::BAD_REQUEST, "UNKNOWN_PRODUCT", message),
            PaymentError::Api { .. } => Self::new(StatusCode::INTERNAL_SERVER_ERROR, "CHECKOUT_FAILED", message),
            PaymentError::Config(_) => Self::new(StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR", message),
            PaymentError::Ledger(_) => Self::new(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
