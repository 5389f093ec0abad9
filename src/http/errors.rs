// Every handler failure ends up here and leaves as `{ "error": "..." }`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::core::notifications::NotifyError;
use crate::core::summarization::SummaryError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Origin {0} is not allowed by CORS policy.")]
    OriginRejected(String),

    #[error("{0}")]
    Configuration(String),

    /// An upstream service refused the request; its status is passed through.
    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::OriginRejected(_) => StatusCode::FORBIDDEN,
            ApiError::Configuration(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Upstream { status, .. } => *status,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<SummaryError> for ApiError {
    fn from(error: SummaryError) -> Self {
        match error {
            SummaryError::NotConfigured(message) => ApiError::Configuration(message),
            SummaryError::Provider { message, .. } | SummaryError::Transport(message) => {
                ApiError::Internal(format!("Failed to generate summary: {}", message))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<NotifyError> for ApiError {
    fn from(error: NotifyError) -> Self {
        match &error {
            NotifyError::MissingText => ApiError::BadRequest(error.to_string()),
            NotifyError::NotConfigured => ApiError::Configuration(error.to_string()),
            NotifyError::Rejected { status, .. } => {
                // Only error statuses are forwarded; anything odd (1xx/3xx) becomes 502.
                let status = StatusCode::from_u16(*status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                ApiError::Upstream {
                    status,
                    message: error.to_string(),
                }
            }
            NotifyError::Transport(_) => ApiError::Internal(error.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), %error, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), %error, "Request rejected");
        }

        (status, Json(ErrorBody { error })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_text_is_bad_request() {
        let err = ApiError::from(NotifyError::MissingText);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Todo text is required.");
    }

    #[test]
    fn test_webhook_rejection_forwards_status() {
        let err = ApiError::from(NotifyError::Rejected {
            status: 404,
            body: "no_service".to_string(),
        });
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(err.to_string().contains("no_service"));
    }

    #[test]
    fn test_webhook_redirect_becomes_bad_gateway() {
        let err = ApiError::from(NotifyError::Rejected {
            status: 302,
            body: String::new(),
        });
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_provider_error_is_internal_with_provider_message() {
        let err = ApiError::from(SummaryError::Provider {
            status: 400,
            message: "API key not valid.".to_string(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Failed to generate summary: API key not valid.");
    }

    #[test]
    fn test_unconfigured_provider_is_configuration_error() {
        let err = ApiError::from(SummaryError::NotConfigured("Gemini API key is not configured.".into()));
        assert!(matches!(err, ApiError::Configuration(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
