use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::provider::Provider;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// An outbound HTTP error (connect, timeout, body decode).
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// A stored value could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Local account authentication failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The session holds no credential for this provider.
    #[error("Not connected to {0}")]
    NotConnected(Provider),

    /// A resource not found error.
    #[error("Resource not found")]
    NotFound,

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A provider answered with a non-2xx status.
    #[error("{provider} returned {status}")]
    Upstream {
        provider: Provider,
        status: u16,
        body: String,
    },

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// The upstream HTTP status when this error came from a provider.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            AppError::Upstream { status, .. } => Some(*status),
            AppError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            AppError::Redis(ref e) => {
                tracing::error!("Redis error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Store error".to_string(), None)
            }

            AppError::Http(ref e) => {
                tracing::error!("HTTP client error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Provider request failed".to_string(),
                    None,
                )
            }

            AppError::Serialization(ref msg) => {
                tracing::error!("Serialization error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string(), None)
            }

            AppError::Authentication(ref msg) => {
                tracing::warn!("Authentication failed: {}", msg);
                (StatusCode::UNAUTHORIZED, msg.clone(), None)
            }

            AppError::NotConnected(provider) => {
                tracing::debug!("No {} credential in session", provider);
                (
                    StatusCode::UNAUTHORIZED,
                    format!("Not logged in with {}", provider.display_name()),
                    None,
                )
            }

            AppError::NotFound => {
                tracing::debug!("Resource not found");
                (StatusCode::NOT_FOUND, "Resource not found".to_string(), None)
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone(), None)
            }

            AppError::Upstream {
                provider,
                status,
                ref body,
            } => {
                tracing::error!("{} error ({}): {}", provider.display_name(), status, body);
                let details = sonic_rs::from_str::<sonic_rs::Value>(body)
                    .or_else(|_| sonic_rs::to_value(body))
                    .unwrap_or_default();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to fetch {} data", provider.display_name()),
                    Some(details),
                )
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string(), None)
            }
        };

        let payload = match details {
            Some(details) => sonic_rs::json!({ "error": message, "details": details }),
            None => sonic_rs::json!({ "error": message }),
        };

        let body = sonic_rs::to_string(&payload)
            .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (
            status,
            [(http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}
