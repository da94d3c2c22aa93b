//! Client-facing error taxonomy.
//!
//! Every handler returns `Result<_, ApiError>`. Subsystem errors convert via
//! `From` so handlers can use `?` throughout. Internal causes are logged and
//! never echoed to the caller.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header::HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::password::PasswordError;
use crate::auth::TokenError;
use crate::billing::provider::ProviderError;
use crate::billing::webhook::WebhookError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    ExpiredToken,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("rate limit exceeded")]
    RateLimitExceeded { limit: u64, window_secs: u64, reset: i64 },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    FeatureDisabled(String),

    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidToken | ApiError::ExpiredToken | ApiError::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::FeatureDisabled(_) | ApiError::DependencyUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidToken => "invalid_token",
            ApiError::ExpiredToken => "expired_token",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::RateLimitExceeded { .. } => "rate_limit_exceeded",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Validation(_) => "validation_error",
            ApiError::FeatureDisabled(_) => "feature_disabled",
            ApiError::DependencyUnavailable(_) => "dependency_unavailable",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        match self {
            ApiError::RateLimitExceeded {
                limit,
                window_secs,
                reset,
            } => {
                let body = json!({
                    "detail": "Rate limit exceeded",
                    "type": kind,
                    "limit": limit,
                    "window": window_secs,
                });
                let mut response = (status, Json(body)).into_response();
                let headers = response.headers_mut();
                headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
                headers.insert("x-ratelimit-remaining", HeaderValue::from(0u64));
                headers.insert("x-ratelimit-reset", HeaderValue::from(reset));
                response
            }
            ApiError::Internal(cause) => {
                tracing::error!(error = %cause, "Unhandled internal error");
                let body = json!({ "detail": "Internal server error", "type": kind });
                (status, Json(body)).into_response()
            }
            ApiError::DependencyUnavailable(cause) => {
                tracing::error!(error = %cause, "Dependency unavailable");
                let body = json!({ "detail": "Service temporarily unavailable", "type": kind });
                (status, Json(body)).into_response()
            }
            other => {
                let body = json!({ "detail": other.to_string(), "type": kind });
                (status, Json(body)).into_response()
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => ApiError::ExpiredToken,
            TokenError::Invalid(_) | TokenError::WrongKind { .. } => ApiError::InvalidToken,
            TokenError::Signing(e) | TokenError::Algorithm(e) => ApiError::Internal(e),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::Conflict(what) => ApiError::Conflict(what),
            StoreError::Unavailable(e) => ApiError::DependencyUnavailable(e),
            e @ (StoreError::TenantContextMissing | StoreError::TenantContextConflict) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Rejected(msg) => ApiError::BadRequest(format!("Payment provider error: {msg}")),
            ProviderError::Transport(e) => ApiError::DependencyUnavailable(e),
        }
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => ApiError::Validation(e.body_text()),
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}
