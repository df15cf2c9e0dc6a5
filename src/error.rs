// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Errors reported by the hosted backend (auth, tables, storage, RPC).
///
/// The backend only hands back free-form error text, so the variant is
/// chosen by [`BackendError::classify`] from the status and message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("Backend unreachable: {0}")]
    Connectivity(String),

    #[error("Database setup incomplete: {0}")]
    MissingSchema(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Backend error: {0}")]
    Api(String),
}

impl BackendError {
    /// Message used when no hosted backend is configured.
    pub const NOT_CONFIGURED: &'static str = "backend not configured";

    /// Map a failed backend response onto the error taxonomy.
    ///
    /// Schema problems are checked before permission problems: PostgREST
    /// reports a missing table as `relation "reports" does not exist`, which
    /// would otherwise never reach the setup hint.
    pub fn classify(status: u16, message: &str) -> Self {
        let lower = message.to_lowercase();
        let message = message.to_string();

        if lower.contains("does not exist")
            || lower.contains("could not find the function")
            || lower.contains("schema cache")
            || status == 404 && lower.contains("relation")
        {
            return BackendError::MissingSchema(message);
        }
        if lower.contains("policy")
            || lower.contains("permission")
            || lower.contains("row-level security")
            || status == 403
        {
            return BackendError::Permission(message);
        }
        if lower.contains("jwt")
            || lower.contains("authentication")
            || lower.contains("invalid login credentials")
            || status == 401
        {
            return BackendError::Auth(message);
        }
        if lower.contains("connection") || lower.contains("network") || lower.contains("timed out") {
            return BackendError::Connectivity(message);
        }
        BackendError::Api(message)
    }

    /// Whether this error means the backend itself could not be reached.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, BackendError::Connectivity(_))
    }

    /// Whether this error means the table or function is missing.
    pub fn is_missing_schema(&self) -> bool {
        matches!(self, BackendError::MissingSchema(_))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            BackendError::Connectivity(err.to_string())
        } else if let Some(status) = err.status() {
            BackendError::classify(status.as_u16(), &err.to_string())
        } else {
            BackendError::Api(err.to_string())
        }
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Admin secret key is required for authority accounts")]
    MissingAdminSecret,

    #[error("Invalid admin secret key")]
    InvalidAdminSecret,

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone())),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::MissingAdminSecret | AppError::InvalidAdminSecret => (
                StatusCode::BAD_REQUEST,
                "invalid_admin_secret",
                Some(self.to_string()),
            ),
            AppError::Backend(err) => match err {
                BackendError::Connectivity(msg) => {
                    tracing::error!(error = %msg, "Backend unreachable");
                    (StatusCode::BAD_GATEWAY, "backend_unreachable", None)
                }
                BackendError::MissingSchema(msg) => {
                    tracing::error!(error = %msg, "Backend schema missing");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "setup_required",
                        Some("Please run the database setup script.".to_string()),
                    )
                }
                BackendError::Permission(msg) => {
                    (StatusCode::FORBIDDEN, "permission_denied", Some(msg.clone()))
                }
                BackendError::Auth(msg) => {
                    (StatusCode::UNAUTHORIZED, "auth_error", Some(msg.clone()))
                }
                BackendError::Api(msg) => {
                    tracing::error!(error = %msg, "Backend error");
                    (StatusCode::BAD_GATEWAY, "backend_error", None)
                }
            },
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid value for '{}'", field),
                })
            })
            .collect();
        messages.sort();
        messages.dedup();
        AppError::BadRequest(messages.join("; "))
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_missing_relation() {
        let err = BackendError::classify(404, r#"relation "public.reports" does not exist"#);
        assert!(err.is_missing_schema());

        let err = BackendError::classify(
            404,
            "Could not find the function public.award_points(points_to_add, user_id)",
        );
        assert!(err.is_missing_schema());
    }

    #[test]
    fn test_classify_permission() {
        let err = BackendError::classify(
            403,
            r#"new row violates row-level security policy for table "reports""#,
        );
        assert_eq!(
            err,
            BackendError::Permission(
                r#"new row violates row-level security policy for table "reports""#.to_string()
            )
        );
    }

    #[test]
    fn test_classify_auth_and_network() {
        assert!(matches!(
            BackendError::classify(401, "JWT expired"),
            BackendError::Auth(_)
        ));
        assert!(BackendError::classify(500, "network unreachable").is_connectivity());
        assert!(matches!(
            BackendError::classify(500, "something else"),
            BackendError::Api(_)
        ));
    }

    #[test]
    fn test_admin_secret_messages() {
        assert_eq!(
            AppError::MissingAdminSecret.to_string(),
            "Admin secret key is required for authority accounts"
        );
        assert_eq!(
            AppError::InvalidAdminSecret.to_string(),
            "Invalid admin secret key"
        );
    }

    #[test]
    fn test_backend_status_codes() {
        let resp = AppError::Backend(BackendError::MissingSchema("x".into())).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let resp = AppError::Backend(BackendError::Permission("x".into())).into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = AppError::Backend(BackendError::Connectivity("x".into())).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
