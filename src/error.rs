use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Error
///
/// The application-wide error taxonomy. Every fallible path in the crate funnels
/// into this enum, and the single `IntoResponse` implementation below maps each
/// kind onto the fixed client-facing envelope. Full detail (database messages,
/// token parse errors) stays in the server-side logs and never reaches the client.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested resource (user, post) does not exist or is not reachable.
    #[error("could not find the requested resource")]
    NotFound,

    /// The presented secret did not match the stored password hash.
    /// Flattened to a generic 401 on the login path so that "unknown email"
    /// and "wrong password" are indistinguishable to the client.
    #[error("bad credentials")]
    BadCredentials,

    /// Join attempted with an email that already has an account.
    #[error("duplicated email")]
    EmailDuplicated,

    /// A token failed verification: malformed, signature mismatch, or expired.
    /// The filter recovers from this locally (the request proceeds
    /// unauthenticated); it only surfaces when an endpoint requires identity.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// A protected resource was accessed without an established identity.
    #[error("authentication required")]
    Unauthorized,

    /// The voter pipeline denied access to the resource.
    #[error("access denied")]
    Forbidden,

    /// The request payload failed domain validation (e.g. password length).
    #[error("{0}")]
    BadRequest(String),

    /// A collaborator (user store, friendship store) failed. Never treated as
    /// "denied" or "granted" — an authorization decision is not made on failed data.
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Anything else that should become a generic 5xx.
    #[error("internal error: {0}")]
    Internal(String),
}

/// ApiError
///
/// The `errors` half of the response envelope: a stable machine-readable code,
/// a human-readable message, and the HTTP status repeated in the body so clients
/// parsing only the JSON still see it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub status: u16,
}

/// ApiResult
///
/// The common response FORMAT. Every endpoint answers with this envelope:
/// `{ success, response }` on the happy path, `{ success: false, errors }` on
/// failure. Absent halves are omitted from the JSON entirely.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ApiError>,
}

impl<T> ApiResult<T> {
    pub fn ok(response: T) -> Self {
        Self {
            success: true,
            response: Some(response),
            errors: None,
        }
    }

    pub fn error(code: &str, message: &str, status: StatusCode) -> Self {
        Self {
            success: false,
            response: None,
            errors: Some(ApiError {
                code: code.to_string(),
                message: message.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}

impl Error {
    /// Maps the error kind onto its fixed (status, code, message) triple.
    /// The message is generic by design: no stack traces, no database error
    /// text, no hint whether a login failure was the email or the password.
    fn envelope(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                "M001",
                "Could not find the requested resource.",
            ),
            Error::EmailDuplicated => (StatusCode::BAD_REQUEST, "M002", "Duplicated email."),
            Error::BadCredentials | Error::Unauthorized | Error::InvalidToken(_) => (
                StatusCode::UNAUTHORIZED,
                "A001",
                "Authentication error (cause: unauthorized)",
            ),
            Error::Forbidden => (
                StatusCode::FORBIDDEN,
                "A002",
                "Authentication error (cause: forbidden)",
            ),
            Error::BadRequest(_) => (StatusCode::BAD_REQUEST, "C001", "Invalid request."),
            Error::Database(_) | Error::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "E001",
                "Internal server error.",
            ),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code, message) = self.envelope();

        // Full detail goes to the server-side logs only.
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        } else {
            tracing::debug!("request rejected: {self}");
        }

        // BadRequest carries its validation message through; everything else
        // answers with the fixed generic message.
        let message = match &self {
            Error::BadRequest(detail) => detail.clone(),
            _ => message.to_string(),
        };

        let body = ApiResult::<()>::error(code, &message, status);
        (status, Json(body)).into_response()
    }
}
