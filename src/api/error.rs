//! Error responses and form validation failures.
//!
//! Handlers return [`ApiErrorResponse`] for anything that ends the request
//! with an error page, [`ValidationError`] for a form to re-render, and
//! [`AuthRequired`] to bounce anonymous visitors to the login page.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};

use crate::infrastructure::{PasswordError, RepositoryError};

/// Message shown for failures whose cause stays in the server log.
const INTERNAL_MESSAGE: &str = "Something went wrong on our side";

// =============================================================================
// Error bodies
// =============================================================================

/// JSON body of an error page, e.g. `{"code": "NOT_FOUND", "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Stable upper-case identifier.
    pub code: String,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// One problem with a submitted form, keyed by input name.
///
/// Problems with the submission as a whole, like a failed login, use
/// [`FieldError::NON_FIELD`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub const NON_FIELD: &'static str = "__all__";

    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn non_field(message: impl Into<String>) -> Self {
        Self::new(Self::NON_FIELD, message)
    }
}

// =============================================================================
// ApiErrorResponse
// =============================================================================

/// A status code paired with its [`ApiError`] body.
#[derive(Debug, Clone)]
pub struct ApiErrorResponse {
    pub status: StatusCode,
    pub error: ApiError,
}

impl ApiErrorResponse {
    #[must_use]
    pub const fn new(status: StatusCode, error: ApiError) -> Self {
        Self { status, error }
    }

    fn coded(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self::new(status, ApiError::new(code, message))
    }

    /// `404`. Also used when a task exists but belongs to someone else.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::coded(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// `409`.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::coded(StatusCode::CONFLICT, "CONFLICT", message)
    }

    /// `500`. Callers log the cause; `message` reaches the client.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::coded(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let Self { status, error } = self;
        (status, Json(error)).into_response()
    }
}

impl From<RepositoryError> for ApiErrorResponse {
    fn from(error: RepositoryError) -> Self {
        match &error {
            // Reaches here only if a referenced row went away mid-request.
            RepositoryError::NotFound(detail) => {
                tracing::debug!(%detail, "referenced row missing at write time");
                Self::not_found("No matching record")
            }
            RepositoryError::Conflict(detail) => {
                tracing::debug!(%detail, "unique key already taken");
                Self::conflict("That record already exists")
            }
            RepositoryError::DatabaseError(_) => {
                tracing::error!(%error, "storage backend failed");
                Self::internal_error(INTERNAL_MESSAGE)
            }
        }
    }
}

impl From<PasswordError> for ApiErrorResponse {
    fn from(error: PasswordError) -> Self {
        tracing::error!(%error, "password hashing failed");
        Self::internal_error(INTERNAL_MESSAGE)
    }
}

// =============================================================================
// ValidationError
// =============================================================================

/// Every problem found in one form submission, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn has_error(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }

    /// `Ok(value)` when nothing was pushed.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one problem was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

// =============================================================================
// AuthRequired
// =============================================================================

pub const LOGIN_PATH: &str = "/login/";

/// Rejection for pages that need a logged-in user.
///
/// Answers `303 See Other` to [`LOGIN_PATH`] with the refused path in
/// `next`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequired {
    /// Path and query of the refused request.
    pub next: String,
}

impl AuthRequired {
    #[must_use]
    pub fn new(next: impl Into<String>) -> Self {
        Self { next: next.into() }
    }

    #[must_use]
    pub fn login_url(&self) -> String {
        serde_urlencoded::to_string([("next", self.next.as_str())])
            .map_or_else(|_| LOGIN_PATH.to_owned(), |query| format!("{LOGIN_PATH}?{query}"))
    }
}

impl IntoResponse for AuthRequired {
    fn into_response(self) -> Response {
        Redirect::to(&self.login_url()).into_response()
    }
}
