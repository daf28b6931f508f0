use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::repo::RepoError;

/// Field name -> messages, rendered as `{"email": ["..."]}`.
pub type FieldErrors = BTreeMap<&'static str, Vec<String>>;

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("invalid registration input")]
    Validation(FieldErrors),
    #[error("email already registered")]
    Conflict,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email and password are required")]
    MissingCredentials,
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid Credentials")]
    InvalidCredentials,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<RepoError> for RegisterError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate => RegisterError::Conflict,
            RepoError::Storage(e) => RegisterError::Internal(e),
        }
    }
}

impl From<RepoError> for AuthError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate => AuthError::Internal(anyhow::anyhow!("unexpected duplicate")),
            RepoError::Storage(e) => AuthError::Internal(e),
        }
    }
}

fn internal_response(err: &anyhow::Error) -> Response {
    error!(error = ?err, "internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal Server Error" })),
    )
        .into_response()
}

impl IntoResponse for RegisterError {
    fn into_response(self) -> Response {
        match self {
            RegisterError::Validation(fields) => {
                (StatusCode::BAD_REQUEST, Json(fields)).into_response()
            }
            RegisterError::Conflict => (
                StatusCode::CONFLICT,
                Json(json!({ "email": ["user with this email already exists."] })),
            )
                .into_response(),
            RegisterError::Internal(e) => internal_response(&e),
        }
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingCredentials => StatusCode::BAD_REQUEST,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::InvalidCredentials | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Collapse `UserNotFound` into `InvalidCredentials` unless account existence may be revealed.
    pub fn conceal_unknown_user(self, reveal: bool) -> Self {
        match self {
            AuthError::UserNotFound if !reveal => AuthError::InvalidCredentials,
            other => other,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::Internal(e) = &self {
            return internal_response(e);
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
