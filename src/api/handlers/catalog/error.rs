//! Error taxonomy shared by the catalog validators, storage and handlers.

use axum::{
    Json,
    extract::{
        Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error};
use utoipa::ToSchema;

/// JSON body returned for every failed catalog request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[derive(Debug)]
pub enum CatalogError {
    /// Malformed or missing input.
    Validation(&'static str),
    /// Uniqueness or referential-safety violation.
    Conflict(&'static str),
    /// A referenced id does not exist.
    NotFound(&'static str),
    /// Failure outside the database (object storage, etc.), logged server-side.
    Unexpected(&'static str),
    Database(sqlx::Error),
}

impl CatalogError {
    /// Returns the HTTP status this error is reported with.
    /// Conflicts share `400` with validation failures to keep the public contract stable.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unexpected(_) | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to API callers.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Validation(message)
            | Self::Conflict(message)
            | Self::NotFound(message)
            | Self::Unexpected(message) => message,
            Self::Database(_) => "Internal server error",
        }
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "validation failed: {message}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::NotFound(message) => write!(f, "not found: {message}"),
            Self::Unexpected(message) => write!(f, "unexpected failure: {message}"),
            Self::Database(err) => write!(f, "database error: {err}"),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

impl IntoResponse for CatalogError {
    /// Maps catalog failures into `{ "error": ... }` responses.
    /// Database and unexpected errors are logged and never leak details to the caller.
    fn into_response(self) -> Response {
        match &self {
            Self::Database(err) => error!("Database error: {err}"),
            Self::Unexpected(message) => error!("Unexpected error: {message}"),
            _ => {}
        }
        (self.status(), Json(ErrorBody::new(self.public_message()))).into_response()
    }
}

pub(crate) const INVALID_REQUEST_BODY: &str = "Invalid request body";
pub(crate) const INVALID_QUERY_STRING: &str = "Invalid query string";

/// Unwraps a JSON body, turning extractor rejections into a `{ "error": ... }` 400.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, CatalogError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            debug!("Rejected request body: {rejection}");
            Err(CatalogError::Validation(INVALID_REQUEST_BODY))
        }
    }
}

/// Unwraps query parameters, turning extractor rejections into a `{ "error": ... }` 400.
pub(crate) fn query_params<T>(
    query: Result<Query<T>, QueryRejection>,
) -> Result<T, CatalogError> {
    match query {
        Ok(Query(value)) => Ok(value),
        Err(rejection) => {
            debug!("Rejected query string: {rejection}");
            Err(CatalogError::Validation(INVALID_QUERY_STRING))
        }
    }
}

/// Returns `true` when `err` is a database unique-violation (SQLSTATE `23505`)
/// on the given constraint.
pub(super) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505")
                && db_err.constraint().is_some_and(|c| c == constraint)
        }
        _ => false,
    }
}

/// Returns `true` when `err` is a foreign-key violation (SQLSTATE `23503`).
/// On deletes this means another row still references the target.
pub(super) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23503"),
        _ => false,
    }
}

/// Name of the constraint a database error was raised for, if any.
pub(super) fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn conflict_and_validation_map_to_bad_request() {
        assert_eq!(
            CatalogError::Validation("Name is required").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CatalogError::Conflict("An author with this name already exists").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CatalogError::NotFound("Author not found").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            CatalogError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            CatalogError::Unexpected("Failed to upload image").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn unexpected_message_is_public() -> anyhow::Result<()> {
        let response = CatalogError::Unexpected("Failed to delete image").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let body: ErrorBody = serde_json::from_slice(&body)?;
        assert_eq!(body.error, "Failed to delete image");
        Ok(())
    }

    #[tokio::test]
    async fn database_errors_do_not_leak_details() -> anyhow::Result<()> {
        let response = CatalogError::Database(sqlx::Error::PoolTimedOut).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let body: ErrorBody = serde_json::from_slice(&body)?;
        assert_eq!(body.error, "Internal server error");
        Ok(())
    }

    #[tokio::test]
    async fn validation_message_is_returned_verbatim() -> anyhow::Result<()> {
        let response = CatalogError::Validation("Invalid birth date format").into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let body: ErrorBody = serde_json::from_slice(&body)?;
        assert_eq!(body.error, "Invalid birth date format");
        Ok(())
    }
}
