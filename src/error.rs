//! Error handler for taskhub.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use sqlx::Error as SQLxError;
use thiserror::Error;
use validator::ValidationErrors;

pub type Result<T> = std::result::Result<T, ServerError>;

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Axum(#[from] JsonRejection),

    #[error(transparent)]
    Query(#[from] QueryRejection),

    #[error("SQL request failed: {0}")]
    Sql(#[from] SQLxError),

    #[error("user already exists")]
    Conflict,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("user account has been deactivated, contact the administrator")]
    Deactivated,

    #[error("not authorized, try login again")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("system clock error")]
    Time(#[from] std::time::SystemTimeError),

    #[error("password hashing failed")]
    Crypto(#[from] crate::crypto::CryptoError),

    #[error("internal server error, {details}")]
    Internal { details: String },
}

/// Structure for failure responses.
///
/// Every failure leaves the server as `{"status": false, "message": ...}`,
/// with a `fields` list attached for validation errors.
#[derive(Debug, Serialize)]
pub struct ResponseError {
    status: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<FieldError>>,
    #[serde(skip)]
    code: StatusCode,
}

impl ResponseError {
    /// Update error status code.
    pub fn code(mut self, code: StatusCode) -> Self {
        self.code = code;
        self
    }

    /// Update `message` field.
    pub fn message(mut self, message: &str) -> Self {
        self.message = message.into();
        self
    }

    /// Automatically add `fields` entries.
    pub fn errors(mut self, errors: &ValidationErrors) -> Self {
        self.fields = Some(parse_validation_errors(errors));
        self
    }

    /// Transform [`ResponseError`] into axum [`Response`].
    pub fn into_response(self) -> std::result::Result<Response, axum::http::Error> {
        if let Ok(body) = serde_json::to_string(&self) {
            Response::builder()
                .status(self.code)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
        } else {
            Ok(internal_server_error())
        }
    }
}

impl Default for ResponseError {
    fn default() -> Self {
        Self {
            status: false,
            message: "Internal server error.".to_owned(),
            fields: None,
            code: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct FieldError {
    field: String,
    message: String,
}

fn parse_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| FieldError {
                field: field.to_string(),
                message: issue.to_string(),
            })
        })
        .collect()
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let response = ResponseError::default()
            .message(&self.to_string())
            .code(StatusCode::BAD_REQUEST);

        let response = match &self {
            ServerError::Validation(validation_errors) => response.errors(validation_errors),

            ServerError::Axum(rejection) => response.message(&rejection.body_text()),

            ServerError::Query(rejection) => response.message(&rejection.body_text()),

            ServerError::Conflict => response.code(StatusCode::CONFLICT),

            ServerError::InvalidCredentials
            | ServerError::Deactivated
            | ServerError::Unauthorized => response.code(StatusCode::UNAUTHORIZED),

            ServerError::NotFound(_) => response.code(StatusCode::NOT_FOUND),

            // Concurrent duplicate writes slip past existence pre-checks and
            // land on the unique constraint instead.
            ServerError::Sql(err)
                if err
                    .as_database_error()
                    .is_some_and(|db_err| db_err.is_unique_violation()) =>
            {
                response
                    .message(&ServerError::Conflict.to_string())
                    .code(StatusCode::CONFLICT)
            },

            ServerError::Sql(err) => {
                tracing::error!(err = %err, "database failure, server returned 500 status");
                ResponseError::default()
            },

            ServerError::Token(_) | ServerError::Time(_) | ServerError::Crypto(_) => {
                tracing::error!(err = %self, "server returned 500 status");
                ResponseError::default()
            },

            ServerError::Internal { details } => {
                tracing::error!(%details, "server returned 500 status");
                ResponseError::default()
            },
        };

        response
            .into_response()
            .unwrap_or_else(|_| internal_server_error())
    }
}

fn internal_server_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(
            serde_json::json!({
                "status": false,
                "message": "Internal server error.",
            })
            .to_string()
            .into(),
        )
        .unwrap_or_else(|_| Response::new("Internal server error".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let unauthorized = ServerError::Unauthorized.into_response();
        assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);

        let conflict = ServerError::Conflict.into_response();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let not_found = ServerError::NotFound("task").into_response();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let internal = ServerError::Internal {
            details: "boom".into(),
        }
        .into_response();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
