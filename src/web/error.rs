use crate::core::OrmError;
use crate::export::ExportError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub enum WebError {
    Orm(OrmError),
    Export(ExportError),
    Input(String),
    NotFound(String),
    Unauthorized(String),
    Internal(String),
}

impl WebError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn unauthorized(permission: &str) -> Self {
        Self::Unauthorized(format!("Permission '{}' is not granted", permission))
    }
}

impl From<OrmError> for WebError {
    fn from(err: OrmError) -> Self {
        WebError::Orm(err)
    }
}

impl From<ExportError> for WebError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Orm(err) => WebError::Orm(err),
            err => WebError::Export(err),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            WebError::Orm(OrmError::ModelNotFound(name)) => (
                StatusCode::NOT_FOUND,
                format!("Model '{}' not found", name),
                "not_found".to_string(),
            ),
            WebError::Orm(err @ OrmError::EntryNotFound(..)) => {
                (StatusCode::NOT_FOUND, err.to_string(), "not_found".to_string())
            }
            WebError::Orm(err @ (OrmError::ParseError(_) | OrmError::FieldNotFound(..))) => {
                (StatusCode::BAD_REQUEST, err.to_string(), "parse_error".to_string())
            }
            WebError::Orm(OrmError::Validation(err)) => {
                (StatusCode::BAD_REQUEST, err.to_string(), "validation_error".to_string())
            }
            WebError::Orm(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                err.to_string(),
                "orm_error".to_string(),
            ),

            WebError::Export(err @ ExportError::UnsupportedFormat(_)) => {
                (StatusCode::NOT_FOUND, err.to_string(), "not_found".to_string())
            }
            WebError::Export(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                err.to_string(),
                "export_error".to_string(),
            ),

            WebError::Input(msg) => (StatusCode::BAD_REQUEST, msg, "input_error".to_string()),
            WebError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "not_found".to_string()),
            WebError::Unauthorized(msg) => (StatusCode::FORBIDDEN, msg, "unauthorized".to_string()),
            WebError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg,
                "internal_error".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            code,
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, WebError>;
