use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::fmt;

use crate::templates_structs::ApiErrorResponse;

#[derive(Debug)]
pub enum AppError {
    Db(sqlx::Error),
    Template(askama::Error),
    /// Unexpected failure of a non-best-effort step. Only `context` reaches the client.
    Internal { context: &'static str, detail: String },
    NotFound(String),
    Forbidden(String),
    Validation(String),
    Unauthorized(String),
    Upstream(String),
}

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{what} not found"))
    }

    /// Replace internal failures with a generic per-operation message.
    /// Client-facing errors pass through untouched.
    pub fn with_context(self, context: &'static str) -> Self {
        match self {
            AppError::Db(_) | AppError::Template(_) => AppError::Internal {
                context,
                detail: self.to_string(),
            },
            AppError::Internal { detail, .. } => AppError::Internal { context, detail },
            other => other,
        }
    }
}

pub trait ResultExt<T> {
    fn or_fail(self, context: &'static str) -> Result<T, AppError>;
}

impl<T, E: Into<AppError>> ResultExt<T> for Result<T, E> {
    fn or_fail(self, context: &'static str) -> Result<T, AppError> {
        self.map_err(|e| e.into().with_context(context))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Template(e) => write!(f, "Template error: {e}"),
            AppError::Internal { context, detail } => write!(f, "{context}: {detail}"),
            AppError::NotFound(msg)
            | AppError::Forbidden(msg)
            | AppError::Validation(msg)
            | AppError::Unauthorized(msg)
            | AppError::Upstream(msg) => write!(f, "{msg}"),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Db(_) | AppError::Template(_) | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Internal { context, .. } => {
                log::error!("{self}");
                context.to_string()
            }
            AppError::Db(_) | AppError::Template(_) => {
                log::error!("{self}");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ApiErrorResponse {
            error: message,
            details: None,
        })
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Db(e)
    }
}

impl From<askama::Error> for AppError {
    fn from(e: askama::Error) -> Self {
        AppError::Template(e)
    }
}

/// Failure of an outbound call to the identity provider, blob store or email API.
#[derive(Debug, Clone)]
pub struct UpstreamError {
    pub service: &'static str,
    pub detail: String,
}

impl UpstreamError {
    pub fn new(service: &'static str, detail: impl fmt::Display) -> Self {
        UpstreamError {
            service,
            detail: detail.to_string(),
        }
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} call failed: {}", self.service, self.detail)
    }
}

impl From<UpstreamError> for AppError {
    fn from(e: UpstreamError) -> Self {
        AppError::Upstream(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_hides_internal_detail() {
        let err = AppError::Db(sqlx::Error::RowNotFound).with_context("Error loading forms");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        match err {
            AppError::Internal { context, detail } => {
                assert_eq!(context, "Error loading forms");
                assert!(detail.contains("Database error"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn context_keeps_client_errors() {
        let err = AppError::not_found("Form").with_context("Error loading form");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Form not found");
    }
}
