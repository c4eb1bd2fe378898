use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::ConfigurationError(_) => "CONFIGURATION_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
        };

        match self {
            ApiError::ValidationError(_) => HttpResponse::BadRequest().json(body),
            ApiError::NotFound(_) => HttpResponse::NotFound().json(body),
            ApiError::ConfigurationError(_) | ApiError::InternalError(_) => {
                HttpResponse::InternalServerError().json(body)
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

impl From<fraud_engine::Error> for ApiError {
    fn from(err: fraud_engine::Error) -> Self {
        match err {
            fraud_engine::Error::InvalidConfig(msg) => ApiError::ConfigurationError(msg),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
