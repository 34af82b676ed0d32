//! Error responses for the HTTP surface.
//!
//! Every failure leaves the server as
//! `{ "path", "status", "error", "message", "timestamp" }`.

use crate::error::{Error, ErrorKind};
use actix_web::{
    http::{header, StatusCode},
    HttpRequest, HttpResponse, ResponseError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Message returned for failures the client cannot act on.
pub const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred";

/// API HTTP error.
#[derive(Error, Debug)]
pub struct ApiError {
    pub http_code: StatusCode,
    pub body: ErrorBody,
}

/// JSON body of an error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub path: String,
    pub status: u16,
    /// Category label, e.g. `"Not Found"`.
    pub error: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.body.error, self.body.message)
    }
}

fn label(code: StatusCode) -> &'static str {
    match code {
        StatusCode::NOT_FOUND => "Not Found",
        StatusCode::CONFLICT => "Conflict",
        StatusCode::BAD_REQUEST => "Validation Error",
        StatusCode::SERVICE_UNAVAILABLE => "Service Unavailable",
        _ => "Internal Server Error",
    }
}

impl ApiError {
    /// Create an error with its category label derived from `http_code`.
    pub fn new(http_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            http_code,
            body: ErrorBody {
                path: String::new(),
                status: http_code.as_u16(),
                error: label(http_code).to_string(),
                message: message.into(),
                timestamp: Utc::now(),
            },
        }
    }

    /// Build Bad Request (400) error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Build Not Found (404) error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Build Conflict (409) error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Build Internal Server Error (500). The cause is logged, not returned.
    pub fn internal(cause: impl fmt::Display) -> Self {
        error!("Unexpected failure: {}", cause);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_MESSAGE)
    }

    /// Set the request path the error is reported for.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.body.path = path.into();
        self
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        let body = serde_json::to_string(&self.body).unwrap_or_default();

        HttpResponse::build(self.http_code)
            .append_header((header::CONTENT_TYPE, "application/json"))
            .body(body)
    }

    fn status_code(&self) -> StatusCode {
        self.http_code
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err.kind() {
            ErrorKind::NotFound => ApiError::not_found(err.to_string()),
            ErrorKind::Conflict => ApiError::conflict(err.to_string()),
            ErrorKind::Invalid => match err {
                Error::ValidationError(msg) => ApiError::bad_request(msg),
                other => ApiError::bad_request(other.to_string()),
            },
            ErrorKind::Unexpected => ApiError::internal(err),
        }
    }
}

/// Attach the request path while converting a core error.
pub trait ResultExt<T> {
    fn for_request(self, req: &HttpRequest) -> Result<T>;
}

impl<T> ResultExt<T> for crate::error::Result<T> {
    fn for_request(self, req: &HttpRequest) -> Result<T> {
        self.map_err(|e| ApiError::from(e).path(req.path()))
    }
}

/// Type alias for Results using ApiError
pub type Result<T> = std::result::Result<T, ApiError>;
