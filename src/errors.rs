use crate::services::image_service::ImageError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// HTTP-facing error: a status, a fixed message, and optionally the raw
/// error text that caused it.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<String>,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            detail: None,
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Map a service error to a response. Storage failures use `failure`
    /// as the message and carry the raw error as detail.
    pub fn from_image_error(err: ImageError, failure: &str) -> Self {
        match err {
            ImageError::NotFound(_) => Self::not_found("Image not found"),
            ImageError::MissingFile => Self::new(StatusCode::BAD_REQUEST, "No file provided"),
            ImageError::UnsupportedType(content_type) => Self::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Only JPEG and PNG images are accepted",
            )
            .with_detail(content_type),
            ImageError::Multipart(err) => {
                let status = err.status();
                let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    "File too large"
                } else {
                    "Invalid multipart data"
                };
                Self::new(status, message).with_detail(err.body_text())
            }
            other => {
                tracing::error!("{}: {}", failure, other);
                Self::internal(failure).with_detail(other.to_string())
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.message, detail),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "detail": self.detail,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn maps_service_errors_to_statuses() {
        let cases = [
            (ImageError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ImageError::MissingFile, StatusCode::BAD_REQUEST),
            (
                ImageError::UnsupportedType("text/plain".into()),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (
                ImageError::Io(io::Error::other("disk full")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from_image_error(err, "Error uploading image").status, status);
        }
    }

    #[test]
    fn storage_failures_keep_fixed_message_and_raw_detail() {
        let err = AppError::from_image_error(
            ImageError::Io(io::Error::other("disk full")),
            "Error uploading image",
        );

        assert_eq!(err.message, "Error uploading image");
        assert_eq!(err.detail.as_deref(), Some("disk full"));
        assert_eq!(err.to_string(), "Error uploading image: disk full");
    }
}
