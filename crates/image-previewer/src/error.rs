//! Error types for the previewer

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use file_blob_store::BlobStoreError;
use origin_fetcher::FetchError;
use serde_json::json;
use std::fmt;

/// Failures while turning source bytes into a resized JPEG
#[derive(Debug)]
pub enum TransformError {
    Decode(image::ImageError),
    Encode(image::ImageError),
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformError::Decode(err) => write!(f, "failed to decode JPEG: {}", err),
            TransformError::Encode(err) => write!(f, "failed to encode JPEG: {}", err),
        }
    }
}

impl std::error::Error for TransformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransformError::Decode(err) | TransformError::Encode(err) => Some(err),
        }
    }
}

#[derive(Debug)]
pub enum PreviewError {
    /// Malformed fill parameters
    Parameter(String),
    Fetch(FetchError),
    Transform(TransformError),
    /// Resized image could not be written to the blob store
    Persist(BlobStoreError),
    Internal(String),
    Config(String),
}

/// Failure category reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Parameter,
    NotFound,
    UnsupportedMedia,
    TooLarge,
    BadGateway,
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Parameter => "parameter",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::UnsupportedMedia => "unsupported_media",
            ErrorCategory::TooLarge => "too_large",
            ErrorCategory::BadGateway => "bad_gateway",
            ErrorCategory::Internal => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCategory::Parameter => StatusCode::BAD_REQUEST,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::UnsupportedMedia => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorCategory::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCategory::BadGateway => StatusCode::BAD_GATEWAY,
            ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl PreviewError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PreviewError::Parameter(_) => ErrorCategory::Parameter,
            PreviewError::Fetch(err) => match err {
                FetchError::NotFound(_) => ErrorCategory::NotFound,
                FetchError::UnsupportedMedia(_) => ErrorCategory::UnsupportedMedia,
                FetchError::TooLarge { .. } => ErrorCategory::TooLarge,
                FetchError::Transport(_) | FetchError::OriginStatus(_) => {
                    ErrorCategory::BadGateway
                }
                FetchError::InvalidRequest(_) => ErrorCategory::Internal,
            },
            PreviewError::Transform(_)
            | PreviewError::Persist(_)
            | PreviewError::Internal(_)
            | PreviewError::Config(_) => ErrorCategory::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.category().status_code()
    }
}

impl fmt::Display for PreviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewError::Parameter(msg) => write!(f, "Invalid parameters: {}", msg),
            PreviewError::Fetch(err) => write!(f, "Fetch error: {}", err),
            PreviewError::Transform(err) => write!(f, "Transform error: {}", err),
            PreviewError::Persist(err) => write!(f, "Persist error: {}", err),
            PreviewError::Internal(msg) => write!(f, "Internal error: {}", msg),
            PreviewError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for PreviewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PreviewError::Fetch(err) => Some(err),
            PreviewError::Transform(err) => Some(err),
            PreviewError::Persist(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FetchError> for PreviewError {
    fn from(err: FetchError) -> Self {
        PreviewError::Fetch(err)
    }
}

impl From<TransformError> for PreviewError {
    fn from(err: TransformError) -> Self {
        PreviewError::Transform(err)
    }
}

impl From<BlobStoreError> for PreviewError {
    fn from(err: BlobStoreError) -> Self {
        PreviewError::Persist(err)
    }
}

impl From<tracing_subscriber::filter::ParseError> for PreviewError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        PreviewError::Config(err.to_string())
    }
}

impl IntoResponse for PreviewError {
    fn into_response(self) -> Response {
        let category = self.category();
        if category == ErrorCategory::Internal {
            tracing::error!(error = %self, "Internal server error");
        }

        (
            category.status_code(),
            axum::Json(json!({
                "error": self.to_string(),
                "category": category.as_str(),
            })),
        )
            .into_response()
    }
}

pub type Result<T> = std::result::Result<T, PreviewError>;
