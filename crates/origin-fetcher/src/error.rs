//! Error types for the origin fetcher

use std::fmt;

#[derive(Debug)]
pub enum FetchError {
    /// Request could not be sent over either scheme, or the body stream broke
    Transport(Box<reqwest::Error>),
    /// Request could not be built, so neither scheme was worth trying
    InvalidRequest(Box<reqwest::Error>),
    /// Origin answered 404
    NotFound(String),
    /// Origin answered with some other non-success status
    OriginStatus(u16),
    /// Declared content type is not JPEG
    UnsupportedMedia(String),
    /// Body exceeded the download ceiling
    TooLarge { limit: u64 },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(err) => write!(f, "error sending request: {}", err),
            FetchError::InvalidRequest(err) => write!(f, "invalid origin request: {}", err),
            FetchError::NotFound(url) => write!(f, "content not found: {}", url),
            FetchError::OriginStatus(status) => write!(f, "origin returned status {}", status),
            FetchError::UnsupportedMedia(content_type) => {
                write!(f, "not a JPEG image (content type {:?})", content_type)
            }
            FetchError::TooLarge { limit } => {
                write!(f, "data exceeds limit of {} bytes", limit)
            }
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Transport(err) | FetchError::InvalidRequest(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
