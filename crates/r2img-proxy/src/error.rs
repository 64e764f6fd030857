//! Error types for the r2img proxy

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use blob_store_client::BlobStoreError;
use disk_blob_cache::CacheError;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum ProxyError {
    Config(String),
    /// Missing or wrong bearer key on upload
    Auth,
    /// Upload extension outside png/jpg/jpeg/webp
    UnsupportedType(String),
    /// Codec asked to decode a format it does not handle
    UnsupportedFormat(String),
    Decode(String),
    Encode(String),
    EntropyUnavailable(String),
    Remote(BlobStoreError),
    Cache(CacheError),
    /// Malformed multipart body, missing `file` field, or body over the limit
    Upload(String),
    InvalidToken(String),
    Io(Box<std::io::Error>),
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ProxyError::Auth => write!(f, "Authentication failed: invalid authorization header"),
            ProxyError::UnsupportedType(ext) => write!(f, "Unsupported file type: {:?}", ext),
            ProxyError::UnsupportedFormat(ext) => write!(f, "Unsupported image format: {:?}", ext),
            ProxyError::Decode(msg) => write!(f, "Image decode failed: {}", msg),
            ProxyError::Encode(msg) => write!(f, "WebP encode failed: {}", msg),
            ProxyError::EntropyUnavailable(msg) => {
                write!(f, "Random source unavailable: {}", msg)
            }
            ProxyError::Remote(err) => write!(f, "Remote store error: {}", err),
            ProxyError::Cache(err) => write!(f, "Cache error: {}", err),
            ProxyError::Upload(msg) => write!(f, "Upload error: {}", msg),
            ProxyError::InvalidToken(token) => write!(f, "Invalid image name: {:?}", token),
            ProxyError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ProxyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProxyError::Remote(err) => Some(err),
            ProxyError::Cache(err) => Some(err),
            ProxyError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidToken(_) => StatusCode::BAD_REQUEST,
            ProxyError::Cache(err) if err.is_out_of_space() => StatusCode::INSUFFICIENT_STORAGE,
            // Authentication failures included: callers only ever see a generic 500.
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match status {
            StatusCode::BAD_REQUEST => {
                tracing::warn!(error = %self, "Rejected request");
                "Invalid image name"
            }
            StatusCode::INSUFFICIENT_STORAGE => {
                tracing::error!(error = %self, "Local cache out of space");
                "Insufficient storage"
            }
            _ => {
                tracing::error!(error = %self, "Internal server error");
                "Internal server error"
            }
        };

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

impl From<BlobStoreError> for ProxyError {
    fn from(err: BlobStoreError) -> Self {
        ProxyError::Remote(err)
    }
}

impl From<CacheError> for ProxyError {
    fn from(err: CacheError) -> Self {
        ProxyError::Cache(err)
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        ProxyError::Io(Box::new(err))
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::Config(err.to_string())
    }
}

impl From<tracing_subscriber::filter::ParseError> for ProxyError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        ProxyError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
