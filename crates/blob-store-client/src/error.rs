//! Error types for the blob store client

use std::fmt;

#[derive(Debug)]
pub enum BlobStoreError {
    /// Transport failure, timeout, or client construction error
    Http(Box<reqwest::Error>),
    /// The backend answered with something other than 200
    Status { status: u16, url: String },
}

impl BlobStoreError {
    /// HTTP status returned by the backend, if it answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            BlobStoreError::Status { status, .. } => Some(*status),
            BlobStoreError::Http(err) => err.status().map(|s| s.as_u16()),
        }
    }
}

impl fmt::Display for BlobStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobStoreError::Http(err) => write!(f, "HTTP error: {}", err),
            BlobStoreError::Status { status, url } => {
                write!(f, "Blob store returned status {} for {}", status, url)
            }
        }
    }
}

impl std::error::Error for BlobStoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BlobStoreError::Http(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BlobStoreError {
    fn from(err: reqwest::Error) -> Self {
        BlobStoreError::Http(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, BlobStoreError>;
