//! Error types for the disk blob cache

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum CacheError {
    /// No entry is stored under the key.
    NotFound(String),
    /// The device holding the cache root has no space left.
    OutOfSpace(Box<io::Error>),
    /// The key is not a path-safe token.
    InvalidKey(String),
    Io(Box<io::Error>),
}

impl CacheError {
    /// Classify an I/O error from a write, separating device exhaustion
    /// from every other failure.
    pub fn from_write(err: io::Error) -> Self {
        if is_storage_full(&err) {
            CacheError::OutOfSpace(Box::new(err))
        } else {
            CacheError::Io(Box::new(err))
        }
    }

    pub fn is_out_of_space(&self) -> bool {
        matches!(self, CacheError::OutOfSpace(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }
}

const ENOSPC: i32 = 28;

fn is_storage_full(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::StorageFull || (cfg!(unix) && err.raw_os_error() == Some(ENOSPC))
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::NotFound(key) => write!(f, "Cache entry not found: {}", key),
            CacheError::OutOfSpace(err) => write!(f, "No space left for cache write: {}", err),
            CacheError::InvalidKey(key) => write!(f, "Invalid cache key: {:?}", key),
            CacheError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::OutOfSpace(err) | CacheError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for CacheError {
    fn from(err: io::Error) -> Self {
        CacheError::Io(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_full_is_out_of_space() {
        let err = CacheError::from_write(io::Error::from(io::ErrorKind::StorageFull));
        assert!(err.is_out_of_space());
    }

    #[cfg(unix)]
    #[test]
    fn test_enospc_is_out_of_space() {
        let err = CacheError::from_write(io::Error::from_raw_os_error(ENOSPC));
        assert!(err.is_out_of_space());
    }

    #[test]
    fn test_other_write_errors_are_io() {
        let err = CacheError::from_write(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(!err.is_out_of_space());
        assert!(matches!(err, CacheError::Io(_)));
    }

    #[test]
    fn test_not_found_display() {
        let err = CacheError::NotFound("abc.webp".to_string());
        assert_eq!(format!("{}", err), "Cache entry not found: abc.webp");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_invalid_key_display() {
        let err = CacheError::InvalidKey("../etc".to_string());
        assert_eq!(format!("{}", err), "Invalid cache key: \"../etc\"");
    }
}
