//! Remote Blob Store Client
//!
//! Uploads canonical WebP images to the backing blob store and fetches them
//! back by name. Every request carries the store's bearer API key, and any
//! status other than 200 is treated as a failure.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::{BlobStoreClient, RemoteStore, CANONICAL_EXTENSION, CANONICAL_MIME};
pub use error::{BlobStoreError, Result};
