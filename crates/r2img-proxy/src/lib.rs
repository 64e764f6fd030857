//! r2img proxy
//!
//! Accepts PNG, JPEG and WebP uploads, normalizes them to WebP and stores
//! them in a remote blob store. Reads are served from a local disk cache that
//! is filled on first access and trimmed by access-time ordered eviction when
//! the disk fills up.

pub mod codec;
pub mod config;
pub mod error;
pub mod filename;
pub mod ingest;
pub mod retrieval;
pub mod server;
pub mod types;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{ProxyError, Result};
