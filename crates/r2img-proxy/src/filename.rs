//! Opaque object names for ingested images

use crate::error::{ProxyError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;

/// Length of every generated token
pub const TOKEN_LEN: usize = 30;
const RANDOM_BYTES: usize = 18;

/// Millisecond timestamp followed by base64url randomness, cut to 30 chars.
///
/// Uniqueness is probabilistic; nothing checks for an existing object.
pub fn generate() -> Result<String> {
    generate_with(Utc::now().timestamp_millis(), &mut OsRng)
}

fn generate_with<R: RngCore>(millis: i64, rng: &mut R) -> Result<String> {
    let mut random = [0u8; RANDOM_BYTES];
    rng.try_fill_bytes(&mut random)
        .map_err(|e| ProxyError::EntropyUnavailable(e.to_string()))?;

    let mut token = format!("{}{}", millis, URL_SAFE_NO_PAD.encode(random));
    token.truncate(TOKEN_LEN);
    Ok(token)
}
