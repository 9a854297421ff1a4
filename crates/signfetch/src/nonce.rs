//! Nonce and timestamp generation.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngExt;

use crate::error::SigningError;

/// Source of `oauth_nonce` and `oauth_timestamp` values.
///
/// Shared by every signing call of a fetcher, so implementations must be safe
/// to call from many threads and must not hand the same nonce to two callers.
pub trait NonceSource: Send + Sync {
    /// A fresh, unpredictable nonce.
    fn nonce(&self) -> String;

    /// Current Unix time in seconds.
    fn timestamp(&self) -> Result<u64, SigningError>;
}

/// Random 128-bit nonces from the thread-local CSPRNG and the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomNonceSource;

impl NonceSource for RandomNonceSource {
    /// 32 hex characters.
    fn nonce(&self) -> String {
        let bytes: [u8; 16] = rand::rng().random();
        hex::encode(bytes)
    }

    fn timestamp(&self) -> Result<u64, SigningError> {
        Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
    }
}
