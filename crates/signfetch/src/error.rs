//! Error types for request signing.

use std::path::PathBuf;
use std::time::SystemTimeError;

use signfetch_config::ConfigError;

/// RSA key loading/parsing error.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum KeyError {
    /// Key file could not be read.
    #[error("failed to read key file {}", path.display())]
    Read {
        /// Path of the key file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// PKCS#1 key parsing error (returned when both formats fail).
    #[error("PKCS#1 key error")]
    Pkcs1(#[from] rsa::pkcs1::Error),

    /// PKCS#8 key parsing error.
    #[error("PKCS#8 key error")]
    Pkcs8(#[from] rsa::pkcs8::Error),

    /// Key without PEM armour is not valid base64.
    #[error("invalid base64 in key")]
    Base64(#[from] base64::DecodeError),

    /// Encrypted key loaded without a passphrase.
    #[error("encrypted private key requires a passphrase")]
    PassphraseRequired,
}

/// Failure while building or signing a request.
///
/// Each signing call fails independently; no shared state is left behind.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SigningError {
    /// Target URL cannot be split into scheme, authority and path.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// URL as supplied by the caller.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Only GET and POST requests can be signed.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// The signature algorithm failed.
    #[error("failed to compute signature")]
    Signature(#[source] rsa::signature::Error),

    /// System clock is before the Unix epoch.
    #[error("failed to read system clock")]
    Clock(#[from] SystemTimeError),
}

/// Signing setup cannot proceed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// Invalid or incomplete configuration.
    #[error("configuration error")]
    Config(#[from] ConfigError),

    /// Private key missing or unparseable.
    #[error("signing key error")]
    Key(#[from] KeyError),
}

/// Error from [`SigningFetcher::fetch`](crate::SigningFetcher::fetch).
#[derive(Debug, thiserror::Error)]
pub enum FetchError<E: std::error::Error + 'static> {
    /// The request could not be signed and was not sent.
    #[error("failed to sign request")]
    Signing(#[from] SigningError),

    /// The transport failed; the error is passed through untouched.
    #[error("transport error")]
    Transport(#[source] E),
}
