//! OAuth 1.0 signed fetch for gadget containers.
//!
//! A container proxies requests from gadgets to third-party services and
//! signs them with its own RSA key, asserting the owner, viewer and app the
//! request is made for. The target service verifies the signature with the
//! container's published certificate.
//!
//! # Pipeline
//!
//! [`SigningFetcher::fetch`] runs four steps:
//!
//! 1. [`Canonicalizer`] strips proxy control parameters and every client
//!    parameter under a reserved prefix, then appends identity and OAuth
//!    parameters.
//! 2. The signature base string (RFC 5849 Section 3.4.1) is signed by a
//!    [`SignatureMethod`], by default [`RsaSha1`].
//! 3. [`rebuild`] produces the outgoing [`SignedRequest`]: a GET query string,
//!    or a POST body plus query string.
//! 4. The request goes to the injected [`RemoteContentFetcher`].
//!
//! Signing does no I/O and a fetcher may be shared between threads.
//!
//! # Example
//!
//! ```ignore
//! use signfetch::{FetchRequest, SigningFetcherFactory, SigningIdentity, UreqFetcher};
//! use signfetch_config::Config;
//!
//! let config = Config::load(None)?;
//! let factory = SigningFetcherFactory::from_config(&config)?;
//! let fetcher = factory.get_signing_fetcher(UreqFetcher::from_config(&config.transport));
//!
//! let identity = SigningIdentity::default().with_owner("42").with_app("7");
//! let response = fetcher.fetch(&FetchRequest::get("https://api.example/feed"), &identity)?;
//! ```

mod error;
mod factory;
mod fetcher;
mod key;
mod nonce;
mod params;
mod rebuild;
mod signature;
mod transport;

#[cfg(test)]
mod test_support;

pub use error::{ConfigurationError, FetchError, KeyError, SigningError};
pub use factory::SigningFetcherFactory;
pub use fetcher::{FetchRequest, RemoteContentFetcher, SigningFetcher};
pub use key::{KeyCache, KeyMaterial, load_private_key, load_private_key_from_file};
pub use nonce::{NonceSource, RandomNonceSource};
pub use params::{
    Canonicalizer, DEFAULT_DENIED_PARAMS, Parameter, ParameterOrigin, ParameterSet,
    RESERVED_PREFIXES, SignerContext, SigningIdentity, SigningOptions, decode_form,
};
pub use rebuild::{SignedRequest, rebuild};
pub use signature::{
    OAUTH_SIGNATURE, RsaSha1, SignatureMethod, sign_parameters, signature_base_string,
};
pub use transport::{RemoteResponse, UreqFetcher};
