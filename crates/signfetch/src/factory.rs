//! Builds signing fetchers from configuration.

use signfetch_config::Config;

use crate::error::ConfigurationError;
use crate::fetcher::SigningFetcher;
use crate::key::{KeyCache, KeyMaterial};
use crate::params::Canonicalizer;

/// Holds the container key and hands out fetchers for any transport.
#[derive(Debug, Clone)]
pub struct SigningFetcherFactory {
    key: KeyMaterial,
    canonicalizer: Canonicalizer,
}

impl SigningFetcherFactory {
    /// Factory with the built-in deny table.
    pub fn new(key: KeyMaterial) -> Self {
        Self {
            key,
            canonicalizer: Canonicalizer::new(),
        }
    }

    /// Load the key named by `[signing]` through the process-wide [`KeyCache`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the section is missing or invalid, or
    /// the key cannot be read or parsed.
    pub fn from_config(config: &Config) -> Result<Self, ConfigurationError> {
        Self::from_config_with_cache(config, KeyCache::global())
    }

    /// Like [`from_config`](Self::from_config) with an explicit key cache.
    pub fn from_config_with_cache(
        config: &Config,
        cache: &KeyCache,
    ) -> Result<Self, ConfigurationError> {
        let signing = config.require_signing()?;
        let private_key = cache.load(&signing.key_file, signing.key_passphrase.as_deref())?;

        tracing::info!(
            key_file = %signing.key_file.display(),
            key_name = signing.key_name.as_deref().unwrap_or("<none>"),
            "Signing key loaded"
        );

        Ok(Self {
            key: KeyMaterial::new(private_key, signing.key_name.clone()),
            canonicalizer: Canonicalizer::new().with_denied(&config.params.deny),
        })
    }

    pub fn key(&self) -> &KeyMaterial {
        &self.key
    }

    /// A fetcher that signs with this factory's key and sends through `transport`.
    pub fn get_signing_fetcher<F>(&self, transport: F) -> SigningFetcher<F> {
        SigningFetcher::new(transport, &self.key).with_canonicalizer(self.canonicalizer.clone())
    }
}
