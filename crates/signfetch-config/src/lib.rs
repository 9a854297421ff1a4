//! Configuration management for signfetch.
//!
//! Parses `signfetch.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `signing.key_file`
//! - `signing.key_passphrase`
//! - `signing.key_name`
//!
//! ## Example
//!
//! ```toml
//! [signing]
//! key_file = "keys/private.pem"
//! key_passphrase = "${SIGNING_KEY_PASSPHRASE:-}"
//! key_name = "https://container.example/public.crt"
//!
//! [params]
//! deny = ["callback"]
//!
//! [transport]
//! timeout_secs = 30
//! ```

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "signfetch.toml";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Request signing configuration.
    pub signing: Option<SigningConfig>,
    /// Parameter filtering configuration.
    pub params: ParamsConfig,
    /// Outgoing HTTP configuration.
    pub transport: TransportConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Signing key configuration.
#[derive(Debug, Deserialize)]
pub struct SigningConfig {
    /// Path to the RSA private key (PEM or base64 DER).
    ///
    /// Relative paths are resolved against the config file directory.
    pub key_file: PathBuf,
    /// Passphrase for an encrypted PKCS#8 key.
    #[serde(default)]
    pub key_passphrase: Option<String>,
    /// URL where the matching public certificate is published.
    ///
    /// Sent as `xoauth_signature_publickey` on every signed request.
    #[serde(default)]
    pub key_name: Option<String>,
}

impl SigningConfig {
    /// Validate that all required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any field is empty or has invalid format.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_file.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "signing.key_file cannot be empty".to_owned(),
            ));
        }
        if let Some(ref key_name) = self.key_name {
            require_non_empty(key_name, "signing.key_name")?;
            require_http_url(key_name, "signing.key_name")?;
        }
        Ok(())
    }
}

/// Parameter filtering configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ParamsConfig {
    /// Additional proxy control parameter names to strip before signing.
    ///
    /// Extends the built-in deny table; matching is case-insensitive.
    pub deny: Vec<String>,
}

/// Outgoing HTTP configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Global request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`signing.key_file`").
        field: String,
        /// Error message (e.g., "${`SIGNING_KEY`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `signfetch.toml` in current directory and parents,
    /// falling back to defaults when none is found.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from a TOML string.
    ///
    /// Relative paths are resolved against `config_dir`.
    ///
    /// # Errors
    ///
    /// Returns error if parsing, expansion, or validation fails.
    pub fn parse(content: &str, config_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;
        config.resolve_paths(config_dir);

        // Validate configuration after loading and resolution
        config.validate()?;

        Ok(config)
    }

    /// Get validated signing configuration.
    ///
    /// Returns the signing config if the `[signing]` section is present
    /// and all fields are valid.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the section is missing or invalid.
    pub fn require_signing(&self) -> Result<&SigningConfig, ConfigError> {
        let signing = self.signing.as_ref().ok_or_else(|| {
            ConfigError::Validation("[signing] section required in config".into())
        })?;
        signing.validate()?;
        Ok(signing)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref signing) = self.signing {
            signing.validate()?;
        }

        for name in &self.params.deny {
            require_non_empty(name, "params.deny")?;
        }

        if self.transport.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "transport.timeout_secs must be greater than 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config_dir = path.parent().unwrap_or(Path::new("."));
        let mut config = Self::parse(&content, config_dir)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref mut signing) = self.signing {
            let key_file = signing.key_file.to_string_lossy();
            signing.key_file = PathBuf::from(expand::expand_env(&key_file, "signing.key_file")?);

            if let Some(ref passphrase) = signing.key_passphrase {
                let expanded = expand::expand_env(passphrase, "signing.key_passphrase")?;
                // An empty passphrase (e.g. `${VAR:-}`) means the key is not encrypted
                signing.key_passphrase = Some(expanded).filter(|p| !p.is_empty());
            }
            if let Some(ref key_name) = signing.key_name {
                signing.key_name = Some(expand::expand_env(key_name, "signing.key_name")?);
            }
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        if let Some(ref mut signing) = self.signing
            && signing.key_file.is_relative()
            && !signing.key_file.as_os_str().is_empty()
        {
            signing.key_file = config_dir.join(&signing.key_file);
        }
    }
}
