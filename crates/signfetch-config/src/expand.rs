//! Environment variable expansion for configuration strings.
//!
//! Supports `${VAR}` (error when unset) and `${VAR:-default}`.

use std::env::VarError;

use crate::ConfigError;

/// Expand environment variable references in `value`.
///
/// `field` is the dotted config path, used in error messages.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    expand_with(value, field, |name| match std::env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(err) => Err(err),
    })
}

/// Expand using a custom variable lookup.
fn expand_with<F>(value: &str, field: &str, lookup: F) -> Result<String, ConfigError>
where
    F: FnMut(&str) -> Result<Option<String>, VarError>,
{
    shellexpand::env_with_context(value, lookup)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: match e.cause {
                VarError::NotUnicode(_) => format!("${{{}}} is not valid unicode", e.var_name),
                VarError::NotPresent => format!("${{{}}} not set", e.var_name),
            },
        })
}
