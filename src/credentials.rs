//! API key loading.
//!
//! The key comes from the process environment. A `KEY=VALUE` settings file is
//! loaded into the environment first when it exists; variables already set in
//! the environment win over the file.

use crate::error::{Error, Result};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// A non-empty API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps a key, rejecting blank values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] if `value` is empty or whitespace.
    pub fn new(var: &str, value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(Error::MissingCredential {
                var: var.to_string(),
            });
        }
        Ok(Self(value))
    }

    /// Returns the secret for use in an `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Loads the API key from `var`, seeding the environment from `env_file`.
///
/// # Errors
///
/// Returns an error if:
/// - The settings file exists but is malformed
/// - The variable is absent, not unicode, or blank
pub fn load_api_key(env_file: &Path, var: &str) -> Result<ApiKey> {
    if env_file.is_file() {
        dotenvy::from_path(env_file).map_err(|e| Error::EnvFile {
            path: env_file.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!("Loaded settings from {}", env_file.display());
    } else {
        debug!("No settings file at {}", env_file.display());
    }

    let value = std::env::var(var).map_err(|_| Error::MissingCredential {
        var: var.to_string(),
    })?;

    ApiKey::new(var, value)
}
