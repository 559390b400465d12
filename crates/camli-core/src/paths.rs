//! Canonical per-user locations for the camli client
//!
//! Every path the resolvers probe is derived here, so all crates agree on
//! where the configuration and keyrings live and tests can redirect them
//! through `CAMLI_CONFIG_DIR`.
//!
//! # Layout
//!
//! ```text
//! <config dir>/
//! ├── config                  (JSON object, see `config::keys`)
//! └── identity-secring.gpg    (identity secret keyring, optional)
//! ```
//!
//! # Precedence
//!
//! 1. `CAMLI_CONFIG_DIR` environment variable (if set and non-blank)
//! 2. `dirs::config_dir()` joined with `camlistore`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "CAMLI_CONFIG_DIR";

/// File name of the JSON configuration inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config";

/// File name of the identity secret keyring inside the config directory.
pub const IDENTITY_SECRET_RING_NAME: &str = "identity-secring.gpg";

/// Get the camli config directory
///
/// # Errors
///
/// Returns an error if `CAMLI_CONFIG_DIR` is not set and the platform
/// config directory cannot be determined.
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    dirs::config_dir()
        .map(|dir| dir.join("camlistore"))
        .context("Could not determine user config directory")
}

/// Path of the JSON configuration file.
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Path of the identity secret keyring (may not exist).
pub fn identity_secret_ring() -> Result<PathBuf> {
    Ok(config_dir()?.join(IDENTITY_SECRET_RING_NAME))
}

/// GnuPG's legacy default secret keyring, `~/.gnupg/secring.gpg`.
///
/// Returns `None` when the home directory cannot be determined.
pub fn default_secret_ring() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".gnupg").join("secring.gpg"))
}
