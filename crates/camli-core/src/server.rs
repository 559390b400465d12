//! Server URL resolution
//!
//! An explicit override (the `--server` flag) always wins and is never merged
//! with the stored configuration. Otherwise the `server` key is required.

use crate::config::{json_type_name, keys, ConfigError, ConfigStore};
use std::path::PathBuf;
use thiserror::Error;

/// Server resolution error
///
/// All variants are fatal for callers that need to reach a server.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServerError {
    /// No usable `server` key and no override
    #[error("Missing or invalid \"server\" in {}", path.display())]
    Missing { path: PathBuf },

    /// `server` is present but not a string
    #[error("Invalid \"server\" in {}: expected a string, got {found}", path.display())]
    InvalidType { path: PathBuf, found: &'static str },

    /// The configuration itself could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Normalize a server address
///
/// Strips one trailing slash and prepends `https://` when neither `http://`
/// nor `https://` is present. The scheme is matched in any case and written
/// back lowercase. Normalizing a normalized value is a no-op.
///
/// ```
/// use camli_core::server::normalize_server;
///
/// assert_eq!(normalize_server("example.com:3179/"), "https://example.com:3179");
/// assert_eq!(normalize_server("http://localhost/alt-root"), "http://localhost/alt-root");
/// assert_eq!(normalize_server("HTTPS://Example.com"), "https://Example.com");
/// ```
pub fn normalize_server(raw: &str) -> String {
    let trimmed = raw.strip_suffix('/').unwrap_or(raw);
    match split_scheme(trimmed) {
        Some((scheme, rest)) => format!("{scheme}{rest}"),
        None => format!("https://{trimmed}"),
    }
}

fn split_scheme(server: &str) -> Option<(&'static str, &str)> {
    ["https://", "http://"].into_iter().find_map(|scheme| {
        let prefix = server.get(..scheme.len())?;
        prefix
            .eq_ignore_ascii_case(scheme)
            .then(|| (scheme, &server[scheme.len()..]))
    })
}

/// Resolve the effective server URL
///
/// A non-empty `explicit` override is normalized and returned without
/// touching configuration. Otherwise the configuration is loaded and its
/// `server` key must be a non-empty string.
pub fn resolve_server(explicit: Option<&str>, store: &ConfigStore) -> Result<String, ServerError> {
    if let Some(server) = explicit.filter(|s| !s.is_empty()) {
        return Ok(normalize_server(server));
    }

    let state = store.load()?;
    let missing = || ServerError::Missing {
        path: store.path().to_path_buf(),
    };

    match state.get(keys::SERVER) {
        None => Err(missing()),
        Some(value) => match value.as_str() {
            Some("") => Err(missing()),
            Some(server) => Ok(normalize_server(server)),
            None => Err(ServerError::InvalidType {
                path: store.path().to_path_buf(),
                found: json_type_name(value),
            }),
        },
    }
}
