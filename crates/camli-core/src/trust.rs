//! Trusted certificate fingerprints

use crate::config::{json_type_name, keys, ConfigError, ConfigStore};
use crate::env::EnvOverrides;
use serde_json::Value;
use tracing::{debug, warn};

/// Resolve the trusted certificate fingerprints, lowercased
///
/// `CAMLI_TRUSTED_CERT` replaces the configured list entirely and skips
/// loading the config. Otherwise `trustedCerts` is read as a list of
/// strings; at the first non-string element the rest of the list is
/// ignored. A missing or non-list `trustedCerts` means nothing is trusted.
///
/// # Errors
///
/// Only a config file that cannot be loaded.
pub fn resolve_trusted_certs(
    env: &EnvOverrides,
    store: &ConfigStore,
) -> Result<Vec<String>, ConfigError> {
    if let Some(cert) = &env.trusted_cert {
        debug!("Trusting only the certificate from the environment");
        return Ok(vec![cert.to_lowercase()]);
    }

    let state = store.load()?;
    let certs = match state.get(keys::TRUSTED_CERTS) {
        None => return Ok(Vec::new()),
        Some(Value::Array(certs)) => certs,
        Some(other) => {
            warn!(
                "Ignoring \"trustedCerts\" in {:?}: expected a list, got {}",
                store.path(),
                json_type_name(other)
            );
            return Ok(Vec::new());
        }
    };

    let mut trusted = Vec::with_capacity(certs.len());
    for (index, cert) in certs.iter().enumerate() {
        match cert.as_str() {
            Some(cert) => trusted.push(cert.to_lowercase()),
            None => {
                warn!(
                    "Invalid \"trustedCerts\" element {index} in {:?}: expected a string, got {}; ignoring the rest",
                    store.path(),
                    json_type_name(cert)
                );
                break;
            }
        }
    }
    Ok(trusted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn store_with(contents: &str) -> (TempDir, ConfigStore) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config");
        fs::write(&path, contents).unwrap();
        let store = ConfigStore::from_path(path);
        (temp_dir, store)
    }

    #[test]
    fn test_lowercases_configured_certs() {
        let (_dir, store) = store_with(r#"{"trustedCerts": ["ABC123", "Def456"]}"#);
        let certs = resolve_trusted_certs(&EnvOverrides::default(), &store).unwrap();
        assert_eq!(certs, vec!["abc123", "def456"]);
    }

    #[test]
    fn test_non_string_element_stops_processing() {
        let (_dir, store) = store_with(r#"{"trustedCerts": ["AA11", 42, "BB22"]}"#);
        let certs = resolve_trusted_certs(&EnvOverrides::default(), &store).unwrap();
        assert_eq!(certs, vec!["aa11"]);
    }

    #[test]
    fn test_missing_or_non_list_is_empty() {
        let (_dir, store) = store_with(r#"{"server": "example.com"}"#);
        assert!(resolve_trusted_certs(&EnvOverrides::default(), &store)
            .unwrap()
            .is_empty());

        let (_dir, store) = store_with(r#"{"trustedCerts": "ABC123"}"#);
        assert!(resolve_trusted_certs(&EnvOverrides::default(), &store)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_unconfigured_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::from_path(temp_dir.path().join("config"));
        assert!(resolve_trusted_certs(&EnvOverrides::default(), &store)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_env_replaces_config_without_loading() {
        let (_dir, store) = store_with(r#"{"trustedCerts": ["AAAA"]}"#);
        let env = EnvOverrides {
            trusted_cert: Some("FFEE99".to_string()),
            ..EnvOverrides::default()
        };
        assert_eq!(resolve_trusted_certs(&env, &store).unwrap(), vec!["ffee99"]);
        assert!(!store.is_loaded());
    }

    #[test]
    fn test_malformed_config_propagates() {
        let (_dir, store) = store_with("not json");
        let err = resolve_trusted_certs(&EnvOverrides::default(), &store).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }
}
