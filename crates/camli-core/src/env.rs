//! Environment inputs to resolution
//!
//! Environment variables are read once into an [`EnvOverrides`] snapshot when
//! a context is created. Tests build the snapshot directly instead of
//! mutating process state.

/// Auth string used when config-file auth is not consulted or absent.
pub const AUTH_ENV: &str = "CAMLI_AUTH";

/// Single trusted certificate fingerprint; replaces `trustedCerts` entirely.
pub const TRUSTED_CERT_ENV: &str = "CAMLI_TRUSTED_CERT";

/// Snapshot of the environment variables the resolvers consult
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    /// Value of `CAMLI_AUTH`, if set and non-empty
    pub auth: Option<String>,
    /// Value of `CAMLI_TRUSTED_CERT`, if set and non-empty
    pub trusted_cert: Option<String>,
}

impl EnvOverrides {
    /// Capture the current process environment.
    pub fn from_process() -> Self {
        Self {
            auth: non_empty_var(AUTH_ENV),
            trusted_cert: non_empty_var(TRUSTED_CERT_ENV),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
