//! Process-wide resolution services
//!
//! A [`ResolverContext`] owns the configuration store, the environment
//! snapshot and the signer identity cache. Clients share one context through
//! an `Arc`; [`ResolverContext::global`] provides the process-wide instance
//! the CLI uses, while tests build their own.

use crate::blobref::BlobRef;
use crate::config::{ConfigError, ConfigStore};
use crate::env::EnvOverrides;
use crate::identity::{self, IdentityError, PublicKeyBlob, SecretRingCandidates};
use crate::keyring::{FileKeyring, Keyring};
use crate::paths;
use anyhow::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<Arc<ResolverContext>> = OnceLock::new();

/// Filesystem locations a context resolves against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverPaths {
    /// JSON configuration file
    pub config_file: PathBuf,
    /// Secret keyrings probed when `secretRing` is unset
    pub secret_rings: SecretRingCandidates,
}

impl ResolverPaths {
    /// The per-user locations from [`crate::paths`].
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn from_process() -> Result<Self> {
        Ok(Self {
            config_file: paths::config_file_path()?,
            secret_rings: SecretRingCandidates {
                identity: Some(paths::identity_secret_ring()?),
                library_default: paths::default_secret_ring(),
            },
        })
    }

    /// Config and identity ring inside `config_dir`, no library default.
    pub fn in_dir(config_dir: &Path) -> Self {
        Self {
            config_file: config_dir.join(paths::CONFIG_FILE_NAME),
            secret_rings: SecretRingCandidates {
                identity: Some(config_dir.join(paths::IDENTITY_SECRET_RING_NAME)),
                library_default: None,
            },
        }
    }
}

/// Shared configuration, environment and signer identity
///
/// The configuration is loaded at most once and the signer's public key is
/// resolved at most once, however many clients and threads ask.
pub struct ResolverContext {
    config: ConfigStore,
    env: EnvOverrides,
    keyring: Box<dyn Keyring>,
    secret_rings: SecretRingCandidates,
    signer_key: OnceLock<Result<PublicKeyBlob, IdentityError>>,
}

impl ResolverContext {
    /// Context reading the config file at `paths` through a [`FileKeyring`].
    pub fn new(paths: ResolverPaths, env: EnvOverrides) -> Self {
        Self {
            config: ConfigStore::from_path(paths.config_file),
            env,
            keyring: Box::new(FileKeyring),
            secret_rings: paths.secret_rings,
            signer_key: OnceLock::new(),
        }
    }

    /// Replace the configuration store.
    pub fn with_config(mut self, config: ConfigStore) -> Self {
        self.config = config;
        self
    }

    /// Replace the keyring implementation.
    pub fn with_keyring(mut self, keyring: impl Keyring + 'static) -> Self {
        self.keyring = Box::new(keyring);
        self
    }

    /// Context for the current user and process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn from_process() -> Result<Self> {
        Ok(Self::new(
            ResolverPaths::from_process()?,
            EnvOverrides::from_process(),
        ))
    }

    /// The process-wide context, created on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined. A
    /// failed attempt is not cached.
    pub fn global() -> Result<Arc<Self>> {
        if let Some(ctx) = GLOBAL.get() {
            return Ok(Arc::clone(ctx));
        }
        let ctx = Arc::new(Self::from_process()?);
        Ok(Arc::clone(GLOBAL.get_or_init(|| ctx)))
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn env(&self) -> &EnvOverrides {
        &self.env
    }

    /// The signer's published public key, resolved once per context.
    ///
    /// # Errors
    ///
    /// The cached [`IdentityError`]; check
    /// [`IdentityError::is_unconfigured`] to tell "no identity" from a
    /// broken one.
    pub fn signer_public_key(&self) -> Result<&PublicKeyBlob, IdentityError> {
        self.signer_key
            .get_or_init(|| {
                identity::resolve_public_key_blob(
                    &self.config,
                    &self.secret_rings,
                    self.keyring.as_ref(),
                )
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Content address of the signer's public key, if one is available.
    pub fn signer_public_key_ref(&self) -> Option<BlobRef> {
        self.signer_public_key().ok().map(|blob| blob.blob_ref)
    }

    /// The secret keyring a signer would use.
    ///
    /// # Errors
    ///
    /// Only a config file that cannot be loaded.
    pub fn secret_ring_file(&self) -> Result<Option<PathBuf>, ConfigError> {
        let state = self.config.load()?;
        Ok(identity::secret_ring_file(state, &self.secret_rings))
    }
}

impl fmt::Debug for ResolverContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverContext")
            .field("config", &self.config)
            .field("env", &self.env)
            .field("secret_rings", &self.secret_rings)
            .field("signer_key", &self.signer_key.get())
            .finish_non_exhaustive()
    }
}
