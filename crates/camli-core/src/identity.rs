//! Signer identity: the content address of the user's public key
//!
//! Resolution reads `keyId` from the config, finds the matching secret key,
//! armors its public half and addresses it by SHA-1. The armored key is then
//! published as `<selfPubKeyDir>/<blobref>.camli`, so once resolved the
//! signer's public key is always fetchable locally.
//!
//! Every step that can fail yields an [`IdentityError`] and a log line
//! rather than aborting: read-only operations work without an identity, and
//! signing callers check for it themselves.

use crate::blobref::BlobRef;
use crate::config::{keys, ConfigError, ConfigState, ConfigStore};
use crate::keyring::{Keyring, KeyringError};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Extension of published public key blobs.
pub const PUBLIC_KEY_EXTENSION: &str = "camli";

/// Identity resolution error
///
/// [`IdentityError::is_unconfigured`] separates "no identity set up" from
/// failures of a configured identity.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("no \"keyId\" in config file {}; have you run \"camput init\"?", path.display())]
    MissingKeyId { path: PathBuf },

    #[error(
        "couldn't find keyId {key_id:?}: no \"secretRing\" in config and no standard secret ring files exist"
    )]
    NoSecretRing { key_id: String },

    #[error("couldn't find keyId {key_id:?} in secret ring: {source}")]
    Keyring {
        key_id: String,
        #[source]
        source: KeyringError,
    },

    #[error("error serializing public key: {0}")]
    Serialize(#[source] KeyringError),

    #[error("no \"selfPubKeyDir\" defined in {}", path.display())]
    MissingSelfPubKeyDir { path: PathBuf },

    #[error("selfPubKeyDir {} doesn't exist or is not a directory", dir.display())]
    SelfPubKeyDirNotDir { dir: PathBuf },

    #[error("error writing public key to {}: {message}", path.display())]
    Write { path: PathBuf, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl IdentityError {
    /// Whether the identity is simply not set up, as opposed to broken.
    pub fn is_unconfigured(&self) -> bool {
        matches!(
            self,
            Self::MissingKeyId { .. } | Self::NoSecretRing { .. } | Self::MissingSelfPubKeyDir { .. }
        )
    }
}

/// The signer's published public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyBlob {
    /// Content address of `armored`
    pub blob_ref: BlobRef,
    /// ASCII-armored public key
    pub armored: String,
    /// Where the blob lives in `selfPubKeyDir`
    pub path: PathBuf,
}

/// Well-known secret keyring locations probed when `secretRing` is unset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretRingCandidates {
    /// `<config dir>/identity-secring.gpg`
    pub identity: Option<PathBuf>,
    /// `~/.gnupg/secring.gpg`
    pub library_default: Option<PathBuf>,
}

impl SecretRingCandidates {
    /// The first candidate that exists on disk.
    fn existing(&self) -> Option<PathBuf> {
        [&self.identity, &self.library_default]
            .into_iter()
            .flatten()
            .find(|path| path.exists())
            .cloned()
    }
}

/// The secret keyring a signer would use
///
/// Non-empty `secretRing`, else the identity ring if it exists, else the
/// library default path whether or not it exists.
pub fn secret_ring_file(state: &ConfigState, rings: &SecretRingCandidates) -> Option<PathBuf> {
    if let Some(ring) = explicit_secret_ring(state) {
        return Some(ring);
    }
    match &rings.identity {
        Some(identity) if identity.exists() => Some(identity.clone()),
        _ => rings.library_default.clone(),
    }
}

fn explicit_secret_ring(state: &ConfigState) -> Option<PathBuf> {
    state
        .string(keys::SECRET_RING)
        .filter(|ring| !ring.is_empty())
        .map(PathBuf::from)
}

/// Resolve and publish the signer's public key
///
/// Logs the outcome once; callers cache the result.
pub fn resolve_public_key_blob(
    store: &ConfigStore,
    rings: &SecretRingCandidates,
    keyring: &dyn Keyring,
) -> Result<PublicKeyBlob, IdentityError> {
    let result = resolve(store, rings, keyring);
    match &result {
        Ok(blob) => info!(blob_ref = %blob.blob_ref, "Signer public key at {:?}", blob.path),
        Err(e @ IdentityError::MissingKeyId { .. }) => warn!("No signer identity: {e}"),
        Err(e) if e.is_unconfigured() => info!("No signer identity: {e}"),
        Err(e) => warn!("Signer identity unavailable: {e}"),
    }
    result
}

fn resolve(
    store: &ConfigStore,
    rings: &SecretRingCandidates,
    keyring: &dyn Keyring,
) -> Result<PublicKeyBlob, IdentityError> {
    let state = store.load()?;

    let key_id = state
        .string(keys::KEY_ID)
        .ok_or_else(|| IdentityError::MissingKeyId {
            path: store.path().to_path_buf(),
        })?;

    let secret_ring = explicit_secret_ring(state)
        .or_else(|| rings.existing())
        .ok_or_else(|| IdentityError::NoSecretRing {
            key_id: key_id.to_string(),
        })?;
    debug!("Looking up keyId {key_id} in {secret_ring:?}");

    let entity = keyring
        .find_secret_entity(key_id, &secret_ring)
        .map_err(|source| IdentityError::Keyring {
            key_id: key_id.to_string(),
            source,
        })?;
    debug!(user_ids = ?entity.user_ids(), "Found signer key {}", entity.key_id());
    let armored = entity
        .armored_public_key()
        .map_err(IdentityError::Serialize)?;

    let blob_ref = BlobRef::sha1_from_str(&armored);

    let self_pub_key_dir = state
        .string(keys::SELF_PUB_KEY_DIR)
        .map(PathBuf::from)
        .ok_or_else(|| IdentityError::MissingSelfPubKeyDir {
            path: store.path().to_path_buf(),
        })?;
    if !self_pub_key_dir.is_dir() {
        return Err(IdentityError::SelfPubKeyDirNotDir {
            dir: self_pub_key_dir,
        });
    }

    let path = publish_public_key(&self_pub_key_dir, &blob_ref, &armored)?;
    Ok(PublicKeyBlob {
        blob_ref,
        armored,
        path,
    })
}

/// Write `<dir>/<blob_ref>.camli` unless it already exists.
///
/// The file is written to a temporary name and moved into place without
/// clobbering, so readers never see a partial blob and a concurrent writer
/// that got there first counts as success.
pub fn publish_public_key(
    dir: &Path,
    blob_ref: &BlobRef,
    armored: &str,
) -> Result<PathBuf, IdentityError> {
    let path = dir.join(format!("{blob_ref}.{PUBLIC_KEY_EXTENSION}"));
    if path.exists() {
        debug!("Public key blob already present at {path:?}");
        return Ok(path);
    }

    let write_err = |e: std::io::Error| IdentityError::Write {
        path: path.clone(),
        message: e.to_string(),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(armored.as_bytes()).map_err(write_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(write_err)?;
    }

    match tmp.persist_noclobber(&path) {
        Ok(_) => {
            info!("Published public key blob {path:?}");
            Ok(path)
        }
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
            debug!("Public key blob {path:?} created concurrently");
            Ok(path)
        }
        Err(e) => Err(write_err(e.error)),
    }
}
