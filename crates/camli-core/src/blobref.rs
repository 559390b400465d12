//! Content addresses for blobs
//!
//! A blob is addressed by the hash of its bytes, written `sha1-<40 hex>`.
//! The signer's public key is referenced this way everywhere.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::{Digest, Sha1};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const SHA1_PREFIX: &str = "sha1-";
const SHA1_LEN: usize = 20;

/// Error parsing a blob reference string
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BlobRefError {
    /// Prefix other than `sha1-`
    #[error("unsupported blobref hash in {0:?}")]
    UnsupportedHash(String),

    /// Digest is not 40 hex digits
    #[error("invalid sha1 digest in blobref {0:?}")]
    InvalidDigest(String),
}

/// SHA-1 content address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobRef {
    digest: [u8; SHA1_LEN],
}

impl BlobRef {
    /// Address of `bytes`.
    pub fn sha1_from_bytes(bytes: &[u8]) -> Self {
        let mut digest = [0u8; SHA1_LEN];
        digest.copy_from_slice(&Sha1::digest(bytes));
        Self { digest }
    }

    /// Address of the UTF-8 bytes of `s`.
    pub fn sha1_from_str(s: &str) -> Self {
        Self::sha1_from_bytes(s.as_bytes())
    }

    /// Lowercase hex digest, the part after the dash.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SHA1_PREFIX}{}", self.digest_hex())
    }
}

impl fmt::Debug for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobRef({self})")
    }
}

impl FromStr for BlobRef {
    type Err = BlobRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(hex_digest) = s.strip_prefix(SHA1_PREFIX) else {
            return Err(BlobRefError::UnsupportedHash(s.to_string()));
        };
        let bytes = hex::decode(hex_digest).map_err(|_| BlobRefError::InvalidDigest(s.to_string()))?;
        let digest: [u8; SHA1_LEN] = bytes
            .try_into()
            .map_err(|_| BlobRefError::InvalidDigest(s.to_string()))?;
        Ok(Self { digest })
    }
}

impl Serialize for BlobRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BlobRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
