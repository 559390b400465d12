//! Secret keyring lookup and public key export
//!
//! Reads an OpenPGP keyring (binary, as gpg writes `secring.gpg`, or ASCII
//! armored), finds the transferable secret key whose key ID matches, and
//! exports its public half as an armored `PGP PUBLIC KEY BLOCK`.
//!
//! Export rewrites secret key packets as public key packets by dropping the
//! secret material, and drops trust packets. User IDs and signatures are
//! kept as they appear in the keyring.

pub mod armor;
pub mod packet;

use packet::{
    Packet, PacketError, TAG_PUBLIC_KEY, TAG_PUBLIC_SUBKEY, TAG_SECRET_KEY, TAG_SECRET_SUBKEY,
    TAG_SIGNATURE, TAG_TRUST, TAG_USER_ID,
};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Keyring lookup or export error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyringError {
    /// The keyring file could not be read
    #[error("cannot read keyring {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    /// The keyring is not a valid packet stream
    #[error("malformed keyring {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: PacketError,
    },

    /// The keyring is armored but the armor is broken
    #[error("malformed armored keyring {}: {source}", path.display())]
    Armor {
        path: PathBuf,
        #[source]
        source: armor::ArmorError,
    },

    /// No secret key with the requested ID
    #[error("no secret key found for keyId {key_id:?} in {}", path.display())]
    KeyNotFound { key_id: String, path: PathBuf },

    /// The entity could not be serialized
    #[error("cannot serialize public key: {0}")]
    Serialize(String),
}

/// Access to secret keyrings
///
/// The default implementation is [`FileKeyring`]; tests and embedders can
/// supply their own.
pub trait Keyring: Send + Sync {
    /// Find the entity whose secret primary key matches `key_id` in `secret_ring`.
    fn find_secret_entity(&self, key_id: &str, secret_ring: &Path)
        -> Result<KeyEntity, KeyringError>;
}

/// Reads keyring files from disk on every lookup
#[derive(Debug, Clone, Copy, Default)]
pub struct FileKeyring;

impl Keyring for FileKeyring {
    fn find_secret_entity(
        &self,
        key_id: &str,
        secret_ring: &Path,
    ) -> Result<KeyEntity, KeyringError> {
        let data = std::fs::read(secret_ring).map_err(|e| KeyringError::Read {
            path: secret_ring.to_path_buf(),
            message: e.to_string(),
        })?;

        let entities = parse_keyring(&data).map_err(|err| match err {
            ParseError::Packet(source) => KeyringError::Malformed {
                path: secret_ring.to_path_buf(),
                source,
            },
            ParseError::Armor(source) => KeyringError::Armor {
                path: secret_ring.to_path_buf(),
                source,
            },
        })?;
        debug!("Read {} entities from {secret_ring:?}", entities.len());

        entities
            .into_iter()
            .find(|entity| entity.has_secret_key() && entity.matches_key_id(key_id))
            .ok_or_else(|| KeyringError::KeyNotFound {
                key_id: key_id.to_string(),
                path: secret_ring.to_path_buf(),
            })
    }
}

/// One transferable key: primary key, user IDs, subkeys and signatures
///
/// Packets are stored in their public form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntity {
    fingerprint: [u8; 20],
    has_secret: bool,
    packets: Vec<Packet>,
}

impl KeyEntity {
    /// Uppercase hex v4 fingerprint.
    pub fn fingerprint(&self) -> String {
        hex::encode_upper(self.fingerprint)
    }

    /// 16-hex-digit key ID.
    pub fn key_id(&self) -> String {
        hex::encode_upper(&self.fingerprint[12..])
    }

    /// 8-hex-digit short key ID, the form usually stored as `keyId`.
    pub fn short_key_id(&self) -> String {
        hex::encode_upper(&self.fingerprint[16..])
    }

    /// Whether the keyring carried secret material for the primary key.
    pub fn has_secret_key(&self) -> bool {
        self.has_secret
    }

    /// Match a short ID, long ID or fingerprint, case-insensitive, `0x` optional.
    pub fn matches_key_id(&self, key_id: &str) -> bool {
        let trimmed = key_id.trim();
        let wanted = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed)
            .to_ascii_uppercase();
        match wanted.len() {
            8 => wanted == self.short_key_id(),
            16 => wanted == self.key_id(),
            40 => wanted == self.fingerprint(),
            _ => false,
        }
    }

    /// User ID strings, lossily decoded.
    pub fn user_ids(&self) -> Vec<String> {
        self.packets
            .iter()
            .filter(|p| p.tag == TAG_USER_ID)
            .map(|p| String::from_utf8_lossy(&p.body).into_owned())
            .collect()
    }

    /// Binary transferable public key.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for packet in &self.packets {
            packet.write_to(&mut out);
        }
        out
    }

    /// ASCII-armored transferable public key.
    pub fn armored_public_key(&self) -> Result<String, KeyringError> {
        if self.packets.first().map(|p| p.tag) != Some(TAG_PUBLIC_KEY) {
            return Err(KeyringError::Serialize(
                "entity has no primary public key packet".to_string(),
            ));
        }
        Ok(armor::armor(armor::PUBLIC_KEY_BLOCK, &self.public_key_bytes()))
    }
}

/// Keyring parse error, before a path is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Packet(PacketError),
    Armor(armor::ArmorError),
}

impl From<PacketError> for ParseError {
    fn from(err: PacketError) -> Self {
        Self::Packet(err)
    }
}

/// What to drop after a key this reader cannot handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    Nothing,
    /// Everything up to the next primary key
    Entity,
    /// Binding signatures of a dropped subkey
    Subkey,
}

/// Split keyring bytes into entities.
///
/// Armored input is detected by its `-----BEGIN` line. Packets that appear
/// before the first primary key are skipped. Keys with an unsupported
/// version or algorithm are dropped: a primary key with everything up to
/// the next primary key, a subkey with its binding signatures.
pub fn parse_keyring(data: &[u8]) -> Result<Vec<KeyEntity>, ParseError> {
    let decoded;
    let bytes = if data.starts_with(b"-----BEGIN ") {
        decoded = armor::dearmor(&String::from_utf8_lossy(data)).map_err(ParseError::Armor)?;
        decoded.as_slice()
    } else {
        data
    };

    let mut entities = Vec::new();
    let mut current: Option<KeyEntity> = None;
    let mut skip = Skip::Nothing;

    for packet in packet::read_packets(bytes)? {
        let tag = packet.tag;
        if tag == TAG_TRUST {
            continue;
        }
        let is_primary = matches!(tag, TAG_SECRET_KEY | TAG_PUBLIC_KEY);
        match skip {
            Skip::Entity if !is_primary => continue,
            Skip::Subkey if tag == TAG_SIGNATURE => continue,
            _ => skip = Skip::Nothing,
        }

        if is_primary {
            if let Some(done) = current.take() {
                entities.push(done);
            }
            let has_secret = tag == TAG_SECRET_KEY;
            match to_public(packet, TAG_PUBLIC_KEY) {
                Ok(public) => {
                    current = Some(KeyEntity {
                        fingerprint: packet::fingerprint_v4(&public.body),
                        has_secret,
                        packets: vec![public],
                    });
                }
                Err(e) if e.is_unsupported() => {
                    debug!("Skipping key: {e}");
                    skip = Skip::Entity;
                }
                Err(e) => return Err(e.into()),
            }
            continue;
        }

        let Some(entity) = current.as_mut() else {
            debug!("Skipping packet with tag {tag} before first primary key");
            continue;
        };
        let packet = if matches!(tag, TAG_SECRET_SUBKEY | TAG_PUBLIC_SUBKEY) {
            match to_public(packet, TAG_PUBLIC_SUBKEY) {
                Ok(public) => public,
                Err(e) if e.is_unsupported() => {
                    debug!("Skipping subkey of {}: {e}", entity.key_id());
                    skip = Skip::Subkey;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            packet
        };
        entity.packets.push(packet);
    }

    if let Some(done) = current {
        entities.push(done);
    }
    Ok(entities)
}

fn to_public(packet: Packet, public_tag: u8) -> Result<Packet, PacketError> {
    let len = packet::public_key_len(&packet.body)?;
    let mut body = packet.body;
    body.truncate(len);
    Ok(Packet::new(public_tag, body))
}
