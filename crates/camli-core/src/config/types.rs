//! Configuration types

use serde_json::{Map, Value};

/// Keys consumed from the JSON configuration file.
pub mod keys {
    /// Server URL or host (`"server": "example.com:3179"`).
    pub const SERVER: &str = "server";
    /// Auth string (`"auth": "userpass:alice:secret"`).
    pub const AUTH: &str = "auth";
    /// Explicit path to the secret keyring.
    pub const SECRET_RING: &str = "secretRing";
    /// OpenPGP key ID of the signer.
    pub const KEY_ID: &str = "keyId";
    /// Directory holding the user's own published public key blobs.
    pub const SELF_PUB_KEY_DIR: &str = "selfPubKeyDir";
    /// List of trusted certificate fingerprints, case insensitive.
    pub const TRUSTED_CERTS: &str = "trustedCerts";
}

/// Parsed configuration file: a JSON object with loosely typed values
///
/// Values are kept as raw JSON so each resolver decides how strictly it
/// treats type mismatches in the keys it owns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    values: Map<String, Value>,
}

impl Config {
    /// Wrap an already-parsed JSON object.
    pub fn from_map(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Value for `key` if it is present and a JSON string.
    pub fn string(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Keys in file order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}
