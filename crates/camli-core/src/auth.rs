//! Authentication mode resolution
//!
//! Auth strings have the form `<type>[:<args>]`:
//!
//! - `none`
//! - `localhost`
//! - `userpass:<user>:<password>[:+localhost][:vivify=<password>]`
//! - `devauth:<password>[:vivify=<password>]`
//!
//! With an explicit server override, the config file's `auth` key is never
//! consulted so credentials meant for one server are not sent to another.

use crate::config::{json_type_name, keys, ConfigError, ConfigStore};
use crate::env::EnvOverrides;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Auth resolution error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Neither the config nor the environment names an auth mode
    #[error("no auth mode configured")]
    NotConfigured,

    /// The type prefix is not recognized
    #[error("unknown auth type: {0:?}")]
    UnknownType(String),

    /// `userpass` without both user and password
    #[error("invalid userpass auth string: expected userpass:<user>:<password>[:options]")]
    InvalidUserPass,

    /// `devauth` without a password
    #[error("invalid devauth auth string: expected devauth:<password>[:options]")]
    InvalidDevAuth,

    /// Unrecognized trailing option
    #[error("unknown {mode} option {option:?}")]
    UnknownOption { mode: &'static str, option: String },

    /// `auth` key is not a string
    #[error("invalid \"auth\" in {}: expected a string, got {found}", path.display())]
    InvalidType { path: PathBuf, found: &'static str },

    /// The configuration itself could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AuthError {
    /// Whether this is the "no auth configured" outcome rather than a failure.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured)
    }
}

/// How the client authenticates to the server
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// No authentication
    None,
    /// Trust connections from the local machine
    Localhost,
    /// HTTP basic auth
    UserPass {
        username: String,
        password: String,
        /// Also accept local connections without credentials
        or_localhost: bool,
        /// Password accepted for vivify requests only
        vivify_password: Option<String>,
    },
    /// Development mode: any username, fixed password
    DevAuth {
        password: String,
        vivify_password: Option<String>,
    },
}

impl AuthMode {
    /// Auth mode from `CAMLI_AUTH`.
    pub fn from_env(env: &EnvOverrides) -> Result<Self, AuthError> {
        match env.auth.as_deref() {
            Some(auth) => auth.parse(),
            None => Err(AuthError::NotConfigured),
        }
    }

    /// The type prefix of this mode.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Localhost => "localhost",
            Self::UserPass { .. } => "userpass",
            Self::DevAuth { .. } => "devauth",
        }
    }

    /// Username and password for basic auth, if this mode sends any.
    pub fn basic_credentials(&self) -> Option<(&str, &str)> {
        match self {
            Self::UserPass {
                username, password, ..
            } => Some((username.as_str(), password.as_str())),
            Self::DevAuth { password, .. } => Some(("", password.as_str())),
            Self::None | Self::Localhost => None,
        }
    }
}

impl FromStr for AuthMode {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AuthError::NotConfigured);
        }
        let (kind, args) = s.split_once(':').unwrap_or((s, ""));
        match kind {
            "none" => Ok(Self::None),
            "localhost" => Ok(Self::Localhost),
            "userpass" => parse_userpass(args),
            "devauth" => parse_devauth(args),
            other => Err(AuthError::UnknownType(other.to_string())),
        }
    }
}

fn parse_userpass(args: &str) -> Result<AuthMode, AuthError> {
    let mut pieces = args.split(':');
    let (Some(username), Some(password)) = (pieces.next(), pieces.next()) else {
        return Err(AuthError::InvalidUserPass);
    };
    if username.is_empty() {
        return Err(AuthError::InvalidUserPass);
    }

    let mut or_localhost = false;
    let mut vivify_password = None;
    for option in pieces {
        if option == "+localhost" {
            or_localhost = true;
        } else if let Some(vivify) = option.strip_prefix("vivify=") {
            vivify_password = Some(vivify.to_string());
        } else {
            return Err(AuthError::UnknownOption {
                mode: "userpass",
                option: option.to_string(),
            });
        }
    }

    Ok(AuthMode::UserPass {
        username: username.to_string(),
        password: password.to_string(),
        or_localhost,
        vivify_password,
    })
}

fn parse_devauth(args: &str) -> Result<AuthMode, AuthError> {
    let mut pieces = args.split(':');
    let password = pieces.next().unwrap_or_default();
    if password.is_empty() {
        return Err(AuthError::InvalidDevAuth);
    }

    let mut vivify_password = None;
    for option in pieces {
        match option.strip_prefix("vivify=") {
            Some(vivify) => vivify_password = Some(vivify.to_string()),
            None => {
                return Err(AuthError::UnknownOption {
                    mode: "devauth",
                    option: option.to_string(),
                });
            }
        }
    }

    Ok(AuthMode::DevAuth {
        password: password.to_string(),
        vivify_password,
    })
}

// Passwords never reach logs or terminal output.
impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Localhost => f.write_str("Localhost"),
            Self::UserPass {
                username,
                or_localhost,
                vivify_password,
                ..
            } => f
                .debug_struct("UserPass")
                .field("username", username)
                .field("password", &"<redacted>")
                .field("or_localhost", or_localhost)
                .field("vivify", &vivify_password.is_some())
                .finish(),
            Self::DevAuth {
                vivify_password, ..
            } => f
                .debug_struct("DevAuth")
                .field("password", &"<redacted>")
                .field("vivify", &vivify_password.is_some())
                .finish(),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserPass {
                username,
                or_localhost,
                ..
            } => {
                write!(f, "userpass (user {username})")?;
                if *or_localhost {
                    f.write_str(" +localhost")?;
                }
                Ok(())
            }
            other => f.write_str(other.scheme()),
        }
    }
}

/// Resolve the auth mode for a client
///
/// # Precedence
///
/// 1. Explicit server override: environment only, config `auth` ignored
/// 2. Config `auth` key
/// 3. Environment (`CAMLI_AUTH`)
pub fn resolve_auth(
    explicit_server: Option<&str>,
    env: &EnvOverrides,
    store: &ConfigStore,
) -> Result<AuthMode, AuthError> {
    if explicit_server.is_some_and(|s| !s.is_empty()) {
        let mode = AuthMode::from_env(env);
        if matches!(mode, Err(AuthError::NotConfigured)) {
            warn!(
                "Using explicit server; not using config file auth, and no auth mode set in environment"
            );
        }
        return mode;
    }

    let state = store.load()?;
    match state.get(keys::AUTH) {
        Some(Value::String(auth)) => auth.parse(),
        Some(other) => Err(AuthError::InvalidType {
            path: store.path().to_path_buf(),
            found: json_type_name(other),
        }),
        None => AuthMode::from_env(env),
    }
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

    fn env_auth(auth: &str) -> EnvOverrides {
        EnvOverrides {
            auth: Some(auth.to_string()),
            ..EnvOverrides::default()
        }
    }

    #[test]
    fn test_parse_simple_modes() {
        assert_eq!("none".parse::<AuthMode>().unwrap(), AuthMode::None);
        assert_eq!("localhost".parse::<AuthMode>().unwrap(), AuthMode::Localhost);
    }

    #[test]
    fn test_parse_userpass() {
        let mode: AuthMode = "userpass:alice:s3cret".parse().unwrap();
        assert_eq!(
            mode,
            AuthMode::UserPass {
                username: "alice".to_string(),
                password: "s3cret".to_string(),
                or_localhost: false,
                vivify_password: None,
            }
        );
        assert_eq!(mode.basic_credentials(), Some(("alice", "s3cret")));
    }

    #[test]
    fn test_parse_userpass_options() {
        let mode: AuthMode = "userpass:alice:s3cret:+localhost:vivify=other".parse().unwrap();
        match mode {
            AuthMode::UserPass {
                or_localhost,
                vivify_password,
                ..
            } => {
                assert!(or_localhost);
                assert_eq!(vivify_password.as_deref(), Some("other"));
            }
            other => panic!("unexpected mode {other:?}"),
        }
    }

    #[test]
    fn test_parse_userpass_errors() {
        assert_eq!(
            "userpass:alice".parse::<AuthMode>().unwrap_err(),
            AuthError::InvalidUserPass
        );
        assert_eq!(
            "userpass:alice:pw:bogus".parse::<AuthMode>().unwrap_err(),
            AuthError::UnknownOption {
                mode: "userpass",
                option: "bogus".to_string()
            }
        );
    }

    #[test]
    fn test_parse_devauth() {
        let mode: AuthMode = "devauth:pass:vivify=viv".parse().unwrap();
        assert_eq!(
            mode,
            AuthMode::DevAuth {
                password: "pass".to_string(),
                vivify_password: Some("viv".to_string()),
            }
        );
        assert_eq!(
            "devauth".parse::<AuthMode>().unwrap_err(),
            AuthError::InvalidDevAuth
        );
    }

    #[test]
    fn test_parse_unknown_and_empty() {
        assert_eq!(
            "kerberos:realm".parse::<AuthMode>().unwrap_err(),
            AuthError::UnknownType("kerberos".to_string())
        );
        assert!("".parse::<AuthMode>().unwrap_err().is_not_configured());
    }

    #[test]
    fn test_debug_and_display_hide_password() {
        let mode: AuthMode = "userpass:alice:hunter2:+localhost".parse().unwrap();
        assert!(!format!("{mode:?}").contains("hunter2"));
        assert_eq!(mode.to_string(), "userpass (user alice) +localhost");
        let dev: AuthMode = "devauth:hunter2".parse().unwrap();
        assert!(!format!("{dev:?}").contains("hunter2"));
        assert_eq!(dev.to_string(), "devauth");
    }

    #[test]
    fn test_config_auth_used_without_override() {
        let (_tmp, store) = store_with(r#"{"auth": "userpass:bob:pw"}"#);
        let mode = resolve_auth(None, &env_auth("localhost"), &store).unwrap();
        assert_eq!(mode.scheme(), "userpass");
    }

    #[test]
    fn test_env_fallback_when_config_has_no_auth() {
        let (_tmp, store) = store_with(r#"{"server": "example.com"}"#);
        let mode = resolve_auth(None, &env_auth("localhost"), &store).unwrap();
        assert_eq!(mode, AuthMode::Localhost);
    }

    #[test]
    fn test_no_auth_anywhere() {
        let (_tmp, store) = store_with("{}");
        let err = resolve_auth(None, &EnvOverrides::default(), &store).unwrap_err();
        assert!(err.is_not_configured());
    }

    #[test]
    fn test_explicit_server_ignores_config_auth() {
        let (_tmp, store) = store_with(r#"{"auth": "userpass:bob:pw"}"#);
        let err = resolve_auth(Some("friend.example.com"), &EnvOverrides::default(), &store)
            .unwrap_err();
        assert!(err.is_not_configured());
        assert!(!store.is_loaded());
    }

    #[test]
    fn test_explicit_server_uses_env_auth() {
        let (_tmp, store) = store_with("{ not even json");
        let mode = resolve_auth(Some("friend.example.com"), &env_auth("none"), &store).unwrap();
        assert_eq!(mode, AuthMode::None);
    }

    #[test]
    fn test_empty_explicit_server_is_not_an_override() {
        let (_tmp, store) = store_with(r#"{"auth": "localhost"}"#);
        let mode = resolve_auth(Some(""), &EnvOverrides::default(), &store).unwrap();
        assert_eq!(mode, AuthMode::Localhost);
    }

    #[test]
    fn test_malformed_auth_string_propagates() {
        let (_tmp, store) = store_with(r#"{"auth": "userpass:onlyuser"}"#);
        assert_eq!(
            resolve_auth(None, &EnvOverrides::default(), &store).unwrap_err(),
            AuthError::InvalidUserPass
        );
    }

    #[test]
    fn test_non_string_auth() {
        let (_tmp, store) = store_with(r#"{"auth": ["none"]}"#);
        let err = resolve_auth(None, &EnvOverrides::default(), &store).unwrap_err();
        assert!(matches!(err, AuthError::InvalidType { found: "array", .. }));
    }
}
