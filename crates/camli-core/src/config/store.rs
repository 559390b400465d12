//! Exactly-once loading of the configuration file

use super::types::Config;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, error, info};

/// Configuration error
///
/// Cached by [`ConfigStore`] and handed to every caller, so it carries the
/// diagnostic text rather than the live `io`/`serde_json` error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The file exists but could not be read
    #[error("cannot read config file {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    /// The file is not a JSON object
    #[error("malformed config file {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },
}

impl ConfigError {
    /// Path of the offending configuration file.
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } | Self::Malformed { path, .. } => path,
        }
    }
}

/// Where raw configuration text comes from
pub trait ConfigSource: Send + Sync {
    /// Location used in diagnostics.
    fn location(&self) -> &Path;

    /// Read the raw text; `Ok(None)` means the configuration does not exist.
    fn read(&self) -> Result<Option<String>, ConfigError>;
}

/// Reads the configuration from a file on disk
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigSource for FileSource {
    fn location(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<String>, ConfigError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConfigError::Read {
                path: self.path.clone(),
                message: e.to_string(),
            }),
        }
    }
}

/// Outcome of a successful load
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigState {
    /// The file existed and parsed as a JSON object
    Loaded(Config),
    /// No configuration file exists
    Unconfigured,
}

impl ConfigState {
    pub fn config(&self) -> Option<&Config> {
        match self {
            Self::Loaded(config) => Some(config),
            Self::Unconfigured => None,
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Raw value for `key`; always `None` when unconfigured.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.config().and_then(|c| c.get(key))
    }

    /// String value for `key`; always `None` when unconfigured.
    pub fn string(&self, key: &str) -> Option<&str> {
        self.config().and_then(|c| c.string(key))
    }
}

/// Loads the configuration once and serves the cached outcome afterwards
///
/// The first caller of [`ConfigStore::load`] reads and parses the source;
/// concurrent callers block until it finishes. Every later call returns the
/// same state or the same error, even if the file changes on disk.
pub struct ConfigStore {
    source: Box<dyn ConfigSource>,
    state: OnceLock<Result<ConfigState, ConfigError>>,
}

impl ConfigStore {
    pub fn new(source: impl ConfigSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            state: OnceLock::new(),
        }
    }

    /// Store backed by the file at `path`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(FileSource::new(path))
    }

    /// Location of the configuration, for diagnostics.
    pub fn path(&self) -> &Path {
        self.source.location()
    }

    /// Load the configuration, at most once per store.
    ///
    /// # Errors
    ///
    /// Returns the cached [`ConfigError`] if the file exists but cannot be
    /// read or is not a JSON object. Callers treat this as fatal.
    pub fn load(&self) -> Result<&ConfigState, ConfigError> {
        self.state
            .get_or_init(|| self.read_state())
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Whether a load has already completed.
    pub fn is_loaded(&self) -> bool {
        self.state.get().is_some()
    }

    fn read_state(&self) -> Result<ConfigState, ConfigError> {
        let path = self.source.location();
        let state = match self.source.read()? {
            None => {
                info!("No config file at {path:?}; running unconfigured");
                ConfigState::Unconfigured
            }
            Some(contents) => ConfigState::Loaded(parse_config(&contents, path)?),
        };
        debug!(configured = state.is_configured(), "Config loaded from {path:?}");
        Ok(state)
    }
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStore")
            .field("path", &self.path())
            .field("state", &self.state.get())
            .finish()
    }
}

/// Parse configuration text that must be a JSON object.
pub fn parse_config(contents: &str, path: &Path) -> Result<Config, ConfigError> {
    let malformed = |message: String| {
        error!("Malformed config at {path:?}: {message}");
        ConfigError::Malformed {
            path: path.to_path_buf(),
            message,
        }
    };

    match serde_json::from_str::<Value>(contents) {
        Ok(Value::Object(map)) => Ok(Config::from_map(map)),
        Ok(other) => Err(malformed(format!(
            "expected a JSON object at top level, got {}",
            json_type_name(&other)
        ))),
        Err(e) => Err(malformed(e.to_string())),
    }
}

/// Human-readable JSON type name used in type-mismatch diagnostics.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingSource {
        path: PathBuf,
        contents: Option<String>,
        reads: Arc<AtomicUsize>,
    }

    impl ConfigSource for CountingSource {
        fn location(&self) -> &Path {
            &self.path
        }

        fn read(&self) -> Result<Option<String>, ConfigError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.contents.clone())
        }
    }

    #[test]
    fn test_missing_file_is_unconfigured() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::from_path(temp_dir.path().join("config"));

        let state = store.load().unwrap();
        assert_eq!(state, &ConfigState::Unconfigured);
        assert!(state.string("server").is_none());
    }

    #[test]
    fn test_loads_json_object() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config");
        fs::write(&path, r#"{"server": "localhost:3179", "keyId": "26F5ABDA"}"#).unwrap();

        let store = ConfigStore::from_path(&path);
        let state = store.load().unwrap();
        assert!(state.is_configured());
        assert_eq!(state.string("server"), Some("localhost:3179"));
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config");
        fs::write(&path, "{ not json").unwrap();

        let err = ConfigStore::from_path(&path).load().unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
        assert_eq!(err.path(), path.as_path());
        assert!(err.to_string().contains("malformed config file"));
    }

    #[test]
    fn test_non_object_is_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config");
        fs::write(&path, r#"["server"]"#).unwrap();

        let err = ConfigStore::from_path(&path).load().unwrap_err();
        assert!(err.to_string().contains("got array"));
    }

    #[test]
    fn test_unreadable_path_is_read_error() {
        let temp_dir = TempDir::new().unwrap();
        // A directory cannot be read as a file
        let err = ConfigStore::from_path(temp_dir.path()).load().unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_never_reloads_after_file_changes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config");
        fs::write(&path, r#"{"server": "first.example.com"}"#).unwrap();

        let store = ConfigStore::from_path(&path);
        assert_eq!(store.load().unwrap().string("server"), Some("first.example.com"));

        fs::write(&path, r#"{"server": "second.example.com"}"#).unwrap();
        assert_eq!(store.load().unwrap().string("server"), Some("first.example.com"));
    }

    #[test]
    fn test_unconfigured_is_cached_after_file_appears() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config");
        let store = ConfigStore::from_path(&path);
        assert!(!store.load().unwrap().is_configured());

        fs::write(&path, r#"{"server": "late.example.com"}"#).unwrap();
        assert!(!store.load().unwrap().is_configured());
    }

    #[test]
    fn test_error_is_cached() {
        let reads = Arc::new(AtomicUsize::new(0));
        let store = ConfigStore::new(CountingSource {
            path: PathBuf::from("/virtual/config"),
            contents: Some("nope".to_string()),
            reads: Arc::clone(&reads),
        });

        let first = store.load().unwrap_err();
        let second = store.load().unwrap_err();
        assert_eq!(first, second);
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_first_access_reads_once() {
        let reads = Arc::new(AtomicUsize::new(0));
        let store = ConfigStore::new(CountingSource {
            path: PathBuf::from("/virtual/config"),
            contents: Some(r#"{"server": "race.example.com"}"#.to_string()),
            reads: Arc::clone(&reads),
        });

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..50)
                .map(|_| scope.spawn(|| store.load().unwrap().string("server").map(str::to_owned)))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap().as_deref(), Some("race.example.com"));
            }
        });

        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert!(store.is_loaded());
    }

    #[test]
    fn test_json_type_names() {
        assert_eq!(json_type_name(&Value::Null), "null");
        assert_eq!(json_type_name(&serde_json::json!(3)), "number");
        assert_eq!(json_type_name(&serde_json::json!({})), "object");
    }
}
