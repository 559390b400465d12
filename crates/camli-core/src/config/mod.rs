//! Configuration loading
//!
//! The client configuration is a single JSON object at
//! `<config dir>/config` (see [`crate::paths`]). It is read at most once per
//! [`ConfigStore`]; a missing file is the `Unconfigured` state, not an error.

mod store;
mod types;

pub use store::{
    json_type_name, parse_config, ConfigError, ConfigSource, ConfigState, ConfigStore, FileSource,
};
pub use types::{keys, Config};
