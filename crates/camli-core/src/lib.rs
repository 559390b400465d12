//! Client-side configuration resolution for camli
//!
//! This crate answers the questions every camli client asks before talking
//! to a server: which server, how to authenticate, which certificates to
//! trust, and which public key signs on the user's behalf.
//!
//! All answers are derived from one JSON configuration file, the
//! environment and the user's OpenPGP secret keyring. Each is resolved
//! lazily, at most once, and then served from cache:
//! - The configuration and the signer identity are cached per
//!   [`ResolverContext`] (one per process in the CLI)
//! - Server, auth and trusted certificates are cached per [`Client`]

pub mod auth;
pub mod blobref;
pub mod client;
pub mod config;
pub mod context;
pub mod env;
pub mod identity;
pub mod keyring;
pub mod logging;
pub mod paths;
pub mod server;
pub mod trust;

pub use auth::{AuthError, AuthMode};
pub use blobref::BlobRef;
pub use client::{Client, ClientOptions};
pub use config::{Config, ConfigError, ConfigState, ConfigStore};
pub use context::{ResolverContext, ResolverPaths};
pub use env::EnvOverrides;
pub use identity::{IdentityError, PublicKeyBlob};
pub use server::ServerError;
