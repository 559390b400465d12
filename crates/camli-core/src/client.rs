//! Per-client view of the resolved configuration
//!
//! A [`Client`] answers "which server, which credentials, which certificates"
//! for one client instance. Each value is resolved on first access and cached
//! for the life of the client; the signer identity is delegated to the
//! shared [`ResolverContext`].

use crate::auth::{self, AuthError, AuthMode};
use crate::blobref::BlobRef;
use crate::config::ConfigError;
use crate::context::ResolverContext;
use crate::identity::{IdentityError, PublicKeyBlob};
use crate::server::{self, ServerError};
use crate::trust;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

/// Options fixed when a client is created
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOptions {
    /// Server override; when non-empty, config-file auth is not used
    pub server: Option<String>,
}

impl ClientOptions {
    pub fn with_server(server: impl Into<String>) -> Self {
        Self {
            server: Some(server.into()),
        }
    }
}

/// Lazily resolved server, auth and trust settings for one client
#[derive(Debug)]
pub struct Client {
    ctx: Arc<ResolverContext>,
    explicit_server: Option<String>,
    server: OnceLock<Result<String, ServerError>>,
    auth: OnceLock<Result<AuthMode, AuthError>>,
    trusted_certs: OnceLock<Result<Vec<String>, ConfigError>>,
}

impl Client {
    pub fn new(ctx: Arc<ResolverContext>, options: ClientOptions) -> Self {
        Self {
            ctx,
            explicit_server: options.server.filter(|s| !s.is_empty()),
            server: OnceLock::new(),
            auth: OnceLock::new(),
            trusted_certs: OnceLock::new(),
        }
    }

    /// Client on the process-wide context.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn from_process(options: ClientOptions) -> anyhow::Result<Self> {
        Ok(Self::new(ResolverContext::global()?, options))
    }

    pub fn context(&self) -> &ResolverContext {
        &self.ctx
    }

    /// The server override this client was created with, if non-empty.
    pub fn explicit_server(&self) -> Option<&str> {
        self.explicit_server.as_deref()
    }

    /// Normalized server URL.
    ///
    /// # Errors
    ///
    /// Fatal for anything that talks to a server: no usable `server` key
    /// and no override, or a config file that cannot be loaded.
    pub fn server(&self) -> Result<&str, ServerError> {
        self.server
            .get_or_init(|| server::resolve_server(self.explicit_server(), self.ctx.config()))
            .as_deref()
            .map_err(Clone::clone)
    }

    /// Whether the server is reached over TLS.
    pub fn uses_tls(&self) -> Result<bool, ServerError> {
        Ok(self.server()?.starts_with("https://"))
    }

    /// Authentication mode.
    ///
    /// # Errors
    ///
    /// [`AuthError::NotConfigured`] when no auth is available; other
    /// variants for malformed auth strings or config.
    pub fn auth_mode(&self) -> Result<&AuthMode, AuthError> {
        self.auth
            .get_or_init(|| {
                auth::resolve_auth(self.explicit_server(), self.ctx.env(), self.ctx.config())
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Lowercased trusted certificate fingerprints.
    pub fn trusted_certs(&self) -> Result<&[String], ConfigError> {
        self.trusted_certs
            .get_or_init(|| trust::resolve_trusted_certs(self.ctx.env(), self.ctx.config()))
            .as_deref()
            .map_err(Clone::clone)
    }

    /// Content address of the signer's public key, if one is available.
    pub fn signer_public_key_ref(&self) -> Option<BlobRef> {
        self.ctx.signer_public_key_ref()
    }

    /// The signer's published public key.
    pub fn signer_public_key(&self) -> Result<&PublicKeyBlob, IdentityError> {
        self.ctx.signer_public_key()
    }

    /// The secret keyring a signer would use.
    pub fn secret_ring_file(&self) -> Result<Option<PathBuf>, ConfigError> {
        self.ctx.secret_ring_file()
    }
}
