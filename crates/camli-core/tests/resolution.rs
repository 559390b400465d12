//! End-to-end resolution through `ResolverContext` and `Client`

use camli_core::config::{ConfigError, ConfigSource};
use camli_core::keyring::packet::{Packet, TAG_SECRET_KEY, TAG_USER_ID};
use camli_core::keyring::parse_keyring;
use camli_core::{
    AuthMode, BlobRef, Client, ClientOptions, ConfigStore, EnvOverrides, ResolverContext,
    ResolverPaths,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

struct CountingSource {
    path: PathBuf,
    contents: String,
    reads: Arc<AtomicUsize>,
}

impl ConfigSource for CountingSource {
    fn location(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<String>, ConfigError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(Some(self.contents.clone()))
    }
}

/// Minimal v4 RSA secret keyring with one user ID.
fn secret_ring() -> Vec<u8> {
    let mut body = vec![4, 0x5F, 0x10, 0x20, 0x30, 1];
    body.extend_from_slice(&[0x00, 0x10, 0xC1, 0x23]);
    body.extend_from_slice(&[0x00, 0x11, 0x01, 0x00, 0x01]);
    body.push(0);
    body.extend_from_slice(&[0x00, 0x08, 0x5A, 0x00, 0x5A]);

    let mut ring = Vec::new();
    Packet::new(TAG_SECRET_KEY, body).write_to(&mut ring);
    Packet::new(TAG_USER_ID, b"Test User <test@example.com>".to_vec()).write_to(&mut ring);
    ring
}

struct Profile {
    dir: TempDir,
    key_id: String,
}

impl Profile {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let ring = secret_ring();
        let key_id = parse_keyring(&ring).unwrap()[0].short_key_id();
        fs::write(dir.path().join("identity-secring.gpg"), ring).unwrap();
        fs::create_dir(dir.path().join("keys")).unwrap();
        Self { dir, key_id }
    }

    fn config(&self) -> String {
        serde_json::json!({
            "server": "blobs.example.com:3179/",
            "auth": "userpass:alice:secret:+localhost",
            "keyId": self.key_id,
            "selfPubKeyDir": self.dir.path().join("keys"),
            "trustedCerts": ["ABCDEF0123"],
        })
        .to_string()
    }

    fn context(&self, reads: &Arc<AtomicUsize>) -> Arc<ResolverContext> {
        let store = ConfigStore::new(CountingSource {
            path: self.dir.path().join("config"),
            contents: self.config(),
            reads: Arc::clone(reads),
        });
        let ctx = ResolverContext::new(ResolverPaths::in_dir(self.dir.path()), EnvOverrides::default())
            .with_config(store);
        Arc::new(ctx)
    }

    fn published(&self) -> Vec<PathBuf> {
        fs::read_dir(self.dir.path().join("keys"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }
}

#[test]
fn concurrent_clients_share_one_config_read() {
    let profile = Profile::new();
    let reads = Arc::new(AtomicUsize::new(0));
    let ctx = profile.context(&reads);

    let results: Vec<(String, String, Vec<String>, Option<BlobRef>)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..50)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                scope.spawn(move || {
                    let client = Client::new(ctx, ClientOptions::default());
                    (
                        client.server().unwrap().to_string(),
                        client.auth_mode().unwrap().to_string(),
                        client.trusted_certs().unwrap().to_vec(),
                        client.signer_public_key_ref(),
                    )
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(reads.load(Ordering::SeqCst), 1);
    let first = &results[0];
    assert!(results.iter().all(|r| r == first));
    assert_eq!(first.0, "https://blobs.example.com:3179");
    assert_eq!(first.2, vec!["abcdef0123"]);
    assert!(first.3.is_some());
    assert_eq!(profile.published().len(), 1);
}

#[test]
fn explicit_server_never_reads_config_for_auth() {
    let profile = Profile::new();
    let reads = Arc::new(AtomicUsize::new(0));
    let client = Client::new(
        profile.context(&reads),
        ClientOptions::with_server("http://localhost:3179"),
    );

    assert_eq!(client.server().unwrap(), "http://localhost:3179");
    assert!(client.auth_mode().unwrap_err().is_not_configured());
    assert_eq!(reads.load(Ordering::SeqCst), 0);
}

#[test]
fn explicit_server_uses_environment_auth() {
    let profile = Profile::new();
    let env = EnvOverrides {
        auth: Some("devauth:hunter2".to_string()),
        ..EnvOverrides::default()
    };
    let ctx = ResolverContext::new(ResolverPaths::in_dir(profile.dir.path()), env);
    let client = Client::new(Arc::new(ctx), ClientOptions::with_server("localhost:3179"));

    assert_eq!(
        client.auth_mode().unwrap(),
        &AuthMode::DevAuth {
            password: "hunter2".to_string(),
            vivify_password: None,
        }
    );
}

#[test]
fn signer_key_published_once_across_contexts() {
    let profile = Profile::new();
    let reads = Arc::new(AtomicUsize::new(0));

    let first = profile.context(&reads);
    let blob = first.signer_public_key().unwrap().clone();
    assert_eq!(blob.blob_ref, BlobRef::sha1_from_str(&blob.armored));
    assert_eq!(
        blob.path.file_name().and_then(|n| n.to_str()),
        Some(format!("{}.camli", blob.blob_ref).as_str())
    );

    fs::write(&blob.path, "left alone").unwrap();
    let second = profile.context(&reads);
    assert_eq!(second.signer_public_key_ref(), Some(blob.blob_ref));
    assert_eq!(fs::read_to_string(&blob.path).unwrap(), "left alone");
    assert_eq!(profile.published(), vec![blob.path]);
}

#[test]
fn unconfigured_profile_degrades() {
    let dir = TempDir::new().unwrap();
    let ctx = Arc::new(ResolverContext::new(
        ResolverPaths::in_dir(dir.path()),
        EnvOverrides::default(),
    ));
    let client = Client::new(ctx, ClientOptions::default());

    assert!(client.server().is_err());
    assert!(client.auth_mode().unwrap_err().is_not_configured());
    assert!(client.trusted_certs().unwrap().is_empty());
    assert!(client.signer_public_key().unwrap_err().is_unconfigured());
    assert_eq!(client.secret_ring_file().unwrap(), None);
}
