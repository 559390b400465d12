//! Config command implementation

use anyhow::Result;
use camli_core::{AuthError, Client, ServerError};
use clap::Args;
use serde_json::json;

/// Show effective configuration
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the config command
///
/// An unreadable or malformed config file is fatal. A missing `server` or
/// auth mode is reported as unset; a missing signer identity is reported
/// with its reason.
pub fn execute(args: ConfigArgs, client: &Client) -> Result<()> {
    let store = client.context().config();
    let state = store.load()?;
    let configured = state.is_configured();
    let config_keys: Vec<&str> = state.config().map(|c| c.keys().collect()).unwrap_or_default();
    let config_path = store.path();

    let server = match client.server() {
        Ok(server) => Some(server),
        Err(ServerError::Missing { .. }) => None,
        Err(e) => return Err(e.into()),
    };
    let auth = match client.auth_mode() {
        Ok(mode) => Some(mode.to_string()),
        Err(AuthError::NotConfigured) => None,
        Err(e) => return Err(e.into()),
    };
    let trusted_certs = client.trusted_certs()?;
    let secret_ring = client.secret_ring_file()?;
    let signer = client.signer_public_key();

    if args.json {
        let signer = match signer {
            Ok(blob) => json!({
                "blobRef": blob.blob_ref,
                "path": blob.path.display().to_string(),
            }),
            Err(e) => json!({ "error": e.to_string() }),
        };
        let output = json!({
            "configFile": {
                "path": config_path.display().to_string(),
                "exists": configured,
                "keys": config_keys,
            },
            "explicitServer": client.explicit_server(),
            "server": server,
            "auth": auth,
            "trustedCerts": trusted_certs,
            "secretRing": secret_ring.as_ref().map(|p| p.display().to_string()),
            "signerKey": signer,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let config_status = if configured { "(found)" } else { "(not found)" };
        println!("Config file: {} {config_status}", config_path.display());
        if !config_keys.is_empty() {
            println!("  keys: {}", config_keys.join(", "));
        }
        println!();
        println!("Configuration:");
        println!("  server: {}", server.unwrap_or("(not set)"));
        if client.explicit_server().is_some() {
            println!("    (explicit; config file auth ignored)");
        }
        println!("  auth: {}", auth.as_deref().unwrap_or("(not configured)"));
        if trusted_certs.is_empty() {
            println!("  trusted_certs: (none)");
        } else {
            println!("  trusted_certs: {}", trusted_certs.join(", "));
        }
        match &secret_ring {
            Some(ring) => println!("  secret_ring: {}", ring.display()),
            None => println!("  secret_ring: (none)"),
        }
        match signer {
            Ok(blob) => println!("  signer_key: {} ({})", blob.blob_ref, blob.path.display()),
            Err(e) => println!("  signer_key: (unavailable: {e})"),
        }
    }

    Ok(())
}
