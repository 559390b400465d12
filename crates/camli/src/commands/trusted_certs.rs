//! Trusted-certs command implementation

use anyhow::Result;
use camli_core::Client;

/// Execute the trusted-certs command
pub fn execute(client: &Client) -> Result<()> {
    for cert in client.trusted_certs()? {
        println!("{cert}");
    }
    Ok(())
}
