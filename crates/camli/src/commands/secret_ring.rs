//! Secret-ring command implementation

use anyhow::{Context, Result};
use camli_core::Client;

/// Execute the secret-ring command
pub fn execute(client: &Client) -> Result<()> {
    let ring = client
        .secret_ring_file()?
        .context("No secret keyring configured and no home directory to look in")?;
    println!("{}", ring.display());
    Ok(())
}
