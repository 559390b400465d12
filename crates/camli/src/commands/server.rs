//! Server command implementation

use anyhow::Result;
use camli_core::Client;

/// Execute the server command
pub fn execute(client: &Client) -> Result<()> {
    println!("{}", client.server()?);
    Ok(())
}
