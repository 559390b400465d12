//! Auth command implementation

use anyhow::Result;
use camli_core::{AuthError, Client};

/// Execute the auth command
///
/// Passwords are never printed.
pub fn execute(client: &Client) -> Result<()> {
    match client.auth_mode() {
        Ok(mode) => println!("{mode}"),
        Err(AuthError::NotConfigured) => println!("not configured"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
