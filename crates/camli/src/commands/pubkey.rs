//! Pubkey command implementation

use anyhow::Result;
use camli_core::Client;
use clap::Args;

/// Print the signer's public key blobref
#[derive(Args, Debug)]
pub struct PubkeyArgs {
    /// Print the armored public key instead of its blobref
    #[arg(long)]
    armored: bool,

    /// Also print where the key blob was published
    #[arg(long, conflicts_with = "armored")]
    path: bool,
}

/// Execute the pubkey command
pub fn execute(args: PubkeyArgs, client: &Client) -> Result<()> {
    let blob = client.signer_public_key()?;

    if args.armored {
        print!("{}", blob.armored);
    } else if args.path {
        println!("{} {}", blob.blob_ref, blob.path.display());
    } else {
        println!("{}", blob.blob_ref);
    }
    Ok(())
}
