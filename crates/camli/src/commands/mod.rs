//! CLI command dispatch and execution

use anyhow::Result;
use camli_core::{Client, ClientOptions};
use clap::{Parser, Subcommand};
use tracing::debug;

mod auth;
mod config_cmd;
mod pubkey;
mod secret_ring;
mod server;
mod trusted_certs;

/// camli - inspect the resolved camli client configuration
#[derive(Parser, Debug)]
#[command(
    name = "camli",
    version,
    about = "Inspect the resolved camli client configuration",
    long_about = "Resolve the server, auth mode, trusted certificates and signer key a camli client would use"
)]
pub struct Cli {
    /// Server to use instead of the configured one; disables config-file auth
    #[arg(long, global = true, value_name = "URL")]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the effective configuration
    Config(config_cmd::ConfigArgs),

    /// Print the resolved server URL
    Server,

    /// Print the resolved auth mode
    Auth,

    /// Print the signer's public key blobref, publishing it if needed
    Pubkey(pubkey::PubkeyArgs),

    /// Print the secret keyring a signer would use
    SecretRing,

    /// Print trusted certificate fingerprints, one per line
    TrustedCerts,
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        debug!(server = ?self.server, command = ?self.command, "Dispatching command");
        let client = Client::from_process(ClientOptions {
            server: self.server,
        })?;

        match self.command {
            Commands::Config(args) => config_cmd::execute(args, &client),
            Commands::Server => server::execute(&client),
            Commands::Auth => auth::execute(&client),
            Commands::Pubkey(args) => pubkey::execute(args, &client),
            Commands::SecretRing => secret_ring::execute(&client),
            Commands::TrustedCerts => trusted_certs::execute(&client),
        }
    }
}
