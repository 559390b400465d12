//! camli - inspect the resolved camli client configuration
//!
//! Shows which server, auth mode, trusted certificates and signer key a
//! camli client would use, resolved from `<config dir>/config` and the
//! environment.

use clap::Parser;

mod commands;

use commands::Cli;

fn main() {
    camli_core::logging::init();
    let cli = Cli::parse();

    if let Err(e) = cli.execute() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
