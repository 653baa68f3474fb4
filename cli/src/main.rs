use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cert;
mod error;
mod key;
mod output;
mod store;
mod utils;

use error::Result;

use cert::CertCommands;
use key::KeyCommands;
use store::StoreCommands;

#[derive(Parser)]
#[command(name = "pemstore")]
#[command(about = "Private key, certificate chain and key store toolkit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Private key operations
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },
    /// Certificate operations
    Cert {
        #[command(subcommand)]
        command: CertCommands,
    },
    /// Key store operations
    Store {
        #[command(subcommand)]
        command: StoreCommands,
    },
}

fn init_tracing() {
    // logs go to stderr so they never mix with command output
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Key { command } => match command {
            KeyCommands::Inspect { config } => key::inspect::execute(config),
        },
        Commands::Cert { command } => match command {
            CertCommands::Inspect { config } => cert::inspect::execute(config),
        },
        Commands::Store { command } => match command {
            StoreCommands::Check { config } => store::check::execute(config),
        },
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
