pub(crate) mod inspect;

use clap::Subcommand;

#[derive(Subcommand)]
pub(crate) enum KeyCommands {
    /// Inspect a private key file and optionally decrypt it
    Inspect {
        #[command(flatten)]
        config: inspect::Config,
    },
}
