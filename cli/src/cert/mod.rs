pub(crate) mod inspect;

use clap::Subcommand;

#[derive(Subcommand)]
pub(crate) enum CertCommands {
    /// Inspect a certificate or certificate chain
    Inspect {
        #[command(flatten)]
        config: inspect::Config,
    },
}
