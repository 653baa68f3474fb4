pub(crate) mod check;

use clap::Subcommand;

#[derive(Subcommand)]
pub(crate) enum StoreCommands {
    /// Load a key and certificate chain the way a key store would
    Check {
        #[command(flatten)]
        config: check::Config,
    },
}
