use clap::Args;
use pemstore_x509::{CertificateChain, CertificateSummary};

use crate::error::Result;
use crate::output::OutputFormat;
use crate::utils::{read_input, yes_no};

#[derive(Args)]
pub(crate) struct Config {
    /// Path to a PEM or DER certificate chain. If not specified, reads from stdin
    pub(crate) file: Option<String>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub(crate) output: OutputFormat,

    /// Only show the leaf certificate
    #[arg(long)]
    pub(crate) leaf_only: bool,
}

pub(crate) fn execute(config: Config) -> Result<()> {
    let input = read_input(config.file.as_deref())?;
    let chain = CertificateChain::from_bytes(&input)?;
    let count = if config.leaf_only { 1 } else { chain.len() };

    let summaries = chain
        .iter()
        .take(count)
        .map(|cert| cert.summary())
        .collect::<pemstore_x509::Result<Vec<_>>>()?;

    match config.output {
        OutputFormat::Text => {
            for (index, summary) in summaries.iter().enumerate() {
                print_text(index, summary);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
    }
    Ok(())
}

pub(crate) fn print_text(index: usize, summary: &CertificateSummary) {
    println!("Certificate [{}]:", index);
    println!("    Subject: {}", summary.subject);
    println!("    Issuer: {}", summary.issuer);
    println!("    Serial Number: {}", summary.serial_number);
    println!("    Validity:");
    println!("        Not Before: {}", summary.not_before);
    println!("        Not After : {}", summary.not_after);
    println!("    Public Key Algorithm: {}", summary.public_key_algorithm);
    println!("    Self-signed: {}", yes_no(summary.self_signed));
    println!("    CA: {}", yes_no(summary.ca));
}
