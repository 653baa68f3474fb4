use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use pemstore_keystore::{KeyStore, PasswordPrompt, Protection, StoreConfig};
use pemstore_pkcs::{BadPasswordHeuristic, KeyInfo, inspect};
use pemstore_x509::CertificateSummary;
use serde::Serialize;

use crate::error::Result;
use crate::output::OutputFormat;
use crate::utils::{PasswordArgs, prompt_password};

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum HeuristicArg {
    /// Padding failures and unparseable plaintext mean a wrong password
    PaddingAndStructure,
    /// Only padding failures mean a wrong password
    PaddingOnly,
    /// Decryption failures are reported as a malformed key
    Off,
}

impl From<HeuristicArg> for BadPasswordHeuristic {
    fn from(arg: HeuristicArg) -> Self {
        match arg {
            HeuristicArg::PaddingAndStructure => BadPasswordHeuristic::PaddingAndStructure,
            HeuristicArg::PaddingOnly => BadPasswordHeuristic::PaddingOnly,
            HeuristicArg::Off => BadPasswordHeuristic::Off,
        }
    }
}

#[derive(Args)]
pub(crate) struct Config {
    /// Private key file (PEM or DER)
    #[arg(long)]
    pub(crate) key: PathBuf,

    /// Certificate chain file (PEM or DER)
    #[arg(long)]
    pub(crate) cert: PathBuf,

    /// Alias of the store entry
    #[arg(long, default_value = "default")]
    pub(crate) alias: String,

    #[command(flatten)]
    pub(crate) password: PasswordArgs,

    /// Password attempts when prompting
    #[arg(long, default_value_t = pemstore_keystore::config::DEFAULT_MAX_ATTEMPTS)]
    pub(crate) max_attempts: u32,

    /// Fail if the key file is readable by group or others
    #[arg(long)]
    pub(crate) require_private_permissions: bool,

    /// Largest symmetric key size allowed for decryption, in bits
    #[arg(long)]
    pub(crate) max_key_bits: Option<u32>,

    /// How decryption failures are attributed to the password
    #[arg(long, value_enum, default_value = "padding-and-structure")]
    pub(crate) bad_password_heuristic: HeuristicArg,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub(crate) output: OutputFormat,
}

#[derive(Serialize)]
struct StoreReport {
    alias: String,
    size: usize,
    created_at: Option<DateTime<Utc>>,
    key: KeyInfo,
    certificates: Vec<CertificateSummary>,
}

pub(crate) fn execute(config: Config) -> Result<()> {
    let mut store_config = StoreConfig::new(&config.alias, &config.key, &config.cert)
        .with_max_attempts(config.max_attempts)
        .with_private_permissions(config.require_private_permissions)
        .with_bad_password_heuristic(config.bad_password_heuristic.into());
    if let Some(bits) = config.max_key_bits {
        store_config = store_config.with_max_key_bits(bits);
    }

    let store = KeyStore::new(store_config, protection(&config.password)?);
    store.load()?;

    let alias = config.alias.as_str();
    let certificates = store
        .certificate_chain(alias)?
        .map(|chain| {
            chain
                .iter()
                .map(|cert| cert.summary())
                .collect::<pemstore_x509::Result<Vec<_>>>()
        })
        .transpose()?
        .unwrap_or_default();
    let report = StoreReport {
        alias: alias.to_string(),
        size: store.size()?,
        created_at: store.creation_date(alias)?,
        key: inspect(&std::fs::read(&config.key)?)?,
        certificates,
    };

    match config.output {
        OutputFormat::Text => print_text(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn protection(args: &PasswordArgs) -> Result<Protection> {
    if args.prompt {
        return Ok(Protection::interactive(|prompt: &PasswordPrompt<'_>| {
            let message = match prompt.encryption {
                Some(cipher) => format!(
                    "Enter password for '{}' ({}) [{}/{}]: ",
                    prompt.alias, cipher, prompt.attempt, prompt.max_attempts
                ),
                None => format!(
                    "Enter password for '{}' [{}/{}]: ",
                    prompt.alias, prompt.attempt, prompt.max_attempts
                ),
            };
            prompt_password(&message)
        }));
    }
    Ok(match args.env_password()? {
        Some(password) => Protection::Password(password),
        None => Protection::none(),
    })
}

fn print_text(report: &StoreReport) {
    println!("Key Store: OK");
    println!("    Alias: {}", report.alias);
    println!("    Entries: {}", report.size);
    if let Some(created_at) = report.created_at {
        println!("    Created: {}", created_at);
    }
    println!("    Key: {} ({})", report.key.structure, report.key.format);
    if let Some(cipher) = &report.key.encryption {
        println!("    Encryption: {}", cipher);
    }
    for (index, summary) in report.certificates.iter().enumerate() {
        crate::cert::inspect::print_text(index, summary);
    }
}
