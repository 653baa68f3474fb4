use clap::Args;
use pemstore_pkcs::{
    CryptoPolicy, DecodeOptions, KeyAlgorithm, KeyInfo, PrivateKey, inspect, load_private_key,
};
use serde::Serialize;
use zeroize::Zeroizing;

use crate::error::Result;
use crate::output::OutputFormat;
use crate::utils::{PasswordArgs, prompt_password, read_input};

#[derive(Args)]
pub(crate) struct Config {
    /// Path to the key file (PEM or DER). If not specified, reads from stdin
    pub(crate) file: Option<String>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub(crate) output: OutputFormat,

    #[command(flatten)]
    pub(crate) password: PasswordArgs,

    /// Largest symmetric key size allowed for decryption, in bits
    #[arg(long)]
    pub(crate) max_key_bits: Option<u32>,
}

#[derive(Serialize)]
struct KeyReport {
    #[serde(flatten)]
    info: KeyInfo,
    /// Whether the key was decoded all the way to a usable key
    decoded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_size: Option<u64>,
}

pub(crate) fn execute(config: Config) -> Result<()> {
    let bytes = Zeroizing::new(read_input(config.file.as_deref())?);
    let mut info = inspect(&bytes)?;

    let key = match password(&config, &info)? {
        Some(password) => Some(load_private_key(&bytes, Some(password.as_slice()), &options(&config))?),
        None if !info.is_encrypted() => Some(load_private_key(&bytes, None, &options(&config))?),
        None => None,
    };
    if let Some(key) = &key {
        info.algorithm = Some(key.algorithm());
    }

    let report = KeyReport {
        info,
        decoded: key.is_some(),
        key_size: key.as_ref().map(PrivateKey::key_size),
    };

    match config.output {
        OutputFormat::Text => print_text(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn options(config: &Config) -> DecodeOptions {
    let policy = config
        .max_key_bits
        .map(CryptoPolicy::with_max_key_bits)
        .unwrap_or_default();
    DecodeOptions::new(policy, Default::default())
}

fn password(config: &Config, info: &KeyInfo) -> Result<Option<Zeroizing<Vec<u8>>>> {
    if !info.is_encrypted() {
        return Ok(None);
    }
    if config.password.prompt {
        return Ok(prompt_password("Enter password: "));
    }
    config.password.env_password()
}

fn print_text(report: &KeyReport) {
    let info = &report.info;
    println!("Private Key:");
    println!("    Format: {}", info.format);
    if let Some(label) = &info.label {
        println!("    Label: {}", label);
    }
    println!("    Structure: {}", info.structure);
    println!(
        "    Encryption: {}",
        info.encryption.as_deref().unwrap_or("none")
    );
    println!(
        "    Algorithm: {}",
        info.algorithm
            .as_ref()
            .map(KeyAlgorithm::name)
            .unwrap_or("unknown")
    );
    match report.key_size {
        Some(bits) => println!("    Key Size: {} bits", bits),
        None => println!("    Key Size: unknown (encrypted, no password given)"),
    }
}
