use std::path::{Path, PathBuf};

use pemstore_pkcs::{BadPasswordHeuristic, CryptoPolicy, DecodeOptions};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

/// Where the key store finds its entry and how it decodes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StoreConfig {
    pub alias: String,
    pub key_path: PathBuf,
    pub cert_path: PathBuf,
    /// Password attempts for interactive protection
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fail instead of warn when the key file is readable by others
    #[serde(default)]
    pub require_private_permissions: bool,
    #[serde(default)]
    pub max_key_bits: Option<u32>,
    #[serde(default)]
    pub bad_password_heuristic: BadPasswordHeuristic,
}

impl StoreConfig {
    pub fn new(
        alias: impl Into<String>,
        key_path: impl AsRef<Path>,
        cert_path: impl AsRef<Path>,
    ) -> Self {
        StoreConfig {
            alias: alias.into(),
            key_path: key_path.as_ref().to_path_buf(),
            cert_path: cert_path.as_ref().to_path_buf(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            require_private_permissions: false,
            max_key_bits: None,
            bad_password_heuristic: BadPasswordHeuristic::default(),
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_private_permissions(mut self, required: bool) -> Self {
        self.require_private_permissions = required;
        self
    }

    pub fn with_max_key_bits(mut self, bits: u32) -> Self {
        self.max_key_bits = Some(bits);
        self
    }

    pub fn with_bad_password_heuristic(mut self, heuristic: BadPasswordHeuristic) -> Self {
        self.bad_password_heuristic = heuristic;
        self
    }

    /// Between one and [`DEFAULT_MAX_ATTEMPTS`] attempts, whatever was configured.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.clamp(1, DEFAULT_MAX_ATTEMPTS)
    }

    pub fn decode_options(&self) -> DecodeOptions {
        let policy = match self.max_key_bits {
            Some(bits) => CryptoPolicy::with_max_key_bits(bits),
            None => CryptoPolicy::unlimited(),
        };
        DecodeOptions::new(policy, self.bad_password_heuristic)
    }
}
