use serde::{Deserialize, Serialize};

use crate::cipher::CipherError;
use crate::error::{Error, ErrorKind, Result};

/// Upper bound on symmetric key sizes a decode may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoPolicy {
    max_key_bits: Option<u32>,
}

impl CryptoPolicy {
    pub const fn unlimited() -> Self {
        CryptoPolicy { max_key_bits: None }
    }

    pub const fn with_max_key_bits(bits: u32) -> Self {
        CryptoPolicy {
            max_key_bits: Some(bits),
        }
    }

    pub fn max_key_bits(&self) -> Option<u32> {
        self.max_key_bits
    }

    pub fn check(&self, cipher: &str, bits: u32) -> Result<()> {
        match self.max_key_bits {
            Some(max) if bits > max => Err(Error::KeyTooLarge {
                cipher: cipher.to_string(),
                bits,
                max,
            }),
            _ => Ok(()),
        }
    }
}

/// How decryption failures are attributed to the password.
///
/// Unauthenticated ciphers cannot prove a password wrong. A padding failure
/// or a decrypted payload that does not parse are the only signals, and both
/// can also come from a corrupt file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BadPasswordHeuristic {
    /// Padding failures and unparseable plaintext are both `BadPassword`.
    #[default]
    PaddingAndStructure,
    /// Only padding failures are `BadPassword`.
    PaddingOnly,
    /// Every decryption failure is reported as a malformed key.
    Off,
}

impl BadPasswordHeuristic {
    pub(crate) fn cipher_failure(&self, err: CipherError) -> Error {
        match (self, err) {
            (BadPasswordHeuristic::Off, CipherError::Padding) => {
                Error::DecryptionFailed(CipherError::Padding.to_string())
            }
            (_, CipherError::Padding) => Error::BadPassword,
            (_, err) => Error::Cipher(err),
        }
    }

    /// Classifies a failure to parse freshly decrypted bytes.
    pub(crate) fn structure_failure(&self, err: Error) -> Error {
        match self {
            BadPasswordHeuristic::PaddingAndStructure if err.kind() == ErrorKind::MalformedKey => {
                Error::BadPassword
            }
            _ => err,
        }
    }
}

/// Settings applied to every key decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    pub policy: CryptoPolicy,
    pub heuristic: BadPasswordHeuristic,
}

impl DecodeOptions {
    pub fn new(policy: CryptoPolicy, heuristic: BadPasswordHeuristic) -> Self {
        DecodeOptions { policy, heuristic }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest(
        policy,
        bits,
        ok,
        case(CryptoPolicy::unlimited(), 256, true),
        case(CryptoPolicy::with_max_key_bits(128), 128, true),
        case(CryptoPolicy::with_max_key_bits(128), 192, false),
        case(CryptoPolicy::with_max_key_bits(64), 64, true)
    )]
    fn test_policy_check(policy: CryptoPolicy, bits: u32, ok: bool) {
        let result = policy.check("AES-192-CBC", bits);
        assert_eq!(ok, result.is_ok());
        if let Err(e) = result {
            assert_eq!(ErrorKind::KeyTooLarge, e.kind());
        }
    }

    #[rstest(
        heuristic,
        padding,
        structure,
        case(BadPasswordHeuristic::PaddingAndStructure, ErrorKind::BadPassword, ErrorKind::BadPassword),
        case(BadPasswordHeuristic::PaddingOnly, ErrorKind::BadPassword, ErrorKind::MalformedKey),
        case(BadPasswordHeuristic::Off, ErrorKind::MalformedKey, ErrorKind::MalformedKey)
    )]
    fn test_heuristic(
        heuristic: BadPasswordHeuristic,
        padding: ErrorKind,
        structure: ErrorKind,
    ) {
        assert_eq!(padding, heuristic.cipher_failure(CipherError::Padding).kind());
        let parse_err = Error::Der(pemstore_der::Error::UnexpectedEof);
        assert_eq!(structure, heuristic.structure_failure(parse_err).kind());
    }

    #[test]
    fn test_heuristic_keeps_unsupported() {
        let err = Error::UnsupportedAlgorithm("1.2.3.4".into());
        let mapped = BadPasswordHeuristic::PaddingAndStructure.structure_failure(err);
        assert_eq!(ErrorKind::UnsupportedAlgorithm, mapped.kind());
    }

    #[test]
    fn test_heuristic_non_padding_cipher_error() {
        let err = BadPasswordHeuristic::PaddingAndStructure
            .cipher_failure(CipherError::InvalidCiphertextLength(15));
        assert_eq!(ErrorKind::MalformedKey, err.kind());
    }
}
