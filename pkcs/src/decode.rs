//! Entry points that turn key file bytes into a key specification.

use std::fmt::{Display, Formatter};

use pemstore::decoder::Decoder;
use pemstore_der::{DerReader, Tag};
use pemstore_pem::{DEK_INFO, Label, Pem};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::algorithm::KeyAlgorithm;
use crate::error::{Error, Result};
use crate::format::KeyFormat;
use crate::key_spec::{KeySpecification, RsaParams};
use crate::legacy::{self, DekInfo};
use crate::pkcs8::{self, EncryptedPrivateKeyInfo, PrivateKeyInfo};
use crate::policy::DecodeOptions;
use crate::private_key::PrivateKey;

/// Which structure a key file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyStructure {
    /// PKCS#1 RSAPrivateKey in the clear
    Pkcs1,
    /// PKCS#1 RSAPrivateKey under `Proc-Type`/`DEK-Info` encryption
    LegacyEncryptedPkcs1,
    /// PKCS#8 PrivateKeyInfo
    Pkcs8,
    /// PKCS#8 EncryptedPrivateKeyInfo
    EncryptedPkcs8,
}

impl Display for KeyStructure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            KeyStructure::Pkcs1 => "PKCS#1",
            KeyStructure::LegacyEncryptedPkcs1 => "PKCS#1 (legacy encrypted)",
            KeyStructure::Pkcs8 => "PKCS#8",
            KeyStructure::EncryptedPkcs8 => "PKCS#8 (encrypted)",
        };
        write!(f, "{}", name)
    }
}

/// What can be learned about a key file without a password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub format: KeyFormat,
    /// PEM label, absent for DER input
    pub label: Option<String>,
    pub structure: KeyStructure,
    /// Key algorithm, when it is visible without decrypting
    pub algorithm: Option<KeyAlgorithm>,
    /// Cipher or PBE scheme name for encrypted keys
    pub encryption: Option<String>,
}

impl KeyInfo {
    pub fn is_encrypted(&self) -> bool {
        self.encryption.is_some()
    }
}

/// Decodes a key file in any supported encoding.
///
/// `password` is only consulted for encrypted keys. Every call decodes from
/// scratch and the returned specification is never cached.
pub fn decode_key(
    bytes: &[u8],
    password: Option<&[u8]>,
    options: &DecodeOptions,
) -> Result<KeySpecification> {
    match KeyFormat::detect(bytes) {
        KeyFormat::Pem => decode_pem(&Pem::from_utf8(bytes)?, password, options),
        KeyFormat::Der => decode_der(bytes, password, options),
    }
}

/// Decodes a key file and builds the private key from it.
pub fn load_private_key(
    bytes: &[u8],
    password: Option<&[u8]>,
    options: &DecodeOptions,
) -> Result<PrivateKey> {
    let spec = decode_key(bytes, password, options)?;
    PrivateKey::try_from(&spec)
}

fn decode_pem(
    pem: &Pem,
    password: Option<&[u8]>,
    options: &DecodeOptions,
) -> Result<KeySpecification> {
    debug!(label = %pem.label(), "decoding PEM key");
    let der: Zeroizing<Vec<u8>> = Zeroizing::new(pem.decode()?);
    match pem.label() {
        Label::RsaPrivateKey if pem.headers().is_empty() => decode_pkcs1(&der),
        Label::RsaPrivateKey => {
            let plain = legacy::decrypt(pem.headers(), &der, password, options)?;
            decode_pkcs1(&plain).map_err(|e| options.heuristic.structure_failure(e))
        }
        Label::PrivateKey => pkcs8::key_specification(&der),
        Label::EncryptedPrivateKey => decode_encrypted(&der, password, options),
        other => Err(Error::UnrecognizedLabel(other.to_string())),
    }
}

fn decode_der(
    der: &[u8],
    password: Option<&[u8]>,
    options: &DecodeOptions,
) -> Result<KeySpecification> {
    let structure = classify_der(der)?;
    debug!(%structure, "decoding DER key");
    match structure {
        KeyStructure::Pkcs1 => decode_pkcs1(der),
        KeyStructure::Pkcs8 => pkcs8::key_specification(der),
        KeyStructure::EncryptedPkcs8 => decode_encrypted(der, password, options),
        KeyStructure::LegacyEncryptedPkcs1 => {
            Err(Error::UnrecognizedStructure("legacy encryption requires PEM headers"))
        }
    }
}

fn decode_pkcs1(der: &[u8]) -> Result<KeySpecification> {
    let params: RsaParams = der.decode()?;
    Ok(KeySpecification::Rsa(params))
}

fn decode_encrypted(
    der: &[u8],
    password: Option<&[u8]>,
    options: &DecodeOptions,
) -> Result<KeySpecification> {
    let info: EncryptedPrivateKeyInfo = der.decode()?;
    info.decrypt(password, options)
}

/// Tells the DER structures apart by their first two elements:
///
/// - RSAPrivateKey: INTEGER, INTEGER, ...
/// - PrivateKeyInfo: INTEGER, SEQUENCE, ...
/// - EncryptedPrivateKeyInfo: SEQUENCE, OCTET STRING
fn classify_der(der: &[u8]) -> Result<KeyStructure> {
    let mut outer = DerReader::new(der);
    let mut seq = outer.read_sequence()?;
    match seq.peek_tag() {
        Some(Tag::Integer) => {
            seq.read_any()?;
            match seq.peek_tag() {
                Some(Tag::Integer) => Ok(KeyStructure::Pkcs1),
                Some(Tag::Sequence) => Ok(KeyStructure::Pkcs8),
                _ => Err(Error::UnrecognizedStructure("unexpected second element")),
            }
        }
        Some(Tag::Sequence) => Ok(KeyStructure::EncryptedPkcs8),
        _ => Err(Error::UnrecognizedStructure("unexpected first element")),
    }
}

/// Reports the structure and encryption of a key file without decrypting it.
pub fn inspect(bytes: &[u8]) -> Result<KeyInfo> {
    match KeyFormat::detect(bytes) {
        KeyFormat::Pem => {
            let pem = Pem::from_utf8(bytes)?;
            let der: Zeroizing<Vec<u8>> = Zeroizing::new(pem.decode()?);
            let label = Some(pem.label().to_string());
            match pem.label() {
                Label::RsaPrivateKey if pem.headers().is_empty() => {
                    describe_der(KeyFormat::Pem, label, KeyStructure::Pkcs1, &der)
                }
                Label::RsaPrivateKey => {
                    let dek_info: DekInfo = pem
                        .headers()
                        .get(DEK_INFO)
                        .ok_or(Error::MissingHeader(DEK_INFO))?
                        .parse()?;
                    Ok(KeyInfo {
                        format: KeyFormat::Pem,
                        label,
                        structure: KeyStructure::LegacyEncryptedPkcs1,
                        algorithm: Some(KeyAlgorithm::Rsa),
                        encryption: Some(dek_info.cipher.to_string()),
                    })
                }
                Label::PrivateKey => describe_der(KeyFormat::Pem, label, KeyStructure::Pkcs8, &der),
                Label::EncryptedPrivateKey => {
                    describe_der(KeyFormat::Pem, label, KeyStructure::EncryptedPkcs8, &der)
                }
                other => Err(Error::UnrecognizedLabel(other.to_string())),
            }
        }
        KeyFormat::Der => {
            let structure = classify_der(bytes)?;
            describe_der(KeyFormat::Der, None, structure, bytes)
        }
    }
}

fn describe_der(
    format: KeyFormat,
    label: Option<String>,
    structure: KeyStructure,
    der: &[u8],
) -> Result<KeyInfo> {
    let (algorithm, encryption) = match structure {
        KeyStructure::Pkcs1 | KeyStructure::LegacyEncryptedPkcs1 => {
            let _: RsaParams = der.decode()?;
            (Some(KeyAlgorithm::Rsa), None)
        }
        KeyStructure::Pkcs8 => {
            let info: PrivateKeyInfo = der.decode()?;
            (info.key_algorithm().ok(), None)
        }
        KeyStructure::EncryptedPkcs8 => {
            let info: EncryptedPrivateKeyInfo = der.decode()?;
            let scheme = match info.scheme() {
                Ok(scheme) => scheme.name().to_string(),
                Err(Error::UnsupportedAlgorithm(name)) => name,
                Err(e) => return Err(e),
            };
            (None, Some(scheme))
        }
    };
    Ok(KeyInfo {
        format,
        label,
        structure,
        algorithm,
        encryption,
    })
}
