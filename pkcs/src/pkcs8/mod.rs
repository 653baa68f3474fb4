//! PKCS#8: Private-Key Information Syntax Specification
//!
//! Cleartext [`PrivateKeyInfo`] (RFC 5208) and password-encrypted
//! [`EncryptedPrivateKeyInfo`]. Only RSA and DSA keys are recognized.

mod encrypted;
pub mod pbe;

use pemstore::decoder::{DecodableFrom, Decoder};
use pemstore_der::DerReader;
use tracing::debug;
use zeroize::Zeroizing;

use crate::algorithm::{AlgorithmIdentifier, KeyAlgorithm};
use crate::error::{Error, Result};
use crate::key_spec::KeySpecification;

pub use encrypted::EncryptedPrivateKeyInfo;
pub use pbe::{PbeParameter, PbeScheme};

/*
RFC 5208 Section 5

PrivateKeyInfo ::= SEQUENCE {
    version                   Version,
    privateKeyAlgorithm       PrivateKeyAlgorithmIdentifier,
    privateKey                PrivateKey,
    attributes           [0]  IMPLICIT Attributes OPTIONAL }

Version ::= INTEGER
PrivateKey ::= OCTET STRING
*/

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateKeyInfo<'a> {
    pub private_key_algorithm: AlgorithmIdentifier<'a>,
    /// Algorithm specific encoding, e.g. a PKCS#1 RSAPrivateKey for RSA
    pub private_key: &'a [u8],
}

impl PrivateKeyInfo<'_> {
    pub fn key_algorithm(&self) -> Result<KeyAlgorithm> {
        KeyAlgorithm::from_oid(&self.private_key_algorithm.algorithm)
    }
}

impl<'a> DecodableFrom<&'a [u8]> for PrivateKeyInfo<'a> {}

impl<'a> Decoder<&'a [u8], PrivateKeyInfo<'a>> for &'a [u8] {
    type Error = Error;

    fn decode(&self) -> Result<PrivateKeyInfo<'a>> {
        let mut outer = DerReader::new(*self);
        let mut seq = outer.read_sequence()?;
        outer.finish()?;

        let version = seq.read_u64()?;
        if version != 0 {
            return Err(Error::InvalidVersion {
                structure: "PrivateKeyInfo",
                version,
            });
        }
        let private_key_algorithm: AlgorithmIdentifier = seq.read_element()?.decode()?;
        let private_key = seq.read_octet_string()?;
        // attributes are not interpreted

        Ok(PrivateKeyInfo {
            private_key_algorithm,
            private_key,
        })
    }
}

/// Validates a cleartext PrivateKeyInfo and keeps it whole as an opaque
/// specification.
pub(crate) fn key_specification(der: &[u8]) -> Result<KeySpecification> {
    let info: PrivateKeyInfo = der.decode()?;
    let algorithm = info.key_algorithm()?;
    debug!(algorithm = %algorithm, "decoded PKCS#8 private key info");
    Ok(KeySpecification::Opaque {
        algorithm: info.private_key_algorithm.algorithm,
        encoded: Zeroizing::new(der.to_vec()),
    })
}
