//! Decoded, not yet constructed, private key parameters.

use std::fmt::{Debug, Formatter};

use num_bigint::BigUint;
use pemstore_der::ObjectIdentifier;
use zeroize::Zeroizing;

use crate::algorithm::KeyAlgorithm;

/// RSA modulus and private exponent.
///
/// The private exponent is kept as big-endian bytes so it can be wiped.
/// The public exponent is carried along only to build the usable key.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaParams {
    modulus: BigUint,
    private_exponent: Zeroizing<Vec<u8>>,
    public_exponent: BigUint,
}

impl RsaParams {
    pub fn new(modulus: BigUint, public_exponent: BigUint, private_exponent: &[u8]) -> Self {
        let start = private_exponent
            .iter()
            .position(|&b| b != 0)
            .unwrap_or(private_exponent.len());
        RsaParams {
            modulus,
            private_exponent: Zeroizing::new(private_exponent[start..].to_vec()),
            public_exponent,
        }
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    pub fn private_exponent(&self) -> &[u8] {
        &self.private_exponent
    }

    pub fn key_size(&self) -> u64 {
        self.modulus.bits()
    }

    pub(crate) fn public_exponent(&self) -> &BigUint {
        &self.public_exponent
    }
}

impl Debug for RsaParams {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaParams")
            .field("key_size", &self.key_size())
            .field("private_exponent", &"<redacted>")
            .finish()
    }
}

/// Result of decoding a key file.
///
/// A specification is produced fresh by every decode and dropped as soon as
/// the [`PrivateKey`](crate::PrivateKey) is built from it.
#[derive(Clone, PartialEq, Eq)]
pub enum KeySpecification {
    /// PKCS#1 RSA parameters
    Rsa(RsaParams),
    /// A PKCS#8 PrivateKeyInfo kept in its DER encoding
    Opaque {
        algorithm: ObjectIdentifier,
        encoded: Zeroizing<Vec<u8>>,
    },
}

impl KeySpecification {
    pub fn key_algorithm(&self) -> Option<KeyAlgorithm> {
        match self {
            KeySpecification::Rsa(_) => Some(KeyAlgorithm::Rsa),
            KeySpecification::Opaque { algorithm, .. } => KeyAlgorithm::from_oid(algorithm).ok(),
        }
    }
}

impl Debug for KeySpecification {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySpecification::Rsa(params) => f.debug_tuple("Rsa").field(params).finish(),
            KeySpecification::Opaque { algorithm, encoded } => f
                .debug_struct("Opaque")
                .field("algorithm", &algorithm.to_string())
                .field("encoded_len", &encoded.len())
                .finish(),
        }
    }
}
