//! Usable private keys built from a [`KeySpecification`].
//!
//! The specification is borrowed only for the duration of the conversion;
//! the caller drops it once the key exists.

use std::fmt::{Debug, Formatter};

use num_bigint::BigUint;
use pemstore::decoder::Decoder;
use pemstore_der::DerReader;
use rsa::hazmat::rsa_decrypt_and_check;
use rsa::traits::PublicKeyParts;
use zeroize::Zeroizing;

use crate::algorithm::KeyAlgorithm;
use crate::error::{Error, Result};
use crate::key_spec::{KeySpecification, RsaParams};
use crate::pkcs1::read_unsigned;
use crate::pkcs8::PrivateKeyInfo;

#[derive(Clone, PartialEq, Eq)]
pub enum PrivateKey {
    Rsa(RsaPrivateKey),
    Dsa(DsaPrivateKey),
}

impl PrivateKey {
    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            PrivateKey::Rsa(_) => KeyAlgorithm::Rsa,
            PrivateKey::Dsa(_) => KeyAlgorithm::Dsa,
        }
    }

    /// Modulus size for RSA, size of `p` for DSA.
    pub fn key_size(&self) -> u64 {
        match self {
            PrivateKey::Rsa(key) => key.key_size(),
            PrivateKey::Dsa(key) => key.p.bits(),
        }
    }

    pub fn as_rsa(&self) -> Option<&RsaPrivateKey> {
        match self {
            PrivateKey::Rsa(key) => Some(key),
            PrivateKey::Dsa(_) => None,
        }
    }
}

impl Debug for PrivateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PrivateKey::Rsa(key) => f.debug_tuple("Rsa").field(key).finish(),
            PrivateKey::Dsa(key) => f.debug_tuple("Dsa").field(key).finish(),
        }
    }
}

impl TryFrom<&KeySpecification> for PrivateKey {
    type Error = Error;

    fn try_from(spec: &KeySpecification) -> Result<Self> {
        match spec {
            KeySpecification::Rsa(params) => RsaPrivateKey::try_from(params).map(PrivateKey::Rsa),
            KeySpecification::Opaque { encoded, .. } => {
                let der: &[u8] = encoded.as_slice();
                let info: PrivateKeyInfo = der.decode()?;
                match info.key_algorithm()? {
                    KeyAlgorithm::Rsa => {
                        let params: RsaParams = info.private_key.decode()?;
                        RsaPrivateKey::try_from(&params).map(PrivateKey::Rsa)
                    }
                    KeyAlgorithm::Dsa => DsaPrivateKey::from_private_key_info(&info).map(PrivateKey::Dsa),
                }
            }
        }
    }
}

/// RSA private key backed by [`rsa::RsaPrivateKey`].
///
/// The primes are recovered from `(n, e, d)` when the key is built, so the
/// key is validated before it is handed out.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaPrivateKey {
    inner: rsa::RsaPrivateKey,
}

impl TryFrom<&RsaParams> for RsaPrivateKey {
    type Error = Error;

    fn try_from(params: &RsaParams) -> Result<Self> {
        let n = rsa::BigUint::from_bytes_be(&params.modulus().to_bytes_be());
        let e = rsa::BigUint::from_bytes_be(&params.public_exponent().to_bytes_be());
        let d = rsa::BigUint::from_bytes_be(params.private_exponent());
        let inner = rsa::RsaPrivateKey::from_components(n, e, d, vec![])?;
        Ok(RsaPrivateKey { inner })
    }
}

impl RsaPrivateKey {
    pub fn modulus(&self) -> &rsa::BigUint {
        self.inner.n()
    }

    pub fn public_exponent(&self) -> &rsa::BigUint {
        self.inner.e()
    }

    pub fn key_size(&self) -> u64 {
        self.inner.n().bits() as u64
    }

    /// Modulus length in bytes.
    pub fn size(&self) -> usize {
        self.inner.size()
    }

    /// Raw RSA decryption, `c^d mod n`, without padding removal.
    pub fn decrypt_raw(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        self.private_op(ciphertext)
    }

    /// Raw RSA signature, `m^d mod n`, over an already padded message.
    pub fn sign_raw(&self, message: &[u8]) -> Result<Vec<u8>> {
        self.private_op(message).map(|out| out.to_vec())
    }

    fn private_op(&self, input: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let value = rsa::BigUint::from_bytes_be(input);
        if &value >= self.inner.n() {
            return Err(Error::OutOfRange("input is not smaller than the modulus"));
        }
        let mut rng = rand::thread_rng();
        let out = rsa_decrypt_and_check(&self.inner, Some(&mut rng), &value)?;
        let out = Zeroizing::new(out.to_bytes_be());

        // left pad to the modulus length
        let k = self.size();
        let mut padded = Zeroizing::new(vec![0u8; k.saturating_sub(out.len())]);
        padded.extend_from_slice(&out);
        Ok(padded)
    }
}

impl Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaPrivateKey")
            .field("key_size", &self.key_size())
            .finish_non_exhaustive()
    }
}

/*
RFC 3279 Section 2.3.2

Dss-Parms  ::=  SEQUENCE  {
    p             INTEGER,
    q             INTEGER,
    g             INTEGER  }

The PKCS#8 privateKey OCTET STRING holds the private value x as an INTEGER.
*/

#[derive(Clone, PartialEq, Eq)]
pub struct DsaPrivateKey {
    p: BigUint,
    q: BigUint,
    g: BigUint,
    x: Zeroizing<Vec<u8>>,
}

impl DsaPrivateKey {
    fn from_private_key_info(info: &PrivateKeyInfo<'_>) -> Result<Self> {
        let params = info
            .private_key_algorithm
            .parameters
            .ok_or(Error::UnrecognizedStructure("DSA key without domain parameters"))?;
        let mut outer = DerReader::new(params);
        let mut seq = outer.read_sequence()?;
        outer.finish()?;
        let p = seq.read_integer()?;
        let q = seq.read_integer()?;
        let g = seq.read_integer()?;
        seq.finish()?;

        let mut reader = DerReader::new(info.private_key);
        let x = Zeroizing::new(read_unsigned(&mut reader)?.to_vec());
        reader.finish()?;

        Ok(DsaPrivateKey { p, q, g, x })
    }

    pub fn p(&self) -> &BigUint {
        &self.p
    }

    pub fn q(&self) -> &BigUint {
        &self.q
    }

    pub fn g(&self) -> &BigUint {
        &self.g
    }

    /// `y = g^x mod p`
    pub fn public_key(&self) -> BigUint {
        let x = BigUint::from_bytes_be(&self.x);
        self.g.modpow(&x, &self.p)
    }
}

impl Debug for DsaPrivateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DsaPrivateKey")
            .field("p_bits", &self.p.bits())
            .field("q_bits", &self.q.bits())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use pemstore_pem::Pem;

    use super::*;

    const RSA_DER: &[u8] = include_bytes!("../../testdata/rsa.der");
    const RSA_CIPHERTEXT: &[u8] = include_bytes!("../../testdata/rsa-ciphertext.bin");
    const PLAINTEXT: &[u8] = b"pemstore known plaintext";

    fn rsa_key() -> RsaPrivateKey {
        let params: RsaParams = RSA_DER.decode().unwrap();
        RsaPrivateKey::try_from(&params).unwrap()
    }

    #[test]
    fn test_decrypt_known_ciphertext() {
        let key = rsa_key();
        let out = key.decrypt_raw(RSA_CIPHERTEXT).unwrap();
        assert_eq!(128, out.len());
        assert!(out.ends_with(PLAINTEXT));
        assert!(out[..128 - PLAINTEXT.len()].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_raw_round_trip() {
        let key = rsa_key();
        let e = key.public_exponent();
        let n = key.modulus();
        assert_eq!(&rsa::BigUint::from(65537u32), e);

        // encrypt with public, decrypt with private
        let m = rsa::BigUint::from_bytes_be(PLAINTEXT);
        let c = m.modpow(e, n).to_bytes_be();
        let out = key.decrypt_raw(&c).unwrap();
        assert_eq!(m, rsa::BigUint::from_bytes_be(&out));

        // sign with private, verify with public
        let sig = key.sign_raw(PLAINTEXT).unwrap();
        assert_eq!(key.size(), sig.len());
        assert_eq!(m, rsa::BigUint::from_bytes_be(&sig).modpow(e, n));
    }

    #[test]
    fn test_private_op_out_of_range() {
        let key = rsa_key();
        let too_big = vec![0xff; 129];
        assert!(matches!(key.decrypt_raw(&too_big), Err(Error::OutOfRange(_))));
        let modulus = key.modulus().to_bytes_be();
        assert!(matches!(key.sign_raw(&modulus), Err(Error::OutOfRange(_))));
    }

    #[test]
    fn test_inconsistent_rsa_params_rejected() {
        // n = 61 * 53, e = 17, but d is off by one
        let params = RsaParams::new(BigUint::from(3233u32), BigUint::from(17u32), &[0x0a, 0xc0]);
        let err = RsaPrivateKey::try_from(&params).unwrap_err();
        assert!(matches!(err, Error::Rsa(_)));
        assert_eq!(crate::ErrorKind::MalformedKey, err.kind());
    }

    #[test]
    fn test_from_pkcs8_rsa_matches_pkcs1() {
        let pem: Pem = include_str!("../../testdata/rsa-pkcs8.pem").parse().unwrap();
        let der: Vec<u8> = pem.decode().unwrap();
        let spec = crate::pkcs8::key_specification(&der).unwrap();
        let key = PrivateKey::try_from(&spec).unwrap();
        assert_eq!(KeyAlgorithm::Rsa, key.algorithm());
        assert_eq!(Some(&rsa_key()), key.as_rsa());
    }

    #[test]
    fn test_from_pkcs8_dsa() {
        let pem: Pem = include_str!("../../testdata/dsa-pkcs8.pem").parse().unwrap();
        let der: Vec<u8> = pem.decode().unwrap();
        let spec = crate::pkcs8::key_specification(&der).unwrap();
        let key = PrivateKey::try_from(&spec).unwrap();
        assert_eq!(KeyAlgorithm::Dsa, key.algorithm());
        assert_eq!(1024, key.key_size());
        assert!(key.as_rsa().is_none());

        let PrivateKey::Dsa(dsa) = key else {
            panic!("expected a DSA key");
        };
        assert_eq!(224, dsa.q().bits());
        // y lies in the order-q subgroup
        let y = dsa.public_key();
        assert_eq!(BigUint::from(1u32), y.modpow(dsa.q(), dsa.p()));
        assert_eq!(BigUint::from(1u32), dsa.g().modpow(dsa.q(), dsa.p()));
    }

    #[test]
    fn test_debug_redacts() {
        let out = format!("{:?}", PrivateKey::Rsa(rsa_key()));
        assert!(out.contains("key_size: 1024"));
        assert!(!out.contains("private_exponent"));
    }
}
