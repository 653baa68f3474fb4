//! Password-based encryption schemes for EncryptedPrivateKeyInfo.
//!
//! PBES1 (RFC 8018 Section 6.1) derives a DES key with PBKDF1. The PKCS#12
//! schemes (RFC 7292 Appendix B and C) derive triple-DES keys with the
//! PKCS#12 KDF over a BMP-encoded password. PBES2 is rejected.

use md5::Md5;
use pemstore::decoder::{DecodableFrom, Decoder};
use pemstore_der::{DerReader, ObjectIdentifier};
use sha1::{Digest, Sha1};
use zeroize::Zeroizing;

use crate::algorithm::{
    OID_PBE_MD5_DES_CBC, OID_PBE_SHA1_2KEY_TRIPLE_DES_CBC, OID_PBE_SHA1_3KEY_TRIPLE_DES_CBC,
    OID_PBE_SHA1_DES_CBC, OID_PBES2,
};
use crate::cipher::{self, BlockAlgorithm, Mode};
use crate::error::{Error, Result};
use crate::policy::BadPasswordHeuristic;

/// PKCS#12 KDF diversifier for key material.
const ID_KEY: u8 = 1;
/// PKCS#12 KDF diversifier for the IV.
const ID_IV: u8 = 2;

const SHA1_OUTPUT: usize = 20;
const SHA1_BLOCK: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PbeScheme {
    /// pbeWithMD5AndDES-CBC
    Pbes1Md5Des,
    /// pbeWithSHA1AndDES-CBC
    Pbes1Sha1Des,
    /// pbeWithSHAAnd3-KeyTripleDES-CBC
    Pkcs12Sha1TripleDes,
    /// pbeWithSHAAnd2-KeyTripleDES-CBC
    Pkcs12Sha1TwoKeyTripleDes,
}

impl PbeScheme {
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        if *oid == OID_PBES2 {
            return Err(Error::UnsupportedAlgorithm("PBES2".to_string()));
        }
        if *oid == OID_PBE_MD5_DES_CBC {
            Ok(PbeScheme::Pbes1Md5Des)
        } else if *oid == OID_PBE_SHA1_DES_CBC {
            Ok(PbeScheme::Pbes1Sha1Des)
        } else if *oid == OID_PBE_SHA1_3KEY_TRIPLE_DES_CBC {
            Ok(PbeScheme::Pkcs12Sha1TripleDes)
        } else if *oid == OID_PBE_SHA1_2KEY_TRIPLE_DES_CBC {
            Ok(PbeScheme::Pkcs12Sha1TwoKeyTripleDes)
        } else {
            Err(Error::UnsupportedAlgorithm(oid.to_string()))
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PbeScheme::Pbes1Md5Des => "pbeWithMD5AndDES-CBC",
            PbeScheme::Pbes1Sha1Des => "pbeWithSHA1AndDES-CBC",
            PbeScheme::Pkcs12Sha1TripleDes => "pbeWithSHAAnd3-KeyTripleDES-CBC",
            PbeScheme::Pkcs12Sha1TwoKeyTripleDes => "pbeWithSHAAnd2-KeyTripleDES-CBC",
        }
    }

    pub fn cipher(&self) -> BlockAlgorithm {
        match self {
            PbeScheme::Pbes1Md5Des | PbeScheme::Pbes1Sha1Des => BlockAlgorithm::Des,
            PbeScheme::Pkcs12Sha1TripleDes => BlockAlgorithm::DesEde3,
            PbeScheme::Pkcs12Sha1TwoKeyTripleDes => BlockAlgorithm::DesEde,
        }
    }

    /// Size of the derived cipher key, parity bits included.
    pub fn key_bits(&self) -> u32 {
        (self.cipher().key_len() * 8) as u32
    }

    /// Derives the key and IV and decrypts `data`.
    pub(crate) fn decrypt(
        &self,
        params: &PbeParameter<'_>,
        password: &[u8],
        data: &[u8],
        heuristic: BadPasswordHeuristic,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let iterations = params.iterations()?;
        let cipher = self.cipher();
        let (key, iv) = match self {
            PbeScheme::Pbes1Md5Des => split_key_iv(pbkdf1::<Md5>(password, params.salt, iterations)),
            PbeScheme::Pbes1Sha1Des => {
                split_key_iv(pbkdf1::<Sha1>(password, params.salt, iterations))
            }
            PbeScheme::Pkcs12Sha1TripleDes | PbeScheme::Pkcs12Sha1TwoKeyTripleDes => {
                let bmp = password_to_bmp(password)?;
                let key = pkcs12_kdf(ID_KEY, &bmp, params.salt, iterations, cipher.key_len());
                let iv = pkcs12_kdf(ID_IV, &bmp, params.salt, iterations, cipher.block_size());
                (key, iv)
            }
        };
        cipher::decrypt(cipher, Mode::Cbc, &key, &iv, data)
            .map_err(|e| heuristic.cipher_failure(e))
    }
}

/*
RFC 8018 Appendix A.3 / RFC 7292 Appendix C

PBEParameter ::= SEQUENCE {
    salt OCTET STRING (SIZE(8)),
    iterationCount INTEGER }

pkcs-12PbeParams ::= SEQUENCE {
    salt        OCTET STRING,
    iterations  INTEGER }
*/

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbeParameter<'a> {
    pub salt: &'a [u8],
    pub iteration_count: u64,
}

impl PbeParameter<'_> {
    fn iterations(&self) -> Result<u32> {
        match u32::try_from(self.iteration_count) {
            Ok(0) | Err(_) => Err(Error::InvalidPbeParameters(format!(
                "iteration count {}",
                self.iteration_count
            ))),
            Ok(n) => Ok(n),
        }
    }
}

impl<'a> DecodableFrom<&'a [u8]> for PbeParameter<'a> {}

impl<'a> Decoder<&'a [u8], PbeParameter<'a>> for &'a [u8] {
    type Error = Error;

    fn decode(&self) -> Result<PbeParameter<'a>> {
        let mut outer = DerReader::new(*self);
        let mut seq = outer.read_sequence()?;
        outer.finish()?;

        let salt = seq.read_octet_string()?;
        let iteration_count = seq.read_u64()?;
        seq.finish()?;

        Ok(PbeParameter {
            salt,
            iteration_count,
        })
    }
}

fn split_key_iv(dk: Zeroizing<Vec<u8>>) -> (Zeroizing<Vec<u8>>, Zeroizing<Vec<u8>>) {
    let key = Zeroizing::new(dk[..8].to_vec());
    let iv = Zeroizing::new(dk[8..16].to_vec());
    (key, iv)
}

/// PBKDF1 (RFC 8018 Section 5.1). Returns the first 16 bytes of T_c,
/// the DES key followed by the IV.
fn pbkdf1<D: Digest>(password: &[u8], salt: &[u8], iterations: u32) -> Zeroizing<Vec<u8>> {
    let mut t = Zeroizing::new(
        D::new()
            .chain_update(password)
            .chain_update(salt)
            .finalize()
            .to_vec(),
    );
    for _ in 1..iterations {
        let next = D::digest(t.as_slice());
        t.copy_from_slice(&next);
    }
    t.truncate(16);
    t
}

/// PKCS#12 KDF (RFC 7292 Appendix B.2) with SHA-1.
fn pkcs12_kdf(
    id: u8,
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    output_len: usize,
) -> Zeroizing<Vec<u8>> {
    let d_block = [id; SHA1_BLOCK];
    let s = extend_to_multiple(salt, SHA1_BLOCK);
    let p = extend_to_multiple(password, SHA1_BLOCK);

    // I = S || P
    let mut i_block = Zeroizing::new(Vec::with_capacity(s.len() + p.len()));
    i_block.extend_from_slice(&s);
    i_block.extend_from_slice(&p);

    let num_blocks = output_len.div_ceil(SHA1_OUTPUT);
    let mut result = Zeroizing::new(Vec::with_capacity(num_blocks * SHA1_OUTPUT));

    for block_idx in 0..num_blocks {
        // A = H^c(D || I)
        let mut hasher = Sha1::new();
        Digest::update(&mut hasher, d_block);
        Digest::update(&mut hasher, i_block.as_slice());
        let mut a = hasher.finalize_reset();
        for _ in 1..iterations {
            Digest::update(&mut hasher, a);
            a = hasher.finalize_reset();
        }
        result.extend_from_slice(&a);

        if block_idx + 1 < num_blocks {
            // I_j = (I_j + B + 1) mod 2^(v*8), B = A repeated to v bytes
            let b = extend_to_multiple(&a, SHA1_BLOCK);
            for chunk in i_block.chunks_mut(SHA1_BLOCK) {
                add_one_plus_b(chunk, &b);
            }
        }
    }

    result.truncate(output_len);
    result
}

/// Repeats `data` to fill a multiple of `v` bytes. Empty input stays empty.
fn extend_to_multiple(data: &[u8], v: usize) -> Zeroizing<Vec<u8>> {
    if data.is_empty() {
        return Zeroizing::new(Vec::new());
    }
    let len = data.len().div_ceil(v) * v;
    Zeroizing::new(data.iter().copied().cycle().take(len).collect())
}

fn add_one_plus_b(block: &mut [u8], b: &[u8]) {
    let mut carry: u16 = 1;
    for k in (0..block.len()).rev() {
        let sum = block[k] as u16 + b[k] as u16 + carry;
        block[k] = sum as u8;
        carry = sum >> 8;
    }
}

/// BMPString encoding of a UTF-8 password: UTF-16BE plus a two byte
/// terminator. A password that is not UTF-8 cannot be the right one.
fn password_to_bmp(password: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let password = std::str::from_utf8(password).map_err(|_| Error::BadPassword)?;
    let mut bmp = Zeroizing::new(Vec::with_capacity(password.len() * 2 + 2));
    for c in password.encode_utf16() {
        bmp.extend_from_slice(&c.to_be_bytes());
    }
    bmp.extend_from_slice(&[0, 0]);
    Ok(bmp)
}
