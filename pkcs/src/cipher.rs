//! Symmetric decryption for encrypted key containers.
//!
//! CBC and ECB strip PKCS#5 padding, CFB and OFB run over the payload as a
//! keystream with no padding, RC4 is keyed directly by the derived key.

use std::fmt::{Display, Formatter};

use cipher::{
    AsyncStreamCipher, BlockCipher, BlockDecrypt, BlockDecryptMut, BlockEncrypt,
    KeyInit, KeyIvInit, StreamCipher,
    block_padding::Pkcs7,
    consts::{U5, U8, U16, U256},
    typenum::{IsLess, Le, NonZero},
};
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    #[error("invalid key length {0}")]
    InvalidKeyLength(usize),
    #[error("invalid IV length {actual}, expected {expected}")]
    InvalidIvLength { expected: usize, actual: usize },
    #[error("ciphertext length {0} is not a positive multiple of the block size")]
    InvalidCiphertextLength(usize),
    #[error("padding check failed")]
    Padding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Cbc,
    Ecb,
    Cfb,
    Ofb,
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Cbc => "CBC",
            Mode::Ecb => "ECB",
            Mode::Cfb => "CFB",
            Mode::Ofb => "OFB",
        }
    }

    /// Whether the plaintext carries PKCS#5 padding.
    pub fn is_padded(&self) -> bool {
        matches!(self, Mode::Cbc | Mode::Ecb)
    }

    /// Whether the mode consumes an IV of exactly one block.
    pub fn uses_iv(&self) -> bool {
        !matches!(self, Mode::Ecb)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockAlgorithm {
    Aes128,
    Aes192,
    Aes256,
    Des,
    /// Two-key triple DES (K1, K2, K1)
    DesEde,
    /// Three-key triple DES
    DesEde3,
}

impl BlockAlgorithm {
    pub fn key_len(&self) -> usize {
        match self {
            BlockAlgorithm::Aes128 => 16,
            BlockAlgorithm::Aes192 => 24,
            BlockAlgorithm::Aes256 => 32,
            BlockAlgorithm::Des => 8,
            BlockAlgorithm::DesEde => 16,
            BlockAlgorithm::DesEde3 => 24,
        }
    }

    pub fn block_size(&self) -> usize {
        match self {
            BlockAlgorithm::Aes128 | BlockAlgorithm::Aes192 | BlockAlgorithm::Aes256 => 16,
            BlockAlgorithm::Des | BlockAlgorithm::DesEde | BlockAlgorithm::DesEde3 => 8,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlockAlgorithm::Aes128 => "AES-128",
            BlockAlgorithm::Aes192 => "AES-192",
            BlockAlgorithm::Aes256 => "AES-256",
            BlockAlgorithm::Des => "DES",
            BlockAlgorithm::DesEde => "DES-EDE",
            BlockAlgorithm::DesEde3 => "DES-EDE3",
        }
    }
}

impl Display for BlockAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Decrypts `data` and returns the plaintext with any padding removed.
pub fn decrypt(
    algorithm: BlockAlgorithm,
    mode: Mode,
    key: &[u8],
    iv: &[u8],
    data: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CipherError> {
    match algorithm {
        BlockAlgorithm::Aes128 => decrypt_with::<aes::Aes128>(mode, key, iv, data),
        BlockAlgorithm::Aes192 => decrypt_with::<aes::Aes192>(mode, key, iv, data),
        BlockAlgorithm::Aes256 => decrypt_with::<aes::Aes256>(mode, key, iv, data),
        BlockAlgorithm::Des => decrypt_with::<des::Des>(mode, key, iv, data),
        BlockAlgorithm::DesEde => decrypt_with::<des::TdesEde2>(mode, key, iv, data),
        BlockAlgorithm::DesEde3 => decrypt_with::<des::TdesEde3>(mode, key, iv, data),
    }
}

fn decrypt_with<C>(
    mode: Mode,
    key: &[u8],
    iv: &[u8],
    data: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CipherError>
where
    C: BlockCipher + BlockEncrypt + BlockDecrypt + KeyInit,
    C::BlockSize: IsLess<U256>,
    Le<C::BlockSize, U256>: NonZero,
    ofb::Ofb<C>: KeyIvInit + StreamCipher,
{
    if mode.uses_iv() && iv.len() != C::block_size() {
        return Err(CipherError::InvalidIvLength {
            expected: C::block_size(),
            actual: iv.len(),
        });
    }
    if mode.is_padded() && (data.is_empty() || data.len() % C::block_size() != 0) {
        return Err(CipherError::InvalidCiphertextLength(data.len()));
    }

    let mut buf = Zeroizing::new(data.to_vec());
    let len = match mode {
        Mode::Cbc => cbc::Decryptor::<C>::new_from_slices(key, iv)
            .map_err(|_| CipherError::InvalidKeyLength(key.len()))?
            .decrypt_padded_mut::<Pkcs7>(buf.as_mut_slice())
            .map_err(|_| CipherError::Padding)?
            .len(),
        Mode::Ecb => ecb::Decryptor::<C>::new_from_slice(key)
            .map_err(|_| CipherError::InvalidKeyLength(key.len()))?
            .decrypt_padded_mut::<Pkcs7>(buf.as_mut_slice())
            .map_err(|_| CipherError::Padding)?
            .len(),
        Mode::Cfb => {
            cfb_mode::Decryptor::<C>::new_from_slices(key, iv)
                .map_err(|_| CipherError::InvalidKeyLength(key.len()))?
                .decrypt(buf.as_mut_slice());
            buf.len()
        }
        Mode::Ofb => {
            ofb::Ofb::<C>::new_from_slices(key, iv)
                .map_err(|_| CipherError::InvalidKeyLength(key.len()))?
                .apply_keystream(buf.as_mut_slice());
            buf.len()
        }
    };
    buf.truncate(len);
    Ok(buf)
}

/// RC4 keyed directly by `key`. Only 40, 64 and 128-bit keys are accepted.
pub fn rc4(key: &[u8], data: &[u8]) -> Result<Zeroizing<Vec<u8>>, CipherError> {
    let invalid = |_| CipherError::InvalidKeyLength(key.len());
    let mut buf = Zeroizing::new(data.to_vec());
    match key.len() {
        5 => ::rc4::Rc4::<U5>::new_from_slice(key)
            .map_err(invalid)?
            .apply_keystream(buf.as_mut_slice()),
        8 => ::rc4::Rc4::<U8>::new_from_slice(key)
            .map_err(invalid)?
            .apply_keystream(buf.as_mut_slice()),
        16 => ::rc4::Rc4::<U16>::new_from_slice(key)
            .map_err(invalid)?
            .apply_keystream(buf.as_mut_slice()),
        n => return Err(CipherError::InvalidKeyLength(n)),
    }
    Ok(buf)
}
