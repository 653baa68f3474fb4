//! OpenSSL "traditional" encrypted PEM keys.
//!
//! A `RSA PRIVATE KEY` block carrying `Proc-Type: 4,ENCRYPTED` and
//! `DEK-Info: <cipher>,<hex iv>` headers. The key is derived from the
//! password and the first 8 bytes of the IV with EVP_BytesToKey (MD5, one
//! iteration).

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use md5::{Digest, Md5};
use pemstore_pem::{DEK_INFO, Headers, PROC_TYPE};
use tracing::debug;
use zeroize::Zeroizing;

use crate::cipher::{self, BlockAlgorithm, Mode};
use crate::error::{Error, Result};
use crate::policy::DecodeOptions;

const SALT_LEN: usize = 8;

/// Cipher named by the first DEK-Info field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyCipher {
    Block { algorithm: BlockAlgorithm, mode: Mode },
    Rc4 { key_bits: u32 },
}

impl LegacyCipher {
    pub fn key_len(&self) -> usize {
        match self {
            LegacyCipher::Block { algorithm, .. } => algorithm.key_len(),
            LegacyCipher::Rc4 { key_bits } => (*key_bits / 8) as usize,
        }
    }

    pub fn key_bits(&self) -> u32 {
        (self.key_len() * 8) as u32
    }

    /// Required IV length, if the cipher consumes one.
    pub fn iv_len(&self) -> Option<usize> {
        match self {
            LegacyCipher::Block { algorithm, mode } if mode.uses_iv() => {
                Some(algorithm.block_size())
            }
            _ => None,
        }
    }
}

impl Display for LegacyCipher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LegacyCipher::Block { algorithm, mode } => {
                write!(f, "{}-{}", algorithm.name(), mode.name())
            }
            LegacyCipher::Rc4 { key_bits: 128 } => write!(f, "RC4"),
            LegacyCipher::Rc4 { key_bits } => write!(f, "RC4-{}", key_bits),
        }
    }
}

impl FromStr for LegacyCipher {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let unsupported = || Error::UnsupportedCipher(s.to_string());
        let name = s.trim().to_ascii_uppercase();
        let parts: Vec<&str> = name.split('-').collect();

        let (family, rest) = match parts.split_first() {
            Some((family, rest)) if !family.is_empty() => (*family, rest),
            _ => return Err(unsupported()),
        };

        if family == "RC4" {
            let key_bits = match rest {
                [] => 128,
                [bits] => bits
                    .parse::<u32>()
                    .ok()
                    .filter(|b| matches!(*b, 40 | 64 | 128))
                    .ok_or_else(unsupported)?,
                _ => return Err(unsupported()),
            };
            return Ok(LegacyCipher::Rc4 { key_bits });
        }

        let (algorithm, rest) = match (family, rest) {
            ("AES", ["128", rest @ ..]) => (BlockAlgorithm::Aes128, rest),
            ("AES", ["192", rest @ ..]) => (BlockAlgorithm::Aes192, rest),
            ("AES", ["256", rest @ ..]) => (BlockAlgorithm::Aes256, rest),
            ("AES", rest) => (BlockAlgorithm::Aes128, rest),
            ("DES", ["EDE3", rest @ ..]) => (BlockAlgorithm::DesEde3, rest),
            ("DES", ["EDE", rest @ ..]) => (BlockAlgorithm::DesEde, rest),
            ("DES", rest) => (BlockAlgorithm::Des, rest),
            ("DES3" | "DES2", rest) => (BlockAlgorithm::DesEde3, rest),
            _ => return Err(unsupported()),
        };

        let mode = match rest {
            [] | ["CBC"] => Mode::Cbc,
            ["ECB"] => Mode::Ecb,
            ["CFB"] => Mode::Cfb,
            ["OFB"] => Mode::Ofb,
            _ => return Err(unsupported()),
        };

        Ok(LegacyCipher::Block { algorithm, mode })
    }
}

/// Parsed `DEK-Info` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DekInfo {
    pub cipher: LegacyCipher,
    pub iv: Vec<u8>,
}

impl DekInfo {
    /// Salt for key derivation, the first 8 IV bytes.
    pub fn salt(&self) -> &[u8] {
        &self.iv[..SALT_LEN]
    }
}

impl FromStr for DekInfo {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (cipher, iv) = s
            .split_once(',')
            .ok_or_else(|| Error::InvalidDekInfo(format!("expected '<cipher>,<iv>', got '{}'", s)))?;
        let cipher: LegacyCipher = cipher.parse()?;
        let iv = hex::decode(iv.trim())
            .map_err(|e| Error::InvalidDekInfo(format!("IV is not hex: {}", e)))?;

        if iv.len() < SALT_LEN {
            return Err(Error::InvalidDekInfo(format!(
                "IV must be at least {} bytes, got {}",
                SALT_LEN,
                iv.len()
            )));
        }
        if let Some(expected) = cipher.iv_len() {
            if iv.len() != expected {
                return Err(Error::InvalidDekInfo(format!(
                    "{} needs a {} byte IV, got {}",
                    cipher,
                    expected,
                    iv.len()
                )));
            }
        }

        Ok(DekInfo { cipher, iv })
    }
}

/// OpenSSL EVP_BytesToKey with MD5 and a single iteration.
pub fn evp_bytes_to_key(password: &[u8], salt: &[u8], key_len: usize) -> Zeroizing<Vec<u8>> {
    let mut key = Zeroizing::new(Vec::with_capacity(key_len + 16));
    let mut prev: Option<md5::digest::Output<Md5>> = None;
    while key.len() < key_len {
        let mut hasher = Md5::new();
        if let Some(prev) = prev.as_ref() {
            hasher.update(prev);
        }
        hasher.update(password);
        hasher.update(salt);
        let block = hasher.finalize();
        key.extend_from_slice(&block);
        prev = Some(block);
    }
    key.truncate(key_len);
    key
}

/// Decrypts the payload of an encrypted `RSA PRIVATE KEY` block.
///
/// The headers and cipher are validated and the key size policy applied
/// before the password is required.
pub fn decrypt(
    headers: &Headers,
    data: &[u8],
    password: Option<&[u8]>,
    options: &DecodeOptions,
) -> Result<Zeroizing<Vec<u8>>> {
    if !headers.contains(PROC_TYPE) {
        return Err(Error::MissingHeader(PROC_TYPE));
    }
    let dek_info: DekInfo = headers
        .get(DEK_INFO)
        .ok_or(Error::MissingHeader(DEK_INFO))?
        .parse()?;
    options
        .policy
        .check(&dek_info.cipher.to_string(), dek_info.cipher.key_bits())?;
    let password = password.ok_or(Error::NoPasswordProvided)?;

    debug!(cipher = %dek_info.cipher, "decrypting legacy PEM key");
    let key = evp_bytes_to_key(password, dek_info.salt(), dek_info.cipher.key_len());
    let result = match dek_info.cipher {
        LegacyCipher::Block { algorithm, mode } => {
            cipher::decrypt(algorithm, mode, &key, &dek_info.iv, data)
        }
        LegacyCipher::Rc4 { .. } => cipher::rc4(&key, data),
    };
    result.map_err(|e| options.heuristic.cipher_failure(e))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::policy::CryptoPolicy;

    #[rstest(
        input,
        expected,
        case("AES-128-CBC", LegacyCipher::Block { algorithm: BlockAlgorithm::Aes128, mode: Mode::Cbc }),
        case("aes-192-cbc", LegacyCipher::Block { algorithm: BlockAlgorithm::Aes192, mode: Mode::Cbc }),
        case("AES-256-OFB", LegacyCipher::Block { algorithm: BlockAlgorithm::Aes256, mode: Mode::Ofb }),
        case("AES-CFB", LegacyCipher::Block { algorithm: BlockAlgorithm::Aes128, mode: Mode::Cfb }),
        case("AES", LegacyCipher::Block { algorithm: BlockAlgorithm::Aes128, mode: Mode::Cbc }),
        case("DES-CBC", LegacyCipher::Block { algorithm: BlockAlgorithm::Des, mode: Mode::Cbc }),
        case("DES-ECB", LegacyCipher::Block { algorithm: BlockAlgorithm::Des, mode: Mode::Ecb }),
        case("DES-EDE3-CBC", LegacyCipher::Block { algorithm: BlockAlgorithm::DesEde3, mode: Mode::Cbc }),
        case("DES-EDE-CBC", LegacyCipher::Block { algorithm: BlockAlgorithm::DesEde, mode: Mode::Cbc }),
        case("DES3", LegacyCipher::Block { algorithm: BlockAlgorithm::DesEde3, mode: Mode::Cbc }),
        case("DES2-CBC", LegacyCipher::Block { algorithm: BlockAlgorithm::DesEde3, mode: Mode::Cbc }),
        case("RC4", LegacyCipher::Rc4 { key_bits: 128 }),
        case("RC4-40", LegacyCipher::Rc4 { key_bits: 40 }),
        case("RC4-64", LegacyCipher::Rc4 { key_bits: 64 })
    )]
    fn test_parse_legacy_cipher(input: &str, expected: LegacyCipher) {
        assert_eq!(expected, input.parse::<LegacyCipher>().unwrap());
    }

    #[rstest(
        input,
        case(""),
        case("BF-CBC"),
        case("AES-512-CBC"),
        case("AES-128-GCM"),
        case("AES-128-CBC-EXTRA"),
        case("RC4-41"),
        case("RC4-56"),
        case("RC4-HMAC-MD5"),
        case("CAMELLIA-128-CBC")
    )]
    fn test_parse_legacy_cipher_unsupported(input: &str) {
        assert_eq!(
            Error::UnsupportedCipher(input.to_string()),
            input.parse::<LegacyCipher>().unwrap_err()
        );
    }

    #[test]
    fn test_legacy_cipher_display() {
        let cipher: LegacyCipher = "des-ede3-cbc".parse().unwrap();
        assert_eq!("DES-EDE3-CBC", cipher.to_string());
        assert_eq!(192, cipher.key_bits());
        let cipher: LegacyCipher = "RC4".parse().unwrap();
        assert_eq!("RC4", cipher.to_string());
    }

    #[rstest(
        input,
        iv_len,
        case("AES-128-CBC,F88961685009A97A169C71616D39BFE8", 16),
        case("DES-CBC,DD3BB2F0D860A2A1", 8),
        // ECB ignores the IV but OpenSSL still writes one
        case("AES-128-ECB,F4313E39E981FBC733BD3690F7ED9AD7", 16),
        case("RC4,91D8D40F391CFCB5", 8)
    )]
    fn test_parse_dek_info(input: &str, iv_len: usize) {
        let dek: DekInfo = input.parse().unwrap();
        assert_eq!(iv_len, dek.iv.len());
        assert_eq!(8, dek.salt().len());
    }

    #[rstest(
        input,
        case("AES-128-CBC"),
        case("AES-128-CBC,XYZ"),
        case("AES-128-CBC,F889616850"),
        // 8 byte IV for a 16 byte block cipher
        case("AES-128-CBC,F88961685009A97A")
    )]
    fn test_parse_dek_info_invalid(input: &str) {
        assert!(matches!(
            input.parse::<DekInfo>(),
            Err(Error::InvalidDekInfo(_))
        ));
    }

    #[rstest(
        salt,
        len,
        expected,
        case("F88961685009A97A", 16, "505a5cf9146b0d6faf030f8c89066603"),
        case("D7129CFF125F91A9", 24, "6cafb8085d26e99bd8c78f6af917935cfcd644b96162d291")
    )]
    fn test_evp_bytes_to_key(salt: &str, len: usize, expected: &str) {
        let salt = hex::decode(salt).unwrap();
        let key = evp_bytes_to_key(b"changeit", &salt, len);
        assert_eq!(expected, hex::encode(key.as_slice()));
    }

    fn headers(dek_info: Option<&str>) -> Headers {
        let mut headers = Headers::default();
        headers.insert(PROC_TYPE, "4,ENCRYPTED");
        if let Some(dek_info) = dek_info {
            headers.insert(DEK_INFO, dek_info);
        }
        headers
    }

    #[test]
    fn test_decrypt_missing_headers() {
        let options = DecodeOptions::default();
        assert_eq!(
            Error::MissingHeader(PROC_TYPE),
            decrypt(&Headers::default(), &[0; 16], Some(b"changeit"), &options).unwrap_err()
        );
        assert_eq!(
            Error::MissingHeader(DEK_INFO),
            decrypt(&headers(None), &[0; 16], Some(b"changeit"), &options).unwrap_err()
        );
    }

    #[test]
    fn test_decrypt_policy_checked_before_password() {
        let options = DecodeOptions::new(
            CryptoPolicy::with_max_key_bits(128),
            Default::default(),
        );
        let headers = headers(Some("AES-192-CBC,2FB34A604BCD8D6930B80F86CFE8E6F3"));
        let err = decrypt(&headers, &[0; 16], None, &options).unwrap_err();
        assert!(matches!(err, Error::KeyTooLarge { bits: 192, max: 128, .. }));
    }

    #[test]
    fn test_decrypt_no_password() {
        let headers = headers(Some("AES-128-CBC,F88961685009A97A169C71616D39BFE8"));
        let err = decrypt(&headers, &[0; 16], None, &DecodeOptions::default()).unwrap_err();
        assert_eq!(Error::NoPasswordProvided, err);
    }

    #[test]
    fn test_decrypt_unsupported_cipher_before_password() {
        let headers = headers(Some("BF-CBC,F88961685009A97A"));
        let err = decrypt(&headers, &[0; 16], None, &DecodeOptions::default()).unwrap_err();
        assert_eq!(Error::UnsupportedCipher("BF-CBC".to_string()), err);
    }
}
