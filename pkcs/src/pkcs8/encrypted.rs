use pemstore::decoder::{DecodableFrom, Decoder};
use pemstore_der::DerReader;
use tracing::debug;

use super::pbe::{PbeParameter, PbeScheme};
use crate::algorithm::AlgorithmIdentifier;
use crate::error::{Error, Result};
use crate::key_spec::KeySpecification;
use crate::policy::DecodeOptions;

/*
RFC 5958 Section 3

EncryptedPrivateKeyInfo ::= SEQUENCE {
    encryptionAlgorithm  EncryptionAlgorithmIdentifier,
    encryptedData        EncryptedData }

EncryptedData ::= OCTET STRING
*/

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPrivateKeyInfo<'a> {
    pub encryption_algorithm: AlgorithmIdentifier<'a>,
    pub encrypted_data: &'a [u8],
}

impl EncryptedPrivateKeyInfo<'_> {
    pub fn scheme(&self) -> Result<PbeScheme> {
        PbeScheme::from_oid(&self.encryption_algorithm.algorithm)
    }

    /// Decrypts the inner PrivateKeyInfo.
    ///
    /// The scheme is resolved and the key size policy applied before the
    /// password is looked at, so both are reported even when no password
    /// was given.
    pub fn decrypt(
        &self,
        password: Option<&[u8]>,
        options: &DecodeOptions,
    ) -> Result<KeySpecification> {
        let scheme = self.scheme()?;
        options.policy.check(scheme.name(), scheme.key_bits())?;
        let params: PbeParameter = self
            .encryption_algorithm
            .parameters
            .ok_or_else(|| Error::InvalidPbeParameters("missing parameters".to_string()))?
            .decode()?;
        let password = password.ok_or(Error::NoPasswordProvided)?;

        debug!(scheme = scheme.name(), "decrypting PKCS#8 private key");
        let heuristic = options.heuristic;
        let plain = scheme.decrypt(&params, password, self.encrypted_data, heuristic)?;
        super::key_specification(&plain).map_err(|e| heuristic.structure_failure(e))
    }
}

impl<'a> DecodableFrom<&'a [u8]> for EncryptedPrivateKeyInfo<'a> {}

impl<'a> Decoder<&'a [u8], EncryptedPrivateKeyInfo<'a>> for &'a [u8] {
    type Error = Error;

    fn decode(&self) -> Result<EncryptedPrivateKeyInfo<'a>> {
        let mut outer = DerReader::new(*self);
        let mut seq = outer.read_sequence()?;
        outer.finish()?;

        let encryption_algorithm: AlgorithmIdentifier = seq.read_element()?.decode()?;
        let encrypted_data = seq.read_octet_string()?;
        seq.finish()?;

        Ok(EncryptedPrivateKeyInfo {
            encryption_algorithm,
            encrypted_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use pemstore_pem::Pem;
    use rstest::rstest;

    use super::*;
    use crate::algorithm::OID_RSA_ENCRYPTION;
    use crate::error::ErrorKind;
    use crate::policy::{BadPasswordHeuristic, CryptoPolicy};

    const PASSWORD: &[u8] = b"changeit";

    fn pem_der(pem: &str) -> Vec<u8> {
        let pem: Pem = pem.parse().unwrap();
        pem.decode().unwrap()
    }

    fn cleartext() -> Vec<u8> {
        pem_der(include_str!("../../../testdata/rsa-pkcs8.pem"))
    }

    #[rstest(
        input,
        scheme,
        case(include_str!("../../../testdata/rsa-pkcs8-md5-des.pem"), PbeScheme::Pbes1Md5Des),
        case(include_str!("../../../testdata/rsa-pkcs8-sha1-des.pem"), PbeScheme::Pbes1Sha1Des),
        case(include_str!("../../../testdata/rsa-pkcs8-sha1-3des.pem"), PbeScheme::Pkcs12Sha1TripleDes)
    )]
    fn test_decrypt(input: &str, scheme: PbeScheme) {
        let der = pem_der(input);
        let bytes = der.as_slice();
        let info: EncryptedPrivateKeyInfo = bytes.decode().unwrap();
        assert_eq!(scheme, info.scheme().unwrap());

        let spec = info
            .decrypt(Some(PASSWORD), &DecodeOptions::default())
            .unwrap();
        match spec {
            KeySpecification::Opaque { algorithm, encoded } => {
                assert_eq!(algorithm, OID_RSA_ENCRYPTION);
                assert_eq!(cleartext(), *encoded);
            }
            other => panic!("unexpected specification {:?}", other),
        }
    }

    #[rstest(
        input,
        case(include_str!("../../../testdata/rsa-pkcs8-md5-des.pem")),
        case(include_str!("../../../testdata/rsa-pkcs8-sha1-3des.pem"))
    )]
    fn test_decrypt_wrong_password(input: &str) {
        let der = pem_der(input);
        let bytes = der.as_slice();
        let info: EncryptedPrivateKeyInfo = bytes.decode().unwrap();
        let err = info
            .decrypt(Some(b"wrong"), &DecodeOptions::default())
            .unwrap_err();
        assert_eq!(ErrorKind::BadPassword, err.kind());
    }

    #[test]
    fn test_decrypt_without_password() {
        let der = pem_der(include_str!("../../../testdata/rsa-pkcs8-md5-des.pem"));
        let bytes = der.as_slice();
        let info: EncryptedPrivateKeyInfo = bytes.decode().unwrap();
        let err = info
            .decrypt(None, &DecodeOptions::default())
            .unwrap_err();
        assert_eq!(Error::NoPasswordProvided, err);
    }

    #[rstest(password, case(None), case(Some(PASSWORD)))]
    fn test_pbes2_unsupported(password: Option<&[u8]>) {
        let der = pem_der(include_str!("../../../testdata/rsa-pkcs8-pbes2.pem"));
        let bytes = der.as_slice();
        let info: EncryptedPrivateKeyInfo = bytes.decode().unwrap();
        let err = info
            .decrypt(password, &DecodeOptions::default())
            .unwrap_err();
        assert_eq!(Error::UnsupportedAlgorithm("PBES2".to_string()), err);
    }

    #[rstest(
        input,
        max_key_bits,
        expected_bits,
        case(include_str!("../../../testdata/rsa-pkcs8-sha1-3des.pem"), 128, 192),
        case(include_str!("../../../testdata/rsa-pkcs8-sha1-3des.pem"), 8, 192),
        case(include_str!("../../../testdata/rsa-pkcs8-md5-des.pem"), 56, 64)
    )]
    fn test_key_size_policy(input: &str, max_key_bits: u32, expected_bits: u32) {
        let der = pem_der(input);
        let bytes = der.as_slice();
        let info: EncryptedPrivateKeyInfo = bytes.decode().unwrap();
        let options = DecodeOptions::new(
            CryptoPolicy::with_max_key_bits(max_key_bits),
            BadPasswordHeuristic::default(),
        );

        // reported with or without a password
        for password in [None, Some(PASSWORD)] {
            match info.decrypt(password, &options).unwrap_err() {
                Error::KeyTooLarge { bits, max, .. } => {
                    assert_eq!(expected_bits, bits);
                    assert_eq!(max_key_bits, max);
                }
                other => panic!("unexpected error {:?}", other),
            }
        }
    }

    #[test]
    fn test_key_size_policy_allows_smaller_keys() {
        let der = pem_der(include_str!("../../../testdata/rsa-pkcs8-sha1-3des.pem"));
        let bytes = der.as_slice();
        let info: EncryptedPrivateKeyInfo = bytes.decode().unwrap();
        let options = DecodeOptions::new(
            CryptoPolicy::with_max_key_bits(192),
            BadPasswordHeuristic::default(),
        );
        assert!(info.decrypt(Some(PASSWORD), &options).is_ok());
    }

    #[test]
    fn test_decode_rejects_cleartext_key() {
        let der = cleartext();
        let bytes = der.as_slice();
        let result: Result<EncryptedPrivateKeyInfo> = bytes.decode();
        assert!(result.is_err());
    }
}
