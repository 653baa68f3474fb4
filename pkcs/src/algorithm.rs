//! AlgorithmIdentifier and the object identifiers this crate recognizes.

use std::fmt::{Display, Formatter};

use pemstore::decoder::{DecodableFrom, Decoder};
use pemstore_der::{DerReader, ObjectIdentifier};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
pub const OID_DSA: &str = "1.2.840.10040.4.1";

pub const OID_PBE_MD5_DES_CBC: &str = "1.2.840.113549.1.5.3";
pub const OID_PBE_SHA1_DES_CBC: &str = "1.2.840.113549.1.5.10";
pub const OID_PBES2: &str = "1.2.840.113549.1.5.13";
pub const OID_PBE_SHA1_3KEY_TRIPLE_DES_CBC: &str = "1.2.840.113549.1.12.1.3";
pub const OID_PBE_SHA1_2KEY_TRIPLE_DES_CBC: &str = "1.2.840.113549.1.12.1.4";

/*
RFC 5280 Section 4.1.1.2

AlgorithmIdentifier  ::=  SEQUENCE  {
    algorithm               OBJECT IDENTIFIER,
    parameters              ANY DEFINED BY algorithm OPTIONAL  }
*/

/// AlgorithmIdentifier with its parameters kept as raw DER.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmIdentifier<'a> {
    pub algorithm: ObjectIdentifier,
    pub parameters: Option<&'a [u8]>,
}

impl<'a> DecodableFrom<&'a [u8]> for AlgorithmIdentifier<'a> {}

impl<'a> Decoder<&'a [u8], AlgorithmIdentifier<'a>> for &'a [u8] {
    type Error = Error;

    fn decode(&self) -> Result<AlgorithmIdentifier<'a>> {
        let mut outer = DerReader::new(*self);
        let mut seq = outer.read_sequence()?;
        outer.finish()?;

        let algorithm = seq.read_object_identifier()?;
        let parameters = if seq.is_empty() {
            None
        } else {
            Some(seq.read_element()?)
        };
        seq.finish()?;

        Ok(AlgorithmIdentifier {
            algorithm,
            parameters,
        })
    }
}

/// Private key algorithms a PKCS#8 structure may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyAlgorithm {
    Rsa,
    Dsa,
}

impl KeyAlgorithm {
    /// Any OID other than RSA and DSA is `UnsupportedAlgorithm`.
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        if *oid == OID_RSA_ENCRYPTION {
            Ok(KeyAlgorithm::Rsa)
        } else if *oid == OID_DSA {
            Ok(KeyAlgorithm::Dsa)
        } else {
            Err(Error::UnsupportedAlgorithm(oid.to_string()))
        }
    }

    pub fn oid(&self) -> &'static str {
        match self {
            KeyAlgorithm::Rsa => OID_RSA_ENCRYPTION,
            KeyAlgorithm::Dsa => OID_DSA,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            KeyAlgorithm::Rsa => "RSA",
            KeyAlgorithm::Dsa => "DSA",
        }
    }
}

impl Display for KeyAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;

    #[rstest(
        input,
        oid,
        has_params,
        // rsaEncryption with NULL parameters
        case(vec![0x30, 0x0d, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01, 0x05, 0x00], OID_RSA_ENCRYPTION, true),
        // id-dsa without parameters
        case(vec![0x30, 0x09, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x38, 0x04, 0x01], OID_DSA, false)
    )]
    fn test_decode_algorithm_identifier(input: Vec<u8>, oid: &str, has_params: bool) {
        let bytes = input.as_slice();
        let alg: AlgorithmIdentifier = bytes.decode().unwrap();
        assert_eq!(alg.algorithm, oid);
        assert_eq!(has_params, alg.parameters.is_some());
    }

    #[rstest(
        input,
        // not a SEQUENCE
        case(vec![0x06, 0x03, 0x55, 0x04, 0x03]),
        // trailing data after the SEQUENCE
        case(vec![0x30, 0x05, 0x06, 0x03, 0x55, 0x04, 0x03, 0x00]),
        // two parameter elements
        case(vec![0x30, 0x09, 0x06, 0x03, 0x55, 0x04, 0x03, 0x05, 0x00, 0x05, 0x00])
    )]
    fn test_decode_algorithm_identifier_with_error(input: Vec<u8>) {
        let bytes = input.as_slice();
        let result: Result<AlgorithmIdentifier> = bytes.decode();
        assert!(result.is_err());
    }

    #[rstest(
        oid,
        expected,
        case(OID_RSA_ENCRYPTION, Some(KeyAlgorithm::Rsa)),
        case(OID_DSA, Some(KeyAlgorithm::Dsa)),
        // id-ecPublicKey
        case("1.2.840.10045.2.1", None),
        case("1.3.101.112", None)
    )]
    fn test_key_algorithm_from_oid(oid: &str, expected: Option<KeyAlgorithm>) {
        let oid = ObjectIdentifier::from_str(oid).unwrap();
        match expected {
            Some(alg) => {
                assert_eq!(alg, KeyAlgorithm::from_oid(&oid).unwrap());
                assert_eq!(oid, alg.oid());
            }
            None => {
                let err = KeyAlgorithm::from_oid(&oid).unwrap_err();
                assert_eq!(Error::UnsupportedAlgorithm(oid.to_string()), err);
            }
        }
    }
}
