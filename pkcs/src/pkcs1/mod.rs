//! PKCS#1 RSAPrivateKey.

use pemstore::decoder::{DecodableFrom, Decoder};
use pemstore_der::{DerReader, Tag};

use crate::error::{Error, Result};
use crate::key_spec::RsaParams;

/*
RFC 8017 - PKCS #1: RSA Cryptography Specifications

RSAPrivateKey ::= SEQUENCE {
    version           Version,
    modulus           INTEGER,  -- n
    publicExponent    INTEGER,  -- e
    privateExponent   INTEGER,  -- d
    prime1            INTEGER,  -- p
    prime2            INTEGER,  -- q
    exponent1         INTEGER,  -- d mod (p-1)
    exponent2         INTEGER,  -- d mod (q-1)
    coefficient       INTEGER,  -- (inverse of q) mod p
    otherPrimeInfos   OtherPrimeInfos OPTIONAL
}

Version ::= INTEGER { two-prime(0), multi(1) }
*/

const STRUCTURE: &str = "RSAPrivateKey";

impl<'a> DecodableFrom<&'a [u8]> for RsaParams {}

impl<'a> Decoder<&'a [u8], RsaParams> for &'a [u8] {
    type Error = Error;

    fn decode(&self) -> Result<RsaParams> {
        let mut outer = DerReader::new(*self);
        let mut seq = outer.read_sequence()?;
        outer.finish()?;

        let version = seq.read_u64()?;
        if version != 0 {
            return Err(Error::InvalidVersion {
                structure: STRUCTURE,
                version,
            });
        }
        let modulus = seq.read_integer()?;
        let public_exponent = seq.read_integer()?;
        let private_exponent = read_unsigned(&mut seq)?;
        // p and q are recovered from (n, e, d) when the key is built

        Ok(RsaParams::new(modulus, public_exponent, private_exponent))
    }
}

/// Content bytes of a non-negative INTEGER, without copying into a bignum.
pub(crate) fn read_unsigned<'a>(reader: &mut DerReader<'a>) -> Result<&'a [u8]> {
    let data = reader.read_value(Tag::Integer)?;
    match data.first() {
        None => Err(pemstore_der::Error::IntegerNoData.into()),
        Some(b) if b & 0x80 != 0 => Err(pemstore_der::Error::NegativeInteger.into()),
        Some(_) => Ok(data),
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;
    use rstest::rstest;

    use super::*;

    const RSA_DER: &[u8] = include_bytes!("../../../testdata/rsa.der");

    #[test]
    fn test_decode_rsa_private_key() {
        let params: RsaParams = RSA_DER.decode().unwrap();
        assert_eq!(1024, params.key_size());
        // the private exponent of a 1024-bit key is never longer than the modulus
        assert!(params.private_exponent().len() <= 128);
        assert_ne!(0, params.private_exponent()[0]);
    }

    #[test]
    fn test_decode_small_key() {
        // n = 3233, e = 17, d = 2753
        let der = [
            0x30, 0x0e, 0x02, 0x01, 0x00, 0x02, 0x02, 0x0c, 0xa1, 0x02, 0x01, 0x11, 0x02, 0x02,
            0x0a, 0xc1,
        ];
        let bytes = der.as_slice();
        let params: RsaParams = bytes.decode().unwrap();
        assert_eq!(&BigUint::from(3233u32), params.modulus());
        assert_eq!(&BigUint::from(17u32), params.public_exponent());
        assert_eq!(&[0x0a, 0xc1], params.private_exponent());
    }

    #[rstest(
        input,
        expected,
        // version 1 (multi-prime)
        case(vec![0x30, 0x0e, 0x02, 0x01, 0x01, 0x02, 0x02, 0x0c, 0xa1, 0x02, 0x01, 0x11, 0x02, 0x02, 0x0a, 0xc1],
             Error::InvalidVersion { structure: "RSAPrivateKey", version: 1 }),
        // missing private exponent
        case(vec![0x30, 0x0a, 0x02, 0x01, 0x00, 0x02, 0x02, 0x0c, 0xa1, 0x02, 0x01, 0x11],
             Error::Der(pemstore_der::Error::UnexpectedEof)),
        // AlgorithmIdentifier where the modulus should be
        case(vec![0x30, 0x08, 0x02, 0x01, 0x00, 0x30, 0x03, 0x06, 0x01, 0x00],
             Error::Der(pemstore_der::Error::UnexpectedTag { expected: Tag::Integer, found: Tag::Sequence })),
        // negative private exponent
        case(vec![0x30, 0x0e, 0x02, 0x01, 0x00, 0x02, 0x02, 0x0c, 0xa1, 0x02, 0x01, 0x11, 0x02, 0x02, 0xfa, 0xc1],
             Error::Der(pemstore_der::Error::NegativeInteger))
    )]
    fn test_decode_rsa_private_key_with_error(input: Vec<u8>, expected: Error) {
        let bytes = input.as_slice();
        let result: Result<RsaParams> = bytes.decode();
        assert_eq!(expected, result.unwrap_err());
    }
}
