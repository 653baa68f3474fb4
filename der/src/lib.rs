//! Minimal DER reader.
//!
//! Only what private key structures need: tag/length headers, INTEGER,
//! OBJECT IDENTIFIER, OCTET STRING, NULL and SEQUENCE nesting. Values are
//! borrowed from the input; nothing is copied until a caller asks for it.
//!
//! ```
//! use pemstore_der::{DerReader, Tag};
//!
//! // SEQUENCE { INTEGER 0, INTEGER 7 }
//! let bytes = [0x30, 0x06, 0x02, 0x01, 0x00, 0x02, 0x01, 0x07];
//! let mut outer = DerReader::new(&bytes);
//! let mut seq = outer.read_sequence().unwrap();
//! assert_eq!(seq.read_u64().unwrap(), 0);
//! assert_eq!(seq.read_u64().unwrap(), 7);
//! assert!(seq.is_empty());
//! ```

use std::fmt::{Display, Formatter};

use nom::IResult;
use num_bigint::BigUint;
use num_traits::ToPrimitive;

pub mod error;
mod oid;

pub use error::{Error, Result};
pub use oid::ObjectIdentifier;

pub const TAG_CONSTRUCTED: u8 = 0x20;
const TAG_CONTEXT_SPECIFIC: u8 = 0x80;

// Long-form lengths carry at most this many length bytes.
const MAX_LENGTH_BYTES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tag {
    Boolean,
    Integer,
    BitString,
    OctetString,
    Null,
    ObjectIdentifier,
    Sequence,
    Set,
    ContextSpecific { slot: u8, constructed: bool },
    Unimplemented(u8),
}

impl From<u8> for Tag {
    fn from(value: u8) -> Self {
        match value {
            0x01 => Self::Boolean,
            0x02 => Self::Integer,
            0x03 => Self::BitString,
            0x04 => Self::OctetString,
            0x05 => Self::Null,
            0x06 => Self::ObjectIdentifier,
            0x30 => Self::Sequence,
            0x31 => Self::Set,
            v if v & 0xc0 == TAG_CONTEXT_SPECIFIC => Self::ContextSpecific {
                slot: v & 0x1f,
                constructed: v & TAG_CONSTRUCTED != 0,
            },
            _ => Tag::Unimplemented(value),
        }
    }
}

impl From<Tag> for u8 {
    fn from(tag: Tag) -> Self {
        match tag {
            Tag::Boolean => 0x01,
            Tag::Integer => 0x02,
            Tag::BitString => 0x03,
            Tag::OctetString => 0x04,
            Tag::Null => 0x05,
            Tag::ObjectIdentifier => 0x06,
            Tag::Sequence => 0x30,
            Tag::Set => 0x31,
            Tag::ContextSpecific { slot, constructed } => {
                TAG_CONTEXT_SPECIFIC | if constructed { TAG_CONSTRUCTED } else { 0 } | slot
            }
            Tag::Unimplemented(v) => v,
        }
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Tag::Boolean => write!(f, "BOOLEAN"),
            Tag::Integer => write!(f, "INTEGER"),
            Tag::BitString => write!(f, "BIT STRING"),
            Tag::OctetString => write!(f, "OCTET STRING"),
            Tag::Null => write!(f, "NULL"),
            Tag::ObjectIdentifier => write!(f, "OBJECT IDENTIFIER"),
            Tag::Sequence => write!(f, "SEQUENCE"),
            Tag::Set => write!(f, "SET"),
            Tag::ContextSpecific { slot, .. } => write!(f, "[{}]", slot),
            Tag::Unimplemented(v) => write!(f, "tag 0x{:02x}", v),
        }
    }
}

/// Cursor over a DER buffer.
///
/// Every `read_*` call consumes exactly one element on success. On error the
/// cursor position is unspecified and the reader should be dropped.
#[derive(Debug, Clone, Copy)]
pub struct DerReader<'a> {
    input: &'a [u8],
}

impl<'a> DerReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        DerReader { input }
    }

    pub fn remaining(&self) -> &'a [u8] {
        self.input
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    /// Tag of the next element without consuming it.
    pub fn peek_tag(&self) -> Option<Tag> {
        self.input.first().map(|&b| Tag::from(b))
    }

    /// Consumes a tag/length header and returns the content length.
    ///
    /// The content itself is left in the reader.
    pub fn read_tag_length(&mut self, expected: Tag) -> Result<usize> {
        let (input, tag) = parse_tag(self.input)?;
        if tag != expected {
            return Err(Error::UnexpectedTag {
                expected,
                found: tag,
            });
        }
        let (input, length) = parse_length(input)?;
        self.input = input;
        Ok(length)
    }

    /// Reads one element of any tag and returns its tag and content.
    pub fn read_any(&mut self) -> Result<(Tag, &'a [u8])> {
        let (input, tag) = parse_tag(self.input)?;
        let (input, length) = parse_length(input)?;
        let (input, value) = take(input, length)?;
        self.input = input;
        Ok((tag, value))
    }

    /// Reads one element and returns its complete encoding, header included.
    pub fn read_element(&mut self) -> Result<&'a [u8]> {
        let start = self.input;
        self.read_any()?;
        let consumed = start.len() - self.input.len();
        Ok(&start[..consumed])
    }

    /// Reads the content of an element with the expected tag.
    pub fn read_value(&mut self, expected: Tag) -> Result<&'a [u8]> {
        let length = self.read_tag_length(expected)?;
        let (input, value) = take(self.input, length)?;
        self.input = input;
        Ok(value)
    }

    /// Reads a SEQUENCE and returns a reader over its content.
    pub fn read_sequence(&mut self) -> Result<DerReader<'a>> {
        self.read_value(Tag::Sequence).map(DerReader::new)
    }

    /// Reads a non-negative INTEGER of any size.
    pub fn read_integer(&mut self) -> Result<BigUint> {
        let data = self.read_value(Tag::Integer)?;
        match data.first() {
            None => Err(Error::IntegerNoData),
            Some(b) if b & 0x80 != 0 => Err(Error::NegativeInteger),
            Some(_) => Ok(BigUint::from_bytes_be(data)),
        }
    }

    /// Reads a small non-negative INTEGER such as a version or iteration count.
    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_integer()?
            .to_u64()
            .ok_or(Error::IntegerOutOfRange)
    }

    pub fn read_object_identifier(&mut self) -> Result<ObjectIdentifier> {
        let data = self.read_value(Tag::ObjectIdentifier)?;
        ObjectIdentifier::try_from(data)
    }

    pub fn read_octet_string(&mut self) -> Result<&'a [u8]> {
        self.read_value(Tag::OctetString)
    }

    pub fn read_null(&mut self) -> Result<()> {
        let data = self.read_value(Tag::Null)?;
        if !data.is_empty() {
            return Err(Error::InvalidNull(data.len()));
        }
        Ok(())
    }

    /// Fails if anything is left unread.
    pub fn finish(self) -> Result<()> {
        if self.input.is_empty() {
            Ok(())
        } else {
            Err(Error::TrailingData(self.input.len()))
        }
    }
}

fn parse_tag(input: &[u8]) -> IResult<&[u8], Tag> {
    let (input, n) = nom::number::complete::be_u8(input)?;
    Ok((input, Tag::from(n)))
}

fn parse_length(input: &[u8]) -> Result<(&[u8], usize)> {
    let (input, n) = nom::number::complete::be_u8::<_, nom::error::Error<&[u8]>>(input)?;
    if n & 0x80 == 0 {
        // short form: 0-127
        return Ok((input, usize::from(n)));
    }
    // long form
    // First 1 bit is a marker for long form.
    // Other bits represent bytes length of the length field.
    let count = usize::from(n & 0x7f);
    if count == 0 {
        return Err(Error::IndefiniteLength);
    }
    if count > MAX_LENGTH_BYTES {
        return Err(Error::LengthOverflow(count));
    }
    let (input, bs) = take(input, count)?;
    let length = bs
        .iter()
        .fold(0u64, |length, &b| (length << 8) | u64::from(b));
    let length = usize::try_from(length).map_err(|_| Error::LengthOverflow(count))?;
    Ok((input, length))
}

fn take(input: &[u8], length: usize) -> Result<(&[u8], &[u8])> {
    if input.len() < length {
        return Err(Error::UnexpectedEof);
    }
    let (value, rest) = input.split_at(length);
    Ok((rest, value))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest(input, expected,
        case(vec![0x02], Tag::Integer),
        case(vec![0x02, 0x01], Tag::Integer),
        case(vec![0x30, 0x01], Tag::Sequence),
        case(vec![0xa0, 0x03], Tag::ContextSpecific { slot: 0, constructed: true }),
        case(vec![0x81, 0x01], Tag::ContextSpecific { slot: 1, constructed: false }),
        case(vec![0x13], Tag::Unimplemented(0x13)),
    )]
    fn test_parse_tag(input: Vec<u8>, expected: Tag) {
        let (_, actual) = parse_tag(&input).unwrap();
        assert_eq!(expected, actual);
        assert_eq!(input[0], u8::from(actual));
    }

    #[rstest(input, expected,
        case(vec![0x02], 0x02),
        case(vec![0x7f], 0x7f),
        case(vec![0x81, 0x80], 0x80),
        case(vec![0x82, 0x02, 0x10], 256 * 0x02 + 0x10),
        case(vec![0x83, 0x01, 0x00, 0x00], 256 * 256),
        case(vec![0x82, 0xff, 0xff], 256 * 0xff + 0xff),
        case(vec![0x84, 0x7f, 0xff, 0xff, 0xff], 0x7fff_ffff),
    )]
    fn test_parse_length(input: Vec<u8>, expected: usize) {
        let (_, actual) = parse_length(&input).unwrap();
        assert_eq!(expected, actual);
    }

    #[rstest(input, expected,
        case(vec![0x80], Error::IndefiniteLength),
        case(vec![0x85, 0x01, 0x00, 0x00, 0x00, 0x00], Error::LengthOverflow(5)),
        case(vec![0x88, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01], Error::LengthOverflow(8)),
        case(vec![0x82, 0x01], Error::UnexpectedEof),
        case(vec![], Error::UnexpectedEof),
    )]
    fn test_parse_length_with_error(input: Vec<u8>, expected: Error) {
        let err = parse_length(&input).unwrap_err();
        assert_eq!(expected, err);
    }

    #[test]
    fn test_read_tag_length_leaves_content() {
        let bytes = [0x04, 0x03, 0xaa, 0xbb, 0xcc];
        let mut reader = DerReader::new(&bytes);
        assert_eq!(reader.read_tag_length(Tag::OctetString).unwrap(), 3);
        assert_eq!(reader.remaining(), &[0xaa, 0xbb, 0xcc]);
    }

    #[test]
    fn test_read_tag_length_unexpected_tag() {
        let bytes = [0x02, 0x01, 0x00];
        let mut reader = DerReader::new(&bytes);
        assert_eq!(
            reader.read_tag_length(Tag::Sequence).unwrap_err(),
            Error::UnexpectedTag {
                expected: Tag::Sequence,
                found: Tag::Integer
            }
        );
    }

    #[rstest(input, expected,
        case(vec![0x02, 0x01, 0x00], 0u64),
        case(vec![0x02, 0x01, 0x7f], 127u64),
        case(vec![0x02, 0x02, 0x00, 0x80], 128u64),
        case(vec![0x02, 0x03, 0x01, 0x00, 0x01], 65537u64),
    )]
    fn test_read_integer(input: Vec<u8>, expected: u64) {
        let mut reader = DerReader::new(&input);
        assert_eq!(BigUint::from(expected), reader.read_integer().unwrap());
        assert!(reader.is_empty());
    }

    #[rstest(input, expected,
        case(vec![0x02, 0x00], Error::IntegerNoData),
        case(vec![0x02, 0x01, 0x80], Error::NegativeInteger),
        case(vec![0x02, 0x05, 0x00, 0x01], Error::UnexpectedEof),
    )]
    fn test_read_integer_with_error(input: Vec<u8>, expected: Error) {
        let mut reader = DerReader::new(&input);
        assert_eq!(expected, reader.read_integer().unwrap_err());
    }

    #[test]
    fn test_read_u64_out_of_range() {
        let bytes = [0x02, 0x09, 0x01, 0, 0, 0, 0, 0, 0, 0, 0];
        let mut reader = DerReader::new(&bytes);
        assert_eq!(Error::IntegerOutOfRange, reader.read_u64().unwrap_err());
    }

    #[test]
    fn test_read_nested_sequence() {
        // SEQUENCE { SEQUENCE { OID 1.2.840.113549.1.1.1, NULL }, OCTET STRING 0x01 }
        let bytes = [
            0x30, 0x12, 0x30, 0x0d, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01,
            0x01, 0x05, 0x00, 0x04, 0x01, 0x01,
        ];
        let mut outer = DerReader::new(&bytes);
        let mut seq = outer.read_sequence().unwrap();
        let mut algorithm = seq.read_sequence().unwrap();
        assert_eq!(
            algorithm.read_object_identifier().unwrap(),
            "1.2.840.113549.1.1.1"
        );
        algorithm.read_null().unwrap();
        algorithm.finish().unwrap();
        assert_eq!(seq.read_octet_string().unwrap(), &[0x01]);
        seq.finish().unwrap();
        outer.finish().unwrap();
    }

    #[test]
    fn test_read_element_splits_concatenated() {
        let bytes = [0x30, 0x03, 0x02, 0x01, 0x01, 0x30, 0x00];
        let mut reader = DerReader::new(&bytes);
        assert_eq!(reader.read_element().unwrap(), &bytes[..5]);
        assert_eq!(reader.read_element().unwrap(), &bytes[5..]);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_finish_with_trailing_data() {
        let bytes = [0x05, 0x00, 0xff];
        let mut reader = DerReader::new(&bytes);
        reader.read_null().unwrap();
        assert_eq!(Error::TrailingData(1), reader.finish().unwrap_err());
    }
}
