use thiserror::Error;

use crate::Tag;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("parser error {0:?}")]
    Parser(nom::error::ErrorKind),

    #[error("unexpected tag: expected {expected}, found {found}")]
    UnexpectedTag { expected: Tag, found: Tag },
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("{0} trailing bytes after the last element")]
    TrailingData(usize),

    // Length errors
    #[error("length field spans {0} bytes (lengths over 32 bits are not supported)")]
    LengthOverflow(usize),
    #[error("indefinite length is not allowed in DER")]
    IndefiniteLength,

    // Integer errors
    #[error("INTEGER: no data")]
    IntegerNoData,
    #[error("INTEGER: negative value where an unsigned one is required")]
    NegativeInteger,
    #[error("INTEGER: value out of range for u64")]
    IntegerOutOfRange,

    // ObjectIdentifier errors
    #[error("OBJECT IDENTIFIER: no data")]
    ObjectIdentifierNoData,
    #[error("OBJECT IDENTIFIER: incomplete encoding")]
    ObjectIdentifierIncompleteEncoding,
    #[error("OBJECT IDENTIFIER: arc does not fit in 64 bits")]
    ObjectIdentifierArcOverflow,
    #[error("OBJECT IDENTIFIER: too few components (need at least 2)")]
    ObjectIdentifierTooFewComponents,
    #[error("OBJECT IDENTIFIER: invalid component '{0}'")]
    ObjectIdentifierInvalidComponent(String),

    #[error("NULL: expected no content, found {0} bytes")]
    InvalidNull(usize),
}

impl From<nom::Err<nom::error::Error<&[u8]>>> for Error {
    fn from(err: nom::Err<nom::error::Error<&[u8]>>) -> Self {
        match err {
            nom::Err::Incomplete(_) => Error::UnexpectedEof,
            nom::Err::Error(e) | nom::Err::Failure(e) => match e.code {
                nom::error::ErrorKind::Eof => Error::UnexpectedEof,
                code => Error::Parser(code),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
