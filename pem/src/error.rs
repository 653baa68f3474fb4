use base64::DecodeError;
use thiserror::Error;

/// Errors that can occur when parsing or decoding PEM data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// No opening boundary marker (e.g., `-----BEGIN CERTIFICATE-----`)
    #[error("missing a pre encapsulation boundary")]
    MissingPreEncapsulationBoundary,

    /// An opening boundary was found but no `END` line with the same label
    #[error("unable to find encapsulated data: missing a post encapsulation boundary")]
    MissingPostEncapsulationBoundary,

    /// No data found between boundary markers
    #[error("missing PEM data")]
    MissingData,

    /// A `key: value` line with an empty key
    #[error("invalid header line '{0}'")]
    InvalidHeader(String),

    /// Input is not text
    #[error("PEM input is not valid UTF-8")]
    InvalidUtf8,

    /// Failed to decode base64 data
    #[error("base64 decode: {0}")]
    Base64Decode(DecodeError),
}
