use std::fmt;

use thiserror::Error;

/// Coarse classification of a key decoding failure.
///
/// Callers use this to tell "try a different password" apart from
/// "this format is not supported" and "this file is corrupt".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedKey,
    UnsupportedAlgorithm,
    BadPassword,
    NoPasswordProvided,
    KeyTooLarge,
}

impl ErrorKind {
    /// Only a wrong password can succeed on another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::BadPassword)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::MalformedKey => "malformed key",
            ErrorKind::UnsupportedAlgorithm => "unsupported algorithm",
            ErrorKind::BadPassword => "bad password",
            ErrorKind::NoPasswordProvided => "no password provided",
            ErrorKind::KeyTooLarge => "key too large",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("DER error: {0}")]
    Der(#[from] pemstore_der::Error),

    #[error("PEM error: {0}")]
    Pem(#[from] pemstore_pem::error::Error),

    #[error("invalid {structure} version {version}")]
    InvalidVersion { structure: &'static str, version: u64 },

    #[error("unrecognized key structure: {0}")]
    UnrecognizedStructure(&'static str),

    #[error("unrecognized PEM label '{0}'")]
    UnrecognizedLabel(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("unsupported cipher '{0}'")]
    UnsupportedCipher(String),

    #[error("missing PEM header '{0}'")]
    MissingHeader(&'static str),

    #[error("invalid DEK-Info: {0}")]
    InvalidDekInfo(String),

    #[error("invalid PBE parameters: {0}")]
    InvalidPbeParameters(String),

    #[error("cipher error: {0}")]
    Cipher(#[from] crate::cipher::CipherError),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("bad password")]
    BadPassword,

    #[error("key is encrypted and no password was provided")]
    NoPasswordProvided,

    #[error("{cipher} needs a {bits}-bit key but at most {max} bits are allowed")]
    KeyTooLarge { cipher: String, bits: u32, max: u32 },

    #[error("RSA input out of range: {0}")]
    OutOfRange(&'static str),

    #[error("RSA error: {0}")]
    Rsa(String),
}

impl From<rsa::Error> for Error {
    fn from(e: rsa::Error) -> Self {
        Error::Rsa(e.to_string())
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnrecognizedLabel(_)
            | Error::UnsupportedAlgorithm(_)
            | Error::UnsupportedCipher(_) => ErrorKind::UnsupportedAlgorithm,
            Error::BadPassword => ErrorKind::BadPassword,
            Error::NoPasswordProvided => ErrorKind::NoPasswordProvided,
            Error::KeyTooLarge { .. } => ErrorKind::KeyTooLarge,
            Error::Der(_)
            | Error::Pem(_)
            | Error::InvalidVersion { .. }
            | Error::UnrecognizedStructure(_)
            | Error::MissingHeader(_)
            | Error::InvalidDekInfo(_)
            | Error::InvalidPbeParameters(_)
            | Error::Cipher(_)
            | Error::DecryptionFailed(_)
            | Error::OutOfRange(_)
            | Error::Rsa(_) => ErrorKind::MalformedKey,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
