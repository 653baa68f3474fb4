use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Failure classes of the key store.
///
/// The first five mirror [`pemstore_pkcs::ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedKey,
    UnsupportedAlgorithm,
    BadPassword,
    NoPasswordProvided,
    KeyTooLarge,
    EmptyCertificateChain,
    Certificate,
    Io,
    InsecurePermissions,
    ReadOnly,
    LoadAborted,
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
            ErrorKind::EmptyCertificateChain => "empty certificate chain",
            ErrorKind::Certificate => "certificate error",
            ErrorKind::Io => "I/O error",
            ErrorKind::InsecurePermissions => "insecure permissions",
            ErrorKind::ReadOnly => "read-only store",
            ErrorKind::LoadAborted => "load aborted",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<pemstore_pkcs::ErrorKind> for ErrorKind {
    fn from(kind: pemstore_pkcs::ErrorKind) -> Self {
        match kind {
            pemstore_pkcs::ErrorKind::MalformedKey => ErrorKind::MalformedKey,
            pemstore_pkcs::ErrorKind::UnsupportedAlgorithm => ErrorKind::UnsupportedAlgorithm,
            pemstore_pkcs::ErrorKind::BadPassword => ErrorKind::BadPassword,
            pemstore_pkcs::ErrorKind::NoPasswordProvided => ErrorKind::NoPasswordProvided,
            pemstore_pkcs::ErrorKind::KeyTooLarge => ErrorKind::KeyTooLarge,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("key error: {0}")]
    Key(#[from] pemstore_pkcs::Error),

    #[error("certificate error: {0}")]
    Certificate(#[from] pemstore_x509::Error),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{} is accessible by other users (mode {mode:o})", path.display())]
    InsecurePermissions { path: PathBuf, mode: u32 },

    #[error("key store is read-only: {0} is not supported")]
    ReadOnly(&'static str),

    #[error("load sequence panicked")]
    LoadAborted,

    #[error("key store '{alias}' failed to load: {source}")]
    LoadFailed { alias: String, source: Arc<Error> },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Key(e) => e.kind().into(),
            Error::Certificate(pemstore_x509::Error::EmptyCertificateChain) => {
                ErrorKind::EmptyCertificateChain
            }
            Error::Certificate(_) => ErrorKind::Certificate,
            Error::Io { .. } => ErrorKind::Io,
            Error::InsecurePermissions { .. } => ErrorKind::InsecurePermissions,
            Error::ReadOnly(_) => ErrorKind::ReadOnly,
            Error::LoadAborted => ErrorKind::LoadAborted,
            Error::LoadFailed { source, .. } => source.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
