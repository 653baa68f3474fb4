use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("certificate chain is empty")]
    EmptyCertificateChain,
    #[error("PEM error: {0}")]
    Pem(#[from] pemstore_pem::error::Error),
    #[error("invalid certificate {index}: {source}")]
    InvalidCertificate {
        index: usize,
        source: x509_cert::der::Error,
    },
    #[error("certificate time out of range")]
    InvalidTime,
}

pub type Result<T> = std::result::Result<T, Error>;
