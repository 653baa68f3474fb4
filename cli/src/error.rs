use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("key error ({kind}): {0}", kind = .0.kind())]
    Key(#[from] pemstore_pkcs::Error),

    #[error("certificate error: {0}")]
    Certificate(#[from] pemstore_x509::Error),

    #[error("key store error ({kind}): {0}", kind = .0.kind())]
    Store(#[from] pemstore_keystore::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("environment variable {0} is not set or not valid UTF-8")]
    MissingEnv(String),
}

pub type Result<T> = std::result::Result<T, Error>;
