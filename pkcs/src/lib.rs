//! Private key decoding for PKCS#1, PKCS#8 and OpenSSL legacy encrypted PEM.
//!
//! [`decode_key`] accepts PEM or DER bytes and produces a
//! [`KeySpecification`], decrypting with a password where the key requires
//! one. [`PrivateKey`] turns a specification into a usable key.
//!
//! ```no_run
//! use pemstore_pkcs::{DecodeOptions, load_private_key};
//!
//! let bytes = std::fs::read("server.key").unwrap();
//! let key = load_private_key(&bytes, Some(b"changeit"), &DecodeOptions::default()).unwrap();
//! println!("{} {} bits", key.algorithm(), key.key_size());
//! ```

pub mod algorithm;
pub mod cipher;
mod decode;
pub mod error;
mod format;
pub mod key_spec;
pub mod legacy;
pub mod pkcs1;
pub mod pkcs8;
pub mod policy;
mod private_key;

pub use algorithm::KeyAlgorithm;
pub use decode::{KeyInfo, KeyStructure, decode_key, inspect, load_private_key};
pub use error::{Error, ErrorKind, Result};
pub use format::KeyFormat;
pub use key_spec::{KeySpecification, RsaParams};
pub use policy::{BadPasswordHeuristic, CryptoPolicy, DecodeOptions};
pub use private_key::{DsaPrivateKey, PrivateKey, RsaPrivateKey};
