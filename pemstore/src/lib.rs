//! # pemstore
//!
//! Conversion traits shared by the pemstore key-loading crates.
//!
//! Key material moves through a chain of typed representations:
//! ```text
//! bytes → Pem → DER bytes → KeySpecification → PrivateKey
//!                         ↘ Certificate
//! ```
//!
//! Each step that needs no extra input (no password, no policy) is
//! expressed with the [`decoder::Decoder`] trait. Steps that do need a
//! password are plain functions in `pemstore-pkcs`.
//!
//! ```ignore
//! use pemstore::decoder::Decoder;
//! use pemstore_pem::Pem;
//!
//! let pem: Pem = "-----BEGIN CERTIFICATE-----\n...".parse()?;
//! let der: Vec<u8> = pem.decode()?;
//! ```

#![forbid(unsafe_code)]

pub mod decoder;
