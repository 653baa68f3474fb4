//! Certificate Chain
//!
//! An ordered sequence of certificates, leaf first. Each following
//! certificate is expected to be the issuer of the one before it, but that
//! is not checked here.

use std::ops::Deref;
use std::str::FromStr;

use pemstore::decoder::Decoder;
use pemstore_pem::{Label, Pem};
use x509_cert::der::{Decode, Reader, SliceReader};

use crate::Certificate;
use crate::error::{Error, Result};

const PEM_BEGIN: &str = "-----BEGIN";

/// A non-empty, leaf-first chain of X.509 certificates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateChain {
    certificates: Vec<Certificate>,
}

impl CertificateChain {
    /// Fails with [`Error::EmptyCertificateChain`] when `certificates` is empty.
    pub fn new(certificates: Vec<Certificate>) -> Result<Self> {
        if certificates.is_empty() {
            return Err(Error::EmptyCertificateChain);
        }
        Ok(Self { certificates })
    }

    /// Decodes PEM `CERTIFICATE` blocks or concatenated DER certificates.
    ///
    /// PEM blocks with other labels are skipped.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match std::str::from_utf8(bytes) {
            Ok(text) if text.contains(PEM_BEGIN) => text.parse(),
            Ok(text) if text.trim().is_empty() => Err(Error::EmptyCertificateChain),
            _ => Self::from_der(bytes),
        }
    }

    /// Decodes one or more DER certificates laid end to end.
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::EmptyCertificateChain);
        }
        let invalid = |index: usize| {
            move |source: x509_cert::der::Error| Error::InvalidCertificate { index, source }
        };

        let mut reader = SliceReader::new(bytes).map_err(invalid(0))?;
        let mut certificates = Vec::new();
        while !reader.is_finished() {
            let index = certificates.len();
            let cert = x509_cert::Certificate::decode(&mut reader).map_err(invalid(index))?;
            certificates.push(Certificate::from_decoded(cert).map_err(invalid(index))?);
        }
        Self::new(certificates)
    }

    /// The end-entity certificate.
    pub fn leaf(&self) -> &Certificate {
        &self.certificates[0]
    }

    /// All certificates after the leaf.
    pub fn intermediates(&self) -> &[Certificate] {
        &self.certificates[1..]
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Always false, a chain holds at least one certificate.
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Certificate> {
        self.certificates.iter()
    }

    pub fn as_slice(&self) -> &[Certificate] {
        &self.certificates
    }

    pub fn into_vec(self) -> Vec<Certificate> {
        self.certificates
    }

    /// The last certificate, if it is a self-signed CA.
    pub fn root(&self) -> Option<&Certificate> {
        self.certificates
            .last()
            .filter(|cert| cert.is_self_signed() && cert.is_ca())
    }

    /// Position of `cert` in the chain, compared by DER encoding.
    pub fn position(&self, cert: &Certificate) -> Option<usize> {
        self.certificates.iter().position(|c| c == cert)
    }
}

impl From<Certificate> for CertificateChain {
    fn from(cert: Certificate) -> Self {
        Self {
            certificates: vec![cert],
        }
    }
}

impl TryFrom<Vec<Certificate>> for CertificateChain {
    type Error = Error;

    fn try_from(certificates: Vec<Certificate>) -> Result<Self> {
        Self::new(certificates)
    }
}

impl Deref for CertificateChain {
    type Target = [Certificate];

    fn deref(&self) -> &Self::Target {
        &self.certificates
    }
}

impl<'a> IntoIterator for &'a CertificateChain {
    type Item = &'a Certificate;
    type IntoIter = std::slice::Iter<'a, Certificate>;

    fn into_iter(self) -> Self::IntoIter {
        self.certificates.iter()
    }
}

impl IntoIterator for CertificateChain {
    type Item = Certificate;
    type IntoIter = std::vec::IntoIter<Certificate>;

    fn into_iter(self) -> Self::IntoIter {
        self.certificates.into_iter()
    }
}

impl FromStr for CertificateChain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let pems = pemstore_pem::parse_many(s)?;
        let certs = pems
            .iter()
            .filter(|p| *p.label() == Label::Certificate)
            .enumerate()
            .map(|(index, pem)| {
                let der: Vec<u8> = pem.decode()?;
                Certificate::from_der(&der)
                    .map_err(|source| Error::InvalidCertificate { index, source })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(certs)
    }
}

/// Decodes a single PEM `CERTIFICATE` block.
impl TryFrom<&Pem> for Certificate {
    type Error = Error;

    fn try_from(pem: &Pem) -> Result<Self> {
        let der: Vec<u8> = pem.decode()?;
        Certificate::from_der(&der).map_err(|source| Error::InvalidCertificate { index: 0, source })
    }
}
