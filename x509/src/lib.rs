//! X.509 certificates and certificate chains.
//!
//! Certificates are decoded with `x509-cert`; this crate adds chain loading
//! from PEM or concatenated DER and the few accessors the key store and CLI
//! need. No path or trust validation is performed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use x509_cert::der::oid::AssociatedOid;
use x509_cert::der::{Decode, Encode};
use x509_cert::ext::pkix::BasicConstraints;
use x509_cert::time::Time;

pub mod chain;
pub mod error;

pub use chain::CertificateChain;
pub use error::{Error, Result};

/// A decoded certificate together with its DER encoding.
#[derive(Debug, Clone)]
pub struct Certificate {
    inner: x509_cert::Certificate,
    der: Vec<u8>,
}

impl Certificate {
    pub fn from_der(der: &[u8]) -> std::result::Result<Self, x509_cert::der::Error> {
        let inner = x509_cert::Certificate::from_der(der)?;
        Ok(Certificate {
            inner,
            der: der.to_vec(),
        })
    }

    pub(crate) fn from_decoded(
        inner: x509_cert::Certificate,
    ) -> std::result::Result<Self, x509_cert::der::Error> {
        let der = inner.to_der()?;
        Ok(Certificate { inner, der })
    }

    pub fn inner(&self) -> &x509_cert::Certificate {
        &self.inner
    }

    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// RFC 4514 string form, e.g. `CN=localhost`
    pub fn subject(&self) -> String {
        self.inner.tbs_certificate.subject.to_string()
    }

    pub fn issuer(&self) -> String {
        self.inner.tbs_certificate.issuer.to_string()
    }

    /// Serial number as upper case hex without leading zero bytes.
    pub fn serial_number(&self) -> String {
        let bytes = self.inner.tbs_certificate.serial_number.as_bytes();
        let start = bytes
            .iter()
            .position(|&b| b != 0)
            .unwrap_or(bytes.len().saturating_sub(1));
        hex::encode_upper(&bytes[start..])
    }

    pub fn not_before(&self) -> Result<DateTime<Utc>> {
        to_datetime(self.inner.tbs_certificate.validity.not_before)
    }

    pub fn not_after(&self) -> Result<DateTime<Utc>> {
        to_datetime(self.inner.tbs_certificate.validity.not_after)
    }

    /// Public key algorithm OID in dotted form.
    pub fn public_key_algorithm(&self) -> String {
        self.inner
            .tbs_certificate
            .subject_public_key_info
            .algorithm
            .oid
            .to_string()
    }

    /// Issuer and subject are the same name. The signature is not checked.
    pub fn is_self_signed(&self) -> bool {
        self.inner.tbs_certificate.subject == self.inner.tbs_certificate.issuer
    }

    /// BasicConstraints is present with `cA` set.
    pub fn is_ca(&self) -> bool {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .find(|ext| ext.extn_id == BasicConstraints::OID)
            .and_then(|ext| BasicConstraints::from_der(ext.extn_value.as_bytes()).ok())
            .map(|bc| bc.ca)
            .unwrap_or(false)
    }

    pub fn summary(&self) -> Result<CertificateSummary> {
        Ok(CertificateSummary {
            subject: self.subject(),
            issuer: self.issuer(),
            serial_number: self.serial_number(),
            not_before: self.not_before()?,
            not_after: self.not_after()?,
            public_key_algorithm: self.public_key_algorithm(),
            self_signed: self.is_self_signed(),
            ca: self.is_ca(),
        })
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

/// Serializable view of a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateSummary {
    pub subject: String,
    pub issuer: String,
    pub serial_number: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub public_key_algorithm: String,
    pub self_signed: bool,
    pub ca: bool,
}

fn to_datetime(time: Time) -> Result<DateTime<Utc>> {
    let secs = i64::try_from(time.to_unix_duration().as_secs()).map_err(|_| Error::InvalidTime)?;
    DateTime::from_timestamp(secs, 0).ok_or(Error::InvalidTime)
}

#[cfg(test)]
mod tests {
    use chrono::Datelike;

    use super::*;

    const CERT_DER: &[u8] = include_bytes!("../../testdata/cert.der");

    #[test]
    fn test_certificate_accessors() {
        let cert = Certificate::from_der(CERT_DER).unwrap();
        assert_eq!("CN=localhost", cert.subject());
        assert_eq!("CN=localhost", cert.issuer());
        assert!(cert.is_self_signed());
        assert_eq!("1C5852D1DB86374E7F6E584EC46D2B1F64EA7541", cert.serial_number());
        assert_eq!("1.2.840.113549.1.1.1", cert.public_key_algorithm());
        assert_eq!(CERT_DER, cert.as_der());

        let not_before = cert.not_before().unwrap();
        let not_after = cert.not_after().unwrap();
        assert_eq!(2026, not_before.year());
        assert_eq!(2126, not_after.year());
        assert!(not_before < not_after);
    }

    #[test]
    fn test_summary() {
        let cert = Certificate::from_der(CERT_DER).unwrap();
        let summary = cert.summary().unwrap();
        assert_eq!(cert.subject(), summary.subject);
        assert!(summary.self_signed);
        assert!(summary.ca);
    }

    #[test]
    fn test_from_der_rejects_garbage() {
        assert!(Certificate::from_der(&CERT_DER[..100]).is_err());
        assert!(Certificate::from_der(b"").is_err());
    }
}
