//! PEM armor decoding.
//!
//! A block runs from a `-----BEGIN <label>-----` line to an `-----END <label>-----`
//! line carrying the same label. Inside the block, lines of the form
//! `Name: value` are RFC 1421 header properties (`Proc-Type`, `DEK-Info`) and
//! every other non-empty line is base64 payload.

pub mod error;

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
    sync::LazyLock,
};

use base64::{Engine, engine::general_purpose::STANDARD};
use error::Error;
use pemstore::decoder::{DecodableFrom, Decoder};
use regex::Regex;
use zeroize::Zeroize;

const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";
const ENCRYPTED_PRIVATE_KEY_LABEL: &str = "ENCRYPTED PRIVATE KEY";
const RSA_PRIVATE_KEY_LABEL: &str = "RSA PRIVATE KEY";
const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Header naming the encryption used by a legacy encrypted PKCS#1 block.
pub const PROC_TYPE: &str = "Proc-Type";
/// Header carrying `<CIPHER-SPEC>,<HEX-IV>` for a legacy encrypted PKCS#1 block.
pub const DEK_INFO: &str = "DEK-Info";

static BOUNDARY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^-----(BEGIN|END) ([A-Z0-9 ]+)-----$").ok());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    /// PKCS#8 private key (non-encrypted)
    PrivateKey,
    /// PKCS#8 encrypted private key
    EncryptedPrivateKey,
    /// PKCS#1 RSA private key, optionally legacy encrypted
    RsaPrivateKey,
    /// X.509 Certificate
    Certificate,
    Other(String),
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::PrivateKey => write!(f, "{}", PRIVATE_KEY_LABEL),
            Label::EncryptedPrivateKey => write!(f, "{}", ENCRYPTED_PRIVATE_KEY_LABEL),
            Label::RsaPrivateKey => write!(f, "{}", RSA_PRIVATE_KEY_LABEL),
            Label::Certificate => write!(f, "{}", CERTIFICATE_LABEL),
            Label::Other(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        match s {
            PRIVATE_KEY_LABEL => Label::PrivateKey,
            ENCRYPTED_PRIVATE_KEY_LABEL => Label::EncryptedPrivateKey,
            RSA_PRIVATE_KEY_LABEL => Label::RsaPrivateKey,
            CERTIFICATE_LABEL => Label::Certificate,
            other => Label::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary<'a> {
    Begin(&'a str),
    End(&'a str),
}

impl<'a> Boundary<'a> {
    fn parse(line: &'a str) -> Option<Boundary<'a>> {
        let captured = BOUNDARY.as_ref()?.captures(line)?;
        let label = captured.get(2)?.as_str();
        match captured.get(1)?.as_str() {
            "BEGIN" => Some(Boundary::Begin(label)),
            _ => Some(Boundary::End(label)),
        }
    }
}

/// Header properties of a PEM block, in file order. Names compare
/// case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/*
ref: https://www.rfc-editor.org/rfc/rfc1421.html#section-4.4
ref: https://www.rfc-editor.org/rfc/rfc7468.html#section-3
*/

/// One PEM block. The base64 text is wiped when the block is dropped.
#[derive(Debug, Clone)]
pub struct Pem {
    label: Label,
    headers: Headers,
    base64_data: String,
}

impl Pem {
    pub fn new(label: Label, base64_data: String) -> Self {
        Pem {
            label,
            headers: Headers::default(),
            base64_data,
        }
    }

    pub fn from_bytes(label: Label, data: &[u8]) -> Self {
        Pem::new(label, STANDARD.encode(data))
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Parse the first block of a byte buffer that should hold PEM text.
    pub fn from_utf8(bytes: &[u8]) -> Result<Self, Error> {
        std::str::from_utf8(bytes)
            .map_err(|_| Error::InvalidUtf8)?
            .parse()
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn data(&self) -> &str {
        &self.base64_data
    }
}

impl Drop for Pem {
    fn drop(&mut self) {
        self.base64_data.zeroize();
    }
}

impl Display for Pem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "-----BEGIN {}-----", self.label)?;
        if !self.headers.is_empty() {
            for (name, value) in self.headers.iter() {
                writeln!(f, "{}: {}", name, value)?;
            }
            writeln!(f)?;
        }
        // RFC 7468: base64 text should be wrapped at 64 characters
        for chunk in self.base64_data.as_bytes().chunks(64) {
            let line = std::str::from_utf8(chunk).map_err(|_| std::fmt::Error)?;
            writeln!(f, "{}", line)?;
        }
        write!(f, "-----END {}-----", self.label)
    }
}

impl DecodableFrom<Pem> for Vec<u8> {}

impl Decoder<Pem, Vec<u8>> for Pem {
    type Error = Error;

    fn decode(&self) -> Result<Vec<u8>, Self::Error> {
        // This discards label and header information from Pem format.
        let decoded = STANDARD.decode(self.data()).map_err(Error::Base64Decode)?;
        Ok(decoded)
    }
}

impl DecodableFrom<String> for Pem {}

impl Decoder<String, Pem> for String {
    type Error = Error;

    fn decode(&self) -> Result<Pem, Self::Error> {
        Pem::from_str(self)
    }
}

impl DecodableFrom<&str> for Pem {}

impl Decoder<&str, Pem> for &str {
    type Error = Error;

    fn decode(&self) -> Result<Pem, Self::Error> {
        Pem::from_str(self)
    }
}

/// Reads the next block from `lines`. Returns `Ok(None)` when no further
/// `BEGIN` line exists.
fn next_block<'a, I>(lines: &mut I) -> Result<Option<Pem>, Error>
where
    I: Iterator<Item = &'a str>,
{
    // explanatory text before the block is ignored
    let label = loop {
        let Some(line) = lines.next() else {
            return Ok(None);
        };
        if let Some(Boundary::Begin(label)) = Boundary::parse(line.trim()) {
            break label;
        }
    };

    let mut headers = Headers::default();
    let mut payload = String::new();
    for line in lines.by_ref() {
        let line = line.trim();
        match Boundary::parse(line) {
            Some(Boundary::End(end)) if end == label => {
                if payload.is_empty() {
                    return Err(Error::MissingData);
                }
                return Ok(Some(Pem {
                    label: Label::from(label),
                    headers,
                    base64_data: payload,
                }));
            }
            // a BEGIN, or an END for another label, does not close the block
            Some(_) => continue,
            None => {}
        }
        if line.is_empty() {
            continue;
        }
        match line.split_once(':') {
            Some((name, value)) => {
                let name = name.trim();
                if name.is_empty() {
                    payload.zeroize();
                    return Err(Error::InvalidHeader(line.to_string()));
                }
                headers.insert(name, value.trim());
            }
            None => payload.push_str(line),
        }
    }

    payload.zeroize();
    Err(Error::MissingPostEncapsulationBoundary)
}

/// Parse multiple PEM blocks from a string.
///
/// Returns a vector of all PEM blocks found in the input.
/// This is useful for parsing certificate chains or files containing
/// multiple certificates.
///
/// # Example
/// ```
/// use pemstore_pem::parse_many;
///
/// let pem_data = "-----BEGIN CERTIFICATE-----\nAAA=\n-----END CERTIFICATE-----\n-----BEGIN CERTIFICATE-----\nBBB=\n-----END CERTIFICATE-----";
/// let pems = parse_many(pem_data).unwrap();
/// assert_eq!(pems.len(), 2);
/// ```
pub fn parse_many(s: &str) -> Result<Vec<Pem>, Error> {
    // Normalize input: ensure each boundary marker is on its own line
    let normalized = s.replace("----------", "-----\n-----");

    let mut lines = normalized.lines();
    let mut pems = Vec::new();
    while let Some(pem) = next_block(&mut lines)? {
        pems.push(pem);
    }

    if pems.is_empty() {
        return Err(Error::MissingPreEncapsulationBoundary);
    }
    Ok(pems)
}

impl FromStr for Pem {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        next_block(&mut s.lines())?.ok_or(Error::MissingPreEncapsulationBoundary)
    }
}
