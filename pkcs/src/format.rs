use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

const BOUNDARY_MARKER: &[u8] = b"-----";

/// Outer encoding of a key file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyFormat {
    Pem,
    Der,
}

impl KeyFormat {
    /// `Pem` if a boundary marker appears anywhere in `bytes`, `Der` otherwise.
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes
            .windows(BOUNDARY_MARKER.len())
            .any(|w| w == BOUNDARY_MARKER)
        {
            KeyFormat::Pem
        } else {
            KeyFormat::Der
        }
    }
}

impl Display for KeyFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyFormat::Pem => write!(f, "PEM"),
            KeyFormat::Der => write!(f, "DER"),
        }
    }
}
