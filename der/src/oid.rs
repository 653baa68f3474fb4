use std::{fmt::Display, str::FromStr};

use crate::error::{Error, Result};

/// An OBJECT IDENTIFIER as its list of arcs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectIdentifier {
    inner: Vec<u64>,
}

impl ObjectIdentifier {
    pub fn arcs(&self) -> &[u64] {
        &self.inner
    }
}

impl TryFrom<&[u8]> for ObjectIdentifier {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self> {
        let Some((&first, rest)) = value.split_first() else {
            return Err(Error::ObjectIdentifierNoData);
        };

        // first byte = 40 * arc0 + arc1
        let mut values = vec![u64::from(first / 40), u64::from(first % 40)];

        let mut val = 0u64;
        let mut pending = false;
        for &b in rest {
            if val > (u64::MAX >> 7) {
                return Err(Error::ObjectIdentifierArcOverflow);
            }
            val = (val << 7) | u64::from(b & 0x7f);
            pending = b & 0x80 != 0;
            if !pending {
                values.push(val);
                val = 0;
            }
        }
        if pending {
            // continuation bit set on the final byte
            return Err(Error::ObjectIdentifierIncompleteEncoding);
        }

        Ok(ObjectIdentifier { inner: values })
    }
}

impl Display for ObjectIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self.inner.first() {
            Some(n) => self.inner[1..]
                .iter()
                .fold(n.to_string(), |s, n| s + "." + &n.to_string()),
            None => String::new(),
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ObjectIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let values = s
            .split('.')
            .map(|c| {
                c.parse::<u64>()
                    .map_err(|_| Error::ObjectIdentifierInvalidComponent(c.to_string()))
            })
            .collect::<Result<Vec<u64>>>()?;
        if values.len() < 2 {
            return Err(Error::ObjectIdentifierTooFewComponents);
        }
        Ok(ObjectIdentifier { inner: values })
    }
}

impl PartialEq<&str> for ObjectIdentifier {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}

impl PartialEq<ObjectIdentifier> for &str {
    fn eq(&self, other: &ObjectIdentifier) -> bool {
        *self == other.to_string()
    }
}
