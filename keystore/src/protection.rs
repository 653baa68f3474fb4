//! Where the key store gets the password for an encrypted key.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use zeroize::Zeroizing;

/// Context handed to a [`PasswordCallback`] on each attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPrompt<'a> {
    pub alias: &'a str,
    /// 1-based attempt number
    pub attempt: u32,
    pub max_attempts: u32,
    /// Cipher or scheme protecting the key, if known
    pub encryption: Option<&'a str>,
}

/// Supplies a password interactively.
///
/// Returning `None` cancels the load with `NoPasswordProvided`.
pub trait PasswordCallback: Send + Sync {
    fn password(&self, prompt: &PasswordPrompt<'_>) -> Option<Zeroizing<Vec<u8>>>;
}

impl<F> PasswordCallback for F
where
    F: Fn(&PasswordPrompt<'_>) -> Option<Zeroizing<Vec<u8>>> + Send + Sync,
{
    fn password(&self, prompt: &PasswordPrompt<'_>) -> Option<Zeroizing<Vec<u8>>> {
        self(prompt)
    }
}

#[derive(Clone)]
pub enum Protection {
    /// A fixed password, tried once
    Password(Zeroizing<Vec<u8>>),
    /// A callback asked on every attempt
    Interactive(Arc<dyn PasswordCallback>),
}

impl Protection {
    pub fn password(password: impl AsRef<[u8]>) -> Self {
        Protection::Password(Zeroizing::new(password.as_ref().to_vec()))
    }

    /// A cleartext key needs no password.
    pub fn none() -> Self {
        Protection::Password(Zeroizing::new(Vec::new()))
    }

    pub fn interactive(callback: impl PasswordCallback + 'static) -> Self {
        Protection::Interactive(Arc::new(callback))
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self, Protection::Interactive(_))
    }
}

impl Debug for Protection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Protection::Password(_) => f.write_str("Password(..)"),
            Protection::Interactive(_) => f.write_str("Interactive(..)"),
        }
    }
}
