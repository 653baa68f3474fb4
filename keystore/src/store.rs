//! The single entry, read-only key store.
//!
//! A store is created unloaded. The first accessor call runs the load
//! sequence under the store's lock; its outcome, success or the first
//! permanent failure, is kept for the lifetime of the store.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use pemstore_pkcs::{DecodeOptions, PrivateKey, inspect, load_private_key};
use pemstore_x509::{Certificate, CertificateChain};
use tracing::{debug, info, instrument, warn};
use zeroize::Zeroizing;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::permissions::{self, FilePermissions};
use crate::protection::{PasswordPrompt, Protection};

struct Entry {
    alias: String,
    /// Key file bytes, decoded afresh by every `get_key`
    key_material: Zeroizing<Vec<u8>>,
    chain: CertificateChain,
    created_at: DateTime<Utc>,
}

enum State {
    Unloaded,
    Loaded(Arc<Entry>),
    Failed(Arc<Error>),
}

pub struct KeyStore {
    config: StoreConfig,
    protection: Protection,
    state: Mutex<State>,
}

impl KeyStore {
    pub fn new(config: StoreConfig, protection: Protection) -> Self {
        KeyStore {
            config,
            protection,
            state: Mutex::new(State::Unloaded),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Runs the load sequence if it has not run yet.
    ///
    /// A failed load is never repeated; later calls return
    /// [`Error::LoadFailed`] wrapping the first failure.
    pub fn load(&self) -> Result<()> {
        self.entry().map(|_| ())
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.lock(), State::Loaded(_))
    }

    /// Decodes the key again with `password`.
    ///
    /// Returns `Ok(None)` when `alias` does not name the entry.
    pub fn get_key(&self, alias: &str, password: Option<&[u8]>) -> Result<Option<PrivateKey>> {
        let entry = self.entry()?;
        if entry.alias != alias {
            return Ok(None);
        }
        let key = load_private_key(&entry.key_material, password, &self.options())?;
        Ok(Some(key))
    }

    pub fn certificate_chain(&self, alias: &str) -> Result<Option<CertificateChain>> {
        Ok(self.matching(alias)?.map(|entry| entry.chain.clone()))
    }

    /// The leaf certificate.
    pub fn certificate(&self, alias: &str) -> Result<Option<Certificate>> {
        Ok(self.matching(alias)?.map(|entry| entry.chain.leaf().clone()))
    }

    pub fn creation_date(&self, alias: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.matching(alias)?.map(|entry| entry.created_at))
    }

    pub fn aliases(&self) -> Result<Vec<String>> {
        Ok(vec![self.entry()?.alias.clone()])
    }

    /// Always 1 once loaded.
    pub fn size(&self) -> Result<usize> {
        self.entry().map(|_| 1)
    }

    pub fn contains_alias(&self, alias: &str) -> Result<bool> {
        Ok(self.matching(alias)?.is_some())
    }

    pub fn is_key_entry(&self, alias: &str) -> Result<bool> {
        self.contains_alias(alias)
    }

    /// The store holds no trusted certificate entries.
    pub fn is_certificate_entry(&self, _alias: &str) -> Result<bool> {
        self.entry().map(|_| false)
    }

    /// The alias whose leaf certificate is `cert`.
    pub fn certificate_alias(&self, cert: &Certificate) -> Result<Option<String>> {
        let entry = self.entry()?;
        Ok((entry.chain.leaf() == cert).then(|| entry.alias.clone()))
    }

    pub fn set_key_entry(
        &self,
        _alias: &str,
        _key: &PrivateKey,
        _chain: &CertificateChain,
    ) -> Result<()> {
        Err(Error::ReadOnly("set_key_entry"))
    }

    pub fn set_certificate_entry(&self, _alias: &str, _cert: &Certificate) -> Result<()> {
        Err(Error::ReadOnly("set_certificate_entry"))
    }

    pub fn delete_entry(&self, _alias: &str) -> Result<()> {
        Err(Error::ReadOnly("delete_entry"))
    }

    fn options(&self) -> DecodeOptions {
        self.config.decode_options()
    }

    // A panicking load is recorded as `Failed` and the guard released before
    // the panic resumes, so the state behind a poisoned lock is still valid.
    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn matching(&self, alias: &str) -> Result<Option<Arc<Entry>>> {
        let entry = self.entry()?;
        Ok((entry.alias == alias).then_some(entry))
    }

    fn entry(&self) -> Result<Arc<Entry>> {
        let mut state = self.lock();
        match &*state {
            State::Loaded(entry) => return Ok(entry.clone()),
            State::Failed(err) => return Err(self.cached_failure(err)),
            State::Unloaded => {}
        }

        match panic::catch_unwind(AssertUnwindSafe(|| self.load_entry())) {
            Ok(Ok(entry)) => {
                let entry = Arc::new(entry);
                *state = State::Loaded(entry.clone());
                Ok(entry)
            }
            Ok(Err(err)) => {
                let err = Arc::new(err);
                *state = State::Failed(err.clone());
                Err(self.cached_failure(&err))
            }
            Err(payload) => {
                warn!(alias = %self.config.alias, "key store load panicked");
                *state = State::Failed(Arc::new(Error::LoadAborted));
                drop(state);
                panic::resume_unwind(payload)
            }
        }
    }

    fn cached_failure(&self, err: &Arc<Error>) -> Error {
        Error::LoadFailed {
            alias: self.config.alias.clone(),
            source: err.clone(),
        }
    }

    #[instrument(skip(self), fields(alias = %self.config.alias))]
    fn load_entry(&self) -> Result<Entry> {
        let max_attempts = match self.protection {
            Protection::Interactive(_) => self.config.attempts(),
            Protection::Password(_) => 1,
        };

        let mut attempt = 1;
        loop {
            match self.try_load(attempt, max_attempts) {
                Ok(entry) => {
                    info!(attempt, certificates = entry.chain.len(), "key store loaded");
                    return Ok(entry);
                }
                Err(err) if err.kind().is_retryable() && attempt < max_attempts => {
                    warn!(attempt, max_attempts, "wrong password, retrying");
                    attempt += 1;
                }
                Err(err) => {
                    warn!(attempt, kind = %err.kind(), "key store failed to load: {}", err);
                    return Err(err);
                }
            }
        }
    }

    fn try_load(&self, attempt: u32, max_attempts: u32) -> Result<Entry> {
        let key_material = Zeroizing::new(read_file(&self.config.key_path)?);
        self.check_permissions()?;
        self.verify_key(&key_material, attempt, max_attempts)?;

        let cert_bytes = read_file(&self.config.cert_path)?;
        let chain = CertificateChain::from_bytes(&cert_bytes)?;
        debug!(leaf = %chain.leaf().subject(), "certificate chain decoded");

        Ok(Entry {
            alias: self.config.alias.clone(),
            key_material,
            chain,
            created_at: Utc::now(),
        })
    }

    /// Decodes the key once to prove the password before the entry is kept.
    /// The decoded key is dropped straight away.
    fn verify_key(&self, key_material: &[u8], attempt: u32, max_attempts: u32) -> Result<()> {
        let options = self.options();
        match &self.protection {
            Protection::Password(password) => {
                // an empty password stands for none
                let password = (!password.is_empty()).then_some(password.as_slice());
                load_private_key(key_material, password, &options)?;
            }
            Protection::Interactive(callback) => {
                // Unsupported schemes and policy violations surface here,
                // before anyone is asked for a password.
                match load_private_key(key_material, None, &options) {
                    Ok(_) => {}
                    Err(err) if err.kind() == pemstore_pkcs::ErrorKind::NoPasswordProvided => {
                        let encryption = inspect(key_material).ok().and_then(|i| i.encryption);
                        let prompt = PasswordPrompt {
                            alias: &self.config.alias,
                            attempt,
                            max_attempts,
                            encryption: encryption.as_deref(),
                        };
                        let password = callback
                            .password(&prompt)
                            .ok_or(pemstore_pkcs::Error::NoPasswordProvided)?;
                        load_private_key(key_material, Some(password.as_slice()), &options)?;
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }
        Ok(())
    }

    fn check_permissions(&self) -> Result<()> {
        let path = &self.config.key_path;
        match permissions::check(path) {
            FilePermissions::Exposed(mode) if self.config.require_private_permissions => {
                Err(Error::InsecurePermissions {
                    path: path.clone(),
                    mode,
                })
            }
            FilePermissions::Exposed(mode) => {
                warn!(path = %path.display(), "key file is accessible by other users (mode {:o})", mode);
                Ok(())
            }
            FilePermissions::Private => Ok(()),
            FilePermissions::Unknown => {
                debug!(path = %path.display(), "permission check skipped");
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("alias", &self.config.alias)
            .field("protection", &self.protection)
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn testdata(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../testdata").join(name)
    }

    fn store(key: &str) -> KeyStore {
        let config = StoreConfig::new("server", testdata(key), testdata("cert.pem"));
        KeyStore::new(config, Protection::none())
    }

    #[test]
    fn test_lazy_load() {
        let store = store("rsa.pem");
        assert!(!store.is_loaded());
        assert!(store.contains_alias("server").unwrap());
        assert!(store.is_loaded());
        assert!(!store.contains_alias("other").unwrap());
    }

    #[test]
    fn test_missing_key_file() {
        let store = store("missing.pem");
        let err = store.load().unwrap_err();
        assert_eq!(ErrorKind::Io, err.kind());
        assert!(matches!(err, Error::LoadFailed { .. }));
        assert!(!store.is_loaded());
    }

    #[test]
    fn test_read_only_without_loading() {
        let store = store("missing.pem");
        assert_eq!(ErrorKind::ReadOnly, store.delete_entry("server").unwrap_err().kind());
        assert!(!store.is_loaded());
    }

    #[test]
    fn test_debug_hides_password() {
        let config = StoreConfig::new("server", testdata("rsa-aes128.pem"), testdata("cert.pem"));
        let store = KeyStore::new(config, Protection::password("changeit"));
        let out = format!("{:?}", store);
        assert!(out.contains("server"));
        assert!(!out.contains("changeit"));
    }
}
