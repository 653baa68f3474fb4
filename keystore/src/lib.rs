//! A read-only key store holding one private key and its certificate chain.
//!
//! The key and chain are read from files on first use. Encrypted keys are
//! unlocked with a fixed password or through a [`PasswordCallback`], which
//! is asked again after a wrong password up to
//! [`StoreConfig::max_attempts`] times.
//!
//! ```no_run
//! use pemstore_keystore::{KeyStore, Protection, StoreConfig};
//!
//! let config = StoreConfig::new("server", "server.key", "server.crt");
//! let store = KeyStore::new(config, Protection::password("changeit"));
//! let key = store.get_key("server", Some(b"changeit")).unwrap();
//! let chain = store.certificate_chain("server").unwrap();
//! ```

pub mod config;
pub mod error;
pub mod permissions;
pub mod protection;
pub mod store;

pub use config::StoreConfig;
pub use error::{Error, ErrorKind, Result};
pub use protection::{PasswordCallback, PasswordPrompt, Protection};
pub use store::KeyStore;
