//! Master key activation, session unlock, and secret encryption.
//!
//! Ties the key hierarchy together over the persistence layer:
//!
//! - [`Keyring`] enrolls user keypairs and manages the shared master key's
//!   wrapped copies (bootstrap, activate, deactivate).
//! - [`SessionManager`] runs the unlock protocol: a login trades the
//!   passphrase for a random session secret, and each later request trades
//!   the secret for the master key, transiently.
//! - [`SecretManager`] encrypts and decrypts payloads under an unlocked
//!   master key.
//!
//! # Data flow
//!
//! Login decrypts the user's private key with their passphrase, unwraps
//! their copy of the master key, and re-encrypts it under a fresh session
//! secret. The client holds the secret (an opaque cookie value); the server
//! holds only its encryption of the master key. A secret write or read
//! presents the session secret, recovers the master key for the duration of
//! the call, and zeroizes it on drop.
//!
//! HTTP handling, authorization, and rendering sit above this crate; it
//! answers only "can this session unlock the master key" and "what does
//! this ciphertext decrypt to".

mod error;
mod keyring;
mod secrets;
mod session;
mod token;

pub use error::{CoreError, CoreResult};
pub use keyring::Keyring;
pub use secrets::{SecretDraft, SecretManager};
pub use session::SessionManager;
pub use token::{decode_token, encode_token};

use rackvault_crypto::KdfParams;
use rackvault_store::Store;

/// One deployment's managers, sharing a store.
pub struct Rackvault {
    keyring: Keyring,
    sessions: SessionManager,
    secrets: SecretManager,
}

impl Rackvault {
    pub fn new(store: &Store) -> Self {
        Self::with_kdf_params(store, KdfParams::default())
    }

    pub fn with_kdf_params(store: &Store, kdf: KdfParams) -> Self {
        Self {
            keyring: Keyring::with_kdf_params(store.user_keys(), kdf),
            sessions: SessionManager::new(store.user_keys(), store.session_keys()),
            secrets: SecretManager::new(store.secrets()),
        }
    }

    pub fn keyring(&self) -> &Keyring {
        &self.keyring
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn secrets(&self) -> &SecretManager {
        &self.secrets
    }
}
