//! Key hierarchy primitives for Rackvault.
//!
//! Provides the three-tier key model protecting every secret payload:
//! - Argon2id for key derivation from user passphrases
//! - X25519 sealed envelopes for wrapping the master key per user
//! - ChaCha20-Poly1305 for authenticated payload encryption
//!
//! # Architecture
//!
//! 1. **User keypair**: each user holds an X25519 keypair. The private key
//!    is stored only encrypted under a key derived from the user's
//!    passphrase.
//!
//! 2. **Master key**: one random 256-bit symmetric key per deployment. It is
//!    never persisted in plaintext — only sealed to each activated user's
//!    public key, or re-encrypted under a short-lived session secret.
//!
//! 3. **Secret payloads**: encrypted with the master key and a fresh random
//!    nonce per write.
//!
//! This crate holds no state and performs no I/O; callers persist the
//! wrapped artifacts and zeroization happens on drop.

mod cipher;
mod error;
mod key;
mod keypair;

pub use cipher::{decrypt, encrypt, EncryptedData, NONCE_SIZE, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use key::{
    derive_key, DerivedKey, KdfParams, MasterKey, Salt, SessionSecret, KEY_SIZE, SALT_SIZE,
};
pub use keypair::{
    open_master_key, protect_private_key, recover_private_key, seal_master_key,
    PassphraseProtectedKey, UserKeyPair, WrappedMasterKey,
};

// Downstream crates address keys through these types.
pub use crypto_box::{PublicKey, SecretKey};
pub use zeroize::Zeroizing;
