//! Symmetric key material: master key, session secret, derived keys, KDF.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// Size of symmetric keys in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Size of Argon2id salts in bytes.
pub const SALT_SIZE: usize = 16;

/// The deployment-wide symmetric key protecting every secret payload.
///
/// Never persisted in plaintext. Lives in memory only for the duration of
/// one unlock/encrypt/decrypt operation and is zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_SIZE]);

impl MasterKey {
    /// Generates a fresh random master key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Reconstructs a master key from a decrypted buffer of the right length.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() != KEY_SIZE {
            return None;
        }
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(slice);
        Some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// Random per-login secret handed to the client and never stored server-side.
///
/// Used directly as the symmetric key that re-encrypts the master key for
/// the lifetime of one session.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionSecret([u8; KEY_SIZE]);

impl SessionSecret {
    /// Generates a fresh random session secret.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Reconstructs a session secret from a decoded client token.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() != KEY_SIZE {
            return None;
        }
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(slice);
        Some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// Key derived from a passphrase via Argon2id.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_SIZE]);

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// Random KDF salt, stored alongside the ciphertext it salted.
#[derive(Clone, Copy, Debug)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

/// Argon2id cost parameters, embedded in passphrase-protected blobs so a
/// later cost change never orphans existing ciphertexts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        // 64 MiB, 3 passes: slow enough to blunt offline guessing on the
        // passphrases this protects.
        Self {
            memory_kib: 65_536,
            time_cost: 3,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    /// Minimal-cost profile for tests and local tooling. Not for production
    /// data: offers no meaningful brute-force resistance.
    pub fn insecure_fast() -> Self {
        Self {
            memory_kib: 1_024,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

/// Derives a 256-bit key from a passphrase using Argon2id.
///
/// An empty passphrase is rejected outright rather than hashed.
pub fn derive_key(passphrase: &str, salt: &Salt, params: &KdfParams) -> CryptoResult<DerivedKey> {
    if passphrase.is_empty() {
        return Err(CryptoError::KeyDerivation("empty passphrase".to_string()));
    }

    let params = Params::new(
        params.memory_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt.as_bytes(), &mut output)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    Ok(DerivedKey(output))
}
