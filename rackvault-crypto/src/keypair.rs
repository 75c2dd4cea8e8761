//! Per-user asymmetric keypairs and master key wrapping.
//!
//! Uses X25519 key exchange + XSalsa20-Poly1305 to seal the master key to a
//! user's public key. Each wrap uses a fresh ephemeral keypair, so the
//! resulting envelope authenticates: opening it with the wrong private key
//! fails rather than yielding garbage.
//!
//! Private keys are stored only passphrase-protected (Argon2id ->
//! ChaCha20-Poly1305) with the salt and KDF cost embedded in the blob.

use crypto_box::aead::Aead;
use crypto_box::{PublicKey, SalsaBox, SecretKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::cipher::{decrypt, encrypt, EncryptedData};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{derive_key, KdfParams, MasterKey, Salt, KEY_SIZE, SALT_SIZE};

/// X25519 keypair owned by one user.
///
/// The secret key zeroizes on drop (from crypto_box).
pub struct UserKeyPair {
    pub secret: SecretKey,
    pub public: PublicKey,
}

impl UserKeyPair {
    /// Generates a fresh keypair.
    pub fn generate() -> Self {
        let secret = SecretKey::generate(&mut OsRng);
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Returns the public key as a raw 32-byte array.
    pub fn public_bytes(&self) -> [u8; 32] {
        *self.public.as_bytes()
    }

    /// Reconstructs a keypair from raw secret key bytes.
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        let secret = SecretKey::from(bytes);
        let public = secret.public_key();
        Self { secret, public }
    }
}

/// The master key sealed to one user's public key.
///
/// The ephemeral public key is included so the holder of the matching
/// private key can reconstruct the shared secret.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WrappedMasterKey {
    /// Ephemeral X25519 public key (sender side of DH).
    pub ephemeral_public_key: [u8; 32],
    /// XSalsa20 nonce (24 bytes).
    pub nonce: [u8; 24],
    /// Encrypted master key (ciphertext + Poly1305 tag).
    pub ciphertext: Vec<u8>,
}

/// Private key encrypted under a passphrase-derived key.
///
/// Salt and KDF parameters ride along so the passphrase is the only input
/// needed for recovery.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PassphraseProtectedKey {
    pub salt: [u8; SALT_SIZE],
    pub params: KdfParams,
    pub encrypted: EncryptedData,
}

/// Seals the master key to a recipient's public key.
///
/// A fresh ephemeral X25519 keypair is generated per call, so wrapping the
/// same master key for the same user twice yields unrelated envelopes.
pub fn seal_master_key(
    master_key: &MasterKey,
    recipient_pk: &PublicKey,
) -> CryptoResult<WrappedMasterKey> {
    let ephemeral = SecretKey::generate(&mut OsRng);
    let ephemeral_pk = ephemeral.public_key();

    let salsa_box = SalsaBox::new(recipient_pk, &ephemeral);

    let mut nonce_bytes = [0u8; 24];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = salsa_box
        .encrypt(
            crypto_box::Nonce::from_slice(&nonce_bytes),
            master_key.as_bytes().as_slice(),
        )
        .map_err(|e| CryptoError::Encryption(format!("master key wrap failed: {e}")))?;

    Ok(WrappedMasterKey {
        ephemeral_public_key: *ephemeral_pk.as_bytes(),
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Opens a wrapped master key with the recipient's private key.
pub fn open_master_key(
    wrapped: &WrappedMasterKey,
    recipient_sk: &SecretKey,
) -> CryptoResult<MasterKey> {
    let ephemeral_pk = PublicKey::from(wrapped.ephemeral_public_key);
    let salsa_box = SalsaBox::new(&ephemeral_pk, recipient_sk);

    let plaintext = Zeroizing::new(
        salsa_box
            .decrypt(
                crypto_box::Nonce::from_slice(&wrapped.nonce),
                wrapped.ciphertext.as_slice(),
            )
            .map_err(|_| CryptoError::Decryption)?,
    );

    MasterKey::from_slice(&plaintext).ok_or(CryptoError::InvalidKeyLength {
        expected: KEY_SIZE,
        actual: plaintext.len(),
    })
}

/// Encrypts a private key under a passphrase (Argon2id -> ChaCha20-Poly1305).
pub fn protect_private_key(
    sk: &SecretKey,
    passphrase: &str,
    params: &KdfParams,
) -> CryptoResult<PassphraseProtectedKey> {
    let salt = Salt::random();
    let derived = derive_key(passphrase, &salt, params)?;

    let sk_bytes = Zeroizing::new(sk.to_bytes());
    let encrypted = encrypt(derived.as_bytes(), sk_bytes.as_slice())?;

    Ok(PassphraseProtectedKey {
        salt: *salt.as_bytes(),
        params: *params,
        encrypted,
    })
}

/// Decrypts a passphrase-protected private key.
///
/// A wrong passphrase fails authentication; it never produces a usable-looking
/// but wrong key.
pub fn recover_private_key(
    protected: &PassphraseProtectedKey,
    passphrase: &str,
) -> CryptoResult<SecretKey> {
    let salt = Salt::from_bytes(protected.salt);
    let derived = derive_key(passphrase, &salt, &protected.params)?;
    let plaintext = decrypt(derived.as_bytes(), &protected.encrypted)?;

    if plaintext.len() != 32 {
        return Err(CryptoError::InvalidKeyLength {
            expected: 32,
            actual: plaintext.len(),
        });
    }

    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&plaintext);
    Ok(SecretKey::from(bytes))
}
