//! Authenticated symmetric encryption for secret payloads and wrapped keys.
//!
//! ChaCha20-Poly1305 with a fresh random 96-bit nonce per call. The nonce
//! travels with the ciphertext; authentication failure is reported without
//! detail so callers cannot distinguish a wrong key from tampered data.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::key::KEY_SIZE;

/// Size of the ChaCha20-Poly1305 nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of the Poly1305 authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Ciphertext plus the nonce it was produced under. Both are stored or
/// neither is.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptedData {
    pub nonce: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
}

/// Encrypts `plaintext` under `key` with a fresh random nonce.
pub fn encrypt(key: &[u8; KEY_SIZE], plaintext: &[u8]) -> CryptoResult<EncryptedData> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(EncryptedData {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypts and authenticates data previously produced by [`encrypt`].
///
/// The returned buffer zeroizes on drop.
pub fn decrypt(key: &[u8; KEY_SIZE], data: &EncryptedData) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    let plaintext = cipher
        .decrypt(Nonce::from_slice(&data.nonce), data.ciphertext.as_slice())
        .map_err(|_| CryptoError::Decryption)?;

    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn random_key() -> [u8; KEY_SIZE] {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        key
    }

    #[test]
    fn roundtrip() {
        let key = random_key();
        let encrypted = encrypt(&key, b"db-password=hunter2").unwrap();
        let decrypted = decrypt(&key, &encrypted).unwrap();
        assert_eq!(decrypted.as_slice(), b"db-password=hunter2");
    }

    #[test]
    fn roundtrip_empty_plaintext() {
        let key = random_key();
        let encrypted = encrypt(&key, b"").unwrap();
        assert_eq!(decrypt(&key, &encrypted).unwrap().as_slice(), b"");
    }

    #[test]
    fn wrong_key_fails() {
        let encrypted = encrypt(&random_key(), b"payload").unwrap();
        let result = decrypt(&random_key(), &encrypted);
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = random_key();
        let mut encrypted = encrypt(&key, b"payload").unwrap();
        encrypted.ciphertext[0] ^= 0xFF;
        assert!(decrypt(&key, &encrypted).is_err());
    }

    #[test]
    fn tampered_nonce_fails() {
        let key = random_key();
        let mut encrypted = encrypt(&key, b"payload").unwrap();
        encrypted.nonce[0] ^= 0xFF;
        assert!(decrypt(&key, &encrypted).is_err());
    }

    #[test]
    fn nonce_is_fresh_per_call() {
        let key = random_key();
        let e1 = encrypt(&key, b"same plaintext").unwrap();
        let e2 = encrypt(&key, b"same plaintext").unwrap();
        assert_ne!(e1.nonce, e2.nonce);
        assert_ne!(e1.ciphertext, e2.ciphertext);
    }

    proptest! {
        #[test]
        fn prop_roundtrip(plaintext in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let key = random_key();
            let encrypted = encrypt(&key, &plaintext).unwrap();
            let decrypted = decrypt(&key, &encrypted).unwrap();
            prop_assert_eq!(decrypted.as_slice(), plaintext.as_slice());
        }

        #[test]
        fn prop_wrong_key_always_fails(plaintext in proptest::collection::vec(any::<u8>(), 1..1024)) {
            let encrypted = encrypt(&random_key(), &plaintext).unwrap();
            prop_assert!(decrypt(&random_key(), &encrypted).is_err());
        }

        #[test]
        fn prop_tamper_always_fails(
            plaintext in proptest::collection::vec(any::<u8>(), 1..1024),
            tamper_idx in 0usize..2048usize,
        ) {
            let key = random_key();
            let mut encrypted = encrypt(&key, &plaintext).unwrap();
            let idx = tamper_idx % encrypted.ciphertext.len();
            encrypted.ciphertext[idx] ^= 0xFF;
            prop_assert!(decrypt(&key, &encrypted).is_err());
        }
    }
}
