use rackvault_crypto::{
    open_master_key, protect_private_key, recover_private_key, seal_master_key, KdfParams,
    MasterKey, UserKeyPair,
};

#[test]
fn keypair_generation_produces_valid_keys() {
    let kp = UserKeyPair::generate();
    assert_eq!(kp.public_bytes().len(), 32);
    // Public and secret keys must differ
    assert_ne!(kp.public_bytes(), kp.secret.to_bytes());
}

#[test]
fn keypair_roundtrip_from_secret_bytes() {
    let kp1 = UserKeyPair::generate();
    let kp2 = UserKeyPair::from_secret_bytes(kp1.secret.to_bytes());
    assert_eq!(kp1.public_bytes(), kp2.public_bytes());
}

#[test]
fn seal_open_roundtrip() {
    let recipient = UserKeyPair::generate();
    let master = MasterKey::generate();

    let wrapped = seal_master_key(&master, &recipient.public).unwrap();
    let recovered = open_master_key(&wrapped, &recipient.secret).unwrap();

    assert_eq!(recovered.as_bytes(), master.as_bytes());
}

#[test]
fn wrong_recipient_key_fails_to_open() {
    let intended = UserKeyPair::generate();
    let other = UserKeyPair::generate();
    let master = MasterKey::generate();

    let wrapped = seal_master_key(&master, &intended.public).unwrap();
    assert!(open_master_key(&wrapped, &other.secret).is_err());
}

#[test]
fn tampered_wrap_ciphertext_fails() {
    let recipient = UserKeyPair::generate();
    let master = MasterKey::generate();

    let mut wrapped = seal_master_key(&master, &recipient.public).unwrap();
    if let Some(byte) = wrapped.ciphertext.first_mut() {
        *byte ^= 0xFF;
    }

    assert!(open_master_key(&wrapped, &recipient.secret).is_err());
}

#[test]
fn tampered_wrap_nonce_fails() {
    let recipient = UserKeyPair::generate();
    let master = MasterKey::generate();

    let mut wrapped = seal_master_key(&master, &recipient.public).unwrap();
    wrapped.nonce[0] ^= 0xFF;

    assert!(open_master_key(&wrapped, &recipient.secret).is_err());
}

#[test]
fn each_seal_produces_different_envelope() {
    let recipient = UserKeyPair::generate();
    let master = MasterKey::generate();

    let w1 = seal_master_key(&master, &recipient.public).unwrap();
    let w2 = seal_master_key(&master, &recipient.public).unwrap();

    // Different ephemeral keys and nonces
    assert_ne!(w1.ephemeral_public_key, w2.ephemeral_public_key);
    assert_ne!(w1.nonce, w2.nonce);
    assert_ne!(w1.ciphertext, w2.ciphertext);

    // Both open to the same master key
    assert_eq!(
        open_master_key(&w1, &recipient.secret).unwrap().as_bytes(),
        master.as_bytes()
    );
    assert_eq!(
        open_master_key(&w2, &recipient.secret).unwrap().as_bytes(),
        master.as_bytes()
    );
}

#[test]
fn passphrase_protect_recover_roundtrip() {
    let kp = UserKeyPair::generate();
    let passphrase = "correct-horse-battery-staple";

    let protected = protect_private_key(&kp.secret, passphrase, &KdfParams::insecure_fast()).unwrap();
    let recovered = recover_private_key(&protected, passphrase).unwrap();

    assert_eq!(recovered.to_bytes(), kp.secret.to_bytes());
}

#[test]
fn wrong_passphrase_fails() {
    let kp = UserKeyPair::generate();
    let protected =
        protect_private_key(&kp.secret, "correct-passphrase", &KdfParams::insecure_fast()).unwrap();

    assert!(recover_private_key(&protected, "wrong-passphrase").is_err());
}

#[test]
fn empty_passphrase_rejected_at_protect() {
    let kp = UserKeyPair::generate();
    assert!(protect_private_key(&kp.secret, "", &KdfParams::insecure_fast()).is_err());
}

#[test]
fn protect_embeds_fresh_salt_per_call() {
    let kp = UserKeyPair::generate();
    let p1 = protect_private_key(&kp.secret, "pw", &KdfParams::insecure_fast()).unwrap();
    let p2 = protect_private_key(&kp.secret, "pw", &KdfParams::insecure_fast()).unwrap();
    assert_ne!(p1.salt, p2.salt);
    assert_ne!(p1.encrypted.ciphertext, p2.encrypted.ciphertext);
}

#[test]
fn recover_honors_embedded_kdf_params() {
    let kp = UserKeyPair::generate();
    let protected =
        protect_private_key(&kp.secret, "passphrase", &KdfParams::insecure_fast()).unwrap();

    // Recovery reads cost parameters from the blob, not from a default
    assert_eq!(protected.params, KdfParams::insecure_fast());
    let recovered = recover_private_key(&protected, "passphrase").unwrap();
    assert_eq!(recovered.to_bytes(), kp.secret.to_bytes());
}

#[test]
fn wrapped_master_key_serialization_roundtrip() {
    let recipient = UserKeyPair::generate();
    let master = MasterKey::generate();

    let wrapped = seal_master_key(&master, &recipient.public).unwrap();

    let json = serde_json::to_string(&wrapped).unwrap();
    let deserialized: rackvault_crypto::WrappedMasterKey = serde_json::from_str(&json).unwrap();

    let recovered = open_master_key(&deserialized, &recipient.secret).unwrap();
    assert_eq!(recovered.as_bytes(), master.as_bytes());
}

#[test]
fn passphrase_protected_key_serialization_roundtrip() {
    let kp = UserKeyPair::generate();
    let protected = protect_private_key(&kp.secret, "pw", &KdfParams::insecure_fast()).unwrap();

    let json = serde_json::to_string(&protected).unwrap();
    let deserialized: rackvault_crypto::PassphraseProtectedKey =
        serde_json::from_str(&json).unwrap();

    let recovered = recover_private_key(&deserialized, "pw").unwrap();
    assert_eq!(recovered.to_bytes(), kp.secret.to_bytes());
}

// Property-based tests
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn seal_open_always_roundtrips(key_bytes in proptest::array::uniform32(any::<u8>())) {
            let recipient = UserKeyPair::generate();
            let master = MasterKey::from_bytes(key_bytes);
            let wrapped = seal_master_key(&master, &recipient.public).unwrap();
            let recovered = open_master_key(&wrapped, &recipient.secret).unwrap();
            prop_assert_eq!(recovered.as_bytes(), master.as_bytes());
        }
    }
}
