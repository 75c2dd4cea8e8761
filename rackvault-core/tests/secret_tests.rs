use pretty_assertions::assert_eq;
use rackvault_core::{CoreError, Rackvault, SecretDraft};
use rackvault_crypto::{KdfParams, MasterKey};
use rackvault_store::{SecretId, SecretRecord, Store, UserId};

fn setup() -> (Store, Rackvault, UserId) {
    let store = Store::open_in_memory().unwrap();
    let vault = Rackvault::with_kdf_params(&store, KdfParams::insecure_fast());
    let user = UserId::new();
    vault.keyring().enroll(user, "correct-horse").unwrap();
    vault.keyring().bootstrap(user).unwrap();
    (store, vault, user)
}

fn draft(name: &str) -> SecretDraft {
    SecretDraft {
        device: "edge-router-1".to_string(),
        role: "login".to_string(),
        name: name.to_string(),
    }
}

#[test]
fn write_read_logout_scenario() {
    let (store, vault, user) = setup();

    // Login and write a secret
    let session = vault.sessions().login(user, "correct-horse").unwrap();
    let master = vault.sessions().unlock(user, &session).unwrap();
    let id = vault
        .secrets()
        .create(draft("db-password"), b"hunter2", &master)
        .unwrap();
    drop(master);

    // The stored record holds ciphertext + nonce, never the plaintext
    let record = store.secrets().get(id).unwrap();
    let payload = record.payload.as_ref().unwrap();
    assert_ne!(payload.ciphertext.as_slice(), b"hunter2");
    assert!(!payload
        .ciphertext
        .windows(b"hunter2".len())
        .any(|w| w == b"hunter2"));

    // Read it back through the same session
    let master = vault.sessions().unlock(user, &session).unwrap();
    let plaintext = vault.secrets().read(id, &master).unwrap();
    assert_eq!(plaintext.as_slice(), b"hunter2");
    drop(master);

    // After logout the session secret is useless
    vault.sessions().logout(user).unwrap();
    let result = vault.sessions().unlock(user, &session);
    assert!(matches!(result, Err(CoreError::NoSessionKey)));
}

#[test]
fn read_with_wrong_master_key_fails_opaquely() {
    let (_store, vault, user) = setup();
    let session = vault.sessions().login(user, "correct-horse").unwrap();
    let master = vault.sessions().unlock(user, &session).unwrap();
    let id = vault
        .secrets()
        .create(draft("db-password"), b"hunter2", &master)
        .unwrap();

    let result = vault.secrets().read(id, &MasterKey::generate());
    assert!(matches!(result, Err(CoreError::Decryption)));
}

#[test]
fn same_plaintext_encrypts_to_different_ciphertexts() {
    let (store, vault, user) = setup();
    let session = vault.sessions().login(user, "correct-horse").unwrap();
    let master = vault.sessions().unlock(user, &session).unwrap();

    let id1 = vault
        .secrets()
        .create(draft("first"), b"same-value", &master)
        .unwrap();
    let id2 = vault
        .secrets()
        .create(draft("second"), b"same-value", &master)
        .unwrap();

    let p1 = store.secrets().get(id1).unwrap().payload.unwrap();
    let p2 = store.secrets().get(id2).unwrap().payload.unwrap();
    assert_ne!(p1.nonce, p2.nonce);
    assert_ne!(p1.ciphertext, p2.ciphertext);
}

#[test]
fn update_rewrites_payload_under_fresh_nonce() {
    let (store, vault, user) = setup();
    let session = vault.sessions().login(user, "correct-horse").unwrap();
    let master = vault.sessions().unlock(user, &session).unwrap();

    let id = vault
        .secrets()
        .create(draft("rotating"), b"v1", &master)
        .unwrap();
    let before = store.secrets().get(id).unwrap().payload.unwrap();

    vault.secrets().update(id, b"v2", &master).unwrap();
    let after = store.secrets().get(id).unwrap().payload.unwrap();

    assert_ne!(before.nonce, after.nonce);
    assert_eq!(
        vault.secrets().read(id, &master).unwrap().as_slice(),
        b"v2"
    );
}

#[test]
fn bulk_import_under_one_unlock() {
    let (_store, vault, user) = setup();
    let session = vault.sessions().login(user, "correct-horse").unwrap();
    let master = vault.sessions().unlock(user, &session).unwrap();

    let items = vec![
        (draft("console"), b"pw-one".to_vec()),
        (draft("enable"), b"pw-two".to_vec()),
        (draft("snmp"), b"pw-three".to_vec()),
    ];
    let ids = vault.secrets().create_many(items, &master).unwrap();
    assert_eq!(ids.len(), 3);

    let values: Vec<Vec<u8>> = ids
        .iter()
        .map(|id| vault.secrets().read(*id, &master).unwrap().to_vec())
        .collect();
    assert_eq!(values, vec![b"pw-one".to_vec(), b"pw-two".to_vec(), b"pw-three".to_vec()]);
}

#[test]
fn metadata_only_record_cannot_be_read() {
    let (store, vault, user) = setup();
    let session = vault.sessions().login(user, "correct-horse").unwrap();
    let master = vault.sessions().unlock(user, &session).unwrap();

    // A record created outside the manager with no payload
    let id = SecretId::new();
    store
        .secrets()
        .upsert(&SecretRecord {
            id,
            device: "edge-router-1".to_string(),
            role: "login".to_string(),
            name: "placeholder".to_string(),
            payload: None,
            created_at: 0,
            modified_at: 0,
        })
        .unwrap();

    let result = vault.secrets().read(id, &master);
    assert!(matches!(result, Err(CoreError::Decryption)));
}

#[test]
fn secrets_stay_readable_after_passphrase_change() {
    let (_store, vault, user) = setup();
    let session = vault.sessions().login(user, "correct-horse").unwrap();
    let master = vault.sessions().unlock(user, &session).unwrap();
    let id = vault
        .secrets()
        .create(draft("db-password"), b"hunter2", &master)
        .unwrap();
    drop(master);
    vault.sessions().logout(user).unwrap();

    vault
        .keyring()
        .change_passphrase(user, "correct-horse", "new-horse")
        .unwrap();

    let session = vault.sessions().login(user, "new-horse").unwrap();
    let master = vault.sessions().unlock(user, &session).unwrap();
    assert_eq!(
        vault.secrets().read(id, &master).unwrap().as_slice(),
        b"hunter2"
    );
}
