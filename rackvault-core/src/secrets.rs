//! Secret payload encryption over the store.
//!
//! Every write encrypts under the caller-supplied master key with a fresh
//! nonce; no path exists that persists a plaintext payload. Failures are
//! reported as one generic condition regardless of which step failed.

use rackvault_crypto::{decrypt, encrypt, MasterKey, Zeroizing};
use rackvault_store::{SecretId, SecretRecord, SecretStore};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Association metadata for a secret; the payload travels separately and is
/// never part of the stored form.
#[derive(Clone, Debug)]
pub struct SecretDraft {
    pub device: String,
    pub role: String,
    pub name: String,
}

/// Encrypts, stores, and recovers secret payloads.
pub struct SecretManager {
    secrets: SecretStore,
}

impl SecretManager {
    pub fn new(secrets: SecretStore) -> Self {
        Self { secrets }
    }

    /// Encrypts a new secret and persists it.
    pub fn create(
        &self,
        draft: SecretDraft,
        plaintext: &[u8],
        master_key: &MasterKey,
    ) -> CoreResult<SecretId> {
        let id = SecretId::new();
        let payload = encrypt(master_key.as_bytes(), plaintext).map_err(|e| {
            debug!("secret encrypt failed: {e}");
            CoreError::Decryption
        })?;

        self.secrets.upsert(&SecretRecord {
            id,
            device: draft.device,
            role: draft.role,
            name: draft.name,
            payload: Some(payload),
            created_at: 0,
            modified_at: 0,
        })?;
        Ok(id)
    }

    /// Re-encrypts an existing secret's payload under a fresh nonce.
    pub fn update(
        &self,
        id: SecretId,
        plaintext: &[u8],
        master_key: &MasterKey,
    ) -> CoreResult<()> {
        let mut record = self.secrets.get(id)?;
        let payload = encrypt(master_key.as_bytes(), plaintext).map_err(|e| {
            debug!("secret re-encrypt failed: {e}");
            CoreError::Decryption
        })?;
        record.payload = Some(payload);
        self.secrets.upsert(&record)?;
        Ok(())
    }

    /// Decrypts a secret's payload. The buffer zeroizes on drop.
    pub fn read(&self, id: SecretId, master_key: &MasterKey) -> CoreResult<Zeroizing<Vec<u8>>> {
        let record = self.secrets.get(id)?;
        let payload = record.payload.as_ref().ok_or(CoreError::Decryption)?;

        decrypt(master_key.as_bytes(), payload).map_err(|e| {
            debug!("secret decrypt failed for {id}: {e}");
            CoreError::Decryption
        })
    }

    /// Bulk import: encrypts each payload under the master key resolved
    /// once for the whole batch.
    pub fn create_many(
        &self,
        items: Vec<(SecretDraft, Vec<u8>)>,
        master_key: &MasterKey,
    ) -> CoreResult<Vec<SecretId>> {
        let mut ids = Vec::with_capacity(items.len());
        for (draft, plaintext) in items {
            let plaintext = Zeroizing::new(plaintext);
            ids.push(self.create(draft, &plaintext, master_key)?);
        }
        Ok(ids)
    }
}
