//! User key records: keypair material plus the per-user wrapped master key.

use rackvault_crypto::{PassphraseProtectedKey, WrappedMasterKey};
use rusqlite::{params, OptionalExtension};

use crate::error::{StoreError, StoreResult};
use crate::{lock_conn, now_millis, parse_uuid, SharedConn, UserId};

/// One user's key record.
///
/// `wrapped_master_key` is populated only once an administrator has
/// activated the key; its presence is the definition of "active".
#[derive(Clone, Debug)]
pub struct UserKeyRecord {
    pub user_id: UserId,
    pub public_key: [u8; 32],
    pub private_key_protected: PassphraseProtectedKey,
    pub wrapped_master_key: Option<WrappedMasterKey>,
    pub created_at: i64,
    pub modified_at: i64,
}

impl UserKeyRecord {
    /// Whether this key can currently recover the master key.
    pub fn is_active(&self) -> bool {
        self.wrapped_master_key.is_some()
    }
}

/// CRUD for `user_keys` rows.
#[derive(Clone)]
pub struct UserKeyStore {
    conn: SharedConn,
}

impl UserKeyStore {
    pub(crate) fn new(conn: SharedConn) -> Self {
        Self { conn }
    }

    /// Inserts a new user key. Fails if the user already has one.
    pub fn insert(
        &self,
        user_id: UserId,
        public_key: [u8; 32],
        private_key_protected: &PassphraseProtectedKey,
    ) -> StoreResult<()> {
        let protected_json = serde_json::to_vec(private_key_protected)?;
        let now = now_millis();

        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "INSERT INTO user_keys
                (user_id, public_key, private_key_protected, wrapped_master_key, created_at, modified_at)
             VALUES (?, ?, ?, NULL, ?, ?)",
            params![user_id.to_string(), public_key.to_vec(), protected_json, now, now],
        )?;
        Ok(())
    }

    /// Fetches a user's key record.
    pub fn get(&self, user_id: UserId) -> StoreResult<UserKeyRecord> {
        let conn = lock_conn(&self.conn)?;
        let row = conn
            .query_row(
                "SELECT user_id, public_key, private_key_protected, wrapped_master_key,
                        created_at, modified_at
                 FROM user_keys WHERE user_id = ?",
                params![user_id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                        row.get::<_, Option<Vec<u8>>>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("user key for {user_id}")))?;

        let (raw_id, pk_bytes, protected_json, wrapped_json, created_at, modified_at) = row;

        let public_key: [u8; 32] = pk_bytes
            .try_into()
            .map_err(|_| StoreError::Storage("corrupt public key length".to_string()))?;
        let private_key_protected: PassphraseProtectedKey =
            serde_json::from_slice(&protected_json)?;
        let wrapped_master_key: Option<WrappedMasterKey> = match wrapped_json {
            Some(bytes) => Some(serde_json::from_slice(&bytes)?),
            None => None,
        };

        Ok(UserKeyRecord {
            user_id: UserId(parse_uuid(&raw_id)?),
            public_key,
            private_key_protected,
            wrapped_master_key,
            created_at,
            modified_at,
        })
    }

    /// Stores a wrapped master key, activating the user.
    pub fn set_wrapped_master_key(
        &self,
        user_id: UserId,
        wrapped: &WrappedMasterKey,
    ) -> StoreResult<()> {
        let wrapped_json = serde_json::to_vec(wrapped)?;
        let conn = lock_conn(&self.conn)?;
        let affected = conn.execute(
            "UPDATE user_keys SET wrapped_master_key = ?, modified_at = ? WHERE user_id = ?",
            params![wrapped_json, now_millis(), user_id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("user key for {user_id}")));
        }
        Ok(())
    }

    /// Clears the wrapped master key, deactivating the user.
    pub fn clear_wrapped_master_key(&self, user_id: UserId) -> StoreResult<()> {
        let conn = lock_conn(&self.conn)?;
        let affected = conn.execute(
            "UPDATE user_keys SET wrapped_master_key = NULL, modified_at = ? WHERE user_id = ?",
            params![now_millis(), user_id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("user key for {user_id}")));
        }
        Ok(())
    }

    /// Replaces the passphrase-protected private key (passphrase change).
    pub fn set_private_key_protected(
        &self,
        user_id: UserId,
        protected: &PassphraseProtectedKey,
    ) -> StoreResult<()> {
        let protected_json = serde_json::to_vec(protected)?;
        let conn = lock_conn(&self.conn)?;
        let affected = conn.execute(
            "UPDATE user_keys SET private_key_protected = ?, modified_at = ? WHERE user_id = ?",
            params![protected_json, now_millis(), user_id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("user key for {user_id}")));
        }
        Ok(())
    }

    /// Whether any user key currently holds a wrapped master key.
    pub fn any_active(&self) -> StoreResult<bool> {
        let conn = lock_conn(&self.conn)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM user_keys WHERE wrapped_master_key IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Deletes a user's key record.
    pub fn delete(&self, user_id: UserId) -> StoreResult<()> {
        let conn = lock_conn(&self.conn)?;
        let affected = conn.execute(
            "DELETE FROM user_keys WHERE user_id = ?",
            params![user_id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("user key for {user_id}")));
        }
        Ok(())
    }
}
