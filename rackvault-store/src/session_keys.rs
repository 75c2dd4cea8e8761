//! Session key rows: the master key re-encrypted under a client-held secret.
//!
//! One row per user, keyed by user id. A new login replaces the row, which
//! is what invalidates the previous session's secret.

use rackvault_crypto::EncryptedData;
use rusqlite::{params, OptionalExtension};

use crate::error::{StoreError, StoreResult};
use crate::{lock_conn, now_millis, parse_uuid, SharedConn, UserId};

/// The current session row for one user.
///
/// `wrapped_master_key` decrypts only with the session secret held by the
/// client; the secret itself is never stored.
#[derive(Clone, Debug)]
pub struct SessionKeyRecord {
    pub user_id: UserId,
    pub wrapped_master_key: EncryptedData,
    pub created_at: i64,
}

/// CRUD for `session_keys` rows.
#[derive(Clone)]
pub struct SessionKeyStore {
    conn: SharedConn,
}

impl SessionKeyStore {
    pub(crate) fn new(conn: SharedConn) -> Self {
        Self { conn }
    }

    /// Upserts the session row for a user, superseding any prior session.
    pub fn put(&self, user_id: UserId, wrapped_master_key: &EncryptedData) -> StoreResult<()> {
        let wrapped_json = serde_json::to_vec(wrapped_master_key)?;
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "INSERT OR REPLACE INTO session_keys (user_id, wrapped_master_key, created_at)
             VALUES (?, ?, ?)",
            params![user_id.to_string(), wrapped_json, now_millis()],
        )?;
        Ok(())
    }

    /// Fetches the current session row for a user.
    pub fn get(&self, user_id: UserId) -> StoreResult<SessionKeyRecord> {
        let conn = lock_conn(&self.conn)?;
        let row = conn
            .query_row(
                "SELECT user_id, wrapped_master_key, created_at
                 FROM session_keys WHERE user_id = ?",
                params![user_id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("session key for {user_id}")))?;

        let (raw_id, wrapped_json, created_at) = row;
        Ok(SessionKeyRecord {
            user_id: UserId(parse_uuid(&raw_id)?),
            wrapped_master_key: serde_json::from_slice(&wrapped_json)?,
            created_at,
        })
    }

    /// Deletes the session row for a user. Idempotent.
    pub fn delete(&self, user_id: UserId) -> StoreResult<()> {
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "DELETE FROM session_keys WHERE user_id = ?",
            params![user_id.to_string()],
        )?;
        Ok(())
    }
}
