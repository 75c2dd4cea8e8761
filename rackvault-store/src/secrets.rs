//! Secret records: per-payload ciphertext attached to infrastructure objects.

use rackvault_crypto::EncryptedData;
use rusqlite::{params, OptionalExtension, Row};

use crate::error::{StoreError, StoreResult};
use crate::{lock_conn, now_millis, parse_uuid, SecretId, SharedConn};

/// One protected payload and its association metadata.
///
/// `payload` carries ciphertext and nonce together; a record never holds one
/// without the other, and never holds plaintext.
#[derive(Clone, Debug)]
pub struct SecretRecord {
    pub id: SecretId,
    pub device: String,
    pub role: String,
    pub name: String,
    pub payload: Option<EncryptedData>,
    pub created_at: i64,
    pub modified_at: i64,
}

type RawRow = (String, String, String, String, Option<Vec<u8>>, i64, i64);

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn into_record(raw: RawRow) -> StoreResult<SecretRecord> {
    let (raw_id, device, role, name, payload_json, created_at, modified_at) = raw;
    let payload: Option<EncryptedData> = match payload_json {
        Some(bytes) => Some(serde_json::from_slice(&bytes)?),
        None => None,
    };
    Ok(SecretRecord {
        id: SecretId(parse_uuid(&raw_id)?),
        device,
        role,
        name,
        payload,
        created_at,
        modified_at,
    })
}

/// CRUD for `secrets` rows.
#[derive(Clone)]
pub struct SecretStore {
    conn: SharedConn,
}

impl SecretStore {
    pub(crate) fn new(conn: SharedConn) -> Self {
        Self { conn }
    }

    /// Upserts a secret, preserving `created_at` on overwrite.
    pub fn upsert(&self, record: &SecretRecord) -> StoreResult<()> {
        let payload_json = match &record.payload {
            Some(payload) => Some(serde_json::to_vec(payload)?),
            None => None,
        };
        let now = now_millis();

        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "INSERT OR REPLACE INTO secrets (id, device, role, name, payload, created_at, modified_at)
             VALUES (?, ?, ?, ?, ?,
                     COALESCE((SELECT created_at FROM secrets WHERE id = ?), ?), ?)",
            params![
                record.id.to_string(),
                record.device,
                record.role,
                record.name,
                payload_json,
                record.id.to_string(),
                now,
                now
            ],
        )?;
        Ok(())
    }

    /// Fetches one secret.
    pub fn get(&self, id: SecretId) -> StoreResult<SecretRecord> {
        let conn = lock_conn(&self.conn)?;
        let raw = conn
            .query_row(
                "SELECT id, device, role, name, payload, created_at, modified_at
                 FROM secrets WHERE id = ?",
                params![id.to_string()],
                read_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("secret {id}")))?;
        into_record(raw)
    }

    /// Lists secrets attached to a device, ordered by name.
    pub fn list_for_device(&self, device: &str) -> StoreResult<Vec<SecretRecord>> {
        self.list_where("device = ?", device)
    }

    /// Lists secrets with a given role, ordered by name.
    pub fn list_for_role(&self, role: &str) -> StoreResult<Vec<SecretRecord>> {
        self.list_where("role = ?", role)
    }

    fn list_where(&self, predicate: &str, value: &str) -> StoreResult<Vec<SecretRecord>> {
        let conn = lock_conn(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, device, role, name, payload, created_at, modified_at
             FROM secrets WHERE {predicate} ORDER BY name"
        ))?;
        let rows = stmt.query_map(params![value], read_row)?;

        let mut records = Vec::new();
        for raw in rows {
            records.push(into_record(raw?)?);
        }
        Ok(records)
    }

    /// Deletes a secret.
    pub fn delete(&self, id: SecretId) -> StoreResult<()> {
        let conn = lock_conn(&self.conn)?;
        let affected = conn.execute("DELETE FROM secrets WHERE id = ?", params![id.to_string()])?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("secret {id}")));
        }
        Ok(())
    }
}
