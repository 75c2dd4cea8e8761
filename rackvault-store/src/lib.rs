//! SQLite persistence for Rackvault records.
//!
//! Three record types back the key hierarchy: `user_keys` (keypair +
//! wrapped master key per user), `session_keys` (one row per user, replaced
//! on each login), and `secrets` (ciphertext + nonce per payload).
//!
//! All key material in this crate is ciphertext. Every operation is a single
//! atomic statement against the shared connection, so a login's session row
//! is durable before the session secret reaches the client.

mod error;
mod secrets;
mod session_keys;
mod user_keys;

pub use error::{StoreError, StoreResult};
pub use secrets::{SecretRecord, SecretStore};
pub use session_keys::{SessionKeyRecord, SessionKeyStore};
pub use user_keys::{UserKeyRecord, UserKeyStore};

use rusqlite::Connection;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Unique identifier for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SecretId(pub Uuid);

impl SecretId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SecretId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SecretId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub(crate) fn parse_uuid(raw: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Storage(format!("corrupt record id: {e}")))
}

/// Handle to the underlying database; hands out per-record-type stores that
/// share one connection.
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        ensure_tables(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn user_keys(&self) -> UserKeyStore {
        UserKeyStore::new(self.conn.clone())
    }

    pub fn session_keys(&self) -> SessionKeyStore {
        SessionKeyStore::new(self.conn.clone())
    }

    pub fn secrets(&self) -> SecretStore {
        SecretStore::new(self.conn.clone())
    }
}

fn ensure_tables(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS user_keys (
            user_id TEXT PRIMARY KEY,
            public_key BLOB NOT NULL,
            private_key_protected BLOB NOT NULL,
            wrapped_master_key BLOB,
            created_at INTEGER NOT NULL,
            modified_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS session_keys (
            user_id TEXT PRIMARY KEY,
            wrapped_master_key BLOB NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS secrets (
            id TEXT PRIMARY KEY,
            device TEXT NOT NULL,
            role TEXT NOT NULL,
            name TEXT NOT NULL,
            payload BLOB,
            created_at INTEGER NOT NULL,
            modified_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_secrets_device ON secrets(device);
        CREATE INDEX IF NOT EXISTS idx_secrets_role ON secrets(role);",
    )?;
    Ok(())
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) type SharedConn = Arc<Mutex<Connection>>;

pub(crate) fn lock_conn(conn: &SharedConn) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| StoreError::Storage(e.to_string()))
}
