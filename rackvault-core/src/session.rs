//! The session unlock protocol.
//!
//! A login proves possession of the passphrase once, then re-encrypts the
//! master key under a fresh random session secret. The secret goes to the
//! client; only its encryption of the master key is persisted. Each later
//! request presents the secret to recover the master key transiently, so
//! the server never stores anything that alone recovers it — compromise of
//! the database without a client-held secret exposes nothing.
//!
//! Per user the state machine is Locked -> Unlocked: a valid session row
//! exists or it does not. A second login replaces the row, invalidating the
//! first session's secret on its next use.

use rackvault_crypto::{
    decrypt, encrypt, open_master_key, recover_private_key, MasterKey, SessionSecret,
};
use rackvault_store::{SessionKeyStore, StoreError, UserId, UserKeyStore};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::keyring::map_credentials;

/// Manages per-user login sessions against the master key.
pub struct SessionManager {
    users: UserKeyStore,
    sessions: SessionKeyStore,
}

impl SessionManager {
    pub fn new(users: UserKeyStore, sessions: SessionKeyStore) -> Self {
        Self { users, sessions }
    }

    /// Exchanges a passphrase for a session secret.
    ///
    /// 1. Recovers the user's private key from its passphrase-protected
    ///    form (`InvalidCredentials` on mismatch).
    /// 2. Opens the user's wrapped master key (`UserKeyInactive` if no
    ///    administrator has activated the key).
    /// 3. Generates a fresh session secret and persists the master key
    ///    re-encrypted under it, replacing any prior session for the user.
    ///
    /// The session row is durable before the secret is returned, so an
    /// immediate follow-up `unlock` always finds it. Private key and master
    /// key zeroize on drop before this returns.
    pub fn login(&self, user_id: UserId, passphrase: &str) -> CoreResult<SessionSecret> {
        let record = match self.users.get(user_id) {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => {
                debug!("login failed: no user key for {user_id}");
                return Err(CoreError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        let sk = recover_private_key(&record.private_key_protected, passphrase)
            .map_err(map_credentials)?;

        let wrapped = record
            .wrapped_master_key
            .as_ref()
            .ok_or(CoreError::UserKeyInactive)?;
        let master = match open_master_key(wrapped, &sk) {
            Ok(master) => master,
            Err(e) => {
                debug!("login failed: master key unwrap for {user_id}: {e}");
                return Err(CoreError::InvalidCredentials);
            }
        };

        let session_secret = SessionSecret::generate();
        let session_row = encrypt(session_secret.as_bytes(), master.as_bytes())
            .map_err(|e| CoreError::Crypto(e.to_string()))?;
        self.sessions.put(user_id, &session_row)?;

        debug!("session established for {user_id}");
        Ok(session_secret)
    }

    /// Recovers the master key for one operation using the client's session
    /// secret.
    ///
    /// The returned key zeroizes on drop; callers must not persist it.
    pub fn unlock(&self, user_id: UserId, session_secret: &SessionSecret) -> CoreResult<MasterKey> {
        let row = match self.sessions.get(user_id) {
            Ok(row) => row,
            Err(StoreError::NotFound(_)) => return Err(CoreError::NoSessionKey),
            Err(e) => return Err(e.into()),
        };

        let plaintext = decrypt(session_secret.as_bytes(), &row.wrapped_master_key)
            .map_err(|_| CoreError::InvalidSessionSecret)?;

        MasterKey::from_slice(&plaintext).ok_or(CoreError::InvalidSessionSecret)
    }

    /// Ends the user's session. Idempotent.
    pub fn logout(&self, user_id: UserId) -> CoreResult<()> {
        self.sessions.delete(user_id)?;
        debug!("session cleared for {user_id}");
        Ok(())
    }
}
