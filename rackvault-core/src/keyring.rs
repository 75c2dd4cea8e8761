//! Master key provisioning and per-user activation.
//!
//! The shared master key is generated exactly once, when the first user is
//! bootstrapped. Every later activation wraps that same key for another
//! user's public key. Deactivation removes one user's wrapped copy and
//! nothing else — it revokes an access path, it does not rotate the key.
//!
//! Who may bootstrap or activate is the embedding application's policy; the
//! API enforces only that an activator already holds the unlocked master
//! key, which requires having completed a session unlock through an active
//! key of their own.

use rackvault_crypto::{
    protect_private_key, recover_private_key, seal_master_key, CryptoError, KdfParams, MasterKey,
    PassphraseProtectedKey, PublicKey, UserKeyPair, WrappedMasterKey,
};
use rackvault_store::{UserId, UserKeyStore};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Manages user key enrollment and master key activation.
pub struct Keyring {
    users: UserKeyStore,
    kdf: KdfParams,
}

impl Keyring {
    pub fn new(users: UserKeyStore) -> Self {
        Self::with_kdf_params(users, KdfParams::default())
    }

    pub fn with_kdf_params(users: UserKeyStore, kdf: KdfParams) -> Self {
        Self { users, kdf }
    }

    /// Enrolls a user with a server-generated keypair, protecting the
    /// private key under their passphrase. The key starts inactive.
    pub fn enroll(&self, user_id: UserId, passphrase: &str) -> CoreResult<()> {
        let kp = UserKeyPair::generate();
        let protected =
            protect_private_key(&kp.secret, passphrase, &self.kdf).map_err(map_kdf)?;
        self.users.insert(user_id, kp.public_bytes(), &protected)?;
        debug!("enrolled user key for {user_id}");
        Ok(())
    }

    /// Registers a client-generated keypair: the public key plus the
    /// passphrase-protected private key, as uploaded.
    pub fn register(
        &self,
        user_id: UserId,
        public_key: [u8; 32],
        protected: &PassphraseProtectedKey,
    ) -> CoreResult<()> {
        self.users.insert(user_id, public_key, protected)?;
        debug!("registered uploaded user key for {user_id}");
        Ok(())
    }

    /// First-ever activation: generates the deployment's master key and
    /// wraps it for the bootstrapping user.
    ///
    /// Refuses to run once any user key is active — the master key already
    /// exists and must be shared via [`Keyring::activate`], never replaced.
    pub fn bootstrap(&self, user_id: UserId) -> CoreResult<WrappedMasterKey> {
        if self.users.any_active()? {
            return Err(CoreError::MasterKeyAlreadyProvisioned);
        }

        let record = self.users.get(user_id)?;
        let master = MasterKey::generate();
        let wrapped = seal_master_key(&master, &PublicKey::from(record.public_key))
            .map_err(|e| CoreError::Crypto(e.to_string()))?;

        self.users.set_wrapped_master_key(user_id, &wrapped)?;
        debug!("bootstrapped master key; first active user is {user_id}");
        Ok(wrapped)
    }

    /// Activates a user by wrapping the already-recovered master key for
    /// their public key.
    ///
    /// The caller proves access by presenting the unlocked master key,
    /// obtained through their own session. Fails if no user key is active:
    /// a deployment without one has no provisioned master key, and a fresh
    /// key must go through [`Keyring::bootstrap`] instead.
    pub fn activate(&self, user_id: UserId, master_key: &MasterKey) -> CoreResult<WrappedMasterKey> {
        if !self.users.any_active()? {
            return Err(CoreError::NoMasterKeyAvailable);
        }

        let record = self.users.get(user_id)?;
        let wrapped = seal_master_key(master_key, &PublicKey::from(record.public_key))
            .map_err(|e| CoreError::Crypto(e.to_string()))?;

        self.users.set_wrapped_master_key(user_id, &wrapped)?;
        debug!("activated user key for {user_id}");
        Ok(wrapped)
    }

    /// Revokes one user's access path by clearing their wrapped master key.
    /// Other users and the master key itself are unaffected.
    pub fn deactivate(&self, user_id: UserId) -> CoreResult<()> {
        self.users.clear_wrapped_master_key(user_id)?;
        debug!("deactivated user key for {user_id}");
        Ok(())
    }

    /// Whether the user has an activated key. Returns false for users with
    /// no key record at all, so the request layer can gate secret edits
    /// with one call.
    pub fn has_active_user_key(&self, user_id: UserId) -> CoreResult<bool> {
        match self.users.get(user_id) {
            Ok(record) => Ok(record.is_active()),
            Err(rackvault_store::StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Re-protects the private key under a new passphrase. The wrapped
    /// master key and all secrets are untouched.
    pub fn change_passphrase(
        &self,
        user_id: UserId,
        old_passphrase: &str,
        new_passphrase: &str,
    ) -> CoreResult<()> {
        let record = self.users.get(user_id)?;
        let sk = recover_private_key(&record.private_key_protected, old_passphrase)
            .map_err(map_credentials)?;

        let reprotected =
            protect_private_key(&sk, new_passphrase, &self.kdf).map_err(map_kdf)?;
        self.users.set_private_key_protected(user_id, &reprotected)?;
        debug!("re-protected private key for {user_id}");
        Ok(())
    }
}

/// A malformed (empty) passphrase is a caller error; everything else from a
/// passphrase-recovery path means the credentials were wrong.
pub(crate) fn map_credentials(e: CryptoError) -> CoreError {
    match e {
        CryptoError::KeyDerivation(msg) => CoreError::KeyDerivation(msg),
        other => {
            debug!("private key recovery failed: {other}");
            CoreError::InvalidCredentials
        }
    }
}

pub(crate) fn map_kdf(e: CryptoError) -> CoreError {
    match e {
        CryptoError::KeyDerivation(msg) => CoreError::KeyDerivation(msg),
        other => CoreError::Crypto(other.to_string()),
    }
}
