//! Protocol error types.

use rackvault_store::StoreError;
use thiserror::Error;

/// Result type for protocol operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors surfaced by the key hierarchy protocol.
///
/// Messages are safe to show a client: which internal step failed is logged
/// server-side at debug level and never propagated, so a caller cannot
/// distinguish a wrong key from corrupt data.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user key has not been activated")]
    UserKeyInactive,

    #[error("no session key for this user")]
    NoSessionKey,

    #[error("invalid or superseded session secret")]
    InvalidSessionSecret,

    #[error("no master key available: no user key is active")]
    NoMasterKeyAvailable,

    #[error("master key already provisioned for this deployment")]
    MasterKeyAlreadyProvisioned,

    #[error("cannot encrypt or decrypt secret data")]
    Decryption,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("crypto failure: {0}")]
    Crypto(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
