//! Session token transport form.
//!
//! The session secret crosses the HTTP boundary base64-encoded in a cookie;
//! protocol APIs take the raw bytes. A token that fails to decode is
//! treated the same as a wrong secret.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rackvault_crypto::{SessionSecret, Zeroizing};

use crate::error::{CoreError, CoreResult};

/// Encodes a session secret for the client cookie.
pub fn encode_token(secret: &SessionSecret) -> String {
    STANDARD.encode(secret.as_bytes())
}

/// Decodes a client token back into a session secret.
pub fn decode_token(token: &str) -> CoreResult<SessionSecret> {
    let bytes = Zeroizing::new(
        STANDARD
            .decode(token)
            .map_err(|_| CoreError::InvalidSessionSecret)?,
    );
    SessionSecret::from_slice(&bytes).ok_or(CoreError::InvalidSessionSecret)
}
