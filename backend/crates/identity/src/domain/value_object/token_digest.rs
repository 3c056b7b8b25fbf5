//! Refresh Token Digest
//!
//! The server keeps only the SHA-256 of the active refresh token. Two digests
//! are equal exactly when the tokens they came from are byte-for-byte equal.

use platform::crypto::{constant_time_eq, sha256, to_hex};
use std::fmt;

#[derive(Clone, Copy, Eq)]
pub struct TokenDigest([u8; 32]);

impl TokenDigest {
    /// Digest of an encoded token
    pub fn of(token: &str) -> Self {
        Self(sha256(token.as_bytes()))
    }

    /// Load from the database; `None` for a column of the wrong width
    pub fn from_db(bytes: &[u8]) -> Option<Self> {
        <[u8; 32]>::try_from(bytes).ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl PartialEq for TokenDigest {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for TokenDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // A prefix is enough to correlate log lines.
        write!(f, "TokenDigest({}..)", &to_hex(&self.0)[..8])
    }
}
