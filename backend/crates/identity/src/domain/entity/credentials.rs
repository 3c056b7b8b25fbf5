//! Credentials Entity
//!
//! Secret half of an account: the password hash and the single refresh-token slot.

use chrono::{DateTime, Utc};
use kernel::id::AccountId;

use crate::domain::value_object::{token_digest::TokenDigest, user_password::UserPassword};

#[derive(Debug, Clone)]
pub struct Credentials {
    pub account_id: AccountId,
    pub password_hash: UserPassword,
    /// Digest of the one refresh token currently honored, if any
    pub refresh_token: Option<TokenDigest>,
    pub updated_at: DateTime<Utc>,
}

impl Credentials {
    pub fn new(account_id: AccountId, password_hash: UserPassword) -> Self {
        Self {
            account_id,
            password_hash,
            refresh_token: None,
            updated_at: Utc::now(),
        }
    }

    /// Whether `presented` is the active refresh token. No token on file never matches.
    pub fn honors(&self, presented: &TokenDigest) -> bool {
        self.refresh_token.as_ref() == Some(presented)
    }
}
