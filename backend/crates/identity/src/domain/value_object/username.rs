//! Username Value Object
//!
//! The public handle of an account. It doubles as the channel address in
//! `/users/channel/{username}`.
//!
//! Processing order: NFKC normalization, trim, validation, lowercase.
//!
//! ## Invariants
//! - Length: 3 to 30 characters
//! - ASCII letters, digits and `_ . -` only
//! - At least one letter or digit

use derive_more::Display;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::error::{IdentityError, IdentityResult};

pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 30;

const ALLOWED_SPECIAL_CHARS: &[char] = &['_', '.', '-'];

/// Canonical (lowercase) username
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Username(String);

impl Username {
    pub fn new(raw: impl AsRef<str>) -> IdentityResult<Self> {
        let normalized: String = raw.as_ref().nfkc().collect();
        let trimmed = normalized.trim();

        if trimmed.is_empty() {
            return Err(IdentityError::Validation("Username is required".into()));
        }

        let len = trimmed.chars().count();
        if !(USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&len) {
            return Err(IdentityError::Validation(format!(
                "Username must be between {} and {} characters",
                USERNAME_MIN_LENGTH, USERNAME_MAX_LENGTH
            )));
        }

        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || ALLOWED_SPECIAL_CHARS.contains(&c))
        {
            return Err(IdentityError::Validation(
                "Username may only contain letters, digits, '_', '.' and '-'".into(),
            ));
        }

        if !trimmed.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err(IdentityError::Validation(
                "Username must contain a letter or digit".into(),
            ));
        }

        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Create from database value (assumed already canonical)
    pub fn from_db(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_db(self) -> String {
        self.0
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
