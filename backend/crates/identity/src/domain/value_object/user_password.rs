//! User Password Value Object
//!
//! Domain wrapper over `platform::password`. A `UserPassword` is only ever
//! produced by hashing a [`RawPassword`] or by loading a stored PHC string, so
//! saving an account that did not go through a password change can never
//! re-hash anything.
//!
//! ## Usage
//! ```rust
//! use identity::domain::value_object::user_password::{RawPassword, UserPassword};
//!
//! let raw = RawPassword::new("Secret123!".to_string()).unwrap();
//! let hashed = UserPassword::from_raw(&raw, None).unwrap();
//! assert!(hashed.verify(&raw, None));
//! ```

use platform::password::{ClearTextPassword, HashedPassword, PasswordHashError, PasswordPolicyError};
use std::fmt;

use crate::error::{IdentityError, IdentityResult};

// ============================================================================
// Raw Password (User Input)
// ============================================================================

/// Raw password from user input, zeroized on drop
pub struct RawPassword(ClearTextPassword);

impl RawPassword {
    /// Create a new raw password, applying the policy
    ///
    /// - 8 to 128 characters after NFKC normalization
    /// - not blank
    /// - no control characters
    pub fn new(raw: String) -> IdentityResult<Self> {
        let clear_text = ClearTextPassword::new(raw).map_err(|e| match e {
            PasswordPolicyError::TooShort { min, .. } => IdentityError::Validation(format!(
                "Password must be at least {} characters",
                min
            )),
            PasswordPolicyError::TooLong { max, .. } => IdentityError::Validation(format!(
                "Password must be at most {} characters",
                max
            )),
            PasswordPolicyError::EmptyOrWhitespace => {
                IdentityError::Validation("Password is required".into())
            }
            PasswordPolicyError::InvalidCharacter => {
                IdentityError::Validation("Password contains invalid characters".into())
            }
        })?;

        Ok(Self(clear_text))
    }

    /// Wrap a login attempt without applying the policy
    pub fn for_verification(raw: String) -> Self {
        Self(ClearTextPassword::for_verification(raw))
    }

    pub(crate) fn inner(&self) -> &ClearTextPassword {
        &self.0
    }
}

impl fmt::Debug for RawPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawPassword").field(&"[REDACTED]").finish()
    }
}

// ============================================================================
// User Password (Hashed, for storage)
// ============================================================================

/// Argon2id hash in PHC string format
#[derive(Clone, PartialEq, Eq)]
pub struct UserPassword(HashedPassword);

impl UserPassword {
    pub fn from_raw(raw: &RawPassword, pepper: Option<&[u8]>) -> IdentityResult<Self> {
        let hashed = raw.inner().hash(pepper).map_err(|e| match e {
            PasswordHashError::HashingFailed(msg) => {
                IdentityError::Internal(format!("Password hashing failed: {}", msg))
            }
            PasswordHashError::InvalidHashFormat => {
                IdentityError::Internal("Unexpected error during password hashing".into())
            }
        })?;

        Ok(Self(hashed))
    }

    /// Load from the database
    pub fn from_phc_string(phc_string: impl Into<String>) -> IdentityResult<Self> {
        let hashed = HashedPassword::from_phc_string(phc_string)
            .map_err(|_| IdentityError::Internal("Invalid password hash in database".into()))?;

        Ok(Self(hashed))
    }

    pub fn as_phc_string(&self) -> &str {
        self.0.as_phc_string()
    }

    /// Verify a raw password against this hash
    ///
    /// `pepper` must match the one used during hashing.
    pub fn verify(&self, raw: &RawPassword, pepper: Option<&[u8]>) -> bool {
        self.0.verify(raw.inner(), pepper)
    }
}

impl fmt::Debug for UserPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}
