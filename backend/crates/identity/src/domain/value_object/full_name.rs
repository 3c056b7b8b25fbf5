//! Full Name Value Object

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::{IdentityError, IdentityResult};

pub const FULL_NAME_MAX_LENGTH: usize = 100;

/// Display name, trimmed
#[derive(Debug, Display, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullName(String);

impl FullName {
    pub fn new(raw: impl AsRef<str>) -> IdentityResult<Self> {
        let trimmed = raw.as_ref().trim();

        if trimmed.is_empty() {
            return Err(IdentityError::Validation("Full name is required".into()));
        }

        if trimmed.chars().count() > FULL_NAME_MAX_LENGTH {
            return Err(IdentityError::Validation(format!(
                "Full name must be at most {} characters",
                FULL_NAME_MAX_LENGTH
            )));
        }

        if trimmed.chars().any(char::is_control) {
            return Err(IdentityError::Validation(
                "Full name contains invalid characters".into(),
            ));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn from_db(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
