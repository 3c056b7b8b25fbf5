//! Account Entity
//!
//! Public profile of a registered user. Secrets live in
//! [`Credentials`](super::credentials::Credentials) and never travel with it.

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, ContentItemId};

use crate::domain::value_object::{email::Email, full_name::FullName, username::Username};
use crate::error::{IdentityError, IdentityResult};

/// Account entity
#[derive(Debug, Clone)]
pub struct Account {
    pub account_id: AccountId,
    /// Unique, lowercase
    pub username: Username,
    /// Unique, lowercase
    pub email: Email,
    pub full_name: FullName,
    /// Never empty
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    /// Oldest first
    pub watch_history: Vec<ContentItemId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        username: Username,
        email: Email,
        full_name: FullName,
        avatar_url: impl Into<String>,
        cover_image_url: Option<String>,
    ) -> IdentityResult<Self> {
        let now = Utc::now();

        Ok(Self {
            account_id: AccountId::new(),
            username,
            email,
            full_name,
            avatar_url: Self::checked_avatar(avatar_url.into())?,
            cover_image_url: cover_image_url.filter(|url| !url.trim().is_empty()),
            watch_history: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    fn checked_avatar(url: String) -> IdentityResult<String> {
        if url.trim().is_empty() {
            return Err(IdentityError::Validation("Avatar file is required".into()));
        }
        Ok(url)
    }

    pub fn update_details(&mut self, full_name: FullName, email: Email) {
        self.full_name = full_name;
        self.email = email;
        self.updated_at = Utc::now();
    }

    pub fn set_avatar(&mut self, url: impl Into<String>) -> IdentityResult<()> {
        self.avatar_url = Self::checked_avatar(url.into())?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn set_cover_image(&mut self, url: impl Into<String>) {
        self.cover_image_url = Some(url.into());
        self.updated_at = Utc::now();
    }

    /// Append to the watch history, moving an existing entry to the end
    pub fn record_watch(&mut self, item: ContentItemId) {
        self.watch_history.retain(|existing| *existing != item);
        self.watch_history.push(item);
        self.updated_at = Utc::now();
    }
}
