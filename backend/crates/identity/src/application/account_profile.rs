//! Account Profile Use Case
//!
//! The signed-in user's own profile: read it, edit details, swap avatar or
//! cover image, and record watched content.

use std::path::PathBuf;
use std::sync::Arc;

use kernel::id::{AccountId, ContentItemId};
use platform::media::MediaStore;

use crate::domain::entity::account::Account;
use crate::domain::repository::AccountRepository;
use crate::domain::value_object::{email::Email, full_name::FullName};
use crate::error::{IdentityError, IdentityResult};

pub struct UpdateDetailsInput {
    pub full_name: String,
    pub email: String,
}

pub struct AccountProfileUseCase<R, M>
where
    R: AccountRepository,
    M: MediaStore,
{
    repo: Arc<R>,
    media: Arc<M>,
}

impl<R, M> AccountProfileUseCase<R, M>
where
    R: AccountRepository,
    M: MediaStore,
{
    pub fn new(repo: Arc<R>, media: Arc<M>) -> Self {
        Self { repo, media }
    }

    pub async fn current(&self, account_id: &AccountId) -> IdentityResult<Account> {
        self.repo
            .find_account_by_id(account_id)
            .await?
            .ok_or(IdentityError::AccountNotFound)
    }

    /// Replace full name and email; both are required
    pub async fn update_details(
        &self,
        account_id: &AccountId,
        input: UpdateDetailsInput,
    ) -> IdentityResult<Account> {
        if input.full_name.trim().is_empty() || input.email.trim().is_empty() {
            return Err(IdentityError::Validation("All fields are required".into()));
        }

        let full_name = FullName::new(&input.full_name)?;
        let email = Email::new(&input.email)?;

        let account = self
            .repo
            .update_account_details(account_id, &full_name, &email)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;

        tracing::info!(account_id = %account_id, "Account details updated");
        Ok(account)
    }

    pub async fn update_avatar(
        &self,
        account_id: &AccountId,
        file: Option<PathBuf>,
    ) -> IdentityResult<Account> {
        let url = self.upload(file, "avatar").await?;

        let account = self
            .repo
            .update_account_avatar(account_id, &url)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;

        tracing::info!(account_id = %account_id, "Avatar updated");
        Ok(account)
    }

    pub async fn update_cover_image(
        &self,
        account_id: &AccountId,
        file: Option<PathBuf>,
    ) -> IdentityResult<Account> {
        let url = self.upload(file, "cover image").await?;

        let account = self
            .repo
            .update_account_cover_image(account_id, &url)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;

        tracing::info!(account_id = %account_id, "Cover image updated");
        Ok(account)
    }

    pub async fn record_watch(
        &self,
        account_id: &AccountId,
        item: &ContentItemId,
    ) -> IdentityResult<Account> {
        if !self.repo.record_watch(account_id, item).await? {
            return Err(IdentityError::AccountNotFound);
        }
        self.current(account_id).await
    }

    async fn upload(&self, file: Option<PathBuf>, what: &str) -> IdentityResult<String> {
        let path = file
            .ok_or_else(|| IdentityError::Validation(format!("The {} file is missing", what)))?;

        let media = self.media.upload(&path).await.map_err(|e| {
            tracing::warn!(error = %e, what, "Upload failed");
            IdentityError::UploadFailed(what.to_string())
        })?;

        if media.url.trim().is_empty() {
            return Err(IdentityError::UploadFailed(what.to_string()));
        }

        Ok(media.url)
    }
}
