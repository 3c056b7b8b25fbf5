//! Change Password Use Case

use std::sync::Arc;

use kernel::id::AccountId;

use crate::application::config::IdentityConfig;
use crate::domain::repository::CredentialRepository;
use crate::domain::value_object::user_password::{RawPassword, UserPassword};
use crate::error::{IdentityError, IdentityResult};

pub struct ChangePasswordInput {
    pub old_password: String,
    pub new_password: String,
}

pub struct ChangePasswordUseCase<R>
where
    R: CredentialRepository,
{
    repo: Arc<R>,
    config: Arc<IdentityConfig>,
}

impl<R> ChangePasswordUseCase<R>
where
    R: CredentialRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<IdentityConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn execute(
        &self,
        account_id: &AccountId,
        input: ChangePasswordInput,
    ) -> IdentityResult<()> {
        if input.old_password.trim().is_empty() || input.new_password.trim().is_empty() {
            return Err(IdentityError::Validation(
                "Old and new password are required".into(),
            ));
        }

        let credentials = self
            .repo
            .find_credentials(account_id)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;

        let old = RawPassword::for_verification(input.old_password);
        if !credentials.password_hash.verify(&old, self.config.pepper()) {
            return Err(IdentityError::InvalidCredentials);
        }

        let new = RawPassword::new(input.new_password)?;
        let hash = UserPassword::from_raw(&new, self.config.pepper())?;

        if !self.repo.update_password_hash(account_id, &hash).await? {
            return Err(IdentityError::AccountNotFound);
        }

        tracing::info!(account_id = %account_id, "Password changed");
        Ok(())
    }
}
