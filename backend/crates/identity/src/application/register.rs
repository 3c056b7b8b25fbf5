//! Register Use Case
//!
//! Creates an account from the registration form. The avatar is required; a
//! cover image is optional and its upload failure does not block registration.

use std::path::PathBuf;
use std::sync::Arc;

use platform::media::MediaStore;

use crate::application::config::IdentityConfig;
use crate::domain::entity::{account::Account, credentials::Credentials};
use crate::domain::repository::AccountRepository;
use crate::domain::value_object::{
    email::Email,
    full_name::FullName,
    user_password::{RawPassword, UserPassword},
    username::Username,
};
use crate::error::{IdentityError, IdentityResult};

/// Registration form
pub struct RegisterInput {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
    /// Spooled avatar file
    pub avatar: Option<PathBuf>,
    /// Spooled cover image file
    pub cover_image: Option<PathBuf>,
}

pub struct RegisterUseCase<R, M>
where
    R: AccountRepository,
    M: MediaStore,
{
    repo: Arc<R>,
    media: Arc<M>,
    config: Arc<IdentityConfig>,
}

impl<R, M> RegisterUseCase<R, M>
where
    R: AccountRepository,
    M: MediaStore,
{
    pub fn new(repo: Arc<R>, media: Arc<M>, config: Arc<IdentityConfig>) -> Self {
        Self {
            repo,
            media,
            config,
        }
    }

    pub async fn execute(&self, input: RegisterInput) -> IdentityResult<Account> {
        let blank: Vec<&str> = [
            ("username", &input.username),
            ("fullname", &input.full_name),
            ("email", &input.email),
            ("password", &input.password),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

        if !blank.is_empty() {
            return Err(IdentityError::Validation(format!(
                "All fields are required (missing: {})",
                blank.join(", ")
            )));
        }

        let username = Username::new(&input.username)?;
        let email = Email::new(&input.email)?;
        let full_name = FullName::new(&input.full_name)?;
        let password = RawPassword::new(input.password)?;

        let avatar_path = input
            .avatar
            .ok_or_else(|| IdentityError::Validation("Avatar file is required".into()))?;

        if self.repo.account_exists(&username, &email).await? {
            return Err(IdentityError::DuplicateIdentity);
        }

        let password_hash = UserPassword::from_raw(&password, self.config.pepper())?;

        let avatar = self
            .media
            .upload(&avatar_path)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Avatar upload failed");
                IdentityError::UploadFailed("avatar".into())
            })?;

        let cover_image_url = match input.cover_image {
            Some(path) => match self.media.upload(&path).await {
                Ok(media) => Some(media.url),
                Err(e) => {
                    tracing::warn!(error = %e, "Cover image upload failed, continuing without it");
                    None
                }
            },
            None => None,
        };

        let account = Account::new(username, email, full_name, avatar.url, cover_image_url)?;
        let credentials = Credentials::new(account.account_id, password_hash);

        self.repo.insert_account(&account, &credentials).await?;

        tracing::info!(
            account_id = %account.account_id,
            username = %account.username,
            has_cover = account.cover_image_url.is_some(),
            "Account registered"
        );

        Ok(account)
    }
}
