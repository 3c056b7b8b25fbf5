//! Login Use Case
//!
//! Verifies credentials and starts a session. Starting a session replaces any
//! session the account had elsewhere.

use std::sync::Arc;

use crate::application::config::IdentityConfig;
use crate::application::token_service::{TokenPair, TokenService};
use crate::domain::entity::account::Account;
use crate::domain::repository::{AccountRepository, CredentialRepository};
use crate::domain::value_object::{email::Email, user_password::RawPassword, username::Username};
use crate::error::{IdentityError, IdentityResult};

/// Login input; at least one of username and email is required
pub struct LoginInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

pub struct LoginOutput {
    pub account: Account,
    pub tokens: TokenPair,
}

pub struct LoginUseCase<R>
where
    R: AccountRepository + CredentialRepository,
{
    repo: Arc<R>,
    tokens: TokenService<R>,
    config: Arc<IdentityConfig>,
}

impl<R> LoginUseCase<R>
where
    R: AccountRepository + CredentialRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<IdentityConfig>) -> Self {
        Self {
            tokens: TokenService::new(repo.clone(), config.clone()),
            repo,
            config,
        }
    }

    pub async fn execute(&self, input: LoginInput) -> IdentityResult<LoginOutput> {
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        let username = present(input.username);
        let email = present(input.email);

        if username.is_none() && email.is_none() {
            return Err(IdentityError::Validation(
                "Username or email is required".into(),
            ));
        }

        if input.password.trim().is_empty() {
            return Err(IdentityError::Validation("Password is required".into()));
        }

        // A malformed identifier cannot name an account.
        let username = username.map(Username::new).transpose().ok().flatten();
        let email = email.map(Email::new).transpose().ok().flatten();
        if username.is_none() && email.is_none() {
            return Err(IdentityError::AccountNotFound);
        }

        let account = self
            .repo
            .find_account_by_identity(username.as_ref(), email.as_ref())
            .await?
            .ok_or(IdentityError::AccountNotFound)?;

        let credentials = self
            .repo
            .find_credentials(&account.account_id)
            .await?
            .ok_or_else(|| IdentityError::Internal("Credentials not found".into()))?;

        let attempt = RawPassword::for_verification(input.password);
        if !credentials
            .password_hash
            .verify(&attempt, self.config.pepper())
        {
            return Err(IdentityError::InvalidCredentials);
        }

        let tokens = self.tokens.issue_pair(&account).await?;

        tracing::info!(account_id = %account.account_id, "User logged in");

        Ok(LoginOutput { account, tokens })
    }
}
