//! Token Service
//!
//! Issues, verifies, rotates and revokes the access/refresh token pair.
//!
//! Session states per account:
//! `NoSession -> Active -> Rotated (a new Active) -> Revoked | Expired`.
//!
//! - Access tokens are HS256 JWTs carrying the principal; verification is
//!   stateless.
//! - Refresh tokens are HS256 JWTs carrying only the subject, signed with a
//!   different key. The digest of the one currently honored is kept in the
//!   account's single refresh slot, so a new login ends the previous session.

use std::fmt;
use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use kernel::id::AccountId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::config::IdentityConfig;
use crate::domain::entity::account::Account;
use crate::domain::repository::{AccountRepository, CredentialRepository};
use crate::domain::value_object::token_digest::TokenDigest;
use crate::error::{IdentityError, IdentityResult};

/// Claims of an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: AccountId,
    pub email: String,
    pub username: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub iat: u64,
    pub exp: u64,
    pub jti: String,
}

/// Claims of a refresh token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: AccountId,
    pub iat: u64,
    pub exp: u64,
    pub jti: String,
}

/// Freshly issued credentials
#[derive(Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Codec (stateless)
// ============================================================================

/// JWT encoding and verification, no storage involved
#[derive(Clone)]
pub struct TokenCodec {
    config: Arc<IdentityConfig>,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(config: Arc<IdentityConfig>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self { config, validation }
    }

    pub fn encode_access(&self, account: &Account) -> IdentityResult<String> {
        let (iat, exp) = self.window(self.config.access_token_ttl);
        let claims = AccessClaims {
            sub: account.account_id,
            email: account.email.as_str().to_string(),
            username: account.username.as_str().to_string(),
            full_name: account.full_name.as_str().to_string(),
            iat,
            exp,
            jti: Uuid::new_v4().to_string(),
        };
        self.sign(&claims, &self.config.access_token_secret)
    }

    pub fn encode_refresh(&self, account_id: &AccountId) -> IdentityResult<String> {
        let (iat, exp) = self.window(self.config.refresh_token_ttl);
        let claims = RefreshClaims {
            sub: *account_id,
            iat,
            exp,
            jti: Uuid::new_v4().to_string(),
        };
        self.sign(&claims, &self.config.refresh_token_secret)
    }

    pub fn decode_access(&self, token: &str) -> IdentityResult<AccessClaims> {
        self.verify(token, &self.config.access_token_secret)
    }

    pub fn decode_refresh(&self, token: &str) -> IdentityResult<RefreshClaims> {
        self.verify(token, &self.config.refresh_token_secret)
    }

    fn window(&self, ttl: std::time::Duration) -> (u64, u64) {
        let now = jsonwebtoken::get_current_timestamp();
        (now, now.saturating_add(ttl.as_secs()))
    }

    fn sign<C: Serialize>(&self, claims: &C, secret: &[u8]) -> IdentityResult<String> {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .map_err(|e| {
            tracing::error!(error = %e, "Token signing failed");
            IdentityError::TokenGeneration
        })
    }

    fn verify<C: DeserializeOwned>(&self, token: &str, secret: &[u8]) -> IdentityResult<C> {
        jsonwebtoken::decode::<C>(token, &DecodingKey::from_secret(secret), &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => IdentityError::TokenExpired,
                JwtErrorKind::InvalidSignature => IdentityError::TokenInvalid,
                _ => IdentityError::TokenMalformed,
            })
    }
}

// ============================================================================
// Token Service (stateful lifecycle)
// ============================================================================

pub struct TokenService<R>
where
    R: AccountRepository + CredentialRepository,
{
    repo: Arc<R>,
    codec: TokenCodec,
}

impl<R> TokenService<R>
where
    R: AccountRepository + CredentialRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<IdentityConfig>) -> Self {
        Self {
            repo,
            codec: TokenCodec::new(config),
        }
    }

    /// Stateless signature and expiry check
    pub fn verify_access(&self, token: &str) -> IdentityResult<AccessClaims> {
        self.codec.decode_access(token)
    }

    /// Issue a new pair and make its refresh token the only one honored
    pub async fn issue_pair(&self, account: &Account) -> IdentityResult<TokenPair> {
        let pair = self.encode_pair(account)?;
        let digest = TokenDigest::of(&pair.refresh_token);

        match self
            .repo
            .store_refresh_token(&account.account_id, Some(&digest))
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::error!(account_id = %account.account_id, "Refresh slot owner vanished");
                return Err(IdentityError::TokenGeneration);
            }
            Err(e) => {
                tracing::error!(error = %e, account_id = %account.account_id, "Storing refresh token failed");
                return Err(IdentityError::TokenGeneration);
            }
        }

        tracing::debug!(account_id = %account.account_id, "Token pair issued");
        Ok(pair)
    }

    /// Exchange the active refresh token for a new pair.
    ///
    /// The old token stops working the moment this succeeds. A token that is
    /// not the active one fails with `TokenReuseOrMismatch`, including the
    /// loser of two concurrent rotations.
    pub async fn rotate(&self, presented: &str) -> IdentityResult<TokenPair> {
        let claims = self.codec.decode_refresh(presented)?;

        let account = self
            .repo
            .find_account_by_id(&claims.sub)
            .await?
            .ok_or(IdentityError::StaleAccount)?;
        let credentials = self
            .repo
            .find_credentials(&claims.sub)
            .await?
            .ok_or(IdentityError::StaleAccount)?;

        let expected = TokenDigest::of(presented);
        if !credentials.honors(&expected) {
            tracing::warn!(account_id = %claims.sub, "Superseded or unknown refresh token presented");
            return Err(IdentityError::TokenReuseOrMismatch);
        }

        let pair = self.encode_pair(&account)?;
        let replacement = TokenDigest::of(&pair.refresh_token);

        let swapped = self
            .repo
            .swap_refresh_token(&claims.sub, &expected, &replacement)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, account_id = %claims.sub, "Refresh token swap failed");
                IdentityError::TokenGeneration
            })?;

        if !swapped {
            tracing::warn!(account_id = %claims.sub, "Lost refresh rotation race");
            return Err(IdentityError::TokenReuseOrMismatch);
        }

        tracing::info!(account_id = %claims.sub, "Refresh token rotated");
        Ok(pair)
    }

    /// Clear the refresh slot. Revoking twice is fine.
    pub async fn revoke(&self, account_id: &AccountId) -> IdentityResult<()> {
        let found = self.repo.store_refresh_token(account_id, None).await?;
        tracing::info!(account_id = %account_id, found, "Refresh token revoked");
        Ok(())
    }

    fn encode_pair(&self, account: &Account) -> IdentityResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.codec.encode_access(account)?,
            refresh_token: self.codec.encode_refresh(&account.account_id)?,
        })
    }
}
