//! Auth Guard
//!
//! Turns an inbound access token into a [`Principal`]. The token is read from
//! the access cookie first, then from `Authorization: Bearer`. Verification is
//! stateless; nothing is looked up in storage.

use std::sync::Arc;

use axum::http::{HeaderMap, header};
use kernel::id::AccountId;
use platform::cookie::extract_cookie;

use crate::application::config::IdentityConfig;
use crate::application::token_service::TokenCodec;
use crate::error::{IdentityError, IdentityResult};

/// The authenticated account, as claimed by a verified access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub account_id: AccountId,
    pub username: String,
    pub email: String,
    pub full_name: String,
}

#[derive(Clone)]
pub struct AuthGuard {
    codec: TokenCodec,
    cookie_name: String,
}

impl AuthGuard {
    pub fn new(config: Arc<IdentityConfig>) -> Self {
        Self {
            cookie_name: config.access_cookie_name.clone(),
            codec: TokenCodec::new(config),
        }
    }

    /// Verify a token. Every failure, including no token at all, is `Unauthorized`.
    pub fn authorize(&self, token: Option<&str>) -> IdentityResult<Principal> {
        let token = token.ok_or(IdentityError::Unauthorized)?;

        let claims = self.codec.decode_access(token).map_err(|e| {
            tracing::debug!(reason = %e, "Access token rejected");
            IdentityError::Unauthorized
        })?;

        Ok(Principal {
            account_id: claims.sub,
            username: claims.username,
            email: claims.email,
            full_name: claims.full_name,
        })
    }

    /// Locate the access token in a request and verify it
    pub fn authorize_headers(&self, headers: &HeaderMap) -> IdentityResult<Principal> {
        let token = self.token_from_headers(headers);
        self.authorize(token.as_deref())
    }

    fn token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        extract_cookie(headers, &self.cookie_name).or_else(|| {
            headers
                .get(header::AUTHORIZATION)?
                .to_str()
                .ok()?
                .strip_prefix("Bearer ")
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
    }
}
