//! In-Memory Repository
//!
//! Process-local store behind one lock. Every operation, the refresh-token
//! compare-and-swap and the channel aggregation included, runs under that
//! single lock and is therefore atomic. Used by tests and local runs
//! without a database.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use kernel::id::{AccountId, ContentItemId};
use tokio::sync::RwLock;

use crate::domain::entity::{
    account::Account, channel_profile::ChannelProfile, credentials::Credentials,
    subscription::SubscriptionEdge,
};
use crate::domain::repository::{AccountRepository, CredentialRepository, SubscriptionRepository};
use crate::domain::value_object::{
    email::Email, full_name::FullName, token_digest::TokenDigest, user_password::UserPassword,
    username::Username,
};
use crate::error::{IdentityError, IdentityResult};

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<AccountId, Account>,
    credentials: HashMap<AccountId, Credentials>,
    /// (subscriber, channel)
    edges: HashSet<(AccountId, AccountId)>,
}

impl MemoryState {
    fn by_username(&self, username: &Username) -> Option<&Account> {
        self.accounts.values().find(|a| a.username == *username)
    }

    fn by_email(&self, email: &Email) -> Option<&Account> {
        self.accounts.values().find(|a| a.email == *email)
    }

    fn in_degree(&self, channel_id: &AccountId) -> i64 {
        self.edges.iter().filter(|(_, c)| c == channel_id).count() as i64
    }

    fn out_degree(&self, account_id: &AccountId) -> i64 {
        self.edges.iter().filter(|(s, _)| s == account_id).count() as i64
    }

    fn update_account(
        &mut self,
        account_id: &AccountId,
        apply: impl FnOnce(&mut Account),
    ) -> Option<Account> {
        let account = self.accounts.get_mut(account_id)?;
        apply(account);
        Some(account.clone())
    }
}

/// In-memory identity repository
#[derive(Clone, Default)]
pub struct InMemoryIdentityRepository {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryIdentityRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Account Repository Implementation
// ============================================================================

impl AccountRepository for InMemoryIdentityRepository {
    async fn insert_account(
        &self,
        account: &Account,
        credentials: &Credentials,
    ) -> IdentityResult<()> {
        let mut state = self.state.write().await;

        if state.by_username(&account.username).is_some() || state.by_email(&account.email).is_some()
        {
            return Err(IdentityError::DuplicateIdentity);
        }

        state.accounts.insert(account.account_id, account.clone());
        state
            .credentials
            .insert(account.account_id, credentials.clone());
        Ok(())
    }

    async fn account_exists(&self, username: &Username, email: &Email) -> IdentityResult<bool> {
        let state = self.state.read().await;
        Ok(state.by_username(username).is_some() || state.by_email(email).is_some())
    }

    async fn find_account_by_id(&self, account_id: &AccountId) -> IdentityResult<Option<Account>> {
        Ok(self.state.read().await.accounts.get(account_id).cloned())
    }

    async fn find_account_by_username(
        &self,
        username: &Username,
    ) -> IdentityResult<Option<Account>> {
        Ok(self.state.read().await.by_username(username).cloned())
    }

    async fn find_account_by_identity(
        &self,
        username: Option<&Username>,
        email: Option<&Email>,
    ) -> IdentityResult<Option<Account>> {
        let state = self.state.read().await;
        let found = username
            .and_then(|u| state.by_username(u))
            .or_else(|| email.and_then(|e| state.by_email(e)));
        Ok(found.cloned())
    }

    async fn update_account_details(
        &self,
        account_id: &AccountId,
        full_name: &FullName,
        email: &Email,
    ) -> IdentityResult<Option<Account>> {
        let mut state = self.state.write().await;

        if state
            .by_email(email)
            .is_some_and(|other| other.account_id != *account_id)
        {
            return Err(IdentityError::DuplicateIdentity);
        }

        Ok(state.update_account(account_id, |account| {
            account.update_details(full_name.clone(), email.clone())
        }))
    }

    async fn update_account_avatar(
        &self,
        account_id: &AccountId,
        avatar_url: &str,
    ) -> IdentityResult<Option<Account>> {
        let mut state = self.state.write().await;
        let Some(account) = state.accounts.get_mut(account_id) else {
            return Ok(None);
        };
        account.set_avatar(avatar_url)?;
        Ok(Some(account.clone()))
    }

    async fn update_account_cover_image(
        &self,
        account_id: &AccountId,
        cover_image_url: &str,
    ) -> IdentityResult<Option<Account>> {
        let mut state = self.state.write().await;
        Ok(state.update_account(account_id, |account| {
            account.set_cover_image(cover_image_url)
        }))
    }

    async fn record_watch(
        &self,
        account_id: &AccountId,
        item: &ContentItemId,
    ) -> IdentityResult<bool> {
        let mut state = self.state.write().await;
        Ok(state
            .update_account(account_id, |account| account.record_watch(*item))
            .is_some())
    }
}

// ============================================================================
// Credential Repository Implementation
// ============================================================================

impl CredentialRepository for InMemoryIdentityRepository {
    async fn find_credentials(
        &self,
        account_id: &AccountId,
    ) -> IdentityResult<Option<Credentials>> {
        Ok(self.state.read().await.credentials.get(account_id).cloned())
    }

    async fn update_password_hash(
        &self,
        account_id: &AccountId,
        password_hash: &UserPassword,
    ) -> IdentityResult<bool> {
        let mut state = self.state.write().await;
        let Some(credentials) = state.credentials.get_mut(account_id) else {
            return Ok(false);
        };
        credentials.password_hash = password_hash.clone();
        credentials.updated_at = Utc::now();
        Ok(true)
    }

    async fn store_refresh_token(
        &self,
        account_id: &AccountId,
        digest: Option<&TokenDigest>,
    ) -> IdentityResult<bool> {
        let mut state = self.state.write().await;
        let Some(credentials) = state.credentials.get_mut(account_id) else {
            return Ok(false);
        };
        credentials.refresh_token = digest.copied();
        credentials.updated_at = Utc::now();
        Ok(true)
    }

    async fn swap_refresh_token(
        &self,
        account_id: &AccountId,
        expected: &TokenDigest,
        replacement: &TokenDigest,
    ) -> IdentityResult<bool> {
        let mut state = self.state.write().await;
        let Some(credentials) = state.credentials.get_mut(account_id) else {
            return Ok(false);
        };
        if !credentials.honors(expected) {
            return Ok(false);
        }
        credentials.refresh_token = Some(*replacement);
        credentials.updated_at = Utc::now();
        Ok(true)
    }
}

// ============================================================================
// Subscription Repository Implementation
// ============================================================================

impl SubscriptionRepository for InMemoryIdentityRepository {
    async fn insert_subscription(&self, edge: &SubscriptionEdge) -> IdentityResult<bool> {
        let mut state = self.state.write().await;

        if !state.accounts.contains_key(&edge.subscriber_id)
            || !state.accounts.contains_key(&edge.channel_id)
        {
            return Err(IdentityError::ChannelNotFound);
        }

        Ok(state.edges.insert((edge.subscriber_id, edge.channel_id)))
    }

    async fn delete_subscription(
        &self,
        subscriber_id: &AccountId,
        channel_id: &AccountId,
    ) -> IdentityResult<bool> {
        Ok(self
            .state
            .write()
            .await
            .edges
            .remove(&(*subscriber_id, *channel_id)))
    }

    async fn in_degree(&self, channel_id: &AccountId) -> IdentityResult<i64> {
        Ok(self.state.read().await.in_degree(channel_id))
    }

    async fn out_degree(&self, account_id: &AccountId) -> IdentityResult<i64> {
        Ok(self.state.read().await.out_degree(account_id))
    }

    async fn has_edge(
        &self,
        subscriber_id: &AccountId,
        channel_id: &AccountId,
    ) -> IdentityResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .edges
            .contains(&(*subscriber_id, *channel_id)))
    }

    async fn load_channel_profile(
        &self,
        username: &Username,
        viewer: Option<&AccountId>,
    ) -> IdentityResult<Option<ChannelProfile>> {
        let state = self.state.read().await;
        let Some(account) = state.by_username(username) else {
            return Ok(None);
        };

        Ok(Some(ChannelProfile {
            account_id: account.account_id,
            full_name: account.full_name.as_str().to_string(),
            username: account.username.as_str().to_string(),
            subscriber_count: state.in_degree(&account.account_id),
            subscribed_to_count: state.out_degree(&account.account_id),
            is_subscribed: viewer
                .is_some_and(|v| state.edges.contains(&(*v, account.account_id))),
            avatar_url: account.avatar_url.clone(),
            cover_image_url: account.cover_image_url.clone(),
            email: account.email.as_str().to_string(),
        }))
    }
}
