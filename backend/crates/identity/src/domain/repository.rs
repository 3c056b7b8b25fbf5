//! Repository Traits
//!
//! Interfaces for data persistence. Implementations are in the infrastructure layer.

use kernel::id::{AccountId, ContentItemId};

use crate::domain::entity::{
    account::Account, channel_profile::ChannelProfile, credentials::Credentials,
    subscription::SubscriptionEdge,
};
use crate::domain::value_object::{
    email::Email, full_name::FullName, token_digest::TokenDigest, user_password::UserPassword,
    username::Username,
};
use crate::error::IdentityResult;

/// Account repository trait
///
/// Every read returns the public [`Account`] only.
#[trait_variant::make(AccountRepository: Send)]
pub trait LocalAccountRepository {
    /// Insert an account with its credentials.
    ///
    /// Fails with `DuplicateIdentity` when the username or email is taken.
    async fn insert_account(&self, account: &Account, credentials: &Credentials)
    -> IdentityResult<()>;

    /// Whether the username or the email is already registered
    async fn account_exists(&self, username: &Username, email: &Email) -> IdentityResult<bool>;

    async fn find_account_by_id(&self, account_id: &AccountId) -> IdentityResult<Option<Account>>;

    async fn find_account_by_username(&self, username: &Username)
    -> IdentityResult<Option<Account>>;

    /// Find by username or email; either may be absent, not both
    async fn find_account_by_identity(
        &self,
        username: Option<&Username>,
        email: Option<&Email>,
    ) -> IdentityResult<Option<Account>>;

    /// Overwrite full name and email; `None` if the account is gone
    async fn update_account_details(
        &self,
        account_id: &AccountId,
        full_name: &FullName,
        email: &Email,
    ) -> IdentityResult<Option<Account>>;

    async fn update_account_avatar(
        &self,
        account_id: &AccountId,
        avatar_url: &str,
    ) -> IdentityResult<Option<Account>>;

    async fn update_account_cover_image(
        &self,
        account_id: &AccountId,
        cover_image_url: &str,
    ) -> IdentityResult<Option<Account>>;

    /// Append to the watch history, moving an existing entry to the end
    async fn record_watch(&self, account_id: &AccountId, item: &ContentItemId)
    -> IdentityResult<bool>;
}

/// Credentials repository trait
#[trait_variant::make(CredentialRepository: Send)]
pub trait LocalCredentialRepository {
    async fn find_credentials(&self, account_id: &AccountId) -> IdentityResult<Option<Credentials>>;

    /// Replace the password hash; the only write path for it
    async fn update_password_hash(
        &self,
        account_id: &AccountId,
        password_hash: &UserPassword,
    ) -> IdentityResult<bool>;

    /// Unconditionally overwrite (or clear, with `None`) the refresh-token slot.
    ///
    /// Returns `false` if the account does not exist.
    async fn store_refresh_token(
        &self,
        account_id: &AccountId,
        digest: Option<&TokenDigest>,
    ) -> IdentityResult<bool>;

    /// Atomically replace `expected` with `replacement`.
    ///
    /// Returns `false`, writing nothing, when the slot no longer holds `expected`.
    async fn swap_refresh_token(
        &self,
        account_id: &AccountId,
        expected: &TokenDigest,
        replacement: &TokenDigest,
    ) -> IdentityResult<bool>;
}

/// Subscription graph repository trait
#[trait_variant::make(SubscriptionRepository: Send)]
pub trait LocalSubscriptionRepository {
    /// Insert an edge; `false` if it already existed
    async fn insert_subscription(&self, edge: &SubscriptionEdge) -> IdentityResult<bool>;

    /// Delete an edge; `false` if there was none
    async fn delete_subscription(
        &self,
        subscriber_id: &AccountId,
        channel_id: &AccountId,
    ) -> IdentityResult<bool>;

    /// Subscriber count of a channel
    async fn in_degree(&self, channel_id: &AccountId) -> IdentityResult<i64>;

    /// Number of channels an account follows
    async fn out_degree(&self, account_id: &AccountId) -> IdentityResult<i64>;

    async fn has_edge(&self, subscriber_id: &AccountId, channel_id: &AccountId)
    -> IdentityResult<bool>;

    /// Resolve a channel and aggregate its counts in one consistent read
    async fn load_channel_profile(
        &self,
        username: &Username,
        viewer: Option<&AccountId>,
    ) -> IdentityResult<Option<ChannelProfile>>;
}

/// Everything the identity use cases and handlers need from storage
pub trait IdentityStore:
    AccountRepository + CredentialRepository + SubscriptionRepository + Send + Sync + 'static
{
}

impl<T> IdentityStore for T where
    T: AccountRepository + CredentialRepository + SubscriptionRepository + Send + Sync + 'static
{
}
