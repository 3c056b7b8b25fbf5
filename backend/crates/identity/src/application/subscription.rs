//! Subscription Use Case
//!
//! Follow and unfollow channels. Both directions are idempotent.

use std::sync::Arc;

use kernel::id::AccountId;

use crate::domain::entity::subscription::SubscriptionEdge;
use crate::domain::repository::{AccountRepository, SubscriptionRepository};
use crate::domain::value_object::username::Username;
use crate::error::{IdentityError, IdentityResult};

/// Relation of the caller to a channel after the call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionStatus {
    pub channel_id: AccountId,
    pub subscribed: bool,
    /// Whether this call changed anything
    pub changed: bool,
}

pub struct SubscriptionUseCase<R>
where
    R: AccountRepository + SubscriptionRepository,
{
    repo: Arc<R>,
}

impl<R> SubscriptionUseCase<R>
where
    R: AccountRepository + SubscriptionRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn subscribe(
        &self,
        subscriber_id: &AccountId,
        channel_username: &str,
    ) -> IdentityResult<SubscriptionStatus> {
        let channel_id = self.resolve_channel(channel_username).await?;
        let edge = SubscriptionEdge::new(*subscriber_id, channel_id)?;

        let changed = self.repo.insert_subscription(&edge).await?;

        tracing::info!(
            subscriber_id = %subscriber_id,
            channel_id = %channel_id,
            changed,
            "Subscribed"
        );

        Ok(SubscriptionStatus {
            channel_id,
            subscribed: true,
            changed,
        })
    }

    pub async fn unsubscribe(
        &self,
        subscriber_id: &AccountId,
        channel_username: &str,
    ) -> IdentityResult<SubscriptionStatus> {
        let channel_id = self.resolve_channel(channel_username).await?;

        let changed = self
            .repo
            .delete_subscription(subscriber_id, &channel_id)
            .await?;

        tracing::info!(
            subscriber_id = %subscriber_id,
            channel_id = %channel_id,
            changed,
            "Unsubscribed"
        );

        Ok(SubscriptionStatus {
            channel_id,
            subscribed: false,
            changed,
        })
    }

    async fn resolve_channel(&self, channel_username: &str) -> IdentityResult<AccountId> {
        if channel_username.trim().is_empty() {
            return Err(IdentityError::Validation("Username is missing".into()));
        }

        // A name no account could hold names no channel.
        let username = Username::new(channel_username).map_err(|_| IdentityError::ChannelNotFound)?;

        self.repo
            .find_account_by_username(&username)
            .await?
            .map(|account| account.account_id)
            .ok_or(IdentityError::ChannelNotFound)
    }
}
