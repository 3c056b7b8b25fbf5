//! Channel Profile Use Case
//!
//! Public view of an account as a channel, for an optional viewer.

use std::sync::Arc;

use kernel::id::AccountId;

use crate::domain::entity::channel_profile::ChannelProfile;
use crate::domain::repository::SubscriptionRepository;
use crate::domain::value_object::username::Username;
use crate::error::{IdentityError, IdentityResult};

pub struct ChannelProfileUseCase<R>
where
    R: SubscriptionRepository,
{
    repo: Arc<R>,
}

impl<R> ChannelProfileUseCase<R>
where
    R: SubscriptionRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// `is_subscribed` is false whenever `viewer` is `None`.
    pub async fn execute(
        &self,
        username: &str,
        viewer: Option<&AccountId>,
    ) -> IdentityResult<ChannelProfile> {
        if username.trim().is_empty() {
            return Err(IdentityError::Validation("Username is missing".into()));
        }

        // A name no account could hold names no channel.
        let username = Username::new(username).map_err(|_| IdentityError::ChannelNotFound)?;

        self.repo
            .load_channel_profile(&username, viewer)
            .await?
            .ok_or(IdentityError::ChannelNotFound)
    }
}
