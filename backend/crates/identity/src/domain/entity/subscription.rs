//! Subscription Edge
//!
//! Directed "subscriber follows channel" relationship.

use chrono::{DateTime, Utc};
use kernel::id::AccountId;

use crate::error::{IdentityError, IdentityResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionEdge {
    pub subscriber_id: AccountId,
    pub channel_id: AccountId,
    pub created_at: DateTime<Utc>,
}

impl SubscriptionEdge {
    /// Rejects self-subscription
    pub fn new(subscriber_id: AccountId, channel_id: AccountId) -> IdentityResult<Self> {
        if subscriber_id == channel_id {
            return Err(IdentityError::Validation(
                "You cannot subscribe to your own channel".into(),
            ));
        }

        Ok(Self {
            subscriber_id,
            channel_id,
            created_at: Utc::now(),
        })
    }
}
