//! API DTOs (Data Transfer Objects)
//!
//! Request fields are optional so that a missing field reaches the use case
//! and fails as a validation error inside the standard envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::SubscriptionStatus;
use crate::domain::entity::{account::Account, channel_profile::ChannelProfile};

// ============================================================================
// Requests
// ============================================================================

/// Login request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Refresh request; the cookie takes precedence
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Change password request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

/// Update account details request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateAccountRequest {
    #[serde(alias = "fullname")]
    pub full_name: Option<String>,
    pub email: Option<String>,
}

// ============================================================================
// Responses
// ============================================================================

/// Account as seen by its owner
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub watch_history: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.account_id.to_string(),
            username: account.username.into_db(),
            email: account.email.into_db(),
            full_name: account.full_name.to_string(),
            avatar: account.avatar_url,
            cover_image: account.cover_image_url,
            watch_history: account
                .watch_history
                .iter()
                .map(ToString::to_string)
                .collect(),
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Login response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: AccountResponse,
    pub access_token: String,
    pub refresh_token: String,
}

/// Refresh response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Public channel view
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfileResponse {
    pub id: String,
    pub full_name: String,
    pub username: String,
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub email: String,
}

impl From<ChannelProfile> for ChannelProfileResponse {
    fn from(profile: ChannelProfile) -> Self {
        Self {
            id: profile.account_id.to_string(),
            full_name: profile.full_name,
            username: profile.username,
            subscribers_count: profile.subscriber_count,
            channels_subscribed_to_count: profile.subscribed_to_count,
            is_subscribed: profile.is_subscribed,
            avatar: profile.avatar_url,
            cover_image: profile.cover_image_url,
            email: profile.email,
        }
    }
}

/// Subscription change result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub channel_id: String,
    pub subscribed: bool,
}

impl From<SubscriptionStatus> for SubscriptionResponse {
    fn from(status: SubscriptionStatus) -> Self {
        Self {
            channel_id: status.channel_id.to_string(),
            subscribed: status.subscribed,
        }
    }
}
