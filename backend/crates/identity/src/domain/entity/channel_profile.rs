//! Channel Profile
//!
//! Read model of an account seen as a channel, with its subscription counts
//! and the viewer's relation to it.

use kernel::id::AccountId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelProfile {
    pub account_id: AccountId,
    pub full_name: String,
    pub username: String,
    /// Accounts following this channel
    pub subscriber_count: i64,
    /// Channels this account follows
    pub subscribed_to_count: i64,
    /// Whether the viewer follows this channel; false for anonymous viewers
    pub is_subscribed: bool,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub email: String,
}
