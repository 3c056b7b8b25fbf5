//! Entity Module

pub mod account;
pub mod channel_profile;
pub mod credentials;
pub mod subscription;
