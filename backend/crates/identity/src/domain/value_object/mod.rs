//! Value Object Module

pub mod email;
pub mod full_name;
pub mod token_digest;
pub mod user_password;
pub mod username;
