//! Application Layer
//!
//! Use cases and application services.

pub mod account_profile;
pub mod auth_guard;
pub mod change_password;
pub mod channel_profile;
pub mod config;
pub mod login;
pub mod register;
pub mod subscription;
pub mod token_service;

pub use account_profile::{AccountProfileUseCase, UpdateDetailsInput};
pub use auth_guard::{AuthGuard, Principal};
pub use change_password::{ChangePasswordInput, ChangePasswordUseCase};
pub use channel_profile::ChannelProfileUseCase;
pub use config::IdentityConfig;
pub use login::{LoginInput, LoginOutput, LoginUseCase};
pub use register::{RegisterInput, RegisterUseCase};
pub use subscription::{SubscriptionStatus, SubscriptionUseCase};
pub use token_service::{AccessClaims, RefreshClaims, TokenCodec, TokenPair, TokenService};
