//! Identity Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Use cases, token service, auth guard
//! - `infra/` - PostgreSQL and in-memory repositories
//! - `presentation/` - HTTP handlers, DTOs, router, middleware
//!
//! ## Features
//! - Registration with avatar (required) and cover image (optional) uploads
//! - Login by username or email
//! - JWT access/refresh token pair; refresh tokens rotate on use and a
//!   superseded token is rejected
//! - One active session per account: a new login ends the previous one
//! - Channel profiles with subscriber and subscription counts
//!
//! ## Security Model
//! - Passwords hashed with Argon2id
//! - Access and refresh tokens signed with distinct keys
//! - Only a SHA-256 digest of the active refresh token is stored
//! - Rotation is a compare-and-swap on that digest

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::config::IdentityConfig;
pub use error::{IdentityError, IdentityResult};
pub use infra::memory::InMemoryIdentityRepository;
pub use infra::postgres::PgIdentityRepository;
pub use presentation::router::identity_router;
