//! Presentation Layer
//!
//! HTTP handlers, DTOs, multipart spooling, router, and middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod upload;

pub use handlers::IdentityAppState;
pub use middleware::{Viewer, identify_viewer, require_auth};
pub use router::identity_router;
