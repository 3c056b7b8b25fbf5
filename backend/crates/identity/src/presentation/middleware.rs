//! Auth Middleware
//!
//! Resolves the caller before a handler runs and stores the result in the
//! request extensions.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::application::auth_guard::{AuthGuard, Principal};
use crate::error::IdentityError;

/// Optional caller, for routes that work with or without a session
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<Principal>);

/// Middleware that requires a valid access token.
///
/// Inserts the [`Principal`] on success; answers 401 otherwise.
pub async fn require_auth(
    State(guard): State<Arc<AuthGuard>>,
    mut req: Request,
    next: Next,
) -> Result<Response, IdentityError> {
    let principal = guard.authorize_headers(req.headers())?;
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Middleware that identifies the caller if it can, and never rejects.
pub async fn identify_viewer(
    State(guard): State<Arc<AuthGuard>>,
    mut req: Request,
    next: Next,
) -> Response {
    let principal = guard.authorize_headers(req.headers()).ok();
    req.extensions_mut().insert(Viewer(principal));
    next.run(req).await
}
