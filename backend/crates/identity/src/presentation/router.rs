//! Identity Router

use axum::extract::DefaultBodyLimit;
use axum::{
    Router, middleware,
    routing::{get, patch, post},
};
use platform::media::MediaStore;

use crate::application::config::IdentityConfig;
use crate::domain::repository::IdentityStore;
use crate::presentation::handlers::{self, IdentityAppState};
use crate::presentation::middleware::{identify_viewer, require_auth};

/// Upper bound for multipart requests carrying images
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Create the identity router for any repository and media store.
///
/// Mount it under `/api/v1/users`.
pub fn identity_router<R, M>(repo: R, media: M, config: IdentityConfig) -> Router
where
    R: IdentityStore,
    M: MediaStore + Sync + 'static,
{
    let state = IdentityAppState::new(repo, media, config);
    let guard = state.guard.clone();

    let public = Router::new()
        .route(
            "/register",
            post(handlers::register::<R, M>).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/login", post(handlers::login::<R, M>))
        .route("/refreshToken", post(handlers::refresh_token::<R, M>));

    let viewer_aware = Router::new()
        .route("/channel/{username}", get(handlers::channel_profile::<R, M>))
        .route_layer(middleware::from_fn_with_state(guard.clone(), identify_viewer));

    let protected = Router::new()
        .route("/logout", post(handlers::logout::<R, M>))
        .route("/password", post(handlers::change_password::<R, M>))
        .route("/current", get(handlers::current_account::<R, M>))
        .route("/account", patch(handlers::update_account::<R, M>))
        .route(
            "/avatar",
            patch(handlers::update_avatar::<R, M>).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/cover-image",
            patch(handlers::update_cover_image::<R, M>)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/history/{content_id}", post(handlers::record_watch::<R, M>))
        .route(
            "/channel/{username}/subscription",
            post(handlers::subscribe::<R, M>).delete(handlers::unsubscribe::<R, M>),
        )
        .route_layer(middleware::from_fn_with_state(guard, require_auth));

    public.merge(viewer_aware).merge(protected).with_state(state)
}
