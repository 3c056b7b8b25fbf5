//! HTTP Handlers

use std::sync::Arc;

use axum::Extension;
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, HeaderName, header};
use axum::response::{AppendHeaders, IntoResponse};
use kernel::error::app_error::AppError;
use kernel::id::ContentItemId;
use kernel::response::ApiResponse;
use platform::cookie::extract_cookie;
use platform::media::MediaStore;
use serde::de::DeserializeOwned;

use crate::application::config::IdentityConfig;
use crate::application::{
    AccountProfileUseCase, AuthGuard, ChangePasswordInput, ChangePasswordUseCase,
    ChannelProfileUseCase, LoginInput, LoginUseCase, Principal, RegisterInput, RegisterUseCase,
    SubscriptionUseCase, TokenPair, TokenService, UpdateDetailsInput,
};
use crate::domain::repository::IdentityStore;
use crate::error::{IdentityError, IdentityResult};
use crate::presentation::dto::{
    AccountResponse, ChangePasswordRequest, ChannelProfileResponse, LoginRequest, LoginResponse,
    RefreshRequest, SubscriptionResponse, TokenPairResponse, UpdateAccountRequest,
};
use crate::presentation::middleware::Viewer;
use crate::presentation::upload::{discard, spool_multipart};

/// Shared state for identity handlers
pub struct IdentityAppState<R, M> {
    pub repo: Arc<R>,
    pub media: Arc<M>,
    pub config: Arc<IdentityConfig>,
    pub guard: Arc<AuthGuard>,
}

impl<R, M> IdentityAppState<R, M> {
    pub fn new(repo: R, media: M, config: IdentityConfig) -> Self {
        let config = Arc::new(config);
        Self {
            repo: Arc::new(repo),
            media: Arc::new(media),
            guard: Arc::new(AuthGuard::new(config.clone())),
            config,
        }
    }
}

// Manual impl: a derive would require `R: Clone` and `M: Clone`.
impl<R, M> Clone for IdentityAppState<R, M> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            media: self.media.clone(),
            config: self.config.clone(),
            guard: self.guard.clone(),
        }
    }
}

type SessionCookies = AppendHeaders<[(HeaderName, String); 2]>;

fn session_cookies(config: &IdentityConfig, tokens: &TokenPair) -> SessionCookies {
    AppendHeaders([
        (
            header::SET_COOKIE,
            config.access_cookie().build_set_cookie(&tokens.access_token),
        ),
        (
            header::SET_COOKIE,
            config.refresh_cookie().build_set_cookie(&tokens.refresh_token),
        ),
    ])
}

fn cleared_cookies(config: &IdentityConfig) -> SessionCookies {
    AppendHeaders([
        (header::SET_COOKIE, config.access_cookie().build_delete_cookie()),
        (header::SET_COOKIE, config.refresh_cookie().build_delete_cookie()),
    ])
}

/// Parse an optional JSON body; an empty body is the default value
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> IdentityResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let parsed = serde_json::from_slice(body).map_err(AppError::from)?;
    Ok(parsed)
}

/// A request that is not multipart still answers with the error envelope
fn multipart_body(
    multipart: Result<Multipart, MultipartRejection>,
) -> IdentityResult<Multipart> {
    multipart.map_err(|rejection| IdentityError::Validation(rejection.body_text()))
}

// ============================================================================
// Registration & Session
// ============================================================================

/// POST /users/register
pub async fn register<R, M>(
    State(state): State<IdentityAppState<R, M>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> IdentityResult<impl IntoResponse>
where
    R: IdentityStore,
    M: MediaStore + Sync + 'static,
{
    let multipart = multipart_body(multipart)?;
    let form =
        spool_multipart(multipart, &state.config.upload_dir, &["avatar", "coverImage"]).await?;

    let input = RegisterInput {
        username: form.text("username"),
        full_name: form.text_any(&["fullname", "fullName"]),
        email: form.text("email"),
        password: form.text("password"),
        avatar: form.file("avatar"),
        cover_image: form.file("coverImage"),
    };

    let use_case = RegisterUseCase::new(state.repo.clone(), state.media.clone(), state.config.clone());
    let result = use_case.execute(input).await;
    discard(&form.paths()).await;

    Ok(ApiResponse::created(
        AccountResponse::from(result?),
        "User registered successfully",
    ))
}

/// POST /users/login
pub async fn login<R, M>(
    State(state): State<IdentityAppState<R, M>>,
    body: Bytes,
) -> IdentityResult<impl IntoResponse>
where
    R: IdentityStore,
    M: MediaStore + Sync + 'static,
{
    let req: LoginRequest = parse_body(&body)?;

    let use_case = LoginUseCase::new(state.repo.clone(), state.config.clone());
    let output = use_case
        .execute(LoginInput {
            username: req.username,
            email: req.email,
            password: req.password.unwrap_or_default(),
        })
        .await?;

    let cookies = session_cookies(&state.config, &output.tokens);

    Ok((
        cookies,
        ApiResponse::ok(
            LoginResponse {
                user: output.account.into(),
                access_token: output.tokens.access_token,
                refresh_token: output.tokens.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

/// POST /users/logout
pub async fn logout<R, M>(
    State(state): State<IdentityAppState<R, M>>,
    Extension(principal): Extension<Principal>,
) -> IdentityResult<impl IntoResponse>
where
    R: IdentityStore,
    M: MediaStore + Sync + 'static,
{
    let tokens = TokenService::new(state.repo.clone(), state.config.clone());
    tokens.revoke(&principal.account_id).await?;

    Ok((
        cleared_cookies(&state.config),
        ApiResponse::ok(serde_json::json!({}), "User logged out"),
    ))
}

/// POST /users/refreshToken
pub async fn refresh_token<R, M>(
    State(state): State<IdentityAppState<R, M>>,
    headers: HeaderMap,
    body: Bytes,
) -> IdentityResult<impl IntoResponse>
where
    R: IdentityStore,
    M: MediaStore + Sync + 'static,
{
    let presented = match extract_cookie(&headers, &state.config.refresh_cookie_name) {
        Some(token) => Some(token),
        None => parse_body::<RefreshRequest>(&body)?
            .refresh_token
            .filter(|t| !t.trim().is_empty()),
    };
    let presented = presented.ok_or(IdentityError::Unauthorized)?;

    let tokens = TokenService::new(state.repo.clone(), state.config.clone())
        .rotate(&presented)
        .await?;

    let cookies = session_cookies(&state.config, &tokens);

    Ok((
        cookies,
        ApiResponse::ok(
            TokenPairResponse {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            },
            "Access token refreshed",
        ),
    ))
}

/// POST /users/password
pub async fn change_password<R, M>(
    State(state): State<IdentityAppState<R, M>>,
    Extension(principal): Extension<Principal>,
    body: Bytes,
) -> IdentityResult<impl IntoResponse>
where
    R: IdentityStore,
    M: MediaStore + Sync + 'static,
{
    let req: ChangePasswordRequest = parse_body(&body)?;

    ChangePasswordUseCase::new(state.repo.clone(), state.config.clone())
        .execute(
            &principal.account_id,
            ChangePasswordInput {
                old_password: req.old_password.unwrap_or_default(),
                new_password: req.new_password.unwrap_or_default(),
            },
        )
        .await?;

    Ok(ApiResponse::ok(
        serde_json::json!({}),
        "Password changed successfully",
    ))
}

// ============================================================================
// Own Account
// ============================================================================

/// GET /users/current
pub async fn current_account<R, M>(
    State(state): State<IdentityAppState<R, M>>,
    Extension(principal): Extension<Principal>,
) -> IdentityResult<impl IntoResponse>
where
    R: IdentityStore,
    M: MediaStore + Sync + 'static,
{
    let account = AccountProfileUseCase::new(state.repo.clone(), state.media.clone())
        .current(&principal.account_id)
        .await?;

    Ok(ApiResponse::ok(
        AccountResponse::from(account),
        "User fetched successfully",
    ))
}

/// PATCH /users/account
pub async fn update_account<R, M>(
    State(state): State<IdentityAppState<R, M>>,
    Extension(principal): Extension<Principal>,
    body: Bytes,
) -> IdentityResult<impl IntoResponse>
where
    R: IdentityStore,
    M: MediaStore + Sync + 'static,
{
    let req: UpdateAccountRequest = parse_body(&body)?;

    let account = AccountProfileUseCase::new(state.repo.clone(), state.media.clone())
        .update_details(
            &principal.account_id,
            UpdateDetailsInput {
                full_name: req.full_name.unwrap_or_default(),
                email: req.email.unwrap_or_default(),
            },
        )
        .await?;

    Ok(ApiResponse::ok(
        AccountResponse::from(account),
        "Account details updated successfully",
    ))
}

/// PATCH /users/avatar
pub async fn update_avatar<R, M>(
    State(state): State<IdentityAppState<R, M>>,
    Extension(principal): Extension<Principal>,
    multipart: Result<Multipart, MultipartRejection>,
) -> IdentityResult<impl IntoResponse>
where
    R: IdentityStore,
    M: MediaStore + Sync + 'static,
{
    let multipart = multipart_body(multipart)?;
    let form = spool_multipart(multipart, &state.config.upload_dir, &["avatar"]).await?;

    let result = AccountProfileUseCase::new(state.repo.clone(), state.media.clone())
        .update_avatar(&principal.account_id, form.file("avatar"))
        .await;
    discard(&form.paths()).await;

    Ok(ApiResponse::ok(
        AccountResponse::from(result?),
        "Avatar image updated successfully",
    ))
}

/// PATCH /users/cover-image
pub async fn update_cover_image<R, M>(
    State(state): State<IdentityAppState<R, M>>,
    Extension(principal): Extension<Principal>,
    multipart: Result<Multipart, MultipartRejection>,
) -> IdentityResult<impl IntoResponse>
where
    R: IdentityStore,
    M: MediaStore + Sync + 'static,
{
    let multipart = multipart_body(multipart)?;
    let form = spool_multipart(multipart, &state.config.upload_dir, &["coverImage"]).await?;

    let result = AccountProfileUseCase::new(state.repo.clone(), state.media.clone())
        .update_cover_image(&principal.account_id, form.file("coverImage"))
        .await;
    discard(&form.paths()).await;

    Ok(ApiResponse::ok(
        AccountResponse::from(result?),
        "Cover image updated successfully",
    ))
}

/// POST /users/history/{content_id}
pub async fn record_watch<R, M>(
    State(state): State<IdentityAppState<R, M>>,
    Extension(principal): Extension<Principal>,
    Path(content_id): Path<String>,
) -> IdentityResult<impl IntoResponse>
where
    R: IdentityStore,
    M: MediaStore + Sync + 'static,
{
    let item: ContentItemId = content_id
        .parse()
        .map_err(|_| IdentityError::Validation("Invalid content id".into()))?;

    let account = AccountProfileUseCase::new(state.repo.clone(), state.media.clone())
        .record_watch(&principal.account_id, &item)
        .await?;

    Ok(ApiResponse::ok(
        AccountResponse::from(account).watch_history,
        "Watch history updated",
    ))
}

// ============================================================================
// Channels
// ============================================================================

/// GET /users/channel/{username}
pub async fn channel_profile<R, M>(
    State(state): State<IdentityAppState<R, M>>,
    Extension(viewer): Extension<Viewer>,
    Path(username): Path<String>,
) -> IdentityResult<impl IntoResponse>
where
    R: IdentityStore,
    M: MediaStore + Sync + 'static,
{
    let viewer_id = viewer.0.as_ref().map(|p| p.account_id);

    let profile = ChannelProfileUseCase::new(state.repo.clone())
        .execute(&username, viewer_id.as_ref())
        .await?;

    Ok(ApiResponse::ok(
        ChannelProfileResponse::from(profile),
        "User channel fetched successfully",
    ))
}

/// POST /users/channel/{username}/subscription
pub async fn subscribe<R, M>(
    State(state): State<IdentityAppState<R, M>>,
    Extension(principal): Extension<Principal>,
    Path(username): Path<String>,
) -> IdentityResult<impl IntoResponse>
where
    R: IdentityStore,
    M: MediaStore + Sync + 'static,
{
    let status = SubscriptionUseCase::new(state.repo.clone())
        .subscribe(&principal.account_id, &username)
        .await?;

    Ok(ApiResponse::ok(
        SubscriptionResponse::from(status),
        "Subscribed successfully",
    ))
}

/// DELETE /users/channel/{username}/subscription
pub async fn unsubscribe<R, M>(
    State(state): State<IdentityAppState<R, M>>,
    Extension(principal): Extension<Principal>,
    Path(username): Path<String>,
) -> IdentityResult<impl IntoResponse>
where
    R: IdentityStore,
    M: MediaStore + Sync + 'static,
{
    let status = SubscriptionUseCase::new(state.repo.clone())
        .unsubscribe(&principal.account_id, &username)
        .await?;

    Ok(ApiResponse::ok(
        SubscriptionResponse::from(status),
        "Unsubscribed successfully",
    ))
}
