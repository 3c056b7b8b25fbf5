//! Use-case, token lifecycle and HTTP tests against the in-memory store.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use kernel::id::{AccountId, ContentItemId};
use platform::media::{MediaError, MediaStore, UploadedMedia};

use crate::application::{
    AccountProfileUseCase, ChangePasswordInput, ChangePasswordUseCase, ChannelProfileUseCase,
    LoginInput, LoginOutput, LoginUseCase, RegisterInput, RegisterUseCase, SubscriptionUseCase,
    TokenCodec, TokenService, UpdateDetailsInput,
};
use crate::domain::entity::account::Account;
use crate::domain::repository::{AccountRepository, CredentialRepository, SubscriptionRepository};
use crate::domain::value_object::{email::Email, username::Username};
use crate::{IdentityConfig, IdentityError, IdentityResult, InMemoryIdentityRepository};

const PASSWORD: &str = "Secret123!";

// ============================================================================
// Fixtures
// ============================================================================

/// Media store that never touches the network
#[derive(Clone, Default)]
struct FakeMediaStore {
    /// Uploads whose file name contains one of these fail
    fail_on: Vec<&'static str>,
    uploaded: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeMediaStore {
    fn failing_on(fail_on: &[&'static str]) -> Self {
        Self {
            fail_on: fail_on.to_vec(),
            ..Self::default()
        }
    }

    fn upload_count(&self) -> usize {
        self.uploaded.lock().unwrap().len()
    }
}

impl MediaStore for FakeMediaStore {
    async fn upload(&self, local_path: &Path) -> Result<UploadedMedia, MediaError> {
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if self.fail_on.iter().any(|needle| name.contains(needle)) {
            return Err(MediaError::Rejected(502));
        }

        self.uploaded.lock().unwrap().push(local_path.to_path_buf());
        Ok(UploadedMedia {
            url: format!("https://media.test/{}", name),
            public_id: None,
        })
    }
}

struct Harness {
    repo: Arc<InMemoryIdentityRepository>,
    media: Arc<FakeMediaStore>,
    config: Arc<IdentityConfig>,
}

impl Harness {
    fn new() -> Self {
        Self::with_media(FakeMediaStore::default())
    }

    fn with_media(media: FakeMediaStore) -> Self {
        Self {
            repo: Arc::new(InMemoryIdentityRepository::new()),
            media: Arc::new(media),
            config: Arc::new(IdentityConfig::development()),
        }
    }

    fn input(username: &str) -> RegisterInput {
        RegisterInput {
            username: username.to_string(),
            full_name: format!("{} Example", username),
            email: format!("{}@example.com", username),
            password: PASSWORD.to_string(),
            avatar: Some(PathBuf::from(format!("{}-avatar.png", username))),
            cover_image: None,
        }
    }

    async fn register_with(&self, input: RegisterInput) -> IdentityResult<Account> {
        RegisterUseCase::new(self.repo.clone(), self.media.clone(), self.config.clone())
            .execute(input)
            .await
    }

    async fn register(&self, username: &str) -> Account {
        self.register_with(Self::input(username)).await.unwrap()
    }

    async fn login(&self, username: &str, password: &str) -> IdentityResult<LoginOutput> {
        LoginUseCase::new(self.repo.clone(), self.config.clone())
            .execute(LoginInput {
                username: Some(username.to_string()),
                email: None,
                password: password.to_string(),
            })
            .await
    }

    fn tokens(&self) -> TokenService<InMemoryIdentityRepository> {
        TokenService::new(self.repo.clone(), self.config.clone())
    }

    fn subscriptions(&self) -> SubscriptionUseCase<InMemoryIdentityRepository> {
        SubscriptionUseCase::new(self.repo.clone())
    }

    fn channels(&self) -> ChannelProfileUseCase<InMemoryIdentityRepository> {
        ChannelProfileUseCase::new(self.repo.clone())
    }

    fn profiles(&self) -> AccountProfileUseCase<InMemoryIdentityRepository, FakeMediaStore> {
        AccountProfileUseCase::new(self.repo.clone(), self.media.clone())
    }
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn register_normalizes_and_stores_account() {
    let h = Harness::new();
    let account = h
        .register_with(RegisterInput {
            username: "  Alice ".into(),
            email: " Alice@Example.COM".into(),
            ..Harness::input("alice")
        })
        .await
        .unwrap();

    assert_eq!(account.username.as_str(), "alice");
    assert_eq!(account.email.as_str(), "alice@example.com");
    assert_eq!(account.avatar_url, "https://media.test/alice-avatar.png");
    assert!(account.cover_image_url.is_none());

    let stored = h
        .repo
        .find_account_by_id(&account.account_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.username, account.username);

    let credentials = h
        .repo
        .find_credentials(&account.account_id)
        .await
        .unwrap()
        .unwrap();
    assert!(!credentials.password_hash.as_phc_string().contains(PASSWORD));
    assert!(credentials.refresh_token.is_none());
}

#[tokio::test]
async fn register_duplicate_username_or_email_fails() {
    let h = Harness::new();
    h.register("alice").await;

    let same_username = RegisterInput {
        email: "other@example.com".into(),
        ..Harness::input("ALICE")
    };
    assert!(matches!(
        h.register_with(same_username).await,
        Err(IdentityError::DuplicateIdentity)
    ));

    let same_email = RegisterInput {
        email: "alice@example.com".into(),
        ..Harness::input("alice2")
    };
    assert!(matches!(
        h.register_with(same_email).await,
        Err(IdentityError::DuplicateIdentity)
    ));
}

#[tokio::test]
async fn register_blank_field_fails_before_any_write() {
    let h = Harness::new();

    for blank in ["username", "fullname", "email", "password"] {
        let mut input = Harness::input("alice");
        match blank {
            "username" => input.username = "   ".into(),
            "fullname" => input.full_name = String::new(),
            "email" => input.email = "\t".into(),
            _ => input.password = " ".into(),
        }

        match h.register_with(input).await {
            Err(IdentityError::Validation(msg)) => assert!(msg.contains(blank), "{}", msg),
            other => panic!("expected validation error, got {:?}", other.map(|a| a.username)),
        }
    }

    assert_eq!(h.media.upload_count(), 0);
    assert!(
        !h.repo
            .account_exists(
                &Username::new("alice").unwrap(),
                &Email::new("alice@example.com").unwrap()
            )
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn register_requires_avatar() {
    let h = Harness::new();
    let input = RegisterInput {
        avatar: None,
        ..Harness::input("alice")
    };

    assert!(matches!(
        h.register_with(input).await,
        Err(IdentityError::Validation(_))
    ));
}

#[tokio::test]
async fn register_avatar_upload_failure_creates_nothing() {
    let h = Harness::with_media(FakeMediaStore::failing_on(&["avatar"]));

    assert!(matches!(
        h.register_with(Harness::input("alice")).await,
        Err(IdentityError::UploadFailed(_))
    ));
    assert!(h.login("alice", PASSWORD).await.is_err());
}

#[tokio::test]
async fn register_cover_upload_failure_is_tolerated() {
    let h = Harness::with_media(FakeMediaStore::failing_on(&["cover"]));
    let input = RegisterInput {
        cover_image: Some(PathBuf::from("alice-cover.png")),
        ..Harness::input("alice")
    };

    let account = h.register_with(input).await.unwrap();
    assert!(account.cover_image_url.is_none());
}

// ============================================================================
// Login & AuthGuard
// ============================================================================

#[tokio::test]
async fn login_then_authorize_yields_the_account() {
    let h = Harness::new();
    let account = h.register("alice").await;

    let output = h.login("alice", PASSWORD).await.unwrap();
    assert_eq!(output.account.account_id, account.account_id);

    let guard = crate::application::AuthGuard::new(h.config.clone());
    let principal = guard.authorize(Some(&output.tokens.access_token)).unwrap();
    assert_eq!(principal.account_id, account.account_id);
    assert_eq!(principal.email, "alice@example.com");
}

#[tokio::test]
async fn login_by_email() {
    let h = Harness::new();
    let account = h.register("alice").await;

    let output = LoginUseCase::new(h.repo.clone(), h.config.clone())
        .execute(LoginInput {
            username: None,
            email: Some("ALICE@example.com".into()),
            password: PASSWORD.into(),
        })
        .await
        .unwrap();
    assert_eq!(output.account.account_id, account.account_id);
}

#[tokio::test]
async fn login_failures() {
    let h = Harness::new();
    h.register("alice").await;

    assert!(matches!(
        h.login("alice", "Wrong123!").await,
        Err(IdentityError::InvalidCredentials)
    ));
    assert!(matches!(
        h.login("nobody", PASSWORD).await,
        Err(IdentityError::AccountNotFound)
    ));

    let no_identity = LoginUseCase::new(h.repo.clone(), h.config.clone())
        .execute(LoginInput {
            username: Some("  ".into()),
            email: None,
            password: PASSWORD.into(),
        })
        .await;
    assert!(matches!(no_identity, Err(IdentityError::Validation(_))));
}

// ============================================================================
// Token lifecycle
// ============================================================================

#[tokio::test]
async fn refresh_succeeds_once_per_token() {
    let h = Harness::new();
    h.register("alice").await;

    // A1/R1
    let first = h.login("alice", PASSWORD).await.unwrap().tokens;

    // A2/R2, R1 is dead from here on
    let second = h.tokens().rotate(&first.refresh_token).await.unwrap();
    assert_ne!(second.refresh_token, first.refresh_token);

    assert!(matches!(
        h.tokens().rotate(&first.refresh_token).await,
        Err(IdentityError::TokenReuseOrMismatch)
    ));

    // The live token still works
    assert!(h.tokens().rotate(&second.refresh_token).await.is_ok());
}

#[tokio::test]
async fn new_login_ends_previous_session() {
    let h = Harness::new();
    h.register("alice").await;

    let laptop = h.login("alice", PASSWORD).await.unwrap().tokens;
    let phone = h.login("alice", PASSWORD).await.unwrap().tokens;

    assert!(matches!(
        h.tokens().rotate(&laptop.refresh_token).await,
        Err(IdentityError::TokenReuseOrMismatch)
    ));
    assert!(h.tokens().rotate(&phone.refresh_token).await.is_ok());
}

#[tokio::test]
async fn revoke_is_idempotent_and_kills_refresh() {
    let h = Harness::new();
    let account = h.register("alice").await;
    let pair = h.login("alice", PASSWORD).await.unwrap().tokens;

    h.tokens().revoke(&account.account_id).await.unwrap();
    h.tokens().revoke(&account.account_id).await.unwrap();
    h.tokens().revoke(&AccountId::new()).await.unwrap();

    assert!(matches!(
        h.tokens().rotate(&pair.refresh_token).await,
        Err(IdentityError::TokenReuseOrMismatch)
    ));
}

#[tokio::test]
async fn rotate_rejects_bad_tokens() {
    let h = Harness::new();
    let account = h.register("alice").await;
    let pair = h.login("alice", PASSWORD).await.unwrap().tokens;

    assert!(matches!(
        h.tokens().rotate("garbage").await,
        Err(IdentityError::TokenMalformed)
    ));

    // An access token is signed with the other key
    assert!(matches!(
        h.tokens().rotate(&pair.access_token).await,
        Err(IdentityError::TokenInvalid)
    ));

    let orphan = TokenCodec::new(h.config.clone())
        .encode_refresh(&AccountId::new())
        .unwrap();
    assert!(matches!(
        h.tokens().rotate(&orphan).await,
        Err(IdentityError::StaleAccount)
    ));

    let now = jsonwebtoken::get_current_timestamp();
    let expired = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &crate::application::RefreshClaims {
            sub: account.account_id,
            iat: now - 7200,
            exp: now - 3600,
            jti: "expired".into(),
        },
        &jsonwebtoken::EncodingKey::from_secret(&h.config.refresh_token_secret),
    )
    .unwrap();
    assert!(matches!(
        h.tokens().rotate(&expired).await,
        Err(IdentityError::TokenExpired)
    ));
}

#[tokio::test]
async fn verify_access_rejects_expired_and_tampered() {
    let h = Harness::new();
    let account = h.register("alice").await;
    let pair = h.login("alice", PASSWORD).await.unwrap().tokens;

    assert_eq!(
        h.tokens().verify_access(&pair.access_token).unwrap().sub,
        account.account_id
    );

    // Flip one character in the middle of the signature
    let at = pair.access_token.rfind('.').unwrap() + 10;
    let mut tampered = pair.access_token.clone().into_bytes();
    tampered[at] = if tampered[at] == b'x' { b'y' } else { b'x' };
    let tampered = String::from_utf8(tampered).unwrap();
    assert!(matches!(
        h.tokens().verify_access(&tampered),
        Err(IdentityError::TokenInvalid)
    ));

    let now = jsonwebtoken::get_current_timestamp();
    let expired = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &crate::application::AccessClaims {
            sub: account.account_id,
            email: "alice@example.com".into(),
            username: "alice".into(),
            full_name: "Alice".into(),
            iat: now - 7200,
            exp: now - 3600,
            jti: "expired".into(),
        },
        &jsonwebtoken::EncodingKey::from_secret(&h.config.access_token_secret),
    )
    .unwrap();
    assert!(matches!(
        h.tokens().verify_access(&expired),
        Err(IdentityError::TokenExpired)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_rotation_has_exactly_one_winner() {
    let h = Harness::new();
    h.register("alice").await;
    let pair = h.login("alice", PASSWORD).await.unwrap().tokens;

    let service = Arc::new(h.tokens());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            let token = pair.refresh_token.clone();
            tokio::spawn(async move { service.rotate(&token).await })
        })
        .collect();

    let (mut wins, mut rejected) = (0, 0);
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            Err(IdentityError::TokenReuseOrMismatch) => rejected += 1,
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert_eq!(wins, 1);
    assert_eq!(rejected, 7);
}

// ============================================================================
// Password & profile
// ============================================================================

#[tokio::test]
async fn change_password_flow() {
    let h = Harness::new();
    let account = h.register("alice").await;
    let use_case = ChangePasswordUseCase::new(h.repo.clone(), h.config.clone());

    let wrong_old = use_case
        .execute(
            &account.account_id,
            ChangePasswordInput {
                old_password: "Nope1234!".into(),
                new_password: "Another123!".into(),
            },
        )
        .await;
    assert!(matches!(wrong_old, Err(IdentityError::InvalidCredentials)));

    let too_short = use_case
        .execute(
            &account.account_id,
            ChangePasswordInput {
                old_password: PASSWORD.into(),
                new_password: "short".into(),
            },
        )
        .await;
    assert!(matches!(too_short, Err(IdentityError::Validation(_))));

    use_case
        .execute(
            &account.account_id,
            ChangePasswordInput {
                old_password: PASSWORD.into(),
                new_password: "Another123!".into(),
            },
        )
        .await
        .unwrap();

    assert!(h.login("alice", "Another123!").await.is_ok());
    assert!(matches!(
        h.login("alice", PASSWORD).await,
        Err(IdentityError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn profile_updates_never_touch_the_password_hash() {
    let h = Harness::new();
    let account = h.register("alice").await;
    let before = h
        .repo
        .find_credentials(&account.account_id)
        .await
        .unwrap()
        .unwrap()
        .password_hash;

    let profiles = h.profiles();
    let updated = profiles
        .update_details(
            &account.account_id,
            UpdateDetailsInput {
                full_name: "Alice Liddell".into(),
                email: "liddell@example.com".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.email.as_str(), "liddell@example.com");

    profiles
        .update_avatar(&account.account_id, Some(PathBuf::from("new-avatar.png")))
        .await
        .unwrap();
    profiles
        .update_cover_image(&account.account_id, Some(PathBuf::from("new-cover.png")))
        .await
        .unwrap();

    let after = h
        .repo
        .find_credentials(&account.account_id)
        .await
        .unwrap()
        .unwrap()
        .password_hash;
    assert_eq!(before.as_phc_string(), after.as_phc_string());

    let current = profiles.current(&account.account_id).await.unwrap();
    assert_eq!(current.full_name.as_str(), "Alice Liddell");
    assert_eq!(current.avatar_url, "https://media.test/new-avatar.png");
    assert_eq!(
        current.cover_image_url.as_deref(),
        Some("https://media.test/new-cover.png")
    );
}

#[tokio::test]
async fn profile_update_validation() {
    let h = Harness::new();
    let alice = h.register("alice").await;
    h.register("bob").await;
    let profiles = h.profiles();

    let blank = profiles
        .update_details(
            &alice.account_id,
            UpdateDetailsInput {
                full_name: "Alice".into(),
                email: " ".into(),
            },
        )
        .await;
    assert!(matches!(blank, Err(IdentityError::Validation(_))));

    let taken = profiles
        .update_details(
            &alice.account_id,
            UpdateDetailsInput {
                full_name: "Alice".into(),
                email: "bob@example.com".into(),
            },
        )
        .await;
    assert!(matches!(taken, Err(IdentityError::DuplicateIdentity)));

    assert!(matches!(
        profiles.update_avatar(&alice.account_id, None).await,
        Err(IdentityError::Validation(_))
    ));
}

#[tokio::test]
async fn watch_history_moves_rewatched_items_to_the_end() {
    let h = Harness::new();
    let account = h.register("alice").await;
    let (first, second) = (ContentItemId::new(), ContentItemId::new());
    let profiles = h.profiles();

    profiles.record_watch(&account.account_id, &first).await.unwrap();
    profiles.record_watch(&account.account_id, &second).await.unwrap();
    let current = profiles.record_watch(&account.account_id, &first).await.unwrap();

    assert_eq!(current.watch_history, vec![second, first]);
    assert!(matches!(
        profiles.record_watch(&AccountId::new(), &first).await,
        Err(IdentityError::AccountNotFound)
    ));
}

// ============================================================================
// Subscription graph & channel profile
// ============================================================================

#[tokio::test]
async fn channel_profile_counts_and_viewer_relation() {
    let h = Harness::new();
    let alice = h.register("alice").await;
    let bob = h.register("bob").await;
    let carol = h.register("carol").await;
    let dave = h.register("dave").await;

    let subs = h.subscriptions();
    subs.subscribe(&bob.account_id, "alice").await.unwrap();
    subs.subscribe(&carol.account_id, "alice").await.unwrap();
    subs.subscribe(&alice.account_id, "dave").await.unwrap();

    let for_bob = h
        .channels()
        .execute("  ALICE ", Some(&bob.account_id))
        .await
        .unwrap();
    assert_eq!(for_bob.account_id, alice.account_id);
    assert_eq!(for_bob.subscriber_count, 2);
    assert_eq!(for_bob.subscribed_to_count, 1);
    assert!(for_bob.is_subscribed);

    let for_dave = h
        .channels()
        .execute("alice", Some(&dave.account_id))
        .await
        .unwrap();
    assert!(!for_dave.is_subscribed);

    let anonymous = h.channels().execute("alice", None).await.unwrap();
    assert!(!anonymous.is_subscribed);
    assert_eq!(anonymous.email, "alice@example.com");
}

#[tokio::test]
async fn graph_degrees_follow_edges() {
    let h = Harness::new();
    let alice = h.register("alice").await;
    let bob = h.register("bob").await;
    let carol = h.register("carol").await;

    let subs = h.subscriptions();
    subs.subscribe(&bob.account_id, "alice").await.unwrap();
    subs.subscribe(&bob.account_id, "carol").await.unwrap();
    subs.subscribe(&carol.account_id, "alice").await.unwrap();

    assert_eq!(h.repo.in_degree(&alice.account_id).await.unwrap(), 2);
    assert_eq!(h.repo.out_degree(&bob.account_id).await.unwrap(), 2);
    assert_eq!(h.repo.out_degree(&alice.account_id).await.unwrap(), 0);
    assert!(h.repo.has_edge(&bob.account_id, &alice.account_id).await.unwrap());
    assert!(!h.repo.has_edge(&alice.account_id, &bob.account_id).await.unwrap());
}

#[tokio::test]
async fn channel_profile_lookup_failures() {
    let h = Harness::new();

    assert!(matches!(
        h.channels().execute("   ", None).await,
        Err(IdentityError::Validation(_))
    ));
    assert!(matches!(
        h.channels().execute("ghost", None).await,
        Err(IdentityError::ChannelNotFound)
    ));

    // Names no account could ever hold are simply unknown channels
    let too_long = "x".repeat(31);
    for name in ["ab", "zoë", "no spaces allowed", too_long.as_str()] {
        assert!(
            matches!(
                h.channels().execute(name, None).await,
                Err(IdentityError::ChannelNotFound)
            ),
            "{}",
            name
        );
    }
}

#[tokio::test]
async fn subscription_rules() {
    let h = Harness::new();
    let alice = h.register("alice").await;
    let bob = h.register("bob").await;
    let subs = h.subscriptions();

    assert!(matches!(
        subs.subscribe(&alice.account_id, "alice").await,
        Err(IdentityError::Validation(_))
    ));
    assert!(matches!(
        subs.subscribe(&alice.account_id, "ghost").await,
        Err(IdentityError::ChannelNotFound)
    ));
    assert!(matches!(
        subs.subscribe(&alice.account_id, "ab").await,
        Err(IdentityError::ChannelNotFound)
    ));
    assert!(matches!(
        subs.unsubscribe(&alice.account_id, "zoë").await,
        Err(IdentityError::ChannelNotFound)
    ));

    assert!(subs.subscribe(&bob.account_id, "alice").await.unwrap().changed);
    assert!(!subs.subscribe(&bob.account_id, "alice").await.unwrap().changed);
    assert_eq!(
        h.channels().execute("alice", None).await.unwrap().subscriber_count,
        1
    );

    assert!(subs.unsubscribe(&bob.account_id, "alice").await.unwrap().changed);
    assert!(!subs.unsubscribe(&bob.account_id, "alice").await.unwrap().changed);
    assert_eq!(
        h.channels().execute("alice", None).await.unwrap().subscriber_count,
        0
    );
}

// ============================================================================
// HTTP
// ============================================================================

mod http {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, Response, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    struct App {
        router: Router,
        seed: Harness,
    }

    /// Router and harness sharing one store
    fn app() -> App {
        app_with(FakeMediaStore::default())
    }

    fn app_with(media: FakeMediaStore) -> App {
        let seed = Harness::with_media(media);
        let router = crate::identity_router(
            (*seed.repo).clone(),
            (*seed.media).clone(),
            (*seed.config).clone(),
        );
        App { router, seed }
    }

    async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Vec<String>, Value) {
        let response: Response<Body> = router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, cookies, body)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn authed(method: &str, uri: &str, access_token: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, format!("accessToken={}", access_token))
            .body(Body::empty())
            .unwrap()
    }

    fn cookie_value(cookies: &[String], name: &str) -> Option<String> {
        cookies.iter().find_map(|c| {
            c.strip_prefix(&format!("{}=", name))
                .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
        })
    }

    const BOUNDARY: &str = "X-IDENTITY-BOUNDARY";

    fn register_request() -> Request<Body> {
        let boundary = BOUNDARY;
        let mut body = String::new();
        for (name, value) in [
            ("username", "alice"),
            ("fullname", "Alice Liddell"),
            ("email", "alice@example.com"),
            ("password", PASSWORD),
        ] {
            body.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\nContent-Type: image/png\r\n\r\nPNGDATA\r\n--{boundary}--\r\n"
        ));

        Request::builder()
            .method("POST")
            .uri("/register")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn register_over_multipart() {
        let app = app();
        let (status, _, body) = send(&app.router, register_request()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["statusCode"], 201);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["username"], "alice");
        assert_eq!(body["data"]["fullName"], "Alice Liddell");
        assert!(body["data"]["avatar"].as_str().unwrap().ends_with(".png"));
        assert!(body["data"].get("passwordHash").is_none());

        // The spooled file is gone once the request is done
        let spooled = app.seed.media.uploaded.lock().unwrap().clone();
        assert_eq!(spooled.len(), 1);
        assert!(!spooled[0].exists());
    }

    #[tokio::test]
    async fn register_with_failed_avatar_upload_is_a_client_error() {
        let app = app_with(FakeMediaStore::failing_on(&[".png"]));

        let (status, _, body) = send(&app.router, register_request()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Error while uploading avatar");
        assert!(app.seed.login("alice", PASSWORD).await.is_err());
    }

    #[tokio::test]
    async fn upload_routes_reject_non_multipart_with_the_envelope() {
        let app = app();
        app.seed.register("alice").await;
        let alice = app.seed.login("alice", PASSWORD).await.unwrap().tokens;

        let mut avatar = json_request("PATCH", "/avatar", json!({"avatar": "me.png"}));
        avatar.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {}", alice.access_token).parse().unwrap(),
        );

        for req in [
            json_request("POST", "/register", json!({"username": "bob"})),
            avatar,
        ] {
            let response = app.router.clone().oneshot(req).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert!(
                response.headers()[header::CONTENT_TYPE]
                    .to_str()
                    .unwrap()
                    .starts_with("application/json")
            );

            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body["statusCode"], 400);
            assert_eq!(body["success"], false);
            assert!(body["errors"].is_array());
        }
    }

    #[tokio::test]
    async fn register_without_avatar_is_rejected() {
        let app = app();
        let boundary = "B";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"username\"\r\n\r\nalice\r\n--{b}--\r\n",
            b = boundary
        );
        let req = Request::builder()
            .method("POST")
            .uri("/register")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
            .body(Body::from(body))
            .unwrap();

        let (status, _, body) = send(&app.router, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["statusCode"], 400);
        assert!(body["errors"].is_array());
    }

    #[tokio::test]
    async fn session_lifecycle_over_http() {
        let app = app();
        app.seed.register("alice").await;

        // Login sets both cookies and echoes the tokens
        let (status, cookies, body) = send(
            &app.router,
            json_request("POST", "/login", json!({"username": "alice", "password": PASSWORD})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let access = cookie_value(&cookies, "accessToken").unwrap();
        let refresh = cookie_value(&cookies, "refreshToken").unwrap();
        assert_eq!(body["data"]["accessToken"], access.as_str());
        assert_eq!(body["data"]["user"]["username"], "alice");
        assert!(cookies.iter().all(|c| c.contains("HttpOnly")));

        // Current account with the access cookie
        let (status, _, body) = send(&app.router, authed("GET", "/current", &access)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], "alice@example.com");

        // Refresh from the body
        let (status, cookies, body) = send(
            &app.router,
            json_request("POST", "/refreshToken", json!({"refreshToken": refresh})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(cookie_value(&cookies, "refreshToken").is_some());
        let rotated = body["data"]["refreshToken"].as_str().unwrap().to_string();
        assert_ne!(rotated, refresh);

        // Replaying the old refresh token is refused
        let (status, _, body) = send(
            &app.router,
            json_request("POST", "/refreshToken", json!({"refreshToken": refresh})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Refresh token expired or already used");

        // Logout clears the cookies and the refresh slot
        let (status, cookies, _) = send(&app.router, authed("POST", "/logout", &access)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));

        let (status, _, _) = send(
            &app.router,
            json_request("POST", "/refreshToken", json!({"refreshToken": rotated})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let app = app();

        let req = Request::builder()
            .uri("/current")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(&app.router, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["statusCode"], 401);
        assert_eq!(body["success"], false);

        let (status, _, _) = send(&app.router, authed("GET", "/current", "forged")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, _) = send(
            &app.router,
            json_request("POST", "/refreshToken", json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_validation_over_http() {
        let app = app();

        let (status, _, body) =
            send(&app.router, json_request("POST", "/login", json!({"password": PASSWORD}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Username or email is required");

        let req = Request::builder()
            .method("POST")
            .uri("/login")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _, _) = send(&app.router, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn channel_profile_over_http() {
        let app = app();
        app.seed.register("alice").await;
        app.seed.register("bob").await;
        let bob = app.seed.login("bob", PASSWORD).await.unwrap().tokens;

        let (status, _, _) = send(
            &app.router,
            authed("POST", "/channel/alice/subscription", &bob.access_token),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let req = Request::builder()
            .uri("/channel/alice")
            .header(header::AUTHORIZATION, format!("Bearer {}", bob.access_token))
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(&app.router, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["subscribersCount"], 1);
        assert_eq!(body["data"]["channelsSubscribedToCount"], 0);
        assert_eq!(body["data"]["isSubscribed"], true);

        // Anonymous viewers are welcome but never subscribed
        let req = Request::builder()
            .uri("/channel/alice")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(&app.router, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["isSubscribed"], false);

        let req = Request::builder()
            .uri("/channel/ab")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(&app.router, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let req = Request::builder()
            .uri("/channel/ghost")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(&app.router, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Channel does not exist");
    }
}
