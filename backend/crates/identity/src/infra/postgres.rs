//! PostgreSQL Repository Implementations
//!
//! Schema: `database/migrations/0001_identity.sql`.

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, ContentItemId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{
    account::Account, channel_profile::ChannelProfile, credentials::Credentials,
    subscription::SubscriptionEdge,
};
use crate::domain::repository::{AccountRepository, CredentialRepository, SubscriptionRepository};
use crate::domain::value_object::{
    email::Email, full_name::FullName, token_digest::TokenDigest, user_password::UserPassword,
    username::Username,
};
use crate::error::{IdentityError, IdentityResult};

/// PostgreSQL-backed identity repository
#[derive(Clone)]
pub struct PgIdentityRepository {
    pool: PgPool,
}

impl PgIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Unique violations on username/email become `DuplicateIdentity`
fn map_unique_violation(err: sqlx::Error) -> IdentityError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            IdentityError::DuplicateIdentity
        }
        _ => IdentityError::Database(err),
    }
}

// ============================================================================
// Account Repository Implementation
// ============================================================================

impl AccountRepository for PgIdentityRepository {
    async fn insert_account(
        &self,
        account: &Account,
        credentials: &Credentials,
    ) -> IdentityResult<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                account_id,
                username,
                email,
                full_name,
                avatar_url,
                cover_image_url,
                watch_history,
                password_hash,
                refresh_token_digest,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(account.account_id.as_uuid())
        .bind(account.username.as_str())
        .bind(account.email.as_str())
        .bind(account.full_name.as_str())
        .bind(&account.avatar_url)
        .bind(account.cover_image_url.as_deref())
        .bind(
            account
                .watch_history
                .iter()
                .map(|id| *id.as_uuid())
                .collect::<Vec<Uuid>>(),
        )
        .bind(credentials.password_hash.as_phc_string())
        .bind(credentials.refresh_token.as_ref().map(|d| d.as_bytes().to_vec()))
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(())
    }

    async fn account_exists(&self, username: &Username, email: &Email) -> IdentityResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE username = $1 OR email = $2)",
        )
        .bind(username.as_str())
        .bind(email.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn find_account_by_id(&self, account_id: &AccountId) -> IdentityResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT
                account_id,
                username,
                email,
                full_name,
                avatar_url,
                cover_image_url,
                watch_history,
                created_at,
                updated_at
            FROM accounts
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AccountRow::into_account))
    }

    async fn find_account_by_username(
        &self,
        username: &Username,
    ) -> IdentityResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT
                account_id,
                username,
                email,
                full_name,
                avatar_url,
                cover_image_url,
                watch_history,
                created_at,
                updated_at
            FROM accounts
            WHERE username = $1
            "#,
        )
        .bind(username.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AccountRow::into_account))
    }

    async fn find_account_by_identity(
        &self,
        username: Option<&Username>,
        email: Option<&Email>,
    ) -> IdentityResult<Option<Account>> {
        // NULL never compares equal, so an absent half matches nothing.
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT
                account_id,
                username,
                email,
                full_name,
                avatar_url,
                cover_image_url,
                watch_history,
                created_at,
                updated_at
            FROM accounts
            WHERE username = $1 OR email = $2
            ORDER BY (username = $1) IS TRUE DESC
            LIMIT 1
            "#,
        )
        .bind(username.map(Username::as_str))
        .bind(email.map(Email::as_str))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AccountRow::into_account))
    }

    async fn update_account_details(
        &self,
        account_id: &AccountId,
        full_name: &FullName,
        email: &Email,
    ) -> IdentityResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            UPDATE accounts SET
                full_name = $2,
                email = $3,
                updated_at = now()
            WHERE account_id = $1
            RETURNING
                account_id,
                username,
                email,
                full_name,
                avatar_url,
                cover_image_url,
                watch_history,
                created_at,
                updated_at
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(full_name.as_str())
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(row.map(AccountRow::into_account))
    }

    async fn update_account_avatar(
        &self,
        account_id: &AccountId,
        avatar_url: &str,
    ) -> IdentityResult<Option<Account>> {
        if avatar_url.trim().is_empty() {
            return Err(IdentityError::Validation("Avatar file is required".into()));
        }

        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            UPDATE accounts SET
                avatar_url = $2,
                updated_at = now()
            WHERE account_id = $1
            RETURNING
                account_id,
                username,
                email,
                full_name,
                avatar_url,
                cover_image_url,
                watch_history,
                created_at,
                updated_at
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(avatar_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AccountRow::into_account))
    }

    async fn update_account_cover_image(
        &self,
        account_id: &AccountId,
        cover_image_url: &str,
    ) -> IdentityResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            UPDATE accounts SET
                cover_image_url = $2,
                updated_at = now()
            WHERE account_id = $1
            RETURNING
                account_id,
                username,
                email,
                full_name,
                avatar_url,
                cover_image_url,
                watch_history,
                created_at,
                updated_at
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(cover_image_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AccountRow::into_account))
    }

    async fn record_watch(
        &self,
        account_id: &AccountId,
        item: &ContentItemId,
    ) -> IdentityResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                watch_history = array_append(array_remove(watch_history, $2), $2),
                updated_at = now()
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(item.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// ============================================================================
// Credential Repository Implementation
// ============================================================================

impl CredentialRepository for PgIdentityRepository {
    async fn find_credentials(
        &self,
        account_id: &AccountId,
    ) -> IdentityResult<Option<Credentials>> {
        let row = sqlx::query_as::<_, CredentialsRow>(
            r#"
            SELECT
                account_id,
                password_hash,
                refresh_token_digest,
                updated_at
            FROM accounts
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CredentialsRow::into_credentials).transpose()
    }

    async fn update_password_hash(
        &self,
        account_id: &AccountId,
        password_hash: &UserPassword,
    ) -> IdentityResult<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET password_hash = $2, updated_at = now() WHERE account_id = $1",
        )
        .bind(account_id.as_uuid())
        .bind(password_hash.as_phc_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn store_refresh_token(
        &self,
        account_id: &AccountId,
        digest: Option<&TokenDigest>,
    ) -> IdentityResult<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET refresh_token_digest = $2, updated_at = now() WHERE account_id = $1",
        )
        .bind(account_id.as_uuid())
        .bind(digest.map(|d| d.as_bytes().to_vec()))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn swap_refresh_token(
        &self,
        account_id: &AccountId,
        expected: &TokenDigest,
        replacement: &TokenDigest,
    ) -> IdentityResult<bool> {
        // Single conditional UPDATE: the row lock makes a concurrent loser
        // re-check the predicate against the winner's value and match nothing.
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                refresh_token_digest = $3,
                updated_at = now()
            WHERE account_id = $1
              AND refresh_token_digest = $2
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(expected.as_bytes().as_slice())
        .bind(replacement.as_bytes().as_slice())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// ============================================================================
// Subscription Repository Implementation
// ============================================================================

impl SubscriptionRepository for PgIdentityRepository {
    async fn insert_subscription(&self, edge: &SubscriptionEdge) -> IdentityResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO subscriptions (subscriber_id, channel_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (subscriber_id, channel_id) DO NOTHING
            "#,
        )
        .bind(edge.subscriber_id.as_uuid())
        .bind(edge.channel_id.as_uuid())
        .bind(edge.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                IdentityError::ChannelNotFound
            }
            _ => IdentityError::Database(e),
        })?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_subscription(
        &self,
        subscriber_id: &AccountId,
        channel_id: &AccountId,
    ) -> IdentityResult<bool> {
        let result =
            sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = $1 AND channel_id = $2")
                .bind(subscriber_id.as_uuid())
                .bind(channel_id.as_uuid())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn in_degree(&self, channel_id: &AccountId) -> IdentityResult<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subscriptions WHERE channel_id = $1")
                .bind(channel_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn out_degree(&self, account_id: &AccountId) -> IdentityResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1",
        )
        .bind(account_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn has_edge(
        &self,
        subscriber_id: &AccountId,
        channel_id: &AccountId,
    ) -> IdentityResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM subscriptions WHERE subscriber_id = $1 AND channel_id = $2)",
        )
        .bind(subscriber_id.as_uuid())
        .bind(channel_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn load_channel_profile(
        &self,
        username: &Username,
        viewer: Option<&AccountId>,
    ) -> IdentityResult<Option<ChannelProfile>> {
        // One statement, one snapshot: existence and counts cannot disagree.
        let row = sqlx::query_as::<_, ChannelProfileRow>(
            r#"
            SELECT
                a.account_id,
                a.full_name,
                a.username,
                a.avatar_url,
                a.cover_image_url,
                a.email,
                (SELECT COUNT(*) FROM subscriptions s WHERE s.channel_id = a.account_id)
                    AS subscriber_count,
                (SELECT COUNT(*) FROM subscriptions s WHERE s.subscriber_id = a.account_id)
                    AS subscribed_to_count,
                EXISTS (
                    SELECT 1 FROM subscriptions s
                    WHERE s.channel_id = a.account_id AND s.subscriber_id = $2
                ) AS is_subscribed
            FROM accounts a
            WHERE a.username = $1
            "#,
        )
        .bind(username.as_str())
        .bind(viewer.map(|v| *v.as_uuid()))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ChannelProfileRow::into_profile))
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct AccountRow {
    account_id: Uuid,
    username: String,
    email: String,
    full_name: String,
    avatar_url: String,
    cover_image_url: Option<String>,
    watch_history: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_account(self) -> Account {
        Account {
            account_id: AccountId::from_uuid(self.account_id),
            username: Username::from_db(self.username),
            email: Email::from_db(self.email),
            full_name: FullName::from_db(self.full_name),
            avatar_url: self.avatar_url,
            cover_image_url: self.cover_image_url,
            watch_history: self
                .watch_history
                .into_iter()
                .map(ContentItemId::from_uuid)
                .collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialsRow {
    account_id: Uuid,
    password_hash: String,
    refresh_token_digest: Option<Vec<u8>>,
    updated_at: DateTime<Utc>,
}

impl CredentialsRow {
    fn into_credentials(self) -> IdentityResult<Credentials> {
        let refresh_token = match self.refresh_token_digest {
            Some(bytes) => Some(TokenDigest::from_db(&bytes).ok_or_else(|| {
                IdentityError::Internal("Invalid refresh token digest in database".into())
            })?),
            None => None,
        };

        Ok(Credentials {
            account_id: AccountId::from_uuid(self.account_id),
            password_hash: UserPassword::from_phc_string(self.password_hash)?,
            refresh_token,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ChannelProfileRow {
    account_id: Uuid,
    full_name: String,
    username: String,
    avatar_url: String,
    cover_image_url: Option<String>,
    email: String,
    subscriber_count: i64,
    subscribed_to_count: i64,
    is_subscribed: bool,
}

impl ChannelProfileRow {
    fn into_profile(self) -> ChannelProfile {
        ChannelProfile {
            account_id: AccountId::from_uuid(self.account_id),
            full_name: self.full_name,
            username: self.username,
            subscriber_count: self.subscriber_count,
            subscribed_to_count: self.subscribed_to_count,
            is_subscribed: self.is_subscribed,
            avatar_url: self.avatar_url,
            cover_image_url: self.cover_image_url,
            email: self.email,
        }
    }
}
