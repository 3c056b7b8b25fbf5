//! Application Configuration
//!
//! Configuration for the identity application layer. Built once at startup
//! and handed to every component that needs it.

use std::path::PathBuf;
use std::time::Duration;

use platform::cookie::CookieConfig;
use platform::crypto::random_bytes;
use thiserror::Error;

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid duration for {key}: {value:?}")]
    InvalidDuration { key: &'static str, value: String },

    #[error("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ")]
    SharedSecret,
}

/// Identity application configuration
#[derive(Clone)]
pub struct IdentityConfig {
    /// HMAC key for access tokens
    pub access_token_secret: Vec<u8>,
    /// HMAC key for refresh tokens, distinct from the access key
    pub refresh_token_secret: Vec<u8>,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub access_cookie_name: String,
    pub refresh_cookie_name: String,
    /// Whether to require Secure cookie
    pub cookie_secure: bool,
    pub cookie_same_site: SameSite,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// Where multipart uploads are spooled before they go to the media store
    pub upload_dir: PathBuf,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            access_token_secret: Vec::new(),
            refresh_token_secret: Vec::new(),
            access_token_ttl: Duration::from_secs(15 * 60), // 15 minutes
            refresh_token_ttl: Duration::from_secs(10 * 24 * 3600), // 10 days
            access_cookie_name: "accessToken".to_string(),
            refresh_cookie_name: "refreshToken".to_string(),
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            password_pepper: None,
            upload_dir: std::env::temp_dir(),
        }
    }
}

impl IdentityConfig {
    /// Create config with random token secrets
    pub fn with_random_secrets() -> Self {
        Self {
            access_token_secret: random_bytes(32),
            refresh_token_secret: random_bytes(32),
            ..Default::default()
        }
    }

    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Self::with_random_secrets()
        }
    }

    /// Load from the process environment
    ///
    /// Reads `ACCESS_TOKEN_SECRET`, `REFRESH_TOKEN_SECRET` (required),
    /// `ACCESS_TOKEN_EXPIRY`, `REFRESH_TOKEN_EXPIRY`, `COOKIE_SECURE`,
    /// `PASSWORD_PEPPER` and `UPLOAD_DIR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| read(key).ok_or(ConfigError::Missing(key));
        let duration = |key: &'static str, fallback: Duration| match read(key) {
            Some(value) => parse_duration(&value)
                .ok_or(ConfigError::InvalidDuration { key, value }),
            None => Ok(fallback),
        };

        let defaults = Self::default();

        let access_token_secret = required("ACCESS_TOKEN_SECRET")?.into_bytes();
        let refresh_token_secret = required("REFRESH_TOKEN_SECRET")?.into_bytes();
        if access_token_secret == refresh_token_secret {
            return Err(ConfigError::SharedSecret);
        }

        Ok(Self {
            access_token_secret,
            refresh_token_secret,
            access_token_ttl: duration("ACCESS_TOKEN_EXPIRY", defaults.access_token_ttl)?,
            refresh_token_ttl: duration("REFRESH_TOKEN_EXPIRY", defaults.refresh_token_ttl)?,
            cookie_secure: read("COOKIE_SECURE")
                .map(|v| !matches!(v.trim(), "0" | "false" | "no" | "off"))
                .unwrap_or(defaults.cookie_secure),
            password_pepper: read("PASSWORD_PEPPER").map(String::into_bytes),
            upload_dir: read("UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
            ..defaults
        })
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    fn cookie(&self, name: &str, ttl: Duration) -> CookieConfig {
        CookieConfig {
            secure: self.cookie_secure,
            same_site: self.cookie_same_site,
            max_age_secs: Some(ttl.as_secs()),
            ..CookieConfig::named(name)
        }
    }

    pub fn access_cookie(&self) -> CookieConfig {
        self.cookie(&self.access_cookie_name, self.access_token_ttl)
    }

    pub fn refresh_cookie(&self) -> CookieConfig {
        self.cookie(&self.refresh_cookie_name, self.refresh_token_ttl)
    }
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("access_token_secret", &"[REDACTED]")
            .field("refresh_token_secret", &"[REDACTED]")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("cookie_secure", &self.cookie_secure)
            .field("cookie_same_site", &self.cookie_same_site)
            .field("upload_dir", &self.upload_dir)
            .finish_non_exhaustive()
    }
}

/// Parse `90`, `90s`, `15m`, `1h` or `10d`
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => raw.split_at(idx),
        None => (raw, "s"),
    };

    let value: u64 = digits.parse().ok()?;
    let multiplier = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 24 * 3600,
        _ => return None,
    };

    value
        .checked_mul(multiplier)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
