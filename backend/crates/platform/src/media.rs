//! Media Upload
//!
//! Uploads a local file to a remote media host and returns its URL.
//! The local file is removed after every attempt, successful or not.
//!
//! [`CloudinaryMediaStore`] speaks the Cloudinary signed-upload API:
//! `signature = sha1("timestamp=<ts><api_secret>")`.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use thiserror::Error;

use crate::crypto::to_hex;

const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Media upload errors
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Local file not readable: {0}")]
    Io(#[from] std::io::Error),

    #[error("Upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Media host rejected upload with status {0}")]
    Rejected(u16),

    #[error("Media host response has no URL")]
    MissingUrl,

    #[error("Media host is not configured: {0}")]
    NotConfigured(&'static str),
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    /// Stable, publicly reachable URL
    pub url: String,
    /// Host-side identifier, if the host returns one
    pub public_id: Option<String>,
}

/// Remote media host
#[trait_variant::make(MediaStore: Send)]
pub trait LocalMediaStore {
    /// Upload the file at `local_path`; the file is consumed either way.
    async fn upload(&self, local_path: &Path) -> Result<UploadedMedia, MediaError>;
}

/// Cloudinary credentials
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl CloudinaryConfig {
    /// Reads `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET`
    pub fn from_env() -> Result<Self, MediaError> {
        let read = |key: &'static str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or(MediaError::NotConfigured(key))
        };

        Ok(Self {
            cloud_name: read("CLOUDINARY_CLOUD_NAME")?,
            api_key: read("CLOUDINARY_API_KEY")?,
            api_secret: read("CLOUDINARY_API_SECRET")?,
        })
    }

    /// Upload signature for the given timestamp
    pub fn sign(&self, timestamp: u64) -> String {
        let mut hasher = Sha1::new();
        hasher.update(format!("timestamp={}{}", timestamp, self.api_secret).as_bytes());
        to_hex(&hasher.finalize())
    }

    fn upload_url(&self) -> String {
        format!("{}/{}/auto/upload", CLOUDINARY_API_BASE, self.cloud_name)
    }
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Deserialize)]
struct CloudinaryUploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
    public_id: Option<String>,
}

/// Cloudinary-backed media store
#[derive(Clone)]
pub struct CloudinaryMediaStore {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryMediaStore {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn send(&self, local_path: &Path) -> Result<UploadedMedia, MediaError> {
        let bytes = tokio::fs::read(local_path).await?;
        let file_name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("signature", self.config.sign(timestamp));

        let response = self
            .client
            .post(self.config.upload_url())
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MediaError::Rejected(response.status().as_u16()));
        }

        let body: CloudinaryUploadResponse = response.json().await?;
        let url = body.secure_url.or(body.url).ok_or(MediaError::MissingUrl)?;

        Ok(UploadedMedia {
            url,
            public_id: body.public_id,
        })
    }
}

impl MediaStore for CloudinaryMediaStore {
    async fn upload(&self, local_path: &Path) -> Result<UploadedMedia, MediaError> {
        let result = self.send(local_path).await;

        if let Err(e) = tokio::fs::remove_file(local_path).await {
            tracing::warn!(error = %e, path = %local_path.display(), "Failed to remove uploaded temp file");
        }

        match &result {
            Ok(media) => tracing::debug!(url = %media.url, "Media uploaded"),
            Err(e) => tracing::warn!(error = %e, "Media upload failed"),
        }

        result
    }
}
