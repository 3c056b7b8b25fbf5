//! Multipart Spooling
//!
//! Writes uploaded file parts to the configured upload directory so the
//! media store can pick them up by path. Text parts are kept in memory.
//! Each file field may appear at most once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use uuid::Uuid;

use crate::error::{IdentityError, IdentityResult};

/// Spooled multipart form
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, PathBuf>,
}

impl UploadForm {
    /// Text field value, empty when absent
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    /// First present text field among `names`
    pub fn text_any(&self, names: &[&str]) -> String {
        names
            .iter()
            .find_map(|name| self.fields.get(*name))
            .cloned()
            .unwrap_or_default()
    }

    pub fn file(&self, name: &str) -> Option<PathBuf> {
        self.files.get(name).cloned()
    }

    /// Every spooled path, for cleanup
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.values().cloned().collect()
    }

    async fn fill(
        &mut self,
        multipart: &mut Multipart,
        upload_dir: &Path,
        allowed_files: &[&str],
    ) -> IdentityResult<()> {
        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            let Some(file_name) = field.file_name().map(str::to_string) else {
                let value = field.text().await.map_err(malformed)?;
                self.fields.insert(name, value);
                continue;
            };

            if !allowed_files.contains(&name.as_str()) {
                return Err(IdentityError::Validation(format!(
                    "Unexpected file field: {}",
                    name
                )));
            }
            if self.files.contains_key(&name) {
                return Err(IdentityError::Validation(format!(
                    "Only one {} file is allowed",
                    name
                )));
            }

            let bytes = field.bytes().await.map_err(malformed)?;
            if bytes.is_empty() && file_name.is_empty() {
                // Browsers send an empty part for an unselected file input.
                continue;
            }

            let path = upload_dir.join(spool_name(&file_name));
            tokio::fs::write(&path, &bytes).await.map_err(|e| {
                IdentityError::Internal(format!("Failed to spool upload: {}", e))
            })?;

            tracing::debug!(field = %name, size = bytes.len(), "Upload spooled");
            self.files.insert(name, path);
        }

        Ok(())
    }
}

/// Read the whole form, spooling allowed file fields to `upload_dir`.
///
/// On failure nothing is left on disk.
pub async fn spool_multipart(
    mut multipart: Multipart,
    upload_dir: &Path,
    allowed_files: &[&str],
) -> IdentityResult<UploadForm> {
    let mut form = UploadForm::default();

    if let Err(e) = form.fill(&mut multipart, upload_dir, allowed_files).await {
        discard(&form.paths()).await;
        return Err(e);
    }

    Ok(form)
}

/// Remove spooled files that are still around
pub async fn discard(paths: &[PathBuf]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "Failed to remove spooled upload");
            }
        }
    }
}

fn malformed(err: axum::extract::multipart::MultipartError) -> IdentityError {
    IdentityError::Validation(format!("Malformed multipart body: {}", err.body_text()))
}

/// Random name keeping a short alphanumeric extension; client paths never reach the disk.
fn spool_name(original: &str) -> String {
    let extension = Path::new(original)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_ascii_lowercase()),
        None => Uuid::new_v4().to_string(),
    }
}
