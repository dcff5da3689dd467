//! Uploaded template storage.
//!
//! Files live under a configured root; the data model only ever records
//! relative paths. Disallowed extensions are rejected with `None` rather
//! than an error, the caller turns that into a validation response.

use formflow_utils::FormFlowResult;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

const ALLOWED_EXTENSIONS: &[&str] = &["doc", "docx", "pdf"];

pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn extension_of(file_name: &str) -> Option<String> {
        Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    pub fn is_allowed(file_name: &str) -> bool {
        Self::extension_of(file_name)
            .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }

    /// Persist an upload, returning its relative path, or `None` when the
    /// extension is not allowed.
    pub async fn save(&self, file_name: &str, bytes: &[u8]) -> FormFlowResult<Option<String>> {
        if !Self::is_allowed(file_name) {
            debug!(file = %file_name, "upload rejected by extension allowlist");
            return Ok(None);
        }

        let safe_name: String = file_name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        let relative = format!("{}_{}", Uuid::new_v4(), safe_name);

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&relative), bytes).await?;
        Ok(Some(relative))
    }

    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub async fn exists(&self, relative: &str) -> bool {
        tokio::fs::try_exists(self.resolve(relative))
            .await
            .unwrap_or(false)
    }

    pub async fn delete(&self, relative: &str) -> bool {
        tokio::fs::remove_file(self.resolve(relative)).await.is_ok()
    }
}
