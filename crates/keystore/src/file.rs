use async_trait::async_trait;
use spotdesk_core::{CredentialStore, Credentials, TradeError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Stores one key pair as a JSON file.
///
/// A missing file means nothing is configured. On unix the file is
/// written with mode 0600.
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the stored key pair, if any.
    pub async fn clear(&self) -> Result<(), TradeError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TradeError::Credential(format!(
                "Failed to remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Write `contents` with mode 0600 on unix. A file that already existed
    /// is tightened through the open handle before the new keys land in it.
    async fn write_private(&self, contents: &[u8]) -> std::io::Result<()> {
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&self.path).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await?;
        }
        file.write_all(contents).await?;
        file.flush().await
    }
}

#[async_trait]
impl CredentialStore for FileKeyStore {
    async fn get_api_keys(&self) -> Result<Option<Credentials>, TradeError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No stored API keys");
                return Ok(None);
            }
            Err(e) => {
                return Err(TradeError::Credential(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let credentials: Credentials = serde_json::from_slice(&raw).map_err(|e| {
            TradeError::Credential(format!(
                "Corrupt key file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(Some(credentials))
    }

    async fn store_api_keys(&self, credentials: Credentials) -> Result<(), TradeError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                TradeError::Credential(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let json = serde_json::to_vec_pretty(&credentials)
            .map_err(|e| TradeError::Credential(format!("Serialization error: {}", e)))?;
        self.write_private(&json).await.map_err(|e| {
            TradeError::Credential(format!("Failed to write {}: {}", self.path.display(), e))
        })?;

        info!(path = %self.path.display(), "Stored API keys");
        Ok(())
    }
}
