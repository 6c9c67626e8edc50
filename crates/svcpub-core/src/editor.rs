//! Dynamic config editor
//!
//! Applies one router/service pair to the dynamic config file on disk.
//! The original bytes are backed up under a timestamped name before any
//! mutation, and the updated document is written to a temp file and renamed
//! into place so a crash mid-write cannot leave a truncated config. The
//! backup is never deleted; it is the manual recovery path.

use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::document::DynamicConfigDocument;
use crate::error::ConfigError;
use crate::service::ServiceDefinition;

/// Timestamp suffix format for backup file names
pub(crate) const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Result of a successful edit, for the operator's status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedChange {
    /// The live config file that was updated
    pub config_path: PathBuf,
    /// Where the pre-mutation bytes were saved
    pub backup_path: PathBuf,
}

/// Editor for the reverse proxy's dynamic config file
#[derive(Debug, Clone)]
pub struct ConfigEditor {
    domain: String,
}

impl ConfigEditor {
    /// Create an editor publishing services under the given base domain
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    /// Add the router/service pair for `svc` to the file at `path`
    ///
    /// Steps, in order: read, back up, check for duplicates, insert,
    /// write atomically. A backup failure aborts before any mutation; a
    /// write failure leaves the backup in place for recovery.
    pub async fn apply(
        &self,
        path: &Path,
        svc: &ServiceDefinition,
    ) -> Result<AppliedChange, ConfigError> {
        let original = fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::ReadFailed {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let text = String::from_utf8(original.clone()).map_err(|e| ConfigError::ParseFailure {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut doc = DynamicConfigDocument::parse(&text, path)?;

        // Backup must land on disk before the document is touched
        let backup_path = backup_path(path, &Local::now().format(BACKUP_TIMESTAMP_FORMAT).to_string());
        fs::write(&backup_path, &original)
            .await
            .map_err(|e| ConfigError::BackupFailed {
                path: backup_path.clone(),
                source: e,
            })?;
        tracing::info!("backed up dynamic config to {}", backup_path.display());

        doc.insert(svc, &self.domain)?;

        let serialized = doc
            .to_toml_string()
            .map_err(|e| ConfigError::WriteFailed {
                path: path.to_path_buf(),
                source: std::io::Error::other(e),
            })?;
        write_atomic(path, serialized.as_bytes()).await?;

        tracing::info!(
            "added router and service '{}' to {}",
            svc.name,
            path.display()
        );

        Ok(AppliedChange {
            config_path: path.to_path_buf(),
            backup_path,
        })
    }
}

/// Backup path: `<file-name>.<timestamp>.bak` in the same directory
pub(crate) fn backup_path(path: &Path, timestamp: &str) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config".to_string());
    path.with_file_name(format!("{}.{}.bak", file_name, timestamp))
}

/// Temp-file path used during atomic replacement
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut temp = path.to_path_buf();
    temp.set_extension("tmp");
    temp
}

/// Write bytes to a temp file, flush, then rename over the target
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ConfigError> {
    let temp = temp_path(path);
    let write_failed = |source: std::io::Error| ConfigError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    {
        let mut file = fs::File::create(&temp).await.map_err(write_failed)?;
        file.write_all(bytes).await.map_err(write_failed)?;
        file.flush().await.map_err(write_failed)?;
    }

    if let Err(e) = fs::rename(&temp, path).await {
        // Target file is still the pre-mutation version; drop the temp
        let _ = fs::remove_file(&temp).await;
        return Err(write_failed(e));
    }

    Ok(())
}
