// Local filesystem adapter - path-addressed file operations on tokio::fs

use std::path::Path;

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::ports::*;

/// Local disk adapter
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFsAdapter;

impl LocalFsAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FsPort for LocalFsAdapter {
    async fn file_exists(&self, path: &Path) -> Result<bool, DomainError> {
        match tokio::fs::metadata(path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DomainError::FsFail(format!("Failed to stat {}: {}", path.display(), e))),
        }
    }

    async fn file_size(&self, path: &Path) -> Result<u64, DomainError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| DomainError::FsFail(format!("Failed to get file size: {}", e)))?;
        Ok(metadata.len())
    }

    async fn create_directory(&self, path: &Path) -> Result<(), DomainError> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| DomainError::FsFail(format!("Failed to create directory {}: {}", path.display(), e)))
    }

    async fn write_text(&self, path: &Path, contents: &str) -> Result<(), DomainError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.create_directory(parent).await?;
        }
        // Write beside the target and rename so readers never see a partial manifest
        let mut staging = path.as_os_str().to_os_string();
        staging.push(".tmp");
        tokio::fs::write(&staging, contents)
            .await
            .map_err(|e| DomainError::FsFail(format!("Failed to write {}: {}", path.display(), e)))?;
        tokio::fs::rename(&staging, path)
            .await
            .map_err(|e| DomainError::FsFail(format!("Failed to rename temporary file: {}", e)))
    }

    async fn delete_file(&self, path: &Path) -> Result<(), DomainError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::FsFail(format!("Failed to delete file: {}", e))),
        }
    }
}
