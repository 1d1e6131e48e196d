//! Filesystem blob storage for uploaded videos.

use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::remote::{ProgressFn, StoredObject};

/// Verify that a resolved path stays within the expected base directory.
fn ensure_within(base: &Path, target: &Path) -> Result<PathBuf> {
    let canonical_base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    let mut resolved = canonical_base.clone();
    for component in target
        .strip_prefix(base)
        .unwrap_or(target)
        .components()
    {
        match component {
            Component::Normal(c) => resolved.push(c),
            Component::ParentDir => {
                return Err(StoreError::BlobStorage("Path traversal detected".to_string()));
            }
            _ => {} // RootDir, CurDir, Prefix
        }
    }
    if !resolved.starts_with(&canonical_base) {
        return Err(StoreError::BlobStorage("Path traversal detected".to_string()));
    }
    Ok(resolved)
}

// Bucket and object names are single path segments. Dots inside a name are
// fine; `ensure_within` catches anything that still resolves outside.
fn check_segment(kind: &str, name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
    {
        return Err(StoreError::BlobStorage(format!("Invalid {kind} name: {name:?}")));
    }
    Ok(())
}

/// Filesystem blob storage: one directory per bucket, one file per object.
#[derive(Debug, Clone)]
pub struct BlobStore {
    base_path: PathBuf,
}

impl BlobStore {
    pub async fn new(base_path: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            StoreError::BlobStorage(format!(
                "Failed to create blob directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Blob store initialized");

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Write `data` to `bucket/path` in `chunk_size` pieces, calling
    /// `on_progress(written, total)` after each piece. Fails if the object
    /// already exists.
    pub async fn write_object(
        &self,
        bucket: &str,
        path: &str,
        data: &[u8],
        chunk_size: usize,
        on_progress: &ProgressFn<'_>,
    ) -> Result<StoredObject> {
        if data.is_empty() {
            return Err(StoreError::BlobStorage("Empty blob".to_string()));
        }

        let target = self.object_path(bucket, path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StoreError::ObjectExists(format!("{bucket}/{path}")));
            }
            Err(e) => return Err(e.into()),
        };

        let total = data.len() as u64;
        let mut written = 0u64;
        let mut hasher = blake3::Hasher::new();

        for chunk in data.chunks(chunk_size.max(1)) {
            file.write_all(chunk).await.map_err(|e| {
                StoreError::BlobStorage(format!("Failed to write {bucket}/{path}: {e}"))
            })?;
            hasher.update(chunk);
            written += chunk.len() as u64;
            on_progress(written, total);
        }
        file.sync_all().await?;

        let hash = hasher.finalize().to_hex().to_string();
        debug!(bucket, path, size = total, hash = %hash, "Stored object");

        Ok(StoredObject {
            bucket: bucket.to_string(),
            path: path.to_string(),
            size: total,
            blake3_hash: hash,
        })
    }

    pub async fn read_object(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        let target = self.object_path(bucket, path)?;

        if !target.exists() {
            return Err(StoreError::NotFound);
        }

        let data = fs::read(&target).await.map_err(|e| {
            StoreError::BlobStorage(format!("Failed to read {bucket}/{path}: {e}"))
        })?;

        debug!(bucket, path, size = data.len(), "Retrieved object");
        Ok(data)
    }

    pub async fn delete_object(&self, bucket: &str, path: &str) -> Result<()> {
        let target = self.object_path(bucket, path)?;

        if !target.exists() {
            return Err(StoreError::NotFound);
        }

        fs::remove_file(&target).await.map_err(|e| {
            StoreError::BlobStorage(format!("Failed to delete {bucket}/{path}: {e}"))
        })?;

        debug!(bucket, path, "Deleted object");
        Ok(())
    }

    /// Object names in `bucket`, unordered. A missing bucket is empty.
    pub async fn list_objects(&self, bucket: &str) -> Result<Vec<String>> {
        check_segment("bucket", bucket)?;
        let dir = self.base_path.join(bucket);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| StoreError::BlobStorage(format!("Failed to list {bucket}: {e}")))?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            StoreError::BlobStorage(format!("Failed to read directory entry: {e}"))
        })? {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        Ok(names)
    }

    fn object_path(&self, bucket: &str, path: &str) -> Result<PathBuf> {
        check_segment("bucket", bucket)?;
        check_segment("object", path)?;
        let raw = self.base_path.join(bucket).join(path);
        ensure_within(&self.base_path, &raw)
    }
}
