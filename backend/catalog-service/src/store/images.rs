//! Image asset storage
//!
//! Uploaded images are written to `<folder>/<image id><image type>`; an
//! in-memory index maps each image id back to its owner record.

use super::StoreError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// Destination for fully received uploads
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Persist `data` for `owner_id` and return the new asset id
    async fn save(&self, owner_id: &str, kind: &str, data: Vec<u8>) -> Result<String, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub owner_id: String,
    pub kind: String,
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct DiskImageStore {
    folder: PathBuf,
    images: RwLock<HashMap<String, ImageInfo>>,
}

impl DiskImageStore {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            images: RwLock::new(HashMap::new()),
        }
    }

    /// Create the image folder if it does not exist yet
    pub async fn ensure_folder(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.folder).await?;
        Ok(())
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn find(&self, image_id: &str) -> Option<ImageInfo> {
        self.images.read().get(image_id).cloned()
    }
}

#[async_trait]
impl AssetStore for DiskImageStore {
    async fn save(&self, owner_id: &str, kind: &str, data: Vec<u8>) -> Result<String, StoreError> {
        let image_id = Uuid::new_v4().to_string();
        let path = self.folder.join(format!("{}{}", image_id, kind));

        tokio::fs::write(&path, &data).await?;

        self.images.write().insert(
            image_id.clone(),
            ImageInfo {
                owner_id: owner_id.to_string(),
                kind: kind.to_string(),
                path: path.clone(),
            },
        );

        info!(
            image_id = %image_id,
            owner_id = %owner_id,
            size = data.len(),
            path = %path.display(),
            "image written to disk"
        );

        Ok(image_id)
    }
}
