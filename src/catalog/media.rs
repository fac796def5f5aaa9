use std::path::{Path, PathBuf};

use crate::common::types::{ItemId, MediaFormat};

/// Directory holding downloaded media as `{id}.{ext}`.
#[derive(Debug, Clone)]
pub struct MediaDir {
    root: PathBuf,
}

impl MediaDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, id: &ItemId, format: MediaFormat) -> PathBuf {
        self.root.join(format!("{}.{}", id, format.as_ext()))
    }

    pub async fn exists(&self, id: &ItemId, format: MediaFormat) -> bool {
        tokio::fs::metadata(self.path_for(id, format))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// First container found on disk for `id`, in [`MediaFormat::ALL`] order.
    pub async fn find(&self, id: &ItemId) -> Option<MediaFormat> {
        for format in MediaFormat::ALL {
            if self.exists(id, format).await {
                return Some(format);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finds_existing_container() {
        let root = std::env::temp_dir().join(format!(
            "lockstep-media-{}",
            crate::common::SessionId::generate()
        ));
        tokio::fs::create_dir_all(&root).await.unwrap();
        let dir = MediaDir::new(&root);
        let id = ItemId::from("abc123");

        assert_eq!(dir.find(&id).await, None);
        tokio::fs::write(dir.path_for(&id, MediaFormat::Mp4), b"data")
            .await
            .unwrap();
        assert_eq!(dir.find(&id).await, Some(MediaFormat::Mp4));
        assert!(!dir.exists(&id, MediaFormat::Webm).await);

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
