use super::Camera;
use crate::error::CaptureError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// A "camera" that reads its still from an image file. Each capture
/// re-reads the file, so replacing it on disk gives a new photo.
pub struct FileCamera {
    path: PathBuf,
    released: AtomicBool,
}

impl FileCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            released: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Camera for FileCamera {
    async fn capture_still(&self) -> Result<Vec<u8>, CaptureError> {
        if self.released.load(Ordering::Acquire) {
            return Err(CaptureError::Released);
        }
        log::debug!("[CAPTURE] Reading still from {}", self.path.display());
        Ok(tokio::fs::read(&self.path).await?)
    }

    fn release(&self) {
        self.released.store(true, Ordering::Release);
    }
}
