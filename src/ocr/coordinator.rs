//! OCR coordinator: picks a backend, falls back, normalizes results.
//!
//! Remote mode calls the vision client; any error from it is answered by
//! the local engine with an empty label set. An invalid API key also flips
//! the shared mode flag to local so later captures skip the remote call.
//! Local mode never yields labels.
//!
//! Only one coordinator may be alive per process. It is built once at
//! startup and handed to consumers as an `Arc`.

use super::mode::{ModeFlag, OcrMode};
use super::{RecognitionResult, TextRecognizer, VisionBackend};
use crate::error::{CoordinatorError, VisionError};
use image::DynamicImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

static INSTANCE_LIVE: AtomicBool = AtomicBool::new(false);

pub struct OcrCoordinator {
    local: Arc<dyn TextRecognizer>,
    remote: Arc<dyn VisionBackend>,
    mode: ModeFlag,
}

impl OcrCoordinator {
    /// Build the process's coordinator. Fails while another one is alive.
    pub fn new(
        local: Arc<dyn TextRecognizer>,
        remote: Arc<dyn VisionBackend>,
        mode: ModeFlag,
    ) -> Result<Arc<Self>, CoordinatorError> {
        if INSTANCE_LIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CoordinatorError::AlreadyConstructed);
        }
        log::info!("[OCR] Coordinator created, mode = {}", mode.get());
        Ok(Arc::new(Self {
            local,
            remote,
            mode,
        }))
    }

    pub fn mode(&self) -> OcrMode {
        self.mode.get()
    }

    /// Handle to the shared flag, for whoever tracks connectivity.
    pub fn mode_flag(&self) -> ModeFlag {
        self.mode.clone()
    }

    pub fn set_mode(&self, use_remote: bool) {
        let mode = OcrMode::from_remote(use_remote);
        let previous = self.mode.set(mode);
        log::info!("[OCR] Mode updated: {} -> {}", previous, mode);
    }

    /// Recognize `image` with the current backend. Never fails.
    pub async fn process(&self, image: &DynamicImage) -> RecognitionResult {
        let mode = self.mode.get();
        log::info!(
            "[OCR] Processing {}x{} image with {}",
            image.width(),
            image.height(),
            mode
        );

        let result = match mode {
            OcrMode::Remote => self.process_remote(image).await,
            OcrMode::Local => RecognitionResult::text_only(self.local.recognize(image).await),
        };

        log::info!(
            "[OCR] Final output: {} chars, labels: {:?}",
            result.text.len(),
            result.labels
        );
        result
    }

    async fn process_remote(&self, image: &DynamicImage) -> RecognitionResult {
        match self.remote.recognize(image).await {
            Ok(output) => RecognitionResult::from_vision(output),
            Err(err) => {
                if matches!(err, VisionError::InvalidApiKey) {
                    self.mode.set(OcrMode::Local);
                    log::warn!("[OCR] Vision API key rejected; switching to local OCR");
                }
                log::warn!("[OCR] Remote OCR failed ({}); falling back to local engine", err);
                RecognitionResult::text_only(self.local.recognize(image).await)
            }
        }
    }
}

impl Drop for OcrCoordinator {
    fn drop(&mut self) {
        INSTANCE_LIVE.store(false, Ordering::Release);
    }
}
