//! Image capture domain: still acquisition → decode → OCR.
//!
//! The controller always produces a well-formed [`RecognitionResult`]:
//! capture or decode failures become [`CAPTURE_FAILED`] with no labels, so
//! nobody waiting on a capture is left hanging.

mod file;

pub use file::FileCamera;

use crate::error::CaptureError;
use crate::ocr::{OcrCoordinator, RecognitionResult, CAPTURE_FAILED};
use async_trait::async_trait;
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Source of encoded still images (JPEG, PNG, …).
#[async_trait]
pub trait Camera: Send + Sync {
    async fn capture_still(&self) -> Result<Vec<u8>, CaptureError>;

    /// Give the hardware back. Later captures should fail.
    fn release(&self) {}
}

#[derive(Clone)]
pub struct CaptureController {
    camera: Arc<dyn Camera>,
    coordinator: Arc<OcrCoordinator>,
    cancel: CancellationToken,
}

impl CaptureController {
    pub fn new(camera: Arc<dyn Camera>, coordinator: Arc<OcrCoordinator>) -> Self {
        Self {
            camera,
            coordinator,
            cancel: CancellationToken::new(),
        }
    }

    /// Capture one still and recognize it.
    pub async fn capture_and_recognize(&self) -> RecognitionResult {
        if self.cancel.is_cancelled() {
            log::warn!("[CAPTURE] Controller is shut down");
            return RecognitionResult::text_only(CAPTURE_FAILED);
        }

        let capture_start = Instant::now();
        let image = match self.acquire().await {
            Ok(image) => image,
            Err(e) => {
                log::error!("[CAPTURE] Photo capture failed: {}", e);
                return RecognitionResult::text_only(CAPTURE_FAILED);
            }
        };
        log::info!(
            "[CAPTURE] Photo captured in {}ms ({}x{})",
            capture_start.elapsed().as_millis(),
            image.width(),
            image.height()
        );

        let ocr_start = Instant::now();
        let result = self.coordinator.process(&image).await;
        log::info!(
            "[CAPTURE] OCR processing: {}ms",
            ocr_start.elapsed().as_millis()
        );
        log::info!(
            "[CAPTURE] Total (capture → recognition): {}ms",
            capture_start.elapsed().as_millis()
        );
        log::info!("[CAPTURE] Detected labels: {:?}", result.labels);
        result
    }

    /// Run [`Self::capture_and_recognize`] in the background and hand the
    /// result to `on_result` exactly once, even if the controller is shut
    /// down mid-capture.
    pub fn take_photo<F>(&self, on_result: F) -> JoinHandle<()>
    where
        F: FnOnce(RecognitionResult) + Send + 'static,
    {
        let controller = self.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                result = controller.capture_and_recognize() => result,
                _ = controller.cancel.cancelled() => RecognitionResult::text_only(CAPTURE_FAILED),
            };
            on_result(result);
        })
    }

    /// Cancel background captures and release the camera.
    pub fn shutdown(&self) {
        log::info!("[CAPTURE] Shutting down");
        self.cancel.cancel();
        self.camera.release();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn acquire(&self) -> Result<DynamicImage, CaptureError> {
        let bytes = self.camera.capture_still().await?;
        tokio::task::spawn_blocking(move || decode_still(&bytes)).await?
    }
}

pub fn decode_still(bytes: &[u8]) -> Result<DynamicImage, CaptureError> {
    Ok(image::load_from_memory(bytes)?)
}
