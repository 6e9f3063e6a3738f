//! On-device OCR via the system Tesseract install (rusty-tesseract).
//!
//! No network. Produces text only; labels are a remote-backend feature.

use super::{TextRecognizer, LOCAL_OCR_FAILED, NO_TEXT};
use crate::error::LocalOcrError;
use async_trait::async_trait;
use image::DynamicImage;
use std::collections::HashMap;

pub const DEFAULT_LANG: &str = "eng";

pub struct TesseractRecognizer {
    lang: String,
}

impl TesseractRecognizer {
    pub fn new(lang: impl Into<String>) -> Self {
        Self { lang: lang.into() }
    }

    fn args(&self) -> rusty_tesseract::Args {
        rusty_tesseract::Args {
            lang: self.lang.clone(),
            config_variables: HashMap::new(),
            dpi: Some(150),
            psm: Some(3), // Fully automatic page segmentation, no OSD
            oem: Some(3),
        }
    }

    async fn run_engine(&self, image: &DynamicImage) -> Result<String, LocalOcrError> {
        let image = image.clone();
        let args = self.args();
        tokio::task::spawn_blocking(move || {
            let tess_image = rusty_tesseract::Image::from_dynamic_image(&image)
                .map_err(|e| LocalOcrError::Engine(e.to_string()))?;
            rusty_tesseract::image_to_string(&tess_image, &args)
                .map_err(|e| LocalOcrError::Engine(e.to_string()))
        })
        .await?
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new(DEFAULT_LANG)
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(&self, image: &DynamicImage) -> String {
        log::info!(
            "[OCR] Local image resolution: {}x{} px",
            image.width(),
            image.height()
        );
        log::info!("[OCR] Local image size: {:.2} KB", image_size_kb(image));
        let start = std::time::Instant::now();
        let outcome = self.run_engine(image).await;
        log::info!("[OCR] Tesseract finished in {}ms", start.elapsed().as_millis());
        engine_text_or_sentinel(outcome)
    }
}

/// Size of the decoded pixel buffer handed to the engine.
pub fn image_size_kb(image: &DynamicImage) -> f64 {
    image.as_bytes().len() as f64 / 1024.0
}

/// Map raw engine output to what callers see: trimmed text, [`NO_TEXT`] for
/// an empty page, [`LOCAL_OCR_FAILED`] for any engine error.
pub fn engine_text_or_sentinel(outcome: Result<String, LocalOcrError>) -> String {
    match outcome {
        Ok(text) => {
            let text = text.trim();
            if text.is_empty() {
                NO_TEXT.to_string()
            } else {
                text.to_string()
            }
        }
        Err(e) => {
            log::error!("[OCR] Local recognition failed: {}", e);
            LOCAL_OCR_FAILED.to_string()
        }
    }
}
