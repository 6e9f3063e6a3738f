//! OCR domain: two interchangeable backends behind one coordinator.
//!
//! - `local.rs`       on-device Tesseract, text only
//! - `vision.rs`      Google Cloud Vision, text + ranked labels
//! - `mode.rs`        process-wide remote/local selection
//! - `coordinator.rs` backend choice, fallback, result normalization
//!
//! External code should go through [`OcrCoordinator`]; the backends are
//! public so they can be benchmarked and faked.

pub mod coordinator;
pub mod local;
pub mod mode;
pub mod vision;

pub use coordinator::OcrCoordinator;
pub use local::TesseractRecognizer;
pub use mode::{ModeFlag, OcrMode};
pub use vision::CloudVisionClient;

use crate::error::VisionError;
use async_trait::async_trait;
use image::DynamicImage;

/// Recognizer ran and found nothing. Shared by both backends.
pub const NO_TEXT: &str = "No text recognized.";
/// Local engine failed internally.
pub const LOCAL_OCR_FAILED: &str = "OCR failed. Try again.";
/// The still could not be captured or decoded.
pub const CAPTURE_FAILED: &str = "Capture failed. Please try again.";
/// Shown before the first capture.
pub const NOT_YET_CAPTURED: &str = "Recognized text will appear here";

/// Labels exposed per capture.
pub const MAX_LABELS: usize = 2;

/// What one capture produces: text plus at most [`MAX_LABELS`] label names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    pub text: String,
    pub labels: Vec<String>,
}

impl RecognitionResult {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            labels: Vec::new(),
        }
    }

    /// Drop confidences, keep the top names in rank order.
    pub fn from_vision(output: VisionOutput) -> Self {
        Self {
            text: output.text,
            labels: rank_labels(output.labels)
                .into_iter()
                .map(|label| label.name)
                .collect(),
        }
    }
}

/// A content label as reported by the remote backend.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelCandidate {
    pub name: String,
    /// 0.0–1.0
    pub confidence: f32,
}

impl LabelCandidate {
    pub fn new(name: impl Into<String>, confidence: f32) -> Self {
        Self {
            name: name.into(),
            confidence,
        }
    }
}

/// Raw output of the remote backend.
#[derive(Debug, Clone, PartialEq)]
pub struct VisionOutput {
    pub text: String,
    pub labels: Vec<LabelCandidate>,
}

/// Sort descending by confidence (stable for ties) and keep the top two.
pub fn rank_labels(mut labels: Vec<LabelCandidate>) -> Vec<LabelCandidate> {
    labels.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    labels.truncate(MAX_LABELS);
    labels
}

/// On-device text recognition. Never fails: errors become sentinel text.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &DynamicImage) -> String;
}

/// Remote text + label detection. Any error sends the coordinator to the
/// local backend.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    async fn recognize(&self, image: &DynamicImage) -> Result<VisionOutput, VisionError>;
}
