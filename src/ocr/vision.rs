//! Google Cloud Vision client: TEXT_DETECTION + LABEL_DETECTION in one call.
//!
//! Request shape:
//! - API key in URL query param, not header
//! - image downscaled to fit 2560×1920, JPEG q70, base64 (no wrapping)
//!
//! Response shape:
//! - full text in `responses[0].textAnnotations[0].description`
//! - labels in `responses[0].labelAnnotations[*].{description,score}`
//!
//! Errors are returned, never swallowed here: the coordinator decides what
//! a failure means.

use super::{rank_labels, LabelCandidate, VisionBackend, VisionOutput, NO_TEXT};
use crate::config::AppConfig;
use crate::error::VisionError;
use async_trait::async_trait;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use regex::Regex;
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::OnceLock;

pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";
pub const MAX_WIDTH: u32 = 2560;
pub const MAX_HEIGHT: u32 = 1920;
pub const JPEG_QUALITY: u8 = 70;

pub struct CloudVisionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl CloudVisionClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.vision_endpoint.clone(), config.vision_api_key.clone())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

#[async_trait]
impl VisionBackend for CloudVisionClient {
    async fn recognize(&self, image: &DynamicImage) -> Result<VisionOutput, VisionError> {
        let api_key = match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => return Err(VisionError::MissingApiKey),
        };

        // Resize + JPEG encode is CPU work; keep it off the async workers.
        let owned = image.clone();
        let encoded = tokio::task::spawn_blocking(move || prepare_payload(&owned)).await??;
        log::info!(
            "[VISION] Payload: {:.2} KB base64",
            encoded.len() as f64 / 1024.0
        );

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", api_key)])
            .header("content-type", "application/json")
            .json(&build_request_body(&encoded))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        log::info!(
            "[VISION] Response {} in {}ms",
            status,
            start.elapsed().as_millis()
        );
        log::debug!("[VISION] Body: {}", body);

        check_status(status.as_u16(), &body)?;
        let output = parse_response(&body)?;
        log::info!(
            "[VISION] Extracted {} chars, top labels: {:?}",
            output.text.len(),
            output.labels
        );
        Ok(output)
    }
}

/// Downscale (if needed), JPEG-encode and base64 the image.
pub fn prepare_payload(image: &DynamicImage) -> Result<String, VisionError> {
    let resized = downscale(image);
    log::info!(
        "[VISION] Request resolution: {}x{} px",
        resized.width(),
        resized.height()
    );
    let jpeg = encode_jpeg(&resized)?;
    log::info!("[VISION] JPEG size: {:.2} KB", jpeg.len() as f64 / 1024.0);
    Ok(base64::engine::general_purpose::STANDARD.encode(jpeg))
}

/// Fit within [`MAX_WIDTH`]×[`MAX_HEIGHT`], preserving aspect ratio.
/// Images already inside the box are borrowed untouched.
pub fn downscale(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    if image.width() <= MAX_WIDTH && image.height() <= MAX_HEIGHT {
        return Cow::Borrowed(image);
    }
    log::info!(
        "[VISION] Downscaling {}x{} to fit {}x{}",
        image.width(),
        image.height(),
        MAX_WIDTH,
        MAX_HEIGHT
    );
    Cow::Owned(image.resize(MAX_WIDTH, MAX_HEIGHT, image::imageops::FilterType::Triangle))
}

pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>, VisionError> {
    let rgb = image.to_rgb8();
    let mut jpeg = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY))?;
    Ok(jpeg)
}

pub fn build_request_body(base64_image: &str) -> serde_json::Value {
    serde_json::json!({
        "requests": [
            {
                "image": {
                    "content": base64_image
                },
                "features": [
                    {"type": "TEXT_DETECTION"},
                    {"type": "LABEL_DETECTION"}
                ]
            }
        ]
    })
}

fn invalid_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)api key not valid").expect("static regex"))
}

/// Map an HTTP status + body to an error, or `Ok` for 2xx.
pub fn check_status(status: u16, body: &str) -> Result<(), VisionError> {
    if status == 400 && invalid_key_pattern().is_match(body) {
        log::warn!("[VISION] Invalid API key detected");
        return Err(VisionError::InvalidApiKey);
    }
    if !(200..300).contains(&status) {
        return Err(VisionError::Status {
            status,
            body: body.to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    label_annotations: Vec<EntityAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
    #[serde(default)]
    score: f32,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    message: String,
}

/// Parse a successful `images:annotate` body.
pub fn parse_response(body: &str) -> Result<VisionOutput, VisionError> {
    let parsed: AnnotateResponse = serde_json::from_str(body)?;
    let Some(first) = parsed.responses.into_iter().next() else {
        log::warn!("[VISION] No responses in body");
        return Ok(VisionOutput {
            text: NO_TEXT.to_string(),
            labels: Vec::new(),
        });
    };

    if let Some(status) = first.error {
        return Err(VisionError::Api(status.message));
    }

    let text = first
        .text_annotations
        .into_iter()
        .next()
        .map(|annotation| annotation.description)
        .unwrap_or_else(|| NO_TEXT.to_string());

    let labels = first
        .label_annotations
        .into_iter()
        .map(|annotation| LabelCandidate::new(annotation.description, annotation.score))
        .collect();

    Ok(VisionOutput {
        text,
        labels: rank_labels(labels),
    })
}
