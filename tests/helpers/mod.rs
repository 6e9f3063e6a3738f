//! Shared fakes for the integration tests.
//!
//! Only one `OcrCoordinator` may exist per process and the tests in one file
//! run on parallel threads, so every test that builds a coordinator holds
//! [`exclusive`] for its whole body.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tts_ocr_lib::capture::Camera;
use tts_ocr_lib::connectivity::ConnectivityProbe;
use tts_ocr_lib::error::{CaptureError, SpeechError, VisionError};
use tts_ocr_lib::ocr::{TextRecognizer, VisionBackend, VisionOutput};
use tts_ocr_lib::speech::{SpeechEngine, TemplatePicker};

static COORDINATOR_LOCK: Mutex<()> = Mutex::new(());

pub fn exclusive() -> MutexGuard<'static, ()> {
    COORDINATOR_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn blank_image() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([255, 255, 255])))
}

pub fn blank_png() -> Vec<u8> {
    let mut png = Vec::new();
    blank_image()
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();
    png
}

/// Local backend that always answers `text` and counts calls.
pub struct FakeLocal {
    pub text: String,
    pub calls: AtomicUsize,
}

impl FakeLocal {
    pub fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextRecognizer for FakeLocal {
    async fn recognize(&self, _image: &DynamicImage) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.text.clone()
    }
}

/// Remote backend that replays a canned outcome.
pub enum FakeRemote {
    Ok(VisionOutput),
    Network,
    InvalidKey,
    ServerError,
}

impl FakeRemote {
    pub fn ok(text: &str, labels: &[(&str, f32)]) -> Arc<Self> {
        Arc::new(FakeRemote::Ok(VisionOutput {
            text: text.to_string(),
            labels: labels
                .iter()
                .map(|(name, score)| tts_ocr_lib::ocr::LabelCandidate::new(*name, *score))
                .collect(),
        }))
    }
}

#[async_trait]
impl VisionBackend for FakeRemote {
    async fn recognize(&self, _image: &DynamicImage) -> Result<VisionOutput, VisionError> {
        match self {
            FakeRemote::Ok(output) => Ok(output.clone()),
            FakeRemote::Network => Err(VisionError::Api("connection reset".to_string())),
            FakeRemote::InvalidKey => Err(VisionError::InvalidApiKey),
            FakeRemote::ServerError => Err(VisionError::Status {
                status: 500,
                body: "internal".to_string(),
            }),
        }
    }
}

/// Speech engine that records utterances and takes `delay` to say each one.
pub struct RecordingSpeech {
    pub delay: Duration,
    pub spoken: Mutex<Vec<String>>,
    speaking: AtomicBool,
    stopped: AtomicUsize,
}

impl RecordingSpeech {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            spoken: Mutex::new(Vec::new()),
            speaking: AtomicBool::new(false),
            stopped: AtomicUsize::new(0),
        })
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechEngine for RecordingSpeech {
    async fn speak(&self, _utterance_id: &str, text: &str) -> Result<(), SpeechError> {
        self.spoken.lock().unwrap().push(text.to_string());
        self.speaking.store(true, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.speaking.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.stopped.fetch_add(1, Ordering::SeqCst);
        self.speaking.store(false, Ordering::SeqCst);
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }
}

pub struct FixedPicker(pub usize);

impl TemplatePicker for FixedPicker {
    fn pick(&self, _count: usize) -> usize {
        self.0
    }
}

/// Camera returning fixed bytes, or failing.
pub struct FakeCamera {
    pub still: Option<Vec<u8>>,
    pub released: AtomicBool,
}

impl FakeCamera {
    pub fn with_still(still: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            still: Some(still),
            released: AtomicBool::new(false),
        })
    }

    pub fn broken() -> Arc<Self> {
        Arc::new(Self {
            still: None,
            released: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl Camera for FakeCamera {
    async fn capture_still(&self) -> Result<Vec<u8>, CaptureError> {
        match &self.still {
            Some(bytes) => Ok(bytes.clone()),
            None => Err(CaptureError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "camera driver error",
            ))),
        }
    }

    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Connectivity that the test flips by hand.
pub struct FakeProbe(pub AtomicBool);

impl FakeProbe {
    pub fn new(online: bool) -> Arc<Self> {
        Arc::new(Self(AtomicBool::new(online)))
    }

    pub fn set(&self, online: bool) {
        self.0.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityProbe for FakeProbe {
    async fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
