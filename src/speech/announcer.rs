//! Label + text announcement sequencing.
//!
//! With labels: "<template filled with labels>" → await done → "Detected text: …".
//! Without labels: "Detected text: …" right away.
//!
//! The second utterance starts only after the engine reports the first one
//! finished. `stop()` cancels the pending part of the sequence; it does not
//! touch recognition.

use super::{SpeechEngine, LABELS_UTTERANCE, TEXT_UTTERANCE};
use crate::error::SpeechError;
use crate::ocr::MAX_LABELS;
use rand::Rng;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const TEMPLATES: [&str; 4] = [
    "This might be {}.",
    "I see something that looks like {}.",
    "It appears to be {}.",
    "It seems like {}.",
];

/// Chooses which template to use for a label announcement.
pub trait TemplatePicker: Send + Sync {
    /// Return an index in `0..count`.
    fn pick(&self, count: usize) -> usize;
}

/// Uniformly random choice per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomPicker;

impl TemplatePicker for RandomPicker {
    fn pick(&self, count: usize) -> usize {
        rand::thread_rng().gen_range(0..count)
    }
}

/// Join up to two label names with "or" and drop them into `template`.
pub fn label_phrase(labels: &[String], template: &str) -> Option<String> {
    if labels.is_empty() {
        return None;
    }
    let joined = labels
        .iter()
        .take(MAX_LABELS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" or ");
    Some(template.replacen("{}", &joined, 1))
}

/// "Detected text: <text>." without doubling a trailing period.
pub fn detected_text_phrase(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else if text.ends_with('.') {
        Some(format!("Detected text: {}", text))
    } else {
        Some(format!("Detected text: {}.", text))
    }
}

pub struct Announcer {
    engine: Arc<dyn SpeechEngine>,
    picker: Box<dyn TemplatePicker>,
    cancel: Mutex<CancellationToken>,
}

impl Announcer {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self::with_picker(engine, RandomPicker)
    }

    pub fn with_picker(engine: Arc<dyn SpeechEngine>, picker: impl TemplatePicker + 'static) -> Self {
        Self {
            engine,
            picker: Box::new(picker),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Start announcing. The returned handle finishes when the sequence is
    /// spoken or cancelled; dropping it does not cancel anything.
    pub fn announce(&self, text: &str, labels: &[String]) -> JoinHandle<()> {
        let template = TEMPLATES[self.picker.pick(TEMPLATES.len()) % TEMPLATES.len()];
        let label_text = label_phrase(labels, template);
        let detected = detected_text_phrase(text);
        log::info!("[ANNOUNCE] Labels: {:?}", label_text);

        let token = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let engine = self.engine.clone();
        tokio::spawn(run_sequence(engine, token, label_text, detected))
    }

    /// Cancel the in-flight sequence. Later `announce` calls are unaffected.
    pub fn stop(&self) {
        log::info!("[ANNOUNCE] Stopping pending announcement");
        let mut token = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        token.cancel();
        *token = CancellationToken::new();
    }
}

async fn run_sequence(
    engine: Arc<dyn SpeechEngine>,
    token: CancellationToken,
    label_text: Option<String>,
    detected: Option<String>,
) {
    if let Some(label_text) = label_text {
        let spoken = tokio::select! {
            spoken = engine.speak(LABELS_UTTERANCE, &label_text) => spoken,
            _ = token.cancelled() => return,
        };
        match spoken {
            Ok(()) => log::debug!("[ANNOUNCE] Finished speaking labels"),
            Err(SpeechError::Interrupted) => return,
            // An engine error still counts as done; the text must not be lost.
            Err(e) => log::warn!("[ANNOUNCE] Label utterance failed: {}", e),
        }
        if token.is_cancelled() {
            return;
        }
    }

    if let Some(detected) = detected {
        tokio::select! {
            spoken = engine.speak(TEXT_UTTERANCE, &detected) => {
                if let Err(e) = spoken {
                    log::warn!("[ANNOUNCE] Text utterance failed: {}", e);
                }
            }
            _ = token.cancelled() => {}
        }
    }
}
