//! The non-visual interaction loop.
//!
//! Hardware-style buttons drive everything:
//! - volume down twice (within the double-press window) → capture
//! - volume down once → repeat the last recognized text
//! - volume up → exit
//! - double tap → stop speaking
//!
//! Commands are handled one at a time from a single task, so two captures
//! never overlap. Announcements run in the background so a double tap can
//! still cut them off.

use crate::capture::CaptureController;
use crate::connectivity::ConnectivityProbe;
use crate::error::SpeechError;
use crate::ocr::{OcrCoordinator, OcrMode, NOT_YET_CAPTURED, NO_TEXT};
use crate::speech::{Announcer, SpeechEngine, PROMPT_UTTERANCE};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

pub const INTRO: &str = "App is ready. Press volume down twice to capture an image. \
Press once to repeat the last text. Press volume up to exit.";
pub const CAPTURING: &str = "Capturing text...";
pub const REPEATING: &str = "Repeating text...";
pub const NOTHING_TO_REPEAT: &str = "No text available to repeat.";
pub const EXITING: &str = "Exiting...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    VolumeDown,
    VolumeUp,
    DoubleTap,
}

impl Button {
    /// Parse a button name as typed on the console.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "down" | "d" => Some(Button::VolumeDown),
            "up" | "u" => Some(Button::VolumeUp),
            "tap" | "t" => Some(Button::DoubleTap),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Capture,
    Repeat,
    StopSpeaking,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Turns raw button presses into commands.
#[derive(Debug)]
pub struct ButtonTracker {
    double_press: Duration,
    last_down: Option<Instant>,
}

impl ButtonTracker {
    pub fn new(double_press: Duration) -> Self {
        Self {
            double_press,
            last_down: None,
        }
    }

    /// A volume-down press within the window of the previous one is a
    /// capture; otherwise it is a repeat.
    pub fn press(&mut self, button: Button, at: Instant) -> SessionCommand {
        match button {
            Button::VolumeUp => SessionCommand::Exit,
            Button::DoubleTap => SessionCommand::StopSpeaking,
            Button::VolumeDown => {
                let is_double = self
                    .last_down
                    .is_some_and(|last| at.saturating_duration_since(last) <= self.double_press);
                self.last_down = Some(at);
                if is_double {
                    SessionCommand::Capture
                } else {
                    SessionCommand::Repeat
                }
            }
        }
    }
}

pub struct Session {
    coordinator: Arc<OcrCoordinator>,
    capture: CaptureController,
    speech: Arc<dyn SpeechEngine>,
    announcer: Announcer,
    probe: Arc<dyn ConnectivityProbe>,
    /// Last probe result; the mode is only recomputed when this changes.
    online: Option<bool>,
    captured_text: String,
    last_labels: Vec<String>,
    speaking: Option<JoinHandle<()>>,
    exiting: bool,
}

impl Session {
    pub fn new(
        coordinator: Arc<OcrCoordinator>,
        capture: CaptureController,
        speech: Arc<dyn SpeechEngine>,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Self {
        let announcer = Announcer::new(speech.clone());
        Self {
            coordinator,
            capture,
            speech,
            announcer,
            probe,
            online: None,
            captured_text: NOT_YET_CAPTURED.to_string(),
            last_labels: Vec::new(),
            speaking: None,
            exiting: false,
        }
    }

    /// Swap in a differently configured announcer (e.g. a fixed template).
    pub fn with_announcer(mut self, announcer: Announcer) -> Self {
        self.announcer = announcer;
        self
    }

    pub fn captured_text(&self) -> &str {
        &self.captured_text
    }

    pub fn last_labels(&self) -> &[String] {
        &self.last_labels
    }

    pub fn mode(&self) -> OcrMode {
        self.coordinator.mode()
    }

    /// Pick the initial OCR mode and speak the instructions.
    pub async fn start(&mut self) {
        self.refresh_mode(false).await;
        log::info!("[SESSION] Ready, OCR mode: {}", self.coordinator.mode());
        self.speak_in_background(vec![INTRO.to_string()]);
    }

    pub async fn handle(&mut self, command: SessionCommand) -> Flow {
        if self.exiting {
            return Flow::Exit;
        }
        log::info!("[SESSION] Command: {:?}", command);
        match command {
            SessionCommand::Capture => {
                self.capture().await;
                Flow::Continue
            }
            SessionCommand::Repeat => {
                self.repeat();
                Flow::Continue
            }
            SessionCommand::StopSpeaking => {
                self.stop_speaking();
                Flow::Continue
            }
            SessionCommand::Exit => self.exit().await,
        }
    }

    /// Wait for whatever is being spoken in the background to finish.
    pub async fn wait_for_speech(&mut self) {
        if let Some(handle) = self.speaking.take() {
            let _ = handle.await;
        }
    }

    async fn capture(&mut self) {
        self.silence();
        self.refresh_mode(true).await;

        self.captured_text.clear();
        self.say(CAPTURING).await;

        let result = self.capture.capture_and_recognize().await;
        log::info!("[SESSION] Captured text: {:?}", result.text);
        self.captured_text = if result.text.is_empty() {
            NO_TEXT.to_string()
        } else {
            result.text
        };
        self.last_labels = result.labels;

        let handle = self
            .announcer
            .announce(&self.captured_text, &self.last_labels);
        self.speaking = Some(handle);
    }

    fn repeat(&mut self) {
        self.silence();
        if !self.captured_text.is_empty() && self.captured_text != NOT_YET_CAPTURED {
            log::info!("[SESSION] Repeating text: {:?}", self.captured_text);
            self.speak_in_background(vec![REPEATING.to_string(), self.captured_text.clone()]);
        } else {
            log::info!("[SESSION] No text available to repeat");
            self.speak_in_background(vec![NOTHING_TO_REPEAT.to_string()]);
        }
    }

    fn stop_speaking(&mut self) {
        if self.speech.is_speaking() {
            self.silence();
            self.speech.stop();
            log::info!("[SESSION] Speech stopped");
        } else {
            log::info!("[SESSION] Stop requested, but nothing is being spoken");
        }
    }

    async fn exit(&mut self) -> Flow {
        self.exiting = true;
        self.silence();
        self.capture.shutdown();
        self.say(EXITING).await;
        log::info!("[SESSION] Exiting");
        Flow::Exit
    }

    /// Re-probe connectivity; if it changed, pick the matching OCR mode.
    async fn refresh_mode(&mut self, announce: bool) {
        let online = self.probe.is_online().await;
        if self.online == Some(online) {
            return;
        }
        self.online = Some(online);

        let mode = OcrMode::from_remote(online);
        if self.coordinator.mode() != mode {
            self.coordinator.set_mode(online);
            if announce {
                self.say(&format!("Switched to {} OCR", mode)).await;
            }
        }
    }

    /// Cancel background speech (announcements, repeats, the intro).
    fn silence(&mut self) {
        self.announcer.stop();
        if let Some(handle) = self.speaking.take() {
            handle.abort();
        }
    }

    async fn say(&self, text: &str) {
        if let Err(e) = self.speech.speak(PROMPT_UTTERANCE, text).await {
            log::warn!("[SESSION] Could not speak {:?}: {}", text, e);
        }
    }

    fn speak_in_background(&mut self, lines: Vec<String>) {
        let engine = self.speech.clone();
        self.speaking = Some(tokio::spawn(async move {
            for line in lines {
                match engine.speak(PROMPT_UTTERANCE, &line).await {
                    Ok(()) => {}
                    Err(SpeechError::Interrupted) => break,
                    Err(e) => log::warn!("[SESSION] Could not speak {:?}: {}", line, e),
                }
            }
        }));
    }
}
