//! Desktop speech engine: one system TTS process per utterance.
//!
//! Tries `say` (macOS), then `espeak-ng`, then `espeak`, unless a command is
//! configured. An utterance is done when its process exits. A new utterance
//! or `stop()` kills the running process.

use super::SpeechEngine;
use crate::error::SpeechError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

const CANDIDATES: [&str; 3] = ["say", "espeak-ng", "espeak"];

pub struct CommandSpeech {
    program: PathBuf,
    args: Vec<String>,
    /// Cancelled to flush whatever is playing.
    current: Mutex<CancellationToken>,
    active: AtomicUsize,
}

impl CommandSpeech {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            current: Mutex::new(CancellationToken::new()),
            active: AtomicUsize::new(0),
        }
    }

    /// Use `configured` (program plus leading args, whitespace separated) or
    /// the first known TTS program found on PATH.
    pub fn detect(configured: Option<&str>) -> Result<Self, SpeechError> {
        if let Some(command) = configured {
            let mut parts = command.split_whitespace();
            if let Some(program) = parts.next() {
                let path = which::which(program)
                    .map_err(|_| SpeechError::NoEngine(program.to_string()))?;
                log::info!("[SPEECH] Using configured engine: {}", path.display());
                return Ok(Self::new(path, parts.map(str::to_string).collect()));
            }
        }

        for candidate in CANDIDATES {
            if let Ok(path) = which::which(candidate) {
                log::info!("[SPEECH] Using engine: {}", path.display());
                return Ok(Self::new(path, Vec::new()));
            }
        }
        Err(SpeechError::NoEngine(CANDIDATES.join(", ")))
    }

    /// Cancel the running utterance and hand out a token for the next one.
    fn flush(&self) -> CancellationToken {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        current.cancel();
        *current = CancellationToken::new();
        current.clone()
    }
}

/// Counts one running utterance for as long as it lives. Dropping the
/// `speak` future mid-utterance still decrements.
struct ActiveUtterance<'a>(&'a AtomicUsize);

impl<'a> ActiveUtterance<'a> {
    fn enter(active: &'a AtomicUsize) -> Self {
        active.fetch_add(1, Ordering::AcqRel);
        Self(active)
    }
}

impl Drop for ActiveUtterance<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

#[async_trait]
impl SpeechEngine for CommandSpeech {
    async fn speak(&self, utterance_id: &str, text: &str) -> Result<(), SpeechError> {
        let token = self.flush();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let _active = ActiveUtterance::enter(&self.active);
        log::debug!("[SPEECH] {} started: {:?}", utterance_id, text);
        let outcome = tokio::select! {
            status = child.wait() => Some(status),
            _ = token.cancelled() => None,
        };
        if outcome.is_none() {
            let _ = child.kill().await;
        }

        match outcome {
            Some(Ok(status)) if status.success() => {
                log::debug!("[SPEECH] {} done", utterance_id);
                Ok(())
            }
            Some(Ok(status)) => Err(SpeechError::Failed(format!(
                "{} exited with {}",
                self.program.display(),
                status
            ))),
            Some(Err(e)) => Err(SpeechError::Spawn(e)),
            None => {
                log::debug!("[SPEECH] {} interrupted", utterance_id);
                Err(SpeechError::Interrupted)
            }
        }
    }

    fn stop(&self) {
        log::info!("[SPEECH] Stopping speech");
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    fn is_speaking(&self) -> bool {
        self.active.load(Ordering::Acquire) > 0
    }
}
