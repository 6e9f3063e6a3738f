//! Speech domain: the engine seam and the label/text announcer.
//!
//! `SpeechEngine::speak` resolves when the engine reports the utterance
//! done, which is what lets the announcer chain utterances with `.await`
//! instead of completion callbacks.

pub mod announcer;
pub mod command;

pub use announcer::{Announcer, RandomPicker, TemplatePicker};
pub use command::CommandSpeech;

use crate::error::SpeechError;
use async_trait::async_trait;

/// Utterance ids, for logs and engines that track them.
pub const LABELS_UTTERANCE: &str = "labels";
pub const TEXT_UTTERANCE: &str = "text";
pub const PROMPT_UTTERANCE: &str = "prompt";

#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Speak `text`, flushing anything already playing. Resolves when the
    /// utterance finishes, fails, or is interrupted.
    async fn speak(&self, utterance_id: &str, text: &str) -> Result<(), SpeechError>;

    /// Cut off the current utterance, if any.
    fn stop(&self);

    fn is_speaking(&self) -> bool;
}
