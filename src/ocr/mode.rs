//! Remote-vs-local backend selection, shared across tasks.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrMode {
    Remote,
    Local,
}

impl OcrMode {
    pub fn from_remote(use_remote: bool) -> Self {
        if use_remote {
            OcrMode::Remote
        } else {
            OcrMode::Local
        }
    }

    pub fn is_remote(self) -> bool {
        self == OcrMode::Remote
    }
}

impl fmt::Display for OcrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OcrMode::Remote => f.write_str("Google Cloud Vision"),
            OcrMode::Local => f.write_str("Tesseract"),
        }
    }
}

/// Cloneable handle to one atomic mode value. All clones observe the same
/// flag; a read never sees a partial write.
#[derive(Debug, Clone)]
pub struct ModeFlag(Arc<AtomicBool>);

impl ModeFlag {
    pub fn new(mode: OcrMode) -> Self {
        Self(Arc::new(AtomicBool::new(mode.is_remote())))
    }

    pub fn get(&self) -> OcrMode {
        OcrMode::from_remote(self.0.load(Ordering::Acquire))
    }

    /// Store `mode`, returning the previous value.
    pub fn set(&self, mode: OcrMode) -> OcrMode {
        OcrMode::from_remote(self.0.swap(mode.is_remote(), Ordering::AcqRel))
    }
}

impl Default for ModeFlag {
    fn default() -> Self {
        ModeFlag::new(OcrMode::Local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flag = ModeFlag::new(OcrMode::Remote);
        let other = flag.clone();
        assert_eq!(other.set(OcrMode::Local), OcrMode::Remote);
        assert_eq!(flag.get(), OcrMode::Local);
    }

    #[test]
    fn concurrent_writers_leave_a_whole_value() {
        let flag = ModeFlag::default();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let flag = flag.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        flag.set(OcrMode::from_remote(i % 2 == 0));
                        let _ = flag.get();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(matches!(flag.get(), OcrMode::Remote | OcrMode::Local));
    }

    #[test]
    fn display_names_backends() {
        assert_eq!(OcrMode::Remote.to_string(), "Google Cloud Vision");
        assert_eq!(OcrMode::Local.to_string(), "Tesseract");
    }
}
