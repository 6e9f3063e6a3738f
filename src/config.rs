//! Application configuration.
//!
//! Resolution order (later wins):
//! 1. Built-in defaults
//! 2. `~/.config/tts-ocr/config.json` (platform config dir)
//! 3. Environment variables (`.env.local` / `.env` are loaded at startup)
//!
//! The vision API key is never written to the config file. It comes from
//! `VISION_API_KEY` or, failing that, the OS keychain.

use crate::connectivity;
use crate::error::ConfigError;
use crate::ocr::{local, vision};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const KEYCHAIN_SERVICE: &str = "tts-ocr";
const KEYCHAIN_USER: &str = "vision";

pub const DEFAULT_DOUBLE_PRESS_MS: u64 = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub vision_endpoint: String,
    #[serde(skip)]
    pub vision_api_key: Option<String>,
    /// Tesseract language(s), e.g. "eng" or "eng+hin".
    pub ocr_lang: String,
    /// Speech program plus leading args; auto-detected when unset.
    pub tts_command: Option<String>,
    /// host:port probed to decide remote vs local OCR.
    pub connectivity_host: String,
    pub double_press_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            vision_endpoint: vision::DEFAULT_ENDPOINT.to_string(),
            vision_api_key: None,
            ocr_lang: local::DEFAULT_LANG.to_string(),
            tts_command: None,
            connectivity_host: connectivity::DEFAULT_HOST.to_string(),
            double_press_ms: DEFAULT_DOUBLE_PRESS_MS,
        }
    }
}

/// Directory where the config file lives.
fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tts-ocr")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

impl AppConfig {
    /// Full resolution: file, then environment, then keychain for the key.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&config_path())?;
        config.apply_overrides(|key| std::env::var(key).ok());
        if config.vision_api_key.is_none() {
            config.vision_api_key = keychain_api_key();
        }
        log::info!(
            "[CONFIG] endpoint={}, lang={}, api key present: {}",
            config.vision_endpoint,
            config.ocr_lang,
            config.vision_api_key.is_some()
        );
        Ok(config)
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist to `path`, creating its directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("[CONFIG] Saved config to {}", path.display());
        Ok(())
    }

    /// Apply environment-style overrides from `lookup`. Empty values are
    /// ignored; an unparsable `DOUBLE_PRESS_MS` keeps the current value.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("VISION_API_KEY") {
            self.vision_api_key = Some(key);
        }
        if let Some(endpoint) = get("VISION_ENDPOINT") {
            self.vision_endpoint = endpoint;
        }
        if let Some(lang) = get("OCR_LANG") {
            self.ocr_lang = lang;
        }
        if let Some(command) = get("TTS_COMMAND") {
            self.tts_command = Some(command);
        }
        if let Some(host) = get("CONNECTIVITY_HOST") {
            self.connectivity_host = host;
        }
        if let Some(ms) = get("DOUBLE_PRESS_MS") {
            match ms.trim().parse() {
                Ok(ms) => self.double_press_ms = ms,
                Err(_) => log::warn!("[CONFIG] Ignoring invalid DOUBLE_PRESS_MS: {}", ms),
            }
        }
    }
}

fn keychain_api_key() -> Option<String> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, KEYCHAIN_USER).ok()?;
    match entry.get_password() {
        Ok(key) if !key.is_empty() => {
            log::info!("[CONFIG] Loaded vision API key from OS keychain");
            Some(key)
        }
        _ => None,
    }
}

/// Store the vision API key in the OS keychain. Surrounding whitespace is
/// dropped; a blank key is rejected before the keychain is touched.
pub fn save_api_key(api_key: &str) -> Result<(), ConfigError> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err(ConfigError::EmptyApiKey);
    }
    keyring::Entry::new(KEYCHAIN_SERVICE, KEYCHAIN_USER)?.set_password(api_key)?;
    log::info!("[CONFIG] Vision API key saved to OS keychain");
    Ok(())
}
