//! tts-ocr: capture a photo, recognize its text, speak it.
//!
//! This file only declares modules and wires the application together.
//!
//! Domains:
//!   - capture/      still acquisition, decode, hand-off to OCR
//!   - ocr/          local + remote backends, mode flag, coordinator
//!   - speech/       speech engine seam, label/text announcer
//!   - session.rs    button-driven interaction loop
//!   - connectivity.rs, config.rs, error.rs: support code

pub mod capture;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod ocr;
pub mod session;
pub mod speech;

use capture::{CaptureController, FileCamera};
use config::AppConfig;
use connectivity::TcpProbe;
use error::AppError;
use ocr::{CloudVisionClient, ModeFlag, OcrCoordinator, OcrMode, TesseractRecognizer};
use session::{Button, ButtonTracker, Flow, Session};
use speech::{CommandSpeech, SpeechEngine};
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncBufReadExt;

/// Load `.env.local`, else `.env`, from the working directory or the crate
/// root. Runs before the logger exists, so it reports on stderr.
pub fn load_env() {
    let manifest_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let roots = [PathBuf::from("."), manifest_dir.to_path_buf()];

    'env_load: for root in &roots {
        for env_file in [".env.local", ".env"] {
            let path = root.join(env_file);
            if path.exists() {
                match dotenvy::from_path(&path) {
                    Ok(_) => eprintln!("[STARTUP] Loaded {}", path.display()),
                    Err(e) => eprintln!("[STARTUP] Failed to load {}: {}", path.display(), e),
                }
                break 'env_load;
            }
        }
    }
}

/// What the binary was asked to do.
#[derive(Debug, PartialEq, Eq)]
pub enum Invocation {
    /// Run the session, capturing from this image file.
    Run(PathBuf),
    /// Store the vision API key in the OS keychain.
    SetApiKey(String),
    /// Write the resolved configuration to the config file.
    InitConfig,
}

/// Parse arguments (without the program name). `None` means print usage.
pub fn parse_args(args: impl IntoIterator<Item = OsString>) -> Option<Invocation> {
    let mut args = args.into_iter();
    let first = args.next()?;
    let invocation = match first.to_str() {
        Some("--set-api-key") => Invocation::SetApiKey(args.next()?.into_string().ok()?),
        Some("--init-config") => Invocation::InitConfig,
        Some(flag) if flag.starts_with("--") => return None,
        _ => Invocation::Run(PathBuf::from(&first)),
    };
    if args.next().is_some() {
        return None;
    }
    Some(invocation)
}

/// Dispatch a parsed invocation.
pub async fn execute(invocation: Invocation) -> Result<(), AppError> {
    match invocation {
        Invocation::Run(image_path) => run(image_path).await,
        Invocation::SetApiKey(key) => {
            config::save_api_key(&key)?;
            eprintln!("Vision API key stored in the OS keychain");
            Ok(())
        }
        Invocation::InitConfig => {
            let path = config::config_path();
            AppConfig::load()?.save_to(&path)?;
            eprintln!("Wrote {}", path.display());
            Ok(())
        }
    }
}

/// Build every component and run the console interaction loop.
///
/// `image_path` is the still the file camera hands out on each capture.
/// Button names (`down`, `up`, `tap`) are read from stdin, one per line.
pub async fn run(image_path: PathBuf) -> Result<(), AppError> {
    let config = AppConfig::load()?;

    let speech: Arc<dyn SpeechEngine> =
        Arc::new(CommandSpeech::detect(config.tts_command.as_deref())?);
    let coordinator = OcrCoordinator::new(
        Arc::new(TesseractRecognizer::new(config.ocr_lang.clone())),
        Arc::new(CloudVisionClient::from_config(&config)),
        ModeFlag::new(OcrMode::Local),
    )?;
    let capture = CaptureController::new(Arc::new(FileCamera::new(image_path)), coordinator.clone());
    let probe = Arc::new(TcpProbe::new(
        config.connectivity_host.clone(),
        connectivity::DEFAULT_TIMEOUT,
    ));

    let mut session = Session::new(coordinator, capture, speech, probe);
    session.start().await;

    let mut tracker = ButtonTracker::new(Duration::from_millis(config.double_press_ms));
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut flow = Flow::Continue;
    while let Some(line) = lines.next_line().await? {
        let Some(button) = Button::parse(&line) else {
            log::warn!("[SESSION] Unknown button {:?} (use down, up or tap)", line.trim());
            continue;
        };
        let command = tracker.press(button, Instant::now());
        flow = session.handle(command).await;
        if flow == Flow::Exit {
            break;
        }
    }

    // stdin closed without an explicit exit
    if flow != Flow::Exit {
        session.handle(session::SessionCommand::Exit).await;
    }
    session.wait_for_speech().await;
    Ok(())
}
