#[tokio::main]
async fn main() {
    tts_ocr_lib::load_env();
    env_logger::init();

    let Some(invocation) = tts_ocr_lib::parse_args(std::env::args_os().skip(1)) else {
        eprintln!("Usage:");
        eprintln!("  tts-ocr <image>               run; type down / up / tap (one per line) to press buttons");
        eprintln!("  tts-ocr --set-api-key <key>   store the Cloud Vision key in the OS keychain");
        eprintln!("  tts-ocr --init-config         write the current settings to the config file");
        std::process::exit(1);
    };

    if let Err(e) = tts_ocr_lib::execute(invocation).await {
        log::error!("tts-ocr failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
