//! OCR benchmark CLI for tts-ocr.
//!
//! Times the on-device Tesseract backend against Google Cloud Vision using
//! the same recognizers the app runs.
//!
//! Usage:
//!   cargo run -- <image.png>                    Single image, local OCR
//!   cargo run -- <image.png> --remote           Single image, Cloud Vision
//!   cargo run -- <image.png> --compare          Single image, both backends side-by-side
//!   cargo run -- --batch <directory>            All images in directory → CSV
//!   cargo run -- --batch <directory> --remote   Batch with Cloud Vision
//!   cargo run -- --batch <directory> --compare  Batch with both backends
//!
//! Cloud Vision needs `VISION_API_KEY` (env, `.env`, config file or keychain).

use image::DynamicImage;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tts_ocr_lib::config::AppConfig;
use tts_ocr_lib::ocr::{
    CloudVisionClient, TesseractRecognizer, TextRecognizer, VisionBackend, VisionOutput,
};

/// One recognition run.
struct Sample {
    text: String,
    labels: Vec<String>,
    wall_ms: f64,
    ok: bool,
}

struct Backends {
    local: TesseractRecognizer,
    remote: CloudVisionClient,
}

impl Backends {
    async fn run_local(&self, image: &DynamicImage) -> Sample {
        let start = Instant::now();
        let text = self.local.recognize(image).await;
        Sample {
            ok: text != tts_ocr_lib::ocr::LOCAL_OCR_FAILED,
            text,
            labels: Vec::new(),
            wall_ms: start.elapsed().as_micros() as f64 / 1000.0,
        }
    }

    async fn run_remote(&self, image: &DynamicImage) -> Sample {
        let start = Instant::now();
        let outcome = self.remote.recognize(image).await;
        let wall_ms = start.elapsed().as_micros() as f64 / 1000.0;
        match outcome {
            Ok(VisionOutput { text, labels }) => Sample {
                text,
                labels: labels.into_iter().map(|l| l.name).collect(),
                wall_ms,
                ok: true,
            },
            Err(e) => {
                eprintln!("[VISION] {}", e);
                Sample {
                    text: String::new(),
                    labels: Vec::new(),
                    wall_ms,
                    ok: false,
                }
            }
        }
    }
}

#[tokio::main]
async fn main() {
    tts_ocr_lib::load_env();
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage:");
        eprintln!("  ocr-bench <image.png> [--remote] [--compare]");
        eprintln!("  ocr-bench --batch <directory> [--remote] [--compare]");
        std::process::exit(1);
    }

    let use_remote = args.iter().any(|a| a == "--remote");
    let compare = args.iter().any(|a| a == "--compare");

    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Config error: {}", e);
        std::process::exit(1);
    });
    let backends = Backends {
        local: TesseractRecognizer::new(config.ocr_lang.clone()),
        remote: CloudVisionClient::from_config(&config),
    };
    if (use_remote || compare) && !backends.remote.has_api_key() {
        eprintln!("VISION_API_KEY is not set; Cloud Vision runs will fail");
    }

    if args[1] == "--batch" {
        let Some(dir) = args.get(2) else {
            eprintln!("--batch requires a directory path");
            std::process::exit(1);
        };
        run_batch(&backends, dir, use_remote, compare).await;
    } else {
        run_single(&backends, &args[1], use_remote, compare).await;
    }
}

fn load_image(path: &Path) -> DynamicImage {
    image::open(path).unwrap_or_else(|e| {
        eprintln!("Could not open {}: {}", path.display(), e);
        std::process::exit(1);
    })
}

fn preview(text: &str) -> String {
    let display: String = if text.chars().count() > 200 {
        format!("{}...", text.chars().take(200).collect::<String>())
    } else {
        text.to_string()
    };
    display
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

async fn run_single(backends: &Backends, image_path: &str, use_remote: bool, compare: bool) {
    let image = load_image(Path::new(image_path));

    if compare {
        let local = backends.run_local(&image).await;
        let remote = backends.run_remote(&image).await;

        eprintln!("=== COMPARISON: {} ===", image_path);
        eprintln!();
        eprintln!("  TESSERACT:");
        eprintln!("    Wall time: {:.2}ms", local.wall_ms);
        eprintln!("    Chars: {}", local.text.chars().count());
        eprintln!();
        eprintln!("  CLOUD VISION:");
        eprintln!("    Wall time: {:.2}ms", remote.wall_ms);
        eprintln!("    Chars: {}", remote.text.chars().count());
        eprintln!("    Labels: {:?}", remote.labels);
        eprintln!();
        eprintln!("  Same text: {}", local.text.trim() == remote.text.trim());
    } else {
        let (backend, sample) = if use_remote {
            ("cloud-vision", backends.run_remote(&image).await)
        } else {
            ("tesseract", backends.run_local(&image).await)
        };

        println!("{{");
        println!("  \"backend\": \"{}\",", backend);
        println!("  \"ok\": {},", sample.ok);
        println!("  \"wallTimeMs\": {:.2},", sample.wall_ms);
        println!("  \"charCount\": {},", sample.text.chars().count());
        println!("  \"labels\": {:?},", sample.labels);
        println!("  \"textPreview\": \"{}\"", preview(&sample.text));
        println!("}}");
    }
}

async fn run_batch(backends: &Backends, dir_path: &str, use_remote: bool, compare: bool) {
    let dir = Path::new(dir_path);
    if !dir.is_dir() {
        eprintln!("Not a directory: {}", dir_path);
        std::process::exit(1);
    }

    let mut entries: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(read) => read
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext == "png" || ext == "jpg" || ext == "jpeg")
                    .unwrap_or(false)
            })
            .collect(),
        Err(e) => {
            eprintln!("Failed to read {}: {}", dir_path, e);
            std::process::exit(1);
        }
    };
    entries.sort();

    if entries.is_empty() {
        eprintln!("No image files found in {}", dir_path);
        std::process::exit(1);
    }

    if compare {
        println!("filename,chars_local,ms_local,chars_remote,ms_remote,labels_remote,same_text");
    } else {
        println!("filename,backend,ok,char_count,wall_ms,labels");
    }

    let mut latencies_local: Vec<f64> = Vec::new();
    let mut latencies_remote: Vec<f64> = Vec::new();

    for image_path in &entries {
        let filename = image_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let image = load_image(image_path);

        if compare {
            let local = backends.run_local(&image).await;
            let remote = backends.run_remote(&image).await;
            println!(
                "{},{},{:.1},{},{:.1},{},{}",
                filename,
                local.text.chars().count(),
                local.wall_ms,
                remote.text.chars().count(),
                remote.wall_ms,
                remote.labels.join(" | "),
                local.text.trim() == remote.text.trim()
            );
            latencies_local.push(local.wall_ms);
            if remote.ok {
                latencies_remote.push(remote.wall_ms);
            }
        } else {
            let (backend, sample) = if use_remote {
                ("cloud-vision", backends.run_remote(&image).await)
            } else {
                ("tesseract", backends.run_local(&image).await)
            };
            println!(
                "{},{},{},{},{:.1},{}",
                filename,
                backend,
                sample.ok,
                sample.text.chars().count(),
                sample.wall_ms,
                sample.labels.join(" | ")
            );
            if sample.ok {
                if use_remote {
                    latencies_remote.push(sample.wall_ms);
                } else {
                    latencies_local.push(sample.wall_ms);
                }
            }
        }

        std::io::stdout().flush().ok();
    }

    eprintln!("\n--- Benchmark Summary ---");
    eprintln!("  Images processed: {}", entries.len());

    if !latencies_local.is_empty() {
        print_latency_summary("Tesseract", &mut latencies_local);
    }
    if !latencies_remote.is_empty() {
        print_latency_summary("Cloud Vision", &mut latencies_remote);
    }
}

fn print_latency_summary(label: &str, latencies: &mut [f64]) {
    latencies.sort_by(f64::total_cmp);
    let median = latencies[latencies.len() / 2];
    let p99_idx = ((latencies.len() as f64 * 0.99).ceil() as usize).min(latencies.len() - 1);
    let p99 = latencies[p99_idx];
    let avg: f64 = latencies.iter().sum::<f64>() / latencies.len() as f64;

    eprintln!("  [{}]", label);
    eprintln!("    Median: {:.1}ms", median);
    eprintln!("    Average: {:.1}ms", avg);
    eprintln!("    P99: {:.1}ms", p99);
}
