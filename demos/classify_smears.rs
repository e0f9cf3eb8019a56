//! Blood Smear Classification Example
//!
//! This example classifies blood smear images with a checkpoint manifest,
//! records every successful analysis in a JSON-lines log and prints the
//! subject's statistics afterwards.
//!
//! Usage:
//! ```
//! cargo run --example classify_smears -- --checkpoint <manifest.json> [--store analyses.jsonl] [--subject <id>] <image_paths>...
//! ```
//!
//! The checkpoint path can also be supplied through `MODEL_PATH`.
//! Set `RUST_LOG=info` to see model loading details.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bloodsmear::prelude::*;
use bloodsmear::utils::init_tracing;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Command-line arguments for the blood smear classification example
#[derive(Parser)]
#[command(name = "classify_smears")]
#[command(about = "Blood Smear Classification Example - classifies smear images and records the analyses")]
struct Args {
    /// Path to the checkpoint manifest
    #[arg(short, long, env = "MODEL_PATH")]
    checkpoint: PathBuf,

    /// JSON-lines file receiving the analysis records
    #[arg(short, long, default_value = "analyses.jsonl")]
    store: PathBuf,

    /// Subject the analyses are recorded for
    #[arg(long)]
    subject: Option<String>,

    /// Seconds to wait for the model to load
    #[arg(long, default_value_t = 120)]
    load_timeout: u64,

    /// Number of ONNX Runtime sessions
    #[arg(long, default_value_t = 1)]
    sessions: usize,

    /// Image file paths to process
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    info!("Blood Smear Classification Example");

    let config = EngineConfig::new(&args.checkpoint)
        .session_pool_size(args.sessions)
        .load_timeout(Duration::from_secs(args.load_timeout));
    let engine = Arc::new(InferenceEngine::from_config(&config));

    if let Err(e) = engine.warm_up(config.load_timeout_duration()) {
        error!("Model could not be loaded: {}", e);
        return Err(e.into());
    }

    let analyzer = Analyzer::new(engine, JsonlAnalysisStore::new(&args.store));
    let subject = args.subject.as_deref();

    for (i, path) in args.images.iter().enumerate() {
        info!("Processing image {} of {}: {}", i + 1, args.images.len(), path.display());
        let payload = match read_payload(path) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                continue;
            }
        };

        let mut request = AnalysisRequest::new(payload).notes(path.display().to_string());
        if let Some(subject) = subject {
            request = request.subject(subject);
        }

        match analyzer.analyze(request) {
            Ok(receipt) => {
                info!(
                    "   {} ({:.1}%) [{}]",
                    receipt.result.predicted_class(),
                    receipt.result.confidence() * 100.0,
                    receipt.analysis_id
                );
                for score in receipt.result.all_predictions().iter().skip(1).take(2) {
                    info!("      {}: {:.1}%", score.disease, score.confidence * 100.0);
                }
            }
            Err(e) if e.is_service_fault() => {
                error!("Service not operational: {}", e);
                return Err(e.into());
            }
            Err(e) => warn!("   analysis failed: {}", e),
        }
    }

    let stats = analyzer.stats(subject)?;
    info!(
        "Analyses: {} total, {} this month, {} this week",
        stats.total, stats.this_month, stats.this_week
    );

    let health = analyzer.health();
    info!("Health: {}", serde_json::to_string(&health)?);
    Ok(())
}

fn read_payload(path: &Path) -> std::io::Result<String> {
    Ok(STANDARD.encode(std::fs::read(path)?))
}
