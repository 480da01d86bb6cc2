//! ingest - fingerprint reference recordings into the index
//!
//! Usage: ingest song.wav [more.wav ...] [--name "Display Name"] [--config config.toml]

use anyhow::Result;
use clap::Parser;
use constel_cli::output::print_json;
use constel_core::{fingerprint_file, open_index, ConstelConfig, EngineError, FingerprintIndex};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Fingerprint reference recordings into the index", long_about = None)]
struct Args {
    /// Audio files to ingest (WAV, MP3, FLAC, OGG)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Display name for the song; only valid with a single input, defaults
    /// to the file stem
    #[arg(short, long)]
    name: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct IngestReport {
    input_file: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    song_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_hashes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Quiet by default so stdout stays machine-parseable JSON.
    let level = if args.verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Off
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    if args.name.is_some() && args.inputs.len() > 1 {
        anyhow::bail!("--name only makes sense with a single input file");
    }

    let config = load_config(&args.config)?;
    let index = open_index(&config.storage).await?;

    // Extraction is CPU-bound and independent per file; index writes stay
    // sequential so song ids come out in input order.
    let engine = config.engine.clone();
    let extracted: Vec<(PathBuf, Result<Vec<constel_core::HashRecord>, EngineError>)> = args
        .inputs
        .par_iter()
        .map(|path| (path.clone(), fingerprint_file(path, &engine)))
        .collect();

    let mut reports = Vec::new();
    let mut failures = 0usize;

    for (path, outcome) in extracted {
        let report = match outcome {
            Ok(records) => {
                let display_name = args
                    .name
                    .clone()
                    .unwrap_or_else(|| default_name(&path));
                let song_id = index
                    .register_song(&display_name, &path.to_string_lossy())
                    .await?;
                index.put(song_id, &records).await?;
                log::info!(
                    "ingested {} as song {} ({} hashes)",
                    path.display(),
                    song_id,
                    records.len()
                );
                IngestReport {
                    input_file: path.display().to_string(),
                    status: "ok",
                    song_id: Some(song_id),
                    num_hashes: Some(records.len()),
                    error: None,
                }
            }
            Err(EngineError::NoSignal) => {
                failures += 1;
                IngestReport {
                    input_file: path.display().to_string(),
                    status: "no_signal",
                    song_id: None,
                    num_hashes: None,
                    error: Some("clip too quiet or too short to fingerprint".to_string()),
                }
            }
            Err(e) => {
                failures += 1;
                IngestReport {
                    input_file: path.display().to_string(),
                    status: "error",
                    song_id: None,
                    num_hashes: None,
                    error: Some(e.to_string()),
                }
            }
        };
        reports.push(report);
    }

    print_json(&reports);

    if failures > 0 {
        anyhow::bail!("{} of {} inputs failed", failures, reports.len());
    }
    Ok(())
}

fn load_config(path: &str) -> Result<ConstelConfig> {
    let path = Path::new(path);
    if path.exists() {
        ConstelConfig::load(path)
    } else {
        log::info!("no config file at {}, using defaults", path.display());
        Ok(ConstelConfig::default())
    }
}

fn default_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
