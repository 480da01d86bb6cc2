//! identify - match a query clip against the fingerprint index
//!
//! Usage: identify query.wav [--top 5] [--config config.toml]

use anyhow::Result;
use clap::Parser;
use constel_cli::output::{build_identify_output, print_json};
use constel_core::{
    fingerprint_file, open_index, ConstelConfig, EngineError, FingerprintIndex, MatchEngine,
    SongMeta,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "identify")]
#[command(about = "Identify an audio clip against the fingerprint index", long_about = None)]
struct Args {
    /// Query audio file (WAV, MP3, FLAC, OGG)
    query: PathBuf,

    /// How many top candidates to report
    #[arg(short, long, default_value_t = 5)]
    top: usize,

    /// Path to configuration file (TOML)
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Off
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // NoSignal gets a friendlier message than a raw error chain; it
            // is an expected outcome, not a malfunction.
            if matches!(e.downcast_ref::<EngineError>(), Some(EngineError::NoSignal)) {
                eprintln!("no usable signal in query: try a longer or louder clip");
            } else {
                eprintln!("error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<()> {
    let config = load_config(&args.config)?;
    let index = open_index(&config.storage).await?;

    log::info!("fingerprinting query: {}", args.query.display());
    let records = fingerprint_file(&args.query, &config.engine)?;
    log::info!("query produced {} hash records", records.len());

    let candidates = MatchEngine::new().rank(index.as_ref(), &records).await?;
    log::info!("found {} candidate songs", candidates.len());

    // Enrich with catalog metadata. An empty list is the normal "no match"
    // outcome and still prints a well-formed report.
    let mut enriched: Vec<(constel_core::Candidate, Option<SongMeta>)> = Vec::new();
    for candidate in candidates {
        let meta = index.resolve_song(candidate.song_id).await?;
        enriched.push((candidate, meta));
    }

    let output = build_identify_output(
        &args.query.display().to_string(),
        records.len(),
        &enriched,
        args.top,
    );
    print_json(&output);

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
