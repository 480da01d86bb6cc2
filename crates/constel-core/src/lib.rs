//! Constel - constellation-map acoustic fingerprinting
//!
//! Turns audio into a compact set of peak-pair hash tokens and identifies
//! unknown clips by offset-alignment voting against a token index, in the
//! style of the classic Shazam constellation algorithm.

pub mod audio;
pub mod config;
pub mod error;
pub mod hashing;
pub mod index;
pub mod matching;
pub mod peaks;
pub mod spectrogram;
pub mod storage_backend;
pub mod storage_config;

pub use config::{EngineConfig, HASH_TOKEN_BITS};
pub use error::EngineError;
pub use hashing::{HashGenerator, HashRecord};
pub use index::{FingerprintIndex, MemoryIndex, Posting, SongId, SongMeta};
pub use matching::{Candidate, MatchEngine};
pub use peaks::{Peak, PeakDetector};
pub use spectrogram::{compute_spectrogram, Spectrogram};
pub use storage_backend::{open_index, FilesystemIndex, PostgresIndex};
pub use storage_config::ConstelConfig;

use std::path::Path;

/// Extract fingerprint hash records from a mono sample buffer.
///
/// Runs spectrogram → peak picking → pair hashing. Zero records is reported
/// as [`EngineError::NoSignal`] right here at the boundary, so no partial
/// fingerprint ever flows downstream.
pub fn extract_fingerprints(
    samples: &[f32],
    config: &EngineConfig,
) -> Result<Vec<HashRecord>, EngineError> {
    let spectrogram = spectrogram::compute_spectrogram(samples, config);
    let peaks = PeakDetector::new(config).detect(&spectrogram);
    let records = HashGenerator::new(config).generate(&peaks);

    log::debug!(
        "extracted {} peaks / {} hash records from {} time bins",
        peaks.len(),
        records.len(),
        spectrogram.num_frames
    );

    if records.is_empty() {
        return Err(EngineError::NoSignal);
    }
    Ok(records)
}

/// Decode an audio file and extract its fingerprint records.
pub fn fingerprint_file(
    path: &Path,
    config: &EngineConfig,
) -> Result<Vec<HashRecord>, EngineError> {
    let audio = audio::decode_audio(path, config.sample_rate).map_err(|source| {
        EngineError::InputUnavailable {
            path: path.to_path_buf(),
            source: source.into(),
        }
    })?;
    extract_fingerprints(&audio.samples, config)
}

/// Fingerprint a reference recording and store it under a fresh song id.
pub async fn ingest_file(
    index: &dyn FingerprintIndex,
    path: &Path,
    display_name: &str,
    config: &EngineConfig,
) -> Result<(SongId, usize), EngineError> {
    let records = fingerprint_file(path, config)?;
    let song_id = index
        .register_song(display_name, &path.to_string_lossy())
        .await?;
    index.put(song_id, &records).await?;

    log::info!(
        "ingested '{}' as song {} ({} hash records)",
        display_name,
        song_id,
        records.len()
    );
    Ok((song_id, records.len()))
}

/// Fingerprint a query clip and rank candidate songs against the index.
///
/// Returns the candidates together with the query's hash count, which callers
/// may use to normalize scores into a confidence-like ratio.
pub async fn identify_file(
    index: &dyn FingerprintIndex,
    path: &Path,
    config: &EngineConfig,
) -> Result<(Vec<Candidate>, usize), EngineError> {
    let records = fingerprint_file(path, config)?;
    let candidates = MatchEngine::new().rank(index, &records).await?;
    Ok((candidates, records.len()))
}
