//! JSON output formatting

use constel_core::{Candidate, SongId, SongMeta};
use serde::Serialize;

/// One enriched candidate, ready for display.
#[derive(Debug, Serialize)]
pub struct CandidateOutput {
    pub song_id: SongId,
    pub name: String,
    pub path: String,
    pub score: u32,
    /// score / query hash count: a confidence-like ratio in [0, 1], not a
    /// probability.
    pub score_normalized: f64,
    pub best_offset: i32,
}

#[derive(Debug, Serialize)]
pub struct IdentifyOutput {
    pub query_path: String,
    pub query_hashes: usize,
    pub matches_found: usize,
    pub top_candidates: Vec<CandidateOutput>,
}

/// Assemble the identify report from ranked candidates and resolved metadata.
/// Songs missing from the catalog (deleted after ingestion) are reported with
/// placeholder metadata rather than dropped, so the ranking stays intact.
pub fn build_identify_output(
    query_path: &str,
    query_hashes: usize,
    candidates: &[(Candidate, Option<SongMeta>)],
    top_k: usize,
) -> IdentifyOutput {
    let top_candidates = candidates
        .iter()
        .take(top_k)
        .map(|(candidate, meta)| {
            let (name, path) = match meta {
                Some(m) => (m.display_name.clone(), m.source_path.clone()),
                None => ("<unknown>".to_string(), "<unknown>".to_string()),
            };
            CandidateOutput {
                song_id: candidate.song_id,
                name,
                path,
                score: candidate.score,
                score_normalized: candidate.score as f64 / query_hashes.max(1) as f64,
                best_offset: candidate.best_offset,
            }
        })
        .collect();

    IdentifyOutput {
        query_path: query_path.to_string(),
        query_hashes,
        matches_found: candidates.len(),
        top_candidates,
    }
}

/// Print any serializable report as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing output: {}", e),
    }
}
