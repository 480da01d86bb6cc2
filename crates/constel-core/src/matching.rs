//! Offset-alignment matching
//!
//! True matches produce many query hashes whose `db_anchor - query_anchor`
//! offsets cluster at a single value, while coincidental token collisions
//! scatter across offsets. Scoring by the tallest peak of the per-song offset
//! histogram therefore discriminates well even with substantial hash noise.

use crate::error::EngineError;
use crate::hashing::HashRecord;
use crate::index::{FingerprintIndex, SongId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[cfg(test)]
mod tests;

/// A ranked candidate song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub song_id: SongId,
    /// Vote count at the best-aligned offset.
    pub score: u32,
    /// Alignment offset (in time bins) of the tallest histogram peak;
    /// positive when the reference runs ahead of the query.
    pub best_offset: i32,
}

/// Matching engine over a [`FingerprintIndex`].
///
/// Stateless between calls; the per-query vote tally lives on the stack of a
/// single `rank` invocation, so concurrent queries need no synchronization
/// beyond what the index itself provides.
pub struct MatchEngine;

impl MatchEngine {
    pub fn new() -> Self {
        Self
    }

    /// Rank candidate songs for a set of query hash records.
    ///
    /// An empty query set is a caller precondition (`NoSignal` is raised at
    /// the extraction boundary). An empty result is the normal "no match"
    /// outcome; index failures propagate as `IndexUnavailable` and are never
    /// collapsed into an empty list.
    ///
    /// When two offsets tie for the histogram maximum, which one wins is
    /// implementation-defined (hash map iteration order); callers must not
    /// rely on it.
    pub async fn rank(
        &self,
        index: &dyn FingerprintIndex,
        query: &[HashRecord],
    ) -> Result<Vec<Candidate>, EngineError> {
        debug_assert!(!query.is_empty(), "empty query set is a caller precondition");

        // One batched lookup over the distinct tokens, then a local map so
        // repeated tokens in the query do not hit the index twice.
        let mut tokens: Vec<u64> = query.iter().map(|r| r.token).collect();
        tokens.sort_unstable();
        tokens.dedup();

        let rows = index.lookup_many(&tokens).await?;

        let mut postings_by_token: HashMap<u64, Vec<(SongId, i32)>> = HashMap::new();
        for (token, posting) in rows {
            postings_by_token
                .entry(token)
                .or_default()
                .push((posting.song_id, posting.anchor_time));
        }

        // votes[song_id][offset] = count
        let mut votes: HashMap<SongId, HashMap<i32, u32>> = HashMap::new();

        for record in query {
            let Some(postings) = postings_by_token.get(&record.token) else {
                continue;
            };
            for &(song_id, db_anchor) in postings {
                let offset = db_anchor - record.anchor_time;
                *votes.entry(song_id).or_default().entry(offset).or_insert(0) += 1;
            }
        }

        let mut candidates: Vec<Candidate> = votes
            .into_iter()
            .map(|(song_id, histogram)| {
                let (best_offset, score) = histogram
                    .iter()
                    .max_by_key(|(_, &count)| count)
                    .map(|(&offset, &count)| (offset, count))
                    .unwrap_or((0, 0));
                Candidate {
                    song_id,
                    score,
                    best_offset,
                }
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        candidates.sort_by(|a, b| b.score.cmp(&a.score));

        Ok(candidates)
    }
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new()
    }
}
