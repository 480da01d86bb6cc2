//! Pairwise constellation hashing
//!
//! Each peak is paired with the next `fan_out` peaks in time order, and the
//! pair's `(freq_a, freq_b, Δt)` triple is digested into a 64-bit token.
//! Pairing nearby points instead of hashing single peaks keeps the
//! fingerprint robust to small perturbations while the fan-out and window
//! bound keep the record count roughly linear in the number of peaks.

use crate::config::EngineConfig;
use crate::peaks::Peak;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// A single fingerprint record: token plus the anchor's time bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashRecord {
    /// 64-bit hash token (truncated SHA-1 of the pair triple).
    pub token: u64,
    /// Time bin of the earlier point in the pair.
    pub anchor_time: i32,
}

/// Derive the hash token for a peak pair.
///
/// Pure function of `(freq_a, freq_b, dt)`: the triple is rendered as the
/// ASCII string `"{freq_a}|{freq_b}|{dt}"`, SHA-1 digested, and the first 8
/// bytes are taken big-endian. Exact-match lookup relies on this being
/// reproducible across processes and platforms.
pub fn pair_token(freq_a: u32, freq_b: u32, dt: i32) -> u64 {
    let mut hasher = Sha1::new();
    hasher.update(format!("{}|{}|{}", freq_a, freq_b, dt).as_bytes());
    let digest = hasher.finalize();
    u64::from_be_bytes(digest[..8].try_into().expect("SHA-1 digest is 20 bytes"))
}

/// Fingerprint record generator.
pub struct HashGenerator {
    fan_out: usize,
    max_pair_window: i32,
}

impl HashGenerator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            fan_out: config.fan_out,
            max_pair_window: config.max_pair_window,
        }
    }

    /// Generate hash records from a constellation point set.
    pub fn generate(&self, peaks: &[Peak]) -> Vec<HashRecord> {
        // Secondary key keeps the output reproducible when peaks share a
        // time bin.
        let mut sorted: Vec<Peak> = peaks.to_vec();
        sorted.sort_by_key(|p| (p.time_bin, p.freq_bin));

        let mut records = Vec::new();

        for (i, anchor) in sorted.iter().enumerate() {
            for target in sorted.iter().skip(i + 1).take(self.fan_out) {
                let dt = target.time_bin as i32 - anchor.time_bin as i32;
                debug_assert!(dt >= 0, "peaks not sorted by time");
                if dt <= 0 || dt > self.max_pair_window {
                    continue;
                }
                records.push(HashRecord {
                    token: pair_token(anchor.freq_bin, target.freq_bin, dt),
                    anchor_time: anchor.time_bin as i32,
                });
            }
        }

        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peaks::Peak;

    fn generator(fan_out: usize, max_pair_window: i32) -> HashGenerator {
        HashGenerator {
            fan_out,
            max_pair_window,
        }
    }

    #[test]
    fn token_is_deterministic() {
        assert_eq!(pair_token(100, 120, 7), pair_token(100, 120, 7));
        assert_ne!(pair_token(100, 120, 7), pair_token(120, 100, 7));
        assert_ne!(pair_token(100, 120, 7), pair_token(100, 120, 8));
    }

    #[test]
    fn fan_out_limits_pair_count() {
        let peaks: Vec<Peak> = (0..10).map(|t| Peak::new(40, t)).collect();
        let records = generator(3, 200).generate(&peaks);
        // Anchors 0..=6 get 3 partners each; the last three get 2, 1, 0.
        assert_eq!(records.len(), 7 * 3 + 2 + 1);
    }

    #[test]
    fn pairs_respect_time_window() {
        let peaks = vec![Peak::new(10, 0), Peak::new(20, 5), Peak::new(30, 500)];
        let records = generator(10, 200).generate(&peaks);
        // (0,5) and (5,500 -> dt 495, skipped) and (0,500 skipped).
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].anchor_time, 0);
        assert_eq!(records[0].token, pair_token(10, 20, 5));
    }

    #[test]
    fn simultaneous_peaks_never_pair() {
        let peaks = vec![Peak::new(10, 4), Peak::new(20, 4), Peak::new(30, 4)];
        let records = generator(10, 200).generate(&peaks);
        assert!(records.is_empty());
    }

    #[test]
    fn generation_is_order_invariant() {
        let mut peaks = vec![
            Peak::new(10, 0),
            Peak::new(50, 3),
            Peak::new(30, 8),
            Peak::new(70, 12),
        ];
        let forward = generator(5, 200).generate(&peaks);
        peaks.reverse();
        let reversed = generator(5, 200).generate(&peaks);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn anchor_is_earlier_point() {
        let peaks: Vec<Peak> = (0..20).map(|t| Peak::new(t * 3 % 50, t * 2)).collect();
        let records = generator(4, 200).generate(&peaks);
        assert!(!records.is_empty());
        for r in &records {
            assert!(r.anchor_time >= 0);
        }
    }
}
