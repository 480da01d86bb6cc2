//! Fingerprinting parameters
//!
//! The whole parameter set is part of the index contract: two installations
//! running different values produce incompatible hash tokens, so an index may
//! only be queried with the configuration it was built with.

use serde::{Deserialize, Serialize};

/// Width of a hash token in bits. The token is a truncated SHA-1 digest;
/// narrowing it would shrink the index at the cost of denser bucket
/// collisions. Fixed at 64 so tokens fit a `u64` / `BIGINT` column.
pub const HASH_TOKEN_BITS: u32 = 64;

/// Fixed parameter set for fingerprint extraction and matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate the pipeline operates at; decoded audio is resampled here.
    pub sample_rate: u32,
    /// STFT window size N (frequency bins = N/2 + 1).
    pub fft_size: usize,
    /// Hop between consecutive STFT frames, in samples.
    pub hop_size: usize,
    /// Side length K of the square neighborhood used for peak picking.
    pub peak_neighborhood: usize,
    /// Peaks quieter than this many dB below the grid maximum are discarded.
    pub amp_floor_db: f32,
    /// Number of subsequent peaks each anchor is paired with.
    pub fan_out: usize,
    /// Maximum time-bin distance between paired peaks.
    pub max_pair_window: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            fft_size: 2048,
            hop_size: 256,
            peak_neighborhood: 8,
            amp_floor_db: 40.0,
            fan_out: 10,
            max_pair_window: 200,
        }
    }
}

impl EngineConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sample_rate == 0 {
            anyhow::bail!("sample_rate must be > 0");
        }
        if self.fft_size == 0 || self.hop_size == 0 {
            anyhow::bail!("fft_size and hop_size must be > 0");
        }
        if self.hop_size > self.fft_size {
            anyhow::bail!("hop_size must not exceed fft_size");
        }
        if self.peak_neighborhood == 0 {
            anyhow::bail!("peak_neighborhood must be > 0");
        }
        if self.amp_floor_db <= 0.0 {
            anyhow::bail!("amp_floor_db must be > 0 (interpreted as dB below grid maximum)");
        }
        if self.fan_out == 0 {
            anyhow::bail!("fan_out must be > 0");
        }
        if self.max_pair_window <= 0 {
            anyhow::bail!("max_pair_window must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_hop_rejected() {
        let config = EngineConfig {
            hop_size: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
