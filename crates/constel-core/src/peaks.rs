//! Constellation point extraction via 2D max filtering
//!
//! A bin is a constellation point when it equals the maximum of the K×K
//! neighborhood around it and sits above the amplitude floor. Plateaus of
//! equal-valued neighbors all qualify; deduplicating them would change the
//! matching statistics, so they are kept as-is.

use crate::config::EngineConfig;
use crate::spectrogram::Spectrogram;

/// A local spectral maximum used as a landmark for hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Peak {
    /// Frequency bin index.
    pub freq_bin: u32,
    /// Time bin index.
    pub time_bin: u32,
}

impl Peak {
    pub fn new(freq_bin: u32, time_bin: u32) -> Self {
        Self { freq_bin, time_bin }
    }
}

/// Constellation point extractor.
pub struct PeakDetector {
    neighborhood: usize,
    amp_floor_db: f32,
}

impl PeakDetector {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            neighborhood: config.peak_neighborhood,
            amp_floor_db: config.amp_floor_db,
        }
    }

    /// Extract constellation points from the dB grid.
    ///
    /// An empty result means "no usable signal", not a failure.
    pub fn detect(&self, spectrogram: &Spectrogram) -> Vec<Peak> {
        let max_filtered = self.apply_2d_max_filter(spectrogram);
        self.find_local_maxima(spectrogram, &max_filtered)
    }

    /// Apply the K×K max filter as two separable passes (frequency, then
    /// time); a square footprint maximum factors exactly this way. Edge bins
    /// use the clamped remainder of the neighborhood.
    fn apply_2d_max_filter(&self, spectrogram: &Spectrogram) -> Vec<Vec<f32>> {
        let num_frames = spectrogram.num_frames;
        let num_bins = spectrogram.num_bins;
        let half = self.neighborhood / 2;

        let mut freq_filtered = vec![vec![0.0; num_bins]; num_frames];

        for t in 0..num_frames {
            for f in 0..num_bins {
                let f_start = f.saturating_sub(half);
                let f_end = (f + half + 1).min(num_bins);

                let max_val = (f_start..f_end)
                    .map(|fi| spectrogram.magnitudes[t][fi])
                    .fold(f32::NEG_INFINITY, f32::max);

                freq_filtered[t][f] = max_val;
            }
        }

        let mut time_filtered = vec![vec![0.0; num_bins]; num_frames];

        for t in 0..num_frames {
            let t_start = t.saturating_sub(half);
            let t_end = (t + half + 1).min(num_frames);

            for f in 0..num_bins {
                let max_val = (t_start..t_end)
                    .map(|ti| freq_filtered[ti][f])
                    .fold(f32::NEG_INFINITY, f32::max);

                time_filtered[t][f] = max_val;
            }
        }

        time_filtered
    }

    /// Keep bins that attain their neighborhood maximum and sit above the
    /// background. The grid is normalized to a 0 dB maximum, so the floor is
    /// expressed as dB below that maximum.
    fn find_local_maxima(
        &self,
        spectrogram: &Spectrogram,
        max_filtered: &[Vec<f32>],
    ) -> Vec<Peak> {
        let mut peaks = Vec::new();

        for t in 0..spectrogram.num_frames {
            for f in 0..spectrogram.num_bins {
                let value = spectrogram.magnitudes[t][f];

                // The max filter copies values verbatim, so exact equality is
                // the local-maximum test.
                if value == max_filtered[t][f] && value >= -self.amp_floor_db {
                    peaks.push(Peak::new(f as u32, t as u32));
                }
            }
        }

        peaks
    }
}
