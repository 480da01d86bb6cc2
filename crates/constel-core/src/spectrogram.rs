//! Short-time Fourier transform and log-magnitude spectrogram
//!
//! Frame layout: frame k covers samples `[k*hop, k*hop + fft_size)` and is
//! emitted while `k*hop < samples.len()`, zero-padding past the end of the
//! buffer. The number of time bins is therefore `ceil(samples / hop)`.

use crate::config::EngineConfig;
use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

/// Floor applied before taking log10 so zero-magnitude bins produce a finite
/// dB value. Coupled to the background threshold in peak picking: with this
/// floor the grid maximum is exactly 0 dB whenever any bin is non-zero.
const DB_FLOOR_EPS: f32 = 1e-10;

/// Value assigned to every bin of a degenerate all-silence grid. Normalizing
/// such a grid against its own (zero) maximum would leave a flat 0 dB plateau
/// in which every bin passes the amplitude floor; pinning it this far down
/// guarantees peak picking rejects the whole grid instead.
const SILENCE_DB: f32 = -200.0;

/// Decibel-scaled magnitude grid, normalized so the loudest bin is 0 dB.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// Magnitude values in dB, `[time_bin][freq_bin]`, all ≤ 0.
    pub magnitudes: Vec<Vec<f32>>,
    /// Number of time bins.
    pub num_frames: usize,
    /// Number of frequency bins (fft_size / 2 + 1).
    pub num_bins: usize,
}

/// Compute the log-magnitude spectrogram of a mono sample buffer.
///
/// Pure function of `(samples, config)`; repeated calls produce identical
/// grids.
pub fn compute_spectrogram(samples: &[f32], config: &EngineConfig) -> Spectrogram {
    let fft_size = config.fft_size;
    let hop_size = config.hop_size;

    let num_frames = samples.len().div_ceil(hop_size);
    let num_bins = fft_size / 2 + 1;

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);

    let window = hann_window(fft_size);

    let mut magnitudes = Vec::with_capacity(num_frames);
    let mut grid_max = f32::NEG_INFINITY;

    for frame_idx in 0..num_frames {
        let start = frame_idx * hop_size;
        let end = (start + fft_size).min(samples.len());

        let mut frame: Vec<Complex<f32>> = samples[start..end]
            .iter()
            .enumerate()
            .map(|(i, &s)| Complex::new(s * window[i], 0.0))
            .collect();
        frame.resize(fft_size, Complex::new(0.0, 0.0));

        fft.process(&mut frame);

        let row: Vec<f32> = frame[..num_bins].iter().map(|c| c.norm()).collect();
        for &m in &row {
            grid_max = grid_max.max(m);
        }
        magnitudes.push(row);
    }

    if grid_max <= DB_FLOOR_EPS {
        for row in &mut magnitudes {
            row.fill(SILENCE_DB);
        }
    } else {
        // Normalize to dB relative to the grid maximum.
        let ref_db = 20.0 * grid_max.log10();
        for row in &mut magnitudes {
            for m in row.iter_mut() {
                *m = 20.0 * m.max(DB_FLOOR_EPS).log10() - ref_db;
            }
        }
    }

    Spectrogram {
        magnitudes,
        num_frames,
        num_bins,
    }
}

/// Create Hann window
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let x = i as f32 / (size - 1) as f32;
            0.5 * (1.0 - (2.0 * PI * x).cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn hann_window_shape() {
        let window = hann_window(512);
        assert_eq!(window.len(), 512);
        assert_relative_eq!(window[0], 0.0, epsilon = 0.001);
        assert_relative_eq!(window[256], 1.0, epsilon = 0.001);
    }

    #[test]
    fn frame_count_matches_hop() {
        let config = EngineConfig::default();
        let samples = vec![0.1_f32; config.hop_size * 10 + 1];
        let spec = compute_spectrogram(&samples, &config);
        assert_eq!(spec.num_frames, 11);
        assert_eq!(spec.num_bins, config.fft_size / 2 + 1);
    }

    #[test]
    fn silence_has_no_nan() {
        let config = EngineConfig::default();
        let samples = vec![0.0_f32; config.fft_size * 4];
        let spec = compute_spectrogram(&samples, &config);
        for row in &spec.magnitudes {
            for &v in row {
                assert!(v.is_finite());
                assert_eq!(v, SILENCE_DB);
            }
        }
    }

    #[test]
    fn loudest_bin_is_zero_db() {
        let config = EngineConfig::default();
        let samples: Vec<f32> = (0..config.fft_size * 8)
            .map(|i| (2.0 * PI * 440.0 * i as f32 / config.sample_rate as f32).sin())
            .collect();
        let spec = compute_spectrogram(&samples, &config);
        let max = spec
            .magnitudes
            .iter()
            .flatten()
            .fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        assert_relative_eq!(max, 0.0, epsilon = 1e-4);
    }
}
