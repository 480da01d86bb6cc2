//! Audio resampling using linear interpolation
//!
//! Good enough for fingerprinting: the peak landmarks survive the mild
//! high-frequency rolloff this introduces.

use anyhow::Result;

/// Resample audio to target sample rate using linear interpolation
pub fn resample_to_target(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }
    if from_rate == 0 || to_rate == 0 {
        anyhow::bail!("sample rates must be > 0 (got {} -> {})", from_rate, to_rate);
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 * ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = src_pos - src_idx as f64;

        if src_idx + 1 < samples.len() {
            let val = samples[src_idx] * (1.0 - frac as f32) + samples[src_idx + 1] * frac as f32;
            output.push(val);
        } else if src_idx < samples.len() {
            output.push(samples[src_idx]);
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_when_rates_match() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample_to_target(&samples, 22050, 22050).unwrap(), samples);
    }

    #[test]
    fn downsampling_halves_length() {
        let samples: Vec<f32> = (0..1000).map(|i| i as f32 / 1000.0).collect();
        let out = resample_to_target(&samples, 44100, 22050).unwrap();
        assert!((out.len() as i64 - 500).abs() <= 1);
    }
}
