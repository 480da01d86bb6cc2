//! Audio decoding and resampling
//!
//! Supplies the core contract input: mono samples at the configured sample
//! rate. Supports WAV, MP3, FLAC and OGG Vorbis using pure Rust decoders.

mod decoder;
mod resample;

pub use decoder::{decode_audio, AudioData};
pub use resample::resample_to_target;

use std::path::Path;

/// Supported audio formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    Ogg,
    Unknown,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("wav") | Some("wave") => AudioFormat::Wav,
            Some("mp3") => AudioFormat::Mp3,
            Some("flac") => AudioFormat::Flac,
            Some("ogg") => AudioFormat::Ogg,
            _ => AudioFormat::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_detection_by_extension() {
        assert_eq!(AudioFormat::from_path(Path::new("a.wav")), AudioFormat::Wav);
        assert_eq!(AudioFormat::from_path(Path::new("a.mp3")), AudioFormat::Mp3);
        assert_eq!(AudioFormat::from_path(Path::new("a.flac")), AudioFormat::Flac);
        assert_eq!(AudioFormat::from_path(Path::new("a.ogg")), AudioFormat::Ogg);
        assert_eq!(AudioFormat::from_path(Path::new("a.mp4")), AudioFormat::Unknown);
    }
}
