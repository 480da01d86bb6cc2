//! Error taxonomy for the fingerprinting pipeline
//!
//! "No match" is deliberately not a variant: an empty candidate list from the
//! match engine is a normal outcome and must stay distinguishable from an
//! index failure, which surfaces as `IndexUnavailable`.

use std::path::PathBuf;
use thiserror::Error;

type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The referenced audio source could not be read or decoded. Fatal for
    /// the single request; retrying belongs to the caller.
    #[error("audio source unavailable: {path}")]
    InputUnavailable {
        path: PathBuf,
        #[source]
        source: BoxedCause,
    },

    /// Extraction produced zero hash records (silence, clip too short, or
    /// parameters too strict). Expected outcome, reported at the extraction
    /// boundary so no partial fingerprint flows downstream.
    #[error("no usable signal: extraction produced zero hash records")]
    NoSignal,

    /// The fingerprint index is unreachable or corrupt. Must never be
    /// collapsed into an empty match list.
    #[error("fingerprint index unavailable")]
    IndexUnavailable(#[source] BoxedCause),
}
