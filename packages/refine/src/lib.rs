#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Second-opinion refinement of suspect labels.
//!
//! After label resolution, fields whose label fails the confidence
//! heuristics are escalated: a crop around each field is sent to a vision
//! oracle, and a usable answer replaces the label. Oracle failures are
//! recorded per field as a [`RefinementOutcome`] and never abort the batch.

pub mod crop;
pub mod orchestrator;
pub mod pages;
pub mod progress;

use serde::Deserialize;

pub use orchestrator::{
    FieldOutcome, RefinementOutcome, RefinementReport, normalize_answer, refine_field,
    refine_suspect_labels,
};
pub use pages::{PageImageSource, RasterPages};
pub use progress::{NullProgress, ProgressCallback, null_progress};

/// Instruction sent with every crop.
pub const DEFAULT_PROMPT: &str = "Return ONLY the printed label text for this form field \
     (include the trailing colon if present).";

/// Errors that can occur while refining one field.
#[derive(Debug, thiserror::Error)]
pub enum RefineError {
    /// The crop window could not be computed or rendered.
    #[error("Crop error: {message}")]
    Crop {
        /// Description of what went wrong.
        message: String,
    },

    /// Page image decoding or encoding failed.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// The vision oracle failed.
    #[error("Oracle error: {0}")]
    Oracle(#[from] form_labeler_ai::AiError),

    /// The oracle did not answer in time.
    #[error("Oracle call timed out after {seconds}s")]
    Timeout {
        /// The configured per-call timeout.
        seconds: u64,
    },

    /// The oracle answered with nothing usable.
    #[error("Oracle returned an empty answer")]
    EmptyAnswer,
}

/// Refinement settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    /// Master switch; when off, refinement returns its input untouched.
    pub enabled: bool,
    /// Maximum oracle calls in flight.
    pub concurrency: usize,
    /// Attempts per field (rate-limited calls only are retried).
    pub max_attempts: u32,
    /// Linear backoff step: attempt `n` waits `n * step`.
    pub backoff_step_ms: u64,
    /// Per-call timeout.
    pub call_timeout_secs: u64,
    /// Answers with at most this many words get a trailing colon.
    pub max_answer_words: usize,
    /// Token cap for the oracle's answer.
    pub max_tokens: u32,
    /// Instruction sent with every crop.
    pub prompt: String,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: 4,
            max_attempts: 3,
            backoff_step_ms: 400,
            call_timeout_secs: 30,
            max_answer_words: 5,
            max_tokens: 16,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}
