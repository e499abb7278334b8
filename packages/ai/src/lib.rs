#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Vision-language oracle abstraction.
//!
//! A [`providers::VisionProvider`] takes a PNG crop and a short instruction
//! and returns free text. `OpenAI` (and any `OpenAI`-compatible server
//! reachable through `AI_BASE_URL`) and Anthropic Claude are supported;
//! [`providers::create_provider_from_env`] picks one from the environment.
//! Answers are untrusted: callers validate and normalize them.

pub mod providers;

use thiserror::Error;

/// Errors that can occur while querying a vision provider.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The provider rejected the request for exceeding a rate limit.
    #[error("Rate limited: {message}")]
    RateLimited {
        /// Provider message.
        message: String,
    },

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

impl AiError {
    /// Returns `true` for the transient rate-limiting class of failures,
    /// the only class worth retrying.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Http(e) => e.status().is_some_and(|s| s.as_u16() == 429),
            Self::Provider { message } => mentions_rate_limit(message),
            Self::Json(_) | Self::Config { .. } => false,
        }
    }
}

fn mentions_rate_limit(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("rate_limit") || lower.contains("rate limit") || lower.contains("429")
}

/// Maps a non-success provider response to an error.
pub(crate) fn error_for_status(status: reqwest::StatusCode, message: String) -> AiError {
    if status.as_u16() == 429 || mentions_rate_limit(&message) {
        AiError::RateLimited { message }
    } else {
        AiError::Provider { message }
    }
}
