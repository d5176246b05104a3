//! Error types for the askfolio domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Provider failures are split into the raw [`ProviderError`] reported by a
//! backend and the classified [`UpstreamFailure`] produced after retries.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The top-level error type for pipeline operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Caller errors ---
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Provider errors ---
    #[error("Upstream failure: {0}")]
    Upstream(#[from] UpstreamFailure),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by an LLM backend for a single attempt.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    /// Anything the transport could not put into a structured category.
    #[error("{0}")]
    Other(String),
}

/// Classified outcome of a failed completion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection refused, DNS failure, unreachable network.
    Connectivity,
    /// The attempt exceeded its deadline.
    Timeout,
    /// The provider asked us to slow down.
    RateLimited,
    /// 502/503/504 from the provider.
    ServiceUnavailable,
    /// Bad request, authentication failure, unknown model.
    Rejected,
    /// Generic failure that matched no retryable keyword.
    Unclassified,
}

impl FailureKind {
    /// Whether the orchestrator should spend a retry on this failure.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Connectivity | Self::Timeout | Self::RateLimited | Self::ServiceUnavailable
        )
    }

    /// Stable identifier used in logs and error bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connectivity => "connectivity",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Rejected => "rejected",
            Self::Unclassified => "unclassified",
        }
    }

    /// Message that is safe to show to an end user.
    pub fn user_message(self) -> &'static str {
        match self {
            Self::Connectivity => "Connection error. Please try again in a moment.",
            Self::Timeout => "Request timed out. Please try again.",
            Self::RateLimited => "Rate limit exceeded. Please try again in a moment.",
            Self::ServiceUnavailable => {
                "The language model service is temporarily unavailable. Please try again."
            }
            Self::Rejected => "The language model provider rejected the request.",
            Self::Unclassified => "An unexpected error occurred while contacting the language model.",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maximum number of characters of provider error text kept for diagnostics.
pub const DETAIL_LIMIT: usize = 200;

/// A completion call that ended in a terminal state.
#[derive(Debug, Clone, Error)]
#[error("{kind} after {retries} retries: {user_message}")]
pub struct UpstreamFailure {
    /// Classified failure category.
    pub kind: FailureKind,
    /// Retries spent before giving up (0 = first attempt only).
    pub retries: u32,
    /// User-safe explanation.
    pub user_message: String,
    /// Truncated provider error text, for operators only.
    pub detail: String,
}

impl UpstreamFailure {
    /// Build a failure from the last provider error seen.
    pub fn new(kind: FailureKind, retries: u32, source: &ProviderError) -> Self {
        Self {
            kind,
            retries,
            user_message: kind.user_message().to_string(),
            detail: truncate_chars(&source.to_string(), DETAIL_LIMIT),
        }
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
