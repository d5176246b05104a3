//! LLM call orchestration: bounded retries with per-attempt timeouts.
//!
//! Each attempt runs under `tokio::time::timeout`. A failed attempt is
//! classified into a [`FailureKind`]; retryable kinds sleep a linear backoff
//! and try again until the budget is spent, terminal kinds stop immediately.
//! Dropping the returned future cancels the in-flight attempt and any
//! pending sleep.

use std::sync::Arc;
use std::time::Duration;

use askfolio_config::{OrchestratorConfig, ProviderSettings};
use askfolio_core::{
    FailureKind, Message, Provider, ProviderError, ProviderRequest, UpstreamFailure, Usage,
};
use tracing::{debug, info, warn};

/// Retry budget and timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub attempt_timeout: Duration,
    pub backoff_step: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&OrchestratorConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            attempt_timeout: Duration::from_secs(config.attempt_timeout_secs),
            backoff_step: Duration::from_secs(config.backoff_step_secs),
            max_backoff: Duration::from_secs(config.max_backoff_secs),
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        self.backoff_step.saturating_mul(retry).min(self.max_backoff)
    }
}

/// Model parameters sent with every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::from_settings(&ProviderSettings::default())
    }
}

impl ModelConfig {
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self {
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: Some(settings.max_tokens),
        }
    }
}

/// A successful completion.
#[derive(Debug, Clone)]
pub struct Completion {
    pub reply: String,
    /// Retries spent before the successful attempt.
    pub retries: u32,
    pub model: String,
    pub usage: Option<Usage>,
}

/// Classify a provider error.
///
/// Structured variants are decided by type; only unstructured errors fall
/// through to keyword matching on their text.
pub fn classify(error: &ProviderError) -> FailureKind {
    match error {
        ProviderError::Network(_) => FailureKind::Connectivity,
        ProviderError::Timeout(_) => FailureKind::Timeout,
        ProviderError::RateLimited { .. } => FailureKind::RateLimited,
        ProviderError::ApiError {
            status_code: 502 | 503 | 504,
            ..
        } => FailureKind::ServiceUnavailable,
        ProviderError::ApiError { .. }
        | ProviderError::AuthenticationFailed(_)
        | ProviderError::ModelNotFound(_) => FailureKind::Rejected,
        ProviderError::Other(text) => classify_text(text),
    }
}

fn classify_text(text: &str) -> FailureKind {
    let lowered = text.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lowered.contains(n));

    if has(&["connection", "network", "unreachable"]) {
        FailureKind::Connectivity
    } else if has(&["timeout", "timed out"]) {
        FailureKind::Timeout
    } else if has(&["rate limit"]) {
        FailureKind::RateLimited
    } else if has(&["502", "503", "504", "temporar"]) {
        FailureKind::ServiceUnavailable
    } else {
        FailureKind::Unclassified
    }
}

/// Sends a composed conversation to the provider with retries.
#[derive(Clone)]
pub struct ChatOrchestrator {
    provider: Arc<dyn Provider>,
    policy: RetryPolicy,
}

impl ChatOrchestrator {
    pub fn new(provider: Arc<dyn Provider>, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run the attempt/backoff loop until success or a terminal failure.
    pub async fn send(
        &self,
        messages: Vec<Message>,
        model: &ModelConfig,
    ) -> Result<Completion, UpstreamFailure> {
        let request = ProviderRequest {
            model: model.model.clone(),
            messages,
            temperature: model.temperature,
            max_tokens: model.max_tokens,
        };

        let mut retries = 0u32;
        loop {
            let attempt = retries + 1;
            debug!(
                provider = self.provider.name(),
                attempt,
                max_attempts = self.policy.max_retries + 1,
                "Calling provider"
            );

            let outcome = match tokio::time::timeout(
                self.policy.attempt_timeout,
                self.provider.complete(request.clone()),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(format!(
                    "attempt {attempt} exceeded {}s",
                    self.policy.attempt_timeout.as_secs()
                ))),
            };

            let error = match outcome {
                Ok(response) => {
                    info!(
                        provider = self.provider.name(),
                        model = %response.model,
                        retries,
                        "Completion succeeded"
                    );
                    return Ok(Completion {
                        reply: response.message.content,
                        retries,
                        model: response.model,
                        usage: response.usage,
                    });
                }
                Err(e) => e,
            };

            let kind = classify(&error);
            if !kind.is_retryable() || retries >= self.policy.max_retries {
                warn!(
                    provider = self.provider.name(),
                    kind = kind.as_str(),
                    retries,
                    error = %error,
                    "Completion failed"
                );
                return Err(UpstreamFailure::new(kind, retries, &error));
            }

            retries += 1;
            let delay = self.policy.backoff_for(retries);
            warn!(
                provider = self.provider.name(),
                kind = kind.as_str(),
                retry = retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retryable provider failure, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
