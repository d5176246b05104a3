//! Provider construction from configuration.
//!
//! The provider is built once at startup and shared behind an `Arc`; its
//! HTTP connection pool lives as long as the process.

use std::sync::Arc;
use std::time::Duration;

use askfolio_config::{AppConfig, ConfigError};
use askfolio_core::Provider;
use tracing::info;

use crate::openai_compat::OpenAiCompatProvider;
use crate::retry::{ChatOrchestrator, RetryPolicy};

/// Providers that run locally and accept any key.
const KEYLESS_PROVIDERS: &[&str] = &["ollama", "vllm", "llamacpp"];

/// Build the configured provider.
///
/// Fails with [`ConfigError::MissingApiKey`] when a hosted provider has no
/// key, and with a validation error for an unknown provider without an
/// explicit `api_url`.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ConfigError> {
    let name = config.provider.name.trim();
    let keyless = KEYLESS_PROVIDERS.contains(&name);

    let api_key = if keyless {
        config.api_key.clone().unwrap_or_else(|| name.to_string())
    } else {
        config.require_api_key()?.to_string()
    };

    let base_url = match &config.provider.api_url {
        Some(url) => url.clone(),
        None => default_base_url(name).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "provider.api_url is required for provider '{name}'"
            ))
        })?,
    };

    // Transport ceiling sits above the orchestrator's own attempt timeout.
    let http_timeout = Duration::from_secs(config.orchestrator.attempt_timeout_secs.saturating_mul(2));

    info!(provider = name, base_url = %base_url, "Provider configured");
    Ok(Arc::new(OpenAiCompatProvider::with_timeout(
        name,
        base_url,
        api_key,
        http_timeout,
    )))
}

/// Build the provider plus its retry policy in one step.
pub fn orchestrator_from_config(config: &AppConfig) -> Result<ChatOrchestrator, ConfigError> {
    let provider = build_from_config(config)?;
    Ok(ChatOrchestrator::new(
        provider,
        RetryPolicy::from_config(&config.orchestrator),
    ))
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> Option<String> {
    let url = match provider_name {
        "openai" => "https://api.openai.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "ollama" => "http://localhost:11434/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "together" => "https://api.together.xyz/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" => "http://localhost:8080/v1",
        _ => return None,
    };
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_key(key: Option<&str>) -> AppConfig {
        AppConfig {
            api_key: key.map(String::from),
            ..AppConfig::default()
        }
    }

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").unwrap().contains("openrouter.ai"));
        assert!(default_base_url("openai").unwrap().contains("api.openai.com"));
        assert!(default_base_url("ollama").unwrap().contains("localhost:11434"));
        assert!(default_base_url("mystery").is_none());
    }

    #[test]
    fn build_from_default_config_with_key() {
        let provider = build_from_config(&with_key(Some("sk-test"))).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let err = build_from_config(&with_key(None)).err().unwrap();
        assert!(matches!(err, ConfigError::MissingApiKey));

        let err = build_from_config(&with_key(Some("   "))).err().unwrap();
        assert!(matches!(err, ConfigError::MissingApiKey));
    }

    #[test]
    fn local_provider_needs_no_key() {
        let mut config = with_key(None);
        config.provider.name = "ollama".into();
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn unknown_provider_requires_url() {
        let mut config = with_key(Some("k"));
        config.provider.name = "acme".into();
        assert!(matches!(
            build_from_config(&config).err().unwrap(),
            ConfigError::ValidationError(_)
        ));

        config.provider.api_url = Some("https://llm.acme.test/v1".into());
        assert_eq!(build_from_config(&config).unwrap().name(), "acme");
    }

    #[test]
    fn orchestrator_uses_configured_policy() {
        let mut config = with_key(Some("k"));
        config.orchestrator.max_retries = 3;
        let orch = orchestrator_from_config(&config).unwrap();
        assert_eq!(orch.policy().max_retries, 3);
    }
}
