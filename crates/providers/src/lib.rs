//! LLM provider plumbing for askfolio.
//!
//! `OpenAiCompatProvider` implements the `askfolio_core::Provider` trait for
//! any OpenAI-shaped endpoint; `ChatOrchestrator` wraps a provider with
//! per-attempt timeouts, retries and error classification.

pub mod builder;
pub mod openai_compat;
pub mod retry;

pub use builder::{build_from_config, default_base_url, orchestrator_from_config};
pub use openai_compat::OpenAiCompatProvider;
pub use retry::{ChatOrchestrator, Completion, ModelConfig, RetryPolicy, classify};
