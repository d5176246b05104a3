//! Shared test helpers for pipeline tests.

use askfolio_core::error::ProviderError;
use askfolio_core::message::Message;
use askfolio_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// A mock provider that answers every call the same way and records the
/// messages it was sent.
pub struct RecordingProvider {
    outcome: Result<String, ProviderError>,
    call_count: Mutex<usize>,
    last_messages: Mutex<Vec<Message>>,
}

impl RecordingProvider {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(text.to_string()),
            call_count: Mutex::new(0),
            last_messages: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: ProviderError) -> Arc<Self> {
        Arc::new(Self {
            outcome: Err(error),
            call_count: Mutex::new(0),
            last_messages: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn last_messages(&self) -> Vec<Message> {
        self.last_messages.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for RecordingProvider {
    fn name(&self) -> &str {
        "recording_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        *self.call_count.lock().unwrap() += 1;
        *self.last_messages.lock().unwrap() = request.messages;
        self.outcome.clone().map(|text| make_text_response(&text))
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Write a knowledge file into `dir` and return its path.
pub fn write_knowledge(dir: &tempfile::TempDir, json: &str) -> PathBuf {
    let path = dir.path().join("knowledge-base.json");
    std::fs::write(&path, json).unwrap();
    path
}
