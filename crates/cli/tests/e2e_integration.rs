//! End-to-end integration tests for askfolio.
//!
//! These tests exercise the full pipeline from a visitor question to the
//! model reply: knowledge loading, chunking, scoring, context assembly,
//! conversation composition, and the retrying orchestrator.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use askfolio_agent::{ConversationComposer, RagPipeline, assemble};
use askfolio_config::{AppConfig, ScoringStrategy};
use askfolio_core::{
    ChatRequest, ChunkSource, ConversationTurn, Error, FailureKind, KnowledgeDocument, Message,
    Provider, ProviderError, ProviderRequest, ProviderResponse, Role, Usage,
};
use askfolio_providers::{ChatOrchestrator, RetryPolicy};
use askfolio_retrieval::{Chunker, KnowledgeStore, Scorer, chunk};

const PROFILE: &str = r#"{
    "about": {
        "name": "Ada Lovelace",
        "summary": "Mathematician who wrote the first published algorithm.",
        "skills": {
            "programming": ["Python", "Rust"],
            "databases": ["PostgreSQL"]
        }
    },
    "experience": [{
        "role": "Analyst",
        "company": "Analytical Engine Co",
        "period": "1842 - 1843",
        "responsibilities": ["Translated the Menabrea memoir", "Wrote notes on Bernoulli numbers"]
    }],
    "education": {
        "degree": "Private tutoring in mathematics",
        "institution": "Home study",
        "coursework": ["Calculus", "Logic"]
    },
    "projects": [
        {
            "title": "Portfolio Site",
            "category": "Web",
            "description": "Personal website with a chatbot",
            "technologies": ["HTML", "CSS", "JavaScript"],
            "github": "https://example.com/ada/portfolio"
        },
        {
            "title": "Sales Dashboard",
            "category": "Data",
            "description": "Interactive dashboard of quarterly revenue",
            "outcome": "Cut reporting time in half",
            "technologies": ["Python", "Plotly"]
        }
    ]
}"#;

// ── Mock Provider ────────────────────────────────────────────────────────

enum Step {
    Reply(&'static str),
    Fail(ProviderError),
    Hang,
}

/// A mock provider that plays back a script, one step per call.
struct ScriptedProvider {
    steps: Mutex<Vec<Step>>,
    calls: Mutex<usize>,
    last_request: Mutex<Option<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(mut steps: Vec<Step>) -> Arc<Self> {
        steps.reverse();
        Arc::new(Self {
            steps: Mutex::new(steps),
            calls: Mutex::new(0),
            last_request: Mutex::new(None),
        })
    }

    fn text(reply: &'static str) -> Arc<Self> {
        Self::new(vec![Step::Reply(reply)])
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    fn last_messages(&self) -> Vec<Message> {
        self.last_request
            .lock()
            .unwrap()
            .as_ref()
            .map(|r| r.messages.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        *self.calls.lock().unwrap() += 1;
        *self.last_request.lock().unwrap() = Some(request.clone());
        let step = self.steps.lock().unwrap().pop();
        match step {
            Some(Step::Reply(text)) => Ok(ProviderResponse {
                message: Message::assistant(text),
                usage: Some(Usage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }),
                model: request.model,
            }),
            Some(Step::Fail(e)) => Err(e),
            Some(Step::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProviderError::Other("unreachable".into()))
            }
            None => panic!("ScriptedProvider exhausted"),
        }
    }
}

fn test_config(dir: &tempfile::TempDir) -> AppConfig {
    let path = dir.path().join("portfolio_data.json");
    std::fs::write(&path, PROFILE).unwrap();

    let mut config = AppConfig::default();
    config.knowledge.path = Some(path);
    config.knowledge.base_dir = dir.path().join("absent");
    config.profile.owner_name = "Ada".into();
    config
}

fn pipeline_with(config: &AppConfig, provider: Arc<ScriptedProvider>) -> RagPipeline {
    RagPipeline::from_config(config)
        .with_orchestrator(ChatOrchestrator::new(provider, RetryPolicy::from_config(&config.orchestrator)))
}

fn profile() -> KnowledgeDocument {
    serde_json::from_str(PROFILE).unwrap()
}

// ── E2E: Retrieval ──────────────────────────────────────────────────────

#[test]
fn e2e_chunking_is_deterministic_and_ordered() {
    let doc = profile();
    let first = chunk(&doc);
    let second = chunk(&doc);
    assert_eq!(first, second);

    let sources: Vec<ChunkSource> = first.iter().map(|c| c.source).collect();
    assert_eq!(
        sources,
        vec![
            ChunkSource::About,
            ChunkSource::Skills,
            ChunkSource::Experience,
            ChunkSource::Education,
            ChunkSource::Projects,
            ChunkSource::Projects,
        ]
    );
    assert!(first.iter().all(|c| !c.text.trim().is_empty()));
}

#[test]
fn e2e_empty_document_yields_empty_context() {
    let chunks = chunk(&KnowledgeDocument::default());
    assert!(chunks.is_empty());

    let scorer = Scorer::from_config(&AppConfig::default());
    let selected = scorer.score("anything at all", &chunks, 3);
    assert!(selected.is_empty());
    assert_eq!(assemble(&selected), "");
}

#[test]
fn e2e_scores_are_bounded_for_both_strategies() {
    let chunks = chunk(&profile());
    for strategy in [ScoringStrategy::Tfidf, ScoringStrategy::Lexical] {
        let mut config = AppConfig::default();
        config.retrieval.strategy = strategy;
        let scorer = Scorer::from_config(&config);

        for query in ["python dashboard", "Where did Ada study?", "zzz qqq", ""] {
            let selected = scorer.score(query, &chunks, 3);
            assert!(selected.len() <= 3);
            for scored in &selected {
                assert!(scored.index < chunks.len());
                if strategy == ScoringStrategy::Tfidf {
                    assert!((0.0..=1.0).contains(&scored.score), "{query}: {}", scored.score);
                } else {
                    assert!(scored.score >= 0.0);
                }
            }
        }
    }
}

#[test]
fn e2e_project_question_recalls_project_chunks() {
    let chunks = chunk(&profile());
    let scorer = Scorer::from_config(&AppConfig::default());

    let selected = scorer.score("What projects has he built?", &chunks, 3);
    assert!(!selected.is_empty());
    assert!(
        selected.iter().any(|s| s.source() == ChunkSource::Projects),
        "project chunk missing from {:?}",
        selected.iter().map(|s| s.source()).collect::<Vec<_>>()
    );
}

#[test]
fn e2e_assembly_is_idempotent() {
    let chunks = chunk(&profile());
    let scorer = Scorer::from_config(&AppConfig::default());
    let selected = scorer.score("python", &chunks, 3);
    assert_eq!(assemble(&selected), assemble(&selected));
}

#[test]
fn e2e_store_reads_knowledge_from_disk_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let store = KnowledgeStore::from_config(&config);
    let chunker = Chunker::from_config(&config);

    let first = chunker.chunk(&store.document());
    let second = chunker.chunk(&store.document());
    assert_eq!(first, second);
    assert_eq!(first.len(), 6);
    assert_eq!(store.disk_loads(), 1);
}

// ── E2E: Conversation ───────────────────────────────────────────────────

#[test]
fn e2e_history_window_keeps_last_ten_turns() {
    let history: Vec<ConversationTurn> = (0..15)
        .map(|i| ConversationTurn::new(if i % 2 == 0 { "user" } else { "assistant" }, format!("turn {i}")))
        .collect();

    let composer = ConversationComposer::from_config(&AppConfig::default());
    let messages = composer.compose("About Ada", &history, "Next?");

    assert_eq!(messages.len(), 13);
    assert_eq!(messages[2].content, "turn 5");
    assert_eq!(messages[11].content, "turn 14");
    assert_eq!(messages[12].role, Role::User);
}

// ── E2E: Full pipeline ──────────────────────────────────────────────────

#[tokio::test]
async fn e2e_grounded_answer_about_projects() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let provider = ScriptedProvider::text("Ada built a Portfolio Site and a Sales Dashboard.");
    let pipeline = pipeline_with(&config, provider.clone());

    let reply = pipeline
        .answer(&ChatRequest::new("What projects has he built?"))
        .await
        .unwrap();

    assert_eq!(reply.response, "Ada built a Portfolio Site and a Sales Dashboard.");
    assert_eq!(reply.retries, 0);
    assert_eq!(provider.calls(), 1);

    let sent = provider.last_messages();
    assert_eq!(sent[0].role, Role::System);
    assert!(sent[0].content.contains("Ada's portfolio"));
    assert!(sent[1].content.contains("Project: "));
    assert_eq!(sent.last().unwrap().content, "What projects has he built?");
}

#[tokio::test(start_paused = true)]
async fn e2e_timeout_then_success_reports_one_retry() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let provider = ScriptedProvider::new(vec![Step::Hang, Step::Reply("Recovered answer")]);
    let pipeline = pipeline_with(&config, provider.clone());

    let reply = pipeline.answer(&ChatRequest::new("Tell me about Ada")).await.unwrap();

    assert_eq!(reply.response, "Recovered answer");
    assert_eq!(reply.retries, 1);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn e2e_rate_limit_exhausts_retries() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let provider = ScriptedProvider::new(vec![
        Step::Fail(ProviderError::RateLimited { retry_after_secs: 1 }),
        Step::Fail(ProviderError::RateLimited { retry_after_secs: 1 }),
        Step::Fail(ProviderError::RateLimited { retry_after_secs: 1 }),
    ]);
    let pipeline = pipeline_with(&config, provider.clone());

    let err = pipeline.answer(&ChatRequest::new("Hi")).await.unwrap_err();
    match err {
        Error::Upstream(failure) => {
            assert_eq!(failure.kind, FailureKind::RateLimited);
            assert_eq!(failure.retries, config.orchestrator.max_retries);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(provider.calls() as u32, config.orchestrator.max_retries + 1);
}

#[tokio::test]
async fn e2e_auth_failure_is_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let provider = ScriptedProvider::new(vec![Step::Fail(ProviderError::ApiError {
        status_code: 401,
        message: "invalid api key".into(),
    })]);
    let pipeline = pipeline_with(&config, provider.clone());

    let err = pipeline.answer(&ChatRequest::new("Hi")).await.unwrap_err();
    match err {
        Error::Upstream(failure) => {
            assert_eq!(failure.kind, FailureKind::Rejected);
            assert_eq!(failure.retries, 0);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn e2e_empty_message_does_no_work() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let provider = ScriptedProvider::new(vec![]);
    let pipeline = pipeline_with(&config, provider.clone());

    let err = pipeline.answer(&ChatRequest::new("  ")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(provider.calls(), 0);
    assert_eq!(pipeline.store().disk_loads(), 0);
}

// ── E2E: Gateway ────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_gateway_chat_round_trip() {
    use axum::body::Body;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let provider = ScriptedProvider::text("Ada studied mathematics at home.");
    let pipeline = Arc::new(pipeline_with(&config, provider.clone()));

    let state = Arc::new(askfolio_gateway::GatewayState::new(config, pipeline));
    let app = askfolio_gateway::build_router(state);

    let body = serde_json::json!({
        "message": "Where did Ada study?",
        "history": [
            {"role": "user", "content": "Hello"},
            {"role": "assistant", "content": "Hi! Ask me about Ada."}
        ]
    });
    let req = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), 200);

    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["response"], "Ada studied mathematics at home.");

    let sent = provider.last_messages();
    assert_eq!(sent.len(), 5);
    assert!(sent[1].content.contains("Education: "));
}
