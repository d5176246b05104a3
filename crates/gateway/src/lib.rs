//! HTTP API gateway for askfolio.
//!
//! Exposes the chat endpoint used by the portfolio front-end, a diagnostics
//! view of the same endpoint, and a health check.
//!
//! Built on Axum for high performance async HTTP.

use std::any::Any;
use std::sync::Arc;

use askfolio_agent::RagPipeline;
use askfolio_config::AppConfig;
use askfolio_core::{ChatRequest, Error};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::{Router, routing::get, routing::post};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub pipeline: Arc<RagPipeline>,
    pub started_at: DateTime<Utc>,
}

impl GatewayState {
    pub fn new(config: AppConfig, pipeline: Arc<RagPipeline>) -> Self {
        Self {
            config,
            pipeline,
            started_at: Utc::now(),
        }
    }

    pub fn from_config(config: AppConfig) -> Self {
        let pipeline = Arc::new(RagPipeline::from_config(&config));
        Self::new(config, pipeline)
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - CORS from `gateway.allowed_origins` (`"*"` allows any origin)
/// - Request body size limit (1 MB)
/// - Panic capture into a generic 500 body
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.gateway.allowed_origins);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", get(diagnostics_handler).post(chat_handler))
        .route("/api/chat/", post(chat_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB body limit
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.iter().any(|o| o.trim() == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| match o.trim().parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(GatewayState::from_config(config));

    if !state.pipeline.is_configured() {
        warn!("No provider configured: POST /api/chat will answer with a configuration error");
    }

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// --- Error bodies ---

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            kind: None,
            retries: None,
            diagnostic: None,
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a pipeline error onto its HTTP status and body.
///
/// Provider error text only leaves the process when `expose_diagnostics`
/// is set.
pub fn error_response(err: &Error, expose_diagnostics: bool) -> ApiError {
    match err {
        Error::InvalidInput(message) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Invalid request", message.clone())),
        ),
        Error::Config { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Service not configured", message.clone())),
        ),
        Error::Upstream(failure) => {
            let mut body = ErrorResponse::new("Language model error", failure.user_message.clone());
            body.kind = Some(failure.kind.as_str().to_string());
            body.retries = Some(failure.retries);
            if expose_diagnostics {
                body.diagnostic = Some(failure.detail.clone());
            }
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body))
        }
        Error::Internal(detail) => {
            error!(error = %detail, "Unexpected pipeline error");
            internal_error()
        }
    }
}

fn internal_error() -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(
            "Internal server error",
            "An unexpected error occurred. Please try again.",
        )),
    )
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = %detail, "Request handler panicked");
    internal_error().into_response()
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let request_id = uuid::Uuid::new_v4();

    let Json(request) = payload.map_err(|rejection| {
        warn!(%request_id, error = %rejection.body_text(), "Rejected chat body");
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "Invalid request",
                "Request body must be JSON with a \"message\" field",
            )),
        )
    })?;

    info!(
        %request_id,
        message_len = request.message.len(),
        history = request.history.len(),
        "Chat request"
    );

    match state.pipeline.answer(&request).await {
        Ok(reply) => {
            info!(%request_id, retries = reply.retries, "Chat answered");
            Ok(Json(ChatResponse {
                response: reply.response,
            }))
        }
        Err(e) => {
            warn!(%request_id, error = %e, "Chat failed");
            Err(error_response(&e, state.config.gateway.expose_diagnostics))
        }
    }
}

#[derive(Debug, Serialize)]
struct DiagnosticsResponse {
    status: &'static str,
    endpoint: &'static str,
    methods: [&'static str; 3],
    api_key_configured: bool,
    api_key_length: usize,
    provider: String,
    model: String,
    strategy: &'static str,
    knowledge_chunks: usize,
    started_at: DateTime<Utc>,
    uptime_secs: i64,
}

async fn diagnostics_handler(State(state): State<SharedState>) -> Json<DiagnosticsResponse> {
    let key_length = state
        .config
        .api_key
        .as_deref()
        .map(|k| k.trim().chars().count())
        .unwrap_or(0);

    let knowledge_chunks = state.pipeline.chunk_count().await.unwrap_or_else(|e| {
        warn!(error = %e, "Could not count knowledge chunks");
        0
    });

    Json(DiagnosticsResponse {
        status: "ok",
        endpoint: "chat",
        methods: ["GET", "POST", "OPTIONS"],
        api_key_configured: state.config.has_api_key(),
        api_key_length: key_length,
        provider: state.config.provider.name.clone(),
        model: state.pipeline.model().model.clone(),
        strategy: state.pipeline.strategy(),
        knowledge_chunks,
        started_at: state.started_at,
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use askfolio_agent::ConversationComposer;
    use askfolio_core::error::ProviderError;
    use askfolio_core::message::Message;
    use askfolio_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use askfolio_providers::{ChatOrchestrator, ModelConfig, RetryPolicy};
    use askfolio_retrieval::{Chunker, KnowledgeStore, Scorer};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::Mutex;
    use tower::ServiceExt;

    enum Behaviour {
        Reply(&'static str),
        Fail(ProviderError),
        Panic,
    }

    struct MockProvider {
        behaviour: Behaviour,
        call_count: Mutex<usize>,
    }

    impl MockProvider {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                call_count: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            "gateway_mock"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            match &self.behaviour {
                Behaviour::Reply(text) => Ok(ProviderResponse {
                    message: Message::assistant(*text),
                    usage: None,
                    model: request.model,
                }),
                Behaviour::Fail(e) => Err(e.clone()),
                Behaviour::Panic => panic!("provider exploded"),
            }
        }
    }

    const PROFILE: &str = r#"{"projects":[{"title":"Portfolio Site","category":"Web","description":"Personal website"}]}"#;

    fn test_config(dir: &tempfile::TempDir) -> AppConfig {
        let path = dir.path().join("knowledge-base.json");
        std::fs::write(&path, PROFILE).unwrap();
        let mut config = AppConfig::default();
        config.knowledge.path = Some(path);
        config.knowledge.base_dir = dir.path().join("absent");
        config
    }

    fn state_with(config: AppConfig, provider: Option<Arc<MockProvider>>) -> SharedState {
        let mut pipeline = RagPipeline::new(
            Arc::new(KnowledgeStore::from_config(&config)),
            Chunker::from_config(&config),
            Scorer::from_config(&config),
            ConversationComposer::from_config(&config),
            ModelConfig::from_settings(&config.provider),
            config.retrieval.top_k,
        );
        if let Some(p) = provider {
            pipeline = pipeline.with_orchestrator(ChatOrchestrator::new(
                p,
                RetryPolicy {
                    max_retries: 0,
                    ..RetryPolicy::default()
                },
            ));
        }
        Arc::new(GatewayState::new(config, Arc::new(pipeline)))
    }

    fn post_chat(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(state_with(test_config(&dir), None));

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn chat_success() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new(Behaviour::Reply("He built a Portfolio Site."));
        let app = build_router(state_with(test_config(&dir), Some(provider.clone())));

        let response = app
            .oneshot(post_chat("/api/chat", r#"{"message":"What projects has he built?"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["response"], "He built a Portfolio Site.");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn trailing_slash_route() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new(Behaviour::Reply("ok"));
        let app = build_router(state_with(test_config(&dir), Some(provider)));

        let response = app
            .oneshot(post_chat("/api/chat/", r#"{"message":"hi","history":[]}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_message_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new(Behaviour::Reply("unused"));
        let app = build_router(state_with(test_config(&dir), Some(provider.clone())));

        let response = app
            .oneshot(post_chat("/api/chat", r#"{"message":"  "}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Message is required");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(state_with(test_config(&dir), None));

        let response = app
            .oneshot(post_chat("/api/chat", "{not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Invalid request");
    }

    #[tokio::test]
    async fn missing_provider_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(state_with(test_config(&dir), None));

        let response = app
            .oneshot(post_chat("/api/chat", r#"{"message":"hi"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "Service not configured");
    }

    #[tokio::test]
    async fn upstream_failure_hides_detail_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new(Behaviour::Fail(ProviderError::AuthenticationFailed(
            "sk-secret rejected".into(),
        )));
        let app = build_router(state_with(test_config(&dir), Some(provider)));

        let response = app
            .oneshot(post_chat("/api/chat", r#"{"message":"hi"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["type"], "rejected");
        assert_eq!(body["retries"], 0);
        assert!(body.get("diagnostic").is_none());
        assert!(!body.to_string().contains("sk-secret"));
    }

    #[tokio::test]
    async fn upstream_failure_exposes_detail_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir);
        config.gateway.expose_diagnostics = true;
        let provider = MockProvider::new(Behaviour::Fail(ProviderError::ApiError {
            status_code: 503,
            message: "overloaded".into(),
        }));
        let app = build_router(state_with(config, Some(provider)));

        let response = app
            .oneshot(post_chat("/api/chat", r#"{"message":"hi"}"#))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["type"], "service_unavailable");
        assert!(body["diagnostic"].as_str().unwrap().contains("overloaded"));
    }

    #[tokio::test]
    async fn panic_becomes_generic_500() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new(Behaviour::Panic);
        let app = build_router(state_with(test_config(&dir), Some(provider)));

        let response = app
            .oneshot(post_chat("/api/chat", r#"{"message":"hi"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Internal server error");
        assert!(!body.to_string().contains("exploded"));
    }

    #[tokio::test]
    async fn diagnostics_never_leak_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir);
        config.api_key = Some("sk-test-1234567890".into());
        let app = build_router(state_with(config, None));

        let req = Request::builder().uri("/api/chat").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["api_key_configured"], true);
        assert_eq!(body["api_key_length"], 18);
        assert_eq!(body["knowledge_chunks"], 1);
        assert_eq!(body["strategy"], "tfidf");
        assert!(!body.to_string().contains("sk-test"));
    }

    #[tokio::test]
    async fn cors_preflight_allows_any_origin_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(state_with(test_config(&dir), None));

        let req = Request::builder()
            .method("OPTIONS")
            .uri("/api/chat")
            .header("origin", "https://portfolio.example")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn cors_respects_explicit_origins() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir);
        config.gateway.allowed_origins = vec!["https://portfolio.example".into()];
        let app = build_router(state_with(config, None));

        let req = Request::builder()
            .uri("/health")
            .header("origin", "https://evil.example")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[test]
    fn internal_errors_never_expose_detail() {
        let err = Error::Internal("retrieval task failed: panicked at loader.rs".into());
        let (status, Json(body)) = error_response(&err, true);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal server error");
        assert!(body.diagnostic.is_none());
        assert!(!body.message.contains("loader.rs"));
    }
}
