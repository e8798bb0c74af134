//! HTTP surface
//!
//! Exposes the chat endpoint plus the session utility endpoints over axum.
//! All conversation state rides in the request/response bodies as a signed
//! token; handlers hold no per-client state. The token travels either in
//! the JSON body (`token`), as a `?token=` query parameter, or as a bearer
//! Authorization header.
//!
//! Error mapping: validation failures are 400, missing/unusable
//! configuration is 503, anything unexpected is 500. Provider failures
//! never surface as HTTP errors; the orchestrator has already collapsed
//! them into sentinel replies by the time a handler sees the outcome.

use crate::composer::ResponseComposer;
use crate::config::Config;
use crate::error::{BridgechatError, Result};
use crate::orchestrator::{TurnOrchestrator, TurnOutcome};
use crate::providers::OpenAiProvider;
use crate::retrieval::QdrantIndex;
use crate::session::{SessionCodec, Turn};

use axum::extract::{Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared handler state
///
/// Dependencies are constructed once at startup and injected; the concrete
/// provider and index handles stay visible here so the health endpoint can
/// probe them directly.
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<TurnOrchestrator>,
    provider: Arc<OpenAiProvider>,
    index: Arc<QdrantIndex>,
}

impl AppState {
    /// The session codec, exposed for tests that need to mint tokens
    pub fn codec(&self) -> &SessionCodec {
        self.orchestrator.codec()
    }
}

/// Build the application state from validated configuration
///
/// # Errors
///
/// Returns a configuration error if either HTTP client fails to build.
pub fn build_state(config: &Config) -> Result<AppState> {
    let provider = Arc::new(OpenAiProvider::new(config.openai.clone())?);
    let index = Arc::new(QdrantIndex::new(config.qdrant.clone())?);

    let composer = ResponseComposer::new(
        provider.clone(),
        config.openai.temperature,
        config.openai.max_tokens,
        config.chat.history_window,
    );
    let codec = SessionCodec::new(config.session.secret.clone(), config.session.ttl_hours);

    let orchestrator = TurnOrchestrator::new(
        provider.clone(),
        index.clone(),
        composer,
        codec,
        config.qdrant.top_k,
        config.session.max_turns,
    );

    Ok(AppState {
        orchestrator: Arc::new(orchestrator),
        provider,
        index,
    })
}

/// Build the router over the given state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/history", get(history))
        .route("/api/clear", post(clear))
        .route("/health", get(health))
        .with_state(state)
}

/// Extract a bearer token from the Authorization header, if present
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Error wrapper that maps domain errors onto HTTP statuses
struct ApiError(anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.downcast_ref::<BridgechatError>() {
            Some(BridgechatError::Validation(_)) => StatusCode::BAD_REQUEST,
            Some(BridgechatError::Config(_)) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {:#}", self.0);
        } else {
            tracing::info!("Request rejected with {}: {}", status, self.0);
        }

        let body = Json(ErrorBody {
            error: self.0.to_string(),
            success: false,
        });
        (status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    success: bool,
}

#[derive(Debug, Deserialize)]
struct ChatBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatReply {
    response: String,
    quick_replies: Vec<String>,
    token: String,
    success: bool,
    limit_reached: bool,
}

impl From<TurnOutcome> for ChatReply {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            response: outcome.response,
            quick_replies: outcome.quick_replies,
            token: outcome.token,
            success: true,
            limit_reached: outcome.limit_reached,
        }
    }
}

/// POST /api/chat
async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChatBody>,
) -> std::result::Result<Json<ChatReply>, ApiError> {
    let token = body.token.or_else(|| bearer_token(&headers));

    tracing::info!("Chat message received ({} chars)", body.message.len());
    let outcome = state
        .orchestrator
        .process(&body.message, token.as_deref())
        .await?;
    tracing::info!(
        "Replying with {} chars, {} quick replies",
        outcome.response.len(),
        outcome.quick_replies.len()
    );

    Ok(Json(outcome.into()))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct HistoryReply {
    history: Vec<Turn>,
}

/// GET /api/history
///
/// Read-only view of whatever the supplied token carries. An absent or
/// invalid token is not an error; it is an empty history.
async fn history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HistoryParams>,
) -> Json<HistoryReply> {
    let token = params.token.or_else(|| bearer_token(&headers));

    let history = match token.as_deref() {
        Some(token) => state.orchestrator.codec().decode(token).history,
        None => Vec::new(),
    };
    Json(HistoryReply { history })
}

#[derive(Debug, Serialize)]
struct ClearReply {
    success: bool,
    token: String,
}

/// POST /api/clear
///
/// Issues a fresh empty-session token. Nothing server-side is cleared
/// because nothing server-side exists.
async fn clear(State(state): State<AppState>) -> std::result::Result<Json<ClearReply>, ApiError> {
    let token = state.orchestrator.codec().fresh_token()?;
    Ok(Json(ClearReply {
        success: true,
        token,
    }))
}

#[derive(Debug, Serialize)]
struct HealthReply {
    status: &'static str,
    openai_ready: bool,
    qdrant_connected: bool,
    model: String,
    embeddings: String,
    timestamp: DateTime<Utc>,
}

/// GET /health
///
/// Probes both external dependencies; the service itself answers 200
/// either way, with per-dependency readiness flags in the body.
async fn health(State(state): State<AppState>) -> Json<HealthReply> {
    let openai_ready = state.provider.healthcheck().await;
    let qdrant_connected = state.index.healthcheck().await;

    let status = if openai_ready && qdrant_connected {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthReply {
        status,
        openai_ready,
        qdrant_connected,
        model: state.provider.chat_model().to_string(),
        embeddings: state.provider.embedding_model().to_string(),
        timestamp: Utc::now(),
    })
}

/// Bind and serve until shutdown
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(config: &Config) -> Result<()> {
    let state = build_state(config)?;
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| BridgechatError::Config(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
