use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use second_brain_assistant::{ChatComposer, NoteAnalyzer, SourceKind};
use second_brain_schemas::{
    ChatRequest, ChatResponse, CompactResponse, MemoryId, NewMemory, NoteRequest, SaveRequest,
    SaveResponse,
};
use second_brain_store::{MemoryStore, StoreError, DEFAULT_LOAD_LIMIT};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Per-request handles. Cloned into every handler by axum.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<MemoryStore>>,
    pub analyzer: Arc<NoteAnalyzer>,
    pub chat: Arc<ChatComposer>,
    pub chat_history_limit: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .route("/memories", get(list_memories).post(save_memory))
        .route("/memories/compact", post(compact_memories))
        .route("/memories/reset", post(reset_memories))
        .route("/memories/:id", get(get_memory).delete(delete_memory))
        .route("/notes", post(ingest_note))
        .route("/briefs", post(ingest_brief))
        .route("/chat", post(chat))
        .with_state(state)
}

type ApiError = (StatusCode, String);

fn store_error(action: &str, e: StoreError) -> ApiError {
    error!("Failed to {}: {}", action, e);
    let status = if e.is_unavailable() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, e.to_string())
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "second-brain",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn get_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.lock().await;
    let memories = store
        .count()
        .map_err(|e| store_error("count memories", e))?;

    Ok(Json(serde_json::json!({ "memories": memories })))
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    limit: Option<usize>,
}

async fn list_memories(
    State(state): State<AppState>,
    query: Option<Query<ListQuery>>,
) -> impl IntoResponse {
    let params = query.map(|q| q.0).unwrap_or_default();
    let limit = params.limit.unwrap_or(DEFAULT_LOAD_LIMIT).clamp(1, 500);

    let store = state.store.lock().await;
    let memories = store.load(limit);

    Json(serde_json::json!({ "memories": memories }))
}

async fn get_memory(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.lock().await;
    let memory = store
        .get(MemoryId(id))
        .map_err(|e| store_error("get memory", e))?;

    match memory {
        Some(memory) => Ok(Json(memory)),
        None => Err((StatusCode::NOT_FOUND, format!("memory {} not found", id))),
    }
}

async fn save_memory(
    State(state): State<AppState>,
    Json(request): Json<SaveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let memory = request.into_new_memory();

    let store = state.store.lock().await;
    let id = store
        .save(&memory)
        .map_err(|e| store_error("save memory", e))?;

    info!("Saved manual memory {}", id);
    Ok((
        StatusCode::CREATED,
        Json(SaveResponse {
            id,
            summary: memory.summary,
            tags: memory.tags,
        }),
    ))
}

async fn delete_memory(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.lock().await;
    let deleted = store
        .delete(MemoryId(id))
        .map_err(|e| store_error("delete memory", e))?;

    Ok(Json(serde_json::json!({ "id": id, "deleted": deleted })))
}

async fn compact_memories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.lock().await;
    let records = store
        .compact_ids()
        .map_err(|e| store_error("compact memory ids", e))?;

    Ok(Json(CompactResponse { records }))
}

async fn reset_memories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.lock().await;
    store
        .reset()
        .map_err(|e| store_error("reset memories", e))?;

    warn!("All memories destroyed by reset");
    Ok(Json(serde_json::json!({ "reset": true })))
}

/// Summarize and tag a note, then save it. Service failures are returned
/// with the inline error text and nothing is saved.
async fn ingest_note(
    State(state): State<AppState>,
    Json(request): Json<NoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let card = state.analyzer.analyze(&request.text).await;
    if card.is_error() {
        return Err((StatusCode::BAD_GATEWAY, card.summary));
    }

    let memory = NewMemory::new(request.category, request.text, card.summary, card.tags);

    let store = state.store.lock().await;
    let id = store
        .save(&memory)
        .map_err(|e| store_error("save note", e))?;

    info!("Saved analyzed note {}", id);
    Ok((
        StatusCode::CREATED,
        Json(SaveResponse {
            id,
            summary: memory.summary,
            tags: memory.tags,
        }),
    ))
}

/// Fetched source text to be turned into a brief
#[derive(Debug, Deserialize)]
struct BriefRequest {
    category: String,
    /// Query or URL the text was fetched for; stored as the content
    source: String,
    kind: SourceKind,
    text: String,
}

async fn ingest_brief(
    State(state): State<AppState>,
    Json(request): Json<BriefRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.text.trim().is_empty() {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, "no source text to summarize".to_string()));
    }

    let card = state
        .analyzer
        .brief(request.kind, &request.text)
        .await
        .map_err(|e| {
            error!("Failed to write brief for {}: {}", request.source, e);
            (StatusCode::BAD_GATEWAY, format!("AI generation failed: {}", e))
        })?;

    let memory = NewMemory::new(request.category, request.source, card.summary, card.tags);

    let store = state.store.lock().await;
    let id = store
        .save(&memory)
        .map_err(|e| store_error("save brief", e))?;

    info!("Saved brief {}", id);
    Ok((
        StatusCode::CREATED,
        Json(SaveResponse {
            id,
            summary: memory.summary,
            tags: memory.tags,
        }),
    ))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    // Release the store before the slow model call
    let memories = {
        let store = state.store.lock().await;
        store.load(state.chat_history_limit)
    };

    let answer = state.chat.answer(&request.query, &memories).await;

    Json(ChatResponse {
        answer,
        memories_used: memories.len(),
    })
}
