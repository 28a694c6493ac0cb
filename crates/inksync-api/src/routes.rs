use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use inksync_core::store::{MemoryNoteStore, RemoteNoteStore};
use inksync_core::{Note, NoteKey};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    notes: Arc<MemoryNoteStore>,
}

impl AppState {
    pub fn from_config(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            notes: Arc::new(MemoryNoteStore::new()),
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let note_routes = Router::new().route(
        "/books/{book_key}/records/{record_uuid}/note",
        get(get_note).put(put_note),
    );

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/v1", note_routes)
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    notes: usize,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        notes: state.notes.len(),
    })
}

async fn get_note(
    State(state): State<AppState>,
    Path((book_key, record_uuid)): Path<(String, String)>,
) -> Result<Json<Note>, AppError> {
    let key = NoteKey::new(book_key, record_uuid);
    let note = state
        .notes
        .fetch_note(&key)
        .await?
        .ok_or_else(|| AppError::not_found(format!("no note for {key}")))?;
    Ok(Json(note))
}

async fn put_note(
    State(state): State<AppState>,
    Path((book_key, record_uuid)): Path<(String, String)>,
    Json(note): Json<Note>,
) -> Result<Json<Note>, AppError> {
    let key = NoteKey::new(book_key, record_uuid);
    if note.key() != key {
        return Err(AppError::bad_request(format!(
            "note body is for {} but the path names {key}",
            note.key()
        )));
    }

    match state.notes.save_note(&key, &note).await {
        Ok(saved) => {
            tracing::info!(
                endpoint = "put_note",
                note = %key,
                version = saved.version,
                strokes = saved.stroke_count(),
                "Stored note"
            );
            Ok(Json(saved))
        }
        Err(error) => {
            if error.is_conflict() {
                tracing::info!(
                    endpoint = "put_note",
                    note = %key,
                    proposed = note.version,
                    "Rejected stale note version"
                );
            }
            Err(error.into())
        }
    }
}
