//! Route handlers

pub mod chat;
pub mod upload;

use axum::extract::{DefaultBodyLimit, State};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::server::state::AppState;
use crate::types::response::HealthResponse;

/// All routes, matching what the bundled page calls.
pub fn app_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(index_page))
        .route(
            "/upload",
            post(upload::upload_files).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/chat", post(chat::chat))
        .route("/health", get(health))
}

/// The single page chat UI, served inline so the binary is self contained.
async fn index_page() -> Html<&'static str> {
    Html(include_str!("../../../static/index.html"))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        index_chunks: state.index().snapshot().len(),
        embedding_model: state.embedder().name().to_string(),
    })
}
