//! Question answering over the indexed documents

use std::time::Instant;

use axum::extract::State;
use axum::Json;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::query::ChatRequest;
use crate::types::response::{ChatResponse, SourceRef};

/// Answer a question from the indexed documents. An empty or unmatched
/// index is not an error: the response carries a standing answer and no
/// sources, and the UI renders it like any other turn.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let start = Instant::now();

    let question = request.question.trim();
    if question.is_empty() {
        return Err(Error::invalid_request("question must not be empty"));
    }

    tracing::info!("Question: \"{}\"", question);

    let retrieved = match state.retrieval().retrieve(question, request.top_k).await {
        Ok(retrieved) => retrieved,
        Err(Error::NoContext) => {
            let elapsed = start.elapsed().as_millis() as u64;
            tracing::info!("No relevant context found ({}ms)", elapsed);
            return Ok(Json(ChatResponse::not_found(elapsed)));
        }
        Err(e) => return Err(e),
    };

    let answer = state
        .generator()
        .generate(question, &retrieved.context, &request.chat_history)
        .await?;

    let sources: Vec<SourceRef> = retrieved.chunks.iter().map(SourceRef::from_result).collect();
    let elapsed = start.elapsed().as_millis() as u64;
    tracing::info!(
        "Answered with {} sources in {}ms",
        sources.len(),
        elapsed
    );

    Ok(Json(ChatResponse::new(answer, sources, elapsed)))
}
