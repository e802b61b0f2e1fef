//! Progress endpoint for the logged-in annotator

use axum::{extract::State, http::HeaderMap, Json};
use serde::Serialize;

use super::session_cookie::session_id;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub user_id: String,
    /// Cursor into the unannotated sequence
    pub text_index: usize,
    /// Units not annotated before this session started
    pub total: usize,
    pub finished: bool,
    /// Annotations waiting for the next flush
    pub buffered: usize,
    pub batch_size: usize,
}

/// GET /api/progress
///
/// Read-only: unlike rendering the page, this never flips the session to
/// finished or triggers a flush.
pub async fn progress(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<ProgressResponse>> {
    let not_logged_in = || ApiError::Unauthorized("Log ind for at se dine fremskridt".to_string());
    let id = session_id(&headers).ok_or_else(not_logged_in)?;

    let user_id = {
        let sessions = state.sessions.read().await;
        sessions
            .get(&id)
            .and_then(|session| session.annotator.as_ref())
            .map(|annotator| annotator.user_id.clone())
            .ok_or_else(not_logged_in)?
    };
    let corpus = state.corpus.load_texts(&user_id).await?;

    let sessions = state.sessions.read().await;
    let annotator = sessions
        .get(&id)
        .and_then(|session| session.annotator.as_ref())
        .ok_or_else(not_logged_in)?;
    let total = annotator.unannotated(&corpus).len();

    Ok(Json(ProgressResponse {
        user_id: annotator.user_id.clone(),
        text_index: annotator.text_index,
        total,
        finished: annotator.finished || annotator.text_index >= total,
        buffered: annotator.annotations.len(),
        batch_size: annotator.annotations.batch_size(),
    }))
}
