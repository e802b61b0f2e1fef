//! Page handlers: login, annotation loop, logout
//!
//! The session map lock is held only for in-memory transitions. Anything that
//! touches the spreadsheet store or the disk happens before the lock is taken,
//! and the session is looked up again afterwards.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use uuid::Uuid;

use super::session_cookie::{expired_cookie, session_cookie, session_id};
use crate::capture::{
    build_record_now, capture_selections, format_for_display, group_by_label, normalize_newlines,
};
use crate::directory::{authenticate, normalize_candidate, AllowList};
use crate::session::{AnnotatorSession, Progress};
use crate::ui::{self, AnnotationView};
use crate::{ApiError, ApiResult, AppState};

const ACCESS_DENIED: &str = "❌ Adgang nægtet: Dit bruger-ID er ikke autoriseret.";
const ENTER_USER_ID: &str = "Indtast dit bruger-ID for at logge ind.";
const NO_SELECTION: &str = "Markér mindst ét udsagn, før du gemmer.";

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AnnotateForm {
    /// Cursor the page was rendered for
    pub text_index: usize,
    /// JSON array written by the selection widget
    #[serde(default)]
    pub spans: String,
    #[serde(default)]
    pub comment: String,
}

fn not_logged_in() -> ApiError {
    ApiError::Unauthorized("Din session er udløbet. Log ind igen.".to_string())
}

/// Attach the session cookie when the session was created by this request
fn with_session_cookie(id: Uuid, created: bool, response: Response) -> Response {
    if created {
        ([(header::SET_COOKIE, session_cookie(id))], response).into_response()
    } else {
        response
    }
}

fn into_response(result: ApiResult<Response>) -> Response {
    result.unwrap_or_else(IntoResponse::into_response)
}

/// Allow-list cached in the session, fetched on first use
///
/// A failed fetch is fatal for the request and nothing is cached.
async fn ensure_allow_list(state: &AppState, id: Uuid) -> ApiResult<Arc<AllowList>> {
    let cached = state
        .sessions
        .read()
        .await
        .get(&id)
        .and_then(|session| session.allowed_users.clone());
    if let Some(allowed) = cached {
        return Ok(allowed);
    }

    let allowed = state
        .directory
        .fetch_allowed_users()
        .await
        .map(Arc::new)
        .map_err(ApiError::AllowListUnavailable)?;

    if let Some(session) = state.sessions.write().await.get_mut(&id) {
        session.allowed_users = Some(allowed.clone());
    }
    Ok(allowed)
}

/// User id of the logged-in annotator, if any
async fn logged_in_user(state: &AppState, id: Uuid) -> Option<String> {
    state
        .sessions
        .read()
        .await
        .get(&id)
        .and_then(|session| session.annotator.as_ref())
        .map(|annotator| annotator.user_id.clone())
}

/// GET /
///
/// Login form, current annotation unit, or completion banner.
pub async fn show_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, created) = state.sessions.ensure(session_id(&headers)).await;
    let response = into_response(render_current(&state, id).await);
    with_session_cookie(id, created, response)
}

async fn render_current(state: &AppState, id: Uuid) -> ApiResult<Response> {
    let Some(user_id) = logged_in_user(state, id).await else {
        ensure_allow_list(state, id).await?;
        return Ok(Html(ui::render_login(None)).into_response());
    };

    let corpus = state.corpus.load_texts(&user_id).await?;

    let mut sessions = state.sessions.write().await;
    let annotator = sessions
        .get_mut(&id)
        .and_then(|session| session.annotator.as_mut())
        .ok_or_else(not_logged_in)?;

    let page = match annotator.progress(&corpus, &state.writer) {
        Progress::Current { index, total, text } => {
            let unit = format_for_display(text);
            ui::render_annotation(&AnnotationView {
                user_id: &annotator.user_id,
                index,
                total,
                display_text: &unit.text,
                comment: &annotator.comment_text,
                error: None,
            })
        }
        Progress::Finished { .. } => ui::render_finished(&annotator.user_id),
    };
    Ok(Html(page).into_response())
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let (id, created) = state.sessions.ensure(session_id(&headers)).await;
    let response = into_response(start_session(&state, id, &form.user_id).await);
    with_session_cookie(id, created, response)
}

async fn start_session(state: &AppState, id: Uuid, candidate: &str) -> ApiResult<Response> {
    let allowed = ensure_allow_list(state, id).await?;

    let Some(user_id) = normalize_candidate(candidate) else {
        let page = ui::render_login(Some(ENTER_USER_ID));
        return Ok((StatusCode::BAD_REQUEST, Html(page)).into_response());
    };
    if !authenticate(user_id, &allowed) {
        tracing::warn!(user_id = %user_id, "Login rejected: not on allow-list");
        let page = ui::render_login(Some(ACCESS_DENIED));
        return Ok((StatusCode::UNAUTHORIZED, Html(page)).into_response());
    }

    let annotated = state
        .ledger
        .get_annotated_texts(user_id)
        .await
        .map_err(ApiError::LedgerUnavailable)?;

    let mut annotator = AnnotatorSession::start(user_id.to_string(), annotated, state.batch_size);
    // Sheet creation runs detached; the login does not wait for it
    let _ = state.writer.ensure_user_sheet(user_id);
    annotator.worksheet_ready = true;

    let mut sessions = state.sessions.write().await;
    let session = sessions.entry(id).or_default();
    if let Some(previous) = session.annotator.replace(annotator) {
        let _ = previous.close(&state.writer);
    }
    tracing::info!(
        user_id = %user_id,
        already_annotated = session.annotator.as_ref().map_or(0, |a| a.annotated_texts.len()),
        "Annotator logged in"
    );

    Ok(Redirect::to("/").into_response())
}

/// POST /annotate
///
/// Accepts the labeled spans for the unit at `text_index`. A submission for
/// any other unit is stale and rejected; a submission without spans is
/// rejected but keeps the draft comment.
pub async fn annotate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<AnnotateForm>,
) -> ApiResult<Response> {
    let id = session_id(&headers).ok_or_else(not_logged_in)?;
    let user_id = logged_in_user(&state, id).await.ok_or_else(not_logged_in)?;
    let corpus = state.corpus.load_texts(&user_id).await?;

    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(not_logged_in)?;
    session.touch();
    let annotator = session.annotator.as_mut().ok_or_else(not_logged_in)?;

    let (index, total, raw) = match annotator.progress(&corpus, &state.writer) {
        Progress::Current { index, total, text } => (index, total, text),
        Progress::Finished { .. } => {
            return Err(ApiError::Conflict("Alle tekster er allerede annoteret.".to_string()));
        }
    };
    if form.text_index != index {
        tracing::debug!(
            user_id = %annotator.user_id,
            submitted = form.text_index,
            current = index,
            "Stale submission"
        );
        return Err(ApiError::Conflict(format!(
            "Tekst {} er ikke længere den aktuelle tekst.",
            form.text_index.saturating_add(1)
        )));
    }

    let unit = format_for_display(raw);
    let comment = normalize_newlines(&form.comment);

    let rejection = match capture_selections(&unit.text, &form.spans) {
        Ok(spans) if !spans.is_empty() => Ok(spans),
        Ok(_) => Err(NO_SELECTION.to_string()),
        Err(e) => Err(e.to_string()),
    };
    let spans = match rejection {
        Ok(spans) => spans,
        Err(message) => {
            annotator.comment_text = comment;
            let page = ui::render_annotation(&AnnotationView {
                user_id: &annotator.user_id,
                index,
                total,
                display_text: &unit.text,
                comment: &annotator.comment_text,
                error: Some(&message),
            });
            return Ok((StatusCode::BAD_REQUEST, Html(page)).into_response());
        }
    };

    let record = build_record_now(
        &annotator.user_id,
        index,
        raw,
        unit.unit_id,
        &spans,
        &comment,
    );
    tracing::debug!(
        user_id = %annotator.user_id,
        text_index = index,
        unit_id = ?unit.unit_id,
        selections = ?group_by_label(&spans),
        "Annotation accepted"
    );
    let _ = annotator.submit(record, &state.writer);

    Ok(Redirect::to("/").into_response())
}

/// POST /logout
///
/// Flushes the buffer, drops the session and expires the cookie.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(id) = session_id(&headers) {
        if let Some(session) = state.sessions.remove(&id).await {
            if let Some(annotator) = session.annotator.as_ref() {
                tracing::info!(
                    user_id = %annotator.user_id,
                    phase = ?session.phase(),
                    buffered = annotator.annotations.len(),
                    "Annotator logged out"
                );
            }
            let _ = session.close(&state.writer);
        }
    }
    ([(header::SET_COOKIE, expired_cookie())], Redirect::to("/")).into_response()
}
