use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use super::session::{session_cookie, SharedSession};
use super::templates;
use super::{attachment_name, AppState};
use crate::workflow::{Focus, Phase, WorkflowError};

const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(start))
        .route("/entry", get(entry_page).post(entry_action))
        .route("/download", get(download))
        .route("/exit", get(exit))
        .route("/healthz", get(health))
        .route("/api/focus", get(api_focus))
}

// ========== HTML Routes ==========

async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(session) = state.sessions.by_cookie(&headers) {
        if session.lock().await.phase() != Phase::AwaitingSubject {
            return Redirect::to("/entry").into_response();
        }
    }
    Html(templates::render_index(None).into_string()).into_response()
}

#[derive(Debug, Deserialize)]
pub struct StartForm {
    nick: String,
}

async fn start(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<StartForm>,
) -> Response {
    if let Some(session) = state.sessions.by_cookie(&headers) {
        if session.lock().await.phase() != Phase::AwaitingSubject {
            return Redirect::to("/entry").into_response();
        }
    }

    if form.nick.trim().is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(templates::render_index(Some("Nickname cannot be empty.")).into_string()),
        )
            .into_response();
    }

    let mut session = match state.new_session(&form.nick) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create curation session: {e:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session")
                .into_response();
        }
    };

    if let Err(e) = session.begin(&form.nick).await {
        warn!(nick = %form.nick, "Failed to start session: {e}");
        let message = e.to_string();
        return (
            StatusCode::BAD_GATEWAY,
            Html(templates::render_index(Some(&message)).into_string()),
        )
            .into_response();
    }

    let token = state.sessions.insert(session);
    info!(nick = %form.nick, sessions = state.sessions.len(), "Session created");

    (
        [(header::SET_COOKIE, session_cookie(&token))],
        Redirect::to("/entry"),
    )
        .into_response()
}

async fn entry_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(session) = state.sessions.by_cookie(&headers) else {
        return Redirect::to("/").into_response();
    };
    render_focus(&session, None).await
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Keep,
    Discard,
    Finish,
    Retry,
}

#[derive(Debug, Deserialize)]
pub struct ActionForm {
    action: Action,
}

async fn entry_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ActionForm>,
) -> Response {
    let Some(session) = state.sessions.by_cookie(&headers) else {
        return Redirect::to("/").into_response();
    };

    let result = {
        let mut guard = session.lock().await;
        match form.action {
            Action::Keep => guard.keep().await.map(|_| ()),
            Action::Discard => guard.discard().await.map(|_| ()),
            Action::Retry => guard.retry_fetch().await.map(|_| ()),
            Action::Finish => guard.finish().map(|_| ()),
        }
    };

    match (form.action, result) {
        (_, Ok(()) | Err(WorkflowError::NoFocus | WorkflowError::InvalidState { .. })) => {
            Redirect::to("/entry").into_response()
        }
        (Action::Finish, Err(e)) => {
            error!("Failed to finish session: {e}");
            let guard = session.lock().await;
            let subject = guard.subject().unwrap_or_default();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(templates::render_finish_failed(subject, &e.to_string()).into_string()),
            )
                .into_response()
        }
        (action, Err(e)) => {
            warn!(?action, "Entry action failed: {e}");
            render_focus(&session, Some(&e.to_string())).await
        }
    }
}

/// Render whatever the session currently focuses, with an optional error.
async fn render_focus(session: &SharedSession, error: Option<&str>) -> Response {
    let guard = session.lock().await;
    let subject = guard.subject().unwrap_or_default();
    let kept = guard.document().entry_count();

    let focus = match guard.phase() {
        Phase::AwaitingSubject => return Redirect::to("/").into_response(),
        Phase::Finished => {
            let page = templates::render_finished(subject, kept);
            return Html(page.into_string()).into_response();
        }
        Phase::Reviewing => guard.focus(),
    };

    let page = match focus {
        Ok(Focus::Entry(entry)) => templates::render_entry(subject, &entry, kept, error),
        Ok(Focus::Exhausted) => templates::render_exhausted(subject, kept),
        Ok(Focus::Stalled) => templates::render_stalled(subject, kept, error),
        Err(e) => {
            error!("Failed to read focus: {e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Session error").into_response();
        }
    };
    Html(page.into_string()).into_response()
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Docx,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    #[serde(default)]
    format: ExportFormat,
}

async fn download(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DownloadQuery>,
) -> Response {
    let Some(session) = state.sessions.by_cookie(&headers) else {
        return Redirect::to("/").into_response();
    };

    let guard = session.lock().await;
    let path = match guard.delivery_path() {
        Ok(path) => path.to_path_buf(),
        Err(_) => return Redirect::to("/").into_response(),
    };
    let subject = guard.subject().unwrap_or_default().to_string();
    let name = attachment_name(&subject);

    let (content_type, filename, bytes) = match query.format {
        ExportFormat::Docx => {
            drop(guard);
            match tokio::fs::read(&path).await {
                Ok(bytes) => (DOCX_CONTENT_TYPE, format!("{name}.docx"), bytes),
                Err(e) => {
                    error!(path = %path.display(), "Failed to read archive document: {e}");
                    return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read document")
                        .into_response();
                }
            }
        }
        ExportFormat::Json => match guard.document().to_json(&subject) {
            Ok(bytes) => ("application/json", format!("{name}.json"), bytes),
            Err(e) => {
                error!("Failed to export entries as JSON: {e}");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to export entries")
                    .into_response();
            }
        },
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&filename)),
        ],
        bytes,
    )
        .into_response()
}

async fn exit(State(state): State<AppState>) -> Response {
    info!("Exit requested from the web UI");
    state.shutdown.cancel();
    Html(templates::render_goodbye().into_string()).into_response()
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

// ========== API Routes ==========

async fn api_focus(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(session) = state.sessions.by_cookie(&headers) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no session" })),
        )
            .into_response();
    };

    let guard = session.lock().await;
    let collector = guard.collector();
    let (entry, state_label) = match guard.focus() {
        Ok(Focus::Entry(entry)) => (Some(entry), "entry"),
        Ok(Focus::Exhausted) => (None, "exhausted"),
        Ok(Focus::Stalled) => (None, "stalled"),
        Err(_) => (None, "inactive"),
    };

    Json(json!({
        "phase": guard.phase(),
        "focus": state_label,
        "entry": entry,
        "subject": guard.subject(),
        "buffered": collector.len(),
        "next_page": collector.next_page(),
        "kept": guard.document().entry_count(),
    }))
    .into_response()
}

/// `Content-Disposition` offering `filename` as a download.
///
/// Non-ASCII names are garbled by browsers in the plain `filename`
/// parameter, so it carries an ASCII fallback and the real name goes in the
/// RFC 5987 `filename*` parameter.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    let encoded: String = url::form_urlencoded::byte_serialize(filename.as_bytes()).collect();
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}
