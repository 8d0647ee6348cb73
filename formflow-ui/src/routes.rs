//! HTTP route handlers for the form API.
//!
//! Handlers are thin: they look up the session, call one session operation
//! and return the resulting view. Validation failures are part of the view,
//! never an HTTP error.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post, put};
use formflow::core::schema::FormSchema;
use formflow::core::session::{FormSession, SessionError, SessionView};
use formflow::core::types::{Advance, SubmitOutcome};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::state::{AppState, ChangeEvent};

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/forms", get(list_forms))
        .route("/forms/{form_id}", get(get_form))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/fields/{name}", put(update_field))
        .route("/sessions/{id}/fields/{name}/validate", post(validate_field))
        .route("/sessions/{id}/advance", post(advance))
        .route("/sessions/{id}/retreat", post(retreat))
        .route("/sessions/{id}/submit", post(submit))
        .route("/sessions/{id}/reset", post(reset))
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct FormSummary {
    id: String,
    title: String,
    steps: Vec<String>,
}

/// GET /api/forms - list catalog forms.
async fn list_forms(State(state): State<AppState>) -> Json<Vec<FormSummary>> {
    let forms = state
        .catalog
        .iter()
        .map(|form| FormSummary {
            id: form.id.clone(),
            title: form.title.clone(),
            steps: form.steps.iter().map(|step| step.title.clone()).collect(),
        })
        .collect();
    Json(forms)
}

/// GET /api/forms/:form_id - full schema of one form.
async fn get_form(
    State(state): State<AppState>,
    Path(form_id): Path<String>,
) -> Result<Json<FormSchema>, StatusCode> {
    state
        .catalog
        .get(&form_id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

#[derive(Debug, Deserialize)]
struct CreateSession {
    form: String,
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    id: String,
    session: SessionView,
}

/// POST /api/sessions - start a session of a form.
async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSession>,
) -> Result<(StatusCode, Json<SessionResponse>), StatusCode> {
    let (id, session) = state
        .create_session(&body.form)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    debug!(session_id = %id, form = %body.form, "session created");
    Ok((StatusCode::CREATED, Json(SessionResponse { id, session })))
}

/// GET /api/sessions/:id - current view of a session.
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, StatusCode> {
    let handle = state.session(&id).await.ok_or(StatusCode::NOT_FOUND)?;
    let session = handle.lock().await;
    Ok(Json(session.view()))
}

/// DELETE /api/sessions/:id - discard a session (user navigated away).
async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    state
        .sessions
        .lock()
        .await
        .remove(&id)
        .ok_or(StatusCode::NOT_FOUND)?;
    state.notify(ChangeEvent::SessionClosed { session_id: id });
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct FieldInput {
    value: String,
}

/// Operation result plus the session view after it.
#[derive(Debug, Serialize)]
struct ActionResponse<T> {
    result: T,
    session: SessionView,
}

/// PUT /api/sessions/:id/fields/:name - store a keystroke's value.
async fn update_field(
    State(state): State<AppState>,
    Path((id, name)): Path<(String, String)>,
    Json(input): Json<FieldInput>,
) -> Result<Json<SessionView>, StatusCode> {
    let ((), view) = with_session(&state, &id, |session| {
        session
            .update_field(&name, &input.value)
            .map_err(session_error_status)
    })
    .await?;
    state.notify(ChangeEvent::FieldUpdated {
        session_id: id,
        field: name,
    });
    Ok(Json(view))
}

/// POST /api/sessions/:id/fields/:name/validate - blur validation.
async fn validate_field(
    State(state): State<AppState>,
    Path((id, name)): Path<(String, String)>,
) -> Result<Json<ActionResponse<Option<String>>>, StatusCode> {
    let (result, session) = with_session(&state, &id, |session| {
        session.validate_field(&name).map_err(session_error_status)
    })
    .await?;
    Ok(Json(ActionResponse { result, session }))
}

/// POST /api/sessions/:id/advance - move to the next step if valid.
async fn advance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse<Advance>>, StatusCode> {
    let (result, session) = with_session(&state, &id, |session| Ok(session.advance())).await?;
    if let Advance::Moved { to } | Advance::Rewound { to } = result {
        state.notify(ChangeEvent::StepChanged {
            session_id: id,
            step: to,
        });
    }
    Ok(Json(ActionResponse { result, session }))
}

/// POST /api/sessions/:id/retreat - go back one step.
async fn retreat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse<usize>>, StatusCode> {
    let ((before, after), session) = with_session(&state, &id, |session| {
        let before = session.current_step();
        Ok((before, session.retreat()))
    })
    .await?;
    if before != after {
        state.notify(ChangeEvent::StepChanged {
            session_id: id,
            step: after,
        });
    }
    Ok(Json(ActionResponse {
        result: after,
        session,
    }))
}

/// POST /api/sessions/:id/submit - validate everything and record.
///
/// The recorder may block on file I/O, so it runs on the blocking pool
/// while only this session stays locked.
async fn submit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse<SubmitOutcome>>, StatusCode> {
    let handle = state.session(&id).await.ok_or(StatusCode::NOT_FOUND)?;
    let mut guard = handle.lock_owned().await;
    let recorder = Arc::clone(&state.recorder);
    let (result, session) = tokio::task::spawn_blocking(move || {
        let result = guard.submit(recorder.as_ref());
        (result, guard.view())
    })
    .await
    .map_err(|err| {
        warn!(session_id = %id, error = %err, "submit task failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    if matches!(result, SubmitOutcome::Submitted { .. }) {
        state.notify(ChangeEvent::Submitted { session_id: id });
    }
    Ok(Json(ActionResponse { result, session }))
}

/// POST /api/sessions/:id/reset - replace with a fresh session of the same form.
async fn reset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, StatusCode> {
    let ((), view) = with_session(&state, &id, |session| {
        *session = session.reset();
        Ok(())
    })
    .await?;
    state.notify(ChangeEvent::SessionReset { session_id: id });
    Ok(Json(view))
}

/// Run `op` on session `id` under that session's lock and return its view.
async fn with_session<T>(
    state: &AppState,
    id: &str,
    op: impl FnOnce(&mut FormSession) -> Result<T, StatusCode>,
) -> Result<(T, SessionView), StatusCode> {
    let handle = state.session(id).await.ok_or(StatusCode::NOT_FOUND)?;
    let mut session = handle.lock().await;
    let result = op(&mut *session)?;
    Ok((result, session.view()))
}

fn session_error_status(err: SessionError) -> StatusCode {
    debug!(error = %err, "session rejected request");
    match err {
        SessionError::UnknownField { .. } => StatusCode::NOT_FOUND,
        SessionError::AlreadySubmitted { .. } => StatusCode::CONFLICT,
    }
}
