use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tokio::sync::Mutex;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::{AppState, SharedSession};
use crate::schemas::session::{
    AnswerRequest, ConfirmRequest, DirectivesResponse, EventsResponse, FinishResponse,
    FullscreenReport, MutationResponse, QuestionRef, SectionSubmitResponse, SignalRequest,
    StartSessionRequest, ViewRequest,
};
use crate::services::definition;
use crate::services::submission_finalize::{deliver, FinalizeMode, FinalizeOutcome};
use crate::services::work_timing;
use crate::session::model::QuestionView;
use crate::session::orchestrator::{SessionOrchestrator, SessionSnapshot, SignalOutcome};
use crate::session::store::SessionStore;
use crate::tasks::scheduler;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(start_session))
        .route("/:session_id", get(get_session))
        .route("/:session_id/sections/:section/questions/:question", get(get_question))
        .route("/:session_id/sections/:section/submit", post(submit_section))
        .route("/:session_id/answers", put(select_answer))
        .route("/:session_id/review", post(mark_for_review))
        .route("/:session_id/view", post(view_section))
        .route("/:session_id/signals", post(record_signal))
        .route("/:session_id/acknowledge", post(acknowledge_warning))
        .route("/:session_id/fullscreen", post(report_fullscreen))
        .route("/:session_id/finish", post(finish_session))
        .route("/:session_id/events", get(drain_events))
}

/// Opens a sitting, or resumes the one recorded in the state store.
async fn start_session(
    State(state): State<AppState>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<SessionSnapshot>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    definition::check_device(&payload.exam, payload.device_class)?;

    let session_id = definition::session_id(&payload.contest_id, &payload.student_id);
    let _starting = state.start_guard(&session_id).await;
    if let Some(live) = state.session(&session_id).await {
        let snapshot = live.lock().await.snapshot();
        return Ok((StatusCode::OK, Json(snapshot)));
    }

    let definitions = state.backend().fetch_sections(&payload.contest_id).await?;
    let plan = work_timing::plan(&payload.exam, &definitions);
    let sections = definition::build_sections(definitions, &plan)?;
    let config = definition::resolve_config(
        &payload.contest_id,
        &payload.student_id,
        &payload.exam,
        &plan,
        state.settings().session(),
    );

    let store = SessionStore::new(state.time_store(), session_id.clone());
    let orchestrator = SessionOrchestrator::start(config, sections, store).await?;
    let (session, registered) =
        state.register_session(&session_id, Arc::new(Mutex::new(orchestrator))).await;

    if !registered {
        let snapshot = session.lock().await.snapshot();
        return Ok((StatusCode::OK, Json(snapshot)));
    }

    scheduler::spawn_session_clock(state.clone(), session.clone());
    let snapshot = session.lock().await.snapshot();
    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn get_session(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = live_session(&state, &session_id).await?;
    let snapshot = session.lock().await.snapshot();
    Ok(Json(snapshot))
}

async fn get_question(
    Path((session_id, section, question)): Path<(String, usize, usize)>,
    State(state): State<AppState>,
) -> Result<Json<QuestionView>, ApiError> {
    let session = live_session(&state, &session_id).await?;
    let view = session.lock().await.question_view(section, question)?;
    Ok(Json(view))
}

async fn select_answer(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let session = live_session(&state, &session_id).await?;
    let outcome = session
        .lock()
        .await
        .select_answer(payload.section, payload.question, &payload.option)
        .await?;
    Ok(Json(MutationResponse { outcome }))
}

async fn mark_for_review(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<QuestionRef>,
) -> Result<Json<MutationResponse>, ApiError> {
    let session = live_session(&state, &session_id).await?;
    let outcome =
        session.lock().await.mark_for_review(payload.section, payload.question).await?;
    Ok(Json(MutationResponse { outcome }))
}

async fn view_section(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<ViewRequest>,
) -> Result<StatusCode, ApiError> {
    let session = live_session(&state, &session_id).await?;
    session.lock().await.view_section(payload.section)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn submit_section(
    Path((session_id, section)): Path<(String, usize)>,
    State(state): State<AppState>,
    payload: Option<Json<ConfirmRequest>>,
) -> Result<Json<SectionSubmitResponse>, ApiError> {
    let confirmed = payload.map(|Json(request)| request.confirmed).unwrap_or(false);
    let session = live_session(&state, &session_id).await?;

    let outcome = session.lock().await.submit_section(section, confirmed).await?;
    deliver_if_due(&state, &session, FinalizeMode::Automatic).await;
    let finish = session.lock().await.finish_status();
    Ok(Json(SectionSubmitResponse { outcome, finish }))
}

async fn record_signal(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<SignalRequest>,
) -> Result<Json<SignalOutcome>, ApiError> {
    let session = live_session(&state, &session_id).await?;

    let outcome = session.lock().await.record_signal(&payload.signal, payload.at_ms).await?;
    if outcome.forced_submission {
        deliver_if_due(&state, &session, FinalizeMode::Automatic).await;
    }
    Ok(Json(outcome))
}

async fn acknowledge_warning(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DirectivesResponse>, ApiError> {
    let session = live_session(&state, &session_id).await?;
    let directives = session.lock().await.acknowledge_warning();
    Ok(Json(DirectivesResponse { directives }))
}

async fn report_fullscreen(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<FullscreenReport>,
) -> Result<StatusCode, ApiError> {
    let session = live_session(&state, &session_id).await?;
    session.lock().await.report_fullscreen(payload.succeeded);
    Ok(StatusCode::NO_CONTENT)
}

/// Finish requested by the candidate. Calling it again after a failed delivery re-posts
/// the frozen payload; while a post is outstanding it reports `in_flight` instead.
async fn finish_session(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    payload: Option<Json<ConfirmRequest>>,
) -> Result<Json<FinishResponse>, ApiError> {
    let confirmed = payload.map(|Json(request)| request.confirmed).unwrap_or(false);
    let session = live_session(&state, &session_id).await?;

    let (outcome, submission_id) = {
        let mut orchestrator = session.lock().await;
        let outcome = orchestrator.finish_session(confirmed).await?;
        (outcome, orchestrator.frozen_payload().map(|payload| payload.submission_id))
    };
    let delivery_error = deliver_if_due(&state, &session, FinalizeMode::UserRequest).await;
    let status = session.lock().await.finish_status();

    Ok(Json(FinishResponse { outcome, status, submission_id, delivery_error }))
}

async fn drain_events(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<EventsResponse>, ApiError> {
    let session = live_session(&state, &session_id).await?;
    let events = session.lock().await.drain_events();
    Ok(Json(EventsResponse { events }))
}

async fn live_session(state: &AppState, session_id: &str) -> Result<SharedSession, ApiError> {
    state
        .session(session_id)
        .await
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))
}

/// Posts the frozen payload when a transition made it due. Returns the delivery failure.
///
/// The post runs on its own task so a dropped request cannot leave the session marked
/// in flight. A delivered session leaves the registry; starting it again restores the
/// submitted state.
async fn deliver_if_due(
    state: &AppState,
    session: &SharedSession,
    mode: FinalizeMode,
) -> Option<String> {
    let task_state = state.clone();
    let task_session = session.clone();
    let delivery = tokio::spawn(async move {
        let outcome = deliver(&task_session, task_state.backend(), mode).await;
        if matches!(outcome, Ok(FinalizeOutcome::Submitted { .. })) {
            let session_id = task_session.lock().await.session_id().to_string();
            task_state.release_session(&session_id).await;
        }
        outcome
    });

    match delivery.await {
        Ok(Ok(_)) => None,
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "Submission delivery failed");
            Some(err.to_string())
        }
        Err(err) => {
            tracing::error!(error = %err, "Submission delivery task aborted");
            Some("Submission delivery was interrupted".to_string())
        }
    }
}
