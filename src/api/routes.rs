//! REST endpoints for the quiz front end.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use super::state::AppState;
use crate::error::{Error, QuizError, SubmissionError};
use crate::estimator::{SavingsEstimate, calculate_savings};
use crate::leads::{ContactDetails, ProgressRecord, QuizEvent};
use crate::quiz::{
    AUTO_ADVANCE_DELAY_MS, Catalog, CursorMove, QuizSession, SessionSummary, StepView,
    session::Selection,
};

/// Build the router. CORS is permissive since the quiz UI lives on another origin.
pub fn quiz_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/catalog", get(get_catalog))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session))
        .route("/api/sessions/{id}/answers", post(answer))
        .route("/api/sessions/{id}/next", post(next_step))
        .route("/api/sessions/{id}/back", post(previous_step))
        .route("/api/sessions/{id}/estimate", get(get_estimate))
        .route("/api/sessions/{id}/lead", post(submit_lead))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Views ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SessionView {
    #[serde(flatten)]
    summary: SessionSummary,
    step: StepView,
}

impl SessionView {
    fn of(catalog: &Catalog, session: &QuizSession) -> Self {
        Self {
            summary: session.summary(catalog),
            step: StepView::render(&session.current_step(catalog), &session.answers),
        }
    }
}

#[derive(Debug, Serialize)]
struct AnswerView {
    selection: Selection,
    #[serde(skip_serializing_if = "Option::is_none")]
    moved: Option<CursorMove>,
    /// Delay the client shows the selection before rendering the next step.
    #[serde(skip_serializing_if = "Option::is_none")]
    auto_advance_ms: Option<u64>,
    session: SessionView,
}

#[derive(Debug, Serialize)]
struct MoveView {
    moved: CursorMove,
    session: SessionView,
}

#[derive(Debug, Deserialize)]
struct AnswerRequest {
    question_id: String,
    value: String,
}

// ── Errors ──────────────────────────────────────────────────────────────

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Quiz(QuizError::SessionNotFound { .. }) => StatusCode::NOT_FOUND,
            Error::Quiz(QuizError::UnknownQuestion { .. } | QuizError::UnknownOption { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Error::Quiz(_) => StatusCode::CONFLICT,
            Error::Submission(SubmissionError::InvalidContact(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Error::Submission(e) if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            Error::Submission(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_) | Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// ── Background work ─────────────────────────────────────────────────────

fn track(state: &AppState, event: QuizEvent) {
    let events = state.events.clone();
    tokio::spawn(async move { events.track(event).await });
}

/// Store progress without making the user wait on it.
fn record_progress(state: &AppState, record: ProgressRecord) {
    let leads = state.leads.clone();
    tokio::spawn(async move {
        if let Err(e) = leads.upsert(&record).await {
            warn!(
                session_id = %record.session_id,
                sink = leads.name(),
                error = %e,
                "Failed to record progress"
            );
        }
    });
}

fn snapshot(state: &AppState, session: &QuizSession) -> ProgressRecord {
    ProgressRecord::from_summary(&session.summary(&state.catalog), &session.answers)
}

fn on_finished(state: &AppState, session: &QuizSession) {
    let estimate = calculate_savings(&session.answers);
    track(
        state,
        QuizEvent::QuizCompleted {
            session_id: session.id.clone(),
            total_min: estimate.total_min,
            total_max: estimate.total_max,
        },
    );
}

// ── Handlers ────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "bill-relief"
    }))
}

async fn get_catalog(State(state): State<AppState>) -> Json<Catalog> {
    Json(Catalog::clone(&state.catalog))
}

async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let session = QuizSession::new(state.ids.next_id());
    let view = SessionView::of(&state.catalog, &session);

    track(
        &state,
        QuizEvent::PageView {
            session_id: session.id.clone(),
            page: "quiz".into(),
        },
    );
    record_progress(&state, snapshot(&state, &session));
    state.sessions.insert(session).await;

    (StatusCode::CREATED, Json(view))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, Error> {
    state.ensure_session(&id).await?;
    let session = state.sessions.get(&id).await?;
    Ok(Json(SessionView::of(&state.catalog, &session)))
}

async fn answer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AnswerView>, Error> {
    state.ensure_session(&id).await?;
    let catalog = state.catalog.clone();
    let (response, session) = state
        .sessions
        .update(&id, |s| s.respond(&catalog, &req.question_id, &req.value))
        .await?;

    track(
        &state,
        QuizEvent::QuizAnswer {
            session_id: id.clone(),
            question_id: req.question_id.clone(),
            answer: response.selection.answer.joined(),
        },
    );
    if response.moved == Some(CursorMove::Finished) {
        on_finished(&state, &session);
    }
    record_progress(&state, snapshot(&state, &session));

    let auto_advance_ms = response
        .selection
        .auto_advance
        .then_some(AUTO_ADVANCE_DELAY_MS);
    Ok(Json(AnswerView {
        selection: response.selection,
        moved: response.moved,
        auto_advance_ms,
        session: SessionView::of(&state.catalog, &session),
    }))
}

async fn next_step(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MoveView>, Error> {
    let catalog = state.catalog.clone();
    state.ensure_session(&id).await?;
    let (moved, session) = state.sessions.update(&id, |s| s.advance(&catalog)).await?;

    if moved == CursorMove::Finished {
        on_finished(&state, &session);
    }
    record_progress(&state, snapshot(&state, &session));

    Ok(Json(MoveView {
        moved,
        session: SessionView::of(&state.catalog, &session),
    }))
}

async fn previous_step(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MoveView>, Error> {
    let catalog = state.catalog.clone();
    state.ensure_session(&id).await?;
    let (moved, session) = state.sessions.update(&id, |s| s.back(&catalog)).await?;

    if moved == CursorMove::Exited {
        let mut record = snapshot(&state, &session);
        if let Some(step) = record.current_question.clone() {
            record = record.dropped_off_at(&step);
        }
        info!(session_id = %id, "User left the quiz from the first step");
        record_progress(&state, record);
    }

    Ok(Json(MoveView {
        moved,
        session: SessionView::of(&state.catalog, &session),
    }))
}

async fn get_estimate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SavingsEstimate>, Error> {
    state.ensure_session(&id).await?;
    let session = state.sessions.get(&id).await?;
    Ok(Json(calculate_savings(&session.answers)))
}

/// Attach contact details to the session row.
///
/// The estimate is returned whether or not the sink accepted the lead.
async fn submit_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(contact): Json<ContactDetails>,
) -> Result<Response, Error> {
    state.ensure_session(&id).await?;
    let session = state.sessions.get(&id).await?;
    let contact = contact.normalized()?;
    let estimate = calculate_savings(&session.answers);
    let record = snapshot(&state, &session).with_lead(contact, estimate.clone());

    match state.leads.upsert(&record).await {
        Ok(()) => {
            info!(session_id = %id, "Lead captured");
            track(&state, QuizEvent::EmailSubmitted { session_id: id });
            Ok(Json(json!({ "submitted": true, "estimate": estimate })).into_response())
        }
        Err(e) => {
            warn!(session_id = %id, error = %e, "Lead submission failed");
            let status = if e.is_retryable() {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::BAD_GATEWAY
            };
            let body = json!({
                "submitted": false,
                "error": e.to_string(),
                "retryable": e.is_retryable(),
                "estimate": estimate,
            });
            Ok((status, Json(body)).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::api::SessionIdProvider;
    use crate::leads::EventSink;
    use crate::leads::sink::testing::RecordingSink;

    #[derive(Default)]
    struct RecordingEvents(tokio::sync::Mutex<Vec<QuizEvent>>);

    #[async_trait::async_trait]
    impl EventSink for RecordingEvents {
        async fn track(&self, event: QuizEvent) {
            self.0.lock().await.push(event);
        }
    }

    struct FixedId;

    impl SessionIdProvider for FixedId {
        fn next_id(&self) -> String {
            "r-1".into()
        }
    }

    fn app() -> Router {
        quiz_routes(AppState::new(
            Catalog::builtin(),
            Arc::new(RecordingSink::default()),
        ))
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let resp = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["service"], "bill-relief");
    }

    #[tokio::test]
    async fn unknown_session_is_404_with_error_body() {
        let resp = app()
            .oneshot(
                Request::get("/api/sessions/nope/estimate")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = body_json(resp).await;
        assert!(body["error"].as_str().unwrap().ends_with("Session nope not found"));
    }

    #[tokio::test]
    async fn create_session_returns_first_question() {
        let resp = app()
            .oneshot(
                Request::post("/api/sessions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = body_json(resp).await;
        assert_eq!(body["step"]["id"], "situation");
        assert_eq!(body["step"]["progress"]["current"], 1);
    }

    #[tokio::test]
    async fn funnel_events_are_tracked() {
        let events = Arc::new(RecordingEvents::default());
        let app = quiz_routes(
            AppState::new(Catalog::builtin(), Arc::new(RecordingSink::default()))
                .with_events(events.clone())
                .with_ids(Arc::new(FixedId)),
        );

        let resp = app
            .clone()
            .oneshot(Request::post("/api/sessions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body = json!({ "question_id": "situation", "value": "er" }).to_string();
        let resp = app
            .oneshot(
                Request::post("/api/sessions/r-1/answers")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        // Events are delivered from spawned tasks.
        for _ in 0..50 {
            if events.0.lock().await.len() >= 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let tracked = events.0.lock().await;
        assert!(tracked.iter().all(|e| e.session_id() == "r-1"));
        assert!(tracked.iter().any(|e| e.name() == "Page View"));
        assert!(tracked.iter().any(|e| matches!(
            e,
            QuizEvent::QuizAnswer { question_id, answer, .. }
                if question_id == "situation" && answer == "er"
        )));
    }

    #[test]
    fn submission_errors_map_by_retryability() {
        let retryable = Error::Submission(SubmissionError::Timeout {
            sink: "webhook".into(),
            timeout: std::time::Duration::from_secs(1),
        });
        assert_eq!(
            retryable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let rejected = Error::Submission(SubmissionError::Rejected {
            sink: "webhook".into(),
            reason: "bad row".into(),
        });
        assert_eq!(rejected.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
