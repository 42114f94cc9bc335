use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Candidate, CandidateId, Preferences, Reaction};
use crate::services::{
    affinity, AffinityState, FeedbackController, FeedbackOutcome, Notice, PagingPolicy, Phase,
    QueryOutcome, ReactOutcome, Session,
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct ReactRequest {
    pub candidate_id: CandidateId,
    pub reaction: Reaction,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackBody {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
}

/// A displayed candidate with the user's reaction and its current affinity
#[derive(Debug, Serialize)]
pub struct CandidateResponse {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub reaction: Reaction,
    pub affinity_score: usize,
}

#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub page: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub total: usize,
    pub policy: PagingPolicy,
    pub items: Vec<CandidateResponse>,
}

impl From<&FeedbackController> for PageResponse {
    fn from(controller: &FeedbackController) -> Self {
        let pager = controller.pager();
        let items = controller
            .visible()
            .iter()
            .map(|candidate| CandidateResponse {
                candidate: candidate.clone(),
                reaction: controller.reaction(&candidate.id),
                affinity_score: affinity::score(candidate, controller.affinity()),
            })
            .collect();

        Self {
            page: pager.current(),
            page_count: pager.page_count(controller.results().len()),
            page_size: pager.page_size(),
            total: controller.results().len(),
            policy: pager.policy(),
            items,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub phase: Phase,
    pub preferences: Option<Preferences>,
    pub affinity: AffinityState,
    pub excluded: usize,
    pub notice: Option<Notice>,
    pub page: PageResponse,
}

impl SessionSnapshot {
    async fn of(session: &Session) -> Self {
        let session_id = session.id();
        session
            .inspect(|controller| Self {
                session_id,
                phase: controller.phase(),
                preferences: controller.preferences().cloned(),
                affinity: controller.affinity().clone(),
                excluded: controller.results().excluded_count(),
                notice: controller.notice().cloned(),
                page: PageResponse::from(controller),
            })
            .await
    }
}

/// Outcome of a session action plus the refreshed view
#[derive(Debug, Serialize)]
pub struct ActionResponse<T> {
    pub result: T,
    pub phase: Phase,
    pub notice: Option<Notice>,
    pub page: PageResponse,
}

impl<T> ActionResponse<T> {
    async fn of(result: T, session: &Session) -> Self {
        let (phase, notice, page) = session
            .inspect(|controller| {
                (
                    controller.phase(),
                    controller.notice().cloned(),
                    PageResponse::from(controller),
                )
            })
            .await;

        Self {
            result,
            phase,
            notice,
            page,
        }
    }
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Open a new browsing session
pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionCreated>) {
    let session = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id: session.id(),
        }),
    )
}

/// Full view of a session
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<SessionSnapshot>> {
    let session = state.sessions.get(session_id).await?;
    Ok(Json(SessionSnapshot::of(&session).await))
}

/// Discard a session
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.sessions.remove(session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Run a new search
pub async fn submit_query(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(preferences): Json<Preferences>,
) -> AppResult<Json<ActionResponse<QueryOutcome>>> {
    let session = state.sessions.get(session_id).await?;
    let outcome = session.submit_query(preferences).await?;
    Ok(Json(ActionResponse::of(outcome, &session).await))
}

/// Like, dislike or mark a candidate neutral
pub async fn react(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ReactRequest>,
) -> AppResult<Json<ActionResponse<ReactOutcome>>> {
    let session = state.sessions.get(session_id).await?;
    let outcome = session.react(&request.candidate_id, request.reaction).await?;
    Ok(Json(ActionResponse::of(outcome, &session).await))
}

/// Refine the current results with free-text feedback
pub async fn submit_feedback(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(body): Json<FeedbackBody>,
) -> AppResult<Json<ActionResponse<FeedbackOutcome>>> {
    let session = state.sessions.get(session_id).await?;
    let outcome = session.submit_feedback(&body.text).await?;
    Ok(Json(ActionResponse::of(outcome, &session).await))
}

/// Start over: clear results, affinity and reactions
pub async fn reset(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<SessionSnapshot>> {
    let session = state.sessions.get(session_id).await?;
    session.reset().await;
    Ok(Json(SessionSnapshot::of(&session).await))
}

/// Current page of results
pub async fn get_page(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<PageResponse>> {
    let session = state.sessions.get(session_id).await?;
    Ok(Json(session.inspect(|c| PageResponse::from(c)).await))
}

pub async fn next_page(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<PageResponse>> {
    let session = state.sessions.get(session_id).await?;
    session.next_page().await;
    Ok(Json(session.inspect(|c| PageResponse::from(c)).await))
}

pub async fn prev_page(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<PageResponse>> {
    let session = state.sessions.get(session_id).await?;
    session.prev_page().await;
    Ok(Json(session.inspect(|c| PageResponse::from(c)).await))
}
