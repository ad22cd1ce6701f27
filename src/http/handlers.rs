use super::blobs::{extension_for, is_safe_segment};
use super::state::AppState;
use crate::store::{FailureSink, RecordingRecord, RecordingStore, StoreError, UploadFailure};
use crate::upload::UploadResponse;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateInterviewRequest {
    pub job_title: String,
    pub questions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterCandidateRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn store_error(e: StoreError) -> Response {
    let status = match &e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Invalid(_) => StatusCode::BAD_REQUEST,
        StoreError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    error_response(status, e.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /interviews
/// Create an interview definition
pub async fn create_interview(
    State(state): State<AppState>,
    Json(req): Json<CreateInterviewRequest>,
) -> impl IntoResponse {
    match state.store.create_interview(req.job_title, req.questions).await {
        Ok(interview) => (StatusCode::CREATED, Json(interview)).into_response(),
        Err(e) => store_error(e),
    }
}

/// GET /interviews/:interview_id
pub async fn get_interview(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_interview(&interview_id).await {
        Ok(interview) => (StatusCode::OK, Json(interview)).into_response(),
        Err(e) => store_error(e),
    }
}

/// POST /interviews/:interview_id/candidates
/// Register a candidate; their question order is fixed here
pub async fn register_candidate(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
    Json(req): Json<RegisterCandidateRequest>,
) -> impl IntoResponse {
    match state
        .store
        .register_candidate(&interview_id, req.name, req.email)
        .await
    {
        Ok(candidate) => (StatusCode::CREATED, Json(candidate)).into_response(),
        Err(e) => store_error(e),
    }
}

/// GET /interviews/:interview_id/candidates/:candidate_id
pub async fn get_candidate(
    State(state): State<AppState>,
    Path((interview_id, candidate_id)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.store.get_candidate(&interview_id, &candidate_id).await {
        Ok(candidate) => (StatusCode::OK, Json(candidate)).into_response(),
        Err(e) => store_error(e),
    }
}

/// GET /interviews/:interview_id/candidates/:candidate_id/recordings
pub async fn list_recordings(
    State(state): State<AppState>,
    Path((interview_id, candidate_id)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.store.get_recordings(&interview_id, &candidate_id).await {
        Ok(recordings) => (StatusCode::OK, Json(recordings)).into_response(),
        Err(e) => store_error(e),
    }
}

/// POST /interviews/:interview_id/candidates/:candidate_id/recordings
/// Save (or replace) the recording of one question
pub async fn save_recording(
    State(state): State<AppState>,
    Path((interview_id, candidate_id)): Path<(String, String)>,
    Json(record): Json<RecordingRecord>,
) -> impl IntoResponse {
    match state
        .store
        .save_recording(&interview_id, &candidate_id, record)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => store_error(e),
    }
}

/// PUT /uploads/:interview_id/:candidate_id/:question_index
/// Blob transfer endpoint: store the raw recording and return its URL
pub async fn upload_recording(
    State(state): State<AppState>,
    Path((interview_id, candidate_id, question_index)): Path<(String, String, usize)>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if !is_safe_segment(&interview_id) || !is_safe_segment(&candidate_id) {
        return error_response(StatusCode::BAD_REQUEST, "invalid interview or candidate id");
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let Some(extension) = extension_for(content_type) else {
        warn!("Rejected upload with content type {:?}", content_type);
        return error_response(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            format!("unsupported content type {:?}", content_type),
        );
    };

    if body.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "empty recording");
    }

    let interview = match state.store.get_interview(&interview_id).await {
        Ok(interview) => interview,
        Err(e) => return store_error(e),
    };
    if let Err(e) = state.store.get_candidate(&interview_id, &candidate_id).await {
        return store_error(e);
    }
    if question_index >= interview.questions.len() {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!(
                "question {} out of range ({} questions)",
                question_index,
                interview.questions.len()
            ),
        );
    }

    match state
        .blobs
        .store(&interview_id, &candidate_id, question_index, extension, &body)
        .await
    {
        Ok(url) => {
            info!(
                "Received recording for {}/{} question {} ({} bytes)",
                interview_id,
                candidate_id,
                question_index,
                body.len()
            );
            (StatusCode::OK, Json(UploadResponse { url })).into_response()
        }
        Err(e) => {
            error!("Failed to store recording: {:#}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to store recording")
        }
    }
}

/// POST /upload-failures
/// Failure-logging sink; always accepts
pub async fn log_upload_failure(
    State(state): State<AppState>,
    Json(failure): Json<UploadFailure>,
) -> impl IntoResponse {
    if let Err(e) = state.store.log_upload_failure(failure).await {
        error!("Failed to record upload failure: {}", e);
    }
    StatusCode::ACCEPTED
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
