use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Largest accepted recording body
pub const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let blobs = ServeDir::new(state.blobs.root());

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Interview definitions and candidates
        .route("/interviews", post(handlers::create_interview))
        .route("/interviews/:interview_id", get(handlers::get_interview))
        .route(
            "/interviews/:interview_id/candidates",
            post(handlers::register_candidate),
        )
        .route(
            "/interviews/:interview_id/candidates/:candidate_id",
            get(handlers::get_candidate),
        )
        // Recordings
        .route(
            "/interviews/:interview_id/candidates/:candidate_id/recordings",
            get(handlers::list_recordings).post(handlers::save_recording),
        )
        // Blob transfer
        .route(
            "/uploads/:interview_id/:candidate_id/:question_index",
            put(handlers::upload_recording).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .nest_service("/blobs", blobs)
        // Failure log sink
        .route("/upload-failures", post(handlers::log_upload_failure))
        // Browsers upload directly from the interview page
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
