//! HTTP API: Recording Store, blob transfer endpoint and failure log
//!
//! - POST /interviews - Create an interview
//! - GET /interviews/:id - Interview definition
//! - POST /interviews/:id/candidates - Register a candidate (fixes question order)
//! - GET /interviews/:id/candidates/:cid - Candidate and question order
//! - GET|POST /interviews/:id/candidates/:cid/recordings - List / save recordings
//! - PUT /uploads/:id/:cid/:question_index - Upload a recording
//! - GET /blobs/* - Stored recordings
//! - POST /upload-failures - Log an abandoned upload
//! - GET /health - Health check

mod blobs;
mod handlers;
mod routes;
mod state;

pub use blobs::{extension_for, BlobStorage, ALLOWED_CONTENT_TYPES};
pub use routes::{create_router, MAX_UPLOAD_BYTES};
pub use state::AppState;
