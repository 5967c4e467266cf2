//! Health check endpoint.

use axum::Json;
use serde::Serialize;

use crate::Backend;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
}

/// GET /health — returns system health status and the storage backend in use.
pub async fn check<B: Backend>() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        backend: B::NAME,
    })
}
