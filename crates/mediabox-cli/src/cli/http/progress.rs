//! GET /progress: drain worker events and return every job's status.

use axum::{extract::State, routing::get, Json, Router};
use mediabox_core::aggregator::ProgressSnapshot;

use super::AppState;

async fn progress(State(state): State<AppState>) -> Json<ProgressSnapshot> {
    Json(state.controller.progress().await)
}

pub fn router() -> Router<AppState> {
    Router::new().route("/progress", get(progress))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn empty_registry_is_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let resp = get(state(dir.path(), missing_worker()), "/progress").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json(resp).await, serde_json::json!({}));
    }
}
