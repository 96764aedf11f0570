//! POST /formats: list the variants a client can pick before starting.

use axum::{extract::State, routing::post, Form, Json, Router};
use mediabox_core::formats::{self, FormatList};
use serde::Deserialize;

use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatsForm {
    #[serde(default, alias = "url")]
    pub source_id: String,
}

async fn list_formats(
    State(state): State<AppState>,
    Form(form): Form<FormatsForm>,
) -> Json<FormatList> {
    let fetcher = state.fetcher.clone();
    let source_id = form.source_id.trim().to_string();
    // The probe runs the downloader and blocks until it exits.
    let list = tokio::task::spawn_blocking(move || formats::negotiate(fetcher.as_ref(), &source_id))
        .await
        .unwrap_or_else(|e| {
            tracing::error!("format probe task failed: {}", e);
            FormatList::default()
        });
    Json(list)
}

pub fn router() -> Router<AppState> {
    Router::new().route("/formats", post(list_formats))
}
