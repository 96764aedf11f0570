//! POST /task: the single entry point for job actions.

use std::path::PathBuf;

use axum::{extract::State, routing::post, Form, Json, Router};
use mediabox_core::controller::TaskAction;
use mediabox_core::error::TaskResponse;
use mediabox_core::format_spec::OutputType;
use mediabox_core::request::DownloadRequest;
use serde::Deserialize;

use super::AppState;

/// Task form. Accepts both the camelCase names and the older aliases.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskForm {
    #[serde(default, alias = "url")]
    pub source_id: String,
    #[serde(default)]
    pub action: String,
    #[serde(default, alias = "output_type")]
    pub output_type: String,
    #[serde(default)]
    pub resolution: String,
    #[serde(default)]
    pub quality: String,
    #[serde(default, alias = "playlist_items")]
    pub item_range: String,
}

impl AppState {
    /// Resolve output directory and format selector for a start action.
    fn start_request(&self, form: &TaskForm) -> DownloadRequest {
        let output: OutputType = form.output_type.parse().unwrap_or_default();
        let mut store = self.store();
        let dir = store.output_dir(output);
        let format = store
            .config()
            .formats
            .build(output, &form.resolution, &form.quality);
        DownloadRequest::new(form.source_id.trim(), dir)
            .with_format(format)
            .with_item_range(form.item_range.trim())
    }
}

async fn task(State(state): State<AppState>, Form(form): Form<TaskForm>) -> Json<TaskResponse> {
    let action: TaskAction = match form.action.parse() {
        Ok(action) => action,
        Err(e) => {
            tracing::warn!(action = %form.action, "rejected task");
            return Json(e.into());
        }
    };
    let request = match action {
        TaskAction::Start => state.start_request(&form),
        _ => DownloadRequest::new(form.source_id.trim(), PathBuf::new()),
    };
    Json(state.controller.dispatch(action, request).await)
}

pub fn router() -> Router<AppState> {
    Router::new().route("/task", post(task))
}
