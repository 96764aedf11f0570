//! HTTP surface: task control, progress polling, format negotiation and
//! output folder settings.
//!
//! Routes:
//! - POST /task - start, stop, stop_all or clear jobs
//! - GET /progress - status of every job
//! - POST /formats - selectable variants of a source
//! - POST /dir - set the video or audio output directory
//! - POST /folders - folder suggestions below a directory
//! - GET /health - liveness

mod formats;
mod output_dirs;
mod progress;
mod task;

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{routing::get, Router};
use mediabox_core::config::ConfigStore;
use mediabox_core::controller::Controller;
use mediabox_core::fetcher::MediaFetcher;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Controller>,
    pub store: Arc<Mutex<ConfigStore>>,
    pub fetcher: Arc<dyn MediaFetcher>,
}

impl AppState {
    pub fn new(
        controller: Arc<Controller>,
        store: ConfigStore,
        fetcher: Arc<dyn MediaFetcher>,
    ) -> Self {
        Self {
            controller,
            store: Arc::new(Mutex::new(store)),
            fetcher,
        }
    }

    /// Config store guard. Never held across an await.
    pub fn store(&self) -> MutexGuard<'_, ConfigStore> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn health() -> &'static str {
    "ok"
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(task::router())
        .merge(progress::router())
        .merge(formats::router())
        .merge(output_dirs::router())
        .route("/health", get(health))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, Response};
    use mediabox_core::fetcher::FetchError;
    use mediabox_core::formats::FormatVariant;
    use mediabox_core::request::DownloadRequest;
    use mediabox_core::worker::{EventStream, WorkerCommand};
    use std::time::Duration;
    use tower::ServiceExt;

    /// Fetcher with a fixed format listing; never downloads.
    pub struct Canned(pub Vec<FormatVariant>);

    impl MediaFetcher for Canned {
        fn fetch(
            &self,
            _request: &DownloadRequest,
            _events: &mut EventStream<'_>,
        ) -> Result<(), FetchError> {
            Ok(())
        }

        fn probe_formats(&self, _source_id: &str) -> Result<Vec<FormatVariant>, FetchError> {
            Ok(self.0.clone())
        }
    }

    /// State with its config in `dir`, both output dirs pointing at `dir`.
    pub fn state(dir: &std::path::Path, command: WorkerCommand) -> AppState {
        let mut store = ConfigStore::open_at(dir.join("config.toml")).unwrap();
        store.update_dir(mediabox_core::format_spec::OutputType::Video, dir);
        store.update_dir(mediabox_core::format_spec::OutputType::Audio, dir);
        AppState::new(
            Arc::new(Controller::new(command, Duration::from_millis(100))),
            store,
            Arc::new(Canned(Vec::new())),
        )
    }

    pub fn missing_worker() -> WorkerCommand {
        WorkerCommand::new("/nonexistent/mediabox-worker", vec![])
    }

    pub async fn post_form(state: AppState, uri: &str, body: &str) -> Response<Body> {
        router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    pub async fn get(state: AppState, uri: &str) -> Response<Body> {
        router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn json(response: Response<Body>) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }
}
