//! POST /dir and POST /folders: output directory settings.

use std::path::{Path, PathBuf};

use axum::{extract::State, routing::post, Form, Json, Router};
use mediabox_core::config::DirUpdate;
use mediabox_core::folders;
use mediabox_core::format_spec::OutputType;
use serde::Deserialize;

use super::AppState;

/// Code for a `/dir` request naming neither `video_dir` nor `audio_dir`.
const CODE_UNKNOWN_DIR_ID: u16 = 205;

#[derive(Debug, Deserialize)]
pub struct DirForm {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub dir: String,
}

#[derive(Debug, Deserialize)]
pub struct FoldersForm {
    #[serde(default)]
    pub cur_dir: String,
}

fn output_for(id: &str) -> Option<OutputType> {
    match id.trim() {
        "video_dir" => Some(OutputType::Video),
        "audio_dir" => Some(OutputType::Audio),
        _ => None,
    }
}

async fn set_dir(State(state): State<AppState>, Form(form): Form<DirForm>) -> Json<DirUpdate> {
    let Some(output) = output_for(&form.id) else {
        tracing::warn!(id = %form.id, "unknown directory setting");
        return Json(DirUpdate {
            code: CODE_UNKNOWN_DIR_ID,
            dir: PathBuf::from(form.dir),
        });
    };
    let update = state.store().update_dir(output, Path::new(form.dir.trim()));
    Json(update)
}

async fn list_folders(Form(form): Form<FoldersForm>) -> Json<Vec<String>> {
    let cur = form.cur_dir.trim();
    let cur = if cur.is_empty() {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"))
    } else {
        PathBuf::from(cur)
    };
    let list = tokio::task::spawn_blocking(move || folders::subfolders(&cur))
        .await
        .unwrap_or_default();
    Json(
        list.iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect(),
    )
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dir", post(set_dir))
        .route("/folders", post(list_folders))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn stores_valid_directory() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("media");
        std::fs::create_dir(&media).unwrap();
        let state = state(dir.path(), missing_worker());

        let body = format!("id=video_dir&dir={}", media.display());
        let json = json(post_form(state.clone(), "/dir", &body).await).await;
        assert_eq!(json["code"], 200);
        assert_eq!(json["dir"], media.display().to_string());
        assert_eq!(state.store().output_dir(OutputType::Video), media);
    }

    #[tokio::test]
    async fn invalid_directory_keeps_previous() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), missing_worker());
        let json = json(post_form(state, "/dir", "id=audio_dir&dir=/nonexistent/x").await).await;
        assert_eq!(json["code"], 201);
        assert_eq!(json["dir"], dir.path().display().to_string());
    }

    #[tokio::test]
    async fn unknown_setting_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let json = json(post_form(state(dir.path(), missing_worker()), "/dir", "id=ebook_dir&dir=/").await).await;
        assert_eq!(json["code"], 205);
    }

    #[tokio::test]
    async fn folders_start_with_current_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("clips")).unwrap();
        let body = format!("cur_dir={}", dir.path().display());
        let json = json(post_form(state(dir.path(), missing_worker()), "/folders", &body).await).await;
        let list = json.as_array().unwrap();
        assert_eq!(list[0], dir.path().display().to_string());
        assert_eq!(
            list.last().unwrap(),
            &dir.path().join("clips").display().to_string()
        );
    }
}
