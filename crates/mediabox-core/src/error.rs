//! Task admission and conflict errors, and the code/message pair every task
//! action answers with.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Response code for a successful task action.
pub const CODE_OK: u16 = 200;

/// Why a task action was rejected. None of these mutate the registry.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Invalid output directory: {}", .0.display())]
    InvalidOutputDirectory(PathBuf),

    #[error("Process already running: {0}")]
    AlreadyRunning(String),

    #[error("Completed task: {0}")]
    AlreadyComplete(String),

    #[error("Restart failed: {0}")]
    RestartFailed(String),

    #[error("Could not start worker for {source_id}: {reason}")]
    SpawnFailed { source_id: String, reason: String },

    #[error("Unknown state: {0}")]
    UnknownState(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Unknown task: {0}")]
    UnknownJob(String),

    #[error("Unknown task: no source id given")]
    MissingSource,

    #[error("Task not terminated: {0}")]
    StopFailed(String),
}

impl TaskError {
    pub fn code(&self) -> u16 {
        match self {
            TaskError::InvalidOutputDirectory(_) => 201,
            TaskError::AlreadyRunning(_) => 202,
            TaskError::AlreadyComplete(_) => 203,
            TaskError::RestartFailed(_) | TaskError::SpawnFailed { .. } => 204,
            TaskError::UnknownState(_) | TaskError::UnknownAction(_) => 205,
            TaskError::UnknownJob(_) | TaskError::MissingSource | TaskError::StopFailed(_) => 206,
        }
    }
}

/// `{code, message}` answer to a task action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub code: u16,
    pub message: String,
}

impl TaskResponse {
    pub fn ok() -> Self {
        Self {
            code: CODE_OK,
            message: "success".to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }

    /// Merge per-job failures (e.g. from stop-all) into one response. The
    /// first failure decides the code; messages are joined line by line.
    pub fn from_failures(failures: &[TaskError]) -> Self {
        match failures.first() {
            None => Self::ok(),
            Some(first) => Self {
                code: first.code(),
                message: failures
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("\n"),
            },
        }
    }
}

impl From<TaskError> for TaskResponse {
    fn from(err: TaskError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl From<Result<(), TaskError>> for TaskResponse {
    fn from(result: Result<(), TaskError>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => e.into(),
        }
    }
}
