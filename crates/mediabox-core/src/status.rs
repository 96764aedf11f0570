//! Job state and the aggregated per-job status record.

use serde::{Deserialize, Serialize};

use crate::event::ProgressEvent;
use crate::progress_line::ProgressLineParser;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Worker live and running.
    Start,
    /// Worker terminated on request; may be restarted.
    Stop,
    /// Worker finished (successfully or not); terminal until cleared.
    Complete,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Start => "start",
            JobState::Stop => "stop",
            JobState::Complete => "complete",
        }
    }

    /// Label of the UI control that acts on a job in this state.
    pub fn control_label(self) -> &'static str {
        match self {
            JobState::Start => "stop",
            JobState::Stop => "resume",
            JobState::Complete => "done",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest known view of one job, as rendered to polling clients.
///
/// Only the aggregator's drain step folds worker events into it; the job
/// itself only flips `state` on stop/restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub title: String,
    pub info: String,
    /// Every warning and error seen so far, in order. Never shrinks.
    pub error: String,
    /// Completion percentage in `[0, 100]`.
    pub progress: f64,
    pub state: JobState,
    pub control_label: String,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self {
            title: "unknown".to_string(),
            info: "initializing".to_string(),
            error: String::new(),
            progress: 0.0,
            state: JobState::Start,
            control_label: JobState::Start.control_label().to_string(),
        }
    }
}

impl JobStatus {
    pub fn set_state(&mut self, state: JobState) {
        self.state = state;
        self.control_label = state.control_label().to_string();
    }

    /// Fold one worker event into the record.
    ///
    /// A completion event only moves a running job to `Complete`; one that
    /// arrives after a stop is dropped.
    pub fn apply(&mut self, event: &ProgressEvent, parser: &dyn ProgressLineParser) {
        match event {
            ProgressEvent::Title { text } => self.title = text.clone(),
            ProgressEvent::Info { text } => {
                if let Some(p) = parser.percent(text) {
                    self.progress = p;
                }
                self.info = text.clone();
            }
            ProgressEvent::Warning { text } | ProgressEvent::Error { text } => {
                self.append_error(text);
            }
            ProgressEvent::Progress { percent } => self.progress = percent.clamp(0.0, 100.0),
            ProgressEvent::StateChange { .. } => {
                if self.state == JobState::Start {
                    self.set_state(JobState::Complete);
                }
            }
        }
    }

    fn append_error(&mut self, text: &str) {
        if !self.error.is_empty() && !self.error.ends_with('\n') {
            self.error.push('\n');
        }
        self.error.push_str(text);
    }
}
