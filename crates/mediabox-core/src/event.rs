//! Progress events emitted by a worker and their line-oriented wire form.
//!
//! A worker writes one JSON object per line on stdout; the server side decodes
//! each line back into a [`ProgressEvent`]. Events are never retracted.

use serde::{Deserialize, Serialize};

/// Terminal state a worker can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Complete,
}

/// One message from a worker to its job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// Resolved title of the source. Sent once per worker.
    Title { text: String },
    /// Latest human-readable progress line.
    Info { text: String },
    /// Recoverable problem; appended to the job's error text.
    Warning { text: String },
    /// Unrecoverable problem; appended to the job's error text.
    Error { text: String },
    /// Completion percentage in `[0, 100]`.
    Progress { percent: f64 },
    #[serde(rename = "state")]
    StateChange { state: WorkerState },
}

impl ProgressEvent {
    pub fn title(text: impl Into<String>) -> Self {
        ProgressEvent::Title { text: text.into() }
    }

    pub fn info(text: impl Into<String>) -> Self {
        ProgressEvent::Info { text: text.into() }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        ProgressEvent::Warning { text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        ProgressEvent::Error { text: text.into() }
    }

    /// Progress event with the percentage clamped to `[0, 100]`.
    pub fn progress(percent: f64) -> Self {
        ProgressEvent::Progress {
            percent: percent.clamp(0.0, 100.0),
        }
    }

    pub fn complete() -> Self {
        ProgressEvent::StateChange {
            state: WorkerState::Complete,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(
            self,
            ProgressEvent::StateChange {
                state: WorkerState::Complete
            }
        )
    }

    /// Encode as a single line (no trailing newline).
    pub fn to_line(&self) -> String {
        // Serializing this enum cannot fail: all payloads are strings or finite floats.
        serde_json::to_string(self).unwrap_or_else(|_| String::from(r#"{"kind":"info","text":""}"#))
    }

    /// Decode one line written by [`ProgressEvent::to_line`].
    pub fn from_line(line: &str) -> Result<Self, EventDecodeError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Err(EventDecodeError::Empty);
        }
        let event: ProgressEvent = serde_json::from_str(trimmed)?;
        Ok(match event {
            ProgressEvent::Progress { percent } if !percent.is_finite() => {
                return Err(EventDecodeError::BadPercent)
            }
            ProgressEvent::Progress { percent } => ProgressEvent::progress(percent),
            other => other,
        })
    }
}

/// Why a worker output line could not be decoded as an event.
#[derive(Debug, thiserror::Error)]
pub enum EventDecodeError {
    #[error("empty line")]
    Empty,
    #[error("progress percentage is not a finite number")]
    BadPercent,
    #[error("malformed event: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form_is_tagged_by_kind() {
        assert_eq!(
            ProgressEvent::info("hello").to_line(),
            r#"{"kind":"info","text":"hello"}"#
        );
        assert_eq!(
            ProgressEvent::complete().to_line(),
            r#"{"kind":"state","state":"complete"}"#
        );
        assert_eq!(
            ProgressEvent::progress(45.5).to_line(),
            r#"{"kind":"progress","percent":45.5}"#
        );
    }

    #[test]
    fn decode_hand_written_lines() {
        let ev = ProgressEvent::from_line(r#"  {"kind":"title","text":"Some clip"}  "#).unwrap();
        assert_eq!(ev, ProgressEvent::title("Some clip"));
        let ev = ProgressEvent::from_line(r#"{"kind":"state","state":"complete"}"#).unwrap();
        assert!(ev.is_complete());
    }

    #[test]
    fn decode_clamps_progress() {
        let ev = ProgressEvent::from_line(r#"{"kind":"progress","percent":250}"#).unwrap();
        assert_eq!(ev, ProgressEvent::Progress { percent: 100.0 });
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            ProgressEvent::from_line(""),
            Err(EventDecodeError::Empty)
        ));
        assert!(matches!(
            ProgressEvent::from_line("[download]  10.0% of 3MiB"),
            Err(EventDecodeError::Json(_))
        ));
        assert!(matches!(
            ProgressEvent::from_line(r#"{"kind":"width","text":"10%"}"#),
            Err(EventDecodeError::Json(_))
        ));
    }
}
